//! Subprocess runner for the ZoKrates CLI, either inside Docker or local

use super::{Stage, Toolchain, ToolchainArg, ToolchainError, ToolchainOutput};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;

/// Prefix of container names, so a stuck run can be found and killed
const CONTAINER_PREFIX: &str = "pramaan-zokrates-";

/// How the toolchain binary is launched
#[derive(Debug, Clone)]
pub enum Launcher {
    /// `docker run --rm -v <workspace>:<mount_point> <image> <binary> ...`
    Docker {
        image: String,
        binary: String,
        mount_point: String,
    },
    /// A binary on the host, seeing host paths directly
    Local { binary: PathBuf },
}

/// Runs each stage as an isolated subprocess against one workspace directory
pub struct ProcessToolchain {
    launcher: Launcher,
    workspace_root: PathBuf,
    timeout: Option<Duration>,
}

impl ProcessToolchain {
    pub fn docker(
        workspace_root: impl Into<PathBuf>,
        image: impl Into<String>,
        binary: impl Into<String>,
        mount_point: impl Into<String>,
    ) -> Self {
        Self {
            launcher: Launcher::Docker {
                image: image.into(),
                binary: binary.into(),
                mount_point: mount_point.into(),
            },
            workspace_root: workspace_root.into(),
            timeout: None,
        }
    }

    pub fn local(workspace_root: impl Into<PathBuf>, binary: impl Into<PathBuf>) -> Self {
        Self {
            launcher: Launcher::Local {
                binary: binary.into(),
            },
            workspace_root: workspace_root.into(),
            timeout: None,
        }
    }

    /// Bound every invocation; without this a stuck subprocess blocks forever
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn resolve_arg(&self, arg: &ToolchainArg) -> Result<String, ToolchainError> {
        match arg {
            ToolchainArg::Flag(flag) => Ok((*flag).to_string()),
            ToolchainArg::Value(value) => Ok(value.clone()),
            ToolchainArg::Path(path) => match &self.launcher {
                Launcher::Docker { mount_point, .. } => {
                    container_path(&self.workspace_root, mount_point, path)
                }
                Launcher::Local { .. } => Ok(path.display().to_string()),
            },
        }
    }

    /// A fresh container name per invocation; `None` for local runs
    fn container_name(&self) -> Option<String> {
        match self.launcher {
            Launcher::Docker { .. } => {
                Some(format!("{}{}", CONTAINER_PREFIX, Uuid::new_v4().simple()))
            }
            Launcher::Local { .. } => None,
        }
    }

    fn build_command(
        &self,
        stage: Stage,
        args: &[ToolchainArg],
        container: Option<&str>,
    ) -> Result<Command, ToolchainError> {
        let resolved = args
            .iter()
            .map(|arg| self.resolve_arg(arg))
            .collect::<Result<Vec<_>, _>>()?;

        let command = match &self.launcher {
            Launcher::Docker {
                image,
                binary,
                mount_point,
            } => {
                let host_root = absolute(&self.workspace_root)?;
                let mut command = Command::new("docker");
                command.arg("run").arg("--rm");
                if let Some(name) = container {
                    command.arg("--name").arg(name);
                }
                command
                    .arg("-v")
                    .arg(format!("{}:{}", docker_host_path(&host_root), mount_point))
                    .arg(image)
                    .arg(binary)
                    .arg(stage.command())
                    .args(&resolved);
                command
            }
            Launcher::Local { binary } => {
                let mut command = Command::new(binary);
                command.arg(stage.command()).args(&resolved);
                command
            }
        };

        Ok(command)
    }
}

#[async_trait]
impl Toolchain for ProcessToolchain {
    async fn run(
        &self,
        stage: Stage,
        args: &[ToolchainArg],
    ) -> Result<ToolchainOutput, ToolchainError> {
        let container = self.container_name();
        let mut command = self.build_command(stage, args, container.as_deref())?;
        command.kill_on_drop(true);

        debug!("Running toolchain command: {}", stage.command());

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, command.output()).await {
                Ok(output) => output?,
                Err(_) => {
                    // Dropping the docker client leaves the container running
                    if let Some(name) = &container {
                        kill_container(name).await;
                    }
                    return Err(ToolchainError::Timeout {
                        stage: stage.command(),
                        secs: limit.as_secs(),
                    });
                }
            },
            None => command.output().await?,
        };

        let result = ToolchainOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        // Docker prints platform warnings on stderr even for successful runs
        if !result.stderr.trim().is_empty() && !result.stderr.contains("WARNING") {
            warn!("Toolchain stderr for {}: {}", stage.command(), result.stderr.trim());
        }

        Ok(result)
    }

    fn describe(&self) -> String {
        match &self.launcher {
            Launcher::Docker { image, .. } => format!("docker image {}", image),
            Launcher::Local { binary } => format!("local binary {}", binary.display()),
        }
    }
}

async fn kill_container(name: &str) {
    match Command::new("docker").arg("kill").arg(name).output().await {
        Ok(output) if output.status.success() => {
            warn!("Killed timed-out toolchain container {}", name)
        }
        Ok(output) => warn!(
            "Failed to kill toolchain container {}: {}",
            name,
            String::from_utf8_lossy(&output.stderr).trim()
        ),
        Err(e) => warn!("Failed to run docker kill for {}: {}", name, e),
    }
}

/// Convert a host path into the form Docker expects for a volume source.
///
/// Windows drive paths become `/d/...` with forward slashes, spaces kept.
/// Anything else is passed through unchanged.
pub fn docker_host_path(path: &Path) -> String {
    let raw = path.to_string_lossy();
    let bytes = raw.as_bytes();

    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        let drive = (bytes[0] as char).to_ascii_lowercase();
        let rest = raw[2..].replace('\\', "/");
        format!("/{}{}", drive, rest)
    } else {
        raw.into_owned()
    }
}

/// Map a path inside `workspace_root` to the same file under `mount_point`
pub fn container_path(
    workspace_root: &Path,
    mount_point: &str,
    path: &Path,
) -> Result<String, ToolchainError> {
    let relative = path
        .strip_prefix(workspace_root)
        .map_err(|_| ToolchainError::OutsideWorkspace(path.to_path_buf()))?;

    let mut mapped = mount_point.trim_end_matches('/').to_string();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                mapped.push('/');
                mapped.push_str(&part.to_string_lossy());
            }
            Component::CurDir => {}
            _ => return Err(ToolchainError::OutsideWorkspace(path.to_path_buf())),
        }
    }

    Ok(mapped)
}

fn absolute(path: &Path) -> Result<PathBuf, ToolchainError> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOUNT: &str = "/home/zokrates/workspace";

    #[test]
    fn test_docker_host_path_windows_drive() {
        let path = Path::new(r"D:\Pramaan - ZKP\zokrates-workspace");
        assert_eq!(docker_host_path(path), "/d/Pramaan - ZKP/zokrates-workspace");
    }

    #[test]
    fn test_docker_host_path_unix_unchanged() {
        let path = Path::new("/srv/pramaan/zokrates-workspace");
        assert_eq!(docker_host_path(path), "/srv/pramaan/zokrates-workspace");
    }

    #[test]
    fn test_container_path_maps_nested_files() {
        let root = Path::new("/srv/ws");
        let mapped = container_path(root, MOUNT, &root.join("requests/abc/witness")).unwrap();
        assert_eq!(mapped, "/home/zokrates/workspace/requests/abc/witness");
    }

    #[test]
    fn test_container_path_rejects_outside_paths() {
        let root = Path::new("/srv/ws");
        assert!(matches!(
            container_path(root, MOUNT, Path::new("/etc/passwd")),
            Err(ToolchainError::OutsideWorkspace(_))
        ));
        assert!(matches!(
            container_path(root, MOUNT, &root.join("../escape")),
            Err(ToolchainError::OutsideWorkspace(_))
        ));
    }

    #[test]
    fn test_docker_command_line() {
        let runner = ProcessToolchain::docker(
            "/srv/ws",
            "zokrates/zokrates:latest",
            "/home/zokrates/.zokrates/bin/zokrates",
            MOUNT,
        );
        let command = runner
            .build_command(
                Stage::Compile,
                &[
                    ToolchainArg::Flag("-i"),
                    ToolchainArg::path("/srv/ws/biometric_authentication.zok"),
                    ToolchainArg::Flag("-o"),
                    ToolchainArg::path("/srv/ws/out"),
                ],
                Some("pramaan-zokrates-test"),
            )
            .unwrap();

        let std_command = command.as_std();
        assert_eq!(std_command.get_program(), "docker");
        let args: Vec<_> = std_command
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "run",
                "--rm",
                "--name",
                "pramaan-zokrates-test",
                "-v",
                "/srv/ws:/home/zokrates/workspace",
                "zokrates/zokrates:latest",
                "/home/zokrates/.zokrates/bin/zokrates",
                "compile",
                "-i",
                "/home/zokrates/workspace/biometric_authentication.zok",
                "-o",
                "/home/zokrates/workspace/out",
            ]
        );
    }

    #[test]
    fn test_local_command_keeps_host_paths() {
        let runner = ProcessToolchain::local("/srv/ws", "zokrates");
        let command = runner
            .build_command(
                Stage::Verify,
                &[
                    ToolchainArg::Flag("-v"),
                    ToolchainArg::path("/srv/ws/verification.key"),
                ],
                None,
            )
            .unwrap();
        let args: Vec<_> = command
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args, vec!["verify", "-v", "/srv/ws/verification.key"]);
    }

    #[test]
    fn test_docker_runs_get_unique_container_names() {
        let runner =
            ProcessToolchain::docker("/srv/ws", "zokrates/zokrates:latest", "zokrates", MOUNT);
        let first = runner.container_name().unwrap();
        let second = runner.container_name().unwrap();
        assert!(first.starts_with(CONTAINER_PREFIX));
        assert_ne!(first, second);

        assert!(ProcessToolchain::local("/srv/ws", "zokrates")
            .container_name()
            .is_none());
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let runner = ProcessToolchain::local("/tmp", "/nonexistent/pramaan-zokrates");
        let result = runner.run(Stage::Version, &[]).await;
        assert!(matches!(result, Err(ToolchainError::Spawn(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_exit_status() {
        let runner = ProcessToolchain::local("/tmp", "false");
        let output = runner.run(Stage::Compile, &[]).await.unwrap();
        assert!(!output.success());
        assert_eq!(output.exit_code, Some(1));
    }
}
