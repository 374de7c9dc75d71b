//! Invocation of the external circuit toolchain
//!
//! The orchestrator describes each stage as a [`Stage`] plus a list of
//! [`ToolchainArg`]s. Workspace paths stay typed as [`ToolchainArg::Path`] so
//! the runner can rewrite them into whatever namespace the subprocess sees.

#[cfg(feature = "mock")]
pub mod mock;
pub mod process;

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

#[cfg(feature = "mock")]
pub use mock::MockToolchain;
pub use process::{container_path, docker_host_path, Launcher, ProcessToolchain};

/// A toolchain subcommand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Version,
    Compile,
    Setup,
    ExportVerifier,
    ComputeWitness,
    GenerateProof,
    Verify,
}

impl Stage {
    /// The subcommand as written on the toolchain's command line
    pub fn command(&self) -> &'static str {
        match self {
            Stage::Version => "--version",
            Stage::Compile => "compile",
            Stage::Setup => "setup",
            Stage::ExportVerifier => "export-verifier",
            Stage::ComputeWitness => "compute-witness",
            Stage::GenerateProof => "generate-proof",
            Stage::Verify => "verify",
        }
    }
}

/// One command-line argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolchainArg {
    Flag(&'static str),
    Value(String),
    /// A file inside the workspace, translated by the runner
    Path(PathBuf),
}

impl ToolchainArg {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        ToolchainArg::Path(path.into())
    }
}

/// Captured result of one toolchain invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolchainOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Best available description of a failed invocation
    pub fn failure_detail(&self) -> String {
        let detail = if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        };
        match self.exit_code {
            Some(code) => format!("exit code {}: {}", code, detail),
            None => format!("terminated by signal: {}", detail),
        }
    }
}

#[derive(Error, Debug)]
pub enum ToolchainError {
    #[error("Failed to launch toolchain: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Toolchain command `{stage}` timed out after {secs}s")]
    Timeout { stage: &'static str, secs: u64 },

    #[error("Path is outside the workspace: {0}")]
    OutsideWorkspace(PathBuf),
}

/// Something that can execute toolchain stages against the workspace
#[async_trait]
pub trait Toolchain: Send + Sync {
    async fn run(
        &self,
        stage: Stage,
        args: &[ToolchainArg],
    ) -> Result<ToolchainOutput, ToolchainError>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}
