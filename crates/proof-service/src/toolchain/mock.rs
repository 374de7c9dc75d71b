//! Mock ZoKrates CLI for development and testing
//!
//! Emulates the file-level behaviour of each stage without Docker: compile
//! and setup write placeholder artifacts, `compute-witness` enforces the
//! circuit's equality assertions, `generate-proof` emits a `proof.json` bound
//! to the public inputs, and `verify` prints `PASSED` or `FAILED`.

use super::{Stage, Toolchain, ToolchainArg, ToolchainError, ToolchainOutput};
use async_trait::async_trait;
use pramaan_common::{FieldElement, G16Proof, ProofArtifact};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

const PROVING_KEY_TAG: &str = "mock-proving-key:";
const VERIFICATION_KEY_TAG: &str = "mock-verification-key:";

/// Mock toolchain
#[derive(Default)]
pub struct MockToolchain {
    /// Stage that exits non-zero
    fail_stage: Option<Stage>,

    /// Stage that exits zero without writing its output
    skip_artifact: Option<Stage>,

    /// Stage that never completes
    stall_stage: Option<Stage>,

    /// Added to `compute-witness` and `generate-proof` to widen race windows
    request_delay: Duration,

    /// Every invocation, in order
    calls: Mutex<Vec<Stage>>,
}

impl MockToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(mut self, stage: Stage) -> Self {
        self.fail_stage = Some(stage);
        self
    }

    pub fn without_artifact(mut self, stage: Stage) -> Self {
        self.skip_artifact = Some(stage);
        self
    }

    pub fn stalling_at(mut self, stage: Stage) -> Self {
        self.stall_stage = Some(stage);
        self
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Stages invoked so far
    pub async fn calls(&self) -> Vec<Stage> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self, stage: Stage) -> usize {
        self.calls.lock().await.iter().filter(|s| **s == stage).count()
    }

    async fn execute(&self, stage: Stage, args: &ParsedArgs) -> Result<String, String> {
        let writes = self.skip_artifact != Some(stage);

        match stage {
            Stage::Version => Ok("ZoKrates 0.8.8 (mock)".to_string()),

            Stage::Compile => {
                let source = read(args.path("-i")?).await?;
                if writes {
                    let program = format!("mock-program:{}", digest_hex(source.as_bytes()));
                    write(args.path("-o")?, &program).await?;
                }
                Ok("Compiling biometric_authentication.zok\nCompiled code written".to_string())
            }

            Stage::Setup => {
                let program = read(args.path("-i")?).await?;
                let seed = digest_hex(program.as_bytes());
                if writes {
                    write(args.path("-p")?, &format!("{}{}", PROVING_KEY_TAG, seed)).await?;
                    write(args.path("-v")?, &format!("{}{}", VERIFICATION_KEY_TAG, seed)).await?;
                }
                Ok("Performing setup...\nVerification key written\nProving key written".to_string())
            }

            Stage::ExportVerifier => {
                let key = read(args.path("-i")?).await?;
                if writes {
                    let contract = format!(
                        "// SPDX-License-Identifier: LGPL-3.0-only\n// {}\ncontract Verifier {{}}\n",
                        key
                    );
                    write(args.path("-o")?, &contract).await?;
                }
                Ok("Exporting verifier...\nVerifier exported".to_string())
            }

            Stage::ComputeWitness => {
                read(args.path("-i")?).await?;
                let values = args.list("-a");
                if values.len() != 4 {
                    return Err(format!("Expected 4 arguments, got {}", values.len()));
                }
                tokio::time::sleep(self.request_delay).await;
                if values[0] != values[2] || values[1] != values[3] {
                    return Err("Execution failed: Assertion failed".to_string());
                }
                if writes {
                    write(args.path("-o")?, &values.join(" ")).await?;
                }
                Ok("Computing witness...\nWitness file written".to_string())
            }

            Stage::GenerateProof => {
                read(args.path("-i")?).await?;
                let key = read(args.path("-p")?).await?;
                let seed = key
                    .strip_prefix(PROVING_KEY_TAG)
                    .ok_or("Invalid proving key")?
                    .to_string();
                let witness = read(args.path("-w")?).await?;
                tokio::time::sleep(self.request_delay).await;

                let values: Vec<&str> = witness.split_whitespace().collect();
                if values.len() != 4 {
                    return Err("Invalid witness".to_string());
                }
                let inputs = vec![
                    decimal_to_hex(values[2])?,
                    decimal_to_hex(values[3])?,
                    decimal_to_hex("1")?,
                ];
                let artifact = ProofArtifact::g16(mock_proof(&seed, &inputs), inputs);

                if writes {
                    write(args.path("-j")?, &artifact.to_value().to_string()).await?;
                }
                Ok("Generating proof...\nProof written".to_string())
            }

            Stage::Verify => {
                let key = read(args.path("-v")?).await?;
                let seed = key
                    .strip_prefix(VERIFICATION_KEY_TAG)
                    .ok_or("Invalid verification key")?;
                let text = read(args.path("-j")?).await?;
                let document: serde_json::Value =
                    serde_json::from_str(&text).map_err(|e| e.to_string())?;
                for field in ["scheme", "curve"] {
                    if !document.get(field).is_some_and(serde_json::Value::is_string) {
                        return Err(format!("Proof file is missing `{}`", field));
                    }
                }
                let artifact = ProofArtifact::from_value(&document).map_err(|e| e.to_string())?;

                let passed = artifact.inputs.len() == 3
                    && artifact.proof == mock_proof(seed, &artifact.inputs);
                Ok(format!(
                    "Performing verification...\n{}",
                    if passed { "PASSED" } else { "FAILED" }
                ))
            }
        }
    }
}

#[async_trait]
impl Toolchain for MockToolchain {
    async fn run(
        &self,
        stage: Stage,
        args: &[ToolchainArg],
    ) -> Result<ToolchainOutput, ToolchainError> {
        self.calls.lock().await.push(stage);
        debug!("Mock toolchain: {}", stage.command());

        if self.stall_stage == Some(stage) {
            std::future::pending::<()>().await;
        }
        if self.fail_stage == Some(stage) {
            return Ok(failed(format!("mock failure in {}", stage.command())));
        }

        let parsed = ParsedArgs::parse(args);
        match self.execute(stage, &parsed).await {
            Ok(stdout) => Ok(ToolchainOutput {
                exit_code: Some(0),
                stdout,
                stderr: String::new(),
            }),
            Err(message) => Ok(failed(message)),
        }
    }

    fn describe(&self) -> String {
        "mock toolchain".to_string()
    }
}

/// Flags mapped to their values; `-a` takes every value up to the next flag
struct ParsedArgs {
    values: HashMap<&'static str, Vec<String>>,
    paths: HashMap<&'static str, PathBuf>,
}

impl ParsedArgs {
    fn parse(args: &[ToolchainArg]) -> Self {
        let mut values: HashMap<&'static str, Vec<String>> = HashMap::new();
        let mut paths = HashMap::new();
        let mut current: Option<&'static str> = None;

        for arg in args {
            match arg {
                ToolchainArg::Flag(flag) => current = Some(*flag),
                ToolchainArg::Value(value) => {
                    if let Some(flag) = current {
                        values.entry(flag).or_default().push(value.clone());
                    }
                }
                ToolchainArg::Path(path) => {
                    if let Some(flag) = current.take() {
                        paths.insert(flag, path.clone());
                    }
                }
            }
        }

        Self { values, paths }
    }

    fn path(&self, flag: &str) -> Result<&Path, String> {
        self.paths
            .get(flag)
            .map(PathBuf::as_path)
            .ok_or_else(|| format!("Missing argument {}", flag))
    }

    fn list(&self, flag: &str) -> Vec<String> {
        self.values.get(flag).cloned().unwrap_or_default()
    }
}

/// Deterministic proof points bound to the key seed and the public inputs
fn mock_proof(seed: &str, inputs: &[String]) -> G16Proof {
    let point = |label: &str| {
        let mut hasher = Sha256::new();
        hasher.update(seed.as_bytes());
        hasher.update(label.as_bytes());
        for input in inputs {
            hasher.update(input.as_bytes());
        }
        FieldElement::reduce(&hasher.finalize()).to_hex()
    };

    G16Proof {
        a: [point("a0"), point("a1")],
        b: [[point("b00"), point("b01")], [point("b10"), point("b11")]],
        c: [point("c0"), point("c1")],
    }
}

fn decimal_to_hex(value: &str) -> Result<String, String> {
    FieldElement::from_decimal(value)
        .map(|element| element.to_hex())
        .ok_or_else(|| format!("Invalid field element: {}", value))
}

fn digest_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn failed(message: String) -> ToolchainOutput {
    ToolchainOutput {
        exit_code: Some(1),
        stdout: String::new(),
        stderr: message,
    }
}

async fn read(path: &Path) -> Result<String, String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("Cannot read {}: {}", path.display(), e))
}

async fn write(path: &Path, contents: &str) -> Result<(), String> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| format!("Cannot write {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_witness_rejects_mismatched_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("out");
        tokio::fs::write(&program, "mock-program").await.unwrap();

        let mock = MockToolchain::new();
        let args = |a: &str, b: &str| {
            vec![
                ToolchainArg::Flag("-i"),
                ToolchainArg::path(&program),
                ToolchainArg::Flag("-a"),
                ToolchainArg::Value("11".to_string()),
                ToolchainArg::Value("22".to_string()),
                ToolchainArg::Value(a.to_string()),
                ToolchainArg::Value(b.to_string()),
                ToolchainArg::Flag("-o"),
                ToolchainArg::path(dir.path().join("witness")),
            ]
        };

        let ok = mock.run(Stage::ComputeWitness, &args("11", "22")).await.unwrap();
        assert!(ok.success());

        let rejected = mock.run(Stage::ComputeWitness, &args("11", "23")).await.unwrap();
        assert!(!rejected.success());
        assert!(rejected.stderr.contains("Assertion failed"));
        assert_eq!(mock.call_count(Stage::ComputeWitness).await, 2);
    }

    #[tokio::test]
    async fn test_forced_failure() {
        let mock = MockToolchain::new().failing_at(Stage::Version);
        let output = mock.run(Stage::Version, &[]).await.unwrap();
        assert_eq!(output.exit_code, Some(1));
    }

    #[tokio::test]
    async fn test_verify_requires_scheme_and_curve() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("verification.key");
        tokio::fs::write(&key, format!("{}seed", VERIFICATION_KEY_TAG))
            .await
            .unwrap();

        let inputs = vec!["0x01".to_string(), "0x02".to_string(), "0x01".to_string()];
        let artifact = ProofArtifact::g16(mock_proof("seed", &inputs), inputs);
        let proof_file = dir.path().join("proof.json");
        let args = vec![
            ToolchainArg::Flag("-v"),
            ToolchainArg::path(&key),
            ToolchainArg::Flag("-j"),
            ToolchainArg::path(&proof_file),
        ];
        let mock = MockToolchain::new();

        tokio::fs::write(&proof_file, artifact.to_value().to_string())
            .await
            .unwrap();
        let output = mock.run(Stage::Verify, &args).await.unwrap();
        assert!(output.success());
        assert!(output.stdout.contains("PASSED"));

        let mut bare = artifact.to_value();
        bare.as_object_mut().unwrap().remove("curve");
        tokio::fs::write(&proof_file, bare.to_string()).await.unwrap();
        let output = mock.run(Stage::Verify, &args).await.unwrap();
        assert!(!output.success());
        assert!(output.stderr.contains("missing `curve`"));
    }

    #[test]
    fn test_mock_proof_depends_on_inputs() {
        let one = vec!["0x01".to_string()];
        let two = vec!["0x02".to_string()];
        assert_eq!(mock_proof("seed", &one), mock_proof("seed", &one));
        assert_ne!(mock_proof("seed", &one), mock_proof("seed", &two));
        assert_ne!(mock_proof("seed", &one), mock_proof("other", &one));
    }
}
