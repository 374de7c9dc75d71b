//! Sequencing of toolchain stages
//!
//! Bring-up runs `probe → init → compile → setup → export-verifier` once per
//! process. Each request runs `compute-witness → generate-proof` or `verify`
//! in its own scratch directory.
//!
//! Each stage removes its expected outputs beforehand and checks they exist
//! afterwards. A zero exit code alone is not accepted as success.

use crate::toolchain::{Stage, Toolchain, ToolchainArg, ToolchainOutput};
use crate::workspace::{RequestScratch, Workspace};
use pramaan_common::{FieldHasher, KeyPair, PipelineError, ProofArtifact, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything produced by a successful bring-up
#[derive(Debug, Clone)]
pub struct SetupOutput {
    pub keys: KeyPair,
    pub verifier_contract: String,
}

pub struct PipelineOrchestrator {
    workspace: Workspace,
    toolchain: Arc<dyn Toolchain>,
}

impl PipelineOrchestrator {
    pub fn new(workspace: Workspace, toolchain: Arc<dyn Toolchain>) -> Self {
        Self {
            workspace,
            toolchain,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Check that the toolchain can be launched at all
    pub async fn probe(&self) -> Result<String> {
        info!("Probing {}", self.toolchain.describe());
        let output = self
            .invoke(Stage::Version, &[], PipelineError::ToolchainUnavailable)
            .await?;
        let version = output.stdout.trim().to_string();
        info!("Toolchain version: {}", version);
        Ok(version)
    }

    pub async fn init_workspace(&self) -> Result<()> {
        self.workspace.init().await
    }

    pub async fn compile_circuit(&self) -> Result<()> {
        info!("Compiling circuit...");
        let program = self.workspace.program_path();
        clear_outputs(&[&program]).await;

        self.invoke(
            Stage::Compile,
            &[
                ToolchainArg::Flag("-i"),
                ToolchainArg::path(self.workspace.circuit_path()),
                ToolchainArg::Flag("-o"),
                ToolchainArg::path(&program),
            ],
            PipelineError::Compile,
        )
        .await?;

        ensure_artifacts(&[&program], PipelineError::Compile).await?;
        info!("Circuit compiled");
        Ok(())
    }

    pub async fn perform_setup(&self) -> Result<()> {
        info!("Performing trusted setup...");
        let proving_key = self.workspace.proving_key_path();
        let verification_key = self.workspace.verification_key_path();
        clear_outputs(&[&proving_key, &verification_key]).await;

        self.invoke(
            Stage::Setup,
            &[
                ToolchainArg::Flag("-i"),
                ToolchainArg::path(self.workspace.program_path()),
                ToolchainArg::Flag("-p"),
                ToolchainArg::path(&proving_key),
                ToolchainArg::Flag("-v"),
                ToolchainArg::path(&verification_key),
            ],
            PipelineError::Setup,
        )
        .await?;

        ensure_artifacts(&[&proving_key, &verification_key], PipelineError::Setup).await?;
        info!("Setup completed, keys generated");
        Ok(())
    }

    /// Export the verifier contract and return its source
    pub async fn export_verifier(&self) -> Result<String> {
        info!("Exporting verifier contract...");
        let verifier = self.workspace.verifier_path();
        clear_outputs(&[&verifier]).await;

        self.invoke(
            Stage::ExportVerifier,
            &[
                ToolchainArg::Flag("-i"),
                ToolchainArg::path(self.workspace.verification_key_path()),
                ToolchainArg::Flag("-o"),
                ToolchainArg::path(&verifier),
            ],
            PipelineError::Export,
        )
        .await?;

        ensure_artifacts(&[&verifier], PipelineError::Export).await?;
        let contract = tokio::fs::read_to_string(&verifier)
            .await
            .map_err(|e| PipelineError::Export(format!("Failed to read verifier: {}", e)))?;

        info!("Verifier contract exported ({} bytes)", contract.len());
        Ok(contract)
    }

    /// Full bring-up; the first failing stage aborts the sequence
    pub async fn run_setup_sequence(&self) -> Result<SetupOutput> {
        self.probe().await?;
        self.init_workspace().await?;
        self.compile_circuit().await?;
        self.perform_setup().await?;
        let verifier_contract = self.export_verifier().await?;

        Ok(SetupOutput {
            keys: KeyPair::real(
                self.workspace.proving_key_path().display().to_string(),
                self.workspace.verification_key_path().display().to_string(),
            ),
            verifier_contract,
        })
    }

    /// Hash both inputs and compute the witness.
    ///
    /// Arguments are passed in circuit order:
    /// `secret.part1 secret.part2 identifier.part1 identifier.part2`.
    pub async fn generate_witness(
        &self,
        scratch: &RequestScratch,
        secret: &[u8],
        stored_identifier: &[u8],
    ) -> Result<()> {
        debug!("Generating witness for request {}", scratch.id());
        let hashed_secret = FieldHasher::hash(secret);
        let identifier = FieldHasher::hash(stored_identifier);
        let witness = scratch.witness_path();

        self.invoke(
            Stage::ComputeWitness,
            &[
                ToolchainArg::Flag("-i"),
                ToolchainArg::path(self.workspace.program_path()),
                ToolchainArg::Flag("-a"),
                ToolchainArg::Value(hashed_secret.part1.to_decimal()),
                ToolchainArg::Value(hashed_secret.part2.to_decimal()),
                ToolchainArg::Value(identifier.part1.to_decimal()),
                ToolchainArg::Value(identifier.part2.to_decimal()),
                ToolchainArg::Flag("-o"),
                ToolchainArg::path(&witness),
            ],
            PipelineError::Witness,
        )
        .await?;

        ensure_artifacts(&[&witness], PipelineError::Witness).await
    }

    /// Prove from the request's witness and parse the resulting proof file
    pub async fn generate_proof(&self, scratch: &RequestScratch) -> Result<ProofArtifact> {
        debug!("Generating proof for request {}", scratch.id());
        let proof_file = scratch.proof_path();

        self.invoke(
            Stage::GenerateProof,
            &[
                ToolchainArg::Flag("-i"),
                ToolchainArg::path(self.workspace.program_path()),
                ToolchainArg::Flag("-j"),
                ToolchainArg::path(&proof_file),
                ToolchainArg::Flag("-p"),
                ToolchainArg::path(self.workspace.proving_key_path()),
                ToolchainArg::Flag("-w"),
                ToolchainArg::path(scratch.witness_path()),
            ],
            PipelineError::ProofGen,
        )
        .await?;

        let text = tokio::fs::read_to_string(&proof_file)
            .await
            .map_err(|e| PipelineError::ProofGen(format!("Proof file missing: {}", e)))?;

        ProofArtifact::from_json(&text)
            .map_err(|e| PipelineError::ProofGen(format!("Unparsable proof file: {}", e)))
    }

    /// Run the verify stage on `artifact`.
    ///
    /// `Ok(false)` is an ordinary rejection, including output that carries
    /// no clear pass marker. `Err` means the stage could not run.
    pub async fn verify_proof(
        &self,
        scratch: &RequestScratch,
        artifact: &ProofArtifact,
    ) -> Result<bool> {
        let input = scratch.verify_input_path();
        let document = artifact.to_value().to_string();
        tokio::fs::write(&input, document)
            .await
            .map_err(|e| PipelineError::Verify(format!("Failed to write proof: {}", e)))?;

        let output = self
            .toolchain
            .run(
                Stage::Verify,
                &[
                    ToolchainArg::Flag("-v"),
                    ToolchainArg::path(self.workspace.verification_key_path()),
                    ToolchainArg::Flag("-j"),
                    ToolchainArg::path(&input),
                ],
            )
            .await
            .map_err(|e| PipelineError::Verify(e.to_string()))?;

        let passed = verification_passed(&output);
        if passed {
            info!("Proof verified successfully");
        } else {
            info!("Proof verification failed");
        }
        Ok(passed)
    }

    /// Witness and proof for one request, in a scratch directory that is
    /// removed afterwards
    pub async fn prove(&self, secret: &[u8], stored_identifier: &[u8]) -> Result<ProofArtifact> {
        let scratch = self.workspace.scratch().await?;
        let result = async {
            self.generate_witness(&scratch, secret, stored_identifier)
                .await?;
            self.generate_proof(&scratch).await
        }
        .await;
        scratch.cleanup().await;
        result
    }

    pub async fn verify(&self, artifact: &ProofArtifact) -> Result<bool> {
        let scratch = self.workspace.scratch().await?;
        let result = self.verify_proof(&scratch, artifact).await;
        scratch.cleanup().await;
        result
    }

    async fn invoke(
        &self,
        stage: Stage,
        args: &[ToolchainArg],
        error: fn(String) -> PipelineError,
    ) -> Result<ToolchainOutput> {
        let output = self
            .toolchain
            .run(stage, args)
            .await
            .map_err(|e| error(e.to_string()))?;

        if !output.success() {
            warn!("{} failed: {}", stage.command(), output.failure_detail());
            return Err(error(output.failure_detail()));
        }

        Ok(output)
    }
}

/// A pass needs a clean exit, a `PASSED` marker and no `FAILED` marker
fn verification_passed(output: &ToolchainOutput) -> bool {
    output.success() && output.stdout.contains("PASSED") && !output.stdout.contains("FAILED")
}

async fn clear_outputs(paths: &[&PathBuf]) {
    for path in paths {
        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove stale artifact {}: {}", path.display(), e);
            }
        }
    }
}

async fn ensure_artifacts(paths: &[&PathBuf], error: fn(String) -> PipelineError) -> Result<()> {
    for path in paths {
        if !exists(path).await {
            return Err(error(format!(
                "Expected artifact {} was not produced",
                path.display()
            )));
        }
    }
    Ok(())
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
