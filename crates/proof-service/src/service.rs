//! Service facade consumed by the HTTP and user-record layers
//!
//! Every operation either runs the real ZoKrates pipeline or falls back to
//! the [`Simulator`], based on the readiness state. Toolchain faults never
//! reach the caller. Results carry `is_real_proof`, which is the only thing
//! telling a simulated result apart from a real one.

use crate::config::Config;
use crate::orchestrator::PipelineOrchestrator;
use crate::readiness::{ReadinessStateMachine, ReadinessStatus};
use crate::simulator::Simulator;
use crate::workspace::Workspace;
use chrono::{DateTime, Utc};
use pramaan_common::{KeyPair, ProofArtifact, ProofHistoryEntry, ServiceFault};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Tunables for the facade
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// Chance that a simulated verification is forced to fail
    pub simulated_failure_rate: f64,

    /// How long a generated proof is considered fresh
    pub proof_ttl: Duration,

    /// Real-path requests allowed in the workspace at once; 1 serializes them
    pub max_concurrent_proofs: usize,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            simulated_failure_rate: 0.1,
            proof_ttl: Duration::from_secs(300),
            max_concurrent_proofs: 1,
        }
    }
}

/// A proof handed back to the caller
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedProof {
    #[serde(flatten)]
    pub artifact: ProofArtifact,
    pub is_real_proof: bool,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,

    /// `NotReady` when the simulator was used because bring-up has not succeeded
    #[serde(skip)]
    pub notice: Option<ServiceFault>,
}

impl GeneratedProof {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Outcome of a verification request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub valid: bool,
    pub is_real_proof: bool,

    /// `MalformedProof`, `VerificationFailed`, or `NotReady` alongside a
    /// simulated result
    pub fault: Option<ServiceFault>,
}

impl Verification {
    fn malformed(fault: ServiceFault) -> Self {
        Self {
            valid: false,
            is_real_proof: false,
            fault: Some(fault),
        }
    }

    pub fn history_entry(&self) -> ProofHistoryEntry {
        ProofHistoryEntry::new(self.valid, self.is_real_proof)
    }
}

pub struct ProofService {
    orchestrator: Arc<PipelineOrchestrator>,
    readiness: ReadinessStateMachine,
    simulator: Simulator,
    request_gate: Semaphore,
    proof_ttl: chrono::Duration,
}

impl ProofService {
    pub fn new(orchestrator: PipelineOrchestrator, options: ServiceOptions) -> Self {
        let proof_ttl =
            chrono::Duration::from_std(options.proof_ttl).unwrap_or(chrono::Duration::minutes(5));

        Self {
            orchestrator: Arc::new(orchestrator),
            readiness: ReadinessStateMachine::new(),
            simulator: Simulator::new(options.simulated_failure_rate),
            request_gate: Semaphore::new(options.max_concurrent_proofs.max(1)),
            proof_ttl,
        }
    }

    /// Build the service with the toolchain selected by `config`
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let toolchain = config.toolchain()?;
        let orchestrator =
            PipelineOrchestrator::new(Workspace::new(&config.workspace_dir), toolchain);
        Ok(Self::new(orchestrator, config.service_options()))
    }

    /// Kick off background bring-up. Requests are served immediately, through
    /// the simulator until bring-up succeeds.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        self.readiness
            .begin_initialization(Arc::clone(&self.orchestrator))
    }

    pub fn readiness(&self) -> &ReadinessStateMachine {
        &self.readiness
    }

    pub fn status(&self) -> ReadinessStatus {
        self.readiness.status()
    }

    /// Exported verifier contract, once bring-up has succeeded
    pub fn verifier_contract(&self) -> Option<String> {
        self.readiness
            .setup_output()
            .map(|output| output.verifier_contract.clone())
    }

    /// Setup keys when ready; otherwise a fresh synthetic pair
    pub fn generate_keys(&self) -> KeyPair {
        match self.readiness.setup_output() {
            Some(output) => output.keys.clone(),
            None => {
                debug!("Toolchain not ready, issuing synthetic keys");
                self.simulator.generate_keys()
            }
        }
    }

    /// Prove that `secret` hashes to `stored_identifier`'s hash.
    ///
    /// Never fails: any toolchain fault degrades to a simulated proof.
    pub async fn generate_proof(
        &self,
        secret: &str,
        proving_key_ref: &str,
        stored_identifier: &str,
    ) -> GeneratedProof {
        if self.readiness.setup_output().is_none() {
            let status = self.readiness.status();
            debug!("Generating simulated proof: {}", status.message);
            let artifact = self
                .simulator
                .simulate_proof(secret.as_bytes(), proving_key_ref);
            return self.issue(artifact, false, Some(ServiceFault::NotReady(status.message)));
        }

        let result = match self.request_gate.acquire().await {
            Ok(_permit) => {
                self.orchestrator
                    .prove(secret.as_bytes(), stored_identifier.as_bytes())
                    .await
            }
            Err(e) => Err(pramaan_common::PipelineError::Workspace(e.to_string())),
        };

        match result {
            Ok(artifact) => {
                info!("Real proof generated");
                self.issue(artifact, true, None)
            }
            Err(e) => {
                warn!(
                    "Real proof generation failed at {} stage, falling back to simulation: {}",
                    e.stage(),
                    e
                );
                let artifact = self
                    .simulator
                    .simulate_proof(secret.as_bytes(), proving_key_ref);
                self.issue(artifact, false, None)
            }
        }
    }

    /// Verify a proof as received on the wire
    pub async fn verify_proof(
        &self,
        artifact: &serde_json::Value,
        verification_key_ref: &str,
    ) -> Verification {
        match ProofArtifact::from_value(artifact) {
            Ok(artifact) => self.verify_artifact(&artifact, verification_key_ref).await,
            Err(e) => {
                debug!("Rejecting malformed proof: {}", e);
                Verification::malformed(e.into())
            }
        }
    }

    /// Verify an already decoded proof.
    ///
    /// Malformed input is rejected before anything else runs. When ready, the
    /// toolchain decides. Otherwise the result is a random structural pass
    /// and comes with a `NotReady` fault.
    pub async fn verify_artifact(
        &self,
        artifact: &ProofArtifact,
        verification_key_ref: &str,
    ) -> Verification {
        if let Err(e) = artifact.validate() {
            debug!("Rejecting malformed proof: {}", e);
            return Verification::malformed(e.into());
        }

        if self.readiness.setup_output().is_none() {
            let status = self.readiness.status();
            let valid = self.simulator.structural_verify();
            debug!("Simulated verification ({}): {}", verification_key_ref, valid);
            return Verification {
                valid,
                is_real_proof: false,
                fault: Some(ServiceFault::NotReady(status.message)),
            };
        }

        let result = match self.request_gate.acquire().await {
            Ok(_permit) => self.orchestrator.verify(artifact).await,
            Err(e) => Err(pramaan_common::PipelineError::Verify(e.to_string())),
        };

        let valid = match result {
            Ok(valid) => valid,
            Err(e) => {
                warn!("Verification could not run, treating as failed: {}", e);
                false
            }
        };

        Verification {
            valid,
            is_real_proof: true,
            fault: (!valid).then_some(ServiceFault::VerificationFailed),
        }
    }

    /// Whether a submitted proof is the one most recently issued to the user
    pub fn matches_latest(&self, submitted: &serde_json::Value, latest: &ProofArtifact) -> bool {
        ProofArtifact::from_value(submitted)
            .map(|artifact| artifact.matches(latest))
            .unwrap_or(false)
    }

    fn issue(
        &self,
        artifact: ProofArtifact,
        is_real_proof: bool,
        notice: Option<ServiceFault>,
    ) -> GeneratedProof {
        let issued_at = Utc::now();
        GeneratedProof {
            artifact,
            is_real_proof,
            issued_at,
            expires_at: issued_at + self.proof_ttl,
            notice,
        }
    }
}
