use thiserror::Error;

/// Failures raised while driving the circuit toolchain.
///
/// Every variant names the stage that produced it. During bring-up these end
/// up as the `Failed` reason; during a request they trigger the simulated
/// fallback and never reach the caller.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Toolchain unavailable: {0}")]
    ToolchainUnavailable(String),

    #[error("Circuit compilation failed: {0}")]
    Compile(String),

    #[error("Trusted setup failed: {0}")]
    Setup(String),

    #[error("Verifier export failed: {0}")]
    Export(String),

    #[error("Witness generation failed: {0}")]
    Witness(String),

    #[error("Proof generation failed: {0}")]
    ProofGen(String),

    #[error("Proof verification could not run: {0}")]
    Verify(String),
}

impl PipelineError {
    /// Short stage label used in logs and readiness messages
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Workspace(_) => "workspace",
            PipelineError::ToolchainUnavailable(_) => "probe",
            PipelineError::Compile(_) => "compile",
            PipelineError::Setup(_) => "setup",
            PipelineError::Export(_) => "export-verifier",
            PipelineError::Witness(_) => "compute-witness",
            PipelineError::ProofGen(_) => "generate-proof",
            PipelineError::Verify(_) => "verify",
        }
    }
}

/// Shape violations found when decoding a submitted proof artifact
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArtifactError {
    #[error("Artifact does not match the proof shape: {0}")]
    Shape(String),

    #[error("Artifact has no public inputs")]
    EmptyInputs,

    #[error("Invalid field element in {location}: {value:?}")]
    InvalidElement { location: String, value: String },
}

/// The only outcomes other than success that cross the service facade
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceFault {
    #[error("Malformed proof: {0}")]
    MalformedProof(String),

    #[error("Toolchain not ready: {0}")]
    NotReady(String),

    #[error("Proof verification failed")]
    VerificationFailed,
}

impl From<ArtifactError> for ServiceFault {
    fn from(err: ArtifactError) -> Self {
        ServiceFault::MalformedProof(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
