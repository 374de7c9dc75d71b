//! The directory shared with the toolchain
//!
//! Long-lived artifacts (circuit, compiled program, keys, verifier) sit at
//! fixed paths in the root. Witness and proof files are per request and live
//! in `requests/<uuid>/` so concurrent requests never share a file.

use pramaan_common::{PipelineError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Biometric authentication circuit: the hashed secret must equal the stored identifier
pub const CIRCUIT_SOURCE: &str = r#"// Pramaan: Biometric-based ZKP Authentication
def main(private field hashed_biometric_1, private field hashed_biometric_2, field stored_did_1, field stored_did_2) -> bool {
    assert(hashed_biometric_1 == stored_did_1);
    assert(hashed_biometric_2 == stored_did_2);
    return true;
}
"#;

const CIRCUIT_FILE: &str = "biometric_authentication.zok";
const PROGRAM_FILE: &str = "out";
const PROVING_KEY_FILE: &str = "proving.key";
const VERIFICATION_KEY_FILE: &str = "verification.key";
const VERIFIER_FILE: &str = "verifier.sol";
const REQUESTS_DIR: &str = "requests";

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn circuit_path(&self) -> PathBuf {
        self.root.join(CIRCUIT_FILE)
    }

    pub fn program_path(&self) -> PathBuf {
        self.root.join(PROGRAM_FILE)
    }

    pub fn proving_key_path(&self) -> PathBuf {
        self.root.join(PROVING_KEY_FILE)
    }

    pub fn verification_key_path(&self) -> PathBuf {
        self.root.join(VERIFICATION_KEY_FILE)
    }

    pub fn verifier_path(&self) -> PathBuf {
        self.root.join(VERIFIER_FILE)
    }

    /// Create the directory, drop leftovers from a previous run and write the circuit
    pub async fn init(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            PipelineError::Workspace(format!(
                "Failed to create workspace {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let requests = self.root.join(REQUESTS_DIR);
        if tokio::fs::try_exists(&requests).await.unwrap_or(false) {
            if let Err(e) = tokio::fs::remove_dir_all(&requests).await {
                warn!("Failed to clear stale request directories: {}", e);
            }
        }

        tokio::fs::write(self.circuit_path(), CIRCUIT_SOURCE)
            .await
            .map_err(|e| PipelineError::Workspace(format!("Failed to write circuit: {}", e)))?;

        info!("Workspace initialized at {}", self.root.display());
        Ok(())
    }

    /// Allocate a private directory for one request's witness and proof files
    pub async fn scratch(&self) -> Result<RequestScratch> {
        let id = Uuid::new_v4();
        let dir = self.root.join(REQUESTS_DIR).join(id.to_string());

        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            PipelineError::Workspace(format!("Failed to create request directory: {}", e))
        })?;

        Ok(RequestScratch { id, dir })
    }
}

/// Per-request files inside the workspace
#[derive(Debug)]
pub struct RequestScratch {
    id: Uuid,
    dir: PathBuf,
}

impl RequestScratch {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn witness_path(&self) -> PathBuf {
        self.dir.join("witness")
    }

    pub fn proof_path(&self) -> PathBuf {
        self.dir.join("proof.json")
    }

    pub fn verify_input_path(&self) -> PathBuf {
        self.dir.join("proof_to_verify.json")
    }

    /// Remove the request directory; failures are only logged
    pub async fn cleanup(self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.dir).await {
            warn!("Failed to remove request directory {}: {}", self.dir.display(), e);
        } else {
            debug!("Removed request directory {}", self.id);
        }
    }
}
