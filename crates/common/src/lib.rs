pub mod artifact;
pub mod error;
pub mod field;
pub mod history;
pub mod keys;

pub use artifact::{G16Proof, ProofArtifact, DEFAULT_CURVE, DEFAULT_SCHEME};
pub use error::{ArtifactError, PipelineError, Result, ServiceFault};
pub use field::{FieldElement, FieldHasher, HashedPair, FIELD_PRIME};
pub use history::{ProofHistoryEntry, ProofStatus};
pub use keys::KeyPair;
