use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome recorded for one authentication attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProofStatus {
    Success,
    Failure,
}

/// A verification outcome, ready for the user-record collaborator to persist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofHistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub status: ProofStatus,
    pub is_real_proof: bool,
}

impl ProofHistoryEntry {
    pub fn new(valid: bool, is_real_proof: bool) -> Self {
        Self {
            timestamp: Utc::now(),
            status: if valid {
                ProofStatus::Success
            } else {
                ProofStatus::Failure
            },
            is_real_proof,
        }
    }
}
