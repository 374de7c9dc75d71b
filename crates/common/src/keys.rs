use serde::{Deserialize, Serialize};

/// Opaque references to a proving/verification key pair.
///
/// Real pairs point at key files produced by trusted setup. Simulated pairs
/// are synthetic tokens with no cryptographic meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    pub proving_key_ref: String,
    pub verification_key_ref: String,
    /// Set when the pair was minted without a working toolchain
    pub simulated: bool,
}

impl KeyPair {
    pub fn real(proving_key_ref: String, verification_key_ref: String) -> Self {
        Self {
            proving_key_ref,
            verification_key_ref,
            simulated: false,
        }
    }

    pub fn synthetic(proving_key_ref: String, verification_key_ref: String) -> Self {
        Self {
            proving_key_ref,
            verification_key_ref,
            simulated: true,
        }
    }
}
