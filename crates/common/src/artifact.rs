//! The `{proof, inputs}` wire contract shared by prover and verifier
//!
//! Both the toolchain's `proof.json` and simulated proofs decode into
//! [`ProofArtifact`]. Fixed-size arrays make the `a`/`b`/`c` shapes part of
//! the type, so anything that deserializes already has the right shape.

use crate::error::ArtifactError;
use serde::{Deserialize, Serialize};

/// Maximum hex digits in a field element (32 bytes)
const MAX_ELEMENT_DIGITS: usize = 64;

/// Proving scheme written into every proof file
pub const DEFAULT_SCHEME: &str = "g16";

/// Curve written into every proof file
pub const DEFAULT_CURVE: &str = "bn128";

fn default_scheme() -> String {
    DEFAULT_SCHEME.to_string()
}

fn default_curve() -> String {
    DEFAULT_CURVE.to_string()
}

/// Groth16 proof points, hex-encoded field elements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct G16Proof {
    pub a: [String; 2],
    pub b: [[String; 2]; 2],
    pub c: [String; 2],
}

/// A proof together with its public inputs.
///
/// `scheme` and `curve` are required by `zokrates verify`; documents that
/// omit them get the `g16`/`bn128` defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofArtifact {
    #[serde(default = "default_scheme")]
    pub scheme: String,
    #[serde(default = "default_curve")]
    pub curve: String,
    pub proof: G16Proof,
    pub inputs: Vec<String>,
}

impl ProofArtifact {
    /// A Groth16 artifact on the default curve
    pub fn g16(proof: G16Proof, inputs: Vec<String>) -> Self {
        Self {
            scheme: default_scheme(),
            curve: default_curve(),
            proof,
            inputs,
        }
    }

    /// Decode and validate an artifact received from a caller
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ArtifactError> {
        let artifact: ProofArtifact = serde_json::from_value(value.clone())
            .map_err(|e| ArtifactError::Shape(e.to_string()))?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Decode and validate an artifact from JSON text (e.g. a `proof.json` file)
    pub fn from_json(text: &str) -> Result<Self, ArtifactError> {
        let artifact: ProofArtifact =
            serde_json::from_str(text).map_err(|e| ArtifactError::Shape(e.to_string()))?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Check the parts of the shape the type system does not enforce:
    /// at least one public input, and every element `0x`-prefixed hex
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.inputs.is_empty() {
            return Err(ArtifactError::EmptyInputs);
        }

        let [a0, a1] = &self.proof.a;
        let [[b00, b01], [b10, b11]] = &self.proof.b;
        let [c0, c1] = &self.proof.c;
        let points = [
            ("proof.a[0]", a0),
            ("proof.a[1]", a1),
            ("proof.b[0][0]", b00),
            ("proof.b[0][1]", b01),
            ("proof.b[1][0]", b10),
            ("proof.b[1][1]", b11),
            ("proof.c[0]", c0),
            ("proof.c[1]", c1),
        ];

        for (location, value) in points {
            check_element(location, value)?;
        }
        for (i, value) in self.inputs.iter().enumerate() {
            check_element(&format!("inputs[{}]", i), value)?;
        }

        Ok(())
    }

    /// Non-cryptographic comparison against a previously issued artifact
    pub fn matches(&self, other: &ProofArtifact) -> bool {
        self.proof == other.proof && self.inputs == other.inputs
    }

    /// The document handed to `zokrates verify -j`
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "scheme": self.scheme,
            "curve": self.curve,
            "proof": {
                "a": self.proof.a,
                "b": self.proof.b,
                "c": self.proof.c,
            },
            "inputs": self.inputs,
        })
    }
}

fn check_element(location: &str, value: &str) -> Result<(), ArtifactError> {
    let digits = value.strip_prefix("0x").unwrap_or("");
    let valid = !digits.is_empty()
        && digits.len() <= MAX_ELEMENT_DIGITS
        && digits.chars().all(|c| c.is_ascii_hexdigit());

    if valid {
        Ok(())
    } else {
        Err(ArtifactError::InvalidElement {
            location: location.to_string(),
            value: value.to_string(),
        })
    }
}
