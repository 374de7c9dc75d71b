//! Deterministic stand-in proofs for when the toolchain is not ready.
//!
//! Nothing here is cryptographically meaningful. Simulated artifacts have
//! the same shape as real ones so downstream code is path-agnostic.

use chrono::Utc;
use pramaan_common::{G16Proof, KeyPair, ProofArtifact};
use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

/// Hex digits per proof element (64-digit digest split eight ways)
const SEGMENT_DIGITS: usize = 8;

/// Hex digits kept from the secret in the public input
const INPUT_DIGITS: usize = 64;

pub struct Simulator {
    failure_rate: f64,
}

impl Simulator {
    /// `failure_rate` is the chance a structural verification is forced to fail
    pub fn new(failure_rate: f64) -> Self {
        let failure_rate = if failure_rate.is_nan() {
            0.0
        } else {
            failure_rate.clamp(0.0, 1.0)
        };
        Self { failure_rate }
    }

    pub fn failure_rate(&self) -> f64 {
        self.failure_rate
    }

    /// Fresh time-based tokens, tagged as simulated
    pub fn generate_keys(&self) -> KeyPair {
        let stamp = Utc::now().timestamp_millis();
        let nonce = Uuid::new_v4().simple().to_string();
        KeyPair::synthetic(
            format!("sim-proving-key-{}-{}", stamp, &nonce[..8]),
            format!("sim-verification-key-{}-{}", stamp, &nonce[..8]),
        )
    }

    /// Digest of `secret ‖ proving_key_ref`, sliced across the eight proof points
    pub fn simulate_proof(&self, secret: &[u8], proving_key_ref: &str) -> ProofArtifact {
        let mut hasher = Sha256::new();
        hasher.update(secret);
        hasher.update(proving_key_ref.as_bytes());
        let digest = hex::encode(hasher.finalize());

        let segment = |i: usize| {
            format!(
                "0x{}",
                &digest[i * SEGMENT_DIGITS..(i + 1) * SEGMENT_DIGITS]
            )
        };

        let mut secret_hex = hex::encode(secret);
        secret_hex.truncate(INPUT_DIGITS);

        debug!("Simulated proof generated");

        ProofArtifact::g16(
            G16Proof {
                a: [segment(0), segment(1)],
                b: [[segment(2), segment(3)], [segment(4), segment(5)]],
                c: [segment(6), segment(7)],
            },
            vec![format!("0x{:0>width$}", secret_hex, width = INPUT_DIGITS)],
        )
    }

    /// Random pass/fail for demo environments only; never a security decision
    pub fn structural_verify(&self) -> bool {
        !rand::thread_rng().gen_bool(self.failure_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_proof_is_deterministic() {
        let simulator = Simulator::new(0.1);
        let first = simulator.simulate_proof(b"alice@example.com", "sim-proving-key-1");
        let second = simulator.simulate_proof(b"alice@example.com", "sim-proving-key-1");
        assert_eq!(first, second);
        first.validate().unwrap();
    }

    #[test]
    fn test_distinct_secrets_differ() {
        let simulator = Simulator::new(0.1);
        let alice = simulator.simulate_proof(b"alice@example.com", "key");
        let bob = simulator.simulate_proof(b"bob@example.com", "key");
        assert_ne!(alice.proof, bob.proof);
        assert_ne!(alice.inputs, bob.inputs);
    }

    #[test]
    fn test_key_changes_proof() {
        let simulator = Simulator::new(0.1);
        assert_ne!(
            simulator.simulate_proof(b"alice", "key-1").proof,
            simulator.simulate_proof(b"alice", "key-2").proof
        );
    }

    #[test]
    fn test_input_is_fixed_width_secret_hex() {
        let simulator = Simulator::new(0.1);

        let short = simulator.simulate_proof(b"ab", "key");
        assert_eq!(short.inputs, vec![format!("0x{}6162", "0".repeat(60))]);

        let long = simulator.simulate_proof(&[0xaa; 100], "key");
        assert_eq!(long.inputs[0], format!("0x{}", "a".repeat(64)));

        let empty = simulator.simulate_proof(b"", "key");
        empty.validate().unwrap();
    }

    #[test]
    fn test_synthetic_keys_are_fresh_and_tagged() {
        let simulator = Simulator::new(0.1);
        let first = simulator.generate_keys();
        let second = simulator.generate_keys();
        assert!(first.simulated);
        assert!(first.proving_key_ref.starts_with("sim-proving-key-"));
        assert_ne!(first, second);
    }

    #[test]
    fn test_structural_verify_extremes() {
        assert!((0..100).all(|_| Simulator::new(0.0).structural_verify()));
        assert!((0..100).all(|_| !Simulator::new(1.0).structural_verify()));
        assert_eq!(Simulator::new(f64::NAN).failure_rate(), 0.0);
        assert_eq!(Simulator::new(7.0).failure_rate(), 1.0);
    }
}
