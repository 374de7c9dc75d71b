//! Hashing of secrets and stored identifiers into circuit field elements

use num_bigint::BigUint;
use sha2::{Digest, Sha256};
use std::fmt;

/// Order of the BN254 scalar field, the toolchain's native field
pub const FIELD_PRIME: &str =
    "21888242871839275222246405745257275088548364400416034343698204186575808495617";

/// Big-endian bytes of [`FIELD_PRIME`]
const FIELD_PRIME_BE: [u8; 32] = [
    0x30, 0x64, 0x4e, 0x72, 0xe1, 0x31, 0xa0, 0x29, 0xb8, 0x50, 0x45, 0xb6, 0x81, 0x81, 0x58,
    0x5d, 0x28, 0x33, 0xe8, 0x48, 0x79, 0xb9, 0x70, 0x91, 0x43, 0xe1, 0xf5, 0x93, 0xf0, 0x00,
    0x00, 0x01,
];

fn field_prime() -> BigUint {
    BigUint::from_bytes_be(&FIELD_PRIME_BE)
}

/// An integer reduced modulo the field prime
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldElement(BigUint);

impl FieldElement {
    /// Reduce a big-endian integer into the field
    pub fn reduce(bytes_be: &[u8]) -> Self {
        Self(BigUint::from_bytes_be(bytes_be) % field_prime())
    }

    /// Parse a decimal string, rejecting values outside the field
    pub fn from_decimal(s: &str) -> Option<Self> {
        let value = BigUint::parse_bytes(s.as_bytes(), 10)?;
        (value < field_prime()).then_some(Self(value))
    }

    /// Decimal representation, as passed to the witness stage
    pub fn to_decimal(&self) -> String {
        self.0.to_str_radix(10)
    }

    /// `0x`-prefixed, zero-padded 32-byte hex, as found in proof files
    pub fn to_hex(&self) -> String {
        format!("0x{:0>64}", self.0.to_str_radix(16))
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

/// The two field elements derived from one hashed input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedPair {
    /// Reduction of the digest's high 128 bits
    pub part1: FieldElement,
    /// Reduction of the digest's low 128 bits
    pub part2: FieldElement,
}

/// Deterministic SHA-256 based mapping from bytes to a pair of field elements.
///
/// Used both when registering an identifier and when hashing the live secret,
/// so the circuit can compare the two without ever seeing the raw secret.
pub struct FieldHasher;

impl FieldHasher {
    pub fn hash(input: impl AsRef<[u8]>) -> HashedPair {
        let digest = Sha256::digest(input.as_ref());
        let (high, low) = digest.split_at(16);

        HashedPair {
            part1: FieldElement::reduce(high),
            part2: FieldElement::reduce(low),
        }
    }
}
