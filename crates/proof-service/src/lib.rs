//! Pramaan Proof Service
//!
//! Drives the ZoKrates toolchain through compile, trusted setup, witness
//! generation, proving and verification, and falls back to deterministic
//! simulated proofs whenever the toolchain is not usable.

pub mod config;
pub mod orchestrator;
pub mod readiness;
pub mod service;
pub mod simulator;
pub mod toolchain;
pub mod workspace;

pub use config::{Config, ToolchainMode};
pub use orchestrator::{PipelineOrchestrator, SetupOutput};
pub use readiness::{ReadinessState, ReadinessStateMachine, ReadinessStatus};
pub use service::{GeneratedProof, ProofService, ServiceOptions, Verification};
pub use simulator::Simulator;
pub use toolchain::{Stage, Toolchain, ToolchainArg, ToolchainError, ToolchainOutput};
pub use workspace::{RequestScratch, Workspace};
