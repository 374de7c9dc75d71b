//! Configuration management for the proof service
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::service::ServiceOptions;
use crate::toolchain::{ProcessToolchain, Toolchain};
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Where the ZoKrates CLI runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainMode {
    /// `zokrates/zokrates` image through `docker run`
    Docker,
    /// A `zokrates` binary on the host
    Local,
    /// In-process emulation, no external dependencies
    Mock,
}

impl FromStr for ToolchainMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docker" => Ok(ToolchainMode::Docker),
            "local" => Ok(ToolchainMode::Local),
            "mock" => Ok(ToolchainMode::Mock),
            other => anyhow::bail!("Unknown TOOLCHAIN_MODE: {} (expected docker/local/mock)", other),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory shared with the toolchain
    pub workspace_dir: PathBuf,

    pub toolchain_mode: ToolchainMode,

    /// Docker image providing the ZoKrates CLI
    pub docker_image: String,

    /// ZoKrates binary inside the container
    pub container_binary: String,

    /// Mount point of the workspace inside the container
    pub container_workspace: String,

    /// ZoKrates binary on the host (local mode)
    pub local_binary: PathBuf,

    /// Per-command timeout; `None` lets a stuck command run forever
    pub command_timeout: Option<Duration>,

    /// Chance a simulated verification is forced to fail
    pub simulated_failure_rate: f64,

    /// Proof freshness window in seconds
    pub proof_ttl_secs: u64,

    /// Real-path requests allowed in the workspace at once
    pub max_concurrent_proofs: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        let config = Config {
            workspace_dir: env::var("PRAMAAN_WORKSPACE")
                .unwrap_or_else(|_| "./zokrates-workspace".to_string())
                .into(),

            toolchain_mode: env::var("TOOLCHAIN_MODE")
                .unwrap_or_else(|_| "docker".to_string())
                .parse()?,

            docker_image: env::var("ZOKRATES_IMAGE")
                .unwrap_or_else(|_| "zokrates/zokrates:latest".to_string()),

            container_binary: env::var("ZOKRATES_CONTAINER_BIN")
                .unwrap_or_else(|_| "/home/zokrates/.zokrates/bin/zokrates".to_string()),

            container_workspace: env::var("ZOKRATES_CONTAINER_WORKSPACE")
                .unwrap_or_else(|_| "/home/zokrates/workspace".to_string()),

            local_binary: env::var("ZOKRATES_BIN")
                .unwrap_or_else(|_| "zokrates".to_string())
                .into(),

            command_timeout: env::var("TOOLCHAIN_TIMEOUT_SECS")
                .ok()
                .map(|secs| secs.parse::<u64>().map(Duration::from_secs))
                .transpose()
                .context("Invalid TOOLCHAIN_TIMEOUT_SECS")?,

            simulated_failure_rate: env::var("SIMULATED_FAILURE_RATE")
                .unwrap_or_else(|_| "0.1".to_string())
                .parse()
                .context("Invalid SIMULATED_FAILURE_RATE")?,

            proof_ttl_secs: env::var("PROOF_TTL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("Invalid PROOF_TTL_SECS")?,

            max_concurrent_proofs: env::var("MAX_CONCURRENT_PROOFS")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .context("Invalid MAX_CONCURRENT_PROOFS")?,
        };

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.simulated_failure_rate) {
            anyhow::bail!("SIMULATED_FAILURE_RATE must be between 0 and 1");
        }

        if self.proof_ttl_secs == 0 {
            anyhow::bail!("PROOF_TTL_SECS must be greater than 0");
        }

        if self.max_concurrent_proofs == 0 {
            anyhow::bail!("MAX_CONCURRENT_PROOFS must be greater than 0");
        }

        if self.command_timeout == Some(Duration::ZERO) {
            anyhow::bail!("TOOLCHAIN_TIMEOUT_SECS must be greater than 0");
        }

        Ok(())
    }

    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            simulated_failure_rate: self.simulated_failure_rate,
            proof_ttl: Duration::from_secs(self.proof_ttl_secs),
            max_concurrent_proofs: self.max_concurrent_proofs,
        }
    }

    /// Build the runner for the configured mode
    pub fn toolchain(&self) -> Result<Arc<dyn Toolchain>> {
        let toolchain: Arc<dyn Toolchain> = match self.toolchain_mode {
            ToolchainMode::Docker => Arc::new(
                ProcessToolchain::docker(
                    &self.workspace_dir,
                    &self.docker_image,
                    &self.container_binary,
                    &self.container_workspace,
                )
                .with_timeout(self.command_timeout),
            ),
            ToolchainMode::Local => Arc::new(
                ProcessToolchain::local(&self.workspace_dir, &self.local_binary)
                    .with_timeout(self.command_timeout),
            ),
            #[cfg(feature = "mock")]
            ToolchainMode::Mock => Arc::new(crate::toolchain::MockToolchain::new()),
            #[cfg(not(feature = "mock"))]
            ToolchainMode::Mock => {
                anyhow::bail!("TOOLCHAIN_MODE=mock requires the `mock` feature")
            }
        };

        Ok(toolchain)
    }
}
