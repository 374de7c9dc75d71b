//! Pramaan prover CLI
//!
//! Commands:
//! - status: bring the toolchain up and report readiness
//! - keys: print the key pair callers should use
//! - prove: generate a proof that a secret matches a stored identifier
//! - verify: verify a proof file
//! - hash: print the field elements registered for an identifier
//! - verifier: print the exported verifier contract

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pramaan_common::FieldHasher;
use pramaan_proof_service::{Config, ProofService};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pramaan-prover")]
#[command(about = "ZoKrates-backed zero-knowledge authentication prover")]
struct Cli {
    /// Seconds to wait for toolchain bring-up before using simulated proofs
    #[arg(long, default_value_t = 600)]
    wait_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bring the toolchain up and report readiness
    Status,

    /// Print the proving/verification key references
    Keys,

    /// Prove that a secret matches a stored identifier
    Prove {
        /// Live secret (e.g. biometric or identity value)
        #[arg(short, long)]
        secret: String,

        /// Identifier registered for the user
        #[arg(short, long)]
        identifier: String,

        /// Write the proof JSON here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Verify a proof JSON file
    Verify {
        /// Proof file produced by `prove`
        #[arg(short, long)]
        proof: PathBuf,

        /// Verification key reference
        #[arg(short = 'k', long, default_value = "")]
        verification_key: String,
    },

    /// Print the two field elements stored for an identifier
    Hash {
        #[arg(short, long)]
        input: String,
    },

    /// Print the exported verifier contract
    Verifier,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pramaan_proof_service=debug,pramaan_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Commands::Hash { input } = &cli.command {
        let pair = FieldHasher::hash(input);
        println!("{}", serde_json::json!({
            "part1": pair.part1.to_decimal(),
            "part2": pair.part2.to_decimal(),
        }));
        return Ok(());
    }

    let config = Config::from_env().context("Failed to load configuration")?;
    info!("Workspace: {}", config.workspace_dir.display());
    info!("Toolchain mode: {:?}", config.toolchain_mode);

    let service = ProofService::from_config(&config)?;
    service.start();

    if service
        .readiness()
        .wait_settled(Duration::from_secs(cli.wait_secs))
        .await
        .is_none()
    {
        warn!(
            "Toolchain bring-up still running after {}s; continuing with simulated proofs",
            cli.wait_secs
        );
    }

    match cli.command {
        Commands::Status => {
            println!("{}", serde_json::to_string_pretty(&service.status())?);
        }
        Commands::Keys => {
            println!("{}", serde_json::to_string_pretty(&service.generate_keys())?);
        }
        Commands::Prove {
            secret,
            identifier,
            out,
        } => {
            let keys = service.generate_keys();
            let proof = service
                .generate_proof(&secret, &keys.proving_key_ref, &identifier)
                .await;
            let document = serde_json::to_string_pretty(&serde_json::json!({
                "proof": proof,
                "verificationKey": keys.verification_key_ref,
            }))?;

            match out {
                Some(path) => {
                    std::fs::write(&path, document)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Proof written to {}", path.display());
                }
                None => println!("{}", document),
            }
        }
        Commands::Verify {
            proof,
            verification_key,
        } => {
            let text = std::fs::read_to_string(&proof)
                .with_context(|| format!("Failed to read {}", proof.display()))?;
            let document: serde_json::Value =
                serde_json::from_str(&text).context("Proof file is not valid JSON")?;

            // Accept both the `prove` output envelope and a bare artifact
            let artifact = document.get("proof").filter(|p| p.get("proof").is_some());
            let artifact = artifact.unwrap_or(&document);
            let key = document
                .get("verificationKey")
                .and_then(|k| k.as_str())
                .unwrap_or(&verification_key);

            let verification = service.verify_proof(artifact, key).await;
            let history = verification.history_entry();
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "valid": verification.valid,
                    "isRealProof": verification.is_real_proof,
                    "fault": verification.fault.map(|f| f.to_string()),
                    "history": history,
                }))?
            );
        }
        Commands::Verifier => match service.verifier_contract() {
            Some(contract) => println!("{}", contract),
            None => anyhow::bail!("Verifier unavailable: {}", service.status().message),
        },
        Commands::Hash { .. } => {}
    }

    Ok(())
}
