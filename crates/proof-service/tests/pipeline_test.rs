//! End-to-end tests for the proof service against the mock toolchain
//!
//! Run with: cargo test --package pramaan-proof-service --features mock

use pramaan_common::{FieldHasher, ServiceFault};
use pramaan_proof_service::toolchain::MockToolchain;
use pramaan_proof_service::{
    PipelineOrchestrator, ProofService, ServiceOptions, Stage, Workspace,
};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn build_service(dir: &Path, mock: MockToolchain, options: ServiceOptions) -> ProofService {
    let orchestrator = PipelineOrchestrator::new(Workspace::new(dir), Arc::new(mock));
    ProofService::new(orchestrator, options)
}

async fn settled_service(dir: &Path, mock: MockToolchain, options: ServiceOptions) -> ProofService {
    let service = build_service(dir, mock, options);
    service
        .start()
        .expect("bring-up already started")
        .await
        .expect("bring-up task panicked");
    service
}

#[tokio::test]
async fn test_failed_toolchain_falls_back_to_simulation() {
    let dir = tempfile::tempdir().unwrap();
    let service = settled_service(
        dir.path(),
        MockToolchain::new().failing_at(Stage::Version),
        ServiceOptions::default(),
    )
    .await;

    let status = service.status();
    assert!(!status.ready);
    assert!(status.message.contains("Toolchain unavailable"));

    let keys = service.generate_keys();
    assert!(keys.simulated);
    assert!(keys.proving_key_ref.starts_with("sim-proving-key-"));

    let proof = service
        .generate_proof("alice@example.com", &keys.proving_key_ref, "alice@example.com")
        .await;
    assert!(!proof.is_real_proof);
    assert!(matches!(proof.notice, Some(ServiceFault::NotReady(_))));
    proof.artifact.validate().unwrap();

    let passes = {
        let mut passes = 0;
        for _ in 0..1000 {
            let verification = service
                .verify_artifact(&proof.artifact, &keys.verification_key_ref)
                .await;
            assert!(!verification.is_real_proof);
            if verification.valid {
                passes += 1;
            }
        }
        passes
    };
    assert!(
        (850..=950).contains(&passes),
        "simulated pass count out of range: {}",
        passes
    );
}

#[tokio::test]
async fn test_ready_toolchain_proves_matching_identifier() {
    let dir = tempfile::tempdir().unwrap();
    let service = settled_service(dir.path(), MockToolchain::new(), ServiceOptions::default()).await;
    assert!(service.status().ready);

    let keys = service.generate_keys();
    assert!(!keys.simulated);
    assert!(service.verifier_contract().unwrap().contains("contract Verifier"));

    let proof = service
        .generate_proof("alice@example.com", &keys.proving_key_ref, "alice@example.com")
        .await;
    assert!(proof.is_real_proof);
    assert!(proof.notice.is_none());
    assert_eq!(proof.artifact.inputs.len(), 3);

    let verification = service
        .verify_proof(&proof.artifact.to_value(), &keys.verification_key_ref)
        .await;
    assert!(verification.valid);
    assert!(verification.is_real_proof);
    assert!(verification.fault.is_none());
}

#[tokio::test]
async fn test_ready_toolchain_rejects_wrong_identifier() {
    let dir = tempfile::tempdir().unwrap();
    let service = settled_service(dir.path(), MockToolchain::new(), ServiceOptions::default()).await;
    let keys = service.generate_keys();

    // The circuit assertion fails, so the caller gets a simulated proof
    let proof = service
        .generate_proof("mallory@example.com", &keys.proving_key_ref, "alice@example.com")
        .await;
    assert!(!proof.is_real_proof);
    assert!(proof.notice.is_none());
    proof.artifact.validate().unwrap();

    let verification = service
        .verify_artifact(&proof.artifact, &keys.verification_key_ref)
        .await;
    assert!(!verification.valid);
    assert!(verification.is_real_proof);
    assert_eq!(verification.fault, Some(ServiceFault::VerificationFailed));
}

async fn assert_requests_isolated(max_concurrent_proofs: usize) {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockToolchain::new().with_request_delay(Duration::from_millis(50));
    let options = ServiceOptions {
        max_concurrent_proofs,
        ..ServiceOptions::default()
    };
    let service = settled_service(dir.path(), mock, options).await;
    let keys = service.generate_keys();

    let (alice, bob) = tokio::join!(
        service.generate_proof("alice@example.com", &keys.proving_key_ref, "alice@example.com"),
        service.generate_proof("bob@example.com", &keys.proving_key_ref, "bob@example.com"),
    );

    for (proof, identifier) in [(alice, "alice@example.com"), (bob, "bob@example.com")] {
        assert!(proof.is_real_proof);
        let expected = FieldHasher::hash(identifier);
        assert_eq!(proof.artifact.inputs[0], expected.part1.to_hex());
        assert_eq!(proof.artifact.inputs[1], expected.part2.to_hex());
    }

    // Scratch directories are gone once requests finish
    let leftover = std::fs::read_dir(dir.path().join("requests"))
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftover, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_serialized() {
    assert_requests_isolated(1).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_in_parallel_scratch() {
    assert_requests_isolated(4).await;
}

#[tokio::test]
async fn test_malformed_proof_rejected_in_every_state() {
    let malformed = [
        json!({ "proof": { "a": ["0x1", "0x2"], "c": ["0x3", "0x4"] }, "inputs": ["0x1"] }),
        json!({
            "proof": { "a": ["0x1"], "b": [["0x1", "0x2"], ["0x3", "0x4"]], "c": ["0x5", "0x6"] },
            "inputs": ["0x1"]
        }),
        json!({ "inputs": [] }),
        json!("not a proof"),
    ];

    let failed_dir = tempfile::tempdir().unwrap();
    let ready_dir = tempfile::tempdir().unwrap();
    let failed = settled_service(
        failed_dir.path(),
        MockToolchain::new().failing_at(Stage::Compile),
        ServiceOptions {
            simulated_failure_rate: 0.0,
            ..ServiceOptions::default()
        },
    )
    .await;
    let ready = settled_service(ready_dir.path(), MockToolchain::new(), ServiceOptions::default()).await;

    for service in [&failed, &ready] {
        for proof in &malformed {
            let verification = service.verify_proof(proof, "verification.key").await;
            assert!(!verification.valid);
            assert!(matches!(
                verification.fault,
                Some(ServiceFault::MalformedProof(_))
            ));
        }
    }
}

#[tokio::test]
async fn test_status_is_stable_once_settled() {
    let failed_dir = tempfile::tempdir().unwrap();
    let failed = settled_service(
        failed_dir.path(),
        MockToolchain::new().without_artifact(Stage::Setup),
        ServiceOptions::default(),
    )
    .await;

    let first = failed.status();
    assert!(!first.ready);
    assert!(failed.start().is_none());
    for _ in 0..20 {
        assert_eq!(failed.status(), first);
    }

    let ready_dir = tempfile::tempdir().unwrap();
    let ready = settled_service(ready_dir.path(), MockToolchain::new(), ServiceOptions::default()).await;
    let first = ready.status();
    assert!(first.ready);
    for _ in 0..20 {
        assert_eq!(ready.status(), first);
    }
}

#[tokio::test]
async fn test_requests_served_during_bring_up() {
    let dir = tempfile::tempdir().unwrap();
    let service = build_service(
        dir.path(),
        MockToolchain::new().stalling_at(Stage::Compile),
        ServiceOptions::default(),
    );
    let handle = service.start().unwrap();

    assert!(service
        .readiness()
        .wait_settled(Duration::from_millis(50))
        .await
        .is_none());

    let proof = service.generate_proof("alice", "key", "alice").await;
    assert!(!proof.is_real_proof);
    assert!(service.status().message.contains("in progress"));

    handle.abort();
}

#[tokio::test]
async fn test_both_paths_produce_well_formed_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let service = build_service(dir.path(), MockToolchain::new(), ServiceOptions::default());

    let simulated = service.generate_proof("alice", "key", "alice").await;

    service.start().unwrap().await.unwrap();
    let real = service.generate_proof("alice", "key", "alice").await;

    for proof in [simulated, real] {
        let value = serde_json::to_value(&proof).unwrap();
        assert_eq!(value["proof"]["a"].as_array().unwrap().len(), 2);
        assert_eq!(value["proof"]["b"].as_array().unwrap().len(), 2);
        assert_eq!(value["proof"]["b"][0].as_array().unwrap().len(), 2);
        assert_eq!(value["proof"]["c"].as_array().unwrap().len(), 2);
        assert!(!value["inputs"].as_array().unwrap().is_empty());
        assert!(value["isRealProof"].is_boolean());
        assert_eq!(value["scheme"], "g16");
        assert_eq!(value["curve"], "bn128");
        proof.artifact.validate().unwrap();
    }
}
