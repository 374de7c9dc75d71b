//! Whether the real toolchain pipeline is usable
//!
//! The state lives in a `watch` channel. The sender is only touched by
//! [`ReadinessStateMachine::begin_initialization`] and the bring-up task it
//! spawns. Readers take non-blocking snapshots or subscribe. `Ready` and
//! `Failed` are terminal for the life of the process.

use crate::orchestrator::{PipelineOrchestrator, SetupOutput};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub enum ReadinessState {
    Uninitialized,
    Initializing,
    Ready(Arc<SetupOutput>),
    Failed(String),
}

impl ReadinessState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ReadinessState::Ready(_))
    }

    /// `Ready` or `Failed`
    pub fn is_settled(&self) -> bool {
        matches!(self, ReadinessState::Ready(_) | ReadinessState::Failed(_))
    }

    pub fn message(&self) -> String {
        match self {
            ReadinessState::Uninitialized => {
                "ZoKrates bring-up has not started; using simulated proofs".to_string()
            }
            ReadinessState::Initializing => {
                "ZoKrates bring-up in progress; using simulated proofs".to_string()
            }
            ReadinessState::Ready(_) => "ZoKrates is ready; generating real proofs".to_string(),
            ReadinessState::Failed(reason) => {
                format!("ZoKrates unavailable ({}); using simulated proofs", reason)
            }
        }
    }
}

/// Snapshot returned to status queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadinessStatus {
    pub ready: bool,
    pub message: String,
}

pub struct ReadinessStateMachine {
    tx: Arc<watch::Sender<ReadinessState>>,
    started: AtomicBool,
    started_at: OnceLock<Instant>,
}

impl ReadinessStateMachine {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ReadinessState::Uninitialized);
        Self {
            tx: Arc::new(tx),
            started: AtomicBool::new(false),
            started_at: OnceLock::new(),
        }
    }

    /// Move to `Initializing` and run bring-up in a background task.
    ///
    /// Only the first call starts anything; later calls return `None`. The
    /// task is never cancelled or retried.
    pub fn begin_initialization(
        &self,
        orchestrator: Arc<PipelineOrchestrator>,
    ) -> Option<JoinHandle<()>> {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("Toolchain bring-up already started; ignoring");
            return None;
        }

        let _ = self.started_at.set(Instant::now());
        self.tx.send_replace(ReadinessState::Initializing);

        let tx = Arc::clone(&self.tx);
        Some(tokio::spawn(async move {
            info!("Starting ZoKrates bring-up in background");

            let next = match orchestrator.run_setup_sequence().await {
                Ok(output) => {
                    info!("ZoKrates bring-up completed; real proofs enabled");
                    ReadinessState::Ready(Arc::new(output))
                }
                Err(e) => {
                    error!("ZoKrates bring-up failed at {} stage: {}", e.stage(), e);
                    ReadinessState::Failed(e.to_string())
                }
            };

            tx.send_replace(next);
        }))
    }

    pub fn state(&self) -> ReadinessState {
        self.tx.borrow().clone()
    }

    pub fn status(&self) -> ReadinessStatus {
        let state = self.tx.borrow();
        ReadinessStatus {
            ready: state.is_ready(),
            message: state.message(),
        }
    }

    /// Keys and verifier from bring-up, once `Ready`
    pub fn setup_output(&self) -> Option<Arc<SetupOutput>> {
        match &*self.tx.borrow() {
            ReadinessState::Ready(output) => Some(Arc::clone(output)),
            _ => None,
        }
    }

    /// Receiver for supervisors that want to observe transitions
    pub fn subscribe(&self) -> watch::Receiver<ReadinessState> {
        self.tx.subscribe()
    }

    /// Wait until bring-up settles, or give up after `timeout`.
    ///
    /// Returns `None` on timeout; the state is left untouched so a supervisor
    /// decides what to do about a stuck toolchain.
    pub async fn wait_settled(&self, timeout: Duration) -> Option<ReadinessState> {
        let mut rx = self.subscribe();
        let settled = tokio::time::timeout(timeout, rx.wait_for(ReadinessState::is_settled)).await;
        match settled {
            Ok(Ok(state)) => Some(state.clone()),
            _ => None,
        }
    }

    /// How long bring-up has been running, while it is still running
    pub fn initializing_for(&self) -> Option<Duration> {
        match *self.tx.borrow() {
            ReadinessState::Initializing => self.started_at.get().map(Instant::elapsed),
            _ => None,
        }
    }
}

impl Default for ReadinessStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
