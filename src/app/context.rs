// src/app/context.rs
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cluster::PodExecutor;
use crate::config::AgentConfig;
use crate::ui::ProgressTracker;
use crate::utils::RetryPolicy;

/// Everything a collection worker shares with the rest of the run.
pub struct RunContext {
    pub executor: Arc<dyn PodExecutor>,
    pub agent_command: Vec<String>,
    pub retry: RetryPolicy,
    pub progress: ProgressTracker,
    pub cancel: CancellationToken,
    kubelet_ca_seen: AtomicBool,
    completed: AtomicUsize,
}

impl RunContext {
    pub fn new(
        executor: Arc<dyn PodExecutor>,
        agent: &AgentConfig,
        progress: ProgressTracker,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            executor,
            agent_command: agent.command.clone(),
            retry: agent.retry_policy(),
            progress,
            cancel,
            kubelet_ca_seen: AtomicBool::new(false),
            completed: AtomicUsize::new(0),
        }
    }

    /// Some API server verifies kubelet serving certificates.
    pub fn mark_kubelet_ca_seen(&self) {
        self.kubelet_ca_seen.store(true, Ordering::SeqCst);
    }

    pub fn kubelet_ca_seen(&self) -> bool {
        self.kubelet_ca_seen.load(Ordering::SeqCst)
    }

    pub fn target_done(&self) -> usize {
        self.progress.target_done();
        self.completed.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}
