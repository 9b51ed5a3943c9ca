// src/app/collector.rs
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use super::context::RunContext;
use super::workers::collect_target;
use crate::agent::SERVER_CERT_NAME;
use crate::discovery::Target;
use crate::error::AggregationError;
use crate::types::{CollectionResult, ComponentType};

pub const DUPLICATE_WARNING: &str = "duplicate entry from another pod dropped";
pub const KUBELET_CA_WARNING: &str =
    "apiserver does not verify kubelet serving certificates (--kubelet-certificate-authority unset)";

/// A fixed pool of workers draining a target queue into one result channel.
pub struct Collector {
    ctx: Arc<RunContext>,
    queue: Option<mpsc::UnboundedSender<Target>>,
    results: mpsc::UnboundedReceiver<CollectionResult>,
    workers: JoinSet<()>,
}

impl Collector {
    pub fn start(ctx: Arc<RunContext>, workers: usize) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel::<Target>();
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let queue_rx = Arc::new(Mutex::new(queue_rx));

        let mut set = JoinSet::new();
        for id in 0..workers.max(1) {
            set.spawn(worker(id, ctx.clone(), queue_rx.clone(), results_tx.clone()));
        }

        Self {
            ctx,
            queue: Some(queue_tx),
            results: results_rx,
            workers: set,
        }
    }

    pub fn dispatch(&self, targets: Vec<Target>) {
        let Some(queue) = &self.queue else {
            return;
        };
        self.ctx.progress.add_targets(targets.len() as u64);
        for target in targets {
            // workers only stop once the queue is closed
            let _ = queue.send(target);
        }
    }

    /// Closes the queue and gathers every result once all workers are done.
    pub async fn finish(mut self) -> Result<Vec<CollectionResult>, AggregationError> {
        self.queue.take();

        let mut results = Vec::new();
        while let Some(result) = self.results.recv().await {
            results.push(result);
        }

        while let Some(joined) = self.workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Collection worker failed");
                return Err(AggregationError::WorkerFailed(e.to_string()));
            }
        }
        debug!(targets = self.ctx.completed(), rows = results.len(), "Collection finished");

        let mut results = fold_duplicates(results);
        if !self.ctx.kubelet_ca_seen() {
            annotate_unverified_kubelets(&mut results);
        }
        Ok(results)
    }
}

async fn worker(
    id: usize,
    ctx: Arc<RunContext>,
    queue: Arc<Mutex<mpsc::UnboundedReceiver<Target>>>,
    results: mpsc::UnboundedSender<CollectionResult>,
) {
    loop {
        let next = queue.lock().await.recv().await;
        let Some(target) = next else {
            break;
        };
        debug!(worker = id, component = %target.component(), pod = %target.pod().name, "Collecting");

        for result in collect_target(&ctx, &target).await {
            if results.send(result).is_err() {
                return;
            }
        }
        ctx.target_done();
    }
}

/// Keeps the first row of every `(type, node, name)` triple and notes the
/// dropped ones in its warning.
fn fold_duplicates(results: Vec<CollectionResult>) -> Vec<CollectionResult> {
    let mut index = HashMap::new();
    let mut unique: Vec<CollectionResult> = Vec::with_capacity(results.len());

    for result in results {
        let key = (
            result.entry.kind,
            result.entry.node.clone(),
            result.entry.name.clone(),
        );
        match index.get(&key) {
            Some(&i) => {
                warn!(kind = %key.0, node = %key.1, name = %key.2, "Dropping duplicate report entry");
                let kept: &mut CollectionResult = &mut unique[i];
                if kept.warning.is_empty() {
                    kept.warning = DUPLICATE_WARNING.to_string();
                } else if !kept.warning.contains(DUPLICATE_WARNING) {
                    kept.warning = format!("{}; {}", kept.warning, DUPLICATE_WARNING);
                }
            }
            None => {
                index.insert(key, unique.len());
                unique.push(result);
            }
        }
    }
    unique
}

fn annotate_unverified_kubelets(results: &mut [CollectionResult]) {
    for result in results.iter_mut().filter(|r| {
        r.entry.kind == ComponentType::Kubelet && r.entry.name == SERVER_CERT_NAME && r.is_ok()
    }) {
        result.warning = KUBELET_CA_WARNING.to_string();
    }
}
