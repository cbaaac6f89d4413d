//! Operation dispatcher: the façade callers submit requests through.

use crate::operation::{
    OperationFailure, OperationKey, OperationKind, OperationOutcome, OperationRequest,
    FailureKind, MANAGER_TOOL,
};
use crate::process::ChildRegistry;
use crate::transcript::OperationDetails;
use crate::worker::OperationWorker;
use crate::OperationError;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, oneshot, Semaphore};
use tracing::{debug, info, warn};

/// How to reach the external tool. Injected so tests can point the manager
/// at a stub executable instead of the real thing.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// Path or name of the container-manager executable.
    pub executable: PathBuf,
    /// Upper bound on concurrently running search-cache children.
    pub search_slots: usize,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from(MANAGER_TOOL),
            search_slots: 4,
        }
    }
}

/// Event stream shared by all observers: transcript growth is delivered via
/// [`OperationDetails::subscribe`]; this channel carries terminal
/// notifications. Failures appear here and nowhere else — there is no
/// separate exception path.
#[derive(Debug, Clone)]
pub enum ManagerEvent {
    /// An operation reached its terminal state.
    Finished { key: OperationKey, success: bool },
    /// Terminal failure details: (short description, tool diagnostics).
    Failed {
        key: OperationKey,
        description: String,
        details: String,
    },
}

/// Caller-side handle on a submitted operation.
pub struct OperationHandle {
    key: OperationKey,
    kind: OperationKind,
    rx: oneshot::Receiver<OperationOutcome>,
}

impl OperationHandle {
    pub fn key(&self) -> &OperationKey {
        &self.key
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Suspend until the worker reaches its terminal state.
    pub async fn wait(self) -> OperationOutcome {
        match self.rx.await {
            Ok(outcome) => outcome,
            // The worker task was torn down before completing (manager
            // shutdown); report it as a failure rather than panicking.
            Err(_) => OperationOutcome::Failure(OperationFailure {
                kind: FailureKind::OperationFailed,
                description: format!("Operation on {} was aborted", self.key),
                details: "the container manager was shut down".to_owned(),
            }),
        }
    }
}

struct ManagerInner {
    tool: ToolConfig,
    inflight: Mutex<HashSet<OperationKey>>,
    details: Arc<OperationDetails>,
    children: ChildRegistry,
    search_permits: Arc<Semaphore>,
    events: broadcast::Sender<ManagerEvent>,
}

/// Removes the key from the inflight set when the worker ends, on every
/// path: success, failure, or task teardown.
struct InflightGuard {
    inner: Arc<ManagerInner>,
    key: Option<OperationKey>,
}

impl InflightGuard {
    /// Free the key now instead of waiting for drop. Idempotent.
    fn release(&mut self) {
        if let Some(key) = self.key.take() {
            self.inner
                .inflight
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&key);
        }
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Creates workers on demand, serializes mutating operations per key, and
/// owns every live child process. Dropping the manager force-kills all
/// running child process trees.
pub struct ContainerManager {
    inner: Arc<ManagerInner>,
}

impl ContainerManager {
    pub fn new(tool: ToolConfig) -> Self {
        let (events, _) = broadcast::channel(64);
        let search_slots = tool.search_slots.max(1);
        Self {
            inner: Arc::new(ManagerInner {
                tool,
                inflight: Mutex::new(HashSet::new()),
                details: Arc::new(OperationDetails::new()),
                children: ChildRegistry::new(),
                search_permits: Arc::new(Semaphore::new(search_slots)),
                events,
            }),
        }
    }

    /// The transcript aggregator fed by all workers.
    pub fn transcripts(&self) -> Arc<OperationDetails> {
        Arc::clone(&self.inner.details)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ManagerEvent> {
        self.inner.events.subscribe()
    }

    /// Process-group ids of currently running tool children.
    pub fn active_process_groups(&self) -> Vec<i32> {
        self.inner.children.active_process_groups()
    }

    /// Submit an operation. Mutating requests whose key is already inflight
    /// are rejected synchronously with [`OperationError::AlreadyInProgress`];
    /// searches bypass the inflight set but draw from a bounded pool.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(
        &self,
        request: OperationRequest,
    ) -> Result<OperationHandle, OperationError> {
        request.validate()?;
        let kind = request.kind();
        let key = request.key();

        let guard_key = if kind.is_mutating() {
            // Check-then-insert under one lock acquisition; a competing
            // submit for the same key cannot interleave here.
            let mut inflight = self
                .inner
                .inflight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if inflight.contains(&key) {
                debug!(%key, operation = %kind, "rejecting: already in progress");
                return Err(OperationError::AlreadyInProgress(key));
            }
            inflight.insert(key.clone());
            Some(key.clone())
        } else {
            None
        };

        let (tx, rx) = oneshot::channel();
        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();
        tokio::spawn(async move {
            let mut inflight = InflightGuard {
                inner: Arc::clone(&inner),
                key: guard_key,
            };
            let _permit = if kind == OperationKind::SearchCache {
                inner
                    .search_permits
                    .clone()
                    .acquire_owned()
                    .await
                    .ok()
            } else {
                None
            };

            let worker = OperationWorker::new(request, Arc::clone(&inner.details));
            let outcome = worker.run(&inner.tool.executable, &inner.children).await;

            // The key must be free before any notification goes out: a
            // caller woken by the outcome may resubmit it immediately.
            inflight.release();

            if let OperationOutcome::Failure(failure) = &outcome {
                warn!(%task_key, "{}: {}", failure.description, failure.details.trim_end());
                let _ = inner.events.send(ManagerEvent::Failed {
                    key: task_key.clone(),
                    description: failure.description.clone(),
                    details: failure.details.clone(),
                });
            }
            let _ = inner.events.send(ManagerEvent::Finished {
                key: task_key,
                success: outcome.is_success(),
            });
            let _ = tx.send(outcome);
        });

        Ok(OperationHandle { key, kind, rx })
    }

    /// Kill every running child process group and forget all inflight keys.
    /// Workers whose child was killed still finish their bookkeeping and
    /// report a failure outcome.
    pub fn shutdown(&self) {
        info!("container manager shutting down; terminating active workers");
        self.inner.children.kill_all();
        self.inner
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Drop for ContainerManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
