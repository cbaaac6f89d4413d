//! Per-operation worker: drives one tool invocation from request to outcome.

use crate::operation::{
    FailureKind, OperationFailure, OperationOutcome, OperationPayload, OperationRequest,
};
use crate::process::{ChildRegistry, ToolError, ToolProcess};
use crate::transcript::OperationDetails;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace};

/// Lifecycle of one worker instance. `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Starting,
    Running,
    Succeeded,
    Failed,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkerState::Idle => "idle",
            WorkerState::Starting => "starting",
            WorkerState::Running => "running",
            WorkerState::Succeeded => "succeeded",
            WorkerState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Whether `from -> to` is a legal worker transition.
///
/// `Starting -> Failed` covers spawn failure; `Running` loops on itself for
/// every stdout chunk.
pub fn validate_transition(from: WorkerState, to: WorkerState) -> bool {
    matches!(
        (from, to),
        (WorkerState::Idle, WorkerState::Starting)
            | (WorkerState::Starting, WorkerState::Running | WorkerState::Failed)
            | (
                WorkerState::Running,
                WorkerState::Running | WorkerState::Succeeded | WorkerState::Failed
            )
    )
}

/// One worker per submitted request. Owns the tool invocation, interprets
/// its output and exit status, and reports a single [`OperationOutcome`].
pub struct OperationWorker {
    request: OperationRequest,
    transcript: Arc<OperationDetails>,
    state: WorkerState,
}

impl OperationWorker {
    pub fn new(request: OperationRequest, transcript: Arc<OperationDetails>) -> Self {
        Self {
            request,
            transcript,
            state: WorkerState::Idle,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    fn transition(&mut self, to: WorkerState) {
        debug_assert!(
            validate_transition(self.state, to),
            "illegal worker transition {} -> {}",
            self.state,
            to
        );
        trace!(from = %self.state, to = %to, "worker transition");
        self.state = to;
    }

    /// Run the operation to its terminal state.
    pub async fn run(mut self, executable: &Path, children: &ChildRegistry) -> OperationOutcome {
        let kind = self.request.kind();
        let key = self.request.key();
        let argv = self.request.argv();
        let stdin_payload = self.request.stdin_payload();

        debug!(operation = %kind, %key, "starting operation");
        self.transition(WorkerState::Starting);

        let proc =
            match ToolProcess::spawn(executable, &argv, stdin_payload.is_some(), children) {
                Ok(proc) => proc,
                Err(ToolError::Spawn(e) | ToolError::Io(e)) => {
                    self.transition(WorkerState::Failed);
                    debug!(operation = %kind, "tool failed to start: {e}");
                    return OperationOutcome::Failure(OperationFailure {
                        kind: FailureKind::ToolUnavailable,
                        description: format!("{} failed to start", executable.display()),
                        details: e.to_string(),
                    });
                }
            };
        self.transition(WorkerState::Running);

        // Each chunk goes to the aggregator in arrival order; the local copy
        // backs the details fallback when a tool dies with silent stderr and
        // stdout already consumed by streaming.
        let transcript = Arc::clone(&self.transcript);
        let chunk_key = key.clone();
        let mut streamed = String::new();
        let exit = match proc
            .complete(stdin_payload, |chunk| {
                transcript.update(&chunk_key, chunk);
                streamed.push_str(chunk);
            })
            .await
        {
            Ok(exit) => exit,
            Err(ToolError::Spawn(e) | ToolError::Io(e)) => {
                self.transition(WorkerState::Failed);
                return OperationOutcome::Failure(OperationFailure {
                    kind: FailureKind::OperationFailed,
                    description: self.request.failure_description(),
                    details: e.to_string(),
                });
            }
        };

        let outcome = classify(&self.request, exit.success(), &exit.stdout, &exit.stderr, &streamed);
        self.transition(if outcome.is_success() {
            WorkerState::Succeeded
        } else {
            WorkerState::Failed
        });
        debug!(operation = %kind, %key, state = %self.state, "operation finished");
        outcome
    }
}

/// Turn an exit status into a typed outcome.
fn classify(
    request: &OperationRequest,
    success: bool,
    stdout: &str,
    stderr: &str,
    streamed: &str,
) -> OperationOutcome {
    if success {
        return OperationOutcome::Success(success_payload(request, stdout));
    }

    // A search that exits nonzero with silent stderr means the cache simply
    // had no matches; only a non-empty stderr distinguishes a tool crash.
    if let OperationRequest::SearchCache { .. } = request {
        if stderr.is_empty() {
            return OperationOutcome::Success(OperationPayload::SearchResults(Vec::new()));
        }
    }

    let details = if !stderr.is_empty() {
        stderr.to_owned()
    } else if !stdout.is_empty() {
        stdout.to_owned()
    } else {
        streamed.to_owned()
    };

    OperationOutcome::Failure(OperationFailure {
        kind: FailureKind::OperationFailed,
        description: request.failure_description(),
        details,
    })
}

fn success_payload(request: &OperationRequest, stdout: &str) -> OperationPayload {
    match request {
        OperationRequest::SearchCache { .. } => {
            OperationPayload::SearchResults(split_search_results(stdout))
        }
        OperationRequest::Exec { .. } => OperationPayload::CommandOutput(stdout.to_owned()),
        _ => OperationPayload::None,
    }
}

/// Split search output on newlines, dropping the trailing empty entry a
/// final newline produces.
fn split_search_results(stdout: &str) -> Vec<String> {
    let mut results: Vec<String> = stdout.split('\n').map(str::to_owned).collect();
    if results.last().is_some_and(String::is_empty) {
        results.pop();
    }
    results
}
