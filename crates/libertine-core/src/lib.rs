//! Asynchronous container-operation orchestration core for the Libertine Manager.
//!
//! All container mutation is delegated to the external
//! `libertine-container-manager` tool; this crate supervises those child
//! processes without ever blocking the event loop. It provides the process
//! invocation primitive (spawn in own process group, streamed stdout, group
//! kill on teardown), the per-operation worker state machine that turns an
//! exit status into a typed [`OperationOutcome`], the transcript aggregator
//! feeding live progress to observers, and the [`ContainerManager`]
//! dispatcher enforcing one mutating operation per container at a time.

pub mod dispatcher;
pub mod operation;
pub mod process;
pub mod transcript;
pub mod worker;

pub use dispatcher::{ContainerManager, ManagerEvent, OperationHandle, ToolConfig};
pub use operation::{
    write_signing_key, FailureKind, OperationFailure, OperationKey, OperationKind,
    OperationOutcome, OperationPayload, OperationRequest, MANAGER_TOOL,
};
pub use transcript::{OperationDetails, TranscriptUpdate};
pub use worker::{validate_transition, WorkerState};

use thiserror::Error;

/// Errors reported synchronously at submission time. Failures of a running
/// operation are not errors in this sense; they are delivered as
/// [`OperationOutcome::Failure`] through the handle and the event channel.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("an operation is already in progress for {0}")]
    AlreadyInProgress(OperationKey),
    #[error(transparent)]
    InvalidRequest(#[from] libertine_schema::SchemaError),
}
