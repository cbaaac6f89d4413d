//! Persisted container registry storage for the Libertine Manager.
//!
//! This crate owns the on-disk side of the registry: XDG path resolution for
//! `ContainersConfig.json`, atomic load/save with temp-file renames, an
//! advisory file lock serializing read-modify-write cycles, and the mutation
//! helpers the front end applies after a confirmed operation outcome.

pub mod lock;
pub mod paths;
pub mod registry;

pub use lock::RegistryLock;
pub use paths::{registry_dir, registry_path};
pub use registry::RegistryStore;

use std::path::Path;
use thiserror::Error;

/// Fsync a directory to ensure that a preceding `rename()` is durable.
///
/// On Linux with ext4 `data=ordered` (the default), renames are usually
/// durable without an explicit dir fsync, but POSIX does not guarantee this.
pub(crate) fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = std::fs::File::open(dir)?;
    f.sync_all()
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("registry I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("registry is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("container not found: {0}")]
    ContainerNotFound(String),
    #[error("registry lock acquisition failed: {0}")]
    LockFailed(String),
    #[error("no home directory available to locate the registry")]
    NoHome,
    #[error("schema error: {0}")]
    Schema(#[from] libertine_schema::SchemaError),
}
