//! Container identifiers and registry document model for the Libertine Manager.
//!
//! This crate defines the schema layer: validated string newtypes for
//! container and package identifiers, the install-status enumeration, and the
//! serde model of the persisted `ContainersConfig.json` registry document.

pub mod registry;
pub mod types;

pub use registry::{
    AppEntry, ArchiveEntry, ContainerEntry, ContainerRegistry, InstallStatus, ItemStatus,
    Multiarch,
};
pub use types::{validate_container_id, validate_package_name, ContainerId, PackageName};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid container id '{0}': must be non-empty and match [A-Za-z0-9_.-]")]
    InvalidContainerId(String),
    #[error("invalid package name '{0}': must be non-empty and match [A-Za-z0-9_.+:-]")]
    InvalidPackageName(String),
}
