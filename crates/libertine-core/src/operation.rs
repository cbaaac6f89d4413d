//! Operation requests, argument-vector construction, and outcome types.
//!
//! The external tool's CLI surface is authoritative here: `argv()` must keep
//! producing exactly the flags `libertine-container-manager` expects, and is
//! deliberately a pure function of the request so it can be table-tested
//! without spawning anything.

use libertine_schema::{
    validate_container_id, validate_package_name, ContainerId, PackageName, SchemaError,
};
use std::fmt;
use std::io::Write;
use tempfile::NamedTempFile;

/// Name of the external tool that performs the actual container work.
pub const MANAGER_TOOL: &str = "libertine-container-manager";

/// The kind of work a request asks for. Determines the argument vector and
/// the shape of the success payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Create,
    Destroy,
    InstallPackage,
    RemovePackage,
    SearchCache,
    Update,
    Exec,
    Configure,
    FixIntegrity,
    SetDefault,
}

impl OperationKind {
    /// Search is a read-only query; everything else mutates container state
    /// and is subject to the dispatcher's inflight gating.
    pub fn is_mutating(self) -> bool {
        !matches!(self, OperationKind::SearchCache)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::Destroy => "destroy",
            OperationKind::InstallPackage => "install-package",
            OperationKind::RemovePackage => "remove-package",
            OperationKind::SearchCache => "search-cache",
            OperationKind::Update => "update",
            OperationKind::Exec => "exec",
            OperationKind::Configure => "configure",
            OperationKind::FixIntegrity => "fix-integrity",
            OperationKind::SetDefault => "set-default",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Correlation key for the inflight set and the transcript aggregator.
///
/// Package-scoped operations key on (container, package) as a real tuple so
/// container "a-b" with package "c" can never collide with container "a" and
/// package "b-c". Tool-wide operations (fix-integrity, clearing the default)
/// share a single global key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OperationKey {
    Global,
    Container(ContainerId),
    Package(ContainerId, PackageName),
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKey::Global => f.write_str("the whole tool"),
            OperationKey::Container(id) => write!(f, "container {id}"),
            OperationKey::Package(id, pkg) => write!(f, "package {pkg} in container {id}"),
        }
    }
}

/// One requested container operation. Immutable once submitted.
#[derive(Debug, Clone)]
pub enum OperationRequest {
    Create {
        id: ContainerId,
        name: String,
        distro: String,
        multiarch: bool,
        /// Password for privilege elevation, fed to the tool's stdin once
        /// and never placed on the command line.
        password: Option<Vec<u8>>,
    },
    Destroy {
        id: ContainerId,
    },
    InstallPackage {
        id: ContainerId,
        package: PackageName,
    },
    RemovePackage {
        id: ContainerId,
        package: PackageName,
    },
    SearchCache {
        id: ContainerId,
        query: String,
    },
    Update {
        id: ContainerId,
    },
    Exec {
        id: ContainerId,
        command_line: String,
    },
    Configure {
        id: ContainerId,
        subcommand: String,
        args: Vec<String>,
    },
    FixIntegrity,
    SetDefault {
        /// `None` clears the default container.
        id: Option<ContainerId>,
    },
}

impl OperationRequest {
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationRequest::Create { .. } => OperationKind::Create,
            OperationRequest::Destroy { .. } => OperationKind::Destroy,
            OperationRequest::InstallPackage { .. } => OperationKind::InstallPackage,
            OperationRequest::RemovePackage { .. } => OperationKind::RemovePackage,
            OperationRequest::SearchCache { .. } => OperationKind::SearchCache,
            OperationRequest::Update { .. } => OperationKind::Update,
            OperationRequest::Exec { .. } => OperationKind::Exec,
            OperationRequest::Configure { .. } => OperationKind::Configure,
            OperationRequest::FixIntegrity => OperationKind::FixIntegrity,
            OperationRequest::SetDefault { .. } => OperationKind::SetDefault,
        }
    }

    pub fn key(&self) -> OperationKey {
        match self {
            OperationRequest::InstallPackage { id, package }
            | OperationRequest::RemovePackage { id, package } => {
                OperationKey::Package(id.clone(), package.clone())
            }
            OperationRequest::Create { id, .. }
            | OperationRequest::Destroy { id }
            | OperationRequest::SearchCache { id, .. }
            | OperationRequest::Update { id }
            | OperationRequest::Exec { id, .. }
            | OperationRequest::Configure { id, .. }
            | OperationRequest::SetDefault { id: Some(id) } => {
                OperationKey::Container(id.clone())
            }
            OperationRequest::FixIntegrity | OperationRequest::SetDefault { id: None } => {
                OperationKey::Global
            }
        }
    }

    /// Reject identifiers that could not be passed safely as subprocess
    /// arguments. Free-form values (search query, command line, configure
    /// args) travel as single argv elements and need no escaping.
    pub fn validate(&self) -> Result<(), SchemaError> {
        match self {
            OperationRequest::Create { id, .. }
            | OperationRequest::Destroy { id }
            | OperationRequest::SearchCache { id, .. }
            | OperationRequest::Update { id }
            | OperationRequest::Exec { id, .. }
            | OperationRequest::Configure { id, .. }
            | OperationRequest::SetDefault { id: Some(id) } => validate_container_id(id),
            OperationRequest::InstallPackage { id, package }
            | OperationRequest::RemovePackage { id, package } => {
                validate_container_id(id)?;
                validate_package_name(package)
            }
            OperationRequest::FixIntegrity | OperationRequest::SetDefault { id: None } => Ok(()),
        }
    }

    /// Build the exact argument vector for `libertine-container-manager`.
    pub fn argv(&self) -> Vec<String> {
        match self {
            OperationRequest::Create {
                id,
                name,
                distro,
                multiarch,
                ..
            } => {
                let mut args = vec![
                    "create".to_owned(),
                    "-i".to_owned(),
                    id.as_str().to_owned(),
                    "-d".to_owned(),
                    distro.clone(),
                    "-n".to_owned(),
                    name.clone(),
                ];
                if *multiarch {
                    args.push("-m".to_owned());
                }
                args
            }
            OperationRequest::Destroy { id } => {
                vec!["destroy".to_owned(), "-i".to_owned(), id.as_str().to_owned()]
            }
            OperationRequest::InstallPackage { id, package } => vec![
                "install-package".to_owned(),
                "-i".to_owned(),
                id.as_str().to_owned(),
                "-p".to_owned(),
                package.as_str().to_owned(),
                "--no-dialog".to_owned(),
            ],
            OperationRequest::RemovePackage { id, package } => vec![
                "remove-package".to_owned(),
                "-i".to_owned(),
                id.as_str().to_owned(),
                "-p".to_owned(),
                package.as_str().to_owned(),
                "--no-dialog".to_owned(),
            ],
            OperationRequest::SearchCache { id, query } => vec![
                "search-cache".to_owned(),
                "-i".to_owned(),
                id.as_str().to_owned(),
                "-s".to_owned(),
                query.clone(),
            ],
            OperationRequest::Update { id } => {
                vec!["update".to_owned(), "-i".to_owned(), id.as_str().to_owned()]
            }
            OperationRequest::Exec { id, command_line } => vec![
                "exec".to_owned(),
                "-i".to_owned(),
                id.as_str().to_owned(),
                "-c".to_owned(),
                command_line.clone(),
            ],
            OperationRequest::Configure {
                id,
                subcommand,
                args,
            } => {
                let mut argv = vec![
                    "configure".to_owned(),
                    "-i".to_owned(),
                    id.as_str().to_owned(),
                    subcommand.clone(),
                ];
                argv.extend(args.iter().cloned());
                argv
            }
            OperationRequest::FixIntegrity => vec!["fix-integrity".to_owned()],
            OperationRequest::SetDefault { id: Some(id) } => vec![
                "set-default".to_owned(),
                "-i".to_owned(),
                id.as_str().to_owned(),
            ],
            OperationRequest::SetDefault { id: None } => {
                vec!["set-default".to_owned(), "-c".to_owned()]
            }
        }
    }

    /// Bytes written to the child's stdin right after it starts, after which
    /// the input channel is closed. Only Create carries a payload.
    pub fn stdin_payload(&self) -> Option<Vec<u8>> {
        match self {
            OperationRequest::Create { password, .. } => password.clone(),
            _ => None,
        }
    }

    /// Human-readable description used when the tool exits nonzero.
    pub fn failure_description(&self) -> String {
        match self {
            OperationRequest::Create { id, .. } => format!("Creating container {id} failed"),
            OperationRequest::Destroy { id } => format!("Destroying container {id} failed"),
            OperationRequest::InstallPackage { package, .. } => {
                format!("Installation of package {package} failed")
            }
            OperationRequest::RemovePackage { package, .. } => {
                format!("Removal of package {package} failed")
            }
            OperationRequest::SearchCache { query, .. } => {
                format!("Searching for query {query} failed")
            }
            OperationRequest::Update { id } => format!("Updating container {id} failed"),
            OperationRequest::Exec { command_line, .. } => {
                format!("Running command {command_line} failed")
            }
            OperationRequest::Configure { id, .. } => {
                format!("Attempt to configure container {id} failed")
            }
            OperationRequest::FixIntegrity => {
                "Attempt to fix package integrity failed".to_owned()
            }
            OperationRequest::SetDefault { .. } => {
                "Attempt to set container as default failed".to_owned()
            }
        }
    }

    /// Build the configure request adding an APT archive, optionally with a
    /// signing key. The key bytes are written to a temporary file passed via
    /// `--public-key-file`; the returned [`tempfile::TempPath`] must outlive
    /// the operation or the tool will find the file already gone.
    pub fn add_archive(
        id: ContainerId,
        archive: &str,
        signing_key: Option<&[u8]>,
    ) -> std::io::Result<(Self, Option<tempfile::TempPath>)> {
        let mut args = vec!["add".to_owned(), "--archive-name".to_owned(), archive.to_owned()];
        let key_path = match signing_key {
            Some(bytes) => {
                let path = write_signing_key(bytes)?;
                args.push("--public-key-file".to_owned());
                args.push(path.to_string_lossy().into_owned());
                Some(path)
            }
            None => None,
        };
        let request = OperationRequest::Configure {
            id,
            subcommand: "--archive".to_owned(),
            args,
        };
        Ok((request, key_path))
    }
}

/// Write archive signing-key bytes to a temp file readable by the tool.
pub fn write_signing_key(bytes: &[u8]) -> std::io::Result<tempfile::TempPath> {
    let mut file = NamedTempFile::new()?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    Ok(file.into_temp_path())
}

/// Success payload, varying per operation kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationPayload {
    None,
    /// Raw stdout of an `exec` run.
    CommandOutput(String),
    /// Package candidates from `search-cache`, one per output line.
    SearchResults(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The external tool could not be started at all.
    ToolUnavailable,
    /// The tool ran and exited nonzero (or died on a signal).
    OperationFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFailure {
    pub kind: FailureKind,
    /// Short, per-operation human description.
    pub description: String,
    /// The tool's own diagnostic text, surfaced verbatim.
    pub details: String,
}

/// Terminal result of a submitted operation. Produced exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    Success(OperationPayload),
    Failure(OperationFailure),
}

impl OperationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, OperationOutcome::Success(_))
    }
}
