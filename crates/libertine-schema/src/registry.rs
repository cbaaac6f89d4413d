//! Serde model of the persisted container registry document.
//!
//! The on-disk format is the historical `ContainersConfig.json`: a top-level
//! `defaultContainer` string plus a `containerList` array of container
//! objects with camelCase keys. Field names, status strings, and the
//! `"enabled"`/`"disabled"` multiarch encoding are kept exactly as written by
//! earlier releases so existing registries load unmodified. Missing fields
//! fall back to the same defaults the original reader used (`"unknown"` for
//! strings, `false` for booleans, empty arrays).

use crate::types::{ContainerId, PackageName};
use serde::{Deserialize, Serialize};
use std::fmt;

fn unknown() -> String {
    "unknown".to_owned()
}

/// Install state of a whole container.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InstallStatus {
    New,
    Installing,
    Ready,
    Updating,
    Removing,
    Removed,
    Failed,
    #[serde(other)]
    #[default]
    Unknown,
}

impl fmt::Display for InstallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InstallStatus::New => "new",
            InstallStatus::Installing => "installing",
            InstallStatus::Ready => "ready",
            InstallStatus::Updating => "updating",
            InstallStatus::Removing => "removing",
            InstallStatus::Removed => "removed",
            InstallStatus::Failed => "failed",
            InstallStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Install state of a single package or archive inside a container.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    New,
    Installing,
    Installed,
    Removing,
    Removed,
    Failed,
    #[serde(other)]
    #[default]
    Unknown,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemStatus::New => "new",
            ItemStatus::Installing => "installing",
            ItemStatus::Installed => "installed",
            ItemStatus::Removing => "removing",
            ItemStatus::Removed => "removed",
            ItemStatus::Failed => "failed",
            ItemStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Whether i386 multiarch support is enabled for a container.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Multiarch {
    Enabled,
    #[default]
    #[serde(other)]
    Disabled,
}

impl Multiarch {
    pub fn is_enabled(self) -> bool {
        matches!(self, Multiarch::Enabled)
    }
}

/// An extra APT archive (PPA or plain line) configured in a container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchiveEntry {
    #[serde(rename = "archiveName", default = "unknown")]
    pub archive_name: String,
    #[serde(rename = "archiveStatus", default)]
    pub archive_status: ItemStatus,
}

/// A package installed (or being installed) in a container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppEntry {
    #[serde(rename = "packageName")]
    pub package_name: PackageName,
    #[serde(rename = "appStatus", default)]
    pub app_status: ItemStatus,
}

/// One container record in the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerEntry {
    pub id: ContainerId,
    #[serde(default = "unknown")]
    pub name: String,
    #[serde(rename = "type", default = "unknown")]
    pub container_type: String,
    #[serde(default = "unknown")]
    pub distro: String,
    #[serde(rename = "installStatus", default)]
    pub install_status: InstallStatus,
    #[serde(default)]
    pub multiarch: Multiarch,
    #[serde(rename = "freezeOnStop", default)]
    pub freeze_on_stop: bool,
    #[serde(rename = "extraArchives", default)]
    pub extra_archives: Vec<ArchiveEntry>,
    #[serde(rename = "installedApps", default)]
    pub installed_apps: Vec<AppEntry>,
    #[serde(rename = "bindMounts", default)]
    pub bind_mounts: Vec<String>,
}

impl ContainerEntry {
    pub fn new(
        id: ContainerId,
        name: impl Into<String>,
        container_type: impl Into<String>,
        distro: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            container_type: container_type.into(),
            distro: distro.into(),
            install_status: InstallStatus::New,
            multiarch: Multiarch::Disabled,
            freeze_on_stop: false,
            extra_archives: Vec::new(),
            installed_apps: Vec::new(),
            bind_mounts: Vec::new(),
        }
    }

    pub fn app(&self, package: &PackageName) -> Option<&AppEntry> {
        self.installed_apps
            .iter()
            .find(|a| a.package_name == *package)
    }
}

/// The full registry document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ContainerRegistry {
    #[serde(rename = "defaultContainer", default)]
    pub default_container: String,
    #[serde(rename = "containerList", default)]
    pub container_list: Vec<ContainerEntry>,
}

impl ContainerRegistry {
    pub fn find(&self, id: &str) -> Option<&ContainerEntry> {
        self.container_list.iter().find(|c| c.id == *id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut ContainerEntry> {
        self.container_list.iter_mut().find(|c| c.id == *id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Insert a new entry, suffixing id and name with `-N` if the requested
    /// id is already taken. Returns the id actually used.
    ///
    /// Deterministic over the current registry contents only; no host state
    /// is consulted.
    pub fn insert_unique(&mut self, mut entry: ContainerEntry) -> ContainerId {
        if self.contains(&entry.id) {
            let base_id = entry.id.as_str().to_owned();
            let base_name = entry.name.clone();
            let mut n = 2;
            while self.contains(&format!("{base_id}-{n}")) {
                n += 1;
            }
            entry.id = ContainerId::new(format!("{base_id}-{n}"));
            entry.name = format!("{base_name} ({n})");
        }
        let id = entry.id.clone();
        self.container_list.push(entry);
        id
    }

    /// Remove a container entry. Clears `defaultContainer` if it pointed at
    /// the removed container.
    pub fn remove(&mut self, id: &str) -> Option<ContainerEntry> {
        let pos = self.container_list.iter().position(|c| c.id == *id)?;
        let entry = self.container_list.remove(pos);
        if self.default_container == *id {
            self.default_container.clear();
        }
        Some(entry)
    }
}
