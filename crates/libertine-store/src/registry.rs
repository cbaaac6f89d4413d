//! Load/save and mutation helpers for the registry file.

use crate::lock::RegistryLock;
use crate::{fsync_dir, StoreError};
use libertine_schema::{
    AppEntry, ContainerEntry, ContainerId, ContainerRegistry, InstallStatus, ItemStatus,
    PackageName,
};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Handle on one registry file.
///
/// Every mutation helper is a full lock/load/modify/save cycle so that
/// concurrent manager instances never clobber each other's writes. Status
/// writes are only ever applied after a confirmed operation outcome; callers
/// must not pre-record an operation they merely intend to run.
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Open the registry at its XDG default location.
    pub fn at_default_location() -> Result<Self, StoreError> {
        Ok(Self::new(crate::paths::registry_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("json.lock")
    }

    pub fn lock(&self) -> Result<RegistryLock, StoreError> {
        RegistryLock::acquire(&self.lock_path())
    }

    /// Read the registry. A missing or empty file is an empty registry, the
    /// same as the original manager treated a freshly touched config file.
    pub fn load(&self) -> Result<ContainerRegistry, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(ContainerRegistry::default()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(ContainerRegistry::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Atomically replace the registry file: write to a temp file in the
    /// same directory, fsync, rename over the target, fsync the directory.
    pub fn save(&self, registry: &ContainerRegistry) -> Result<(), StoreError> {
        let dir = self
            .path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        fs::create_dir_all(&dir)?;

        let content = serde_json::to_string_pretty(registry)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        fsync_dir(&dir)?;

        debug!("saved registry to {}", self.path.display());
        Ok(())
    }

    /// Lock, load, apply `mutate`, save. The closure's return value is
    /// passed through on success.
    pub fn update<T>(
        &self,
        mutate: impl FnOnce(&mut ContainerRegistry) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _lock = self.lock()?;
        let mut registry = self.load()?;
        let out = mutate(&mut registry)?;
        self.save(&registry)?;
        Ok(out)
    }

    /// Add a new container entry, suffixing the id if it is already taken.
    /// Returns the id actually recorded.
    pub fn add_container(&self, entry: ContainerEntry) -> Result<ContainerId, StoreError> {
        self.update(|reg| Ok(reg.insert_unique(entry)))
    }

    pub fn remove_container(&self, id: &str) -> Result<ContainerEntry, StoreError> {
        self.update(|reg| {
            reg.remove(id)
                .ok_or_else(|| StoreError::ContainerNotFound(id.to_owned()))
        })
    }

    pub fn set_install_status(
        &self,
        id: &str,
        status: InstallStatus,
    ) -> Result<(), StoreError> {
        self.update(|reg| {
            let entry = reg
                .find_mut(id)
                .ok_or_else(|| StoreError::ContainerNotFound(id.to_owned()))?;
            entry.install_status = status;
            Ok(())
        })
    }

    pub fn set_default(&self, id: &str) -> Result<(), StoreError> {
        self.update(|reg| {
            if !reg.contains(id) {
                return Err(StoreError::ContainerNotFound(id.to_owned()));
            }
            reg.default_container = id.to_owned();
            Ok(())
        })
    }

    pub fn clear_default(&self) -> Result<(), StoreError> {
        self.update(|reg| {
            reg.default_container.clear();
            Ok(())
        })
    }

    /// Record a package as installed, replacing any earlier entry for the
    /// same package name.
    pub fn record_installed_app(
        &self,
        id: &str,
        package: &PackageName,
        status: ItemStatus,
    ) -> Result<(), StoreError> {
        self.update(|reg| {
            let entry = reg
                .find_mut(id)
                .ok_or_else(|| StoreError::ContainerNotFound(id.to_owned()))?;
            entry
                .installed_apps
                .retain(|a| a.package_name != *package);
            entry.installed_apps.push(AppEntry {
                package_name: package.clone(),
                app_status: status,
            });
            Ok(())
        })
    }

    pub fn remove_installed_app(
        &self,
        id: &str,
        package: &PackageName,
    ) -> Result<(), StoreError> {
        self.update(|reg| {
            let entry = reg
                .find_mut(id)
                .ok_or_else(|| StoreError::ContainerNotFound(id.to_owned()))?;
            entry
                .installed_apps
                .retain(|a| a.package_name != *package);
            Ok(())
        })
    }

    pub fn record_archive(
        &self,
        id: &str,
        archive_name: &str,
        status: ItemStatus,
    ) -> Result<(), StoreError> {
        self.update(|reg| {
            let entry = reg
                .find_mut(id)
                .ok_or_else(|| StoreError::ContainerNotFound(id.to_owned()))?;
            entry
                .extra_archives
                .retain(|a| a.archive_name != archive_name);
            entry.extra_archives.push(libertine_schema::ArchiveEntry {
                archive_name: archive_name.to_owned(),
                archive_status: status,
            });
            Ok(())
        })
    }
}
