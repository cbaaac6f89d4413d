//! XDG path resolution for the registry file.

use crate::StoreError;
use std::path::PathBuf;

const DATA_SUBDIR: &str = "libertine";
const REGISTRY_FILE: &str = "ContainersConfig.json";

/// Directory holding the registry: `$XDG_DATA_HOME/libertine`, falling back
/// to `~/.local/share/libertine`.
pub fn registry_dir() -> Result<PathBuf, StoreError> {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        if !xdg.is_empty() {
            return Ok(PathBuf::from(xdg).join(DATA_SUBDIR));
        }
    }
    let home = std::env::var("HOME").map_err(|_| StoreError::NoHome)?;
    Ok(PathBuf::from(home).join(".local/share").join(DATA_SUBDIR))
}

/// Full path of `ContainersConfig.json` under [`registry_dir`].
pub fn registry_path() -> Result<PathBuf, StoreError> {
    Ok(registry_dir()?.join(REGISTRY_FILE))
}
