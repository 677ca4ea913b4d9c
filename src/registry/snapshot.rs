//! Registry backed by a saved PyPI JSON document

use crate::core::error::{ForgeResult, RegistryError};
use crate::registry::{PypiDocument, Registry};
use std::fs;
use std::path::PathBuf;

/// Reads `{dir}/{package}.json`, each file in PyPI JSON API format
pub struct SnapshotRegistry {
  dir: PathBuf,
}

impl SnapshotRegistry {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }
}

impl Registry for SnapshotRegistry {
  fn list_versions(&self, package: &str) -> ForgeResult<Vec<String>> {
    let path = self.dir.join(format!("{package}.json"));
    let unavailable = |reason: String| RegistryError::Unavailable {
      package: package.to_string(),
      reason,
    };

    let content = fs::read(&path).map_err(|e| unavailable(format!("{}: {}", path.display(), e)))?;
    let document: PypiDocument =
      serde_json::from_slice(&content).map_err(|e| unavailable(format!("{}: {}", path.display(), e)))?;
    Ok(document.versions())
  }
}
