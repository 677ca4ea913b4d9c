//! Upstream version registries

pub mod pypi;
pub mod snapshot;

use crate::core::error::ForgeResult;
use serde::Deserialize;
use std::collections::BTreeMap;

pub use pypi::PypiRegistry;
pub use snapshot::SnapshotRegistry;

/// Source of published upstream versions
///
/// Failures surface as `RegistryError::Unavailable`. An unreachable registry
/// is never reported as an empty listing.
pub trait Registry {
  /// Every version string the registry publishes for `package`, unfiltered
  fn list_versions(&self, package: &str) -> ForgeResult<Vec<String>>;
}

/// The part of the PyPI JSON API document we read
#[derive(Debug, Deserialize)]
pub(crate) struct PypiDocument {
  #[serde(default)]
  pub releases: BTreeMap<String, serde_json::Value>,
}

impl PypiDocument {
  pub fn versions(self) -> Vec<String> {
    self.releases.into_keys().collect()
  }
}
