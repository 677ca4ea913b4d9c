//! Local per-version lifecycle state
//!
//! One `state.json` per package directory holds a cache of what the last run
//! observed for every resolved version. The cache is advisory: the
//! reconciliation engine always re-reads the release store before acting on
//! it. The file is read whole before a pass and replaced whole after.

use crate::core::error::{ForgeResult, ResultExt};
use crate::release::descriptor::BuildDescriptor;
use crate::release::record::{AssetRecord, ReleaseRecord};
use crate::utils::write_atomic;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the state file inside a package directory
pub const STATE_FILE: &str = "state.json";

/// Cached lifecycle flags and remote observations for one version
///
/// Every field defaults so older, partially written records still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionState {
  #[serde(default, rename = "requirements")]
  pub requirements_ready: bool,
  #[serde(default, rename = "release")]
  pub release_created: bool,
  #[serde(default)]
  pub assets: AssetRecord,
  #[serde(default)]
  pub remote_descriptor: Option<BuildDescriptor>,
}

impl VersionState {
  /// Copy the remote observation into this state
  pub fn mirror(&self, remote: &ReleaseRecord) -> Self {
    Self {
      requirements_ready: self.requirements_ready,
      release_created: true,
      assets: remote.assets.clone(),
      remote_descriptor: remote.build_descriptor.clone(),
    }
  }
}

/// A version's runtime binding plus its lifecycle state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateEntry {
  pub runtime: String,
  pub state: VersionState,
}

/// Version -> entry, iterated in ascending version order
pub type StateMap = BTreeMap<Version, StateEntry>;

#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
  #[serde(default)]
  generated_at: Option<String>,
  #[serde(default)]
  versions: Vec<StateRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StateRecord {
  version: Version,
  #[serde(default, alias = "python")]
  runtime: String,
  #[serde(flatten)]
  state: VersionState,
}

/// JSON-file backed state store for one package
#[derive(Debug, Clone)]
pub struct LocalStateStore {
  path: PathBuf,
}

impl LocalStateStore {
  /// Store rooted at a package directory
  pub fn new(package_dir: &Path) -> Self {
    Self {
      path: package_dir.join(STATE_FILE),
    }
  }

  /// Read the whole state file; a missing file is an empty map
  pub fn load(&self) -> ForgeResult<StateMap> {
    if !self.path.exists() {
      tracing::debug!("no state file at {}, starting empty", self.path.display());
      return Ok(StateMap::new());
    }

    let content =
      fs::read_to_string(&self.path).with_context(|| format!("Failed to read {}", self.path.display()))?;
    let file: StateFile =
      serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", self.path.display()))?;

    let mut map = StateMap::new();
    for record in file.versions {
      map.insert(
        record.version,
        StateEntry {
          runtime: record.runtime,
          state: record.state,
        },
      );
    }
    Ok(map)
  }

  /// Replace the whole state file atomically
  pub fn save(&self, map: &StateMap) -> ForgeResult<()> {
    let file = StateFile {
      generated_at: Some(chrono::Utc::now().to_rfc3339()),
      versions: map
        .iter()
        .map(|(version, entry)| StateRecord {
          version: version.clone(),
          runtime: entry.runtime.clone(),
          state: entry.state.clone(),
        })
        .collect(),
    };

    let mut json = serde_json::to_string_pretty(&file)?;
    json.push('\n');
    write_atomic(&self.path, json.as_bytes()).with_context(|| format!("Failed to write {}", self.path.display()))?;
    tracing::debug!("saved {} state entries to {}", map.len(), self.path.display());
    Ok(())
  }
}
