//! Semantic-version parsing, comparison and sorting
//!
//! Thin layer over the `semver` crate. Upstream registries publish plenty of
//! strings that are not semver (`1.0`, `23.1a1`, `2019.3`); those are skipped
//! rather than guessed at.

use crate::core::error::{ConfigError, ForgeResult};
use semver::Version;
use std::cmp::Ordering;

/// Parse a configured version strictly (configuration errors are fatal)
pub fn parse_config_version(value: &str) -> ForgeResult<Version> {
  Version::parse(value.trim()).map_err(|e| {
    ConfigError::InvalidVersion {
      value: value.to_string(),
      reason: e.to_string(),
    }
    .into()
  })
}

/// Parse an upstream version, returning `None` for anything that is not semver
pub fn parse_upstream(value: &str) -> Option<Version> {
  match Version::parse(value.trim()) {
    Ok(v) => Some(v),
    Err(e) => {
      tracing::debug!("skipping non-semver upstream version '{}': {}", value, e);
      None
    }
  }
}

/// Parse a whole upstream listing, dropping invalid entries and duplicates,
/// and return it sorted ascending
pub fn parse_upstream_list<S: AsRef<str>>(values: &[S]) -> Vec<Version> {
  let mut versions: Vec<Version> = values.iter().filter_map(|v| parse_upstream(v.as_ref())).collect();
  sort_ascending(&mut versions);
  versions.dedup();
  versions
}

/// Compare two versions by semver precedence
pub fn compare(a: &Version, b: &Version) -> Ordering {
  a.cmp(b)
}

/// Stable ascending sort
pub fn sort_ascending(versions: &mut [Version]) {
  versions.sort_by(compare);
}
