//! Expand version anchors into the concrete versions to build
//!
//! Anchors partition the version line into half-open intervals
//! `[floor_i, floor_{i+1})`, each bound to one runtime. Every upstream version
//! at or above the lowest floor lands in exactly one interval.

use crate::core::error::{ConfigError, ForgeResult};
use crate::version::compare;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A configured `(floor, runtime)` binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionAnchor {
  pub floor: Version,
  pub runtime: String,
}

/// An upstream version bound to exactly one runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedVersion {
  pub version: Version,
  pub runtime: String,
}

impl fmt::Display for ResolvedVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} (runtime {})", self.version, self.runtime)
  }
}

/// Sort anchors by floor and reject empty or duplicate-floor configurations
pub fn sort_anchors(package: &str, anchors: &[VersionAnchor]) -> ForgeResult<Vec<VersionAnchor>> {
  if anchors.is_empty() {
    return Err(
      ConfigError::EmptyAnchors {
        package: package.to_string(),
      }
      .into(),
    );
  }

  let mut sorted = anchors.to_vec();
  sorted.sort_by(|a, b| compare::compare(&a.floor, &b.floor));

  if let Some(pair) = sorted.windows(2).find(|pair| pair[0].floor == pair[1].floor) {
    return Err(
      ConfigError::DuplicateFloor {
        package: package.to_string(),
        floor: pair[0].floor.to_string(),
      }
      .into(),
    );
  }

  Ok(sorted)
}

/// Bind each upstream version to the greatest anchor whose floor does not exceed it
///
/// Versions below the lowest floor are dropped. Output is ascending and
/// contains each version once.
pub fn resolve(package: &str, anchors: &[VersionAnchor], upstream: &[Version]) -> ForgeResult<Vec<ResolvedVersion>> {
  let anchors = sort_anchors(package, anchors)?;

  let mut versions = upstream.to_vec();
  compare::sort_ascending(&mut versions);
  versions.dedup();

  let resolved = versions
    .into_iter()
    .filter_map(|version| {
      let idx = anchors.partition_point(|anchor| anchor.floor <= version);
      if idx == 0 {
        return None;
      }
      Some(ResolvedVersion {
        runtime: anchors[idx - 1].runtime.clone(),
        version,
      })
    })
    .collect();

  Ok(resolved)
}

/// The lowest configured floor (used to filter registry listings early)
pub fn lowest_floor(anchors: &[VersionAnchor]) -> Option<&Version> {
  anchors.iter().map(|a| &a.floor).min()
}
