//! Release records, asset sets and platform naming

use crate::release::descriptor::BuildDescriptor;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Asset name -> lowercase hex sha256
pub type AssetRecord = BTreeMap<String, String>;

/// Default asset naming: one tarball per OS/architecture pair
pub const DEFAULT_ASSET_TEMPLATE: &str = "{package}-{os}-{arch}.tar.gz";

/// Remote representation of one resolved version's release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
  pub tag: String,
  pub is_prerelease: bool,
  pub build_descriptor: Option<BuildDescriptor>,
  pub assets: AssetRecord,
}

impl ReleaseRecord {
  /// Required asset names not yet present on this release
  pub fn missing_assets<'a>(&self, required: &'a BTreeSet<String>) -> Vec<&'a str> {
    required
      .iter()
      .filter(|name| !self.assets.contains_key(*name))
      .map(String::as_str)
      .collect()
  }

  /// True when every required asset is present
  pub fn is_complete(&self, required: &BTreeSet<String>) -> bool {
    has_all_assets(&self.assets, required)
  }
}

/// True when `assets` is a superset of `required`
pub fn has_all_assets(assets: &AssetRecord, required: &BTreeSet<String>) -> bool {
  required.iter().all(|name| assets.contains_key(name))
}

/// Release tag for a package version: `{package}-v{version}`
pub fn release_tag(package: &str, version: &Version) -> String {
  format!("{}-v{}", package, version)
}

/// Human-facing release title
pub fn release_title(package: &str, version: &Version) -> String {
  format!("{} v{}", package, version)
}

/// A build target platform
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Platform {
  pub os: String,
  pub arch: String,
}

impl Platform {
  pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
    Self {
      os: os.into(),
      arch: arch.into(),
    }
  }

  /// The platform this process runs on, in release naming (`linux`/`darwin`, `amd64`/`arm64`)
  pub fn current() -> Self {
    Self::new(normalize_os(std::env::consts::OS), normalize_arch(std::env::consts::ARCH))
  }

  /// Render the asset name for this platform
  pub fn asset_name(&self, template: &str, package: &str) -> String {
    template
      .replace("{package}", package)
      .replace("{os}", &self.os)
      .replace("{arch}", &self.arch)
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.os, self.arch)
  }
}

/// Map Rust's OS names onto release naming
pub fn normalize_os(os: &str) -> String {
  match os {
    "macos" => "darwin".to_string(),
    other => other.to_lowercase(),
  }
}

/// Map Rust's architecture names onto release naming
pub fn normalize_arch(arch: &str) -> String {
  match arch {
    "x86_64" => "amd64".to_string(),
    "aarch64" => "arm64".to_string(),
    other => other.to_lowercase(),
  }
}

/// Cross-product of the configured OS and architecture lists
pub fn platform_matrix(os: &[String], arch: &[String]) -> Vec<Platform> {
  os.iter()
    .flat_map(|o| arch.iter().map(move |a| Platform::new(o.clone(), a.clone())))
    .collect()
}

/// Asset names a release must carry before it can be finalized
pub fn required_assets(template: &str, package: &str, platforms: &[Platform]) -> BTreeSet<String> {
  platforms.iter().map(|p| p.asset_name(template, package)).collect()
}
