use crate::core::error::{ConfigError, ForgeError, ForgeResult, ResultExt};
use crate::release::github::{DEFAULT_API_URL, DEFAULT_UPLOADS_URL};
use crate::release::record::{DEFAULT_ASSET_TEMPLATE, Platform, platform_matrix, required_assets};
use crate::registry::pypi::DEFAULT_INDEX_URL;
use crate::version::VersionAnchor;
use crate::version::compare::parse_config_version;
use crate::version::resolver::sort_anchors;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of a package's configuration inside its package directory
pub const PACKAGE_CONFIG: &str = "config.toml";

/// Configuration for pexforge
/// Searched in order: pexforge.toml, .pexforge.toml, .config/pexforge.toml
#[derive(Debug, Clone, Deserialize)]
pub struct ForgeConfig {
  #[serde(default)]
  pub workspace: WorkspaceConfig,
  #[serde(default)]
  pub platforms: PlatformsConfig,
  pub release_store: ReleaseStoreConfig,
  #[serde(default)]
  pub registry: RegistryConfig,
  #[serde(default)]
  pub build: BuildConfig,
  #[serde(default)]
  pub manifest: ManifestConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceConfig {
  /// Directory holding one sub-directory per package
  #[serde(default = "default_packages_dir")]
  pub packages_dir: PathBuf,
}

fn default_packages_dir() -> PathBuf {
  PathBuf::from("packages")
}

impl Default for WorkspaceConfig {
  fn default() -> Self {
    Self {
      packages_dir: default_packages_dir(),
    }
  }
}

/// Platforms every release must carry an asset for
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformsConfig {
  #[serde(default = "default_os")]
  pub os: Vec<String>,
  #[serde(default = "default_arch")]
  pub arch: Vec<String>,
  #[serde(default = "default_asset_template")]
  pub asset_template: String,
}

fn default_os() -> Vec<String> {
  vec!["linux".to_string(), "darwin".to_string()]
}

fn default_arch() -> Vec<String> {
  vec!["amd64".to_string(), "arm64".to_string()]
}

fn default_asset_template() -> String {
  DEFAULT_ASSET_TEMPLATE.to_string()
}

impl Default for PlatformsConfig {
  fn default() -> Self {
    Self {
      os: default_os(),
      arch: default_arch(),
      asset_template: default_asset_template(),
    }
  }
}

impl PlatformsConfig {
  /// Validate platform configuration
  pub fn validate(&self) -> ForgeResult<()> {
    if self.os.is_empty() || self.arch.is_empty() {
      return Err(
        ConfigError::Invalid {
          message: "[platforms] os and arch must each list at least one entry".to_string(),
        }
        .into(),
      );
    }
    if !self.asset_template.contains("{os}") || !self.asset_template.contains("{arch}") {
      return Err(
        ConfigError::Invalid {
          message: format!(
            "asset_template '{}' must contain both {{os}} and {{arch}}",
            self.asset_template
          ),
        }
        .into(),
      );
    }
    Ok(())
  }

  pub fn matrix(&self) -> Vec<Platform> {
    platform_matrix(&self.os, &self.arch)
  }

  /// Asset names required before a release of `package` can be finalized
  pub fn required_assets(&self, package: &str) -> BTreeSet<String> {
    required_assets(&self.asset_template, package, &self.matrix())
  }
}

/// Where releases live
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ReleaseStoreConfig {
  /// GitHub Releases of `repository` (`owner/name`); the token comes from GITHUB_TOKEN
  Github {
    repository: String,
    #[serde(default = "default_api_url")]
    api_url: String,
    #[serde(default = "default_uploads_url")]
    uploads_url: String,
  },
  /// Local mirror rooted at `path` (relative to the workspace root)
  Directory { path: PathBuf },
}

fn default_api_url() -> String {
  DEFAULT_API_URL.to_string()
}

fn default_uploads_url() -> String {
  DEFAULT_UPLOADS_URL.to_string()
}

/// Where upstream versions are listed
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RegistryConfig {
  Pypi {
    #[serde(default = "default_index_url")]
    index_url: String,
  },
  /// Directory of `<package>.json` files in PyPI JSON API format
  Snapshot { path: PathBuf },
}

fn default_index_url() -> String {
  DEFAULT_INDEX_URL.to_string()
}

impl Default for RegistryConfig {
  fn default() -> Self {
    RegistryConfig::Pypi {
      index_url: default_index_url(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
  /// Path or name of the `uv` executable
  #[serde(default = "default_uv")]
  pub uv: String,
}

fn default_uv() -> String {
  "uv".to_string()
}

impl Default for BuildConfig {
  fn default() -> Self {
    Self { uv: default_uv() }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestConfig {
  /// GitHub repository serving downloads; defaults to the release store's
  #[serde(default)]
  pub repository: Option<String>,
  /// Output directory for `<package>.hcl`, relative to the workspace root
  #[serde(default)]
  pub out_dir: Option<PathBuf>,
}

impl ForgeConfig {
  /// Find config file in search order: pexforge.toml, .pexforge.toml, .config/pexforge.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("pexforge.toml"),
      path.join(".pexforge.toml"),
      path.join(".config").join("pexforge.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load and validate config (searches multiple locations)
  pub fn load(path: &Path) -> ForgeResult<Self> {
    let config_path = Self::find_config_path(path).ok_or_else(|| {
      ForgeError::Config(ConfigError::NotFound {
        workspace_root: path.to_path_buf(),
      })
    })?;

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    Self::parse(&content).with_context(|| format!("Invalid configuration in {}", config_path.display()))
  }

  /// Parse and validate config text
  pub fn parse(content: &str) -> ForgeResult<Self> {
    let config: ForgeConfig = toml_edit::de::from_str(content).map_err(|e| ConfigError::Invalid {
      message: e.to_string(),
    })?;
    config.platforms.validate()?;
    if let ReleaseStoreConfig::Github { repository, .. } = &config.release_store
      && !is_owner_name(repository)
    {
      return Err(
        ConfigError::Invalid {
          message: format!("release_store.repository '{}' must look like owner/name", repository),
        }
        .into(),
      );
    }
    Ok(config)
  }

  /// Repository serving manifest downloads
  pub fn download_repository(&self) -> ForgeResult<&str> {
    if let Some(repo) = &self.manifest.repository {
      return Ok(repo);
    }
    match &self.release_store {
      ReleaseStoreConfig::Github { repository, .. } => Ok(repository),
      ReleaseStoreConfig::Directory { .. } => Err(
        ConfigError::MissingField {
          field: "manifest.repository".to_string(),
        }
        .into(),
      ),
    }
  }
}

fn is_owner_name(repository: &str) -> bool {
  matches!(repository.split_once('/'), Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/'))
}

#[derive(Debug, Deserialize)]
struct RawPackageConfig {
  #[serde(default)]
  package: Option<String>,
  #[serde(default = "default_config_revision", alias = "config_version")]
  config_revision: u32,
  #[serde(default)]
  binaries: Vec<String>,
  #[serde(default)]
  description: Option<String>,
  #[serde(default)]
  test: Option<String>,
  #[serde(default)]
  versions: Vec<RawAnchor>,
}

fn default_config_revision() -> u32 {
  1
}

#[derive(Debug, Deserialize)]
struct RawAnchor {
  #[serde(alias = "version")]
  floor: String,
  #[serde(alias = "python")]
  runtime: String,
}

/// A package's validated configuration
#[derive(Debug, Clone)]
pub struct PackageConfig {
  /// Upstream package name
  pub name: String,
  /// Package directory (holds config, state and lock files)
  pub dir: PathBuf,
  pub config_revision: u32,
  pub binaries: Vec<String>,
  pub description: String,
  pub test: Option<String>,
  /// Sorted by floor, no duplicates, never empty
  pub anchors: Vec<VersionAnchor>,
}

impl PackageConfig {
  /// Load `<packages_dir>/<dir_name>/config.toml`
  pub fn load(packages_dir: &Path, dir_name: &str) -> ForgeResult<Self> {
    let dir = packages_dir.join(dir_name);
    let path = dir.join(PACKAGE_CONFIG);
    if !path.is_file() {
      return Err(
        ConfigError::PackageNotFound {
          name: dir_name.to_string(),
          path,
        }
        .into(),
      );
    }

    let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    Self::parse(&content, dir_name, dir).with_context(|| format!("Invalid package config {}", path.display()))
  }

  /// Parse and validate package config text
  pub fn parse(content: &str, dir_name: &str, dir: PathBuf) -> ForgeResult<Self> {
    let raw: RawPackageConfig = toml_edit::de::from_str(content).map_err(|e| ConfigError::Invalid {
      message: e.to_string(),
    })?;

    let name = raw.package.unwrap_or_else(|| dir_name.to_string());
    if raw.binaries.is_empty() {
      return Err(
        ConfigError::MissingField {
          field: "binaries".to_string(),
        }
        .into(),
      );
    }

    let anchors = raw
      .versions
      .iter()
      .map(|a| -> ForgeResult<VersionAnchor> {
        Ok(VersionAnchor {
          floor: parse_config_version(&a.floor)?,
          runtime: a.runtime.trim().to_string(),
        })
      })
      .collect::<ForgeResult<Vec<_>>>()?;
    if let Some(anchor) = anchors.iter().find(|a| a.runtime.is_empty()) {
      return Err(
        ConfigError::MissingField {
          field: format!("versions.runtime (floor {})", anchor.floor),
        }
        .into(),
      );
    }
    let anchors = sort_anchors(&name, &anchors)?;

    Ok(Self {
      description: raw.description.unwrap_or_else(|| format!("{} package", name)),
      name,
      dir,
      config_revision: raw.config_revision,
      binaries: raw.binaries,
      test: raw.test,
      anchors,
    })
  }
}

/// Package directory names under `packages_dir` that carry a config.toml, sorted
pub fn discover_packages(packages_dir: &Path) -> ForgeResult<Vec<String>> {
  if !packages_dir.is_dir() {
    return Ok(Vec::new());
  }

  let mut names = Vec::new();
  for entry in fs::read_dir(packages_dir).with_context(|| format!("Failed to list {}", packages_dir.display()))? {
    let entry = entry?;
    if entry.path().join(PACKAGE_CONFIG).is_file() {
      names.push(entry.file_name().to_string_lossy().to_string());
    }
  }
  names.sort();
  Ok(names)
}
