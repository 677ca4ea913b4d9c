//! Run context - build once, pass everywhere
//!
//! `ForgeContext` loads the workspace configuration and constructs every
//! collaborator (registry, release store, build tool) once in main.rs. Commands
//! and the orchestrator receive it by reference; nothing reaches for a
//! process-wide client.

use crate::build::{BuildTool, UvBuildTool};
use crate::core::config::{ForgeConfig, PackageConfig, RegistryConfig, ReleaseStoreConfig, discover_packages};
use crate::core::error::{ConfigError, ForgeResult};
use crate::registry::{PypiRegistry, Registry, SnapshotRegistry};
use crate::release::directory::DirectoryReleases;
use crate::release::github::GithubReleases;
use crate::release::store::ReleaseStore;
use std::path::{Path, PathBuf};

/// Environment variable holding the GitHub token
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Shared state for one pexforge invocation
pub struct ForgeContext {
  /// Workspace root directory
  pub root: PathBuf,

  /// Validated workspace configuration
  pub config: ForgeConfig,

  pub registry: Box<dyn Registry>,
  pub releases: Box<dyn ReleaseStore>,
  pub build: Box<dyn BuildTool>,
}

impl ForgeContext {
  /// Load configuration from `workspace_root` and construct collaborators
  pub fn build(workspace_root: &Path) -> ForgeResult<Self> {
    let root = workspace_root.to_path_buf();
    let config = ForgeConfig::load(&root)?;

    let registry: Box<dyn Registry> = match &config.registry {
      RegistryConfig::Pypi { index_url } => Box::new(PypiRegistry::new(index_url.clone())),
      RegistryConfig::Snapshot { path } => Box::new(SnapshotRegistry::new(root.join(path))),
    };

    let releases: Box<dyn ReleaseStore> = match &config.release_store {
      ReleaseStoreConfig::Github {
        repository,
        api_url,
        uploads_url,
      } => {
        let token = std::env::var(TOKEN_ENV).ok().filter(|t| !t.trim().is_empty());
        if token.is_none() {
          tracing::info!("{} is not set; release writes will be refused", TOKEN_ENV);
        }
        Box::new(GithubReleases::new(
          repository.clone(),
          api_url.clone(),
          uploads_url.clone(),
          token,
        ))
      }
      ReleaseStoreConfig::Directory { path } => Box::new(DirectoryReleases::new(root.join(path))),
    };

    let build: Box<dyn BuildTool> = Box::new(UvBuildTool::new(config.build.uv.clone()));

    Ok(Self::with_collaborators(root, config, registry, releases, build))
  }

  /// Assemble a context from already-constructed collaborators
  pub fn with_collaborators(
    root: PathBuf,
    config: ForgeConfig,
    registry: Box<dyn Registry>,
    releases: Box<dyn ReleaseStore>,
    build: Box<dyn BuildTool>,
  ) -> Self {
    Self {
      root,
      config,
      registry,
      releases,
      build,
    }
  }

  /// Absolute packages directory
  pub fn packages_dir(&self) -> PathBuf {
    self.root.join(&self.config.workspace.packages_dir)
  }

  /// Load the named packages, or every package when `names` is empty
  ///
  /// All configs are loaded and validated before any command acts on one.
  pub fn packages(&self, names: &[String]) -> ForgeResult<Vec<PackageConfig>> {
    let packages_dir = self.packages_dir();
    let names = if names.is_empty() {
      discover_packages(&packages_dir)?
    } else {
      names.to_vec()
    };

    if names.is_empty() {
      return Err(
        ConfigError::Invalid {
          message: format!("no packages found under {}", packages_dir.display()),
        }
        .into(),
      );
    }

    names.iter().map(|name| PackageConfig::load(&packages_dir, name)).collect()
  }
}
