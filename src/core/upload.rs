//! Platform-scoped asset upload
//!
//! Each platform runner uploads the one asset it owns into an open prerelease,
//! then runs the engine once against a fresh read so whichever runner completes
//! the asset set finalizes the release in the same pass.

use crate::core::config::PackageConfig;
use crate::core::context::ForgeContext;
use crate::core::error::{ForgeError, ForgeResult, ReleaseStoreError, ResultExt};
use crate::core::reconcile::{expected_descriptor, resolve_package};
use crate::release::engine::{Action, reconcile};
use crate::release::record::{Platform, ReleaseRecord, release_tag};
use crate::state::{LocalStateStore, StateEntry, VersionState};
use crate::utils::sha256_hex;
use semver::Version;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// What the upload did with the asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
  Uploaded,
  /// Same name, same content: nothing sent
  Unchanged,
  /// Same name, different content: replaced
  Overwritten,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
  pub tag: String,
  pub asset: String,
  pub sha256: String,
  pub status: UploadStatus,
  /// Engine action taken after the upload
  pub follow_up: Action,
  pub finalized: bool,
}

/// Name of the checksum sidecar uploaded next to an asset (`x.tar.gz` -> `x.tar.sha256`)
pub fn sidecar_name(asset: &str) -> String {
  match asset.rsplit_once('.') {
    Some((stem, _)) => format!("{stem}.sha256"),
    None => format!("{asset}.sha256"),
  }
}

/// Upload `artifact` as this platform's asset for `version` of `pkg`
pub fn upload_platform_asset(
  ctx: &ForgeContext,
  pkg: &PackageConfig,
  version: &Version,
  platform: &Platform,
  artifact: &Path,
) -> ForgeResult<UploadReport> {
  let resolved = resolve_package(ctx, pkg)?
    .into_iter()
    .find(|r| &r.version == version)
    .ok_or_else(|| {
      ForgeError::with_help(
        format!("{} {} is not resolved by the configured anchors", pkg.name, version),
        "Check the [[versions]] floors in the package config.",
      )
    })?;

  let platforms = &ctx.config.platforms;
  if !platforms.matrix().contains(platform) {
    tracing::warn!("{} is not a configured platform; its asset will not count toward finalization", platform);
  }

  let tag = release_tag(&pkg.name, version);
  let expected = expected_descriptor(pkg, &resolved);
  let required = platforms.required_assets(&pkg.name);

  let remote = ctx.releases.get(&tag)?.ok_or_else(|| ReleaseStoreError::NotFound { tag: tag.clone() })?;
  if !remote.is_prerelease {
    return Err(ForgeError::with_help(
      format!("{} is already final; refusing to upload into it", tag),
      "Final releases are never reopened. Delete the release manually to rebuild it.",
    ));
  }
  if remote.build_descriptor.as_ref() != Some(&expected) {
    return Err(ForgeError::with_help(
      format!("{} does not carry the current build descriptor; refusing to upload", tag),
      "Run `pexforge sync --apply` to recreate the release, then rebuild.",
    ));
  }

  let asset = platform.asset_name(&platforms.asset_template, &pkg.name);
  let bytes = fs::read(artifact).with_context(|| format!("Failed to read artifact {}", artifact.display()))?;
  let sha256 = sha256_hex(&bytes);

  let status = put_asset(ctx, &remote, &asset, &bytes)?;
  let sidecar = format!("{}  {}\n", sha256, asset);
  put_asset(ctx, &remote, &sidecar_name(&asset), sidecar.as_bytes())?;

  // Fresh read: other platforms may have uploaded meanwhile
  let after = ctx.releases.get(&tag)?.ok_or_else(|| ReleaseStoreError::Postcondition {
    tag: tag.clone(),
    expected: "release still present after upload".to_string(),
  })?;
  if after.assets.get(&asset) != Some(&sha256) {
    return Err(
      ReleaseStoreError::Postcondition {
        tag,
        expected: format!("{} with sha256 {}", asset, sha256),
      }
      .into(),
    );
  }

  let store = LocalStateStore::new(&pkg.dir);
  let mut state = store.load()?;
  let local = VersionState {
    requirements_ready: true,
    ..state.get(version).map(|e| e.state.clone()).unwrap_or_default()
  };

  let (follow_up, mut next) = reconcile(&resolved, &local, Some(&after), &expected, &required);
  let mut finalized = false;
  match &follow_up {
    Action::Finalize => {
      ctx.releases.set_final(&tag)?;
      let confirmed = ctx.releases.get(&tag)?;
      match confirmed {
        Some(record) if !record.is_prerelease && record.is_complete(&required) => {
          tracing::info!("{} carries every required asset; finalized", tag);
          next = next.mirror(&record);
          finalized = true;
        }
        _ => {
          return Err(
            ReleaseStoreError::Postcondition {
              tag,
              expected: "final release".to_string(),
            }
            .into(),
          );
        }
      }
    }
    Action::NoOp { .. } => {
      let missing = after.missing_assets(&required);
      tracing::info!("{} still waits for {} asset(s): {}", tag, missing.len(), missing.join(", "));
    }
    other => {
      tracing::warn!("{} changed during upload, next sync will {}", tag, other);
    }
  }

  state.insert(
    version.clone(),
    StateEntry {
      runtime: resolved.runtime.clone(),
      state: next,
    },
  );
  store.save(&state)?;

  Ok(UploadReport {
    tag,
    asset,
    sha256,
    status,
    follow_up,
    finalized,
  })
}

/// Upload unless the same content is already there; overwrite on conflict
fn put_asset(ctx: &ForgeContext, remote: &ReleaseRecord, name: &str, bytes: &[u8]) -> ForgeResult<UploadStatus> {
  let sha256 = sha256_hex(bytes);
  let status = match remote.assets.get(name) {
    Some(existing) if *existing == sha256 => {
      tracing::info!("{} already has {} with the same content; skipping", remote.tag, name);
      return Ok(UploadStatus::Unchanged);
    }
    Some(existing) => {
      tracing::warn!(
        tag = %remote.tag,
        asset = name,
        existing = %existing,
        uploading = %sha256,
        "AssetUploadConflict: replacing asset with different content"
      );
      UploadStatus::Overwritten
    }
    None => UploadStatus::Uploaded,
  };

  let stored = ctx.releases.upload_asset(&remote.tag, name, bytes)?;
  if stored != sha256 {
    return Err(
      ReleaseStoreError::Postcondition {
        tag: remote.tag.clone(),
        expected: format!("{} stored with sha256 {}", name, sha256),
      }
      .into(),
    );
  }
  Ok(status)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::build::UvBuildTool;
  use crate::core::config::ForgeConfig;
  use crate::registry::Registry;
  use crate::release::directory::DirectoryReleases;
  use crate::release::record::release_title;
  use tempfile::TempDir;

  struct FixedRegistry;

  impl Registry for FixedRegistry {
    fn list_versions(&self, _package: &str) -> ForgeResult<Vec<String>> {
      Ok(vec!["1.0.0".to_string(), "1.1.0".to_string()])
    }
  }

  struct Fixture {
    dir: TempDir,
    ctx: ForgeContext,
    pkg: PackageConfig,
  }

  fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let root = dir.path().to_path_buf();
    let config = ForgeConfig::parse(
      "[release_store]\nkind = \"directory\"\npath = \"releases\"\n[platforms]\nos = [\"linux\", \"darwin\"]\narch = [\"arm64\"]\n",
    )
    .unwrap();
    let pkg = PackageConfig::parse(
      "binaries = [\"ruff\"]\n[[versions]]\nfloor = \"1.0.0\"\nruntime = \"3.12\"\n",
      "ruff",
      root.join("packages").join("ruff"),
    )
    .unwrap();
    fs::create_dir_all(&pkg.dir).unwrap();
    let ctx = ForgeContext::with_collaborators(
      root.clone(),
      config,
      Box::new(FixedRegistry),
      Box::new(DirectoryReleases::new(root.join("releases"))),
      Box::new(UvBuildTool::new("uv")),
    );
    Fixture { dir, ctx, pkg }
  }

  /// Open a prerelease carrying the descriptor for `version`
  fn open_prerelease(f: &Fixture, version: &Version) {
    let resolved = resolve_package(&f.ctx, &f.pkg)
      .unwrap()
      .into_iter()
      .find(|r| &r.version == version)
      .unwrap();
    let tag = release_tag(&f.pkg.name, version);
    f.ctx
      .releases
      .create(&tag, &release_title(&f.pkg.name, version), true)
      .unwrap();
    let description = expected_descriptor(&f.pkg, &resolved).render_description(&f.pkg.name);
    f.ctx.releases.set_description(&tag, &description).unwrap();
  }

  fn artifact(f: &Fixture, name: &str, content: &[u8]) -> std::path::PathBuf {
    let path = f.dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
  }

  #[test]
  fn test_missing_release_is_refused() {
    let f = fixture();
    let file = artifact(&f, "a.tar.gz", b"linux");
    let err = upload_platform_asset(
      &f.ctx,
      &f.pkg,
      &Version::new(1, 1, 0),
      &Platform::new("linux", "arm64"),
      &file,
    )
    .unwrap_err();
    assert!(matches!(err, ForgeError::ReleaseStore(ReleaseStoreError::NotFound { .. })));
  }

  #[test]
  fn test_unresolved_version_is_refused() {
    let f = fixture();
    let file = artifact(&f, "a.tar.gz", b"linux");
    let err = upload_platform_asset(
      &f.ctx,
      &f.pkg,
      &Version::new(0, 9, 0),
      &Platform::new("linux", "arm64"),
      &file,
    )
    .unwrap_err();
    assert!(err.to_string().contains("not resolved"));
  }

  #[test]
  fn test_stale_descriptor_is_refused() {
    let f = fixture();
    let version = Version::new(1, 1, 0);
    open_prerelease(&f, &version);

    let mut changed = f.pkg.clone();
    changed.config_revision += 1;
    let file = artifact(&f, "a.tar.gz", b"linux");
    let err =
      upload_platform_asset(&f.ctx, &changed, &version, &Platform::new("linux", "arm64"), &file).unwrap_err();
    assert!(err.to_string().contains("build descriptor"));
    assert!(f.ctx.releases.get("ruff-v1.1.0").unwrap().unwrap().assets.is_empty());
  }

  #[test]
  fn test_last_platform_finalizes() {
    let f = fixture();
    let version = Version::new(1, 1, 0);
    open_prerelease(&f, &version);

    let linux = artifact(&f, "linux.tar.gz", b"linux build");
    let report = upload_platform_asset(&f.ctx, &f.pkg, &version, &Platform::new("linux", "arm64"), &linux).unwrap();
    assert_eq!(report.asset, "ruff-linux-arm64.tar.gz");
    assert_eq!(report.status, UploadStatus::Uploaded);
    assert!(!report.finalized);
    assert!(report.follow_up.is_noop());

    let darwin = artifact(&f, "darwin.tar.gz", b"darwin build");
    let report = upload_platform_asset(&f.ctx, &f.pkg, &version, &Platform::new("darwin", "arm64"), &darwin).unwrap();
    assert!(report.finalized);
    assert_eq!(report.follow_up, Action::Finalize);

    let record = f.ctx.releases.get("ruff-v1.1.0").unwrap().unwrap();
    assert!(!record.is_prerelease);
    let sidecar = "ruff-darwin-arm64.tar.sha256";
    assert!(record.assets.contains_key(sidecar));

    let state = LocalStateStore::new(&f.pkg.dir).load().unwrap();
    let entry = &state[&version];
    assert!(entry.state.release_created);
    assert_eq!(entry.state.assets.get("ruff-darwin-arm64.tar.gz"), Some(&sha256_hex(b"darwin build")));
  }

  #[test]
  fn test_final_release_is_never_reopened() {
    let f = fixture();
    let version = Version::new(1, 1, 0);
    open_prerelease(&f, &version);
    f.ctx.releases.set_final("ruff-v1.1.0").unwrap();

    let file = artifact(&f, "a.tar.gz", b"late");
    let err = upload_platform_asset(&f.ctx, &f.pkg, &version, &Platform::new("linux", "arm64"), &file).unwrap_err();
    assert!(err.to_string().contains("already final"));
  }

  #[test]
  fn test_reupload_same_content_is_unchanged_and_different_overwrites() {
    let f = fixture();
    let version = Version::new(1, 0, 0);
    open_prerelease(&f, &version);
    let platform = Platform::new("linux", "arm64");

    let first = artifact(&f, "one.tar.gz", b"first");
    upload_platform_asset(&f.ctx, &f.pkg, &version, &platform, &first).unwrap();
    let again = upload_platform_asset(&f.ctx, &f.pkg, &version, &platform, &first).unwrap();
    assert_eq!(again.status, UploadStatus::Unchanged);

    let second = artifact(&f, "two.tar.gz", b"second");
    let replaced = upload_platform_asset(&f.ctx, &f.pkg, &version, &platform, &second).unwrap();
    assert_eq!(replaced.status, UploadStatus::Overwritten);
    let record = f.ctx.releases.get("ruff-v1.0.0").unwrap().unwrap();
    assert_eq!(record.assets["ruff-linux-arm64.tar.gz"], sha256_hex(b"second"));
  }

  #[test]
  fn test_sidecar_name_strips_last_extension() {
    assert_eq!(sidecar_name("black-linux-amd64.tar.gz"), "black-linux-amd64.tar.sha256");
    assert_eq!(sidecar_name("black"), "black.sha256");
  }
}
