//! Filesystem release store
//!
//! Mirrors the release API on disk so runs work offline:
//!
//! ```text
//! <root>/<tag>/release.json     {"tag", "title", "prerelease", "description"}
//! <root>/<tag>/assets/<name>    asset bytes
//! ```

use crate::core::error::{ForgeError, ForgeResult, ReleaseStoreError, ResultExt};
use crate::release::descriptor::BuildDescriptor;
use crate::release::record::{AssetRecord, ReleaseRecord};
use crate::release::store::ReleaseStore;
use crate::utils::{sha256_hex, write_atomic};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const RELEASE_FILE: &str = "release.json";
const ASSETS_DIR: &str = "assets";

#[derive(Debug, Serialize, Deserialize)]
struct ReleaseFile {
  tag: String,
  #[serde(default)]
  title: String,
  prerelease: bool,
  #[serde(default)]
  description: String,
}

/// Release store backed by a local directory
pub struct DirectoryReleases {
  root: PathBuf,
}

impl DirectoryReleases {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  fn release_dir(&self, tag: &str) -> ForgeResult<PathBuf> {
    validate_component(tag)?;
    Ok(self.root.join(tag))
  }

  fn read_file(&self, tag: &str) -> ForgeResult<Option<ReleaseFile>> {
    let path = self.release_dir(tag)?.join(RELEASE_FILE);
    if !path.exists() {
      return Ok(None);
    }
    let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let file = serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(file))
  }

  fn require_file(&self, tag: &str) -> ForgeResult<ReleaseFile> {
    self.read_file(tag)?.ok_or_else(|| {
      ReleaseStoreError::NotFound {
        tag: tag.to_string(),
      }
      .into()
    })
  }

  fn write_file(&self, file: &ReleaseFile) -> ForgeResult<()> {
    let path = self.release_dir(&file.tag)?.join(RELEASE_FILE);
    let json = serde_json::to_string_pretty(file)?;
    write_atomic(&path, json.as_bytes())
  }

  fn read_assets(&self, tag: &str) -> ForgeResult<AssetRecord> {
    let dir = self.release_dir(tag)?.join(ASSETS_DIR);
    let mut assets = AssetRecord::new();
    if !dir.exists() {
      return Ok(assets);
    }

    for entry in fs::read_dir(&dir)? {
      let entry = entry?;
      if !entry.file_type()?.is_file() {
        continue;
      }
      let name = entry.file_name().to_string_lossy().to_string();
      let bytes = fs::read(entry.path())?;
      assets.insert(name, sha256_hex(&bytes));
    }
    Ok(assets)
  }
}

impl ReleaseStore for DirectoryReleases {
  fn name(&self) -> &'static str {
    "directory"
  }

  fn get(&self, tag: &str) -> ForgeResult<Option<ReleaseRecord>> {
    let Some(file) = self.read_file(tag)? else {
      return Ok(None);
    };

    Ok(Some(ReleaseRecord {
      tag: file.tag,
      is_prerelease: file.prerelease,
      build_descriptor: BuildDescriptor::from_description(&file.description),
      assets: self.read_assets(tag)?,
    }))
  }

  fn create(&self, tag: &str, title: &str, prerelease: bool) -> ForgeResult<ReleaseRecord> {
    if self.read_file(tag)?.is_some() {
      return Err(
        ReleaseStoreError::Unavailable {
          tag: tag.to_string(),
          reason: "a release with this tag already exists".to_string(),
        }
        .into(),
      );
    }

    tracing::debug!("creating release {} under {}", tag, self.root.display());
    fs::create_dir_all(self.release_dir(tag)?.join(ASSETS_DIR))?;
    self.write_file(&ReleaseFile {
      tag: tag.to_string(),
      title: title.to_string(),
      prerelease,
      description: String::new(),
    })?;

    Ok(ReleaseRecord {
      tag: tag.to_string(),
      is_prerelease: prerelease,
      build_descriptor: None,
      assets: AssetRecord::new(),
    })
  }

  fn delete(&self, tag: &str) -> ForgeResult<()> {
    self.require_file(tag)?;
    let dir = self.release_dir(tag)?;
    tracing::debug!("deleting release {}", dir.display());
    fs::remove_dir_all(&dir).with_context(|| format!("Failed to delete {}", dir.display()))?;
    Ok(())
  }

  fn upload_asset(&self, tag: &str, name: &str, bytes: &[u8]) -> ForgeResult<String> {
    self.require_file(tag)?;
    validate_component(name)?;
    let path = self.release_dir(tag)?.join(ASSETS_DIR).join(name);
    write_atomic(&path, bytes)?;
    Ok(sha256_hex(bytes))
  }

  fn set_final(&self, tag: &str) -> ForgeResult<()> {
    let mut file = self.require_file(tag)?;
    file.prerelease = false;
    self.write_file(&file)
  }

  fn set_description(&self, tag: &str, text: &str) -> ForgeResult<()> {
    let mut file = self.require_file(tag)?;
    file.description = text.to_string();
    self.write_file(&file)
  }
}

/// Tags and asset names become path components; keep them to a single one
fn validate_component(value: &str) -> ForgeResult<()> {
  if value.is_empty() || value == "." || value == ".." || value.contains(['/', '\\']) {
    return Err(ForgeError::message(format!(
      "'{}' cannot be used as a release tag or asset name",
      value
    )));
  }
  Ok(())
}
