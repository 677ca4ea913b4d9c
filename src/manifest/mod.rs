//! Hermit manifest projection
//!
//! Renders `<package>.hcl` from the versions whose required asset set is
//! complete. Rendering is pure; `write_manifest` does the atomic file write.

use crate::core::error::ForgeResult;
use crate::release::record::release_tag;
use crate::state::StateMap;
use crate::utils::write_atomic;
use crate::version::ResolvedVersion;
use crate::version::compare::compare;
use semver::Version;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Package-level fields of the manifest
#[derive(Debug, Clone)]
pub struct ManifestInput<'a> {
  pub package: &'a str,
  pub description: &'a str,
  pub binaries: &'a [String],
  pub test: Option<&'a str>,
  /// GitHub `owner/name` hosting the release downloads
  pub repository: &'a str,
  pub asset_template: &'a str,
}

/// A complete version and the exact `(asset, sha256)` pairs it publishes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalizedVersion {
  pub version: Version,
  pub assets: Vec<(String, String)>,
}

/// Resolved versions carrying every required asset with a known hash, newest first
///
/// State entries outside `resolved` (orphans) are never projected.
pub fn finalized_assets(
  state: &StateMap,
  resolved: &[ResolvedVersion],
  required: &BTreeSet<String>,
) -> Vec<FinalizedVersion> {
  let mut versions: Vec<FinalizedVersion> = resolved
    .iter()
    .filter_map(|rv| state.get_key_value(&rv.version))
    .filter_map(|(version, entry)| {
      let assets: Vec<(String, String)> = required
        .iter()
        .filter_map(|name| {
          entry
            .state
            .assets
            .get(name)
            .filter(|hash| !hash.is_empty())
            .map(|hash| (name.clone(), hash.clone()))
        })
        .collect();
      (assets.len() == required.len()).then(|| FinalizedVersion {
        version: version.clone(),
        assets,
      })
    })
    .collect();

  versions.sort_by(|a, b| compare(&b.version, &a.version));
  versions
}

/// Download URL of one release asset
pub fn download_url(repository: &str, tag: &str, asset: &str) -> String {
  format!("https://github.com/{}/releases/download/{}/{}", repository, tag, asset)
}

/// Render the manifest text
pub fn render(input: &ManifestInput<'_>, versions: &[FinalizedVersion]) -> String {
  let mut out = String::new();

  let _ = writeln!(out, "description = {}", hcl_string(input.description));
  let binaries: Vec<String> = input.binaries.iter().map(|b| hcl_string(b)).collect();
  let _ = writeln!(out, "binaries = [{}]", binaries.join(", "));
  if let Some(test) = input.test.filter(|t| !t.is_empty()) {
    let _ = writeln!(out, "test = {}", hcl_string(test));
  }
  let _ = writeln!(out, "repository = \"https://github.com/{}\"", input.repository);

  let source_asset = input
    .asset_template
    .replace("{package}", input.package)
    .replace("{os}", "${os}")
    .replace("{arch}", "${arch}");
  let source = download_url(
    input.repository,
    &format!("{}-v${{version}}", input.package),
    &source_asset,
  );
  let _ = writeln!(out, "source = {}\n", hcl_string(&source));

  for v in versions {
    let _ = writeln!(out, "version \"{}\" {{\n}}\n", v.version);
  }

  let mut sums: Vec<(String, &str)> = versions
    .iter()
    .flat_map(|v| {
      let tag = release_tag(input.package, &v.version);
      v.assets
        .iter()
        .map(move |(name, hash)| (download_url(input.repository, &tag, name), hash.as_str()))
    })
    .collect();
  sums.sort();

  out.push_str("sha256sums = {\n");
  for (url, hash) in sums {
    let _ = writeln!(out, "  {}: {},", hcl_string(&url), hcl_string(hash));
  }
  out.push_str("}\n");

  out
}

/// Write `<out_dir>/<package>.hcl` atomically
pub fn write_manifest(out_dir: &Path, package: &str, content: &str) -> ForgeResult<PathBuf> {
  let path = out_dir.join(format!("{}.hcl", package));
  write_atomic(&path, content.as_bytes())?;
  Ok(path)
}

fn hcl_string(value: &str) -> String {
  let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
  // `${` stays unescaped so the source URL interpolates
  format!("\"{}\"", escaped)
}
