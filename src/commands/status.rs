use crate::core::context::ForgeContext;
use crate::core::error::ForgeResult;
use crate::release::record::release_tag;
use crate::state::LocalStateStore;
use serde::{Deserialize, Serialize};

/// Cached lifecycle of one version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionStatus {
  pub tag: String,
  pub version: String,
  pub runtime: String,
  pub requirements_ready: bool,
  pub release_created: bool,
  /// Required assets present in the last observation
  pub assets_present: usize,
  pub assets_required: usize,
}

/// Status information for a single package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageStatus {
  pub name: String,
  pub versions: Vec<VersionStatus>,
}

/// Run the status command
///
/// Reads `state.json` only: no registry or release store access.
pub fn run_status(ctx: &ForgeContext, json: bool) -> ForgeResult<()> {
  let packages = ctx.packages(&[])?;

  let mut statuses = Vec::with_capacity(packages.len());
  for pkg in &packages {
    let required = ctx.config.platforms.required_assets(&pkg.name);
    let state = LocalStateStore::new(&pkg.dir).load()?;
    let versions = state
      .iter()
      .map(|(version, entry)| VersionStatus {
        tag: release_tag(&pkg.name, version),
        version: version.to_string(),
        runtime: entry.runtime.clone(),
        requirements_ready: entry.state.requirements_ready,
        release_created: entry.state.release_created,
        assets_present: required.iter().filter(|a| entry.state.assets.contains_key(*a)).count(),
        assets_required: required.len(),
      })
      .collect();
    statuses.push(PackageStatus {
      name: pkg.name.clone(),
      versions,
    });
  }

  if json {
    println!("{}", serde_json::to_string_pretty(&statuses)?);
  } else {
    print_status_table(&statuses);
  }

  Ok(())
}

/// Print status as a formatted table
fn print_status_table(statuses: &[PackageStatus]) {
  println!("\n📊 Package Status\n");

  println!("{:<28} {:<10} {:<14} {:<10} ASSETS", "TAG", "RUNTIME", "REQUIREMENTS", "RELEASE");
  println!("{:-<80}", "");

  for status in statuses {
    if status.versions.is_empty() {
      println!("{:<28} (no recorded versions; run `pexforge sync`)", status.name);
      continue;
    }
    for v in &status.versions {
      let requirements = if v.requirements_ready { "ready" } else { "-" };
      let release = if v.release_created { "created" } else { "-" };
      let assets = if v.assets_present == v.assets_required {
        format!("{}/{} ✓", v.assets_present, v.assets_required)
      } else {
        format!("{}/{}", v.assets_present, v.assets_required)
      };
      println!("{:<28} {:<10} {:<14} {:<10} {}", v.tag, v.runtime, requirements, release, assets);
    }
  }

  println!();
}
