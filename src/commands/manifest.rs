use crate::core::context::ForgeContext;
use crate::core::error::ForgeResult;
use crate::manifest::{FinalizedVersion, ManifestInput, finalized_assets, render, write_manifest};
use crate::state::LocalStateStore;
use crate::version::resolve;
use semver::Version;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct ManifestOutcome {
  package: String,
  versions: Vec<FinalizedVersion>,
  #[serde(skip_serializing_if = "Option::is_none")]
  path: Option<String>,
}

/// Run the manifest command
///
/// Projects cached state only; run `sync --apply` first to refresh it. Versions
/// are re-resolved against the current anchors so orphans never reach the file.
pub fn run_manifest(
  ctx: &ForgeContext,
  packages: &[String],
  out: Option<&Path>,
  apply: bool,
  json: bool,
) -> ForgeResult<()> {
  let packages = ctx.packages(packages)?;
  let repository = ctx.config.download_repository()?;
  let out_dir = match out {
    Some(dir) => ctx.root.join(dir),
    None => ctx
      .config
      .manifest
      .out_dir
      .as_ref()
      .map(|dir| ctx.root.join(dir))
      .unwrap_or_else(|| ctx.root.clone()),
  };

  let mut outcomes = Vec::with_capacity(packages.len());
  for pkg in &packages {
    let state = LocalStateStore::new(&pkg.dir).load()?;
    // Entries left behind by narrowed anchors do not resolve and stay out
    let known: Vec<Version> = state.keys().cloned().collect();
    let resolved = resolve(&pkg.name, &pkg.anchors, &known)?;
    let required = ctx.config.platforms.required_assets(&pkg.name);
    let versions = finalized_assets(&state, &resolved, &required);

    let input = ManifestInput {
      package: &pkg.name,
      description: &pkg.description,
      binaries: &pkg.binaries,
      test: pkg.test.as_deref(),
      repository,
      asset_template: &ctx.config.platforms.asset_template,
    };
    let content = render(&input, &versions);

    let path = if apply {
      let path = write_manifest(&out_dir, &pkg.name, &content)?;
      tracing::info!("wrote {} with {} version(s)", path.display(), versions.len());
      Some(path.display().to_string())
    } else {
      if !json {
        println!("# {}.hcl\n{}", pkg.name, content);
      }
      None
    };

    outcomes.push(ManifestOutcome {
      package: pkg.name.clone(),
      versions,
      path,
    });
  }

  if json {
    println!("{}", serde_json::to_string_pretty(&outcomes)?);
  } else if apply {
    for outcome in &outcomes {
      if let Some(path) = &outcome.path {
        println!("📝 {} ({} complete version(s))", path, outcome.versions.len());
      }
    }
  } else {
    println!("✋ To write these manifests, re-run with --apply");
  }

  Ok(())
}
