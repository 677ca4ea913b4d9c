use crate::core::context::ForgeContext;
use crate::core::error::ForgeResult;
use crate::core::reconcile::resolve_package;
use crate::release::record::release_tag;
use crate::version::ResolvedVersion;
use crate::version::resolver::lowest_floor;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct PackageResolution {
  package: String,
  #[serde(skip)]
  lowest_floor: Option<String>,
  versions: Vec<ResolvedVersion>,
}

/// Run the resolve command
pub fn run_resolve(ctx: &ForgeContext, packages: &[String], json: bool) -> ForgeResult<()> {
  let packages = ctx.packages(packages)?;

  let mut resolutions = Vec::with_capacity(packages.len());
  for pkg in &packages {
    resolutions.push(PackageResolution {
      package: pkg.name.clone(),
      lowest_floor: lowest_floor(&pkg.anchors).map(|v| v.to_string()),
      versions: resolve_package(ctx, pkg)?,
    });
  }

  if json {
    println!("{}", serde_json::to_string_pretty(&resolutions)?);
    return Ok(());
  }

  for resolution in &resolutions {
    println!("\n📦 {} ({} version(s))\n", resolution.package, resolution.versions.len());
    if resolution.versions.is_empty() {
      println!(
        "   No upstream version reaches the lowest configured floor ({})",
        resolution.lowest_floor.as_deref().unwrap_or("-")
      );
      continue;
    }
    println!("   {:<16} {:<10} TAG", "VERSION", "RUNTIME");
    for rv in &resolution.versions {
      println!(
        "   {:<16} {:<10} {}",
        rv.version.to_string(),
        rv.runtime,
        release_tag(&resolution.package, &rv.version)
      );
    }
  }
  println!();

  Ok(())
}
