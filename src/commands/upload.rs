use crate::core::context::ForgeContext;
use crate::core::error::{ForgeError, ForgeResult};
use crate::core::upload::{UploadStatus, sidecar_name, upload_platform_asset};
use crate::release::record::{Platform, normalize_arch, normalize_os};
use crate::version::compare::parse_config_version;
use std::path::Path;

/// Arguments of the upload command
pub struct UploadArgs<'a> {
  pub package: &'a str,
  pub version: &'a str,
  pub artifact: &'a Path,
  pub os: Option<&'a str>,
  pub arch: Option<&'a str>,
  pub apply: bool,
  pub json: bool,
}

/// Run the upload command
pub fn run_upload(ctx: &ForgeContext, args: UploadArgs<'_>) -> ForgeResult<()> {
  let pkg = ctx
    .packages(&[args.package.to_string()])?
    .into_iter()
    .next()
    .ok_or_else(|| ForgeError::message(format!("package '{}' not found", args.package)))?;
  let version = parse_config_version(args.version)?;

  let current = Platform::current();
  let platform = Platform::new(
    args.os.map(normalize_os).unwrap_or(current.os),
    args.arch.map(normalize_arch).unwrap_or(current.arch),
  );
  let asset = platform.asset_name(&ctx.config.platforms.asset_template, &pkg.name);

  if !args.artifact.is_file() {
    return Err(ForgeError::with_help(
      format!("artifact {} does not exist", args.artifact.display()),
      "Build the platform archive first; pexforge only uploads it.",
    ));
  }

  if !args.apply {
    if args.json {
      println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
          "package": pkg.name,
          "version": version.to_string(),
          "platform": platform.to_string(),
          "asset": asset,
          "sidecar": sidecar_name(&asset),
          "artifact": args.artifact.display().to_string(),
        }))?
      );
    } else {
      println!("\n🔍 DRY-RUN MODE - No changes will be made");
      println!("   Would upload {} as {}", args.artifact.display(), asset);
      println!("   Package: {} {} ({})", pkg.name, version, platform);
      println!("   Sidecar: {}", sidecar_name(&asset));
      println!("\n✋ To upload, re-run with --apply\n");
    }
    return Ok(());
  }

  let report = upload_platform_asset(ctx, &pkg, &version, &platform, args.artifact)?;

  if args.json {
    println!("{}", serde_json::to_string_pretty(&report)?);
    return Ok(());
  }

  match report.status {
    UploadStatus::Uploaded => println!("📤 Uploaded {} to {}", report.asset, report.tag),
    UploadStatus::Unchanged => println!("✓ {} already on {} with the same content", report.asset, report.tag),
    UploadStatus::Overwritten => println!("⚠️  Replaced {} on {} (content differed)", report.asset, report.tag),
  }
  println!("   sha256: {}", report.sha256);
  if report.finalized {
    println!("🎉 {} is complete and now final", report.tag);
  } else {
    println!("   Next: {}", report.follow_up);
  }

  Ok(())
}
