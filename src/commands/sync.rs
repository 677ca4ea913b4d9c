use crate::core::context::ForgeContext;
use crate::core::error::{ForgeError, ForgeResult};
use crate::core::plan::Plan;
use crate::core::reconcile::{PackageReport, stage_counts, sync_package};

/// Run the sync command
///
/// Without `apply` this prints the plan per package and changes nothing.
pub fn run_sync(ctx: &ForgeContext, packages: &[String], apply: bool, json: bool) -> ForgeResult<()> {
  // Every config is validated before any package is touched
  let packages = ctx.packages(packages)?;

  if !apply && !json {
    println!("\n🔍 DRY-RUN MODE - No changes will be made");
    println!("   Add --apply to actually reconcile releases\n");
  } else if apply && !json {
    println!("\n🚀 APPLY MODE - Reconciling {} package(s) against {}\n", packages.len(), ctx.releases.name());
  }

  let mut reports = Vec::with_capacity(packages.len());
  let mut aborted = Vec::new();
  for pkg in &packages {
    match sync_package(ctx, pkg, apply) {
      Ok(report) => reports.push(report),
      Err(e) => {
        // Resolution or state failures abort this package only
        if e.is_transient() {
          tracing::warn!(package = %pkg.name, "package skipped until the next run: {}", e);
        } else {
          tracing::error!(package = %pkg.name, "package aborted: {}", e);
        }
        aborted.push((pkg.name.clone(), e));
      }
    }
  }

  if json {
    if apply {
      println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
      let plans: Vec<Plan> = reports.iter().map(Plan::from_report).collect();
      println!("{}", serde_json::to_string_pretty(&plans)?);
    }
  } else if apply {
    for report in &reports {
      print_report(report);
    }
  } else {
    for report in &reports {
      println!("{}", Plan::from_report(report).to_human_readable());
    }
    if !reports.is_empty() {
      println!("✋ To execute these plans, run:");
      println!("   pexforge sync --apply\n");
    }
  }

  finish(reports, aborted, apply && !json)
}

fn print_report(report: &PackageReport) {
  println!("📦 {}", report.package);
  for outcome in &report.versions {
    let marker = if outcome.error.is_some() { "✗" } else { "✓" };
    let actions = if outcome.actions.is_empty() {
      "no change".to_string()
    } else {
      outcome.actions.iter().map(|a| a.label()).collect::<Vec<_>>().join(" → ")
    };
    println!("   {} {:<24} {:<20} {}", marker, outcome.tag, outcome.stage.to_string(), actions);
    if let Some(err) = &outcome.error {
      println!("      {}", err);
    }
  }
  let counts = stage_counts(report);
  let summary: Vec<String> = counts.iter().map(|(stage, n)| format!("{} {}", n, stage)).collect();
  println!("   Summary: {}", summary.join(", "));
  if !report.orphans.is_empty() {
    println!("   ⚠️  Orphaned releases (left in place): {}", report.orphans.join(", "));
  }
  println!();
}

/// Collapse per-package outcomes into the command result
fn finish(reports: Vec<PackageReport>, mut aborted: Vec<(String, ForgeError)>, announce: bool) -> ForgeResult<()> {
  let mut packages = Vec::new();
  let mut failed = Vec::new();
  for report in &reports {
    let versions = report.failed();
    if !versions.is_empty() {
      packages.push(report.package.clone());
      failed.extend(versions.into_iter().map(|v| format!("{} {}", report.package, v)));
    }
  }

  // A single aborted package keeps its own error (and exit code)
  if aborted.len() == 1 && failed.is_empty() {
    let (_, e) = aborted.remove(0);
    return Err(e);
  }

  for (name, e) in &aborted {
    packages.push(name.clone());
    let reason = if e.is_transient() { "unavailable" } else { "aborted" };
    failed.push(format!("{} ({})", name, reason));
  }

  if failed.is_empty() {
    if announce {
      println!("🎉 Sync complete");
    }
    return Ok(());
  }

  Err(ForgeError::Incomplete {
    package: packages.join(", "),
    failed,
  })
}
