//! Per-run reconciliation orchestrator
//!
//! Drives every resolved version of a package through the engine:
//!
//! ```text
//! registry ─▶ resolve ─▶ for each version (ascending):
//!                          read remote ─▶ reconcile ─▶ execute ─▶ re-read and confirm
//!                          (repeat until no-op)
//!                        save state
//! ```
//!
//! A failing version is logged and skipped; the rest of the batch continues.
//! Resolution and state loading failures abort the package before any write.

use crate::build::BuildTool;
use crate::core::config::PackageConfig;
use crate::core::context::ForgeContext;
use crate::core::error::{BuildError, ForgeError, ForgeResult, ReleaseStoreError};
use crate::release::descriptor::BuildDescriptor;
use crate::release::engine::{Action, Stage, reconcile};
use crate::release::record::{release_tag, release_title};
use crate::release::store::ReleaseStore;
use crate::state::{LocalStateStore, StateEntry, StateMap, VersionState};
use crate::ui::progress::VersionProgress;
use crate::version::compare::parse_upstream_list;
use crate::version::{ResolvedVersion, resolve};
use semver::Version;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Upper bound on engine steps for one version in one run
///
/// The longest path is generate, recreate, finalize, then the closing no-op.
const MAX_STEPS: usize = 6;

/// What happened to one resolved version
#[derive(Debug, Clone, Serialize)]
pub struct VersionOutcome {
  pub version: Version,
  pub runtime: String,
  pub tag: String,
  /// Actions executed (or, in dry-run mode, the single action that would run next)
  pub actions: Vec<Action>,
  pub stage: Stage,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

/// Result of reconciling one package
#[derive(Debug, Clone, Serialize)]
pub struct PackageReport {
  pub package: String,
  pub applied: bool,
  pub versions: Vec<VersionOutcome>,
  /// Tags in local state whose version no longer resolves; left untouched
  pub orphans: Vec<String>,
}

impl PackageReport {
  pub fn failed(&self) -> Vec<String> {
    self
      .versions
      .iter()
      .filter(|v| v.error.is_some())
      .map(|v| v.version.to_string())
      .collect()
  }

  /// `Incomplete` when any version failed
  pub fn into_result(self) -> ForgeResult<Self> {
    let failed = self.failed();
    if failed.is_empty() {
      Ok(self)
    } else {
      Err(ForgeError::Incomplete {
        package: self.package,
        failed,
      })
    }
  }
}

/// Resolve the versions of `pkg` against the registry
///
/// Registry failures propagate; they never turn into an empty version set.
pub fn resolve_package(ctx: &ForgeContext, pkg: &PackageConfig) -> ForgeResult<Vec<ResolvedVersion>> {
  let listed = ctx.registry.list_versions(&pkg.name)?;
  let upstream = parse_upstream_list(&listed);
  let resolved = resolve(&pkg.name, &pkg.anchors, &upstream)?;
  tracing::info!(
    "{}: {} upstream version(s), {} resolved",
    pkg.name,
    upstream.len(),
    resolved.len()
  );
  Ok(resolved)
}

/// The descriptor a release for `resolved` must carry
pub fn expected_descriptor(pkg: &PackageConfig, resolved: &ResolvedVersion) -> BuildDescriptor {
  BuildDescriptor {
    config_revision: pkg.config_revision,
    runtime: resolved.runtime.clone(),
    version: resolved.version.clone(),
    binaries: pkg.binaries.clone(),
  }
}

/// Reconcile every resolved version of `pkg`
///
/// Without `apply`, each version gets one read-only pass that reports the next
/// action and nothing is written.
pub fn sync_package(ctx: &ForgeContext, pkg: &PackageConfig, apply: bool) -> ForgeResult<PackageReport> {
  let resolved = resolve_package(ctx, pkg)?;
  let store = LocalStateStore::new(&pkg.dir);
  let mut state = store.load()?;
  let required = ctx.config.platforms.required_assets(&pkg.name);

  let mut progress = if apply {
    VersionProgress::new(resolved.len(), format!("Reconciling {}", pkg.name))
  } else {
    VersionProgress::hidden()
  };

  let mut outcomes = Vec::with_capacity(resolved.len());
  for rv in &resolved {
    let tag = release_tag(&pkg.name, &rv.version);
    let mut local = state.get(&rv.version).map(|e| e.state.clone()).unwrap_or_default();
    local.requirements_ready = ctx.build.requirements_present(&pkg.dir, &rv.version);

    let driver = VersionDriver {
      releases: ctx.releases.as_ref(),
      build: ctx.build.as_ref(),
      pkg,
      resolved: rv,
      tag: &tag,
      expected: expected_descriptor(pkg, rv),
      required: &required,
    };

    let outcome = if apply {
      let (outcome, next) = driver.drive(local);
      state.insert(
        rv.version.clone(),
        StateEntry {
          runtime: rv.runtime.clone(),
          state: next,
        },
      );
      outcome
    } else {
      driver.plan(&local)
    };

    if let Some(err) = &outcome.error {
      let action = outcome.actions.last().map(|a| a.label()).unwrap_or("read");
      tracing::error!(
        tag = %tag,
        version = %rv.version,
        runtime = %rv.runtime,
        action = action,
        "version failed, skipping: {}",
        err
      );
    }
    outcomes.push(outcome);
    progress.inc();
  }

  let orphans = find_orphans(pkg, &state, &resolved);
  for tag in &orphans {
    tracing::info!("orphaned release {} is no longer resolved; leaving it in place", tag);
  }

  if apply {
    store.save(&state)?;
  }

  Ok(PackageReport {
    package: pkg.name.clone(),
    applied: apply,
    versions: outcomes,
    orphans,
  })
}

/// Tags of state entries whose version is no longer resolved
///
/// Pruning them is a policy decision this tool does not make.
pub fn find_orphans(pkg: &PackageConfig, state: &StateMap, resolved: &[ResolvedVersion]) -> Vec<String> {
  let live: BTreeSet<&Version> = resolved.iter().map(|r| &r.version).collect();
  state
    .iter()
    .filter(|(version, entry)| !live.contains(version) && entry.state.release_created)
    .map(|(version, _)| release_tag(&pkg.name, version))
    .collect()
}

/// Executes engine actions for one version against the collaborators
struct VersionDriver<'a> {
  releases: &'a dyn ReleaseStore,
  build: &'a dyn BuildTool,
  pkg: &'a PackageConfig,
  resolved: &'a ResolvedVersion,
  tag: &'a str,
  expected: BuildDescriptor,
  required: &'a BTreeSet<String>,
}

impl VersionDriver<'_> {
  fn outcome(&self, actions: Vec<Action>, stage: Stage, error: Option<String>) -> VersionOutcome {
    VersionOutcome {
      version: self.resolved.version.clone(),
      runtime: self.resolved.runtime.clone(),
      tag: self.tag.to_string(),
      actions,
      stage,
      error,
    }
  }

  /// One read-only pass: what would happen next
  fn plan(&self, local: &VersionState) -> VersionOutcome {
    match self.releases.get(self.tag) {
      Ok(remote) => {
        let (action, _) = reconcile(self.resolved, local, remote.as_ref(), &self.expected, self.required);
        let stage = Stage::observe(local, remote.as_ref());
        self.outcome(vec![action], stage, None)
      }
      Err(e) => self.outcome(Vec::new(), Stage::observe(local, None), Some(e.to_string())),
    }
  }

  /// Step the engine until it reports no-op, returning the state to persist
  fn drive(&self, mut local: VersionState) -> (VersionOutcome, VersionState) {
    let mut performed = Vec::new();
    let mut last_remote = None;

    for _ in 0..MAX_STEPS {
      let remote = match self.releases.get(self.tag) {
        Ok(remote) => remote,
        Err(e) => {
          let stage = Stage::observe(&local, last_remote.as_ref());
          return (self.outcome(performed, stage, Some(e.to_string())), local);
        }
      };

      let (action, next) = reconcile(self.resolved, &local, remote.as_ref(), &self.expected, self.required);
      if action.is_noop() {
        let stage = Stage::observe(&next, remote.as_ref());
        return (self.outcome(performed, stage, None), next);
      }

      tracing::debug!("{}: {}", self.tag, action);
      let result = self.execute(&action);
      performed.push(action);
      if let Err(e) = result {
        let stage = Stage::observe(&local, remote.as_ref());
        return (self.outcome(performed, stage, Some(e.to_string())), local);
      }

      local = next;
      if matches!(performed.last(), Some(Action::GenerateRequirements)) {
        local.requirements_ready = true;
      }
      last_remote = remote;
    }

    let stage = Stage::observe(&local, last_remote.as_ref());
    let error = format!("did not converge within {} steps", MAX_STEPS);
    (self.outcome(performed, stage, Some(error)), local)
  }

  fn execute(&self, action: &Action) -> ForgeResult<()> {
    match action {
      Action::GenerateRequirements => {
        let ready = self.build.ensure_requirements(
          &self.pkg.dir,
          &self.pkg.name,
          &self.resolved.version,
          &self.resolved.runtime,
        )?;
        if !ready {
          return Err(
            BuildError::Failed {
              version: self.resolved.version.to_string(),
              stderr: "the build tool finished without producing a lock file".to_string(),
            }
            .into(),
          );
        }
        Ok(())
      }
      Action::CreateRelease { prerelease } => {
        self.require_lock()?;
        self.create(*prerelease)
      }
      Action::RecreateRelease { changed } => {
        tracing::warn!(
          tag = %self.tag,
          changed = %changed.join(","),
          "DriftDetected: release descriptor does not match configuration, recreating"
        );
        self.require_lock()?;
        self.releases.delete(self.tag)?;
        self.create(true)
      }
      Action::Finalize => {
        self.releases.set_final(self.tag)?;
        match self.releases.get(self.tag)? {
          Some(record) if !record.is_prerelease => {
            tracing::info!("finalized {}", self.tag);
            Ok(())
          }
          _ => Err(self.postcondition("final release")),
        }
      }
      Action::NoOp { .. } => Ok(()),
    }
  }

  /// Create as prerelease with the descriptor, then confirm from a fresh read
  fn create(&self, prerelease: bool) -> ForgeResult<()> {
    let title = release_title(&self.pkg.name, &self.resolved.version);
    self.releases.create(self.tag, &title, prerelease)?;
    self
      .releases
      .set_description(self.tag, &self.expected.render_description(&self.pkg.name))?;

    match self.releases.get(self.tag)? {
      Some(record) if record.is_prerelease && record.build_descriptor.as_ref() == Some(&self.expected) => {
        tracing::info!("created prerelease {}", self.tag);
        Ok(())
      }
      _ => Err(self.postcondition("prerelease carrying the expected build descriptor")),
    }
  }

  fn require_lock(&self) -> ForgeResult<()> {
    if self.build.requirements_present(&self.pkg.dir, &self.resolved.version) {
      Ok(())
    } else {
      Err(
        BuildError::Failed {
          version: self.resolved.version.to_string(),
          stderr: "lock file disappeared before the release was created".to_string(),
        }
        .into(),
      )
    }
  }

  fn postcondition(&self, expected: &str) -> ForgeError {
    ReleaseStoreError::Postcondition {
      tag: self.tag.to_string(),
      expected: expected.to_string(),
    }
    .into()
  }
}

/// Stage counts for a report, in lifecycle order
pub fn stage_counts(report: &PackageReport) -> BTreeMap<String, usize> {
  let mut counts = BTreeMap::new();
  for outcome in &report.versions {
    *counts.entry(outcome.stage.to_string()).or_insert(0) += 1;
  }
  counts
}
