//! Reviewable plans for dry-run reconciliation
//!
//! Every `sync` without `--apply` produces a `Plan` per package: the next
//! action for each resolved version together with the release-store effects it
//! expands to. Plans are JSON-serializable for CI review and carry a content
//! hash so two runs over the same inputs can be compared by ID.
//!
//! ```text
//! sync_package(apply = false)
//!   ↓
//! PackageReport ──▶ Plan (what would happen)
//!   ↓
//! to_human_readable() / serde_json
//! ```

use crate::core::reconcile::PackageReport;
use crate::release::engine::{Action, Effect, NoOpReason, Stage};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Plan identifier (SHA256 hash of plan steps)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanId(String);

impl PlanId {
  /// Create a plan ID from plan contents
  pub fn from_contents(contents: &[u8]) -> Self {
    let mut hasher = Sha256::new();
    hasher.update(contents);
    let result = hasher.finalize();
    Self(format!("{:x}", result))
  }

  /// Get the short ID (first 12 characters)
  pub fn short(&self) -> &str {
    &self.0[..12.min(self.0.len())]
  }
}

impl fmt::Display for PlanId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.short())
  }
}

/// The next step for one resolved version
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlannedStep {
  pub tag: String,
  pub version: String,
  pub runtime: String,
  pub stage: Stage,
  pub action: Action,
  /// Store effects in execution order (empty for no-op)
  pub effects: Vec<String>,
}

/// A version the dry run could not inspect
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanFailure {
  pub tag: String,
  pub error: String,
}

/// Planned reconciliation of one package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
  /// Plan ID (content hash)
  pub id: PlanId,

  pub package: String,

  /// True when any step deletes a release
  pub is_destructive: bool,

  pub steps: Vec<PlannedStep>,

  #[serde(skip_serializing_if = "Vec::is_empty", default)]
  pub failures: Vec<PlanFailure>,

  #[serde(skip_serializing_if = "Vec::is_empty", default)]
  pub orphans: Vec<String>,
}

impl Plan {
  /// Build a plan from a dry-run report
  pub fn from_report(report: &PackageReport) -> Self {
    let mut steps = Vec::new();
    let mut failures = Vec::new();

    for outcome in &report.versions {
      if let Some(error) = &outcome.error {
        failures.push(PlanFailure {
          tag: outcome.tag.clone(),
          error: error.clone(),
        });
        continue;
      }
      for action in &outcome.actions {
        steps.push(PlannedStep {
          tag: outcome.tag.clone(),
          version: outcome.version.to_string(),
          runtime: outcome.runtime.clone(),
          stage: outcome.stage,
          action: action.clone(),
          effects: action.effects().iter().map(|e| effect_to_string(*e).to_string()).collect(),
        });
      }
    }

    let is_destructive = steps
      .iter()
      .any(|s| matches!(s.action, Action::RecreateRelease { .. }));

    let mut plan = Self {
      id: PlanId::from_contents(&[]),
      package: report.package.clone(),
      is_destructive,
      steps,
      failures,
      orphans: report.orphans.clone(),
    };
    plan.recompute_id();
    plan
  }

  /// Recompute plan ID based on current steps
  fn recompute_id(&mut self) {
    let json = serde_json::to_vec(&self.steps).unwrap_or_default();
    self.id = PlanId::from_contents(&json);
  }

  /// Steps that would change something
  pub fn pending(&self) -> impl Iterator<Item = &PlannedStep> {
    self.steps.iter().filter(|s| !s.action.is_noop())
  }

  /// Get human-readable representation
  pub fn to_human_readable(&self) -> String {
    let mut output = String::new();

    output.push_str(&format!("📋 Plan: {} ({})\n", self.package, self.id));

    let pending: Vec<&PlannedStep> = self.pending().collect();
    output.push_str(&format!(
      "\n   Actions ({} of {} versions):\n",
      pending.len(),
      self.steps.len()
    ));
    if pending.is_empty() {
      output.push_str("   (nothing to do)\n");
    }
    for (i, step) in pending.iter().enumerate() {
      output.push_str(&format!(
        "   {}. {} [{}, python {}]: {}\n",
        i + 1,
        step.tag,
        step.stage,
        step.runtime,
        step.action
      ));
      if !step.effects.is_empty() {
        output.push_str(&format!("      → {}\n", step.effects.join(" → ")));
      }
    }

    let waiting = self
      .steps
      .iter()
      .filter(|s| {
        matches!(
          s.action,
          Action::NoOp {
            reason: NoOpReason::AwaitingAssets
          }
        )
      })
      .count();
    if waiting > 0 {
      output.push_str(&format!("\n   {} prerelease(s) waiting for assets\n", waiting));
    }

    if !self.failures.is_empty() {
      output.push_str(&format!("\n   Unreadable ({}):\n", self.failures.len()));
      for failure in &self.failures {
        output.push_str(&format!("   ✗ {}: {}\n", failure.tag, failure.error));
      }
    }

    if !self.orphans.is_empty() {
      output.push_str(&format!(
        "\n   Orphaned releases (left in place): {}\n",
        self.orphans.join(", ")
      ));
    }

    if self.is_destructive {
      output.push_str("\n⚠️  NOTE: Drifted prereleases will be deleted and recreated\n");
      output.push_str("   (Uploaded assets on those releases are discarded and must be rebuilt)\n");
    }

    output
  }

  pub fn is_empty(&self) -> bool {
    self.pending().next().is_none()
  }
}

fn effect_to_string(effect: Effect) -> &'static str {
  match effect {
    Effect::GenerateRequirements => "compile requirements",
    Effect::DeleteRelease => "delete release",
    Effect::CreateRelease { prerelease: true } => "create prerelease",
    Effect::CreateRelease { prerelease: false } => "create release",
    Effect::SetDescription => "write descriptor",
    Effect::SetFinal => "mark final",
  }
}
