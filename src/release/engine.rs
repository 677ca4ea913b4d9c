//! Per-version reconciliation state machine
//!
//! `reconcile` is pure: it looks at one resolved version, its cached local
//! state and a fresh read of the remote release, and returns the next action
//! plus the state the caller should record once that action has succeeded.
//!
//! ```text
//! Unbuilt ──requirements──▶ RequirementsReady ──create──▶ Prerelease ──finalize──▶ Finalized
//!                                                            │  ▲
//!                                                            └──┘ drift: delete + create
//! ```

use crate::release::descriptor::BuildDescriptor;
use crate::release::record::{AssetRecord, ReleaseRecord, has_all_assets};
use crate::state::VersionState;
use crate::version::ResolvedVersion;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Lifecycle stage of one resolved version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
  Unbuilt,
  RequirementsReady,
  Prerelease,
  Finalized,
}

impl Stage {
  /// Stage implied by local flags and the remote observation
  pub fn observe(local: &VersionState, remote: Option<&ReleaseRecord>) -> Self {
    match remote {
      Some(record) if !record.is_prerelease => Stage::Finalized,
      Some(_) => Stage::Prerelease,
      None if local.requirements_ready => Stage::RequirementsReady,
      None => Stage::Unbuilt,
    }
  }
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Stage::Unbuilt => write!(f, "unbuilt"),
      Stage::RequirementsReady => write!(f, "requirements-ready"),
      Stage::Prerelease => write!(f, "prerelease"),
      Stage::Finalized => write!(f, "finalized"),
    }
  }
}

/// Next action for a resolved version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
  /// Produce the lock artifacts for this version
  GenerateRequirements,

  /// Create the release (always as a prerelease) carrying the expected descriptor
  CreateRelease { prerelease: bool },

  /// Drift: delete the stale release, then create it again as a prerelease
  RecreateRelease { changed: Vec<String> },

  /// Flip the release from prerelease to final
  Finalize,

  /// Nothing to do right now
  NoOp { reason: NoOpReason },
}

/// Why an action resolved to `NoOp`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoOpReason {
  /// Waiting for other platforms to upload their assets
  AwaitingAssets,
  /// The release is final and is never reopened
  Finalized,
}

/// Primitive release-store effects an action expands to, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
  GenerateRequirements,
  DeleteRelease,
  CreateRelease { prerelease: bool },
  SetDescription,
  SetFinal,
}

impl Action {
  /// Effects to perform for this action
  pub fn effects(&self) -> Vec<Effect> {
    match self {
      Action::GenerateRequirements => vec![Effect::GenerateRequirements],
      Action::CreateRelease { prerelease } => vec![
        Effect::CreateRelease {
          prerelease: *prerelease,
        },
        Effect::SetDescription,
      ],
      Action::RecreateRelease { .. } => vec![
        Effect::DeleteRelease,
        Effect::CreateRelease { prerelease: true },
        Effect::SetDescription,
      ],
      Action::Finalize => vec![Effect::SetFinal],
      Action::NoOp { .. } => Vec::new(),
    }
  }

  pub fn is_noop(&self) -> bool {
    matches!(self, Action::NoOp { .. })
  }

  /// Short label used in logs and plans
  pub fn label(&self) -> &'static str {
    match self {
      Action::GenerateRequirements => "generate-requirements",
      Action::CreateRelease { .. } => "create-release",
      Action::RecreateRelease { .. } => "recreate-release",
      Action::Finalize => "finalize",
      Action::NoOp { .. } => "no-op",
    }
  }
}

impl fmt::Display for Action {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Action::GenerateRequirements => write!(f, "generate requirements"),
      Action::CreateRelease { .. } => write!(f, "create prerelease"),
      Action::RecreateRelease { changed } => {
        write!(f, "delete and recreate release (drift: {})", changed.join(", "))
      }
      Action::Finalize => write!(f, "finalize release"),
      Action::NoOp {
        reason: NoOpReason::AwaitingAssets,
      } => write!(f, "no-op (awaiting assets)"),
      Action::NoOp {
        reason: NoOpReason::Finalized,
      } => write!(f, "no-op (finalized)"),
    }
  }
}

/// Decide the next action for one resolved version
///
/// `remote` must be a fresh read of the release store. Finalization is decided
/// from `remote.assets` only, never from the cached `local.assets`.
pub fn reconcile(
  resolved: &ResolvedVersion,
  local: &VersionState,
  remote: Option<&ReleaseRecord>,
  expected: &BuildDescriptor,
  required: &BTreeSet<String>,
) -> (Action, VersionState) {
  if let Some(record) = remote.filter(|r| !r.is_prerelease) {
    return (
      Action::NoOp {
        reason: NoOpReason::Finalized,
      },
      local.mirror(record),
    );
  }

  if !local.requirements_ready {
    return (Action::GenerateRequirements, local.clone());
  }

  let Some(record) = remote else {
    let next = VersionState {
      requirements_ready: true,
      release_created: true,
      assets: AssetRecord::new(),
      remote_descriptor: None,
    };
    return (Action::CreateRelease { prerelease: true }, next);
  };

  let changed: Vec<String> = match &record.build_descriptor {
    None => vec!["build_descriptor".to_string()],
    Some(actual) => expected.diff(actual).into_iter().map(String::from).collect(),
  };
  if !changed.is_empty() {
    tracing::debug!("{} has drifted on {}", resolved.version, changed.join(", "));
    let next = VersionState {
      requirements_ready: true,
      release_created: true,
      assets: AssetRecord::new(),
      remote_descriptor: None,
    };
    return (Action::RecreateRelease { changed }, next);
  }

  if has_all_assets(&record.assets, required) {
    (Action::Finalize, local.mirror(record))
  } else {
    (
      Action::NoOp {
        reason: NoOpReason::AwaitingAssets,
      },
      local.mirror(record),
    )
  }
}
