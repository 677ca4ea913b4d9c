//! Progress indicators for long-running operations
//!
//! Uses `linya` for allocation-free progress bars drawn on stderr

use linya::{Bar, Progress};
use std::io::IsTerminal;

/// Progress bar over the resolved versions of one package
///
/// Draws nothing unless stderr is a terminal, so piped and JSON output stay clean.
pub struct VersionProgress {
  inner: Option<(Progress, Bar)>,
}

impl VersionProgress {
  /// Create a new progress bar for reconciling `total` versions
  pub fn new(total: usize, label: impl Into<String>) -> Self {
    if total == 0 || !std::io::stderr().is_terminal() {
      return Self::hidden();
    }
    let mut progress = Progress::new();
    let bar = progress.bar(total, label.into());
    Self {
      inner: Some((progress, bar)),
    }
  }

  /// A bar that never draws
  pub fn hidden() -> Self {
    Self { inner: None }
  }

  /// Increment progress by 1
  pub fn inc(&mut self) {
    if let Some((progress, bar)) = self.inner.as_mut() {
      progress.inc_and_draw(bar, 1);
    }
  }
}
