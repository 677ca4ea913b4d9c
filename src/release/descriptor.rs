//! Build descriptors embedded in release descriptions
//!
//! A descriptor fingerprints the configuration that produced a release. It
//! travels inside the release's free-text description as a fenced JSON block:
//!
//! ````text
//! Release of black version 23.1.0
//!
//! ```json
//! {"build_info": {"config_revision": 1, "runtime": "3.11", "version": "23.1.0", "binaries": ["black"]}}
//! ```
//! ````
//!
//! Extraction never fails. A missing, unterminated or malformed block reads as
//! "no descriptor", which the engine treats as drift.

use semver::Version;
use serde::{Deserialize, Serialize};

const FENCE_OPEN: &str = "```json";
const FENCE_CLOSE: &str = "```";

/// Fingerprint of the configuration that produced a release
///
/// Equality is exact over every field, binaries included in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDescriptor {
  pub config_revision: u32,
  pub runtime: String,
  pub version: Version,
  pub binaries: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct DescriptionBlock {
  build_info: BuildDescriptor,
}

impl BuildDescriptor {
  /// Render the full release description carrying this descriptor
  pub fn render_description(&self, package: &str) -> String {
    let block = DescriptionBlock {
      build_info: self.clone(),
    };
    // Serializing plain strings and integers cannot fail
    let json = serde_json::to_string(&block).unwrap_or_default();
    format!(
      "Release of {} version {}\n\n{}\n{}\n{}\n",
      package, self.version, FENCE_OPEN, json, FENCE_CLOSE
    )
  }

  /// Extract a descriptor from a release description, if a valid one is present
  pub fn from_description(text: &str) -> Option<Self> {
    let start = text.find(FENCE_OPEN)? + FENCE_OPEN.len();
    let rest = &text[start..];
    let end = rest.find(FENCE_CLOSE)?;
    let body = rest[..end].trim();

    match serde_json::from_str::<DescriptionBlock>(body) {
      Ok(block) => Some(block.build_info),
      Err(e) => {
        tracing::debug!("ignoring malformed build descriptor block: {}", e);
        None
      }
    }
  }

  /// Names of the fields that differ from `other` (empty when equal)
  pub fn diff(&self, other: &BuildDescriptor) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if self.config_revision != other.config_revision {
      fields.push("config_revision");
    }
    if self.runtime != other.runtime {
      fields.push("runtime");
    }
    if self.version != other.version {
      fields.push("version");
    }
    if self.binaries != other.binaries {
      fields.push("binaries");
    }
    fields
  }
}
