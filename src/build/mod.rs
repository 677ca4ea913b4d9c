//! Lock-file generation for resolved versions
//!
//! Each version gets its own directory under the package directory:
//!
//! ```text
//! <package_dir>/<version>/requirements.in    "{package}=={version}"
//! <package_dir>/<version>/requirements.txt   lock file produced by the build tool
//! ```

pub mod uv;

use crate::core::error::ForgeResult;
use semver::Version;
use std::path::{Path, PathBuf};

pub use uv::UvBuildTool;

pub const REQUIREMENTS_IN: &str = "requirements.in";
pub const REQUIREMENTS_LOCK: &str = "requirements.txt";

/// Directory holding a version's lock artifacts
pub fn version_dir(package_dir: &Path, version: &Version) -> PathBuf {
  package_dir.join(version.to_string())
}

/// External tool that produces lock artifacts
pub trait BuildTool {
  /// True when both the input and the lock file for `version` exist
  fn requirements_present(&self, package_dir: &Path, version: &Version) -> bool {
    let dir = version_dir(package_dir, version);
    dir.join(REQUIREMENTS_IN).is_file() && dir.join(REQUIREMENTS_LOCK).is_file()
  }

  /// Produce the lock artifacts unless they already exist
  ///
  /// Idempotent. Returns true when the artifacts exist afterwards.
  fn ensure_requirements(&self, package_dir: &Path, package: &str, version: &Version, runtime: &str)
  -> ForgeResult<bool>;
}
