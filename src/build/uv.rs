//! `uv pip compile` lock generation

use crate::build::{BuildTool, REQUIREMENTS_IN, REQUIREMENTS_LOCK, version_dir};
use crate::core::error::{BuildError, ForgeResult, ResultExt};
use semver::Version;
use std::fs;
use std::path::Path;
use std::process::Command;

/// Runs `uv pip compile` inside the version directory
pub struct UvBuildTool {
  program: String,
}

impl UvBuildTool {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
    }
  }
}

impl BuildTool for UvBuildTool {
  fn ensure_requirements(
    &self,
    package_dir: &Path,
    package: &str,
    version: &Version,
    runtime: &str,
  ) -> ForgeResult<bool> {
    if self.requirements_present(package_dir, version) {
      tracing::debug!("lock file for {} {} already exists", package, version);
      return Ok(true);
    }

    let dir = version_dir(package_dir, version);
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    fs::write(dir.join(REQUIREMENTS_IN), format!("{}=={}\n", package, version))
      .with_context(|| format!("Failed to write {}", dir.join(REQUIREMENTS_IN).display()))?;

    tracing::info!("compiling requirements for {} {} (python {})", package, version, runtime);
    let output = Command::new(&self.program)
      .current_dir(&dir)
      .args(["pip", "compile", "--output-file", REQUIREMENTS_LOCK, REQUIREMENTS_IN])
      .args(["--python-version", runtime])
      .output()
      .map_err(|e| BuildError::Spawn {
        tool: self.program.clone(),
        reason: e.to_string(),
      })?;

    if !output.status.success() {
      return Err(
        BuildError::Failed {
          version: version.to_string(),
          stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
        .into(),
      );
    }

    Ok(self.requirements_present(package_dir, version))
  }
}
