//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A test workspace with an offline registry snapshot and a directory release store
pub struct TestWorkspace {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestWorkspace {
  /// Create a workspace building for linux and darwin on amd64
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();

    let uv = fake_uv(&path)?;
    std::fs::create_dir_all(path.join("registry"))?;
    std::fs::create_dir_all(path.join("packages"))?;
    std::fs::write(
      path.join("pexforge.toml"),
      format!(
        r#"[platforms]
os = ["linux", "darwin"]
arch = ["amd64"]

[release_store]
kind = "directory"
path = "releases"

[registry]
kind = "snapshot"
path = "registry"

[build]
uv = "{}"

[manifest]
repository = "acme/pex-tools"
out_dir = "manifests"
"#,
        uv.display()
      ),
    )?;

    Ok(Self { _root: root, path })
  }

  /// Add a package with `(floor, runtime)` anchors
  pub fn add_package(&self, name: &str, binaries: &[&str], anchors: &[(&str, &str)]) -> Result<PathBuf> {
    let dir = self.path.join("packages").join(name);
    std::fs::create_dir_all(&dir)?;

    let binaries: Vec<String> = binaries.iter().map(|b| format!("\"{}\"", b)).collect();
    let mut config = format!("config_revision = 1\nbinaries = [{}]\n", binaries.join(", "));
    for (floor, runtime) in anchors {
      config.push_str(&format!("\n[[versions]]\nfloor = \"{}\"\nruntime = \"{}\"\n", floor, runtime));
    }
    std::fs::write(dir.join("config.toml"), config)?;

    Ok(dir)
  }

  /// Publish upstream versions for `name` in the registry snapshot
  pub fn publish_upstream(&self, name: &str, versions: &[&str]) -> Result<()> {
    let releases: Vec<String> = versions.iter().map(|v| format!("\"{}\": []", v)).collect();
    std::fs::write(
      self.path.join("registry").join(format!("{}.json", name)),
      format!("{{\"info\": {{\"name\": \"{}\"}}, \"releases\": {{{}}}}}", name, releases.join(", ")),
    )?;
    Ok(())
  }

  /// Write a fake build artifact
  pub fn artifact(&self, name: &str, content: &str) -> Result<PathBuf> {
    let path = self.path.join("dist").join(name);
    std::fs::create_dir_all(path.parent().context("artifact has no parent")?)?;
    std::fs::write(&path, content)?;
    Ok(path)
  }

  /// Directory of a release in the directory store
  pub fn release_dir(&self, tag: &str) -> PathBuf {
    self.path.join("releases").join(tag)
  }

  /// Parsed `release.json` of a release
  pub fn release_json(&self, tag: &str) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(self.release_dir(tag).join("release.json"))?;
    Ok(serde_json::from_str(&content)?)
  }

  /// Check if a file exists
  pub fn file_exists(&self, path: &str) -> bool {
    self.path.join(path).exists()
  }

  /// Read a file
  pub fn read_file(&self, path: &str) -> Result<String> {
    Ok(std::fs::read_to_string(self.path.join(path))?)
  }
}

/// A stand-in for `uv` that writes the lock file it is asked for
#[cfg(unix)]
fn fake_uv(dir: &Path) -> Result<PathBuf> {
  use std::os::unix::fs::PermissionsExt;

  let path = dir.join("fake-uv");
  std::fs::write(&path, "#!/bin/sh\necho \"# compiled by fake-uv\" > requirements.txt\n")?;
  std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
  Ok(path)
}

/// Run pexforge and require success
pub fn run_pexforge(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = run_pexforge_raw(cwd, args)?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "pexforge command failed: pexforge {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}

/// Run pexforge without checking the exit status
pub fn run_pexforge_raw(cwd: &Path, args: &[&str]) -> Result<Output> {
  let pexforge_bin = env!("CARGO_BIN_EXE_pexforge");

  Command::new(pexforge_bin)
    .current_dir(cwd)
    .args(args)
    .env_remove("PEXFORGE_LOG")
    .env_remove("GITHUB_TOKEN")
    .output()
    .context("Failed to run pexforge")
}

/// Parse stdout as JSON
pub fn stdout_json(output: &Output) -> Result<serde_json::Value> {
  serde_json::from_slice(&output.stdout).context("stdout is not JSON")
}
