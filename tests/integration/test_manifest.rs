//! Tests for the `manifest` command

use crate::helpers::*;
use anyhow::Result;
use sha2::{Digest, Sha256};

fn sha256(content: &str) -> String {
  format!("{:x}", Sha256::digest(content.as_bytes()))
}

#[test]
fn test_manifest_lists_only_complete_versions() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  workspace.add_package("ruff", &["ruff"], &[("0.4.0", "3.12")])?;
  workspace.publish_upstream("ruff", &["0.4.1", "0.4.2"])?;
  run_pexforge(&workspace.path, &["sync", "--apply"])?;

  // 0.4.2 gets both platforms, 0.4.1 only linux
  for (version, os) in [("0.4.2", "linux"), ("0.4.2", "darwin"), ("0.4.1", "linux")] {
    let content = format!("{} {} build", version, os);
    let artifact = workspace.artifact(&format!("ruff-{}-{}.tar.gz", version, os), &content)?;
    run_pexforge(
      &workspace.path,
      &[
        "upload",
        "ruff",
        version,
        &artifact.display().to_string(),
        "--os",
        os,
        "--arch",
        "amd64",
        "--apply",
      ],
    )?;
  }

  run_pexforge(&workspace.path, &["manifest", "--apply"])?;
  let hcl = workspace.read_file("manifests/ruff.hcl")?;

  assert!(hcl.contains("version \"0.4.2\""), "manifest: {}", hcl);
  assert!(!hcl.contains("version \"0.4.1\""), "manifest: {}", hcl);
  assert!(hcl.contains("binaries = [\"ruff\"]"));
  assert!(hcl.contains(
    "https://github.com/acme/pex-tools/releases/download/ruff-v${version}/ruff-${os}-${arch}.tar.gz"
  ));
  let url = "https://github.com/acme/pex-tools/releases/download/ruff-v0.4.2/ruff-darwin-amd64.tar.gz";
  assert!(
    hcl.contains(&format!("\"{}\": \"{}\"", url, sha256("0.4.2 darwin build"))),
    "manifest: {}",
    hcl
  );

  Ok(())
}

fn upload_all(workspace: &TestWorkspace, version: &str) -> Result<()> {
  for os in ["linux", "darwin"] {
    let artifact = workspace.artifact(&format!("ruff-{}-{}.tar.gz", version, os), &format!("{} {}", version, os))?;
    let path = artifact.display().to_string();
    run_pexforge(
      &workspace.path,
      &["upload", "ruff", version, &path, "--os", os, "--arch", "amd64", "--apply"],
    )?;
  }
  Ok(())
}

#[test]
fn test_manifest_skips_versions_no_longer_resolved() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  workspace.add_package("ruff", &["ruff"], &[("0.4.0", "3.12")])?;
  workspace.publish_upstream("ruff", &["0.4.1", "0.5.0"])?;
  run_pexforge(&workspace.path, &["sync", "--apply"])?;
  upload_all(&workspace, "0.4.1")?;
  upload_all(&workspace, "0.5.0")?;

  // Narrowing the anchors orphans 0.4.1; its final release and state entry stay
  workspace.add_package("ruff", &["ruff"], &[("0.5.0", "3.12")])?;
  let output = run_pexforge(&workspace.path, &["sync", "--apply"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("ruff-v0.4.1"), "stdout: {}", stdout);
  assert_eq!(workspace.release_json("ruff-v0.4.1")?["prerelease"], false);

  run_pexforge(&workspace.path, &["manifest", "--apply"])?;
  let hcl = workspace.read_file("manifests/ruff.hcl")?;
  assert!(hcl.contains("version \"0.5.0\""), "manifest: {}", hcl);
  assert!(!hcl.contains("0.4.1"), "manifest: {}", hcl);

  Ok(())
}

#[test]
fn test_manifest_dry_run_prints_without_writing() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  workspace.add_package("ruff", &["ruff"], &[("0.4.0", "3.12")])?;
  workspace.publish_upstream("ruff", &["0.4.1"])?;

  let output = run_pexforge(&workspace.path, &["manifest"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("description = \"ruff package\""), "stdout: {}", stdout);
  assert!(stdout.contains("sha256sums = {"));
  assert!(!workspace.file_exists("manifests"));

  Ok(())
}
