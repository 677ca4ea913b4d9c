//! Tests for the `upload` command

use crate::helpers::*;
use anyhow::Result;

fn ruff_workspace() -> Result<TestWorkspace> {
  let workspace = TestWorkspace::new()?;
  workspace.add_package("ruff", &["ruff"], &[("0.4.0", "3.12")])?;
  workspace.publish_upstream("ruff", &["0.4.2"])?;
  Ok(workspace)
}

fn upload(workspace: &TestWorkspace, os: &str, content: &str, apply: bool) -> Result<std::process::Output> {
  let artifact = workspace.artifact(&format!("ruff-{}.tar.gz", os), content)?;
  let path = artifact.display().to_string();
  let mut args = vec!["upload", "ruff", "0.4.2", &path, "--os", os, "--arch", "amd64"];
  if apply {
    args.push("--apply");
  }
  run_pexforge_raw(&workspace.path, &args)
}

#[test]
fn test_last_platform_finalizes_release() -> Result<()> {
  let workspace = ruff_workspace()?;
  run_pexforge(&workspace.path, &["sync", "--apply"])?;

  let first = upload(&workspace, "linux", "linux build", true)?;
  assert!(first.status.success());
  assert_eq!(workspace.release_json("ruff-v0.4.2")?["prerelease"], true);

  let second = upload(&workspace, "darwin", "darwin build", true)?;
  assert!(second.status.success());
  let stdout = String::from_utf8_lossy(&second.stdout);
  assert!(stdout.contains("now final"), "stdout: {}", stdout);

  assert_eq!(workspace.release_json("ruff-v0.4.2")?["prerelease"], false);
  assert!(workspace.file_exists("releases/ruff-v0.4.2/assets/ruff-darwin-amd64.tar.sha256"));
  let sidecar = workspace.read_file("releases/ruff-v0.4.2/assets/ruff-linux-amd64.tar.sha256")?;
  assert!(sidecar.ends_with("  ruff-linux-amd64.tar.gz\n"), "sidecar: {}", sidecar);

  // A later sync leaves the final release alone
  run_pexforge(&workspace.path, &["sync", "--apply"])?;
  assert_eq!(workspace.release_json("ruff-v0.4.2")?["prerelease"], false);

  Ok(())
}

#[test]
fn test_upload_without_release_fails() -> Result<()> {
  let workspace = ruff_workspace()?;

  let output = upload(&workspace, "linux", "linux build", true)?;
  assert_eq!(output.status.code(), Some(2));
  assert!(!workspace.file_exists("releases/ruff-v0.4.2"));

  Ok(())
}

#[test]
fn test_upload_dry_run_changes_nothing() -> Result<()> {
  let workspace = ruff_workspace()?;
  run_pexforge(&workspace.path, &["sync", "--apply"])?;

  let output = upload(&workspace, "linux", "linux build", false)?;
  assert!(output.status.success());
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("ruff-linux-amd64.tar.gz"), "stdout: {}", stdout);
  assert!(!workspace.file_exists("releases/ruff-v0.4.2/assets/ruff-linux-amd64.tar.gz"));

  Ok(())
}

#[test]
fn test_upload_into_final_release_is_refused() -> Result<()> {
  let workspace = ruff_workspace()?;
  run_pexforge(&workspace.path, &["sync", "--apply"])?;
  upload(&workspace, "linux", "linux build", true)?;
  upload(&workspace, "darwin", "darwin build", true)?;

  let output = upload(&workspace, "linux", "rebuilt linux", true)?;
  assert_eq!(output.status.code(), Some(1));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("already final"), "stderr: {}", stderr);
  assert_eq!(
    workspace.read_file("releases/ruff-v0.4.2/assets/ruff-linux-amd64.tar.gz")?,
    "linux build"
  );

  Ok(())
}
