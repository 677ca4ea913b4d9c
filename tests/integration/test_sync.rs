//! Tests for the `sync` command

use crate::helpers::*;
use anyhow::Result;

fn black_workspace() -> Result<TestWorkspace> {
  let workspace = TestWorkspace::new()?;
  workspace.add_package("black", &["black"], &[("22.0.0", "3.9"), ("23.0.0", "3.11")])?;
  workspace.publish_upstream("black", &["22.1.0", "23.1.0"])?;
  Ok(workspace)
}

#[test]
fn test_dry_run_plans_without_side_effects() -> Result<()> {
  let workspace = black_workspace()?;

  let output = run_pexforge(&workspace.path, &["sync", "--json"])?;
  let plans = stdout_json(&output)?;

  let steps = plans[0]["steps"].as_array().expect("steps array");
  assert_eq!(steps.len(), 2);
  for step in steps {
    assert_eq!(step["action"]["type"], "generate_requirements");
  }
  assert!(!workspace.file_exists("releases"));
  assert!(!workspace.file_exists("packages/black/state.json"));
  assert!(!workspace.file_exists("packages/black/22.1.0/requirements.txt"));

  Ok(())
}

#[test]
fn test_apply_creates_prereleases_with_descriptors() -> Result<()> {
  let workspace = black_workspace()?;

  run_pexforge(&workspace.path, &["sync", "--apply"])?;

  assert!(workspace.file_exists("packages/black/22.1.0/requirements.txt"));
  assert_eq!(workspace.read_file("packages/black/23.1.0/requirements.in")?, "black==23.1.0\n");

  let release = workspace.release_json("black-v23.1.0")?;
  assert_eq!(release["prerelease"], true);
  assert_eq!(release["title"], "black v23.1.0");
  let description = release["description"].as_str().unwrap_or_default();
  assert!(description.contains("\"runtime\":\"3.11\""), "description: {}", description);

  let state = workspace.read_file("packages/black/state.json")?;
  assert!(state.contains("generated_at"));
  assert!(state.contains("\"22.1.0\""));

  Ok(())
}

#[test]
fn test_second_apply_is_a_noop() -> Result<()> {
  let workspace = black_workspace()?;
  run_pexforge(&workspace.path, &["sync", "--apply"])?;
  let before = workspace.read_file("releases/black-v22.1.0/release.json")?;

  let output = run_pexforge(&workspace.path, &["sync", "--apply", "--json"])?;
  let reports = stdout_json(&output)?;
  for outcome in reports[0]["versions"].as_array().expect("versions array") {
    assert_eq!(outcome["actions"].as_array().map(|a| a.len()), Some(0));
    assert_eq!(outcome["stage"], "prerelease");
  }
  assert_eq!(workspace.read_file("releases/black-v22.1.0/release.json")?, before);

  Ok(())
}

#[test]
fn test_config_change_recreates_open_prereleases() -> Result<()> {
  let workspace = black_workspace()?;
  run_pexforge(&workspace.path, &["sync", "--apply"])?;

  let artifact = workspace.artifact("black-linux.tar.gz", "old linux build")?;
  run_pexforge(
    &workspace.path,
    &[
      "upload",
      "black",
      "23.1.0",
      &artifact.display().to_string(),
      "--os",
      "linux",
      "--arch",
      "amd64",
      "--apply",
    ],
  )?;
  assert!(workspace.file_exists("releases/black-v23.1.0/assets/black-linux-amd64.tar.gz"));

  workspace.add_package("black", &["black", "blackd"], &[("22.0.0", "3.9"), ("23.0.0", "3.11")])?;
  let output = run_pexforge(&workspace.path, &["sync"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("recreate"), "stdout: {}", stdout);

  run_pexforge(&workspace.path, &["sync", "--apply"])?;
  assert!(!workspace.file_exists("releases/black-v23.1.0/assets/black-linux-amd64.tar.gz"));
  let release = workspace.release_json("black-v23.1.0")?;
  assert!(release["description"].as_str().unwrap_or_default().contains("blackd"));

  Ok(())
}

#[test]
fn test_failing_version_does_not_block_the_rest() -> Result<()> {
  let workspace = black_workspace()?;

  // An unreadable release record for one tag
  let broken = workspace.release_dir("black-v22.1.0");
  std::fs::create_dir_all(&broken)?;
  std::fs::write(broken.join("release.json"), "{ not json")?;

  let output = run_pexforge_raw(&workspace.path, &["sync", "--apply"])?;
  assert_eq!(output.status.code(), Some(2));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("22.1.0"), "stderr: {}", stderr);

  let release = workspace.release_json("black-v23.1.0")?;
  assert_eq!(release["prerelease"], true);
  assert!(workspace.file_exists("packages/black/state.json"));

  Ok(())
}

#[test]
fn test_status_reads_cached_state() -> Result<()> {
  let workspace = black_workspace()?;
  run_pexforge(&workspace.path, &["sync", "--apply"])?;

  let output = run_pexforge(&workspace.path, &["status", "--json"])?;
  let status = stdout_json(&output)?;
  let versions = status[0]["versions"].as_array().expect("versions array");
  assert_eq!(versions.len(), 2);
  assert_eq!(versions[0]["tag"], "black-v22.1.0");
  assert_eq!(versions[0]["release_created"], true);
  assert_eq!(versions[0]["assets_required"], 2);

  Ok(())
}
