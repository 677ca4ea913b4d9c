//! Tests for the `resolve` command

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_resolve_binds_versions_to_anchors() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  workspace.add_package("black", &["black"], &[("23.0.0", "3.11"), ("22.0.0", "3.9")])?;
  workspace.publish_upstream("black", &["21.0.0", "21.12b0", "22.0.0", "22.1.0", "23.1.0"])?;

  let output = run_pexforge(&workspace.path, &["resolve", "--json"])?;
  let json = stdout_json(&output)?;

  let versions = json[0]["versions"].as_array().expect("versions array");
  let pairs: Vec<(String, String)> = versions
    .iter()
    .map(|v| {
      (
        v["version"].as_str().unwrap_or_default().to_string(),
        v["runtime"].as_str().unwrap_or_default().to_string(),
      )
    })
    .collect();

  assert_eq!(json[0]["package"], "black");
  assert_eq!(
    pairs,
    vec![
      ("22.0.0".to_string(), "3.9".to_string()),
      ("22.1.0".to_string(), "3.9".to_string()),
      ("23.1.0".to_string(), "3.11".to_string()),
    ]
  );

  Ok(())
}

#[test]
fn test_resolve_human_output_lists_tags() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  workspace.add_package("ruff", &["ruff"], &[("0.4.0", "3.12")])?;
  workspace.publish_upstream("ruff", &["0.3.9", "0.4.1"])?;

  let output = run_pexforge(&workspace.path, &["resolve"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("ruff-v0.4.1"), "stdout: {}", stdout);
  assert!(!stdout.contains("0.3.9"));

  Ok(())
}

#[test]
fn test_duplicate_floors_are_a_config_error() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  workspace.add_package("black", &["black"], &[("22.0.0", "3.9"), ("22.0.0", "3.11")])?;
  workspace.publish_upstream("black", &["22.0.0"])?;

  let output = run_pexforge_raw(&workspace.path, &["sync", "--apply"])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(!workspace.file_exists("releases"));
  assert!(!workspace.file_exists("packages/black/state.json"));

  Ok(())
}

#[test]
fn test_registry_outage_is_a_system_error() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  workspace.add_package("black", &["black"], &[("22.0.0", "3.9")])?;

  // No snapshot published for black
  let output = run_pexforge_raw(&workspace.path, &["resolve"])?;
  assert_eq!(output.status.code(), Some(2));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("black"), "stderr: {}", stderr);

  Ok(())
}
