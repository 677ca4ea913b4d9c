//! Filesystem and hashing helpers shared by the stores

use crate::core::error::ForgeResult;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Replace `dest` with `contents` atomically
///
/// The data is written to a temp file in the destination directory, synced,
/// renamed over `dest`, and the directory itself is synced. A crash leaves
/// either the previous file or the new one, never a partial write.
pub fn write_atomic(dest: &Path, contents: &[u8]) -> ForgeResult<()> {
  let dir = match dest.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent,
    _ => Path::new("."),
  };
  fs::create_dir_all(dir)?;

  let mut tmp = NamedTempFile::new_in(dir)?;
  tmp.write_all(contents)?;
  tmp.as_file().sync_all()?;
  tmp.persist(dest)?;
  fsync_dir(dir)?;

  Ok(())
}

#[cfg(unix)]
fn fsync_dir(dir: &Path) -> ForgeResult<()> {
  File::open(dir)?.sync_all()?;
  Ok(())
}

// Directory handles cannot be synced on Windows
#[cfg(not(unix))]
fn fsync_dir(_dir: &Path) -> ForgeResult<()> {
  Ok(())
}

/// Lowercase hex sha256 of `bytes`
pub fn sha256_hex(bytes: &[u8]) -> String {
  let mut hasher = Sha256::new();
  hasher.update(bytes);
  format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn test_write_atomic_replaces_and_leaves_no_temp_files() {
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("nested").join("state.json");

    write_atomic(&dest, b"first").unwrap();
    write_atomic(&dest, b"second").unwrap();

    assert_eq!(fs::read_to_string(&dest).unwrap(), "second");
    let entries: Vec<_> = fs::read_dir(dest.parent().unwrap()).unwrap().collect();
    assert_eq!(entries.len(), 1);
  }

  #[test]
  fn test_sha256_hex() {
    assert_eq!(
      sha256_hex(b""),
      "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
  }
}
