//! Release store interface

use crate::core::error::ForgeResult;
use crate::release::record::ReleaseRecord;

/// Remote store holding one release per resolved version
///
/// Implementations are thin clients: no retries and no caching. Every `get`
/// is a fresh read, which is what lets the orchestrator confirm a write took
/// effect before it moves on.
pub trait ReleaseStore {
  /// Backend name for logs and status output
  fn name(&self) -> &'static str;

  /// Fresh read of the release for `tag`, `None` when it does not exist
  fn get(&self, tag: &str) -> ForgeResult<Option<ReleaseRecord>>;

  /// Create an empty release for `tag`
  fn create(&self, tag: &str, title: &str, prerelease: bool) -> ForgeResult<ReleaseRecord>;

  /// Delete the release for `tag` together with its assets
  fn delete(&self, tag: &str) -> ForgeResult<()>;

  /// Upload (or overwrite) asset `name`, returning its lowercase hex sha256
  fn upload_asset(&self, tag: &str, name: &str, bytes: &[u8]) -> ForgeResult<String>;

  /// Flip a prerelease to final
  fn set_final(&self, tag: &str) -> ForgeResult<()>;

  /// Replace the release description
  fn set_description(&self, tag: &str, text: &str) -> ForgeResult<()>;
}
