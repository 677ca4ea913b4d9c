//! Release lifecycle and reconciliation
//!
//! # Core Invariants
//!
//! 1. **Releases are never double-created**
//!    - Creation only happens after a fresh read found no release for the tag
//!    - Drift goes through delete, then create
//!
//! 2. **Finalization is monotonic**
//!    - A final release is never reopened, even if a later read finds drift
//!    - The prerelease to final flip happens once, when a fresh read shows every
//!      required asset
//!
//! 3. **Descriptors compare exactly**
//!    - Every field of the build descriptor participates, binaries in order
//!    - A missing or unreadable descriptor counts as drift
//!
//! # Layout
//!
//! - **descriptor**: build fingerprint and its fenced description block
//! - **record**: release records, asset sets, tag and asset naming
//! - **engine**: the pure per-version state machine
//! - **store**: release store trait, with `github` and `directory` backends

pub mod descriptor;
pub mod directory;
pub mod engine;
pub mod github;
pub mod record;
pub mod store;
