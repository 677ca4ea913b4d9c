//! CLI commands for pexforge
//!
//! ## Inspection
//! - **resolve**: Show which upstream versions each package builds, and on which runtime
//! - **status**: Show the cached lifecycle of every resolved version (no network)
//!
//! ## Reconciliation
//! - **sync**: Drive every resolved version toward a final release (dry-run by default)
//! - **upload**: Upload this platform's artifact into an open prerelease
//!
//! ## Projection
//! - **manifest**: Render the Hermit manifest from complete versions
//!
//! All commands accept `&ForgeContext` so collaborators are built once per run.

pub mod manifest;
pub mod resolve;
pub mod status;
pub mod sync;
pub mod upload;

pub use manifest::run_manifest;
pub use resolve::run_resolve;
pub use status::run_status;
pub use sync::run_sync;
pub use upload::run_upload;
