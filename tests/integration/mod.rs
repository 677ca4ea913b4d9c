//! Binary-driven integration tests
//!
//! Every test runs the real `pexforge` binary against a temporary workspace
//! using the snapshot registry and the directory release store, so no network
//! is needed. The lock step uses a stand-in `uv` shell script.

#![cfg(unix)]

mod helpers;
mod test_manifest;
mod test_resolve;
mod test_sync;
mod test_upload;
