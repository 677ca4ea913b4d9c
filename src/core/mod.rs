//! Core engine for pexforge operations
//!
//! - **config**: workspace (pexforge.toml) and per-package (config.toml) parsing and validation
//! - **context**: the collaborators for one run, built once in main.rs
//! - **error**: error types with contextual help messages
//! - **plan**: dry-run plans and their serialization
//! - **reconcile**: drives resolved versions through the release engine
//! - **upload**: platform-scoped asset upload and finalization

pub mod config;
pub mod context;
pub mod error;
pub mod plan;
pub mod reconcile;
pub mod upload;
