//! Version comparison and anchor resolution

pub mod compare;
pub mod resolver;

pub use resolver::{ResolvedVersion, VersionAnchor, resolve};
