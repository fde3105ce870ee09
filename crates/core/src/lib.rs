//! Core library: allow-list loading and allow-list-bounded directory resolution.

pub mod allowlist;
pub mod config;
pub mod error;
pub mod resolver;

pub use allowlist::{AllowList, AllowListFile, AllowListSource};
pub use error::ResolveError;
pub use resolver::{resolve, Resolution, Resolver, SearchSpec};
