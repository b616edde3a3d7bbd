//! Database module: entity models and SQL repositories.
//!
//! This module is split into two submodules:
//! - `model`: typed catalog entities and the client-facing view projection.
//! - `repo`: SQL-only functions that map rows into entities.
//!
//! External modules should import from `brewpair::db` — we re-export the
//! repository API and commonly used models for convenience.

pub mod model;
pub mod repo;

// Re-export the repository API at `crate::db::*` for convenience.
pub use repo::*;

// Surface the catalog models used by callers (handlers, import tooling).
pub use model::{Beer, BeerView, Brewer};
