//! Crate entry point for **robot**.
//!
//! The library holds the implementation behind the `robot` CLI: a GitHub
//! client seam, the per-repository job (filter, reconcile, finalize) and the
//! driver that walks a user's repositories.

mod config;
mod github;
mod job;
mod paths;
mod progress;
mod sync;
mod templates;

pub use config::Overrides;
pub use sync::{cmd_prune, cmd_sync};
pub use templates::cmd_templates;
