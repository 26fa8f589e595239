//! Subcommand implementations.

pub mod cache;
pub mod fetch;
pub mod integrity;
pub mod materialize;
