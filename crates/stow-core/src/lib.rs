pub mod cache;
pub mod config;
pub mod io;
pub mod locks;
pub mod materialize;
pub mod paths;

pub mod reporter;

pub use cache::{CacheError, IntegrityCache};
pub use config::Config;
pub use materialize::{MaterializeError, MaterializeReport, Materializer, SearchPaths};
pub use paths::*;
pub use reporter::{NullReporter, Reporter};

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("stow/", env!("CARGO_PKG_VERSION"));
