//! stow - integrity-verified artifacts and flat module trees
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! # Overview
//!
//! Two tools behind one binary:
//!
//! - **Artifact cache**: `stow integrity` prints SRI digests for local files or
//!   URLs, `stow fetch` returns a local path whose bytes match a digest,
//!   downloading into the cache only when the existing entry does not verify.
//! - **Materializer**: `stow materialize` copies modules and everything they
//!   depend on into one flat `node_modules`-style directory.
//!
//! # Directory Layout
//!
//! ```text
//! $STOW_CACHE_DIR (or the temp dir)/
//! └── stow-cache/
//!     ├── sdk-1.2.3.zip    # keyed by the final URL segment
//!     └── ...
//! ```

pub mod cmd;
pub mod ui;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "stow")]
#[command(author, version, about = "stow - verified artifact cache and module materializer")]
pub struct Cli {
    /// Base directory of the artifact cache (entries live in <DIR>/stow-cache)
    #[arg(long, global = true, env = "STOW_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the SRI digest of local files or URLs
    Integrity {
        /// file:///absolute/path or http(s):// URL
        #[arg(required = true, value_name = "LOCATOR")]
        locators: Vec<String>,
    },
    /// Print a local path whose contents match the given digest
    Fetch {
        /// file:///absolute/path or http(s):// URL
        #[arg(value_name = "LOCATOR")]
        locator: String,
        /// Expected SRI digest (e.g. sha512-...)
        #[arg(long, value_name = "SRI")]
        integrity: Option<String>,
    },
    /// Copy modules and their dependencies into a flat directory
    Materialize {
        /// Module ids: name or @scope/name
        #[arg(required = true, value_name = "MODULE")]
        modules: Vec<String>,
        /// Destination directory (receives <DIR>/<module>)
        #[arg(long, value_name = "DIR")]
        dest: PathBuf,
        /// Extra directories searched after the defaults
        #[arg(long = "search-path", value_name = "DIR")]
        search_paths: Vec<PathBuf>,
        /// Directory whose node_modules ancestors form the default search path
        #[arg(long, value_name = "DIR")]
        from: Option<PathBuf>,
    },
    /// Inspect or empty the artifact cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Debug, Subcommand)]
pub enum CacheCommands {
    /// Print the cache directory
    Path,
    /// Remove every cached artifact
    Clean,
}

impl Cli {
    /// Configuration from the environment with command-line overrides applied.
    pub fn config(&self) -> stow_core::Config {
        let config = stow_core::Config::from_env();
        match &self.cache_dir {
            Some(dir) => config.with_cache_base(dir),
            None => config,
        }
    }
}
