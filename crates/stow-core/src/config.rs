//! Runtime configuration loaded from the environment.
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `STOW_CACHE_DIR` | base directory of the artifact cache (default: temp dir) |
//! | `STOW_USER_AGENT` | User-Agent header for downloads |
//! | `NODE_PATH` | extra module search directories, platform path-list syntax |

use crate::paths::CacheRoot;
use std::path::{Path, PathBuf};

/// Environment variable overriding the download User-Agent.
pub const USER_AGENT_ENV: &str = "STOW_USER_AGENT";

/// Environment variable listing global module directories.
pub const NODE_PATH_ENV: &str = "NODE_PATH";

/// Settings shared by the cache and the materializer.
#[derive(Debug, Clone)]
pub struct Config {
    /// Where cached artifacts live.
    pub cache_root: CacheRoot,
    /// User-Agent sent with every download.
    pub user_agent: String,
    /// Global module directories searched after the `node_modules` ancestors.
    pub node_path: Vec<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let user_agent = std::env::var(USER_AGENT_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| crate::USER_AGENT.to_string());

        let node_path = std::env::var_os(NODE_PATH_ENV)
            .map(|v| {
                std::env::split_paths(&v)
                    .filter(|p| !p.as_os_str().is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            cache_root: CacheRoot::from_env(),
            user_agent,
            node_path,
        }
    }

    /// Replace the cache location with `<base>/stow-cache`.
    #[must_use]
    pub fn with_cache_base(mut self, base: &Path) -> Self {
        self.cache_root = CacheRoot::under(base);
        self
    }

    /// Build the HTTP client used for downloads.
    ///
    /// # Errors
    ///
    /// Fails if the TLS backend cannot be initialized.
    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .build()
    }
}
