use std::path::{Path, PathBuf};

/// Environment variable overriding the base directory of the cache.
pub const CACHE_DIR_ENV: &str = "STOW_CACHE_DIR";

/// Fixed subdirectory appended to the cache base.
pub const CACHE_SUBDIR: &str = "stow-cache";

/// The directory holding cached artifacts.
///
/// Passed explicitly to the cache; nothing in the crate reads it from a global.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRoot(PathBuf);

impl CacheRoot {
    /// Use `path` as the cache directory verbatim.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Cache directory under a base directory: `<base>/stow-cache`.
    pub fn under(base: &Path) -> Self {
        Self(base.join(CACHE_SUBDIR))
    }

    /// `$STOW_CACHE_DIR/stow-cache`, falling back to the platform temp directory.
    pub fn from_env() -> Self {
        let base = std::env::var_os(CACHE_DIR_ENV)
            .filter(|v| !v.is_empty())
            .map_or_else(std::env::temp_dir, PathBuf::from);
        Self::under(&base)
    }

    /// The cache directory.
    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Path of a cache entry named `file_name`.
    pub fn entry(&self, file_name: &str) -> PathBuf {
        self.0.join(file_name)
    }

    /// Create the directory if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from `create_dir_all`.
    pub async fn ensure(&self) -> std::io::Result<&Path> {
        tokio::fs::create_dir_all(&self.0).await?;
        Ok(&self.0)
    }
}

impl AsRef<Path> for CacheRoot {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// `<dir>/node_modules` for `start` and each of its ancestors, nearest first.
pub fn node_modules_ancestors(start: &Path) -> Vec<PathBuf> {
    start
        .ancestors()
        .filter(|dir| dir.file_name().is_none_or(|name| name != stow_schema::DEPENDENCY_DIR))
        .map(|dir| dir.join(stow_schema::DEPENDENCY_DIR))
        .collect()
}
