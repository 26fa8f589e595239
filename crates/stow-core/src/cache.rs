//! Integrity-verified artifact cache.
//!
//! Remote artifacts are stored flat under the cache root, keyed by the final
//! segment of their URL. An entry is only ever handed out after its digest
//! has been checked against the caller's expectation, so a corrupted or
//! replaced file is re-downloaded instead of used.

use std::path::{Path, PathBuf};

use reqwest::Client;
use stow_schema::{Algorithm, Integrity, Locator};
use thiserror::Error;

use crate::Reporter;
use crate::config::Config;
use crate::io::download::{DownloadError, download, is_partial};
use crate::locks::PathLocks;
use crate::paths::CacheRoot;

/// Algorithm used when computing a digest from scratch.
pub const DEFAULT_ALGORITHM: Algorithm = Algorithm::Sha512;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("{0}")]
    Configuration(String),

    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Download failed: {0}")]
    Transfer(#[from] DownloadError),

    #[error("Integrity check failed for {}: expected {expected}, got {actual}", .path.display())]
    IntegrityMismatch {
        path: PathBuf,
        expected: Integrity,
        actual: Integrity,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl CacheError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Content cache for local and remote artifacts.
///
/// Clones share the HTTP client and the per-entry locks.
#[derive(Debug, Clone)]
pub struct IntegrityCache {
    root: CacheRoot,
    client: Client,
    locks: PathLocks,
}

impl IntegrityCache {
    pub fn new(root: CacheRoot) -> Self {
        let client = Client::builder()
            .user_agent(crate::USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self::with_client(root, client)
    }

    pub fn with_client(root: CacheRoot, client: Client) -> Self {
        Self {
            root,
            client,
            locks: PathLocks::new(),
        }
    }

    /// Build a cache from loaded configuration.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed.
    pub fn from_config(config: &Config) -> Result<Self, CacheError> {
        let client = config
            .http_client()
            .map_err(|e| CacheError::Transfer(DownloadError::Http(e)))?;
        Ok(Self::with_client(config.cache_root.clone(), client))
    }

    pub fn root(&self) -> &CacheRoot {
        &self.root
    }

    /// Where a remote locator is stored in the cache.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Configuration`] for local locators and for URLs
    /// whose final segment is empty, `.` or `..`.
    pub fn entry_path(&self, locator: &Locator) -> Result<PathBuf, CacheError> {
        match locator {
            Locator::Local(_) => Err(CacheError::Configuration(format!(
                "{locator} is a local file and has no cache entry"
            ))),
            Locator::Remote(url) => locator
                .cache_file_name()
                .map(|name| self.root.entry(name))
                .ok_or_else(|| {
                    CacheError::Configuration(format!(
                        "Cannot derive a cache file name from '{url}'"
                    ))
                }),
        }
    }

    /// Compute the integrity of an artifact.
    ///
    /// Local files are hashed in place. Remote artifacts are always
    /// re-downloaded into the cache, replacing any previous entry, and the
    /// fresh bytes are hashed.
    ///
    /// # Errors
    ///
    /// [`CacheError::NotFound`] for missing local files, [`CacheError::Transfer`]
    /// for network failures, [`CacheError::Io`] for filesystem failures.
    pub async fn resolve_digest<R: Reporter>(
        &self,
        locator: &Locator,
        reporter: &R,
    ) -> Result<Integrity, CacheError> {
        match locator {
            Locator::Local(path) => {
                reporter.verifying(locator);
                let digest = hash_file(path, DEFAULT_ALGORITHM).await?;
                tracing::debug!(path = %path.display(), %digest, "resolved local digest");
                Ok(digest)
            }
            Locator::Remote(url) => {
                let dest = self.entry_path(locator)?;
                let _guard = self.locks.lock(&dest).await;
                self.ensure_root().await?;

                remove_if_exists(&dest).await?;
                let digest = download(&self.client, locator, url, &dest, DEFAULT_ALGORITHM, reporter)
                    .await
                    .inspect_err(|e| reporter.failed(locator, &e.to_string()))?;

                reporter.done(locator, &dest);
                tracing::debug!(url, %digest, "resolved remote digest");
                Ok(digest)
            }
        }
    }

    /// Return a local path whose contents match `expected`.
    ///
    /// Local files are verified in place and their own path is returned.
    /// Remote artifacts are served from the cache when the existing entry
    /// verifies; otherwise they are downloaded (again) and verified.
    ///
    /// # Errors
    ///
    /// [`CacheError::Configuration`] when no digest is supplied,
    /// [`CacheError::NotFound`] for missing local files,
    /// [`CacheError::IntegrityMismatch`] when the bytes do not verify,
    /// [`CacheError::Transfer`] for network failures.
    pub async fn fetch_verified<R: Reporter>(
        &self,
        locator: &Locator,
        expected: Option<&Integrity>,
        reporter: &R,
    ) -> Result<PathBuf, CacheError> {
        match locator {
            Locator::Local(path) => {
                if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                    return Err(CacheError::NotFound(path.clone()));
                }
                let expected = require_digest(locator, expected)?;

                reporter.verifying(locator);
                let actual = hash_file(path, expected.strongest()).await?;
                if !expected.matches(&actual) {
                    reporter.failed(locator, "integrity mismatch");
                    return Err(CacheError::IntegrityMismatch {
                        path: path.clone(),
                        expected: expected.clone(),
                        actual,
                    });
                }

                reporter.done(locator, path);
                Ok(path.clone())
            }
            Locator::Remote(url) => {
                let expected = require_digest(locator, expected)?;
                let dest = self.entry_path(locator)?;
                let algorithm = expected.strongest();

                let _guard = self.locks.lock(&dest).await;
                self.ensure_root().await?;

                if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
                    reporter.verifying(locator);
                    let cached = hash_file(&dest, algorithm).await?;
                    if expected.matches(&cached) {
                        tracing::debug!(url, path = %dest.display(), "cache hit");
                        reporter.cached(locator, &dest);
                        return Ok(dest);
                    }
                    tracing::warn!(
                        url,
                        path = %dest.display(),
                        "cached artifact failed verification, re-downloading"
                    );
                    remove_if_exists(&dest).await?;
                }

                let actual = download(&self.client, locator, url, &dest, algorithm, reporter)
                    .await
                    .inspect_err(|e| reporter.failed(locator, &e.to_string()))?;

                if !expected.matches(&actual) {
                    reporter.failed(locator, "integrity mismatch");
                    return Err(CacheError::IntegrityMismatch {
                        path: dest,
                        expected: expected.clone(),
                        actual,
                    });
                }

                reporter.done(locator, &dest);
                Ok(dest)
            }
        }
    }

    /// Remove the cache entry for a remote locator. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Fails for locators without a cache entry or on I/O errors.
    pub async fn evict(&self, locator: &Locator) -> Result<bool, CacheError> {
        let dest = self.entry_path(locator)?;
        let _guard = self.locks.lock(&dest).await;
        remove_if_exists(&dest).await
    }

    /// Remove every entry in the cache. Returns the number of bytes freed.
    ///
    /// Partial files of downloads still in flight are left alone.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error encountered.
    pub async fn clean(&self) -> Result<u64, CacheError> {
        let root = self.root.path();
        let mut entries = match tokio::fs::read_dir(root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(CacheError::io(format!("Failed to read {}", root.display()), e)),
        };

        let mut freed = 0u64;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CacheError::io("Failed to list cache entries", e))?
        {
            let path = entry.path();
            if is_partial(&entry.file_name().to_string_lossy()) {
                tracing::debug!(path = %path.display(), "skipping in-flight download");
                continue;
            }
            let _guard = self.locks.lock(&path).await;
            let meta = entry
                .metadata()
                .await
                .map_err(|e| CacheError::io(format!("Failed to stat {}", path.display()), e))?;

            let removed = if meta.is_dir() {
                tokio::fs::remove_dir_all(&path).await
            } else {
                tokio::fs::remove_file(&path).await
            };
            removed.map_err(|e| CacheError::io(format!("Failed to remove {}", path.display()), e))?;
            freed += meta.len();
        }

        tracing::info!(root = %root.display(), freed, "cache cleaned");
        Ok(freed)
    }

    async fn ensure_root(&self) -> Result<(), CacheError> {
        self.root.ensure().await.map(|_| ()).map_err(|e| {
            CacheError::io(
                format!("Failed to create cache directory {}", self.root.path().display()),
                e,
            )
        })
    }
}

fn require_digest<'a>(
    locator: &Locator,
    expected: Option<&'a Integrity>,
) -> Result<&'a Integrity, CacheError> {
    expected.ok_or_else(|| {
        CacheError::Configuration(format!("No integrity digest supplied for {locator}"))
    })
}

async fn hash_file(path: &Path, algorithm: Algorithm) -> Result<Integrity, CacheError> {
    let owned = path.to_path_buf();
    let result = tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(&owned)?;
        Integrity::from_reader(algorithm, std::io::BufReader::new(file))
    })
    .await
    .map_err(std::io::Error::other)
    .and_then(|r| r);

    result.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => CacheError::NotFound(path.to_path_buf()),
        _ => CacheError::io(format!("Failed to read {}", path.display()), e),
    })
}

async fn remove_if_exists(path: &Path) -> Result<bool, CacheError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CacheError::io(format!("Failed to remove {}", path.display()), e)),
    }
}
