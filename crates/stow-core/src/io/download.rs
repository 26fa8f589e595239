//! Streaming download with on-the-fly integrity hashing.
//!
//! Bytes are written to a temporary file next to the destination and only
//! renamed into place once the transfer completed and was flushed to disk.

use std::path::Path;

use futures::StreamExt;
use reqwest::Client;
use stow_schema::{Algorithm, Integrity, Locator};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::Reporter;

/// Prefix of in-flight download files inside the destination directory.
pub const PARTIAL_PREFIX: &str = ".stow-";

/// Suffix of in-flight download files inside the destination directory.
pub const PARTIAL_SUFFIX: &str = ".part";

/// Whether `file_name` names an in-flight download.
pub fn is_partial(file_name: &str) -> bool {
    file_name.starts_with(PARTIAL_PREFIX) && file_name.ends_with(PARTIAL_SUFFIX)
}

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Download `url` to `dest`, hashing the body with `algorithm`.
///
/// On success `dest` holds the complete body and the computed digest is
/// returned. On failure `dest` is untouched and no partial file remains.
pub async fn download<R: Reporter>(
    client: &Client,
    locator: &Locator,
    url: &str,
    dest: &Path,
    algorithm: Algorithm,
    reporter: &R,
) -> Result<Integrity, DownloadError> {
    tracing::info!(url, dest = %dest.display(), "downloading");

    let response = client.get(url).send().await?;

    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        return Err(DownloadError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let total = response.content_length();
    reporter.downloading(locator, 0, total);

    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    let (file, temp_path) = tempfile::Builder::new()
        .prefix(PARTIAL_PREFIX)
        .suffix(PARTIAL_SUFFIX)
        .tempfile_in(parent)?
        .into_parts();
    let mut file = tokio::fs::File::from_std(file);

    let mut stream = response.bytes_stream();
    let mut hasher = algorithm.hasher();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        hasher.update(&chunk);
        downloaded += chunk.len() as u64;
        reporter.downloading(locator, downloaded, total);
    }

    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    temp_path.persist(dest).map_err(|e| e.error)?;
    tracing::trace!(url, bytes = downloaded, "download complete");

    Ok(hasher.finish())
}
