//! Streaming file download

use formula_errors::{Error, NetworkError};
use formula_events::{EventEmitter, EventSender};
use futures::StreamExt;
use reqwest::Response;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::NetClient;

/// Download operation handle
pub struct Download {
    url: Url,
}

/// Result of a download operation
#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub url: String,
    pub path: PathBuf,
    pub size: u64,
    pub elapsed: Duration,
}

impl Download {
    /// Create a new download
    ///
    /// # Errors
    ///
    /// Returns an error if the provided URL is empty or invalid.
    pub fn new(url: &str) -> Result<Self, Error> {
        Ok(Self {
            url: crate::parse_url(url)?,
        })
    }

    /// Execute the download
    ///
    /// The body is streamed into `<dest>.part` and renamed into place only
    /// once complete, so `dest` never holds a truncated archive.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the server returns an error
    /// status, or the file cannot be created or written.
    pub async fn execute(
        self,
        client: &NetClient,
        dest: &Path,
        tx: &EventSender,
    ) -> Result<DownloadResult, Error> {
        let url_str = self.url.to_string();
        let archive = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let start = Instant::now();

        let response = client.get(&url_str).await?;

        if !response.status().is_success() {
            return Err(NetworkError::HttpError {
                status: response.status().as_u16(),
                message: response.status().to_string(),
            }
            .into());
        }

        let content_length = response.content_length();
        tracing::debug!(url = %url_str, size = ?content_length, "download started");
        tx.emit_download_started(&url_str, &archive, content_length);

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io_with_path(&e, parent))?;
        }

        let mut part_name = dest.as_os_str().to_owned();
        part_name.push(".part");
        let part_path = PathBuf::from(part_name);

        let written = match write_body(response, &part_path).await {
            Ok(size) => tokio::fs::rename(&part_path, dest)
                .await
                .map(|()| size)
                .map_err(|e| Error::io_with_path(&e, dest)),
            Err(e) => Err(e),
        };
        let downloaded = match written {
            Ok(size) => size,
            Err(e) => {
                let _ = tokio::fs::remove_file(&part_path).await;
                return Err(e);
            }
        };

        let elapsed = start.elapsed();
        tracing::debug!(url = %url_str, size = downloaded, "download completed");
        tx.emit_download_completed(&url_str, &archive, downloaded, elapsed);

        Ok(DownloadResult {
            url: url_str,
            path: dest.to_path_buf(),
            size: downloaded,
            elapsed,
        })
    }
}

/// Stream the response body into `part_path`, returning the byte count
async fn write_body(response: Response, part_path: &Path) -> Result<u64, Error> {
    let mut file = File::create(part_path)
        .await
        .map_err(|e| Error::io_with_path(&e, part_path))?;

    let mut stream = response.bytes_stream();
    let mut downloaded = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| NetworkError::DownloadFailed(e.to_string()))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| Error::io_with_path(&e, part_path))?;
        downloaded += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|e| Error::io_with_path(&e, part_path))?;
    Ok(downloaded)
}
