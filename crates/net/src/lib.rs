#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for formula
//!
//! This crate handles archive downloads. Requests are made exactly once:
//! a failed download aborts the run instead of being retried.

mod client;
mod download;

pub use client::{NetClient, NetConfig};
pub use download::{Download, DownloadResult};

use formula_errors::{Error, NetworkError};
use formula_events::EventSender;
use std::path::Path;
use url::Url;

/// Download a file, streaming it to `dest`
///
/// # Errors
///
/// Returns an error if the URL is empty or invalid, the request fails, the
/// server answers with a non-2xx status, or writing the file fails.
pub async fn download_file(
    client: &NetClient,
    url: &str,
    dest: &Path,
    tx: &EventSender,
) -> Result<DownloadResult, Error> {
    let download = Download::new(url)?;
    download.execute(client, dest, tx).await
}

/// Parse and validate a URL
///
/// # Errors
///
/// Returns an error if the URL string is empty, malformed, or uses a scheme
/// other than `http`/`https`.
pub fn parse_url(url: &str) -> Result<Url, Error> {
    if url.trim().is_empty() {
        return Err(NetworkError::InvalidUrl("URL is empty".to_string()).into());
    }
    let parsed = Url::parse(url).map_err(|e| NetworkError::InvalidUrl(format!("{url}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(NetworkError::InvalidUrl(format!("unsupported scheme '{other}' in {url}")).into()),
    }
}
