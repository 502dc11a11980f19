//! Fetch and integrity stages

use crate::plan::PlannedArchive;
use formula_errors::{Error, PipelineError, UserFacingError};
use formula_events::EventSender;
use formula_hash::Digest;
use formula_net::NetClient;
use std::path::Path;

/// Download one archive to its planned path
///
/// # Errors
///
/// Returns `PipelineError::Fetch` if the URL is empty or unreachable, or the
/// server answers with a non-2xx status.
pub async fn fetch_archive(
    client: &NetClient,
    archive: &PlannedArchive,
    tx: &EventSender,
) -> Result<(), Error> {
    fetch_to(client, &archive.url, &archive.download_path, tx).await
}

/// Download `url` to `dest`, mapping every failure to the fetch stage
///
/// # Errors
///
/// Returns `PipelineError::Fetch` on any failure.
pub async fn fetch_to(
    client: &NetClient,
    url: &str,
    dest: &Path,
    tx: &EventSender,
) -> Result<(), Error> {
    if url.trim().is_empty() {
        return Err(PipelineError::Fetch {
            url: url.to_string(),
            message: "URL is empty".to_string(),
        }
        .into());
    }

    formula_net::download_file(client, url, dest, tx)
        .await
        .map(|_| ())
        .map_err(|e| {
            PipelineError::Fetch {
                url: url.to_string(),
                message: e.user_message().into_owned(),
            }
            .into()
        })
}

/// Compare a downloaded archive against its pinned digest
///
/// # Errors
///
/// Returns `PipelineError::Integrity` on mismatch, or an I/O error if the
/// archive cannot be read.
pub async fn verify_archive(path: &Path, archive: &str, expected: &Digest) -> Result<(), Error> {
    let actual = Digest::hash_file(expected.algorithm(), path).await?;
    if actual != *expected {
        return Err(PipelineError::Integrity {
            archive: archive.to_string(),
            algorithm: expected.algorithm().to_string(),
            expected: expected.to_hex(),
            actual: actual.to_hex(),
        }
        .into());
    }
    tracing::debug!(archive, digest = %actual, "digest verified");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use formula_hash::DigestAlgorithm;

    #[tokio::test]
    async fn test_empty_url_is_fetch_error() {
        let (tx, _rx) = formula_events::channel();
        let client = NetClient::with_defaults().unwrap();
        let dir = tempfile::tempdir().unwrap();

        let err = fetch_to(&client, "", &dir.path().join("a.zip"), &tx)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Pipeline(PipelineError::Fetch { .. })));
    }

    #[tokio::test]
    async fn test_verify_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.zip");
        tokio::fs::write(&path, b"actual bytes").await.unwrap();

        let good = Digest::from_data(DigestAlgorithm::Sha256, b"actual bytes");
        assert!(verify_archive(&path, "a.zip", &good).await.is_ok());

        let bad = Digest::from_data(DigestAlgorithm::Sha256, b"other bytes");
        let err = verify_archive(&path, "a.zip", &bad).await.unwrap_err();
        match err {
            Error::Pipeline(PipelineError::Integrity {
                archive,
                expected,
                actual,
                ..
            }) => {
                assert_eq!(archive, "a.zip");
                assert_eq!(expected, bad.to_hex());
                assert_eq!(actual, good.to_hex());
            }
            other => panic!("expected integrity error, got {other:?}"),
        }
    }
}
