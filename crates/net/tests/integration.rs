//! Integration tests for net crate

use formula_errors::{Error, NetworkError};
use formula_events::{channel, AppEvent, DownloadEvent};
use formula_net::*;
use httpmock::prelude::*;
use tempfile::tempdir;

#[tokio::test]
async fn test_download_file() {
    let server = MockServer::start();
    let (tx, mut rx) = channel();

    let content = b"test archive content";
    let mock = server.mock(|when, then| {
        when.method(GET).path("/dcmtk-3.6.2.zip");
        then.status(200)
            .header("content-length", content.len().to_string())
            .body(content);
    });

    let temp = tempdir().unwrap();
    let dest = temp.path().join("dcmtk-3.6.2.zip");
    let client = NetClient::with_defaults().unwrap();
    let url = server.url("/dcmtk-3.6.2.zip");

    let result = download_file(&client, &url, &dest, &tx).await.unwrap();

    mock.assert();
    assert_eq!(result.size, content.len() as u64);
    assert_eq!(result.path, dest);
    assert_eq!(tokio::fs::read(&dest).await.unwrap(), content);
    assert!(!temp.path().join("dcmtk-3.6.2.zip.part").exists());

    let mut saw_start = false;
    let mut saw_complete = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            AppEvent::Download(DownloadEvent::Started { archive, total_size, .. }) => {
                assert_eq!(archive, "dcmtk-3.6.2.zip");
                assert_eq!(total_size, Some(content.len() as u64));
                saw_start = true;
            }
            AppEvent::Download(DownloadEvent::Completed { final_size, .. }) => {
                assert_eq!(final_size, content.len() as u64);
                saw_complete = true;
            }
            _ => {}
        }
    }
    assert!(saw_start);
    assert!(saw_complete);
}

#[tokio::test]
async fn test_download_http_error_is_not_retried() {
    let server = MockServer::start();
    let (tx, _rx) = channel();

    let mock = server.mock(|when, then| {
        when.method(GET).path("/missing.zip");
        then.status(404);
    });

    let temp = tempdir().unwrap();
    let dest = temp.path().join("missing.zip");
    let client = NetClient::with_defaults().unwrap();

    let err = download_file(&client, &server.url("/missing.zip"), &dest, &tx)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Network(NetworkError::HttpError { status: 404, .. })
    ));
    mock.assert_hits(1);
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_download_empty_url() {
    let (tx, _rx) = channel();
    let temp = tempdir().unwrap();
    let client = NetClient::with_defaults().unwrap();

    let err = download_file(&client, "", &temp.path().join("x.zip"), &tx)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Network(NetworkError::InvalidUrl(_))));
}

#[tokio::test]
async fn test_download_connection_refused() {
    let (tx, _rx) = channel();
    let temp = tempdir().unwrap();
    let client = NetClient::with_defaults().unwrap();

    // Port 9 (discard) on loopback is closed in test environments
    let err = download_file(&client, "http://127.0.0.1:9/a.zip", &temp.path().join("a.zip"), &tx)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Network(_)));
}

#[tokio::test]
async fn test_local_write_failure_removes_part_file() {
    let server = MockServer::start();
    let (tx, _rx) = channel();

    server.mock(|when, then| {
        when.method(GET).path("/src.tar.gz");
        then.status(200).body(b"archive bytes");
    });

    let temp = tempdir().unwrap();
    // A non-empty directory at the destination makes the final rename fail
    let dest = temp.path().join("src.tar.gz");
    std::fs::create_dir(&dest).unwrap();
    std::fs::write(dest.join("occupied"), b"x").unwrap();
    let client = NetClient::with_defaults().unwrap();

    let err = download_file(&client, &server.url("/src.tar.gz"), &dest, &tx)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Io { .. }));
    assert!(!temp.path().join("src.tar.gz.part").exists());
    assert!(dest.join("occupied").exists());
}
