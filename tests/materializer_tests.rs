mod common;

use common::{png_data_uri, white_pixel_png, ImageServer};
use framewise_track::{ImageMaterializer, MaterializeError};
use std::time::Duration;
use tempfile::TempDir;

fn materializer(dir: &TempDir, workers: usize) -> ImageMaterializer {
    ImageMaterializer::new(dir.path().join("images"), workers, Duration::from_secs(10)).unwrap()
}

#[tokio::test]
async fn test_order_preserved_under_out_of_order_completion() {
    let server = ImageServer::start().await;
    let dir = TempDir::new().unwrap();
    let m = materializer(&dir, 8);

    // earlier references finish last
    let refs: Vec<String> = (0..8)
        .map(|i| server.delayed_url(&format!("frame-{}.png", i), Duration::from_millis((8 - i) * 40)))
        .collect();

    let paths = m.materialize(&refs).await.unwrap();
    assert_eq!(paths.len(), refs.len());
    for (reference, path) in refs.iter().zip(&paths) {
        assert_eq!(path, &m.cache_path(reference));
        assert_eq!(std::fs::read(path).unwrap(), white_pixel_png());
    }
}

#[tokio::test]
async fn test_mixed_references_keep_order() {
    let server = ImageServer::start().await;
    let dir = TempDir::new().unwrap();
    let m = materializer(&dir, 3);

    let refs = vec![
        server.delayed_url("a.png", Duration::from_millis(100)),
        png_data_uri(b"inline-1"),
        server.url("b.jpg"),
        png_data_uri(b"inline-2"),
    ];
    let paths = m.materialize(&refs).await.unwrap();

    assert_eq!(std::fs::read(&paths[1]).unwrap(), b"inline-1");
    assert_eq!(std::fs::read(&paths[3]).unwrap(), b"inline-2");
    assert!(paths[0].to_string_lossy().ends_with(".png"));
    assert!(paths[2].to_string_lossy().ends_with(".jpg"));
}

#[tokio::test]
async fn test_second_materialize_skips_network() {
    let server = ImageServer::start().await;
    let dir = TempDir::new().unwrap();
    let m = materializer(&dir, 4);
    let refs: Vec<String> = (0..5).map(|i| server.url(&format!("f{}.png", i))).collect();

    let first = m.materialize(&refs).await.unwrap();
    assert_eq!(server.total_hits(), 5);

    let second = m.materialize(&refs).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(server.total_hits(), 5);
}

#[tokio::test]
async fn test_cache_shared_across_materializers() {
    let server = ImageServer::start().await;
    let dir = TempDir::new().unwrap();
    let refs = vec![server.url("shared.png")];

    materializer(&dir, 1).materialize(&refs).await.unwrap();
    materializer(&dir, 1).materialize(&refs).await.unwrap();
    assert_eq!(server.hits("shared.png"), 1);
}

#[tokio::test]
async fn test_concurrent_requests_for_same_image() {
    let server = ImageServer::start().await;
    let dir = TempDir::new().unwrap();
    let refs = vec![server.delayed_url("race.png", Duration::from_millis(50))];

    let a = materializer(&dir, 2);
    let b = materializer(&dir, 2);
    let (ra, rb) = tokio::join!(a.materialize(&refs), b.materialize(&refs));
    let (pa, pb) = (ra.unwrap(), rb.unwrap());

    assert_eq!(pa, pb);
    assert_eq!(std::fs::read(&pa[0]).unwrap(), white_pixel_png());
    let entries: Vec<_> = std::fs::read_dir(dir.path().join("images"))
        .unwrap()
        .filter_map(|e| e.ok())
        .collect();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_not_found_fails_whole_call() {
    let server = ImageServer::start().await;
    let dir = TempDir::new().unwrap();
    let m = materializer(&dir, 4);
    let refs = vec![server.url("ok.png"), server.url("missing.png")];

    match m.materialize(&refs).await {
        Err(MaterializeError::DownloadFailed { reference, cause }) => {
            assert!(reference.ends_with("/images/missing.png"));
            assert!(cause.contains("404"));
        }
        other => panic!("Expected DownloadFailed, got {:?}", other),
    }
    assert!(!m.cache_path(&refs[1]).exists());
}

fn partial_files(dir: &TempDir) -> Vec<String> {
    std::fs::read_dir(dir.path().join("images"))
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".part"))
        .collect()
}

#[tokio::test]
async fn test_failure_removes_partial_downloads() {
    let server = ImageServer::start().await;
    let dir = TempDir::new().unwrap();
    let m = materializer(&dir, 4);
    // the stalled body has started writing by the time the 404 arrives
    let refs = vec![
        server.url("stall.png"),
        server.delayed_url("missing.png", Duration::from_millis(300)),
    ];

    assert!(matches!(
        m.materialize(&refs).await,
        Err(MaterializeError::DownloadFailed { .. })
    ));
    assert_eq!(server.hits("stall.png"), 1);
    assert!(partial_files(&dir).is_empty());
    assert!(!m.cache_path(&refs[0]).exists());
}

#[tokio::test]
async fn test_abandoned_materialize_removes_partial_downloads() {
    let server = ImageServer::start().await;
    let dir = TempDir::new().unwrap();
    let m = materializer(&dir, 1);
    let refs = vec![server.url("stall-abandoned.png")];

    let result = tokio::time::timeout(Duration::from_millis(300), m.materialize(&refs)).await;
    assert!(result.is_err());
    assert!(partial_files(&dir).is_empty());
    assert!(!m.cache_path(&refs[0]).exists());
}

#[tokio::test]
async fn test_unreachable_host() {
    let dir = TempDir::new().unwrap();
    let m = materializer(&dir, 1);
    // reserved port, nothing listens there
    let refs = vec!["http://127.0.0.1:9/nothing.png".to_string()];
    assert!(matches!(
        m.materialize(&refs).await,
        Err(MaterializeError::DownloadFailed { .. })
    ));
}

#[tokio::test]
async fn test_unsupported_data_uri_is_not_decoded() {
    let dir = TempDir::new().unwrap();
    let m = materializer(&dir, 1);
    let refs = vec!["data:image/gif;base64,R0lGODlh".to_string()];
    assert!(matches!(
        m.materialize(&refs).await,
        Err(MaterializeError::DownloadFailed { .. })
    ));
}
