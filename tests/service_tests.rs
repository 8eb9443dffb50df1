mod common;

use common::{png_data_uri, white_pixel_png, CountingFactory, ImageServer};
use framewise_core::{Mask, MaskSize};
use framewise_server::proto::track_service_server::TrackService;
use framewise_server::proto::{self, FrameMask};
use framewise_server::TrackServer;
use framewise_track::tracker::{MockTrackerFactory, ReplayTrackerFactory};
use framewise_track::{ImageMaterializer, TrackHandler, TrackerFactory};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tonic::{Code, Request};

fn server(dir: &TempDir, factory: Arc<dyn TrackerFactory>, request_workers: usize) -> TrackServer {
    let materializer = ImageMaterializer::new(dir.path().join("images"), 4, Duration::from_secs(10)).unwrap();
    TrackServer::new(TrackHandler::new(materializer, factory), request_workers)
}

fn seed_mask() -> Mask {
    Mask::full(MaskSize::new(1, 1))
}

fn request(first: String, subsequent: Vec<String>) -> proto::TrackRequest {
    proto::TrackRequest {
        first_image_uri: first,
        first_image_mask: Some(seed_mask().into()),
        subsequent_image_uris: subsequent,
    }
}

#[tokio::test]
async fn test_white_pixel_end_to_end() {
    let images = ImageServer::start().await;
    let dir = TempDir::new().unwrap();
    let server = server(&dir, Arc::new(ReplayTrackerFactory), 2);

    let req = request(
        png_data_uri(&white_pixel_png()),
        vec![images.url("white-1.png"), images.url("white-2.png")],
    );
    let response = server.track(Request::new(req)).await.unwrap().into_inner();

    let expected: proto::Mask = seed_mask().into();
    assert_eq!(response.subsequent_image_masks.len(), 2);
    for mask in &response.subsequent_image_masks {
        assert_eq!(mask, &expected);
        assert_eq!(mask.coco_encoded_rle, seed_mask().coco_encoded_rle);
    }
}

#[tokio::test]
async fn test_both_modes_return_k_results() {
    let images = ImageServer::start().await;
    let dir = TempDir::new().unwrap();
    let server = server(&dir, Arc::new(ReplayTrackerFactory), 2);

    let k = 10;
    let subsequent: Vec<String> = (0..k)
        .map(|i| images.delayed_url(&format!("k-{}.png", i), Duration::from_millis((k - i) * 10)))
        .collect();

    let batch = server
        .track(Request::new(request(images.url("first.png"), subsequent.clone())))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(batch.subsequent_image_masks.len(), k as usize);

    let stream = server
        .track_stream(Request::new(request(images.url("first.png"), subsequent)))
        .await
        .unwrap()
        .into_inner();
    let frames: Vec<FrameMask> = stream.map(|item| item.unwrap()).collect().await;

    let indices: Vec<u32> = frames.iter().map(|f| f.frame_index).collect();
    assert_eq!(indices, (0..k as u32).collect::<Vec<_>>());
    for (frame, mask) in frames.iter().zip(&batch.subsequent_image_masks) {
        assert_eq!(frame.mask.as_ref(), Some(mask));
    }
}

#[tokio::test]
async fn test_cancelled_stream_stops_predicting() {
    let dir = TempDir::new().unwrap();
    let factory = CountingFactory::with_delay(Duration::from_millis(20));
    let server = server(&dir, Arc::new(factory.clone()), 1);

    let subsequent: Vec<String> = (0..10)
        .map(|i| png_data_uri(format!("frame {}", i).as_bytes()))
        .collect();
    let mut stream = server
        .track_stream(Request::new(request(png_data_uri(b"first"), subsequent)))
        .await
        .unwrap()
        .into_inner();

    for expected in 0..3u32 {
        let frame = stream.next().await.unwrap().unwrap();
        assert_eq!(frame.frame_index, expected);
    }
    drop(stream);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(factory.predictions() <= 3, "{} predictions", factory.predictions());
    assert_eq!(server.workers().available(), 1);
}

#[tokio::test]
async fn test_not_found_fails_batch() {
    let images = ImageServer::start().await;
    let dir = TempDir::new().unwrap();
    let factory = CountingFactory::default();
    let server = server(&dir, Arc::new(factory.clone()), 2);

    let req = request(
        images.url("first.png"),
        vec![images.url("a.png"), images.url("missing-b.png"), images.url("c.png")],
    );
    let status = server.track(Request::new(req)).await.unwrap_err();
    assert_eq!(status.code(), Code::Internal);
    assert_eq!(factory.trackers(), 0);
}

#[tokio::test]
async fn test_not_found_stream_emits_nothing() {
    let images = ImageServer::start().await;
    let dir = TempDir::new().unwrap();
    let factory = CountingFactory::default();
    let server = server(&dir, Arc::new(factory.clone()), 2);

    let req = request(images.url("first.png"), vec![images.url("a.png"), images.url("missing.png")]);
    let items: Vec<_> = server
        .track_stream(Request::new(req))
        .await
        .unwrap()
        .into_inner()
        .collect()
        .await;

    assert_eq!(items.iter().filter(|item| item.is_ok()).count(), 0);
    match items.last() {
        Some(Err(status)) => assert_eq!(status.code(), Code::Internal),
        other => panic!("Expected an internal error, got {:?}", other),
    }
    assert_eq!(factory.predictions(), 0);
}

#[tokio::test]
async fn test_lost_track_yields_empty_masks() {
    let dir = TempDir::new().unwrap();
    let factory = MockTrackerFactory::new(Duration::ZERO, Some(2));
    let server = server(&dir, Arc::new(factory), 1);

    let subsequent: Vec<String> = (0..5).map(|i| png_data_uri(format!("{}", i).as_bytes())).collect();
    let frames: Vec<FrameMask> = server
        .track_stream(Request::new(request(png_data_uri(b"seed"), subsequent)))
        .await
        .unwrap()
        .into_inner()
        .map(|item| item.unwrap())
        .collect()
        .await;

    assert_eq!(frames.len(), 5);
    let empty: Vec<bool> = frames
        .into_iter()
        .map(|f| Mask::from(f.mask.unwrap()).is_empty().unwrap())
        .collect();
    assert_eq!(empty, vec![false, false, true, true, true]);
}

#[tokio::test]
async fn test_requests_wait_for_a_free_worker() {
    let dir = TempDir::new().unwrap();
    let server = server(&dir, Arc::new(ReplayTrackerFactory), 1);
    let req = request(png_data_uri(b"first"), vec![png_data_uri(b"second")]);

    // an unconsumed stream keeps the only worker busy
    let held = server.track_stream(Request::new(req.clone())).await.unwrap();
    let blocked = tokio::time::timeout(Duration::from_millis(100), server.track(Request::new(req.clone()))).await;
    assert!(blocked.is_err());

    drop(held);
    let response = server.track(Request::new(req)).await.unwrap().into_inner();
    assert_eq!(response.subsequent_image_masks.len(), 1);
}

#[tokio::test]
async fn test_invalid_seed_mask() {
    let dir = TempDir::new().unwrap();
    let server = server(&dir, Arc::new(ReplayTrackerFactory), 1);
    let mut req = request(png_data_uri(b"first"), vec![png_data_uri(b"second")]);
    req.first_image_mask = Some(proto::Mask {
        coco_encoded_rle: "05".to_string(),
        size: Some(proto::mask::Size { width: 2, height: 2 }),
    });

    let status = server.track(Request::new(req)).await.unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);
}
