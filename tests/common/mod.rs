//! Shared fixtures: an HTTP image server and instrumented trackers

#![allow(dead_code)]

use axum::body::Body;
use axum::extract::{Path as UrlPath, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use base64::{engine::general_purpose, Engine as _};
use framewise_core::Mask;
use framewise_track::{Device, TrackError, Tracker, TrackerFactory};
use futures::stream::{self, StreamExt};
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// PNG bytes of a solid `width` x `height` image.
pub fn png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .unwrap();
    bytes
}

pub fn white_pixel_png() -> Vec<u8> {
    png(1, 1, [255, 255, 255])
}

pub fn png_data_uri(bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", general_purpose::STANDARD.encode(bytes))
}

#[derive(Default)]
struct FixtureState {
    hits: Mutex<HashMap<String, usize>>,
}

#[derive(Deserialize)]
struct ImageParams {
    delay_ms: Option<u64>,
}

/// Serves `/images/<name>` as a 1x1 white PNG. Names starting with
/// `missing` answer 404. Names starting with `stall` send half the image and
/// then never finish the body. `?delay_ms=N` delays the response.
pub struct ImageServer {
    base_url: String,
    state: Arc<FixtureState>,
    handle: JoinHandle<()>,
}

impl ImageServer {
    pub async fn start() -> Self {
        let state = Arc::new(FixtureState::default());
        let app = Router::new()
            .route("/images/:name", get(serve_image))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            handle,
        }
    }

    pub fn url(&self, name: &str) -> String {
        format!("{}/images/{}", self.base_url, name)
    }

    pub fn delayed_url(&self, name: &str, delay: Duration) -> String {
        format!("{}?delay_ms={}", self.url(name), delay.as_millis())
    }

    /// Requests received for `name`.
    pub fn hits(&self, name: &str) -> usize {
        self.state.hits.lock().get(name).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.state.hits.lock().values().sum()
    }
}

impl Drop for ImageServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve_image(
    State(state): State<Arc<FixtureState>>,
    UrlPath(name): UrlPath<String>,
    Query(params): Query<ImageParams>,
) -> Response {
    *state.hits.lock().entry(name.clone()).or_insert(0) += 1;

    if let Some(delay) = params.delay_ms {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if name.starts_with("missing") {
        return StatusCode::NOT_FOUND.into_response();
    }
    if name.starts_with("stall") {
        let mut head = white_pixel_png();
        head.truncate(head.len() / 2);
        let body = stream::iter(vec![Ok::<_, std::io::Error>(head)]).chain(stream::pending());
        return ([(header::CONTENT_TYPE, "image/png")], Body::from_stream(body)).into_response();
    }
    ([(header::CONTENT_TYPE, "image/png")], white_pixel_png()).into_response()
}

/// Replays the seed mask and counts `predict` calls across all its trackers.
#[derive(Clone, Default)]
pub struct CountingFactory {
    predictions: Arc<AtomicUsize>,
    trackers: Arc<AtomicUsize>,
    delay: Duration,
}

impl CountingFactory {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn predictions(&self) -> usize {
        self.predictions.load(Ordering::SeqCst)
    }

    pub fn trackers(&self) -> usize {
        self.trackers.load(Ordering::SeqCst)
    }
}

struct CountingTracker {
    mask: Mask,
    predictions: Arc<AtomicUsize>,
    delay: Duration,
}

impl TrackerFactory for CountingFactory {
    fn new_tracker(&self, _: &Path, first_mask: &Mask, _: &Device) -> Result<Box<dyn Tracker>, TrackError> {
        self.trackers.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingTracker {
            mask: first_mask.clone(),
            predictions: Arc::clone(&self.predictions),
            delay: self.delay,
        }))
    }

    fn name(&self) -> &str {
        "counting"
    }
}

impl Tracker for CountingTracker {
    fn predict(&mut self, _: &Path) -> Result<Mask, TrackError> {
        self.predictions.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        Ok(self.mask.clone())
    }
}
