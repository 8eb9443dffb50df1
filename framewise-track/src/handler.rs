//! Per-request tracking pipeline
//!
//! Every request runs three stages in order: materialize all images, seed a
//! fresh tracker with the first frame, then predict the subsequent frames one
//! by one. [`TrackHandler::track`] collects the whole sequence;
//! [`TrackHandler::track_stream`] yields each frame as soon as it is
//! predicted and stops predicting once the stream is dropped.

use crate::device::DevicePool;
use crate::error::TrackError;
use crate::materializer::ImageMaterializer;
use crate::overlay::OverlayWriter;
use crate::tracker::{Tracker, TrackerFactory};
use framewise_core::palette::DEFAULT_PALETTE_SEED;
use framewise_core::{Mask, ServiceConfig};
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRequest {
    pub first_image_uri: String,
    pub first_image_mask: Mask,
    pub subsequent_image_uris: Vec<String>,
}

/// Predicted mask of one subsequent frame; `frame_index` is 0-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameMask {
    pub frame_index: u32,
    pub mask: Mask,
}

#[derive(Clone)]
pub struct TrackHandler {
    materializer: Arc<ImageMaterializer>,
    factory: Arc<dyn TrackerFactory>,
    devices: Arc<DevicePool>,
    overlay_dir: Option<PathBuf>,
    palette_seed: u64,
}

impl TrackHandler {
    pub fn new(materializer: ImageMaterializer, factory: Arc<dyn TrackerFactory>) -> Self {
        Self {
            materializer: Arc::new(materializer),
            factory,
            devices: Arc::new(DevicePool::default()),
            overlay_dir: None,
            palette_seed: DEFAULT_PALETTE_SEED,
        }
    }

    pub fn from_config(config: &ServiceConfig, factory: Arc<dyn TrackerFactory>) -> Result<Self, TrackError> {
        let materializer = ImageMaterializer::new(
            config.images_dir(),
            config.image_workers,
            Duration::from_secs(config.download_timeout_secs),
        )?;

        let mut handler = Self::new(materializer, factory).with_devices(DevicePool::from_names(&config.devices));
        if config.debug_overlay {
            handler = handler.with_overlay(config.debug_dir(), config.palette_seed);
        }
        Ok(handler)
    }

    pub fn with_devices(mut self, devices: DevicePool) -> Self {
        self.devices = Arc::new(devices);
        self
    }

    /// Write `<dir>/<request-id>/<frame_index>.png` for every predicted frame.
    pub fn with_overlay(mut self, dir: impl Into<PathBuf>, palette_seed: u64) -> Self {
        self.overlay_dir = Some(dir.into());
        self.palette_seed = palette_seed;
        self
    }

    pub fn materializer(&self) -> &ImageMaterializer {
        &self.materializer
    }

    /// Run the whole request and return one mask per subsequent frame.
    pub async fn track(&self, request: TrackRequest) -> Result<Vec<Mask>, TrackError> {
        let mut session = self.start(request).await?;
        let mut masks = Vec::with_capacity(session.frames.len());
        while let Some(frame) = session.next_frame().await? {
            masks.push(frame.mask);
        }
        Ok(masks)
    }

    /// Yield frames in ascending index order. Nothing is predicted ahead of
    /// demand, and dropping the stream ends the request. A failure is
    /// yielded as the last item.
    pub fn track_stream(&self, request: TrackRequest) -> BoxStream<'static, Result<FrameMask, TrackError>> {
        let stage = Stage::Prepare(self.clone(), request);
        stream::unfold(stage, |stage| async move {
            let mut session = match stage {
                Stage::Prepare(handler, request) => match handler.start(request).await {
                    Ok(session) => session,
                    Err(e) => return Some((Err(e), Stage::Finished)),
                },
                Stage::Track(session) => session,
                Stage::Finished => return None,
            };

            match session.next_frame().await {
                Ok(Some(frame)) => Some((Ok(frame), Stage::Track(session))),
                Ok(None) => None,
                Err(e) => Some((Err(e), Stage::Finished)),
            }
        })
        .boxed()
    }

    /// Materialize every image and seed a tracker.
    async fn start(&self, request: TrackRequest) -> Result<TrackSession, TrackError> {
        let request_id = Uuid::new_v4();
        check_request(&request)?;
        info!(
            %request_id,
            frames = request.subsequent_image_uris.len(),
            tracker = self.factory.name(),
            "tracking request started"
        );

        let started = Instant::now();
        let mut references = Vec::with_capacity(request.subsequent_image_uris.len() + 1);
        references.push(request.first_image_uri);
        references.extend(request.subsequent_image_uris);

        let mut paths = match self.materializer.materialize(&references).await {
            Ok(paths) => paths,
            Err(e) => {
                warn!(%request_id, error = %e, "image preparation failed");
                return Err(e.into());
            }
        };
        let frames = paths.split_off(1);
        let first_image = paths
            .pop()
            .ok_or_else(|| TrackError::Worker("first image missing after preparation".to_string()))?;
        debug!(%request_id, elapsed_ms = started.elapsed().as_millis() as u64, "images prepared");

        let device = self.devices.next();
        let factory = Arc::clone(&self.factory);
        let first_mask = request.first_image_mask;
        let tracker = tokio::task::spawn_blocking(move || factory.new_tracker(&first_image, &first_mask, &device))
            .await
            .map_err(|e| TrackError::Worker(e.to_string()))??;

        let overlay = self
            .overlay_dir
            .as_ref()
            .map(|dir| OverlayWriter::new(dir.join(request_id.to_string()), self.palette_seed));

        Ok(TrackSession {
            request_id,
            tracker: Some(tracker),
            frames,
            next: 0,
            overlay,
            finished: false,
        })
    }
}

enum Stage {
    Prepare(TrackHandler, TrackRequest),
    Track(TrackSession),
    Finished,
}

fn check_request(request: &TrackRequest) -> Result<(), TrackError> {
    if request.first_image_uri.is_empty() {
        return Err(TrackError::InvalidRequest("first image uri is empty".to_string()));
    }
    if let Some(index) = request.subsequent_image_uris.iter().position(|uri| uri.is_empty()) {
        return Err(TrackError::InvalidRequest(format!("subsequent image uri {} is empty", index)));
    }
    if u32::try_from(request.subsequent_image_uris.len()).is_err() {
        return Err(TrackError::InvalidRequest("too many subsequent images".to_string()));
    }
    request
        .first_image_mask
        .validate()
        .map_err(|e| TrackError::InvalidRequest(format!("first image mask: {}", e)))
}

/// Tracker state of one in-flight request.
struct TrackSession {
    request_id: Uuid,
    tracker: Option<Box<dyn Tracker>>,
    frames: Vec<PathBuf>,
    next: usize,
    overlay: Option<OverlayWriter>,
    finished: bool,
}

impl TrackSession {
    /// Predict the next frame, or `None` once all frames are done.
    async fn next_frame(&mut self) -> Result<Option<FrameMask>, TrackError> {
        let Some(image) = self.frames.get(self.next).cloned() else {
            self.finish();
            return Ok(None);
        };
        let frame_index = self.next as u32;

        let mut tracker = self
            .tracker
            .take()
            .ok_or_else(|| TrackError::Worker("tracker used after failure".to_string()))?;
        let overlay = self.overlay.clone();

        // inference blocks, so it runs off the async workers
        let joined = tokio::task::spawn_blocking(move || {
            let result = tracker.predict(&image).and_then(|mask| {
                mask.validate()
                    .map_err(|e| TrackError::Tracker(format!("invalid mask for frame {}: {}", frame_index, e)))?;
                Ok(mask)
            });
            if let (Ok(mask), Some(overlay)) = (&result, &overlay) {
                overlay.write(frame_index, &image, mask);
            }
            (tracker, result)
        })
        .await;

        let (tracker, result) = match joined {
            Ok(done) => done,
            Err(e) => {
                self.finished = true;
                return Err(TrackError::Worker(e.to_string()));
            }
        };

        match result {
            Ok(mask) => {
                debug!(request_id = %self.request_id, frame_index, "frame predicted");
                self.tracker = Some(tracker);
                self.next += 1;
                Ok(Some(FrameMask { frame_index, mask }))
            }
            Err(e) => {
                warn!(request_id = %self.request_id, frame_index, error = %e, "prediction failed");
                self.finished = true;
                Err(e)
            }
        }
    }

    fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            info!(request_id = %self.request_id, frames = self.next, "tracking request completed");
        }
    }
}

impl Drop for TrackSession {
    fn drop(&mut self) {
        if !self.finished {
            info!(
                request_id = %self.request_id,
                frames = self.next,
                remaining = self.frames.len() - self.next,
                "tracking request cancelled"
            );
        }
    }
}
