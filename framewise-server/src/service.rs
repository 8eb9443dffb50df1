//! `track.v1.TrackService` on top of [`TrackHandler`]

use crate::proto::{self, track_service_server::TrackService, track_service_server::TrackServiceServer};
use crate::workers::{GuardedStream, WorkerGuard, WorkerPool};
use async_trait::async_trait;
use framewise_core::ServiceConfig;
use framewise_track::tracker::factory_from_config;
use framewise_track::{TrackError, TrackHandler, TrackRequest};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use tonic::{Request, Response, Status};
use tracing::{debug, error, info};

pub type FrameMaskStream = Pin<Box<dyn Stream<Item = Result<proto::FrameMask, Status>> + Send>>;

#[derive(Clone)]
pub struct TrackServer {
    handler: TrackHandler,
    workers: WorkerPool,
    max_message_size: usize,
}

impl TrackServer {
    pub fn new(handler: TrackHandler, request_workers: usize) -> Self {
        Self {
            handler,
            workers: WorkerPool::new(request_workers),
            max_message_size: framewise_core::config::MIN_MESSAGE_SIZE,
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, TrackError> {
        let factory = factory_from_config(&config.tracker)?;
        let handler = TrackHandler::from_config(config, factory)?;
        info!(
            "tracker={} request_workers={} image_workers={} devices={:?} workspace={}",
            config.tracker.kind,
            config.request_workers,
            config.image_workers,
            config.devices,
            config.workspace.display()
        );
        Ok(Self::new(handler, config.request_workers).with_max_message_size(config.max_message_size))
    }

    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    pub fn workers(&self) -> &WorkerPool {
        &self.workers
    }

    /// tonic service with the message size limit applied both ways.
    pub fn into_service(self) -> TrackServiceServer<Self> {
        let limit = self.max_message_size;
        TrackServiceServer::new(self)
            .max_decoding_message_size(limit)
            .max_encoding_message_size(limit)
    }

    async fn acquire(&self) -> Result<WorkerGuard, Status> {
        self.workers
            .acquire()
            .await
            .map_err(|e| Status::unavailable(e.to_string()))
    }
}

#[async_trait]
impl TrackService for TrackServer {
    async fn track(&self, request: Request<proto::TrackRequest>) -> Result<Response<proto::TrackResponse>, Status> {
        debug!("Track from {:?}", request.remote_addr());
        let request = track_request(request.into_inner())?;
        let _worker = self.acquire().await?;

        let masks = self.handler.track(request).await.map_err(status_from)?;
        Ok(Response::new(proto::TrackResponse {
            subsequent_image_masks: masks.into_iter().map(Into::into).collect(),
        }))
    }

    type TrackStreamStream = FrameMaskStream;

    async fn track_stream(
        &self,
        request: Request<proto::TrackRequest>,
    ) -> Result<Response<Self::TrackStreamStream>, Status> {
        debug!("TrackStream from {:?}", request.remote_addr());
        let request = track_request(request.into_inner())?;
        let worker = self.acquire().await?;

        let frames = self
            .handler
            .track_stream(request)
            .map(|item| item.map(proto::FrameMask::from).map_err(status_from));
        Ok(Response::new(Box::pin(GuardedStream::new(frames, worker))))
    }
}

fn track_request(request: proto::TrackRequest) -> Result<TrackRequest, Status> {
    let first_image_mask = request
        .first_image_mask
        .ok_or_else(|| Status::invalid_argument("first_image_mask is required"))?;
    Ok(TrackRequest {
        first_image_uri: request.first_image_uri,
        first_image_mask: first_image_mask.into(),
        subsequent_image_uris: request.subsequent_image_uris,
    })
}

/// Image failures are reported without per-image detail.
pub fn status_from(err: TrackError) -> Status {
    match err {
        TrackError::Materialize(e) => {
            error!("failed to prepare images: {}", e);
            Status::internal("failed to prepare images")
        }
        TrackError::InvalidRequest(msg) => Status::invalid_argument(msg),
        other => {
            error!("tracking failed: {}", other);
            Status::internal(other.to_string())
        }
    }
}
