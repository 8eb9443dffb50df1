//! Tracker capability
//!
//! A deployment supplies a [`TrackerFactory`]; the handler asks it for one
//! fresh [`Tracker`] per request, seeded with the first frame and its mask,
//! then calls [`Tracker::predict`] once per subsequent frame in order.
//! Trackers are never shared between requests.

use crate::device::Device;
use crate::error::TrackError;
use crate::process::ProcessTrackerFactory;
use framewise_core::{Mask, TrackerConfig, TrackerKind};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Builds per-request tracker instances.
pub trait TrackerFactory: Send + Sync {
    fn new_tracker(
        &self,
        first_image: &Path,
        first_mask: &Mask,
        device: &Device,
    ) -> Result<Box<dyn Tracker>, TrackError>;

    /// Short label used in logs.
    fn name(&self) -> &str {
        "tracker"
    }
}

/// Stateful single-object tracker.
///
/// `predict` may block on inference and must be called with frames in
/// temporal order. An empty mask is a valid result.
pub trait Tracker: Send {
    fn predict(&mut self, image: &Path) -> Result<Mask, TrackError>;
}

/// Returns the seed mask for a fixed number of frames, then empty masks.
/// Sleeps on every call to stand in for inference time.
#[derive(Debug, Clone)]
pub struct MockTrackerFactory {
    delay: Duration,
    frames_before_lost: Option<u32>,
}

impl MockTrackerFactory {
    pub fn new(delay: Duration, frames_before_lost: Option<u32>) -> Self {
        Self {
            delay,
            frames_before_lost,
        }
    }
}

impl TrackerFactory for MockTrackerFactory {
    fn new_tracker(
        &self,
        first_image: &Path,
        first_mask: &Mask,
        device: &Device,
    ) -> Result<Box<dyn Tracker>, TrackError> {
        first_mask.validate()?;
        debug!("mock tracker seeded with {} on {}", first_image.display(), device);
        Ok(Box::new(MockTracker {
            mask: first_mask.clone(),
            delay: self.delay,
            frames_before_lost: self.frames_before_lost,
            seen: 0,
        }))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[derive(Debug)]
pub struct MockTracker {
    mask: Mask,
    delay: Duration,
    frames_before_lost: Option<u32>,
    seen: u32,
}

impl Tracker for MockTracker {
    fn predict(&mut self, _image: &Path) -> Result<Mask, TrackError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let lost = self.frames_before_lost.map_or(false, |n| self.seen >= n);
        self.seen = self.seen.saturating_add(1);
        if lost {
            Ok(Mask::empty(self.mask.size))
        } else {
            Ok(self.mask.clone())
        }
    }
}

/// Always answers with the mask it was seeded with.
#[derive(Debug, Clone, Default)]
pub struct ReplayTrackerFactory;

impl TrackerFactory for ReplayTrackerFactory {
    fn new_tracker(
        &self,
        _first_image: &Path,
        first_mask: &Mask,
        _device: &Device,
    ) -> Result<Box<dyn Tracker>, TrackError> {
        Ok(Box::new(ReplayTracker {
            mask: first_mask.clone(),
        }))
    }

    fn name(&self) -> &str {
        "replay"
    }
}

#[derive(Debug)]
pub struct ReplayTracker {
    mask: Mask,
}

impl Tracker for ReplayTracker {
    fn predict(&mut self, _image: &Path) -> Result<Mask, TrackError> {
        Ok(self.mask.clone())
    }
}

/// Build the factory selected by configuration.
pub fn factory_from_config(config: &TrackerConfig) -> Result<Arc<dyn TrackerFactory>, TrackError> {
    match config.kind {
        TrackerKind::Mock => Ok(Arc::new(MockTrackerFactory::new(
            Duration::from_millis(config.mock_delay_ms),
            config.mock_frames_before_lost,
        ))),
        TrackerKind::Replay => Ok(Arc::new(ReplayTrackerFactory)),
        TrackerKind::Process => {
            let command = config.process_command.clone().ok_or_else(|| {
                TrackError::Tracker("process tracker requires a command".to_string())
            })?;
            Ok(Arc::new(ProcessTrackerFactory::new(
                command,
                config.process_args.clone(),
            )))
        }
    }
}
