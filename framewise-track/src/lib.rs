//! framewise-track: per-request mask tracking over image sequences
//!
//! Resolves image references to a content-addressed local cache, seeds a
//! tracker with the first frame and mask, and predicts a mask for every
//! subsequent frame in order, either as one batch or as a stream.

pub mod device;
pub mod error;
pub mod handler;
pub mod materializer;
pub mod overlay;
pub mod process;
pub mod tracker;

pub use device::{Device, DevicePool};
pub use error::{MaterializeError, TrackError};
pub use handler::{FrameMask, TrackHandler, TrackRequest};
pub use materializer::ImageMaterializer;
pub use tracker::{Tracker, TrackerFactory};
