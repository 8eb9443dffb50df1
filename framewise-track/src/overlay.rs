//! Debug overlays: frames blended with their predicted masks

use crate::error::TrackError;
use framewise_core::{palette_color, BinaryMask, Mask};
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Mask opacity in rendered overlays.
pub const OVERLAY_ALPHA: f32 = 0.5;

/// Tint every foreground pixel of `frame` towards `color`.
pub fn blend_mask(frame: &mut RgbImage, mask: &BinaryMask, color: [u8; 3], alpha: f32) -> Result<(), TrackError> {
    if frame.width() != mask.width() || frame.height() != mask.height() {
        return Err(TrackError::Overlay(format!(
            "mask is {}x{} but frame is {}x{}",
            mask.width(),
            mask.height(),
            frame.width(),
            frame.height()
        )));
    }

    let alpha = alpha.clamp(0.0, 1.0);
    for (x, y, pixel) in frame.enumerate_pixels_mut() {
        if !mask.get(x, y) {
            continue;
        }
        let Rgb(channels) = *pixel;
        let mut blended = [0u8; 3];
        for i in 0..3 {
            let v = f32::from(channels[i]) * (1.0 - alpha) + f32::from(color[i]) * alpha;
            blended[i] = v.round().clamp(0.0, 255.0) as u8;
        }
        *pixel = Rgb(blended);
    }
    Ok(())
}

/// Writes `<dir>/<frame_index>.png` overlays for one request.
#[derive(Debug, Clone)]
pub struct OverlayWriter {
    dir: PathBuf,
    color: [u8; 3],
}

impl OverlayWriter {
    /// Object 1 of the palette; entry 0 is the background.
    pub fn new(dir: impl Into<PathBuf>, palette_seed: u64) -> Self {
        Self {
            dir: dir.into(),
            color: palette_color(palette_seed, 1),
        }
    }

    pub fn frame_path(&self, frame_index: u32) -> PathBuf {
        self.dir.join(format!("{}.png", frame_index))
    }

    pub fn render(&self, frame_index: u32, image: &Path, mask: &Mask) -> Result<PathBuf, TrackError> {
        let mut frame = image::open(image)?.to_rgb8();
        blend_mask(&mut frame, &mask.decode()?, self.color, OVERLAY_ALPHA)?;

        std::fs::create_dir_all(&self.dir)?;
        let path = self.frame_path(frame_index);
        frame.save(&path)?;
        debug!("wrote overlay {}", path.display());
        Ok(path)
    }

    /// Like [`render`](Self::render) but only logs failures.
    pub fn write(&self, frame_index: u32, image: &Path, mask: &Mask) {
        if let Err(e) = self.render(frame_index, image, mask) {
            warn!("failed to write overlay for frame {}: {}", frame_index, e);
        }
    }
}
