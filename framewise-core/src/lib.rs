pub mod config;
pub mod error;
pub mod mask;
pub mod palette;

pub use config::{ServiceConfig, TrackerConfig, TrackerKind, LogFormat};
pub use error::{Error, Result};
pub use mask::{BinaryMask, Mask, MaskSize};
pub use palette::{palette, palette_color};
