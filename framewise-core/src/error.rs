use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid RLE string: {0}")]
    InvalidRle(String),

    #[error("Mask size mismatch: declared {width}x{height} ({expected} pixels), RLE covers {actual}")]
    MaskSizeMismatch {
        width: u32,
        height: u32,
        expected: u64,
        actual: u64,
    },

    #[error("Invalid mask data: {0}")]
    InvalidMask(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, Error>;
