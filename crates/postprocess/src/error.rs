//! Post-processing errors

use contracts::ImageFormat;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PostprocessError {
    /// Pixel buffer length does not match width × height × channels
    #[error("{what}: expected {expected} bytes, got {actual}")]
    MalformedImage {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{what}: unsupported pixel format {format:?}")]
    UnsupportedFormat {
        what: &'static str,
        format: ImageFormat,
    },

    /// Two inputs that must share a resolution do not
    #[error("{what}: size {actual:?} does not match {expected:?}")]
    DimensionMismatch {
        what: &'static str,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// A required input record carried no image
    #[error("missing {0} image")]
    MissingInput(&'static str),
}

pub type Result<T> = std::result::Result<T, PostprocessError>;
