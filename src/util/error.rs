//! Error types for pillcascade.

use thiserror::Error;

/// Result alias for pillcascade operations.
pub type CascadeResult<T> = std::result::Result<T, CascadeError>;

/// Boxed error returned by a [`crate::Model`] implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while running the detection cascade.
#[derive(Debug, Error)]
pub enum CascadeError {
    /// Width or height is zero, or their product overflows.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is smaller than the row length in elements.
    #[error("invalid stride {stride} for row length {row_len}")]
    InvalidStride { row_len: usize, stride: usize },
    /// Backing buffer is shorter than the view requires.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// Requested region does not fit inside the image.
    #[error(
        "roi out of bounds: ({x}, {y}) {width}x{height} in {img_width}x{img_height} image"
    )]
    RoiOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// A configuration field has an unusable value.
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
    /// A threshold is not finite or lies outside `[0, 1]`.
    #[error("invalid threshold {name}: {value} (expected a value in [0, 1])")]
    InvalidThreshold { name: &'static str, value: f32 },
    /// Model output length does not match `(4 + num_classes) * num_boxes`.
    #[error(
        "tensor shape mismatch: expected {expected} values ({channels} channels x {boxes} boxes), got {got}"
    )]
    TensorShapeMismatch {
        expected: usize,
        got: usize,
        channels: usize,
        boxes: usize,
    },
    /// Image decoding failed (`image-io` feature).
    #[error("image io error: {reason}")]
    ImageIo { reason: String },
    /// The model failed to run; the source error is kept as-is.
    #[error("model inference failed")]
    Model(#[source] BoxError),
}

impl CascadeError {
    pub(crate) fn model<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CascadeError::Model(Box::new(err))
    }
}
