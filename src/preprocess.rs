//! Conversion of RGB images into normalized model input tensors.
//!
//! The source is resized to the model resolution with independent horizontal
//! and vertical scales (no letterboxing), then every channel value `v` is
//! normalized as `(v - 127.5) / 127.5`, mapping `[0, 255]` to `[-1, 1]`.
//! The output is row-major with RGB interleaved per pixel.

use crate::config::{DetectorConfig, ReducedScaling};
use crate::image::resize::resize_bilinear;
use crate::image::RgbView;
use crate::tensor::{InputTensor, NumericEncoding, TensorData};
use crate::trace::{trace_event, trace_span};
use crate::util::{CascadeError, CascadeResult};

/// Per-channel mean subtracted during normalization.
pub const IMAGE_MEAN: f32 = 127.5;
/// Per-channel standard deviation divided out during normalization.
pub const IMAGE_STD: f32 = 127.5;

/// Builds model input tensors at a fixed resolution.
#[derive(Clone, Copy, Debug)]
pub struct Preprocessor {
    width: usize,
    height: usize,
    encoding: NumericEncoding,
    reduced_scaling: ReducedScaling,
}

impl Preprocessor {
    /// Creates a preprocessor for a `width` x `height` model input.
    pub fn new(width: usize, height: usize, encoding: NumericEncoding) -> CascadeResult<Self> {
        if width == 0 || height == 0 {
            return Err(CascadeError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            encoding,
            reduced_scaling: ReducedScaling::default(),
        })
    }

    /// Creates a preprocessor from the input section of a detector config.
    pub fn from_config(cfg: &DetectorConfig) -> CascadeResult<Self> {
        Ok(Self::new(cfg.input_width, cfg.input_height, cfg.encoding)?
            .with_reduced_scaling(cfg.reduced_scaling))
    }

    /// Overrides the scaling used by the reduced-precision encoding.
    pub fn with_reduced_scaling(mut self, scaling: ReducedScaling) -> Self {
        self.reduced_scaling = scaling;
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn encoding(&self) -> NumericEncoding {
        self.encoding
    }

    /// Resizes and normalizes `image` into a model input tensor.
    pub fn preprocess(&self, image: RgbView<'_>) -> CascadeResult<InputTensor> {
        let _span = trace_span!(
            "preprocess",
            src_width = image.width(),
            src_height = image.height()
        )
        .entered();

        let resized = resize_bilinear(image, self.width, self.height)?;
        let pixels = resized.data();
        let data = match self.encoding {
            NumericEncoding::FullPrecision => TensorData::F32(normalize_f32(pixels)),
            NumericEncoding::ReducedPrecision => {
                TensorData::I16(normalize_i16(pixels, self.reduced_scaling))
            }
        };

        trace_event!("preprocess_done", values = data.len());
        Ok(InputTensor::new(self.width, self.height, data))
    }
}

/// Scalar float normalization.
#[cfg_attr(feature = "simd", allow(dead_code))]
pub(crate) fn normalize_f32_scalar(pixels: &[u8]) -> Vec<f32> {
    pixels
        .iter()
        .map(|&v| (v as f32 - IMAGE_MEAN) / IMAGE_STD)
        .collect()
}

#[cfg(not(feature = "simd"))]
fn normalize_f32(pixels: &[u8]) -> Vec<f32> {
    normalize_f32_scalar(pixels)
}

/// Float normalization 8 lanes at a time.
///
/// Uses the same subtract-then-divide sequence as the scalar path, so the
/// results are bit-identical.
#[cfg(feature = "simd")]
fn normalize_f32(pixels: &[u8]) -> Vec<f32> {
    use wide::f32x8;

    const LANES: usize = 8;
    let mean = f32x8::splat(IMAGE_MEAN);
    let std = f32x8::splat(IMAGE_STD);
    let mut out = Vec::with_capacity(pixels.len());

    let chunks = pixels.chunks_exact(LANES);
    let tail = chunks.remainder();
    for chunk in chunks {
        let v = f32x8::from([
            chunk[0] as f32,
            chunk[1] as f32,
            chunk[2] as f32,
            chunk[3] as f32,
            chunk[4] as f32,
            chunk[5] as f32,
            chunk[6] as f32,
            chunk[7] as f32,
        ]);
        out.extend_from_slice(&((v - mean) / std).to_array());
    }
    out.extend(tail.iter().map(|&v| (v as f32 - IMAGE_MEAN) / IMAGE_STD));
    out
}

fn normalize_i16(pixels: &[u8], scaling: ReducedScaling) -> Vec<i16> {
    match scaling {
        ReducedScaling::CenterOnly => pixels
            .iter()
            .map(|&v| (v as f32 - IMAGE_MEAN) as i16)
            .collect(),
        ReducedScaling::CenterAndScale => pixels
            .iter()
            .map(|&v| ((v as f32 - IMAGE_MEAN) / IMAGE_STD) as i16)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_f32, normalize_f32_scalar, Preprocessor};
    use crate::config::ReducedScaling;
    use crate::image::RgbView;
    use crate::tensor::NumericEncoding;

    #[test]
    fn full_precision_maps_to_unit_range() {
        let data = [0u8, 255, 128, 0, 255, 128];
        let view = RgbView::from_slice(&data, 2, 1).unwrap();
        let pre = Preprocessor::new(2, 1, NumericEncoding::FullPrecision).unwrap();
        let tensor = pre.preprocess(view).unwrap();
        let values = tensor.data().as_f32().unwrap();
        assert_eq!(values.len(), 6);
        assert_eq!(values[0], -1.0);
        assert_eq!(values[1], 1.0);
        assert!((values[2] - 0.5 / 127.5).abs() < 1e-6);
    }

    #[test]
    fn output_has_model_resolution() {
        let data = vec![200u8; 33 * 17 * 3];
        let view = RgbView::from_slice(&data, 33, 17).unwrap();
        let pre = Preprocessor::new(8, 4, NumericEncoding::FullPrecision).unwrap();
        let tensor = pre.preprocess(view).unwrap();
        assert_eq!(tensor.width(), 8);
        assert_eq!(tensor.height(), 4);
        assert_eq!(tensor.data().len(), 8 * 4 * 3);
    }

    #[test]
    fn reduced_precision_skips_std_by_default() {
        let data = [0u8, 255, 200];
        let view = RgbView::from_slice(&data, 1, 1).unwrap();
        let pre = Preprocessor::new(1, 1, NumericEncoding::ReducedPrecision).unwrap();
        let tensor = pre.preprocess(view).unwrap();
        assert_eq!(tensor.data().as_i16().unwrap(), &[-127, 127, 72]);

        let scaled = pre.with_reduced_scaling(ReducedScaling::CenterAndScale);
        let tensor = scaled.preprocess(view).unwrap();
        assert_eq!(tensor.data().as_i16().unwrap(), &[-1, 1, 0]);
    }

    #[test]
    fn active_normalization_matches_scalar() {
        let pixels: Vec<u8> = (0..=255u8).chain(0..13).collect();
        assert_eq!(normalize_f32(&pixels), normalize_f32_scalar(&pixels));
    }

    #[test]
    fn rejects_zero_resolution() {
        assert!(Preprocessor::new(0, 640, NumericEncoding::FullPrecision).is_err());
    }
}
