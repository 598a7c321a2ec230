//! The opaque model boundary and the detector built around it.
//!
//! A [`Model`] maps a normalized input tensor to a flat channel-major output
//! of `(4 + num_classes) * num_boxes` floats. Loading weights, choosing an
//! inference runtime and thread-safety of shared sessions are the
//! implementor's concern. The library never retries a failed inference.

use crate::config::DetectorConfig;
use crate::decode::{DecodeTarget, OutputDecoder};
use crate::geometry::Detection;
use crate::image::RgbView;
use crate::preprocess::Preprocessor;
use crate::tensor::InputTensor;
use crate::trace::trace_event;
use crate::util::{CascadeError, CascadeResult};

/// Inference backend producing YOLOv8-style detection output.
pub trait Model {
    /// Error reported by the backend; surfaced as [`CascadeError::Model`].
    type Error: std::error::Error + Send + Sync + 'static;

    /// Runs one forward pass.
    fn infer(&self, input: &InputTensor) -> Result<Vec<f32>, Self::Error>;
}

impl<M: Model + ?Sized> Model for &M {
    type Error = M::Error;

    fn infer(&self, input: &InputTensor) -> Result<Vec<f32>, Self::Error> {
        (**self).infer(input)
    }
}

impl<M: Model + ?Sized> Model for Box<M> {
    type Error = M::Error;

    fn infer(&self, input: &InputTensor) -> Result<Vec<f32>, Self::Error> {
        (**self).infer(input)
    }
}

impl<M: Model + ?Sized> Model for std::sync::Arc<M> {
    type Error = M::Error;

    fn infer(&self, input: &InputTensor) -> Result<Vec<f32>, Self::Error> {
        (**self).infer(input)
    }
}

/// A model together with its preprocessing and decoding settings.
pub struct Detector<M> {
    model: M,
    preprocessor: Preprocessor,
    decoder: OutputDecoder,
    config: DetectorConfig,
}

impl<M: Model> Detector<M> {
    /// Validates `config` and wraps `model`.
    pub fn new(model: M, config: DetectorConfig) -> CascadeResult<Self> {
        config.validate()?;
        let preprocessor = Preprocessor::from_config(&config)?;
        let decoder = OutputDecoder::from_config(&config)?;
        Ok(Self {
            model,
            preprocessor,
            decoder,
            config,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn num_classes(&self) -> usize {
        self.config.num_classes
    }

    /// Runs preprocess, inference and decoding on a whole image.
    ///
    /// Returns raw (unsuppressed) detections in `image` coordinates.
    pub fn detect(&self, image: RgbView<'_>) -> CascadeResult<Vec<Detection>> {
        let target = DecodeTarget::Image {
            width: image.width(),
            height: image.height(),
        };
        self.detect_in(image, target)
    }

    /// Runs the detector on `image`, decoding into `target`.
    ///
    /// `image` must have the size reported by `target.source_size()`; for a
    /// crop target it is the cropped pixels and the returned boxes are in
    /// full-image coordinates.
    pub fn detect_in(
        &self,
        image: RgbView<'_>,
        target: DecodeTarget,
    ) -> CascadeResult<Vec<Detection>> {
        if target.source_size() != (image.width(), image.height()) {
            return Err(CascadeError::InvalidConfig(
                "decode target size does not match the image",
            ));
        }
        let input = self.preprocessor.preprocess(image)?;
        let raw = self.model.infer(&input).map_err(CascadeError::model)?;
        trace_event!("inferred", values = raw.len());
        self.decoder.decode_raw(&raw, target)
    }
}

#[cfg(test)]
mod tests {
    use super::{Detector, Model};
    use crate::config::DetectorConfig;
    use crate::image::RgbView;
    use crate::tensor::InputTensor;
    use crate::util::CascadeError;
    use std::error::Error;

    #[derive(Debug, thiserror::Error)]
    #[error("backend exploded")]
    struct Boom;

    struct Failing;

    impl Model for Failing {
        type Error = Boom;

        fn infer(&self, _input: &InputTensor) -> Result<Vec<f32>, Boom> {
            Err(Boom)
        }
    }

    struct Fixed(Vec<f32>);

    impl Model for Fixed {
        type Error = Boom;

        fn infer(&self, input: &InputTensor) -> Result<Vec<f32>, Boom> {
            assert_eq!(input.data().len(), 4 * 4 * 3);
            Ok(self.0.clone())
        }
    }

    fn small_config(num_classes: usize, num_boxes: usize) -> DetectorConfig {
        DetectorConfig {
            input_width: 4,
            input_height: 4,
            num_classes,
            num_boxes,
            ..DetectorConfig::default()
        }
    }

    #[test]
    fn model_errors_are_propagated_unchanged() {
        let detector = Detector::new(Failing, small_config(1, 1)).unwrap();
        let pixels = [0u8; 2 * 2 * 3];
        let image = RgbView::from_slice(&pixels, 2, 2).unwrap();
        let err = detector.detect(image).unwrap_err();
        assert!(matches!(err, CascadeError::Model(_)));
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "backend exploded");
        assert!(source.downcast_ref::<Boom>().is_some());
    }

    #[test]
    fn class_count_mismatch_fails_fast() {
        // Model actually returns 2 classes for 3 boxes; config says 1 class.
        let detector = Detector::new(Fixed(vec![0.0; 6 * 3]), small_config(1, 3)).unwrap();
        let pixels = [0u8; 3];
        let image = RgbView::from_slice(&pixels, 1, 1).unwrap();
        let err = detector.detect(image).unwrap_err();
        assert!(matches!(err, CascadeError::TensorShapeMismatch { .. }));
    }

    #[test]
    fn detect_uses_image_size_as_target() {
        let raw = vec![0.5, 0.5, 0.5, 0.5, 0.9];
        let detector = Detector::new(Fixed(raw), small_config(1, 1)).unwrap();
        let pixels = [10u8; 8 * 2 * 3];
        let image = RgbView::from_slice(&pixels, 8, 2).unwrap();
        let dets = detector.detect(image).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].bbox.left, 2.0);
        assert_eq!(dets[0].bbox.bottom, 1.5);
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let cfg = DetectorConfig {
            confidence_threshold: 1.2,
            ..small_config(1, 1)
        };
        assert!(Detector::new(Failing, cfg).is_err());
    }
}
