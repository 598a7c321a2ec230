//! Decoding of raw model output into detections.
//!
//! For every candidate box the best class score is taken as the confidence.
//! Boxes whose confidence does not exceed the threshold are skipped; the rest
//! are converted from normalized `(cx, cy, w, h)` to pixel edges of the target
//! space. Because preprocessing stretches the image without letterboxing, the
//! normalized coordinates map linearly onto any target aspect ratio.
//!
//! Decoding is duplicate-prone by nature; deduplication is left to
//! [`crate::nms`].

use crate::config::{DetectorConfig, RemapRule};
use crate::crop::CropWindow;
use crate::geometry::{BoundingBox, Detection};
use crate::tensor::OutputTensor;
use crate::trace::{trace_event, trace_span};
use crate::util::math::{argmax, check_unit_interval};
use crate::util::{CascadeError, CascadeResult};

/// Coordinate space the decoded boxes are expressed in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DecodeTarget {
    /// The model saw a whole `width` x `height` image.
    Image { width: usize, height: usize },
    /// The model saw a crop of the full image. Boxes are decoded in crop
    /// space and remapped to full-image space before they are returned.
    ///
    /// `window` is the pixel block that was cut out; `region` is the float
    /// crop region it was derived from.
    Crop { window: CropWindow, region: BoundingBox },
}

impl DecodeTarget {
    /// Pixel size of the space the model input was taken from.
    pub fn source_size(&self) -> (usize, usize) {
        match self {
            DecodeTarget::Image { width, height } => (*width, *height),
            DecodeTarget::Crop { window, .. } => (window.width, window.height),
        }
    }

    /// Crop target whose region is exactly the pixel window.
    pub fn crop(window: CropWindow) -> Self {
        DecodeTarget::Crop {
            window,
            region: window.to_box(),
        }
    }
}

/// Converts raw model output into detections.
#[derive(Clone, Copy, Debug)]
pub struct OutputDecoder {
    num_classes: usize,
    num_boxes: usize,
    confidence_threshold: f32,
    max_detections: usize,
    remap: RemapRule,
}

impl OutputDecoder {
    /// Creates a decoder with the default threshold (0.3), cap (1000) and remap.
    pub fn new(num_classes: usize, num_boxes: usize) -> CascadeResult<Self> {
        Self::from_config(&DetectorConfig {
            num_classes,
            num_boxes,
            ..DetectorConfig::default()
        })
    }

    /// Creates a decoder from the output section of a detector config.
    pub fn from_config(cfg: &DetectorConfig) -> CascadeResult<Self> {
        cfg.validate()?;
        Ok(Self {
            num_classes: cfg.num_classes,
            num_boxes: cfg.num_boxes,
            confidence_threshold: cfg.confidence_threshold,
            max_detections: cfg.max_detections,
            remap: cfg.remap,
        })
    }

    /// Sets the decode threshold.
    pub fn with_confidence_threshold(mut self, threshold: f32) -> CascadeResult<Self> {
        check_unit_interval("confidence_threshold", threshold)?;
        self.confidence_threshold = threshold;
        Ok(self)
    }

    /// Sets the per-call detection cap.
    pub fn with_max_detections(mut self, max_detections: usize) -> CascadeResult<Self> {
        if max_detections == 0 {
            return Err(CascadeError::InvalidConfig(
                "max_detections must be at least 1",
            ));
        }
        self.max_detections = max_detections;
        Ok(self)
    }

    pub fn with_remap(mut self, remap: RemapRule) -> Self {
        self.remap = remap;
        self
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn num_boxes(&self) -> usize {
        self.num_boxes
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn max_detections(&self) -> usize {
        self.max_detections
    }

    /// Validates `raw` against the configured shape, then decodes it.
    pub fn decode_raw(&self, raw: &[f32], target: DecodeTarget) -> CascadeResult<Vec<Detection>> {
        let tensor = OutputTensor::new(raw, self.num_classes, self.num_boxes)?;
        self.decode(&tensor, target)
    }

    /// Decodes a tensor into detections in full-image coordinates.
    pub fn decode(
        &self,
        tensor: &OutputTensor<'_>,
        target: DecodeTarget,
    ) -> CascadeResult<Vec<Detection>> {
        if tensor.num_classes() != self.num_classes || tensor.num_boxes() != self.num_boxes {
            let channels = crate::tensor::BOX_CHANNELS + self.num_classes;
            return Err(CascadeError::TensorShapeMismatch {
                expected: channels * self.num_boxes,
                got: tensor.num_channels() * tensor.num_boxes(),
                channels,
                boxes: self.num_boxes,
            });
        }
        let (src_width, src_height) = target.source_size();
        if src_width == 0 || src_height == 0 {
            return Err(CascadeError::InvalidDimensions {
                width: src_width,
                height: src_height,
            });
        }

        let _span = trace_span!("decode", boxes = self.num_boxes).entered();

        let img_w = src_width as f32;
        let img_h = src_height as f32;
        let mut out = Vec::new();
        for box_idx in 0..tensor.num_boxes() {
            let Some((class_idx, confidence)) = argmax(tensor.class_scores(box_idx)) else {
                continue;
            };
            if !(confidence > self.confidence_threshold) {
                continue;
            }
            let Some([cx, cy, w, h]) = tensor.box_geometry(box_idx) else {
                continue;
            };

            let local = BoundingBox::new(
                (cx - w / 2.0) * img_w,
                (cy - h / 2.0) * img_h,
                (cx + w / 2.0) * img_w,
                (cy + h / 2.0) * img_h,
            );
            let bbox = match target {
                DecodeTarget::Image { .. } => local,
                DecodeTarget::Crop { window, region } => {
                    remap_to_image(local, &window, &region, self.remap)
                }
            };
            out.push(Detection::new(class_idx as u32, confidence, bbox));
            if out.len() >= self.max_detections {
                break;
            }
        }

        trace_event!("decoded", count = out.len());
        Ok(out)
    }
}

/// Maps a crop-local box to full-image coordinates.
///
/// `Translate` offsets by the window origin, the pixels actually cut out.
/// `LegacyEdgeClamp` offsets by the float origin of `region`.
pub fn remap_to_image(
    local: BoundingBox,
    window: &CropWindow,
    region: &BoundingBox,
    rule: RemapRule,
) -> BoundingBox {
    let crop_w = window.width as f32;
    let crop_h = window.height as f32;
    match rule {
        RemapRule::Translate => {
            let off_x = window.x as f32;
            let off_y = window.y as f32;
            BoundingBox::new(
                local.left.clamp(0.0, crop_w) + off_x,
                local.top.clamp(0.0, crop_h) + off_y,
                local.right.clamp(0.0, crop_w) + off_x,
                local.bottom.clamp(0.0, crop_h) + off_y,
            )
        }
        RemapRule::LegacyEdgeClamp => {
            let off_x = region.left;
            let off_y = region.top;
            BoundingBox::new(
                if local.left > 0.0 { local.left + off_x } else { 0.0 },
                if local.top > 0.0 { local.top + off_y } else { 0.0 },
                if local.right < crop_w {
                    local.right + off_x
                } else {
                    crop_w
                },
                if local.bottom < crop_h {
                    local.bottom + off_y
                } else {
                    crop_h
                },
            )
        }
    }
}
