//! Detector and cascade configuration.
//!
//! Several historical behaviors of the two-stage pill/plate pipeline look
//! unintentional. Each one is exposed as an explicit switch here instead of
//! being silently kept or silently changed; the `Legacy*` variants reproduce
//! the historical arithmetic exactly.

use crate::geometry::Label;
use crate::tensor::NumericEncoding;
use crate::util::math::check_unit_interval;
use crate::util::{CascadeError, CascadeResult};

/// Scaling applied to reduced-precision inputs before truncation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ReducedScaling {
    /// `(v - 127.5)` truncated to `i16`, giving values in `[-127, 127]`.
    ///
    /// This is the historical reduced-precision path. It skips the division
    /// by std, so it is not a lower-precision copy of the float encoding.
    #[default]
    CenterOnly,
    /// `(v - 127.5) / 127.5` truncated to `i16`, giving values in `{-1, 0, 1}`.
    CenterAndScale,
}

/// How stage-2 boxes decoded in crop space are mapped back to the image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RemapRule {
    /// Clamp each edge to the crop, then translate by the crop origin.
    #[default]
    Translate,
    /// Historical per-edge remap: left/top get the offset only when `> 0`
    /// (else 0); right/bottom get the offset only when below the crop size
    /// (else the crop size, in crop-local units). The offset is the float
    /// origin of the crop region, not the truncated pixel window.
    LegacyEdgeClamp,
}

/// Point used to test whether an object lies inside a container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CenterRule {
    /// `((left + right) / 2, (top + bottom) / 2)`.
    #[default]
    Midpoint,
    /// Historical `(right + left / 2, top + bottom / 2)`.
    Legacy,
}

/// How the crop window is shrunk to fit the source image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CropClamp {
    /// Width is clamped against image width, height against image height.
    #[default]
    Bounds,
    /// Historical clamp comparing the crop bottom against the image *width*.
    ///
    /// On images wider than they are tall the crop can still overflow; the
    /// pipeline then fails with `RoiOutOfBounds` instead of reading garbage.
    LegacyWidthForHeight,
}

/// Configuration for one detector (a model plus its pre/post-processing).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DetectorConfig {
    /// Model input width in pixels.
    pub input_width: usize,
    /// Model input height in pixels.
    pub input_height: usize,
    /// Number of class channels in the model output.
    pub num_classes: usize,
    /// Number of candidate boxes in the model output.
    pub num_boxes: usize,
    /// Decode threshold: a box is kept only if its best score exceeds this.
    pub confidence_threshold: f32,
    /// Upper bound on detections emitted by one decode call.
    pub max_detections: usize,
    /// Numeric encoding of the model input.
    pub encoding: NumericEncoding,
    /// Scaling used when `encoding` is reduced precision.
    pub reduced_scaling: ReducedScaling,
    /// Crop-to-image remap used by stage-2 decoding.
    pub remap: RemapRule,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            input_width: 640,
            input_height: 640,
            num_classes: 1,
            num_boxes: 8400,
            confidence_threshold: 0.3,
            max_detections: 1000,
            encoding: NumericEncoding::FullPrecision,
            reduced_scaling: ReducedScaling::CenterOnly,
            remap: RemapRule::Translate,
        }
    }
}

impl DetectorConfig {
    /// Default configuration with `num_classes` class channels.
    pub fn with_classes(num_classes: usize) -> Self {
        Self {
            num_classes,
            ..Self::default()
        }
    }

    /// Number of values the model must return.
    pub fn output_len(&self) -> usize {
        (crate::tensor::BOX_CHANNELS + self.num_classes).saturating_mul(self.num_boxes)
    }

    /// Checks ranges and counts; called when a detector is built.
    pub fn validate(&self) -> CascadeResult<()> {
        if self.input_width == 0 || self.input_height == 0 {
            return Err(CascadeError::InvalidDimensions {
                width: self.input_width,
                height: self.input_height,
            });
        }
        if self.num_classes == 0 {
            return Err(CascadeError::InvalidConfig("num_classes must be at least 1"));
        }
        if self.num_boxes == 0 {
            return Err(CascadeError::InvalidConfig("num_boxes must be at least 1"));
        }
        if self.max_detections == 0 {
            return Err(CascadeError::InvalidConfig(
                "max_detections must be at least 1",
            ));
        }
        check_unit_interval("confidence_threshold", self.confidence_threshold)
    }
}

/// Configuration for the two-stage cascade.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CascadeConfig {
    /// Same-class boxes overlapping at or above this IoU are suppressed.
    pub iou_threshold: f32,
    /// Detections below this confidence are dropped before suppression.
    pub confidence_threshold: f32,
    /// Stage-1 class id of container regions.
    pub container_class: u32,
    /// Stage-1 class id of candidate objects.
    pub object_class: u32,
    /// Object center used for the containment test.
    pub center_rule: CenterRule,
    /// Crop window clamping.
    pub crop_clamp: CropClamp,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            iou_threshold: 0.4,
            confidence_threshold: 0.3,
            container_class: Label::Plate.class_id(),
            object_class: Label::Pill.class_id(),
            center_rule: CenterRule::Midpoint,
            crop_clamp: CropClamp::Bounds,
        }
    }
}

impl CascadeConfig {
    /// Checks thresholds and class roles.
    pub fn validate(&self) -> CascadeResult<()> {
        check_unit_interval("iou_threshold", self.iou_threshold)?;
        check_unit_interval("confidence_threshold", self.confidence_threshold)?;
        if self.container_class == self.object_class {
            return Err(CascadeError::InvalidConfig(
                "container_class and object_class must differ",
            ));
        }
        Ok(())
    }
}
