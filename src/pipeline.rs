//! The two-stage plate/pill cascade.
//!
//! One run is strictly sequential:
//!
//! 1. Stage 1 detects containers and objects on the full image. A single-class
//!    stage-1 model cannot tell them apart, so stage 1 is skipped and the crop
//!    region is the full image.
//! 2. The crop region is the union of occupied containers, or the full image.
//! 3. The region is turned into an integer pixel window inside the image.
//! 4. Stage 2 runs on the window; its boxes are remapped to full-image space
//!    by the decoder.
//!
//! Empty results at any stage are not errors. Independent images can be
//! processed concurrently with [`CascadePipeline::run_batch`].

use crate::config::CascadeConfig;
use crate::crop::{derive_crop_region, CropWindow};
use crate::decode::DecodeTarget;
use crate::geometry::{BoundingBox, Detection};
use crate::image::RgbView;
use crate::model::{Detector, Model};
use crate::nms::NonMaxSuppressor;
use crate::trace::{trace_event, trace_span};
use crate::util::{CascadeError, CascadeResult};

/// Result of one cascade run.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CascadeOutput {
    /// Suppressed stage-2 detections in full-image coordinates.
    pub detections: Vec<Detection>,
    /// Region stage 2 was asked to look at.
    pub crop_region: BoundingBox,
    /// Pixel window actually cut out for stage 2.
    pub crop_window: CropWindow,
    /// Suppressed stage-1 detections (empty when stage 1 was skipped).
    pub stage1: Vec<Detection>,
}

/// Boxes mapped onto a display of a given width.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayBoxes {
    pub width: usize,
    pub height: usize,
    pub detections: Vec<Detection>,
    pub crop_region: BoundingBox,
}

impl CascadeOutput {
    /// Maps the final boxes and crop region onto an aspect-preserving display.
    ///
    /// The display height is `target_width * image_height / image_width`,
    /// truncated. Only coordinates are mapped; nothing is drawn.
    pub fn scaled_to_width(
        &self,
        image_width: usize,
        image_height: usize,
        target_width: usize,
    ) -> CascadeResult<DisplayBoxes> {
        if image_width == 0 || image_height == 0 {
            return Err(CascadeError::InvalidDimensions {
                width: image_width,
                height: image_height,
            });
        }
        if target_width == 0 {
            return Err(CascadeError::InvalidConfig(
                "display target_width must be at least 1",
            ));
        }
        let aspect = image_height as f32 / image_width as f32;
        let height = ((target_width as f32 * aspect) as usize).max(1);
        let sx = target_width as f32 / image_width as f32;
        let sy = height as f32 / image_height as f32;
        Ok(DisplayBoxes {
            width: target_width,
            height,
            detections: self
                .detections
                .iter()
                .map(|det| Detection::new(det.class_id, det.confidence, det.bbox.scaled(sx, sy)))
                .collect(),
            crop_region: self.crop_region.scaled(sx, sy),
        })
    }
}

/// Runs one cascade over `image` with the given detectors and thresholds.
///
/// `config` is validated on every call, as in [`CascadePipeline::new`].
pub fn run_cascade<S1: Model, S2: Model>(
    image: RgbView<'_>,
    stage1: &Detector<S1>,
    stage2: &Detector<S2>,
    config: &CascadeConfig,
) -> CascadeResult<CascadeOutput> {
    let nms = checked_suppressor(config, stage1.num_classes())?;
    cascade_with(image, stage1, stage2, config, &nms)
}

/// Validates `config` against a stage-1 model with `stage1_classes` classes.
fn checked_suppressor(
    config: &CascadeConfig,
    stage1_classes: usize,
) -> CascadeResult<NonMaxSuppressor> {
    config.validate()?;
    if stage1_classes >= 2
        && (config.container_class as usize >= stage1_classes
            || config.object_class as usize >= stage1_classes)
    {
        return Err(CascadeError::InvalidConfig(
            "container_class and object_class must be stage-1 class ids",
        ));
    }
    NonMaxSuppressor::from_config(config)
}

fn cascade_with<S1: Model, S2: Model>(
    image: RgbView<'_>,
    stage1: &Detector<S1>,
    stage2: &Detector<S2>,
    config: &CascadeConfig,
    nms: &NonMaxSuppressor,
) -> CascadeResult<CascadeOutput> {
    let img_width = image.width();
    let img_height = image.height();
    let _span = trace_span!("cascade_run", width = img_width, height = img_height).entered();

    let (stage1_dets, crop_region) = if stage1.num_classes() < 2 {
        trace_event!("stage1_skipped", classes = stage1.num_classes());
        (Vec::new(), image.bounds())
    } else {
        let _stage = trace_span!("stage1").entered();
        let raw = stage1.detect(image)?;
        let kept = nms.apply(&raw);
        trace_event!("stage1_done", raw = raw.len(), kept = kept.len());
        let region = derive_crop_region(&kept, img_width, img_height, config);
        (kept, region)
    };

    let window = CropWindow::from_region(&crop_region, img_width, img_height, config.crop_clamp)?;
    trace_event!(
        "crop_window",
        x = window.x,
        y = window.y,
        width = window.width,
        height = window.height
    );
    let crop = image.roi(window.x, window.y, window.width, window.height)?;

    let detections = {
        let _stage = trace_span!("stage2").entered();
        let target = DecodeTarget::Crop {
            window,
            region: crop_region,
        };
        let raw = stage2.detect_in(crop, target)?;
        let kept = nms.apply(&raw);
        trace_event!("stage2_done", raw = raw.len(), kept = kept.len());
        kept
    };

    Ok(CascadeOutput {
        detections,
        crop_region,
        crop_window: window,
        stage1: stage1_dets,
    })
}

/// Stage-1 and stage-2 detectors with validated cascade settings.
pub struct CascadePipeline<S1, S2> {
    stage1: Detector<S1>,
    stage2: Detector<S2>,
    nms: NonMaxSuppressor,
    config: CascadeConfig,
}

impl<S1: Model, S2: Model> CascadePipeline<S1, S2> {
    /// Builds a pipeline, failing fast on invalid thresholds or class roles.
    pub fn new(
        stage1: Detector<S1>,
        stage2: Detector<S2>,
        config: CascadeConfig,
    ) -> CascadeResult<Self> {
        let nms = checked_suppressor(&config, stage1.num_classes())?;
        Ok(Self {
            stage1,
            stage2,
            nms,
            config,
        })
    }

    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    pub fn stage1(&self) -> &Detector<S1> {
        &self.stage1
    }

    pub fn stage2(&self) -> &Detector<S2> {
        &self.stage2
    }

    /// Runs the cascade on one image.
    pub fn run(&self, image: RgbView<'_>) -> CascadeResult<CascadeOutput> {
        cascade_with(image, &self.stage1, &self.stage2, &self.config, &self.nms)
    }

    /// Runs the cascade on each image in order, one after another.
    pub fn run_batch_sequential(
        &self,
        images: &[RgbView<'_>],
    ) -> Vec<CascadeResult<CascadeOutput>> {
        images.iter().map(|image| self.run(*image)).collect()
    }
}

#[cfg(not(feature = "rayon"))]
impl<S1: Model, S2: Model> CascadePipeline<S1, S2> {
    /// Runs the cascade on each image; results keep the input order.
    pub fn run_batch(&self, images: &[RgbView<'_>]) -> Vec<CascadeResult<CascadeOutput>> {
        self.run_batch_sequential(images)
    }
}

#[cfg(feature = "rayon")]
impl<S1: Model + Sync, S2: Model + Sync> CascadePipeline<S1, S2> {
    /// Runs the cascade on each image in parallel; results keep the input order.
    pub fn run_batch(&self, images: &[RgbView<'_>]) -> Vec<CascadeResult<CascadeOutput>> {
        use rayon::prelude::*;

        images.par_iter().map(|image| self.run(*image)).collect()
    }
}
