//! Crop-region derivation from stage-1 detections.
//!
//! A container (plate) is *occupied* when the center of at least one object
//! (pill) falls inside its box. The crop region is the union of all occupied
//! container boxes, or the full image when no container is occupied.

use crate::config::{CascadeConfig, CenterRule, CropClamp};
use crate::geometry::{BoundingBox, Detection};
use crate::trace::{trace_debug, trace_event};
use crate::util::math::trunc_to_usize;
use crate::util::{CascadeError, CascadeResult};

/// Integer pixel window cut out of the source image for stage 2.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CropWindow {
    /// Left column of the window in the source image.
    pub x: usize,
    /// Top row of the window in the source image.
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl CropWindow {
    /// Window covering a whole `width` x `height` image.
    pub fn full(width: usize, height: usize) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Converts a crop region to a pixel window inside a `img_width` x `img_height` image.
    ///
    /// The origin is the region's top-left corner truncated toward zero and
    /// pulled inside the image; the size is the region's extent truncated to
    /// at least one pixel and then shrunk so the window ends inside the image.
    pub fn from_region(
        region: &BoundingBox,
        img_width: usize,
        img_height: usize,
        clamp: CropClamp,
    ) -> CascadeResult<Self> {
        if img_width == 0 || img_height == 0 {
            return Err(CascadeError::InvalidDimensions {
                width: img_width,
                height: img_height,
            });
        }

        let x = trunc_to_usize(region.left).min(img_width - 1);
        let y = trunc_to_usize(region.top).min(img_height - 1);
        // Oversized or infinite regions saturate here; `min` keeps the sums in range.
        let width = trunc_to_usize(region.width()).max(1).min(img_width - x);
        let height = trunc_to_usize(region.height()).max(1);
        let height = match clamp {
            CropClamp::Bounds => height.min(img_height - y),
            CropClamp::LegacyWidthForHeight => height.min(img_width.saturating_sub(y)),
        };

        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// The window as a floating-point box.
    pub fn to_box(&self) -> BoundingBox {
        BoundingBox::new(
            self.x as f32,
            self.y as f32,
            (self.x + self.width) as f32,
            (self.y + self.height) as f32,
        )
    }
}

/// Point of `bbox` tested against container boxes.
pub fn object_center(bbox: &BoundingBox, rule: CenterRule) -> (f32, f32) {
    match rule {
        CenterRule::Midpoint => bbox.center(),
        CenterRule::Legacy => (bbox.right + bbox.left / 2.0, bbox.top + bbox.bottom / 2.0),
    }
}

/// Union of every container box that holds at least one object center.
///
/// Containers are visited in input order; the first occupied one seeds the
/// accumulator. Returns `None` when no container is occupied.
pub fn occupied_container_union(
    detections: &[Detection],
    container_class: u32,
    object_class: u32,
    rule: CenterRule,
) -> Option<BoundingBox> {
    let centers: Vec<(f32, f32)> = detections
        .iter()
        .filter(|det| det.class_id == object_class)
        .map(|det| object_center(&det.bbox, rule))
        .collect();

    let mut region: Option<BoundingBox> = None;
    let mut occupied = 0usize;
    for container in detections
        .iter()
        .filter(|det| det.class_id == container_class)
    {
        let bbox = &container.bbox;
        if !centers.iter().any(|&(cx, cy)| bbox.contains_point(cx, cy)) {
            continue;
        }
        occupied += 1;
        trace_debug!(
            "occupied_container",
            left = bbox.left,
            top = bbox.top,
            right = bbox.right,
            bottom = bbox.bottom
        );
        region = Some(match region {
            Some(acc) => acc.union(bbox),
            None => *bbox,
        });
    }

    trace_event!("crop_region", occupied = occupied, objects = centers.len());
    region
}

/// Crop region for stage 2, defaulting to the full image.
pub fn derive_crop_region(
    detections: &[Detection],
    img_width: usize,
    img_height: usize,
    cfg: &CascadeConfig,
) -> BoundingBox {
    occupied_container_union(
        detections,
        cfg.container_class,
        cfg.object_class,
        cfg.center_rule,
    )
    .unwrap_or_else(|| BoundingBox::full_image(img_width, img_height))
}
