//! Per-class non-maximum suppression.
//!
//! Detections below the confidence threshold are dropped, the rest are grouped
//! by class and each group is swept greedily in descending confidence: a kept
//! detection suppresses every later detection of the same class whose IoU with
//! it is at least the IoU threshold. Classes never suppress each other.
//!
//! Ordering is deterministic. Equal confidences keep their input order, and
//! the output lists classes in ascending `class_id`, each in descending
//! confidence.

use crate::config::CascadeConfig;
use crate::geometry::Detection;
use crate::trace::{trace_event, trace_span};
use crate::util::math::check_unit_interval;
use crate::util::CascadeResult;
use std::collections::BTreeMap;

/// Filters `detections` by confidence and per-class overlap.
///
/// The result is a subset of the input. Runs in `O(n^2)` per class, which is
/// fine for the few hundred boxes that survive decoding.
pub fn suppress(
    detections: &[Detection],
    iou_threshold: f32,
    confidence_threshold: f32,
) -> Vec<Detection> {
    let _span = trace_span!("nms", input = detections.len()).entered();

    let mut by_class: BTreeMap<u32, Vec<Detection>> = BTreeMap::new();
    for det in detections
        .iter()
        .filter(|det| det.confidence >= confidence_threshold)
    {
        by_class.entry(det.class_id).or_default().push(*det);
    }

    let mut kept = Vec::new();
    for (_class_id, mut group) in by_class {
        // Stable sort: ties stay in input order.
        group.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        sweep_class(&group, iou_threshold, &mut kept);
    }

    trace_event!("nms_done", kept = kept.len());
    kept
}

fn sweep_class(sorted: &[Detection], iou_threshold: f32, kept: &mut Vec<Detection>) {
    let mut suppressed = vec![false; sorted.len()];
    for i in 0..sorted.len() {
        if suppressed[i] {
            continue;
        }
        let best = &sorted[i];
        kept.push(*best);
        for j in (i + 1)..sorted.len() {
            if !suppressed[j] && best.bbox.iou(&sorted[j].bbox) >= iou_threshold {
                suppressed[j] = true;
            }
        }
    }
}

/// Suppressor with validated thresholds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NonMaxSuppressor {
    iou_threshold: f32,
    confidence_threshold: f32,
}

impl NonMaxSuppressor {
    /// Creates a suppressor; both thresholds must lie in `[0, 1]`.
    pub fn new(iou_threshold: f32, confidence_threshold: f32) -> CascadeResult<Self> {
        check_unit_interval("iou_threshold", iou_threshold)?;
        check_unit_interval("confidence_threshold", confidence_threshold)?;
        Ok(Self {
            iou_threshold,
            confidence_threshold,
        })
    }

    pub fn from_config(cfg: &CascadeConfig) -> CascadeResult<Self> {
        Self::new(cfg.iou_threshold, cfg.confidence_threshold)
    }

    pub fn iou_threshold(&self) -> f32 {
        self.iou_threshold
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    /// Runs [`suppress`] with the stored thresholds.
    pub fn apply(&self, detections: &[Detection]) -> Vec<Detection> {
        suppress(detections, self.iou_threshold, self.confidence_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::{suppress, NonMaxSuppressor};
    use crate::geometry::{BoundingBox, Detection};

    fn det(class_id: u32, confidence: f32, l: f32, t: f32, r: f32, b: f32) -> Detection {
        Detection::new(class_id, confidence, BoundingBox::new(l, t, r, b))
    }

    #[test]
    fn keeps_higher_of_overlapping_pair() {
        // IoU = 80 / (100 + 100 - 80) = 0.667
        let a = det(0, 0.8, 0.0, 0.0, 10.0, 10.0);
        let b = det(0, 0.9, 2.0, 0.0, 12.0, 10.0);
        let kept = suppress(&[a, b], 0.4, 0.3);
        assert_eq!(kept, vec![b]);
    }

    #[test]
    fn classes_never_suppress_each_other() {
        let a = det(0, 0.9, 0.0, 0.0, 10.0, 10.0);
        let b = det(1, 0.8, 0.0, 0.0, 10.0, 9.0);
        assert!(a.bbox.iou(&b.bbox) >= 0.9);
        let kept = suppress(&[a, b], 0.4, 0.3);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn drops_low_confidence_inclusive_threshold() {
        let a = det(0, 0.3, 0.0, 0.0, 1.0, 1.0);
        let b = det(0, 0.29, 5.0, 5.0, 6.0, 6.0);
        let kept = suppress(&[a, b], 0.5, 0.3);
        assert_eq!(kept, vec![a]);
    }

    #[test]
    fn suppression_uses_inclusive_iou() {
        let a = det(0, 0.9, 0.0, 0.0, 10.0, 10.0);
        let b = det(0, 0.8, 0.0, 0.0, 10.0, 10.0);
        assert_eq!(suppress(&[a, b], 1.0, 0.0), vec![a]);
    }

    #[test]
    fn suppressed_box_does_not_suppress_others() {
        // b overlaps a and c; a suppresses b, so c survives.
        let a = det(0, 0.9, 0.0, 0.0, 10.0, 10.0);
        let b = det(0, 0.8, 4.0, 0.0, 14.0, 10.0);
        let c = det(0, 0.7, 8.0, 0.0, 18.0, 10.0);
        let kept = suppress(&[c, b, a], 0.4, 0.0);
        assert_eq!(kept, vec![a, c]);
    }

    #[test]
    fn ties_keep_input_order() {
        let a = det(0, 0.5, 0.0, 0.0, 10.0, 10.0);
        let b = det(0, 0.5, 1.0, 0.0, 11.0, 10.0);
        assert_eq!(suppress(&[a, b], 0.4, 0.0), vec![a]);
        assert_eq!(suppress(&[b, a], 0.4, 0.0), vec![b]);
    }

    #[test]
    fn output_orders_classes_ascending() {
        let a = det(1, 0.9, 0.0, 0.0, 1.0, 1.0);
        let b = det(0, 0.4, 5.0, 5.0, 6.0, 6.0);
        let kept = suppress(&[a, b], 0.4, 0.0);
        assert_eq!(kept, vec![b, a]);
    }

    #[test]
    fn suppressor_validates_thresholds() {
        assert!(NonMaxSuppressor::new(0.4, 0.3).is_ok());
        assert!(NonMaxSuppressor::new(-0.1, 0.3).is_err());
        assert!(NonMaxSuppressor::new(0.4, 2.0).is_err());
    }
}
