//! Axis-aligned boxes and detections.
//!
//! A `BoundingBox` is a plain value in pixel units. It does not record which
//! coordinate space it belongs to; the decoder only ever hands out boxes in
//! full-image space (crop offsets are consumed internally), so every box that
//! leaves this crate is in the coordinate space of the image passed to the
//! pipeline.
//!
//! Ordering (`left <= right`, `top <= bottom`) is not enforced. Inverted boxes
//! report zero width, height and area, so they never overlap anything.

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    /// Left edge (x of the top-left corner).
    pub left: f32,
    /// Top edge (y of the top-left corner).
    pub top: f32,
    /// Right edge.
    pub right: f32,
    /// Bottom edge.
    pub bottom: f32,
}

impl BoundingBox {
    /// Creates a box from its four edges.
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Creates a box from a YOLO-style center and size.
    pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self::new(
            cx - width / 2.0,
            cy - height / 2.0,
            cx + width / 2.0,
            cy + height / 2.0,
        )
    }

    /// Box covering a whole `width` x `height` image.
    pub fn full_image(width: usize, height: usize) -> Self {
        Self::new(0.0, 0.0, width as f32, height as f32)
    }

    /// Horizontal extent, zero for inverted boxes.
    pub fn width(&self) -> f32 {
        (self.right - self.left).max(0.0)
    }

    /// Vertical extent, zero for inverted boxes.
    pub fn height(&self) -> f32 {
        (self.bottom - self.top).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Midpoint of the box.
    pub fn center(&self) -> (f32, f32) {
        (
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    /// Returns true when `(x, y)` lies inside the box.
    ///
    /// The left/top edges are inclusive and the right/bottom edges exclusive,
    /// so an empty box contains no points.
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        self.left < self.right
            && self.top < self.bottom
            && x >= self.left
            && x < self.right
            && y >= self.top
            && y < self.bottom
    }

    /// Smallest box enclosing both `self` and `other`.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
        )
    }

    /// Overlapping area of the two boxes, zero when disjoint.
    pub fn intersection_area(&self, other: &BoundingBox) -> f32 {
        let w = (self.right.min(other.right) - self.left.max(other.left)).max(0.0);
        let h = (self.bottom.min(other.bottom) - self.top.max(other.top)).max(0.0);
        w * h
    }

    /// Intersection over union.
    ///
    /// Returns 0.0 when the union is empty (both boxes degenerate) or the
    /// result is not finite.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let inter = self.intersection_area(other);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            return 0.0;
        }
        let iou = inter / union;
        if iou.is_finite() {
            iou
        } else {
            0.0
        }
    }

    /// Scales x and y coordinates independently.
    pub fn scaled(&self, sx: f32, sy: f32) -> BoundingBox {
        BoundingBox::new(
            self.left * sx,
            self.top * sy,
            self.right * sx,
            self.bottom * sy,
        )
    }

    /// Translates the box by `(dx, dy)`.
    pub fn translated(&self, dx: f32, dy: f32) -> BoundingBox {
        BoundingBox::new(
            self.left + dx,
            self.top + dy,
            self.right + dx,
            self.bottom + dy,
        )
    }
}

/// Known classes of the two-class container/object model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Label {
    /// Candidate object (class 0).
    Pill,
    /// Container region (class 1).
    Plate,
}

impl Label {
    /// Maps a model class id to a label.
    pub fn from_class_id(class_id: u32) -> Option<Label> {
        match class_id {
            0 => Some(Label::Pill),
            1 => Some(Label::Plate),
            _ => None,
        }
    }

    pub fn class_id(self) -> u32 {
        match self {
            Label::Pill => 0,
            Label::Plate => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Pill => "pill",
            Label::Plate => "plate",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single decoded detection.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Detection {
    /// Argmax class channel.
    pub class_id: u32,
    /// Maximum class score, in `(0, 1]` for calibrated models.
    pub confidence: f32,
    /// Box in full-image pixel coordinates.
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(class_id: u32, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            class_id,
            confidence,
            bbox,
        }
    }

    /// Label for `class_id`, if it is one of the known classes.
    pub fn label(&self) -> Option<Label> {
        Label::from_class_id(self.class_id)
    }
}

#[cfg(test)]
mod tests {
    use super::{BoundingBox, Label};

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = BoundingBox::new(10.0, 10.0, 50.0, 30.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(20.0, 20.0, 30.0, 30.0);
        assert_eq!(a.iou(&b), 0.0);
        let touching = BoundingBox::new(10.0, 0.0, 20.0, 10.0);
        assert_eq!(a.iou(&touching), 0.0);
    }

    #[test]
    fn iou_of_degenerate_boxes_is_zero() {
        let p = BoundingBox::new(5.0, 5.0, 5.0, 5.0);
        assert_eq!(p.iou(&p), 0.0);
        let inverted = BoundingBox::new(10.0, 10.0, 0.0, 0.0);
        assert_eq!(inverted.area(), 0.0);
        assert_eq!(inverted.iou(&BoundingBox::new(0.0, 0.0, 10.0, 10.0)), 0.0);
    }

    #[test]
    fn iou_half_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 0.0, 15.0, 10.0);
        // 50 / (100 + 100 - 50)
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn union_returns_new_enclosing_box() {
        let a = BoundingBox::new(0.0, 5.0, 10.0, 10.0);
        let b = BoundingBox::new(-2.0, 7.0, 4.0, 20.0);
        let u = a.union(&b);
        assert_eq!(u, BoundingBox::new(-2.0, 5.0, 10.0, 20.0));
        assert_eq!(a, BoundingBox::new(0.0, 5.0, 10.0, 10.0));
    }

    #[test]
    fn contains_point_is_half_open() {
        let b = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(b.contains_point(0.0, 0.0));
        assert!(b.contains_point(9.9, 9.9));
        assert!(!b.contains_point(10.0, 5.0));
        assert!(!b.contains_point(5.0, 10.0));
        assert!(!BoundingBox::new(3.0, 3.0, 3.0, 8.0).contains_point(3.0, 4.0));
    }

    #[test]
    fn from_center_matches_edges() {
        let b = BoundingBox::from_center(0.5, 0.5, 0.2, 0.4);
        assert!((b.left - 0.4).abs() < 1e-6);
        assert!((b.top - 0.3).abs() < 1e-6);
        assert!((b.right - 0.6).abs() < 1e-6);
        assert!((b.bottom - 0.7).abs() < 1e-6);
    }

    #[test]
    fn label_round_trips_class_ids() {
        assert_eq!(Label::from_class_id(0), Some(Label::Pill));
        assert_eq!(Label::from_class_id(1), Some(Label::Plate));
        assert_eq!(Label::from_class_id(7), None);
        assert_eq!(Label::Plate.class_id(), 1);
        assert_eq!(Label::Pill.to_string(), "pill");
    }
}
