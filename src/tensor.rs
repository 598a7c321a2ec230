//! Model input and output tensors.
//!
//! The input tensor is a flat `height * width * 3` buffer, row-major with RGB
//! interleaved per pixel. The output tensor is the channel-major
//! `[4 + num_classes][num_boxes]` layout produced by YOLOv8-style heads:
//! channels 0..4 hold `(cx, cy, w, h)` normalized to the model input, the
//! remaining channels hold one score per class.

use crate::util::{CascadeError, CascadeResult};

/// Number of box-geometry channels preceding the class scores.
pub const BOX_CHANNELS: usize = 4;

/// Numeric encoding of the model input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum NumericEncoding {
    /// 32-bit float values.
    #[default]
    FullPrecision,
    /// 16-bit integer values (truncated toward zero).
    ReducedPrecision,
}

/// Typed storage for [`InputTensor`].
#[derive(Clone, Debug, PartialEq)]
pub enum TensorData {
    F32(Vec<f32>),
    I16(Vec<i16>),
}

impl TensorData {
    pub fn len(&self) -> usize {
        match self {
            TensorData::F32(v) => v.len(),
            TensorData::I16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn encoding(&self) -> NumericEncoding {
        match self {
            TensorData::F32(_) => NumericEncoding::FullPrecision,
            TensorData::I16(_) => NumericEncoding::ReducedPrecision,
        }
    }

    /// Float values, if this tensor is full precision.
    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            TensorData::F32(v) => Some(v),
            TensorData::I16(_) => None,
        }
    }

    /// Integer values, if this tensor is reduced precision.
    pub fn as_i16(&self) -> Option<&[i16]> {
        match self {
            TensorData::I16(v) => Some(v),
            TensorData::F32(_) => None,
        }
    }
}

/// Normalized model input of shape `(1, height, width, 3)`.
#[derive(Clone, Debug, PartialEq)]
pub struct InputTensor {
    width: usize,
    height: usize,
    data: TensorData,
}

impl InputTensor {
    pub(crate) fn new(width: usize, height: usize, data: TensorData) -> Self {
        debug_assert_eq!(data.len(), width * height * 3);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &TensorData {
        &self.data
    }

    pub fn into_data(self) -> TensorData {
        self.data
    }
}

/// Borrowed channel-major view over a raw model output.
#[derive(Copy, Clone, Debug)]
pub struct OutputTensor<'a> {
    data: &'a [f32],
    num_classes: usize,
    num_boxes: usize,
}

impl<'a> OutputTensor<'a> {
    /// Wraps `data`, checking it holds exactly `(4 + num_classes) * num_boxes` values.
    pub fn new(data: &'a [f32], num_classes: usize, num_boxes: usize) -> CascadeResult<Self> {
        if num_classes == 0 {
            return Err(CascadeError::InvalidConfig("num_classes must be at least 1"));
        }
        let channels = BOX_CHANNELS + num_classes;
        let expected = channels
            .checked_mul(num_boxes)
            .ok_or(CascadeError::InvalidConfig("output tensor size overflows"))?;
        if data.len() != expected {
            return Err(CascadeError::TensorShapeMismatch {
                expected,
                got: data.len(),
                channels,
                boxes: num_boxes,
            });
        }
        Ok(Self {
            data,
            num_classes,
            num_boxes,
        })
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn num_boxes(&self) -> usize {
        self.num_boxes
    }

    /// Total number of channels, `4 + num_classes`.
    pub fn num_channels(&self) -> usize {
        BOX_CHANNELS + self.num_classes
    }

    /// Value at `(channel, box_idx)`.
    pub fn get(&self, channel: usize, box_idx: usize) -> Option<f32> {
        if channel >= self.num_channels() || box_idx >= self.num_boxes {
            return None;
        }
        self.data.get(channel * self.num_boxes + box_idx).copied()
    }

    /// All `num_boxes` values of one channel.
    pub fn channel(&self, channel: usize) -> Option<&'a [f32]> {
        if channel >= self.num_channels() {
            return None;
        }
        let start = channel * self.num_boxes;
        self.data.get(start..start + self.num_boxes)
    }

    /// `(cx, cy, w, h)` of one box, normalized to the model input.
    pub fn box_geometry(&self, box_idx: usize) -> Option<[f32; 4]> {
        Some([
            self.get(0, box_idx)?,
            self.get(1, box_idx)?,
            self.get(2, box_idx)?,
            self.get(3, box_idx)?,
        ])
    }

    /// Iterates the class scores of one box in class order.
    pub fn class_scores(&self, box_idx: usize) -> impl Iterator<Item = f32> + 'a {
        let data = self.data;
        let num_boxes = self.num_boxes;
        let valid = box_idx < num_boxes;
        (BOX_CHANNELS..BOX_CHANNELS + self.num_classes)
            .filter(move |_| valid)
            .map(move |c| data[c * num_boxes + box_idx])
    }
}
