//! RGB image views, owned buffers and resizing.
//!
//! `RgbView` is a borrowed 2D view into an interleaved `R, G, B` byte buffer
//! with an explicit stride. The stride counts bytes between the starts of
//! consecutive rows, so a stride larger than `3 * width` represents padded
//! rows. ROI slices are zero-copy views into the same backing slice and keep
//! the original stride, which is how the cascade hands a crop to stage 2.

use crate::util::{CascadeError, CascadeResult};

#[cfg(feature = "image-io")]
pub mod io;
pub mod resize;

/// Bytes per pixel in an interleaved RGB buffer.
pub const RGB_CHANNELS: usize = 3;

/// Borrowed RGB image view with an explicit row stride in bytes.
#[derive(Copy, Clone, Debug)]
pub struct RgbView<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a> RgbView<'a> {
    /// Creates a contiguous view with `stride == 3 * width`.
    pub fn from_slice(data: &'a [u8], width: usize, height: usize) -> CascadeResult<Self> {
        let stride = width
            .checked_mul(RGB_CHANNELS)
            .ok_or(CascadeError::InvalidDimensions { width, height })?;
        Self::new(data, width, height, stride)
    }

    /// Creates a view with an explicit stride in bytes.
    pub fn new(data: &'a [u8], width: usize, height: usize, stride: usize) -> CascadeResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(CascadeError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in bytes between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the `[r, g, b]` triple at `(x, y)` if it is within bounds.
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        if x >= self.width {
            return None;
        }
        let row = self.row(y)?;
        let i = x * RGB_CHANNELS;
        Some([row[i], row[i + 1], row[i + 2]])
    }

    /// Returns the `3 * width` bytes of row `y`.
    pub fn row(&self, y: usize) -> Option<&'a [u8]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width * RGB_CHANNELS)?;
        self.data.get(start..end)
    }

    /// Returns a zero-copy ROI view into the same backing buffer.
    pub fn roi(&self, x: usize, y: usize, width: usize, height: usize) -> CascadeResult<RgbView<'a>> {
        if width == 0 || height == 0 {
            return Err(CascadeError::InvalidDimensions { width, height });
        }

        let out_of_bounds = CascadeError::RoiOutOfBounds {
            x,
            y,
            width,
            height,
            img_width: self.width,
            img_height: self.height,
        };
        let end_x = x.checked_add(width);
        let end_y = y.checked_add(height);
        match (end_x, end_y) {
            (Some(end_x), Some(end_y)) if end_x <= self.width && end_y <= self.height => {}
            _ => return Err(out_of_bounds),
        }

        let start = y
            .checked_mul(self.stride)
            .and_then(|v| v.checked_add(x * RGB_CHANNELS))
            .ok_or(CascadeError::InvalidDimensions {
                width: self.width,
                height: self.height,
            })?;
        let data = self
            .data
            .get(start..)
            .ok_or(CascadeError::BufferTooSmall {
                needed: start.saturating_add(1),
                got: self.data.len(),
            })?;

        RgbView::new(data, width, height, self.stride)
    }

    /// Bounds of the whole view as a box.
    pub fn bounds(&self) -> crate::BoundingBox {
        crate::BoundingBox::full_image(self.width, self.height)
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> CascadeResult<usize> {
    if width == 0 || height == 0 {
        return Err(CascadeError::InvalidDimensions { width, height });
    }
    let row_len = width
        .checked_mul(RGB_CHANNELS)
        .ok_or(CascadeError::InvalidDimensions { width, height })?;
    if stride < row_len {
        return Err(CascadeError::InvalidStride { row_len, stride });
    }
    (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(row_len))
        .ok_or(CascadeError::InvalidDimensions { width, height })
}

/// Owned contiguous RGB image buffer.
#[derive(Clone, Debug)]
pub struct OwnedRgbImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl OwnedRgbImage {
    /// Wraps a contiguous `3 * width * height` byte buffer.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> CascadeResult<Self> {
        let needed = required_len(width, height, width.saturating_mul(RGB_CHANNELS))?;
        if data.len() < needed {
            return Err(CascadeError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(CascadeError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Copies a (possibly strided) view into a contiguous buffer.
    pub fn from_view(view: RgbView<'_>) -> CascadeResult<Self> {
        let row_len = view.width() * RGB_CHANNELS;
        let mut data = Vec::with_capacity(row_len * view.height());
        for y in 0..view.height() {
            let row = view.row(y).ok_or(CascadeError::BufferTooSmall {
                needed: y * view.stride() + row_len,
                got: view.as_slice().len(),
            })?;
            data.extend_from_slice(row);
        }
        Self::new(data, view.width(), view.height())
    }

    /// Returns a borrowed view of the image.
    pub fn view(&self) -> RgbView<'_> {
        RgbView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width * RGB_CHANNELS,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the raw interleaved bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }
}
