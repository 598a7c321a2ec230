//! Non-uniform bilinear resizing for RGB views.

use crate::image::{OwnedRgbImage, RgbView, RGB_CHANNELS};
use crate::util::{CascadeError, CascadeResult};

/// Resizes `src` to exactly `dst_width` x `dst_height` using bilinear sampling.
///
/// Horizontal and vertical scales are independent, so the aspect ratio is not
/// preserved and no padding is added. Destination pixel centers map to
/// `src = (dst + 0.5) * scale - 0.5`, clamped to the valid source range.
/// Values are rounded to the nearest integer before clamping to `[0, 255]`.
pub fn resize_bilinear(
    src: RgbView<'_>,
    dst_width: usize,
    dst_height: usize,
) -> CascadeResult<OwnedRgbImage> {
    if dst_width == 0 || dst_height == 0 {
        return Err(CascadeError::InvalidDimensions {
            width: dst_width,
            height: dst_height,
        });
    }
    if src.width() == dst_width && src.height() == dst_height {
        return OwnedRgbImage::from_view(src);
    }

    let src_width = src.width();
    let src_height = src.height();
    let scale_x = src_width as f32 / dst_width as f32;
    let scale_y = src_height as f32 / dst_height as f32;
    let max_x = (src_width - 1) as f32;
    let max_y = (src_height - 1) as f32;

    // Column taps are shared by every row.
    let taps: Vec<(usize, usize, f32)> = (0..dst_width)
        .map(|x| {
            let sx = ((x as f32 + 0.5) * scale_x - 0.5).clamp(0.0, max_x);
            let x0 = sx.floor() as usize;
            let x1 = (x0 + 1).min(src_width - 1);
            (x0, x1, sx - x0 as f32)
        })
        .collect();

    let mut out = vec![0u8; dst_width * dst_height * RGB_CHANNELS];
    for y in 0..dst_height {
        let sy = ((y as f32 + 0.5) * scale_y - 0.5).clamp(0.0, max_y);
        let y0 = sy.floor() as usize;
        let y1 = (y0 + 1).min(src_height - 1);
        let fy = sy - y0 as f32;

        let row0 = src.row(y0).ok_or(CascadeError::BufferTooSmall {
            needed: y0 * src.stride() + src_width * RGB_CHANNELS,
            got: src.as_slice().len(),
        })?;
        let row1 = src.row(y1).ok_or(CascadeError::BufferTooSmall {
            needed: y1 * src.stride() + src_width * RGB_CHANNELS,
            got: src.as_slice().len(),
        })?;

        let dst_row = &mut out[y * dst_width * RGB_CHANNELS..(y + 1) * dst_width * RGB_CHANNELS];
        for (x, &(x0, x1, fx)) in taps.iter().enumerate() {
            let w00 = (1.0 - fx) * (1.0 - fy);
            let w10 = fx * (1.0 - fy);
            let w01 = (1.0 - fx) * fy;
            let w11 = fx * fy;
            for c in 0..RGB_CHANNELS {
                let a = row0[x0 * RGB_CHANNELS + c] as f32;
                let b = row0[x1 * RGB_CHANNELS + c] as f32;
                let d = row1[x0 * RGB_CHANNELS + c] as f32;
                let e = row1[x1 * RGB_CHANNELS + c] as f32;
                let value = a * w00 + b * w10 + d * w01 + e * w11;
                dst_row[x * RGB_CHANNELS + c] = value.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    OwnedRgbImage::new(out, dst_width, dst_height)
}

#[cfg(test)]
mod tests {
    use super::resize_bilinear;
    use crate::image::RgbView;

    #[test]
    fn constant_image_stays_constant() {
        let data = vec![90u8; 7 * 5 * 3];
        let view = RgbView::from_slice(&data, 7, 5).unwrap();
        let out = resize_bilinear(view, 16, 3).unwrap();
        assert_eq!(out.width(), 16);
        assert_eq!(out.height(), 3);
        assert!(out.data().iter().all(|&v| v == 90));
    }

    #[test]
    fn same_size_is_a_copy() {
        let data: Vec<u8> = (0..2 * 2 * 3).map(|v| v as u8 * 10).collect();
        let view = RgbView::from_slice(&data, 2, 2).unwrap();
        let out = resize_bilinear(view, 2, 2).unwrap();
        assert_eq!(out.data(), data.as_slice());
    }

    #[test]
    fn upscale_interpolates_between_columns() {
        // Two pixels: black then white, stretched to four columns.
        let data = [0u8, 0, 0, 255, 255, 255];
        let view = RgbView::from_slice(&data, 2, 1).unwrap();
        let out = resize_bilinear(view, 4, 1).unwrap();
        let reds: Vec<u8> = (0..4).map(|x| out.view().pixel(x, 0).unwrap()[0]).collect();
        assert_eq!(reds[0], 0);
        assert_eq!(reds[3], 255);
        assert!(reds[1] > 0 && reds[1] < reds[2] && reds[2] < 255);
    }

    #[test]
    fn rejects_zero_target() {
        let data = [0u8; 3];
        let view = RgbView::from_slice(&data, 1, 1).unwrap();
        assert!(resize_bilinear(view, 0, 4).is_err());
    }
}
