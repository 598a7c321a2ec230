//! Convenience helpers for loading images via the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::image::{OwnedRgbImage, RgbView};
use crate::util::{CascadeError, CascadeResult};
use std::path::Path;

/// Creates a borrowed view from an RGB image buffer.
pub fn view_from_rgb_image(img: &image::RgbImage) -> CascadeResult<RgbView<'_>> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    RgbView::from_slice(img.as_raw(), width, height)
}

/// Creates an owned RGB image from a dynamic image, dropping any alpha.
pub fn owned_from_dynamic_image(img: &image::DynamicImage) -> CascadeResult<OwnedRgbImage> {
    let rgb = img.to_rgb8();
    let width = rgb.width() as usize;
    let height = rgb.height() as usize;
    OwnedRgbImage::new(rgb.into_raw(), width, height)
}

/// Loads an image from disk and converts it to an owned RGB image.
pub fn load_rgb_image<P: AsRef<Path>>(path: P) -> CascadeResult<OwnedRgbImage> {
    let img = image::open(path).map_err(|err| CascadeError::ImageIo {
        reason: err.to_string(),
    })?;
    owned_from_dynamic_image(&img)
}
