//! Decoded, size-normalized icon bitmaps.

use image::imageops::FilterType;
use image::{ImageFormat, RgbaImage};
use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

use super::types::IconError;

/// An immutable RGBA bitmap shared between the cache and the surface.
#[derive(Clone)]
pub struct Bitmap {
    image: Arc<RgbaImage>,
}

impl Bitmap {
    pub fn from_rgba(image: RgbaImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn longest_side(&self) -> u32 {
        self.width().max(self.height())
    }

    /// Memory cost used for cache accounting (`width × height × 4`).
    pub fn byte_size(&self) -> usize {
        self.width() as usize * self.height() as usize * 4
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Encodes the bitmap as PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>, IconError> {
        let mut cursor = Cursor::new(Vec::new());
        self.image
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| IconError::Encode(e.to_string()))?;
        Ok(cursor.into_inner())
    }
}

impl PartialEq for Bitmap {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
            || (self.image.dimensions() == other.image.dimensions()
                && self.image.as_raw() == other.image.as_raw())
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bitmap({}x{})", self.width(), self.height())
    }
}

/// Largest pixel dimension allowed for an icon of `size_points`.
pub fn max_pixels(size_points: u32, device_scale: f32) -> u32 {
    ((size_points as f32 * device_scale) as u32).max(1)
}

/// Decodes `bytes` and scales the result down so its longest side fits.
///
/// Images already within bounds are never scaled up. Aspect ratio is kept and
/// each side is at least one pixel.
pub fn decode_and_fit(
    bytes: &[u8],
    size_points: u32,
    device_scale: f32,
) -> Result<Bitmap, IconError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| IconError::Decode(e.to_string()))?;
    let rgba = decoded.to_rgba8();
    Ok(fit(rgba, max_pixels(size_points, device_scale)))
}

fn fit(image: RgbaImage, max_px: u32) -> Bitmap {
    let (w, h) = image.dimensions();
    let longest = w.max(h);
    if longest <= max_px || longest == 0 {
        return Bitmap::from_rgba(image);
    }

    let ratio = max_px as f64 / longest as f64;
    let new_w = ((w as f64 * ratio).round() as u32).clamp(1, max_px);
    let new_h = ((h as f64 * ratio).round() as u32).clamp(1, max_px);

    Bitmap::from_rgba(image::imageops::resize(
        &image,
        new_w,
        new_h,
        FilterType::Triangle,
    ))
}

/// Creates a PNG of a solid-colored square. Shared by tests across modules.
#[cfg(test)]
pub(crate) fn test_png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, image::Rgba([200, 30, 30, 255]));
    Bitmap::from_rgba(image)
        .encode_png()
        .expect("PNG encoding of an in-memory image")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_large_image_scaled_down() {
        let bitmap = decode_and_fit(&test_png(200, 100), 48, 1.0).unwrap();
        assert_eq!(bitmap.width(), 48);
        assert_eq!(bitmap.height(), 24);
    }

    #[test]
    fn test_small_image_not_scaled_up() {
        let bitmap = decode_and_fit(&test_png(16, 10), 48, 1.0).unwrap();
        assert_eq!(bitmap.width(), 16);
        assert_eq!(bitmap.height(), 10);
    }

    #[test]
    fn test_device_scale_applies() {
        let bitmap = decode_and_fit(&test_png(300, 300), 48, 2.0).unwrap();
        assert_eq!(bitmap.longest_side(), 96);
    }

    #[test]
    fn test_extreme_aspect_keeps_one_pixel() {
        let bitmap = decode_and_fit(&test_png(1000, 2), 10, 1.0).unwrap();
        assert_eq!(bitmap.width(), 10);
        assert_eq!(bitmap.height(), 1);
    }

    #[test]
    fn test_max_pixels_minimum_one() {
        assert_eq!(max_pixels(0, 1.0), 1);
        assert_eq!(max_pixels(48, 0.01), 1);
        assert_eq!(max_pixels(48, 2.75), 132);
    }

    #[test]
    fn test_invalid_bytes_fail() {
        let result = decode_and_fit(b"not an image", 48, 1.0);
        assert!(matches!(result, Err(IconError::Decode(_))));
    }

    #[test]
    fn test_byte_size() {
        let bitmap = decode_and_fit(&test_png(10, 20), 48, 1.0).unwrap();
        assert_eq!(bitmap.byte_size(), 10 * 20 * 4);
    }
}
