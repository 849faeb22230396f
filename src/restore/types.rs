//! Common types for the restore module

use image::GrayImage;
use std::path::PathBuf;
use thiserror::Error;

/// Binary defect mask: 255 marks a defect pixel, 0 marks background.
pub type DefectMask = GrayImage;

/// Mask value for defect pixels
pub const MASK_ON: u8 = 255;

/// Mask value for background pixels
pub const MASK_OFF: u8 = 0;

/// Restore error types
#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("Image not found: {0}")]
    ImageNotFound(PathBuf),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Invalid kernel size {0}: must be odd and at least 3")]
    InvalidKernelSize(u32),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Mask is {mask_width}x{mask_height} but image is {image_width}x{image_height}")]
    DimensionMismatch {
        image_width: u32,
        image_height: u32,
        mask_width: u32,
        mask_height: u32,
    },

    #[error("Failed to save {path}: {reason}")]
    SaveFailed { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RestoreError>;

/// Count defect pixels in a mask
pub fn count_defect_pixels(mask: &DefectMask) -> usize {
    mask.pixels().filter(|p| p.0[0] > 0).count()
}

/// Check that a mask is congruent to an image of the given size
pub fn ensure_same_size(mask: &DefectMask, image_size: (u32, u32)) -> Result<()> {
    let (mask_width, mask_height) = mask.dimensions();
    let (image_width, image_height) = image_size;
    if (mask_width, mask_height) != (image_width, image_height) {
        return Err(RestoreError::DimensionMismatch {
            image_width,
            image_height,
            mask_width,
            mask_height,
        });
    }
    Ok(())
}

/// Calculate luminance (ITU-R BT.601)
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64).round() as u8
}

/// Convert an RGB image to grayscale with BT.601 weights
pub fn to_gray(image: &image::RgbImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut gray = GrayImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels() {
        gray.put_pixel(
            x,
            y,
            image::Luma([luminance(pixel.0[0], pixel.0[1], pixel.0[2])]),
        );
    }
    gray
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    #[test]
    fn test_luminance() {
        assert_eq!(luminance(255, 255, 255), 255);
        assert_eq!(luminance(0, 0, 0), 0);

        let gray = luminance(128, 128, 128);
        assert!((gray as i32 - 128).abs() < 2);

        // Green dominates
        assert!(luminance(0, 255, 0) > luminance(255, 0, 0));
        assert!(luminance(255, 0, 0) > luminance(0, 0, 255));
    }

    #[test]
    fn test_to_gray_dimensions() {
        let rgb = RgbImage::from_pixel(17, 9, Rgb([10, 200, 30]));
        let gray = to_gray(&rgb);
        assert_eq!(gray.dimensions(), (17, 9));
        assert_eq!(gray.get_pixel(3, 3).0[0], luminance(10, 200, 30));
    }

    #[test]
    fn test_count_defect_pixels() {
        let mut mask = DefectMask::new(10, 10);
        assert_eq!(count_defect_pixels(&mask), 0);
        mask.put_pixel(1, 1, Luma([MASK_ON]));
        mask.put_pixel(2, 1, Luma([MASK_ON]));
        assert_eq!(count_defect_pixels(&mask), 2);
    }

    #[test]
    fn test_ensure_same_size() {
        let mask = DefectMask::new(10, 20);
        assert!(ensure_same_size(&mask, (10, 20)).is_ok());
        assert!(matches!(
            ensure_same_size(&mask, (20, 10)),
            Err(RestoreError::DimensionMismatch { .. })
        ));
    }
}
