//! Median denoising
//!
//! Suppresses fine-grained sensor noise before defect detection so that grain
//! does not show up as contrast in the top-hat/black-hat response.

use image::GrayImage;
use imageproc::filter::median_filter;

use super::types::{RestoreError, Result};

/// Smallest accepted median kernel size
pub const MIN_KERNEL_SIZE: u32 = 3;

/// Median filter denoiser
pub struct Denoiser;

impl Denoiser {
    /// Validate a median kernel size (odd, at least 3)
    pub fn validate_kernel(ksize: u32) -> Result<()> {
        if ksize < MIN_KERNEL_SIZE || ksize % 2 == 0 {
            return Err(RestoreError::InvalidKernelSize(ksize));
        }
        Ok(())
    }

    /// Replace each pixel with the median of its `ksize` x `ksize` neighborhood
    pub fn median(gray: &GrayImage, ksize: u32) -> Result<GrayImage> {
        Self::validate_kernel(ksize)?;
        let radius = ksize / 2;
        Ok(median_filter(gray, radius, radius))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_rejects_even_kernel() {
        let gray = GrayImage::from_pixel(8, 8, Luma([128]));
        assert!(matches!(
            Denoiser::median(&gray, 4),
            Err(RestoreError::InvalidKernelSize(4))
        ));
    }

    #[test]
    fn test_rejects_small_kernel() {
        let gray = GrayImage::from_pixel(8, 8, Luma([128]));
        assert!(Denoiser::median(&gray, 1).is_err());
        assert!(Denoiser::median(&gray, 0).is_err());
    }

    #[test]
    fn test_removes_isolated_speck() {
        let mut gray = GrayImage::from_pixel(10, 10, Luma([128]));
        gray.put_pixel(5, 5, Luma([0]));
        gray.put_pixel(2, 7, Luma([255]));

        let result = Denoiser::median(&gray, 3).unwrap();
        assert_eq!(result.dimensions(), (10, 10));
        assert_eq!(result.get_pixel(5, 5).0[0], 128);
        assert_eq!(result.get_pixel(2, 7).0[0], 128);
    }

    #[test]
    fn test_flat_image_unchanged() {
        let gray = GrayImage::from_pixel(12, 7, Luma([77]));
        let result = Denoiser::median(&gray, 5).unwrap();
        assert_eq!(result, gray);
    }
}
