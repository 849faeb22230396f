//! Defect mask detection
//!
//! Finds dust specks and scratches in a grayscale scan.
//!
//! # Algorithm
//!
//! 1. Median smoothing
//! 2. Local contrast = top-hat + black-hat with an elliptical element
//! 3. Min-max normalization to 0..255
//! 4. Threshold into a provisional mask
//! 5. 3x3 opening to drop single-pixel speckles
//! 6. Remove components below the minimum size
//! 7. Keep components that pass the area bound and are small or thin
//! 8. Optional dilation to cover defect edges
//! 9. Final 3x3 median on the mask

use image::{DynamicImage, GrayImage, Luma};
use tracing::debug;

use super::components::{self, BlobFeatures};
use super::denoise::Denoiser;
use super::morphology::{self, StructuringElement};
use super::types::{count_defect_pixels, to_gray, DefectMask, RestoreError, Result, MASK_OFF};

// ============================================================
// Constants
// ============================================================

/// Components up to this many pixels are kept regardless of shape
pub const SMALL_BLOB_AREA: u32 = 5000;

/// Kernel size of the final mask median pass
const MASK_SMOOTH_KSIZE: u32 = 3;

// ============================================================
// Parameters
// ============================================================

/// Detection parameters; every field must be supplied by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionParams {
    /// Median kernel size applied before the contrast map (odd, >= 3)
    pub median_ksize: u32,
    /// Elliptical structuring element size for top-hat/black-hat
    pub morph_selem_size: u32,
    /// Threshold on the normalized contrast map (pixel >= threshold is a defect)
    pub threshold: u8,
    /// Minimum component size in pixels
    pub min_size: u32,
    /// Maximum component area as a fraction of the image area
    pub max_blob_area_ratio: f64,
    /// Components with a thinness ratio below this are kept regardless of size
    pub keep_thinness_ratio: f64,
    /// Number of 3x3 dilations applied to the kept mask
    pub dilate_iters: u8,
}

impl DetectionParams {
    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        Denoiser::validate_kernel(self.median_ksize)?;

        if self.morph_selem_size == 0 {
            return Err(RestoreError::InvalidParameter(
                "morph_selem_size must be at least 1".to_string(),
            ));
        }
        if !(self.max_blob_area_ratio > 0.0 && self.max_blob_area_ratio <= 1.0) {
            return Err(RestoreError::InvalidParameter(format!(
                "max_blob_area_ratio must be in (0, 1], got {}",
                self.max_blob_area_ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.keep_thinness_ratio) {
            return Err(RestoreError::InvalidParameter(format!(
                "keep_thinness_ratio must be in [0, 1], got {}",
                self.keep_thinness_ratio
            )));
        }
        Ok(())
    }

    /// Keep rule for an image of the given size
    pub fn keep_rule(&self, width: u32, height: u32) -> KeepRule {
        KeepRule {
            min_area: self.min_size,
            max_area: self.max_blob_area_ratio * (width as f64) * (height as f64),
            small_area: SMALL_BLOB_AREA,
            thinness_limit: self.keep_thinness_ratio,
        }
    }
}

// ============================================================
// Keep Rule
// ============================================================

/// Outcome of evaluating one component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobVerdict {
    /// Within bounds and small enough to be dust
    KeptSmall,
    /// Within bounds, large, but thin enough to be a scratch
    KeptThin,
    /// Below the minimum size
    TooSmall,
    /// Above the maximum area
    TooLarge,
    /// Within bounds but neither small nor thin
    Rejected,
}

impl BlobVerdict {
    /// Whether the component stays in the mask
    pub fn is_kept(&self) -> bool {
        matches!(self, BlobVerdict::KeptSmall | BlobVerdict::KeptThin)
    }
}

/// Size/shape rule: area within bounds, and small or thin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeepRule {
    pub min_area: u32,
    pub max_area: f64,
    pub small_area: u32,
    pub thinness_limit: f64,
}

impl KeepRule {
    /// Evaluate a blob against the rule
    pub fn evaluate(&self, blob: &BlobFeatures) -> BlobVerdict {
        if blob.area < self.min_area {
            return BlobVerdict::TooSmall;
        }
        if blob.area as f64 > self.max_area {
            return BlobVerdict::TooLarge;
        }
        if blob.area <= self.small_area {
            return BlobVerdict::KeptSmall;
        }
        if blob.thinness_ratio() < self.thinness_limit {
            return BlobVerdict::KeptThin;
        }
        BlobVerdict::Rejected
    }
}

// ============================================================
// Detection Report
// ============================================================

/// Mask plus per-verdict component counts
#[derive(Debug, Clone)]
pub struct DetectionReport {
    /// Final defect mask
    pub mask: DefectMask,
    /// Components evaluated by the keep rule
    pub candidates: usize,
    pub kept_small: usize,
    pub kept_thin: usize,
    pub too_small: usize,
    pub too_large: usize,
    pub rejected: usize,
    /// Defect pixels in the final mask
    pub defect_pixels: usize,
}

impl DetectionReport {
    fn new(mask: DefectMask) -> Self {
        Self {
            mask,
            candidates: 0,
            kept_small: 0,
            kept_thin: 0,
            too_small: 0,
            too_large: 0,
            rejected: 0,
            defect_pixels: 0,
        }
    }

    fn record(&mut self, verdict: BlobVerdict) {
        self.candidates += 1;
        match verdict {
            BlobVerdict::KeptSmall => self.kept_small += 1,
            BlobVerdict::KeptThin => self.kept_thin += 1,
            BlobVerdict::TooSmall => self.too_small += 1,
            BlobVerdict::TooLarge => self.too_large += 1,
            BlobVerdict::Rejected => self.rejected += 1,
        }
    }

    /// Number of components kept
    pub fn kept(&self) -> usize {
        self.kept_small + self.kept_thin
    }

    /// Check if any defects were detected
    pub fn has_defects(&self) -> bool {
        self.defect_pixels > 0
    }

    /// Defect coverage percentage
    pub fn coverage_percent(&self) -> f64 {
        let (width, height) = self.mask.dimensions();
        let total = width as f64 * height as f64;
        if total == 0.0 {
            return 0.0;
        }
        self.defect_pixels as f64 / total * 100.0
    }
}

// ============================================================
// Detector
// ============================================================

/// Morphological dust and scratch detector
pub struct DefectMaskDetector;

impl DefectMaskDetector {
    /// Detect defects and return the binary mask
    pub fn detect(gray: &GrayImage, params: &DetectionParams) -> Result<DefectMask> {
        Ok(Self::detect_with_report(gray, params)?.mask)
    }

    /// Detect defects in any decoded image, converting color input to grayscale
    pub fn detect_dynamic(image: &DynamicImage, params: &DetectionParams) -> Result<DetectionReport> {
        let gray = match image {
            DynamicImage::ImageLuma8(gray) => gray.clone(),
            other => to_gray(&other.to_rgb8()),
        };
        Self::detect_with_report(&gray, params)
    }

    /// Detect defects and report component statistics
    pub fn detect_with_report(gray: &GrayImage, params: &DetectionParams) -> Result<DetectionReport> {
        params.validate()?;
        let (width, height) = gray.dimensions();

        let contrast = Self::contrast_map(gray, params)?;
        let provisional = morphology::threshold_at_least(&contrast, params.threshold);
        debug!(
            pixels = count_defect_pixels(&provisional),
            threshold = params.threshold,
            "thresholded contrast map"
        );

        let opened = morphology::mask_open(&provisional);
        let cleaned = components::remove_small_components(&opened, params.min_size);

        let rule = params.keep_rule(width, height);
        let mut kept = DefectMask::from_pixel(width, height, Luma([MASK_OFF]));
        let mut report = DetectionReport::new(DefectMask::new(width, height));

        for component in components::find_components(&cleaned) {
            let verdict = rule.evaluate(&component.features());
            report.record(verdict);
            if verdict.is_kept() {
                component.paint(&mut kept);
            }
        }

        debug!(
            candidates = report.candidates,
            kept_small = report.kept_small,
            kept_thin = report.kept_thin,
            too_large = report.too_large,
            rejected = report.rejected,
            "filtered components"
        );

        let dilated = morphology::mask_dilate(&kept, params.dilate_iters);
        let mask = Denoiser::median(&dilated, MASK_SMOOTH_KSIZE)?;

        report.defect_pixels = count_defect_pixels(&mask);
        report.mask = mask;
        Ok(report)
    }

    /// Smoothed, normalized top-hat + black-hat response
    pub fn contrast_map(gray: &GrayImage, params: &DetectionParams) -> Result<GrayImage> {
        let smoothed = Denoiser::median(gray, params.median_ksize)?;
        let element = StructuringElement::ellipse(params.morph_selem_size);
        debug!(
            size = element.size(),
            area = element.area(),
            "elliptical structuring element"
        );

        let bright = morphology::top_hat(&smoothed, &element);
        let dark = morphology::black_hat(&smoothed, &element);
        let combined = morphology::saturating_add(&bright, &dark);

        Ok(morphology::normalize_min_max(&combined))
    }
}
