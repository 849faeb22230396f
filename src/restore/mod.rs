//! Restore module for scanned photographs
//!
//! Detects dust specks and scratches and fills them from their surroundings.
//!
//! # Stages
//!
//! - **Denoise** ([`denoise`]) - Median smoothing before detection
//! - **Detect** ([`detect`]) - Top-hat/black-hat contrast, thresholding and
//!   size/shape filtering of connected components
//! - **Inpaint** ([`inpaint`]) - Fast-marching fill over a shrinking mask
//!
//! # Example
//!
//! ```rust,no_run
//! use scan_restore::{
//!     DefectMaskDetector, DetectionParams, InpaintMethod, InpaintParams, MultiPassInpainter,
//! };
//!
//! let img = image::open("scan.jpg").unwrap();
//! let params = DetectionParams {
//!     median_ksize: 3,
//!     morph_selem_size: 9,
//!     threshold: 46,
//!     min_size: 120,
//!     max_blob_area_ratio: 0.015,
//!     keep_thinness_ratio: 0.25,
//!     dilate_iters: 2,
//! };
//!
//! let report = DefectMaskDetector::detect_dynamic(&img, &params).unwrap();
//! let outcome = MultiPassInpainter::inpaint_dynamic(
//!     &img,
//!     &report.mask,
//!     &InpaintParams { method: InpaintMethod::NavierStokes, radii: vec![3, 4, 5] },
//! )
//! .unwrap();
//! outcome.image.save("clean.png").unwrap();
//! ```

pub mod components;
pub mod denoise;
pub mod detect;
pub mod inpaint;
pub mod morphology;
mod types;

// Re-export public API
pub use components::{BlobFeatures, Component};
pub use denoise::Denoiser;
pub use detect::{BlobVerdict, DefectMaskDetector, DetectionParams, DetectionReport, KeepRule};
pub use inpaint::{InpaintMethod, InpaintOutcome, InpaintParams, MultiPassInpainter, PassReport};
pub use morphology::StructuringElement;

pub use types::{
    count_defect_pixels, luminance, to_gray, DefectMask, RestoreError, Result, MASK_OFF, MASK_ON,
};
