//! Multi-pass inpainting
//!
//! Fills masked pixels with a sequence of increasing radii. After every pass
//! the working mask is eroded once with the 3x3 elliptical element, so larger
//! radii only reach the core of large defects and the rim keeps the sharper
//! small-radius fill.

mod fmm;

use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use super::morphology;
use super::types::{count_defect_pixels, ensure_same_size, DefectMask, RestoreError, Result};

pub use fmm::fill;

// ============================================================
// Types
// ============================================================

/// Inpainting algorithm variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InpaintMethod {
    /// Fast marching with first-order extrapolation (Telea)
    #[serde(rename = "telea")]
    Telea,
    /// Isophote-following fill (Navier-Stokes style)
    #[serde(rename = "ns")]
    NavierStokes,
}

impl InpaintMethod {
    /// Identifier used in configuration files and on the command line
    pub fn name(&self) -> &'static str {
        match self {
            InpaintMethod::Telea => "telea",
            InpaintMethod::NavierStokes => "ns",
        }
    }
}

impl fmt::Display for InpaintMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InpaintMethod {
    type Err = RestoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "telea" => Ok(InpaintMethod::Telea),
            "ns" | "navier-stokes" => Ok(InpaintMethod::NavierStokes),
            other => Err(RestoreError::InvalidParameter(format!(
                "unknown inpaint method '{}' (expected 'telea' or 'ns')",
                other
            ))),
        }
    }
}

/// Inpainting parameters
#[derive(Debug, Clone, PartialEq)]
pub struct InpaintParams {
    /// Algorithm variant
    pub method: InpaintMethod,
    /// Radius per pass, in application order
    pub radii: Vec<u32>,
}

impl InpaintParams {
    /// Check the radius schedule
    pub fn validate(&self) -> Result<()> {
        if let Some(pos) = self.radii.iter().position(|&r| r == 0) {
            return Err(RestoreError::InvalidParameter(format!(
                "inpaint radius at position {} must be at least 1",
                pos
            )));
        }
        if self.radii.windows(2).any(|w| w[1] <= w[0]) {
            warn!(radii = ?self.radii, "inpaint radii are not strictly increasing");
        }
        Ok(())
    }
}

/// Statistics for one fill + erode cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    /// Radius used for this pass
    pub radius: u32,
    /// Working-mask pixels filled in this pass
    pub masked_pixels: usize,
}

/// Inpainting result
#[derive(Debug, Clone)]
pub struct InpaintOutcome {
    /// Reconstructed three-channel image
    pub image: RgbImage,
    /// One entry per radius, in order
    pub passes: Vec<PassReport>,
}

// ============================================================
// Inpainter
// ============================================================

/// Multi-pass inpainter with a shrinking working mask
pub struct MultiPassInpainter;

impl MultiPassInpainter {
    /// Inpaint any decoded image; single-channel input is expanded to RGB
    pub fn inpaint_dynamic(
        image: &DynamicImage,
        mask: &DefectMask,
        params: &InpaintParams,
    ) -> Result<InpaintOutcome> {
        Self::inpaint(&image.to_rgb8(), mask, params)
    }

    /// Inpaint an RGB image
    pub fn inpaint(
        image: &RgbImage,
        mask: &DefectMask,
        params: &InpaintParams,
    ) -> Result<InpaintOutcome> {
        ensure_same_size(mask, image.dimensions())?;
        params.validate()?;

        let mut result = image.clone();
        let mut working = mask.clone();
        let mut passes = Vec::with_capacity(params.radii.len());

        for &radius in &params.radii {
            let masked_pixels = count_defect_pixels(&working);
            if masked_pixels > 0 {
                fmm::fill(&mut result, &working, radius, params.method);
            }
            debug!(radius, masked_pixels, method = %params.method, "inpaint pass");
            passes.push(PassReport {
                radius,
                masked_pixels,
            });
            working = morphology::mask_erode(&working);
        }

        Ok(InpaintOutcome {
            image: result,
            passes,
        })
    }
}
