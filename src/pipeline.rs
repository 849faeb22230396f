//! Restoration pipeline
//!
//! Ties the stages together for one image:
//! load → grayscale → denoise → detect → inpaint → save.

use image::{DynamicImage, RgbImage};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::progress::{ProcessingStage, ProgressCallback};
use crate::restore::{
    to_gray, DefectMask, DefectMaskDetector, Denoiser, DetectionReport, MultiPassInpainter,
    PassReport, RestoreError, Result,
};

/// Suffix appended to the output stem for the mask file
pub const MASK_SUFFIX: &str = "_mask";

/// Derive the mask path for an output image: `<dir>/<stem>_mask.png`
pub fn mask_path_for(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!("{}{}.png", stem, MASK_SUFFIX))
}

/// In-memory result of a restoration run
#[derive(Debug, Clone)]
pub struct RestoreOutput {
    /// Input converted to three channels
    pub original: RgbImage,
    /// Defect mask
    pub mask: DefectMask,
    /// Cleaned image
    pub result: RgbImage,
    /// Component statistics from detection
    pub detection: DetectionReport,
    /// One entry per inpainting pass
    pub passes: Vec<PassReport>,
}

/// Summary of a file-based run
#[derive(Debug, Clone)]
pub struct RestoreSummary {
    /// Cleaned image path
    pub output_path: PathBuf,
    /// Mask image path
    pub mask_path: PathBuf,
    /// Image dimensions
    pub image_size: (u32, u32),
    /// Components kept in the mask
    pub defects_kept: usize,
    /// Defect pixels in the mask
    pub defect_pixels: usize,
    /// Inpainting passes performed
    pub passes: usize,
    /// Processing time
    pub elapsed_seconds: f64,
}

/// Single-image dust and scratch removal pipeline
#[derive(Debug, Clone)]
pub struct RestorePipeline {
    config: PipelineConfig,
}

impl RestorePipeline {
    /// Create a pipeline with resolved parameters
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run all stages on a decoded image
    pub fn process_image(&self, image: &DynamicImage) -> Result<RestoreOutput> {
        self.process_image_with_progress(image, &crate::progress::NoopProgress)
    }

    /// Run all stages on a decoded image, reporting progress
    pub fn process_image_with_progress(
        &self,
        image: &DynamicImage,
        progress: &dyn ProgressCallback,
    ) -> Result<RestoreOutput> {
        self.config.validate()?;

        let original = image.to_rgb8();
        let gray = to_gray(&original);

        progress.on_step_start(ProcessingStage::Denoising);
        let denoised = Denoiser::median(&gray, self.config.median_ksize)?;
        progress.on_step_complete(
            ProcessingStage::Denoising,
            &format!("median {}x{}", self.config.median_ksize, self.config.median_ksize),
        );

        progress.on_step_start(ProcessingStage::Detecting);
        let detection = DefectMaskDetector::detect_with_report(&denoised, &self.config.detection)?;
        progress.on_step_complete(
            ProcessingStage::Detecting,
            &format!(
                "{} defect(s) kept of {} candidate(s), {:.3}% of pixels",
                detection.kept(),
                detection.candidates,
                detection.coverage_percent()
            ),
        );
        progress.on_debug(&format!(
            "small={} thin={} too_large={} rejected={}",
            detection.kept_small, detection.kept_thin, detection.too_large, detection.rejected
        ));

        progress.on_step_start(ProcessingStage::Inpainting);
        let total = self.config.inpaint.radii.len();
        let outcome = MultiPassInpainter::inpaint(&original, &detection.mask, &self.config.inpaint)?;
        for (i, pass) in outcome.passes.iter().enumerate() {
            progress.on_step_progress(i + 1, total);
            progress.on_debug(&format!(
                "pass {}: radius {} over {} pixel(s)",
                i + 1,
                pass.radius,
                pass.masked_pixels
            ));
        }
        progress.on_step_complete(
            ProcessingStage::Inpainting,
            &format!("{} pass(es), method {}", outcome.passes.len(), self.config.inpaint.method),
        );

        Ok(RestoreOutput {
            original,
            mask: detection.mask.clone(),
            result: outcome.image,
            detection,
            passes: outcome.passes,
        })
    }

    /// Restore an image file, writing the cleaned image and its mask
    pub fn process_file(
        &self,
        input: &Path,
        output: &Path,
        progress: &dyn ProgressCallback,
    ) -> Result<(RestoreSummary, RestoreOutput)> {
        let start = Instant::now();

        progress.on_step_start(ProcessingStage::Loading);
        let image = Self::load(input)?;
        progress.on_step_complete(
            ProcessingStage::Loading,
            &format!("{}x{}", image.width(), image.height()),
        );
        debug!(path = %input.display(), width = image.width(), height = image.height(), "loaded image");

        let restored = self.process_image_with_progress(&image, progress)?;

        progress.on_step_start(ProcessingStage::Saving);
        let mask_path = mask_path_for(output);
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::save(&DynamicImage::ImageRgb8(restored.result.clone()), output)?;
        info!("Saved: {}", output.display());
        Self::save(&DynamicImage::ImageLuma8(restored.mask.clone()), &mask_path)?;
        info!("Saved: {}", mask_path.display());
        progress.on_step_complete(ProcessingStage::Saving, &output.display().to_string());

        let summary = RestoreSummary {
            output_path: output.to_path_buf(),
            mask_path,
            image_size: restored.result.dimensions(),
            defects_kept: restored.detection.kept(),
            defect_pixels: restored.detection.defect_pixels,
            passes: restored.passes.len(),
            elapsed_seconds: start.elapsed().as_secs_f64(),
        };
        progress.on_step_complete(ProcessingStage::Completed, "");

        Ok((summary, restored))
    }

    fn load(path: &Path) -> Result<DynamicImage> {
        if !path.exists() {
            return Err(RestoreError::ImageNotFound(path.to_path_buf()));
        }
        image::open(path).map_err(|e| RestoreError::InvalidImage(e.to_string()))
    }

    fn save(image: &DynamicImage, path: &Path) -> Result<()> {
        image.save(path).map_err(|e| RestoreError::SaveFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}
