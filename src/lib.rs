//! scan-restore - Dust and scratch removal for scanned photographs
//!
//! Finds small localized defects with morphological contrast analysis and
//! fills them with multi-pass inpainting, producing a cleaned image and a
//! mask of what was altered.
//!
//! # Modules
//!
//! - [`restore`] - Denoising, defect detection and inpainting
//! - [`pipeline`] - Single-image load → detect → inpaint → save flow
//! - [`config`] - TOML configuration and CLI overrides
//! - [`cli`] - Command-line definitions
//! - [`progress`] - Stage reporting
//! - [`preview`] - Side-by-side result preview
//!
//! # Example
//!
//! ```rust,no_run
//! use scan_restore::{Config, NoopProgress, PipelineConfig, RestorePipeline};
//! use std::path::Path;
//!
//! let config = PipelineConfig::from(&Config::load().unwrap());
//! let pipeline = RestorePipeline::new(config);
//! let (summary, _) = pipeline
//!     .process_file(Path::new("scan.jpg"), Path::new("clean.jpg"), &NoopProgress)
//!     .unwrap();
//! println!("mask written to {}", summary.mask_path.display());
//! ```

pub mod cli;
pub mod config;
pub mod pipeline;
pub mod preview;
pub mod progress;
pub mod restore;

// CLI
pub use cli::{Cli, Commands, InfoArgs, RestoreArgs};

// Config
pub use config::{CliOverrides, Config, ConfigError, PipelineConfig};

// Pipeline
pub use pipeline::{mask_path_for, RestoreOutput, RestorePipeline, RestoreSummary};

// Progress
pub use progress::{NoopProgress, OutputMode, ProcessingStage, ProgressCallback};

// Restore
pub use restore::{
    BlobFeatures, BlobVerdict, DefectMask, DefectMaskDetector, Denoiser, DetectionParams,
    DetectionReport, InpaintMethod, InpaintOutcome, InpaintParams, KeepRule, MultiPassInpainter,
    PassReport, RestoreError, StructuringElement,
};

/// Process exit codes
pub mod exit_codes {
    /// Success
    pub const SUCCESS: i32 = 0;
    /// Processing failed
    pub const GENERAL_ERROR: i32 = 1;
    /// Input file missing or unreadable
    pub const INPUT_NOT_FOUND: i32 = 2;
    /// Invalid parameters or configuration file
    pub const CONFIG_ERROR: i32 = 3;
}
