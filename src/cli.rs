//! Command-line interface definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::CliOverrides;
use crate::restore::{InpaintMethod, Result};

/// Remove dust and scratches from scanned photographs
#[derive(Debug, Parser)]
#[command(name = "scan-restore", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Detect defects in one image and inpaint them
    Restore(RestoreArgs),
    /// Show version, config locations and the active parameters
    Info(InfoArgs),
}

/// Arguments for `restore`
#[derive(Debug, Args)]
pub struct RestoreArgs {
    /// Input image
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output image; the mask is written next to it as <stem>_mask.png
    #[arg(short, long)]
    pub output: PathBuf,

    /// Configuration file (defaults to ./scan-restore.toml or the user config)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Show original, mask and result side by side when done
    #[arg(long)]
    pub show: bool,

    /// Print the resolved parameters without processing
    #[arg(long)]
    pub dry_run: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Median kernel size for the pre-detection denoise (odd, >= 3)
    #[arg(long)]
    pub median_ksize: Option<u32>,

    /// Median kernel size inside the detector (odd, >= 3)
    #[arg(long)]
    pub mask_median_ksize: Option<u32>,

    /// Elliptical structuring element size
    #[arg(long)]
    pub selem_size: Option<u32>,

    /// Contrast threshold (0-255)
    #[arg(long)]
    pub threshold: Option<u8>,

    /// Minimum defect size in pixels
    #[arg(long)]
    pub min_size: Option<u32>,

    /// Maximum defect area as a fraction of the image (0-1)
    #[arg(long)]
    pub max_blob_area_ratio: Option<f64>,

    /// Thinness ratio below which large defects are kept (0-1)
    #[arg(long)]
    pub thinness_ratio: Option<f64>,

    /// Mask dilation iterations
    #[arg(long)]
    pub dilate_iters: Option<u8>,

    /// Inpainting method
    #[arg(long, value_parser = ["telea", "ns"])]
    pub method: Option<String>,

    /// Comma-separated inpainting radii, e.g. 3,4,5
    #[arg(long, value_delimiter = ',')]
    pub radii: Option<Vec<u32>>,
}

impl RestoreArgs {
    /// Collect explicitly given parameters
    pub fn overrides(&self) -> Result<CliOverrides> {
        let inpaint_method = self
            .method
            .as_deref()
            .map(str::parse::<InpaintMethod>)
            .transpose()?;

        Ok(CliOverrides {
            median_ksize: self.median_ksize,
            mask_median_ksize: self.mask_median_ksize,
            morph_selem_size: self.selem_size,
            mask_threshold: self.threshold,
            mask_min_size: self.min_size,
            mask_max_blob_area_ratio: self.max_blob_area_ratio,
            mask_keep_thinness_ratio: self.thinness_ratio,
            dilate_iters: self.dilate_iters,
            inpaint_method,
            inpaint_radii: self.radii.clone(),
        })
    }
}

/// Arguments for `info`
#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Configuration file to resolve
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
