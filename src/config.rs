//! Configuration file support
//!
//! Parameters can be stored in a TOML file and overridden from the command
//! line. Lookup order for [`Config::load`]:
//!
//! 1. `./scan-restore.toml`
//! 2. `<config dir>/scan-restore/config.toml`
//! 3. Built-in restoration preset ([`Config::default`])
//!
//! # Example
//!
//! ```toml
//! median_ksize = 3
//! mask_median_ksize = 3
//! morph_selem_size = 9
//! mask_threshold = 46
//! mask_min_size = 120
//! mask_max_blob_area_ratio = 0.015
//! mask_keep_thinness_ratio = 0.25
//! dilate_iters = 2
//! inpaint_method = "ns"
//! inpaint_radii = [3, 4, 5]
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::restore::{DetectionParams, Denoiser, InpaintMethod, InpaintParams, RestoreError};

/// Local configuration file name
pub const LOCAL_CONFIG_FILE: &str = "scan-restore.toml";

/// Directory under the user config dir
pub const CONFIG_DIR_NAME: &str = "scan-restore";

/// File name under the user config dir
pub const USER_CONFIG_FILE: &str = "config.toml";

/// Every key of [`Config`], in file order
pub const CONFIG_KEYS: [&str; 10] = [
    "median_ksize",
    "mask_median_ksize",
    "morph_selem_size",
    "mask_threshold",
    "mask_min_size",
    "mask_max_blob_area_ratio",
    "mask_keep_thinness_ratio",
    "dilate_iters",
    "inpaint_method",
    "inpaint_radii",
];

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] RestoreError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

// ============================================================
// File Configuration
// ============================================================

/// Configuration file contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Median kernel applied to the grayscale image before detection
    pub median_ksize: u32,
    /// Median kernel applied inside the detector
    pub mask_median_ksize: u32,
    /// Elliptical structuring element size
    pub morph_selem_size: u32,
    /// Threshold on the normalized contrast map
    pub mask_threshold: u8,
    /// Minimum component size in pixels
    pub mask_min_size: u32,
    /// Maximum component area as a fraction of the image
    pub mask_max_blob_area_ratio: f64,
    /// Thinness ratio below which large components are kept
    pub mask_keep_thinness_ratio: f64,
    /// Dilation iterations applied to the final mask
    pub dilate_iters: u8,
    /// Inpainting variant
    pub inpaint_method: InpaintMethod,
    /// Inpainting radii, one pass each
    pub inpaint_radii: Vec<u32>,
}

impl Default for Config {
    /// Restoration preset tuned for scanned prints
    fn default() -> Self {
        Self {
            median_ksize: 3,
            mask_median_ksize: 3,
            morph_selem_size: 9,
            mask_threshold: 46,
            mask_min_size: 120,
            mask_max_blob_area_ratio: 0.015,
            mask_keep_thinness_ratio: 0.25,
            dilate_iters: 2,
            inpaint_method: InpaintMethod::NavierStokes,
            inpaint_radii: vec![3, 4, 5],
        }
    }
}

impl Config {
    /// Load from the first config file found, or the built-in preset
    pub fn load() -> Result<Self> {
        for path in Self::search_paths() {
            if path.is_file() {
                return Self::load_from_path(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load from a specific file
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse TOML text; keys that are not set keep the preset value
    pub fn from_toml(content: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(content)?;
        let preset_keys = Self::unset_keys(&table);
        if !preset_keys.is_empty() {
            debug!(keys = ?preset_keys, "config keys not set, using preset values");
        }
        Ok(toml::from_str(content)?)
    }

    /// Keys of [`CONFIG_KEYS`] missing from a parsed table
    fn unset_keys(table: &toml::Table) -> Vec<&'static str> {
        CONFIG_KEYS
            .iter()
            .copied()
            .filter(|key| !table.contains_key(*key))
            .collect()
    }

    /// Serialize to TOML text
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Candidate config file locations, in lookup order
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join(CONFIG_DIR_NAME).join(USER_CONFIG_FILE));
        }
        paths
    }

    /// Merge with CLI overrides (CLI takes precedence)
    pub fn merge_with_cli(&self, cli: &CliOverrides) -> PipelineConfig {
        PipelineConfig {
            median_ksize: cli.median_ksize.unwrap_or(self.median_ksize),
            detection: DetectionParams {
                median_ksize: cli.mask_median_ksize.unwrap_or(self.mask_median_ksize),
                morph_selem_size: cli.morph_selem_size.unwrap_or(self.morph_selem_size),
                threshold: cli.mask_threshold.unwrap_or(self.mask_threshold),
                min_size: cli.mask_min_size.unwrap_or(self.mask_min_size),
                max_blob_area_ratio: cli
                    .mask_max_blob_area_ratio
                    .unwrap_or(self.mask_max_blob_area_ratio),
                keep_thinness_ratio: cli
                    .mask_keep_thinness_ratio
                    .unwrap_or(self.mask_keep_thinness_ratio),
                dilate_iters: cli.dilate_iters.unwrap_or(self.dilate_iters),
            },
            inpaint: InpaintParams {
                method: cli.inpaint_method.unwrap_or(self.inpaint_method),
                radii: cli
                    .inpaint_radii
                    .clone()
                    .unwrap_or_else(|| self.inpaint_radii.clone()),
            },
        }
    }
}

// ============================================================
// CLI Overrides
// ============================================================

/// Values given explicitly on the command line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub median_ksize: Option<u32>,
    pub mask_median_ksize: Option<u32>,
    pub morph_selem_size: Option<u32>,
    pub mask_threshold: Option<u8>,
    pub mask_min_size: Option<u32>,
    pub mask_max_blob_area_ratio: Option<f64>,
    pub mask_keep_thinness_ratio: Option<f64>,
    pub dilate_iters: Option<u8>,
    pub inpaint_method: Option<InpaintMethod>,
    pub inpaint_radii: Option<Vec<u32>>,
}

impl CliOverrides {
    /// Create empty overrides
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================
// Pipeline Configuration
// ============================================================

/// Fully resolved parameters for one restoration run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Median kernel for the pre-detection denoise
    pub median_ksize: u32,
    /// Defect detection parameters
    pub detection: DetectionParams,
    /// Inpainting parameters
    pub inpaint: InpaintParams,
}

impl PipelineConfig {
    /// Validate every parameter before any image work
    pub fn validate(&self) -> std::result::Result<(), RestoreError> {
        Denoiser::validate_kernel(self.median_ksize)?;
        self.detection.validate()?;
        self.inpaint.validate()
    }
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        config.merge_with_cli(&CliOverrides::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_preset() {
        let config = Config::default();
        assert_eq!(config.median_ksize, 3);
        assert_eq!(config.morph_selem_size, 9);
        assert_eq!(config.mask_threshold, 46);
        assert_eq!(config.mask_min_size, 120);
        assert_eq!(config.inpaint_method, InpaintMethod::NavierStokes);
        assert_eq!(config.inpaint_radii, vec![3, 4, 5]);
        assert!(PipelineConfig::from(&config).validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = Config::from_toml(
            r#"
            mask_threshold = 30
            inpaint_method = "telea"
            inpaint_radii = [1, 2]
            "#,
        )
        .unwrap();
        assert_eq!(config.mask_threshold, 30);
        assert_eq!(config.inpaint_method, InpaintMethod::Telea);
        assert_eq!(config.inpaint_radii, vec![1, 2]);
        // Unspecified keys keep the preset
        assert_eq!(config.morph_selem_size, 9);
    }

    #[test]
    fn test_unset_keys_reported() {
        let table: toml::Table = toml::from_str("mask_threshold = 30\ndilate_iters = 1").unwrap();
        let unset = Config::unset_keys(&table);
        assert_eq!(unset.len(), CONFIG_KEYS.len() - 2);
        assert!(unset.contains(&"morph_selem_size"));
        assert!(!unset.contains(&"mask_threshold"));
        assert!(!unset.contains(&"dilate_iters"));

        let full = Config::default().to_toml().unwrap();
        let table: toml::Table = toml::from_str(&full).unwrap();
        assert!(Config::unset_keys(&table).is_empty());
    }

    #[test]
    fn test_parse_rejects_unknown_method() {
        let result = Config::from_toml(r#"inpaint_method = "median""#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = Config {
            mask_threshold: 20,
            inpaint_method: InpaintMethod::Telea,
            ..Default::default()
        };
        let text = config.to_toml().unwrap();
        assert_eq!(Config::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "morph_selem_size = 7").unwrap();
        writeln!(file, "dilate_iters = 0").unwrap();

        let config = Config::load_from_path(file.path()).unwrap();
        assert_eq!(config.morph_selem_size, 7);
        assert_eq!(config.dilate_iters, 0);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load_from_path(Path::new("/nonexistent/scan-restore.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_merge_with_cli() {
        let config = Config::default();
        let overrides = CliOverrides {
            mask_threshold: Some(25),
            inpaint_method: Some(InpaintMethod::Telea),
            inpaint_radii: Some(vec![1, 2]),
            median_ksize: Some(5),
            ..CliOverrides::new()
        };

        let merged = config.merge_with_cli(&overrides);
        assert_eq!(merged.median_ksize, 5);
        assert_eq!(merged.detection.threshold, 25);
        assert_eq!(merged.detection.morph_selem_size, 9);
        assert_eq!(merged.inpaint.method, InpaintMethod::Telea);
        assert_eq!(merged.inpaint.radii, vec![1, 2]);
    }

    #[test]
    fn test_pipeline_config_validation() {
        let mut pipeline = PipelineConfig::from(&Config::default());
        pipeline.median_ksize = 2;
        assert!(matches!(
            pipeline.validate(),
            Err(RestoreError::InvalidKernelSize(2))
        ));
    }

    #[test]
    fn test_search_paths_start_local() {
        let paths = Config::search_paths();
        assert_eq!(paths[0], PathBuf::from(LOCAL_CONFIG_FILE));
    }
}
