//! Progress reporting for restoration runs.
//!
//! The pipeline reports stage transitions and per-pass progress through a
//! [`ProgressCallback`]; the CLI renders them according to an [`OutputMode`].

use std::fmt;

/// Processing stages of a restoration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingStage {
    /// Decoding the input image
    #[default]
    Loading,
    /// Median denoising of the grayscale copy
    Denoising,
    /// Building the defect mask
    Detecting,
    /// Multi-pass inpainting
    Inpainting,
    /// Writing the cleaned image and mask
    Saving,
    /// Completed
    Completed,
}

impl ProcessingStage {
    /// Get the name of the stage
    pub fn name(&self) -> &'static str {
        match self {
            ProcessingStage::Loading => "Loading",
            ProcessingStage::Denoising => "Denoising",
            ProcessingStage::Detecting => "Detecting",
            ProcessingStage::Inpainting => "Inpainting",
            ProcessingStage::Saving => "Saving",
            ProcessingStage::Completed => "Completed",
        }
    }

    /// Get a short description of the stage
    pub fn description(&self) -> &'static str {
        match self {
            ProcessingStage::Loading => "decoding input image",
            ProcessingStage::Denoising => "suppressing sensor noise",
            ProcessingStage::Detecting => "finding dust and scratches",
            ProcessingStage::Inpainting => "filling defects",
            ProcessingStage::Saving => "writing outputs",
            ProcessingStage::Completed => "done",
        }
    }
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.description())
    }
}

/// Output verbosity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// No output
    Quiet,
    /// Normal output (stage display only)
    #[default]
    Normal,
    /// Verbose output (pass-level progress)
    Verbose,
    /// Very verbose (debug messages)
    VeryVerbose,
}

impl OutputMode {
    /// Create OutputMode from verbosity level
    pub fn from_verbosity(level: u8) -> Self {
        match level {
            0 => OutputMode::Normal,
            1 => OutputMode::Verbose,
            _ => OutputMode::VeryVerbose,
        }
    }

    /// Check if output should be shown at this mode
    pub fn should_show(&self, required: OutputMode) -> bool {
        use OutputMode::*;
        match (self, required) {
            (Quiet, _) => false,
            (Normal, Quiet | Normal) => true,
            (Verbose, Quiet | Normal | Verbose) => true,
            (VeryVerbose, _) => true,
            _ => false,
        }
    }
}

/// Receives progress events from the pipeline
pub trait ProgressCallback {
    /// A stage has started
    fn on_step_start(&self, stage: ProcessingStage);

    /// Progress within a stage (e.g. inpainting pass `current` of `total`)
    fn on_step_progress(&self, current: usize, total: usize);

    /// A stage has finished
    fn on_step_complete(&self, stage: ProcessingStage, message: &str);

    /// Diagnostic detail
    fn on_debug(&self, message: &str);
}

/// Progress callback that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_step_start(&self, _stage: ProcessingStage) {}
    fn on_step_progress(&self, _current: usize, _total: usize) {}
    fn on_step_complete(&self, _stage: ProcessingStage, _message: &str) {}
    fn on_debug(&self, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display() {
        assert_eq!(
            ProcessingStage::Detecting.to_string(),
            "Detecting (finding dust and scratches)"
        );
        assert_eq!(ProcessingStage::default(), ProcessingStage::Loading);
    }

    #[test]
    fn test_output_mode_from_verbosity() {
        assert_eq!(OutputMode::from_verbosity(0), OutputMode::Normal);
        assert_eq!(OutputMode::from_verbosity(1), OutputMode::Verbose);
        assert_eq!(OutputMode::from_verbosity(5), OutputMode::VeryVerbose);
    }

    #[test]
    fn test_should_show() {
        assert!(!OutputMode::Quiet.should_show(OutputMode::Normal));
        assert!(OutputMode::Normal.should_show(OutputMode::Normal));
        assert!(!OutputMode::Normal.should_show(OutputMode::Verbose));
        assert!(OutputMode::Verbose.should_show(OutputMode::Verbose));
        assert!(!OutputMode::Verbose.should_show(OutputMode::VeryVerbose));
        assert!(OutputMode::VeryVerbose.should_show(OutputMode::VeryVerbose));
    }
}
