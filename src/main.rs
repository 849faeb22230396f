//! scan-restore - Dust and scratch removal for scanned photographs
//!
//! CLI entry point

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use scan_restore::{
    exit_codes, preview,
    // CLI
    Cli, Commands, InfoArgs, RestoreArgs,
    // Config
    Config, ConfigError, PipelineConfig,
    // Pipeline
    RestoreError, RestorePipeline,
    // Progress tracking
    OutputMode, ProcessingStage, ProgressCallback,
};
use std::path::Path;
use tracing::Level;

fn main() {
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Restore(args) => run_restore(args),
        Commands::Info(args) => run_info(args),
    };

    std::process::exit(match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_code_for(&e)
        }
    });
}

/// Map an error to the process exit code
fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(e) = err.downcast_ref::<RestoreError>() {
        return match e {
            RestoreError::ImageNotFound(_) | RestoreError::InvalidImage(_) => {
                exit_codes::INPUT_NOT_FOUND
            }
            RestoreError::InvalidKernelSize(_) | RestoreError::InvalidParameter(_) => {
                exit_codes::CONFIG_ERROR
            }
            _ => exit_codes::GENERAL_ERROR,
        };
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return exit_codes::CONFIG_ERROR;
    }
    exit_codes::GENERAL_ERROR
}

fn init_logging(mode: OutputMode) {
    let level = match mode {
        OutputMode::Quiet => Level::ERROR,
        OutputMode::Normal => Level::INFO,
        OutputMode::Verbose => Level::DEBUG,
        OutputMode::VeryVerbose => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

// ============ Progress Callback Implementation ============

/// Progress callback for CLI output
struct CliProgress {
    mode: OutputMode,
    bar: ProgressBar,
}

impl CliProgress {
    fn new(mode: OutputMode) -> Self {
        let bar = if mode.should_show(OutputMode::Verbose) {
            let bar = ProgressBar::new(0);
            if let Ok(style) =
                ProgressStyle::with_template("    {bar:40.cyan/blue} {pos}/{len} passes")
            {
                bar.set_style(style);
            }
            bar
        } else {
            ProgressBar::hidden()
        };
        Self { mode, bar }
    }
}

impl ProgressCallback for CliProgress {
    fn on_step_start(&self, stage: ProcessingStage) {
        if self.mode.should_show(OutputMode::Normal) {
            println!("  {}", stage);
        }
    }

    fn on_step_progress(&self, current: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(current as u64);
    }

    fn on_step_complete(&self, stage: ProcessingStage, message: &str) {
        if stage == ProcessingStage::Inpainting {
            self.bar.finish_and_clear();
        }
        if self.mode.should_show(OutputMode::Verbose) && !message.is_empty() {
            println!("    {}: {}", stage.name(), message);
        }
    }

    fn on_debug(&self, message: &str) {
        if self.mode.should_show(OutputMode::VeryVerbose) {
            println!("    [DEBUG] {}", message);
        }
    }
}

// ============ Restore Command ============

fn run_restore(args: &RestoreArgs) -> anyhow::Result<()> {
    let mode = if args.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::from_verbosity(args.verbose)
    };
    init_logging(mode);

    if !args.input.exists() {
        return Err(RestoreError::ImageNotFound(args.input.clone()).into());
    }

    let pipeline_config = resolve_config(args.config.as_deref(), args)?;
    pipeline_config.validate()?;

    if args.dry_run {
        print_execution_plan(args, &pipeline_config);
        return Ok(());
    }

    let pipeline = RestorePipeline::new(pipeline_config);
    let progress = CliProgress::new(mode);

    if mode.should_show(OutputMode::Normal) {
        println!("Processing: {}", args.input.display());
    }

    let (summary, restored) = pipeline.process_file(&args.input, &args.output, &progress)?;

    if mode.should_show(OutputMode::Normal) {
        println!("Saved: {}", summary.output_path.display());
        println!("Saved: {}", summary.mask_path.display());
        println!(
            "Restored {} defect(s), {} pixel(s) in {:.2}s",
            summary.defects_kept, summary.defect_pixels, summary.elapsed_seconds
        );
    }

    if args.show {
        preview::show(&restored.original, &restored.mask, &restored.result)?;
    }

    Ok(())
}

/// Load the config file and apply command-line overrides
fn resolve_config(path: Option<&Path>, args: &RestoreArgs) -> anyhow::Result<PipelineConfig> {
    let file_config = match path {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    let overrides = args.overrides()?;
    Ok(file_config.merge_with_cli(&overrides))
}

/// Print execution plan for dry-run mode
fn print_execution_plan(args: &RestoreArgs, config: &PipelineConfig) {
    let detection = &config.detection;
    println!("=== Dry Run - Execution Plan ===");
    println!();
    println!("Input:  {}", args.input.display());
    println!("Output: {}", args.output.display());
    println!("Mask:   {}", scan_restore::mask_path_for(&args.output).display());
    println!();
    println!("Pipeline Configuration:");
    println!(
        "  1. Denoise: median {}x{}",
        config.median_ksize, config.median_ksize
    );
    println!(
        "  2. Detect: median {}, ellipse {}, threshold {}",
        detection.median_ksize, detection.morph_selem_size, detection.threshold
    );
    println!(
        "     Components: min size {}, max area ratio {}, thinness < {}",
        detection.min_size, detection.max_blob_area_ratio, detection.keep_thinness_ratio
    );
    println!("     Mask dilation: {} iteration(s)", detection.dilate_iters);
    println!(
        "  3. Inpaint: {} with radii {:?}",
        config.inpaint.method, config.inpaint.radii
    );
    println!();
    println!("Show preview: {}", if args.show { "YES" } else { "NO" });
}

// ============ Info Command ============

fn run_info(args: &InfoArgs) -> anyhow::Result<()> {
    println!("scan-restore v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("Config File Locations:");
    for path in Config::search_paths() {
        let status = if path.is_file() { "found" } else { "not found" };
        println!("  {} ({})", path.display(), status);
    }

    let config = match &args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    println!();
    println!("Active Parameters:");
    for line in config.to_toml()?.lines() {
        println!("  {}", line);
    }

    println!();
    println!("Preview Viewer:");
    match preview::find_viewer() {
        Some(path) => println!("  {} (found)", path.display()),
        None => println!("  Not found"),
    }

    Ok(())
}
