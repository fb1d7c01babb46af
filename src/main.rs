//! imgcompress CLI - parallel batch image resizer
//!
//! Resizes every JPEG and PNG in a directory by percentage, width or height
//! and re-encodes it with the requested quality.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use console::style;
use tracing::{debug, info};

use imgcompress::config::{DEFAULT_QUALITY, DEFAULT_SIZE_FACTOR};
use imgcompress::{init_logging, Config, ImageCrateCodec, RunCoordinator, RunOptions};

/// imgcompress - parallel batch image resizer
#[derive(Parser, Debug)]
#[command(
    name = "imgcompress",
    version,
    about = "Resize and re-encode a directory of JPEG and PNG images in parallel",
    long_about = "Resizes every .jpg, .jpeg and .png file in --imgdir by percentage, width or \
                  height (aspect ratio preserved) and writes <name>_<size>_<quality>.<ext> \
                  into --outdir. Only one of --size-factor, --width and --height may be given."
)]
struct Cli {
    /// Directory containing the source images
    #[arg(long, value_name = "DIR")]
    imgdir: Option<PathBuf>,

    /// Directory to write resized images to (created if missing)
    #[arg(long, value_name = "DIR")]
    outdir: Option<PathBuf>,

    /// Output quality (1-100) [default: 100]
    #[arg(long, value_name = "QUALITY", allow_negative_numbers = true)]
    quality: Option<i64>,

    /// Resize by percentage of the original size
    #[arg(long, value_name = "PERCENT", default_value_t = DEFAULT_SIZE_FACTOR, allow_negative_numbers = true)]
    size_factor: i64,

    /// Resize to this width in pixels, keeping aspect ratio
    #[arg(long, value_name = "PIXELS", default_value_t = 0, allow_negative_numbers = true)]
    width: i64,

    /// Resize to this height in pixels, keeping aspect ratio
    #[arg(long, value_name = "PIXELS", default_value_t = 0, allow_negative_numbers = true)]
    height: i64,

    /// Only process the file with exactly this name
    #[arg(long, value_name = "FILE")]
    imgname: Option<String>,

    /// Number of worker threads [default: CPU cores, minus 2 when there are more than 7 cores and at least that many images]
    #[arg(long, value_name = "COUNT", allow_negative_numbers = true)]
    threads: Option<i64>,

    /// Configuration file path (.toml or .yaml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,

    /// Do not draw the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", style("Error").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };

    let mut logging = config.logging.clone();
    if cli.quiet {
        logging.level = "error".to_string();
    } else if cli.verbose {
        logging.level = "debug".to_string();
    }
    init_logging(&logging);

    if let Some(path) = &cli.config {
        info!("Loaded configuration from: {:?}", path);
    }

    // Flags win over the config file, which wins over built-in defaults
    let quality = cli
        .quality
        .or_else(|| config.processing.quality.map(i64::from))
        .unwrap_or_else(|| i64::from(DEFAULT_QUALITY));
    let threads = cli.threads.or_else(|| {
        config
            .processing
            .threads
            .map(|threads| i64::try_from(threads).unwrap_or(i64::MAX))
    });

    let options = RunOptions {
        input_dir: cli.imgdir,
        output_dir: cli.outdir,
        quality,
        size_factor: cli.size_factor,
        width: cli.width,
        height: cli.height,
        image_name: cli.imgname,
        threads,
    };
    debug!("Run options: {:?}", options);

    let show_progress = !(cli.json || cli.no_progress || cli.quiet);
    let coordinator = RunCoordinator::new(ImageCrateCodec::new())
        .with_monitor(config.monitor.clone())
        .show_progress(show_progress);

    let result = coordinator
        .run(&options)
        .map_err(|e| anyhow::Error::msg(e.user_message()))?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialize run summary")?
        );
    } else if !cli.quiet {
        result.print_summary();
    }

    Ok(())
}
