use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use screenshot_assembler::{
    AssembleConfig, AssembleError, CropStrategy, MagickTranscoder, assemble,
};

#[derive(Parser, Debug)]
#[command(
    name = "assemble-data",
    about = "Assemble cropped screenshots and JSON manifests for the website",
    version
)]
struct Cli {
    /// Folder containing per-episode screenshot subfolders (S01E01P1, ...)
    #[arg(short = 's', long = "screenshots")]
    screenshots: PathBuf,

    /// Folder containing per-language title .txt files
    #[arg(short = 't', long = "titles")]
    titles: PathBuf,

    /// Website root; receives randomframes/ and the three JSON manifests
    #[arg(short = 'o', long = "site")]
    site: PathBuf,

    /// Language used as the join key for composite titles
    #[arg(long, default_value = "English")]
    primary_language: String,

    /// Border detection strategy
    #[arg(long, value_enum, default_value = "column-scan")]
    crop: CropMode,

    /// Grayscale intensity at or below which a column counts as black bar
    /// (column-scan strategy)
    #[arg(long, default_value_t = CropStrategy::DEFAULT_TOLERANCE)]
    border_tolerance: u8,

    /// Skip re-cropping outlier images to the average output dimensions
    #[arg(long)]
    skip_normalize: bool,

    /// Per-file timeout for webp transcoding, in seconds
    #[arg(long, default_value_t = 30)]
    transcode_timeout: u64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CropMode {
    /// Scan columns inward while they are uniformly black
    ColumnScan,
    /// Otsu-binarized mask with a per-column mean cutoff
    ThresholdMask,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if !cli.screenshots.is_dir() {
        eprintln!("Not a directory: {}", cli.screenshots.display());
        return ExitCode::FAILURE;
    }
    if !cli.titles.is_dir() {
        eprintln!("Not a directory: {}", cli.titles.display());
        return ExitCode::FAILURE;
    }

    let mut config = AssembleConfig::new(cli.screenshots, cli.titles, cli.site);
    config.primary_language = cli.primary_language;
    config.normalize_dimensions = !cli.skip_normalize;
    config.transcode_timeout = Duration::from_secs(cli.transcode_timeout);
    config.crop = match cli.crop {
        CropMode::ColumnScan => CropStrategy::ColumnScan {
            tolerance: cli.border_tolerance,
        },
        CropMode::ThresholdMask => CropStrategy::threshold_mask(),
    };

    let transcoder = MagickTranscoder::new(config.transcode_timeout);
    let report = match assemble(&config, &transcoder) {
        Ok(report) => report,
        Err(err @ AssembleError::PrimaryTitlesMissing { .. }) => {
            eprintln!("{err}");
            eprintln!("Rename the file to match the primary language code and run again.");
            return ExitCode::FAILURE;
        }
        Err(err @ AssembleError::MissingFolders(_)) => {
            eprintln!("{err}");
            eprintln!("Add the missing folders to the screenshot folder and run again.");
            return ExitCode::FAILURE;
        }
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    println!(
        "Processed {} image(s), skipped {} already converted, removed {} orphan(s).",
        report.processed,
        report.skipped,
        report.removed.len()
    );
    if !report.resized.is_empty() {
        println!("Re-cropped {} outlier(s) to the average dimensions.", report.resized.len());
    }
    for failure in &report.file_failures {
        eprintln!(
            "Failed: {}/{}: {}",
            failure.episode, failure.filename, failure.reason
        );
    }
    for collision in &report.collisions {
        eprintln!(
            "Duplicate filename '{}' in {} and {}",
            collision.filename, collision.first, collision.second
        );
    }
    if !report.titles_written {
        for (language, codes) in &report.missing_titles {
            eprintln!(
                "Missing titles for {language}: {}",
                codes
                    .iter()
                    .map(|c| c.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        eprintln!("Add the missing titles to the language files and run again.");
    }

    ExitCode::SUCCESS
}
