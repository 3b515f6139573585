//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::crop::CropStrategy;
use crate::transcode::MagickTranscoder;

/// Everything one run of the assembler needs to know. Built from CLI
/// arguments in the binary; tests construct it directly.
#[derive(Debug, Clone)]
pub struct AssembleConfig {
    /// Folder containing one subfolder of screenshots per episode code.
    pub screenshot_root: PathBuf,
    /// Folder containing per-language `.txt` title files.
    pub titles_root: PathBuf,
    /// Flat folder receiving the processed images. Treated as derived state.
    pub output_root: PathBuf,
    pub episode_titles_path: PathBuf,
    pub image_list_path: PathBuf,
    pub season_keys_path: PathBuf,
    /// Language used as the join key for composite titles.
    pub primary_language: String,
    pub crop: CropStrategy,
    /// Re-crop outliers toward the average output dimensions afterwards.
    pub normalize_dimensions: bool,
    /// Pixels of width/height deviation from the average before an image
    /// counts as an outlier.
    pub dimension_tolerance: u32,
    pub transcode_timeout: Duration,
}

impl AssembleConfig {
    /// Configuration for the conventional site layout: the processed images
    /// land in `<site_root>/randomframes` and the three JSON manifests sit
    /// next to it.
    pub fn new(
        screenshot_root: impl Into<PathBuf>,
        titles_root: impl Into<PathBuf>,
        site_root: impl Into<PathBuf>,
    ) -> Self {
        let site_root = site_root.into();
        Self {
            screenshot_root: screenshot_root.into(),
            titles_root: titles_root.into(),
            output_root: site_root.join("randomframes"),
            episode_titles_path: site_root.join("episode-titles.json"),
            image_list_path: site_root.join("image-list.json"),
            season_keys_path: site_root.join("season-keys.json"),
            primary_language: "English".to_string(),
            crop: CropStrategy::default(),
            normalize_dimensions: true,
            dimension_tolerance: 15,
            transcode_timeout: MagickTranscoder::DEFAULT_TIMEOUT,
        }
    }
}
