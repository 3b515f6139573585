//! Pipeline orchestration: title reconciliation, catalog cross-checks, image
//! processing, and JSON manifest emission.
//!
//! The flat output folder is derived state and is reconciled incrementally:
//! files no longer backed by a source folder are deleted, files already
//! processed on a previous run are skipped. Per-file decode, crop, and
//! transcode failures are collected in the report; they never abort the
//! batch.

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use log::{info, warn};
use serde::Serialize;

use crate::catalog::{self, EpisodeCode};
use crate::config::AssembleConfig;
use crate::crop::{CropStrategy, crop_borders, crop_to_size};
use crate::error::{AssembleError, Result};
use crate::titles;
use crate::transcode::Transcoder;

/// A source image that could not be processed. Advisory; the batch continues.
#[derive(Debug, Clone)]
pub struct FileFailure {
    pub episode: EpisodeCode,
    pub filename: String,
    pub reason: String,
}

/// Two episodes contributed the same bare filename to the flat output folder.
/// The later write wins, as published datasets relied on.
#[derive(Debug, Clone)]
pub struct Collision {
    pub filename: String,
    pub first: EpisodeCode,
    pub second: EpisodeCode,
}

/// Outcome of one assembler run.
#[derive(Debug)]
pub struct AssembleReport {
    /// EpisodeCode -> image filenames, the shape of `image-list.json`.
    pub manifest: BTreeMap<EpisodeCode, Vec<String>>,
    /// Reverse lookup, filename -> origin episode.
    pub origins: BTreeMap<String, EpisodeCode>,
    /// SeasonKey -> episode codes, the shape of `season-keys.json`.
    pub season_manifest: BTreeMap<String, Vec<EpisodeCode>>,
    /// Language -> codes missing from that language's title file. Non-empty
    /// means `episode-titles.json` was withheld this run.
    pub missing_titles: BTreeMap<String, Vec<EpisodeCode>>,
    pub titles_written: bool,
    pub processed: usize,
    pub skipped: usize,
    /// Orphaned files deleted from the output folder.
    pub removed: Vec<String>,
    /// Files re-cropped to the average dimensions.
    pub resized: Vec<String>,
    pub collisions: Vec<Collision>,
    pub file_failures: Vec<FileFailure>,
}

/// Run the full pipeline described by `config`.
///
/// Fatal conditions ([`AssembleError::PrimaryTitlesMissing`],
/// [`AssembleError::MissingFolders`]) abort before any image manifest is
/// written; everything advisory lands in the returned report.
pub fn assemble(config: &AssembleConfig, transcoder: &dyn Transcoder) -> Result<AssembleReport> {
    let fixed = titles::fix_mojibake(&config.titles_root)?;
    if fixed > 0 {
        info!("rewrote mis-decoded apostrophes in {fixed} title file(s)");
    }

    let book = titles::load_titles(&config.titles_root, &config.primary_language)?;
    let episode_codes = catalog::scan_episode_folders(&config.screenshot_root)?;
    info!(
        "found {} episode folders under {}",
        episode_codes.len(),
        config.screenshot_root.display()
    );

    let missing_folders = catalog::missing_folders(book.primary_table(), &episode_codes);
    if !missing_folders.is_empty() {
        return Err(AssembleError::MissingFolders(missing_folders));
    }

    let missing_titles = book.missing_titles(&episode_codes);
    let titles_written = missing_titles.is_empty();
    if titles_written {
        write_json(&config.episode_titles_path, book.tables())?;
        info!(
            "episode titles written to {}",
            config.episode_titles_path.display()
        );
    } else {
        for (language, codes) in &missing_titles {
            warn!("missing titles for {language}: {}", codes_list(codes));
        }
        warn!("title manifest withheld until every language file is complete");
    }

    let season_manifest = catalog::season_manifest(&episode_codes);
    write_json(&config.season_keys_path, &season_manifest)?;
    info!(
        "season keys written to {}",
        config.season_keys_path.display()
    );

    let mut file_failures = Vec::new();

    // Normalize formats first so the source listing below only sees jpg/png.
    for code in &episode_codes {
        let folder = config.screenshot_root.join(code.as_str());
        for name in sorted_file_names(&folder)? {
            if !has_extension(&name, &["webp"]) {
                continue;
            }
            let src = folder.join(&name);
            match transcoder.webp_to_jpg(&src, &src.with_extension("jpg")) {
                Ok(()) => fs::remove_file(&src)?,
                Err(err) => {
                    warn!("transcode failed for {code}/{name}: {err}");
                    file_failures.push(FileFailure {
                        episode: code.clone(),
                        filename: name,
                        reason: err.to_string(),
                    });
                }
            }
        }
    }

    // Everything currently present across all source folders.
    let mut source_names = BTreeSet::new();
    for code in &episode_codes {
        for name in sorted_file_names(&config.screenshot_root.join(code.as_str()))? {
            if is_image_name(&name) {
                source_names.insert(name);
            }
        }
    }

    // Reconcile the output folder against the sources.
    let mut already_processed = BTreeSet::new();
    let mut removed = Vec::new();
    if config.output_root.exists() {
        for name in sorted_file_names(&config.output_root)? {
            if source_names.contains(&name) {
                already_processed.insert(name);
            } else {
                fs::remove_file(config.output_root.join(&name))?;
                removed.push(name);
            }
        }
    } else {
        fs::create_dir_all(&config.output_root)?;
    }
    if !removed.is_empty() {
        info!(
            "removed {} orphaned file(s) from {}",
            removed.len(),
            config.output_root.display()
        );
    }

    let mut manifest: BTreeMap<EpisodeCode, Vec<String>> = BTreeMap::new();
    let mut origins: BTreeMap<String, EpisodeCode> = BTreeMap::new();
    let mut collisions = Vec::new();
    let mut processed = 0usize;
    let mut skipped = 0usize;

    for code in &episode_codes {
        let folder = config.screenshot_root.join(code.as_str());
        let episode_images = manifest.entry(code.clone()).or_default();
        let mut announced = false;
        for name in sorted_file_names(&folder)? {
            if !is_image_name(&name) {
                continue;
            }
            episode_images.push(name.clone());
            if let Some(first) = origins.get(&name) {
                warn!("duplicate filename '{name}' in {first} and {code}; last write wins");
                collisions.push(Collision {
                    filename: name.clone(),
                    first: first.clone(),
                    second: code.clone(),
                });
            }
            origins.insert(name.clone(), code.clone());

            if already_processed.contains(&name) {
                skipped += 1;
                continue;
            }
            if !announced {
                info!("converting images for '{code}'");
                announced = true;
            }

            match process_image(
                &folder.join(&name),
                &config.output_root.join(&name),
                &config.crop,
            ) {
                Ok(()) => processed += 1,
                Err(reason) => {
                    warn!("failed to process {code}/{name}: {reason}");
                    file_failures.push(FileFailure {
                        episode: code.clone(),
                        filename: name,
                        reason,
                    });
                }
            }
        }
    }

    write_json(&config.image_list_path, &manifest)?;
    info!("image list written to {}", config.image_list_path.display());

    let resized = if config.normalize_dimensions {
        normalize_dimensions(config, &origins, &mut file_failures)?
    } else {
        Vec::new()
    };

    Ok(AssembleReport {
        manifest,
        origins,
        season_manifest,
        missing_titles,
        titles_written,
        processed,
        skipped,
        removed,
        resized,
        collisions,
        file_failures,
    })
}

/// Decode, crop, and write one image. Reasons come back as strings; the
/// caller records them against the episode and filename.
fn process_image(
    src: &Path,
    dst: &Path,
    strategy: &CropStrategy,
) -> std::result::Result<(), String> {
    let image = image::open(src).map_err(|e| e.to_string())?.to_rgb8();
    let cropped = crop_borders(&image, strategy);
    if cropped.width() == 0 || cropped.height() == 0 {
        return Err("empty after border crop (pure letterbox frame)".to_string());
    }
    cropped.save(dst).map_err(|e| e.to_string())
}

/// Re-crop every output image whose dimensions stray more than the tolerance
/// from the dataset average, pulling fresh pixels from the source folder via
/// the reverse lookup.
fn normalize_dimensions(
    config: &AssembleConfig,
    origins: &BTreeMap<String, EpisodeCode>,
    file_failures: &mut Vec<FileFailure>,
) -> Result<Vec<String>> {
    let mut dims = Vec::new();
    for name in sorted_file_names(&config.output_root)? {
        // Reads only the header, not the pixel data.
        if let Ok((width, height)) = image::image_dimensions(config.output_root.join(&name)) {
            dims.push((name, width, height));
        }
    }
    if dims.is_empty() {
        return Ok(Vec::new());
    }

    let count = dims.len() as u64;
    let average_width = (dims.iter().map(|&(_, w, _)| w as u64).sum::<u64>() / count) as u32;
    let average_height = (dims.iter().map(|&(_, _, h)| h as u64).sum::<u64>() / count) as u32;

    let mut resized = Vec::new();
    for (name, width, height) in dims {
        if width.abs_diff(average_width) <= config.dimension_tolerance
            && height.abs_diff(average_height) <= config.dimension_tolerance
        {
            continue;
        }
        let Some(origin) = origins.get(&name) else {
            continue;
        };
        let source = config.screenshot_root.join(origin.as_str()).join(&name);
        match recrop(
            &source,
            &config.output_root.join(&name),
            average_width,
            average_height,
        ) {
            Ok(()) => {
                info!("re-cropped '{origin}/{name}' to {average_width}x{average_height}");
                resized.push(name);
            }
            Err(reason) => {
                warn!("failed to re-crop {origin}/{name}: {reason}");
                file_failures.push(FileFailure {
                    episode: origin.clone(),
                    filename: name,
                    reason,
                });
            }
        }
    }
    Ok(resized)
}

fn recrop(
    src: &Path,
    dst: &Path,
    width: u32,
    height: u32,
) -> std::result::Result<(), String> {
    let image = image::open(src).map_err(|e| e.to_string())?.to_rgb8();
    crop_to_size(&image, width, height)
        .save(dst)
        .map_err(|e| e.to_string())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn sorted_file_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

fn is_image_name(name: &str) -> bool {
    has_extension(name, &["jpg", "jpeg", "png"])
}

fn has_extension(name: &str, extensions: &[&str]) -> bool {
    Path::new(name)
        .extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            extensions.contains(&ext.as_str())
        })
}

fn codes_list(codes: &[EpisodeCode]) -> String {
    codes
        .iter()
        .map(EpisodeCode::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
