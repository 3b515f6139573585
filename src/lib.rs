//! # screenshot_assembler
//!
//! Assembles the static dataset behind the fan site: it discovers episode
//! screenshot folders, normalizes image formats, crops black border bars,
//! reconciles multi-language episode titles, and emits the JSON manifests the
//! front end consumes (`episode-titles.json`, `image-list.json`,
//! `season-keys.json`) plus a flat folder of processed frames.
//!
//! The pipeline is a synchronous batch: one call to [`assemble`] runs every
//! stage against the configured roots. Fatal preconditions (primary title
//! file missing, screenshot folder missing for a published title) abort the
//! run before the image manifests are written; everything advisory — missing
//! translations, per-file decode failures, filename collisions — lands in the
//! returned [`AssembleReport`].

pub mod assemble;
pub mod catalog;
pub mod config;
pub mod crop;
pub mod error;
pub mod titles;
pub mod transcode;

pub use assemble::{AssembleReport, Collision, FileFailure, assemble};
pub use catalog::EpisodeCode;
pub use config::AssembleConfig;
pub use crop::{CropStrategy, crop_borders, crop_to_size};
pub use error::{AssembleError, Result};
pub use titles::{TitleBook, fix_mojibake, load_titles};
pub use transcode::{MagickTranscoder, TranscodeError, Transcoder};
