//! Episode discovery and season grouping.
//!
//! Episode codes are exactly the immediate subdirectory names of the
//! screenshot root (`S01E01P1`, `S01E01P2`, ...). The catalog cross-checks
//! them against the loaded title tables before anything is published.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;

/// Episode identifier of the form `S<season>E<episode>P<part>`, assigned from
/// a screenshot folder name and used as the key in every manifest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EpisodeCode(String);

impl EpisodeCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Season prefix, the first three characters (`S01E01P1` -> `S01`).
    pub fn season_key(&self) -> &str {
        self.0.get(..3).unwrap_or(&self.0)
    }
}

impl fmt::Display for EpisodeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EpisodeCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

/// Enumerate the episode-code subfolders of `screenshot_root`, sorted for a
/// deterministic manifest order.
pub fn scan_episode_folders(screenshot_root: &Path) -> Result<Vec<EpisodeCode>> {
    let mut codes = Vec::new();
    for entry in fs::read_dir(screenshot_root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            codes.push(EpisodeCode::new(name));
        }
    }
    codes.sort();
    Ok(codes)
}

/// Group episode codes under their 3-character season prefix, preserving the
/// catalog order within each group.
pub fn season_manifest(codes: &[EpisodeCode]) -> BTreeMap<String, Vec<EpisodeCode>> {
    let mut seasons: BTreeMap<String, Vec<EpisodeCode>> = BTreeMap::new();
    for code in codes {
        seasons
            .entry(code.season_key().to_string())
            .or_default()
            .push(code.clone());
    }
    seasons
}

/// Codes present in the primary-language title table but absent as screenshot
/// folders. Any hit here is fatal for the run.
pub fn missing_folders(
    primary_titles: &BTreeMap<EpisodeCode, String>,
    codes: &[EpisodeCode],
) -> Vec<EpisodeCode> {
    primary_titles
        .keys()
        .filter(|code| !codes.contains(code))
        .cloned()
        .collect()
}
