//! Multi-language episode title reconciliation.
//!
//! Title files are plain text, one `EpisodeCode: Title` line per episode, and
//! the filename stem is the language code (`English.txt`, `German.txt`). The
//! primary language is mandatory: it is the join key for the composite
//! `<lang>-<primary>` tables the site shows as "translated" titles.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use crate::catalog::EpisodeCode;
use crate::error::{AssembleError, Result};

/// The UTF-8 bytes of a right single quote read back through cp1252, as some
/// exported title files arrive.
const MISDECODED_APOSTROPHE: &str = "â€™";

/// Per-language title tables, composite tables included.
#[derive(Debug, Clone)]
pub struct TitleBook {
    primary_language: String,
    tables: BTreeMap<String, BTreeMap<EpisodeCode, String>>,
}

impl TitleBook {
    pub fn primary_language(&self) -> &str {
        &self.primary_language
    }

    /// All tables keyed by language code, including the `<lang>-<primary>`
    /// composite entries. This is the shape of `episode-titles.json`.
    pub fn tables(&self) -> &BTreeMap<String, BTreeMap<EpisodeCode, String>> {
        &self.tables
    }

    pub fn primary_table(&self) -> &BTreeMap<EpisodeCode, String> {
        // Present by construction: load_titles refuses to build a book
        // without the primary language file.
        &self.tables[&self.primary_language]
    }

    /// Codes present as screenshot folders but absent from a language's
    /// table, keyed by language. Composite tables are skipped; they only
    /// mirror the per-language files. An empty map means every language is
    /// complete and the title manifest may be published.
    pub fn missing_titles(&self, codes: &[EpisodeCode]) -> BTreeMap<String, Vec<EpisodeCode>> {
        let composite_suffix = format!("-{}", self.primary_language);
        let mut missing = BTreeMap::new();
        for (language, table) in &self.tables {
            if language.ends_with(&composite_suffix) {
                continue;
            }
            let absent: Vec<EpisodeCode> = codes
                .iter()
                .filter(|code| !table.contains_key(*code))
                .cloned()
                .collect();
            if !absent.is_empty() {
                missing.insert(language.clone(), absent);
            }
        }
        missing
    }
}

/// Rewrite the mis-decoded right single quote to a plain apostrophe in every
/// `.txt` file under `titles_root`, in place. Returns how many files changed.
pub fn fix_mojibake(titles_root: &Path) -> Result<usize> {
    let mut fixed = 0;
    for entry in fs::read_dir(titles_root)? {
        let path = entry?.path();
        if path.extension().and_then(OsStr::to_str) != Some("txt") {
            continue;
        }
        let text = fs::read_to_string(&path)?;
        if text.contains(MISDECODED_APOSTROPHE) {
            fs::write(&path, text.replace(MISDECODED_APOSTROPHE, "'"))?;
            fixed += 1;
        }
    }
    Ok(fixed)
}

/// Load every `.txt` title file under `titles_root` and build the per-language
/// and composite tables.
///
/// The composite table for a language holds
/// `"{local line} ({primary title without the 'Code: ' prefix})"` for codes
/// known to both languages. Codes the primary language lacks pass through
/// with the local line only (lenient policy, recognizable by the absence of
/// parentheses), so partial translations lose nothing.
///
/// Fails with [`AssembleError::PrimaryTitlesMissing`] when the primary
/// language file is absent.
pub fn load_titles(titles_root: &Path, primary_language: &str) -> Result<TitleBook> {
    let primary_path = titles_root.join(format!("{primary_language}.txt"));
    if !primary_path.is_file() {
        return Err(AssembleError::PrimaryTitlesMissing { path: primary_path });
    }
    let primary = parse_title_file(&primary_path)?;

    let mut tables = BTreeMap::new();
    for entry in fs::read_dir(titles_root)? {
        let path = entry?.path();
        if path.extension().and_then(OsStr::to_str) != Some("txt") {
            continue;
        }
        let Some(language) = path.file_stem().and_then(OsStr::to_str) else {
            continue;
        };
        if language == primary_language {
            continue;
        }

        let local = parse_title_file(&path)?;
        let mut composite = BTreeMap::new();
        for (code, line) in &local {
            let entry = match primary.get(code) {
                Some(primary_line) => {
                    format!("{line} ({})", strip_code_prefix(primary_line))
                }
                None => line.clone(),
            };
            composite.insert(code.clone(), entry);
        }

        tables.insert(format!("{language}-{primary_language}"), composite);
        tables.insert(language.to_string(), local);
    }
    tables.insert(primary_language.to_string(), primary);

    Ok(TitleBook {
        primary_language: primary_language.to_string(),
        tables,
    })
}

/// Drop the leading `Code: ` prefix from a stored title line.
fn strip_code_prefix(line: &str) -> &str {
    line.split_once(": ").map(|(_, rest)| rest.trim()).unwrap_or(line)
}

fn parse_title_file(path: &Path) -> Result<BTreeMap<EpisodeCode, String>> {
    let text = fs::read_to_string(path)?;
    let mut table = BTreeMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        // Colon-delimited is the primary format; older exports used a single
        // space between code and title.
        let code = match line.split_once(':') {
            Some((code, _)) => code.trim(),
            None => line.split_whitespace().next().unwrap_or(line),
        };
        table.insert(EpisodeCode::new(code), line.to_string());
    }
    Ok(table)
}
