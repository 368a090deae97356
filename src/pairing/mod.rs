/// Pairing engine
///
/// This module turns a directory of loose image files into a sorted list of
/// `Pair`s: one entry per capture, grouping the full-quality JPEG with its
/// RAW sibling by shared base name. The scan is read-only and never touches
/// the filesystem beyond enumeration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

/// Extensions considered the full-quality/preview side of a pair
pub const PRIMARY_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// Extensions considered the raw/original side of a pair
pub const SECONDARY_EXTENSIONS: &[&str] = &["cr2", "cr3"];

/// Errors raised while scanning a directory for pairs
#[derive(Debug, Error)]
pub enum ScanError {
    /// The path does not exist or is not a directory
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    /// The directory exists but could not be enumerated
    #[error("failed to read directory {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: walkdir::Error,
    },
}

/// One photographic capture and its on-disk files.
///
/// At least one of `primary_path`/`secondary_path` is always present:
/// the scanner only produces a `Pair` once a recognized file is seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    /// Filename minus extension, unique within the scanned directory
    pub base_name: String,
    /// Full-quality file (JPEG), if present
    pub primary_path: Option<PathBuf>,
    /// RAW sibling (CR2/CR3), if present
    pub secondary_path: Option<PathBuf>,
}

impl Pair {
    fn new(base_name: String) -> Self {
        Pair {
            base_name,
            primary_path: None,
            secondary_path: None,
        }
    }

    /// True if the primary file is recorded and still exists on disk
    pub fn has_primary(&self) -> bool {
        self.primary_path.as_deref().is_some_and(Path::exists)
    }

    /// True if the raw file is recorded and still exists on disk
    pub fn has_raw(&self) -> bool {
        self.secondary_path.as_deref().is_some_and(Path::exists)
    }

    /// Both files gone from disk; the pair no longer has anything to act on
    pub fn is_gone(&self) -> bool {
        !self.has_primary() && !self.has_raw()
    }

    /// Path to show in a preview, preferring the JPEG
    pub fn display_path(&self) -> Option<&Path> {
        if self.has_primary() {
            self.primary_path.as_deref()
        } else if self.has_raw() {
            self.secondary_path.as_deref()
        } else {
            None
        }
    }

    /// Short status label for UI display
    pub fn file_status(&self) -> &'static str {
        match (self.has_primary(), self.has_raw()) {
            (true, true) => "JPEG + RAW",
            (true, false) => "JPEG only",
            (false, true) => "RAW only",
            (false, false) => "No files",
        }
    }
}

/// Scan a directory and group its files into pairs.
///
/// Files whose extension is not in [`PRIMARY_EXTENSIONS`] or
/// [`SECONDARY_EXTENSIONS`] are ignored. Each recognized file lands in
/// exactly one pair. The result is sorted by base name using natural
/// ordering, so `IMG_9` comes before `IMG_10`.
///
/// Returns an empty Vec for a readable directory with no recognized files;
/// a missing or unreadable directory is a [`ScanError`].
pub fn scan_directory(path: &Path) -> Result<Vec<Pair>, ScanError> {
    if !path.is_dir() {
        return Err(ScanError::NotADirectory(path.to_path_buf()));
    }

    let mut groups: BTreeMap<String, Pair> = BTreeMap::new();

    // Top-level only: a shoot directory is flat, subdirectories are not ours
    for entry in WalkDir::new(path).max_depth(1).follow_links(true) {
        let entry = entry.map_err(|e| ScanError::Unreadable {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file_path = entry.path();
        if !file_path.is_file() {
            continue;
        }

        let (Some(stem), Some(extension)) = (file_path.file_stem(), file_path.extension()) else {
            continue;
        };
        let ext = extension.to_string_lossy().to_lowercase();
        let base_name = stem.to_string_lossy().to_string();

        if PRIMARY_EXTENSIONS.contains(&ext.as_str()) {
            groups
                .entry(base_name.clone())
                .or_insert_with(|| Pair::new(base_name))
                .primary_path = Some(file_path.to_path_buf());
        } else if SECONDARY_EXTENSIONS.contains(&ext.as_str()) {
            groups
                .entry(base_name.clone())
                .or_insert_with(|| Pair::new(base_name))
                .secondary_path = Some(file_path.to_path_buf());
        }
    }

    let mut pairs: Vec<Pair> = groups.into_values().collect();
    pairs.sort_by(|a, b| natord::compare(&a.base_name, &b.base_name));
    Ok(pairs)
}
