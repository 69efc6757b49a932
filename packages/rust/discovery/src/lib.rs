//! Input-file discovery for folio conversion runs.
//!
//! Walks the input directory for files with the configured extension and
//! orders them the way people number chapter files: by the first integer in
//! the file name, falling back to lexicographic name order. Each discovered
//! file becomes one chapter downstream.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use folio_shared::{FolioError, Result};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One input file selected for conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Absolute or caller-relative path to the file.
    pub path: PathBuf,
    /// First integer found in the file name, used as the primary sort key.
    pub index_hint: Option<u64>,
}

/// Configuration for input-file discovery.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Extension to match (with or without the leading dot), case-insensitive.
    pub extension: String,
    /// Whether to descend into subdirectories.
    pub recurse: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            extension: "txt".into(),
            recurse: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Discover input files under `dir`.
///
/// Returns the matching files in deterministic chapter order: files whose
/// names carry a number come first (sorted by that number, then by name),
/// the rest follow sorted by name. Zero matches is an error — a run with
/// no input must not silently produce an empty document.
#[instrument(skip_all, fields(dir = %dir.display(), recurse = opts.recurse))]
pub fn discover(dir: &Path, opts: &DiscoveryOptions) -> Result<Vec<DiscoveredFile>> {
    let extension = opts.extension.trim_start_matches('.').to_ascii_lowercase();

    if !dir.is_dir() {
        return Err(FolioError::validation(format!(
            "input path is not a directory: {}",
            dir.display()
        )));
    }

    let max_depth = if opts.recurse { usize::MAX } else { 1 };

    let mut files: Vec<DiscoveredFile> = Vec::new();
    for entry in WalkDir::new(dir).max_depth(max_depth).follow_links(false) {
        let entry = entry.map_err(|e| FolioError::io(dir, std::io::Error::other(e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&extension));
        if !matches {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        debug!(file = %name, "matched input file");
        files.push(DiscoveredFile {
            index_hint: first_number(&name),
            path: path.to_path_buf(),
        });
    }

    if files.is_empty() {
        return Err(FolioError::EmptyInputSet {
            dir: dir.to_path_buf(),
            extension,
        });
    }

    files.sort_by(|a, b| {
        let a_key = a.index_hint.unwrap_or(u64::MAX);
        let b_key = b.index_hint.unwrap_or(u64::MAX);
        a_key.cmp(&b_key).then_with(|| a.path.cmp(&b.path))
    });

    info!(count = files.len(), "discovered input files");
    Ok(files)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Extract the first run of digits in a file name as an integer.
///
/// Runs longer than 12 digits are truncated before parsing so absurd names
/// still sort deterministically instead of overflowing.
fn first_number(name: &str) -> Option<u64> {
    static NUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

    let m = NUM_RE.find(name)?;
    let digits = &m.as_str()[..m.len().min(12)];
    digits.parse::<u64>().ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("folio-discovery-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), "content").unwrap();
    }

    #[test]
    fn first_number_extraction() {
        assert_eq!(first_number("chapter_12_notes.txt"), Some(12));
        assert_eq!(first_number("003.txt"), Some(3));
        assert_eq!(first_number("preface.txt"), None);
    }

    #[test]
    fn discover_orders_by_leading_number() {
        let tmp = temp_dir();
        touch(&tmp, "10_late.txt");
        touch(&tmp, "2_early.txt");
        touch(&tmp, "appendix.txt");

        let files = discover(&tmp, &DiscoveryOptions::default()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["2_early.txt", "10_late.txt", "appendix.txt"]);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn discover_extension_is_case_insensitive() {
        let tmp = temp_dir();
        touch(&tmp, "one.TXT");
        touch(&tmp, "two.txt");
        touch(&tmp, "skip.md");

        let files = discover(&tmp, &DiscoveryOptions::default()).unwrap();
        assert_eq!(files.len(), 2);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn discover_respects_recurse_flag() {
        let tmp = temp_dir();
        touch(&tmp, "top.txt");
        std::fs::create_dir_all(tmp.join("nested")).unwrap();
        touch(&tmp.join("nested"), "deep.txt");

        let flat = discover(&tmp, &DiscoveryOptions::default()).unwrap();
        assert_eq!(flat.len(), 1);

        let deep = discover(
            &tmp,
            &DiscoveryOptions {
                recurse: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(deep.len(), 2);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn discover_empty_directory_is_an_error() {
        let tmp = temp_dir();
        touch(&tmp, "only.md");

        let err = discover(&tmp, &DiscoveryOptions::default()).unwrap_err();
        assert!(matches!(err, FolioError::EmptyInputSet { .. }));
        assert!(err.to_string().contains(".txt"));

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
