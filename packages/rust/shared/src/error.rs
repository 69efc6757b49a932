//! Error types for folio.
//!
//! Library crates use [`FolioError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all folio operations.
#[derive(Debug, thiserror::Error)]
pub enum FolioError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// No input files matched the discovery criteria.
    #[error("no input files with extension '.{extension}' found in {dir:?}")]
    EmptyInputSet { dir: PathBuf, extension: String },

    /// No word-embedding source could be obtained (path missing and no
    /// fetchable model configured). Distinct from low coverage, which is
    /// a logged degradation, not an error.
    #[error("embedding model unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Paragraph segmentation failed in a way the fallbacks cannot absorb.
    #[error("segmentation error: {0}")]
    Segmentation(String),

    /// The planned document exceeds the configured page ceiling.
    #[error(
        "planned document too large: estimated {estimated_pages} pages exceeds the \
         limit of {max_pages} (split the input into smaller batches)"
    )]
    PlanTooLarge {
        estimated_pages: u32,
        max_pages: u32,
    },

    /// A specific chapter's content could not be rendered. Aborts the run.
    #[error("failed to render chapter from {source_path:?}: {message}")]
    ChapterRenderFailure {
        source_path: PathBuf,
        message: String,
    },

    /// Low-level page drawing error not attributable to one chapter.
    #[error("render error: {0}")]
    Render(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (malformed model file, bad option values, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The run was cancelled at a chapter boundary.
    #[error("run cancelled")]
    Cancelled,
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FolioError>;

impl FolioError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Tag a chapter-level rendering failure with its source path.
    pub fn chapter_render(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::ChapterRenderFailure {
            source_path: path.into(),
            message: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = FolioError::config("missing output directory");
        assert_eq!(err.to_string(), "config error: missing output directory");

        let err = FolioError::EmptyInputSet {
            dir: PathBuf::from("/tmp/in"),
            extension: "txt".into(),
        };
        assert!(err.to_string().contains("/tmp/in"));
        assert!(err.to_string().contains(".txt"));
    }

    #[test]
    fn plan_too_large_mentions_both_numbers() {
        let err = FolioError::PlanTooLarge {
            estimated_pages: 4200,
            max_pages: 2000,
        };
        let msg = err.to_string();
        assert!(msg.contains("4200"));
        assert!(msg.contains("2000"));
    }

    #[test]
    fn chapter_render_failure_names_the_file() {
        let err = FolioError::chapter_render("/data/07_notes.txt", "glyph overflow");
        assert!(err.to_string().contains("07_notes.txt"));
        assert!(err.to_string().contains("glyph overflow"));
    }
}
