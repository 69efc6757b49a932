//! Shared types, error model, and configuration for folio.
//!
//! This crate is the foundation depended on by all other folio crates.
//! It provides:
//! - [`FolioError`] — the unified error type
//! - Domain types ([`Sentence`], [`Paragraph`], [`Chapter`], [`TocEntry`], [`DocumentPlan`])
//! - Configuration ([`AppConfig`], [`ConvertConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ConvertConfig, DefaultsConfig, EmbeddingConfig, EmbeddingFallback, LayoutConfig,
    SegmentationConfig, SplitMode, config_dir, config_file_path, init_config, load_config,
    load_config_from, model_cache_dir,
};
pub use error::{FolioError, Result};
pub use types::{Chapter, DocumentPlan, Paragraph, RunId, Sentence, TocEntry};
