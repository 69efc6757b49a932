//! Application configuration for folio.
//!
//! User config lives at `~/.folio/folio.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FolioError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "folio.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".folio";

// ---------------------------------------------------------------------------
// Config structs (matching folio.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Paragraph segmentation settings.
    #[serde(default)]
    pub segmentation: SegmentationConfig,

    /// Word-embedding model settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Page layout and TOC sizing settings.
    #[serde(default)]
    pub layout: LayoutConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Extension of files to convert (without the leading dot).
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Whether to discover input files recursively.
    #[serde(default)]
    pub recurse: bool,

    /// Narrow e-writer style text column (wide side margins).
    #[serde(default)]
    pub narrow_margins: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            recurse: false,
            narrow_margins: false,
        }
    }
}

fn default_extension() -> String {
    "txt".into()
}

/// Paragraph splitting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    /// Coherence-driven segmentation over word embeddings.
    Semantic,
    /// One sentence per paragraph, no embeddings involved.
    Sentences,
}

/// Policy when no embedding source can be obtained in semantic mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingFallback {
    /// Surface the failure and abort the run.
    Fail,
    /// Degrade the whole run to sentence-per-paragraph mode.
    Sentences,
}

/// `[segmentation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationConfig {
    /// Splitting mode for chapter bodies.
    #[serde(default = "default_split_mode")]
    pub split_mode: SplitMode,

    /// Minimum sentences per paragraph (the final paragraph may run short).
    #[serde(default = "default_min_sentences")]
    pub min_sentences: usize,

    /// Maximum sentences per paragraph.
    #[serde(default = "default_max_sentences")]
    pub max_sentences: usize,

    /// Sentences per paragraph when embedding coverage is zero.
    #[serde(default = "default_fallback_chunk")]
    pub fallback_chunk_size: usize,

    /// What to do when no embedding source is obtainable at all.
    #[serde(default = "default_embedding_fallback")]
    pub on_embedding_unavailable: EmbeddingFallback,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            split_mode: default_split_mode(),
            min_sentences: default_min_sentences(),
            max_sentences: default_max_sentences(),
            fallback_chunk_size: default_fallback_chunk(),
            on_embedding_unavailable: default_embedding_fallback(),
        }
    }
}

fn default_split_mode() -> SplitMode {
    SplitMode::Semantic
}
fn default_min_sentences() -> usize {
    2
}
fn default_max_sentences() -> usize {
    10
}
fn default_fallback_chunk() -> usize {
    5
}
fn default_embedding_fallback() -> EmbeddingFallback {
    EmbeddingFallback::Fail
}

impl SegmentationConfig {
    /// Validate bounds before the values enter the segmenter.
    pub fn validate(&self) -> Result<()> {
        if self.min_sentences == 0 {
            return Err(FolioError::validation("min_sentences must be at least 1"));
        }
        if self.max_sentences < self.min_sentences {
            return Err(FolioError::validation(format!(
                "max_sentences ({}) must be >= min_sentences ({})",
                self.max_sentences, self.min_sentences
            )));
        }
        if self.fallback_chunk_size == 0 {
            return Err(FolioError::validation(
                "fallback_chunk_size must be at least 1",
            ));
        }
        Ok(())
    }
}

/// `[embedding]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name, used for the cache file name.
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Explicit path to a local vectors file (GloVe text format). Takes
    /// precedence over the cache and any fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,

    /// URL to fetch the vectors file from when no local copy exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_url: Option<String>,

    /// Override for the model cache directory (defaults to `~/.folio/models`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
            model_path: None,
            model_url: None,
            cache_dir: None,
        }
    }
}

fn default_model_name() -> String {
    "glove-wiki-gigaword-100".into()
}

/// `[layout]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Below this many chapters the TOC gets exactly one page.
    #[serde(default = "default_title_count_threshold")]
    pub title_count_threshold: u32,

    /// TOC rows per continuation page.
    #[serde(default = "default_toc_entries_per_page")]
    pub toc_entries_per_page: u32,

    /// Hard ceiling on the estimated page count of a single document.
    #[serde(default = "default_max_total_pages")]
    pub max_total_pages: u32,

    /// Body text size in points.
    #[serde(default = "default_body_font_size")]
    pub body_font_size: f32,

    /// Chapters shorter than this many characters get no keyword label.
    #[serde(default = "default_keyword_min_chars")]
    pub keyword_min_chars: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            title_count_threshold: default_title_count_threshold(),
            toc_entries_per_page: default_toc_entries_per_page(),
            max_total_pages: default_max_total_pages(),
            body_font_size: default_body_font_size(),
            keyword_min_chars: default_keyword_min_chars(),
        }
    }
}

fn default_title_count_threshold() -> u32 {
    39
}
fn default_toc_entries_per_page() -> u32 {
    60
}
fn default_max_total_pages() -> u32 {
    2000
}
fn default_body_font_size() -> f32 {
    14.0
}
fn default_keyword_min_chars() -> usize {
    1500
}

// ---------------------------------------------------------------------------
// Convert config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime configuration for one conversion run — merged from the config
/// file and CLI flags, validated before it enters the core.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Directory of input files.
    pub input_dir: PathBuf,
    /// Directory the output subfolder is created in. Defaults to the
    /// input directory's parent.
    pub output_dir: Option<PathBuf>,
    /// Extension of files to convert (without the leading dot).
    pub extension: String,
    /// Whether to discover input files recursively.
    pub recurse: bool,
    /// Run label used for the document title, headers, and footers.
    pub key_phrase: Option<String>,
    /// Optional preamble rendered on the title page.
    pub intro_text: Option<String>,
    /// Narrow e-writer style text column.
    pub narrow_margins: bool,
    /// Segmentation settings.
    pub segmentation: SegmentationConfig,
    /// Embedding model settings.
    pub embedding: EmbeddingConfig,
    /// Layout and TOC sizing settings.
    pub layout: LayoutConfig,
}

impl ConvertConfig {
    /// Build a run config from the loaded app config and the input path.
    /// CLI flags are applied on top by the caller.
    pub fn from_config(config: &AppConfig, input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: None,
            extension: config.defaults.extension.clone(),
            recurse: config.defaults.recurse,
            key_phrase: None,
            intro_text: None,
            narrow_margins: config.defaults.narrow_margins,
            segmentation: config.segmentation.clone(),
            embedding: config.embedding.clone(),
            layout: config.layout.clone(),
        }
    }

    /// Validate the merged config at the orchestration boundary.
    pub fn validate(&self) -> Result<()> {
        self.segmentation.validate()?;
        if self.extension.is_empty() {
            return Err(FolioError::validation("extension must not be empty"));
        }
        if self.layout.title_count_threshold == 0 || self.layout.toc_entries_per_page == 0 {
            return Err(FolioError::validation(
                "TOC sizing thresholds must be positive",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.folio/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| FolioError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.folio/folio.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Default directory for cached embedding models (`~/.folio/models`).
pub fn model_cache_dir() -> Result<PathBuf> {
    Ok(config_dir()?.join("models"))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| FolioError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| FolioError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| FolioError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| FolioError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| FolioError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("extension"));
        assert!(toml_str.contains("title_count_threshold"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.segmentation.min_sentences, 2);
        assert_eq!(parsed.segmentation.max_sentences, 10);
        assert_eq!(parsed.layout.title_count_threshold, 39);
        assert_eq!(parsed.embedding.model_name, "glove-wiki-gigaword-100");
    }

    #[test]
    fn split_mode_parses_lowercase() {
        let toml_str = r#"
[segmentation]
split_mode = "sentences"
on_embedding_unavailable = "sentences"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.segmentation.split_mode, SplitMode::Sentences);
        assert_eq!(
            config.segmentation.on_embedding_unavailable,
            EmbeddingFallback::Sentences
        );
    }

    #[test]
    fn segmentation_bounds_validated() {
        let bad = SegmentationConfig {
            min_sentences: 6,
            max_sentences: 3,
            ..Default::default()
        };
        let err = bad.validate().unwrap_err();
        assert!(err.to_string().contains("max_sentences"));

        let zero = SegmentationConfig {
            min_sentences: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn convert_config_from_app_config() {
        let mut app = AppConfig::default();
        app.defaults.recurse = true;
        app.defaults.extension = "md".into();

        let run = ConvertConfig::from_config(&app, "/data/in");
        assert!(run.recurse);
        assert_eq!(run.extension, "md");
        assert_eq!(run.input_dir, PathBuf::from("/data/in"));
        assert!(run.validate().is_ok());
    }
}
