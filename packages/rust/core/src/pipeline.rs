//! End-to-end convert pipeline: discover → segment → plan → assemble → PDF.
//!
//! Chapter segmentation is fanned out across blocking workers (chapters are
//! independent) and joined back in input order before planning — page
//! numbers and footer links depend on sequential placement, so everything
//! after the join is single-threaded. Cancellation is cooperative and
//! checked at chapter boundaries.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{info, instrument, warn};

use folio_discovery::{DiscoveredFile, DiscoveryOptions};
use folio_embedding::EmbeddingLookup;
use folio_render::{DocMeta, DocumentRenderer, PageGeometry, PdfRenderer};
use folio_segment::SegmentOptions;
use folio_shared::{
    Chapter, ConvertConfig, EmbeddingFallback, FolioError, Result, RunId, SplitMode,
};
use folio_text::KeywordOptions;

use crate::assembler::{self, AssembleOptions};
use crate::planner::{self, PlanOptions};

/// Longest chapter title derived from a file name.
const TITLE_MAX_CHARS: usize = 75;

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Cooperative cancellation flag, checked between chapters.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; the run stops at the next chapter boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(FolioError::Cancelled);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a chapter finishes segmentation.
    fn chapter_segmented(&self, title: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &ConvertResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn chapter_segmented(&self, _title: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &ConvertResult) {}
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Result of a conversion run.
#[derive(Debug, Clone)]
pub struct ConvertResult {
    /// Path of the written PDF.
    pub output_path: PathBuf,
    /// Run identifier.
    pub run_id: RunId,
    /// Number of chapters in the document.
    pub chapter_count: usize,
    /// Total pages rendered.
    pub page_count: u32,
    /// Split mode actually used (semantic may degrade to sentences).
    pub split_mode: SplitMode,
    /// Total elapsed time.
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Directory pipeline
// ---------------------------------------------------------------------------

/// Convert a directory of text files into one navigable PDF.
#[instrument(skip_all, fields(input = %config.input_dir.display()))]
pub async fn convert_dir(
    config: &ConvertConfig,
    progress: &dyn ProgressReporter,
    cancel: &CancelFlag,
) -> Result<ConvertResult> {
    let start = Instant::now();
    let run_id = RunId::new();
    config.validate()?;

    info!(%run_id, input = %config.input_dir.display(), "starting convert pipeline");

    // --- Phase 1: Discovery ---
    progress.phase("Discovering input files");
    let files = folio_discovery::discover(
        &config.input_dir,
        &DiscoveryOptions {
            extension: config.extension.clone(),
            recurse: config.recurse,
        },
    )?;

    // --- Phase 2: Embedding capability ---
    let (lookup, effective_mode) = resolve_embedding(config, progress).await?;

    // --- Phase 3: Segmentation (parallel across chapters) ---
    progress.phase("Segmenting chapters");
    let chapters = segment_all(&files, config, lookup, effective_mode, progress, cancel).await?;

    // --- Phase 4: Planning ---
    cancel.check()?;
    progress.phase("Planning document layout");
    let plan = planner::plan(
        &chapters,
        &PlanOptions {
            layout: config.layout.clone(),
            narrow_margins: config.narrow_margins,
        },
    )?;

    // --- Phase 5: Assembly ---
    progress.phase("Rendering document");
    let key_phrase = config
        .key_phrase
        .clone()
        .unwrap_or_else(|| "folio txt2pdf".to_string());
    let intro_text = config.intro_text.clone().unwrap_or_else(|| {
        let folder = config
            .input_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| config.input_dir.display().to_string());
        format!(
            "The text below was converted from a folder of plain-text files. \
             Files are ordered by the number in their name. Source folder: {folder}"
        )
    });

    let meta = DocMeta {
        title: key_phrase.clone(),
        author: None,
        key_phrase: key_phrase.clone(),
        created_label: Utc::now().format("%b-%d-%Y").to_string(),
    };

    let geometry = PageGeometry::a4(config.narrow_margins, config.layout.body_font_size);
    let mut renderer = PdfRenderer::new(geometry);
    let report = assembler::assemble(
        &chapters,
        &plan,
        &mut renderer,
        &AssembleOptions {
            meta,
            intro_text: Some(intro_text),
        },
    )?;
    let bytes = renderer.finish()?;

    // --- Phase 6: Output ---
    progress.phase("Writing output");
    let out_root = match &config.output_dir {
        Some(dir) => dir.clone(),
        None => config
            .input_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| config.input_dir.clone()),
    };
    let subfolder = out_root.join(format!(
        "pdf_from_txt_{}",
        Utc::now().format("%b-%d-%Y")
    ));
    let output_path = subfolder.join(output_file_name(&key_phrase, config.narrow_margins));
    write_atomic(&output_path, &bytes)?;

    let result = ConvertResult {
        output_path,
        run_id,
        chapter_count: chapters.len(),
        page_count: report.total_pages,
        split_mode: effective_mode,
        elapsed: start.elapsed(),
    };

    progress.done(&result);
    info!(
        run_id = %result.run_id,
        chapters = result.chapter_count,
        pages = result.page_count,
        output = %result.output_path.display(),
        elapsed_ms = result.elapsed.as_millis(),
        "convert pipeline complete"
    );

    Ok(result)
}

// ---------------------------------------------------------------------------
// Single-file pipeline
// ---------------------------------------------------------------------------

/// Convert one text file into a PDF (no table of contents).
#[instrument(skip_all, fields(input = %path.display()))]
pub async fn convert_file(
    config: &ConvertConfig,
    path: &Path,
    progress: &dyn ProgressReporter,
    cancel: &CancelFlag,
) -> Result<ConvertResult> {
    let start = Instant::now();
    let run_id = RunId::new();
    config.validate()?;
    cancel.check()?;

    let (lookup, effective_mode) = resolve_embedding(config, progress).await?;

    progress.phase("Segmenting chapter");
    let seg_opts = SegmentOptions::from(&config.segmentation);
    let keyword_min_chars = config.layout.keyword_min_chars;
    let chapter = {
        let path = path.to_path_buf();
        let lookup = lookup.clone();
        tokio::task::spawn_blocking(move || {
            build_chapter(
                &path,
                lookup.as_deref(),
                effective_mode,
                &seg_opts,
                keyword_min_chars,
            )
        })
        .await
        .map_err(|e| FolioError::Segmentation(format!("segmentation worker failed: {e}")))??
    };

    progress.phase("Rendering document");
    let stem = chapter.title.clone();
    let key_phrase = config
        .key_phrase
        .clone()
        .unwrap_or_else(|| format!("{stem} - folio"));

    let meta = DocMeta {
        title: key_phrase.clone(),
        author: None,
        key_phrase: key_phrase.clone(),
        created_label: Utc::now().format("%b-%d-%Y").to_string(),
    };

    let geometry = PageGeometry::a4(config.narrow_margins, config.layout.body_font_size);
    let mut renderer = PdfRenderer::new(geometry);
    renderer.begin_document(&meta)?;
    if let Some(intro) = &config.intro_text {
        renderer.add_page();
        renderer.comment(intro)?;
    }
    renderer.add_page();
    renderer.chapter_heading(1, &chapter.title)?;
    for paragraph in &chapter.paragraphs {
        renderer.paragraph(&paragraph.text())?;
    }
    renderer.keyword_note(&chapter.keyword_label)?;
    renderer.end_marker()?;
    let page_count = renderer.current_page();
    let bytes = renderer.finish()?;

    progress.phase("Writing output");
    let out_root = match &config.output_dir {
        Some(dir) => dir.clone(),
        None => path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    let output_path = out_root.join(output_file_name(&key_phrase, config.narrow_margins));
    write_atomic(&output_path, &bytes)?;

    let result = ConvertResult {
        output_path,
        run_id,
        chapter_count: 1,
        page_count,
        split_mode: effective_mode,
        elapsed: start.elapsed(),
    };
    progress.done(&result);
    Ok(result)
}

// ---------------------------------------------------------------------------
// Embedding resolution
// ---------------------------------------------------------------------------

/// Obtain the embedding capability, honoring the unavailable-model policy.
async fn resolve_embedding(
    config: &ConvertConfig,
    progress: &dyn ProgressReporter,
) -> Result<(Option<Arc<EmbeddingLookup>>, SplitMode)> {
    match config.segmentation.split_mode {
        SplitMode::Sentences => Ok((None, SplitMode::Sentences)),
        SplitMode::Semantic => {
            progress.phase("Loading embedding model");
            match folio_embedding::resolve(&config.embedding).await {
                Ok(lookup) => Ok((Some(Arc::new(lookup)), SplitMode::Semantic)),
                Err(err @ FolioError::EmbeddingUnavailable(_)) => {
                    match config.segmentation.on_embedding_unavailable {
                        EmbeddingFallback::Fail => Err(err),
                        EmbeddingFallback::Sentences => {
                            warn!(
                                error = %err,
                                "embedding unavailable, degrading run to sentence-per-paragraph mode"
                            );
                            Ok((None, SplitMode::Sentences))
                        }
                    }
                }
                Err(err) => Err(err),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Chapter construction
// ---------------------------------------------------------------------------

/// Segment every discovered file, preserving input order.
///
/// Workers run on the blocking pool and own their chapter exclusively; the
/// join below is the barrier the planner requires.
async fn segment_all(
    files: &[DiscoveredFile],
    config: &ConvertConfig,
    lookup: Option<Arc<EmbeddingLookup>>,
    mode: SplitMode,
    progress: &dyn ProgressReporter,
    cancel: &CancelFlag,
) -> Result<Vec<Chapter>> {
    let total = files.len();
    let seg_opts = SegmentOptions::from(&config.segmentation);
    let keyword_min_chars = config.layout.keyword_min_chars;

    let mut handles = Vec::with_capacity(total);
    for file in files {
        cancel.check()?;
        let path = file.path.clone();
        let lookup = lookup.clone();
        let seg_opts = seg_opts.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            build_chapter(&path, lookup.as_deref(), mode, &seg_opts, keyword_min_chars)
        }));
    }

    let mut chapters = Vec::with_capacity(total);
    for (i, handle) in handles.into_iter().enumerate() {
        cancel.check()?;
        let chapter = handle
            .await
            .map_err(|e| FolioError::Segmentation(format!("segmentation worker failed: {e}")))??;
        progress.chapter_segmented(&chapter.title, i + 1, total);
        chapters.push(chapter);
    }
    Ok(chapters)
}

/// Read, normalize, tokenize, and segment one input file.
fn build_chapter(
    path: &Path,
    lookup: Option<&EmbeddingLookup>,
    mode: SplitMode,
    seg_opts: &SegmentOptions,
    keyword_min_chars: usize,
) -> Result<Chapter> {
    let raw = std::fs::read(path).map_err(|e| FolioError::io(path, e))?;
    let text = folio_text::normalize(&String::from_utf8_lossy(&raw));
    let sentences = folio_text::split_sentences(&text);

    let paragraphs = match (mode, lookup) {
        (SplitMode::Semantic, Some(lookup)) => {
            folio_segment::segment(&sentences, lookup, seg_opts)
        }
        _ => folio_segment::sentences_as_paragraphs(&sentences),
    };

    let keyword_label = if text.chars().count() >= keyword_min_chars {
        folio_text::keyword_label(&text, &KeywordOptions::default())
    } else {
        String::new()
    };

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "untitled".to_string());
    let title = folio_text::beautify_title(&stem, TITLE_MAX_CHARS);

    Ok(Chapter {
        title,
        source_path: path.to_path_buf(),
        sentence_count: sentences.len(),
        paragraphs,
        keyword_label,
    })
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// `<label>_<timestamp>_<margin-mode>.pdf`, with a path-safe label.
fn output_file_name(key_phrase: &str, narrow_margins: bool) -> String {
    let label: String = key_phrase
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '-',
            c => c,
        })
        .collect();
    let margin_mode = if narrow_margins { "ewriter" } else { "standard" };
    format!(
        "{label}_{}_{margin_mode}.pdf",
        Utc::now().format("%Y-%m-%d_%H-%M-%S")
    )
}

/// Write the document atomically: temp file in the target directory, then
/// rename. A failed run never leaves a partial PDF behind.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| FolioError::validation(format!("no parent dir for {}", path.display())))?;
    std::fs::create_dir_all(parent).map_err(|e| FolioError::io(parent, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "output.pdf".into());
    let temp = parent.join(format!(".{file_name}.tmp"));

    std::fs::write(&temp, bytes).map_err(|e| FolioError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| FolioError::io(path, e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
