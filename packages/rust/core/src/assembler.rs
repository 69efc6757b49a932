//! Document assembly.
//!
//! Drives the page renderer through the whole document in one pass: title
//! page, reserved TOC pages, then every chapter in input order. The true
//! start page of each chapter is recorded at the moment its heading is
//! drawn and bound into the TOC afterwards — the plan's estimates are never
//! used for link targets. A renderer failure inside a chapter aborts the
//! run and names the offending source file; no partial document survives.

use tracing::{debug, info, instrument, warn};

use folio_render::{DocMeta, DocumentRenderer, TocRow};
use folio_shared::{Chapter, DocumentPlan, FolioError, Result, TocEntry};

/// Navigation hint printed under the title.
const NAV_HINT: &str = "Click on chapters in the TOC to be linked there. Click on the \
                        page footer (bottom right on any page) to return to the TOC.";

/// Inputs for document assembly beyond the chapters and plan.
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    /// Document metadata for headers, footers, and the info dictionary.
    pub meta: DocMeta,
    /// Optional preamble on the title page.
    pub intro_text: Option<String>,
}

/// Outcome of a successful assembly.
#[derive(Debug, Clone)]
pub struct AssembleReport {
    /// One bound TOC entry per chapter, in input order.
    pub entries: Vec<TocEntry>,
    /// Observed start page per chapter, in input order.
    pub chapter_start_pages: Vec<u32>,
    /// Total page count of the assembled document.
    pub total_pages: u32,
}

/// Assemble the full document through the renderer.
#[instrument(skip_all, fields(chapters = chapters.len(), toc_pages = plan.toc_page_count))]
pub fn assemble(
    chapters: &[Chapter],
    plan: &DocumentPlan,
    renderer: &mut dyn DocumentRenderer,
    opts: &AssembleOptions,
) -> Result<AssembleReport> {
    renderer.begin_document(&opts.meta)?;

    // Title page. Pages before the first chapter link back to the first
    // TOC page.
    renderer.set_back_link_target(plan.toc_first_page);
    renderer.add_page();
    renderer.big_title(&opts.meta.title)?;
    if let Some(intro) = &opts.intro_text {
        renderer.comment(intro)?;
    }
    renderer.comment(NAV_HINT)?;

    renderer.reserve_toc_pages(plan.toc_page_count)?;

    // Chapters in input order, recording observed start pages.
    let mut entries: Vec<TocEntry> = chapters
        .iter()
        .map(|c| TocEntry::unbound(&c.title, &c.keyword_label))
        .collect();
    let mut chapter_start_pages: Vec<u32> = Vec::with_capacity(chapters.len());

    for (i, chapter) in chapters.iter().enumerate() {
        renderer.set_back_link_target(plan.toc_page_of_entry(i));
        let start = renderer.add_page();

        render_chapter(renderer, i, chapter)
            .map_err(|e| FolioError::chapter_render(&chapter.source_path, e.to_string()))?;

        let estimate = plan.chapter_start_estimates.get(i).copied();
        if estimate.is_some_and(|e| e != start) {
            debug!(
                chapter = %chapter.title,
                estimate = estimate.unwrap_or(0),
                observed = start,
                "start-page estimate drifted, binding observed page"
            );
        }

        entries[i].bind(start);
        chapter_start_pages.push(start);
    }

    // Sequential layout invariant: observed starts never go backwards.
    if chapter_start_pages.windows(2).any(|w| w[0] > w[1]) {
        return Err(FolioError::Render(
            "chapter start pages are not monotonically non-decreasing".into(),
        ));
    }

    write_toc(renderer, plan, &entries)?;

    let total_pages = renderer.current_page();
    info!(
        chapters = chapters.len(),
        total_pages,
        "document assembled"
    );

    Ok(AssembleReport {
        entries,
        chapter_start_pages,
        total_pages,
    })
}

/// Render one chapter's heading and body on the current page.
fn render_chapter(
    renderer: &mut dyn DocumentRenderer,
    index: usize,
    chapter: &Chapter,
) -> Result<()> {
    renderer.chapter_heading(index, &chapter.title)?;

    if chapter.is_empty() {
        warn!(
            path = %chapter.source_path.display(),
            "empty input file, rendering heading only"
        );
    }

    for paragraph in &chapter.paragraphs {
        renderer.paragraph(&paragraph.text())?;
    }

    renderer.keyword_note(&chapter.keyword_label)?;
    renderer.end_marker()
}

/// Bind the recorded entries into the reserved TOC slots.
fn write_toc(
    renderer: &mut dyn DocumentRenderer,
    plan: &DocumentPlan,
    entries: &[TocEntry],
) -> Result<()> {
    let title_rows = plan.title_page_entries as usize;
    let per_page = plan.entries_per_page as usize;

    for slot in 0..plan.toc_page_count {
        let range = if slot == 0 {
            0..title_rows.min(entries.len())
        } else {
            let from = title_rows + (slot as usize - 1) * per_page;
            let to = (from + per_page).min(entries.len());
            from.min(entries.len())..to
        };

        let rows: Vec<TocRow> = entries[range]
            .iter()
            .map(|entry| TocRow {
                title: entry.title.clone(),
                keyword_label: entry.keyword_label.clone(),
                target_page: entry.target_page.unwrap_or(0),
            })
            .collect();

        let heading = (slot == 0).then_some("Table of Contents");
        renderer.write_toc_slot(slot, heading, &rows)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
