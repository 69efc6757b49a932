//! Document layout planning.
//!
//! Runs before any page is drawn: decides how many pages the TOC needs,
//! estimates each chapter's start page from character counts, and rejects
//! documents that would blow past the configured page ceiling. The
//! estimates exist so forward references can be laid out in a single render
//! pass — final link targets are bound from observed pages, never from
//! these numbers.

use tracing::{debug, instrument};

use folio_render::PageGeometry;
use folio_shared::{Chapter, DocumentPlan, FolioError, LayoutConfig, Result};

/// Lines a chapter heading block occupies in the estimate.
const HEADING_LINES: u32 = 2;
/// Lines for the keyword block when a chapter has a label.
const KEYWORD_LINES: u32 = 2;
/// Lines for the end-of-chapter marker.
const END_MARKER_LINES: u32 = 1;

/// Inputs for layout planning.
#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub layout: LayoutConfig,
    pub narrow_margins: bool,
}

/// Compute the document plan for the given chapters.
///
/// The TOC gets one page when the chapter count is below
/// `title_count_threshold`; past that, overflow entries fill continuation
/// pages of `toc_entries_per_page` rows each, rounding up.
#[instrument(skip_all, fields(chapters = chapters.len()))]
pub fn plan(chapters: &[Chapter], opts: &PlanOptions) -> Result<DocumentPlan> {
    let n = chapters.len() as u32;
    let title_thresh = opts.layout.title_count_threshold;
    let per_page = opts.layout.toc_entries_per_page;

    let toc_page_count = if n < title_thresh {
        1
    } else {
        1 + (n - title_thresh).div_ceil(per_page)
    };

    let geometry = PageGeometry::a4(opts.narrow_margins, opts.layout.body_font_size);
    let chars_per_line = geometry.estimate_chars_per_line();
    let lines_per_page = geometry.estimate_lines_per_page();

    // Page 1 is the title page, the TOC block follows it.
    let toc_first_page = 2;
    let first_chapter_page = toc_first_page + toc_page_count;

    let mut next_page = first_chapter_page;
    let mut chapter_start_estimates = Vec::with_capacity(chapters.len());
    for chapter in chapters {
        chapter_start_estimates.push(next_page);
        next_page += estimate_chapter_pages(chapter, chars_per_line, lines_per_page);
    }
    let estimated_total_pages = next_page - 1;

    debug!(
        toc_page_count,
        first_chapter_page,
        estimated_total_pages,
        chars_per_line,
        lines_per_page,
        "layout planned"
    );

    if estimated_total_pages > opts.layout.max_total_pages {
        return Err(FolioError::PlanTooLarge {
            estimated_pages: estimated_total_pages,
            max_pages: opts.layout.max_total_pages,
        });
    }

    Ok(DocumentPlan {
        toc_page_count,
        toc_first_page,
        first_chapter_page,
        chapter_start_estimates,
        estimated_total_pages,
        title_page_entries: title_thresh,
        entries_per_page: per_page,
    })
}

/// Character/line heuristic for a chapter's page count, without rendering.
fn estimate_chapter_pages(chapter: &Chapter, chars_per_line: u32, lines_per_page: u32) -> u32 {
    let mut lines = HEADING_LINES + END_MARKER_LINES;
    for paragraph in &chapter.paragraphs {
        let chars = paragraph.text().chars().count() as u32;
        // Wrapped lines plus the blank separator after the paragraph.
        lines += chars.div_ceil(chars_per_line.max(1)) + 1;
    }
    if !chapter.keyword_label.is_empty() {
        lines += KEYWORD_LINES;
    }
    lines.div_ceil(lines_per_page.max(1)).max(1)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use folio_shared::{Paragraph, Sentence};

    fn chapter(title: &str, sentence_texts: &[&str]) -> Chapter {
        let sentences: Vec<Sentence> = sentence_texts
            .iter()
            .enumerate()
            .map(|(i, t)| Sentence::new(*t, i))
            .collect();
        let sentence_count = sentences.len();
        let paragraphs = match Paragraph::new(sentences) {
            Some(p) => vec![p],
            None => vec![],
        };
        Chapter {
            title: title.into(),
            source_path: format!("{title}.txt").into(),
            paragraphs,
            keyword_label: String::new(),
            sentence_count,
        }
    }

    fn default_opts() -> PlanOptions {
        PlanOptions {
            layout: LayoutConfig::default(),
            narrow_margins: false,
        }
    }

    #[test]
    fn small_batch_gets_one_toc_page() {
        // Scenario: 3 files with 2, 5, and 1 sentences, threshold 39.
        let chapters = vec![
            chapter("one", &["First.", "Second."]),
            chapter("two", &["A.", "B.", "C.", "D.", "E."]),
            chapter("three", &["Only."]),
        ];
        let plan = plan(&chapters, &default_opts()).unwrap();

        assert_eq!(plan.toc_page_count, 1);
        assert_eq!(plan.toc_first_page, 2);
        assert_eq!(plan.first_chapter_page, 3);
        assert_eq!(plan.chapter_start_estimates, vec![3, 4, 5]);

        // Estimates strictly ascend for non-empty chapters.
        for pair in plan.chapter_start_estimates.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn toc_page_count_thresholds() {
        let make = |count: usize| -> Vec<Chapter> {
            (0..count)
                .map(|i| chapter(&format!("ch{i}"), &["One sentence."]))
                .collect()
        };
        let opts = default_opts();

        assert_eq!(plan(&make(1), &opts).unwrap().toc_page_count, 1);
        assert_eq!(plan(&make(38), &opts).unwrap().toc_page_count, 1);
        assert_eq!(plan(&make(39), &opts).unwrap().toc_page_count, 1);
        assert_eq!(plan(&make(40), &opts).unwrap().toc_page_count, 2);
        assert_eq!(plan(&make(99), &opts).unwrap().toc_page_count, 2);
        assert_eq!(plan(&make(100), &opts).unwrap().toc_page_count, 3);
    }

    #[test]
    fn long_chapter_spans_multiple_pages() {
        let long_sentence = "word ".repeat(600);
        let texts: Vec<&str> = vec![long_sentence.as_str(); 10];
        let chapters = vec![chapter("long", &texts)];

        let plan = plan(&chapters, &default_opts()).unwrap();
        assert!(plan.estimated_total_pages > 3);
    }

    #[test]
    fn empty_chapter_still_costs_one_page() {
        let chapters = vec![chapter("empty", &[]), chapter("next", &["Text."])];
        let plan = plan(&chapters, &default_opts()).unwrap();
        assert_eq!(plan.chapter_start_estimates, vec![3, 4]);
    }

    #[test]
    fn oversized_document_is_rejected() {
        let mut opts = default_opts();
        opts.layout.max_total_pages = 3;

        let long_sentence = "word ".repeat(600);
        let texts: Vec<&str> = vec![long_sentence.as_str(); 20];
        let chapters = vec![chapter("huge", &texts)];

        let err = plan(&chapters, &opts).unwrap_err();
        assert!(matches!(err, FolioError::PlanTooLarge { .. }));
    }

    #[test]
    fn plan_is_read_only_data() {
        let chapters = vec![chapter("one", &["A."])];
        let a = plan(&chapters, &default_opts()).unwrap();
        let b = plan(&chapters, &default_opts()).unwrap();
        assert_eq!(a, b);
    }
}
