//! Core domain types for folio document conversion.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one conversion run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Sentence / Paragraph
// ---------------------------------------------------------------------------

/// A contiguous span of normalized text ending at a sentence boundary.
///
/// Immutable once produced by the tokenizer. `ordinal` is the sentence's
/// position within its source document, starting at 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    pub text: String,
    pub ordinal: usize,
}

impl Sentence {
    pub fn new(text: impl Into<String>, ordinal: usize) -> Self {
        Self {
            text: text.into(),
            ordinal,
        }
    }
}

/// An ordered, non-empty run of sentences assigned to one coherence group.
///
/// A paragraph never spans two source documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    sentences: Vec<Sentence>,
}

impl Paragraph {
    /// Build a paragraph from its sentences. Returns `None` for an empty
    /// group — empty paragraphs do not exist in the domain.
    pub fn new(sentences: Vec<Sentence>) -> Option<Self> {
        if sentences.is_empty() {
            return None;
        }
        Some(Self { sentences })
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    /// Number of sentences in this paragraph.
    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Ordinal of the paragraph's first sentence in the source document.
    pub fn start_ordinal(&self) -> usize {
        self.sentences[0].ordinal
    }

    /// The paragraph's display text: sentences joined by single spaces.
    pub fn text(&self) -> String {
        self.sentences
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ---------------------------------------------------------------------------
// Chapter
// ---------------------------------------------------------------------------

/// The document unit derived from one input text file.
///
/// Created once per input file and immutable after segmentation completes.
/// Owned by the pipeline for the duration of one conversion run.
#[derive(Debug, Clone)]
pub struct Chapter {
    /// Display title, derived from the file name or an explicit override.
    pub title: String,
    /// Originating file, kept for traceability and error messages.
    pub source_path: PathBuf,
    /// Segmented body. Empty for an empty input file.
    pub paragraphs: Vec<Paragraph>,
    /// Short keyword label for the chapter (possibly empty).
    pub keyword_label: String,
    /// Total sentences across all paragraphs.
    pub sentence_count: usize,
}

impl Chapter {
    /// Whether the chapter contributes no body text.
    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    /// Total characters of paragraph text, used by the layout estimator.
    pub fn char_count(&self) -> usize {
        self.paragraphs.iter().map(|p| p.text().chars().count()).sum()
    }
}

// ---------------------------------------------------------------------------
// TocEntry
// ---------------------------------------------------------------------------

/// One navigable row in the table of contents.
///
/// Two-phase: created unbound alongside its chapter, then bound to the page
/// actually observed when the chapter began rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    /// Chapter title as displayed in the TOC row.
    pub title: String,
    /// Keyword label shown next to the title (possibly empty).
    pub keyword_label: String,
    /// Target page, `None` until bound.
    pub target_page: Option<u32>,
}

impl TocEntry {
    pub fn unbound(title: impl Into<String>, keyword_label: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            keyword_label: keyword_label.into(),
            target_page: None,
        }
    }

    /// Bind the entry to the chapter's observed start page.
    pub fn bind(&mut self, page: u32) {
        self.target_page = Some(page);
    }

    pub fn is_bound(&self) -> bool {
        self.target_page.is_some()
    }
}

// ---------------------------------------------------------------------------
// DocumentPlan
// ---------------------------------------------------------------------------

/// The global layout decision, computed once before rendering and read-only
/// afterwards.
///
/// Start-page estimates are advisory (they size the TOC and bound the total
/// document); final link targets always come from observed render positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentPlan {
    /// Number of pages reserved for the table of contents.
    pub toc_page_count: u32,
    /// First page of the TOC block (the title page precedes it).
    pub toc_first_page: u32,
    /// Page on which the first chapter is expected to begin.
    pub first_chapter_page: u32,
    /// Estimated starting page per chapter, in input order.
    pub chapter_start_estimates: Vec<u32>,
    /// Estimated page count of the whole document.
    pub estimated_total_pages: u32,
    /// TOC rows that fit on the first (heading-bearing) TOC page.
    pub title_page_entries: u32,
    /// TOC rows per continuation page.
    pub entries_per_page: u32,
}

impl DocumentPlan {
    /// The TOC page on which entry `index` (0-based, input order) lands.
    ///
    /// Footer back-links on a chapter's content pages point here.
    pub fn toc_page_of_entry(&self, index: usize) -> u32 {
        let index = index as u32;
        if index < self.title_page_entries {
            self.toc_first_page
        } else {
            let overflow = index - self.title_page_entries;
            self.toc_first_page + 1 + overflow / self.entries_per_page
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence(text: &str, ordinal: usize) -> Sentence {
        Sentence::new(text, ordinal)
    }

    #[test]
    fn paragraph_rejects_empty_group() {
        assert!(Paragraph::new(vec![]).is_none());
    }

    #[test]
    fn paragraph_text_joins_with_spaces() {
        let p = Paragraph::new(vec![
            sentence("First sentence.", 3),
            sentence("Second one.", 4),
        ])
        .unwrap();
        assert_eq!(p.text(), "First sentence. Second one.");
        assert_eq!(p.start_ordinal(), 3);
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn toc_entry_binding() {
        let mut entry = TocEntry::unbound("Chapter title", "keywords here");
        assert!(!entry.is_bound());
        entry.bind(7);
        assert_eq!(entry.target_page, Some(7));
    }

    #[test]
    fn toc_page_of_entry_maps_overflow_pages() {
        let plan = DocumentPlan {
            toc_page_count: 3,
            toc_first_page: 2,
            first_chapter_page: 5,
            chapter_start_estimates: vec![],
            estimated_total_pages: 120,
            title_page_entries: 39,
            entries_per_page: 60,
        };
        assert_eq!(plan.toc_page_of_entry(0), 2);
        assert_eq!(plan.toc_page_of_entry(38), 2);
        assert_eq!(plan.toc_page_of_entry(39), 3);
        assert_eq!(plan.toc_page_of_entry(98), 3);
        assert_eq!(plan.toc_page_of_entry(99), 4);
    }

    #[test]
    fn run_id_display_roundtrip() {
        let id = RunId::new();
        let s = id.to_string();
        assert_eq!(s.len(), 36);
    }

    #[test]
    fn chapter_char_count_sums_paragraphs() {
        let chapter = Chapter {
            title: "T".into(),
            source_path: "a.txt".into(),
            paragraphs: vec![
                Paragraph::new(vec![sentence("abcd.", 0)]).unwrap(),
                Paragraph::new(vec![sentence("ef.", 1)]).unwrap(),
            ],
            keyword_label: String::new(),
            sentence_count: 2,
        };
        assert_eq!(chapter.char_count(), 8);
        assert!(!chapter.is_empty());
    }
}
