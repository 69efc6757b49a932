//! Page-drawing capability for folio documents.
//!
//! The assembler in `folio-core` drives the [`DocumentRenderer`] trait and
//! never touches page mechanics itself. [`PdfRenderer`] is the production
//! implementation on top of `pdf-writer`; tests substitute recording fakes.
//!
//! The trait is shaped around the single-pass assembly strategy: TOC pages
//! are reserved in page order before the chapters render, and filled in
//! afterwards once every chapter's true start page has been observed.

mod layout;
mod pdf;

pub use layout::{
    A4_HEIGHT_PT, A4_WIDTH_PT, Font, LINE_SPACING, PageGeometry, mm_to_pt, text_width, wrap,
    wrap_indented,
};
pub use pdf::PdfRenderer;

use folio_shared::Result;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Document-level metadata rendered into headers and the info dictionary.
#[derive(Debug, Clone, Default)]
pub struct DocMeta {
    /// Document title.
    pub title: String,
    /// Author for the info dictionary.
    pub author: Option<String>,
    /// Run label shown in every header and footer.
    pub key_phrase: String,
    /// Human-readable creation date for the header.
    pub created_label: String,
}

/// One bound table-of-contents row, ready to draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocRow {
    /// Chapter title.
    pub title: String,
    /// Keyword label displayed after the title (possibly empty).
    pub keyword_label: String,
    /// Observed start page of the chapter.
    pub target_page: u32,
}

// ---------------------------------------------------------------------------
// DocumentRenderer
// ---------------------------------------------------------------------------

/// The opaque page-drawing capability consumed by the assembler.
///
/// Pages are numbered from 1 in creation order. Every page records the
/// back-link target in force when it was created; the footer of the
/// finished page links there.
pub trait DocumentRenderer {
    /// Record document metadata. Call once, before any page exists.
    fn begin_document(&mut self, meta: &DocMeta) -> Result<()>;

    /// Start a new page and return its 1-based page number.
    fn add_page(&mut self) -> u32;

    /// Number of the page currently being drawn (0 when none exists).
    fn current_page(&self) -> u32;

    /// Centered document title with a rule underneath.
    fn big_title(&mut self, text: &str) -> Result<()>;

    /// Highlighted note text (title-page preamble, navigation hints).
    fn comment(&mut self, text: &str) -> Result<()>;

    /// Reserve `count` empty pages, in order, to be filled by
    /// [`write_toc_slot`](Self::write_toc_slot) after chapters render.
    fn reserve_toc_pages(&mut self, count: u32) -> Result<()>;

    /// Chapter heading on the current page.
    fn chapter_heading(&mut self, number: usize, title: &str) -> Result<()>;

    /// Body paragraph with a hanging indent; flows across page breaks.
    fn paragraph(&mut self, text: &str) -> Result<()>;

    /// Keyword label block at the end of a chapter body.
    fn keyword_note(&mut self, label: &str) -> Result<()>;

    /// End-of-chapter marker.
    fn end_marker(&mut self) -> Result<()>;

    /// Footer back-link target for pages created after this call.
    fn set_back_link_target(&mut self, toc_page: u32);

    /// Fill reserved TOC slot `slot` (0-based) with rows; `heading` is
    /// drawn on the first slot only.
    fn write_toc_slot(&mut self, slot: u32, heading: Option<&str>, rows: &[TocRow])
    -> Result<()>;

    /// Assemble and return the final document bytes.
    fn finish(&mut self) -> Result<Vec<u8>>;
}
