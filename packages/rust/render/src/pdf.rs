//! PDF backend on top of `pdf-writer`.
//!
//! Pages are accumulated as in-memory content streams while the assembler
//! drives the trait; `finish` appends page furniture (header, rule box,
//! footer with its back-link annotation), compresses the streams, and
//! assembles the page tree, fonts, and link annotations in one pass.

use miniz_oxide::deflate::compress_to_vec_zlib;
use pdf_writer::types::{ActionType, AnnotationType};
use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str, TextStr};
use tracing::{debug, instrument};

use folio_shared::{FolioError, Result};

use crate::layout::{self, Font, PageGeometry};
use crate::{DocMeta, DocumentRenderer, TocRow};

const HEADER_FONT_SIZE: f32 = 8.0;
const FOOTER_FONT_SIZE: f32 = 8.0;
const BIG_TITLE_FONT_SIZE: f32 = 24.0;
const HEADING_FONT_SIZE: f32 = 14.0;
const COMMENT_FONT_SIZE: f32 = 12.0;
const TOC_HEADING_FONT_SIZE: f32 = 16.0;
const TOC_ROW_FONT_SIZE: f32 = 12.0;
const NOTE_FONT_SIZE: f32 = 12.0;

/// Columns the dotted leader pads each TOC row to.
const TOC_LEADER_COLUMNS: usize = 60;
/// TOC titles longer than this are truncated.
const TOC_TITLE_MAX_CHARS: usize = 45;
/// Paragraph first-line indent, in body-size space widths.
const PARAGRAPH_INDENT_SPACES: f32 = 8.0;

/// Comment text color (muted brown, matching the title-page notes).
const COMMENT_RGB: (f32, f32, f32) = (0.6, 0.3, 0.0);
/// Footer text gray level.
const FOOTER_GRAY: f32 = 0.5;

// ---------------------------------------------------------------------------
// Page records
// ---------------------------------------------------------------------------

struct PageRecord {
    content: Content,
    cursor_y: f32,
    /// Page number the footer links back to; 0 disables the link.
    back_target: u32,
    /// Extra link annotations: (rect, 1-based target page).
    links: Vec<(Rect, u32)>,
    /// Reserved TOC slot awaiting `write_toc_slot`.
    reserved: bool,
}

// ---------------------------------------------------------------------------
// PdfRenderer
// ---------------------------------------------------------------------------

/// Production [`DocumentRenderer`] writing an A4 PDF.
pub struct PdfRenderer {
    geometry: PageGeometry,
    meta: DocMeta,
    pages: Vec<PageRecord>,
    toc_slots: Vec<usize>,
    current_back_target: u32,
}

impl PdfRenderer {
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            meta: DocMeta::default(),
            pages: Vec::new(),
            toc_slots: Vec::new(),
            current_back_target: 0,
        }
    }

    fn push_page(&mut self, reserved: bool) -> u32 {
        self.pages.push(PageRecord {
            content: Content::new(),
            cursor_y: self.geometry.body_top(),
            back_target: self.current_back_target,
            links: Vec::new(),
            reserved,
        });
        self.pages.len() as u32
    }

    fn page_mut(&mut self) -> &mut PageRecord {
        if self.pages.is_empty() {
            self.push_page(false);
        }
        self.pages.last_mut().expect("page exists after push")
    }

    /// Flow pre-wrapped lines down the column, breaking pages as needed.
    fn flow(
        &mut self,
        lines: &[(f32, String)],
        font: Font,
        size: f32,
        rgb: Option<(f32, f32, f32)>,
    ) {
        let x = self.geometry.margin_left;
        let line_height = self.geometry.line_height(size);
        let bottom = self.geometry.body_bottom();

        for (offset, line) in lines {
            if self.page_mut().cursor_y < bottom {
                self.push_page(false);
            }
            let y = self.page_mut().cursor_y;
            let page = self.page_mut();
            show_line(&mut page.content, font, size, x + offset, y, line, rgb);
            page.cursor_y -= line_height;
        }
    }

    /// Vertical gap of one line at the given size.
    fn advance(&mut self, size: f32) {
        let dy = self.geometry.line_height(size);
        self.page_mut().cursor_y -= dy;
    }
}

// ---------------------------------------------------------------------------
// DocumentRenderer impl
// ---------------------------------------------------------------------------

impl DocumentRenderer for PdfRenderer {
    fn begin_document(&mut self, meta: &DocMeta) -> Result<()> {
        self.meta = meta.clone();
        Ok(())
    }

    fn add_page(&mut self) -> u32 {
        self.push_page(false)
    }

    fn current_page(&self) -> u32 {
        self.pages.len() as u32
    }

    fn big_title(&mut self, text: &str) -> Result<()> {
        let width = self.geometry.text_width();
        let margin_left = self.geometry.margin_left;
        let line_height = self.geometry.line_height(BIG_TITLE_FONT_SIZE);
        let lines = layout::wrap(text, Font::HelveticaBold, BIG_TITLE_FONT_SIZE, width);

        for line in &lines {
            let line_width = layout::text_width(line, Font::HelveticaBold, BIG_TITLE_FONT_SIZE);
            let x = margin_left + (width - line_width).max(0.0) / 2.0;
            let page = self.page_mut();
            let y = page.cursor_y;
            show_line(
                &mut page.content,
                Font::HelveticaBold,
                BIG_TITLE_FONT_SIZE,
                x,
                y,
                line,
                None,
            );
            page.cursor_y -= line_height;
        }

        // Rule under the title block.
        let rule_y = self.page_mut().cursor_y + BIG_TITLE_FONT_SIZE * 0.4;
        let x0 = self.geometry.margin_left;
        let x1 = self.geometry.page_width - self.geometry.margin_right;
        let page = self.page_mut();
        page.content.set_line_width(0.8);
        page.content.move_to(x0, rule_y);
        page.content.line_to(x1, rule_y);
        page.content.stroke();

        self.advance(BIG_TITLE_FONT_SIZE);
        Ok(())
    }

    fn comment(&mut self, text: &str) -> Result<()> {
        let width = self.geometry.text_width();
        let lines: Vec<(f32, String)> =
            layout::wrap(text, Font::CourierBold, COMMENT_FONT_SIZE, width)
                .into_iter()
                .map(|l| (0.0, l))
                .collect();
        self.flow(&lines, Font::CourierBold, COMMENT_FONT_SIZE, Some(COMMENT_RGB));
        self.advance(COMMENT_FONT_SIZE * 0.5);
        Ok(())
    }

    fn reserve_toc_pages(&mut self, count: u32) -> Result<()> {
        for _ in 0..count {
            let number = self.push_page(true);
            self.toc_slots.push(number as usize - 1);
        }
        debug!(count, "reserved TOC pages");
        Ok(())
    }

    fn chapter_heading(&mut self, number: usize, title: &str) -> Result<()> {
        let width = self.geometry.text_width();
        let text = format!("Chapter {number} - {title}");
        let lines: Vec<(f32, String)> =
            layout::wrap(&text, Font::HelveticaBold, HEADING_FONT_SIZE, width)
                .into_iter()
                .map(|l| (0.0, l))
                .collect();
        self.flow(&lines, Font::HelveticaBold, HEADING_FONT_SIZE, None);
        self.advance(HEADING_FONT_SIZE * 0.4);
        Ok(())
    }

    fn paragraph(&mut self, text: &str) -> Result<()> {
        let size = self.geometry.body_font_size;
        let width = self.geometry.text_width();
        let indent = PARAGRAPH_INDENT_SPACES * Font::Times.width_ratio() * size * 0.5;
        let lines = layout::wrap_indented(text.trim(), Font::Times, size, width, indent);
        self.flow(&lines, Font::Times, size, None);
        self.advance(size);
        Ok(())
    }

    fn keyword_note(&mut self, label: &str) -> Result<()> {
        if label.is_empty() {
            return Ok(());
        }
        let width = self.geometry.text_width();
        let text = format!("Keywords: {label}");
        let lines: Vec<(f32, String)> =
            layout::wrap(&text, Font::Times, NOTE_FONT_SIZE, width)
                .into_iter()
                .map(|l| (0.0, l))
                .collect();
        self.advance(NOTE_FONT_SIZE * 0.5);
        self.flow(&lines, Font::Times, NOTE_FONT_SIZE, None);
        Ok(())
    }

    fn end_marker(&mut self) -> Result<()> {
        let lines = vec![(0.0, "(end of excerpt)".to_string())];
        self.flow(&lines, Font::TimesItalic, NOTE_FONT_SIZE, None);
        Ok(())
    }

    fn set_back_link_target(&mut self, toc_page: u32) {
        self.current_back_target = toc_page;
    }

    fn write_toc_slot(
        &mut self,
        slot: u32,
        heading: Option<&str>,
        rows: &[TocRow],
    ) -> Result<()> {
        let index = *self
            .toc_slots
            .get(slot as usize)
            .ok_or_else(|| FolioError::Render(format!("no reserved TOC slot {slot}")))?;

        let geometry = self.geometry.clone();
        let row_height = geometry.line_height(TOC_ROW_FONT_SIZE);
        let x = geometry.margin_left;

        let page = &mut self.pages[index];
        page.reserved = false;

        if let Some(title) = heading {
            show_line(
                &mut page.content,
                Font::Helvetica,
                TOC_HEADING_FONT_SIZE,
                x,
                page.cursor_y,
                title,
                None,
            );
            page.cursor_y -= geometry.line_height(TOC_HEADING_FONT_SIZE) * 1.5;
        }

        for row in rows {
            if page.cursor_y < geometry.body_bottom() {
                return Err(FolioError::Render(format!(
                    "TOC slot {slot} overflowed its page"
                )));
            }

            let text = format_toc_row(row);
            let y = page.cursor_y;
            show_line(
                &mut page.content,
                Font::Courier,
                TOC_ROW_FONT_SIZE,
                x,
                y,
                &text,
                None,
            );
            page.links.push((
                Rect::new(
                    x,
                    y - 2.0,
                    geometry.page_width - geometry.margin_right,
                    y + TOC_ROW_FONT_SIZE,
                ),
                row.target_page,
            ));
            page.cursor_y -= row_height;
        }

        Ok(())
    }

    #[instrument(skip_all, fields(pages = self.pages.len()))]
    fn finish(&mut self) -> Result<Vec<u8>> {
        if let Some(slot) = self.pages.iter().position(|p| p.reserved) {
            return Err(FolioError::Render(format!(
                "reserved TOC page {} was never filled",
                slot + 1
            )));
        }
        if self.pages.is_empty() {
            return Err(FolioError::Render("document has no pages".into()));
        }

        let geometry = self.geometry.clone();
        let meta = self.meta.clone();
        let pages = std::mem::take(&mut self.pages);
        let n = pages.len();

        let mut pdf = Pdf::new();
        let mut next_id = 1i32;
        let mut alloc = || {
            let r = Ref::new(next_id);
            next_id += 1;
            r
        };

        let catalog_id = alloc();
        let pages_id = alloc();
        let info_id = alloc();

        let font_refs: Vec<Ref> = Font::ALL.iter().map(|_| alloc()).collect();
        for (font, font_ref) in Font::ALL.iter().zip(&font_refs) {
            pdf.type1_font(*font_ref)
                .base_font(Name(font.base_name().as_bytes()))
                .encoding_predefined(Name(b"WinAnsiEncoding"));
        }

        let page_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
        let content_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();

        let resolve_target = |target: u32| -> Result<Ref> {
            if target == 0 || target as usize > n {
                return Err(FolioError::Render(format!(
                    "link target page {target} out of range 1..={n}"
                )));
            }
            Ok(page_ids[target as usize - 1])
        };

        // Finalize each page: furniture, annotations, compressed stream.
        let mut page_annot_refs: Vec<Vec<Ref>> = Vec::with_capacity(n);
        for (i, mut page) in pages.into_iter().enumerate() {
            let page_number = i + 1;
            draw_furniture(&mut page.content, &geometry, &meta, page_number);

            let mut annot_refs: Vec<Ref> = Vec::new();

            // Footer back-link to this page's TOC page.
            if page.back_target != 0 {
                let target_ref = resolve_target(page.back_target)?;
                let rect = footer_link_rect(&geometry);
                let annot_ref = alloc();
                write_goto_annotation(&mut pdf, annot_ref, rect, target_ref, &geometry);
                annot_refs.push(annot_ref);
            }

            for (rect, target) in &page.links {
                let target_ref = resolve_target(*target)?;
                let annot_ref = alloc();
                write_goto_annotation(&mut pdf, annot_ref, *rect, target_ref, &geometry);
                annot_refs.push(annot_ref);
            }
            page_annot_refs.push(annot_refs);

            let raw = page.content.finish();
            let compressed = compress_to_vec_zlib(&raw, 6);
            pdf.stream(content_ids[i], &compressed)
                .filter(Filter::FlateDecode);
        }

        pdf.catalog(catalog_id).pages(pages_id);
        pdf.pages(pages_id)
            .kids(page_ids.iter().copied())
            .count(n as i32);

        for i in 0..n {
            let mut page = pdf.page(page_ids[i]);
            page.media_box(Rect::new(0.0, 0.0, geometry.page_width, geometry.page_height))
                .parent(pages_id)
                .contents(content_ids[i]);
            if !page_annot_refs[i].is_empty() {
                page.annotations(page_annot_refs[i].iter().copied());
            }
            let mut resources = page.resources();
            let mut fonts = resources.fonts();
            for (font, font_ref) in Font::ALL.iter().zip(&font_refs) {
                fonts.pair(Name(font.resource_name().as_bytes()), *font_ref);
            }
        }

        {
            let mut info = pdf.document_info(info_id);
            info.title(TextStr(&meta.title));
            if let Some(author) = &meta.author {
                info.author(TextStr(author));
            }
            info.creator(TextStr("folio"));
        }

        debug!(pages = n, "document assembled");
        Ok(pdf.finish())
    }
}

// ---------------------------------------------------------------------------
// Drawing helpers
// ---------------------------------------------------------------------------

/// Draw one text line at an absolute position.
fn show_line(
    content: &mut Content,
    font: Font,
    size: f32,
    x: f32,
    y: f32,
    text: &str,
    rgb: Option<(f32, f32, f32)>,
) {
    if let Some((r, g, b)) = rgb {
        content.set_fill_rgb(r, g, b);
    }
    content.begin_text();
    content.set_font(Name(font.resource_name().as_bytes()), size);
    content.next_line(x, y);
    content.show(Str(&to_winansi(text)));
    content.end_text();
    if rgb.is_some() {
        content.set_fill_rgb(0.0, 0.0, 0.0);
    }
}

/// Header text, content rule box, and footer for a finished page.
fn draw_furniture(content: &mut Content, geometry: &PageGeometry, meta: &DocMeta, page: usize) {
    // Header: right-aligned italic label + creation date.
    let header = format!("{} - Created {}", meta.key_phrase, meta.created_label);
    let header_width = layout::text_width(&header, Font::HelveticaOblique, HEADER_FONT_SIZE);
    let header_x = geometry.page_width - geometry.margin_right - header_width;
    let header_y = geometry.page_height - layout::mm_to_pt(10.0);
    show_line(
        content,
        Font::HelveticaOblique,
        HEADER_FONT_SIZE,
        header_x.max(geometry.margin_left),
        header_y,
        &header,
        None,
    );

    // Rule box around the content area.
    let box_bottom = layout::mm_to_pt(14.0);
    let box_top = geometry.page_height - layout::mm_to_pt(14.0);
    content.set_line_width(0.7);
    content.rect(
        geometry.margin_left,
        box_bottom,
        geometry.text_width(),
        box_top - box_bottom,
    );
    content.stroke();

    // Footer: right-aligned gray italic label + page number.
    let footer = format!("{} - Page {page}", meta.key_phrase);
    let footer_width = layout::text_width(&footer, Font::HelveticaOblique, FOOTER_FONT_SIZE);
    let footer_x = geometry.page_width - geometry.margin_right - footer_width;
    content.set_fill_gray(FOOTER_GRAY);
    content.begin_text();
    content.set_font(
        Name(Font::HelveticaOblique.resource_name().as_bytes()),
        FOOTER_FONT_SIZE,
    );
    content.next_line(footer_x.max(geometry.margin_left), layout::mm_to_pt(10.0));
    content.show(Str(&to_winansi(&footer)));
    content.end_text();
    content.set_fill_gray(0.0);
}

/// Clickable rect over the footer text.
fn footer_link_rect(geometry: &PageGeometry) -> Rect {
    Rect::new(
        geometry.page_width / 2.0,
        layout::mm_to_pt(10.0) - 4.0,
        geometry.page_width - geometry.margin_right,
        layout::mm_to_pt(10.0) + FOOTER_FONT_SIZE + 2.0,
    )
}

/// Write a Link annotation with a GoTo action to the top of `target`.
fn write_goto_annotation(
    pdf: &mut Pdf,
    annot_ref: Ref,
    rect: Rect,
    target: Ref,
    geometry: &PageGeometry,
) {
    let mut annot = pdf.annotation(annot_ref);
    annot
        .subtype(AnnotationType::Link)
        .rect(rect)
        .border(0.0, 0.0, 0.0, None);
    annot
        .action()
        .action_type(ActionType::GoTo)
        .destination()
        .page(target)
        .xyz(0.0, geometry.page_height, None);
}

/// "title [label] .... page" with dotted leaders, Courier columns.
fn format_toc_row(row: &TocRow) -> String {
    let mut display = row.title.clone();
    if !row.keyword_label.is_empty() {
        display = format!("{display} [{}]", row.keyword_label);
    }
    if display.chars().count() > TOC_TITLE_MAX_CHARS {
        display = display.chars().take(TOC_TITLE_MAX_CHARS).collect();
    }

    let dots = TOC_LEADER_COLUMNS.saturating_sub(display.chars().count()).max(2);
    format!("{display} {} {}", ".".repeat(dots), row.target_page)
}

/// Encode text as WinAnsi bytes, replacing unmappable characters with `?`.
fn to_winansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            c if (c as u32) < 0x80 => c as u8,
            c if (0xA0..=0xFF).contains(&(c as u32)) => c as u8,
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2020}' => 0x86,
            '\u{2021}' => 0x87,
            '\u{2030}' => 0x89,
            '\u{0160}' => 0x8A,
            '\u{2039}' => 0x8B,
            '\u{0152}' => 0x8C,
            '\u{017D}' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2122}' => 0x99,
            '\u{0161}' => 0x9A,
            '\u{203A}' => 0x9B,
            '\u{0153}' => 0x9C,
            '\u{017E}' => 0x9E,
            '\u{0178}' => 0x9F,
            _ => b'?',
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
