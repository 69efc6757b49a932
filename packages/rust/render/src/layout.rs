//! Page geometry and text measurement.
//!
//! All coordinates are PDF points with the origin at the bottom-left corner
//! of the page. Text is measured with per-font approximate advance-width
//! ratios — Courier is exact (it is monospaced), the proportional faces use
//! a conservative average so wrapped lines never overflow the column by
//! more than a glyph or two inside the margin slack.

/// A4 portrait in points.
pub const A4_WIDTH_PT: f32 = 595.276;
pub const A4_HEIGHT_PT: f32 = 841.89;

/// Line height as a multiple of the font size.
pub const LINE_SPACING: f32 = 1.45;

/// Convert millimetres to points.
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * 72.0 / 25.4
}

// ---------------------------------------------------------------------------
// Fonts
// ---------------------------------------------------------------------------

/// The base-14 faces the renderer draws with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Font {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    Times,
    TimesItalic,
    Courier,
    CourierBold,
}

impl Font {
    /// All faces, in resource-dictionary order.
    pub const ALL: [Font; 7] = [
        Font::Helvetica,
        Font::HelveticaBold,
        Font::HelveticaOblique,
        Font::Times,
        Font::TimesItalic,
        Font::Courier,
        Font::CourierBold,
    ];

    /// PDF resource name for this face.
    pub fn resource_name(self) -> &'static str {
        match self {
            Font::Helvetica => "F1",
            Font::HelveticaBold => "F2",
            Font::HelveticaOblique => "F3",
            Font::Times => "F4",
            Font::TimesItalic => "F5",
            Font::Courier => "F6",
            Font::CourierBold => "F7",
        }
    }

    /// PostScript base font name.
    pub fn base_name(self) -> &'static str {
        match self {
            Font::Helvetica => "Helvetica",
            Font::HelveticaBold => "Helvetica-Bold",
            Font::HelveticaOblique => "Helvetica-Oblique",
            Font::Times => "Times-Roman",
            Font::TimesItalic => "Times-Italic",
            Font::Courier => "Courier",
            Font::CourierBold => "Courier-Bold",
        }
    }

    /// Approximate glyph advance as a fraction of the font size.
    ///
    /// Courier is exact (600/1000 em). The proportional values are averages
    /// over typical English text.
    pub fn width_ratio(self) -> f32 {
        match self {
            Font::Helvetica | Font::HelveticaOblique => 0.52,
            Font::HelveticaBold => 0.55,
            Font::Times | Font::TimesItalic => 0.50,
            Font::Courier | Font::CourierBold => 0.60,
        }
    }
}

/// Estimated advance width of `text` at the given size.
pub fn text_width(text: &str, font: Font, size: f32) -> f32 {
    text.chars().count() as f32 * font.width_ratio() * size
}

/// Greedy word wrap into lines no wider than `max_width`.
///
/// Words wider than the column are hard-split rather than overflowing.
/// Wrapping is purely width-driven, so identical input always produces
/// identical lines.
pub fn wrap(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let char_width = font.width_ratio() * size;
    let max_chars = ((max_width / char_width).floor() as usize).max(1);

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            // Flush, then hard-split the oversized word.
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for chunk in chars.chunks(max_chars) {
                lines.push(chunk.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() {
            word_len
        } else {
            current_len + 1 + word_len
        };

        if needed > max_chars {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            current_len = needed;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Word wrap with a hanging first-line indent.
///
/// Returns `(x_offset, line)` pairs: the first line is narrowed by
/// `first_indent` and drawn shifted right by the same amount, continuation
/// lines use the full column.
pub fn wrap_indented(
    text: &str,
    font: Font,
    size: f32,
    max_width: f32,
    first_indent: f32,
) -> Vec<(f32, String)> {
    let char_width = font.width_ratio() * size;
    let max_chars = ((max_width / char_width).floor() as usize).max(2);
    let indent_chars = ((first_indent / char_width).ceil() as usize).min(max_chars - 1);

    let mut lines: Vec<(f32, String)> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    let cap_for = |line_index: usize| {
        if line_index == 0 {
            max_chars - indent_chars
        } else {
            max_chars
        }
    };

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let cap = cap_for(lines.len());

        if word_len > cap {
            if !current.is_empty() {
                lines.push((0.0, std::mem::take(&mut current)));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            let mut rest = chars.as_slice();
            while !rest.is_empty() {
                let cap = cap_for(lines.len());
                let take = cap.min(rest.len());
                lines.push((0.0, rest[..take].iter().collect()));
                rest = &rest[take..];
            }
            continue;
        }

        let needed = if current.is_empty() {
            word_len
        } else {
            current_len + 1 + word_len
        };

        if needed > cap {
            lines.push((0.0, std::mem::take(&mut current)));
            current.push_str(word);
            current_len = word_len;
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            current_len = needed;
        }
    }
    if !current.is_empty() {
        lines.push((0.0, current));
    }

    if let Some(first) = lines.first_mut() {
        first.0 = first_indent;
    }
    lines
}

// ---------------------------------------------------------------------------
// Page geometry
// ---------------------------------------------------------------------------

/// Margins, column width, and the vertical band available for body text.
#[derive(Debug, Clone)]
pub struct PageGeometry {
    pub page_width: f32,
    pub page_height: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub body_font_size: f32,
}

impl PageGeometry {
    /// A4 portrait with the standard or narrow e-writer margins.
    pub fn a4(narrow: bool, body_font_size: f32) -> Self {
        let page_width = A4_WIDTH_PT;
        let side = if narrow {
            // Narrow reading column: each side margin takes a reduced third
            // of the page width.
            (page_width / 3.0) * 0.75
        } else {
            mm_to_pt(10.0)
        };

        Self {
            page_width,
            page_height: A4_HEIGHT_PT,
            margin_left: side,
            margin_right: side,
            margin_top: mm_to_pt(20.0),
            margin_bottom: mm_to_pt(20.0),
            body_font_size,
        }
    }

    /// Width of the text column.
    pub fn text_width(&self) -> f32 {
        self.page_width - self.margin_left - self.margin_right
    }

    /// Baseline-to-baseline distance at the given size.
    pub fn line_height(&self, size: f32) -> f32 {
        size * LINE_SPACING
    }

    /// First baseline of body text on a fresh page.
    pub fn body_top(&self) -> f32 {
        self.page_height - self.margin_top - self.body_font_size
    }

    /// Lowest allowed baseline before a page break.
    pub fn body_bottom(&self) -> f32 {
        self.margin_bottom
    }

    /// Body lines that fit on one page, for pre-render estimation.
    pub fn estimate_lines_per_page(&self) -> u32 {
        let band = self.body_top() - self.body_bottom();
        (band / self.line_height(self.body_font_size)).floor().max(1.0) as u32
    }

    /// Body characters per line, for pre-render estimation.
    pub fn estimate_chars_per_line(&self) -> u32 {
        let char_width = Font::Times.width_ratio() * self.body_font_size;
        (self.text_width() / char_width).floor().max(1.0) as u32
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mm_conversion() {
        assert!((mm_to_pt(25.4) - 72.0).abs() < 1e-4);
    }

    #[test]
    fn courier_width_is_exact() {
        let w = text_width("abcde", Font::Courier, 10.0);
        assert!((w - 5.0 * 6.0).abs() < 1e-4);
    }

    #[test]
    fn wrap_keeps_words_whole() {
        let lines = wrap(
            "the quick brown fox jumps over the lazy dog",
            Font::Courier,
            10.0,
            16.0 * 6.0, // 16 monospace columns
        );
        for line in &lines {
            assert!(line.chars().count() <= 16, "line too wide: {line:?}");
            assert!(!line.starts_with(' ') && !line.ends_with(' '));
        }
        let rejoined = lines.join(" ");
        assert_eq!(rejoined, "the quick brown fox jumps over the lazy dog");
    }

    #[test]
    fn wrap_hard_splits_oversized_words() {
        let lines = wrap("abcdefghijklmnop", Font::Courier, 10.0, 5.0 * 6.0);
        assert_eq!(lines, vec!["abcde", "fghij", "klmno", "p"]);
    }

    #[test]
    fn wrap_is_deterministic() {
        let text = "some words that will wrap across a few lines of output";
        let a = wrap(text, Font::Times, 14.0, 120.0);
        let b = wrap(text, Font::Times, 14.0, 120.0);
        assert_eq!(a, b);
    }

    #[test]
    fn wrap_indented_shifts_first_line() {
        let lines = wrap_indented(
            "alpha beta gamma delta epsilon zeta",
            Font::Courier,
            10.0,
            12.0 * 6.0, // 12 monospace columns
            4.0 * 6.0,  // 4-column indent
        );
        assert!(lines.len() > 1);
        assert!((lines[0].0 - 24.0).abs() < 1e-4);
        assert!(lines[0].1.chars().count() <= 8);
        for (offset, line) in &lines[1..] {
            assert_eq!(*offset, 0.0);
            assert!(line.chars().count() <= 12);
        }
        let rejoined: Vec<&str> = lines.iter().map(|(_, l)| l.as_str()).collect();
        assert_eq!(
            rejoined.join(" "),
            "alpha beta gamma delta epsilon zeta"
        );
    }

    #[test]
    fn narrow_margins_shrink_the_column() {
        let standard = PageGeometry::a4(false, 14.0);
        let narrow = PageGeometry::a4(true, 14.0);
        assert!(narrow.text_width() < standard.text_width() * 0.6);
        assert!(narrow.estimate_chars_per_line() < standard.estimate_chars_per_line());
    }

    #[test]
    fn estimates_are_positive() {
        let geometry = PageGeometry::a4(false, 14.0);
        assert!(geometry.estimate_lines_per_page() > 20);
        assert!(geometry.estimate_chars_per_line() > 40);
    }
}
