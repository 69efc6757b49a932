//! Text normalization, sentence tokenization, and chapter-title helpers.
//!
//! Normalization is a sequence of `&str -> String` passes that repair the
//! spacing quirks of OCR'd or machine-produced text and scrub characters the
//! page renderer cannot encode. Sentence splitting and keyword labels live
//! in their own modules.

mod keywords;
mod sentences;

use std::sync::LazyLock;

use regex::Regex;

pub use keywords::{KeywordOptions, keyword_label};
pub use sentences::split_sentences;

// ---------------------------------------------------------------------------
// Normalization pipeline
// ---------------------------------------------------------------------------

/// Run the full normalization pipeline on raw chapter text.
pub fn normalize(text: &str) -> String {
    let mut result = text.to_string();

    result = strip_control_chars(&result);
    result = normalize_typography(&result);
    result = fix_punct_spaces(&result);
    result = ensure_space_after_period(&result);
    result = collapse_spaces(&result);

    result.trim().to_string()
}

// ---------------------------------------------------------------------------
// Pass 1: Strip control characters
// ---------------------------------------------------------------------------

/// Drop control characters other than newlines and tabs; tabs become spaces.
fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '\t' => Some(' '),
            '\n' => Some('\n'),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Pass 2: Normalize typography
// ---------------------------------------------------------------------------

/// Replace curly quotes, exotic dashes, and ellipses with plain forms the
/// WinAnsi page encoding can represent.
fn normalize_typography(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' => '\'',
            '\u{201C}' | '\u{201D}' | '\u{201E}' => '"',
            '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2212}' => '-',
            '\u{00A0}' => ' ',
            c => c,
        })
        .collect::<String>()
        .replace('\u{2026}', "...")
}

// ---------------------------------------------------------------------------
// Pass 3: Re-attach punctuation separated by spaces
// ---------------------------------------------------------------------------

/// Replace spaces around punctuation clusters: "hello , there" → "hello, there".
fn fix_punct_spaces(text: &str) -> String {
    static PUNCT_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\s*([?!.,;:]+(?:\s+[?!.,;:]+)*)\s*").expect("valid regex")
    });

    let fixed = PUNCT_RE.replace_all(text, |caps: &regex::Captures| {
        format!("{} ", caps[1].replace(' ', ""))
    });

    fixed.replace(" ' ", "'").replace(" \" ", "\"")
}

// ---------------------------------------------------------------------------
// Pass 4: Space after sentence periods
// ---------------------------------------------------------------------------

/// Insert a missing space after a period that directly precedes a letter
/// ("end.Next" → "end. Next"). Decimal numbers are left alone.
fn ensure_space_after_period(text: &str) -> String {
    static PERIOD_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\.([A-Za-z])").expect("valid regex"));

    PERIOD_RE.replace_all(text, ". $1").to_string()
}

// ---------------------------------------------------------------------------
// Pass 5: Collapse space runs
// ---------------------------------------------------------------------------

/// Collapse runs of spaces into one, trimming trailing spaces per line.
fn collapse_spaces(text: &str) -> String {
    static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").expect("valid regex"));

    SPACE_RE
        .replace_all(text, " ")
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Chapter titles
// ---------------------------------------------------------------------------

/// File-name tokens dropped from derived chapter titles.
const TITLE_JUNK: &[&str] = &["ocr", "summ", "digest", "copy"];

/// Derive a display title from a file stem.
///
/// Separators become spaces, junk tokens are dropped, the result is
/// truncated to `max_len` characters and capitalized.
pub fn beautify_title(stem: &str, max_len: usize) -> String {
    let spaced = stem.replace(['_', '-', '.'], " ");

    let mut words: Vec<String> = spaced
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .filter(|w| !TITLE_JUNK.contains(&w.as_str()))
        .collect();

    if words.is_empty() {
        // Nothing survived filtering; fall back to the raw stem.
        words = spaced.split_whitespace().map(|w| w.to_lowercase()).collect();
    }

    let mut title: String = words.join(" ");
    if title.chars().count() > max_len {
        title = title.chars().take(max_len).collect::<String>().trim_end().to_string();
    }

    let mut chars = title.chars();
    match chars.next() {
        Some(first) => {
            let upper: String = first.to_uppercase().collect();
            format!("{upper}{}", chars.collect::<String>())
        }
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fix_punct_spaces_reattaches() {
        assert_eq!(fix_punct_spaces("hello , there ."), "hello, there. ");
        assert_eq!(fix_punct_spaces("wait ... what"), "wait... what");
    }

    #[test]
    fn space_after_period_added() {
        assert_eq!(ensure_space_after_period("end.Next"), "end. Next");
        // Decimal numbers stay intact
        assert_eq!(ensure_space_after_period("pi is 3.14"), "pi is 3.14");
    }

    #[test]
    fn typography_is_flattened() {
        let input = "\u{201C}quoted\u{201D} \u{2013} it\u{2019}s fine\u{2026}";
        assert_eq!(normalize_typography(input), "\"quoted\" - it's fine...");
    }

    #[test]
    fn control_chars_stripped() {
        assert_eq!(strip_control_chars("a\u{0000}b\tc\nd"), "ab c\nd");
    }

    #[test]
    fn normalize_full_pipeline() {
        let input = "First  line .Second\u{2019}s   thought , yes .";
        let result = normalize(input);
        assert_eq!(result, "First line. Second's thought, yes.");
    }

    #[test]
    fn beautify_title_from_stem() {
        assert_eq!(
            beautify_title("03_war_and_peace_ocr", 75),
            "03 war and peace"
        );
        assert_eq!(beautify_title("my-notes.v2", 75), "My notes v2");
    }

    #[test]
    fn beautify_title_truncates() {
        let long = "a".repeat(100);
        assert_eq!(beautify_title(&long, 10).chars().count(), 10);
    }

    #[test]
    fn beautify_title_all_junk_falls_back() {
        assert_eq!(beautify_title("ocr_summ", 75), "Ocr summ");
    }
}
