//! Sentence boundary detection.
//!
//! A small deterministic tokenizer: terminators (`.?!`) close a sentence
//! when followed by whitespace and a plausible sentence opener, unless the
//! preceding token is a known abbreviation or a single initial. Text with no
//! terminators at all falls back to non-empty lines, and a single unbroken
//! blob becomes one sentence — the tokenizer never returns nothing for
//! non-empty input.

use folio_shared::Sentence;

/// Lower-case tokens that end with a period without ending a sentence.
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "etc", "e.g", "i.e", "fig", "no",
    "vol", "approx", "dept",
];

/// Split normalized text into sentences with sequential ordinals.
pub fn split_sentences(text: &str) -> Vec<Sentence> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if !trimmed.contains(['.', '?', '!']) {
        return fallback_lines(trimmed);
    }

    let chars: Vec<(usize, char)> = trimmed.char_indices().collect();
    let mut pieces: Vec<&str> = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        let (_, c) = chars[i];
        if !matches!(c, '.' | '?' | '!') {
            i += 1;
            continue;
        }

        // Absorb the full terminator cluster plus trailing closers.
        let mut j = i + 1;
        while j < chars.len() && matches!(chars[j].1, '.' | '?' | '!' | '"' | '\'' | ')' | ']') {
            j += 1;
        }

        // A boundary needs whitespace and then a sentence opener.
        let mut k = j;
        while k < chars.len() && chars[k].1.is_whitespace() {
            k += 1;
        }
        let end = if j < chars.len() { chars[j].0 } else { trimmed.len() };

        let is_boundary = k > j
            && k < chars.len()
            && is_opener(chars[k].1)
            && !ends_with_abbreviation(&trimmed[start..end]);

        if is_boundary {
            let piece = trimmed[start..end].trim();
            if !piece.is_empty() {
                pieces.push(piece);
            }
            start = chars[k].0;
            i = k;
        } else {
            i = j;
        }
    }

    let tail = trimmed[start..].trim();
    if !tail.is_empty() {
        pieces.push(tail);
    }

    pieces
        .into_iter()
        .enumerate()
        .map(|(ordinal, text)| Sentence::new(text, ordinal))
        .collect()
}

/// Characters that plausibly open a new sentence.
fn is_opener(c: char) -> bool {
    c.is_uppercase() || c.is_ascii_digit() || matches!(c, '"' | '\'' | '(' | '[')
}

/// Whether the candidate sentence ends in an abbreviation or an initial.
fn ends_with_abbreviation(candidate: &str) -> bool {
    let stripped = candidate.trim_end_matches(['.', '?', '!', '"', '\'', ')', ']']);
    let last_word = stripped
        .rsplit(|c: char| c.is_whitespace())
        .next()
        .unwrap_or("");

    if last_word.is_empty() {
        return false;
    }

    // Single-letter initials: "J. Smith".
    if last_word.chars().count() == 1 && last_word.chars().all(|c| c.is_alphabetic()) {
        return true;
    }

    ABBREVIATIONS.contains(&last_word.to_lowercase().as_str())
}

/// Terminator-free text: treat each non-empty line as one sentence.
fn fallback_lines(text: &str) -> Vec<Sentence> {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    if lines.len() <= 1 {
        return vec![Sentence::new(text, 0)];
    }

    lines
        .into_iter()
        .enumerate()
        .map(|(ordinal, line)| Sentence::new(line, ordinal))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(sentences: &[Sentence]) -> Vec<&str> {
        sentences.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn splits_plain_prose() {
        let out = split_sentences("First sentence. Second one! Third, finally?");
        assert_eq!(
            texts(&out),
            vec!["First sentence.", "Second one!", "Third, finally?"]
        );
        assert_eq!(out[2].ordinal, 2);
    }

    #[test]
    fn abbreviations_do_not_split() {
        let out = split_sentences("Dr. Smith arrived. He was late.");
        assert_eq!(texts(&out), vec!["Dr. Smith arrived.", "He was late."]);
    }

    #[test]
    fn initials_do_not_split() {
        let out = split_sentences("The author was J. Doe. Nobody knew.");
        assert_eq!(texts(&out), vec!["The author was J. Doe.", "Nobody knew."]);
    }

    #[test]
    fn closing_quotes_stay_attached() {
        let out = split_sentences("\"Stop.\" He ran. It was over.");
        assert_eq!(texts(&out), vec!["\"Stop.\"", "He ran.", "It was over."]);
    }

    #[test]
    fn ellipsis_with_lowercase_continuation_does_not_split() {
        let out = split_sentences("He waited... nothing more came.");
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn no_terminators_falls_back_to_lines() {
        let out = split_sentences("line one\nline two\n\nline three");
        assert_eq!(texts(&out), vec!["line one", "line two", "line three"]);
    }

    #[test]
    fn single_blob_is_one_sentence() {
        let out = split_sentences("just a fragment without an end");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].ordinal, 0);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(split_sentences("   \n  ").is_empty());
    }

    #[test]
    fn coverage_no_words_lost() {
        let input = "Alpha beta. Gamma delta! Epsilon zeta?";
        let out = split_sentences(input);
        let rejoined = out
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(rejoined, input);
    }
}
