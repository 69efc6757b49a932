//! Per-chapter keyword labels.
//!
//! A small frequency-scored extractor over stopword-filtered unigrams and
//! bigrams. It exists to label chapters in the TOC and at chapter ends, not
//! to compete with a full keyphrase system: counts win, bigrams get a
//! specificity bonus, ties break on first occurrence then spelling so the
//! output is deterministic.

use std::collections::HashMap;

/// Common English function words excluded from keyword candidates.
const STOPWORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "because",
    "been", "before", "but", "by", "can", "could", "did", "do", "does", "for", "from", "had",
    "has", "have", "he", "her", "him", "his", "how", "i", "if", "in", "into", "is", "it", "its",
    "just", "like", "may", "me", "more", "most", "my", "no", "not", "of", "on", "one", "only",
    "or", "other", "our", "out", "over", "she", "so", "some", "such", "than", "that", "the",
    "their", "them", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "up", "very", "was", "we", "were", "what", "when", "where", "which", "while", "who",
    "will", "with", "would", "you", "your",
];

/// Options for keyword label extraction.
#[derive(Debug, Clone)]
pub struct KeywordOptions {
    /// Number of keywords in the label.
    pub max_keywords: usize,
    /// Minimum character length for a candidate word.
    pub min_word_len: usize,
}

impl Default for KeywordOptions {
    fn default() -> Self {
        Self {
            max_keywords: 10,
            min_word_len: 3,
        }
    }
}

#[derive(Debug)]
struct Candidate {
    count: usize,
    first_seen: usize,
    is_bigram: bool,
}

/// Extract a short, comma-joined keyword label from chapter text.
///
/// Returns an empty string when nothing qualifies.
pub fn keyword_label(text: &str, opts: &KeywordOptions) -> String {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .map(|w| w.trim_matches('\'').to_lowercase())
        .collect();

    let usable: Vec<(usize, &str)> = words
        .iter()
        .enumerate()
        .filter(|(_, w)| {
            w.chars().count() >= opts.min_word_len
                && !STOPWORDS.contains(&w.as_str())
                && w.chars().any(|c| c.is_alphabetic())
        })
        .map(|(i, w)| (i, w.as_str()))
        .collect();

    let mut candidates: HashMap<String, Candidate> = HashMap::new();

    for &(pos, word) in &usable {
        let entry = candidates.entry(word.to_string()).or_insert(Candidate {
            count: 0,
            first_seen: pos,
            is_bigram: false,
        });
        entry.count += 1;
    }

    // Bigrams require the two content words to be adjacent in the source.
    for pair in usable.windows(2) {
        let (pos_a, a) = pair[0];
        let (pos_b, b) = pair[1];
        if pos_b == pos_a + 1 {
            let key = format!("{a} {b}");
            let entry = candidates.entry(key).or_insert(Candidate {
                count: 0,
                first_seen: pos_a,
                is_bigram: true,
            });
            entry.count += 1;
        }
    }

    // Repeated bigrams beat their component words; drop components that
    // only ever appear inside a surviving bigram.
    let mut scored: Vec<(String, f64, usize)> = candidates
        .iter()
        .filter(|(_, c)| !c.is_bigram || c.count >= 2)
        .map(|(term, c)| {
            let bonus = if c.is_bigram { 1.8 } else { 1.0 };
            (term.clone(), c.count as f64 * bonus, c.first_seen)
        })
        .collect();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.2.cmp(&b.2))
            .then_with(|| a.0.cmp(&b.0))
    });

    let mut picked: Vec<String> = Vec::new();
    for (term, _, _) in scored {
        if picked.len() >= opts.max_keywords {
            break;
        }
        // Skip unigrams already covered by a picked bigram.
        if picked.iter().any(|p| p.split(' ').any(|w| w == term)) {
            continue;
        }
        picked.push(term);
    }

    picked.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequent_terms_win() {
        let text = "The harvest failed. The harvest was late. Farmers feared the harvest.";
        let label = keyword_label(text, &KeywordOptions::default());
        assert!(label.starts_with("harvest"), "got: {label}");
    }

    #[test]
    fn repeated_bigrams_beat_unigrams() {
        let text = "Steam engine repairs. The steam engine stalled. A steam engine again.";
        let label = keyword_label(text, &KeywordOptions::default());
        assert!(label.starts_with("steam engine"), "got: {label}");
        // Component unigrams are not repeated after the bigram
        assert!(!label.contains(", steam,"));
    }

    #[test]
    fn stopwords_never_appear() {
        let text = "the the the and and because because mountain";
        let label = keyword_label(text, &KeywordOptions::default());
        assert_eq!(label, "mountain");
    }

    #[test]
    fn empty_text_gives_empty_label() {
        assert_eq!(keyword_label("", &KeywordOptions::default()), "");
        assert_eq!(keyword_label("a an of", &KeywordOptions::default()), "");
    }

    #[test]
    fn deterministic_output() {
        let text = "alpha beta gamma alpha beta gamma delta";
        let opts = KeywordOptions::default();
        assert_eq!(keyword_label(text, &opts), keyword_label(text, &opts));
    }

    #[test]
    fn respects_max_keywords() {
        let text = "one two three four five six seven eight nine ten eleven twelve";
        let label = keyword_label(
            text,
            &KeywordOptions {
                max_keywords: 3,
                ..Default::default()
            },
        );
        assert_eq!(label.split(", ").count(), 3);
    }
}
