//! Coherence-driven paragraph segmentation.
//!
//! Each sentence is represented by the mean of its in-vocabulary token
//! embeddings; adjacent sentences get a cosine affinity score. Paragraph
//! boundaries are chosen by an exact dynamic program over contiguous
//! partitions: maximize within-paragraph affinity minus the affinity cut by
//! each boundary, with paragraph lengths bounded by the configured
//! [min, max] sentence counts (only the final paragraph may run short).
//! Ties resolve to the partition with the fewest boundaries, then to the
//! earliest group the scan considers, so identical inputs always produce
//! byte-identical output.
//!
//! Degradations are absorbed here, never surfaced: sentences with no
//! embeddable tokens get a neutral affinity, and a document with zero
//! coverage anywhere falls back to fixed-size chunking.

use folio_embedding::EmbeddingLookup;
use folio_shared::{Paragraph, SegmentationConfig, Sentence};
use tracing::{debug, instrument, warn};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Length bounds and fallback behavior for segmentation.
#[derive(Debug, Clone)]
pub struct SegmentOptions {
    /// Minimum sentences per paragraph (final paragraph exempt).
    pub min_sentences: usize,
    /// Maximum sentences per paragraph.
    pub max_sentences: usize,
    /// Chunk size used when embedding coverage is zero.
    pub fallback_chunk_size: usize,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            min_sentences: 2,
            max_sentences: 10,
            fallback_chunk_size: 5,
        }
    }
}

impl From<&SegmentationConfig> for SegmentOptions {
    fn from(config: &SegmentationConfig) -> Self {
        Self {
            min_sentences: config.min_sentences,
            max_sentences: config.max_sentences,
            fallback_chunk_size: config.fallback_chunk_size,
        }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Group sentences into paragraphs using the embedding lookup.
///
/// The concatenation of the returned paragraphs' sentences, in order, is
/// exactly the input sequence — nothing is dropped, duplicated, or
/// reordered.
#[instrument(skip_all, fields(sentences = sentences.len()))]
pub fn segment(
    sentences: &[Sentence],
    lookup: &EmbeddingLookup,
    opts: &SegmentOptions,
) -> Vec<Paragraph> {
    let n = sentences.len();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return group_by_lengths(sentences, &[1]);
    }

    let vectors: Vec<Option<Vec<f32>>> = sentences
        .iter()
        .map(|s| sentence_vector(&s.text, lookup))
        .collect();

    let covered = vectors.iter().filter(|v| v.is_some()).count();
    if covered == 0 {
        warn!(
            chunk = opts.fallback_chunk_size,
            "no embedding coverage anywhere, falling back to fixed-size chunking"
        );
        return chunk_fixed(sentences, opts.fallback_chunk_size);
    }
    if covered < n / 2 {
        debug!(covered, total = n, "low embedding coverage, boundaries will be weak");
    }

    // Affinity between each adjacent sentence pair; neutral when either
    // side has no embeddable tokens.
    let affinity: Vec<f64> = vectors
        .windows(2)
        .map(|pair| match (&pair[0], &pair[1]) {
            (Some(a), Some(b)) => cosine(a, b),
            _ => 0.0,
        })
        .collect();

    let lengths = optimal_partition(&affinity, n, opts);
    group_by_lengths(sentences, &lengths)
}

/// Sentence-per-paragraph mode: K sentences yield K paragraphs.
pub fn sentences_as_paragraphs(sentences: &[Sentence]) -> Vec<Paragraph> {
    sentences
        .iter()
        .filter_map(|s| Paragraph::new(vec![s.clone()]))
        .collect()
}

/// Fixed-size chunking used when the lookup covers nothing.
pub fn chunk_fixed(sentences: &[Sentence], chunk_size: usize) -> Vec<Paragraph> {
    let chunk_size = chunk_size.max(1);
    sentences
        .chunks(chunk_size)
        .filter_map(|chunk| Paragraph::new(chunk.to_vec()))
        .collect()
}

// ---------------------------------------------------------------------------
// Sentence vectors
// ---------------------------------------------------------------------------

/// Mean of the in-vocabulary token vectors, `None` when nothing is covered.
fn sentence_vector(text: &str, lookup: &EmbeddingLookup) -> Option<Vec<f32>> {
    let mut sum: Vec<f32> = vec![0.0; lookup.dim()];
    let mut count = 0usize;

    for token in tokenize(text) {
        if let Some(vec) = lookup.lookup(token) {
            for (acc, v) in sum.iter_mut().zip(vec) {
                *acc += v;
            }
            count += 1;
        }
    }

    if count == 0 {
        return None;
    }
    for v in &mut sum {
        *v /= count as f32;
    }
    Some(sum)
}

/// Word tokens: maximal alphanumeric runs, matched lower-case by the lookup.
fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
}

/// Cosine similarity, 0 when either vector has no magnitude.
fn cosine(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

// ---------------------------------------------------------------------------
// Boundary selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Cell {
    score: f64,
    boundaries: u32,
    prev: usize,
}

/// Choose paragraph lengths by exact dynamic programming.
///
/// `affinity[i]` scores the junction between sentences `i` and `i + 1`.
/// A partition keeps junctions inside paragraphs and cuts the rest; the
/// objective credits kept affinity and debits cut affinity. Group lengths
/// must lie in `[min, max]` except for the final group, which may be
/// shorter when the tail cannot fill a minimum-length paragraph.
fn optimal_partition(affinity: &[f64], n: usize, opts: &SegmentOptions) -> Vec<usize> {
    let min_len = opts.min_sentences.max(1);
    let max_len = opts.max_sentences.max(min_len);

    // prefix[i] = sum of affinity[0..i]
    let mut prefix = vec![0.0f64; affinity.len() + 1];
    for (i, a) in affinity.iter().enumerate() {
        prefix[i + 1] = prefix[i] + a;
    }
    let within = |k: usize, j: usize| prefix[j - 1] - prefix[k];

    let mut best: Vec<Option<Cell>> = vec![None; n + 1];
    best[0] = Some(Cell {
        score: 0.0,
        boundaries: 0,
        prev: 0,
    });

    for j in 1..=n {
        // Regular groups first; a short tail is only legal at j == n.
        let mut candidate_lengths: Vec<usize> =
            (min_len..=max_len.min(j)).collect();
        if j == n {
            candidate_lengths.extend(1..min_len.min(j + 1));
        }

        for len in candidate_lengths {
            let k = j - len;
            let Some(prev) = best[k] else { continue };

            let kept = if j - k >= 2 { within(k, j) } else { 0.0 };
            let cut = if k > 0 { affinity[k - 1] } else { 0.0 };
            let score = prev.score + kept - cut;
            let boundaries = prev.boundaries + u32::from(k > 0);

            let better = match best[j] {
                None => true,
                Some(cur) => {
                    score > cur.score
                        || (score == cur.score && boundaries < cur.boundaries)
                }
            };
            if better {
                best[j] = Some(Cell {
                    score,
                    boundaries,
                    prev: k,
                });
            }
        }
    }

    // Reconstruct group lengths; best[n] is always reachable because the
    // tail rule admits every length down to 1.
    let mut lengths: Vec<usize> = Vec::new();
    let mut j = n;
    while j > 0 {
        let cell = match best[j] {
            Some(c) => c,
            None => {
                // Defensive: degrade to one group rather than lose text.
                return vec![n];
            }
        };
        lengths.push(j - cell.prev);
        j = cell.prev;
    }
    lengths.reverse();
    lengths
}

/// Materialize paragraphs from consecutive group lengths.
fn group_by_lengths(sentences: &[Sentence], lengths: &[usize]) -> Vec<Paragraph> {
    let mut out = Vec::with_capacity(lengths.len());
    let mut start = 0usize;
    for &len in lengths {
        let end = (start + len).min(sentences.len());
        if let Some(p) = Paragraph::new(sentences[start..end].to_vec()) {
            out.push(p);
        }
        start = end;
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Two well-separated topics: fruit words near [1, 0], machine words
    /// near [0, 1].
    const TOPIC_MODEL: &str = "\
apple 1.0 0.05
banana 0.95 0.1
fruit 0.9 0.0
orchard 1.0 0.1
engine 0.0 1.0
steel 0.1 0.95
piston 0.05 1.0
factory 0.0 0.9
";

    fn topic_lookup() -> EmbeddingLookup {
        EmbeddingLookup::from_reader(TOPIC_MODEL.as_bytes()).unwrap()
    }

    fn sentences(texts: &[&str]) -> Vec<Sentence> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Sentence::new(*t, i))
            .collect()
    }

    fn lengths(paragraphs: &[Paragraph]) -> Vec<usize> {
        paragraphs.iter().map(Paragraph::len).collect()
    }

    #[test]
    fn single_sentence_single_paragraph() {
        let input = sentences(&["An apple."]);
        let out = segment(&input, &topic_lookup(), &SegmentOptions::default());
        assert_eq!(lengths(&out), vec![1]);
    }

    #[test]
    fn empty_input_empty_output() {
        let out = segment(&[], &topic_lookup(), &SegmentOptions::default());
        assert!(out.is_empty());
    }

    #[test]
    fn boundary_lands_on_topic_shift() {
        let input = sentences(&[
            "The apple fell in the orchard.",
            "Banana and fruit crates everywhere.",
            "More fruit on the apple cart.",
            "The engine needed steel.",
            "A piston cracked in the factory.",
            "Steel and engine parts piled up.",
        ]);
        let opts = SegmentOptions {
            min_sentences: 2,
            max_sentences: 4,
            fallback_chunk_size: 5,
        };
        let out = segment(&input, &topic_lookup(), &opts);
        assert_eq!(lengths(&out), vec![3, 3]);
        assert_eq!(out[0].start_ordinal(), 0);
        assert_eq!(out[1].start_ordinal(), 3);
    }

    #[test]
    fn coverage_invariant_holds() {
        let input = sentences(&[
            "Apple one.",
            "Banana two.",
            "Engine three.",
            "Steel four.",
            "Piston five.",
            "Factory six.",
            "Orchard seven.",
        ]);
        let out = segment(&input, &topic_lookup(), &SegmentOptions::default());

        let flattened: Vec<&Sentence> =
            out.iter().flat_map(|p| p.sentences().iter()).collect();
        assert_eq!(flattened.len(), input.len());
        for (got, want) in flattened.iter().zip(&input) {
            assert_eq!(*got, want);
        }
    }

    #[test]
    fn paragraph_length_bounds_respected() {
        let texts: Vec<String> = (0..23)
            .map(|i| {
                if (i / 4) % 2 == 0 {
                    format!("Apple fruit number {i}.")
                } else {
                    format!("Engine steel number {i}.")
                }
            })
            .collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let input = sentences(&refs);

        let opts = SegmentOptions {
            min_sentences: 2,
            max_sentences: 6,
            fallback_chunk_size: 5,
        };
        let out = segment(&input, &topic_lookup(), &opts);

        let lens = lengths(&out);
        for (i, len) in lens.iter().enumerate() {
            assert!(*len <= 6, "paragraph {i} too long: {len}");
            if i + 1 < lens.len() {
                assert!(*len >= 2, "paragraph {i} too short: {len}");
            }
        }
        assert_eq!(lens.iter().sum::<usize>(), 23);
    }

    #[test]
    fn zero_coverage_falls_back_to_chunking() {
        let input = sentences(&[
            "Zzyx qwfp one.",
            "Vbnm ghjk two.",
            "Qqqq wwww three.",
            "Rrrr tttt four.",
            "Yyyy uuuu five.",
            "Iiii oooo six.",
            "Pppp aaaa seven.",
        ]);
        let out = segment(&input, &topic_lookup(), &SegmentOptions::default());
        assert_eq!(lengths(&out), vec![5, 2]);
    }

    #[test]
    fn deterministic_across_runs() {
        let input = sentences(&[
            "Apple and banana.",
            "Fruit in the orchard.",
            "Engine with a piston.",
            "Steel at the factory.",
            "Banana fruit again.",
        ]);
        let opts = SegmentOptions::default();
        let lookup = topic_lookup();
        let first = segment(&input, &lookup, &opts);
        let second = segment(&input, &lookup, &opts);
        assert_eq!(first, second);
    }

    #[test]
    fn sentences_mode_is_one_per_paragraph() {
        let input = sentences(&["One.", "Two.", "Three."]);
        let out = sentences_as_paragraphs(&input);
        assert_eq!(lengths(&out), vec![1, 1, 1]);
        assert_eq!(out[1].text(), "Two.");
    }

    #[test]
    fn chunk_fixed_splits_evenly() {
        let input = sentences(&["a.", "b.", "c.", "d.", "e."]);
        let out = chunk_fixed(&input, 2);
        assert_eq!(lengths(&out), vec![2, 2, 1]);
    }
}
