//! Trigram similarity with the same word padding rules as PostgreSQL's `pg_trgm`.

use crate::text::words;
use std::collections::BTreeSet;

/// Trigrams of every word in `text`, each word padded with two leading spaces
/// and one trailing space.
pub fn trigrams(text: &str) -> BTreeSet<String> {
    let lowered = text.to_lowercase();
    let mut set = BTreeSet::new();
    for word in words(&lowered) {
        add_word(&mut set, word);
    }
    set
}

fn add_word(set: &mut BTreeSet<String>, word: &str) {
    let padded: Vec<char> = "  ".chars().chain(word.chars()).chain(" ".chars()).collect();
    for window in padded.windows(3) {
        set.insert(window.iter().collect());
    }
}

/// Shared trigrams over the union of both sets, in `[0, 1]`.
pub fn similarity(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    let union = a.len() + b.len() - shared;
    shared as f32 / union as f32
}

/// Similarity of `query` to `text`.
///
/// Takes the better of whole-text similarity and the best match of the query
/// against any run of consecutive words in `text` as long as the query, so a
/// misspelled word still scores well against a long passage.
pub fn best_similarity(query: &str, text: &str) -> f32 {
    let query_set = trigrams(query);
    if query_set.is_empty() {
        return 0.0;
    }

    let whole = similarity(&query_set, &trigrams(text));

    let lowered = text.to_lowercase();
    let text_words: Vec<&str> = words(&lowered).collect();
    let span = words(query).count().max(1);
    let best_window = text_words
        .windows(span.min(text_words.len().max(1)))
        .map(|window| {
            let mut set = BTreeSet::new();
            for word in window {
                add_word(&mut set, word);
            }
            similarity(&query_set, &set)
        })
        .fold(0.0f32, f32::max);

    whole.max(best_window)
}
