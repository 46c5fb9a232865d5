//! Trigram similarity with the same word splitting and padding rules as
//! PostgreSQL's `pg_trgm`, so the in-memory store ranks like the database.

use std::collections::HashSet;

type Trigram = [char; 3];

/// Set of trigrams for `text`.
///
/// Each alphanumeric word is lowercased and padded with two leading spaces
/// and one trailing space before windows of three are taken.
pub fn trigrams(text: &str) -> HashSet<Trigram> {
    let mut set = HashSet::new();

    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let padded: Vec<char> = "  "
            .chars()
            .chain(word.chars().flat_map(char::to_lowercase))
            .chain(std::iter::once(' '))
            .collect();

        for window in padded.windows(3) {
            set.insert([window[0], window[1], window[2]]);
        }
    }

    set
}

/// Shared trigrams over all distinct trigrams, in `[0, 1]`.
pub fn similarity(a: &str, b: &str) -> f32 {
    let left = trigrams(a);
    let right = trigrams(b);

    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    let shared = left.intersection(&right).count();

    shared as f32 / union as f32
}
