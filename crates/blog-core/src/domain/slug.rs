//! URL slugs.

use unicode_normalization::UnicodeNormalization;

/// Turn arbitrary text into a URL slug.
///
/// Text is NFKD-decomposed first so accented letters keep their ASCII
/// base. ASCII letters, digits, `_` and `-` survive (lowercased), runs of
/// whitespace and hyphens become a single `-`, anything else is dropped.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for ch in text.nfkd() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() || ch == '-' {
            pending_dash = true;
        }
    }

    slug.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// Whether `slug` only holds characters a slug field accepts.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
