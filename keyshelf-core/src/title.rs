//! Title cleanup, normalization and fuzzy comparison.
//!
//! Storefronts decorate catalog names with edition and packaging noise:
//! ```text
//! Half-Life 2: Game of the Year Edition
//! DOOM Eternal - Deluxe Edition Bundle...
//! ```
//! [`clean_title`] removes that noise for use as a search term, and
//! [`normalize_title`] reduces the result to the lowercase alphanumeric key
//! used by the offline dictionary and the search cache.

use std::sync::LazyLock;

use regex::Regex;

/// Edition/packaging noise: an optional separator, an optional "The", one of
/// the known edition words, optionally followed by a qualifier, "Bundle", and
/// a trailing ellipsis.
static EDITION_NOISE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(:| -| –| —)?\s*(The\s+)?(Pre-Purchase|Pre-Order|Steam Key|Complete|Anthology|Collection|Definitive|Game of the Year|GOTY|Deluxe|Ultimate|Premium)(\s+(Edition|Cut|Content|Pack))?(\s+Bundle)?(\s*\.{3,})?",
    )
    .unwrap()
});

/// Strip edition noise, trim, and lowercase. Punctuation is kept so the
/// result still reads well as a search term.
///
/// # Examples
///
/// ```
/// use keyshelf_core::title::clean_title;
///
/// assert_eq!(clean_title("Half-Life 2: Game of the Year Edition"), "half-life 2");
/// assert_eq!(clean_title("Portal 2"), "portal 2");
/// ```
pub fn clean_title(title: &str) -> String {
    EDITION_NOISE_REGEX
        .replace_all(title, "")
        .trim()
        .to_lowercase()
}

/// Reduce a title to its lookup key: [`clean_title`] followed by removal of
/// everything except ASCII letters and digits.
///
/// # Examples
///
/// ```
/// use keyshelf_core::title::normalize_title;
///
/// assert_eq!(normalize_title("Half-Life 2: GOTY Edition"), "halflife2");
/// assert_eq!(normalize_title("Half-Life 2"), "halflife2");
/// ```
pub fn normalize_title(title: &str) -> String {
    strip_non_alphanumeric(&clean_title(title))
}

/// Lowercase and keep only ASCII alphanumerics, without noise stripping.
/// This is the form the offline dictionary is built from.
pub fn strip_non_alphanumeric(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Classic edit distance (insert, delete and substitute each cost 1),
/// computed over chars with a single rolling row.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }

    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            let cost = usize::from(ca != cb);
            row[j + 1] = (diagonal + cost).min(above + 1).min(row[j] + 1);
            diagonal = above;
        }
    }
    row[b.len()]
}

/// Case-insensitive similarity in `[0, 1]`:
/// `1 - edit_distance / max(len(a), len(b))`.
///
/// Two empty strings are identical and score `1.0`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - edit_distance(&a, &b) as f64 / longest as f64
}
