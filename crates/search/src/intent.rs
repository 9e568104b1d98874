//! Implicit sort intent hidden in free-text queries.
//
// "cheapest smartphone" means: search for "smartphone", lowest price first.

use store::{SortDirective, SortField};

/// Words asking for the lowest price first.
pub const PRICE_ASC_KEYWORDS: &[&str] = &[
    "cheap",
    "cheapest",
    "lowest",
    "affordable",
    "budget",
    "sasta",
    "sastha",
];

/// Words asking for the highest price first.
pub const PRICE_DESC_KEYWORDS: &[&str] = &[
    "costly",
    "expensive",
    "premium",
    "highend",
    "high-end",
    "costliest",
];

/// What the query asked for once sort triggers are taken out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    /// Search text without trigger words.
    pub query: String,
    pub sort_price_asc: bool,
    pub sort_price_desc: bool,
}

impl Intent {
    /// Price ordering to request, if the intent is unambiguous.
    /// Both directions at once cancel out.
    pub fn sort_directive(&self) -> Option<SortDirective> {
        match (self.sort_price_asc, self.sort_price_desc) {
            (true, false) => Some(SortDirective::asc(SortField::Price)),
            (false, true) => Some(SortDirective::desc(SortField::Price)),
            _ => None,
        }
    }
}

/// Word tokens, lower-cased; everything that is not a letter, digit or `_`
/// separates tokens.
fn word_tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Detect price sort triggers and strip them from the search text.
///
/// If stripping leaves nothing, the original `text` is kept verbatim so a
/// non-empty query never turns into an empty one.
pub fn extract_intent(text: &str) -> Intent {
    let words = word_tokens(text);

    let is_asc = |w: &str| PRICE_ASC_KEYWORDS.iter().any(|k| *k == w);
    let is_desc = |w: &str| PRICE_DESC_KEYWORDS.iter().any(|k| *k == w);

    let sort_price_asc = words.iter().any(|w| is_asc(w));
    let sort_price_desc = words.iter().any(|w| is_desc(w));

    let cleaned = words
        .iter()
        .filter(|w| !is_asc(w) && !is_desc(w))
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");

    let query = if cleaned.trim().is_empty() { text.to_string() } else { cleaned };

    Intent { query, sort_price_asc, sort_price_desc }
}
