//! Query normalization: canonical spelling and filler removal.

/// Token rewrites applied after lower-casing. An empty replacement drops the token.
const QUERY_NORMALIZATION: &[(&str, &str)] = &[
    ("sastha", "cheap"),
    ("sasta", "cheap"),
    ("wala", ""),
    ("rupees", ""),
    ("rs", ""),
    ("under", ""),
];

fn rewrite(token: &str) -> &str {
    QUERY_NORMALIZATION
        .iter()
        .find(|(from, _)| *from == token)
        .map(|(_, to)| *to)
        .unwrap_or(token)
}

/// Lower-case, split on whitespace, rewrite each token and rejoin with single
/// spaces. Input made only of filler words normalizes to `""`.
pub fn normalize(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    lowered
        .split_whitespace()
        .map(rewrite)
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regional_spelling_and_filler() {
        assert_eq!(normalize("Sasta Phone Under 5000 Rs"), "cheap phone 5000");
        assert_eq!(normalize("sastha mobile wala"), "cheap mobile");
    }

    #[test]
    fn test_all_filler_is_empty() {
        for query in ["under rs", "Rupees", "  wala  under  ", "", "   "] {
            assert_eq!(normalize(query), "", "query {:?}", query);
        }
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(normalize("  Galaxy \t S24\n Ultra "), "galaxy s24 ultra");
    }

    #[test]
    fn test_only_whole_tokens_are_rewritten() {
        // "rs" inside a word is left alone, punctuation is not stripped here
        assert_eq!(normalize("headphones rs."), "headphones rs.");
    }
}
