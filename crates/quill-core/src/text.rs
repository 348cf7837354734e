//! Text normalization shared by descriptor parsing and trigger matching.
//!
//! A "token" is a maximal run of alphanumeric characters, lowercased.
//! Everything else (whitespace, punctuation, hyphens) separates tokens, so
//! `"Scaffold a new-project!"` becomes `["scaffold", "a", "new", "project"]`.

/// Function words that never count as evidence that a phrase matched.
///
/// Kept sorted for `binary_search`.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "can", "do", "for", "from", "help", "i",
    "in", "into", "is", "it", "me", "my", "new", "of", "on", "or", "our", "please", "some",
    "that", "the", "this", "to", "up", "use", "want", "we", "with", "you", "your",
];

/// Split `s` into lowercase alphanumeric tokens, preserving order.
pub fn tokenize(s: &str) -> Vec<String> {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether `token` (already lowercased) is a function word.
pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.binary_search(&token).is_ok()
}

/// Tokens of `s` with function words removed.
///
/// If every token is a function word the full token list is returned
/// instead, so a phrase like `"do it"` still carries some signal.
pub fn content_tokens(s: &str) -> Vec<String> {
    let all = tokenize(s);
    let content: Vec<String> = all.iter().filter(|t| !is_stopword(t)).cloned().collect();
    if content.is_empty() { all } else { content }
}

/// Whether `needle` occurs as a contiguous run inside `haystack`.
///
/// An empty needle never matches.
pub fn contains_sequence(haystack: &[String], needle: &[String]) -> bool {
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Truncate a string to at most `max_bytes` bytes at a char boundary.
///
/// Used when echoing user input into log fields.
#[inline]
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| (*s).to_string()).collect()
    }

    // ── tokenize ─────────────────────────────────────────────────────────

    #[test]
    fn tokenize_splits_on_punctuation_and_case() {
        assert_eq!(
            tokenize("Scaffold a new-project!"),
            strings(&["scaffold", "a", "new", "project"])
        );
    }

    #[test]
    fn tokenize_empty_and_symbols() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  --- !!").is_empty());
    }

    #[test]
    fn tokenize_keeps_digits() {
        assert_eq!(tokenize("vue3 setup"), strings(&["vue3", "setup"]));
    }

    #[test]
    fn tokenize_unicode_letters() {
        assert_eq!(tokenize("Créer un projet"), strings(&["créer", "un", "projet"]));
    }

    // ── stopwords ────────────────────────────────────────────────────────

    #[test]
    fn stopword_list_is_sorted() {
        let mut sorted = STOPWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, STOPWORDS);
    }

    #[test]
    fn stopwords_detected() {
        assert!(is_stopword("a"));
        assert!(is_stopword("new"));
        assert!(!is_stopword("scaffold"));
    }

    #[test]
    fn content_tokens_drops_function_words() {
        assert_eq!(
            content_tokens("scaffold a new project"),
            strings(&["scaffold", "project"])
        );
    }

    #[test]
    fn content_tokens_falls_back_when_all_stopwords() {
        assert_eq!(content_tokens("do it"), strings(&["do", "it"]));
    }

    // ── contains_sequence ────────────────────────────────────────────────

    #[test]
    fn sequence_found_in_middle() {
        let hay = tokenize("please scaffold a new project now");
        assert!(contains_sequence(&hay, &tokenize("a new project")));
    }

    #[test]
    fn sequence_must_be_contiguous() {
        let hay = tokenize("scaffold the project");
        assert!(!contains_sequence(&hay, &tokenize("scaffold project")));
    }

    #[test]
    fn empty_needle_never_matches() {
        let hay = tokenize("anything");
        assert!(!contains_sequence(&hay, &[]));
    }

    // ── truncate_str ─────────────────────────────────────────────────────

    #[test]
    fn truncate_ascii() {
        assert_eq!(truncate_str("hello world", 5), "hello");
        assert_eq!(truncate_str("hi", 5), "hi");
    }

    #[test]
    fn truncate_snaps_to_char_boundary() {
        assert_eq!(truncate_str("ab—cd", 3), "ab");
        assert_eq!(truncate_str("ab—cd", 5), "ab—");
    }

    proptest! {
        #[test]
        fn tokens_are_lowercase_alphanumeric(s in "[a-zA-Z0-9 ,.!?-]{0,64}") {
            for t in tokenize(&s) {
                prop_assert!(!t.is_empty());
                prop_assert!(t.chars().all(char::is_alphanumeric));
                prop_assert_eq!(t.to_lowercase(), t.clone());
            }
        }

        #[test]
        fn truncate_never_exceeds_limit(s in ".{0,64}", n in 0usize..80) {
            prop_assert!(truncate_str(&s, n).len() <= n);
        }
    }
}
