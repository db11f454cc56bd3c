//! Text normalization (§4.9) for title/description comparison.

/// Lowercase, smart-quotes to ASCII apostrophes, collapse whitespace, trim.
///
/// Idempotent: `normalize_text(normalize_text(s)) == normalize_text(s)`.
pub fn normalize_text(s: &str) -> String {
    let replaced: String = s
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201B}' | '\u{FF07}' => '\'',
            _ => c,
        })
        .collect();

    let lowered = replaced.to_lowercase();

    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Tokenize normalized text for prefix/fuzzy title matching.
pub fn tokenize(s: &str) -> Vec<String> {
    normalize_text(s)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity over tokenized, normalized strings.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    use std::collections::HashSet;
    let ta: HashSet<_> = tokenize(a).into_iter().collect();
    let tb: HashSet<_> = tokenize(b).into_iter().collect();
    if ta.is_empty() && tb.is_empty() {
        return 1.0;
    }
    let intersection = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Prefix match: do the first `k` normalized tokens of each title agree?
pub fn prefix_match(a: &str, b: &str, k: usize) -> bool {
    let ta = tokenize(a);
    let tb = tokenize(b);
    if ta.len() < k || tb.len() < k {
        return false;
    }
    ta[..k] == tb[..k]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_is_idempotent() {
        let raw = "  Hello\u{2019}s   WORLD  \n";
        let once = normalize_text(raw);
        let twice = normalize_text(&once);
        assert_eq!(once, twice);
        assert_eq!(once, "hello's world");
    }

    #[test]
    fn jaccard_identical_is_one() {
        assert_eq!(jaccard_similarity("Hello World", "hello world"), 1.0);
    }

    #[test]
    fn jaccard_disjoint_is_zero() {
        assert_eq!(jaccard_similarity("abc def", "ghi jkl"), 0.0);
    }

    #[test]
    fn prefix_match_respects_k() {
        assert!(prefix_match(
            "Getting Started With Rust Today",
            "Getting Started With Rust Tomorrow",
            4
        ));
        assert!(!prefix_match("A B", "A C", 2));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn normalize_text_is_idempotent(s in "[a-zA-Z0-9 \u{2019}\t\n]{0,64}") {
            let once = normalize_text(&s);
            let twice = normalize_text(&once);
            prop_assert_eq!(once, twice);
        }
    }
}
