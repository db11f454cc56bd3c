//! `comparison` report writer (§4.9): expected-vs-actual matching, either
//! by direct URL lookup or by three-tier title matching when no expected
//! URL is given.

use std::collections::HashMap;
use std::path::Path;

use crate::classifier::ExpectedRow;
use crate::reports::csv_util::row;
use crate::text_norm::{jaccard_similarity, normalize_text, prefix_match};
use crate::url_norm::normalize_url;
use crate::worker::PageRecord;

const TITLE_LIMIT: usize = 60;
const DESCRIPTION_LIMIT: usize = 160;
const PREFIX_TOKENS: usize = 4;
const FUZZY_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Correct,
    DescMismatchOnly,
    OtherMismatch,
    NotFound,
    Ambiguous,
}

impl Classification {
    fn as_str(self) -> &'static str {
        match self {
            Classification::Correct => "correct",
            Classification::DescMismatchOnly => "desc-mismatch-only",
            Classification::OtherMismatch => "other-mismatch",
            Classification::NotFound => "not-found",
            Classification::Ambiguous => "ambiguous",
        }
    }
}

struct MatchResult<'p> {
    classification: Classification,
    page: Option<&'p PageRecord>,
}

/// Build the comparison report: one row per expected row, matched either
/// by normalized URL (when `expected_url` is present) or by title (§4.9).
pub fn write_comparison(
    out_dir: &Path,
    expected: &[ExpectedRow],
    pages: &[PageRecord],
    keep_page_param: bool,
) -> std::io::Result<()> {
    let by_url: HashMap<String, &PageRecord> = pages
        .iter()
        .filter_map(|p| normalize_url(&p.url, keep_page_param).map(|n| (n, p)))
        .collect();

    let mut body = row(&[
        "expected_url".into(),
        "expected_title".into(),
        "expected_description".into(),
        "matched_url".into(),
        "actual_title".into(),
        "actual_description".into(),
        "classification".into(),
        "title_length_ok".into(),
        "description_length_ok".into(),
    ]);

    for row_in in expected {
        let result = match &row_in.expected_url {
            Some(url) => match_by_url(url, row_in, &by_url, keep_page_param),
            None => match_by_title(row_in, pages),
        };

        let actual_title = result.page.and_then(|p| p.title.clone());
        let actual_description = result.page.and_then(|p| p.description.clone());
        let title_len = actual_title
            .as_ref()
            .or(row_in.expected_title.as_ref())
            .map(|t| t.chars().count())
            .unwrap_or(0);
        let desc_len = actual_description
            .as_ref()
            .or(row_in.expected_description.as_ref())
            .map(|d| d.chars().count())
            .unwrap_or(0);

        body.push_str(&row(&[
            row_in.expected_url.clone().unwrap_or_default(),
            row_in.expected_title.clone().unwrap_or_default(),
            row_in.expected_description.clone().unwrap_or_default(),
            result.page.map(|p| p.url.clone()).unwrap_or_default(),
            actual_title.unwrap_or_default(),
            actual_description.unwrap_or_default(),
            result.classification.as_str().to_string(),
            (title_len <= TITLE_LIMIT).to_string(),
            (desc_len <= DESCRIPTION_LIMIT).to_string(),
        ]));
    }

    crate::atomic::write_retry(&out_dir.join("comparison.csv"), body.as_bytes())
}

fn match_by_url<'p>(
    url: &str,
    expected: &ExpectedRow,
    by_url: &HashMap<String, &'p PageRecord>,
    keep_page_param: bool,
) -> MatchResult<'p> {
    let Some(normalized) = normalize_url(url, keep_page_param) else {
        return MatchResult {
            classification: Classification::NotFound,
            page: None,
        };
    };
    let Some(page) = by_url.get(&normalized).copied() else {
        return MatchResult {
            classification: Classification::NotFound,
            page: None,
        };
    };

    let title_match = expected
        .expected_title
        .as_ref()
        .map(|t| normalize_text(t) == normalize_text(page.title.as_deref().unwrap_or_default()))
        .unwrap_or(true);
    let desc_match = expected
        .expected_description
        .as_ref()
        .map(|d| normalize_text(d) == normalize_text(page.description.as_deref().unwrap_or_default()))
        .unwrap_or(true);

    let classification = if !title_match {
        Classification::OtherMismatch
    } else if !desc_match {
        Classification::DescMismatchOnly
    } else {
        Classification::Correct
    };

    MatchResult {
        classification,
        page: Some(page),
    }
}

fn match_by_title<'p>(expected: &ExpectedRow, pages: &'p [PageRecord]) -> MatchResult<'p> {
    let Some(expected_title) = expected.expected_title.as_deref() else {
        return MatchResult {
            classification: Classification::NotFound,
            page: None,
        };
    };

    // Tier 3: exact match on normalized title.
    let exact: Vec<&PageRecord> = pages
        .iter()
        .filter(|p| normalize_text(p.title.as_deref().unwrap_or_default()) == normalize_text(expected_title))
        .collect();
    if !exact.is_empty() {
        return resolve_tier(exact, expected);
    }

    // Tier 2: first K normalized tokens agree.
    let prefix: Vec<&PageRecord> = pages
        .iter()
        .filter(|p| prefix_match(p.title.as_deref().unwrap_or_default(), expected_title, PREFIX_TOKENS))
        .collect();
    if !prefix.is_empty() {
        return resolve_tier(prefix, expected);
    }

    // Tier 1: Jaccard similarity over tokenized titles.
    let fuzzy: Vec<&PageRecord> = pages
        .iter()
        .filter(|p| jaccard_similarity(p.title.as_deref().unwrap_or_default(), expected_title) >= FUZZY_THRESHOLD)
        .collect();
    if !fuzzy.is_empty() {
        return resolve_tier(fuzzy, expected);
    }

    MatchResult {
        classification: Classification::NotFound,
        page: None,
    }
}

fn resolve_tier<'p>(candidates: Vec<&'p PageRecord>, expected: &ExpectedRow) -> MatchResult<'p> {
    if candidates.len() > 1 {
        return MatchResult {
            classification: Classification::Ambiguous,
            page: None,
        };
    }
    let page = candidates[0];
    let desc_match = expected
        .expected_description
        .as_ref()
        .map(|d| normalize_text(d) == normalize_text(page.description.as_deref().unwrap_or_default()))
        .unwrap_or(true);
    MatchResult {
        classification: if desc_match {
            Classification::Correct
        } else {
            Classification::DescMismatchOnly
        },
        page: Some(page),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str, title: &str, description: &str) -> PageRecord {
        PageRecord {
            url: url.to_string(),
            title: Some(title.to_string()),
            description: Some(description.to_string()),
            title_normalized: normalize_text(title),
            links: Vec::new(),
            last_fetched: 0,
        }
    }

    fn expected(url: Option<&str>, title: Option<&str>, description: Option<&str>) -> ExpectedRow {
        ExpectedRow {
            expected_url: url.map(str::to_string),
            expected_title: title.map(str::to_string),
            expected_description: description.map(str::to_string),
        }
    }

    #[test]
    fn url_lookup_correct_when_both_fields_match() {
        let pages = vec![page("https://a.com/x", "Title", "Desc")];
        let by_url: HashMap<String, &PageRecord> = pages.iter().map(|p| (p.url.clone(), p)).collect();
        let exp = expected(Some("https://a.com/x"), Some("Title"), Some("Desc"));
        let result = match_by_url("https://a.com/x", &exp, &by_url, false);
        assert_eq!(result.classification, Classification::Correct);
    }

    #[test]
    fn url_lookup_desc_mismatch_only() {
        let pages = vec![page("https://a.com/x", "Title", "Other desc")];
        let by_url: HashMap<String, &PageRecord> = pages.iter().map(|p| (p.url.clone(), p)).collect();
        let exp = expected(Some("https://a.com/x"), Some("Title"), Some("Desc"));
        let result = match_by_url("https://a.com/x", &exp, &by_url, false);
        assert_eq!(result.classification, Classification::DescMismatchOnly);
    }

    #[test]
    fn url_lookup_not_found_when_absent() {
        let by_url: HashMap<String, &PageRecord> = HashMap::new();
        let exp = expected(Some("https://a.com/missing"), None, None);
        let result = match_by_url("https://a.com/missing", &exp, &by_url, false);
        assert_eq!(result.classification, Classification::NotFound);
    }

    #[test]
    fn title_match_exact_tier_wins() {
        let pages = vec![page("https://a.com/x", "Getting Started", "Desc")];
        let exp = expected(None, Some("Getting Started"), Some("Desc"));
        let result = match_by_title(&exp, &pages);
        assert_eq!(result.classification, Classification::Correct);
    }

    #[test]
    fn title_match_ties_are_ambiguous() {
        let pages = vec![
            page("https://a.com/x", "Getting Started", "Desc"),
            page("https://a.com/y", "Getting Started", "Other"),
        ];
        let exp = expected(None, Some("Getting Started"), None);
        let result = match_by_title(&exp, &pages);
        assert_eq!(result.classification, Classification::Ambiguous);
    }

    #[test]
    fn title_match_not_found_when_no_tier_hits() {
        let pages = vec![page("https://a.com/x", "Completely Different", "Desc")];
        let exp = expected(None, Some("Nothing Alike At All Here"), None);
        let result = match_by_title(&exp, &pages);
        assert_eq!(result.classification, Classification::NotFound);
    }
}
