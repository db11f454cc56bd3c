//! `extras` report writer (§4.9): pages found on the site that are not
//! present in the input, keyed by title alone or by (title, description).

use std::collections::HashSet;
use std::path::Path;

use crate::classifier::ExpectedRow;
use crate::reports::csv_util::row;
use crate::text_norm::normalize_text;
use crate::worker::PageRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtrasKey {
    TitleOnly,
    TitleAndDescription,
}

fn key_for(title: &str, description: &str, mode: ExtrasKey) -> String {
    match mode {
        ExtrasKey::TitleOnly => normalize_text(title),
        ExtrasKey::TitleAndDescription => format!("{}\u{1}{}", normalize_text(title), normalize_text(description)),
    }
}

pub fn write_extras(
    out_dir: &Path,
    pages: &[PageRecord],
    expected: &[ExpectedRow],
    mode: ExtrasKey,
) -> std::io::Result<()> {
    let known: HashSet<String> = expected
        .iter()
        .map(|e| {
            key_for(
                e.expected_title.as_deref().unwrap_or_default(),
                e.expected_description.as_deref().unwrap_or_default(),
                mode,
            )
        })
        .collect();

    let mut body = row(&["url".into(), "title".into(), "description".into()]);
    for page in pages {
        let title = page.title.as_deref().unwrap_or_default();
        let description = page.description.as_deref().unwrap_or_default();
        if known.contains(&key_for(title, description, mode)) {
            continue;
        }
        body.push_str(&row(&[page.url.clone(), title.to_string(), description.to_string()]));
    }
    crate::atomic::write_retry(&out_dir.join("extras.csv"), body.as_bytes())
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

    fn expected(title: &str, description: &str) -> ExpectedRow {
        ExpectedRow {
            expected_url: None,
            expected_title: Some(title.to_string()),
            expected_description: Some(description.to_string()),
        }
    }

    #[test]
    fn title_only_mode_excludes_known_titles_regardless_of_description() {
        let dir = tempfile::tempdir().unwrap();
        let pages = vec![page("https://a", "Known", "Different desc")];
        let expected = vec![expected("Known", "Original desc")];
        write_extras(dir.path(), &pages, &expected, ExtrasKey::TitleOnly).unwrap();
        let content = std::fs::read_to_string(dir.path().join("extras.csv")).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn title_and_description_mode_surfaces_changed_descriptions() {
        let dir = tempfile::tempdir().unwrap();
        let pages = vec![page("https://a", "Known", "Different desc")];
        let expected = vec![expected("Known", "Original desc")];
        write_extras(dir.path(), &pages, &expected, ExtrasKey::TitleAndDescription).unwrap();
        let content = std::fs::read_to_string(dir.path().join("extras.csv")).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
