//! `site_catalog` and `duplicate-titles` report writers (§4.9).

use std::collections::HashMap;
use std::path::Path;

use crate::reports::csv_util::row;
use crate::worker::PageRecord;

/// One row per page record: url, title, description, link count.
pub fn write_site_catalog(out_dir: &Path, pages: &[PageRecord]) -> std::io::Result<()> {
    let mut body = row(&[
        "url".into(),
        "title".into(),
        "description".into(),
        "link_count".into(),
    ]);
    for page in pages {
        body.push_str(&row(&[
            page.url.clone(),
            page.title.clone().unwrap_or_default(),
            page.description.clone().unwrap_or_default(),
            page.links.len().to_string(),
        ]));
    }
    crate::atomic::write_retry(&out_dir.join("site_catalog.csv"), body.as_bytes())
}

/// Titles seen on two or more distinct URLs.
pub fn write_duplicate_titles(out_dir: &Path, pages: &[PageRecord]) -> std::io::Result<()> {
    let mut by_title: HashMap<String, Vec<String>> = HashMap::new();
    for page in pages {
        let Some(title) = page.title.as_ref().filter(|t| !t.is_empty()) else {
            continue;
        };
        by_title.entry(title.clone()).or_default().push(page.url.clone());
    }

    let mut body = row(&["title".into(), "url_count".into(), "urls".into()]);
    let mut entries: Vec<(&String, &Vec<String>)> =
        by_title.iter().filter(|(_, urls)| urls.len() >= 2).collect();
    entries.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(b.0)));

    for (title, urls) in entries {
        body.push_str(&row(&[
            title.clone(),
            urls.len().to_string(),
            urls.join(" | "),
        ]));
    }
    crate::atomic::write_retry(&out_dir.join("duplicate-titles.csv"), body.as_bytes())
}
