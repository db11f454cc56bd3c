//! `internal-links` report writer (§4.9): one row per edge, flattened
//! from the per-worker NDJSON partials into a single CSV.

use std::path::Path;

use crate::reports::csv_util::row;
use crate::worker::LinkEdge;

pub fn write_internal_links(out_dir: &Path, edges: &[LinkEdge]) -> std::io::Result<()> {
    let mut body = row(&["page_url".into(), "link_url".into(), "text".into(), "kind".into()]);
    for edge in edges {
        body.push_str(&row(&[
            edge.page_url.clone(),
            edge.link_url.clone(),
            edge.text.clone(),
            edge.kind.clone(),
        ]));
    }
    crate::atomic::write_retry(&out_dir.join("internal-links.csv"), body.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_row_per_edge() {
        let dir = tempfile::tempdir().unwrap();
        let edges = vec![LinkEdge {
            page_url: "https://a".into(),
            link_url: "https://a/b".into(),
            text: "B".into(),
            kind: "a".into(),
        }];
        write_internal_links(dir.path(), &edges).unwrap();
        let content = std::fs::read_to_string(dir.path().join("internal-links.csv")).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
