//! Partial-output merge (§4.8f): URL files concatenated and deduped,
//! existence CSVs unioned by `input_url` with last-writer-wins, fetch-cache
//! NDJSON collapsed to one `PageRecord` per URL, internal-links NDJSON
//! concatenated with no dedup.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::worker::{ExistenceRecord, LinkEdge, PageRecord};

pub struct MergedArtifacts {
    pub urls: Vec<String>,
    pub pages: Vec<PageRecord>,
    pub edges: Vec<LinkEdge>,
    pub existence: Vec<ExistenceRecord>,
}

/// Merge every `*.part{k}.*` artifact under `out_dir` into one view.
pub fn merge_partials(out_dir: &Path) -> std::io::Result<MergedArtifacts> {
    Ok(MergedArtifacts {
        urls: merge_urls(out_dir)?,
        pages: merge_pages(out_dir)?,
        edges: merge_edges(out_dir)?,
        existence: merge_existence(out_dir)?,
    })
}

fn list_parts(out_dir: &Path, prefix: &str, suffix: &str) -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Ok(entries) = std::fs::read_dir(out_dir) {
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(prefix) && name.ends_with(suffix) {
                out.push(entry.path());
            }
        }
    }
    out.sort();
    out
}

fn merge_urls(out_dir: &Path) -> std::io::Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();
    for path in list_parts(out_dir, "urls-final.part", ".json") {
        let Ok(content) = std::fs::read_to_string(&path) else {
            continue;
        };
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(url) = serde_json::from_str::<String>(line) {
                if seen.insert(url.clone()) {
                    urls.push(url);
                }
            }
        }
    }

    let mut text = String::new();
    for url in &urls {
        text.push_str(url);
        text.push('\n');
    }
    crate::atomic::write_retry(&out_dir.join("urls-final.txt"), text.as_bytes())?;
    Ok(urls)
}

fn merge_pages(out_dir: &Path) -> std::io::Result<Vec<PageRecord>> {
    let mut by_url: HashMap<String, PageRecord> = HashMap::new();
    for path in list_parts(out_dir, "fetch-cache.part", ".json") {
        let Ok(content) = std::fs::read_to_string(&path) else {
            continue;
        };
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(record) = serde_json::from_str::<PageRecord>(line) {
                by_url.insert(record.url.clone(), record);
            }
        }
    }
    let mut pages: Vec<PageRecord> = by_url.into_values().collect();
    pages.sort_by(|a, b| a.url.cmp(&b.url));
    Ok(pages)
}

fn merge_edges(out_dir: &Path) -> std::io::Result<Vec<LinkEdge>> {
    let mut edges = Vec::new();
    for path in list_parts(out_dir, "internal-links.part", ".ndjson") {
        let Ok(content) = std::fs::read_to_string(&path) else {
            continue;
        };
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(edge) = serde_json::from_str::<LinkEdge>(line) {
                edges.push(edge);
            }
        }
    }
    Ok(edges)
}

fn merge_existence(out_dir: &Path) -> std::io::Result<Vec<ExistenceRecord>> {
    let mut by_url: HashMap<String, ExistenceRecord> = HashMap::new();
    for path in list_parts(out_dir, "url-existence.part", ".csv") {
        let Ok(content) = std::fs::read_to_string(&path) else {
            continue;
        };
        for line in content.lines().skip(1) {
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.splitn(4, ',').collect();
            let [input_url, exists, http_status, final_url] = fields[..] else {
                continue;
            };
            by_url.insert(
                input_url.to_string(),
                ExistenceRecord {
                    input_url: input_url.to_string(),
                    exists: exists == "true",
                    http_status: http_status.parse().unwrap_or(0),
                    final_url: final_url.to_string(),
                },
            );
        }
    }
    let mut records: Vec<ExistenceRecord> = by_url.into_values().collect();
    records.sort_by(|a, b| a.input_url.cmp(&b.input_url));
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_concatenated_and_deduped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("urls-final.part0.json"),
            "\"https://a\"\n\"https://b\"\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("urls-final.part1.json"),
            "\"https://b\"\n\"https://c\"\n",
        )
        .unwrap();
        let urls = merge_urls(dir.path()).unwrap();
        assert_eq!(urls, vec!["https://a", "https://b", "https://c"]);
    }

    #[test]
    fn existence_union_is_last_writer_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("url-existence.part0.csv"),
            "input_url,exists,http_status,final_url\nhttps://a,false,500,https://a\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("url-existence.part1.csv"),
            "input_url,exists,http_status,final_url\nhttps://a,true,200,https://a\n",
        )
        .unwrap();
        let records = merge_existence(dir.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].exists);
        assert_eq!(records[0].http_status, 200);
    }

    #[test]
    fn pages_dedupe_by_url_keeping_one_record() {
        let dir = tempfile::tempdir().unwrap();
        let record = PageRecord {
            url: "https://a".to_string(),
            title: Some("A".to_string()),
            description: None,
            title_normalized: "a".to_string(),
            links: Vec::new(),
            last_fetched: 1,
        };
        let line = format!("{}\n", serde_json::to_string(&record).unwrap());
        std::fs::write(dir.path().join("fetch-cache.part0.json"), &line).unwrap();
        std::fs::write(dir.path().join("fetch-cache.part1.json"), &line).unwrap();
        let pages = merge_pages(dir.path()).unwrap();
        assert_eq!(pages.len(), 1);
    }
}
