//! `tree` report writer (§4.9): an ASCII hierarchical render of the
//! discovered URL path segments, plus one sample URL per branch.

use std::collections::BTreeMap;
use std::path::Path;

#[derive(Default)]
struct Node {
    children: BTreeMap<String, Node>,
    sample_url: Option<String>,
}

impl Node {
    fn insert(&mut self, segments: &[&str], full_url: &str) {
        let mut cursor = self;
        for seg in segments {
            cursor = cursor.children.entry((*seg).to_string()).or_default();
            if cursor.sample_url.is_none() {
                cursor.sample_url = Some(full_url.to_string());
            }
        }
    }

    fn render(&self, out: &mut String, prefix: &str) {
        let mut entries: Vec<(&String, &Node)> = self.children.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        let count = entries.len();
        for (i, (name, node)) in entries.into_iter().enumerate() {
            let is_last = i + 1 == count;
            let branch = if is_last { "└── " } else { "├── " };
            out.push_str(prefix);
            out.push_str(branch);
            out.push_str(name);
            out.push('\n');
            let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
            node.render(out, &child_prefix);
        }
    }

    fn render_examples(&self, out: &mut String, path: &str) {
        let mut entries: Vec<(&String, &Node)> = self.children.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        for (name, node) in entries {
            let full_path = format!("{path}/{name}");
            if let Some(sample) = &node.sample_url {
                out.push_str(&format!("- `{full_path}` — {sample}\n"));
            }
            node.render_examples(out, &full_path);
        }
    }
}

/// Build the path-segment tree from normalized page URLs and render both
/// the ASCII listing (`tree.txt`) and the sample-URL examples
/// (`tree-examples.md`).
pub fn write_tree(out_dir: &Path, urls: &[String]) -> std::io::Result<()> {
    let mut root = Node::default();
    for url in urls {
        if let Ok(parsed) = url::Url::parse(url) {
            let segments: Vec<&str> = parsed
                .path_segments()
                .map(|s| s.filter(|seg| !seg.is_empty()).collect())
                .unwrap_or_default();
            root.insert(&segments, url);
        }
    }

    let mut tree_text = String::new();
    root.render(&mut tree_text, "");
    crate::atomic::write_retry(&out_dir.join("tree.txt"), tree_text.as_bytes())?;

    let mut examples = String::from("# Tree examples\n\n");
    root.render_examples(&mut examples, "");
    crate::atomic::write_retry(&out_dir.join("tree-examples.md"), examples.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nested_segments() {
        let dir = tempfile::tempdir().unwrap();
        let urls = vec![
            "https://example.com/docs/guide".to_string(),
            "https://example.com/docs/api".to_string(),
            "https://example.com/blog".to_string(),
        ];
        write_tree(dir.path(), &urls).unwrap();
        let text = std::fs::read_to_string(dir.path().join("tree.txt")).unwrap();
        assert!(text.contains("docs"));
        assert!(text.contains("guide"));
        assert!(text.contains("blog"));
    }

    #[test]
    fn examples_capture_one_sample_per_branch() {
        let dir = tempfile::tempdir().unwrap();
        let urls = vec![
            "https://example.com/docs/guide".to_string(),
            "https://example.com/docs/api".to_string(),
        ];
        write_tree(dir.path(), &urls).unwrap();
        let examples = std::fs::read_to_string(dir.path().join("tree-examples.md")).unwrap();
        assert!(examples.contains("/docs"));
        assert!(examples.contains("/docs/guide"));
    }
}
