//! Bucket Frontier (C2): a filesystem-only, multi-reader multi-writer work
//! queue partitioned into `B` buckets so that N worker processes can
//! discover and consume URLs concurrently without a shared broker.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::atomic;
use crate::claim::{ClaimHandle, ClaimLedger, ClaimOutcome};
use crate::url_norm::bucket_of;

/// Liveness fingerprint used by the Orchestrator's quiescence detector (§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub sum_pending_bytes: u64,
    pub newest_mtime_secs: u64,
    pub claim_lock_count: usize,
}

pub struct Frontier {
    dir: PathBuf,
    bucket_parts: u32,
    bucket_max_bytes: u64,
    claims: ClaimLedger,
}

impl Frontier {
    pub fn new(dir: impl Into<PathBuf>, bucket_parts: u32, bucket_max_bytes: u64, claims: ClaimLedger) -> Self {
        Frontier {
            dir: dir.into(),
            bucket_parts,
            bucket_max_bytes,
            claims,
        }
    }

    pub fn bucket_parts(&self) -> u32 {
        self.bucket_parts
    }

    fn bucket_path(&self, r: u32) -> PathBuf {
        self.dir.join(format!("bucket.{r}.ndjson"))
    }

    fn offset_path(&self, r: u32) -> PathBuf {
        self.dir.join(format!("bucket.{r}.offset"))
    }

    fn owner_path(&self, r: u32) -> PathBuf {
        self.dir.join("assign").join(format!("bucket.{r}.owner"))
    }

    fn read_cursor(&self, r: u32) -> u64 {
        std::fs::read_to_string(self.offset_path(r))
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0)
    }

    fn write_cursor(&self, r: u32, cursor: u64) -> std::io::Result<()> {
        atomic::write_retry(&self.offset_path(r), cursor.to_string().as_bytes())
    }

    fn partition(&self, urls: &[String]) -> HashMap<u32, Vec<String>> {
        let mut by_bucket: HashMap<u32, Vec<String>> = HashMap::new();
        for url in urls {
            by_bucket
                .entry(bucket_of(url, self.bucket_parts))
                .or_default()
                .push(url.clone());
        }
        by_bucket
    }

    /// Seed the frontier: create bucket files if absent, append each URL
    /// to its partitioned bucket.
    pub fn seed(&self, urls: &[String]) -> std::io::Result<()> {
        for r in 0..self.bucket_parts {
            let path = self.bucket_path(r);
            if !path.exists() {
                atomic::write_retry(&path, b"")?;
            }
        }
        self.append(urls)
    }

    /// Append a batch of URLs: partition by hash, append each per-bucket
    /// sub-batch as a single atomic append. Rotates a bucket file that
    /// exceeds the configured byte cap.
    pub fn append(&self, urls: &[String]) -> std::io::Result<()> {
        for (r, batch) in self.partition(urls) {
            let mut payload = String::new();
            for url in &batch {
                payload.push_str(url);
                payload.push('\n');
            }
            self.maybe_rotate(r)?;
            atomic::append_retry(&self.bucket_path(r), payload.as_bytes())?;
        }
        Ok(())
    }

    fn maybe_rotate(&self, r: u32) -> std::io::Result<()> {
        let path = self.bucket_path(r);
        let Ok(meta) = std::fs::metadata(&path) else {
            return Ok(());
        };
        if meta.len() < self.bucket_max_bytes {
            return Ok(());
        }
        let ts = SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let sibling = self.dir.join(format!("bucket.{r}.ndjson.{ts}"));
        atomic::rename_retry(&path, &sibling)?;
        atomic::write_retry(&path, b"")?;
        self.write_cursor(r, 0)
    }

    /// Strip a trailing CR and normalize to `String`, for comparison/claim
    /// purposes only — never used to compute byte offsets.
    fn normalize_line(raw: &[u8]) -> String {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        String::from_utf8_lossy(raw).into_owned()
    }

    /// Acquire the bucket-owner lease, scan bucket `r` from its cursor for
    /// the first claimable line, and release the lease before returning.
    pub fn claim_next(&self, r: u32, accept: &dyn Fn(&str) -> bool) -> std::io::Result<Option<(String, ClaimHandle)>> {
        let owner = self.owner_path(r);
        let _lease = match atomic::exclusive_create(&owner) {
            Ok(h) => h,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(None),
            Err(e) => return Err(e),
        };
        let result = self.scan_bucket(r, accept);
        let _ = std::fs::remove_file(&owner);
        result
    }

    /// Scan bucket `r` from its cursor for the first claimable line.
    ///
    /// The cursor is a raw-byte offset into the file, so `advanced` must be
    /// accumulated from raw (pre-normalization) line lengths — a leading BOM
    /// is skipped once as a raw 3-byte prefix, and `\r\n` line terminators
    /// count their full raw length (`normalize_line` only trims the `\r` for
    /// comparison, it never changes what the cursor consumed). Getting this
    /// wrong desyncs the cursor from the file's byte offsets and causes the
    /// next scan to slice mid-line, claiming a truncated phantom URL.
    fn scan_bucket(&self, r: u32, accept: &dyn Fn(&str) -> bool) -> std::io::Result<Option<(String, ClaimHandle)>> {
        let path = self.bucket_path(r);
        let Ok(bytes) = atomic::read_retry(&path) else {
            return Ok(None);
        };
        let file_size = bytes.len() as u64;
        let mut cursor = self.read_cursor(r).min(file_size);

        if cursor == 0 && bytes.starts_with(b"\xEF\xBB\xBF") {
            cursor = 3;
            self.write_cursor(r, cursor)?;
        }

        let remaining = &bytes[cursor as usize..];
        let mut pos = 0usize;
        let mut advanced = 0u64;
        let mut found = None;
        while pos < remaining.len() {
            let Some(newline_idx) = remaining[pos..].iter().position(|&b| b == b'\n') else {
                // Unterminated trailing bytes: a concurrent writer's append
                // in flight. Leave them as pending, don't consume them.
                break;
            };
            let raw_line = &remaining[pos..pos + newline_idx];
            let raw_consumed = newline_idx + 1; // + the '\n' itself
            pos += raw_consumed;
            advanced += raw_consumed as u64;

            let line = Self::normalize_line(raw_line);
            if line.is_empty() {
                continue;
            }
            self.write_cursor(r, cursor + advanced)?;

            if !accept(&line) {
                continue;
            }
            match self.claims.try_claim(&line)? {
                ClaimOutcome::Claimed(handle) => {
                    found = Some((line, handle));
                    break;
                }
                ClaimOutcome::AlreadyDone | ClaimOutcome::AlreadyClaimed => continue,
            }
        }
        cursor += advanced;
        self.write_cursor(r, cursor.min(file_size))?;
        Ok(found)
    }

    /// Work-stealing path: try the home bucket first, then every other
    /// bucket in descending order of pending bytes.
    pub fn claim_next_any(&self, home_r: u32, accept: &dyn Fn(&str) -> bool) -> std::io::Result<Option<(String, ClaimHandle)>> {
        if let Some(found) = self.claim_next(home_r, accept)? {
            return Ok(Some(found));
        }

        let mut candidates: Vec<(u32, u64)> = (0..self.bucket_parts)
            .filter(|&r| r != home_r)
            .map(|r| (r, self.pending_bytes(r)))
            .filter(|&(_, pending)| pending > 0)
            .collect();
        candidates.sort_by(|a, b| b.1.cmp(&a.1));

        for (r, _) in candidates {
            if let Some(found) = self.claim_next(r, accept)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    pub fn pending_bytes(&self, r: u32) -> u64 {
        let size = std::fs::metadata(self.bucket_path(r))
            .map(|m| m.len())
            .unwrap_or(0);
        size.saturating_sub(self.read_cursor(r))
    }

    pub fn claims(&self) -> &ClaimLedger {
        &self.claims
    }

    /// Sum of pending bytes + newest mtime + outstanding claim count — the
    /// liveness fingerprint consumed by the quiescence detector.
    pub fn snapshot(&self) -> Snapshot {
        let mut sum_pending = 0u64;
        let mut newest = 0u64;
        for r in 0..self.bucket_parts {
            sum_pending += self.pending_bytes(r);
            if let Ok(meta) = std::fs::metadata(self.bucket_path(r)) {
                if let Ok(modified) = meta.modified() {
                    if let Ok(secs) = modified.duration_since(std::time::UNIX_EPOCH) {
                        newest = newest.max(secs.as_secs());
                    }
                }
            }
        }
        Snapshot {
            sum_pending_bytes: sum_pending,
            newest_mtime_secs: newest,
            claim_lock_count: self.claims.outstanding_count(),
        }
    }
}

/// Ensure the `assign/` owner-lease directory exists alongside the bucket files.
pub fn ensure_layout(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    std::fs::create_dir_all(dir.join("assign"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn frontier(dir: &Path, bucket_parts: u32) -> Frontier {
        ensure_layout(dir).unwrap();
        let claims = ClaimLedger::new(dir.join("claims"), 5, Duration::from_millis(5), 1000);
        Frontier::new(dir, bucket_parts, 64 * 1024 * 1024, claims)
    }

    #[test]
    fn seed_then_claim_all_yields_done_for_every_accepted_url() {
        let tmp = tempfile::tempdir().unwrap();
        let f = frontier(tmp.path(), 4);
        let urls: Vec<String> = (0..20).map(|i| format!("https://example.com/{i}")).collect();
        f.seed(&urls).unwrap();

        let accept = |_: &str| true;
        let mut claimed = 0;
        for r in 0..4 {
            while let Some((_, handle)) = f.claim_next(r, &accept).unwrap() {
                handle.complete().unwrap();
                claimed += 1;
            }
        }
        assert_eq!(claimed, 20);
        assert_eq!(f.claims().outstanding_count(), 0);
    }

    #[test]
    fn cursor_is_monotone_and_bounded_by_file_size() {
        let tmp = tempfile::tempdir().unwrap();
        let f = frontier(tmp.path(), 1);
        let urls: Vec<String> = (0..10).map(|i| format!("https://example.com/{i}")).collect();
        f.seed(&urls).unwrap();

        let accept = |_: &str| true;
        let mut last_cursor = 0u64;
        while f.claim_next(0, &accept).unwrap().is_some() {
            let cursor = f.read_cursor(0);
            assert!(cursor >= last_cursor);
            let size = std::fs::metadata(f.bucket_path(0)).unwrap().len();
            assert!(cursor <= size);
            last_cursor = cursor;
        }
    }

    #[test]
    fn work_stealing_drains_a_single_hot_bucket() {
        let tmp = tempfile::tempdir().unwrap();
        let f = frontier(tmp.path(), 8);
        // Force everything into bucket 0 regardless of hash by seeding directly.
        let urls: Vec<String> = (0..50).map(|i| format!("https://example.com/{i}")).collect();
        let path = f.bucket_path(0);
        let mut payload = String::new();
        for u in &urls {
            payload.push_str(u);
            payload.push('\n');
        }
        std::fs::create_dir_all(tmp.path()).unwrap();
        std::fs::write(&path, payload).unwrap();
        for r in 1..8 {
            std::fs::write(f.bucket_path(r), b"").unwrap();
        }

        let accept = |_: &str| true;
        let mut claimed = 0;
        for home in 0..8 {
            while let Some((_, handle)) = f.claim_next_any(home, &accept).unwrap() {
                handle.complete().unwrap();
                claimed += 1;
            }
        }
        assert_eq!(claimed, 50);
    }

    #[test]
    fn bom_and_crlf_are_normalized() {
        let tmp = tempfile::tempdir().unwrap();
        let f = frontier(tmp.path(), 1);
        ensure_layout(tmp.path()).unwrap();
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"https://example.com/a\r\nhttps://example.com/b\r\n");
        std::fs::write(f.bucket_path(0), bytes).unwrap();

        let accept = |_: &str| true;
        let (first, h1) = f.claim_next(0, &accept).unwrap().unwrap();
        assert_eq!(first, "https://example.com/a");
        h1.complete().unwrap();
        let (second, h2) = f.claim_next(0, &accept).unwrap().unwrap();
        assert_eq!(second, "https://example.com/b");
        h2.complete().unwrap();
    }
}
