//! URL Claim Ledger (C3): at-most-once per-URL processing across processes.
//!
//! A URL is in exactly one of three states, represented entirely by
//! filesystem entities keyed on `hash(url)`: *free* (no file), *claimed*
//! (`{id}.lock` present), *completed* (`{id}.done` present). `.lock` is
//! created with exclusive-create semantics, so at most one process ever
//! holds a claim on a given URL at once.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::atomic;

pub struct ClaimLedger {
    dir: PathBuf,
    lock_tries: u32,
    lock_sleep: Duration,
    max_done: usize,
}

/// Outcome of attempting to claim a URL.
pub enum ClaimOutcome {
    /// This call created the lock; ownership was granted.
    Claimed(ClaimHandle),
    /// A `.done` marker already exists — already processed this run.
    AlreadyDone,
    /// Another process holds the `.lock` — not ours, not an error.
    AlreadyClaimed,
}

/// An outstanding claim, with the two terminal operations from §4.3.
pub struct ClaimHandle {
    lock_path: PathBuf,
    done_path: PathBuf,
    completed: bool,
}

impl ClaimHandle {
    /// Promote the claim to completed: rename `.lock` → `.done`. Final.
    pub fn complete(mut self) -> std::io::Result<()> {
        atomic::rename_retry(&self.lock_path, &self.done_path)?;
        self.completed = true;
        Ok(())
    }

    /// Release without completing: unlink `.lock`, leaving the URL free.
    /// Idempotent under failure — a missing file is not an error.
    pub fn release(mut self) -> std::io::Result<()> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> std::io::Result<()> {
        self.completed = true;
        match std::fs::remove_file(&self.lock_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for ClaimHandle {
    /// A claim handle dropped without an explicit `complete`/`release` call
    /// (e.g. a panic mid-fetch) releases the lock rather than leaking it.
    fn drop(&mut self) {
        if !self.completed {
            let _ = self.release_inner();
        }
    }
}

fn claim_id(url: &str) -> String {
    format!("{:016x}", xxhash_rust::xxh3::xxh3_64(url.as_bytes()))
}

impl ClaimLedger {
    pub fn new(dir: impl Into<PathBuf>, lock_tries: u32, lock_sleep: Duration, max_done: usize) -> Self {
        ClaimLedger {
            dir: dir.into(),
            lock_tries,
            lock_sleep,
            max_done,
        }
    }

    fn lock_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.lock"))
    }

    fn done_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.done"))
    }

    /// Attempt to claim `url`, following the protocol in §4.3: check
    /// `.done`, then exclusive-create `.lock` with bounded retry on
    /// transient contention ("already exists" is never retried).
    pub fn try_claim(&self, url: &str) -> std::io::Result<ClaimOutcome> {
        let id = claim_id(url);
        let done = self.done_path(&id);
        if done.exists() {
            return Ok(ClaimOutcome::AlreadyDone);
        }

        let lock = self.lock_path(&id);
        for attempt in 0..self.lock_tries {
            match atomic::exclusive_create(&lock) {
                Ok(mut handle) => {
                    let now = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .unwrap_or_default()
                        .as_secs();
                    let payload = format!("{}\t{}\t{}\n", std::process::id(), now, url);
                    let _ = handle.write_all(payload.as_bytes());
                    return Ok(ClaimOutcome::Claimed(ClaimHandle {
                        lock_path: lock,
                        done_path: self.done_path(&id),
                        completed: false,
                    }));
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    return Ok(ClaimOutcome::AlreadyClaimed);
                }
                Err(_) if attempt + 1 < self.lock_tries => {
                    std::thread::sleep(self.lock_sleep);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(ClaimOutcome::AlreadyClaimed)
    }

    /// Count of outstanding (uncompleted) claims — part of the quiescence
    /// fingerprint (§4.8).
    pub fn outstanding_count(&self) -> usize {
        count_with_extension(&self.dir, "lock")
    }

    /// Trim oldest `.done` files once the count exceeds `max_done`. Pure
    /// space optimization; never touches `.lock` files.
    pub fn trim(&self) -> std::io::Result<()> {
        let mut dones = list_with_extension(&self.dir, "done")?;
        if dones.len() <= self.max_done {
            return Ok(());
        }
        dones.sort_by_key(|p| {
            std::fs::metadata(p)
                .and_then(|m| m.modified())
                .unwrap_or(UNIX_EPOCH)
        });
        let excess = dones.len() - self.max_done;
        for path in dones.into_iter().take(excess) {
            let _ = std::fs::remove_file(path);
        }
        Ok(())
    }
}

fn list_with_extension(dir: &Path, ext: &str) -> std::io::Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some(ext) {
            out.push(path);
        }
    }
    Ok(out)
}

fn count_with_extension(dir: &Path, ext: &str) -> usize {
    list_with_extension(dir, ext).map(|v| v.len()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger(dir: &Path) -> ClaimLedger {
        ClaimLedger::new(dir, 5, Duration::from_millis(5), 3)
    }

    #[test]
    fn single_claim_invariant() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(dir.path());
        let first = ledger.try_claim("https://example.com/a").unwrap();
        assert!(matches!(first, ClaimOutcome::Claimed(_)));
        let second = ledger.try_claim("https://example.com/a").unwrap();
        assert!(matches!(second, ClaimOutcome::AlreadyClaimed));
    }

    #[test]
    fn completion_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(dir.path());
        match ledger.try_claim("https://example.com/a").unwrap() {
            ClaimOutcome::Claimed(handle) => handle.complete().unwrap(),
            _ => panic!("expected claim"),
        }
        let again = ledger.try_claim("https://example.com/a").unwrap();
        assert!(matches!(again, ClaimOutcome::AlreadyDone));
    }

    #[test]
    fn release_frees_the_url_for_reclaim() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(dir.path());
        match ledger.try_claim("https://example.com/a").unwrap() {
            ClaimOutcome::Claimed(handle) => handle.release().unwrap(),
            _ => panic!("expected claim"),
        }
        let again = ledger.try_claim("https://example.com/a").unwrap();
        assert!(matches!(again, ClaimOutcome::Claimed(_)));
    }

    #[test]
    fn trim_prunes_only_done_files_beyond_cap() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(dir.path());
        for i in 0..5 {
            let url = format!("https://example.com/{i}");
            match ledger.try_claim(&url).unwrap() {
                ClaimOutcome::Claimed(handle) => handle.complete().unwrap(),
                _ => panic!("expected claim"),
            }
        }
        ledger.trim().unwrap();
        assert_eq!(count_with_extension(dir.path(), "done"), 3);
        assert_eq!(count_with_extension(dir.path(), "lock"), 0);
    }

    #[test]
    fn idempotent_completion_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(dir.path());
        let urls = ["https://example.com/a", "https://example.com/b"];
        for url in urls {
            if let ClaimOutcome::Claimed(handle) = ledger.try_claim(url).unwrap() {
                handle.complete().unwrap();
            }
        }
        for url in urls {
            assert!(matches!(
                ledger.try_claim(url).unwrap(),
                ClaimOutcome::AlreadyDone
            ));
        }
    }
}
