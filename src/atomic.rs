//! Atomic file primitives (C1).
//!
//! Retry-on-contention read/append/write/rename, plus a scoped
//! exclusive-create lock. Every multi-process coordination point in this
//! crate (the frontier, the claim ledger, telemetry snapshots) goes
//! through these functions rather than touching `std::fs` directly, so
//! that contention handling lives in one place.

use std::io;
use std::path::Path;
use std::time::Duration;

use tempfile::NamedTempFile;

const MAX_ATTEMPTS: u32 = 40;
const RETRY_SLEEP: Duration = Duration::from_millis(40);

/// How a filesystem error should be handled by a retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Worth retrying: a sharing violation or transient permission error.
    Transient,
    /// Another process already holds or created this resource — not ours.
    Competitive,
    /// Anything else: surface immediately.
    Fatal,
}

pub fn classify(err: &io::Error) -> RetryClass {
    match err.kind() {
        io::ErrorKind::AlreadyExists => RetryClass::Competitive,
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => RetryClass::Transient,
        io::ErrorKind::PermissionDenied => RetryClass::Transient,
        _ => RetryClass::Fatal,
    }
}

fn retry_loop<T>(mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    let mut last_err = None;
    for _ in 0..MAX_ATTEMPTS {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) => match classify(&e) {
                RetryClass::Transient => {
                    last_err = Some(e);
                    std::thread::sleep(RETRY_SLEEP);
                }
                RetryClass::Competitive | RetryClass::Fatal => return Err(e),
            },
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::other("retry budget exhausted")))
}

/// Read a whole file, retrying on transient contention.
pub fn read_retry(path: &Path) -> io::Result<Vec<u8>> {
    retry_loop(|| std::fs::read(path))
}

/// Append bytes to a file, creating it if absent, retrying on transient contention.
pub fn append_retry(path: &Path, data: &[u8]) -> io::Result<()> {
    use std::io::Write;
    retry_loop(|| {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        file.write_all(data)
    })
}

/// Write a file atomically: write to a sibling temp file, then rename over
/// the destination. Survives a mid-process crash — readers either see the
/// old content or the new content, never a partial write.
pub fn write_retry(path: &Path, data: &[u8]) -> io::Result<()> {
    retry_loop(|| {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        std::io::Write::write_all(&mut tmp, data)?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    })
}

/// Rename `from` to `to`, retrying on transient contention.
pub fn rename_retry(from: &Path, to: &Path) -> io::Result<()> {
    retry_loop(|| std::fs::rename(from, to))
}

/// A handle returned by [`exclusive_create`]; the file was created by this
/// call and no other process holds it.
pub struct ExclusiveHandle {
    pub path: std::path::PathBuf,
    file: std::fs::File,
}

impl ExclusiveHandle {
    pub fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        std::io::Write::write_all(&mut self.file, data)
    }
}

/// Open `path` with create-if-absent-else-fail semantics.
///
/// Returns `Ok` only if this call created the file. An `AlreadyExists`
/// error means another process (or a previous run) holds this resource —
/// callers must treat that as "not mine", never retry it, and never
/// surface it as an error.
pub fn exclusive_create(path: &Path) -> io::Result<ExclusiveHandle> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let file = retry_loop(|| {
        std::fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(path)
    })?;
    Ok(ExclusiveHandle {
        path: path.to_path_buf(),
        file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        write_retry(&path, b"hello").unwrap();
        assert_eq!(read_retry(&path).unwrap(), b"hello");
    }

    #[test]
    fn append_creates_then_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.txt");
        append_retry(&path, b"a\n").unwrap();
        append_retry(&path, b"b\n").unwrap();
        assert_eq!(read_retry(&path).unwrap(), b"a\nb\n");
    }

    #[test]
    fn exclusive_create_second_caller_gets_already_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.lock");
        let _first = exclusive_create(&path).unwrap();
        let second = exclusive_create(&path);
        assert!(second.is_err());
        assert_eq!(second.unwrap_err().kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn classify_distinguishes_competitive_from_transient() {
        assert_eq!(
            classify(&io::Error::from(ErrorKind::AlreadyExists)),
            RetryClass::Competitive
        );
        assert_eq!(
            classify(&io::Error::from(ErrorKind::WouldBlock)),
            RetryClass::Transient
        );
        assert_eq!(
            classify(&io::Error::from(ErrorKind::NotFound)),
            RetryClass::Fatal
        );
    }
}
