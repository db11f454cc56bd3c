//! Cleanup (§4.8g): after merge, remove the frontier directory, the
//! claim-ledger directory, per-worker partials, and — if requested — the
//! fetch-cache parts.

use crate::config::RunConfig;

pub fn teardown(config: &RunConfig) -> std::io::Result<()> {
    remove_dir(&config.frontier_dir())?;
    remove_dir(&config.claim_dir())?;
    remove_parts(config, "urls-final.part", ".json")?;
    remove_parts(config, "internal-links.part", ".ndjson")?;
    remove_parts(config, "url-existence.part", ".csv")?;
    if config.drop_cache {
        remove_parts(config, "fetch-cache.part", ".json")?;
    }
    Ok(())
}

fn remove_dir(dir: &std::path::Path) -> std::io::Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn remove_parts(config: &RunConfig, prefix: &str, suffix: &str) -> std::io::Result<()> {
    let Ok(entries) = std::fs::read_dir(&config.out_dir) else {
        return Ok(());
    };
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(prefix) && name.ends_with(suffix) {
            let _ = std::fs::remove_file(entry.path());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfigBuilder;

    #[test]
    fn removes_frontier_claim_and_partials() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfigBuilder::new()
            .base("https://example.com")
            .out_dir(dir.path().to_path_buf())
            .build();
        std::fs::create_dir_all(config.frontier_dir()).unwrap();
        std::fs::create_dir_all(config.claim_dir()).unwrap();
        std::fs::write(dir.path().join("urls-final.part0.json"), "").unwrap();
        std::fs::write(dir.path().join("fetch-cache.part0.json"), "").unwrap();

        teardown(&config).unwrap();

        assert!(!config.frontier_dir().exists());
        assert!(!config.claim_dir().exists());
        assert!(!dir.path().join("urls-final.part0.json").exists());
        assert!(dir.path().join("fetch-cache.part0.json").exists());
    }
}
