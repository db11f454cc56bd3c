//! `existence` report writer (§4.9): CSV + JSON plus working/not-working
//! URL text lists, built from the orchestrator's merged existence records.

use std::path::Path;

use crate::reports::csv_util::row;
use crate::worker::ExistenceRecord;

pub fn write_existence(out_dir: &Path, records: &[ExistenceRecord]) -> std::io::Result<()> {
    let mut csv = row(&[
        "input_url".into(),
        "exists".into(),
        "http_status".into(),
        "final_url".into(),
    ]);
    let mut working = String::new();
    let mut not_working = String::new();
    for record in records {
        csv.push_str(&row(&[
            record.input_url.clone(),
            record.exists.to_string(),
            record.http_status.to_string(),
            record.final_url.clone(),
        ]));
        if record.exists {
            working.push_str(&record.input_url);
            working.push('\n');
        } else {
            not_working.push_str(&record.input_url);
            not_working.push('\n');
        }
    }
    crate::atomic::write_retry(&out_dir.join("url-existence.csv"), csv.as_bytes())?;
    let json = serde_json::to_vec_pretty(records).unwrap_or_default();
    crate::atomic::write_retry(&out_dir.join("url-existence.json"), &json)?;
    crate::atomic::write_retry(&out_dir.join("working-urls.txt"), working.as_bytes())?;
    crate::atomic::write_retry(&out_dir.join("not-working-urls.txt"), not_working.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(url: &str, exists: bool, status: u16) -> ExistenceRecord {
        ExistenceRecord {
            input_url: url.to_string(),
            exists,
            http_status: status,
            final_url: url.to_string(),
        }
    }

    #[test]
    fn splits_working_and_not_working() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![rec("https://a", true, 200), rec("https://b", false, 404)];
        write_existence(dir.path(), &records).unwrap();
        let working = std::fs::read_to_string(dir.path().join("working-urls.txt")).unwrap();
        let not_working = std::fs::read_to_string(dir.path().join("not-working-urls.txt")).unwrap();
        assert_eq!(working.trim(), "https://a");
        assert_eq!(not_working.trim(), "https://b");
    }

    #[test]
    fn csv_has_header_plus_one_row_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![rec("https://a", true, 200)];
        write_existence(dir.path(), &records).unwrap();
        let csv = std::fs::read_to_string(dir.path().join("url-existence.csv")).unwrap();
        assert_eq!(csv.lines().count(), 2);
    }
}
