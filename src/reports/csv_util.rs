//! Minimal RFC 4180 CSV field escaping, shared by the report writers.
//!
//! The crate does not pull in a CSV library: the worker's own partial
//! writers (`worker::PartialWriter::append_existence`) already build CSV
//! lines by hand, so the report writers follow the same idiom rather than
//! introducing a second way to do the same thing.

/// Escape a single field for a comma-delimited row: wrap in quotes and
/// double any embedded quotes if the field contains a comma, quote, or
/// newline.
pub fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Join already-escaped fields into one CSV row with a trailing newline.
pub fn row(fields: &[String]) -> String {
    let mut line = fields.iter().map(|f| escape_field(f)).collect::<Vec<_>>().join(",");
    line.push('\n');
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_fields_are_unquoted() {
        assert_eq!(escape_field("hello"), "hello");
    }

    #[test]
    fn commas_and_quotes_are_escaped() {
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn row_joins_and_terminates() {
        let line = row(&["a".to_string(), "b,c".to_string()]);
        assert_eq!(line, "a,\"b,c\"\n");
    }
}
