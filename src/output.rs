//! Persisted record formats: ASCII-escaped JSONL and a CSV projection with
//! fixed leading columns plus any extra fields sorted by name.

use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use log::warn;
use serde_json::Value;

use crate::records::OrgRecord;

const BASE_COLUMNS: &[&str] = &[
    "name",
    "website",
    "info",
    "careers_url",
    "source",
    "source_url",
    "collected_at",
];

/// Serialize to one JSON line with every non-ASCII character escaped.
pub fn ascii_json_line(record: &OrgRecord) -> Result<String, serde_json::Error> {
    let raw = serde_json::to_string(record)?;
    Ok(escape_non_ascii(&raw))
}

fn escape_non_ascii(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut units = [0u16; 2];
    for ch in raw.chars() {
        if ch.is_ascii() {
            out.push(ch);
        } else {
            for unit in ch.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    out
}

pub fn write_jsonl(path: &Path, records: &[OrgRecord]) -> io::Result<()> {
    ensure_parent_dir(path)?;
    let mut file = File::create(path)?;
    write_lines(&mut file, records)
}

pub fn append_jsonl(path: &Path, records: &[OrgRecord]) -> io::Result<()> {
    ensure_parent_dir(path)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    write_lines(&mut file, records)
}

fn write_lines<W: Write>(writer: &mut W, records: &[OrgRecord]) -> io::Result<()> {
    for record in records {
        match ascii_json_line(record) {
            Ok(line) => writeln!(writer, "{line}")?,
            Err(err) => warn!("skipping unserializable record: {err}"),
        }
    }
    Ok(())
}

/// Read records back from JSONL; malformed lines are skipped, not fatal.
pub fn read_jsonl(path: &Path) -> io::Result<Vec<OrgRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(record) => records.push(record),
            Err(err) => warn!("skipping malformed line {} of {}: {err}", index + 1, path.display()),
        }
    }
    Ok(records)
}

/// Tabular projection: fixed leading columns, then every extra field present
/// across the record set, sorted by field name. Missing values are empty.
pub fn write_csv(path: &Path, records: &[OrgRecord]) -> csv::Result<()> {
    ensure_parent_dir(path)?;

    let extra_columns: BTreeSet<&str> = records
        .iter()
        .flat_map(|record| record.extra.keys().map(String::as_str))
        .collect();

    let mut writer = csv::Writer::from_path(path)?;
    let header: Vec<&str> = BASE_COLUMNS.iter().copied().chain(extra_columns.iter().copied()).collect();
    writer.write_record(&header)?;

    for record in records {
        let mut row: Vec<String> = vec![
            record.name.clone().unwrap_or_default(),
            record.website.clone().unwrap_or_default(),
            record.info.clone().unwrap_or_default(),
            record.careers_url.clone().unwrap_or_default(),
            record.source.clone(),
            record.source_url.clone(),
            record.collected_at.clone().unwrap_or_default(),
        ];
        for column in &extra_columns {
            row.push(record.extra.get(*column).map(cell_text).unwrap_or_default());
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(name: &str) -> OrgRecord {
        OrgRecord {
            name: Some(name.to_string()),
            website: Some(format!("https://{}.example", name.to_lowercase())),
            source: "test".to_string(),
            source_url: "https://feed.example".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn non_ascii_is_escaped_and_round_trips() {
        let mut record = sample("Müller & Söhne");
        record.info = Some("caffè ☕".to_string());

        let line = ascii_json_line(&record).unwrap();
        assert!(line.is_ascii(), "line still has raw non-ASCII: {line}");
        assert!(line.contains("\\u00fc"));

        let parsed: OrgRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.name.as_deref(), Some("Müller & Söhne"));
        assert_eq!(parsed.info.as_deref(), Some("caffè ☕"));
    }

    #[test]
    fn astral_code_points_use_surrogate_pairs() {
        let mut record = sample("Acme");
        record.info = Some("🚀".to_string());
        let line = ascii_json_line(&record).unwrap();
        assert!(line.contains("\\ud83d\\ude80"));
        let parsed: OrgRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.info.as_deref(), Some("🚀"));
    }

    #[test]
    fn jsonl_write_append_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/orgs.jsonl");

        write_jsonl(&path, &[sample("Acme")]).unwrap();
        append_jsonl(&path, &[sample("Beta")]).unwrap();

        let records = read_jsonl(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name.as_deref(), Some("Acme"));
        assert_eq!(records[1].name.as_deref(), Some("Beta"));
    }

    #[test]
    fn malformed_jsonl_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orgs.jsonl");
        fs::write(&path, "not json\n\n{\"name\":\"Acme\",\"source\":\"t\",\"source_url\":\"u\"}\n")
            .unwrap();

        let records = read_jsonl(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name.as_deref(), Some("Acme"));
    }

    #[test]
    fn csv_projection_has_base_then_sorted_extra_columns() {
        let mut first = sample("Acme");
        first.extra.insert("batch".to_string(), json!("W24"));
        let mut second = sample("Beta");
        second.extra.insert("location".to_string(), json!("Berlin"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orgs.csv");
        write_csv(&path, &[first, second]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "name,website,info,careers_url,source,source_url,collected_at,batch,location"
        );
        let first_row = lines.next().unwrap();
        assert!(first_row.starts_with("Acme,"));
        assert!(first_row.ends_with(",W24,"));
        let second_row = lines.next().unwrap();
        assert!(second_row.ends_with(",,Berlin"));
    }
}
