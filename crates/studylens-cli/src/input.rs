//! Loading of study-data exports into an [`InputTable`]

use std::{io, path::Path};

use anyhow::Context;
use serde_json::Value;
use studylens_analysis::record::{InputTable, RawRecord};
use tracing::warn;

use crate::util;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum InputFormat {
    /// Comma-separated values with a header row
    Csv,
    /// JSON array, `{"Items": [...]}` scan export, or newline-delimited items
    Json,
}

impl InputFormat {
    /// Guesses the format from the file extension, defaulting to CSV.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json" | "jsonl" | "ndjson") => Self::Json,
            _ => Self::Csv,
        }
    }
}

pub fn load_table(path: &Path, format: Option<InputFormat>) -> anyhow::Result<InputTable> {
    let format = format.unwrap_or_else(|| InputFormat::from_path(path));
    let reader = util::open_file("input", path)?;
    match format {
        InputFormat::Csv => read_csv(reader)
            .with_context(|| format!("Failed to read CSV input: {}", path.display())),
        InputFormat::Json => read_json(reader)
            .with_context(|| format!("Failed to read JSON input: {}", path.display())),
    }
}

fn read_csv<R>(reader: R) -> anyhow::Result<InputTable>
where
    R: io::Read,
{
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let columns = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_owned())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row = columns
            .iter()
            .zip(record.iter())
            .filter(|(_, cell)| !cell.is_empty())
            .map(|(column, cell)| (column, Value::String(cell.to_owned())))
            .collect::<RawRecord>();
        rows.push(row);
    }
    Ok(InputTable { columns, rows })
}

fn read_json<R>(mut reader: R) -> anyhow::Result<InputTable>
where
    R: io::Read,
{
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    let text = text.trim_start_matches('\u{feff}').trim();

    let items = match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => items,
        Ok(Value::Object(mut object)) => match object.remove("Items") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                object.insert("Items".to_owned(), other);
                vec![Value::Object(object)]
            }
            None => vec![Value::Object(object)],
        },
        Ok(other) => vec![other],
        Err(_) => serde_json::Deserializer::from_str(text)
            .into_iter::<Value>()
            .collect::<Result<Vec<_>, _>>()
            .context("input is neither a JSON document nor newline-delimited JSON")?,
    };

    let mut rows = Vec::with_capacity(items.len());
    let mut skipped = 0;
    for item in items {
        match item {
            Value::Object(object) => rows.push(object.into_iter().collect::<RawRecord>()),
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(skipped, "ignored non-object items in JSON input");
    }
    Ok(InputTable::from_rows(rows))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_csv_cells_are_text() {
        let csv = "\u{feff}participant_id,answers,sk\np1,\"[{\"\"id\"\": \"\"q1\"\", \"\"score\"\": 2}]\",\n";
        let table = read_csv(csv.as_bytes()).unwrap();
        assert_eq!(table.columns, vec!["participant_id", "answers", "sk"]);
        assert_eq!(table.rows.len(), 1);
        let row = &table.rows[0];
        assert_eq!(row.get("sk"), None);
        assert_eq!(row.nested(&["answers"]), Some(json!([{"id": "q1", "score": 2}])));
    }

    #[test]
    fn test_json_scan_export_with_attributes() {
        let text = r#"{"Items": [{"participant_id": {"S": "p1"}, "answers": {"L": []}}, 3], "Count": 2}"#;
        let table = read_json(text.as_bytes()).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].get("participant_id"), Some(&json!("p1")));
        assert!(table.has_column("answers"));
    }

    #[test]
    fn test_json_lines() {
        let text = "{\"participant_id\": \"p1\"}\n{\"participant_id\": \"p2\"}\n";
        let table = read_json(text.as_bytes()).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.columns, vec!["participant_id"]);
    }

    #[test]
    fn test_json_array() {
        let table = read_json(r#"[{"question_id": "q1", "score": 1}]"#.as_bytes()).unwrap();
        assert!(table.is_long_format());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(InputFormat::from_path(Path::new("scan.JSON")), InputFormat::Json);
        assert_eq!(InputFormat::from_path(Path::new("export.csv")), InputFormat::Csv);
        assert_eq!(InputFormat::from_path(Path::new("export")), InputFormat::Csv);
    }
}
