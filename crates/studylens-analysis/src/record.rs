//! Raw input rows and tables
//!
//! A [`RawRecord`] is one row of a study-data export: an open mapping from
//! column name to value. Column names are matched case-insensitively, so
//! `participantId` and `participantid` address the same cell.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::value;

/// One row of the source table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    /// Cells keyed by lower-cased column name
    fields: BTreeMap<String, Value>,
}

impl RawRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a cell, replacing any existing cell with the same
    /// case-insensitive name. Attribute-encoded values are decoded.
    pub fn insert(&mut self, key: &str, value: Value) {
        self.fields
            .insert(key.to_lowercase(), value::decode_attribute(value));
    }

    /// Looks up a cell by case-insensitive name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(&key.to_lowercase())
    }

    /// First cell among `keys` holding something other than null or blank text.
    #[must_use]
    pub fn get_first(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter().filter_map(|k| self.get(k)).find(|v| match v {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        })
    }

    /// Trimmed, non-empty text of the first matching cell.
    #[must_use]
    pub fn text(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|k| self.get(k))
            .find_map(value::scalar_text)
    }

    /// Nested value of the first matching cell, decoding JSON text and
    /// attribute encodings.
    #[must_use]
    pub fn nested(&self, keys: &[&str]) -> Option<Value> {
        self.get_first(keys).and_then(value::parse_cell)
    }

    /// Iterates `(lower-cased column, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K> FromIterator<(K, Value)> for RawRecord
where
    K: AsRef<str>,
{
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        let mut record = Self::new();
        for (k, v) in iter {
            record.insert(k.as_ref(), v);
        }
        record
    }
}

/// A source table: its column names plus one [`RawRecord`] per row.
#[derive(Debug, Clone, Default)]
pub struct InputTable {
    /// Column names as they appeared in the source
    pub columns: Vec<String>,
    pub rows: Vec<RawRecord>,
}

impl InputTable {
    /// Builds a table from rows, deriving the column list as the union of
    /// row keys in first-seen order.
    #[must_use]
    pub fn from_rows(rows: Vec<RawRecord>) -> Self {
        let mut columns = Vec::<String>::new();
        for row in &rows {
            for (key, _) in row.iter() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.to_owned());
                }
            }
        }
        Self { columns, rows }
    }

    /// Whether the table has a column with the given case-insensitive name.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.eq_ignore_ascii_case(name))
    }

    /// Whether the table is already in long format (`question_id` and `score` columns).
    #[must_use]
    pub fn is_long_format(&self) -> bool {
        self.has_column("question_id") && self.has_column("score")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let record = [("participantId", json!(" p1 "))]
            .into_iter()
            .collect::<RawRecord>();
        assert_eq!(record.get("PARTICIPANTID"), Some(&json!(" p1 ")));
        assert_eq!(
            record.text(&["participant_id", "participantid"]).as_deref(),
            Some("p1")
        );
    }

    #[test]
    fn test_get_first_skips_blank_cells() {
        let record = [("aiAnswers", json!("")), ("ai_answers", json!("[]"))]
            .into_iter()
            .collect::<RawRecord>();
        assert_eq!(
            record.get_first(&["aianswers", "ai_answers"]),
            Some(&json!("[]"))
        );
        assert_eq!(record.nested(&["aianswers", "ai_answers"]), Some(json!([])));
    }

    #[test]
    fn test_cells_are_decoded_once() {
        let record = [("cross_clip_manual_privacy", json!({"M": {"N": {"S": "5"}}}))]
            .into_iter()
            .collect::<RawRecord>();
        assert_eq!(
            record.nested(&["cross_clip_manual_privacy"]),
            Some(json!({"N": "5"}))
        );
    }

    #[test]
    fn test_long_format_detection() {
        let table = InputTable {
            columns: vec!["Question_ID".into(), "Score".into()],
            rows: vec![],
        };
        assert!(table.is_long_format());
        assert!(!InputTable::default().is_long_format());
    }

    #[test]
    fn test_columns_from_rows() {
        let a = [("pk", json!("x")), ("sk", json!("y"))]
            .into_iter()
            .collect::<RawRecord>();
        let b = [("sk", json!("z")), ("answers", json!("[]"))]
            .into_iter()
            .collect::<RawRecord>();
        let table = InputTable::from_rows(vec![a, b]);
        assert_eq!(table.columns, vec!["pk", "sk", "answers"]);
    }
}
