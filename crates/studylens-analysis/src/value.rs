//! Value coercion for raw export cells
//!
//! Cells in a study-data export arrive in one of three shapes:
//!
//! - plain JSON values (already nested lists and maps)
//! - JSON encoded as text (typical for CSV exports)
//! - key-value store attribute encodings, where every value is a single-key
//!   map naming its type
//!
//! All three are coerced to the same plain [`serde_json::Value`] form before
//! extraction.
//!
//! # Attribute encoding
//!
//! ```text
//! {"S": "text"}                  -> "text"
//! {"N": "42"}                    -> 42
//! {"N": "2.5"}                   -> 2.5
//! {"BOOL": true}                 -> true
//! {"NULL": true}                 -> null
//! {"L": [{"N": "1"}, {"S": "a"}]} -> [1, "a"]
//! {"M": {"k": {"S": "v"}}}       -> {"k": "v"}
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Number, Value};

static INTEGER_TEXT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?\d+$").unwrap());

/// Type tag of a key-value store attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributeTag {
    String,
    Number,
    Bool,
    Null,
    List,
    Map,
}

impl AttributeTag {
    fn from_key(key: &str) -> Option<Self> {
        let tag = match key {
            "S" => Self::String,
            "N" => Self::Number,
            "BOOL" => Self::Bool,
            "NULL" => Self::Null,
            "L" => Self::List,
            "M" => Self::Map,
            _ => return None,
        };
        Some(tag)
    }

    fn decode(self, inner: Value) -> Value {
        match self {
            Self::String => match inner {
                Value::String(s) => Value::String(s),
                other => decode_attribute(other),
            },
            Self::Number => decode_number(inner),
            Self::Bool => Value::Bool(truthy(&inner)),
            Self::Null => Value::Null,
            Self::List => match inner {
                Value::Array(items) => Value::Array(items.into_iter().map(decode_attribute).collect()),
                other => decode_attribute(other),
            },
            Self::Map => match inner {
                Value::Object(map) => Value::Object(decode_map(map)),
                other => decode_attribute(other),
            },
        }
    }
}

/// Recursively decodes tagged attribute shapes into plain values.
///
/// A map is treated as a tagged attribute only when it has exactly one key
/// and that key is a known tag; any other map is decoded field by field.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use studylens_analysis::value::decode_attribute;
///
/// let raw = json!({"L": [{"M": {"question_id": {"S": "q1"}, "score": {"N": "-2"}}}]});
/// assert_eq!(
///     decode_attribute(raw),
///     json!([{"question_id": "q1", "score": -2}])
/// );
/// ```
#[must_use]
pub fn decode_attribute(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(decode_attribute).collect()),
        Value::Object(map) => {
            if map.len() == 1
                && let Some((key, _)) = map.iter().next()
                && let Some(tag) = AttributeTag::from_key(key)
            {
                let inner = map.into_iter().next().map_or(Value::Null, |(_, v)| v);
                return tag.decode(inner);
            }
            Value::Object(decode_map(map))
        }
        other => other,
    }
}

fn decode_map(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .map(|(k, v)| (k, decode_attribute(v)))
        .collect()
}

fn decode_number(inner: Value) -> Value {
    let text = match &inner {
        Value::String(s) => s.trim().to_owned(),
        Value::Number(_) => return inner,
        _ => return decode_attribute(inner),
    };
    if INTEGER_TEXT.is_match(&text)
        && let Ok(n) = text.parse::<i64>()
    {
        return Value::Number(n.into());
    }
    match text.parse::<f64>().ok().and_then(Number::from_f64) {
        Some(n) => Value::Number(n),
        None => Value::String(text),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Coerces a raw cell into a nested value.
///
/// Nested values are returned as they are, since [`RawRecord`] cells are
/// decoded on insertion; text is trimmed, parsed as JSON, then decoded.
/// Blank text, invalid JSON, and bare scalars yield `None`.
///
/// [`RawRecord`]: crate::record::RawRecord
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use studylens_analysis::value::parse_cell;
///
/// assert_eq!(parse_cell(&json!(r#"[{"id": "q1", "score": "2"}]"#)), Some(json!([{"id": "q1", "score": "2"}])));
/// assert_eq!(parse_cell(&json!("  ")), None);
/// assert_eq!(parse_cell(&json!("{not json")), None);
/// ```
#[must_use]
pub fn parse_cell(value: &Value) -> Option<Value> {
    match value {
        Value::Array(_) | Value::Object(_) => Some(value.clone()),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            serde_json::from_str::<Value>(s).ok().map(decode_attribute)
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => None,
    }
}

/// Coerces a score to a finite float.
///
/// Numbers, numeric text, and booleans (as 1/0) are accepted. NaN and
/// infinite results are rejected, so every accepted score is usable in
/// arithmetic.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use studylens_analysis::value::coerce_score;
///
/// assert_eq!(coerce_score(&json!(2)), Some(2.0));
/// assert_eq!(coerce_score(&json!(" -1.5 ")), Some(-1.5));
/// assert_eq!(coerce_score(&json!(true)), Some(1.0));
/// assert_eq!(coerce_score(&json!("NaN")), None);
/// assert_eq!(coerce_score(&json!("n/a")), None);
/// assert_eq!(coerce_score(&json!(null)), None);
/// ```
#[must_use]
pub fn coerce_score(value: &Value) -> Option<f64> {
    let score = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    score.is_finite().then_some(score)
}

/// Coerces a yes/no flag.
///
/// Accepts booleans, the numbers 0 and 1, and the usual textual spellings.
#[must_use]
pub fn coerce_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_f64()? {
            x if x == 0.0 => Some(false),
            x if x == 1.0 => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Renders a scalar as trimmed, non-empty text.
///
/// Numbers are rendered in their JSON form, so an identifier exported as
/// `7` and one exported as `"7"` compare equal.
#[must_use]
pub fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_owned(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Renders a tag list that may be a sequence of scalars or a single scalar.
///
/// Blank entries are skipped; order is preserved.
#[must_use]
pub fn text_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
        other => scalar_text(other).into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_number_tags() {
        assert_eq!(decode_attribute(json!({"N": "12"})), json!(12));
        assert_eq!(decode_attribute(json!({"N": "-0.25"})), json!(-0.25));
        assert_eq!(decode_attribute(json!({"N": "abc"})), json!("abc"));
    }

    #[test]
    fn test_plain_maps_are_not_mistaken_for_tags() {
        let plain = json!({"S": "x", "other": 1});
        assert_eq!(decode_attribute(plain.clone()), plain);
        assert_eq!(decode_attribute(json!({"score": 1})), json!({"score": 1}));
    }

    #[test]
    fn test_nested_tags_inside_json_text() {
        let cell = json!(r#"{"M": {"has_privacy": {"BOOL": false}, "findings": {"L": []}}}"#);
        assert_eq!(
            parse_cell(&cell),
            Some(json!({"has_privacy": false, "findings": []}))
        );
    }

    #[test]
    fn test_scalar_cells_are_not_nested_values() {
        assert_eq!(parse_cell(&json!(3)), None);
        assert_eq!(parse_cell(&json!(null)), None);
    }

    #[test]
    fn test_infinite_scores_are_rejected() {
        assert_eq!(coerce_score(&json!("inf")), None);
        assert_eq!(coerce_score(&json!("1e400")), None);
        assert_eq!(coerce_score(&json!([1])), None);
    }

    #[test]
    fn test_flags() {
        assert_eq!(coerce_flag(&json!(false)), Some(false));
        assert_eq!(coerce_flag(&json!("Yes")), Some(true));
        assert_eq!(coerce_flag(&json!(0)), Some(false));
        assert_eq!(coerce_flag(&json!(2)), None);
    }

    #[test]
    fn test_text_list_shapes() {
        assert_eq!(text_list(&json!(["a", " ", 3])), vec!["a", "3"]);
        assert_eq!(text_list(&json!("solo")), vec!["solo"]);
        assert!(text_list(&json!(null)).is_empty());
    }
}
