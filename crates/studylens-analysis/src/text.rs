//! Free-text and annotation text extraction
//!
//! Text is extracted in a pass independent of score normalization, over the
//! same raw rows. Each qualifying text becomes one [`TextRecord`] carrying
//! word and character counts.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::{
    facets::{DerivedFacets, Mode, Phase},
    normalize::{
        ANSWERS_KEYS, CATEGORY_KEYS, CROSS_MANUAL_KEYS, FINDINGS_KEYS, HAS_PRIVACY_KEYS,
        PARTICIPANT_KEYS, object_flag, object_or_seq, object_seq, object_tags, object_text,
    },
    record::{InputTable, RawRecord},
    value,
};

const STORY_ID_KEYS: &[&str] = &["story_id", "storyid"];
const CLIP_INDEX_KEYS: &[&str] = &["clip_index", "clipindex"];
const FREE_TEXT_KEYS: &[&str] = &["free_text", "freetext"];
const DESCRIPTION_KEYS: &[&str] = &["description"];
const OTHER_TEXT_KEYS: &[&str] = &["other_text", "otherText"];
const NO_PRIVACY_REASON_KEYS: &[&str] = &["no_privacy_reason", "reason", "explanation"];
const CLIP_NUMBERS_KEYS: &[&str] = &["clip_numbers", "clipNumbers", "clips"];
const ANSWER_TEXT_KEYS: &[&str] = &["text", "answer"];
const QUESTION_ID_KEYS: &[&str] = &["question_id", "id", "questionId"];

/// What a text record describes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum TextKind {
    /// Description of an identified privacy issue
    #[display("finding")]
    Finding,
    /// Explanation of why no privacy issue was found
    #[display("no_privacy")]
    NoPrivacy,
    /// Free-text questionnaire response
    #[display("response")]
    Response,
}

/// One extracted text with its facets and size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextRecord {
    pub participant_id: Option<String>,
    pub mode: Mode,
    pub study_label: String,
    pub phase: Phase,
    pub story_id: Option<String>,
    pub clip_index: Option<String>,
    pub source: String,
    pub kind: TextKind,
    #[serde(serialize_with = "serialize_joined")]
    pub categories: Vec<String>,
    pub description: Option<String>,
    pub other_text: Option<String>,
    /// Clip numbers in declared order, `;`-separated
    pub clip_numbers: Option<String>,
    pub word_count: usize,
    pub char_count: usize,
}

/// Serializes a list as one `;`-separated cell.
pub(crate) fn serialize_joined<S>(items: &[String], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&items.join(";"))
}

/// Number of whitespace-separated words.
#[must_use]
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

struct RowContext {
    participant_id: Option<String>,
    facets: DerivedFacets,
    story_id: Option<String>,
    clip_index: Option<String>,
}

impl RowContext {
    fn new(row: &RawRecord) -> Self {
        Self {
            participant_id: row.text(PARTICIPANT_KEYS),
            facets: DerivedFacets::derive(row),
            story_id: row.text(STORY_ID_KEYS),
            clip_index: row.text(CLIP_INDEX_KEYS),
        }
    }

    /// Builds a record unless both texts are empty.
    fn record(
        &self,
        source: String,
        kind: TextKind,
        categories: Vec<String>,
        description: Option<String>,
        other_text: Option<String>,
        clip_numbers: Option<String>,
    ) -> Option<TextRecord> {
        let combined = [description.as_deref(), other_text.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if combined.is_empty() {
            return None;
        }
        Some(TextRecord {
            participant_id: self.participant_id.clone(),
            mode: self.facets.mode,
            study_label: self.facets.study_label.clone(),
            phase: self.facets.phase,
            story_id: self.story_id.clone(),
            clip_index: self.clip_index.clone(),
            source,
            kind,
            categories,
            word_count: count_words(&combined),
            char_count: combined.chars().count(),
            description,
            other_text,
            clip_numbers,
        })
    }

    fn annotation(
        &self,
        object: &Map<String, Value>,
        source: &str,
        declared_no_privacy: bool,
    ) -> Option<TextRecord> {
        let categories = object_tags(object, CATEGORY_KEYS);
        let only_none = !categories.is_empty()
            && categories.iter().all(|c| c.eq_ignore_ascii_case("none"));
        let kind = if declared_no_privacy || only_none {
            TextKind::NoPrivacy
        } else {
            TextKind::Finding
        };
        let clip_numbers = CLIP_NUMBERS_KEYS
            .iter()
            .filter_map(|k| object.get(*k))
            .map(value::text_list)
            .find(|clips| !clips.is_empty())
            .map(|clips| clips.join(";"));
        self.record(
            source.to_owned(),
            kind,
            categories,
            object_text(object, DESCRIPTION_KEYS),
            object_text(object, OTHER_TEXT_KEYS),
            clip_numbers,
        )
    }

    fn response(&self, source: String, text: Option<String>) -> Option<TextRecord> {
        self.record(source, TextKind::Response, Vec::new(), text, None, None)
    }
}

/// Extracts text records from an item-export table.
///
/// Already-long tables carry no text and yield nothing.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use studylens_analysis::{
///     record::{InputTable, RawRecord},
///     text::{TextKind, extract_text},
/// };
///
/// let row = [
///     ("participant_id", json!("p1")),
///     ("item_type", json!("clip_annotation")),
///     (
///         "participant_findings",
///         json!([{"description": "face visible in mirror", "categories": ["identity"]}]),
///     ),
/// ]
/// .into_iter()
/// .collect::<RawRecord>();
///
/// let texts = extract_text(&InputTable::from_rows(vec![row]));
/// assert_eq!(texts.len(), 1);
/// assert_eq!(texts[0].kind, TextKind::Finding);
/// assert_eq!(texts[0].word_count, 4);
/// ```
#[must_use]
pub fn extract_text(table: &InputTable) -> Vec<TextRecord> {
    if table.is_long_format() {
        return Vec::new();
    }
    let mut out = Vec::new();
    for row in &table.rows {
        extract_row(row, &mut out);
    }
    out
}

fn extract_row(row: &RawRecord, out: &mut Vec<TextRecord>) {
    let ctx = RowContext::new(row);

    if let Some(cell) = row.get_first(FREE_TEXT_KEYS) {
        match value::parse_cell(cell) {
            Some(Value::Object(fields)) => {
                for (field, text) in &fields {
                    let text = text.is_string().then(|| value::scalar_text(text)).flatten();
                    out.extend(ctx.response(format!("free_text:{field}"), text));
                }
            }
            Some(Value::Array(items)) => {
                for item in items.iter().filter(|item| item.is_string()) {
                    out.extend(ctx.response("free_text".to_owned(), value::scalar_text(item)));
                }
            }
            _ => out.extend(ctx.response("free_text".to_owned(), value::scalar_text(cell))),
        }
    }

    if let Some(answers) = row.nested(ANSWERS_KEYS)
        && let Some(items) = object_seq(&answers, |_| {})
    {
        for answer in items {
            let Some(question_id) = object_text(answer, QUESTION_ID_KEYS) else {
                continue;
            };
            let text = ANSWER_TEXT_KEYS
                .iter()
                .filter_map(|k| answer.get(*k))
                .filter(|v| v.is_string())
                .find_map(value::scalar_text);
            out.extend(ctx.response(format!("answers:{question_id}"), text));
        }
    }

    if ctx.facets.phase != Phase::In {
        return;
    }

    if let Some(findings) = row.nested(FINDINGS_KEYS)
        && let Some(items) = object_seq(&findings, |_| {})
    {
        for finding in items {
            out.extend(ctx.annotation(finding, "manual", false));
        }
    }

    if let Some(Value::Object(manual)) = row.nested(CROSS_MANUAL_KEYS) {
        let declared_no_privacy = object_flag(&manual, HAS_PRIVACY_KEYS) == Some(false);
        if declared_no_privacy {
            let reason = object_text(&manual, NO_PRIVACY_REASON_KEYS)
                .or_else(|| object_text(&manual, DESCRIPTION_KEYS));
            out.extend(ctx.record(
                "cross_manual".to_owned(),
                TextKind::NoPrivacy,
                Vec::new(),
                reason,
                object_text(&manual, OTHER_TEXT_KEYS),
                None,
            ));
        }
        if let Some(findings) = manual.get("findings")
            && let Some(items) = object_or_seq(findings, |_| {})
        {
            for finding in items {
                out.extend(ctx.annotation(finding, "cross_manual", declared_no_privacy));
            }
        }
    }
}

/// Per-group text volume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextSummaryRow {
    pub mode: Mode,
    pub study_label: String,
    pub phase: Phase,
    pub source: String,
    pub kind: TextKind,
    pub n_records: usize,
    pub n_participants: usize,
    pub mean_words: f64,
    pub mean_chars: f64,
    pub total_words: usize,
}

/// Summarizes text records per (mode, study label, phase, source, kind).
///
/// Rows are ordered by their grouping key.
#[must_use]
#[expect(clippy::cast_precision_loss)]
pub fn summarize_text(records: &[TextRecord]) -> Vec<TextSummaryRow> {
    type Key<'a> = (Mode, &'a str, Phase, &'a str, TextKind);
    let mut groups = BTreeMap::<Key<'_>, Vec<&TextRecord>>::new();
    for record in records {
        let key = (
            record.mode,
            record.study_label.as_str(),
            record.phase,
            record.source.as_str(),
            record.kind,
        );
        groups.entry(key).or_default().push(record);
    }

    groups
        .into_iter()
        .map(|((mode, study_label, phase, source, kind), group)| {
            let n_records = group.len();
            let participants = group
                .iter()
                .filter_map(|r| r.participant_id.as_deref())
                .collect::<BTreeSet<_>>();
            let total_words = group.iter().map(|r| r.word_count).sum::<usize>();
            let total_chars = group.iter().map(|r| r.char_count).sum::<usize>();
            TextSummaryRow {
                mode,
                study_label: study_label.to_owned(),
                phase,
                source: source.to_owned(),
                kind,
                n_records,
                n_participants: participants.len(),
                mean_words: total_words as f64 / n_records as f64,
                mean_chars: total_chars as f64 / n_records as f64,
                total_words,
            }
        })
        .collect()
}
