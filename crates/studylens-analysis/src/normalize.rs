//! Normalization of raw exports into long-format records
//!
//! # Overview
//!
//! Two input shapes are accepted:
//!
//! 1. **Already-long tables** with `question_id` and `score` columns: each
//!    row becomes one [`LongRecord`]; missing facets are derived per row.
//! 2. **Item exports**: each row is one stored item whose nested
//!    substructures are probed independently:
//!
//! ```text
//! answers                     -> source "answers"      (any phase)
//! aiAnswers / ai_answers      -> source "ai_answers"   (any phase)
//! participant_findings        -> source "manual"       (phase "in")
//! ai_responses                -> source "ai"           (phase "in")
//! cross_clip_responses        -> source "cross"        (phase "in")
//! cross_clip_manual_privacy   -> source "cross_manual" (phase "in")
//! ```
//!
//! Scored annotation objects expand to the cross product of the score keys
//! present on the object and its declared category tags (one untagged
//! record per score key when no tags are declared).
//!
//! # Failure policy
//!
//! Malformed nested values, non-object list elements, answers without a
//! question id, and non-numeric scores are skipped one at a time and
//! tallied in [`NormalizeStats`]; nothing here aborts the run.

use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    facets::{self, DerivedFacets, Phase},
    long::{LongRecord, Source},
    record::{InputTable, RawRecord},
    value,
};

type ScoreKeys = [(&'static str, &'static str)];

/// Manual single-clip finding score keys and their question ids.
pub const MANUAL_SCORE_KEYS: &ScoreKeys = &[
    ("privacy_threat_score", "manual_privacy_threat_score"),
    ("share_willingness_score", "manual_share_willingness_score"),
    ("ai_memory_comfort_score", "manual_ai_memory_comfort_score"),
];

/// AI single-clip response score keys and their question ids.
pub const AI_SCORE_KEYS: &ScoreKeys = &[
    ("privacy_threat_score", "ai_privacy_threat_score"),
    ("share_willingness_score", "ai_share_willingness_score"),
    ("ai_memory_comfort_score", "ai_ai_memory_comfort_score"),
    ("trust_ai_score", "ai_trust_ai_score"),
];

/// Cross-clip AI response score keys and their question ids.
pub const CROSS_SCORE_KEYS: &ScoreKeys = &[
    ("cross_privacy_threat_score", "cross_privacy_threat_score"),
    ("cross_more_severe_score", "cross_more_severe_score"),
    ("cross_ai_memory_comfort_score", "cross_ai_memory_comfort_score"),
];

/// Cross-clip manual finding score keys and their question ids.
pub const CROSS_MANUAL_SCORE_KEYS: &ScoreKeys = &[
    ("cross_privacy_threat_score", "cross_manual_privacy_threat_score"),
    ("cross_more_severe_score", "cross_manual_more_severe_score"),
    ("cross_ai_memory_comfort_score", "cross_manual_ai_memory_comfort_score"),
    ("privacy_threat_score", "cross_manual_privacy_threat_score"),
    ("share_willingness_score", "cross_manual_share_willingness_score"),
    ("ai_memory_comfort_score", "cross_manual_ai_memory_comfort_score"),
];

/// Question id of the explicit cross-clip "has privacy issue" answer.
pub const CROSS_MANUAL_HAS_PRIVACY: &str = "cross_manual_has_privacy";

pub(crate) const PARTICIPANT_KEYS: &[&str] = &["participant_id", "participantid"];
pub(crate) const ANSWERS_KEYS: &[&str] = &["answers"];
const AI_ANSWERS_KEYS: &[&str] = &["aianswers", "ai_answers"];
pub(crate) const FINDINGS_KEYS: &[&str] = &["participant_findings", "participantfindings"];
const AI_RESPONSES_KEYS: &[&str] = &["ai_responses", "airesponses"];
const CROSS_RESPONSES_KEYS: &[&str] = &["cross_clip_responses", "crossclipresponses"];
pub(crate) const CROSS_MANUAL_KEYS: &[&str] =
    &["cross_clip_manual_privacy", "crossclipmanualprivacy"];

const QUESTION_ID_KEYS: &[&str] = &["question_id", "id", "questionId"];
pub(crate) const FINDING_ID_KEYS: &[&str] = &["finding_id", "findingId"];
const DETECTION_ID_KEYS: &[&str] = &["det_id", "detId"];
const THREAT_ID_KEYS: &[&str] = &["threat_id", "threatId"];

/// Tag keys of manual annotations.
pub(crate) const CATEGORY_KEYS: &[&str] =
    &["categories", "privacy_types", "privacy_type", "category"];
/// Tag keys of AI responses.
const INFO_TYPE_KEYS: &[&str] = &[
    "information_types",
    "info_types",
    "information_type",
    "privacy_types",
    "privacy_type",
];
pub(crate) const HAS_PRIVACY_KEYS: &[&str] = &[
    "has_privacy",
    "has_privacy_issue",
    "hasPrivacy",
    "hasPrivacyIssue",
];

/// Counters describing one normalization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    /// Input rows visited
    pub rows: usize,
    /// Long records emitted
    pub records: usize,
    /// Candidate records dropped because the score was not numeric
    pub dropped_scores: usize,
    /// Nested elements skipped for having the wrong shape or no identifier
    pub skipped_elements: usize,
}

/// Output of [`normalize_to_long`].
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub records: Vec<LongRecord>,
    pub stats: NormalizeStats,
}

/// Converts an input table into canonical long records.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use studylens_analysis::{
///     normalize::normalize_to_long,
///     record::{InputTable, RawRecord},
/// };
///
/// let row = [
///     ("participant_id", json!("p1")),
///     ("sk", json!("pilot#p1#prestudy")),
///     ("mode", json!("vlm")),
///     ("answers", json!(r#"[{"question_id": "q1", "score": 2}, {"id": "q2", "score": "x"}]"#)),
/// ]
/// .into_iter()
/// .collect::<RawRecord>();
///
/// let out = normalize_to_long(&InputTable::from_rows(vec![row]));
/// assert_eq!(out.records.len(), 1);
/// assert_eq!(out.records[0].question_id, "q1");
/// assert_eq!(out.records[0].study_label, "pilot");
/// assert_eq!(out.stats.dropped_scores, 1);
/// ```
#[must_use]
pub fn normalize_to_long(table: &InputTable) -> Normalized {
    let mut out = Normalized::default();
    if table.is_long_format() {
        for row in &table.rows {
            out.stats.rows += 1;
            normalize_long_row(row, &mut out);
        }
    } else {
        for row in &table.rows {
            out.stats.rows += 1;
            normalize_item_row(row, &mut out);
        }
    }
    out.stats.records = out.records.len();
    debug!(
        rows = out.stats.rows,
        records = out.stats.records,
        dropped_scores = out.stats.dropped_scores,
        skipped_elements = out.stats.skipped_elements,
        "normalized table"
    );
    out
}

fn normalize_long_row(row: &RawRecord, out: &mut Normalized) {
    let Some(score) = row.get("score").and_then(value::coerce_score) else {
        out.stats.dropped_scores += 1;
        return;
    };
    let Some(question_id) = row.text(&["question_id"]) else {
        out.stats.skipped_elements += 1;
        return;
    };
    let phase = row
        .text(&["phase"])
        .and_then(|p| Phase::parse(&p))
        .or_else(|| facets::derive_phase(row))
        .unwrap_or(Phase::Unknown);

    out.records.push(LongRecord {
        participant_id: row.text(PARTICIPANT_KEYS),
        mode: facets::derive_mode(row),
        study_label: facets::derive_study_label(row),
        phase,
        question_id,
        score,
        source: row.text(&["source"]).map_or(Source::Long, |s| Source::parse(&s)),
        item_id: row.text(&["item_id"]),
        privacy_type: row.text(&["privacy_type"]),
    });
}

/// Emits long records for one raw row, sharing its facets and participant.
struct RowSink<'a> {
    participant_id: Option<String>,
    facets: DerivedFacets,
    out: &'a mut Normalized,
}

impl RowSink<'_> {
    fn emit(
        &mut self,
        question_id: &str,
        score: &Value,
        source: &Source,
        item_id: Option<&str>,
        privacy_type: Option<&str>,
    ) {
        let Some(score) = value::coerce_score(score) else {
            self.out.stats.dropped_scores += 1;
            return;
        };
        self.out.records.push(LongRecord {
            participant_id: self.participant_id.clone(),
            mode: self.facets.mode,
            study_label: self.facets.study_label.clone(),
            phase: self.facets.phase,
            question_id: question_id.to_owned(),
            score,
            source: source.clone(),
            item_id: item_id.map(str::to_owned),
            privacy_type: privacy_type.map(str::to_owned),
        });
    }

    fn skip(&mut self, what: &str) {
        debug!(participant_id = ?self.participant_id, what, "skipped malformed element");
        self.out.stats.skipped_elements += 1;
    }

    /// Expands one object into `{present score keys} x {declared tags}`.
    fn emit_scored_object(
        &mut self,
        object: &Map<String, Value>,
        score_keys: &ScoreKeys,
        tag_keys: &[&str],
        id_keys: &[&str],
        source: &Source,
    ) {
        let tags = object_tags(object, tag_keys);
        let item_id = object_text(object, id_keys);
        for (raw_key, question_id) in score_keys {
            let Some(score) = object.get(*raw_key) else {
                continue;
            };
            if tags.is_empty() {
                self.emit(question_id, score, source, item_id.as_deref(), None);
            } else {
                for tag in &tags {
                    self.emit(question_id, score, source, item_id.as_deref(), Some(tag));
                }
            }
        }
    }

    fn emit_answers(&mut self, answers: &Value, source: &Source) {
        let Some(items) = object_seq(answers, |what| self.skip(what)) else {
            return;
        };
        for answer in items {
            let Some(question_id) = object_text(answer, QUESTION_ID_KEYS) else {
                self.skip("answer without question id");
                continue;
            };
            // Text-only answers are handled by text extraction.
            let Some(score) = answer.get("score") else {
                continue;
            };
            self.emit(&question_id, score, source, None, None);
        }
    }

    fn emit_scored_list(
        &mut self,
        list: &Value,
        score_keys: &ScoreKeys,
        tag_keys: &[&str],
        id_keys: &[&str],
        source: &Source,
    ) {
        let Some(items) = object_seq(list, |what| self.skip(what)) else {
            return;
        };
        for object in items {
            self.emit_scored_object(object, score_keys, tag_keys, id_keys, source);
        }
    }

    fn emit_cross_manual(&mut self, value: &Value) {
        let Value::Object(object) = value else {
            self.skip("cross-clip manual annotation is not an object");
            return;
        };
        // Explicit negative answers stay visible in aggregates.
        if let Some(flag) = object_flag(object, HAS_PRIVACY_KEYS) {
            let score = Value::from(u8::from(flag));
            self.emit(
                CROSS_MANUAL_HAS_PRIVACY,
                &score,
                &Source::CrossManual,
                None,
                None,
            );
        }
        if let Some(findings) = object.get("findings") {
            let Some(items) = object_or_seq(findings, |what| self.skip(what)) else {
                return;
            };
            for finding in items {
                self.emit_scored_object(
                    finding,
                    CROSS_MANUAL_SCORE_KEYS,
                    CATEGORY_KEYS,
                    FINDING_ID_KEYS,
                    &Source::CrossManual,
                );
            }
        }
    }
}

fn normalize_item_row(row: &RawRecord, out: &mut Normalized) {
    let mut sink = RowSink {
        participant_id: row.text(PARTICIPANT_KEYS),
        facets: DerivedFacets::derive(row),
        out,
    };

    if let Some(answers) = nested_or_skip(row, ANSWERS_KEYS, &mut sink) {
        sink.emit_answers(&answers, &Source::Answers);
    }
    if let Some(answers) = nested_or_skip(row, AI_ANSWERS_KEYS, &mut sink) {
        sink.emit_answers(&answers, &Source::AiAnswers);
    }

    if sink.facets.phase != Phase::In {
        return;
    }

    if let Some(findings) = nested_or_skip(row, FINDINGS_KEYS, &mut sink) {
        sink.emit_scored_list(
            &findings,
            MANUAL_SCORE_KEYS,
            CATEGORY_KEYS,
            FINDING_ID_KEYS,
            &Source::Manual,
        );
    }
    if let Some(responses) = nested_or_skip(row, AI_RESPONSES_KEYS, &mut sink) {
        sink.emit_scored_list(
            &responses,
            AI_SCORE_KEYS,
            INFO_TYPE_KEYS,
            DETECTION_ID_KEYS,
            &Source::Ai,
        );
    }
    if let Some(responses) = nested_or_skip(row, CROSS_RESPONSES_KEYS, &mut sink) {
        sink.emit_scored_list(
            &responses,
            CROSS_SCORE_KEYS,
            INFO_TYPE_KEYS,
            THREAT_ID_KEYS,
            &Source::Cross,
        );
    }
    if let Some(manual) = nested_or_skip(row, CROSS_MANUAL_KEYS, &mut sink) {
        sink.emit_cross_manual(&manual);
    }
}

/// Decodes a nested cell; a present but undecodable cell counts as skipped.
fn nested_or_skip(row: &RawRecord, keys: &[&str], sink: &mut RowSink<'_>) -> Option<Value> {
    row.get_first(keys)?;
    let nested = row.nested(keys);
    if nested.is_none() {
        sink.skip(keys[0]);
    }
    nested
}

/// Objects of a sequence; non-object elements are reported and skipped.
pub(crate) fn object_seq<'v>(
    value: &'v Value,
    mut skip: impl FnMut(&str),
) -> Option<Vec<&'v Map<String, Value>>> {
    let Value::Array(items) = value else {
        skip("expected a list");
        return None;
    };
    let objects = items
        .iter()
        .filter_map(|item| {
            let object = item.as_object();
            if object.is_none() {
                skip("list element is not an object");
            }
            object
        })
        .collect();
    Some(objects)
}

/// A single object, or the objects of a sequence.
pub(crate) fn object_or_seq<'v>(
    value: &'v Value,
    skip: impl FnMut(&str),
) -> Option<Vec<&'v Map<String, Value>>> {
    match value {
        Value::Object(object) => Some(vec![object]),
        _ => object_seq(value, skip),
    }
}

pub(crate) fn object_text(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| object.get(*k))
        .find_map(value::scalar_text)
}

pub(crate) fn object_tags(object: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .filter_map(|k| object.get(*k))
        .map(value::text_list)
        .find(|tags| !tags.is_empty())
        .unwrap_or_default()
}

pub(crate) fn object_flag(object: &Map<String, Value>, keys: &[&str]) -> Option<bool> {
    keys.iter()
        .filter_map(|k| object.get(*k))
        .find_map(value::coerce_flag)
}
