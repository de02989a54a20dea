//! Generative-tool usage records
//!
//! Questionnaire items may carry a `genai_usage` object describing whether
//! and how a participant uses generative tools.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;

use crate::{
    facets::{DerivedFacets, Mode, Phase},
    normalize::{PARTICIPANT_KEYS, object_flag, object_tags, object_text},
    record::InputTable,
    text::serialize_joined,
};

const GENAI_KEYS: &[&str] = &["genai_usage", "genaiusage"];
const USED_KEYS: &[&str] = &["used", "uses_genai", "has_used"];
const FREQUENCY_KEYS: &[&str] = &["frequency"];
const TOOLS_KEYS: &[&str] = &["tools"];
const PURPOSES_KEYS: &[&str] = &["purposes", "purpose"];

/// Tool label of the summary row covering every tool.
pub const ALL_TOOLS: &str = "*";

/// One participant's generative-tool usage answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenAiUsageRecord {
    pub participant_id: Option<String>,
    pub mode: Mode,
    pub study_label: String,
    pub phase: Phase,
    pub used: Option<bool>,
    pub frequency: Option<String>,
    #[serde(serialize_with = "serialize_joined")]
    pub tools: Vec<String>,
    #[serde(serialize_with = "serialize_joined")]
    pub purposes: Vec<String>,
}

impl GenAiUsageRecord {
    /// Whether the participant reported use, either explicitly or by naming a tool.
    #[must_use]
    pub fn reports_use(&self) -> bool {
        self.used.unwrap_or(!self.tools.is_empty())
    }
}

/// Extracts usage records; rows with neither a usage flag nor a tool are skipped.
#[must_use]
pub fn extract_genai_usage(table: &InputTable) -> Vec<GenAiUsageRecord> {
    table
        .rows
        .iter()
        .filter_map(|row| {
            let Value::Object(usage) = row.nested(GENAI_KEYS)? else {
                return None;
            };
            let used = object_flag(&usage, USED_KEYS);
            let tools = object_tags(&usage, TOOLS_KEYS);
            if used.is_none() && tools.is_empty() {
                return None;
            }
            let facets = DerivedFacets::derive(row);
            Some(GenAiUsageRecord {
                participant_id: row.text(PARTICIPANT_KEYS),
                mode: facets.mode,
                study_label: facets.study_label,
                phase: facets.phase,
                used,
                frequency: object_text(&usage, FREQUENCY_KEYS),
                tools,
                purposes: object_tags(&usage, PURPOSES_KEYS),
            })
        })
        .collect()
}

/// Usage counts per (mode, study label, tool).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenAiSummaryRow {
    pub mode: Mode,
    pub study_label: String,
    /// Tool name, or [`ALL_TOOLS`]
    pub tool: String,
    pub n_participants: usize,
    pub n_used: usize,
    pub used_rate: f64,
}

/// Summarizes usage records.
///
/// The [`ALL_TOOLS`] row counts every participant of the group and how many
/// report any use. Per-tool rows count participants naming the tool, so
/// their `used_rate` is relative to the whole group.
/// Participants are distinct ids; records without an id count individually.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use studylens_analysis::{
///     genai::{extract_genai_usage, summarize_genai},
///     record::{InputTable, RawRecord},
/// };
///
/// let rows = [
///     ("p1", json!({"used": true, "tools": ["chat"]})),
///     ("p2", json!({"used": false})),
/// ]
/// .into_iter()
/// .map(|(id, usage)| {
///     [("participant_id", json!(id)), ("mode", json!("human")), ("genai_usage", usage)]
///         .into_iter()
///         .collect::<RawRecord>()
/// })
/// .collect();
///
/// let summary = summarize_genai(&extract_genai_usage(&InputTable::from_rows(rows)));
/// assert_eq!(summary[0].tool, "*");
/// assert_eq!(summary[0].n_used, 1);
/// assert!((summary[0].used_rate - 0.5).abs() < 1e-12);
/// assert_eq!(summary[1].tool, "chat");
/// ```
#[must_use]
#[expect(clippy::cast_precision_loss)]
pub fn summarize_genai(records: &[GenAiUsageRecord]) -> Vec<GenAiSummaryRow> {
    // Latest record per participant wins within a group.
    let mut groups = BTreeMap::<(Mode, &str), BTreeMap<String, &GenAiUsageRecord>>::new();
    for (index, record) in records.iter().enumerate() {
        let participant = record
            .participant_id
            .clone()
            .unwrap_or_else(|| format!("#{index}"));
        groups
            .entry((record.mode, record.study_label.as_str()))
            .or_default()
            .insert(participant, record);
    }

    let mut rows = Vec::new();
    for ((mode, study_label), participants) in groups {
        let n_participants = participants.len();
        let rate = |n: usize| n as f64 / n_participants as f64;
        let row = |tool: &str, n_used: usize| GenAiSummaryRow {
            mode,
            study_label: study_label.to_owned(),
            tool: tool.to_owned(),
            n_participants,
            n_used,
            used_rate: rate(n_used),
        };

        let n_used = participants.values().filter(|r| r.reports_use()).count();
        rows.push(row(ALL_TOOLS, n_used));

        let tools = participants
            .values()
            .flat_map(|r| r.tools.iter().map(|t| t.to_lowercase()))
            .collect::<BTreeSet<_>>();
        for tool in tools {
            let n_used = participants
                .values()
                .filter(|r| r.tools.iter().any(|t| t.to_lowercase() == tool))
                .count();
            rows.push(row(&tool, n_used));
        }
    }
    rows
}
