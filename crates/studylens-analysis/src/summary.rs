//! Likert aggregation
//!
//! Long records are grouped by an ordered set of [`Facet`]s plus the question
//! id. Only scores inside the response scale are aggregated, so wider-range
//! instruments sharing the table (workload scales, counts) fall out.
//!
//! Each [`SummaryRow`] carries count, mean, sample standard deviation, and a
//! zero-filled histogram over the integer scale points whose counts sum to `n`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use studylens_stats::{
    descriptive::DescriptiveStats,
    histogram::{IntegerScale, ScaleHistogram},
};

use crate::{facets::Phase, long::LongRecord};

/// A column records can be grouped by.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    #[display("mode")]
    Mode,
    #[display("study_label")]
    StudyLabel,
    #[display("phase")]
    Phase,
    #[display("source")]
    Source,
    #[display("privacy_type")]
    PrivacyType,
}

impl Facet {
    /// Default grouping of the Likert summary.
    pub const DEFAULT_GROUPING: [Self; 3] = [Self::Mode, Self::StudyLabel, Self::Phase];

    /// Parses a column name, ignoring case.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mode" => Some(Self::Mode),
            "study_label" | "study" => Some(Self::StudyLabel),
            "phase" => Some(Self::Phase),
            "source" => Some(Self::Source),
            "privacy_type" => Some(Self::PrivacyType),
            _ => None,
        }
    }

    /// The record's value in this column; an absent privacy type is empty.
    #[must_use]
    pub fn value(self, record: &LongRecord) -> String {
        match self {
            Self::Mode => record.mode.to_string(),
            Self::StudyLabel => record.study_label.clone(),
            Self::Phase => record.phase.to_string(),
            Self::Source => record.source.to_string(),
            Self::PrivacyType => record.privacy_type.clone().unwrap_or_default(),
        }
    }
}

/// Aggregate of one (group, question) combination.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    /// Group values, aligned with the grouping facets
    pub group: Vec<String>,
    pub question_id: String,
    pub n: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` when `n == 1`
    pub std: Option<f64>,
    pub histogram: ScaleHistogram,
}

/// Summarizes in-scale scores per (group, question).
///
/// Rows are ordered by group values, then question id.
///
/// # Examples
///
/// ```
/// use studylens_analysis::{
///     facets::{Mode, Phase},
///     long::{LongRecord, Source},
///     summary::{Facet, summarize_likert},
/// };
/// use studylens_stats::histogram::IntegerScale;
///
/// let record = |score| LongRecord {
///     participant_id: Some("p1".into()),
///     mode: Mode::Human,
///     study_label: "pilot".into(),
///     phase: Phase::Pre,
///     question_id: "q1".into(),
///     score,
///     source: Source::Answers,
///     item_id: None,
///     privacy_type: None,
/// };
/// let records = [record(1.0), record(3.0), record(15.0)];
///
/// let rows = summarize_likert(&records, IntegerScale::SEVEN_POINT, &[Facet::Mode]);
/// assert_eq!(rows.len(), 1);
/// assert_eq!(rows[0].group, vec!["human"]);
/// assert_eq!(rows[0].n, 2);
/// assert_eq!(rows[0].mean, 2.0);
/// assert_eq!(rows[0].histogram.count(3), 1);
/// ```
#[must_use]
pub fn summarize_likert(
    records: &[LongRecord],
    scale: IntegerScale,
    group_by: &[Facet],
) -> Vec<SummaryRow> {
    summarize(records.iter(), scale, group_by)
}

/// Summarizes in-study annotation scores per (group, source, privacy type, question).
///
/// Only `in`-phase records from typed sources are considered. Records with no
/// privacy type (absent, blank, or `none`) are dropped unless
/// `include_untyped` is set.
#[must_use]
pub fn summarize_by_type(
    records: &[LongRecord],
    scale: IntegerScale,
    group_by: &[Facet],
    include_untyped: bool,
) -> Vec<SummaryRow> {
    let facets = type_grouping(group_by);
    let typed = records.iter().filter(|r| {
        r.phase == Phase::In && r.source.is_typed() && (include_untyped || r.has_privacy_type())
    });
    summarize(typed, scale, &facets)
}

/// Grouping of the type-partitioned summary: `group_by` followed by
/// source and privacy type, without duplicates.
#[must_use]
pub fn type_grouping(group_by: &[Facet]) -> Vec<Facet> {
    let mut facets = group_by.to_vec();
    for extra in [Facet::Source, Facet::PrivacyType] {
        if !facets.contains(&extra) {
            facets.push(extra);
        }
    }
    facets
}

/// Keeps only records whose score lies inside the scale.
#[must_use]
pub fn filter_scale(records: &[LongRecord], scale: IntegerScale) -> Vec<LongRecord> {
    records
        .iter()
        .filter(|r| scale.contains(r.score))
        .cloned()
        .collect()
}

fn summarize<'a>(
    records: impl Iterator<Item = &'a LongRecord>,
    scale: IntegerScale,
    group_by: &[Facet],
) -> Vec<SummaryRow> {
    let mut groups = BTreeMap::<(Vec<String>, &str), Vec<f64>>::new();
    for record in records.filter(|r| scale.contains(r.score)) {
        let key = group_by.iter().map(|f| f.value(record)).collect();
        groups
            .entry((key, record.question_id.as_str()))
            .or_default()
            .push(record.score);
    }

    groups
        .into_iter()
        .filter_map(|((group, question_id), scores)| {
            let stats = DescriptiveStats::new(scores.iter().copied())?;
            Some(SummaryRow {
                group,
                question_id: question_id.to_owned(),
                n: stats.count,
                mean: stats.mean,
                std: stats.std_dev,
                histogram: ScaleHistogram::new(scale, scores),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        facets::Mode,
        long::Source,
    };

    fn record(mode: Mode, question_id: &str, score: f64) -> LongRecord {
        LongRecord {
            participant_id: Some("p".into()),
            mode,
            study_label: "formal".into(),
            phase: Phase::In,
            question_id: question_id.into(),
            score,
            source: Source::Manual,
            item_id: None,
            privacy_type: None,
        }
    }

    fn typed(privacy_type: Option<&str>, source: Source, score: f64) -> LongRecord {
        LongRecord {
            privacy_type: privacy_type.map(str::to_owned),
            source,
            ..record(Mode::Vlm, "manual_privacy_threat_score", score)
        }
    }

    #[test]
    fn test_histogram_counts_sum_to_n() {
        let records = [
            record(Mode::Human, "q1", -3.0),
            record(Mode::Human, "q1", 0.0),
            record(Mode::Human, "q1", 0.5),
            record(Mode::Human, "q1", 3.0),
            record(Mode::Human, "q1", 20.0),
            record(Mode::Vlm, "q1", 2.0),
            record(Mode::Vlm, "q2", -1.0),
        ];
        let rows = summarize_likert(&records, IntegerScale::SEVEN_POINT, &Facet::DEFAULT_GROUPING);
        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert_eq!(row.histogram.total(), row.n as u64);
            assert_eq!(row.histogram.iter().count(), 7);
        }
        assert_eq!(rows[0].group, vec!["human", "formal", "in"]);
        assert_eq!(rows[0].n, 4);
        assert_eq!(rows[1].std, None);
    }

    #[test]
    fn test_std_is_sample_std() {
        let records = [
            record(Mode::Human, "q1", 1.0),
            record(Mode::Human, "q1", 2.0),
            record(Mode::Human, "q1", 3.0),
        ];
        let rows = summarize_likert(&records, IntegerScale::SEVEN_POINT, &[]);
        assert!(rows[0].group.is_empty());
        assert!((rows[0].std.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_scale_filter_is_idempotent() {
        let records = [
            record(Mode::Human, "q1", -4.0),
            record(Mode::Human, "q1", 2.0),
            record(Mode::Human, "nasa_tlx", 55.0),
        ];
        let once = filter_scale(&records, IntegerScale::SEVEN_POINT);
        let twice = filter_scale(&once, IntegerScale::SEVEN_POINT);
        assert_eq!(once.len(), 1);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_type_summary_drops_untyped_by_default() {
        let records = [
            typed(Some("location"), Source::Manual, 2.0),
            typed(Some("NONE"), Source::Manual, 1.0),
            typed(None, Source::Manual, 1.0),
            typed(Some("location"), Source::Answers, 1.0),
            LongRecord {
                phase: Phase::Post,
                ..typed(Some("location"), Source::Ai, 1.0)
            },
        ];
        let rows = summarize_by_type(&records, IntegerScale::SEVEN_POINT, &[Facet::Mode], false);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].group, vec!["vlm", "manual", "location"]);

        let rows = summarize_by_type(&records, IntegerScale::SEVEN_POINT, &[Facet::Mode], true);
        let types = rows.iter().map(|r| r.group[2].as_str()).collect::<Vec<_>>();
        assert_eq!(types, vec!["", "NONE", "location"]);
    }

    #[test]
    fn test_type_grouping_has_no_duplicates() {
        assert_eq!(
            type_grouping(&[Facet::Source, Facet::Mode]),
            vec![Facet::Source, Facet::Mode, Facet::PrivacyType]
        );
    }

    #[test]
    fn test_facet_names() {
        for facet in [
            Facet::Mode,
            Facet::StudyLabel,
            Facet::Phase,
            Facet::Source,
            Facet::PrivacyType,
        ] {
            assert_eq!(Facet::parse(&facet.to_string()), Some(facet));
        }
        assert_eq!(Facet::parse("question_id"), None);
    }
}
