//! Group comparison per (study label, phase, question)
//!
//! Repeated observations of a participant are first collapsed to their mean,
//! so each participant contributes one value per question. Participants are
//! then partitioned by the group facet (the study condition by default).
//!
//! Every combination with at least two non-empty groups yields one
//! [`ComparisonRow`] with per-group descriptive statistics, a Kruskal–Wallis
//! test, and, only when exactly two groups are present, a Welch t-test.
//!
//! Significance testing requires the `pvalue` feature. Without it,
//! [`compare_groups`] returns no rows.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use studylens_stats::descriptive::{self, DescriptiveStats};
#[cfg(feature = "pvalue")]
use studylens_stats::hypothesis;

use crate::{facets::Phase, long::LongRecord, summary::Facet};

/// Statistic and two-sided p-value of one test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TestSummary {
    pub statistic: f64,
    pub p_value: f64,
}

/// Descriptive statistics of one group's participant means.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub label: String,
    pub n: usize,
    pub mean: f64,
    /// Sample standard deviation, zero for a single participant
    pub std: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub study_label: String,
    pub phase: Phase,
    pub question_id: String,
    /// Present groups, ordered by label
    pub groups: Vec<GroupStats>,
    pub kruskal: Option<TestSummary>,
    /// Welch t-test of the first group against the second; two groups only
    pub ttest: Option<TestSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareOptions {
    /// Phases to compare, in output order
    pub phases: Vec<Phase>,
    /// Facet partitioning participants into groups
    pub group_facet: Facet,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            phases: vec![Phase::Pre, Phase::In, Phase::Post],
            group_facet: Facet::Mode,
        }
    }
}

/// Compares groups for every (study label, phase, question) combination.
///
/// Rows are ordered by study label, then by the configured phase order,
/// then by question id. Records without a participant id are ignored.
///
/// # Examples
///
/// ```
/// use studylens_analysis::{
///     compare::{CompareOptions, compare_groups},
///     facets::{Mode, Phase},
///     long::{LongRecord, Source},
/// };
///
/// let record = |participant: &str, mode, score| LongRecord {
///     participant_id: Some(participant.into()),
///     mode,
///     study_label: "pilot".into(),
///     phase: Phase::Pre,
///     question_id: "q1".into(),
///     score,
///     source: Source::Answers,
///     item_id: None,
///     privacy_type: None,
/// };
/// let records = [
///     record("h1", Mode::Human, 1.0),
///     record("h2", Mode::Human, 2.0),
///     record("h3", Mode::Human, 3.0),
///     record("v1", Mode::Vlm, 4.0),
///     record("v2", Mode::Vlm, 5.0),
///     record("v3", Mode::Vlm, 6.0),
/// ];
///
/// let rows = compare_groups(&records, &CompareOptions::default());
/// # #[cfg(feature = "pvalue")]
/// # {
/// assert_eq!(rows.len(), 1);
/// assert_eq!(rows[0].groups[0].label, "human");
/// assert!(rows[0].kruskal.unwrap().p_value < 0.05);
/// assert!(rows[0].ttest.is_some());
/// # }
/// ```
#[must_use]
pub fn compare_groups(records: &[LongRecord], options: &CompareOptions) -> Vec<ComparisonRow> {
    if !cfg!(feature = "pvalue") {
        return Vec::new();
    }

    let study_labels = records
        .iter()
        .map(|r| r.study_label.as_str())
        .collect::<BTreeSet<_>>();

    let mut rows = Vec::new();
    for study_label in study_labels {
        for &phase in &options.phases {
            // question -> group -> participant -> scores
            let mut questions =
                BTreeMap::<&str, BTreeMap<String, BTreeMap<&str, Vec<f64>>>>::new();
            for record in records
                .iter()
                .filter(|r| r.study_label == study_label && r.phase == phase)
            {
                let Some(participant) = record.participant_id.as_deref() else {
                    continue;
                };
                questions
                    .entry(record.question_id.as_str())
                    .or_default()
                    .entry(options.group_facet.value(record))
                    .or_default()
                    .entry(participant)
                    .or_default()
                    .push(record.score);
            }

            for (question_id, groups) in questions {
                let groups = groups
                    .into_iter()
                    .map(|(label, participants)| {
                        let means = participants
                            .values()
                            .filter_map(|scores| descriptive::mean(scores))
                            .collect::<Vec<_>>();
                        (label, means)
                    })
                    .filter(|(_, means)| !means.is_empty())
                    .collect::<Vec<_>>();
                if groups.len() < 2 {
                    continue;
                }
                rows.push(compare_row(study_label, phase, question_id, &groups));
            }
        }
    }
    rows
}

fn compare_row(
    study_label: &str,
    phase: Phase,
    question_id: &str,
    groups: &[(String, Vec<f64>)],
) -> ComparisonRow {
    let stats = groups
        .iter()
        .filter_map(|(label, means)| {
            let stats = DescriptiveStats::new(means.iter().copied())?;
            Some(GroupStats {
                label: label.clone(),
                n: stats.count,
                mean: stats.mean,
                std: stats.std_dev_or_zero(),
            })
        })
        .collect();
    let (kruskal, ttest) = run_tests(groups);
    ComparisonRow {
        study_label: study_label.to_owned(),
        phase,
        question_id: question_id.to_owned(),
        groups: stats,
        kruskal,
        ttest,
    }
}

#[cfg(feature = "pvalue")]
fn run_tests(groups: &[(String, Vec<f64>)]) -> (Option<TestSummary>, Option<TestSummary>) {
    let summary = |res: hypothesis::TestResult| TestSummary {
        statistic: res.statistic,
        p_value: res.p_value,
    };
    let samples = groups.iter().map(|(_, v)| v.as_slice()).collect::<Vec<_>>();
    let kruskal = hypothesis::kruskal_wallis(&samples).map(summary);
    let ttest = match samples.as_slice() {
        [a, b] => hypothesis::welch_t_test(a, b).map(summary),
        _ => None,
    };
    (kruskal, ttest)
}

#[cfg(not(feature = "pvalue"))]
fn run_tests(_groups: &[(String, Vec<f64>)]) -> (Option<TestSummary>, Option<TestSummary>) {
    (None, None)
}

#[cfg(all(test, feature = "pvalue"))]
mod tests {
    use super::*;
    use crate::{facets::Mode, long::Source};

    fn record(participant: &str, mode: Mode, question_id: &str, score: f64) -> LongRecord {
        LongRecord {
            participant_id: Some(participant.into()),
            mode,
            study_label: "formal".into(),
            phase: Phase::Post,
            question_id: question_id.into(),
            score,
            source: Source::Answers,
            item_id: None,
            privacy_type: None,
        }
    }

    #[test]
    fn test_single_group_is_skipped() {
        let records = [
            record("h1", Mode::Human, "q1", 1.0),
            record("h2", Mode::Human, "q1", 2.0),
        ];
        assert!(compare_groups(&records, &CompareOptions::default()).is_empty());
    }

    #[test]
    fn test_repeated_observations_are_averaged() {
        let records = [
            record("h1", Mode::Human, "q1", 1.0),
            record("h1", Mode::Human, "q1", 3.0),
            record("v1", Mode::Vlm, "q1", -1.0),
        ];
        let rows = compare_groups(&records, &CompareOptions::default());
        assert_eq!(rows.len(), 1);
        let human = &rows[0].groups[0];
        assert_eq!((human.n, human.mean, human.std), (1, 2.0, 0.0));
        // n = 1 per group leaves the t-test undefined
        assert_eq!(rows[0].ttest, None);
        assert!(rows[0].kruskal.is_some());
    }

    #[test]
    fn test_three_groups_never_carry_ttest() {
        let options = CompareOptions {
            group_facet: Facet::Source,
            ..CompareOptions::default()
        };
        let mut records = Vec::new();
        for (offset, source) in [(0.0, Source::Answers), (1.0, Source::AiAnswers), (2.0, Source::Long)] {
            for score in [0.0, 1.0, 2.0] {
                let participant = format!("{source}-{score}");
                let mut r = record(&participant, Mode::Human, "q1", score + offset);
                r.source = source.clone();
                records.push(r);
            }
        }
        let rows = compare_groups(&records, &options);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].groups.len(), 3);
        assert!(rows[0].kruskal.is_some());
        assert_eq!(rows[0].ttest, None);
    }

    #[test]
    fn test_rows_follow_phase_order() {
        let mut records = vec![
            record("h1", Mode::Human, "q1", 1.0),
            record("v1", Mode::Vlm, "q1", 2.0),
        ];
        records.extend(records.clone().into_iter().map(|r| LongRecord {
            phase: Phase::Pre,
            ..r
        }));
        let rows = compare_groups(&records, &CompareOptions::default());
        let phases = rows.iter().map(|r| r.phase).collect::<Vec<_>>();
        assert_eq!(phases, vec![Phase::Pre, Phase::Post]);
    }

    #[test]
    fn test_missing_participant_is_ignored() {
        let mut anonymous = record("x", Mode::Vlm, "q1", 3.0);
        anonymous.participant_id = None;
        let records = [record("h1", Mode::Human, "q1", 1.0), anonymous];
        assert!(compare_groups(&records, &CompareOptions::default()).is_empty());
    }
}

#[cfg(all(test, not(feature = "pvalue")))]
mod degraded_tests {
    use super::*;
    use crate::{facets::Mode, long::Source};

    #[test]
    fn test_comparison_is_empty_without_significance_tests() {
        let records = [("h1", Mode::Human, 1.0), ("h2", Mode::Human, 2.0), ("v1", Mode::Vlm, 4.0), ("v2", Mode::Vlm, 5.0)]
            .map(|(participant, mode, score)| LongRecord {
                participant_id: Some(participant.into()),
                mode,
                study_label: "formal".into(),
                phase: Phase::Post,
                question_id: "q1".into(),
                score,
                source: Source::Answers,
                item_id: None,
                privacy_type: None,
            });
        assert!(compare_groups(&records, &CompareOptions::default()).is_empty());
    }
}
