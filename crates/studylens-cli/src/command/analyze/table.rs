//! Tables with data-dependent columns
//!
//! Summary tables carry one column per grouping facet and per scale point,
//! and comparison tables one column triple per group, so their headers are
//! built from the data rather than derived from a struct.

use std::collections::BTreeSet;

use studylens_analysis::{compare::ComparisonRow, summary::{Facet, SummaryRow}};
use studylens_stats::histogram::IntegerScale;

use crate::util::float_cell;

/// Header and rows of a summary table.
pub(super) fn summary_table(
    facets: &[Facet],
    scale: IntegerScale,
    rows: &[SummaryRow],
) -> (Vec<String>, Vec<Vec<String>>) {
    let mut header = facets.iter().map(ToString::to_string).collect::<Vec<_>>();
    header.extend(["question_id", "n", "mean", "std"].map(str::to_owned));
    header.extend(scale.points().map(|k| format!("count_{k}")));

    let records = rows
        .iter()
        .map(|row| {
            let mut record = row.group.clone();
            record.push(row.question_id.clone());
            record.push(row.n.to_string());
            record.push(row.mean.to_string());
            record.push(float_cell(row.std));
            record.extend(row.histogram.iter().map(|(_, count)| count.to_string()));
            record
        })
        .collect();
    (header, records)
}

/// Header and rows of a comparison table.
///
/// Groups absent from a row leave their columns empty.
pub(super) fn comparison_table(rows: &[ComparisonRow]) -> (Vec<String>, Vec<Vec<String>>) {
    let labels = rows
        .iter()
        .flat_map(|row| row.groups.iter().map(|g| g.label.as_str()))
        .collect::<BTreeSet<_>>();

    let mut header = ["study_label", "phase", "question_id"].map(str::to_owned).to_vec();
    for label in &labels {
        header.extend(["n", "mean", "std"].map(|stat| format!("{stat}_{label}")));
    }
    header.extend(["kruskal_H", "kruskal_p", "ttest_t", "ttest_p"].map(str::to_owned));

    let records = rows
        .iter()
        .map(|row| {
            let mut record = vec![
                row.study_label.clone(),
                row.phase.to_string(),
                row.question_id.clone(),
            ];
            for label in &labels {
                match row.groups.iter().find(|g| g.label == *label) {
                    Some(group) => record.extend([
                        group.n.to_string(),
                        group.mean.to_string(),
                        group.std.to_string(),
                    ]),
                    None => record.extend(std::iter::repeat_n(String::new(), 3)),
                }
            }
            for test in [row.kruskal, row.ttest] {
                record.push(float_cell(test.map(|t| t.statistic)));
                record.push(float_cell(test.map(|t| t.p_value)));
            }
            record
        })
        .collect();
    (header, records)
}

#[cfg(test)]
mod tests {
    use studylens_analysis::{
        compare::{GroupStats, TestSummary},
        facets::Phase,
    };
    use studylens_stats::histogram::ScaleHistogram;

    use super::*;

    #[test]
    fn test_summary_columns() {
        let scale = IntegerScale::new(1, 3);
        let row = SummaryRow {
            group: vec!["human".into()],
            question_id: "q1".into(),
            n: 1,
            mean: 2.0,
            std: None,
            histogram: ScaleHistogram::new(scale, [2.0]),
        };
        let (header, records) = summary_table(&[Facet::Mode], scale, &[row]);
        assert_eq!(
            header,
            vec!["mode", "question_id", "n", "mean", "std", "count_1", "count_2", "count_3"]
        );
        assert_eq!(records[0], vec!["human", "q1", "1", "2", "", "0", "1", "0"]);
    }

    #[test]
    fn test_comparison_columns_align_groups() {
        let group = |label: &str| GroupStats {
            label: label.into(),
            n: 2,
            mean: 1.5,
            std: 0.5,
        };
        let row = |groups, ttest| ComparisonRow {
            study_label: "pilot".into(),
            phase: Phase::Post,
            question_id: "q1".into(),
            groups,
            kruskal: Some(TestSummary {
                statistic: 1.0,
                p_value: 0.5,
            }),
            ttest,
        };
        let rows = [
            row(vec![group("human"), group("vlm")], None),
            row(vec![group("human"), group("other")], None),
        ];
        let (header, records) = comparison_table(&rows);
        assert_eq!(header.len(), 3 + 9 + 4);
        assert_eq!(header[3], "n_human");
        assert_eq!(header[6], "n_other");
        // row 0 has no "other" group
        assert_eq!(records[0][6], "");
        assert_eq!(records[0][12], "1");
        assert_eq!(records[0][14], "");
    }
}
