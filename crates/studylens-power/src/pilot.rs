//! Effect-size estimation from pilot data
//!
//! A pilot table has one row per participant with a group label and a
//! numeric outcome. Rows outside the two configured groups, and rows whose
//! outcome is blank or non-numeric, are ignored.

use std::io;

use studylens_stats::descriptive::DescriptiveStats;
use tracing::debug;

use crate::PowerError;

/// Column names and group labels of a pilot table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PilotColumns {
    pub group_col: String,
    pub value_col: String,
    pub group_a: String,
    pub group_b: String,
}

impl Default for PilotColumns {
    fn default() -> Self {
        Self {
            group_col: "mode".to_owned(),
            value_col: "outcome".to_owned(),
            group_a: "human".to_owned(),
            group_b: "vlm".to_owned(),
        }
    }
}

/// Group statistics and standardized effect sizes of a pilot.
#[derive(Debug, Clone, PartialEq)]
pub struct PilotSummary {
    pub group_a: String,
    pub group_b: String,
    pub n_a: usize,
    pub n_b: usize,
    pub mean_a: f64,
    pub mean_b: f64,
    pub sd_a: f64,
    pub sd_b: f64,
    pub pooled_sd: f64,
    /// `(mean_b - mean_a) / pooled_sd`
    pub cohens_d: f64,
    /// Cohen's d with small-sample bias correction
    pub hedges_g: f64,
}

impl PilotSummary {
    /// Summarizes two groups of observations.
    ///
    /// # Examples
    ///
    /// ```
    /// use studylens_power::pilot::PilotSummary;
    ///
    /// let summary = PilotSummary::from_groups("A", &[1.0, 2.0, 3.0], "B", &[2.0, 3.0, 4.0]).unwrap();
    /// assert_eq!(summary.cohens_d, 1.0);
    /// assert!(summary.hedges_g.abs() < summary.cohens_d.abs());
    /// ```
    #[expect(clippy::cast_precision_loss)]
    pub fn from_groups(
        group_a: &str,
        a: &[f64],
        group_b: &str,
        b: &[f64],
    ) -> Result<Self, PowerError> {
        let insufficient = || PowerError::InsufficientObservations {
            group_a: group_a.to_owned(),
            n_a: a.len(),
            group_b: group_b.to_owned(),
            n_b: b.len(),
        };
        let stats_a = DescriptiveStats::new(a.iter().copied()).ok_or_else(insufficient)?;
        let stats_b = DescriptiveStats::new(b.iter().copied()).ok_or_else(insufficient)?;
        let (Some(sd_a), Some(sd_b)) = (stats_a.std_dev, stats_b.std_dev) else {
            return Err(insufficient());
        };

        let (n_a, n_b) = (a.len(), b.len());
        let df = n_a + n_b - 2;
        let pooled_sd = (((n_a - 1) as f64 * sd_a * sd_a + (n_b - 1) as f64 * sd_b * sd_b)
            / df as f64)
            .sqrt();
        if pooled_sd == 0.0 {
            return Err(PowerError::ZeroPooledSd);
        }

        let cohens_d = (stats_b.mean - stats_a.mean) / pooled_sd;
        let j = if df > 1 {
            1.0 - 3.0 / (4.0 * df as f64 - 1.0)
        } else {
            1.0
        };

        Ok(Self {
            group_a: group_a.to_owned(),
            group_b: group_b.to_owned(),
            n_a,
            n_b,
            mean_a: stats_a.mean,
            mean_b: stats_b.mean,
            sd_a,
            sd_b,
            pooled_sd,
            cohens_d,
            hedges_g: j * cohens_d,
        })
    }

    /// Reads a pilot CSV and summarizes its two groups.
    ///
    /// Group labels match case-insensitively after trimming.
    pub fn from_csv<R>(reader: R, columns: &PilotColumns) -> Result<Self, PowerError>
    where
        R: io::Read,
    {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = reader.headers()?.clone();
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(PowerError::EmptyPilotHeader);
        }
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
                .ok_or_else(|| PowerError::MissingPilotColumn {
                    column: name.to_owned(),
                })
        };
        let group_idx = find(&columns.group_col)?;
        let value_idx = find(&columns.value_col)?;

        let label_a = columns.group_a.to_lowercase();
        let label_b = columns.group_b.to_lowercase();
        let (mut a, mut b) = (Vec::new(), Vec::new());
        let mut skipped = 0;
        for record in reader.records() {
            let record = record?;
            let group = record.get(group_idx).unwrap_or_default().trim().to_lowercase();
            let target = if group == label_a {
                &mut a
            } else if group == label_b {
                &mut b
            } else {
                continue;
            };
            match record.get(value_idx).map(str::trim).map(str::parse::<f64>) {
                Some(Ok(value)) if value.is_finite() => target.push(value),
                _ => skipped += 1,
            }
        }
        debug!(n_a = a.len(), n_b = b.len(), skipped, "read pilot outcomes");

        Self::from_groups(&columns.group_a, &a, &columns.group_b, &b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hedges_correction() {
        let summary =
            PilotSummary::from_groups("A", &[1.0, 2.0, 3.0], "B", &[2.0, 3.0, 4.0]).unwrap();
        assert_eq!(summary.pooled_sd, 1.0);
        assert_eq!(summary.cohens_d, 1.0);
        // df = 4, J = 1 - 3/15
        assert!((summary.hedges_g - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_negative_effect_keeps_sign() {
        let summary =
            PilotSummary::from_groups("A", &[2.0, 3.0, 4.0], "B", &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(summary.cohens_d, -1.0);
        assert!(summary.hedges_g > summary.cohens_d);
    }

    #[test]
    fn test_from_csv_filters_groups_and_values() {
        let csv = "\u{feff}mode,outcome\nHuman,1\nhuman, 2\nhuman,3\nvlm,2\nVLM,3\nvlm,4\nvlm,\nvlm,n/a\ncontrol,9\n";
        let summary = PilotSummary::from_csv(csv.as_bytes(), &PilotColumns::default()).unwrap();
        assert_eq!((summary.n_a, summary.n_b), (3, 3));
        assert_eq!(summary.group_a, "human");
        assert_eq!(summary.cohens_d, 1.0);
    }

    #[test]
    fn test_insufficient_observations() {
        let csv = "mode,outcome\nhuman,1\nhuman,2\nvlm,3\n";
        let err = PilotSummary::from_csv(csv.as_bytes(), &PilotColumns::default()).unwrap_err();
        assert!(matches!(
            err,
            PowerError::InsufficientObservations { n_a: 2, n_b: 1, .. }
        ));
        assert!(err.to_string().contains("human=2, vlm=1"));
    }

    #[test]
    fn test_zero_variance() {
        let err = PilotSummary::from_groups("A", &[1.0, 1.0], "B", &[1.0, 1.0]).unwrap_err();
        assert!(matches!(err, PowerError::ZeroPooledSd));
    }

    #[test]
    fn test_header_errors() {
        let err = PilotSummary::from_csv("".as_bytes(), &PilotColumns::default()).unwrap_err();
        assert!(matches!(err, PowerError::EmptyPilotHeader));

        let err =
            PilotSummary::from_csv("group,outcome\n".as_bytes(), &PilotColumns::default())
                .unwrap_err();
        assert!(matches!(err, PowerError::MissingPilotColumn { column } if column == "mode"));
    }
}
