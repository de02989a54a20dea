//! Two- and k-sample significance tests.
//!
//! Both tests report a statistic and a two-sided p-value, matching the
//! conventions of common statistics packages:
//!
//! - [`kruskal_wallis`]: rank-based k-group test with tie correction,
//!   p-value from the chi-squared distribution with `k - 1` degrees of freedom.
//! - [`welch_t_test`]: unequal-variance two-sample t-test with
//!   Welch–Satterthwaite degrees of freedom.

use statrs::distribution::{ChiSquared, ContinuousCDF, StudentsT};

use crate::descriptive::DescriptiveStats;

/// Statistic and two-sided p-value of a significance test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestResult {
    pub statistic: f64,
    pub p_value: f64,
}

/// Kruskal–Wallis H test over two or more groups.
///
/// Returns `None` when fewer than two groups are non-empty or when every
/// observation is identical (the tie correction is zero and the statistic is
/// undefined).
///
/// # Examples
///
/// ```
/// # use studylens_stats::hypothesis::kruskal_wallis;
/// let res = kruskal_wallis(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]]).unwrap();
/// assert!((res.statistic - 3.857_142_857).abs() < 1e-8);
/// assert!((res.p_value - 0.049_534_613).abs() < 1e-6);
/// ```
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn kruskal_wallis(groups: &[&[f64]]) -> Option<TestResult> {
    let groups = groups
        .iter()
        .filter(|g| !g.is_empty())
        .copied()
        .collect::<Vec<_>>();
    if groups.len() < 2 {
        return None;
    }

    let mut pooled = groups
        .iter()
        .enumerate()
        .flat_map(|(gi, g)| g.iter().map(move |&v| (v, gi)))
        .collect::<Vec<_>>();
    pooled.sort_by(|a, b| a.0.total_cmp(&b.0));

    let total = pooled.len();
    let n = total as f64;
    let mut rank_sums = vec![0.0; groups.len()];
    let mut tie_sum = 0.0;

    let mut start = 0;
    while start < total {
        let mut end = start + 1;
        while end < total && pooled[end].0 == pooled[start].0 {
            end += 1;
        }
        // Ranks are 1-based; tied runs share the average rank.
        let avg_rank = (start + end + 1) as f64 / 2.0;
        for &(_, gi) in &pooled[start..end] {
            rank_sums[gi] += avg_rank;
        }
        let t = (end - start) as f64;
        tie_sum += t * t * t - t;
        start = end;
    }

    let h_raw = 12.0 / (n * (n + 1.0))
        * groups
            .iter()
            .zip(&rank_sums)
            .map(|(g, r)| r * r / g.len() as f64)
            .sum::<f64>()
        - 3.0 * (n + 1.0);
    let correction = 1.0 - tie_sum / (n * n * n - n);
    if correction <= 0.0 {
        return None;
    }
    let statistic = h_raw / correction;

    let df = (groups.len() - 1) as f64;
    let chi2 = ChiSquared::new(df).ok()?;
    let p_value = chi2.sf(statistic).clamp(0.0, 1.0);
    Some(TestResult { statistic, p_value })
}

/// Welch's unequal-variance two-sample t-test (`a` minus `b`).
///
/// Returns `None` unless both samples have at least two observations and
/// at least one of them has non-zero variance.
///
/// # Examples
///
/// ```
/// # use studylens_stats::hypothesis::welch_t_test;
/// let res = welch_t_test(&[1.0, 2.0, 3.0, 4.0], &[3.0, 4.0, 5.0, 6.0, 7.0]).unwrap();
/// assert!(res.statistic < 0.0);
/// assert!(res.p_value > 0.0 && res.p_value < 1.0);
/// ```
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn welch_t_test(a: &[f64], b: &[f64]) -> Option<TestResult> {
    let sa = DescriptiveStats::new(a.iter().copied())?;
    let sb = DescriptiveStats::new(b.iter().copied())?;
    let (va, vb) = (sa.variance?, sb.variance?);
    let (na, nb) = (sa.count as f64, sb.count as f64);

    let se2 = va / na + vb / nb;
    if se2 <= 0.0 {
        return None;
    }
    let statistic = (sa.mean - sb.mean) / se2.sqrt();

    // Welch–Satterthwaite approximation
    let den = (va / na).powi(2) / (na - 1.0) + (vb / nb).powi(2) / (nb - 1.0);
    let df = se2.powi(2) / den;
    let t_dist = StudentsT::new(0.0, 1.0, df).ok()?;
    let p_value = (2.0 * t_dist.sf(statistic.abs())).clamp(0.0, 1.0);
    Some(TestResult { statistic, p_value })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() < tol,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_kruskal_with_ties() {
        // Reference: scipy.stats.kruskal([1, 2, 2], [2, 3, 4])
        let res = kruskal_wallis(&[&[1.0, 2.0, 2.0], &[2.0, 3.0, 4.0]]).unwrap();
        assert_close(res.statistic, 2.634_408_602, 1e-8);
        // chi-squared survival with one degree of freedom
        let expected_p = statrs::function::erf::erfc((res.statistic / 2.0).sqrt());
        assert_close(res.p_value, expected_p, 1e-9);
        assert!(res.p_value > 0.1 && res.p_value < 0.11);
    }

    #[test]
    fn test_kruskal_three_groups() {
        let res = kruskal_wallis(&[&[1.0, 2.0], &[3.0, 4.0], &[5.0, 6.0]]).unwrap();
        assert_close(res.statistic, 4.571_428_571, 1e-8);
        assert_close(res.p_value, (-4.571_428_571_f64 / 2.0).exp(), 1e-8);
    }

    #[test]
    fn test_kruskal_degenerate_inputs() {
        assert!(kruskal_wallis(&[&[1.0, 2.0]]).is_none());
        assert!(kruskal_wallis(&[&[1.0, 2.0], &[]]).is_none());
        assert!(kruskal_wallis(&[&[2.0, 2.0], &[2.0]]).is_none());
    }

    #[test]
    fn test_welch_equal_means() {
        let res = welch_t_test(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_close(res.statistic, 0.0, 1e-12);
        assert_close(res.p_value, 1.0, 1e-12);
    }

    #[test]
    fn test_welch_reference_value() {
        // Reference: scipy.stats.ttest_ind([1, 2, 3], [2, 3, 4], equal_var=False)
        let res = welch_t_test(&[1.0, 2.0, 3.0], &[2.0, 3.0, 4.0]).unwrap();
        assert_close(res.statistic, -1.224_744_871, 1e-8);
        assert_close(res.p_value, 0.287_864_135, 1e-6);
    }

    #[test]
    fn test_welch_degenerate_inputs() {
        assert!(welch_t_test(&[1.0], &[2.0, 3.0]).is_none());
        assert!(welch_t_test(&[1.0, 1.0], &[2.0, 2.0]).is_none());
    }
}
