/// Descriptive statistics summarizing a sample.
///
/// Dispersion uses the sample (Bessel-corrected, `n - 1`) variance, so the
/// standard deviation is undefined for a single observation.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptiveStats {
    /// The number of observations.
    pub count: usize,
    /// The minimum value in the sample.
    pub min: f64,
    /// The maximum value in the sample.
    pub max: f64,
    /// The arithmetic mean of the sample.
    pub mean: f64,
    /// The sample variance, or `None` when `count < 2`.
    pub variance: Option<f64>,
    /// The sample standard deviation, or `None` when `count < 2`.
    pub std_dev: Option<f64>,
}

impl DescriptiveStats {
    /// Computes descriptive statistics from values in any order.
    ///
    /// # Returns
    ///
    /// * `Some(DescriptiveStats)` - if the sample contains at least one value
    /// * `None` - if the sample is empty
    ///
    /// # Examples
    ///
    /// ```
    /// # use studylens_stats::descriptive::DescriptiveStats;
    /// let stats = DescriptiveStats::new([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
    /// assert_eq!(stats.count, 8);
    /// assert_eq!(stats.mean, 5.0);
    /// assert!((stats.std_dev.unwrap() - 2.138_089_935).abs() < 1e-9);
    ///
    /// let single = DescriptiveStats::new([3.0]).unwrap();
    /// assert_eq!(single.std_dev, None);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let values = values.into_iter().collect::<Vec<_>>();
        let count = values.len();
        if count == 0 {
            return None;
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let n = count as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = (count > 1).then(|| {
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)
        });
        let std_dev = variance.map(f64::sqrt);

        Some(Self {
            count,
            min,
            max,
            mean,
            variance,
            std_dev,
        })
    }

    /// Sample standard deviation with a single observation reported as zero.
    ///
    /// Group comparison tables use this so downstream consumers never see an
    /// undefined dispersion.
    #[must_use]
    pub fn std_dev_or_zero(&self) -> f64 {
        self.std_dev.unwrap_or(0.0)
    }
}

/// Arithmetic mean of a slice, or `None` when empty.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sample() {
        assert!(DescriptiveStats::new(Vec::<f64>::new()).is_none());
        assert!(mean(&[]).is_none());
    }

    #[test]
    fn test_sample_variance_uses_bessel_correction() {
        let stats = DescriptiveStats::new([1.0, 2.0, 3.0]).unwrap();
        assert_eq!(stats.variance, Some(1.0));
        assert_eq!(stats.std_dev, Some(1.0));
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 3.0);
    }

    #[test]
    fn test_single_value_has_zero_fallback() {
        let stats = DescriptiveStats::new([-2.0]).unwrap();
        assert_eq!(stats.std_dev, None);
        assert_eq!(stats.std_dev_or_zero(), 0.0);
    }
}
