use std::ops::RangeInclusive;

/// A closed integer response scale, such as the seven-point `-3..=3` Likert range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegerScale {
    /// Lowest response point (inclusive).
    pub min: i32,
    /// Highest response point (inclusive).
    pub max: i32,
}

impl Default for IntegerScale {
    fn default() -> Self {
        Self::SEVEN_POINT
    }
}

impl IntegerScale {
    /// The symmetric seven-point scale `-3..=3`.
    pub const SEVEN_POINT: Self = Self { min: -3, max: 3 };

    /// Creates a scale, swapping the bounds when given in reverse order.
    #[must_use]
    pub fn new(min: i32, max: i32) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Whether a score lies within the scale bounds (inclusive).
    ///
    /// ```
    /// # use studylens_stats::histogram::IntegerScale;
    /// let scale = IntegerScale::SEVEN_POINT;
    /// assert!(scale.contains(-3.0));
    /// assert!(scale.contains(2.5));
    /// assert!(!scale.contains(4.0));
    /// assert!(!scale.contains(f64::NAN));
    /// ```
    #[must_use]
    pub fn contains(&self, score: f64) -> bool {
        score >= f64::from(self.min) && score <= f64::from(self.max)
    }

    /// Iterates the integer response points from low to high.
    #[must_use]
    pub fn points(&self) -> RangeInclusive<i32> {
        self.min..=self.max
    }

    /// Number of integer response points on the scale.
    #[expect(clippy::cast_sign_loss)]
    #[must_use]
    pub fn len(&self) -> usize {
        (i64::from(self.max) - i64::from(self.min) + 1) as usize
    }

    /// Always `false`; a scale has at least one point.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Nearest response point for an in-range score.
    ///
    /// Fractional scores (e.g. per-participant means fed back into a
    /// summary) are rounded half away from zero.
    #[expect(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn nearest_point(&self, score: f64) -> Option<i32> {
        if !self.contains(score) {
            return None;
        }
        Some((score.round() as i32).clamp(self.min, self.max))
    }
}

/// Zero-filled frequency counts over every point of an [`IntegerScale`].
///
/// Unlike a range-binned histogram, bins here are exactly the integer
/// response points, so the counts always sum to the number of in-range
/// values that were added.
///
/// # Examples
///
/// ```
/// # use studylens_stats::histogram::{IntegerScale, ScaleHistogram};
/// let hist = ScaleHistogram::new(IntegerScale::SEVEN_POINT, [-3.0, 0.0, 0.0, 3.0, 9.0]);
/// assert_eq!(hist.count(0), 2);
/// assert_eq!(hist.count(1), 0);
/// assert_eq!(hist.total(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleHistogram {
    scale: IntegerScale,
    counts: Vec<u64>,
}

impl ScaleHistogram {
    /// Builds a histogram, ignoring values outside the scale.
    #[must_use]
    pub fn new<I>(scale: IntegerScale, values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut hist = Self::empty(scale);
        for value in values {
            hist.add(value);
        }
        hist
    }

    /// Creates a histogram with every count set to zero.
    #[must_use]
    pub fn empty(scale: IntegerScale) -> Self {
        Self {
            scale,
            counts: vec![0; scale.len()],
        }
    }

    /// Adds one observation; returns `false` if it was outside the scale.
    #[expect(clippy::cast_sign_loss)]
    pub fn add(&mut self, value: f64) -> bool {
        let Some(point) = self.scale.nearest_point(value) else {
            return false;
        };
        let idx = (i64::from(point) - i64::from(self.scale.min)) as usize;
        self.counts[idx] += 1;
        true
    }

    /// Count at a response point; zero for points off the scale.
    #[expect(clippy::cast_sign_loss)]
    #[must_use]
    pub fn count(&self, point: i32) -> u64 {
        if point < self.scale.min || point > self.scale.max {
            return 0;
        }
        self.counts[(i64::from(point) - i64::from(self.scale.min)) as usize]
    }

    /// `(point, count)` pairs from the lowest point to the highest.
    pub fn iter(&self) -> impl Iterator<Item = (i32, u64)> + '_ {
        self.scale.points().zip(self.counts.iter().copied())
    }

    /// Sum of all counts.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    #[must_use]
    pub fn scale(&self) -> IntegerScale {
        self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reversed_bounds_are_normalized() {
        let scale = IntegerScale::new(21, 1);
        assert_eq!(scale, IntegerScale { min: 1, max: 21 });
        assert_eq!(scale.len(), 21);
    }

    #[test]
    fn test_counts_are_zero_filled() {
        let hist = ScaleHistogram::new(IntegerScale::SEVEN_POINT, [1.0, 1.0]);
        let pairs = hist.iter().collect::<Vec<_>>();
        assert_eq!(pairs.len(), 7);
        assert_eq!(pairs[0], (-3, 0));
        assert_eq!(pairs[4], (1, 2));
        assert_eq!(hist.total(), 2);
    }

    #[test]
    fn test_fractional_scores_round_to_nearest_point() {
        let hist = ScaleHistogram::new(IntegerScale::SEVEN_POINT, [0.4, 0.5, -2.5, 2.9]);
        assert_eq!(hist.count(0), 1);
        assert_eq!(hist.count(1), 1);
        assert_eq!(hist.count(-3), 1);
        assert_eq!(hist.count(3), 1);
        assert_eq!(hist.total(), 4);
    }

    #[test]
    fn test_out_of_range_values_are_ignored() {
        let mut hist = ScaleHistogram::empty(IntegerScale::SEVEN_POINT);
        assert!(!hist.add(12.0));
        assert!(!hist.add(-3.5));
        assert!(hist.add(-3.0));
        assert_eq!(hist.total(), 1);
        assert_eq!(hist.count(99), 0);
    }
}
