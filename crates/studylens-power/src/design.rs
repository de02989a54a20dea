//! Sample-size formulas
//!
//! Normal approximations to the two-sample and paired t-tests:
//!
//! ```text
//! independent:  n_A = ((1 + r) / r) * (z_{1-α/2} + z_power)² / d²,   n_B = r * n_A
//! paired:       n   = ((z_{1-α/2} + z_power) / d_z)²
//! dropout:      n'  = ceil(n / (1 - rate))
//! ```
//!
//! `r` is the allocation ratio `n_B / n_A`. For one-sided tests `α` is not
//! halved. All sizes are rounded up.

use studylens_stats::normal;

use crate::PowerError;

/// Between- or within-subjects design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum StudyDesign {
    /// Two independent arms
    #[display("independent")]
    Independent,
    /// Each participant serves as their own control
    #[display("paired")]
    Paired,
}

/// Error rates of the planned test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerTarget {
    pub alpha: f64,
    pub power: f64,
    pub two_sided: bool,
}

impl Default for PowerTarget {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            power: 0.80,
            two_sided: true,
        }
    }
}

impl PowerTarget {
    fn validate(&self) -> Result<(), PowerError> {
        for (name, value) in [("alpha", self.alpha), ("power", self.power)] {
            if !(value > 0.0 && value < 1.0) {
                return Err(PowerError::ProbabilityOutOfRange { name, value });
            }
        }
        Ok(())
    }

    /// `z_{1-α/2} + z_power` (or `z_{1-α}` when one-sided).
    fn z_sum(&self) -> Result<f64, PowerError> {
        self.validate()?;
        let alpha_tail = if self.two_sided {
            self.alpha / 2.0
        } else {
            self.alpha
        };
        Ok(normal::inverse_cdf(1.0 - alpha_tail)? + normal::inverse_cdf(self.power)?)
    }
}

fn check_effect(effect: f64) -> Result<(), PowerError> {
    if effect > 0.0 && effect.is_finite() {
        Ok(())
    } else {
        Err(PowerError::NonPositiveEffect { effect })
    }
}

#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn ceil_count(n: f64) -> u64 {
    n.ceil() as u64
}

/// Per-arm sample sizes `(n_A, n_B)` for an independent two-group comparison.
///
/// # Examples
///
/// ```
/// use studylens_power::design::{PowerTarget, required_n_independent};
///
/// let (n_a, n_b) = required_n_independent(0.5, &PowerTarget::default(), 1.0).unwrap();
/// assert_eq!((n_a, n_b), (63, 63));
/// ```
pub fn required_n_independent(
    effect: f64,
    target: &PowerTarget,
    allocation_ratio: f64,
) -> Result<(u64, u64), PowerError> {
    check_effect(effect)?;
    if !(allocation_ratio > 0.0 && allocation_ratio.is_finite()) {
        return Err(PowerError::NonPositiveAllocationRatio {
            ratio: allocation_ratio,
        });
    }
    let z_sum = target.z_sum()?;
    let r = allocation_ratio;
    let n_a = ((1.0 + r) / r) * z_sum * z_sum / (effect * effect);
    let n_b = r * n_a;
    Ok((ceil_count(n_a), ceil_count(n_b)))
}

/// Number of pairs for a paired comparison with standardized effect `d_z`.
pub fn required_n_paired(effect: f64, target: &PowerTarget) -> Result<u64, PowerError> {
    check_effect(effect)?;
    let n = (target.z_sum()? / effect).powi(2);
    Ok(ceil_count(n))
}

/// Inflates `n` so that `n` remain after the expected dropout.
///
/// # Examples
///
/// ```
/// use studylens_power::design::apply_dropout;
///
/// assert_eq!(apply_dropout(63, 0.10).unwrap(), 70);
/// assert_eq!(apply_dropout(63, 0.0).unwrap(), 63);
/// assert!(apply_dropout(63, 1.0).is_err());
/// ```
#[expect(clippy::cast_precision_loss)]
pub fn apply_dropout(n: u64, rate: f64) -> Result<u64, PowerError> {
    if !(0.0..1.0).contains(&rate) {
        return Err(PowerError::DropoutOutOfRange { rate });
    }
    if rate == 0.0 {
        return Ok(n);
    }
    Ok(ceil_count(n as f64 / (1.0 - rate)))
}

/// Required sample size of a design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleSize {
    Independent { n_a: u64, n_b: u64 },
    Paired { n_pairs: u64 },
}

impl SampleSize {
    /// Computes the requirement for `design`; the sign of `effect` is ignored.
    pub fn required(
        design: StudyDesign,
        effect: f64,
        target: &PowerTarget,
        allocation_ratio: f64,
    ) -> Result<Self, PowerError> {
        let effect = effect.abs();
        match design {
            StudyDesign::Independent => {
                let (n_a, n_b) = required_n_independent(effect, target, allocation_ratio)?;
                Ok(Self::Independent { n_a, n_b })
            }
            StudyDesign::Paired => Ok(Self::Paired {
                n_pairs: required_n_paired(effect, target)?,
            }),
        }
    }

    /// Applies [`apply_dropout`] to every arm.
    pub fn with_dropout(self, rate: f64) -> Result<Self, PowerError> {
        Ok(match self {
            Self::Independent { n_a, n_b } => Self::Independent {
                n_a: apply_dropout(n_a, rate)?,
                n_b: apply_dropout(n_b, rate)?,
            },
            Self::Paired { n_pairs } => Self::Paired {
                n_pairs: apply_dropout(n_pairs, rate)?,
            },
        })
    }

    /// Participants needed overall.
    #[must_use]
    pub fn total(&self) -> u64 {
        match *self {
            Self::Independent { n_a, n_b } => n_a + n_b,
            Self::Paired { n_pairs } => n_pairs,
        }
    }

    /// Size of the larger arm; `None` for paired designs, which have no arms.
    #[must_use]
    pub fn largest_arm(&self) -> Option<u64> {
        match *self {
            Self::Independent { n_a, n_b } => Some(n_a.max(n_b)),
            Self::Paired { .. } => None,
        }
    }
}
