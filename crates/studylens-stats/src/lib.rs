//! Numeric building blocks for study-data analysis.
//!
//! This crate provides the closed-form statistics shared by the analysis
//! pipeline and the power-analysis planner:
//!
//! - **Descriptive statistics**: count, mean, and sample standard deviation
//! - **Scale histograms**: zero-filled frequency counts over an integer response scale
//! - **Normal distribution**: inverse CDF (quantile) of the standard normal
//! - **Significance tests**: Kruskal–Wallis H and Welch's t-test (feature `pvalue`)
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing samples
//! - [`histogram`]: Integer response scales and their histograms
//! - [`normal`]: Standard normal distribution helpers
//! - [`hypothesis`]: Two- and k-sample significance tests (requires `pvalue`)
//!
//! # Examples
//!
//! ## Summarizing a sample
//!
//! ```
//! use studylens_stats::descriptive::DescriptiveStats;
//!
//! let stats = DescriptiveStats::new([1.0, 2.0, 3.0]).unwrap();
//! assert_eq!(stats.mean, 2.0);
//! assert_eq!(stats.std_dev, Some(1.0));
//! ```
//!
//! ## Counting Likert responses
//!
//! ```
//! use studylens_stats::histogram::{IntegerScale, ScaleHistogram};
//!
//! let hist = ScaleHistogram::new(IntegerScale::SEVEN_POINT, [-1.0, 2.0, 2.0]);
//! assert_eq!(hist.count(2), 2);
//! ```
//!
//! ## Normal quantiles
//!
//! ```
//! use studylens_stats::normal;
//!
//! let z = normal::inverse_cdf(0.8).unwrap();
//! assert!((z - 0.8416).abs() < 1e-4);
//! ```

pub mod descriptive;
pub mod histogram;
#[cfg(feature = "pvalue")]
pub mod hypothesis;
pub mod normal;
