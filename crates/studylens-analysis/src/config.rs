//! Analysis run configuration
//!
//! Loaded from a JSON file; every field is optional and falls back to its
//! default.
//!
//! ```json
//! {
//!   "scale_min": -3,
//!   "scale_max": 3,
//!   "group_by": ["mode", "study_label", "phase"],
//!   "phases": ["pre", "in", "post"],
//!   "include_untyped": false,
//!   "group_facet": "mode"
//! }
//! ```

use serde::{Deserialize, Serialize};
use studylens_stats::histogram::IntegerScale;

use crate::{compare::CompareOptions, facets::Phase, summary::Facet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub scale_min: i32,
    pub scale_max: i32,
    /// Grouping facets of the Likert summary
    pub group_by: Vec<Facet>,
    /// Phases compared by the group comparison
    pub phases: Vec<Phase>,
    /// Keep annotation records without a privacy type in the type summary
    pub include_untyped: bool,
    /// Facet partitioning participants in the group comparison
    pub group_facet: Facet,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let compare = CompareOptions::default();
        Self {
            scale_min: IntegerScale::SEVEN_POINT.min,
            scale_max: IntegerScale::SEVEN_POINT.max,
            group_by: Facet::DEFAULT_GROUPING.to_vec(),
            phases: compare.phases,
            include_untyped: false,
            group_facet: compare.group_facet,
        }
    }
}

/// Widest response scale accepted, in points.
pub const MAX_SCALE_POINTS: usize = 101;

/// An analysis config value is unusable.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ConfigError {
    #[display("response scale {min}..={max} exceeds {MAX_SCALE_POINTS} points")]
    ScaleTooWide { min: i32, max: i32 },
}

impl AnalysisConfig {
    /// The response scale; bounds may be given in either order.
    pub fn scale(&self) -> Result<IntegerScale, ConfigError> {
        let scale = IntegerScale::new(self.scale_min, self.scale_max);
        if scale.len() > MAX_SCALE_POINTS {
            return Err(ConfigError::ScaleTooWide {
                min: scale.min,
                max: scale.max,
            });
        }
        Ok(scale)
    }

    #[must_use]
    pub fn compare_options(&self) -> CompareOptions {
        CompareOptions {
            phases: self.phases.clone(),
            group_facet: self.group_facet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"scale_min": 1, "scale_max": 5, "phases": ["post"]}"#)
                .unwrap();
        assert_eq!(config.scale(), Ok(IntegerScale::new(1, 5)));
        assert_eq!(config.phases, vec![Phase::Post]);
        assert_eq!(config.group_by, Facet::DEFAULT_GROUPING.to_vec());
        assert_eq!(config.compare_options().group_facet, Facet::Mode);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<AnalysisConfig>(r#"{"scale": 7}"#).is_err());
    }

    #[test]
    fn test_reversed_scale_is_normalized() {
        let config = AnalysisConfig {
            scale_min: 3,
            scale_max: -3,
            ..AnalysisConfig::default()
        };
        assert_eq!(config.scale(), Ok(IntegerScale::SEVEN_POINT));
    }

    #[test]
    fn test_oversized_scale_is_rejected() {
        let config = AnalysisConfig {
            scale_min: -2_000_000_000,
            scale_max: 2_000_000_000,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            config.scale(),
            Err(ConfigError::ScaleTooWide { .. })
        ));
        let widest = AnalysisConfig {
            scale_min: 0,
            scale_max: 100,
            ..AnalysisConfig::default()
        };
        assert_eq!(widest.scale().map(|s| s.len()), Ok(MAX_SCALE_POINTS));
    }
}
