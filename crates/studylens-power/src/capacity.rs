//! Conversion of sample sizes into per-story assignment capacity
//!
//! Participants are assigned to one story and one condition. The assignment
//! store limits each (story, condition) pair with a capacity row, so the
//! required per-condition sample size is spread over the stories and rounded
//! up.

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{PowerError, design::SampleSize};

/// Partition key of capacity rows in the assignment store.
pub const CAPACITY_PARTITION_KEY: &str = "soups26_vlm_assignment_story";
/// Item type of capacity rows.
pub const CAPACITY_ITEM_TYPE: &str = "story_capacity";
/// Conditions a story is offered in.
pub const CONDITIONS: [&str; 2] = ["human", "vlm"];

/// Per-story, per-condition capacity covering `n_per_condition`.
///
/// # Examples
///
/// ```
/// use studylens_power::capacity::{implied_total, per_unit_capacity};
///
/// let per_unit = per_unit_capacity(63, 2).unwrap();
/// assert_eq!(per_unit, 32);
/// assert_eq!(implied_total(per_unit, 2), 128);
/// ```
pub fn per_unit_capacity(n_per_condition: u64, unit_count: usize) -> Result<u64, PowerError> {
    if unit_count == 0 {
        return Err(PowerError::NonPositiveUnitCount);
    }
    Ok(n_per_condition.div_ceil(unit_count as u64))
}

/// Total capacity over all stories and both conditions.
#[must_use]
pub fn implied_total(per_unit: u64, unit_count: usize) -> u64 {
    per_unit * unit_count as u64 * CONDITIONS.len() as u64
}

/// Default story ids `story_01..story_NN`.
#[must_use]
pub fn default_unit_ids(unit_count: usize) -> Vec<String> {
    (1..=unit_count).map(|i| format!("story_{i:02}")).collect()
}

/// Reads story ids from a study config `{"stories": [{"storyId": ...}, ...]}`.
///
/// Entries without a non-blank string id are ignored; a config with no
/// usable entry is an error.
pub fn load_unit_ids<R>(reader: R) -> Result<Vec<String>, PowerError>
where
    R: io::Read,
{
    #[derive(Deserialize)]
    struct StudyConfig {
        #[serde(default)]
        stories: Option<Vec<Value>>,
    }

    let config: StudyConfig = serde_json::from_reader(reader)?;
    let ids = config
        .stories
        .unwrap_or_default()
        .iter()
        .filter_map(|story| story.get("storyId")?.as_str())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
        .collect::<Vec<_>>();
    if ids.is_empty() {
        return Err(PowerError::NoUnits);
    }
    Ok(ids)
}

/// Per-story capacity of an independent-design sample size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityPlan {
    pub unit_count: usize,
    /// Capacity of each (story, condition) pair
    pub per_unit: u64,
    pub implied_total: u64,
}

impl CapacityPlan {
    /// Spreads the larger arm of `size` over `unit_count` stories.
    ///
    /// Paired designs have no per-condition arms and yield `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use studylens_power::{capacity::CapacityPlan, design::SampleSize};
    ///
    /// let size = SampleSize::Independent { n_a: 63, n_b: 63 };
    /// let plan = CapacityPlan::for_sample_size(&size, 2).unwrap().unwrap();
    /// assert_eq!((plan.per_unit, plan.implied_total), (32, 128));
    /// ```
    pub fn for_sample_size(size: &SampleSize, unit_count: usize) -> Result<Option<Self>, PowerError> {
        let Some(largest_arm) = size.largest_arm() else {
            return Ok(None);
        };
        let per_unit = per_unit_capacity(largest_arm, unit_count)?;
        Ok(Some(Self {
            unit_count,
            per_unit,
            implied_total: implied_total(per_unit, unit_count),
        }))
    }
}

/// Story count from an explicit count, else from the study config's ids.
#[must_use]
pub fn resolve_unit_count(explicit: Option<usize>, config_ids: Option<&[String]>) -> Option<usize> {
    explicit.or(config_ids.map(<[String]>::len))
}

/// Story ids for capacity rows.
///
/// Config ids are used only when they match `unit_count`; otherwise the
/// default `story_01..story_NN` ids are generated.
#[must_use]
pub fn select_unit_ids(config_ids: Option<Vec<String>>, unit_count: usize) -> Vec<String> {
    match config_ids {
        Some(ids) if ids.len() == unit_count => ids,
        _ => default_unit_ids(unit_count),
    }
}

/// One capacity row in the assignment store's export layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapacityRow {
    pub pk: String,
    pub sk: String,
    pub analysis_filename: String,
    pub assigned_count: u64,
    pub item_type: String,
    pub max_assignments: u64,
    pub mode: String,
    pub story_id: String,
    pub study: String,
}

/// One row per (story, condition), stories in the given order.
#[must_use]
pub fn capacity_rows(study_label: &str, story_ids: &[String], per_unit: u64) -> Vec<CapacityRow> {
    story_ids
        .iter()
        .flat_map(|story_id| {
            CONDITIONS.iter().map(move |mode| CapacityRow {
                pk: CAPACITY_PARTITION_KEY.to_owned(),
                sk: format!("{study_label}#{story_id}#{mode}"),
                analysis_filename: format!("{story_id}.json"),
                assigned_count: 0,
                item_type: CAPACITY_ITEM_TYPE.to_owned(),
                max_assignments: per_unit,
                mode: (*mode).to_owned(),
                story_id: story_id.clone(),
                study: study_label.to_owned(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_rounds_up() {
        assert_eq!(per_unit_capacity(63, 2).unwrap(), 32);
        assert_eq!(per_unit_capacity(64, 2).unwrap(), 32);
        assert_eq!(per_unit_capacity(1, 8).unwrap(), 1);
        assert!(matches!(
            per_unit_capacity(63, 0),
            Err(PowerError::NonPositiveUnitCount)
        ));
    }

    #[test]
    fn test_load_unit_ids() {
        let json = r#"{"stories": [{"storyId": " story_07 "}, {"storyId": 3}, null, {"title": "x"}, {"storyId": "story_09"}]}"#;
        assert_eq!(
            load_unit_ids(json.as_bytes()).unwrap(),
            vec!["story_07", "story_09"]
        );
        assert!(matches!(
            load_unit_ids(r#"{"stories": []}"#.as_bytes()),
            Err(PowerError::NoUnits)
        ));
        assert!(matches!(
            load_unit_ids("{".as_bytes()),
            Err(PowerError::Json(_))
        ));
    }

    #[test]
    fn test_capacity_rows() {
        let rows = capacity_rows("formal_1", &default_unit_ids(2), 32);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].sk, "formal_1#story_01#human");
        assert_eq!(rows[1].sk, "formal_1#story_01#vlm");
        assert_eq!(rows[3].analysis_filename, "story_02.json");
        assert!(rows.iter().all(|r| r.max_assignments == 32 && r.assigned_count == 0));
        assert_eq!(rows[0].pk, CAPACITY_PARTITION_KEY);
        assert_eq!(rows[0].item_type, CAPACITY_ITEM_TYPE);
    }

    #[test]
    fn test_paired_design_has_no_capacity() {
        let size = SampleSize::Paired { n_pairs: 32 };
        assert_eq!(CapacityPlan::for_sample_size(&size, 4).unwrap(), None);
    }

    #[test]
    fn test_capacity_plan_uses_larger_arm() {
        let size = SampleSize::Independent { n_a: 48, n_b: 95 };
        let plan = CapacityPlan::for_sample_size(&size, 4).unwrap().unwrap();
        assert_eq!(plan.per_unit, 24);
        assert_eq!(plan.implied_total, 192);
        assert!(matches!(
            CapacityPlan::for_sample_size(&size, 0),
            Err(PowerError::NonPositiveUnitCount)
        ));
    }

    #[test]
    fn test_explicit_story_count_wins() {
        let ids = vec!["a".to_owned(), "b".to_owned(), "c".to_owned()];
        assert_eq!(resolve_unit_count(Some(8), Some(ids.as_slice())), Some(8));
        assert_eq!(resolve_unit_count(None, Some(ids.as_slice())), Some(3));
        assert_eq!(resolve_unit_count(None, None), None);
    }

    #[test]
    fn test_config_ids_only_when_count_matches() {
        let ids = vec!["story_07".to_owned(), "story_09".to_owned()];
        assert_eq!(select_unit_ids(Some(ids.clone()), 2), ids);
        assert_eq!(
            select_unit_ids(Some(ids), 3),
            vec!["story_01", "story_02", "story_03"]
        );
        assert_eq!(select_unit_ids(None, 1), vec!["story_01"]);
    }
}
