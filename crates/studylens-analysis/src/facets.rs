//! Derivation of categorical facets from raw rows
//!
//! Every raw row is assigned three facets: the study condition ([`Mode`]),
//! the cohort label, and the lifecycle [`Phase`]. Exports have evolved over
//! time, so each facet is derived by probing several sources in a fixed
//! priority order and falling back to a default; derivation never fails.
//!
//! # Priority order
//!
//! ```text
//! mode:        mode > assigned_mode > condition > "#vlm"/"#human" in sk > unknown
//! study label: study_label > study > studylabel > study_id ("<prefix>:<suffix>#..",
//!              "pilot", "formal_<token>", "formal") > sk prefix > "formal"
//! phase:       item_type / sk markers (prestudy, poststudy, clip) > absent
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::record::RawRecord;

/// Study condition a participant was assigned to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::IsVariant,
)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[display("human")]
    Human,
    #[display("vlm")]
    Vlm,
    #[display("unknown")]
    Unknown,
}

impl Mode {
    /// Parses `human` or `vlm`, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" => Some(Self::Human),
            "vlm" => Some(Self::Vlm),
            _ => None,
        }
    }
}

/// Lifecycle phase of a study item.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::IsVariant,
)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[display("pre")]
    Pre,
    #[display("in")]
    In,
    #[display("post")]
    Post,
    #[display("unknown")]
    Unknown,
}

impl Phase {
    /// Parses a phase name (`pre`, `in`, `post`, `unknown`), ignoring case.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pre" => Some(Self::Pre),
            "in" => Some(Self::In),
            "post" => Some(Self::Post),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

/// The three facets derived once per raw row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedFacets {
    pub mode: Mode,
    /// Lower-cased, trimmed cohort label
    pub study_label: String,
    pub phase: Phase,
}

impl DerivedFacets {
    /// Derives all facets for a row.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde_json::json;
    /// use studylens_analysis::{
    ///     facets::{DerivedFacets, Mode, Phase},
    ///     record::RawRecord,
    /// };
    ///
    /// let row = [
    ///     ("sk", json!("formal_2#story_01#vlm#clip_3")),
    ///     ("item_type", json!("clip_annotation")),
    /// ]
    /// .into_iter()
    /// .collect::<RawRecord>();
    ///
    /// let facets = DerivedFacets::derive(&row);
    /// assert_eq!(facets.mode, Mode::Vlm);
    /// assert_eq!(facets.study_label, "formal_2");
    /// assert_eq!(facets.phase, Phase::In);
    /// ```
    #[must_use]
    pub fn derive(record: &RawRecord) -> Self {
        Self {
            mode: derive_mode(record),
            study_label: derive_study_label(record),
            phase: derive_phase(record).unwrap_or(Phase::Unknown),
        }
    }
}

const MODE_KEYS: [&str; 3] = ["mode", "assigned_mode", "condition"];
const STUDY_LABEL_KEYS: [&str; 3] = ["study_label", "study", "studylabel"];
const STUDY_ID_KEYS: [&str; 2] = ["study_id", "studyid"];
const ITEM_TYPE_KEYS: [&str; 2] = ["item_type", "itemtype"];
const SECONDARY_KEY: [&str; 1] = ["sk"];

pub const DEFAULT_STUDY_LABEL: &str = "formal";

static FORMAL_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"formal_[0-9a-z]+(?:-[0-9a-z]+)*").unwrap());

type Rule<T> = fn(&RawRecord) -> Option<T>;

/// Derives the study condition; explicit fields win over key markers.
#[must_use]
pub fn derive_mode(record: &RawRecord) -> Mode {
    const RULES: [Rule<Mode>; 2] = [explicit_mode, secondary_key_mode];
    RULES
        .iter()
        .find_map(|rule| rule(record))
        .unwrap_or(Mode::Unknown)
}

fn explicit_mode(record: &RawRecord) -> Option<Mode> {
    MODE_KEYS
        .iter()
        .filter_map(|k| record.text(&[k]))
        .find_map(|v| Mode::parse(&v))
}

fn secondary_key_mode(record: &RawRecord) -> Option<Mode> {
    let sk = record.text(&SECONDARY_KEY)?.to_lowercase();
    if sk.contains("#vlm") {
        Some(Mode::Vlm)
    } else if sk.contains("#human") {
        Some(Mode::Human)
    } else {
        None
    }
}

/// Derives the lower-cased cohort label, defaulting to `"formal"`.
#[must_use]
pub fn derive_study_label(record: &RawRecord) -> String {
    const RULES: [Rule<String>; 3] = [explicit_study_label, study_id_label, secondary_key_label];
    RULES
        .iter()
        .find_map(|rule| rule(record))
        .unwrap_or_else(|| DEFAULT_STUDY_LABEL.to_owned())
}

fn explicit_study_label(record: &RawRecord) -> Option<String> {
    STUDY_LABEL_KEYS
        .iter()
        .find_map(|k| record.text(&[k]))
        .map(|v| v.to_lowercase())
}

fn study_id_label(record: &RawRecord) -> Option<String> {
    let id = record.text(&STUDY_ID_KEYS)?.to_lowercase();

    if let Some((_, rest)) = id.split_once(':') {
        let suffix = rest.split('#').next().unwrap_or_default().trim();
        if !suffix.is_empty() {
            return Some(suffix.to_owned());
        }
    }
    if id.contains("pilot") {
        return Some("pilot".to_owned());
    }
    if let Some(m) = FORMAL_TOKEN.find(&id) {
        return Some(m.as_str().to_owned());
    }
    id.contains("formal").then(|| "formal".to_owned())
}

fn secondary_key_label(record: &RawRecord) -> Option<String> {
    let sk = record.text(&SECONDARY_KEY)?.to_lowercase();
    let prefix = sk.split('#').next().unwrap_or_default();
    let candidate = prefix.rsplit(':').next().unwrap_or_default().trim();
    (candidate == "pilot" || candidate == "formal" || candidate.starts_with("formal_"))
        .then(|| candidate.to_owned())
}

/// Derives the lifecycle phase from the item type and secondary key.
///
/// Returns `None` when neither carries a recognised marker; callers
/// substitute [`Phase::Unknown`].
#[must_use]
pub fn derive_phase(record: &RawRecord) -> Option<Phase> {
    let item_type = record.text(&ITEM_TYPE_KEYS).unwrap_or_default().to_lowercase();
    let sk = record.text(&SECONDARY_KEY).unwrap_or_default().to_lowercase();

    if item_type.contains("prestudy") || sk.ends_with("#prestudy") {
        Some(Phase::Pre)
    } else if item_type.contains("poststudy") || sk.ends_with("#poststudy") {
        Some(Phase::Post)
    } else if item_type.contains("clip_annotation") || sk.contains("#clip_") {
        Some(Phase::In)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn row(cells: &[(&str, Value)]) -> RawRecord {
        cells.iter().cloned().collect()
    }

    #[test]
    fn test_explicit_mode_wins_over_marker() {
        let r = row(&[("mode", json!("human")), ("sk", json!("pilot#story_01#vlm"))]);
        assert_eq!(derive_mode(&r), Mode::Human);
    }

    #[test]
    fn test_mode_falls_through_unrecognised_values() {
        let r = row(&[
            ("mode", json!("both")),
            ("condition", json!(" VLM ")),
            ("sk", json!("x#human")),
        ]);
        assert_eq!(derive_mode(&r), Mode::Vlm);

        let r = row(&[("mode", json!("control")), ("sk", json!("pilot#story_02#human"))]);
        assert_eq!(derive_mode(&r), Mode::Human);

        assert_eq!(derive_mode(&row(&[])), Mode::Unknown);
    }

    #[test]
    fn test_explicit_study_label_is_lowercased() {
        let r = row(&[("study", json!("  Formal_1 ")), ("study_id", json!("pilot"))]);
        assert_eq!(derive_study_label(&r), "formal_1");
    }

    #[test]
    fn test_study_id_fallbacks() {
        let label = |id: &str| derive_study_label(&row(&[("studyId", json!(id))]));
        assert_eq!(label("study:Formal_3#v2"), "formal_3");
        assert_eq!(label("soups26-pilot-run"), "pilot");
        assert_eq!(label("export-formal_7-final"), "formal_7-final");
        assert_eq!(label("the formal study"), "formal");
        assert_eq!(label("study:#x"), "formal");
    }

    #[test]
    fn test_secondary_key_prefix() {
        let label = |sk: &str| derive_study_label(&row(&[("sk", json!(sk))]));
        assert_eq!(label("pilot#story_01#human"), "pilot");
        assert_eq!(label("study:formal_2#story_01"), "formal_2");
        assert_eq!(label("participant#p1"), "formal");
    }

    #[test]
    fn test_phase_markers() {
        let phase = |it: &str, sk: &str| {
            derive_phase(&row(&[("item_type", json!(it)), ("sk", json!(sk))]))
        };
        assert_eq!(phase("PreStudy_Survey", ""), Some(Phase::Pre));
        assert_eq!(phase("", "p1#poststudy"), Some(Phase::Post));
        assert_eq!(phase("", "formal#story_01#vlm#clip_2"), Some(Phase::In));
        assert_eq!(phase("participant", "p1"), None);
        assert_eq!(DerivedFacets::derive(&row(&[])).phase, Phase::Unknown);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(Mode::Vlm.to_string(), "vlm");
        assert_eq!(Phase::In.to_string(), "in");
        assert_eq!(Phase::parse(" POST "), Some(Phase::Post));
    }
}
