//! Canonical long-format records
//!
//! A [`LongRecord`] is one `(participant, question, score)` observation
//! with its facets and provenance. Long records are created only by the
//! [`normalize`](crate::normalize) pipeline and are never mutated afterwards.

use serde::{Serialize, Serializer};

use crate::facets::{Mode, Phase};

/// Raw substructure a long record originated from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
pub enum Source {
    /// Row of an already-long input table without a `source` column
    #[display("long")]
    Long,
    /// Pre/post-study questionnaire answers
    #[display("answers")]
    Answers,
    /// Post-study answers about the AI assistant
    #[display("ai_answers")]
    AiAnswers,
    /// Single-clip manual finding
    #[display("manual")]
    Manual,
    /// Single-clip AI detection response
    #[display("ai")]
    Ai,
    /// Cross-clip AI threat response
    #[display("cross")]
    Cross,
    /// Cross-clip manual annotation
    #[display("cross_manual")]
    CrossManual,
    /// Any other provenance carried through from long input
    #[display("{_0}")]
    Other(String),
}

impl Source {
    /// Sources of in-study annotations that may carry a privacy type tag.
    pub const TYPED: [Self; 4] = [Self::Manual, Self::Ai, Self::Cross, Self::CrossManual];

    /// Maps a provenance name to its variant; unknown names are kept verbatim.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "long" => Self::Long,
            "answers" => Self::Answers,
            "ai_answers" => Self::AiAnswers,
            "manual" => Self::Manual,
            "ai" => Self::Ai,
            "cross" => Self::Cross,
            "cross_manual" => Self::CrossManual,
            other => Self::Other(other.to_owned()),
        }
    }

    #[must_use]
    pub fn is_typed(&self) -> bool {
        Self::TYPED.contains(self)
    }
}

impl Serialize for Source {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// The canonical unit of the analysis tables.
///
/// `score` is always finite: records whose score fails numeric coercion
/// are dropped before a `LongRecord` is ever constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongRecord {
    pub participant_id: Option<String>,
    pub mode: Mode,
    pub study_label: String,
    pub phase: Phase,
    pub question_id: String,
    pub score: f64,
    pub source: Source,
    /// Identifier of the finding/detection/threat the score belongs to
    pub item_id: Option<String>,
    /// Category or information-type tag of an in-study annotation
    pub privacy_type: Option<String>,
}

impl LongRecord {
    /// Whether the record has a privacy type other than the literal `none`.
    #[must_use]
    pub fn has_privacy_type(&self) -> bool {
        self.privacy_type
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty() && !t.trim().eq_ignore_ascii_case("none"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_names_round_trip() {
        for source in [
            Source::Long,
            Source::Answers,
            Source::AiAnswers,
            Source::Manual,
            Source::Ai,
            Source::Cross,
            Source::CrossManual,
        ] {
            assert_eq!(Source::parse(&source.to_string()), source);
        }
        assert_eq!(Source::parse("imported"), Source::Other("imported".into()));
        assert_eq!(Source::Other("imported".into()).to_string(), "imported");
    }

    #[test]
    fn test_privacy_type_presence() {
        let mut record = LongRecord {
            participant_id: Some("p1".into()),
            mode: Mode::Human,
            study_label: "formal".into(),
            phase: Phase::In,
            question_id: "manual_privacy_threat_score".into(),
            score: 2.0,
            source: Source::Manual,
            item_id: None,
            privacy_type: None,
        };
        assert!(!record.has_privacy_type());
        record.privacy_type = Some("None".into());
        assert!(!record.has_privacy_type());
        record.privacy_type = Some("location".into());
        assert!(record.has_privacy_type());
        assert!(record.source.is_typed());
    }
}
