//! Normalization and analysis of study-data exports
//!
//! This crate turns heterogeneous exports of a key-value study-data store
//! into one canonical long table and computes the summaries built on it.
//!
//! # Overview
//!
//! ```text
//! InputTable ─┬─ normalize ──> LongRecord ─┬─ summary  (Likert, by type)
//!             │                            └─ compare  (Kruskal–Wallis, Welch)
//!             ├─ text ───────> TextRecord ──── summarize_text
//!             └─ genai ──────> GenAiUsageRecord ── summarize_genai
//! ```
//!
//! 1. **Value Coercion** ([`value`]): decodes attribute encodings and
//!    JSON-encoded text into plain nested values
//! 2. **Facet Derivation** ([`facets`]): infers mode, study label, and phase
//!    per row with layered fallbacks
//! 3. **Normalization** ([`normalize`]): flattens answers and in-study
//!    annotations into [`long::LongRecord`]s
//! 4. **Aggregation** ([`summary`]): per-group count, mean, standard deviation,
//!    and scale histograms
//! 5. **Group Comparison** ([`compare`]): per-question significance tests
//!    between conditions (feature `pvalue`)
//!
//! Malformed cells and elements are skipped locally; no function in this
//! crate fails on bad data.
//!
//! # Examples
//!
//! ```
//! use serde_json::json;
//! use studylens_analysis::{
//!     normalize::normalize_to_long,
//!     record::{InputTable, RawRecord},
//!     summary::{Facet, summarize_likert},
//! };
//! use studylens_stats::histogram::IntegerScale;
//!
//! let rows = [("p1", "human", 1), ("p2", "vlm", -2)]
//!     .into_iter()
//!     .map(|(id, mode, score)| {
//!         [
//!             ("participant_id", json!(id)),
//!             ("mode", json!(mode)),
//!             ("item_type", json!("poststudy")),
//!             ("answers", json!([{"question_id": "trust", "score": score}])),
//!         ]
//!         .into_iter()
//!         .collect::<RawRecord>()
//!     })
//!     .collect();
//!
//! let long = normalize_to_long(&InputTable::from_rows(rows));
//! let summary = summarize_likert(&long.records, IntegerScale::SEVEN_POINT, &Facet::DEFAULT_GROUPING);
//! assert_eq!(summary.len(), 2);
//! assert_eq!(summary[1].group, vec!["vlm", "formal", "post"]);
//! ```

pub mod compare;
pub mod config;
pub mod facets;
pub mod genai;
pub mod long;
pub mod normalize;
pub mod record;
pub mod summary;
pub mod text;
pub mod value;
