//! Analyze command
//!
//! Normalizes a study-data export into the long table, then writes the
//! requested summary, comparison, text, and generative-tool usage tables.

mod table;

use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use studylens_analysis::{
    compare,
    config::AnalysisConfig,
    genai, normalize,
    summary::{self, Facet},
    text,
};
use tracing::{info, warn};

use crate::{
    input::{self, InputFormat},
    util::{self, Output},
};

#[derive(Debug, Clone, Args)]
pub(crate) struct AnalyzeArg {
    /// Path to the exported table (CSV or JSON)
    pub input: PathBuf,

    /// Input format; guessed from the file extension when omitted
    #[arg(long, value_enum)]
    pub format: Option<InputFormat>,

    /// Analysis config JSON file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Lowest point of the response scale
    #[arg(long, allow_negative_numbers = true)]
    pub scale_min: Option<i32>,

    /// Highest point of the response scale
    #[arg(long, allow_negative_numbers = true)]
    pub scale_max: Option<i32>,

    /// Grouping columns of the summary (comma-separated)
    #[arg(long, value_delimiter = ',', value_parser = parse_facet)]
    pub group_by: Vec<Facet>,

    /// Keep annotation scores without a privacy type in the type summary
    #[arg(long)]
    pub include_untyped: bool,

    /// Write the long table to this CSV file
    #[arg(long)]
    pub long_csv: Option<PathBuf>,

    /// Write the Likert summary to this CSV file
    #[arg(long)]
    pub summary_csv: Option<PathBuf>,

    /// Write the summary by privacy type to this CSV file
    #[arg(long)]
    pub type_summary_csv: Option<PathBuf>,

    /// Write the group comparison to this CSV file
    #[arg(long)]
    pub compare_csv: Option<PathBuf>,

    /// Write extracted text records to this CSV file
    #[arg(long)]
    pub text_csv: Option<PathBuf>,

    /// Write the text summary to this CSV file
    #[arg(long)]
    pub text_summary_csv: Option<PathBuf>,

    /// Write generative-tool usage records to this CSV file
    #[arg(long)]
    pub genai_csv: Option<PathBuf>,

    /// Write the generative-tool usage summary to this CSV file
    #[arg(long)]
    pub genai_summary_csv: Option<PathBuf>,

    /// Write a JSON run report to this file
    #[arg(long)]
    pub report_json: Option<PathBuf>,
}

fn parse_facet(s: &str) -> Result<Facet, String> {
    Facet::parse(s).ok_or_else(|| {
        format!("unknown column {s:?} (expected mode, study_label, phase, source, or privacy_type)")
    })
}

#[derive(Debug, Serialize)]
struct RunReport {
    generated_at: DateTime<Utc>,
    input: String,
    input_rows: usize,
    long_records: usize,
    dropped_scores: usize,
    skipped_elements: usize,
    summary_rows: usize,
    type_summary_rows: usize,
    comparison_rows: usize,
    text_records: usize,
    genai_records: usize,
    config: AnalysisConfig,
}

pub(crate) fn run(arg: &AnalyzeArg) -> anyhow::Result<()> {
    let config = load_config(arg)?;
    let scale = config.scale().context("Invalid analysis config")?;

    let table = input::load_table(&arg.input, arg.format)?;
    info!(
        rows = table.rows.len(),
        columns = table.columns.len(),
        long_format = table.is_long_format(),
        "loaded input table"
    );

    let normalized = normalize::normalize_to_long(&table);
    let stats = normalized.stats;
    info!(
        rows = stats.rows,
        records = stats.records,
        dropped_scores = stats.dropped_scores,
        skipped_elements = stats.skipped_elements,
        "normalized input"
    );
    let records = &normalized.records;

    let summary = summary::summarize_likert(records, scale, &config.group_by);
    let type_summary =
        summary::summarize_by_type(records, scale, &config.group_by, config.include_untyped);
    let comparison = compare::compare_groups(records, &config.compare_options());
    if comparison.is_empty() && !records.is_empty() {
        warn!("no comparison rows; fewer than two groups per question or significance tests unavailable");
    }

    let texts = text::extract_text(&table);
    let text_summary = text::summarize_text(&texts);
    let genai_records = genai::extract_genai_usage(&table);
    let genai_summary = genai::summarize_genai(&genai_records);

    if let Some(path) = &arg.long_csv {
        Output::open(path.clone())?.write_csv_records(records)?;
    }
    if let Some(path) = &arg.summary_csv {
        let (header, rows) = table::summary_table(&config.group_by, scale, &summary);
        Output::open(path.clone())?.write_csv(&header, rows)?;
    }
    if let Some(path) = &arg.type_summary_csv {
        let facets = summary::type_grouping(&config.group_by);
        let (header, rows) = table::summary_table(&facets, scale, &type_summary);
        Output::open(path.clone())?.write_csv(&header, rows)?;
    }
    if let Some(path) = &arg.compare_csv {
        let (header, rows) = table::comparison_table(&comparison);
        Output::open(path.clone())?.write_csv(&header, rows)?;
    }
    if let Some(path) = &arg.text_csv {
        Output::open(path.clone())?.write_csv_records(&texts)?;
    }
    if let Some(path) = &arg.text_summary_csv {
        Output::open(path.clone())?.write_csv_records(&text_summary)?;
    }
    if let Some(path) = &arg.genai_csv {
        Output::open(path.clone())?.write_csv_records(&genai_records)?;
    }
    if let Some(path) = &arg.genai_summary_csv {
        Output::open(path.clone())?.write_csv_records(&genai_summary)?;
    }

    println!("Rows normalized: {}", records.len());
    println!("Summary rows: {}", summary.len());
    println!("Comparison rows: {}", comparison.len());

    if let Some(path) = &arg.report_json {
        let report = RunReport {
            generated_at: Utc::now(),
            input: arg.input.display().to_string(),
            input_rows: table.rows.len(),
            long_records: records.len(),
            dropped_scores: stats.dropped_scores,
            skipped_elements: stats.skipped_elements,
            summary_rows: summary.len(),
            type_summary_rows: type_summary.len(),
            comparison_rows: comparison.len(),
            text_records: texts.len(),
            genai_records: genai_records.len(),
            config,
        };
        Output::open(path.clone())?.write_json(&report)?;
        info!(path = %path.display(), "wrote run report");
    }

    Ok(())
}

/// Loads the config file, if any, and applies command-line overrides.
fn load_config(arg: &AnalyzeArg) -> anyhow::Result<AnalysisConfig> {
    let mut config = match &arg.config {
        Some(path) => util::read_json_file::<AnalysisConfig, _>("analysis config", path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(min) = arg.scale_min {
        config.scale_min = min;
    }
    if let Some(max) = arg.scale_max {
        config.scale_max = max;
    }
    if !arg.group_by.is_empty() {
        config.group_by.clone_from(&arg.group_by);
    }
    if arg.include_untyped {
        config.include_untyped = true;
    }
    Ok(config)
}
