use studylens_stats::normal::QuantileError;

/// A precondition of a power-analysis computation was violated.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum PowerError {
    #[display("pilot CSV has no header row")]
    EmptyPilotHeader,
    #[display("pilot CSV has no column {column:?}")]
    MissingPilotColumn {
        column: String,
    },
    #[display(
        "need at least 2 numeric observations per group after filtering; got {group_a}={n_a}, {group_b}={n_b}"
    )]
    InsufficientObservations {
        group_a: String,
        n_a: usize,
        group_b: String,
        n_b: usize,
    },
    #[display("pooled standard deviation is 0; the pilot outcome has no variance")]
    ZeroPooledSd,
    #[display("effect size must be a positive number, got {effect}")]
    NonPositiveEffect { effect: f64 },
    #[display("{name} must be in (0,1), got {value}")]
    ProbabilityOutOfRange {
        name: &'static str,
        value: f64,
    },
    #[display("dropout rate must be in [0,1), got {rate}")]
    DropoutOutOfRange { rate: f64 },
    #[display("allocation ratio must be positive, got {ratio}")]
    NonPositiveAllocationRatio { ratio: f64 },
    #[display("sampling unit count must be at least 1")]
    NonPositiveUnitCount,
    #[display("study config lists no stories")]
    NoUnits,
    #[display("failed to read pilot CSV")]
    #[from]
    Csv(csv::Error),
    #[display("failed to parse study config")]
    #[from]
    Json(serde_json::Error),
    #[display("invalid normal quantile")]
    #[from]
    Quantile(QuantileError),
}
