//! Typed errors raised by the library.
//!
//! Loading and configuration errors are fatal for a run. Forecast errors are
//! per-series and end up inside a [`crate::forecast::ForecastOutcome`].

use thiserror::Error;

/// A source could not be turned into validated segment records.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read source `{source_name}`: {message}")]
    Unreadable {
        source_name: String,
        message: String,
    },

    #[error("source `{source_name}` row {row}: {message}")]
    MalformedRow {
        source_name: String,
        row: u64,
        message: String,
    },

    #[error("source `{source_name}` row {row}: month {month} is outside 1-12")]
    MonthOutOfRange {
        source_name: String,
        row: u64,
        month: u32,
    },

    #[error("source `{source_name}` row {row}: YEAR {found} does not match the declared year {expected}")]
    YearMismatch {
        source_name: String,
        row: u64,
        expected: i32,
        found: i32,
    },

    #[error("source `{source_name}` contains no records")]
    Empty { source_name: String },
}

/// A model could not be fitted or evaluated for one series.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ForecastError {
    #[error("insufficient data: {model} needs at least {required} observations, got {actual}")]
    InsufficientData {
        model: &'static str,
        required: usize,
        actual: usize,
    },

    #[error("{0} produced non-finite values")]
    NonFinite(&'static str),

    #[error("normal equations are singular")]
    Singular,

    #[error("forecast has {forecast} values but the holdout has {actual}")]
    LengthMismatch { forecast: usize, actual: usize },

    #[error("cannot evaluate an empty forecast")]
    EmptyEvaluation,
}

/// The run configuration is unusable.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("at least one yearly source is required")]
    NoSources,

    #[error("source years must be strictly increasing, found {previous} before {next}")]
    YearsOutOfOrder { previous: i32, next: i32 },

    #[error("holdout year {0} must be a configured year after the first")]
    InvalidHoldoutYear(i32),

    #[error("forecast horizon must be positive")]
    ZeroHorizon,
}

/// A dashboard route selector that is neither `ALL` nor `ORIGIN_DEST`.
#[derive(Debug, Error, PartialEq)]
#[error("route `{0}` must be ALL or ORIGIN_DEST")]
pub struct InvalidRoute(pub String);
