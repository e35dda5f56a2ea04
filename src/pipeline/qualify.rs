//! Qualification of connections for sustained, complete monthly service.
//!
//! A connection qualifies when, in every configured year, it has records for
//! all twelve months and each month's ceiling-summed passengers per flight
//! reaches the threshold `k`. Years are checked in order and the first failing
//! year ends the evaluation for that connection.

use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, info};

use crate::pipeline::dataset::SegmentDataset;
use crate::pipeline::identity::{ConnectionIndex, candidate_keys};
use crate::pipeline::types::{ConnectionKey, RawSegmentRecord};

pub const DEFAULT_THRESHOLD: u64 = 100;
pub const MONTHS_PER_YEAR: usize = 12;

/// Why a connection failed one year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disqualification {
    NoRecords,
    TooFewRecords { found: usize },
    MissingMonths { missing: Vec<u32> },
    BelowThreshold { month: u32, figure: u64 },
}

impl Disqualification {
    /// Stable label used to count exclusions in the run report.
    pub fn kind(&self) -> &'static str {
        match self {
            Disqualification::NoRecords => "no_records",
            Disqualification::TooFewRecords { .. } => "too_few_records",
            Disqualification::MissingMonths { .. } => "missing_months",
            Disqualification::BelowThreshold { .. } => "below_threshold",
        }
    }
}

impl fmt::Display for Disqualification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disqualification::NoRecords => write!(f, "no records"),
            Disqualification::TooFewRecords { found } => {
                write!(f, "only {found} records, at least {MONTHS_PER_YEAR} required")
            }
            Disqualification::MissingMonths { missing } => write!(f, "missing months {missing:?}"),
            Disqualification::BelowThreshold { month, figure } => {
                write!(f, "month {month} reaches only {figure} passengers per flight")
            }
        }
    }
}

/// Ceiling of passengers per departure, `None` for rows with zero departures.
///
/// Used only for threshold gating; reported metrics use floor division.
pub fn per_flight_ceil(passengers: u64, departures: u64) -> Option<u64> {
    (departures > 0).then(|| passengers.div_ceil(departures))
}

/// Sum of ceiling per-flight passengers over a month's rows. Rows with zero
/// departures contribute nothing.
pub fn monthly_volume<'a>(rows: impl IntoIterator<Item = &'a RawSegmentRecord>) -> u64 {
    rows.into_iter()
        .filter_map(|r| per_flight_ceil(r.passengers, r.departures_performed))
        .sum()
}

/// Checks one connection's rows against completeness and the threshold `k` for `year`.
pub fn check_year(rows: &[&RawSegmentRecord], year: i32, k: u64) -> Result<(), Disqualification> {
    let in_year: Vec<&RawSegmentRecord> = rows.iter().copied().filter(|r| r.year == year).collect();

    if in_year.is_empty() {
        return Err(Disqualification::NoRecords);
    }
    if in_year.len() < MONTHS_PER_YEAR {
        return Err(Disqualification::TooFewRecords {
            found: in_year.len(),
        });
    }

    let present: BTreeSet<u32> = in_year.iter().map(|r| r.month).collect();
    let missing: Vec<u32> = (1..=12).filter(|m| !present.contains(m)).collect();
    if !missing.is_empty() || present.len() != MONTHS_PER_YEAR {
        return Err(Disqualification::MissingMonths { missing });
    }

    for month in 1..=12 {
        let figure = monthly_volume(in_year.iter().copied().filter(|r| r.month == month));
        if figure < k {
            return Err(Disqualification::BelowThreshold { month, figure });
        }
    }

    Ok(())
}

/// True when `key` meets completeness and threshold `k` in `year` of `index`.
pub fn qualify(key: &ConnectionKey, index: &ConnectionIndex<'_>, year: i32, k: u64) -> bool {
    check_year(index.rows(key), year, k).is_ok()
}

/// Evaluates every year in order, stopping at the first failure.
fn evaluate(
    key: &ConnectionKey,
    indexes: &[ConnectionIndex<'_>],
    k: u64,
) -> Result<(), (i32, Disqualification)> {
    for index in indexes {
        check_year(index.rows(key), index.year(), k).map_err(|reason| (index.year(), reason))?;
    }
    Ok(())
}

/// Outcome of qualifying every candidate of a dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Qualification {
    pub candidates: usize,
    pub qualified: BTreeSet<ConnectionKey>,
    /// Excluded connections counted by [`Disqualification::kind`].
    pub exclusions: BTreeMap<&'static str, usize>,
}

/// Qualifies every connection of the anchor year against all years of `dataset`.
///
/// Candidates are checked in parallel; the result is a set, so it does not
/// depend on scheduling.
#[tracing::instrument(skip(dataset), fields(years = dataset.years().len()))]
pub fn qualify_connections(dataset: &SegmentDataset, k: u64) -> Qualification {
    let Some(anchor) = dataset.anchor() else {
        return Qualification::default();
    };

    let candidates: Vec<ConnectionKey> = candidate_keys(anchor).into_iter().collect();
    info!(
        candidates = candidates.len(),
        anchor_year = anchor.year,
        "Found candidate connections in anchor year"
    );

    let indexes: Vec<ConnectionIndex<'_>> =
        dataset.years().iter().map(ConnectionIndex::build).collect();

    let outcomes: Vec<(ConnectionKey, Result<(), (i32, Disqualification)>)> = candidates
        .into_par_iter()
        .map(|key| {
            let outcome = evaluate(&key, &indexes, k);
            (key, outcome)
        })
        .collect();

    let mut result = Qualification {
        candidates: outcomes.len(),
        ..Default::default()
    };

    for (key, outcome) in outcomes {
        match outcome {
            Ok(()) => {
                debug!(connection = %key, "Connection passed");
                result.qualified.insert(key);
            }
            Err((year, reason)) => {
                debug!(connection = %key, year, reason = %reason, "Connection excluded");
                *result.exclusions.entry(reason.kind()).or_default() += 1;
            }
        }
    }

    info!(
        qualified = result.qualified.len(),
        candidates = result.candidates,
        exclusions = ?result.exclusions,
        "Qualification complete"
    );

    result
}
