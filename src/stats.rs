use serde::Serialize;

use crate::pipeline::types::DerivedRow;

/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Computes the sample standard deviation (n - 1 denominator) given a
/// pre-computed mean. Returns `None` for fewer than two values.
pub fn sample_stddev(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;

    Some(variance.sqrt())
}

/// Passenger statistics over the months of one selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub months: usize,
    pub mean_passengers: f64,
    pub min_passengers: f64,
    pub max_passengers: f64,
    pub stddev_passengers: Option<f64>,
    /// Mean of the defined monthly load factors.
    pub mean_load_factor: Option<f64>,
}

impl SummaryStats {
    /// `values` are monthly passenger totals; returns `None` when empty.
    pub fn from_values(values: &[f64], load_factors: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mean_passengers = mean(values);
        Some(SummaryStats {
            months: values.len(),
            mean_passengers,
            min_passengers: values.iter().copied().fold(f64::INFINITY, f64::min),
            max_passengers: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            stddev_passengers: sample_stddev(values, mean_passengers),
            mean_load_factor: (!load_factors.is_empty()).then(|| mean(load_factors)),
        })
    }

    pub fn from_rows<'a>(
        values: &[f64],
        rows: impl IntoIterator<Item = &'a DerivedRow>,
    ) -> Option<Self> {
        let load_factors: Vec<f64> = rows.into_iter().filter_map(|r| r.load_factor).collect();
        Self::from_values(values, &load_factors)
    }
}
