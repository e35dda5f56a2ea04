//! Holdout forecasting of one series and of every connection in a table.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::ConfigError;
use crate::forecast::metrics::{self, AccuracyMetrics};
use crate::forecast::series::MonthlySeries;
use crate::forecast::{ForecastModel, ModelKind};
use crate::output::TableRow;
use crate::pipeline::types::{ConnectionKey, DerivedRow, YearMonth};

pub const FORECAST_RESULTS_FILE: &str = "forecast_results.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastSettings {
    pub holdout_year: i32,
    pub horizon: usize,
    pub min_training_months: usize,
}

impl ForecastSettings {
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let holdout_year = config.holdout().ok_or(ConfigError::NoSources)?;
        let trained = config.sources.iter().any(|s| s.year < holdout_year);
        let held_out = config.sources.iter().any(|s| s.year == holdout_year);
        if !trained || !held_out {
            return Err(ConfigError::InvalidHoldoutYear(holdout_year));
        }
        if config.horizon == 0 {
            return Err(ConfigError::ZeroHorizon);
        }
        Ok(Self {
            holdout_year,
            horizon: config.horizon,
            min_training_months: config.min_training_months,
        })
    }
}

/// A fitted model's forecast over the holdout window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRun {
    pub training_months: usize,
    /// Forecast for each of the `horizon` months after the training window.
    pub forecast: Vec<(YearMonth, f64)>,
    /// Holdout observations the forecast was scored against.
    pub actual: Vec<(YearMonth, f64)>,
    pub metrics: AccuracyMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ForecastOutcome {
    Success(ForecastRun),
    NoData,
    InsufficientTraining { months: usize },
    InsufficientHoldout { months: usize },
    ModelFailed { reason: String },
}

impl ForecastOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            ForecastOutcome::Success(_) => "success",
            ForecastOutcome::NoData => "no_data",
            ForecastOutcome::InsufficientTraining { .. } => "insufficient_training",
            ForecastOutcome::InsufficientHoldout { .. } => "insufficient_holdout",
            ForecastOutcome::ModelFailed { .. } => "model_failed",
        }
    }

    pub fn run(&self) -> Option<&ForecastRun> {
        match self {
            ForecastOutcome::Success(run) => Some(run),
            _ => None,
        }
    }

    /// Human readable cause for anything but a success.
    pub fn reason(&self) -> Option<String> {
        match self {
            ForecastOutcome::Success(_) => None,
            ForecastOutcome::NoData => Some("series is empty".to_string()),
            ForecastOutcome::InsufficientTraining { months } => {
                Some(format!("only {months} training months"))
            }
            ForecastOutcome::InsufficientHoldout { months } => {
                Some(format!("only {months} holdout months"))
            }
            ForecastOutcome::ModelFailed { reason } => Some(reason.clone()),
        }
    }
}

/// Fits `model` on the months before the holdout year and scores the forecast
/// against the holdout year.
///
/// Missing months inside the series count as zero traffic.
pub fn forecast_series(
    series: &MonthlySeries,
    model: &dyn ForecastModel,
    settings: &ForecastSettings,
) -> ForecastOutcome {
    if series.is_empty() {
        return ForecastOutcome::NoData;
    }

    let (training, holdout) = series.fill_gaps().split(settings.holdout_year);
    if training.len() < settings.min_training_months.max(1) {
        return ForecastOutcome::InsufficientTraining {
            months: training.len(),
        };
    }
    if holdout.is_empty() || settings.horizon == 0 {
        return ForecastOutcome::InsufficientHoldout {
            months: holdout.len(),
        };
    }

    let fitted = match model.fit(&training.values()) {
        Ok(fitted) => fitted,
        Err(e) => {
            return ForecastOutcome::ModelFailed {
                reason: e.to_string(),
            };
        }
    };
    let values = match fitted.forecast(settings.horizon) {
        Ok(values) => values,
        Err(e) => {
            return ForecastOutcome::ModelFailed {
                reason: e.to_string(),
            };
        }
    };

    let mut forecast = Vec::with_capacity(values.len());
    let mut period = training.last_month().unwrap_or(YearMonth::new(settings.holdout_year - 1, 12));
    for value in values {
        period = period.succ();
        forecast.push((period, value));
    }

    let scored = forecast.len().min(holdout.len());
    let actual: Vec<(YearMonth, f64)> = holdout.points()[..scored].to_vec();
    let predicted: Vec<f64> = forecast[..scored].iter().map(|(_, v)| *v).collect();
    let observed: Vec<f64> = actual.iter().map(|(_, v)| *v).collect();

    match metrics::evaluate(&observed, &predicted) {
        Ok(metrics) => ForecastOutcome::Success(ForecastRun {
            training_months: training.len(),
            forecast,
            actual,
            metrics,
        }),
        Err(e) => ForecastOutcome::ModelFailed {
            reason: e.to_string(),
        },
    }
}

/// Forecast plus actual traffic of all successful connections, per holdout month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallRollup {
    pub connections: usize,
    pub months: Vec<(YearMonth, f64, f64)>,
    pub metrics: Option<AccuracyMetrics>,
}

#[derive(Debug, Clone)]
pub struct BatchForecast {
    pub model: ModelKind,
    /// One outcome per connection, in key order.
    pub outcomes: Vec<(ConnectionKey, ForecastOutcome)>,
    pub overall: OverallRollup,
}

impl BatchForecast {
    pub fn successes(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.run().is_some()).count()
    }

    pub fn records(&self) -> impl Iterator<Item = ForecastResultRecord> + '_ {
        self.outcomes
            .iter()
            .map(|(key, outcome)| ForecastResultRecord::new(key, self.model, outcome))
    }
}

fn rollup(outcomes: &[(ConnectionKey, ForecastOutcome)]) -> OverallRollup {
    let mut by_month: BTreeMap<YearMonth, (f64, f64)> = BTreeMap::new();
    let mut connections = 0;

    for run in outcomes.iter().filter_map(|(_, o)| o.run()) {
        connections += 1;
        for ((period, predicted), (_, observed)) in run.forecast.iter().zip(&run.actual) {
            let entry = by_month.entry(*period).or_default();
            entry.0 += predicted;
            entry.1 += observed;
        }
    }

    let months: Vec<(YearMonth, f64, f64)> = by_month
        .into_iter()
        .map(|(period, (predicted, observed))| (period, predicted, observed))
        .collect();
    let predicted: Vec<f64> = months.iter().map(|(_, p, _)| *p).collect();
    let observed: Vec<f64> = months.iter().map(|(_, _, a)| *a).collect();

    OverallRollup {
        connections,
        metrics: metrics::evaluate(&observed, &predicted).ok(),
        months,
    }
}

/// Forecasts every connection present in `rows` with `kind`.
///
/// Connections run in parallel; a failing connection is logged and kept as
/// its outcome without stopping the others.
pub fn forecast_connections(
    rows: &[DerivedRow],
    kind: ModelKind,
    settings: &ForecastSettings,
) -> BatchForecast {
    let mut grouped: BTreeMap<&ConnectionKey, Vec<&DerivedRow>> = BTreeMap::new();
    for row in rows {
        grouped.entry(row.key()).or_default().push(row);
    }

    let model = kind.model();
    let outcomes: Vec<(ConnectionKey, ForecastOutcome)> = grouped
        .into_iter()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(key, group)| {
            let series = MonthlySeries::for_connection(group, key);
            let outcome = forecast_series(&series, model.as_ref(), settings);
            match outcome.reason() {
                Some(reason) => warn!(
                    connection = %key,
                    model = model.name(),
                    status = outcome.status(),
                    reason = %reason,
                    "Forecast failed"
                ),
                None => debug!(connection = %key, model = model.name(), "Forecast complete"),
            }
            (key.clone(), outcome)
        })
        .collect();

    let overall = rollup(&outcomes);
    info!(
        model = model.name(),
        connections = outcomes.len(),
        succeeded = overall.connections,
        "Batch forecast complete"
    );

    BatchForecast {
        model: kind,
        outcomes,
        overall,
    }
}

/// Flat CSV shape of one batch outcome. Metrics are empty unless the run succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResultRecord {
    #[serde(rename = "AIRLINE_ID")]
    pub airline_id: u32,
    #[serde(rename = "UNIQUE_CARRIER_ENTITY")]
    pub carrier_entity: String,
    #[serde(rename = "ORIGIN")]
    pub origin: String,
    #[serde(rename = "DEST")]
    pub dest: String,
    #[serde(rename = "AIRCRAFT_TYPE")]
    pub aircraft_type: u32,
    #[serde(rename = "MODEL")]
    pub model: ModelKind,
    #[serde(rename = "STATUS")]
    pub status: String,
    #[serde(rename = "MAE")]
    pub mae: Option<f64>,
    #[serde(rename = "RMSE")]
    pub rmse: Option<f64>,
    #[serde(rename = "R2")]
    pub r2: Option<f64>,
    #[serde(rename = "MAPE")]
    pub mape: Option<f64>,
    #[serde(rename = "REASON")]
    pub reason: Option<String>,
}

impl TableRow for ForecastResultRecord {
    const COLUMNS: &'static [&'static str] = &[
        "AIRLINE_ID",
        "UNIQUE_CARRIER_ENTITY",
        "ORIGIN",
        "DEST",
        "AIRCRAFT_TYPE",
        "MODEL",
        "STATUS",
        "MAE",
        "RMSE",
        "R2",
        "MAPE",
        "REASON",
    ];
}

impl ForecastResultRecord {
    pub fn new(key: &ConnectionKey, model: ModelKind, outcome: &ForecastOutcome) -> Self {
        let metrics = outcome.run().map(|run| &run.metrics);
        Self {
            airline_id: key.airline_id,
            carrier_entity: key.carrier_entity.clone(),
            origin: key.origin.clone(),
            dest: key.dest.clone(),
            aircraft_type: key.aircraft_type,
            model,
            status: outcome.status().to_string(),
            mae: metrics.map(|m| m.mae),
            rmse: metrics.map(|m| m.rmse),
            r2: metrics.and_then(|m| m.r2),
            mape: metrics.and_then(|m| m.mape),
            reason: outcome.reason(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::linear::LinearRegression;
    use crate::forecast::test_series::seasonal;
    use crate::pipeline::derive::derive_metrics;
    use crate::pipeline::test_support::serialized_header;
    use crate::pipeline::types::{AggregatedRow, TrafficTotals};

    fn settings() -> ForecastSettings {
        ForecastSettings {
            holdout_year: 2024,
            horizon: 12,
            min_training_months: 24,
        }
    }

    #[test]
    fn test_settings_from_default_config() {
        let settings = ForecastSettings::from_config(&PipelineConfig::default()).unwrap();
        assert_eq!(settings.holdout_year, 2024);
        assert_eq!(settings.horizon, 12);
    }

    #[test]
    fn test_settings_need_a_training_year_before_the_holdout() {
        let first_year = PipelineConfig {
            holdout_year: Some(2022),
            ..Default::default()
        };
        assert_eq!(
            ForecastSettings::from_config(&first_year),
            Err(ConfigError::InvalidHoldoutYear(2022))
        );

        let single_year = PipelineConfig {
            sources: vec![crate::config::YearSource::default_for(2024)],
            ..Default::default()
        };
        assert_eq!(
            ForecastSettings::from_config(&single_year),
            Err(ConfigError::InvalidHoldoutYear(2024))
        );

        let unknown_year = PipelineConfig {
            holdout_year: Some(2030),
            ..Default::default()
        };
        assert_eq!(
            ForecastSettings::from_config(&unknown_year),
            Err(ConfigError::InvalidHoldoutYear(2030))
        );
    }

    #[test]
    fn test_settings_reject_zero_horizon() {
        let config = PipelineConfig {
            horizon: 0,
            ..Default::default()
        };
        assert_eq!(
            ForecastSettings::from_config(&config),
            Err(ConfigError::ZeroHorizon)
        );
    }

    fn three_year_series(values: &[f64]) -> MonthlySeries {
        let mut period = YearMonth::new(2022, 1);
        MonthlySeries::from_points(values.iter().map(|v| {
            let point = (period, *v);
            period = period.succ();
            point
        }))
    }

    fn derived(origin: &str, values: &[f64]) -> Vec<DerivedRow> {
        let mut period = YearMonth::new(2022, 1);
        let rows: Vec<AggregatedRow> = values
            .iter()
            .map(|v| {
                let row = AggregatedRow {
                    key: ConnectionKey {
                        airline_id: 19393,
                        carrier_entity: "11033".to_string(),
                        origin: origin.to_string(),
                        dest: "BWI".to_string(),
                        aircraft_type: 612,
                    },
                    period,
                    totals: TrafficTotals {
                        passengers: *v as u64,
                        departures_performed: 10,
                        seats: 2000,
                        ..Default::default()
                    },
                };
                period = period.succ();
                row
            })
            .collect();
        derive_metrics(&rows)
    }

    #[test]
    fn test_linear_series_is_forecast_exactly() {
        let values: Vec<f64> = (0..36).map(|t| 500.0 + 20.0 * t as f64).collect();
        let outcome = forecast_series(&three_year_series(&values), &LinearRegression, &settings());

        let run = outcome.run().expect("success");
        assert_eq!(run.training_months, 24);
        assert_eq!(run.forecast.len(), 12);
        assert_eq!(run.forecast[0].0, YearMonth::new(2024, 1));
        assert!(run.metrics.mae < 1e-6);
        assert!(run.metrics.r2.unwrap() > 0.999_999);
    }

    #[test]
    fn test_short_training_window() {
        let values = seasonal(30);
        let series = MonthlySeries::from_points(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| (YearMonth::new(2023 + (i / 12) as i32, (i % 12) as u32 + 1), *v)),
        );
        let outcome = forecast_series(&series, &LinearRegression, &settings());
        assert_eq!(outcome, ForecastOutcome::InsufficientTraining { months: 12 });
    }

    #[test]
    fn test_missing_holdout_and_empty_series() {
        let series = three_year_series(&seasonal(24));
        assert_eq!(
            forecast_series(&series, &LinearRegression, &settings()),
            ForecastOutcome::InsufficientHoldout { months: 0 }
        );
        assert_eq!(
            forecast_series(&MonthlySeries::default(), &LinearRegression, &settings()),
            ForecastOutcome::NoData
        );
    }

    #[test]
    fn test_model_failure_is_reported() {
        let settings = ForecastSettings {
            min_training_months: 1,
            ..settings()
        };
        let series = three_year_series(&[100.0; 36]);
        let short = MonthlySeries::from_points(
            series
                .points()
                .iter()
                .copied()
                .filter(|(p, _)| p.year == 2024 || (p.year == 2023 && p.month > 6)),
        );
        let outcome = forecast_series(&short, ModelKind::HoltWinters.model().as_ref(), &settings);

        assert_eq!(outcome.status(), "model_failed");
        assert!(outcome.reason().unwrap().contains("holt-winters"));
    }

    #[test]
    fn test_batch_keeps_key_order_and_rolls_up() {
        let linear: Vec<f64> = (0..36).map(|t| 1000.0 + 10.0 * t as f64).collect();
        let mut rows = derived("ZRH", &linear);
        rows.extend(derived("CUN", &linear));
        rows.extend(derived("AMS", &linear[..20]));

        let batch = forecast_connections(&rows, ModelKind::LinearRegression, &settings());

        let origins: Vec<&str> = batch.outcomes.iter().map(|(k, _)| k.origin.as_str()).collect();
        assert_eq!(origins, vec!["AMS", "CUN", "ZRH"]);
        assert_eq!(batch.successes(), 2);
        assert_eq!(batch.overall.connections, 2);
        assert_eq!(batch.overall.months.len(), 12);

        let (_, predicted, observed) = batch.overall.months[0];
        assert!((observed - 2.0 * 1240.0).abs() < 1e-9);
        assert!((predicted - observed).abs() < 1e-6);

        let records: Vec<ForecastResultRecord> = batch.records().collect();
        assert_eq!(records[0].status, "insufficient_training");
        assert_eq!(records[0].mae, None);
        assert!(records[1].mae.is_some());
        assert_eq!(
            serialized_header(&records[0]),
            ForecastResultRecord::COLUMNS.join(",")
        );
    }
}
