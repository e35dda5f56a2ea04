//! Forecasting adapters over the derived monthly series.
//!
//! A model is fitted on the training window and asked for a point forecast
//! per future month; accuracy is then measured against the holdout window.
//! Every model sits behind [`ForecastModel`] so the batch runner and the
//! dashboard can swap them freely.

pub mod arima;
pub mod batch;
pub mod holt_winters;
pub mod linalg;
pub mod linear;
pub mod metrics;
pub mod prophet;
pub mod series;

pub use batch::{ForecastOutcome, ForecastSettings, forecast_series};
pub use metrics::AccuracyMetrics;
pub use series::MonthlySeries;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ForecastError;

/// Seasonal period of a monthly series.
pub const SEASON: usize = 12;

/// A model that can be fitted to a training series.
pub trait ForecastModel: Send + Sync {
    fn name(&self) -> &'static str;

    fn fit(&self, training: &[f64]) -> Result<Box<dyn FittedModel>, ForecastError>;
}

/// A fitted model.
pub trait FittedModel: Send + Sync {
    /// Point forecasts for the `horizon` periods following the training window.
    fn forecast(&self, horizon: usize) -> Result<Vec<f64>, ForecastError>;

    /// In-sample predictions, one per training observation.
    fn fitted_values(&self) -> &[f64];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    LinearRegression,
    HoltWinters,
    Arima,
    Sarima,
    Prophet,
}

impl ModelKind {
    pub const ALL: [ModelKind; 5] = [
        ModelKind::LinearRegression,
        ModelKind::HoltWinters,
        ModelKind::Arima,
        ModelKind::Sarima,
        ModelKind::Prophet,
    ];

    pub fn model(self) -> Box<dyn ForecastModel> {
        match self {
            ModelKind::LinearRegression => Box::new(linear::LinearRegression),
            ModelKind::HoltWinters => Box::new(holt_winters::HoltWinters::default()),
            ModelKind::Arima => Box::new(arima::Arima::nonseasonal()),
            ModelKind::Sarima => Box::new(arima::Arima::seasonal(SEASON)),
            ModelKind::Prophet => Box::new(prophet::Prophet::default()),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ModelKind::LinearRegression => "Linear regression",
            ModelKind::HoltWinters => "Holt-Winters",
            ModelKind::Arima => "ARIMA(1,1,1)",
            ModelKind::Sarima => "SARIMA(1,1,1)(1,1,1,12)",
            ModelKind::Prophet => "Prophet (trend + yearly seasonality)",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Rejects fitted output containing NaN or infinities.
pub(crate) fn ensure_finite(model: &'static str, values: &[f64]) -> Result<(), ForecastError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(ForecastError::NonFinite(model))
    }
}

#[cfg(test)]
pub(crate) mod test_series {
    /// Three years of a trending monthly series with a summer peak.
    pub(crate) fn seasonal(months: usize) -> Vec<f64> {
        (0..months)
            .map(|t| {
                let season = match t % 12 {
                    5..=7 => 300.0,
                    11 | 0 => 150.0,
                    _ => 0.0,
                };
                1000.0 + 10.0 * t as f64 + season
            })
            .collect()
    }
}
