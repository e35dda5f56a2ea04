//! Run configuration.
//!
//! Stored as a JSON object on disk, every field optional:
//! ```json
//! {
//!   "sources": [
//!     { "year": 2022, "source": "data/T_T100I_SEGMENT_ALL_CARRIER_2022.csv" },
//!     { "year": 2023, "source": "https://example.org/T100_2023.csv.gz" },
//!     { "year": 2024, "source": "data/T_T100I_SEGMENT_ALL_CARRIER_2024.csv" }
//!   ],
//!   "threshold": 100,
//!   "holdout_year": 2024,
//!   "horizon": 12,
//!   "min_training_months": 24,
//!   "output_dir": "output"
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pipeline::qualify::DEFAULT_THRESHOLD;

/// The three years the original traffic extract covers.
pub const DEFAULT_YEARS: [i32; 3] = [2022, 2023, 2024];

/// One yearly input table: a local path or an http(s) URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearSource {
    pub year: i32,
    pub source: String,
}

impl YearSource {
    /// The BTS T-100 international segment file name for `year`.
    pub fn default_for(year: i32) -> Self {
        Self {
            year,
            source: format!("T_T100I_SEGMENT_ALL_CARRIER_{year}.csv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub sources: Vec<YearSource>,
    /// Minimum ceiling-summed passengers per flight for every month.
    pub threshold: u64,
    /// Year withheld from model fitting. Defaults to the last source year.
    pub holdout_year: Option<i32>,
    pub horizon: usize,
    pub min_training_months: usize,
    pub output_dir: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources: DEFAULT_YEARS.iter().copied().map(YearSource::default_for).collect(),
            threshold: DEFAULT_THRESHOLD,
            holdout_year: None,
            horizon: 12,
            min_training_months: 24,
            output_dir: "output".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading config `{path}`"))?;
        let config: Self =
            serde_json::from_str(&content).with_context(|| format!("parsing config `{path}`"))?;
        Ok(config)
    }

    pub fn years(&self) -> Vec<i32> {
        self.sources.iter().map(|s| s.year).collect()
    }

    /// The configured holdout year, or the last source year.
    pub fn holdout(&self) -> Option<i32> {
        self.holdout_year
            .or_else(|| self.sources.last().map(|s| s.year))
    }

    /// Checks the yearly sources. Forecast settings are checked by
    /// `ForecastSettings::from_config`, so qualifying needs none of them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }

        for pair in self.sources.windows(2) {
            if pair[1].year <= pair[0].year {
                return Err(ConfigError::YearsOutOfOrder {
                    previous: pair[0].year,
                    next: pair[1].year,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert_eq!(config.years(), vec![2022, 2023, 2024]);
        assert_eq!(config.holdout(), Some(2024));
        assert_eq!(config.threshold, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: PipelineConfig = serde_json::from_str(r#"{ "threshold": 150 }"#).unwrap();
        assert_eq!(config.threshold, 150);
        assert_eq!(config.horizon, 12);
        assert_eq!(config.sources.len(), 3);
    }

    #[test]
    fn test_years_must_increase() {
        let config = PipelineConfig {
            sources: vec![YearSource::default_for(2023), YearSource::default_for(2022)],
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::YearsOutOfOrder {
                previous: 2023,
                next: 2022
            })
        );
    }

    #[test]
    fn test_single_year_can_be_qualified() {
        let config = PipelineConfig {
            sources: vec![YearSource::default_for(2024)],
            ..Default::default()
        };
        assert_eq!(config.holdout(), Some(2024));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let path = format!(
            "{}/connection_forecast_test_config.json",
            std::env::temp_dir().display()
        );
        std::fs::write(&path, r#"{ "output_dir": "out", "horizon": 6 }"#).unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.output_dir, "out");
        assert_eq!(config.horizon, 6);

        std::fs::remove_file(&path).unwrap();
    }
}
