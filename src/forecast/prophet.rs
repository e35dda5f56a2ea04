//! Additive trend + yearly Fourier seasonality, the decomposition Prophet
//! uses, fitted by ordinary least squares without changepoints.

use std::f64::consts::PI;

use crate::error::ForecastError;
use crate::forecast::linalg::least_squares;
use crate::forecast::{FittedModel, ForecastModel, SEASON, ensure_finite};

const NAME: &str = "prophet";

#[derive(Debug, Clone)]
pub struct Prophet {
    fourier_order: usize,
    period: f64,
}

impl Default for Prophet {
    fn default() -> Self {
        Self {
            fourier_order: 3,
            period: SEASON as f64,
        }
    }
}

impl Prophet {
    fn regressors(&self, t: usize) -> Vec<f64> {
        // Trend in years keeps the normal equations well conditioned.
        let mut row = vec![1.0, t as f64 / self.period];
        for k in 1..=self.fourier_order {
            let angle = 2.0 * PI * k as f64 * t as f64 / self.period;
            row.push(angle.sin());
            row.push(angle.cos());
        }
        row
    }
}

#[derive(Debug, Clone)]
pub struct FittedProphet {
    model: Prophet,
    coefficients: Vec<f64>,
    n: usize,
    fitted: Vec<f64>,
}

impl FittedProphet {
    fn evaluate(&self, t: usize) -> f64 {
        self.model
            .regressors(t)
            .iter()
            .zip(&self.coefficients)
            .map(|(x, b)| x * b)
            .sum()
    }
}

impl ForecastModel for Prophet {
    fn name(&self) -> &'static str {
        NAME
    }

    fn fit(&self, training: &[f64]) -> Result<Box<dyn FittedModel>, ForecastError> {
        let required = 2 + 2 * self.fourier_order + 2;
        if training.len() < required {
            return Err(ForecastError::InsufficientData {
                model: NAME,
                required,
                actual: training.len(),
            });
        }

        let design: Vec<Vec<f64>> = (0..training.len()).map(|t| self.regressors(t)).collect();
        let coefficients = least_squares(&design, training)?;

        let mut fitted = FittedProphet {
            model: self.clone(),
            coefficients,
            n: training.len(),
            fitted: Vec::new(),
        };
        fitted.fitted = (0..training.len()).map(|t| fitted.evaluate(t)).collect();
        ensure_finite(NAME, &fitted.fitted)?;

        Ok(Box::new(fitted))
    }
}

impl FittedModel for FittedProphet {
    fn forecast(&self, horizon: usize) -> Result<Vec<f64>, ForecastError> {
        let values: Vec<f64> = (self.n..self.n + horizon).map(|t| self.evaluate(t)).collect();
        ensure_finite(NAME, &values)?;
        Ok(values)
    }

    fn fitted_values(&self) -> &[f64] {
        &self.fitted
    }
}
