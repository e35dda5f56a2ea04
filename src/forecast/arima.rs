//! ARIMA(1,1,1) and SARIMA(1,1,1)(1,1,1,s) fitted by conditional sum of squares.
//!
//! The series is differenced once (and once more at lag `s` when seasonal),
//! then a multiplicative ARMA model is fitted on the differences by
//! minimising the squared one-step residuals over a coefficient grid.
//! Pre-sample values and residuals are taken as zero.

use crate::error::ForecastError;
use crate::forecast::{FittedModel, ForecastModel, ensure_finite};

/// Differenced observations needed before the ARMA part is estimated.
const MIN_DIFFERENCED: usize = 8;

#[derive(Debug, Clone)]
pub struct Arima {
    seasonal_period: Option<usize>,
    grid: Vec<f64>,
    seasonal_grid: Vec<f64>,
}

impl Arima {
    pub fn nonseasonal() -> Self {
        Self {
            seasonal_period: None,
            grid: (-9..=9).map(|i| i as f64 / 10.0).collect(),
            seasonal_grid: vec![0.0],
        }
    }

    pub fn seasonal(period: usize) -> Self {
        Self {
            seasonal_period: Some(period),
            grid: (-9..=9).map(|i| i as f64 / 10.0).collect(),
            seasonal_grid: (-3..=3).map(|i| i as f64 * 0.3).collect(),
        }
    }

    fn label(&self) -> &'static str {
        if self.seasonal_period.is_some() {
            "sarima"
        } else {
            "arima"
        }
    }

    fn lag(&self) -> usize {
        self.seasonal_period.unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ArmaCoefficients {
    pub phi: f64,
    pub theta: f64,
    pub seasonal_phi: f64,
    pub seasonal_theta: f64,
}

/// Value at `i`, or zero before the start of the series.
fn at(values: &[f64], i: isize) -> f64 {
    if i < 0 { 0.0 } else { values[i as usize] }
}

impl ArmaCoefficients {
    /// One-step prediction of `w[t]` from the past of `w` and `e`.
    fn predict(&self, w: &[f64], e: &[f64], t: usize, s: usize) -> f64 {
        let t = t as isize;
        let s = s as isize;
        let mut value = self.phi * at(w, t - 1) + self.theta * at(e, t - 1);
        if s > 0 {
            value += self.seasonal_phi * at(w, t - s) - self.phi * self.seasonal_phi * at(w, t - s - 1)
                + self.seasonal_theta * at(e, t - s)
                + self.theta * self.seasonal_theta * at(e, t - s - 1);
        }
        value
    }

    fn residuals(&self, w: &[f64], s: usize) -> Vec<f64> {
        let mut e = Vec::with_capacity(w.len());
        for t in 0..w.len() {
            let predicted = self.predict(w, &e, t, s);
            e.push(w[t] - predicted);
        }
        e
    }
}

fn difference(values: &[f64], lag: usize) -> Vec<f64> {
    values.windows(lag + 1).map(|w| w[lag] - w[0]).collect()
}

#[derive(Debug, Clone)]
pub struct FittedArima {
    name: &'static str,
    pub coefficients: ArmaCoefficients,
    lag: usize,
    last_level: f64,
    diffs: Vec<f64>,
    stationary: Vec<f64>,
    residuals: Vec<f64>,
    fitted: Vec<f64>,
}

impl ForecastModel for Arima {
    fn name(&self) -> &'static str {
        self.label()
    }

    fn fit(&self, training: &[f64]) -> Result<Box<dyn FittedModel>, ForecastError> {
        let s = self.lag();
        let offset = 1 + s;
        let required = offset + MIN_DIFFERENCED;
        if training.len() < required {
            return Err(ForecastError::InsufficientData {
                model: self.label(),
                required,
                actual: training.len(),
            });
        }

        let diffs = difference(training, 1);
        let stationary = if s > 0 { difference(&diffs, s) } else { diffs.clone() };

        let mut best: Option<(f64, ArmaCoefficients, Vec<f64>)> = None;
        for &phi in &self.grid {
            for &theta in &self.grid {
                for &seasonal_phi in &self.seasonal_grid {
                    for &seasonal_theta in &self.seasonal_grid {
                        let coefficients = ArmaCoefficients {
                            phi,
                            theta,
                            seasonal_phi,
                            seasonal_theta,
                        };
                        let e = coefficients.residuals(&stationary, s);
                        let sse: f64 = e.iter().map(|r| r * r).sum();
                        if !sse.is_finite() {
                            continue;
                        }
                        if best.as_ref().is_none_or(|(b, _, _)| sse < *b) {
                            best = Some((sse, coefficients, e));
                        }
                    }
                }
            }
        }
        let (_, coefficients, residuals) = best.ok_or(ForecastError::NonFinite(self.label()))?;

        let mut fitted: Vec<f64> = training[..offset].to_vec();
        for t in offset..training.len() {
            let i = t - offset;
            let predicted_w = stationary[i] - residuals[i];
            let seasonal_base = if s > 0 { diffs[t - 1 - s] } else { 0.0 };
            fitted.push(training[t - 1] + predicted_w + seasonal_base);
        }
        ensure_finite(self.label(), &fitted)?;

        Ok(Box::new(FittedArima {
            name: self.label(),
            coefficients,
            lag: s,
            last_level: training[training.len() - 1],
            diffs,
            stationary,
            residuals,
            fitted,
        }))
    }
}

impl FittedModel for FittedArima {
    fn forecast(&self, horizon: usize) -> Result<Vec<f64>, ForecastError> {
        let s = self.lag;
        let mut w = self.stationary.clone();
        let mut e = self.residuals.clone();
        let mut z = self.diffs.clone();
        let mut level = self.last_level;
        let mut values = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let t = w.len();
            let next_w = self.coefficients.predict(&w, &e, t, s);
            w.push(next_w);
            e.push(0.0);

            let next_z = if s > 0 { next_w + z[z.len() - s] } else { next_w };
            z.push(next_z);

            level += next_z;
            values.push(level);
        }

        ensure_finite(self.name, &values)?;
        Ok(values)
    }

    fn fitted_values(&self) -> &[f64] {
        &self.fitted
    }
}
