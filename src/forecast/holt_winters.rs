//! Additive Holt-Winters (trend + season) with grid-searched smoothing weights.

use crate::error::ForecastError;
use crate::forecast::{FittedModel, ForecastModel, SEASON, ensure_finite};

const NAME: &str = "holt-winters";

#[derive(Debug, Clone)]
pub struct HoltWinters {
    period: usize,
    /// Candidate values tried for each of alpha, beta and gamma.
    grid: Vec<f64>,
}

impl Default for HoltWinters {
    fn default() -> Self {
        Self {
            period: SEASON,
            grid: (0..10).map(|i| 0.05 + 0.1 * i as f64).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Smoothing {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

#[derive(Debug, Clone)]
pub struct FittedHoltWinters {
    pub params: Smoothing,
    level: f64,
    trend: f64,
    season: Vec<f64>,
    n: usize,
    fitted: Vec<f64>,
}

struct Pass {
    sse: f64,
    level: f64,
    trend: f64,
    season: Vec<f64>,
    fitted: Vec<f64>,
}

impl HoltWinters {
    /// Runs the recursions for one parameter set.
    ///
    /// Initial level and trend come from the first two seasons; initial
    /// seasonal indices are the first season's deviations from that line.
    fn smooth(&self, y: &[f64], p: Smoothing) -> Pass {
        let m = self.period;
        let first = y[..m].iter().sum::<f64>() / m as f64;
        let second = y[m..2 * m].iter().sum::<f64>() / m as f64;
        let mut trend = (second - first) / m as f64;
        let centre = (m as f64 - 1.0) / 2.0;
        let mut level = first + trend * centre;

        let mut season: Vec<f64> = (0..m)
            .map(|i| y[i] - (first + trend * (i as f64 - centre)))
            .collect();
        let mut fitted: Vec<f64> = (0..m).map(|i| y[i]).collect();
        let mut sse = 0.0;

        for (t, &obs) in y.iter().enumerate().skip(m) {
            let s = t % m;
            let predicted = level + trend + season[s];
            fitted.push(predicted);
            sse += (obs - predicted).powi(2);

            let previous_level = level;
            level = p.alpha * (obs - season[s]) + (1.0 - p.alpha) * (level + trend);
            trend = p.beta * (level - previous_level) + (1.0 - p.beta) * trend;
            season[s] = p.gamma * (obs - level) + (1.0 - p.gamma) * season[s];
        }

        Pass {
            sse,
            level,
            trend,
            season,
            fitted,
        }
    }
}

impl ForecastModel for HoltWinters {
    fn name(&self) -> &'static str {
        NAME
    }

    fn fit(&self, training: &[f64]) -> Result<Box<dyn FittedModel>, ForecastError> {
        let required = 2 * self.period;
        if training.len() < required {
            return Err(ForecastError::InsufficientData {
                model: NAME,
                required,
                actual: training.len(),
            });
        }

        let mut best: Option<(Smoothing, Pass)> = None;
        for &alpha in &self.grid {
            for &beta in &self.grid {
                for &gamma in &self.grid {
                    let params = Smoothing { alpha, beta, gamma };
                    let pass = self.smooth(training, params);
                    if !pass.sse.is_finite() {
                        continue;
                    }
                    if best.as_ref().is_none_or(|(_, b)| pass.sse < b.sse) {
                        best = Some((params, pass));
                    }
                }
            }
        }

        let (params, pass) = best.ok_or(ForecastError::NonFinite(NAME))?;
        ensure_finite(NAME, &pass.fitted)?;

        Ok(Box::new(FittedHoltWinters {
            params,
            level: pass.level,
            trend: pass.trend,
            season: pass.season,
            n: training.len(),
            fitted: pass.fitted,
        }))
    }
}

impl FittedModel for FittedHoltWinters {
    fn forecast(&self, horizon: usize) -> Result<Vec<f64>, ForecastError> {
        let m = self.season.len();
        let values: Vec<f64> = (1..=horizon)
            .map(|h| self.level + h as f64 * self.trend + self.season[(self.n + h - 1) % m])
            .collect();
        ensure_finite(NAME, &values)?;
        Ok(values)
    }

    fn fitted_values(&self) -> &[f64] {
        &self.fitted
    }
}
