use crate::error::ForecastError;
use crate::forecast::{FittedModel, ForecastModel, ensure_finite};

const NAME: &str = "linear-regression";

/// Straight-line trend over the month index.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearRegression;

#[derive(Debug, Clone)]
pub struct FittedLinear {
    intercept: f64,
    slope: f64,
    n: usize,
    fitted: Vec<f64>,
}

impl ForecastModel for LinearRegression {
    fn name(&self) -> &'static str {
        NAME
    }

    fn fit(&self, training: &[f64]) -> Result<Box<dyn FittedModel>, ForecastError> {
        let n = training.len();
        if n < 2 {
            return Err(ForecastError::InsufficientData {
                model: NAME,
                required: 2,
                actual: n,
            });
        }

        let mean_x = (n as f64 - 1.0) / 2.0;
        let mean_y = training.iter().sum::<f64>() / n as f64;
        let (mut sxy, mut sxx) = (0.0, 0.0);
        for (t, y) in training.iter().enumerate() {
            let dx = t as f64 - mean_x;
            sxy += dx * (y - mean_y);
            sxx += dx * dx;
        }
        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;

        let fitted: Vec<f64> = (0..n).map(|t| intercept + slope * t as f64).collect();
        ensure_finite(NAME, &fitted)?;

        Ok(Box::new(FittedLinear {
            intercept,
            slope,
            n,
            fitted,
        }))
    }
}

impl FittedModel for FittedLinear {
    fn forecast(&self, horizon: usize) -> Result<Vec<f64>, ForecastError> {
        let values: Vec<f64> = (self.n..self.n + horizon)
            .map(|t| self.intercept + self.slope * t as f64)
            .collect();
        ensure_finite(NAME, &values)?;
        Ok(values)
    }

    fn fitted_values(&self) -> &[f64] {
        &self.fitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extends_exact_trend() {
        let training: Vec<f64> = (0..24).map(|t| 500.0 + 20.0 * t as f64).collect();
        let fitted = LinearRegression.fit(&training).unwrap();
        let forecast = fitted.forecast(3).unwrap();

        assert!((forecast[0] - 980.0).abs() < 1e-6);
        assert!((forecast[2] - 1020.0).abs() < 1e-6);
    }

    #[test]
    fn test_needs_two_points() {
        assert!(matches!(
            LinearRegression.fit(&[1.0]),
            Err(ForecastError::InsufficientData { required: 2, .. })
        ));
    }
}
