//! Accuracy of a forecast against the holdout window.

use serde::Serialize;
use std::fmt;

use crate::error::ForecastError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccuracyMetrics {
    /// Mean absolute error
    pub mae: f64,
    /// Root mean squared error
    pub rmse: f64,
    /// Coefficient of determination; `None` when the holdout is constant.
    pub r2: Option<f64>,
    /// Mean absolute percentage error in percent; `None` when any actual value is zero.
    pub mape: Option<f64>,
}

pub fn evaluate(actual: &[f64], forecast: &[f64]) -> Result<AccuracyMetrics, ForecastError> {
    if actual.len() != forecast.len() {
        return Err(ForecastError::LengthMismatch {
            forecast: forecast.len(),
            actual: actual.len(),
        });
    }
    if actual.is_empty() {
        return Err(ForecastError::EmptyEvaluation);
    }

    let n = actual.len() as f64;
    let errors: Vec<f64> = actual.iter().zip(forecast).map(|(a, f)| a - f).collect();

    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let ss_res = errors.iter().map(|e| e * e).sum::<f64>();
    let rmse = (ss_res / n).sqrt();

    let mean = actual.iter().sum::<f64>() / n;
    let ss_tot = actual.iter().map(|a| (a - mean).powi(2)).sum::<f64>();
    let r2 = (ss_tot > 0.0).then(|| 1.0 - ss_res / ss_tot);

    let mape = actual.iter().all(|a| *a != 0.0).then(|| {
        actual
            .iter()
            .zip(&errors)
            .map(|(a, e)| (e / a).abs())
            .sum::<f64>()
            / n
            * 100.0
    });

    Ok(AccuracyMetrics { mae, rmse, r2, mape })
}

fn optional(value: Option<f64>, suffix: &str) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}{suffix}"))
}

impl fmt::Display for AccuracyMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MAE {:.2}, RMSE {:.2}, R² {}, MAPE {}",
            self.mae,
            self.rmse,
            optional(self.r2, ""),
            optional(self.mape, "%")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regression_metrics() {
        let actual = vec![10.0, 20.0, 30.0, 40.0, 50.0];
        let forecast = vec![12.0, 18.0, 33.0, 37.0, 52.0];
        let m = evaluate(&actual, &forecast).unwrap();

        assert!((m.mae - 2.4).abs() < 1e-9);
        assert!((m.rmse - 6.0_f64.sqrt()).abs() < 1e-9);
        assert!((m.r2.unwrap() - (1.0 - 30.0 / 1000.0)).abs() < 1e-9);
        let expected_mape = (0.2 + 0.1 + 0.1 + 0.075 + 0.04) / 5.0 * 100.0;
        assert!((m.mape.unwrap() - expected_mape).abs() < 1e-9);
    }

    #[test]
    fn test_zero_actual_makes_mape_unavailable() {
        let m = evaluate(&[0.0, 10.0], &[1.0, 9.0]).unwrap();
        assert_eq!(m.mape, None);
        assert!(m.mae.is_finite());
        assert!(m.to_string().contains("MAPE n/a"));
    }

    #[test]
    fn test_constant_holdout_makes_r2_unavailable() {
        let m = evaluate(&[5.0, 5.0, 5.0], &[4.0, 5.0, 6.0]).unwrap();
        assert_eq!(m.r2, None);
    }

    #[test]
    fn test_length_mismatch_and_empty() {
        assert_eq!(
            evaluate(&[1.0, 2.0], &[1.0]),
            Err(ForecastError::LengthMismatch {
                forecast: 1,
                actual: 2
            })
        );
        assert_eq!(evaluate(&[], &[]), Err(ForecastError::EmptyEvaluation));
    }
}
