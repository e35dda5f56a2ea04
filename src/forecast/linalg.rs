use crate::error::ForecastError;

/// Ordinary least squares via the normal equations.
///
/// `design` holds one row of regressors per observation.
pub fn least_squares(design: &[Vec<f64>], y: &[f64]) -> Result<Vec<f64>, ForecastError> {
    let Some(width) = design.first().map(Vec::len) else {
        return Err(ForecastError::Singular);
    };

    let mut xtx = vec![vec![0.0; width]; width];
    let mut xty = vec![0.0; width];
    for (row, &target) in design.iter().zip(y) {
        for i in 0..width {
            xty[i] += row[i] * target;
            for j in 0..width {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }

    solve(xtx, xty)
}

/// Gaussian elimination with partial pivoting.
pub fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, ForecastError> {
    let n = b.len();
    let scale = a
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0_f64, |acc, v| acc.max(v.abs()))
        .max(1.0);

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < 1e-12 * scale {
            return Err(ForecastError::Singular);
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_line() {
        let design: Vec<Vec<f64>> = (0..5).map(|t| vec![1.0, t as f64]).collect();
        let y: Vec<f64> = (0..5).map(|t| 3.0 + 2.0 * t as f64).collect();

        let beta = least_squares(&design, &y).unwrap();
        assert!((beta[0] - 3.0).abs() < 1e-9);
        assert!((beta[1] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_collinear_columns_are_singular() {
        let design: Vec<Vec<f64>> = (0..5).map(|t| vec![t as f64, 2.0 * t as f64]).collect();
        let y = vec![1.0; 5];
        assert_eq!(least_squares(&design, &y), Err(ForecastError::Singular));
    }
}
