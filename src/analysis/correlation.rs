//! Autocorrelation Analysis
//!
//! ACF and PACF with extraction of "significant" lags: local maxima of the
//! absolute correlation with a minimum separation of three lags, which is
//! what the seasonal-structure widgets plot.

use crate::core::error::{Error, Result};
use crate::analysis::spectral::significant_peaks;

fn clean(x: &[f64]) -> Vec<f64> {
    x.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Autocorrelation function for lags `0..=max_lag` (biased, mean-removed)
pub fn acf(x: &[f64], max_lag: usize) -> Result<Vec<f64>> {
    let v = clean(x);
    let n = v.len();
    if n < 2 || max_lag >= n {
        return Err(Error::InsufficientData(format!(
            "Autocorrelation to lag {} needs more than {} observations",
            max_lag, n
        )));
    }
    let mean = v.iter().sum::<f64>() / n as f64;
    let denom: f64 = v.iter().map(|a| (a - mean) * (a - mean)).sum();
    if denom == 0.0 {
        return Err(Error::Computation("Series has zero variance".to_string()));
    }
    Ok((0..=max_lag)
        .map(|lag| {
            let num: f64 = (0..n - lag)
                .map(|i| (v[i] - mean) * (v[i + lag] - mean))
                .sum();
            num / denom
        })
        .collect())
}

/// Partial autocorrelation function for lags `0..=max_lag` via the
/// Durbin-Levinson recursion
pub fn pacf(x: &[f64], max_lag: usize) -> Result<Vec<f64>> {
    let rho = acf(x, max_lag)?;
    let mut result = vec![1.0];
    if max_lag == 0 {
        return Ok(result);
    }

    // phi[k][j] are the order-k AR coefficients
    let mut phi = vec![vec![0.0; max_lag + 1]; max_lag + 1];
    phi[1][1] = rho[1];
    result.push(rho[1]);
    for k in 2..=max_lag {
        let mut num = rho[k];
        let mut den = 1.0;
        for j in 1..k {
            num -= phi[k - 1][j] * rho[k - j];
            den -= phi[k - 1][j] * rho[j];
        }
        let value = if den.abs() < f64::MIN_POSITIVE {
            0.0
        } else {
            num / den
        };
        phi[k][k] = value;
        for j in 1..k {
            phi[k][j] = phi[k - 1][j] - value * phi[k - 1][k - j];
        }
        result.push(value);
    }
    Ok(result)
}

fn significant_lags(correlations: &[f64]) -> Vec<(usize, f64)> {
    // correlations[i] holds lag i+1; peaks on |corr| with separation 3
    let magnitude: Vec<f64> = correlations.iter().map(|c| c.abs()).collect();
    significant_peaks(&magnitude, 3)
        .into_iter()
        .map(|i| (i + 1, correlations[i]))
        .collect()
}

fn default_max_lag(x: &[f64]) -> usize {
    (x.len() / 2).saturating_sub(1).max(1)
}

/// Significant autocorrelation lags as `(lag, correlation)` pairs
pub fn autocorrelation(x: &[f64]) -> Result<Vec<(usize, f64)>> {
    let max_lag = default_max_lag(x);
    let rho = acf(x, max_lag)?;
    Ok(significant_lags(&rho[1..]))
}

/// Significant partial autocorrelation lags as `(lag, correlation)` pairs
pub fn partial_autocorrelation(x: &[f64]) -> Result<Vec<(usize, f64)>> {
    let max_lag = default_max_lag(x);
    let rho = pacf(x, max_lag)?;
    Ok(significant_lags(&rho[1..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn seasonal_series(n: usize, period: usize) -> Vec<f64> {
        (0..n)
            .map(|t| (2.0 * PI * t as f64 / period as f64).sin() * 2.0 + 5.0)
            .collect()
    }

    #[test]
    fn test_acf_lag_zero_is_one() {
        let x = seasonal_series(100, 10);
        let rho = acf(&x, 20).unwrap();
        assert!((rho[0] - 1.0).abs() < 1e-12);
        assert!(rho.len() == 21);
    }

    #[test]
    fn test_acf_detects_period() {
        let x = seasonal_series(120, 12);
        let rho = acf(&x, 30).unwrap();
        // The series correlates with itself one full period back
        assert!(rho[12] > 0.8);
        assert!(rho[6] < 0.0);
    }

    #[test]
    fn test_pacf_of_ar1() {
        // AR(1) has a single dominant partial autocorrelation at lag 1
        let mut x = vec![0.0_f64];
        for t in 1..300 {
            let drive = ((t * 31 % 17) as f64 / 17.0) - 0.5;
            x.push(0.8 * x[t - 1] + drive);
        }
        let result = pacf(&x, 10).unwrap();
        assert!(result[1] > 0.6);
        for lag in 3..=10 {
            assert!(result[lag].abs() < result[1].abs());
        }
    }

    #[test]
    fn test_significant_lags_find_season() {
        let x = seasonal_series(144, 12);
        let lags = autocorrelation(&x).unwrap();
        assert!(!lags.is_empty());
        // The strongest lags sit at multiples of the season
        assert!(lags.iter().any(|(lag, corr)| *lag == 12 && *corr > 0.8));
    }

    #[test]
    fn test_minimum_separation() {
        let x = seasonal_series(144, 12);
        let lags = autocorrelation(&x).unwrap();
        let mut sorted: Vec<usize> = lags.iter().map(|(lag, _)| *lag).collect();
        sorted.sort_unstable();
        for pair in sorted.windows(2) {
            assert!(pair[1] - pair[0] > 3);
        }
    }

    #[test]
    fn test_constant_series_is_error() {
        assert!(matches!(
            acf(&[2.0; 50], 10),
            Err(Error::Computation(_))
        ));
    }

    #[test]
    fn test_too_many_lags() {
        assert!(acf(&[1.0, 2.0, 3.0], 5).is_err());
    }
}
