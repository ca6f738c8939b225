//! Seasonal Decomposition
//!
//! Classical moving-average decomposition into trend, seasonal and residual
//! components, additive or multiplicative. The trend is a centered moving
//! average (the 2xMA convention for even periods) with NaN over the edges
//! it cannot reach; the seasonal component averages the detrended series by
//! phase and is normalized to zero mean (additive) or unit mean
//! (multiplicative).

use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Decomposition model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecompositionMethod {
    /// `y = trend + seasonal + residual`
    Additive,
    /// `y = trend * seasonal * residual`; requires strictly positive values
    Multiplicative,
}

/// Decomposition output; component vectors match the input length
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecompositionResult {
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub residual: Vec<f64>,
    pub period: usize,
    pub method: DecompositionMethod,
    /// Share of detrended variance explained by the seasonal component
    pub seasonal_strength: f64,
    /// Share of overall variance explained by the trend
    pub trend_strength: f64,
}

fn centered_moving_average(x: &[f64], period: usize) -> Vec<f64> {
    let n = x.len();
    let mut trend = vec![f64::NAN; n];
    if period % 2 == 1 {
        let half = period / 2;
        for t in half..n - half {
            let window = &x[t - half..=t + half];
            trend[t] = window.iter().sum::<f64>() / period as f64;
        }
    } else {
        // Even period: average two adjacent windows so the result centers
        let half = period / 2;
        for t in half..n.saturating_sub(half) {
            let first = x[t - half..t + half].iter().sum::<f64>() / period as f64;
            let second = x[t - half + 1..=t + half].iter().sum::<f64>() / period as f64;
            trend[t] = (first + second) / 2.0;
        }
    }
    trend
}

fn variance(values: impl Iterator<Item = f64>) -> f64 {
    let v: Vec<f64> = values.filter(|x| x.is_finite()).collect();
    if v.is_empty() {
        return f64::NAN;
    }
    let mean = v.iter().sum::<f64>() / v.len() as f64;
    v.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / v.len() as f64
}

/// Classical seasonal decomposition at a known period
pub fn seasonal_decompose(
    x: &[f64],
    period: usize,
    method: DecompositionMethod,
) -> Result<DecompositionResult> {
    if period < 2 {
        return Err(Error::InvalidInput(
            "Seasonal period must be at least 2".to_string(),
        ));
    }
    if x.len() < 2 * period {
        return Err(Error::InsufficientData(format!(
            "Series of length {} is shorter than two periods of {}",
            x.len(),
            period
        )));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(Error::InvalidInput(
            "Series contains undefined values".to_string(),
        ));
    }
    if method == DecompositionMethod::Multiplicative && x.iter().any(|v| *v <= 0.0) {
        return Err(Error::InvalidInput(
            "Multiplicative decomposition requires strictly positive values".to_string(),
        ));
    }

    let n = x.len();
    let trend = centered_moving_average(x, period);

    let detrended: Vec<f64> = x
        .iter()
        .zip(&trend)
        .map(|(v, t)| match method {
            DecompositionMethod::Additive => v - t,
            DecompositionMethod::Multiplicative => v / t,
        })
        .collect();

    // Phase averages of the detrended series
    let mut phase_sum = vec![0.0; period];
    let mut phase_count = vec![0usize; period];
    for (i, &d) in detrended.iter().enumerate() {
        if d.is_finite() {
            phase_sum[i % period] += d;
            phase_count[i % period] += 1;
        }
    }
    let mut phase_mean: Vec<f64> = phase_sum
        .iter()
        .zip(&phase_count)
        .map(|(s, &c)| if c > 0 { s / c as f64 } else { f64::NAN })
        .collect();

    // Normalize the seasonal pattern
    let finite_phases: Vec<f64> = phase_mean.iter().copied().filter(|v| v.is_finite()).collect();
    let grand = finite_phases.iter().sum::<f64>() / finite_phases.len().max(1) as f64;
    for value in phase_mean.iter_mut() {
        match method {
            DecompositionMethod::Additive => *value -= grand,
            DecompositionMethod::Multiplicative => *value /= grand,
        }
    }

    let seasonal: Vec<f64> = (0..n).map(|i| phase_mean[i % period]).collect();
    let residual: Vec<f64> = (0..n)
        .map(|i| match method {
            DecompositionMethod::Additive => x[i] - trend[i] - seasonal[i],
            DecompositionMethod::Multiplicative => x[i] / trend[i] / seasonal[i],
        })
        .collect();

    let var_detrended = variance(detrended.iter().copied());
    let var_residual = variance(residual.iter().copied());
    let var_total = variance(x.iter().copied());
    let var_seasonal_removed = variance(
        x.iter()
            .zip(&seasonal)
            .map(|(v, s)| match method {
                DecompositionMethod::Additive => v - s,
                DecompositionMethod::Multiplicative => v / s,
            }),
    );
    let seasonal_strength = if var_detrended > 0.0 {
        (1.0 - var_residual / var_detrended).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let trend_strength = if var_total > 0.0 && var_seasonal_removed > 0.0 {
        (1.0 - var_residual / var_seasonal_removed).clamp(0.0, 1.0)
    } else {
        0.0
    };

    Ok(DecompositionResult {
        trend,
        seasonal,
        residual,
        period,
        method,
        seasonal_strength,
        trend_strength,
    })
}
