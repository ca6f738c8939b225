//! Periodogram Analysis
//!
//! Power spectral density for equispaced series via FFT and for irregularly
//! sampled series via the Lomb-Scargle formulation. Both report candidate
//! seasonal periods as the significant local maxima of the spectrum.

use crate::core::error::{Error, Result};
use crate::forecast::least_squares;
use nalgebra::DMatrix;
use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};

/// Detrending applied before the spectrum is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Detrend {
    /// Use the series as-is
    None,
    /// First differences
    Diff,
    /// Subtract a fitted polynomial of this order
    Poly(usize),
}

/// Spectrum peaks: candidate periods with their spectral power
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Periodogram {
    /// Periods in samples (FFT) or time units (Lomb-Scargle), strongest first
    pub periods: Vec<f64>,
    /// Power at each period
    pub power: Vec<f64>,
}

impl Periodogram {
    /// The strongest period, if any peak was significant
    pub fn dominant_period(&self) -> Option<f64> {
        self.periods.first().copied()
    }
}

/// Indices that are strict local maxima over a window of `order` samples on
/// each side; no two selected maxima can sit closer than the window
pub(crate) fn significant_peaks(values: &[f64], order: usize) -> Vec<usize> {
    let n = values.len();
    (0..n)
        .filter(|&i| {
            let lo = i.saturating_sub(order);
            let hi = (i + order + 1).min(n);
            values[i].is_finite()
                && (lo..hi).all(|j| j == i || values[j] < values[i])
        })
        .collect()
}

fn remove_polynomial(x: &[f64], order: usize) -> Result<Vec<f64>> {
    let n = x.len();
    let design = DMatrix::from_fn(n, order + 1, |r, c| (r as f64).powi(c as i32));
    let rhs = DMatrix::from_fn(n, 1, |r, _| x[r]);
    let coefs = least_squares(design, rhs)?;
    Ok(x.iter()
        .enumerate()
        .map(|(r, v)| {
            let mut trend = 0.0;
            for c in 0..=order {
                trend += coefs[(c, 0)] * (r as f64).powi(c as i32);
            }
            v - trend
        })
        .collect())
}

/// FFT power spectral density of an equispaced series, reduced to the
/// significant periods. The lowest `len / 1000` frequency bins are
/// discarded as numerically unstable for long series, the spectrum is
/// min-max normalized, and peaks must be local maxima over a five-sample
/// window on each side.
pub fn periodogram(x: &[f64], detrend: Detrend) -> Result<Periodogram> {
    if x.len() < 8 {
        return Err(Error::InsufficientData(
            "Periodogram needs at least 8 observations".to_string(),
        ));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(Error::InvalidInput(
            "Series contains undefined values".to_string(),
        ));
    }
    let detrended = match detrend {
        Detrend::None => x.to_vec(),
        Detrend::Diff => x.windows(2).map(|p| p[1] - p[0]).collect(),
        Detrend::Poly(order) => remove_polynomial(x, order)?,
    };
    let n = detrended.len();

    let mut buffer: Vec<Complex<f64>> = detrended
        .iter()
        .map(|&v| Complex::new(v, 0.0))
        .collect();
    FftPlanner::new().plan_fft_forward(n).process(&mut buffer);

    // One-sided spectrum without the zero-frequency bin
    let half = n / 2;
    let discard = x.len() / 1000;
    let mut freqs = Vec::with_capacity(half);
    let mut power = Vec::with_capacity(half);
    for j in (1 + discard)..=half {
        freqs.push(j as f64 / n as f64);
        power.push(buffer[j].norm_sqr() / n as f64);
    }
    if power.is_empty() {
        return Ok(Periodogram {
            periods: Vec::new(),
            power: Vec::new(),
        });
    }

    // Min-max normalize to [0, 1]
    let max = power.iter().cloned().fold(f64::MIN, f64::max);
    let min = power.iter().cloned().fold(f64::MAX, f64::min);
    let range = (max - min).max(f64::MIN_POSITIVE);
    for p in power.iter_mut() {
        *p = (*p - min) / range;
    }

    let mut peaks: Vec<(f64, f64)> = significant_peaks(&power, 5)
        .into_iter()
        .map(|i| (1.0 / freqs[i], power[i]))
        .collect();
    peaks.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

    Ok(Periodogram {
        periods: peaks.iter().map(|p| p.0).collect(),
        power: peaks.iter().map(|p| p.1).collect(),
    })
}

fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
    }
}

/// Lomb-Scargle periodogram for irregularly sampled series. The default
/// period grid spans the 5th to 80th percentile of the inter-sample gaps,
/// with the high end raised to at least 200 times the low end; power is
/// normalized by `2 / (n * var(x))` and reduced to significant peaks.
pub fn lomb_scargle_periodogram(
    times: &[f64],
    x: &[f64],
    periods: Option<&[f64]>,
) -> Result<Periodogram> {
    if times.len() != x.len() {
        return Err(Error::DimensionMismatch(format!(
            "Time axis has {} entries, values {}",
            times.len(),
            x.len()
        )));
    }
    let points: Vec<(f64, f64)> = times
        .iter()
        .zip(x)
        .filter(|(t, v)| t.is_finite() && v.is_finite())
        .map(|(&t, &v)| (t, v))
        .collect();
    let n = points.len();
    if n < 8 {
        return Err(Error::InsufficientData(
            "Lomb-Scargle needs at least 8 defined observations".to_string(),
        ));
    }

    let grid: Vec<f64> = match periods {
        Some(p) => p.to_vec(),
        None => {
            let mut gaps: Vec<f64> = points
                .windows(2)
                .map(|w| w[1].0 - w[0].0)
                .filter(|g| *g > 0.0)
                .collect();
            if gaps.is_empty() {
                return Err(Error::InvalidInput(
                    "Time axis has no positive gaps".to_string(),
                ));
            }
            gaps.sort_by(|a, b| a.partial_cmp(b).unwrap());
            let lo = percentile(&gaps, 5.0);
            let mut hi = percentile(&gaps, 80.0);
            if hi < 200.0 * lo {
                hi = 200.0 * lo;
            }
            let steps = 1000;
            (0..steps)
                .map(|i| lo + (hi - lo) * i as f64 / (steps - 1) as f64)
                .collect()
        }
    };

    let mean = points.iter().map(|p| p.1).sum::<f64>() / n as f64;
    let variance = points
        .iter()
        .map(|p| (p.1 - mean) * (p.1 - mean))
        .sum::<f64>()
        / n as f64;
    if variance == 0.0 {
        return Err(Error::Computation(
            "Series has zero variance".to_string(),
        ));
    }

    let mut power: Vec<f64> = Vec::with_capacity(grid.len());
    for &period in &grid {
        let omega = 2.0 * std::f64::consts::PI / period;
        // Scargle's phase shift makes the two quadratures orthogonal
        let (mut s2, mut c2) = (0.0, 0.0);
        for &(t, _) in &points {
            s2 += (2.0 * omega * t).sin();
            c2 += (2.0 * omega * t).cos();
        }
        let tau = s2.atan2(c2) / (2.0 * omega);
        let (mut cy, mut sy, mut cc, mut ss) = (0.0, 0.0, 0.0, 0.0);
        for &(t, v) in &points {
            let arg = omega * (t - tau);
            let (sin, cos) = arg.sin_cos();
            cy += (v - mean) * cos;
            sy += (v - mean) * sin;
            cc += cos * cos;
            ss += sin * sin;
        }
        let raw = 0.5 * (cy * cy / cc.max(f64::MIN_POSITIVE) + sy * sy / ss.max(f64::MIN_POSITIVE));
        power.push(raw * 2.0 / (n as f64 * variance));
    }

    let mut peaks: Vec<(f64, f64)> = significant_peaks(&power, 5)
        .into_iter()
        .map(|i| (grid[i], power[i]))
        .collect();
    peaks.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

    Ok(Periodogram {
        periods: peaks.iter().map(|p| p.0).collect(),
        power: peaks.iter().map(|p| p.1).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_monthly_series_dominant_period() {
        // 144 monthly points with annual seasonality
        let x: Vec<f64> = (0..144)
            .map(|t| 10.0 + (2.0 * PI * t as f64 / 12.0).sin() * 3.0)
            .collect();
        let result = periodogram(&x, Detrend::None).unwrap();
        let dominant = result.dominant_period().unwrap();
        assert_eq!(dominant.round(), 12.0);
        assert!((result.power[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_detrended_periodogram() {
        let x: Vec<f64> = (0..200)
            .map(|t| 0.5 * t as f64 + (2.0 * PI * t as f64 / 20.0).sin() * 2.0)
            .collect();
        let result = periodogram(&x, Detrend::Poly(1)).unwrap();
        assert_eq!(result.dominant_period().unwrap().round(), 20.0);
    }

    #[test]
    fn test_short_series_rejected() {
        assert!(matches!(
            periodogram(&[1.0, 2.0, 3.0], Detrend::None),
            Err(Error::InsufficientData(_))
        ));
    }

    #[test]
    fn test_peak_separation() {
        // A plateau produces no strict local maximum
        let flat = vec![1.0; 20];
        assert!(significant_peaks(&flat, 5).is_empty());
        let mut spiky = vec![0.0; 21];
        spiky[10] = 1.0;
        assert_eq!(significant_peaks(&spiky, 5), vec![10]);
    }

    #[test]
    fn test_lomb_scargle_recovers_period() {
        // Irregularly thinned sampling of a sinusoid of period 8
        let times: Vec<f64> = (0..160)
            .filter(|t| t % 7 != 3)
            .map(|t| t as f64)
            .collect();
        let x: Vec<f64> = times
            .iter()
            .map(|&t| (2.0 * PI * t / 8.0).sin())
            .collect();
        let result = lomb_scargle_periodogram(&times, &x, None).unwrap();
        let dominant = result.dominant_period().unwrap();
        assert!((dominant - 8.0).abs() < 0.5);
        // Unit-amplitude sinusoid normalizes to a peak near one
        assert!(result.power[0] > 0.5);
    }

    #[test]
    fn test_lomb_scargle_explicit_grid() {
        let times: Vec<f64> = (0..100).map(|t| t as f64).collect();
        let x: Vec<f64> = times.iter().map(|&t| (2.0 * PI * t / 10.0).sin()).collect();
        let grid: Vec<f64> = (2..50).map(|p| p as f64).collect();
        let result = lomb_scargle_periodogram(&times, &x, Some(&grid)).unwrap();
        assert_eq!(result.dominant_period().unwrap(), 10.0);
    }
}
