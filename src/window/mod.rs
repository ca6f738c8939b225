//! Windowing Primitives
//!
//! Fixed-width, fixed-shift sliding windows over a 1-D numeric slice, plus
//! the specialized fast paths the aggregation catalogue builds on: a single
//! cumulative-sum pass for moving sums and counts, weighted windows with
//! NaN-aware weight renormalization, and NaN-skipping cumulative reductions.
//!
//! Window `i` covers `x[i*shift .. i*shift + width]`; the number of windows
//! is `1 + (n - width) / shift` when `width <= n` and zero otherwise. A
//! too-wide window yields an empty result, never an error; `width` or
//! `shift` of zero is a caller error.

use crate::core::error::{Error, Result};
use ndarray::Array2;

fn check_params(width: usize, shift: usize) -> Result<()> {
    if width == 0 {
        return Err(Error::InvalidInput(
            "Window width must be at least 1".to_string(),
        ));
    }
    if shift == 0 {
        return Err(Error::InvalidInput(
            "Window shift must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Number of windows of `width` advancing by `shift` over `n` elements
pub fn window_count(n: usize, width: usize, shift: usize) -> usize {
    if width == 0 || shift == 0 || width > n {
        0
    } else {
        1 + (n - width) / shift
    }
}

/// Iterate windows as borrowed subslices, no copying
pub fn windows_of<'a>(
    x: &'a [f64],
    width: usize,
    shift: usize,
) -> Result<impl Iterator<Item = &'a [f64]>> {
    check_params(width, shift)?;
    let m = window_count(x.len(), width, shift);
    Ok((0..m).map(move |i| &x[i * shift..i * shift + width]))
}

/// Apply a per-window reducer to every window
pub fn windowed_apply<F: Fn(&[f64]) -> f64>(
    x: &[f64],
    width: usize,
    shift: usize,
    reduce: F,
) -> Result<Vec<f64>> {
    Ok(windows_of(x, width, shift)?.map(|w| reduce(w)).collect())
}

/// Materialize windows into an `(num_windows, width)` layout. Used by the
/// weighted and NaN-aware paths that need 2-D access.
pub fn windowed(x: &[f64], width: usize, shift: usize) -> Result<Array2<f64>> {
    check_params(width, shift)?;
    let m = window_count(x.len(), width, shift);
    let mut out = Array2::zeros((m, width));
    for i in 0..m {
        let src = &x[i * shift..i * shift + width];
        out.row_mut(i)
            .iter_mut()
            .zip(src.iter())
            .for_each(|(dst, &v)| *dst = v);
    }
    Ok(out)
}

/// Moving sum via a single forward cumulative-sum pass. NaNs count as zero,
/// matching a NaN-ignoring sum over each window.
pub fn moving_sum(x: &[f64], width: usize, shift: usize) -> Result<Vec<f64>> {
    check_params(width, shift)?;
    let n = x.len();
    let m = window_count(n, width, shift);
    if m == 0 {
        return Ok(Vec::new());
    }
    // cum[i] = sum of the first i elements, NaN as zero
    let mut cum = Vec::with_capacity(n + 1);
    cum.push(0.0);
    let mut acc = 0.0;
    for &v in x {
        if v.is_finite() {
            acc += v;
        }
        cum.push(acc);
    }
    Ok((0..m)
        .map(|i| cum[i * shift + width] - cum[i * shift])
        .collect())
}

/// Count of finite elements per window
pub fn moving_count_defined(x: &[f64], width: usize, shift: usize) -> Result<Vec<f64>> {
    let recoded: Vec<f64> = x
        .iter()
        .map(|v| if v.is_finite() { 1.0 } else { 0.0 })
        .collect();
    moving_sum(&recoded, width, shift)
}

/// Count of finite, nonzero elements per window
pub fn moving_count_nonzero(x: &[f64], width: usize, shift: usize) -> Result<Vec<f64>> {
    let recoded: Vec<f64> = x
        .iter()
        .map(|v| if v.is_finite() && *v != 0.0 { 1.0 } else { 0.0 })
        .collect();
    moving_sum(&recoded, width, shift)
}

/// Weighted window sum over the materialized 2-D layout. The window width
/// is the weight count. Weights at NaN positions are zeroed and the
/// remaining weights rescaled so their total is preserved; a window with
/// every weight masked yields NaN.
pub fn windowed_weighted(x: &[f64], weights: &[f64], shift: usize) -> Result<Vec<f64>> {
    let width = weights.len();
    let layout = windowed(x, width, shift)?;
    let total: f64 = weights.iter().sum();
    Ok(layout
        .rows()
        .into_iter()
        .map(|row| {
            let active: f64 = row
                .iter()
                .zip(weights)
                .filter(|(v, _)| v.is_finite())
                .map(|(_, wt)| wt)
                .sum();
            if active == 0.0 {
                return f64::NAN;
            }
            let scale = total / active;
            row.iter()
                .zip(weights)
                .filter(|(v, _)| v.is_finite())
                .map(|(v, wt)| v * wt * scale)
                .sum()
        })
        .collect())
}

/// Linear moving average: weights `1..=width` normalized to sum one, the
/// most recent element weighted highest
pub fn windowed_linear_ma(x: &[f64], width: usize, shift: usize) -> Result<Vec<f64>> {
    check_params(width, shift)?;
    let total = (width * (width + 1)) as f64 / 2.0;
    let weights: Vec<f64> = (1..=width).map(|k| k as f64 / total).collect();
    windowed_weighted(x, &weights, shift)
}

/// Exponential moving average: weights `alpha * (1 - alpha)^k` with
/// `alpha = 2 / (width + 1)`, normalized to sum one, most recent highest
pub fn windowed_exponential_ma(x: &[f64], width: usize, shift: usize) -> Result<Vec<f64>> {
    check_params(width, shift)?;
    let alpha = 2.0 / (width as f64 + 1.0);
    let mut weights: Vec<f64> = (0..width)
        .map(|pos| alpha * (1.0 - alpha).powi((width - 1 - pos) as i32))
        .collect();
    let total: f64 = weights.iter().sum();
    weights.iter_mut().for_each(|w| *w /= total);
    windowed_weighted(x, &weights, shift)
}

/// NaN-skipping running total sampled at indices `width-1, width-1+shift,
/// ...`, a cumulative reduction rather than a fixed-width window
pub fn windowed_cumsum(x: &[f64], width: usize, shift: usize) -> Result<Vec<f64>> {
    check_params(width, shift)?;
    let m = window_count(x.len(), width, shift);
    let mut out = Vec::with_capacity(m);
    let mut acc = 0.0;
    for (i, &v) in x.iter().enumerate() {
        if v.is_finite() {
            acc += v;
        }
        if i + 1 >= width && (i + 1 - width) % shift == 0 && out.len() < m {
            out.push(acc);
        }
    }
    Ok(out)
}

/// NaN-skipping running product sampled like [`windowed_cumsum`]
pub fn windowed_cumprod(x: &[f64], width: usize, shift: usize) -> Result<Vec<f64>> {
    check_params(width, shift)?;
    let m = window_count(x.len(), width, shift);
    let mut out = Vec::with_capacity(m);
    let mut acc = 1.0;
    for (i, &v) in x.iter().enumerate() {
        if v.is_finite() {
            acc *= v;
        }
        if i + 1 >= width && (i + 1 - width) % shift == 0 && out.len() < m {
            out.push(acc);
        }
    }
    Ok(out)
}

/// Majority value per window, ignoring NaNs; all-NaN windows yield NaN
pub fn windowed_mode(x: &[f64], width: usize, shift: usize) -> Result<Vec<f64>> {
    windowed_apply(x, width, shift, mode_of)
}

/// Harmonic mean per window. Windows containing non-positive values yield
/// NaN instead of failing the whole batch.
pub fn windowed_harmonic_mean(x: &[f64], width: usize, shift: usize) -> Result<Vec<f64>> {
    windowed_apply(x, width, shift, harmonic_mean_of)
}

/// Max minus min per window, NaN-ignoring
pub fn windowed_span(x: &[f64], width: usize, shift: usize) -> Result<Vec<f64>> {
    windowed_apply(x, width, shift, span_of)
}

// NaN-ignoring scalar reducers shared with the aggregation catalogue.

pub(crate) fn finite(values: &[f64]) -> impl Iterator<Item = f64> + '_ {
    values.iter().copied().filter(|v| v.is_finite())
}

pub(crate) fn sum_of(values: &[f64]) -> f64 {
    finite(values).sum()
}

pub(crate) fn mean_of(values: &[f64]) -> f64 {
    let (mut sum, mut count) = (0.0, 0usize);
    for v in finite(values) {
        sum += v;
        count += 1;
    }
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

pub(crate) fn min_of(values: &[f64]) -> f64 {
    finite(values).fold(f64::NAN, |acc, v| if acc.is_nan() || v < acc { v } else { acc })
}

pub(crate) fn max_of(values: &[f64]) -> f64 {
    finite(values).fold(f64::NAN, |acc, v| if acc.is_nan() || v > acc { v } else { acc })
}

pub(crate) fn span_of(values: &[f64]) -> f64 {
    max_of(values) - min_of(values)
}

pub(crate) fn product_of(values: &[f64]) -> f64 {
    finite(values).product()
}

pub(crate) fn median_of(values: &[f64]) -> f64 {
    let mut v: Vec<f64> = finite(values).collect();
    if v.is_empty() {
        return f64::NAN;
    }
    v.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = v.len() / 2;
    if v.len() % 2 == 0 {
        (v[mid - 1] + v[mid]) / 2.0
    } else {
        v[mid]
    }
}

/// Population variance of the finite entries
pub(crate) fn variance_of(values: &[f64]) -> f64 {
    let m = mean_of(values);
    if m.is_nan() {
        return f64::NAN;
    }
    let (mut sum, mut count) = (0.0, 0usize);
    for v in finite(values) {
        sum += (v - m) * (v - m);
        count += 1;
    }
    sum / count as f64
}

pub(crate) fn std_of(values: &[f64]) -> f64 {
    variance_of(values).sqrt()
}

pub(crate) fn geometric_mean_of(values: &[f64]) -> f64 {
    let (mut sum, mut count) = (0.0, 0usize);
    for v in finite(values) {
        if v <= 0.0 {
            return f64::NAN;
        }
        sum += v.ln();
        count += 1;
    }
    if count == 0 {
        f64::NAN
    } else {
        (sum / count as f64).exp()
    }
}

pub(crate) fn harmonic_mean_of(values: &[f64]) -> f64 {
    let (mut sum, mut count) = (0.0, 0usize);
    for v in finite(values) {
        if v <= 0.0 {
            return f64::NAN;
        }
        sum += 1.0 / v;
        count += 1;
    }
    if count == 0 {
        f64::NAN
    } else {
        count as f64 / sum
    }
}

pub(crate) fn mode_of(values: &[f64]) -> f64 {
    let mut sorted: Vec<f64> = finite(values).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    // Runs of equal values in sorted order; ties resolve to the smallest
    let (mut best, mut best_count) = (sorted[0], 1usize);
    let (mut current, mut count) = (sorted[0], 1usize);
    for &v in &sorted[1..] {
        if v == current {
            count += 1;
        } else {
            current = v;
            count = 1;
        }
        if count > best_count {
            best = current;
            best_count = count;
        }
    }
    best
}

pub(crate) fn count_defined_of(values: &[f64]) -> f64 {
    finite(values).count() as f64
}

pub(crate) fn count_nonzero_of(values: &[f64]) -> f64 {
    finite(values).filter(|v| *v != 0.0).count() as f64
}
