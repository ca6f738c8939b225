//! Interpolation Engine
//!
//! Fills missing values in a multi-column table. Continuous columns use the
//! configured 1-D method (linear, natural cubic spline, nearest neighbor, or
//! column mean); categorical columns always impute by most-frequent value,
//! or by nearest defined neighbor under the nearest method. An optional
//! multivariate pass estimates missing cells from the other continuous
//! columns by least squares before the univariate pass closes remaining
//! gaps.
//!
//! Columns with fewer than two defined values are left untouched: there is
//! nothing to interpolate between. Edges hold the boundary value unless the
//! extrapolating variant is requested.

use crate::core::column::ColumnData;
use crate::core::error::{Error, Result};
use crate::core::table::Table;
use crate::window::{mean_of, mode_of};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Supported 1-D interpolation methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterpolationMethod {
    /// Piecewise linear between defined neighbors
    Linear,
    /// Natural cubic spline through the defined points
    Cubic,
    /// Nearest defined neighbor by time distance
    Nearest,
    /// Column mean of the defined values
    Mean,
}

/// Interpolate every missing cell of a table. See the module docs for the
/// per-type rules. Operates on a copy; the input table is never mutated.
pub fn interpolate_table(
    table: &Table,
    method: InterpolationMethod,
    multivariate: bool,
) -> Result<Table> {
    interpolate_table_with_progress(table, method, multivariate, None)
}

/// [`interpolate_table`] with a progress callback invoked once per column
/// pass with the fraction complete.
pub fn interpolate_table_with_progress(
    table: &Table,
    method: InterpolationMethod,
    multivariate: bool,
    mut progress: Option<&mut dyn FnMut(f64)>,
) -> Result<Table> {
    let mut out = table.clone();
    let axis = time_axis(table);

    if multivariate {
        multivariate_fill(&mut out)?;
    }

    let names: Vec<String> = table.columns().iter().map(|c| c.name.clone()).collect();
    let total = names.len().max(1);
    for (done, name) in names.iter().enumerate() {
        if !table.is_time_column(name) {
            let col = out.column(name)?;
            let filled = match &col.data {
                ColumnData::Continuous(values) => {
                    ColumnData::Continuous(interpolate_series_with(&axis, values, method, false)?)
                }
                ColumnData::Categorical { codes, levels } => {
                    let imputed = match method {
                        InterpolationMethod::Nearest => nearest_fill(&axis, codes),
                        _ => mode_fill(codes),
                    };
                    ColumnData::Categorical {
                        codes: imputed,
                        levels: levels.clone(),
                    }
                }
            };
            out.replace_column_data(name, filled)?;
        }
        if let Some(cb) = progress.as_deref_mut() {
            cb((done + 1) as f64 / total as f64);
        }
    }
    Ok(out)
}

/// Interpolate a single series against a time axis. Columns with fewer than
/// two defined values come back unchanged.
pub fn interpolate_series(
    times: &[f64],
    values: &[f64],
    method: InterpolationMethod,
) -> Result<Vec<f64>> {
    interpolate_series_with(times, values, method, false)
}

/// [`interpolate_series`] with edge control: `extrapolate` extends the
/// first/last segment (or spline polynomial) beyond the defined range
/// instead of holding the boundary value.
pub fn interpolate_series_with(
    times: &[f64],
    values: &[f64],
    method: InterpolationMethod,
    extrapolate: bool,
) -> Result<Vec<f64>> {
    if times.len() != values.len() {
        return Err(Error::DimensionMismatch(format!(
            "Time axis has {} entries, values {}",
            times.len(),
            values.len()
        )));
    }
    let defined: Vec<(f64, f64)> = times
        .iter()
        .zip(values)
        .filter(|(t, v)| t.is_finite() && v.is_finite())
        .map(|(&t, &v)| (t, v))
        .collect();
    if defined.len() < 2 {
        return Ok(values.to_vec());
    }

    let mut out = values.to_vec();
    match method {
        InterpolationMethod::Mean => {
            let m = mean_of(values);
            for v in out.iter_mut().filter(|v| !v.is_finite()) {
                *v = m;
            }
        }
        InterpolationMethod::Nearest => {
            out = nearest_fill(times, values);
        }
        InterpolationMethod::Linear => {
            for (i, v) in out.iter_mut().enumerate() {
                if !v.is_finite() {
                    *v = linear_at(&defined, times[i], extrapolate);
                }
            }
        }
        InterpolationMethod::Cubic => {
            let spline = CubicSpline::fit(&defined)?;
            for (i, v) in out.iter_mut().enumerate() {
                if !v.is_finite() {
                    *v = spline.evaluate(times[i], extrapolate);
                }
            }
        }
    }
    Ok(out)
}

fn time_axis(table: &Table) -> Vec<f64> {
    match table.time_values() {
        Some(times) => times.to_vec(),
        None => (0..table.n_rows()).map(|i| i as f64).collect(),
    }
}

fn linear_at(defined: &[(f64, f64)], t: f64, extrapolate: bool) -> f64 {
    let (first, last) = (defined[0], defined[defined.len() - 1]);
    if t <= first.0 {
        return if extrapolate && defined.len() >= 2 {
            segment_value(defined[0], defined[1], t)
        } else {
            first.1
        };
    }
    if t >= last.0 {
        return if extrapolate && defined.len() >= 2 {
            segment_value(defined[defined.len() - 2], last, t)
        } else {
            last.1
        };
    }
    let hi = defined.partition_point(|(x, _)| *x < t);
    segment_value(defined[hi - 1], defined[hi], t)
}

fn segment_value(a: (f64, f64), b: (f64, f64), t: f64) -> f64 {
    if b.0 == a.0 {
        return a.1;
    }
    a.1 + (b.1 - a.1) * (t - a.0) / (b.0 - a.0)
}

fn nearest_fill(times: &[f64], values: &[f64]) -> Vec<f64> {
    let defined: Vec<(f64, f64)> = times
        .iter()
        .zip(values)
        .filter(|(t, v)| t.is_finite() && v.is_finite())
        .map(|(&t, &v)| (t, v))
        .collect();
    if defined.is_empty() {
        return values.to_vec();
    }
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            if v.is_finite() {
                v
            } else {
                defined
                    .iter()
                    .min_by(|a, b| {
                        let da = (a.0 - times[i]).abs();
                        let db = (b.0 - times[i]).abs();
                        da.partial_cmp(&db).unwrap()
                    })
                    .map(|(_, val)| *val)
                    .unwrap_or(v)
            }
        })
        .collect()
}

fn mode_fill(values: &[f64]) -> Vec<f64> {
    let m = mode_of(values);
    if m.is_nan() {
        return values.to_vec();
    }
    values
        .iter()
        .map(|&v| if v.is_finite() { v } else { m })
        .collect()
}

/// Estimate missing continuous cells from the other continuous columns by
/// ordinary least squares. Runs only when at least three continuous columns
/// have missing data; every remaining gap is closed by the univariate pass
/// that follows.
fn multivariate_fill(table: &mut Table) -> Result<()> {
    let continuous: Vec<String> = table
        .columns()
        .iter()
        .filter(|c| c.data.is_continuous() && !table.is_time_column(&c.name))
        .map(|c| c.name.clone())
        .collect();
    let gappy: Vec<&String> = continuous
        .iter()
        .filter(|name| table.column(name).map(|c| c.has_missing()).unwrap_or(false))
        .collect();
    if gappy.len() < 3 {
        return Ok(());
    }

    let n = table.n_rows();
    // Snapshot predictors with column means standing in for their own gaps
    let mut predictors: Vec<(String, Vec<f64>)> = Vec::new();
    for name in &continuous {
        let values = table.column(name)?.data.values().to_vec();
        let m = mean_of(&values);
        let filled: Vec<f64> = values
            .iter()
            .map(|&v| if v.is_finite() { v } else { m })
            .collect();
        predictors.push((name.clone(), filled));
    }

    for target_name in &gappy {
        let target = table.column(target_name)?.data.values().to_vec();
        let others: Vec<&Vec<f64>> = predictors
            .iter()
            .filter(|(name, _)| name != *target_name)
            .map(|(_, vals)| vals)
            .collect();
        if others.is_empty() {
            continue;
        }

        let train_rows: Vec<usize> = (0..n).filter(|&i| target[i].is_finite()).collect();
        if train_rows.len() <= others.len() + 1 {
            continue;
        }

        let design = DMatrix::from_fn(train_rows.len(), others.len() + 1, |r, c| {
            if c == 0 {
                1.0
            } else {
                others[c - 1][train_rows[r]]
            }
        });
        let rhs = DVector::from_fn(train_rows.len(), |r, _| target[train_rows[r]]);
        let coefs = match design.svd(true, true).solve(&rhs, 1e-10) {
            Ok(c) => c,
            // Degenerate predictors: leave the gaps for the univariate pass
            Err(_) => continue,
        };

        let mut filled = target.clone();
        for (i, v) in filled.iter_mut().enumerate() {
            if !v.is_finite() {
                let mut estimate = coefs[0];
                for (c, other) in others.iter().enumerate() {
                    estimate += coefs[c + 1] * other[i];
                }
                *v = estimate;
            }
        }
        table.replace_column_data(target_name, ColumnData::Continuous(filled))?;
    }
    Ok(())
}

/// Natural cubic spline through strictly increasing knots
struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    second: Vec<f64>,
}

impl CubicSpline {
    fn fit(points: &[(f64, f64)]) -> Result<Self> {
        let mut sorted = points.to_vec();
        sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        sorted.dedup_by(|a, b| a.0 == b.0);
        let n = sorted.len();
        if n < 2 {
            return Err(Error::InsufficientData(
                "Cubic spline needs at least two distinct points".to_string(),
            ));
        }
        let xs: Vec<f64> = sorted.iter().map(|p| p.0).collect();
        let ys: Vec<f64> = sorted.iter().map(|p| p.1).collect();
        if n == 2 {
            return Ok(Self {
                xs,
                ys,
                second: vec![0.0, 0.0],
            });
        }

        // Tridiagonal system for the interior second derivatives; the
        // natural boundary pins both ends to zero.
        let dim = n - 2;
        let mut matrix = DMatrix::zeros(dim, dim);
        let mut rhs = DVector::zeros(dim);
        for i in 0..dim {
            let h0 = xs[i + 1] - xs[i];
            let h1 = xs[i + 2] - xs[i + 1];
            matrix[(i, i)] = 2.0 * (h0 + h1);
            if i > 0 {
                matrix[(i, i - 1)] = h0;
            }
            if i + 1 < dim {
                matrix[(i, i + 1)] = h1;
            }
            rhs[i] = 6.0 * ((ys[i + 2] - ys[i + 1]) / h1 - (ys[i + 1] - ys[i]) / h0);
        }
        let interior = matrix
            .lu()
            .solve(&rhs)
            .ok_or_else(|| Error::Computation("Cubic spline system is singular".to_string()))?;

        let mut second = vec![0.0; n];
        for i in 0..dim {
            second[i + 1] = interior[i];
        }
        Ok(Self { xs, ys, second })
    }

    fn evaluate(&self, t: f64, extrapolate: bool) -> f64 {
        let n = self.xs.len();
        if t <= self.xs[0] {
            if !extrapolate {
                return self.ys[0];
            }
            return self.segment(0, t);
        }
        if t >= self.xs[n - 1] {
            if !extrapolate {
                return self.ys[n - 1];
            }
            return self.segment(n - 2, t);
        }
        let hi = self.xs.partition_point(|x| *x < t).max(1);
        self.segment(hi - 1, t)
    }

    fn segment(&self, i: usize, t: f64) -> f64 {
        let h = self.xs[i + 1] - self.xs[i];
        let a = (self.xs[i + 1] - t) / h;
        let b = (t - self.xs[i]) / h;
        a * self.ys[i]
            + b * self.ys[i + 1]
            + ((a * a * a - a) * self.second[i] + (b * b * b - b) * self.second[i + 1]) * h * h
                / 6.0
    }
}
