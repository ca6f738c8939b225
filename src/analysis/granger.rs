//! Granger Causality
//!
//! Pairwise predictive-causality screening over the continuous columns of a
//! table: for each ordered pair, an F-test compares the restricted
//! autoregression of the effect series against the regression augmented
//! with lags of the candidate cause. The largest lag whose test rejects at
//! the requested level is reported.
//!
//! A near-singular regression for a single pair is caught and recorded as
//! no causality rather than failing the screen; the progress callback fires
//! once per pair either way.

use crate::core::error::{Error, Result};
use crate::core::table::Table;
use crate::forecast::least_squares;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};

/// One detected predictive link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CausalLink {
    /// Name of the series whose lags improve the prediction
    pub cause: String,
    /// Name of the predicted series
    pub effect: String,
    /// Largest lag at which the test rejects
    pub lag: usize,
}

fn sse_of_regression(design: DMatrix<f64>, rhs: DMatrix<f64>) -> Result<f64> {
    let beta = least_squares(design.clone(), rhs.clone())?;
    let residuals = rhs - design * beta;
    Ok(residuals.iter().map(|e| e * e).sum())
}

/// F-test of lags `1..=lag` of `cause` improving the autoregression of
/// `effect`. Returns the p-value.
fn granger_test(effect: &[f64], cause: &[f64], lag: usize) -> Result<f64> {
    let n = effect.len();
    if n <= 2 * lag + 1 {
        return Err(Error::InsufficientData(format!(
            "{} observations cannot support a lag-{} causality test",
            n, lag
        )));
    }
    let rows = n - lag;
    let restricted = DMatrix::from_fn(rows, lag + 1, |r, c| {
        if c == 0 {
            1.0
        } else {
            effect[r + lag - c]
        }
    });
    let unrestricted = DMatrix::from_fn(rows, 2 * lag + 1, |r, c| {
        if c == 0 {
            1.0
        } else if c <= lag {
            effect[r + lag - c]
        } else {
            cause[r + lag - (c - lag)]
        }
    });
    let rhs = DMatrix::from_fn(rows, 1, |r, _| effect[r + lag]);

    let sse_restricted = sse_of_regression(restricted, rhs.clone())?;
    let sse_unrestricted = sse_of_regression(unrestricted, rhs)?;

    let df_denominator = rows as f64 - (2 * lag + 1) as f64;
    if df_denominator <= 0.0 || sse_unrestricted <= 0.0 {
        return Err(Error::Computation(
            "Degenerate causality regression".to_string(),
        ));
    }
    let f_statistic =
        ((sse_restricted - sse_unrestricted) / lag as f64) / (sse_unrestricted / df_denominator);
    if !f_statistic.is_finite() {
        return Err(Error::Computation(
            "Causality F statistic is undefined".to_string(),
        ));
    }
    let reference = FisherSnedecor::new(lag as f64, df_denominator)
        .map_err(|e| Error::Computation(format!("F distribution: {}", e)))?;
    Ok(1.0 - reference.cdf(f_statistic.max(0.0)))
}

/// Screen every ordered pair of continuous columns (the time variable
/// excluded) for Granger causality up to `max_lag`. `alpha` is the
/// rejection level; the progress callback is invoked once per pair.
pub fn granger_causality(
    table: &Table,
    max_lag: usize,
    alpha: f64,
    mut progress: Option<&mut dyn FnMut(f64)>,
) -> Result<Vec<CausalLink>> {
    if max_lag == 0 {
        return Err(Error::InvalidInput(
            "Causality screening needs a maximum lag of at least 1".to_string(),
        ));
    }
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(Error::InvalidInput(format!(
            "Alpha must be strictly between 0 and 1, got {}",
            alpha
        )));
    }
    let columns: Vec<(&str, &[f64])> = table
        .columns()
        .iter()
        .filter(|c| c.data.is_continuous() && !table.is_time_column(&c.name))
        .map(|c| (c.name.as_str(), c.data.values()))
        .collect();

    let total_pairs = (columns.len() * columns.len().saturating_sub(1)) as f64;
    let mut done = 0usize;
    let mut links = Vec::new();
    for &(cause_name, cause) in &columns {
        for &(effect_name, effect) in &columns {
            if cause_name == effect_name {
                continue;
            }
            // Largest rejecting lag wins; failed regressions count as none
            let mut found = 0usize;
            for lag in (1..=max_lag).rev() {
                match granger_test(effect, cause, lag) {
                    Ok(p) if p < alpha => {
                        found = lag;
                        break;
                    }
                    _ => {}
                }
            }
            if found > 0 {
                links.push(CausalLink {
                    cause: cause_name.to_string(),
                    effect: effect_name.to_string(),
                    lag: found,
                });
            }
            done += 1;
            if let Some(cb) = progress.as_deref_mut() {
                cb(done as f64 / total_pairs.max(1.0));
            }
        }
    }
    Ok(links)
}
