//! Rolling-Origin Evaluation Harness
//!
//! Repeatedly refits each model on truncated training prefixes, forecasts a
//! fixed horizon, and pools the per-fold truths and predictions (earliest
//! fold first) into one set of accuracy metrics per model. A separate
//! in-sample row reports fit quality on the full series plus information
//! criteria where the estimator exposes them.
//!
//! A fold whose fit or predict fails is skipped without failing the whole
//! evaluation; the progress callback still fires exactly once for that fold
//! attempt. A model with no usable folds reports the error sentinel in
//! every metric cell.

use crate::core::error::{Error, Result};
use crate::core::table::Table;
use crate::forecast::{extract_model_arrays, metrics, Forecaster};
use ndarray::s;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which rows a result row describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleKind {
    /// Pooled rolling-origin forecasts
    OutOfSample,
    /// Fitted values on the full series
    InSample,
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleKind::OutOfSample => write!(f, "out-of-sample"),
            SampleKind::InSample => write!(f, "in-sample"),
        }
    }
}

/// One (model, sample) result row; `None` cells render as `err`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRow {
    pub model: String,
    pub sample: SampleKind,
    pub rmse: Option<f64>,
    /// Median absolute error under the historical `MAE` label
    pub mae: Option<f64>,
    pub mape: Option<f64>,
    pub pocid: Option<f64>,
    pub r2: Option<f64>,
    pub aic: Option<f64>,
    pub bic: Option<f64>,
}

/// Evaluation output: two rows per model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub rows: Vec<EvaluationRow>,
}

const ERR_SENTINEL: &str = "err";

fn cell(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.4}", v),
        _ => ERR_SENTINEL.to_string(),
    }
}

impl fmt::Display for EvaluationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<28} {:<14} {:>10} {:>10} {:>10} {:>10} {:>10} {:>12} {:>12}",
            "Model", "Sample", "RMSE", "MAE", "MAPE", "POCID", "R2", "AIC", "BIC"
        )?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<28} {:<14} {:>10} {:>10} {:>10} {:>10} {:>10} {:>12} {:>12}",
                row.model,
                row.sample.to_string(),
                cell(row.rmse),
                cell(row.mae),
                cell(row.mape),
                cell(row.pocid),
                cell(row.r2),
                cell(row.aic),
                cell(row.bic),
            )?;
        }
        Ok(())
    }
}

fn accuracy(actual: &[f64], predicted: &[f64]) -> [Option<f64>; 5] {
    [
        metrics::rmse(actual, predicted),
        metrics::median_absolute_error(actual, predicted),
        metrics::mape(actual, predicted),
        metrics::pocid(actual, predicted),
        metrics::r_squared(actual, predicted),
    ]
}

/// Rolling-origin evaluation of `models` against the table's target
/// variable. Fold `f` trains on all rows up to `f * horizon` from the end;
/// metrics pool every fold's horizon (earliest fold first).
pub fn evaluate(
    table: &Table,
    models: &mut [Box<dyn Forecaster>],
    n_folds: usize,
    horizon: usize,
    mut progress: Option<&mut dyn FnMut(f64)>,
) -> Result<EvaluationResult> {
    if table.targets().is_empty() {
        return Err(Error::InvalidInput(
            "Evaluation requires a target variable".to_string(),
        ));
    }
    if n_folds == 0 || horizon == 0 {
        return Err(Error::InvalidInput(
            "Fold count and forecast horizon must be at least 1".to_string(),
        ));
    }
    let (endog, exog) = extract_model_arrays(table)?;
    let n = endog.nrows();
    let max_order = models.iter().map(|m| m.max_order()).max().unwrap_or(0);
    if n_folds * horizon + max_order > n {
        return Err(Error::InvalidInput(format!(
            "Series of length {} is too short for {} folds of {} steps with model order {}",
            n, n_folds, horizon, max_order
        )));
    }

    let total_attempts = (models.len() * n_folds) as f64;
    let mut attempts = 0usize;
    let mut rows = Vec::with_capacity(models.len() * 2);

    for model in models.iter_mut() {
        let mut pooled_actual: Vec<f64> = Vec::new();
        let mut pooled_predicted: Vec<f64> = Vec::new();

        // Largest f first: the earliest training cut leads the pool
        for f in (1..=n_folds).rev() {
            let cut = n - f * horizon;
            let outcome = (|| -> Result<Vec<f64>> {
                let train = endog.slice(s![..cut, ..]);
                let train_exog = exog.as_ref().map(|x| x.slice(s![..cut, ..]));
                model.fit(train, train_exog)?;
                let future_exog = exog.as_ref().map(|x| x.slice(s![cut..cut + horizon, ..]));
                let forecast = model.predict(horizon, future_exog, 0.05)?;
                Ok(forecast.point.column(0).to_vec())
            })();
            if let Ok(predicted) = outcome {
                pooled_actual.extend(endog.slice(s![cut..cut + horizon, 0]).iter());
                pooled_predicted.extend(predicted);
            }
            attempts += 1;
            if let Some(cb) = progress.as_deref_mut() {
                cb(attempts as f64 / total_attempts);
            }
        }

        let [rmse, mae, mape, pocid, r2] = accuracy(&pooled_actual, &pooled_predicted);
        rows.push(EvaluationRow {
            model: model.name(),
            sample: SampleKind::OutOfSample,
            rmse,
            mae,
            mape,
            pocid,
            r2,
            aic: None,
            bic: None,
        });

        // In-sample: refit on the entire series
        let in_sample = (|| -> Result<([Option<f64>; 5], Option<(f64, f64)>)> {
            model.fit(endog.view(), exog.as_ref().map(|x| x.view()))?;
            let actual = model.training_endog()?.column(0).to_vec();
            let fitted = model.fitted_values()?.column(0).to_vec();
            Ok((accuracy(&actual, &fitted), model.information_criteria()))
        })();
        let (fit_accuracy, criteria) = match in_sample {
            Ok(value) => value,
            Err(_) => ([None; 5], None),
        };
        let [rmse, mae, mape, pocid, r2] = fit_accuracy;
        rows.push(EvaluationRow {
            model: model.name(),
            sample: SampleKind::InSample,
            rmse,
            mae,
            mape,
            pocid,
            r2,
            aic: criteria.map(|c| c.0),
            bic: criteria.map(|c| c.1),
        });
    }

    Ok(EvaluationResult { rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::column::{Column, Role};
    use crate::forecast::ArimaModel;

    fn target_table(n: usize) -> Table {
        let mut y = vec![10.0_f64];
        for t in 1..n {
            y.push(0.8 * y[t - 1] + 2.0 + ((t % 4) as f64 - 1.5) * 0.2);
        }
        Table::new(vec![Column::continuous("y", y).with_role(Role::Target)]).unwrap()
    }

    #[test]
    fn test_requires_target() {
        let table = Table::new(vec![Column::continuous("x", vec![1.0; 30])]).unwrap();
        let mut models: Vec<Box<dyn Forecaster>> = vec![Box::new(ArimaModel::new(1, 0, 0))];
        assert!(matches!(
            evaluate(&table, &mut models, 2, 3, None),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_series_too_short() {
        let table = target_table(10);
        let mut models: Vec<Box<dyn Forecaster>> = vec![Box::new(ArimaModel::new(2, 0, 0))];
        assert!(matches!(
            evaluate(&table, &mut models, 3, 3, None),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_row_count_and_progress() {
        let table = target_table(60);
        let mut models: Vec<Box<dyn Forecaster>> = vec![
            Box::new(ArimaModel::new(1, 0, 0)),
            Box::new(ArimaModel::new(2, 1, 0)),
        ];
        let mut calls = 0usize;
        let mut cb = |_: f64| calls += 1;
        let result = evaluate(&table, &mut models, 4, 3, Some(&mut cb)).unwrap();
        assert_eq!(result.rows.len(), 4);
        // One progress call per fold attempt
        assert_eq!(calls, 2 * 4);
        for row in &result.rows {
            if row.sample == SampleKind::OutOfSample {
                assert!(row.rmse.is_some());
                assert!(row.aic.is_none());
            } else {
                assert!(row.aic.is_some());
            }
        }
    }

    #[test]
    fn test_failing_model_reports_sentinels() {
        // The requested order can never fit the tiny training prefixes
        let table = target_table(24);
        let mut models: Vec<Box<dyn Forecaster>> = vec![Box::new(ArimaModel::new(5, 1, 4))];
        let result = evaluate(&table, &mut models, 3, 5, None).unwrap();
        let oos = &result.rows[0];
        assert_eq!(oos.sample, SampleKind::OutOfSample);
        assert!(oos.rmse.is_none());
        assert!(oos.r2.is_none());
    }

    #[test]
    fn test_display_renders_err_sentinel() {
        let result = EvaluationResult {
            rows: vec![EvaluationRow {
                model: "ARIMA(1,0,0)".to_string(),
                sample: SampleKind::OutOfSample,
                rmse: Some(1.0),
                mae: None,
                mape: None,
                pocid: None,
                r2: None,
                aic: None,
                bic: None,
            }],
        };
        let rendered = result.to_string();
        assert!(rendered.contains("err"));
        assert!(rendered.contains("1.0000"));
        assert!(rendered.lines().count() == 2); // header + one row
    }
}
