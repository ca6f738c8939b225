//! Forecast Model Abstraction
//!
//! A uniform fit/predict/errors contract over heterogeneous estimators: the
//! univariate differenced autoregression in [`arima`] and the vector
//! autoregression in [`var`]. Models move through a simple lifecycle:
//! unfit, fitted via [`Forecaster::fit`], back to unfit via
//! [`Forecaster::clear`]. Every operation that needs a fit reports
//! [`Error::NotFitted`](crate::core::error::Error::NotFitted) otherwise.
//!
//! Fitted models own copies of the training arrays they were fit on; the
//! caller's arrays are never aliased after `fit` returns.

pub mod arima;
pub mod evaluate;
pub mod metrics;
pub mod var;

pub use arima::ArimaModel;
pub use evaluate::{evaluate, EvaluationResult, EvaluationRow, SampleKind};
pub use var::{IcKind, IcSelection, Lags, Trend, VarModel};

use crate::core::column::Column;
use crate::core::error::{Error, Result};
use crate::core::table::Table;
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Point forecast with confidence bounds, one row per horizon step and one
/// column per endogenous variable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast {
    /// Point forecasts, shape `(steps, k)`
    pub point: Array2<f64>,
    /// Lower confidence bounds
    pub lower: Array2<f64>,
    /// Upper confidence bounds
    pub upper: Array2<f64>,
    /// Confidence level in percent, `(1 - alpha) * 100`
    pub confidence_level: f64,
}

impl Forecast {
    /// First-column view as plain vectors, for univariate callers
    pub fn univariate(&self) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        (
            self.point.column(0).to_vec(),
            self.lower.column(0).to_vec(),
            self.upper.column(0).to_vec(),
        )
    }

    /// Render the forecast as a table, one row per horizon step and three
    /// columns per variable (point, lower, upper). `variable_names` must
    /// name each forecast column; the names usually come from the table
    /// the model was fit on.
    pub fn to_table(&self, variable_names: &[&str]) -> Result<Table> {
        if variable_names.len() != self.point.ncols() {
            return Err(Error::DimensionMismatch(format!(
                "{} names for {} forecast columns",
                variable_names.len(),
                self.point.ncols()
            )));
        }
        let mut columns = Vec::with_capacity(variable_names.len() * 3);
        for (c, name) in variable_names.iter().enumerate() {
            columns.push(Column::continuous(
                name.to_string(),
                self.point.column(c).to_vec(),
            ));
            columns.push(Column::continuous(
                format!("{} (lower)", name),
                self.lower.column(c).to_vec(),
            ));
            columns.push(Column::continuous(
                format!("{} (upper)", name),
                self.upper.column(c).to_vec(),
            ));
        }
        Table::new(columns)
    }
}

/// In-sample fit quality: the five accuracy metrics between the stored
/// training target and the fitted values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitErrors {
    pub rmse: Option<f64>,
    /// Median absolute error, reported under the historical `MAE` label
    pub mae: Option<f64>,
    pub mape: Option<f64>,
    pub pocid: Option<f64>,
    pub r2: Option<f64>,
}

/// The model contract shared by all forecasting estimators
pub trait Forecaster {
    /// Model display name
    fn name(&self) -> String;

    /// Largest lookback the model needs, used by evaluation preconditions
    fn max_order(&self) -> usize;

    /// Whether the model is in the fitted state
    fn is_fitted(&self) -> bool;

    /// Fit on endogenous data of shape `(n, k)` with optional exogenous
    /// data of the same row count. Refits in place when already fitted.
    fn fit(&mut self, endog: ArrayView2<f64>, exog: Option<ArrayView2<f64>>) -> Result<()>;

    /// Return to the unfit state
    fn clear(&mut self);

    /// Forecast `steps` ahead with confidence bounds at level
    /// `(1 - alpha) * 100` percent. Requires `0 < alpha < 1`.
    fn predict(
        &self,
        steps: usize,
        exog: Option<ArrayView2<f64>>,
        alpha: f64,
    ) -> Result<Forecast>;

    /// In-sample fitted values at the original level, shape `(n, k)`, with
    /// NaN rows where the model has no fitted value
    fn fitted_values(&self) -> Result<Array2<f64>>;

    /// The training endogenous data the model was fit on
    fn training_endog(&self) -> Result<ArrayView2<f64>>;

    /// AIC and BIC of the fit, when the estimator exposes them
    fn information_criteria(&self) -> Option<(f64, f64)>;

    /// Independent deep copy preserving the fit state
    fn copy_model(&self) -> Box<dyn Forecaster>;

    /// Training residuals: actual minus fitted, NaN where no fitted value
    fn residuals(&self) -> Result<Array2<f64>> {
        let actual = self.training_endog()?.to_owned();
        let fitted = self.fitted_values()?;
        Ok(&actual - &fitted)
    }

    /// In-sample accuracy of the target (first endogenous) column
    fn errors(&self) -> Result<FitErrors> {
        let actual = self.training_endog()?.column(0).to_vec();
        let fitted = self.fitted_values()?.column(0).to_vec();
        Ok(FitErrors {
            rmse: metrics::rmse(&actual, &fitted),
            mae: metrics::median_absolute_error(&actual, &fitted),
            mape: metrics::mape(&actual, &fitted),
            pocid: metrics::pocid(&actual, &fitted),
            r2: metrics::r_squared(&actual, &fitted),
        })
    }
}

/// Least-squares solve shared by the estimators. Reports a computation
/// error on a degenerate design instead of panicking.
pub(crate) fn least_squares(
    design: nalgebra::DMatrix<f64>,
    rhs: nalgebra::DMatrix<f64>,
) -> Result<nalgebra::DMatrix<f64>> {
    design
        .svd(true, true)
        .solve(&rhs, 1e-10)
        .map_err(|e| Error::Computation(format!("Least squares failed: {}", e)))
}

/// Two-sided standard normal quantile at confidence `1 - alpha`
pub(crate) fn normal_quantile(alpha: f64) -> Result<f64> {
    use statrs::distribution::{ContinuousCDF, Normal};
    let standard = Normal::new(0.0, 1.0)
        .map_err(|e| Error::Computation(format!("Normal distribution: {}", e)))?;
    Ok(standard.inverse_cdf(1.0 - alpha / 2.0))
}

pub(crate) fn check_alpha(alpha: f64) -> Result<()> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(Error::InvalidInput(format!(
            "Alpha must be strictly between 0 and 1, got {}",
            alpha
        )));
    }
    Ok(())
}

pub(crate) fn not_fitted(model: &str) -> Error {
    Error::NotFitted(format!("{} requires a call to fit() first", model))
}

fn columns_to_array(columns: &[&Column]) -> Array2<f64> {
    let n = columns.first().map(|c| c.len()).unwrap_or(0);
    Array2::from_shape_fn((n, columns.len()), |(r, c)| columns[c].data.values()[r])
}

/// Extract endogenous (target) and exogenous (feature) arrays from a table.
/// When no target column exists but features do, the roles swap and the
/// features become the series being modeled. Rows after the longest
/// fully-defined endogenous run starting at index 0 are trimmed.
pub fn extract_model_arrays(table: &Table) -> Result<(Array2<f64>, Option<Array2<f64>>)> {
    let targets: Vec<&Column> = table
        .targets()
        .into_iter()
        .filter(|c| c.data.is_continuous())
        .collect();
    let features: Vec<&Column> = table
        .features()
        .into_iter()
        .filter(|c| c.data.is_continuous())
        .collect();

    let (mut endog, mut exog) = (columns_to_array(&targets), {
        let arr = columns_to_array(&features);
        if arr.ncols() == 0 {
            None
        } else {
            Some(arr)
        }
    });
    if endog.ncols() == 0 {
        match exog.take() {
            Some(swapped) => endog = swapped,
            None => {
                return Err(Error::InvalidInput(
                    "Empty endogenous and exogenous series".to_string(),
                ))
            }
        }
    }

    // Longest fully-defined endogenous run from the start
    let n = endog.nrows();
    let defined_until = (0..n)
        .find(|&r| endog.row(r).iter().any(|v| !v.is_finite()))
        .unwrap_or(n);
    if defined_until == 0 {
        return Err(Error::InvalidInput(
            "Endogenous series has no defined leading values".to_string(),
        ));
    }
    let endog = endog.slice(ndarray::s![..defined_until, ..]).to_owned();
    let exog = exog.map(|e| e.slice(ndarray::s![..defined_until, ..]).to_owned());
    Ok((endog, exog))
}

/// Fit a model from a table, extracting endogenous and exogenous arrays per
/// [`extract_model_arrays`]. `use_exog` controls whether feature columns are
/// passed along at all.
pub fn fit_table(model: &mut dyn Forecaster, table: &Table, use_exog: bool) -> Result<()> {
    let (endog, exog) = extract_model_arrays(table)?;
    let exog_view = if use_exog { exog.as_ref() } else { None };
    model.fit(endog.view(), exog_view.map(|e| e.view()))
}
