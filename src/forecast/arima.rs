//! Differenced Autoregression Model
//!
//! Autoregressive-integrated-moving-average estimation for a univariate
//! series with optional exogenous regressors. Estimation follows the
//! two-stage Hannan-Rissanen scheme: a long autoregression supplies a
//! residual proxy, then one least-squares pass regresses the differenced
//! series on its own lags, the residual lags and any exogenous inputs.
//!
//! Fitted values are reported at the original (undifferenced) level.
//! Forecast intervals come from the cumulated psi weights of the implied
//! ARMA recursion, widened through each order of integration.

use crate::core::error::{Error, Result};
use crate::forecast::{
    check_alpha, least_squares, normal_quantile, not_fitted, Forecast, Forecaster,
};
use nalgebra::DMatrix;
use ndarray::{Array2, ArrayView2};

/// ARIMA-family forecasting model with caller-controlled exogenous use
#[derive(Debug, Clone)]
pub struct ArimaModel {
    order: (usize, usize, usize),
    use_exog: bool,
    state: Option<FittedArima>,
}

#[derive(Debug, Clone)]
struct FittedArima {
    intercept: f64,
    ar: Vec<f64>,
    ma: Vec<f64>,
    exog_coef: Vec<f64>,
    endog: Array2<f64>,
    diffed: Vec<f64>,
    resid: Vec<f64>,
    fitted: Array2<f64>,
    sigma2: f64,
    aic: f64,
    bic: f64,
}

impl ArimaModel {
    /// Create an unfit model of the given `(p, d, q)` order
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self {
            order: (p, d, q),
            use_exog: false,
            state: None,
        }
    }

    /// Toggle exogenous input. When disabled, exogenous data supplied to
    /// `fit` or `predict` is ignored.
    pub fn with_exog(mut self, use_exog: bool) -> Self {
        self.use_exog = use_exog;
        self
    }

    /// The `(p, d, q)` order
    pub fn order(&self) -> (usize, usize, usize) {
        self.order
    }

    fn fitted_state(&self) -> Result<&FittedArima> {
        self.state.as_ref().ok_or_else(|| not_fitted(&self.name()))
    }
}

/// Apply `d`-fold first differencing
fn difference(y: &[f64], d: usize) -> Vec<f64> {
    let mut w = y.to_vec();
    for _ in 0..d {
        w = w.windows(2).map(|p| p[1] - p[0]).collect();
    }
    w
}

/// Binomial coefficients `C(d, j)` for `j = 0..=d`
fn binomial_row(d: usize) -> Vec<f64> {
    let mut row = vec![1.0];
    for j in 1..=d {
        let prev = row[j - 1];
        row.push(prev * (d - j + 1) as f64 / j as f64);
    }
    row
}

/// Reconstruct a level value from a differenced value and the `d` previous
/// levels: `y_t = w + sum_{j=1..d} (-1)^(j+1) C(d,j) y_{t-j}`
fn undifference(w: f64, previous: &[f64], binom: &[f64]) -> f64 {
    let d = binom.len() - 1;
    let mut level = w;
    for j in 1..=d {
        let sign = if j % 2 == 1 { 1.0 } else { -1.0 };
        level += sign * binom[j] * previous[previous.len() - j];
    }
    level
}

impl Forecaster for ArimaModel {
    fn name(&self) -> String {
        let (p, d, q) = self.order;
        if self.use_exog {
            format!("ARIMA({},{},{}) with exogenous", p, d, q)
        } else {
            format!("ARIMA({},{},{})", p, d, q)
        }
    }

    fn max_order(&self) -> usize {
        let (p, d, q) = self.order;
        p.max(d).max(q)
    }

    fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    fn fit(&mut self, endog: ArrayView2<f64>, exog: Option<ArrayView2<f64>>) -> Result<()> {
        let (p, d, q) = self.order;
        if endog.ncols() != 1 {
            return Err(Error::InvalidInput(format!(
                "{} models a single series, got {} columns",
                self.name(),
                endog.ncols()
            )));
        }
        let y: Vec<f64> = endog.column(0).to_vec();
        if y.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidInput(
                "Endogenous series contains undefined values".to_string(),
            ));
        }
        let exog = if self.use_exog { exog } else { None };
        if let Some(x) = exog {
            if x.nrows() != y.len() {
                return Err(Error::DimensionMismatch(format!(
                    "Exogenous rows {} do not match endogenous rows {}",
                    x.nrows(),
                    y.len()
                )));
            }
        }

        let w = difference(&y, d);
        let n_exog = exog.map(|x| x.ncols()).unwrap_or(0);
        let n_params = 1 + p + q + n_exog;

        // Residual proxy from a long autoregression when an MA part exists
        let long = if q > 0 {
            (p + q + 2).min(w.len() / 3)
        } else {
            0
        };
        let start = p.max(long + q);
        if w.len() <= start + n_params {
            return Err(Error::InsufficientData(format!(
                "Series of length {} is too short for {}",
                y.len(),
                self.name()
            )));
        }

        let mut proxy = vec![0.0; w.len()];
        if q > 0 {
            let rows = w.len() - long;
            let design = DMatrix::from_fn(rows, long + 1, |r, c| {
                if c == 0 {
                    1.0
                } else {
                    w[r + long - c]
                }
            });
            let rhs = DMatrix::from_fn(rows, 1, |r, _| w[r + long]);
            let coefs = least_squares(design, rhs)?;
            for t in long..w.len() {
                let mut pred = coefs[(0, 0)];
                for i in 1..=long {
                    pred += coefs[(i, 0)] * w[t - i];
                }
                proxy[t] = w[t] - pred;
            }
        }

        // Main regression: AR lags, residual-proxy lags, exogenous inputs
        let rows = w.len() - start;
        let design = DMatrix::from_fn(rows, n_params, |r, c| {
            let t = r + start;
            if c == 0 {
                1.0
            } else if c <= p {
                w[t - c]
            } else if c <= p + q {
                proxy[t - (c - p)]
            } else {
                // Exogenous inputs are aligned with the differenced series
                exog.map(|x| x[[t + d, c - p - q - 1]]).unwrap_or(0.0)
            }
        });
        let rhs = DMatrix::from_fn(rows, 1, |r, _| w[r + start]);
        let coefs = least_squares(design, rhs)?;

        let intercept = coefs[(0, 0)];
        let ar: Vec<f64> = (0..p).map(|i| coefs[(1 + i, 0)]).collect();
        let ma: Vec<f64> = (0..q).map(|i| coefs[(1 + p + i, 0)]).collect();
        let exog_coef: Vec<f64> = (0..n_exog).map(|i| coefs[(1 + p + q + i, 0)]).collect();

        // Fitted values and residuals on the differenced scale
        let mut fitted_diff = vec![f64::NAN; w.len()];
        let mut resid = vec![f64::NAN; w.len()];
        for t in start..w.len() {
            let mut pred = intercept;
            for (i, a) in ar.iter().enumerate() {
                pred += a * w[t - i - 1];
            }
            for (j, m) in ma.iter().enumerate() {
                pred += m * proxy[t - j - 1];
            }
            if let Some(x) = exog {
                for (c, b) in exog_coef.iter().enumerate() {
                    pred += b * x[[t + d, c]];
                }
            }
            fitted_diff[t] = pred;
            resid[t] = w[t] - pred;
        }
        let used: Vec<f64> = resid.iter().copied().filter(|v| v.is_finite()).collect();
        let nobs = used.len() as f64;
        let sigma2 = used.iter().map(|e| e * e).sum::<f64>() / nobs;
        let loglik = -0.5 * nobs * ((2.0 * std::f64::consts::PI * sigma2).ln() + 1.0);
        let k = (n_params + 1) as f64;
        let aic = -2.0 * loglik + 2.0 * k;
        let bic = -2.0 * loglik + k * nobs.ln();

        // Undifference fitted values back to the original level
        let binom = binomial_row(d);
        let mut fitted = Array2::from_elem((y.len(), 1), f64::NAN);
        for t in start..w.len() {
            let level_index = t + d;
            let previous = &y[level_index - d..level_index];
            fitted[[level_index, 0]] = undifference(fitted_diff[t], previous, &binom);
        }

        self.state = Some(FittedArima {
            intercept,
            ar,
            ma,
            exog_coef,
            endog: endog.to_owned(),
            diffed: w,
            resid,
            fitted,
            sigma2,
            aic,
            bic,
        });
        Ok(())
    }

    fn clear(&mut self) {
        self.state = None;
    }

    fn predict(
        &self,
        steps: usize,
        exog: Option<ArrayView2<f64>>,
        alpha: f64,
    ) -> Result<Forecast> {
        check_alpha(alpha)?;
        let state = self.fitted_state()?;
        let d = self.order.1;

        let exog = if self.use_exog { exog } else { None };
        if !state.exog_coef.is_empty() {
            match exog {
                None => {
                    return Err(Error::InvalidInput(
                        "Model was fit with exogenous inputs; predict needs future values"
                            .to_string(),
                    ))
                }
                Some(x) if x.nrows() < steps || x.ncols() != state.exog_coef.len() => {
                    return Err(Error::DimensionMismatch(format!(
                        "Future exogenous shape ({}, {}) does not cover {} steps of {} inputs",
                        x.nrows(),
                        x.ncols(),
                        steps,
                        state.exog_coef.len()
                    )))
                }
                _ => {}
            }
        }

        // Forward recursion on the differenced scale; future shocks are zero
        let mut recent: Vec<f64> = state.diffed.clone();
        let mut shocks: Vec<f64> = state
            .resid
            .iter()
            .map(|v| if v.is_finite() { *v } else { 0.0 })
            .collect();
        let mut diff_forecast = Vec::with_capacity(steps);
        for h in 0..steps {
            let mut value = state.intercept;
            for (i, a) in state.ar.iter().enumerate() {
                if recent.len() > i {
                    value += a * recent[recent.len() - 1 - i];
                }
            }
            for (j, m) in state.ma.iter().enumerate() {
                if shocks.len() > j {
                    value += m * shocks[shocks.len() - 1 - j];
                }
            }
            if let Some(x) = exog {
                for (c, b) in state.exog_coef.iter().enumerate() {
                    value += b * x[[h, c]];
                }
            }
            recent.push(value);
            shocks.push(0.0);
            diff_forecast.push(value);
        }

        // Integrate the differenced forecasts back to levels
        let binom = binomial_row(d);
        let y: Vec<f64> = state.endog.column(0).to_vec();
        let mut levels: Vec<f64> = y[y.len() - d.min(y.len())..].to_vec();
        let mut point = Vec::with_capacity(steps);
        for &wf in &diff_forecast {
            let value = if d == 0 {
                wf
            } else {
                undifference(wf, &levels, &binom)
            };
            levels.push(value);
            point.push(value);
        }

        // Interval widths from cumulated psi weights
        let psi = self.psi_weights(steps)?;
        let z = normal_quantile(alpha)?;
        let mut cumulative = 0.0;
        let mut lower = Vec::with_capacity(steps);
        let mut upper = Vec::with_capacity(steps);
        for (h, &value) in point.iter().enumerate() {
            cumulative += psi[h] * psi[h];
            let half_width = z * (state.sigma2 * cumulative).sqrt();
            lower.push(value - half_width);
            upper.push(value + half_width);
        }

        Ok(Forecast {
            point: Array2::from_shape_vec((steps, 1), point)
                .map_err(|e| Error::Computation(e.to_string()))?,
            lower: Array2::from_shape_vec((steps, 1), lower)
                .map_err(|e| Error::Computation(e.to_string()))?,
            upper: Array2::from_shape_vec((steps, 1), upper)
                .map_err(|e| Error::Computation(e.to_string()))?,
            confidence_level: (1.0 - alpha) * 100.0,
        })
    }

    fn fitted_values(&self) -> Result<Array2<f64>> {
        Ok(self.fitted_state()?.fitted.clone())
    }

    fn training_endog(&self) -> Result<ArrayView2<f64>> {
        Ok(self.fitted_state()?.endog.view())
    }

    fn information_criteria(&self) -> Option<(f64, f64)> {
        self.state.as_ref().map(|s| (s.aic, s.bic))
    }

    fn copy_model(&self) -> Box<dyn Forecaster> {
        Box::new(self.clone())
    }
}

impl ArimaModel {
    /// Psi weights of the implied ARMA recursion, widened through each
    /// order of integration
    fn psi_weights(&self, steps: usize) -> Result<Vec<f64>> {
        let state = self.fitted_state()?;
        let (_, d, _) = self.order;
        let mut psi = vec![0.0; steps.max(1)];
        psi[0] = 1.0;
        for j in 1..psi.len() {
            let mut value = if j <= state.ma.len() {
                state.ma[j - 1]
            } else {
                0.0
            };
            for (i, a) in state.ar.iter().enumerate() {
                if j > i {
                    value += a * psi[j - i - 1];
                }
            }
            psi[j] = value;
        }
        for _ in 0..d {
            for j in 1..psi.len() {
                psi[j] += psi[j - 1];
            }
        }
        Ok(psi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn ar1_series(n: usize) -> Array2<f64> {
        // Deterministic AR(1)-like series with a small periodic excitation
        let mut y = vec![1.0_f64];
        for t in 1..n {
            let shock = ((t % 7) as f64 - 3.0) * 0.1;
            let next = 0.7 * y[t - 1] + 2.0 + shock;
            y.push(next);
        }
        Array2::from_shape_vec((n, 1), y).unwrap()
    }

    #[test]
    fn test_unfit_operations_fail() {
        let model = ArimaModel::new(1, 0, 0);
        assert!(matches!(
            model.predict(3, None, 0.05),
            Err(Error::NotFitted(_))
        ));
        assert!(matches!(model.fitted_values(), Err(Error::NotFitted(_))));
        assert!(matches!(model.errors(), Err(Error::NotFitted(_))));
    }

    #[test]
    fn test_fit_predict_bounds() {
        let data = ar1_series(80);
        let mut model = ArimaModel::new(2, 0, 1);
        model.fit(data.view(), None).unwrap();
        let forecast = model.predict(10, None, 0.05).unwrap();
        assert_eq!(forecast.point.nrows(), 10);
        for h in 0..10 {
            assert!(forecast.lower[[h, 0]] <= forecast.point[[h, 0]]);
            assert!(forecast.point[[h, 0]] <= forecast.upper[[h, 0]]);
        }
        // Intervals widen with the horizon
        let w0 = forecast.upper[[0, 0]] - forecast.lower[[0, 0]];
        let w9 = forecast.upper[[9, 0]] - forecast.lower[[9, 0]];
        assert!(w9 >= w0);
    }

    #[test]
    fn test_refit_is_deterministic() {
        let data = ar1_series(60);
        let mut model = ArimaModel::new(1, 1, 1);
        model.fit(data.view(), None).unwrap();
        let fitted_a = model.fitted_values().unwrap();
        let forecast_a = model.predict(5, None, 0.05).unwrap();

        model.clear();
        assert!(!model.is_fitted());
        model.fit(data.view(), None).unwrap();
        let fitted_b = model.fitted_values().unwrap();
        let forecast_b = model.predict(5, None, 0.05).unwrap();

        for (a, b) in fitted_a.iter().zip(fitted_b.iter()) {
            assert!((a.is_nan() && b.is_nan()) || a == b);
        }
        for (a, b) in forecast_a.point.iter().zip(forecast_b.point.iter()) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_residuals_complement_fitted() {
        let data = ar1_series(60);
        let mut model = ArimaModel::new(1, 0, 0);
        model.fit(data.view(), None).unwrap();
        let fitted = model.fitted_values().unwrap();
        let residuals = model.residuals().unwrap();
        for r in 0..60 {
            if fitted[[r, 0]].is_finite() {
                assert!((residuals[[r, 0]] - (data[[r, 0]] - fitted[[r, 0]])).abs() < 1e-12);
            } else {
                assert!(residuals[[r, 0]].is_nan());
            }
        }
    }

    #[test]
    fn test_differenced_fitted_values_at_level() {
        let data = ar1_series(60);
        let mut model = ArimaModel::new(1, 1, 0);
        assert_eq!(model.order(), (1, 1, 0));
        model.fit(data.view(), None).unwrap();
        let fitted = model.fitted_values().unwrap();
        // Fitted values live on the original scale, near the actual level
        let errors = model.errors().unwrap();
        assert!(errors.rmse.unwrap() < 1.0);
        assert_eq!(fitted.nrows(), 60);
        assert!(fitted[[0, 0]].is_nan());
    }

    #[test]
    fn test_exog_disabled_is_ignored() {
        let data = ar1_series(50);
        let exog = Array2::from_shape_fn((50, 1), |(r, _)| r as f64);
        let mut model = ArimaModel::new(1, 0, 0);
        model.fit(data.view(), Some(exog.view())).unwrap();
        // Fit ignored the exogenous input, so predict needs none
        assert!(model.predict(3, None, 0.05).is_ok());
    }

    #[test]
    fn test_exog_enabled_requires_future_values() {
        let data = ar1_series(50);
        let exog = Array2::from_shape_fn((50, 1), |(r, _)| (r % 5) as f64);
        let mut model = ArimaModel::new(1, 0, 0).with_exog(true);
        model.fit(data.view(), Some(exog.view())).unwrap();
        assert!(model.predict(3, None, 0.05).is_err());
        let future = Array2::from_shape_fn((3, 1), |(r, _)| (r % 5) as f64);
        assert!(model.predict(3, Some(future.view()), 0.05).is_ok());
    }

    #[test]
    fn test_alpha_validation() {
        let data = ar1_series(50);
        let mut model = ArimaModel::new(1, 0, 0);
        model.fit(data.view(), None).unwrap();
        assert!(matches!(
            model.predict(3, None, 0.0),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            model.predict(3, None, 1.5),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_copy_preserves_fit() {
        let data = ar1_series(50);
        let mut model = ArimaModel::new(1, 0, 0);
        model.fit(data.view(), None).unwrap();
        let copy = model.copy_model();
        assert!(copy.is_fitted());
        let (a, _, _) = model.predict(4, None, 0.05).unwrap().univariate();
        let (b, _, _) = copy.predict(4, None, 0.05).unwrap().univariate();
        assert_eq!(a, b);
    }

    #[test]
    fn test_too_short_series() {
        let data = ar1_series(5);
        let mut model = ArimaModel::new(3, 1, 2);
        assert!(matches!(
            model.fit(data.view(), None),
            Err(Error::InsufficientData(_))
        ));
    }
}
