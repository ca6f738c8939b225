//! Vector Autoregression Model
//!
//! Multivariate least-squares VAR with automatic order selection. The lag
//! order is either fixed, derived from the data-size rule
//! `12 * (n / 10)^0.5` at fit time, or chosen by minimizing an information
//! criterion over all candidate orders; the averaged mode runs order
//! selection once per criterion and refits at the floor of the mean
//! suggested lag.
//!
//! Exogenous data supplied at fit time is column-concatenated into the
//! endogenous block; there is no true exogenous regression path. This is a
//! documented simplification, kept for compatibility with the behavior this
//! crate reproduces.

use crate::core::error::{Error, Result};
use crate::forecast::{
    check_alpha, least_squares, normal_quantile, not_fitted, Forecast, Forecaster,
};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Lag-order specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lags {
    /// Use exactly this order
    Fixed(usize),
    /// Derive the candidate ceiling from the sample size at fit time
    Auto,
}

/// Information criteria understood by order selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IcKind {
    Aic,
    Bic,
    Hqic,
    Fpe,
}

const ALL_CRITERIA: [IcKind; 4] = [IcKind::Aic, IcKind::Bic, IcKind::Hqic, IcKind::Fpe];

/// How the lag order is selected below the candidate ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IcSelection {
    /// Minimize one criterion
    Single(IcKind),
    /// Select once per criterion and refit at the floored average lag
    Averaged,
}

/// Deterministic trend term included in each equation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    /// No deterministic term
    None,
    /// Per-equation intercept
    Constant,
}

/// Vector autoregression forecasting model
#[derive(Debug, Clone)]
pub struct VarModel {
    lags: Lags,
    ic: Option<IcSelection>,
    trend: Trend,
    state: Option<FittedVar>,
}

#[derive(Debug, Clone)]
struct FittedVar {
    p: usize,
    k: usize,
    intercept: DVector<f64>,
    coefs: Vec<DMatrix<f64>>,
    sigma_u: DMatrix<f64>,
    endog: Array2<f64>,
    fitted: Array2<f64>,
    aic: f64,
    bic: f64,
}

struct LagFit {
    intercept: DVector<f64>,
    coefs: Vec<DMatrix<f64>>,
    sigma_u: DMatrix<f64>,
    sigma_mle: DMatrix<f64>,
    nobs: usize,
    df_per_equation: usize,
}

impl VarModel {
    /// Create an unfit model. `ic` of `None` fits directly at the lag
    /// ceiling given by `lags`.
    pub fn new(lags: Lags, ic: Option<IcSelection>, trend: Trend) -> Self {
        Self {
            lags,
            ic,
            trend,
            state: None,
        }
    }

    /// The fitted lag order, once fit
    pub fn lag_order(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.p)
    }

    fn fitted_state(&self) -> Result<&FittedVar> {
        self.state.as_ref().ok_or_else(|| not_fitted(&self.name()))
    }

    fn trend_terms(&self) -> usize {
        match self.trend {
            Trend::None => 0,
            Trend::Constant => 1,
        }
    }

    /// Candidate lag ceiling for `n` observations of `k` variables,
    /// clamped so the design stays overdetermined
    fn lag_ceiling(&self, n: usize, k: usize) -> Result<usize> {
        let requested = match self.lags {
            Lags::Fixed(p) => p,
            Lags::Auto => (12.0 * (n as f64 / 10.0).sqrt()).floor() as usize,
        };
        let tr = self.trend_terms();
        let feasible = |p: usize| n > p && n - p > k * p + tr + 1;
        let mut p = requested.max(1);
        while p > 1 && !feasible(p) {
            p -= 1;
        }
        if !feasible(p) {
            return Err(Error::InsufficientData(format!(
                "{} observations cannot support a VAR({}) in {} variables",
                n, p, k
            )));
        }
        Ok(p)
    }

    fn fit_at(&self, data: &DMatrix<f64>, p: usize) -> Result<LagFit> {
        let n = data.nrows();
        let k = data.ncols();
        let tr = self.trend_terms();
        let nobs = n - p;
        let n_params = tr + k * p;
        if nobs <= n_params {
            return Err(Error::InsufficientData(format!(
                "VAR({}) needs more than {} observations, got {}",
                p, n_params, nobs
            )));
        }

        let design = DMatrix::from_fn(nobs, n_params, |r, c| {
            if c < tr {
                1.0
            } else {
                let lag = (c - tr) / k + 1;
                let var = (c - tr) % k;
                data[(r + p - lag, var)]
            }
        });
        let response = DMatrix::from_fn(nobs, k, |r, c| data[(r + p, c)]);
        let beta = least_squares(design.clone(), response.clone())?;

        let residuals = &response - &design * &beta;
        let cross = residuals.transpose() * &residuals;
        let sigma_mle = &cross / nobs as f64;
        let sigma_u = &cross / (nobs - n_params) as f64;

        let intercept = if tr == 1 {
            DVector::from_fn(k, |c, _| beta[(0, c)])
        } else {
            DVector::zeros(k)
        };
        let coefs = (1..=p)
            .map(|lag| DMatrix::from_fn(k, k, |row, col| beta[(tr + (lag - 1) * k + col, row)]))
            .collect();

        Ok(LagFit {
            intercept,
            coefs,
            sigma_u,
            sigma_mle,
            nobs,
            df_per_equation: n_params,
        })
    }

    fn criterion(&self, fit: &LagFit, k: usize, kind: IcKind) -> f64 {
        let t = fit.nobs as f64;
        let det = fit.sigma_mle.determinant();
        if det <= 0.0 || !det.is_finite() {
            return f64::INFINITY;
        }
        let ld = det.ln();
        let free = (k * fit.df_per_equation) as f64;
        match kind {
            IcKind::Aic => ld + 2.0 / t * free,
            IcKind::Bic => ld + t.ln() / t * free,
            IcKind::Hqic => ld + 2.0 * t.ln().ln() / t * free,
            IcKind::Fpe => {
                let df = fit.df_per_equation as f64;
                ((t + df) / (t - df)).powi(k as i32) * det
            }
        }
    }

    fn select_order(
        &self,
        data: &DMatrix<f64>,
        maxlags: usize,
        kind: IcKind,
    ) -> Result<usize> {
        let k = data.ncols();
        let mut best = (1, f64::INFINITY);
        for p in 1..=maxlags {
            let fit = match self.fit_at(data, p) {
                Ok(fit) => fit,
                Err(_) => break,
            };
            let value = self.criterion(&fit, k, kind);
            if value < best.1 {
                best = (p, value);
            }
        }
        Ok(best.0)
    }
}

impl Forecaster for VarModel {
    fn name(&self) -> String {
        match (&self.state, self.lags) {
            (Some(s), _) => format!("VAR({})", s.p),
            (None, Lags::Fixed(p)) => format!("VAR({})", p),
            (None, Lags::Auto) => "VAR(auto)".to_string(),
        }
    }

    /// Lookback bound for evaluation preconditions. The automatic rule is
    /// resolved at fit time, so `Auto` reports the weakest bound here.
    fn max_order(&self) -> usize {
        match self.lags {
            Lags::Fixed(p) => p,
            Lags::Auto => 1,
        }
    }

    fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    fn fit(&mut self, endog: ArrayView2<f64>, exog: Option<ArrayView2<f64>>) -> Result<()> {
        // Exogenous columns join the endogenous block; see the module docs
        let k_endog = endog.ncols();
        let k_exog = exog.map(|x| x.ncols()).unwrap_or(0);
        let k = k_endog + k_exog;
        let n = endog.nrows();
        if k == 0 || n == 0 {
            return Err(Error::InvalidInput(
                "Empty endogenous and exogenous series".to_string(),
            ));
        }
        if let Some(x) = exog {
            if x.nrows() != n {
                return Err(Error::DimensionMismatch(format!(
                    "Exogenous rows {} do not match endogenous rows {}",
                    x.nrows(),
                    n
                )));
            }
        }
        let data = DMatrix::from_fn(n, k, |r, c| {
            if c < k_endog {
                endog[[r, c]]
            } else {
                exog.map(|x| x[[r, c - k_endog]]).unwrap_or(f64::NAN)
            }
        });
        if data.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidInput(
                "Series contains undefined values".to_string(),
            ));
        }

        let maxlags = self.lag_ceiling(n, k)?;
        let p = match self.ic {
            None => maxlags,
            Some(IcSelection::Single(kind)) => self.select_order(&data, maxlags, kind)?,
            Some(IcSelection::Averaged) => {
                let mut total = 0usize;
                for kind in ALL_CRITERIA {
                    total += self.select_order(&data, maxlags, kind)?;
                }
                (total as f64 / ALL_CRITERIA.len() as f64).floor() as usize
            }
        }
        .max(1);

        let fit = self.fit_at(&data, p)?;
        let aic = self.criterion(&fit, k, IcKind::Aic);
        let bic = self.criterion(&fit, k, IcKind::Bic);

        // In-sample one-step predictions, NaN over the presample
        let mut fitted = Array2::from_elem((n, k), f64::NAN);
        for row in p..n {
            for eq in 0..k {
                let mut value = fit.intercept[eq];
                for (lag, a) in fit.coefs.iter().enumerate() {
                    for col in 0..k {
                        value += a[(eq, col)] * data[(row - lag - 1, col)];
                    }
                }
                fitted[[row, eq]] = value;
            }
        }

        self.state = Some(FittedVar {
            p,
            k,
            intercept: fit.intercept,
            coefs: fit.coefs,
            sigma_u: fit.sigma_u,
            endog: Array2::from_shape_fn((n, k), |(r, c)| data[(r, c)]),
            fitted,
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
        _exog: Option<ArrayView2<f64>>,
        alpha: f64,
    ) -> Result<Forecast> {
        check_alpha(alpha)?;
        let state = self.fitted_state()?;
        let (p, k) = (state.p, state.k);
        let n = state.endog.nrows();

        // Forward recursion from the last p observed rows
        let mut history: Vec<DVector<f64>> = (n - p..n)
            .map(|r| DVector::from_fn(k, |c, _| state.endog[[r, c]]))
            .collect();
        let mut point = Array2::zeros((steps, k));
        for h in 0..steps {
            let mut next = state.intercept.clone();
            for (lag, a) in state.coefs.iter().enumerate() {
                next += a * &history[history.len() - lag - 1];
            }
            for c in 0..k {
                point[[h, c]] = next[c];
            }
            history.push(next);
        }

        // Per-horizon forecast error covariance from the MA representation
        let mut phis: Vec<DMatrix<f64>> = vec![DMatrix::identity(k, k)];
        for s in 1..steps.max(1) {
            let mut phi = DMatrix::zeros(k, k);
            for j in 1..=s.min(p) {
                phi += &phis[s - j] * &state.coefs[j - 1];
            }
            phis.push(phi);
        }
        let z = normal_quantile(alpha)?;
        let mut covariance = DMatrix::zeros(k, k);
        let mut lower = Array2::zeros((steps, k));
        let mut upper = Array2::zeros((steps, k));
        for h in 0..steps {
            covariance += &phis[h] * &state.sigma_u * phis[h].transpose();
            for c in 0..k {
                let half_width = z * covariance[(c, c)].max(0.0).sqrt();
                lower[[h, c]] = point[[h, c]] - half_width;
                upper[[h, c]] = point[[h, c]] + half_width;
            }
        }

        Ok(Forecast {
            point,
            lower,
            upper,
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
