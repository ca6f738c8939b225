//! Forecast Accuracy Metrics
//!
//! The five accuracy measures reported by model `errors()` and by the
//! rolling evaluation harness. Every metric skips pairs where either side
//! is undefined and returns `None` when it cannot be computed at all, which
//! the result tables render as an error sentinel.
//!
//! Note: `MAE` here is the *median* absolute error. The label is kept for
//! compatibility with the behavior this crate reproduces; see DESIGN.md.

/// Pairs where both sides are finite
fn paired(actual: &[f64], predicted: &[f64]) -> Vec<(f64, f64)> {
    actual
        .iter()
        .zip(predicted)
        .filter(|(a, p)| a.is_finite() && p.is_finite())
        .map(|(&a, &p)| (a, p))
        .collect()
}

/// Root mean squared error
pub fn rmse(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    let pairs = paired(actual, predicted);
    if pairs.is_empty() {
        return None;
    }
    let mse = pairs.iter().map(|(a, p)| (a - p) * (a - p)).sum::<f64>() / pairs.len() as f64;
    Some(mse.sqrt())
}

/// Median absolute error (reported under the `MAE` label)
pub fn median_absolute_error(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    let pairs = paired(actual, predicted);
    if pairs.is_empty() {
        return None;
    }
    let mut abs: Vec<f64> = pairs.iter().map(|(a, p)| (a - p).abs()).collect();
    abs.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = abs.len() / 2;
    Some(if abs.len() % 2 == 0 {
        (abs[mid - 1] + abs[mid]) / 2.0
    } else {
        abs[mid]
    })
}

/// Mean absolute percentage error, over pairs with nonzero actuals
pub fn mape(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = paired(actual, predicted)
        .into_iter()
        .filter(|(a, _)| *a != 0.0)
        .collect();
    if pairs.is_empty() {
        return None;
    }
    Some(pairs.iter().map(|(a, p)| ((a - p) / a).abs()).sum::<f64>() / pairs.len() as f64)
}

/// Percentage of correct direction-of-change predictions
pub fn pocid(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    let pairs = paired(actual, predicted);
    if pairs.len() < 2 {
        return None;
    }
    let hits = pairs
        .windows(2)
        .filter(|w| {
            let da = w[1].0 - w[0].0;
            let dp = w[1].1 - w[0].1;
            da * dp > 0.0
        })
        .count();
    Some(100.0 * hits as f64 / (pairs.len() - 1) as f64)
}

/// Coefficient of determination
pub fn r_squared(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    let pairs = paired(actual, predicted);
    if pairs.is_empty() {
        return None;
    }
    let mean = pairs.iter().map(|(a, _)| a).sum::<f64>() / pairs.len() as f64;
    let ss_tot: f64 = pairs.iter().map(|(a, _)| (a - mean) * (a - mean)).sum();
    if ss_tot == 0.0 {
        return None;
    }
    let ss_res: f64 = pairs.iter().map(|(a, p)| (a - p) * (a - p)).sum();
    Some(1.0 - ss_res / ss_tot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rmse() {
        let value = rmse(&[1.0, 2.0, 3.0], &[1.0, 2.0, 5.0]).unwrap();
        assert!((value - (4.0_f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_mae_is_median() {
        // Errors 0, 0, 9: the median is 0, the mean would be 3
        let value = median_absolute_error(&[1.0, 2.0, 3.0], &[1.0, 2.0, 12.0]).unwrap();
        assert_eq!(value, 0.0);
    }

    #[test]
    fn test_mape_skips_zero_actuals() {
        let value = mape(&[0.0, 2.0], &[1.0, 1.0]).unwrap();
        assert!((value - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_pocid() {
        // Actual falls then rises; prediction rises twice: one match
        let value = pocid(&[1.0, 0.0, 2.0], &[0.0, 1.0, 2.0]).unwrap();
        assert!((value - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_r_squared_perfect() {
        assert!((r_squared(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_actual_has_no_r_squared() {
        assert!(r_squared(&[2.0, 2.0], &[1.0, 3.0]).is_none());
    }

    #[test]
    fn test_nan_pairs_skipped() {
        let value = rmse(&[1.0, f64::NAN, 3.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(value, 0.0);
    }

    #[test]
    fn test_empty_is_none() {
        assert!(rmse(&[], &[]).is_none());
        assert!(pocid(&[1.0], &[1.0]).is_none());
    }
}
