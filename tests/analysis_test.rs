//! Integration tests for the analysis components: periodograms,
//! autocorrelation, seasonal decomposition, and the causality screen.

use std::f64::consts::PI;
use tslab::core::{Column, Table};
use tslab::{
    autocorrelation, granger_causality, lomb_scargle_periodogram, partial_autocorrelation,
    periodogram, seasonal_decompose, DecompositionMethod, Detrend,
};

fn monthly_airline_like(n: usize) -> Vec<f64> {
    (0..n)
        .map(|t| {
            let trend = 100.0 + 0.5 * t as f64;
            let season = (2.0 * PI * t as f64 / 12.0).sin() * 20.0;
            trend + season
        })
        .collect()
}

#[test]
fn test_periodogram_finds_annual_cycle_in_monthly_data() {
    let x = monthly_airline_like(144);
    let result = periodogram(&x, Detrend::Poly(1)).unwrap();
    assert_eq!(result.dominant_period().unwrap().round(), 12.0);
    assert!((result.power[0] - 1.0).abs() < 1e-12);
}

#[test]
fn test_periodogram_with_difference_detrend() {
    let x = monthly_airline_like(144);
    let result = periodogram(&x, Detrend::Diff).unwrap();
    assert_eq!(result.dominant_period().unwrap().round(), 12.0);
}

#[test]
fn test_lomb_scargle_agrees_on_gapped_series() {
    // The same annual cycle with a third of the samples removed
    let times: Vec<f64> = (0..144).filter(|t| t % 3 != 1).map(|t| t as f64).collect();
    let x: Vec<f64> = times
        .iter()
        .map(|&t| (2.0 * PI * t / 12.0).sin() * 20.0)
        .collect();
    let result = lomb_scargle_periodogram(&times, &x, None).unwrap();
    assert!((result.dominant_period().unwrap() - 12.0).abs() < 1.0);
}

#[test]
fn test_acf_pacf_significant_lags() {
    let x = monthly_airline_like(144);
    let acf_lags = autocorrelation(&x).unwrap();
    assert!(acf_lags.iter().any(|(lag, _)| *lag >= 10 && *lag <= 14));

    let pacf_lags = partial_autocorrelation(&x).unwrap();
    assert!(!pacf_lags.is_empty());
}

#[test]
fn test_decomposition_recovers_seasonal_strength() {
    let x = monthly_airline_like(120);
    let result = seasonal_decompose(&x, 12, DecompositionMethod::Additive).unwrap();
    assert!(result.seasonal_strength > 0.9);
    assert!(result.trend_strength > 0.9);
    // The seasonal component repeats with the requested period
    for i in 0..x.len() - 12 {
        assert!((result.seasonal[i] - result.seasonal[i + 12]).abs() < 1e-12);
    }
}

#[test]
fn test_granger_screen_end_to_end() {
    // A driver series and a delayed copy with deterministic noise
    let n = 240;
    let mut driver = vec![0.0_f64];
    for t in 1..n {
        driver.push(0.6 * driver[t - 1] + ((t * 37 % 23) as f64 / 23.0) - 0.5);
    }
    let follower: Vec<f64> = (0..n)
        .map(|t| {
            if t >= 3 {
                driver[t - 3] + 0.01 * ((t * 13 % 7) as f64)
            } else {
                0.0
            }
        })
        .collect();
    let table = Table::new(vec![
        Column::continuous("driver", driver),
        Column::continuous("follower", follower),
    ])
    .unwrap();

    let mut pair_calls = 0usize;
    let mut cb = |_: f64| pair_calls += 1;
    let links = granger_causality(&table, 6, 0.05, Some(&mut cb)).unwrap();
    assert_eq!(pair_calls, 2);
    assert!(links
        .iter()
        .any(|link| link.cause == "driver" && link.effect == "follower"));
}
