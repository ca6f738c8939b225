//! # tslab
//!
//! Exploratory time-series analytics as plug-in components for a visual
//! data-science workbench: windowed aggregation, seasonal decomposition,
//! autocorrelation, periodograms, Granger causality, and forecasting models
//! with rolling-origin evaluation.
//!
//! The crate exposes pure, synchronous functions and objects that a host
//! application calls and renders; there is no GUI, file parsing, or network
//! surface here. Long-running entry points accept an optional progress
//! callback invoked once per discrete unit of work (one fold, one attribute
//! pair, one column pass); cancellation is cooperative through that
//! callback.
//!
//! ## Layout
//!
//! - [`core`]: the crate error type and the tabular data abstraction
//! - [`temporal`]: sampling-interval classification and calendar/block
//!   partitioning
//! - [`window`]: sliding-window primitives and NaN-aware reducers
//! - [`aggregate`]: the catalogue of named aggregation operators
//! - [`interpolate`]: missing-value interpolation over tables
//! - [`forecast`]: the model abstraction, ARIMA and VAR estimators, and
//!   the rolling evaluation harness
//! - [`analysis`]: periodograms, ACF/PACF, Granger causality, seasonal
//!   decomposition

// Core module with fundamental data structures and the error type
pub mod core;

// Temporal structure: sampling intervals and calendar partitions
pub mod temporal;

// Windowing primitives
pub mod window;

// Aggregation operator catalogue
pub mod aggregate;

// Missing-value interpolation
pub mod interpolate;

// Forecast models and evaluation
pub mod forecast;

// Spectral, correlation and causality analysis
pub mod analysis;

// Re-export core types
pub use crate::core::{Column, ColumnData, Error, Result, Role, Table};

// Re-export the temporal classification types
pub use temporal::{Gap, SamplingClass, TimeDelta};

// Re-export the aggregation catalogue surface
pub use aggregate::{all_aggregations, lookup, AggregationInfo, AggregationOperator};

// Re-export interpolation entry points
pub use interpolate::{interpolate_series, interpolate_table, InterpolationMethod};

// Re-export modeling surface
pub use forecast::{
    evaluate, fit_table, ArimaModel, EvaluationResult, FitErrors, Forecast, Forecaster, IcKind,
    IcSelection, Lags, Trend, VarModel,
};

// Re-export analysis surface
pub use analysis::{
    autocorrelation, granger_causality, lomb_scargle_periodogram, partial_autocorrelation,
    periodogram, seasonal_decompose, CausalLink, DecompositionMethod, Detrend, Periodogram,
};
