//! Exploratory Analysis: Spectra, Correlation Structure, Causality
//!
//! Single-series diagnostics (periodograms, autocorrelation, seasonal
//! decomposition) and the pairwise Granger causality screen. These consume
//! interpolated series; see [`crate::interpolate`].

pub mod correlation;
pub mod decomposition;
pub mod granger;
pub mod spectral;

pub use correlation::{acf, autocorrelation, pacf, partial_autocorrelation};
pub use decomposition::{seasonal_decompose, DecompositionMethod, DecompositionResult};
pub use granger::{granger_causality, CausalLink};
pub use spectral::{lomb_scargle_periodogram, periodogram, Detrend, Periodogram};
