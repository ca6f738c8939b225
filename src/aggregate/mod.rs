//! Aggregation Registry
//!
//! A fixed catalogue of named aggregation operators. Each operator exposes a
//! windowed transform `(values, width, shift) -> values` and, where a whole
//! block collapses meaningfully to one value, a block transform
//! `(values) -> scalar`. The two must agree: sampling the windowed transform
//! at stride `width` over disjoint blocks equals applying the block
//! transform to each block.
//!
//! The catalogue is built once at first use and never mutated; lookup is by
//! string key and unknown keys are a caller error.

use crate::core::error::{Error, Result};
use crate::window;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

type WindowedFn = fn(&[f64], usize, usize) -> Result<Vec<f64>>;
type BlockFn = fn(&[f64]) -> f64;

/// One catalogued aggregation operator
#[derive(Clone)]
pub struct AggregationOperator {
    /// Registry key
    pub key: &'static str,
    /// Display name
    pub name: &'static str,
    windowed: WindowedFn,
    block: Option<BlockFn>,
    /// Whether the operator is meaningful on categorical level codes
    pub supports_categorical: bool,
    /// Whether the result is a count rather than a value on the input scale
    pub is_count: bool,
    /// Whether the operator is a cumulative reduction rather than a
    /// fixed-width window
    pub is_cumulative: bool,
    /// Whether results live on the same scale as the input
    pub preserves_scale: bool,
}

impl std::fmt::Debug for AggregationOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregationOperator")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("has_block", &self.block.is_some())
            .field("supports_categorical", &self.supports_categorical)
            .field("is_count", &self.is_count)
            .field("is_cumulative", &self.is_cumulative)
            .field("preserves_scale", &self.preserves_scale)
            .finish()
    }
}

/// Serializable metadata snapshot of an operator, for hosts that present
/// the catalogue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationInfo {
    pub key: String,
    pub name: String,
    pub has_block: bool,
    pub supports_categorical: bool,
    pub is_count: bool,
    pub is_cumulative: bool,
    pub preserves_scale: bool,
}

impl AggregationOperator {
    /// Apply the windowed transform
    pub fn windowed(&self, x: &[f64], width: usize, shift: usize) -> Result<Vec<f64>> {
        (self.windowed)(x, width, shift)
    }

    /// Apply the block transform. Operators without a block form (moving
    /// averages, cumulative reductions) report an error.
    pub fn block(&self, x: &[f64]) -> Result<f64> {
        match self.block {
            Some(f) => Ok(f(x)),
            None => Err(Error::InvalidInput(format!(
                "Aggregation '{}' has no block form",
                self.key
            ))),
        }
    }

    /// Whether a block transform is defined
    pub fn has_block(&self) -> bool {
        self.block.is_some()
    }

    /// Metadata snapshot
    pub fn info(&self) -> AggregationInfo {
        AggregationInfo {
            key: self.key.to_string(),
            name: self.name.to_string(),
            has_block: self.block.is_some(),
            supports_categorical: self.supports_categorical,
            is_count: self.is_count,
            is_cumulative: self.is_cumulative,
            preserves_scale: self.preserves_scale,
        }
    }
}

fn w_mean(x: &[f64], width: usize, shift: usize) -> Result<Vec<f64>> {
    window::windowed_apply(x, width, shift, window::mean_of)
}
fn w_sum(x: &[f64], width: usize, shift: usize) -> Result<Vec<f64>> {
    window::moving_sum(x, width, shift)
}
fn w_product(x: &[f64], width: usize, shift: usize) -> Result<Vec<f64>> {
    window::windowed_apply(x, width, shift, window::product_of)
}
fn w_min(x: &[f64], width: usize, shift: usize) -> Result<Vec<f64>> {
    window::windowed_apply(x, width, shift, window::min_of)
}
fn w_max(x: &[f64], width: usize, shift: usize) -> Result<Vec<f64>> {
    window::windowed_apply(x, width, shift, window::max_of)
}
fn w_span(x: &[f64], width: usize, shift: usize) -> Result<Vec<f64>> {
    window::windowed_span(x, width, shift)
}
fn w_median(x: &[f64], width: usize, shift: usize) -> Result<Vec<f64>> {
    window::windowed_apply(x, width, shift, window::median_of)
}
fn w_mode(x: &[f64], width: usize, shift: usize) -> Result<Vec<f64>> {
    window::windowed_mode(x, width, shift)
}
fn w_std(x: &[f64], width: usize, shift: usize) -> Result<Vec<f64>> {
    window::windowed_apply(x, width, shift, window::std_of)
}
fn w_var(x: &[f64], width: usize, shift: usize) -> Result<Vec<f64>> {
    window::windowed_apply(x, width, shift, window::variance_of)
}
fn w_harmonic(x: &[f64], width: usize, shift: usize) -> Result<Vec<f64>> {
    window::windowed_harmonic_mean(x, width, shift)
}
fn w_geometric(x: &[f64], width: usize, shift: usize) -> Result<Vec<f64>> {
    window::windowed_apply(x, width, shift, window::geometric_mean_of)
}
fn w_count_nonzero(x: &[f64], width: usize, shift: usize) -> Result<Vec<f64>> {
    window::moving_count_nonzero(x, width, shift)
}
fn w_count_defined(x: &[f64], width: usize, shift: usize) -> Result<Vec<f64>> {
    window::moving_count_defined(x, width, shift)
}

lazy_static! {
    static ref REGISTRY: BTreeMap<&'static str, AggregationOperator> = {
        let ops = [
            AggregationOperator {
                key: "mean", name: "Mean value",
                windowed: w_mean, block: Some(window::mean_of),
                supports_categorical: false, is_count: false,
                is_cumulative: false, preserves_scale: true,
            },
            AggregationOperator {
                key: "sum", name: "Sum",
                windowed: w_sum, block: Some(window::sum_of),
                supports_categorical: false, is_count: false,
                is_cumulative: false, preserves_scale: false,
            },
            AggregationOperator {
                key: "product", name: "Product",
                windowed: w_product, block: Some(window::product_of),
                supports_categorical: false, is_count: false,
                is_cumulative: false, preserves_scale: false,
            },
            AggregationOperator {
                key: "min", name: "Minimum",
                windowed: w_min, block: Some(window::min_of),
                supports_categorical: false, is_count: false,
                is_cumulative: false, preserves_scale: true,
            },
            AggregationOperator {
                key: "max", name: "Maximum",
                windowed: w_max, block: Some(window::max_of),
                supports_categorical: false, is_count: false,
                is_cumulative: false, preserves_scale: true,
            },
            AggregationOperator {
                key: "span", name: "Span",
                windowed: w_span, block: Some(window::span_of),
                supports_categorical: false, is_count: false,
                is_cumulative: false, preserves_scale: false,
            },
            AggregationOperator {
                key: "median", name: "Median",
                windowed: w_median, block: Some(window::median_of),
                supports_categorical: false, is_count: false,
                is_cumulative: false, preserves_scale: true,
            },
            AggregationOperator {
                key: "mode", name: "Mode",
                windowed: w_mode, block: Some(window::mode_of),
                supports_categorical: true, is_count: false,
                is_cumulative: false, preserves_scale: true,
            },
            AggregationOperator {
                key: "std", name: "Standard deviation",
                windowed: w_std, block: Some(window::std_of),
                supports_categorical: false, is_count: false,
                is_cumulative: false, preserves_scale: false,
            },
            AggregationOperator {
                key: "var", name: "Variance",
                windowed: w_var, block: Some(window::variance_of),
                supports_categorical: false, is_count: false,
                is_cumulative: false, preserves_scale: false,
            },
            AggregationOperator {
                key: "lin_ma", name: "Linear MA",
                windowed: window::windowed_linear_ma, block: None,
                supports_categorical: false, is_count: false,
                is_cumulative: false, preserves_scale: true,
            },
            AggregationOperator {
                key: "exp_ma", name: "Exponential MA",
                windowed: window::windowed_exponential_ma, block: None,
                supports_categorical: false, is_count: false,
                is_cumulative: false, preserves_scale: true,
            },
            AggregationOperator {
                key: "harmonic", name: "Harmonic mean",
                windowed: w_harmonic, block: Some(window::harmonic_mean_of),
                supports_categorical: false, is_count: false,
                is_cumulative: false, preserves_scale: true,
            },
            AggregationOperator {
                key: "geometric", name: "Geometric mean",
                windowed: w_geometric, block: Some(window::geometric_mean_of),
                supports_categorical: false, is_count: false,
                is_cumulative: false, preserves_scale: true,
            },
            AggregationOperator {
                key: "count_nonzero", name: "Nonzero count",
                windowed: w_count_nonzero, block: Some(window::count_nonzero_of),
                supports_categorical: true, is_count: true,
                is_cumulative: false, preserves_scale: false,
            },
            AggregationOperator {
                key: "count_defined", name: "Defined count",
                windowed: w_count_defined, block: Some(window::count_defined_of),
                supports_categorical: true, is_count: true,
                is_cumulative: false, preserves_scale: false,
            },
            AggregationOperator {
                key: "cumsum", name: "Cumulative sum",
                windowed: window::windowed_cumsum, block: None,
                supports_categorical: false, is_count: false,
                is_cumulative: true, preserves_scale: false,
            },
            AggregationOperator {
                key: "cumprod", name: "Cumulative product",
                windowed: window::windowed_cumprod, block: None,
                supports_categorical: false, is_count: false,
                is_cumulative: true, preserves_scale: false,
            },
        ];
        ops.into_iter().map(|op| (op.key, op)).collect()
    };
}

/// Look up an aggregation operator by key
pub fn lookup(key: &str) -> Result<&'static AggregationOperator> {
    REGISTRY
        .get(key)
        .ok_or_else(|| Error::UnknownAggregation(key.to_string()))
}

/// All catalogued operators, ordered by key
pub fn all_aggregations() -> impl Iterator<Item = &'static AggregationOperator> {
    REGISTRY.values()
}

#[cfg(test)]
mod tests {
    use super::*;

    const X: [f64; 12] = [
        3.0, 8.0, 6.0, 4.0, 2.0, 4.0, 6.0, 8.0, 1.0, 2.0, 4.0, 5.0,
    ];

    #[test]
    fn test_lookup_unknown() {
        assert!(matches!(
            lookup("percentile99"),
            Err(Error::UnknownAggregation(_))
        ));
    }

    #[test]
    fn test_windowed_block_agreement() {
        // Sampling the windowed transform at stride == width over disjoint
        // blocks must equal the block transform on each block.
        let width = 4;
        for op in all_aggregations().filter(|op| op.has_block()) {
            let windowed = op.windowed(&X, width, width).unwrap();
            for (i, w) in windowed.iter().enumerate() {
                let block = op.block(&X[i * width..(i + 1) * width]).unwrap();
                assert!(
                    (w - block).abs() < 1e-9 || (w.is_nan() && block.is_nan()),
                    "operator '{}' disagrees at block {}: {} vs {}",
                    op.key,
                    i,
                    w,
                    block
                );
            }
        }
    }

    #[test]
    fn test_moving_averages_have_no_block() {
        for key in ["lin_ma", "exp_ma", "cumsum", "cumprod"] {
            let op = lookup(key).unwrap();
            assert!(!op.has_block());
            assert!(op.block(&X).is_err());
        }
    }

    #[test]
    fn test_count_flags() {
        assert!(lookup("count_nonzero").unwrap().is_count);
        assert!(lookup("count_defined").unwrap().is_count);
        assert!(!lookup("mean").unwrap().is_count);
    }

    #[test]
    fn test_cumulative_flags() {
        assert!(lookup("cumsum").unwrap().is_cumulative);
        assert!(!lookup("sum").unwrap().is_cumulative);
    }

    #[test]
    fn test_categorical_support() {
        assert!(lookup("mode").unwrap().supports_categorical);
        assert!(!lookup("mean").unwrap().supports_categorical);
    }

    #[test]
    fn test_info_snapshot() {
        let info = lookup("exp_ma").unwrap().info();
        assert_eq!(info.key, "exp_ma");
        assert!(!info.has_block);
        assert!(info.preserves_scale);
    }

    #[test]
    fn test_mean_windowed() {
        let op = lookup("mean").unwrap();
        let out = op.windowed(&X[..5], 2, 1).unwrap();
        assert_eq!(out, vec![5.5, 7.0, 5.0, 3.0]);
    }
}
