//! Typed Column Definitions
//!
//! Columns are the unit of storage inside a [`Table`](crate::core::table::Table):
//! a name, a role in modeling, and either continuous or categorical data.
//! Missing values are `NaN` in both representations; categorical cells store
//! the level index as `f64` so that the same NaN convention applies.

use serde::{Deserialize, Serialize};

/// The modeling role a column plays inside a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Input attribute
    Feature,
    /// Variable being modeled / forecast
    Target,
    /// Carried along but never modeled
    Meta,
}

/// Column payload: continuous values or categorical level codes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ColumnData {
    /// Floating-point values, `NaN` marks missing entries
    Continuous(Vec<f64>),
    /// Level codes (`0.0`, `1.0`, ...) indexing into `levels`; `NaN` marks missing
    Categorical { codes: Vec<f64>, levels: Vec<String> },
}

impl ColumnData {
    /// Number of rows
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Continuous(values) => values.len(),
            ColumnData::Categorical { codes, .. } => codes.len(),
        }
    }

    /// Check if the column has no rows
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The raw numeric view: values for continuous columns, codes for categorical
    pub fn values(&self) -> &[f64] {
        match self {
            ColumnData::Continuous(values) => values,
            ColumnData::Categorical { codes, .. } => codes,
        }
    }

    /// Mutable numeric view
    pub(crate) fn values_mut(&mut self) -> &mut [f64] {
        match self {
            ColumnData::Continuous(values) => values,
            ColumnData::Categorical { codes, .. } => codes,
        }
    }

    /// Whether this is a continuous column
    pub fn is_continuous(&self) -> bool {
        matches!(self, ColumnData::Continuous(_))
    }

    /// Count of finite (defined) entries
    pub fn count_defined(&self) -> usize {
        self.values().iter().filter(|v| v.is_finite()).count()
    }
}

/// A named, typed column with a modeling role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    /// Column name, unique within a table
    pub name: String,
    /// Modeling role
    pub role: Role,
    /// The data payload
    pub data: ColumnData,
}

impl Column {
    /// Create a continuous feature column
    pub fn continuous(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            role: Role::Feature,
            data: ColumnData::Continuous(values),
        }
    }

    /// Create a categorical feature column from level codes and level names
    pub fn categorical(name: impl Into<String>, codes: Vec<f64>, levels: Vec<String>) -> Self {
        Self {
            name: name.into(),
            role: Role::Feature,
            data: ColumnData::Categorical { codes, levels },
        }
    }

    /// Override the modeling role
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the column has no rows
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether any entry is missing
    pub fn has_missing(&self) -> bool {
        self.data.values().iter().any(|v| !v.is_finite())
    }
}
