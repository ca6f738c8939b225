//! Tabular Data Abstraction
//!
//! A [`Table`] is a typed 2-D container with named columns, modeling roles and
//! an optional designated time variable. It is the surface through which the
//! host workbench hands data to the analytics components; file parsing,
//! fetching and serialization of datasets stay on the host side.

use crate::core::column::{Column, ColumnData, Role};
use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Column-oriented table with named, role-tagged columns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
    time_index: Option<usize>,
    n_rows: usize,
}

impl Table {
    /// Create a table from columns. All columns must share one row count and
    /// carry unique names.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let n_rows = columns.first().map(|c| c.len()).unwrap_or(0);
        for col in &columns {
            if col.len() != n_rows {
                return Err(Error::InconsistentRowCount {
                    expected: n_rows,
                    found: col.len(),
                });
            }
        }
        for (i, col) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(Error::DuplicateColumnName(col.name.clone()));
            }
        }
        Ok(Self {
            columns,
            time_index: None,
            n_rows,
        })
    }

    /// Designate an existing continuous column as the time variable
    /// (POSIX seconds).
    pub fn with_time_column(mut self, name: &str) -> Result<Self> {
        let idx = self.column_index(name)?;
        if !self.columns[idx].data.is_continuous() {
            return Err(Error::InvalidInput(format!(
                "Time column '{}' must be continuous",
                name
            )));
        }
        self.time_index = Some(idx);
        Ok(self)
    }

    /// Number of rows
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Check if the table has no rows
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// All columns in declaration order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Result<&Column> {
        let idx = self.column_index(name)?;
        Ok(&self.columns[idx])
    }

    /// The designated time column, if any
    pub fn time_column(&self) -> Option<&Column> {
        self.time_index.map(|i| &self.columns[i])
    }

    /// Time values of the designated time column
    pub fn time_values(&self) -> Option<&[f64]> {
        self.time_column().map(|c| c.data.values())
    }

    /// Whether the named column is the designated time variable
    pub fn is_time_column(&self, name: &str) -> bool {
        self.time_column().map(|c| c.name == name).unwrap_or(false)
    }

    /// Columns with the given role
    pub fn columns_with_role(&self, role: Role) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.role == role).collect()
    }

    /// Target columns
    pub fn targets(&self) -> Vec<&Column> {
        self.columns_with_role(Role::Target)
    }

    /// Feature columns, excluding the designated time variable
    pub fn features(&self) -> Vec<&Column> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(i, c)| c.role == Role::Feature && Some(*i) != self.time_index)
            .map(|(_, c)| c)
            .collect()
    }

    /// Slice rows into a new table, keeping the schema and the time
    /// designation
    pub fn slice_rows(&self, start: usize, end: usize) -> Result<Table> {
        if start > end || end > self.n_rows {
            return Err(Error::InvalidInput(format!(
                "Invalid row slice {}..{} for {} rows",
                start, end, self.n_rows
            )));
        }
        let columns = self
            .columns
            .iter()
            .map(|col| {
                let data = match &col.data {
                    ColumnData::Continuous(values) => {
                        ColumnData::Continuous(values[start..end].to_vec())
                    }
                    ColumnData::Categorical { codes, levels } => ColumnData::Categorical {
                        codes: codes[start..end].to_vec(),
                        levels: levels.clone(),
                    },
                };
                Column {
                    name: col.name.clone(),
                    role: col.role,
                    data,
                }
            })
            .collect();
        Ok(Table {
            columns,
            time_index: self.time_index,
            n_rows: end - start,
        })
    }

    /// Filter rows by predicate over the row index
    pub fn filter_rows<F: Fn(usize) -> bool>(&self, keep: F) -> Table {
        let indices: Vec<usize> = (0..self.n_rows).filter(|&i| keep(i)).collect();
        let columns = self
            .columns
            .iter()
            .map(|col| {
                let data = match &col.data {
                    ColumnData::Continuous(values) => {
                        ColumnData::Continuous(indices.iter().map(|&i| values[i]).collect())
                    }
                    ColumnData::Categorical { codes, levels } => ColumnData::Categorical {
                        codes: indices.iter().map(|&i| codes[i]).collect(),
                        levels: levels.clone(),
                    },
                };
                Column {
                    name: col.name.clone(),
                    role: col.role,
                    data,
                }
            })
            .collect();
        Table {
            columns,
            time_index: self.time_index,
            n_rows: indices.len(),
        }
    }

    /// Replace a column's data in place, preserving name and role. The new
    /// data must match the table's row count.
    pub(crate) fn replace_column_data(&mut self, name: &str, data: ColumnData) -> Result<()> {
        if data.len() != self.n_rows {
            return Err(Error::InconsistentRowCount {
                expected: self.n_rows,
                found: data.len(),
            });
        }
        let idx = self.column_index(name)?;
        self.columns[idx].data = data;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        Table::new(vec![
            Column::continuous("time", vec![0.0, 86400.0, 172800.0]),
            Column::continuous("y", vec![1.0, 2.0, 3.0]).with_role(Role::Target),
            Column::continuous("x", vec![0.5, 0.6, 0.7]),
        ])
        .unwrap()
        .with_time_column("time")
        .unwrap()
    }

    #[test]
    fn test_table_construction() {
        let table = sample_table();
        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.n_columns(), 3);
        assert_eq!(table.targets().len(), 1);
        // "time" is a feature but excluded from features() as the time variable
        assert_eq!(table.features().len(), 1);
        assert_eq!(table.time_values().unwrap()[1], 86400.0);
    }

    #[test]
    fn test_row_count_mismatch() {
        let result = Table::new(vec![
            Column::continuous("a", vec![1.0, 2.0]),
            Column::continuous("b", vec![1.0]),
        ]);
        assert!(matches!(
            result,
            Err(Error::InconsistentRowCount { .. })
        ));
    }

    #[test]
    fn test_duplicate_names() {
        let result = Table::new(vec![
            Column::continuous("a", vec![1.0]),
            Column::continuous("a", vec![2.0]),
        ]);
        assert!(matches!(result, Err(Error::DuplicateColumnName(_))));
    }

    #[test]
    fn test_slice_rows() {
        let table = sample_table();
        let sliced = table.slice_rows(1, 3).unwrap();
        assert_eq!(sliced.n_rows(), 2);
        assert_eq!(sliced.column("y").unwrap().data.values(), &[2.0, 3.0]);
        assert!(sliced.time_column().is_some());
    }

    #[test]
    fn test_filter_rows() {
        let table = sample_table();
        let filtered = table.filter_rows(|i| i != 1);
        assert_eq!(filtered.n_rows(), 2);
        assert_eq!(filtered.column("y").unwrap().data.values(), &[1.0, 3.0]);
    }

    #[test]
    fn test_missing_column() {
        let table = sample_table();
        assert!(matches!(
            table.column("nope"),
            Err(Error::ColumnNotFound(_))
        ));
    }
}
