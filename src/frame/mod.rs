//! Tabular frames with an ordered multi-level index.
//!
//! The reducer aligns query results on dimension indexes: outer merges,
//! level-wise grouping and ordered-null sorting all live here. Columns are
//! vectors of [`Value`]; the index is a vector of per-row tuples plus level
//! names. A frame without index levels behaves like a plain table.

mod markers;
mod value;

pub use markers::{
    is_rollup_value, is_totals_marker, totals_marker_for, NUMBER_TOTALS, ROLLUP_VALUE,
    TEXT_TOTALS, TIMESTAMP_TOTALS,
};
pub use value::{DType, Value};

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

/// Wire form of an alias at the frame boundary: `$`-prefixed.
pub fn alias_selector(alias: &str) -> String {
    format!("${}", alias)
}

/// Errors from frame operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    #[error("unknown column: `{0}`")]
    UnknownColumn(String),

    #[error("duplicate column: `{0}`")]
    DuplicateColumn(String),

    #[error("column `{column}` has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
}

/// A named column of values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: &str, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Dominant dtype of the column's non-null values.
    pub fn dtype(&self) -> Option<DType> {
        self.values.iter().find_map(|v| v.dtype())
    }
}

/// A table of columns with an ordered multi-level index.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataFrame {
    index_names: Vec<String>,
    /// One tuple per row; tuple length equals `index_names.len()`.
    index: Vec<Vec<Value>>,
    columns: Vec<Column>,
}

impl DataFrame {
    /// Create an empty frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a frame from equal-length columns (no index levels).
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, FrameError> {
        let expected = columns.first().map(|c| c.values.len()).unwrap_or(0);
        for col in &columns {
            if col.values.len() != expected {
                return Err(FrameError::LengthMismatch {
                    column: col.name.clone(),
                    expected,
                    actual: col.values.len(),
                });
            }
            if columns.iter().filter(|c| c.name == col.name).count() > 1 {
                return Err(FrameError::DuplicateColumn(col.name.clone()));
            }
        }
        Ok(Self {
            index_names: vec![],
            index: vec![vec![]; expected],
            columns,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn nrows(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nrows() == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        self.column(column).and_then(|c| c.values.get(row))
    }

    pub fn index_names(&self) -> &[String] {
        &self.index_names
    }

    pub fn index(&self) -> &[Vec<Value>] {
        &self.index
    }

    /// Position of an index level by name.
    pub fn index_level(&self, name: &str) -> Option<usize> {
        self.index_names.iter().position(|n| n == name)
    }

    /// Map from index tuple to last row position carrying it.
    pub fn index_positions(&self) -> HashMap<Vec<Value>, usize> {
        self.index
            .iter()
            .enumerate()
            .map(|(i, key)| (key.clone(), i))
            .collect()
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    pub fn push_column(&mut self, column: Column) -> Result<(), FrameError> {
        if self.has_column(&column.name) {
            return Err(FrameError::DuplicateColumn(column.name));
        }
        if column.values.len() != self.nrows() {
            return Err(FrameError::LengthMismatch {
                column: column.name,
                expected: self.nrows(),
                actual: column.values.len(),
            });
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn set_index_value(&mut self, row: usize, level: usize, value: Value) {
        if let Some(tuple) = self.index.get_mut(row) {
            if level < tuple.len() {
                tuple[level] = value;
            }
        }
    }

    /// Keep only the first `n` rows.
    pub fn truncate(&mut self, n: usize) {
        self.index.truncate(n);
        for col in &mut self.columns {
            col.values.truncate(n);
        }
    }

    // =========================================================================
    // Index manipulation
    // =========================================================================

    /// Move the named columns into the index, in the given order.
    pub fn set_index(&mut self, names: &[String]) -> Result<(), FrameError> {
        let mut new_levels: Vec<Column> = Vec::with_capacity(names.len());
        for name in names {
            let pos = self
                .columns
                .iter()
                .position(|c| &c.name == name)
                .ok_or_else(|| FrameError::UnknownColumn(name.clone()))?;
            new_levels.push(self.columns.remove(pos));
        }

        for (row, tuple) in self.index.iter_mut().enumerate() {
            for level in &new_levels {
                tuple.push(level.values[row].clone());
            }
        }
        self.index_names
            .extend(new_levels.into_iter().map(|c| c.name));
        Ok(())
    }

    /// Move every index level back into columns, in front of the data.
    pub fn reset_index(&mut self) {
        let mut restored: Vec<Column> = self
            .index_names
            .iter()
            .map(|name| Column::new(name, Vec::with_capacity(self.nrows())))
            .collect();
        for tuple in &self.index {
            for (level, value) in tuple.iter().enumerate() {
                restored[level].values.push(value.clone());
            }
        }
        for tuple in &mut self.index {
            tuple.clear();
        }
        self.index_names.clear();
        restored.append(&mut self.columns);
        self.columns = restored;
    }

    // =========================================================================
    // Alignment
    // =========================================================================

    /// Outer-merge `other` onto this frame on the index.
    ///
    /// The result's index is this frame's keys in order, followed by keys
    /// appearing only in `other`, in their order. Cells with no source row
    /// are Null.
    pub fn outer_merge(&self, other: &DataFrame) -> Result<DataFrame, FrameError> {
        for col in &other.columns {
            if self.has_column(&col.name) {
                return Err(FrameError::DuplicateColumn(col.name.clone()));
            }
        }

        let mut keys: Vec<Vec<Value>> = self.index.clone();
        let self_positions = self.index_positions();
        for key in &other.index {
            if !self_positions.contains_key(key) && !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        let other_positions = other.index_positions();

        let mut columns: Vec<Column> = Vec::with_capacity(self.columns.len() + other.columns.len());
        for col in &self.columns {
            let values = keys
                .iter()
                .map(|key| match self_positions.get(key) {
                    Some(&row) => col.values[row].clone(),
                    None => Value::Null,
                })
                .collect();
            columns.push(Column::new(&col.name, values));
        }
        for col in &other.columns {
            let values = keys
                .iter()
                .map(|key| match other_positions.get(key) {
                    Some(&row) => col.values[row].clone(),
                    None => Value::Null,
                })
                .collect();
            columns.push(Column::new(&col.name, values));
        }

        Ok(DataFrame {
            index_names: self.index_names.clone(),
            index: keys,
            columns,
        })
    }

    /// Concatenate frames top to bottom. Columns are unioned by name in
    /// first-appearance order; missing cells are Null.
    pub fn concat(frames: &[DataFrame]) -> DataFrame {
        let mut index_names: Vec<String> = vec![];
        let mut column_names: Vec<String> = vec![];
        for frame in frames {
            if frame.index_names.len() > index_names.len() {
                index_names = frame.index_names.clone();
            }
            for col in &frame.columns {
                if !column_names.contains(&col.name) {
                    column_names.push(col.name.clone());
                }
            }
        }

        let mut index: Vec<Vec<Value>> = vec![];
        let mut columns: Vec<Column> = column_names
            .iter()
            .map(|n| Column::new(n, vec![]))
            .collect();

        for frame in frames {
            for tuple in &frame.index {
                let mut padded = tuple.clone();
                padded.resize(index_names.len(), Value::Null);
                index.push(padded);
            }
            for col in &mut columns {
                match frame.column(&col.name) {
                    Some(source) => col.values.extend(source.values.iter().cloned()),
                    None => col
                        .values
                        .extend(std::iter::repeat(Value::Null).take(frame.nrows())),
                }
            }
        }

        DataFrame {
            index_names,
            index,
            columns,
        }
    }

    // =========================================================================
    // Sorting / grouping / slicing
    // =========================================================================

    /// Stable sort by the index tuples; nulls first, totals markers last
    /// within their group by construction of the value ordering.
    pub fn sort_index(&mut self) {
        let mut order: Vec<usize> = (0..self.nrows()).collect();
        order.sort_by(|&a, &b| self.index[a].cmp(&self.index[b]));
        self.reorder(&order);
    }

    fn reorder(&mut self, order: &[usize]) {
        self.index = order.iter().map(|&i| self.index[i].clone()).collect();
        for col in &mut self.columns {
            col.values = order.iter().map(|&i| col.values[i].clone()).collect();
        }
    }

    /// Rows `[offset, offset+limit)`.
    pub fn slice(&self, offset: usize, limit: Option<usize>) -> DataFrame {
        let start = offset.min(self.nrows());
        let end = match limit {
            Some(n) => (start + n).min(self.nrows()),
            None => self.nrows(),
        };
        self.select_rows(&(start..end).collect::<Vec<_>>())
    }

    /// A new frame containing the given rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> DataFrame {
        DataFrame {
            index_names: self.index_names.clone(),
            index: rows.iter().map(|&i| self.index[i].clone()).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| {
                    Column::new(
                        &c.name,
                        rows.iter().map(|&i| c.values[i].clone()).collect(),
                    )
                })
                .collect(),
        }
    }

    /// Rows as JSON records with index levels inlined, the shape widget
    /// transforms consume.
    pub fn to_records(&self) -> serde_json::Value {
        let records: Vec<serde_json::Value> = (0..self.nrows())
            .map(|row| {
                let mut record = serde_json::Map::new();
                for (level, name) in self.index_names.iter().enumerate() {
                    record.insert(
                        name.clone(),
                        serde_json::to_value(&self.index[row][level])
                            .unwrap_or(serde_json::Value::Null),
                    );
                }
                for col in &self.columns {
                    record.insert(
                        col.name.clone(),
                        serde_json::to_value(&col.values[row])
                            .unwrap_or(serde_json::Value::Null),
                    );
                }
                serde_json::Value::Object(record)
            })
            .collect();
        serde_json::Value::Array(records)
    }

    /// Group rows by the given index levels, in first-appearance order.
    ///
    /// Returns `(key, row positions)` pairs; an empty level set yields a
    /// single group with an empty key.
    pub fn group_rows(&self, levels: &[usize]) -> Vec<(Vec<Value>, Vec<usize>)> {
        let mut groups: Vec<(Vec<Value>, Vec<usize>)> = vec![];
        let mut lookup: HashMap<Vec<Value>, usize> = HashMap::new();
        for (row, tuple) in self.index.iter().enumerate() {
            let key: Vec<Value> = levels.iter().map(|&l| tuple[l].clone()).collect();
            match lookup.get(&key) {
                Some(&g) => groups[g].1.push(row),
                None => {
                    lookup.insert(key.clone(), groups.len());
                    groups.push((key, vec![row]));
                }
            }
        }
        groups
    }
}
