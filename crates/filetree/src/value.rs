//! In-memory payload model.
//!
//! A record holds one [`Payload`]: structured tabular data, a string-keyed
//! mapping, or an opaque blob. Which of those the store accepts is decided
//! by its [`crate::FileFormat`]; the model itself is format-agnostic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TreeError};

/// String-keyed mapping; also the shape of a record's metadata side-file.
pub type Map = BTreeMap<String, serde_json::Value>;

/// A single typed table cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Tabular payload: named columns over row-major cells.
///
/// Construction checks that every row is exactly as wide as the header;
/// the fields stay private so the invariant holds for the table's whole
/// life.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(TreeError::ShapeMismatch(format!(
                    "row {i} has {} cell(s), expected {}",
                    row.len(),
                    columns.len()
                )));
            }
        }
        Ok(Self { columns, rows })
    }

    /// Append one row, checking its width.
    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(TreeError::ShapeMismatch(format!(
                "row has {} cell(s), expected {}",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Transpose into per-column cell vectors.
    pub(crate) fn to_columns(&self) -> Vec<Vec<Cell>> {
        let mut columns = vec![Vec::with_capacity(self.rows.len()); self.columns.len()];
        for row in &self.rows {
            for (column, cell) in columns.iter_mut().zip(row) {
                column.push(cell.clone());
            }
        }
        columns
    }

    /// Rebuild from per-column cell vectors.
    pub(crate) fn from_columns(columns: Vec<String>, values: Vec<Vec<Cell>>) -> Result<Self> {
        if values.len() != columns.len() {
            return Err(TreeError::ShapeMismatch(format!(
                "{} column vector(s) for {} column name(s)",
                values.len(),
                columns.len()
            )));
        }
        let num_rows = values.first().map_or(0, Vec::len);
        if let Some(odd) = values.iter().find(|column| column.len() != num_rows) {
            return Err(TreeError::ShapeMismatch(format!(
                "column length {} does not match {}",
                odd.len(),
                num_rows
            )));
        }
        let mut rows = vec![Vec::with_capacity(columns.len()); num_rows];
        for column in values {
            for (row, cell) in rows.iter_mut().zip(column) {
                row.push(cell);
            }
        }
        Ok(Self { columns, rows })
    }
}

/// What a record holds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// Structured tabular data.
    Table(Table),
    /// String-keyed mapping.
    Map(Map),
    /// Opaque blob.
    Bytes(Vec<u8>),
}

impl Payload {
    /// Short label used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Table(_) => "table",
            Payload::Map(_) => "map",
            Payload::Bytes(_) => "bytes",
        }
    }
}
