//! Raw record collections, before any typing.
//!
//! A [`Table`] is a header plus rows of string cells; a [`TableSet`] holds
//! tables by collection name (`buses`, `lines`, ...). The loader reads cells
//! through a [`TableView`], which maps column names to positions once.

use netdiag_core::{NetdiagError, NetdiagResult};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row. Short rows are padded with empty cells.
    pub fn push_row<S: Into<String>>(&mut self, cells: impl IntoIterator<Item = S>) {
        let mut row: Vec<String> = cells.into_iter().map(Into::into).collect();
        if row.len() < self.columns.len() {
            row.resize(self.columns.len(), String::new());
        }
        self.rows.push(row);
    }

    pub fn with_row<S: Into<String>>(mut self, cells: impl IntoIterator<Item = S>) -> Self {
        self.push_row(cells);
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Named record collections
#[derive(Debug, Clone, Default)]
pub struct TableSet {
    tables: BTreeMap<String, Table>,
}

impl TableSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, table: Table) {
        self.tables.insert(name.into(), table);
    }

    pub fn with_table(mut self, name: impl Into<String>, table: Table) -> Self {
        self.insert(name, table);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Fetch a required collection, or fail with a schema error naming it.
    pub fn require(&self, name: &str) -> NetdiagResult<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| NetdiagError::missing_table(name))
    }
}

/// Column-name lookup over a table's rows
pub struct TableView<'a> {
    name: &'a str,
    table: &'a Table,
    col_map: HashMap<&'a str, usize>,
}

impl<'a> TableView<'a> {
    pub fn new(name: &'a str, table: &'a Table) -> Self {
        let col_map = table
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| (column.trim(), i))
            .collect();
        Self {
            name,
            table,
            col_map,
        }
    }

    /// Fail unless every named column is present.
    pub fn require_columns(&self, columns: &[&str]) -> NetdiagResult<()> {
        for column in columns {
            if !self.col_map.contains_key(column) {
                return Err(NetdiagError::missing_column(self.name, *column));
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn columns(&self) -> &'a [String] {
        &self.table.columns
    }

    pub fn len(&self) -> usize {
        self.table.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.rows.is_empty()
    }

    /// Trimmed cell content; `None` for an absent column or an empty cell.
    pub fn get(&self, row: usize, column: &str) -> Option<&'a str> {
        let idx = *self.col_map.get(column)?;
        let cell = self.table.rows.get(row)?.get(idx)?.trim();
        if cell.is_empty() {
            None
        } else {
            Some(cell)
        }
    }
}
