//! Chart-ready columnar result storage.

use serde::Serialize;

/// One result column: name plus its cell values across rows, in row order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameColumn {
    pub name: String,
    pub values: Vec<String>,
}

/// Column-oriented view of a result set, built one row at a time during
/// iteration and handed to the charting collaborator.
///
/// Column order is first-seen from the query metadata. Cells are appended
/// by column index, so duplicate column names stay distinct columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ColumnarFrame {
    columns: Vec<FrameColumn>,
}

impl ColumnarFrame {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a column with an empty value sequence; returns its index.
    pub fn add_column(&mut self, name: &str) -> usize {
        self.columns.push(FrameColumn {
            name: name.to_owned(),
            values: Vec::new(),
        });
        self.columns.len() - 1
    }

    /// Append one cell to the column at `index`.
    ///
    /// # Panics
    /// Panics if the column was never registered; the pipeline registers
    /// every column before the first row is stepped.
    pub fn push_cell(&mut self, index: usize, value: String) {
        self.columns[index].values.push(value);
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// The first column with this name, if any.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[String]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of complete data rows appended so far.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.columns.iter().map(|c| c.values.len()).min().unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Row-wise objects (`[{column: cell, ...}, ...]`) for data consumers
    /// that want records rather than columns.
    #[must_use]
    pub fn row_objects(&self) -> Vec<serde_json::Value> {
        (0..self.row_count())
            .map(|row| {
                let mut object = serde_json::Map::new();
                for column in &self.columns {
                    object.insert(
                        column.name.clone(),
                        serde_json::Value::String(column.values[row].clone()),
                    );
                }
                serde_json::Value::Object(object)
            })
            .collect()
    }
}
