// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One row of a query or table result, keyed by column name. Key order is
/// the order the backend sent.
pub type ResultRecord = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryOutcome {
    #[serde(default)]
    pub sql: String,
    #[serde(default)]
    pub results: Vec<ResultRecord>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableData {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<ResultRecord>,
}

impl TableData {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A rectangular, display-ready result set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultGrid {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResultGrid {
    /// Headers come from the first record's keys. Records are assumed to share
    /// one shape; each row renders its own values in its own key order.
    pub fn from_records(records: &[ResultRecord]) -> Self {
        let columns = records
            .first()
            .map(|first| first.keys().cloned().collect())
            .unwrap_or_default();
        let rows = records
            .iter()
            .map(|record| record.values().map(cell_text).collect())
            .collect();
        Self { columns, rows }
    }

    /// Headers follow the explicit column list; cells are looked up by name.
    /// A row with no value for a column gets an empty cell.
    pub fn from_table(data: &TableData) -> Self {
        let rows = data
            .rows
            .iter()
            .map(|record| {
                data.columns
                    .iter()
                    .map(|column| record.get(column).map(cell_text).unwrap_or_default())
                    .collect()
            })
            .collect();
        Self {
            columns: data.columns.clone(),
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "null".to_owned(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

pub fn format_results_table(grid: &ResultGrid) -> String {
    if grid.is_empty() {
        return "(no rows)\n".to_owned();
    }

    let mut out = String::new();
    out.push_str(&grid.columns.join(" | "));
    out.push('\n');
    for row in &grid.rows {
        out.push_str(&row.join(" | "));
        out.push('\n');
    }
    out
}
