use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::status::StatusReport;

/// Column definition returned by a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultColumn {
    /// Column label as it appears in the result set header.
    pub name: String,
    /// Athena data type (e.g. "varchar", "bigint").
    pub data_type: String,
}

impl ResultColumn {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// One page of results from a succeeded query.
///
/// Rows are stored as `Vec<Option<String>>` where `None` represents SQL NULL.
/// Column ordering in each row matches the `columns` vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResultSet {
    pub columns: Vec<ResultColumn>,
    pub rows: Vec<Vec<Option<String>>>,
    pub metadata: StatusReport,
}

/// One result row keyed by column label, in column order.
pub type Record = IndexMap<String, String>;

impl QueryResultSet {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Rows as `label -> value` records. NULL and missing cells become `""`.
    pub fn to_records(&self) -> Vec<Record> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .enumerate()
                    .map(|(i, col)| {
                        let value = row.get(i).cloned().flatten().unwrap_or_default();
                        (col.name.clone(), value)
                    })
                    .collect()
            })
            .collect()
    }
}
