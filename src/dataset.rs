//! Dataset capabilities required by the partitioner, plus an in-memory backend.
//!
//! The partitioner never touches row payloads. It only needs to read one
//! label column, count rows, and hand an index list back to the dataset for
//! selection. `LabeledDataset` captures exactly that surface so any storage
//! backend can be partitioned.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::hash::Hash;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::constants::dataset::ANY_COLUMN;
use crate::errors::PartitionError;
use crate::types::{ColumnName, RowIndex};

/// Capability set the partitioner requires from a dataset.
///
/// Implementations must return column values aligned with row indices
/// (`column_values(c)[i]` is the label of row `i`) and must keep that
/// alignment stable for the lifetime of the partitioner.
pub trait LabeledDataset: Send + Sync {
    /// Label value type. Ascending `Ord` order drives label rotation.
    type Label: Clone + Ord + Hash + fmt::Debug + Send + Sync;
    /// Result of selecting a subset of rows.
    type View;

    /// Distinct values of `column`, in ascending order.
    fn distinct_values(&self, column: &str) -> Result<Vec<Self::Label>, PartitionError> {
        let mut values = self.column_values(column)?;
        values.sort();
        values.dedup();
        Ok(values)
    }

    /// All values of `column`, aligned with row index.
    fn column_values(&self, column: &str) -> Result<Vec<Self::Label>, PartitionError>;

    /// Total number of rows.
    fn row_count(&self) -> usize;

    /// Restrict the dataset to `indices`, preserving their order.
    fn select(&self, indices: &[RowIndex]) -> Result<Self::View, PartitionError>;
}

/// Scalar label value for the in-memory backend.
///
/// Integers sort before text; within a variant the natural order applies.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelValue {
    /// Integer label (class index).
    Int(i64),
    /// Text label (class name).
    Text(String),
}

impl fmt::Display for LabelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelValue::Int(value) => write!(f, "{value}"),
            LabelValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for LabelValue {
    fn from(value: i64) -> Self {
        LabelValue::Int(value)
    }
}

impl From<i32> for LabelValue {
    fn from(value: i32) -> Self {
        LabelValue::Int(i64::from(value))
    }
}

impl From<&str> for LabelValue {
    fn from(value: &str) -> Self {
        LabelValue::Text(value.to_string())
    }
}

impl From<String> for LabelValue {
    fn from(value: String) -> Self {
        LabelValue::Text(value)
    }
}

/// Column-oriented dataset held entirely in memory.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InMemoryDataset {
    columns: IndexMap<ColumnName, Vec<LabelValue>>,
    rows: usize,
}

impl InMemoryDataset {
    /// Create an empty dataset with no columns and no rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a single-column dataset.
    pub fn from_labels<I, V>(column: impl Into<ColumnName>, labels: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<LabelValue>,
    {
        let values: Vec<LabelValue> = labels.into_iter().map(Into::into).collect();
        let rows = values.len();
        let mut columns = IndexMap::new();
        columns.insert(column.into(), values);
        Self { columns, rows }
    }

    /// Add (or replace) a column. Its length must match the existing row count.
    pub fn with_column<I, V>(
        mut self,
        column: impl Into<ColumnName>,
        values: I,
    ) -> Result<Self, PartitionError>
    where
        I: IntoIterator<Item = V>,
        V: Into<LabelValue>,
    {
        let column = column.into();
        let values: Vec<LabelValue> = values.into_iter().map(Into::into).collect();
        let replacing_only_column = self.columns.len() == 1 && self.columns.contains_key(&column);
        if !self.columns.is_empty() && !replacing_only_column && values.len() != self.rows {
            return Err(PartitionError::Dataset {
                column,
                reason: format!(
                    "column has {} rows but the dataset has {}",
                    values.len(),
                    self.rows
                ),
            });
        }
        self.rows = values.len();
        self.columns.insert(column, values);
        Ok(self)
    }

    /// Load a JSON Lines file: one JSON object per row.
    pub fn from_jsonl_path(path: impl AsRef<Path>) -> Result<Self, PartitionError> {
        let file = File::open(path.as_ref())?;
        Self::from_jsonl_reader(BufReader::new(file))
    }

    /// Parse JSON Lines from any buffered reader.
    ///
    /// Integer and string fields become columns; every row must carry the
    /// same set of fields. Blank lines are skipped.
    pub fn from_jsonl_reader<R: BufRead>(reader: R) -> Result<Self, PartitionError> {
        let mut columns: IndexMap<ColumnName, Vec<LabelValue>> = IndexMap::new();
        let mut rows = 0usize;
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let object: serde_json::Map<String, serde_json::Value> =
                serde_json::from_str(trimmed)?;
            if rows > 0 && object.len() != columns.len() {
                return Err(PartitionError::Dataset {
                    column: ANY_COLUMN.to_string(),
                    reason: format!(
                        "line {} has {} fields, expected {}",
                        line_no + 1,
                        object.len(),
                        columns.len()
                    ),
                });
            }
            for (key, value) in object {
                let value = json_to_label(&key, value, line_no + 1)?;
                if rows == 0 {
                    columns.entry(key).or_default().push(value);
                    continue;
                }
                let Some(column) = columns.get_mut(&key) else {
                    return Err(PartitionError::Dataset {
                        column: key,
                        reason: format!("line {} introduces an unknown field", line_no + 1),
                    });
                };
                column.push(value);
            }
            rows += 1;
        }
        Ok(Self { columns, rows })
    }

    /// Borrow the values of `column`, if present.
    pub fn column(&self, column: &str) -> Option<&[LabelValue]> {
        self.columns.get(column).map(Vec::as_slice)
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    fn require_column(&self, column: &str) -> Result<&[LabelValue], PartitionError> {
        self.column(column).ok_or_else(|| PartitionError::Dataset {
            column: column.to_string(),
            reason: "column not found".to_string(),
        })
    }
}

fn json_to_label(
    key: &str,
    value: serde_json::Value,
    line_no: usize,
) -> Result<LabelValue, PartitionError> {
    match value {
        serde_json::Value::String(text) => Ok(LabelValue::Text(text)),
        serde_json::Value::Number(number) => {
            number
                .as_i64()
                .map(LabelValue::Int)
                .ok_or_else(|| PartitionError::Dataset {
                    column: key.to_string(),
                    reason: format!("line {line_no}: only integer numbers are supported"),
                })
        }
        other => Err(PartitionError::Dataset {
            column: key.to_string(),
            reason: format!("line {line_no}: unsupported value {other}"),
        }),
    }
}

impl LabeledDataset for InMemoryDataset {
    type Label = LabelValue;
    type View = InMemoryDataset;

    fn column_values(&self, column: &str) -> Result<Vec<LabelValue>, PartitionError> {
        Ok(self.require_column(column)?.to_vec())
    }

    fn row_count(&self) -> usize {
        self.rows
    }

    fn select(&self, indices: &[RowIndex]) -> Result<InMemoryDataset, PartitionError> {
        if let Some(&bad) = indices.iter().find(|&&idx| idx >= self.rows) {
            return Err(PartitionError::Dataset {
                column: ANY_COLUMN.to_string(),
                reason: format!("row {bad} out of range for {} rows", self.rows),
            });
        }
        let columns = self
            .columns
            .iter()
            .map(|(name, values)| {
                let picked = indices.iter().map(|&idx| values[idx].clone()).collect();
                (name.clone(), picked)
            })
            .collect();
        Ok(Self {
            columns,
            rows: indices.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_values_are_sorted_and_deduped() {
        let dataset = InMemoryDataset::from_labels("label", [3, 1, 2, 1, 3]);
        let distinct = dataset.distinct_values("label").unwrap();
        assert_eq!(
            distinct,
            vec![LabelValue::Int(1), LabelValue::Int(2), LabelValue::Int(3)]
        );
    }

    #[test]
    fn integers_sort_before_text() {
        let mut values = vec![
            LabelValue::from("cat"),
            LabelValue::from(7),
            LabelValue::from("ant"),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                LabelValue::Int(7),
                LabelValue::from("ant"),
                LabelValue::from("cat")
            ]
        );
    }

    #[test]
    fn select_preserves_requested_order() {
        let dataset = InMemoryDataset::from_labels("label", ["a", "b", "c", "d"])
            .with_column("id", [10, 11, 12, 13])
            .unwrap();
        let view = dataset.select(&[3, 0]).unwrap();
        assert_eq!(view.row_count(), 2);
        assert_eq!(
            view.column("label").unwrap(),
            &[LabelValue::from("d"), LabelValue::from("a")]
        );
        assert_eq!(
            view.column("id").unwrap(),
            &[LabelValue::Int(13), LabelValue::Int(10)]
        );
    }

    #[test]
    fn select_rejects_out_of_range_rows() {
        let dataset = InMemoryDataset::from_labels("label", [0, 1]);
        let err = dataset.select(&[0, 2]).unwrap_err();
        assert!(matches!(err, PartitionError::Dataset { .. }));
    }

    #[test]
    fn missing_column_is_reported() {
        let dataset = InMemoryDataset::from_labels("label", [0, 1]);
        let err = dataset.column_values("target").unwrap_err();
        match err {
            PartitionError::Dataset { column, .. } => assert_eq!(column, "target"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn with_column_rejects_length_mismatch() {
        let err = InMemoryDataset::from_labels("label", [0, 1, 2])
            .with_column("id", [1, 2])
            .unwrap_err();
        assert!(matches!(err, PartitionError::Dataset { .. }));
    }

    #[test]
    fn jsonl_reader_builds_columns() {
        let input = "{\"label\": 1, \"name\": \"x\"}\n\n{\"label\": 0, \"name\": \"y\"}\n";
        let dataset = InMemoryDataset::from_jsonl_reader(input.as_bytes()).unwrap();
        assert_eq!(dataset.row_count(), 2);
        assert_eq!(
            dataset.column("label").unwrap(),
            &[LabelValue::Int(1), LabelValue::Int(0)]
        );
        assert_eq!(dataset.column_names().collect::<Vec<_>>(), vec!["label", "name"]);
    }

    #[test]
    fn jsonl_reader_rejects_unsupported_values() {
        let input = "{\"label\": 1.5}\n";
        let err = InMemoryDataset::from_jsonl_reader(input.as_bytes()).unwrap_err();
        assert!(matches!(err, PartitionError::Dataset { .. }));
    }

    #[test]
    fn jsonl_reader_rejects_unknown_fields() {
        let input = "{\"label\": 1}\n{\"target\": 0}\n";
        let err = InMemoryDataset::from_jsonl_reader(input.as_bytes()).unwrap_err();
        match err {
            PartitionError::Dataset { column, .. } => assert_eq!(column, "target"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
