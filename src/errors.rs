use std::io;

use thiserror::Error;

use crate::types::{ColumnName, PartitionId};

/// Error type for partitioner configuration, validation, and dataset failures.
#[derive(Debug, Error)]
pub enum PartitionError {
    /// Matrix shape disagrees with the partition layout.
    #[error("distribution array has invalid shape: {0}")]
    Shape(String),
    /// `num_partitions` is zero or exceeds the dataset rows.
    #[error("invalid number of partitions: {0}")]
    Size(String),
    /// Requested partition id is out of range.
    #[error("partition {partition_id} does not exist (num_partitions = {num_partitions})")]
    Lookup {
        /// Requested id.
        partition_id: PartitionId,
        /// Partitions that exist.
        num_partitions: usize,
    },
    /// Static configuration problem.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A partition was requested before a dataset was attached.
    #[error("no dataset assigned to the partitioner")]
    DatasetNotAssigned,
    /// A second dataset was attached.
    #[error("a dataset is already assigned to the partitioner")]
    DatasetAlreadyAssigned,
    /// Dataset collaborator failure for a column.
    #[error("dataset column '{column}' failed: {reason}")]
    Dataset {
        /// Column being read.
        column: ColumnName,
        /// Failure description.
        reason: String,
    },
    /// Assignment lock was poisoned.
    #[error("partition state unavailable: {0}")]
    StatePoisoned(String),
    /// Reading a config or dataset file failed.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Config or dataset JSON failed to parse.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
