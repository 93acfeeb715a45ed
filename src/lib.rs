#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Rotation-based label ownership and slot consumption.
pub mod assign;
/// Partitioner configuration types.
pub mod config;
/// Centralized constants used across validation, defaults, and loaders.
pub mod constants;
/// Dataset capability trait and the in-memory backend.
pub mod dataset;
/// Reusable example runners shared by demo binaries.
pub mod example_apps;
/// Label → row index grouping.
pub mod indexer;
/// Distribution and sampling matrices.
pub mod matrix;
/// Aggregate metrics helpers.
pub mod metrics;
/// Partitioner interface and distribution-driven implementation.
pub mod partitioner;
/// Deterministic generator and the per-partition shuffle stage.
pub mod shuffle;
/// Shared type aliases.
pub mod types;

mod errors;

pub use assign::{PartitionAssigner, PartitionAssignment, SlotClaim, SlotTracker};
pub use config::{PartitionerConfig, RemainderPolicy};
pub use dataset::{InMemoryDataset, LabelValue, LabeledDataset};
pub use errors::PartitionError;
pub use indexer::LabelIndex;
pub use matrix::{DistributionMatrix, SamplingMatrix};
pub use metrics::{PartitionShare, PartitionSkew, label_composition, partition_skew};
pub use partitioner::{DistributionPartitioner, Partitioner};
pub use shuffle::{DeterministicRng, ShuffleStage};
pub use types::{ColumnName, PartitionId, RowIndex, SampleCount, SlotIndex};
