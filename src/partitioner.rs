//! Partitioner interface and the distribution-driven implementation.
//!
//! Ownership model:
//! - `Partitioner` is the caller-facing interface (attach a dataset, load
//!   partitions).
//! - `DistributionPartitioner` owns its frozen configuration, the attached
//!   dataset, and a compute-once assignment state. The first partition
//!   request validates, indexes, resolves, assigns and shuffles under a lock;
//!   every later request clones the cached `Arc`.

use rand::RngCore;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info};

use crate::assign::{PartitionAssigner, PartitionAssignment, validate_rotation};
use crate::config::PartitionerConfig;
use crate::constants::validation::{PARTITIONS_EXCEED_ROWS, PARTITIONS_NOT_POSITIVE};
use crate::dataset::LabeledDataset;
use crate::errors::PartitionError;
use crate::indexer::LabelIndex;
use crate::matrix::SamplingMatrix;
use crate::shuffle::{DeterministicRng, ShuffleStage};
use crate::types::{PartitionId, RowIndex};

/// Caller-facing partitioning interface.
pub trait Partitioner {
    /// Dataset type being partitioned.
    type Dataset: LabeledDataset;

    /// The attached dataset.
    fn dataset(&self) -> Result<&Self::Dataset, PartitionError>;

    /// Attach the dataset. Fails if one is already attached.
    fn assign_dataset(&mut self, dataset: Self::Dataset) -> Result<(), PartitionError>;

    /// Whether a dataset is attached.
    fn is_dataset_assigned(&self) -> bool;

    /// Rows of `partition_id` as a dataset view.
    fn load_partition(
        &self,
        partition_id: PartitionId,
    ) -> Result<<Self::Dataset as LabeledDataset>::View, PartitionError>;

    /// Total number of partitions.
    fn num_partitions(&self) -> usize;
}

/// Compute-once cache: `Pending` holds the generator until the single
/// transition to `Computed`.
enum AssignmentState<L, R> {
    Pending { rng: R },
    Computed(Arc<PartitionAssignment<L>>),
}

/// Splits a labeled dataset so each partition follows a target label
/// distribution, with labels handed out by rotation.
///
/// Validation runs lazily on the first partition request, since the
/// dataset size is only known once a dataset is attached.
pub struct DistributionPartitioner<D: LabeledDataset, R = DeterministicRng> {
    config: PartitionerConfig,
    dataset: Option<D>,
    state: Mutex<AssignmentState<D::Label, R>>,
}

impl<D: LabeledDataset> DistributionPartitioner<D, DeterministicRng> {
    /// Partitioner shuffling with a [`DeterministicRng`] seeded from `config.seed`.
    pub fn new(config: PartitionerConfig) -> Self {
        let rng = DeterministicRng::new(config.seed);
        Self::with_rng(config, rng)
    }
}

impl<D, R> DistributionPartitioner<D, R>
where
    D: LabeledDataset,
    R: RngCore,
{
    /// Partitioner shuffling with a caller-supplied generator.
    ///
    /// `config.seed` is not used in this case.
    pub fn with_rng(config: PartitionerConfig, rng: R) -> Self {
        Self {
            config,
            dataset: None,
            state: Mutex::new(AssignmentState::Pending { rng }),
        }
    }

    /// Builder-style [`Partitioner::assign_dataset`].
    pub fn with_dataset(mut self, dataset: D) -> Result<Self, PartitionError> {
        self.assign_dataset(dataset)?;
        Ok(self)
    }

    /// Frozen configuration.
    pub fn config(&self) -> &PartitionerConfig {
        &self.config
    }

    /// Number of distinct labels implied by the distribution array.
    pub fn num_unique_labels(&self) -> usize {
        self.config.num_unique_labels()
    }

    /// Whether the assignment has been computed.
    pub fn is_computed(&self) -> bool {
        self.state
            .lock()
            .map(|state| matches!(*state, AssignmentState::Computed(_)))
            .unwrap_or(false)
    }

    /// The full assignment, computing it on first use.
    pub fn assignment(&self) -> Result<Arc<PartitionAssignment<D::Label>>, PartitionError> {
        let dataset = self.dataset()?;
        let mut guard = self.state.lock().map_err(|_| {
            PartitionError::StatePoisoned("partition assignment lock poisoned".to_string())
        })?;
        let computed = match &mut *guard {
            AssignmentState::Computed(assignment) => return Ok(Arc::clone(assignment)),
            AssignmentState::Pending { rng } => Arc::new(self.compute(dataset, rng)?),
        };
        *guard = AssignmentState::Computed(Arc::clone(&computed));
        Ok(computed)
    }

    /// Row indices of `partition_id`.
    pub fn partition_indices(
        &self,
        partition_id: PartitionId,
    ) -> Result<Vec<RowIndex>, PartitionError> {
        Ok(self.assignment()?.indices(partition_id)?.to_vec())
    }

    fn compute(
        &self,
        dataset: &D,
        rng: &mut R,
    ) -> Result<PartitionAssignment<D::Label>, PartitionError> {
        let started = Instant::now();
        let config = &self.config;
        let num_partitions = config.num_partitions;
        let num_labels = config.num_unique_labels();

        validate_partition_count(num_partitions, dataset.row_count())?;
        let slots = config
            .distribution_array
            .validate_shape(num_partitions, config.num_unique_labels_per_partition)?;
        validate_rotation(
            num_partitions,
            num_labels,
            config.num_unique_labels_per_partition,
            slots,
        )?;

        let index = LabelIndex::build(dataset, &config.partition_by)?;
        if index.len() != num_labels {
            return Err(PartitionError::Configuration(format!(
                "distribution array has {num_labels} label rows but column '{}' has {} distinct labels",
                config.partition_by,
                index.len()
            )));
        }

        let sampling = SamplingMatrix::resolve(config, &index.counts())?;
        let mut assignment = PartitionAssigner::new(
            &index,
            &sampling,
            config.num_unique_labels_per_partition,
        )
        .assign(num_partitions)?;

        if config.shuffle {
            ShuffleStage::new(rng).apply(assignment.partitions_mut());
        }

        debug!(
            partitions = num_partitions,
            labels = num_labels,
            slots_per_label = slots,
            rescale = config.rescale,
            shuffle = config.shuffle,
            elapsed_ms = started.elapsed().as_millis(),
            "partition assignment computed"
        );
        info!(
            assigned = assignment.total_assigned(),
            unassigned = assignment.unassigned(),
            "partitioned dataset by '{}'",
            config.partition_by
        );
        Ok(assignment)
    }
}

impl<D, R> Partitioner for DistributionPartitioner<D, R>
where
    D: LabeledDataset,
    R: RngCore,
{
    type Dataset = D;

    fn dataset(&self) -> Result<&D, PartitionError> {
        self.dataset.as_ref().ok_or(PartitionError::DatasetNotAssigned)
    }

    fn assign_dataset(&mut self, dataset: D) -> Result<(), PartitionError> {
        if self.dataset.is_some() {
            return Err(PartitionError::DatasetAlreadyAssigned);
        }
        self.dataset = Some(dataset);
        Ok(())
    }

    fn is_dataset_assigned(&self) -> bool {
        self.dataset.is_some()
    }

    fn load_partition(&self, partition_id: PartitionId) -> Result<D::View, PartitionError> {
        let assignment = self.assignment()?;
        let indices = assignment.indices(partition_id)?;
        self.dataset()?.select(indices)
    }

    fn num_partitions(&self) -> usize {
        self.config.num_partitions
    }
}

fn validate_partition_count(num_partitions: usize, row_count: usize) -> Result<(), PartitionError> {
    if num_partitions == 0 {
        return Err(PartitionError::Size(PARTITIONS_NOT_POSITIVE.to_string()));
    }
    if num_partitions > row_count {
        return Err(PartitionError::Size(format!(
            "{PARTITIONS_EXCEED_ROWS} ({num_partitions} > {row_count})"
        )));
    }
    Ok(())
}
