/// Constants used by partitioner configuration defaults.
pub mod config {
    /// Default label column used when `partition_by` is not configured.
    pub const DEFAULT_PARTITION_BY: &str = "label";
    /// Default shuffle seed (matches common federated benchmark setups).
    pub const DEFAULT_SEED: u64 = 42;
    /// Sampling counts are rescaled from weights unless disabled.
    pub const DEFAULT_RESCALE: bool = true;
    /// Partition index order is shuffled unless disabled.
    pub const DEFAULT_SHUFFLE: bool = true;
    /// Guaranteed per-(label, slot) floor when none is configured.
    pub const DEFAULT_PREASSIGNED_NUM_SAMPLES_PER_LABEL: usize = 0;
}

/// Constants used by validation messages.
pub mod validation {
    /// Message emitted when `num_partitions` is zero.
    pub const PARTITIONS_NOT_POSITIVE: &str = "the number of partitions must be greater than zero";
    /// Message emitted when `num_partitions` exceeds the number of dataset rows.
    pub const PARTITIONS_EXCEED_ROWS: &str =
        "the number of partitions must not exceed the number of samples in the dataset";
    /// Required column-count formula for the distribution array.
    pub const SHAPE_FORMULA: &str =
        "num_unique_labels_per_partition * num_partitions / num_unique_labels";
}

/// Constants used by the deterministic generator.
pub mod rng {
    /// SplitMix64 increment.
    pub const SPLITMIX_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;
    /// SplitMix64 first mixing multiplier.
    pub const SPLITMIX_MUL_A: u64 = 0xBF58_476D_1CE4_E5B9;
    /// SplitMix64 second mixing multiplier.
    pub const SPLITMIX_MUL_B: u64 = 0x94D0_49BB_1331_11EB;
}

/// Constants used by the JSON Lines dataset loader.
pub mod dataset {
    /// Column name reported for errors that are not tied to a single column.
    pub const ANY_COLUMN: &str = "*";
}
