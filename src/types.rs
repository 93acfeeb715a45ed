/// Zero-based partition identifier.
/// Example: `0` for the first participant, `num_partitions - 1` for the last.
pub type PartitionId = usize;
/// Position of a row inside the unpartitioned dataset.
/// Example: `17` selects the eighteenth row.
pub type RowIndex = usize;
/// Name of a dataset column.
/// Examples: `label`, `fine_label`, `category`
pub type ColumnName = String;
/// Zero-based slot (column) of the distribution and sampling matrices.
/// Example: `2` is the third partition to consume a given label.
pub type SlotIndex = usize;
/// Per-label count of rows requested for one slot.
/// Example: `50`
pub type SampleCount = usize;
