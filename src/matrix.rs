//! Distribution and sampling matrices.
//!
//! Rows are distinct labels in ascending order; columns are slots. A slot is
//! consumed by exactly one partition for that label, so the column count is
//! `num_unique_labels_per_partition * num_partitions / num_unique_labels`.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{PartitionerConfig, RemainderPolicy};
use crate::constants::validation::SHAPE_FORMULA;
use crate::errors::PartitionError;
use crate::types::{SampleCount, SlotIndex};

/// Caller-supplied target distribution (counts, or weights when rescaling).
///
/// Stored row-major. Serializes as a JSON array of equally sized rows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct DistributionMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl DistributionMatrix {
    /// Build from nested rows. Every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, PartitionError> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != cols) {
            return Err(PartitionError::Shape(format!(
                "row {idx} has {} columns, expected {cols}",
                row.len()
            )));
        }
        let num_rows = rows.len();
        let data = rows.into_iter().flatten().collect();
        Ok(Self {
            rows: num_rows,
            cols,
            data,
        })
    }

    /// Build from a row-major buffer.
    pub fn from_flat(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self, PartitionError> {
        if rows * cols != data.len() {
            return Err(PartitionError::Shape(format!(
                "{rows}x{cols} matrix needs {} values, got {}",
                rows * cols,
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// A `rows x cols` matrix with every cell set to `value`.
    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Number of label rows.
    pub fn num_rows(&self) -> usize {
        self.rows
    }

    /// Number of slot columns.
    pub fn num_cols(&self) -> usize {
        self.cols
    }

    /// Borrow row `row`.
    ///
    /// # Panics
    /// Panics if `row >= num_rows()`.
    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Cell value, if in range.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    /// Reject NaN, infinite, and negative cells.
    pub fn validate_values(&self) -> Result<(), PartitionError> {
        for (pos, value) in self.data.iter().enumerate() {
            if !value.is_finite() || *value < 0.0 {
                let (row, col) = (pos / self.cols.max(1), pos % self.cols.max(1));
                return Err(PartitionError::Configuration(format!(
                    "distribution array cell [{row}, {col}] must be a finite non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Check the column count against `num_partitions` and
    /// `num_unique_labels_per_partition`; returns the slot count per label.
    pub fn validate_shape(
        &self,
        num_partitions: usize,
        num_unique_labels_per_partition: usize,
    ) -> Result<usize, PartitionError> {
        let num_labels = self.rows;
        if num_labels == 0 {
            return Err(PartitionError::Shape(
                "the distribution array has no label rows".to_string(),
            ));
        }
        if num_unique_labels_per_partition == 0 {
            return Err(PartitionError::Configuration(
                "num_unique_labels_per_partition must be greater than zero".to_string(),
            ));
        }
        if num_unique_labels_per_partition > num_labels {
            return Err(PartitionError::Configuration(format!(
                "num_unique_labels_per_partition ({num_unique_labels_per_partition}) exceeds the number of labels ({num_labels})"
            )));
        }
        let consumers = num_unique_labels_per_partition.checked_mul(num_partitions);
        if consumers.is_none_or(|consumers| {
            consumers % num_labels != 0 || consumers / num_labels != self.cols
        }) {
            return Err(PartitionError::Shape(format!(
                "expected {num_labels} x ({SHAPE_FORMULA}) = {num_labels} x ({num_unique_labels_per_partition}*{num_partitions}/{num_labels}), found {num_labels} x {}",
                self.cols
            )));
        }
        Ok(self.cols)
    }

    /// Private copy with each row scaled to sum to one.
    fn row_normalized(&self) -> Result<Self, PartitionError> {
        let mut normalized = self.clone();
        for row in 0..self.rows {
            let sum: f64 = self.row(row).iter().sum();
            if sum <= 0.0 {
                return Err(PartitionError::Configuration(format!(
                    "distribution array row {row} has no positive weight to rescale"
                )));
            }
            for value in &mut normalized.data[row * self.cols..(row + 1) * self.cols] {
                *value /= sum;
            }
        }
        Ok(normalized)
    }
}

impl TryFrom<Vec<Vec<f64>>> for DistributionMatrix {
    type Error = PartitionError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<DistributionMatrix> for Vec<Vec<f64>> {
    fn from(matrix: DistributionMatrix) -> Self {
        if matrix.cols == 0 {
            return vec![Vec::new(); matrix.rows];
        }
        matrix
            .data
            .chunks(matrix.cols)
            .map(<[f64]>::to_vec)
            .collect()
    }
}

/// Exact number of rows each (label, slot) pair receives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SamplingMatrix {
    rows: usize,
    cols: usize,
    data: Vec<SampleCount>,
}

impl SamplingMatrix {
    /// Resolve `config.distribution_array` into integer counts.
    ///
    /// `label_counts[i]` is the number of dataset rows carrying the i-th
    /// label in ascending order. The caller's matrix is left untouched.
    pub fn resolve(
        config: &PartitionerConfig,
        label_counts: &[usize],
    ) -> Result<Self, PartitionError> {
        let distribution = &config.distribution_array;
        distribution.validate_values()?;
        let (rows, cols) = distribution.shape();
        if label_counts.len() != rows {
            return Err(PartitionError::Configuration(format!(
                "distribution array has {rows} label rows but {} label counts were supplied",
                label_counts.len()
            )));
        }

        if !config.rescale {
            let data = distribution
                .data
                .iter()
                .map(|value| value.trunc() as SampleCount)
                .collect();
            return Ok(Self { rows, cols, data });
        }

        let normalized = distribution.row_normalized()?;
        let preassigned = config.preassigned_num_samples_per_label;
        let total_preassigned = preassigned
            .checked_mul(config.num_unique_labels_per_partition)
            .and_then(|value| value.checked_mul(config.num_partitions))
            .map(|value| value / rows)
            .ok_or_else(|| {
                PartitionError::Configuration(format!(
                    "preassigned_num_samples_per_label ({preassigned}) overflows the per-label floor"
                ))
            })?;

        let mut data = Vec::with_capacity(rows * cols);
        for (row, &count) in label_counts.iter().enumerate() {
            let Some(budget) = count.checked_sub(total_preassigned) else {
                return Err(PartitionError::Configuration(format!(
                    "label row {row} has {count} samples, fewer than the {total_preassigned} required by preassigned_num_samples_per_label"
                )));
            };
            let exact: Vec<f64> = normalized
                .row(row)
                .iter()
                .map(|weight| weight * budget as f64)
                .collect();
            let mut counts: Vec<SampleCount> =
                exact.iter().map(|value| value.floor() as SampleCount).collect();
            let floored = saturating_sum(&counts);
            let remainder = budget.saturating_sub(floored);
            match config.remainder_policy {
                RemainderPolicy::Drop => {
                    if remainder > 0 {
                        warn!(
                            row,
                            dropped = remainder,
                            "floor rounding leaves samples unassigned"
                        );
                    }
                }
                RemainderPolicy::Pad => pad_largest_fractions(&mut counts, &exact, remainder),
            }
            for value in counts {
                data.push(value.checked_add(preassigned).ok_or_else(|| {
                    PartitionError::Configuration(format!(
                        "label row {row} count overflows after adding the preassigned floor"
                    ))
                })?);
            }
        }
        Ok(Self { rows, cols, data })
    }

    /// Build directly from integer rows.
    pub fn from_rows(rows: Vec<Vec<SampleCount>>) -> Result<Self, PartitionError> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|row| row.len() != cols) {
            return Err(PartitionError::Shape(
                "sampling matrix rows must have equal length".to_string(),
            ));
        }
        let num_rows = rows.len();
        Ok(Self {
            rows: num_rows,
            cols,
            data: rows.into_iter().flatten().collect(),
        })
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Counts of label row `row`, one per slot.
    ///
    /// # Panics
    /// Panics if `row` is out of range.
    pub fn row(&self, row: usize) -> &[SampleCount] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Count for (`row`, `slot`), if in range.
    pub fn get(&self, row: usize, slot: SlotIndex) -> Option<SampleCount> {
        if row < self.rows && slot < self.cols {
            Some(self.data[row * self.cols + slot])
        } else {
            None
        }
    }

    /// Sum of label row `row`, saturating at `usize::MAX`.
    pub fn row_sum(&self, row: usize) -> SampleCount {
        saturating_sum(self.row(row))
    }

    /// Sum over all cells, saturating at `usize::MAX`.
    pub fn total(&self) -> SampleCount {
        saturating_sum(&self.data)
    }
}

fn saturating_sum(values: &[SampleCount]) -> SampleCount {
    values
        .iter()
        .fold(0, |acc: SampleCount, &value| acc.saturating_add(value))
}

fn pad_largest_fractions(counts: &mut [SampleCount], exact: &[f64], remainder: SampleCount) {
    if counts.is_empty() {
        return;
    }
    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let frac_a = exact[a] - exact[a].floor();
        let frac_b = exact[b] - exact[b].floor();
        frac_b.total_cmp(&frac_a).then(a.cmp(&b))
    });
    for pos in 0..remainder {
        counts[order[pos % order.len()]] += 1;
    }
}
