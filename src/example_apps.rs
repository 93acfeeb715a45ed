use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, error::ErrorKind};

use crate::config::{PartitionerConfig, RemainderPolicy};
use crate::dataset::{InMemoryDataset, LabeledDataset};
use crate::metrics::{label_composition, partition_skew};
use crate::partitioner::{DistributionPartitioner, Partitioner};

#[derive(Debug, Parser)]
#[command(
    name = "partition_demo",
    disable_help_subcommand = true,
    about = "Partition a JSON Lines dataset by a target label distribution",
    long_about = "Assign dataset rows to partitions so each partition follows the configured per-label distribution, then print partition sizes and label composition.",
    after_help = "The config file is JSON with `distribution_array`, `num_partitions`, `num_unique_labels_per_partition` and optional `partition_by`, `preassigned_num_samples_per_label`, `rescale`, `shuffle`, `seed`, `remainder_policy`."
)]
/// CLI for `partition_demo`.
///
/// Common usage:
/// - Summary of every partition: `--dataset rows.jsonl --config partitioner.json`
/// - Indices of one partition: `--partition-id 3`
/// - Reproduce a different shuffle: `--seed 7`
struct PartitionDemoCli {
    #[arg(long, value_name = "PATH", help = "JSON Lines dataset, one object per row")]
    dataset: PathBuf,
    #[arg(long, value_name = "PATH", help = "JSON partitioner configuration")]
    config: PathBuf,
    #[arg(long, help = "Optional shuffle seed override")]
    seed: Option<u64>,
    #[arg(long = "no-shuffle", help = "Keep label-block order inside partitions")]
    no_shuffle: bool,
    #[arg(
        long = "pad-remainder",
        help = "Pad floor-rounding remainders so label totals are preserved"
    )]
    pad_remainder: bool,
    #[arg(
        long = "partition-id",
        value_name = "ID",
        help = "Print the row indices of a single partition"
    )]
    partition_id: Option<usize>,
}

/// Run the partition demo with CLI-style arguments (program name excluded).
pub fn run_partition_demo<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let Some(cli) = parse_cli::<PartitionDemoCli, _>(
        std::iter::once("partition_demo".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };

    let mut config = PartitionerConfig::from_json_path(&cli.config)?;
    config.seed = cli.seed.unwrap_or(config.seed);
    if cli.no_shuffle {
        config.shuffle = false;
    }
    if cli.pad_remainder {
        config.remainder_policy = RemainderPolicy::Pad;
    }
    let dataset = InMemoryDataset::from_jsonl_path(&cli.dataset)?;
    let row_labels = dataset.column_values(&config.partition_by)?;
    let partitioner = DistributionPartitioner::new(config).with_dataset(dataset)?;

    if let Some(partition_id) = cli.partition_id {
        let indices = partitioner.partition_indices(partition_id)?;
        println!("=== partition {partition_id} ({} rows) ===", indices.len());
        let rendered: Vec<String> = indices.iter().map(ToString::to_string).collect();
        println!("{}", rendered.join(","));
        return Ok(());
    }

    let assignment = partitioner.assignment()?;
    let composition = label_composition(&assignment, &row_labels);
    println!(
        "=== {} partitions over {} labels ===",
        partitioner.num_partitions(),
        assignment.labels().len()
    );
    for (partition_id, rows) in assignment.iter() {
        let labels: Vec<String> = composition[partition_id]
            .iter()
            .map(|(label, count)| format!("{label}={count}"))
            .collect();
        println!(
            "partition {partition_id:>4}: {:>7} rows | {}",
            rows.len(),
            labels.join(" ")
        );
    }
    if let Some(skew) = partition_skew(&assignment) {
        println!(
            "assigned: {} | unassigned: {} | min: {} | max: {} | mean: {:.2} | max/min: {:.2}",
            skew.total,
            assignment.unassigned(),
            skew.min,
            skew.max,
            skew.mean,
            skew.ratio
        );
    }
    Ok(())
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}
