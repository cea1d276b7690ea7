//! `merge`: combine lead files and fold duplicates.

use anyhow::{Context, Result};
use leadscout_core::{BusinessRecord, Deduplicator, cross_source_merge, read_records, write_records};
use tracing::info;

use crate::cli::MergeArgs;

pub fn run_merge_command(args: &MergeArgs) -> Result<()> {
    let mut dedup: Deduplicator<BusinessRecord> = Deduplicator::new();
    let mut total = 0;
    for input in &args.inputs {
        let records = read_records(input)
            .with_context(|| format!("Failed to load '{}'", input.display()))?;
        total += records.len();
        dedup.extend(records);
    }
    let exact_duplicates = dedup.duplicates();
    let after_exact = dedup.len();
    let merged = cross_source_merge(dedup.into_vec(), args.threshold);

    write_records(&args.output, &merged)?;
    info!(
        files = args.inputs.len(),
        total,
        exact_duplicates,
        fuzzy_matches = after_exact - merged.len(),
        leads = merged.len(),
        "merge complete"
    );
    println!(
        "{} leads ({} duplicates folded) written to {}",
        merged.len(),
        total - merged.len(),
        args.output.display()
    );
    Ok(())
}
