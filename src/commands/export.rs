//! `export`: CSV, HTML, markdown or JSON.

use std::fs::File;
use std::io::BufWriter;

use anyhow::{Context, Result};
use leadscout_core::export::{render_dashboard, render_report, write_csv, write_text};
use leadscout_core::{read_records, write_records};

use crate::cli::{ExportArgs, ExportFormat};

pub fn run_export_command(args: &ExportArgs) -> Result<()> {
    let records = read_records(&args.input)?;
    match args.format {
        ExportFormat::Csv => {
            if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create '{}'", parent.display()))?;
            }
            let file = File::create(&args.output)
                .with_context(|| format!("Failed to create '{}'", args.output.display()))?;
            write_csv(BufWriter::new(file), &records)?;
        }
        ExportFormat::Html => write_text(&args.output, &render_dashboard(&records, &args.title))?,
        ExportFormat::Markdown => write_text(&args.output, &render_report(&records, args.top))?,
        ExportFormat::Json => write_records(&args.output, &records)?,
    }
    println!(
        "{} leads exported to {}",
        records.len(),
        args.output.display()
    );
    Ok(())
}
