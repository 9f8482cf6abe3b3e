//! File writing utilities for transaction reports.
//!
//! Writes a list of ledger entries to CSV or JSON, either to an explicit path
//! or into a timestamped file under an output directory.

use std::fs::{create_dir_all, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use csv::Writer;

use crate::error::Result;
use crate::models::Transaction;
use crate::utils::format_date;

/// Report file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Csv,
    Json,
}

impl ReportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

/// Write `transactions` to `output_dir/transactions_<timestamp>.<ext>`.
///
/// Returns the path of the created file.
pub fn write_report_to_dir(
    transactions: &[Transaction],
    format: ReportFormat,
    output_dir: &Path,
    timestamp: &str,
) -> Result<PathBuf> {
    create_dir_all(output_dir)?;
    let file_path = output_dir.join(format!("transactions_{timestamp}.{}", format.extension()));
    write_transactions_to_file(transactions, format, &file_path)?;
    Ok(file_path)
}

/// Write transactions to a file in the specified format.
pub fn write_transactions_to_file(transactions: &[Transaction], format: ReportFormat, file_path: &Path) -> Result<()> {
    match format {
        ReportFormat::Csv => write_csv_file(transactions, file_path),
        ReportFormat::Json => write_json_file(transactions, file_path),
    }
}

/// Write transactions to a CSV file.
///
/// Includes header row: `ID, Type, Amount, Description, Date, Category`
fn write_csv_file(transactions: &[Transaction], file_path: &Path) -> Result<()> {
    let file = File::create(file_path)?;
    let mut writer = Writer::from_writer(file);

    writer.write_record(["ID", "Type", "Amount", "Description", "Date", "Category"])?;

    for tx in transactions {
        writer.write_record([
            tx.id.to_string().as_str(),
            tx.tx_type.as_str(),
            format!("{:.2}", tx.amount).as_str(),
            tx.description.as_str(),
            format_date(tx.date).as_str(),
            tx.category.as_deref().unwrap_or(""),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Write transactions to a JSON file as a pretty-printed array.
fn write_json_file(transactions: &[Transaction], file_path: &Path) -> Result<()> {
    let file = File::create(file_path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, transactions)?;
    Ok(())
}
