use std::fs;

use tempfile::tempdir;

use finance_tracker::file_writer::{write_report_to_dir, write_transactions_to_file, ReportFormat};
use finance_tracker::models::{Transaction, TransactionType};
use finance_tracker::utils::format_date;

const DATE: i64 = 1_717_000_000_000;

fn sample() -> Vec<Transaction> {
    vec![
        Transaction {
            id: 2,
            tx_type: TransactionType::Expense,
            amount: 12.5,
            description: "Lunch, with \"friends\"".to_string(),
            date: DATE,
            category: Some("Food".to_string()),
        },
        Transaction {
            id: 1,
            tx_type: TransactionType::Income,
            amount: 1000.0,
            description: "Salary".to_string(),
            date: DATE,
            category: None,
        },
    ]
}

#[test]
fn test_csv_report_has_header_and_rows() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let path = temp_dir.path().join("report.csv");

    write_transactions_to_file(&sample(), ReportFormat::Csv, &path).expect("Failed to write CSV");

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.iter().collect::<Vec<_>>(), ["ID", "Type", "Amount", "Description", "Date", "Category"]);

    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "2");
    assert_eq!(&rows[0][1], "EXPENSE");
    assert_eq!(&rows[0][2], "12.50");
    assert_eq!(&rows[0][3], "Lunch, with \"friends\"");
    assert_eq!(&rows[0][4], format_date(DATE));
    assert_eq!(&rows[0][5], "Food");
    assert_eq!(&rows[1][5], "");
}

#[test]
fn test_json_report_round_trips() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let path = temp_dir.path().join("report.json");

    write_transactions_to_file(&sample(), ReportFormat::Json, &path).expect("Failed to write JSON");

    let parsed: Vec<Transaction> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(parsed, sample());
}

#[test]
fn test_report_to_dir_names_file_by_timestamp() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let output_dir = temp_dir.path().join("reports");

    let path = write_report_to_dir(&[], ReportFormat::Csv, &output_dir, "20240529_100000").unwrap();
    assert_eq!(path, output_dir.join("transactions_20240529_100000.csv"));
    assert!(path.exists());

    let path = write_report_to_dir(&sample(), ReportFormat::Json, &output_dir, "20240529_100000").unwrap();
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("json"));
}
