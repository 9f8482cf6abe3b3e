use tempfile::tempdir;

use finance_tracker::config::DatabaseConfig;
use finance_tracker::db::{establish_connection, Database};
use finance_tracker::error::{FinanceError, Result};
use finance_tracker::models::{NewContact, NewTransaction, TransactionType};
use finance_tracker::repository;

#[test]
fn test_database_creation_and_initialization() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("nested").join("test.db");
    let db_url = format!("sqlite://{}", db_path.display());

    // Parent directories are created on demand
    let db = Database::new(&db_url).expect("Failed to create database");
    assert!(db_path.exists());

    let counts = db.table_counts().expect("Failed to count rows");
    assert_eq!((counts.contacts, counts.transactions, counts.loans), (0, 0, 0));
}

#[test]
fn test_reopening_keeps_data() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let config = DatabaseConfig {
        path: temp_dir.path().join("ledger.db").display().to_string(),
        max_connections: 2,
        connection_timeout_secs: 5,
    };

    {
        let db = establish_connection(&config).expect("Failed to create database");
        let conn = db.get_connection().unwrap();
        repository::contacts::insert(&conn, &NewContact { name: "Kept".to_string(), phone: None }).unwrap();
    }

    let db = establish_connection(&config).expect("Failed to reopen database");
    assert_eq!(db.table_counts().unwrap().contacts, 1);
}

#[test]
fn test_unit_of_work_is_all_or_nothing() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let db = Database::new(temp_dir.path().join("test.db").to_str().unwrap()).unwrap();

    let salary = NewTransaction {
        tx_type: TransactionType::Income,
        amount: 100.0,
        description: "Salary".to_string(),
        date: 0,
        category: None,
    };

    let result: Result<()> = db.unit_of_work("test", |conn| {
        repository::transactions::insert(conn, &salary)?;
        repository::transactions::insert(conn, &salary)?;
        Err(FinanceError::Other("second thoughts".to_string()))
    });
    assert!(result.is_err());
    assert_eq!(db.table_counts().unwrap().transactions, 0);
}

#[test]
fn test_clones_share_the_pool() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let db = Database::new(temp_dir.path().join("test.db").to_str().unwrap()).unwrap();
    let other = db.clone();

    other
        .unit_of_work("insert", |conn| {
            repository::contacts::insert(conn, &NewContact { name: "Shared".to_string(), phone: None })
        })
        .unwrap();
    assert_eq!(db.table_counts().unwrap().contacts, 1);
}
