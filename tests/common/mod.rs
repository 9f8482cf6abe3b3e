#![allow(dead_code)]

use std::sync::Arc;

use tempfile::{tempdir, TempDir};

use finance_tracker::contacts::ContactService;
use finance_tracker::db::Database;
use finance_tracker::loans::LoanLedger;
use finance_tracker::metrics::MetricsCollector;
use finance_tracker::models::{Contact, NewContact, NewTransaction, TransactionType};
use finance_tracker::transactions::TransactionLedger;
use finance_tracker::utils::FixedClock;

/// Fixed "now" used by ledgers under test
pub const NOW: i64 = 1_717_000_000_000;

/// File-backed database in a temporary directory
pub struct TestLedger {
    pub dir: TempDir,
    pub db: Database,
    pub metrics: MetricsCollector,
    pub transactions: TransactionLedger,
    pub loans: LoanLedger,
    pub contacts: ContactService,
}

impl TestLedger {
    pub fn new() -> Self {
        let dir = tempdir().expect("Failed to create temp directory");
        let db_url = format!("sqlite://{}", dir.path().join("test.db").display());
        let db = Database::new(&db_url).expect("Failed to create database");
        let metrics = MetricsCollector::new();
        let clock = Arc::new(FixedClock(NOW));

        Self {
            transactions: TransactionLedger::with_clock(db.clone(), metrics.clone(), clock.clone()),
            loans: LoanLedger::with_clock(db.clone(), metrics.clone(), clock),
            contacts: ContactService::new(db.clone(), metrics.clone()).expect("Failed to create contact service"),
            dir,
            db,
            metrics,
        }
    }

    pub fn contact(&self, name: &str) -> Contact {
        self.contacts
            .add(&NewContact { name: name.to_string(), phone: None })
            .expect("Failed to add contact")
    }

    pub fn income(&self, amount: f64) {
        self.transactions
            .add(&NewTransaction {
                tx_type: TransactionType::Income,
                amount,
                description: "Salary".to_string(),
                date: NOW,
                category: Some("Salary".to_string()),
            })
            .expect("Failed to add income");
    }
}
