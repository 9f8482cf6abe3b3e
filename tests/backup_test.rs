mod common;

use std::fs;
use std::sync::Arc;

use common::{TestLedger, NOW};
use finance_tracker::backup::{BackupService, BackupSnapshot, BACKUP_VERSION};
use finance_tracker::error::FinanceError;
use finance_tracker::models::{AppSettings, Loan, LoanStatus, LoanType, NewLoan};
use finance_tracker::utils::FixedClock;

fn service(ledger: &TestLedger) -> BackupService {
    BackupService::with_clock(
        ledger.db.clone(),
        ledger.dir.path().join("backups"),
        ledger.metrics.clone(),
        Arc::new(FixedClock(NOW)),
    )
}

fn populated() -> TestLedger {
    let ledger = TestLedger::new();
    ledger.income(2000.0);
    let bob = ledger.contact("Bob");
    let loan = ledger
        .loans
        .create(&NewLoan { contact_id: bob.id, amount: 500.0, loan_type: LoanType::Given, date: NOW, interest_rate: 10.0 })
        .unwrap();
    ledger.loans.repay(loan.id, 150.0).unwrap();
    ledger
}

#[test]
fn test_export_writes_named_snapshot() {
    let ledger = populated();
    let backups = service(&ledger);

    let name = backups.export(&AppSettings::default()).expect("Failed to export");
    assert_eq!(name, "backup_2024-05-29T16-26-40.000Z.json");

    let snapshot = backups.read(&name).unwrap();
    assert_eq!(snapshot.version, BACKUP_VERSION);
    assert_eq!(snapshot.contacts.len(), 1);
    assert_eq!(snapshot.loans.len(), 1);
    assert_eq!(snapshot.transactions.len(), 3);
    assert_eq!(snapshot.settings["currency"], "XAF");

    let raw = fs::read_to_string(backups.directory().join(&name)).unwrap();
    assert!(raw.contains("\"backupDate\""));
    assert!(raw.contains("\"remainingAmount\""));
}

#[test]
fn test_restore_replaces_everything_and_keeps_ids() {
    let source = populated();
    let snapshot = service(&source).snapshot(&AppSettings { dark_mode: true, ..AppSettings::default() }).unwrap();

    let target = TestLedger::new();
    target.income(99.0);
    target.contact("Someone else");

    let current = AppSettings { currency: "EUR".to_string(), ..AppSettings::default() };
    let settings = service(&target).restore(&snapshot, &current).expect("Failed to restore");
    assert!(settings.dark_mode);
    // every key travels with the snapshot
    assert_eq!(settings.currency, "XAF");

    let restored = service(&target).snapshot(&AppSettings::default()).unwrap();
    assert_eq!(restored.contacts, snapshot.contacts);
    assert_eq!(restored.transactions, snapshot.transactions);
    assert_eq!(restored.loans, snapshot.loans);
    assert_eq!(target.transactions.current_balance().unwrap(), 1650.0);

    let loan = &restored.loans[0];
    assert_eq!(loan.status, LoanStatus::Partial);
    assert_eq!(target.loans.get(loan.id).unwrap().remaining_amount, 400.0);
}

#[test]
fn test_partial_settings_are_merged() {
    let ledger = TestLedger::new();
    let mut snapshot = service(&ledger).snapshot(&AppSettings::default()).unwrap();
    snapshot.settings = serde_json::json!({"loanReminders": false}).as_object().cloned().unwrap();

    let current = AppSettings { currency: "USD".to_string(), ..AppSettings::default() };
    let merged = service(&ledger).restore(&snapshot, &current).unwrap();
    assert_eq!(merged, AppSettings { loan_reminders: false, ..current });
}

#[test]
fn test_failed_restore_leaves_ledger_untouched() {
    let ledger = populated();
    let before = service(&ledger).snapshot(&AppSettings::default()).unwrap();

    let orphan = Loan { id: 42, contact_id: 999, ..before.loans[0].clone() };
    let broken = BackupSnapshot { loans: vec![orphan], contacts: Vec::new(), ..before.clone() };

    assert!(matches!(
        service(&ledger).restore(&broken, &AppSettings::default()),
        Err(FinanceError::Database(_))
    ));

    let after = service(&ledger).snapshot(&AppSettings::default()).unwrap();
    assert_eq!(after.contacts, before.contacts);
    assert_eq!(after.transactions, before.transactions);
    assert_eq!(after.loans, before.loans);
}

#[test]
fn test_list_and_delete() {
    let ledger = populated();
    let backups = service(&ledger);
    assert!(backups.list().unwrap().is_empty());

    let name = backups.export(&AppSettings::default()).unwrap();
    fs::write(backups.directory().join("notes.txt"), "ignored").unwrap();

    let listed = backups.list().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, name);
    assert!(listed[0].size > 0);

    backups.delete(&name).unwrap();
    assert!(backups.list().unwrap().is_empty());
    assert!(matches!(backups.delete(&name), Err(FinanceError::BackupNotFound(_))));
    assert!(matches!(backups.restore_file(&name, &AppSettings::default()), Err(FinanceError::BackupNotFound(_))));
}
