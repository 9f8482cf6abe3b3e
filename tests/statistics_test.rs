mod common;

use std::sync::Arc;

use common::{TestLedger, NOW};
use finance_tracker::models::{
    CategoryTotal, LoanType, NewLoan, NewTransaction, RecommendationKind, Severity, TransactionType,
};
use finance_tracker::statistics::StatisticsService;
use finance_tracker::utils::{FixedClock, DAY_MILLIS};

fn stats(ledger: &TestLedger) -> StatisticsService {
    StatisticsService::with_clock(ledger.db.clone(), Arc::new(FixedClock(NOW)))
}

fn add(ledger: &TestLedger, tx_type: TransactionType, amount: f64, days_ago: i64, category: &str) {
    ledger
        .transactions
        .add(&NewTransaction {
            tx_type,
            amount,
            description: String::new(),
            date: NOW - days_ago * DAY_MILLIS,
            category: Some(category.to_string()),
        })
        .expect("Failed to add transaction");
}

#[test]
fn test_period_windows() {
    let ledger = TestLedger::new();
    add(&ledger, TransactionType::Income, 100.0, 0, "Salary");
    add(&ledger, TransactionType::Income, 200.0, 3, "Bonus");
    add(&ledger, TransactionType::Income, 400.0, 20, "Freelance");
    add(&ledger, TransactionType::Income, 800.0, 200, "Other");
    add(&ledger, TransactionType::Income, 1600.0, 400, "Other");

    let totals = stats(&ledger).stats_by_type(TransactionType::Income).unwrap();
    assert_eq!(totals.daily, 100.0);
    assert_eq!(totals.weekly, 300.0);
    assert_eq!(totals.monthly, 700.0);
    assert_eq!(totals.yearly, 1500.0);

    let expenses = stats(&ledger).stats_by_type(TransactionType::Expense).unwrap();
    assert_eq!(expenses.yearly, 0.0);
}

#[test]
fn test_categories_include_loan_mirrors() {
    let ledger = TestLedger::new();
    ledger.income(1000.0);
    add(&ledger, TransactionType::Expense, 50.0, 0, "Food");
    add(&ledger, TransactionType::Expense, 30.0, 1, "Transport");
    add(&ledger, TransactionType::Expense, 25.0, 2, "Food");
    let bob = ledger.contact("Bob");
    ledger
        .loans
        .create(&NewLoan { contact_id: bob.id, amount: 100.0, loan_type: LoanType::Given, date: NOW, interest_rate: 0.0 })
        .unwrap();

    let mut by_category = stats(&ledger).expenses_by_category().unwrap();
    by_category.sort_by(|a, b| a.category.cmp(&b.category));
    assert_eq!(
        by_category,
        [
            CategoryTotal { category: "Food".to_string(), amount: 75.0 },
            CategoryTotal { category: "Loans given".to_string(), amount: 100.0 },
            CategoryTotal { category: "Transport".to_string(), amount: 30.0 },
        ]
    );
}

#[test]
fn test_savings_progress_nets_withdrawals() {
    let ledger = TestLedger::new();
    ledger.income(1000.0);
    ledger.transactions.deposit_savings(300.0, "", NOW, None).unwrap();
    ledger.transactions.withdraw_savings(120.0, "", NOW).unwrap();

    assert_eq!(stats(&ledger).savings_progress().unwrap(), 180.0);
}

#[test]
fn test_recommendations_for_heavy_spender() {
    let ledger = TestLedger::new();
    ledger.income(1000.0);
    add(&ledger, TransactionType::Expense, 700.0, 1, "Food");

    let advice = stats(&ledger).recommendations().unwrap();
    let kinds: Vec<RecommendationKind> = advice.iter().map(|r| r.kind).collect();
    assert_eq!(kinds, [RecommendationKind::Spending, RecommendationKind::Category, RecommendationKind::Savings]);

    assert_eq!(advice[0].severity, Severity::Warning);
    assert_eq!(advice[0].priority, 1);
    assert!(advice[1].message.contains("\"Food\""));
    assert_eq!(advice[2].severity, Severity::Info);
}

#[test]
fn test_recommendations_for_saver() {
    let ledger = TestLedger::new();
    ledger.income(1000.0);
    add(&ledger, TransactionType::Expense, 100.0, 0, "Food");
    ledger.transactions.deposit_savings(250.0, "", NOW, None).unwrap();

    let advice = stats(&ledger).recommendations().unwrap();
    assert_eq!(advice.len(), 2);
    assert!(advice.iter().all(|r| r.severity == Severity::Success));
    assert!(advice.iter().all(|r| r.priority == 3));
}

#[test]
fn test_no_recommendations_without_recent_income() {
    let ledger = TestLedger::new();
    add(&ledger, TransactionType::Income, 1000.0, 45, "Salary");
    add(&ledger, TransactionType::Expense, 10.0, 0, "Food");

    assert!(stats(&ledger).recommendations().unwrap().is_empty());
}
