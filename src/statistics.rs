//! Read-side aggregation over the transaction ledger and the advice rules
//! built on top of it.
//!
//! The functions here are pure: they take the transactions and an explicit
//! `now` (epoch milliseconds). [`StatisticsService`] feeds them from the
//! database and a [`Clock`].

use std::sync::Arc;

use crate::db::Database;
use crate::error::Result;
use crate::models::{
    categories, CategoryTotal, PeriodTotals, Recommendation, RecommendationKind, Severity, Transaction,
    TransactionType,
};
use crate::repository;
use crate::utils::{Clock, SystemClock, DAY_MILLIS};

const SPENDING_LOW: f64 = 0.3;
const SPENDING_MEDIUM: f64 = 0.6;
const SPENDING_HIGH: f64 = 0.9;
const CATEGORY_SHARE: f64 = 0.4;
const SAVINGS_GOAL: f64 = 0.1;
const SAVINGS_EXCELLENT: f64 = 0.2;
const TREND_LIMIT: f64 = 0.85;

fn sum_between(txs: &[Transaction], tx_type: TransactionType, start: i64, end: i64) -> f64 {
    txs.iter()
        .filter(|tx| tx.tx_type == tx_type && (start..=end).contains(&tx.date))
        .map(|tx| tx.amount)
        .sum()
}

/// Sums of `tx_type` over the trailing day, week, 30 days and 365 days
#[must_use]
pub fn period_totals(txs: &[Transaction], tx_type: TransactionType, now: i64) -> PeriodTotals {
    let window = |days: i64| sum_between(txs, tx_type, now - days * DAY_MILLIS, now);
    PeriodTotals { daily: window(1), weekly: window(7), monthly: window(30), yearly: window(365) }
}

/// Net amount held in savings
#[must_use]
pub fn savings_progress(txs: &[Transaction]) -> f64 {
    txs.iter().filter(|tx| tx.is_savings()).map(|tx| tx.amount).sum()
}

/// Expense totals per category in order of first appearance
#[must_use]
pub fn expenses_by_category(txs: &[Transaction]) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = Vec::new();
    for tx in txs.iter().filter(|tx| tx.is_expense()) {
        let category = tx.category.as_deref().filter(|c| !c.is_empty()).unwrap_or(categories::OTHER);
        match totals.iter_mut().find(|total| total.category == category) {
            Some(total) => total.amount += tx.amount,
            None => totals.push(CategoryTotal { category: category.to_string(), amount: tx.amount }),
        }
    }
    totals
}

fn advice(message: impl Into<String>, kind: RecommendationKind, severity: Severity, priority: u8) -> Recommendation {
    Recommendation { message: message.into(), kind, severity, priority }
}

/// Advice derived from the last 30 days, most urgent first.
///
/// Nothing is produced while there is no income in the window.
#[must_use]
pub fn recommendations(txs: &[Transaction], now: i64) -> Vec<Recommendation> {
    let monthly_income = period_totals(txs, TransactionType::Income, now).monthly;
    if monthly_income <= 0.0 {
        return Vec::new();
    }
    let monthly_expense = period_totals(txs, TransactionType::Expense, now).monthly;
    let monthly_savings = period_totals(txs, TransactionType::Savings, now).monthly;

    let mut out = Vec::new();

    let spending_ratio = monthly_expense / monthly_income;
    out.push(if spending_ratio <= SPENDING_LOW {
        advice("Excellent spending level! Keep on saving.", RecommendationKind::Spending, Severity::Success, 3)
    } else if spending_ratio <= SPENDING_MEDIUM {
        advice(
            "Moderate spending level. Keep an eye on non-essential expenses.",
            RecommendationKind::Spending,
            Severity::Warning,
            2,
        )
    } else if spending_ratio <= SPENDING_HIGH {
        advice(
            "Warning: your spending is high. Cut down on non-essential expenses.",
            RecommendationKind::Spending,
            Severity::Warning,
            1,
        )
    } else {
        advice(
            "Critical: your spending exceeds your income. Act now!",
            RecommendationKind::Spending,
            Severity::Danger,
            1,
        )
    });

    // strict max, first category wins ties
    let highest = expenses_by_category(txs)
        .into_iter()
        .fold(None::<CategoryTotal>, |best, total| match best {
            Some(best) if total.amount <= best.amount => Some(best),
            _ if total.amount > 0.0 => Some(total),
            best => best,
        });
    if let Some(highest) = highest.filter(|h| h.amount > monthly_income * CATEGORY_SHARE) {
        out.push(advice(
            format!("The \"{}\" category takes a large share of your spending", highest.category),
            RecommendationKind::Category,
            Severity::Warning,
            2,
        ));
    }

    let savings_ratio = monthly_savings / monthly_income;
    if savings_ratio < SAVINGS_GOAL {
        out.push(advice(
            "Goal: try to save at least 10% of your monthly income",
            RecommendationKind::Savings,
            Severity::Info,
            2,
        ));
    } else if savings_ratio >= SAVINGS_EXCELLENT {
        out.push(advice("Excellent savings rate! Keep it up!", RecommendationKind::Savings, Severity::Success, 3));
    }

    let trend = (monthly_expense * 3.0) / (monthly_income * 3.0);
    if trend > TREND_LIMIT {
        out.push(advice(
            "Trend: your expenses have been rising over the last 3 months",
            RecommendationKind::Trend,
            Severity::Warning,
            2,
        ));
    }

    out.sort_by_key(|r| r.priority);
    out
}

/// Statistics over the stored ledger
#[derive(Clone)]
pub struct StatisticsService {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl StatisticsService {
    pub fn new(db: Database) -> Self {
        Self::with_clock(db, Arc::new(SystemClock))
    }

    pub fn with_clock(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    fn transactions(&self) -> Result<Vec<Transaction>> {
        let conn = self.db.get_connection()?;
        repository::transactions::list(&conn)
    }

    pub fn stats_by_type(&self, tx_type: TransactionType) -> Result<PeriodTotals> {
        let conn = self.db.get_connection()?;
        let txs = repository::transactions::by_type(&conn, tx_type)?;
        Ok(period_totals(&txs, tx_type, self.clock.now_millis()))
    }

    pub fn savings_progress(&self) -> Result<f64> {
        let conn = self.db.get_connection()?;
        Ok(savings_progress(&repository::transactions::by_type(&conn, TransactionType::Savings)?))
    }

    pub fn expenses_by_category(&self) -> Result<Vec<CategoryTotal>> {
        let conn = self.db.get_connection()?;
        Ok(expenses_by_category(&repository::transactions::by_type(&conn, TransactionType::Expense)?))
    }

    pub fn recommendations(&self) -> Result<Vec<Recommendation>> {
        Ok(recommendations(&self.transactions()?, self.clock.now_millis()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    fn tx(tx_type: TransactionType, amount: f64, age_days: i64, category: Option<&str>) -> Transaction {
        Transaction {
            id: 0,
            tx_type,
            amount,
            description: String::new(),
            date: NOW - age_days * DAY_MILLIS,
            category: category.map(str::to_string),
        }
    }

    #[test]
    fn test_period_windows_are_inclusive() {
        let txs = [
            tx(TransactionType::Income, 1.0, 0, None),
            tx(TransactionType::Income, 10.0, 1, None),
            tx(TransactionType::Income, 100.0, 30, None),
            tx(TransactionType::Income, 1000.0, 366, None),
            tx(TransactionType::Expense, 5.0, 0, None),
        ];

        let totals = period_totals(&txs, TransactionType::Income, NOW);
        assert_eq!(totals, PeriodTotals { daily: 11.0, weekly: 11.0, monthly: 111.0, yearly: 111.0 });
    }

    #[test]
    fn test_expenses_default_to_other() {
        let txs = [
            tx(TransactionType::Expense, 5.0, 0, Some("Food")),
            tx(TransactionType::Expense, 7.0, 0, None),
            tx(TransactionType::Expense, 3.0, 0, Some("Food")),
        ];
        let totals = expenses_by_category(&txs);
        assert_eq!(totals[0], CategoryTotal { category: "Food".into(), amount: 8.0 });
        assert_eq!(totals[1], CategoryTotal { category: "Other".into(), amount: 7.0 });
    }

    #[test]
    fn test_no_income_no_advice() {
        assert!(recommendations(&[tx(TransactionType::Expense, 5.0, 0, None)], NOW).is_empty());
    }

    #[test]
    fn test_critical_spending() {
        let txs = [
            tx(TransactionType::Income, 1000.0, 2, None),
            tx(TransactionType::Expense, 1200.0, 1, Some("Housing")),
        ];
        let advice = recommendations(&txs, NOW);
        let kinds: Vec<_> = advice.iter().map(|r| (r.kind, r.priority)).collect();
        assert_eq!(
            kinds,
            [
                (RecommendationKind::Spending, 1),
                (RecommendationKind::Category, 2),
                (RecommendationKind::Savings, 2),
                (RecommendationKind::Trend, 2),
            ]
        );
        assert_eq!(advice[0].severity, Severity::Danger);
    }
}
