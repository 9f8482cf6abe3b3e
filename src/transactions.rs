//! Transaction ledger: income, expenses and savings movements.
//!
//! The current balance is never stored. It is recomputed from the whole
//! table on every call as `INCOME - EXPENSE - SAVINGS`, which makes savings
//! withdrawals (negative SAVINGS rows) flow back into the balance.

use std::sync::Arc;

use rusqlite::Connection;
use tracing::{info, warn};

use crate::db::Database;
use crate::error::{FinanceError, Result};
use crate::metrics::MetricsCollector;
use crate::models::{categories, NewTransaction, Transaction, TransactionType};
use crate::repository;
use crate::utils::{Clock, SystemClock};
use crate::validation::InputValidator;

/// Fail with [`FinanceError::InsufficientBalance`] unless the balance covers
/// `requested`.
pub(crate) fn ensure_balance(conn: &Connection, requested: f64) -> Result<()> {
    let available = repository::transactions::current_balance(conn)?;
    if requested > available {
        warn!(available, requested, "Insufficient balance");
        return Err(FinanceError::InsufficientBalance { available, requested });
    }
    Ok(())
}

fn is_withdrawal(tx: &NewTransaction) -> bool {
    tx.category.as_deref() == Some(categories::SAVINGS_WITHDRAWAL)
}

#[derive(Clone)]
pub struct TransactionLedger {
    db: Database,
    metrics: MetricsCollector,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TransactionLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionLedger").field("db", &self.db).finish_non_exhaustive()
    }
}

impl TransactionLedger {
    pub fn new(db: Database, metrics: MetricsCollector) -> Self {
        Self::with_clock(db, metrics, Arc::new(SystemClock))
    }

    pub fn with_clock(db: Database, metrics: MetricsCollector, clock: Arc<dyn Clock>) -> Self {
        Self { db, metrics, clock }
    }

    fn validate(tx: &NewTransaction) -> Result<()> {
        if tx.tx_type == TransactionType::Savings && is_withdrawal(tx) {
            InputValidator::validate_amount(tx.amount.abs())?;
        } else {
            InputValidator::validate_amount(tx.amount)?;
        }
        InputValidator::validate_description(&tx.description)?;
        if let Some(category) = &tx.category {
            InputValidator::validate_category(category)?;
        }
        Ok(())
    }

    /// Record a ledger entry.
    ///
    /// EXPENSE and SAVINGS deposits must be covered by the current balance,
    /// and a savings withdrawal must be covered by the savings balance.
    pub fn add(&self, tx: &NewTransaction) -> Result<Transaction> {
        self.metrics.track("tx.add", || {
            Self::validate(tx)?;

            let created = self.db.unit_of_work("tx.add", |conn| {
                let spends_balance = matches!(tx.tx_type, TransactionType::Expense | TransactionType::Savings);
                if spends_balance && tx.amount > 0.0 {
                    ensure_balance(conn, tx.amount)?;
                }

                if is_withdrawal(tx) {
                    let available = repository::transactions::savings_balance(conn)?;
                    let requested = tx.amount.abs();
                    if requested > available {
                        warn!(available, requested, "Insufficient savings");
                        return Err(FinanceError::InsufficientSavings { available, requested });
                    }
                }

                repository::transactions::insert(conn, tx)
            })?;

            info!(tx_id = created.id, tx_type = %created.tx_type, amount = created.amount, "Transaction added");
            Ok(created)
        })
    }

    /// Move `amount` from the balance into savings
    pub fn deposit_savings(
        &self,
        amount: f64,
        description: &str,
        date: i64,
        category: Option<&str>,
    ) -> Result<Transaction> {
        self.add(&NewTransaction {
            tx_type: TransactionType::Savings,
            amount,
            description: description.to_string(),
            date,
            category: category.map(str::to_string),
        })
    }

    /// Move `amount` from savings back into the balance.
    ///
    /// Stored as a negative SAVINGS row in the `Savings withdrawal` category.
    pub fn withdraw_savings(&self, amount: f64, description: &str, date: i64) -> Result<Transaction> {
        InputValidator::validate_amount(amount)?;
        self.add(&NewTransaction {
            tx_type: TransactionType::Savings,
            amount: -amount,
            description: format!("Withdrawal: {description}"),
            date,
            category: Some(categories::SAVINGS_WITHDRAWAL.to_string()),
        })
    }

    pub fn get(&self, id: i64) -> Result<Transaction> {
        let conn = self.db.get_connection()?;
        repository::transactions::get(&conn, id)?.ok_or(FinanceError::TransactionNotFound(id))
    }

    /// Every entry, newest first
    pub fn list(&self) -> Result<Vec<Transaction>> {
        let conn = self.db.get_connection()?;
        repository::transactions::list(&conn)
    }

    pub fn by_type(&self, tx_type: TransactionType) -> Result<Vec<Transaction>> {
        let conn = self.db.get_connection()?;
        repository::transactions::by_type(&conn, tx_type)
    }

    /// Entries whose amount, description, category or type contain `term`
    pub fn search(&self, term: &str) -> Result<Vec<Transaction>> {
        let conn = self.db.get_connection()?;
        repository::transactions::search(&conn, term)
    }

    /// Overwrite an entry as edited by the user. No balance check is made.
    pub fn update(&self, tx: &Transaction) -> Result<Transaction> {
        self.metrics.track("tx.update", || {
            let edited = NewTransaction {
                tx_type: tx.tx_type,
                amount: tx.amount,
                description: tx.description.clone(),
                date: tx.date,
                category: tx.category.clone(),
            };
            Self::validate(&edited)?;

            let conn = self.db.get_connection()?;
            if !repository::transactions::update(&conn, tx)? {
                return Err(FinanceError::TransactionNotFound(tx.id));
            }
            info!(tx_id = tx.id, "Transaction updated");
            Ok(tx.clone())
        })
    }

    pub fn remove(&self, id: i64) -> Result<()> {
        self.metrics.track("tx.remove", || {
            let conn = self.db.get_connection()?;
            if !repository::transactions::delete(&conn, id)? {
                return Err(FinanceError::TransactionNotFound(id));
            }
            info!(tx_id = id, "Transaction removed");
            Ok(())
        })
    }

    /// `INCOME - EXPENSE - SAVINGS` over every stored entry
    pub fn current_balance(&self) -> Result<f64> {
        let conn = self.db.get_connection()?;
        let balance = repository::transactions::current_balance(&conn)?;
        self.metrics.set_current_balance(balance);
        Ok(balance)
    }

    /// Signed sum of every SAVINGS entry
    pub fn savings_balance(&self) -> Result<f64> {
        let conn = self.db.get_connection()?;
        repository::transactions::savings_balance(&conn)
    }

    /// Current time according to the ledger's clock
    pub fn now(&self) -> i64 {
        self.clock.now_millis()
    }
}
