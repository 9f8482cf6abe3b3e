//! Row-level SQL for the three ledger tables.
//!
//! Every function takes a plain `&Connection` so callers can compose them
//! inside a single [`Database::unit_of_work`](crate::db::Database::unit_of_work).

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::models::{Contact, Loan, NewContact, NewLoan, NewTransaction, Transaction, TransactionType};
use crate::schema;

fn like_pattern(term: &str) -> String {
    format!("%{}%", term.trim())
}

fn to_sql_int(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Delete every row of every table, loans first.
pub fn clear_all(conn: &Connection) -> Result<()> {
    conn.execute(&format!("DELETE FROM {}", schema::loans::TABLE), [])?;
    conn.execute(&format!("DELETE FROM {}", schema::transactions::TABLE), [])?;
    conn.execute(&format!("DELETE FROM {}", schema::contacts::TABLE), [])?;
    Ok(())
}

pub mod contacts {
    use super::*;
    use crate::schema::contacts::{ID, NAME, PHONE, TABLE};

    fn map_row(row: &Row<'_>) -> rusqlite::Result<Contact> {
        Ok(Contact { id: row.get(ID)?, name: row.get(NAME)?, phone: row.get(PHONE)? })
    }

    pub fn insert(conn: &Connection, contact: &NewContact) -> Result<Contact> {
        conn.execute(
            &format!("INSERT INTO {TABLE} ({NAME}, {PHONE}) VALUES (?1, ?2)"),
            params![contact.name, contact.phone],
        )?;
        Ok(Contact { id: conn.last_insert_rowid(), name: contact.name.clone(), phone: contact.phone.clone() })
    }

    /// Insert keeping the id, used by restore
    pub fn insert_with_id(conn: &Connection, contact: &Contact) -> Result<()> {
        conn.execute(
            &format!("INSERT INTO {TABLE} ({ID}, {NAME}, {PHONE}) VALUES (?1, ?2, ?3)"),
            params![contact.id, contact.name, contact.phone],
        )?;
        Ok(())
    }

    pub fn get(conn: &Connection, id: i64) -> Result<Option<Contact>> {
        Ok(conn
            .query_row(&format!("SELECT * FROM {TABLE} WHERE {ID} = ?1"), params![id], map_row)
            .optional()?)
    }

    pub fn list(conn: &Connection) -> Result<Vec<Contact>> {
        let mut stmt = conn.prepare(&format!("SELECT * FROM {TABLE} ORDER BY {NAME}"))?;
        let rows = stmt.query_map([], map_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn update(conn: &Connection, contact: &Contact) -> Result<bool> {
        let changed = conn.execute(
            &format!("UPDATE {TABLE} SET {NAME} = ?1, {PHONE} = ?2 WHERE {ID} = ?3"),
            params![contact.name, contact.phone, contact.id],
        )?;
        Ok(changed > 0)
    }

    pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
        let changed = conn.execute(&format!("DELETE FROM {TABLE} WHERE {ID} = ?1"), params![id])?;
        Ok(changed > 0)
    }

    /// Name/phone search with prefix matches on the name ranked first
    pub fn search(conn: &Connection, term: &str, limit: usize) -> Result<Vec<Contact>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {TABLE}
             WHERE {NAME} LIKE ?1 OR {PHONE} LIKE ?1
             ORDER BY CASE WHEN {NAME} LIKE ?2 THEN 1 WHEN {NAME} LIKE ?1 THEN 2 ELSE 3 END, {NAME}
             LIMIT ?3"
        ))?;
        let prefix = format!("{}%", term.trim());
        let rows = stmt.query_map(params![like_pattern(term), prefix, to_sql_int(limit)], map_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn page(conn: &Connection, offset: usize, limit: usize) -> Result<Vec<Contact>> {
        let mut stmt =
            conn.prepare(&format!("SELECT * FROM {TABLE} ORDER BY {NAME} COLLATE NOCASE LIMIT ?1 OFFSET ?2"))?;
        let rows = stmt.query_map(params![to_sql_int(limit), to_sql_int(offset)], map_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn count(conn: &Connection) -> Result<usize> {
        let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {TABLE}"), [], |row| row.get(0))?;
        Ok(usize::try_from(n).unwrap_or_default())
    }

    /// All stored non-empty phone numbers
    pub fn phones(conn: &Connection) -> Result<Vec<String>> {
        let mut stmt =
            conn.prepare(&format!("SELECT {PHONE} FROM {TABLE} WHERE {PHONE} IS NOT NULL AND {PHONE} != ''"))?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

pub mod transactions {
    use super::*;
    use crate::schema::transactions::{AMOUNT, CATEGORY, DATE, DESCRIPTION, ID, TABLE, TYPE};

    fn map_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
        Ok(Transaction {
            id: row.get(ID)?,
            tx_type: row.get(TYPE)?,
            amount: row.get(AMOUNT)?,
            description: row.get::<_, Option<String>>(DESCRIPTION)?.unwrap_or_default(),
            date: row.get(DATE)?,
            category: row.get(CATEGORY)?,
        })
    }

    pub fn insert(conn: &Connection, tx: &NewTransaction) -> Result<Transaction> {
        conn.execute(
            &format!(
                "INSERT INTO {TABLE} ({TYPE}, {AMOUNT}, {DESCRIPTION}, {DATE}, {CATEGORY}) VALUES (?1, ?2, ?3, ?4, ?5)"
            ),
            params![tx.tx_type, tx.amount, tx.description, tx.date, tx.category],
        )?;
        Ok(Transaction {
            id: conn.last_insert_rowid(),
            tx_type: tx.tx_type,
            amount: tx.amount,
            description: tx.description.clone(),
            date: tx.date,
            category: tx.category.clone(),
        })
    }

    /// Insert keeping the id, used by restore
    pub fn insert_with_id(conn: &Connection, tx: &Transaction) -> Result<()> {
        conn.execute(
            &format!(
                "INSERT INTO {TABLE} ({ID}, {TYPE}, {AMOUNT}, {DESCRIPTION}, {DATE}, {CATEGORY})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
            ),
            params![tx.id, tx.tx_type, tx.amount, tx.description, tx.date, tx.category],
        )?;
        Ok(())
    }

    pub fn get(conn: &Connection, id: i64) -> Result<Option<Transaction>> {
        Ok(conn
            .query_row(&format!("SELECT * FROM {TABLE} WHERE {ID} = ?1"), params![id], map_row)
            .optional()?)
    }

    pub fn list(conn: &Connection) -> Result<Vec<Transaction>> {
        let mut stmt = conn.prepare(&format!("SELECT * FROM {TABLE} ORDER BY {DATE} DESC, {ID} DESC"))?;
        let rows = stmt.query_map([], map_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn by_type(conn: &Connection, tx_type: TransactionType) -> Result<Vec<Transaction>> {
        let mut stmt =
            conn.prepare(&format!("SELECT * FROM {TABLE} WHERE {TYPE} = ?1 ORDER BY {DATE} DESC, {ID} DESC"))?;
        let rows = stmt.query_map(params![tx_type], map_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn search(conn: &Connection, term: &str) -> Result<Vec<Transaction>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {TABLE}
             WHERE CAST({AMOUNT} AS TEXT) LIKE ?1 OR {DESCRIPTION} LIKE ?1
                OR {CATEGORY} LIKE ?1 OR {TYPE} LIKE ?1
             ORDER BY {DATE} DESC, {ID} DESC"
        ))?;
        let rows = stmt.query_map(params![like_pattern(term)], map_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn update(conn: &Connection, tx: &Transaction) -> Result<bool> {
        let changed = conn.execute(
            &format!(
                "UPDATE {TABLE} SET {TYPE} = ?1, {AMOUNT} = ?2, {DESCRIPTION} = ?3, {DATE} = ?4, {CATEGORY} = ?5
                 WHERE {ID} = ?6"
            ),
            params![tx.tx_type, tx.amount, tx.description, tx.date, tx.category, tx.id],
        )?;
        Ok(changed > 0)
    }

    pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
        let changed = conn.execute(&format!("DELETE FROM {TABLE} WHERE {ID} = ?1"), params![id])?;
        Ok(changed > 0)
    }

    /// INCOME minus EXPENSE minus SAVINGS over the whole table
    pub fn current_balance(conn: &Connection) -> Result<f64> {
        Ok(conn.query_row(
            &format!(
                "SELECT COALESCE(SUM(CASE {TYPE}
                     WHEN 'INCOME' THEN {AMOUNT}
                     WHEN 'EXPENSE' THEN -{AMOUNT}
                     WHEN 'SAVINGS' THEN -{AMOUNT}
                     ELSE 0 END), 0.0)
                 FROM {TABLE}"
            ),
            [],
            |row| row.get(0),
        )?)
    }

    /// Signed sum of SAVINGS rows
    pub fn savings_balance(conn: &Connection) -> Result<f64> {
        Ok(conn.query_row(
            &format!("SELECT COALESCE(SUM({AMOUNT}), 0.0) FROM {TABLE} WHERE {TYPE} = 'SAVINGS'"),
            [],
            |row| row.get(0),
        )?)
    }

    /// Oldest entry identical to `entry` in type, amount, description, date
    /// and category
    pub fn find_matching(conn: &Connection, entry: &NewTransaction) -> Result<Option<Transaction>> {
        Ok(conn
            .query_row(
                &format!(
                    "SELECT * FROM {TABLE}
                     WHERE {TYPE} = ?1 AND {AMOUNT} = ?2 AND {DESCRIPTION} = ?3 AND {DATE} = ?4 AND {CATEGORY} IS ?5
                     ORDER BY {ID} LIMIT 1"
                ),
                params![entry.tx_type, entry.amount, entry.description, entry.date, entry.category],
                map_row,
            )
            .optional()?)
    }
}

pub mod loans {
    use super::*;
    use crate::models::LoanStatus;
    use crate::schema::contacts as contact_cols;
    use crate::schema::loans::{
        AMOUNT, CONTACT_ID, DATE, ID, INTEREST_AMOUNT, INTEREST_RATE, REMAINING_AMOUNT, STATUS, TABLE, TOTAL_AMOUNT,
        TYPE,
    };

    fn map_row(row: &Row<'_>) -> rusqlite::Result<Loan> {
        Ok(Loan {
            id: row.get(ID)?,
            contact_id: row.get(CONTACT_ID)?,
            amount: row.get(AMOUNT)?,
            loan_type: row.get(TYPE)?,
            date: row.get(DATE)?,
            status: row.get(STATUS)?,
            interest_rate: row.get(INTEREST_RATE)?,
            interest_amount: row.get(INTEREST_AMOUNT)?,
            total_amount: row.get(TOTAL_AMOUNT)?,
            remaining_amount: row.get(REMAINING_AMOUNT)?,
        })
    }

    fn query(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Loan>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, map_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Insert a fresh loan: interest and total computed, nothing repaid yet
    pub fn insert(conn: &Connection, loan: &NewLoan) -> Result<Loan> {
        let interest_amount = Loan::interest_for(loan.amount, loan.interest_rate);
        let total_amount = loan.amount + interest_amount;
        let stored = Loan {
            id: 0,
            contact_id: loan.contact_id,
            amount: loan.amount,
            loan_type: loan.loan_type,
            date: loan.date,
            status: LoanStatus::Pending,
            interest_rate: loan.interest_rate,
            interest_amount,
            total_amount,
            remaining_amount: total_amount,
        };
        conn.execute(
            &format!(
                "INSERT INTO {TABLE} ({CONTACT_ID}, {AMOUNT}, {REMAINING_AMOUNT}, {TYPE}, {DATE}, {STATUS},
                     {INTEREST_RATE}, {INTEREST_AMOUNT}, {TOTAL_AMOUNT})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            params![
                stored.contact_id,
                stored.amount,
                stored.remaining_amount,
                stored.loan_type,
                stored.date,
                stored.status,
                stored.interest_rate,
                stored.interest_amount,
                stored.total_amount,
            ],
        )?;
        Ok(Loan { id: conn.last_insert_rowid(), ..stored })
    }

    /// Insert a loan row exactly as given, used by restore
    pub fn insert_with_id(conn: &Connection, loan: &Loan) -> Result<()> {
        conn.execute(
            &format!(
                "INSERT INTO {TABLE} ({ID}, {CONTACT_ID}, {AMOUNT}, {REMAINING_AMOUNT}, {TYPE}, {DATE}, {STATUS},
                     {INTEREST_RATE}, {INTEREST_AMOUNT}, {TOTAL_AMOUNT})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ),
            params![
                loan.id,
                loan.contact_id,
                loan.amount,
                loan.remaining_amount,
                loan.loan_type,
                loan.date,
                loan.status,
                loan.interest_rate,
                loan.interest_amount,
                loan.total_amount,
            ],
        )?;
        Ok(())
    }

    pub fn get(conn: &Connection, id: i64) -> Result<Option<Loan>> {
        Ok(conn
            .query_row(&format!("SELECT * FROM {TABLE} WHERE {ID} = ?1"), params![id], map_row)
            .optional()?)
    }

    pub fn list(conn: &Connection) -> Result<Vec<Loan>> {
        query(conn, &format!("SELECT * FROM {TABLE} ORDER BY {DATE} DESC, {ID} DESC"), [])
    }

    pub fn by_contact(conn: &Connection, contact_id: i64) -> Result<Vec<Loan>> {
        query(
            conn,
            &format!("SELECT * FROM {TABLE} WHERE {CONTACT_ID} = ?1 ORDER BY {DATE} DESC, {ID} DESC"),
            params![contact_id],
        )
    }

    pub fn by_status(conn: &Connection, status: LoanStatus) -> Result<Vec<Loan>> {
        query(
            conn,
            &format!("SELECT * FROM {TABLE} WHERE {STATUS} = ?1 ORDER BY {DATE} DESC, {ID} DESC"),
            params![status],
        )
    }

    pub fn by_date_range(conn: &Connection, start: i64, end: i64) -> Result<Vec<Loan>> {
        query(
            conn,
            &format!("SELECT * FROM {TABLE} WHERE {DATE} BETWEEN ?1 AND ?2 ORDER BY {DATE} DESC, {ID} DESC"),
            params![start, end],
        )
    }

    /// Loans whose amounts, status or date, or whose contact's name or
    /// phone, contain `term`
    pub fn search(conn: &Connection, term: &str) -> Result<Vec<Loan>> {
        let contacts = contact_cols::TABLE;
        let contact_id = contact_cols::ID;
        let name = contact_cols::NAME;
        let phone = contact_cols::PHONE;
        query(
            conn,
            &format!(
                "SELECT l.* FROM {TABLE} l
                 LEFT JOIN {contacts} c ON l.{CONTACT_ID} = c.{contact_id}
                 WHERE CAST(l.{AMOUNT} AS TEXT) LIKE ?1
                    OR CAST(l.{REMAINING_AMOUNT} AS TEXT) LIKE ?1
                    OR CAST(l.{TOTAL_AMOUNT} AS TEXT) LIKE ?1
                    OR CAST(l.{DATE} AS TEXT) LIKE ?1
                    OR l.{STATUS} LIKE ?1
                    OR c.{name} LIKE ?1
                    OR c.{phone} LIKE ?1
                 ORDER BY l.{DATE} DESC, l.{ID} DESC"
            ),
            params![like_pattern(term)],
        )
    }

    /// Persist the repayment state of a loan
    pub fn update_repayment(conn: &Connection, id: i64, remaining_amount: f64, status: LoanStatus) -> Result<bool> {
        let changed = conn.execute(
            &format!("UPDATE {TABLE} SET {REMAINING_AMOUNT} = ?1, {STATUS} = ?2 WHERE {ID} = ?3"),
            params![remaining_amount, status, id],
        )?;
        Ok(changed > 0)
    }

    /// Persist every editable column of a loan
    pub fn update(conn: &Connection, loan: &Loan) -> Result<bool> {
        let changed = conn.execute(
            &format!(
                "UPDATE {TABLE} SET {CONTACT_ID} = ?1, {AMOUNT} = ?2, {REMAINING_AMOUNT} = ?3, {STATUS} = ?4,
                     {INTEREST_RATE} = ?5, {INTEREST_AMOUNT} = ?6, {TOTAL_AMOUNT} = ?7
                 WHERE {ID} = ?8"
            ),
            params![
                loan.contact_id,
                loan.amount,
                loan.remaining_amount,
                loan.status,
                loan.interest_rate,
                loan.interest_amount,
                loan.total_amount,
                loan.id,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
        let changed = conn.execute(&format!("DELETE FROM {TABLE} WHERE {ID} = ?1"), params![id])?;
        Ok(changed > 0)
    }

    pub fn count_for_contact(conn: &Connection, contact_id: i64) -> Result<usize> {
        let n: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {TABLE} WHERE {CONTACT_ID} = ?1"),
            params![contact_id],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(n).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{LoanStatus, LoanType};

    fn income(amount: f64) -> NewTransaction {
        NewTransaction {
            tx_type: TransactionType::Income,
            amount,
            description: "Salary".into(),
            date: 1_000,
            category: None,
        }
    }

    #[test]
    fn test_balance_sums_by_type() {
        let db = Database::in_memory().unwrap();
        let conn = db.get_connection().unwrap();

        transactions::insert(&conn, &income(1000.0)).unwrap();
        for (tx_type, amount) in [
            (TransactionType::Expense, 200.0),
            (TransactionType::Savings, 300.0),
            (TransactionType::Savings, -50.0),
            (TransactionType::Loan, 999.0),
        ] {
            transactions::insert(&conn, &NewTransaction { tx_type, amount, ..income(0.0) }).unwrap();
        }

        assert_eq!(transactions::current_balance(&conn).unwrap(), 550.0);
        assert_eq!(transactions::savings_balance(&conn).unwrap(), 250.0);
    }

    #[test]
    fn test_empty_table_balances_are_zero() {
        let db = Database::in_memory().unwrap();
        let conn = db.get_connection().unwrap();
        assert_eq!(transactions::current_balance(&conn).unwrap(), 0.0);
        assert_eq!(transactions::savings_balance(&conn).unwrap(), 0.0);
    }

    #[test]
    fn test_loan_insert_computes_totals() {
        let db = Database::in_memory().unwrap();
        let conn = db.get_connection().unwrap();
        let contact = contacts::insert(&conn, &NewContact { name: "Bob".into(), phone: None }).unwrap();

        let loan = loans::insert(
            &conn,
            &NewLoan { contact_id: contact.id, amount: 1000.0, loan_type: LoanType::Given, date: 5, interest_rate: 10.0 },
        )
        .unwrap();

        assert_eq!(loan.interest_amount, 100.0);
        assert_eq!(loan.total_amount, 1100.0);
        assert_eq!(loan.remaining_amount, 1100.0);
        assert_eq!(loans::get(&conn, loan.id).unwrap(), Some(loan.clone()));

        loans::update_repayment(&conn, loan.id, 0.0, LoanStatus::Completed).unwrap();
        assert_eq!(loans::by_status(&conn, LoanStatus::Completed).unwrap().len(), 1);
        assert_eq!(loans::search(&conn, "bo").unwrap().len(), 1);
    }

    #[test]
    fn test_contact_search_ranks_prefix_first() {
        let db = Database::in_memory().unwrap();
        let conn = db.get_connection().unwrap();
        for name in ["Marianne", "Anna", "Joanna"] {
            contacts::insert(&conn, &NewContact { name: name.into(), phone: None }).unwrap();
        }

        let names: Vec<String> = contacts::search(&conn, "an", 100).unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, ["Anna", "Joanna", "Marianne"]);
    }
}
