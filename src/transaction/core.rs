//! Defines the core data model and database queries for ledger transactions.

use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use time::{Date, Month, OffsetDateTime};

use crate::{
    Error,
    billing::{month_bounds, period_key},
    database_id::{AccountId, CategoryId, InstallmentPlanId, RecurringId, TransactionId},
    transaction::{PaymentMethod, TransactionType},
    user::UserID,
};

// ============================================================================
// MODELS
// ============================================================================

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The owner of the transaction.
    pub user_id: UserID,
    /// The amount of money spent or earned in this transaction, always positive.
    pub amount: f64,
    /// Whether the money was spent or earned.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// How the transaction was paid.
    pub payment_method: PaymentMethod,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The date the transaction is attributed to for budgeting and display.
    ///
    /// For credit card purchases this is the month of the statement the
    /// purchase lands on, which may be after the purchase itself.
    pub date: Date,
    /// The date the money actually leaves or enters an account.
    pub due_date: Date,
    /// The 1-based installment number if the transaction is part of an
    /// installment plan.
    pub current_installment: Option<u32>,
    /// The installment plan shared by all installments of one purchase.
    pub installment_plan_id: Option<InstallmentPlanId>,
    /// The recurring instruction that generated this transaction.
    pub recurring_id: Option<RecurringId>,
    /// The ID of the category the transaction belongs to.
    pub category_id: Option<CategoryId>,
    /// The ID of the bank account the transaction belongs to.
    pub bank_account_id: Option<AccountId>,
    /// When the transaction was moved to the trash, if it was.
    pub deleted_at: Option<OffsetDateTime>,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        user_id: UserID,
        amount: f64,
        kind: TransactionType,
        payment_method: PaymentMethod,
        date: Date,
        due_date: Date,
        description: &str,
    ) -> TransactionBuilder {
        TransactionBuilder {
            user_id,
            amount,
            kind,
            payment_method,
            date,
            due_date,
            description: description.to_owned(),
            current_installment: None,
            installment_plan_id: None,
            recurring_id: None,
            category_id: None,
            bank_account_id: None,
        }
    }

    /// The signed amount, positive for income and negative for expenses.
    pub fn signed_amount(&self) -> f64 {
        self.kind.sign() * self.amount
    }
}

/// A builder for creating [Transaction] instances.
///
/// The dates are expected to come from the billing engine, see
/// [crate::billing].
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The owner of the transaction.
    pub user_id: UserID,
    /// The positive amount of the transaction.
    pub amount: f64,
    /// Whether the money was spent or earned.
    pub kind: TransactionType,
    /// How the transaction was paid.
    pub payment_method: PaymentMethod,
    /// The attributed date.
    pub date: Date,
    /// The due date.
    pub due_date: Date,
    /// A human-readable description of the transaction.
    pub description: String,
    /// The 1-based installment number.
    pub current_installment: Option<u32>,
    /// The installment plan the transaction belongs to.
    pub installment_plan_id: Option<InstallmentPlanId>,
    /// The recurring instruction that generated the transaction.
    pub recurring_id: Option<RecurringId>,
    /// The category of the transaction, e.g. "Groceries", "Transport", "Rent".
    pub category_id: Option<CategoryId>,
    /// The bank account the transaction belongs to.
    pub bank_account_id: Option<AccountId>,
}

impl TransactionBuilder {
    /// Set the category id for the transaction.
    pub fn category_id(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    /// Set the bank account id for the transaction.
    pub fn bank_account_id(mut self, bank_account_id: Option<AccountId>) -> Self {
        self.bank_account_id = bank_account_id;
        self
    }

    /// Mark the transaction as installment `current_installment` of a plan.
    pub fn installment(mut self, plan_id: InstallmentPlanId, current_installment: u32) -> Self {
        self.installment_plan_id = Some(plan_id);
        self.current_installment = Some(current_installment);
        self
    }

    /// Mark the transaction as an occurrence of a recurring instruction.
    pub fn recurring_id(mut self, recurring_id: RecurringId) -> Self {
        self.recurring_id = Some(recurring_id);
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const TRANSACTION_COLUMNS: &str = "id, user_id, amount, type, payment_method, description, date, \
     due_date, current_installment, installment_plan_id, recurring_id, category_id, \
     bank_account_id, deleted_at";

/// Create a new transaction in the database from a builder.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidForeignKey] if a referenced row does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn insert_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let period = builder.recurring_id.map(|_| period_key(builder.date));

    connection
        .prepare(&format!(
            "INSERT INTO \"transaction\" (user_id, amount, type, payment_method, description, date,
                due_date, current_installment, installment_plan_id, recurring_id, period_key,
                category_id, bank_account_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![
                builder.user_id.as_i64(),
                builder.amount,
                builder.kind,
                builder.payment_method,
                builder.description,
                builder.date,
                builder.due_date,
                builder.current_installment,
                builder.installment_plan_id,
                builder.recurring_id,
                period,
                builder.category_id,
                builder.bank_account_id,
            ],
            map_transaction_row,
        )
        .map_err(|error| error.into())
}

/// Insert an occurrence of a recurring instruction unless the instruction
/// already has a transaction in the same month.
///
/// Returns `None` when the month was already taken, which makes repeated or
/// concurrent generation for the same month a no-op.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidForeignKey] if a referenced row does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn insert_recurring_occurrence(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Option<Transaction>, Error> {
    let Some(recurring_id) = builder.recurring_id else {
        return insert_transaction(builder, connection).map(Some);
    };

    connection
        .prepare(&format!(
            "INSERT INTO \"transaction\" (user_id, amount, type, payment_method, description, date,
                due_date, recurring_id, period_key, category_id, bank_account_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(recurring_id, period_key) DO NOTHING
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![
                builder.user_id.as_i64(),
                builder.amount,
                builder.kind,
                builder.payment_method,
                builder.description,
                builder.date,
                builder.due_date,
                recurring_id,
                period_key(builder.date),
                builder.category_id,
                builder.bank_account_id,
            ],
            map_transaction_row,
        )
        .optional()
        .map_err(|error| error.into())
}

/// Retrieve a transaction owned by `user_id`, including soft-deleted ones.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a transaction of the user,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = ?1 AND user_id = ?2"
        ))?
        .query_row((id, user_id.as_i64()), map_transaction_row)
        .map_err(|error| error.into())
}

/// Retrieve the active transactions of a user attributed to `month` of `year`,
/// ordered by date.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn get_transactions_in_month(
    user_id: UserID,
    year: i32,
    month: Month,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let (start, end) = month_bounds(year, month)?;

    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\"
             WHERE user_id = ?1 AND deleted_at IS NULL AND date BETWEEN ?2 AND ?3
             ORDER BY date ASC, id ASC"
        ))?
        .query_map((user_id.as_i64(), start, end), map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Retrieve the soft-deleted transactions of a user, most recently deleted first.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn get_deleted_transactions(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\"
             WHERE user_id = ?1 AND deleted_at IS NOT NULL
             ORDER BY deleted_at DESC, id DESC"
        ))?
        .query_map([user_id.as_i64()], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Move a transaction to the trash.
///
/// Soft-deleted transactions are excluded from balances, summaries and
/// invoices until they are restored.
///
/// # Errors
/// Returns [Error::NotFound] if the transaction does not exist, belongs to
/// another user or is already deleted.
pub fn soft_delete_transaction(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE \"transaction\" SET deleted_at = ?1
         WHERE id = ?2 AND user_id = ?3 AND deleted_at IS NULL",
        (OffsetDateTime::now_utc(), id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    tracing::debug!("Moved transaction {id} to the trash");

    Ok(())
}

/// Restore a transaction from the trash.
///
/// # Errors
/// Returns [Error::NotFound] if the transaction does not exist, belongs to
/// another user or is not deleted.
pub fn restore_transaction(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE \"transaction\" SET deleted_at = NULL
         WHERE id = ?1 AND user_id = ?2 AND deleted_at IS NOT NULL",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    tracing::debug!("Restored transaction {id} from the trash");

    Ok(())
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                amount REAL NOT NULL CHECK (amount > 0),
                type TEXT NOT NULL CHECK (type IN ('INCOME', 'EXPENSE')),
                payment_method TEXT NOT NULL,
                description TEXT NOT NULL,
                date TEXT NOT NULL,
                due_date TEXT NOT NULL,
                current_installment INTEGER,
                installment_plan_id INTEGER,
                recurring_id INTEGER,
                period_key TEXT,
                category_id INTEGER,
                bank_account_id INTEGER,
                deleted_at TEXT,
                UNIQUE(recurring_id, period_key),
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(installment_plan_id) REFERENCES installment_plan(id) ON DELETE CASCADE,
                FOREIGN KEY(recurring_id) REFERENCES recurring_transaction(id) ON DELETE SET NULL,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE SET NULL,
                FOREIGN KEY(bank_account_id) REFERENCES bank_account(id) ON UPDATE CASCADE ON DELETE SET NULL
                );

        CREATE INDEX IF NOT EXISTS idx_transaction_user_date ON \"transaction\"(user_id, date);
        CREATE INDEX IF NOT EXISTS idx_transaction_recurring_due ON \"transaction\"(recurring_id, due_date);",
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
///
/// The row must contain the columns in the order that the queries in this
/// module select them.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        amount: row.get(2)?,
        kind: row.get(3)?,
        payment_method: row.get(4)?,
        description: row.get(5)?,
        date: row.get(6)?,
        due_date: row.get(7)?,
        current_installment: row.get(8)?,
        installment_plan_id: row.get(9)?,
        recurring_id: row.get(10)?,
        category_id: row.get(11)?,
        bank_account_id: row.get(12)?,
        deleted_at: row.get(13)?,
    })
}

/// The select list matching [map_transaction_row], for queries in other modules.
pub(crate) fn transaction_columns() -> &'static str {
    TRANSACTION_COLUMNS
}

// ============================================================================
// TESTS
// ============================================================================
