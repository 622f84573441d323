//! Defines the recurring transaction model and its database queries.

use rusqlite::{Connection, Row};
use serde::Serialize;
use time::Date;

use crate::{
    Error,
    billing::Occurrence,
    database_id::{AccountId, CategoryId, RecurringId},
    transaction::{
        PaymentMethod, Transaction, TransactionType, insert_recurring_occurrence,
        map_transaction_row, transaction_columns,
    },
    user::UserID,
};

/// A standing instruction for a monthly income or expense, e.g. rent or a
/// phone bill.
///
/// The ledger rows generated from the instruction copy its amount,
/// description, type, payment method, category and bank account. The day of
/// the month of `start_date` anchors every generated date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecurringTransaction {
    /// The ID of the recurring transaction.
    pub id: RecurringId,
    /// The owner.
    pub user_id: UserID,
    /// The positive amount of each occurrence.
    pub amount: f64,
    /// The description copied into each occurrence.
    pub description: String,
    /// Whether each occurrence is income or an expense.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// How each occurrence is paid.
    pub payment_method: PaymentMethod,
    /// The category of each occurrence.
    pub category_id: Option<CategoryId>,
    /// The bank account of each occurrence.
    pub bank_account_id: Option<AccountId>,
    /// The date the instruction started on.
    pub start_date: Date,
    /// Whether new occurrences are still generated.
    ///
    /// Stopped instructions are deactivated rather than deleted so their
    /// history keeps its reference.
    pub active: bool,
}

impl RecurringTransaction {
    /// The day of the month every occurrence is snapped to.
    pub fn anchor_day(&self) -> u8 {
        self.start_date.day()
    }
}

/// The fields needed to insert a new [RecurringTransaction].
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecurringTransaction {
    /// The owner.
    pub user_id: UserID,
    /// The positive amount of each occurrence.
    pub amount: f64,
    /// The description copied into each occurrence.
    pub description: String,
    /// Whether each occurrence is income or an expense.
    pub kind: TransactionType,
    /// How each occurrence is paid.
    pub payment_method: PaymentMethod,
    /// The category of each occurrence.
    pub category_id: Option<CategoryId>,
    /// The bank account of each occurrence.
    pub bank_account_id: Option<AccountId>,
    /// The date the instruction starts on.
    pub start_date: Date,
}

const RECURRING_COLUMNS: &str = "id, user_id, amount, description, type, payment_method, \
     category_id, bank_account_id, start_date, active";

/// Create the recurring transaction table.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn create_recurring_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS recurring_transaction (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                amount REAL NOT NULL CHECK (amount > 0),
                description TEXT NOT NULL,
                type TEXT NOT NULL CHECK (type IN ('INCOME', 'EXPENSE')),
                payment_method TEXT NOT NULL,
                category_id INTEGER,
                bank_account_id INTEGER,
                start_date TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE SET NULL,
                FOREIGN KEY(bank_account_id) REFERENCES bank_account(id) ON UPDATE CASCADE ON DELETE SET NULL
                )",
        (),
    )?;

    Ok(())
}

/// Insert a new, active recurring transaction.
///
/// This does not generate any occurrences, see [materialize_occurrences].
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidForeignKey] if a referenced row does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn insert_recurring_transaction(
    new: NewRecurringTransaction,
    connection: &Connection,
) -> Result<RecurringTransaction, Error> {
    connection
        .prepare(&format!(
            "INSERT INTO recurring_transaction (user_id, amount, description, type, payment_method,
                category_id, bank_account_id, start_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING {RECURRING_COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![
                new.user_id.as_i64(),
                new.amount,
                new.description,
                new.kind,
                new.payment_method,
                new.category_id,
                new.bank_account_id,
                new.start_date,
            ],
            map_recurring_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve the recurring transaction `id` owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if it does not exist or belongs to another user.
pub fn get_recurring_transaction(
    id: RecurringId,
    user_id: UserID,
    connection: &Connection,
) -> Result<RecurringTransaction, Error> {
    connection
        .prepare(&format!(
            "SELECT {RECURRING_COLUMNS} FROM recurring_transaction WHERE id = ?1 AND user_id = ?2"
        ))?
        .query_row((id, user_id.as_i64()), map_recurring_row)
        .map_err(|error| error.into())
}

/// Retrieve a user's active recurring transactions.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn get_active_recurring_transactions(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<RecurringTransaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT {RECURRING_COLUMNS} FROM recurring_transaction
             WHERE user_id = ?1 AND active = 1 ORDER BY id ASC"
        ))?
        .query_map([user_id.as_i64()], map_recurring_row)?
        .map(|maybe_recurring| maybe_recurring.map_err(|error| error.into()))
        .collect()
}

/// Retrieve the non-deleted transactions generated by a recurring
/// transaction, ordered by date.
///
/// # Errors
/// Returns [Error::NotFound] if the recurring transaction does not exist or
/// belongs to another user.
pub fn get_occurrences(
    id: RecurringId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let recurring = get_recurring_transaction(id, user_id, connection)?;

    connection
        .prepare(&format!(
            "SELECT {} FROM \"transaction\"
             WHERE recurring_id = ?1 AND deleted_at IS NULL
             ORDER BY date ASC, id ASC",
            transaction_columns()
        ))?
        .query_map([recurring.id], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Insert a ledger row for each occurrence, skipping months that already have
/// a row for this recurring transaction.
///
/// Returns the rows that were inserted.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn materialize_occurrences(
    recurring: &RecurringTransaction,
    occurrences: &[Occurrence],
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let mut inserted = Vec::with_capacity(occurrences.len());

    for occurrence in occurrences {
        let builder = Transaction::build(
            recurring.user_id,
            recurring.amount,
            recurring.kind,
            recurring.payment_method,
            occurrence.date,
            occurrence.due_date,
            &recurring.description,
        )
        .category_id(recurring.category_id)
        .bank_account_id(recurring.bank_account_id)
        .recurring_id(recurring.id);

        match insert_recurring_occurrence(builder, connection)? {
            Some(transaction) => inserted.push(transaction),
            None => tracing::debug!(
                "Recurring transaction {} already has a transaction in the month of {}",
                recurring.id,
                occurrence.date
            ),
        }
    }

    Ok(inserted)
}

/// Hard delete the occurrences of a recurring transaction that are due on or
/// after `today`, returning how many were deleted.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn delete_pending_occurrences(
    id: RecurringId,
    today: Date,
    connection: &Connection,
) -> Result<usize, Error> {
    connection
        .execute(
            "DELETE FROM \"transaction\" WHERE recurring_id = ?1 AND due_date >= ?2",
            (id, today),
        )
        .map_err(|error| error.into())
}

fn map_recurring_row(row: &Row) -> Result<RecurringTransaction, rusqlite::Error> {
    Ok(RecurringTransaction {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        amount: row.get(2)?,
        description: row.get(3)?,
        kind: row.get(4)?,
        payment_method: row.get(5)?,
        category_id: row.get(6)?,
        bank_account_id: row.get(7)?,
        start_date: row.get(8)?,
        active: row.get(9)?,
    })
}
