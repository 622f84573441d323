//! Editing a recurring transaction.

use std::collections::HashSet;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    billing::{BillingConfig, edit_schedule},
    database_id::RecurringId,
    recurring::{
        RecurringTransaction, delete_pending_occurrences, get_recurring_transaction,
        materialize_occurrences,
    },
    transaction::Transaction,
    user::UserID,
};

/// The editable fields of a recurring transaction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecurringEdit {
    /// The new amount of each occurrence.
    pub amount: f64,
    /// The new description.
    pub description: String,
    /// The new start date, whose day of the month anchors future occurrences.
    pub start_date: Date,
}

/// The result of editing a recurring transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditedRecurring {
    /// The updated recurring transaction.
    pub recurring: RecurringTransaction,
    /// How many pending occurrences were removed.
    pub deleted: usize,
    /// The regenerated occurrences.
    pub generated: Vec<Transaction>,
}

/// Update a recurring transaction and regenerate its pending occurrences.
///
/// Occurrences due before `today` are history and are left as they are.
/// Every occurrence due on or after `today` is deleted and the next twelve
/// months are generated again from the new start day, beginning with the
/// first date on or after `today` that falls on that day. A month that still
/// has a past occurrence is stepped over, so exactly twelve occurrences are
/// generated in twelve distinct months.
///
/// The update, deletion and regeneration happen in one database transaction.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] or [Error::EmptyDescription] if the edit is invalid,
/// - [Error::NotFound] if the recurring transaction does not exist or belongs to another user,
/// - [Error::InactiveRecurring] if the recurring transaction has been stopped,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn edit_recurring_transaction(
    id: RecurringId,
    user_id: UserID,
    edit: RecurringEdit,
    config: &BillingConfig,
    today: Date,
    connection: &Connection,
) -> Result<EditedRecurring, Error> {
    if !edit.amount.is_finite() || edit.amount <= 0.0 {
        return Err(Error::InvalidAmount(edit.amount));
    }

    let description = edit.description.trim();
    if description.is_empty() {
        return Err(Error::EmptyDescription);
    }

    let tx = connection.unchecked_transaction()?;

    let current = get_recurring_transaction(id, user_id, &tx)?;
    if !current.active {
        return Err(Error::InactiveRecurring);
    }

    tx.execute(
        "UPDATE recurring_transaction SET amount = ?1, description = ?2, start_date = ?3
         WHERE id = ?4",
        (edit.amount, description, edit.start_date, current.id),
    )?;

    let recurring = RecurringTransaction {
        amount: edit.amount,
        description: description.to_owned(),
        start_date: edit.start_date,
        ..current
    };

    let deleted = delete_pending_occurrences(recurring.id, today, &tx)?;
    let taken_periods = occurrence_periods(recurring.id, &tx)?;
    let occurrences = edit_schedule(
        edit.start_date,
        recurring.payment_method,
        today,
        &taken_periods,
        config,
    )?;
    let generated = materialize_occurrences(&recurring, &occurrences, &tx)?;

    tx.commit()?;

    tracing::info!(
        "Edited recurring transaction {}: removed {deleted} pending and generated {} occurrences",
        recurring.id,
        generated.len()
    );

    Ok(EditedRecurring {
        recurring,
        deleted,
        generated,
    })
}

/// The months still holding an occurrence, soft-deleted ones included.
fn occurrence_periods(id: RecurringId, connection: &Connection) -> Result<HashSet<String>, Error> {
    connection
        .prepare("SELECT period_key FROM \"transaction\" WHERE recurring_id = ?1")?
        .query_map([id], |row| row.get(0))?
        .collect::<Result<HashSet<_>, _>>()
        .map_err(|error| error.into())
}
