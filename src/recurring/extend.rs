//! The background job that keeps a year of recurring occurrences ahead of
//! today.

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use time::Date;

use crate::{
    Error,
    billing::{BillingConfig, extension_horizon, extension_schedule},
    database_id::RecurringId,
    recurring::{get_active_recurring_transactions, materialize_occurrences},
    user::UserID,
};

/// How many occurrences the extension job generated for one recurring
/// transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtendedRecurring {
    /// The recurring transaction.
    pub recurring_id: RecurringId,
    /// The date of the latest occurrence before the job ran.
    pub last_date: Date,
    /// The number of occurrences inserted.
    pub generated: usize,
}

/// The outcome of [extend_recurring_transactions].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtensionReport {
    /// One entry per active recurring transaction that had occurrences.
    pub extended: Vec<ExtendedRecurring>,
    /// Active recurring transactions skipped because every occurrence was deleted.
    pub skipped: Vec<RecurringId>,
}

impl ExtensionReport {
    /// The total number of occurrences inserted.
    pub fn total_generated(&self) -> usize {
        self.extended.iter().map(|entry| entry.generated).sum()
    }
}

/// Generate occurrences for every active recurring transaction of a user
/// until each reaches one year after `today`.
///
/// Each series continues monthly from its latest non-deleted occurrence.
/// Months that already have an occurrence are skipped, so running the job
/// again, or concurrently, does not create duplicates.
///
/// # Errors
/// This function will return a:
/// - [Error::DateOutOfRange] if a computed date is not representable,
/// - or [Error::SqlError] if there is some SQL error.
pub fn extend_recurring_transactions(
    user_id: UserID,
    config: &BillingConfig,
    today: Date,
    connection: &Connection,
) -> Result<ExtensionReport, Error> {
    let horizon = extension_horizon(today)?;
    let tx = connection.unchecked_transaction()?;
    let mut report = ExtensionReport::default();

    for recurring in get_active_recurring_transactions(user_id, &tx)? {
        let Some(last_date) = latest_occurrence_date(recurring.id, &tx)? else {
            tracing::debug!(
                "Recurring transaction {} has no occurrences left, skipping",
                recurring.id
            );
            report.skipped.push(recurring.id);
            continue;
        };

        let occurrences = extension_schedule(
            last_date,
            recurring.anchor_day(),
            recurring.payment_method,
            horizon,
            config,
        )?;
        let generated = materialize_occurrences(&recurring, &occurrences, &tx)?;

        report.extended.push(ExtendedRecurring {
            recurring_id: recurring.id,
            last_date,
            generated: generated.len(),
        });
    }

    tx.commit()?;

    tracing::info!(
        "Extended recurring transactions of user {user_id} up to {horizon}: {} occurrences generated",
        report.total_generated()
    );

    Ok(report)
}

fn latest_occurrence_date(
    recurring_id: RecurringId,
    connection: &Connection,
) -> Result<Option<Date>, Error> {
    connection
        .query_row(
            "SELECT date FROM \"transaction\"
             WHERE recurring_id = ?1 AND deleted_at IS NULL
             ORDER BY date DESC LIMIT 1",
            [recurring_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|error| error.into())
}
