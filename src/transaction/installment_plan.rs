//! Groups the installments of a single purchase.

use rusqlite::{Connection, Row};
use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    database_id::InstallmentPlanId,
    transaction::{Transaction, map_transaction_row, transaction_columns},
    user::UserID,
};

/// A purchase that was split into monthly installments.
///
/// Every installment row references the plan through
/// [Transaction::installment_plan_id].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstallmentPlan {
    /// The ID of the plan.
    pub id: InstallmentPlanId,
    /// The owner of the plan.
    pub user_id: UserID,
    /// The description of the purchase without the installment suffix.
    pub description: String,
    /// The full purchase amount.
    pub total_amount: f64,
    /// The number of installments.
    pub installments: u32,
    /// The day the purchase was made.
    pub purchase_date: Date,
}

/// Create the installment plan table.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn create_installment_plan_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS installment_plan (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                description TEXT NOT NULL,
                total_amount REAL NOT NULL,
                installments INTEGER NOT NULL CHECK (installments >= 2),
                purchase_date TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Insert a new installment plan.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn insert_installment_plan(
    user_id: UserID,
    description: &str,
    total_amount: f64,
    installments: u32,
    purchase_date: Date,
    connection: &Connection,
) -> Result<InstallmentPlan, Error> {
    connection
        .prepare(
            "INSERT INTO installment_plan (user_id, description, total_amount, installments, purchase_date)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, user_id, description, total_amount, installments, purchase_date",
        )?
        .query_row(
            (
                user_id.as_i64(),
                description,
                total_amount,
                installments,
                purchase_date,
            ),
            map_installment_plan_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve an installment plan and its installments, in installment order.
///
/// Soft-deleted installments are included so the caller can see the whole
/// plan.
///
/// # Errors
/// Returns [Error::NotFound] if the plan does not exist or belongs to another
/// user.
pub fn get_installment_plan(
    plan_id: InstallmentPlanId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(InstallmentPlan, Vec<Transaction>), Error> {
    let plan = connection
        .prepare(
            "SELECT id, user_id, description, total_amount, installments, purchase_date
             FROM installment_plan WHERE id = ?1 AND user_id = ?2",
        )?
        .query_row((plan_id, user_id.as_i64()), map_installment_plan_row)?;

    let installments = connection
        .prepare(&format!(
            "SELECT {} FROM \"transaction\"
             WHERE installment_plan_id = ?1 ORDER BY current_installment ASC",
            transaction_columns()
        ))?
        .query_map([plan.id], map_transaction_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok((plan, installments))
}

/// Move every installment of a plan to the trash.
///
/// Returns the number of installments that were deleted.
///
/// # Errors
/// Returns [Error::NotFound] if the plan does not exist or belongs to another
/// user.
pub fn delete_installment_plan(
    plan_id: InstallmentPlanId,
    user_id: UserID,
    connection: &Connection,
) -> Result<usize, Error> {
    let tx = connection.unchecked_transaction()?;

    let owned: i64 = tx.query_row(
        "SELECT COUNT(id) FROM installment_plan WHERE id = ?1 AND user_id = ?2",
        (plan_id, user_id.as_i64()),
        |row| row.get(0),
    )?;

    if owned == 0 {
        return Err(Error::NotFound);
    }

    let rows_affected = tx.execute(
        "UPDATE \"transaction\" SET deleted_at = ?1
         WHERE installment_plan_id = ?2 AND deleted_at IS NULL",
        (OffsetDateTime::now_utc(), plan_id),
    )?;

    tx.commit()?;

    tracing::info!("Moved {rows_affected} installments of plan {plan_id} to the trash");

    Ok(rows_affected)
}

fn map_installment_plan_row(row: &Row) -> Result<InstallmentPlan, rusqlite::Error> {
    Ok(InstallmentPlan {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        description: row.get(2)?,
        total_amount: row.get(3)?,
        installments: row.get(4)?,
        purchase_date: row.get(5)?,
    })
}
