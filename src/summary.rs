//! Monthly income and expense totals.

use rusqlite::Connection;
use serde::Serialize;
use time::Month;

use crate::{Error, billing::month_bounds, database_id::CategoryId, user::UserID};

/// The expenses of one category in a month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    /// The category, or `None` for uncategorised expenses.
    pub category_id: Option<CategoryId>,
    /// The category's name, or `None` for uncategorised expenses.
    pub name: Option<String>,
    /// The sum of the category's expenses.
    pub total: f64,
}

/// The totals of a month.
///
/// Transactions are counted in the month of their attributed date, so card
/// purchases count in the month of the statement they land on. Invoice
/// settlement payments are left out because the purchases they pay for are
/// already counted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthSummary {
    /// The year of the month.
    pub year: i32,
    /// The month.
    pub month: Month,
    /// The sum of income.
    pub income: f64,
    /// The sum of expenses.
    pub expense: f64,
    /// Income minus expenses.
    pub net: f64,
    /// Expenses per category, largest first.
    pub expenses_by_category: Vec<CategoryTotal>,
}

/// Summarise the non-deleted transactions of a user attributed to `month` of
/// `year`.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn get_month_summary(
    user_id: UserID,
    year: i32,
    month: Month,
    connection: &Connection,
) -> Result<MonthSummary, Error> {
    let (start, end) = month_bounds(year, month)?;

    let (income, expense): (f64, f64) = connection.query_row(
        "SELECT
            COALESCE(SUM(CASE WHEN type = 'INCOME' THEN amount END), 0),
            COALESCE(SUM(CASE WHEN type = 'EXPENSE' THEN amount END), 0)
         FROM \"transaction\"
         WHERE user_id = ?1 AND deleted_at IS NULL AND date BETWEEN ?2 AND ?3
           AND id NOT IN (
               SELECT transaction_id FROM invoice_settlement WHERE transaction_id IS NOT NULL
           )",
        (user_id.as_i64(), start, end),
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let expenses_by_category = connection
        .prepare(
            "SELECT t.category_id, c.name, SUM(t.amount) AS total
             FROM \"transaction\" t
             LEFT JOIN category c ON c.id = t.category_id
             WHERE t.user_id = ?1 AND t.deleted_at IS NULL AND t.type = 'EXPENSE'
               AND t.date BETWEEN ?2 AND ?3
               AND t.id NOT IN (
                   SELECT transaction_id FROM invoice_settlement WHERE transaction_id IS NOT NULL
               )
             GROUP BY t.category_id
             ORDER BY total DESC",
        )?
        .query_map((user_id.as_i64(), start, end), |row| {
            Ok(CategoryTotal {
                category_id: row.get(0)?,
                name: row.get(1)?,
                total: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MonthSummary {
        year,
        month,
        income,
        expense,
        net: income - expense,
        expenses_by_category,
    })
}
