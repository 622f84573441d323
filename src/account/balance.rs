//! Derives bank account balances from their transactions.

use rusqlite::Connection;

use crate::{
    Error,
    account::get_account,
    billing::BalanceCutoff,
    database_id::AccountId,
    user::UserID,
};

/// Get the balance of a bank account as of `cutoff`.
///
/// The balance is the account's initial balance plus every income and minus
/// every expense assigned to the account that is dated on or before the
/// cutoff. Credit card transactions and soft-deleted transactions never count;
/// card spending only reaches a bank account through an invoice settlement.
///
/// # Errors
/// Returns [Error::NotFound] if the account does not exist or belongs to
/// another user.
pub fn get_account_balance(
    account_id: AccountId,
    user_id: UserID,
    cutoff: BalanceCutoff,
    connection: &Connection,
) -> Result<f64, Error> {
    let account = get_account(account_id, user_id, connection)?;
    let last_included_date = cutoff.last_included_date()?;

    let net: f64 = connection.query_row(
        "SELECT COALESCE(SUM(CASE WHEN type = 'INCOME' THEN amount ELSE -amount END), 0)
         FROM \"transaction\"
         WHERE bank_account_id = ?1
           AND user_id = ?2
           AND payment_method != 'CREDIT_CARD'
           AND deleted_at IS NULL
           AND date <= ?3",
        (account.id, user_id.as_i64(), last_included_date),
        |row| row.get(0),
    )?;

    Ok(account.initial_balance + net)
}

/// Get the sum of the balances of all of a user's bank accounts as of `cutoff`.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_total_account_balance(
    user_id: UserID,
    cutoff: BalanceCutoff,
    connection: &Connection,
) -> Result<f64, Error> {
    let last_included_date = cutoff.last_included_date()?;

    let initial: f64 = connection.query_row(
        "SELECT COALESCE(SUM(initial_balance), 0) FROM bank_account WHERE user_id = ?1",
        [user_id.as_i64()],
        |row| row.get(0),
    )?;

    let net: f64 = connection.query_row(
        "SELECT COALESCE(SUM(CASE WHEN t.type = 'INCOME' THEN t.amount ELSE -t.amount END), 0)
         FROM \"transaction\" t
         INNER JOIN bank_account a ON a.id = t.bank_account_id AND a.user_id = t.user_id
         WHERE t.user_id = ?1
           AND t.payment_method != 'CREDIT_CARD'
           AND t.deleted_at IS NULL
           AND t.date <= ?2",
        (user_id.as_i64(), last_included_date),
        |row| row.get(0),
    )?;

    Ok(initial + net)
}
