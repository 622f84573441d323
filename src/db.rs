//! Creates the application's database schema.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{
    Error,
    account::create_account_table,
    category::create_category_table,
    invoice::create_invoice_settlement_table,
    recurring::create_recurring_transaction_table,
    transaction::{create_installment_plan_table, create_transaction_table},
    user::create_user_table,
};

/// Enable foreign keys and create every table that does not exist yet.
///
/// Tables are created in one exclusive transaction, parents before the tables
/// that reference them.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // Has no effect inside a transaction.
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_category_table(&transaction)?;
    create_account_table(&transaction)?;
    create_installment_plan_table(&transaction)?;
    create_recurring_transaction_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_invoice_settlement_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
