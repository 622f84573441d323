use rusqlite::{Connection, Row};
use serde::Serialize;

use crate::{Error, database_id::AccountId, user::UserID};

/// A bank account.
///
/// Only the opening balance is stored, the current balance is derived from
/// the account's transactions, see [crate::account::get_account_balance].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BankAccount {
    /// The id for the account.
    pub id: AccountId,
    /// The owner of the account.
    pub user_id: UserID,
    /// The name of the account.
    pub name: String,
    /// The balance before any recorded transaction.
    pub initial_balance: f64,
}

pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS bank_account (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            initial_balance REAL NOT NULL,
            UNIQUE(user_id, name),
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

/// Create a bank account for `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyAccountName] if `name` is blank,
/// - [Error::DuplicateAccountName] if the user already has an account with this name,
/// - [Error::InvalidForeignKey] if the user does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_account(
    user_id: UserID,
    name: &str,
    initial_balance: f64,
    connection: &Connection,
) -> Result<BankAccount, Error> {
    let name = name.trim();

    if name.is_empty() {
        return Err(Error::EmptyAccountName);
    }

    connection
        .prepare(
            "INSERT INTO bank_account (user_id, name, initial_balance) VALUES (?1, ?2, ?3)
             RETURNING id, user_id, name, initial_balance",
        )?
        .query_row((user_id.as_i64(), name, initial_balance), map_row_to_account)
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateAccountName(name.to_owned()),
            error => error.into(),
        })
}

/// Retrieve the account `account_id` owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the account does not exist or belongs to
/// another user.
pub fn get_account(
    account_id: AccountId,
    user_id: UserID,
    connection: &Connection,
) -> Result<BankAccount, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, initial_balance FROM bank_account
             WHERE id = ?1 AND user_id = ?2",
        )?
        .query_row((account_id, user_id.as_i64()), map_row_to_account)
        .map_err(|error| error.into())
}

/// Retrieve all of a user's accounts ordered by name.
pub fn get_accounts(user_id: UserID, connection: &Connection) -> Result<Vec<BankAccount>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, initial_balance FROM bank_account
             WHERE user_id = ?1 ORDER BY name ASC",
        )?
        .query_map([user_id.as_i64()], map_row_to_account)?
        .map(|maybe_account| maybe_account.map_err(|error| error.into()))
        .collect()
}

pub fn map_row_to_account(row: &Row) -> Result<BankAccount, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = UserID::new(row.get(1)?);
    let name = row.get(2)?;
    let initial_balance = row.get(3)?;

    Ok(BankAccount {
        id,
        user_id,
        name,
        initial_balance,
    })
}


#[cfg(test)]
mod account_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        account::{create_account, get_account, get_accounts},
        db::initialize,
        user::create_user,
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn create_and_get_account() {
        let conn = get_test_connection();
        let user = create_user("Ana", "Etc/UTC", &conn).unwrap();

        let account = create_account(user.id, " Checking ", 100.5, &conn).unwrap();

        assert_eq!(account.name, "Checking");
        assert_eq!(get_account(account.id, user.id, &conn), Ok(account.clone()));
        assert_eq!(get_accounts(user.id, &conn), Ok(vec![account]));
    }

    #[test]
    fn other_users_account_is_not_found() {
        let conn = get_test_connection();
        let ana = create_user("Ana", "Etc/UTC", &conn).unwrap();
        let bia = create_user("Bia", "Etc/UTC", &conn).unwrap();
        let account = create_account(ana.id, "Checking", 0.0, &conn).unwrap();

        assert_eq!(get_account(account.id, bia.id, &conn), Err(Error::NotFound));
    }

    #[test]
    fn duplicate_and_empty_names_are_rejected() {
        let conn = get_test_connection();
        let user = create_user("Ana", "Etc/UTC", &conn).unwrap();
        create_account(user.id, "Checking", 0.0, &conn).unwrap();

        assert_eq!(
            create_account(user.id, "Checking", 0.0, &conn),
            Err(Error::DuplicateAccountName("Checking".to_owned()))
        );
        assert_eq!(
            create_account(user.id, "   ", 0.0, &conn),
            Err(Error::EmptyAccountName)
        );
    }
}
