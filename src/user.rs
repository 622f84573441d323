//! Code for creating the user table, fetching users and changing their
//! credit card billing days.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    billing::{BillingConfig, retarget_due_date},
    database_id::TransactionId,
    timezone::get_local_offset,
};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application and their billing preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The user's display name.
    pub name: String,
    /// The configured credit card closing day, if any.
    pub credit_card_closing_day: Option<u8>,
    /// The configured credit card due day, if any.
    pub credit_card_due_day: Option<u8>,
    /// The user's canonical timezone, e.g. "America/Sao_Paulo".
    ///
    /// Used to decide what "today" is for the user.
    pub timezone: String,
}

impl User {
    /// The user's billing configuration with defaults applied for unset days.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidBillingDay] if a stored day is out of range.
    pub fn billing_config(&self) -> Result<BillingConfig, Error> {
        BillingConfig::from_stored(self.credit_card_closing_day, self.credit_card_due_day)
    }
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                credit_card_closing_day INTEGER CHECK (credit_card_closing_day BETWEEN 1 AND 31),
                credit_card_due_day INTEGER CHECK (credit_card_due_day BETWEEN 1 AND 31),
                timezone TEXT NOT NULL DEFAULT 'UTC'
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// The user starts without billing days, so the defaults apply.
///
/// # Errors
///
/// Returns a:
/// - [Error::InvalidTimezoneError] if `timezone` is not a canonical timezone name,
/// - or [Error::SqlError] if an SQL related error occurred.
pub fn create_user(name: &str, timezone: &str, connection: &Connection) -> Result<User, Error> {
    if get_local_offset(timezone).is_none() {
        return Err(Error::InvalidTimezoneError(timezone.to_owned()));
    }

    connection.execute(
        "INSERT INTO user (name, timezone) VALUES (?1, ?2)",
        (name, timezone),
    )?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        name: name.to_owned(),
        credit_card_closing_day: None,
        credit_card_due_day: None,
        timezone: timezone.to_owned(),
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, name, credit_card_closing_day, credit_card_due_day, timezone
             FROM user WHERE id = :id",
        )?
        .query_row(&[(":id", &user_id.as_i64())], map_user_row)
        .map_err(|error| error.into())
}

/// Get the billing configuration of the user with `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user does not exist.
pub fn get_billing_config(user_id: UserID, connection: &Connection) -> Result<BillingConfig, Error> {
    get_user_by_id(user_id, connection)?.billing_config()
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: UserID::new(row.get(0)?),
        name: row.get(1)?,
        credit_card_closing_day: row.get(2)?,
        credit_card_due_day: row.get(3)?,
        timezone: row.get(4)?,
    })
}

/// A request to change a user's credit card billing days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BillingDaysUpdate {
    /// The new closing day.
    pub closing_day: u8,
    /// The new due day.
    pub due_day: u8,
    /// Rewrite the due date of every existing credit card transaction to the
    /// new due day.
    #[serde(default)]
    pub apply_to_all: bool,
}

/// Save new billing days for a user and, if requested, move the due date of
/// every existing credit card transaction of the user to the new due day.
///
/// The attributed date of the rewritten transactions is not changed. The
/// whole update happens in one database transaction.
///
/// Returns the number of transactions whose due date was rewritten.
///
/// # Errors
///
/// This function will return a:
/// - [Error::InvalidBillingDay] if a day is outside of `1..=31`,
/// - [Error::NotFound] if the user does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_billing_days(
    user_id: UserID,
    update: BillingDaysUpdate,
    connection: &Connection,
) -> Result<usize, Error> {
    let config = BillingConfig::new(update.closing_day, update.due_day)?;

    let tx = connection.unchecked_transaction()?;

    let rows_affected = tx.execute(
        "UPDATE user SET credit_card_closing_day = ?1, credit_card_due_day = ?2 WHERE id = ?3",
        (config.closing_day(), config.due_day(), user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    let mut rewritten = 0;

    if update.apply_to_all {
        let card_transactions = tx
            .prepare(
                "SELECT id, due_date FROM \"transaction\"
                 WHERE user_id = ?1 AND payment_method = 'CREDIT_CARD'",
            )?
            .query_map([user_id.as_i64()], |row| {
                Ok((row.get::<_, TransactionId>(0)?, row.get::<_, Date>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut statement =
            tx.prepare("UPDATE \"transaction\" SET due_date = ?1 WHERE id = ?2")?;

        for (id, due_date) in card_transactions {
            let new_due_date = retarget_due_date(due_date, config.due_day());

            if new_due_date != due_date {
                statement.execute((new_due_date, id))?;
                rewritten += 1;
            }
        }

        statement.finalize()?;
    }

    tx.commit()?;

    tracing::info!(
        "Updated billing days for user {user_id} to closing day {} and due day {}, rewrote {rewritten} due dates",
        config.closing_day(),
        config.due_day()
    );

    Ok(rewritten)
}
