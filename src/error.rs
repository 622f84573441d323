//! Defines the crate level error type.

use time::Date;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The amount of a purchase or recurring instruction was zero, negative or
    /// not a finite number.
    #[error("{0} is not a valid amount, amounts must be greater than zero")]
    InvalidAmount(f64),

    /// A date string could not be parsed as either a calendar date
    /// (`YYYY-MM-DD`) or an RFC 3339 timestamp.
    #[error("could not parse \"{0}\" as a date")]
    InvalidDate(String),

    /// Date arithmetic produced a date outside of the supported range.
    #[error("adding months to {0} produced a date out of range")]
    DateOutOfRange(Date),

    /// An installment purchase must be split into at least two installments.
    #[error("{0} is not a valid number of installments")]
    InvalidInstallments(u32),

    /// A credit card closing or due day outside of `1..=31`.
    #[error("{0} is not a valid day of the month for billing")]
    InvalidBillingDay(u8),

    /// An empty string was used as a description.
    #[error("description cannot be empty")]
    EmptyDescription,

    /// An empty string was used to create a category name.
    #[error("category name cannot be empty")]
    EmptyCategoryName,

    /// An empty string was used to create a bank account name.
    #[error("account name cannot be empty")]
    EmptyAccountName,

    /// The user already has a category with this name.
    #[error("the category \"{0}\" already exists")]
    DuplicateCategoryName(String),

    /// The user already has a bank account with this name.
    #[error("the account \"{0}\" already exists")]
    DuplicateAccountName(String),

    /// A purchase cannot be both recurring and split into installments.
    #[error("a purchase cannot be both recurring and split into installments")]
    RecurringInstallments,

    /// The payment method is not allowed for the requested operation, e.g.
    /// paying a credit card invoice with the credit card.
    #[error("the payment method {0} cannot be used here")]
    InvalidPaymentMethod(String),

    /// A stopped recurring transaction cannot be edited.
    #[error("the recurring transaction has been stopped")]
    InactiveRecurring,

    /// The requested resource was not found.
    ///
    /// This is also returned when the resource exists but belongs to another
    /// user, so that callers cannot probe for other users' records.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// A category or bank account ID did not refer to a row owned by the user.
    #[error("a referenced category or bank account does not exist")]
    InvalidForeignKey,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// The credit card invoice for the month has already been paid.
    #[error("the invoice for {0} has already been settled")]
    InvoiceAlreadySettled(String),

    /// There is nothing to pay on the credit card invoice for the month.
    #[error("the invoice for {0} has no charges")]
    EmptyInvoice(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidForeignKey,
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}
