//! The per-user credit card billing configuration.

use serde::{Deserialize, Serialize};

use crate::Error;

/// The credit card closing day used when a user has not configured one.
pub const DEFAULT_CLOSING_DAY: u8 = 6;
/// The credit card due day used when a user has not configured one.
pub const DEFAULT_DUE_DAY: u8 = 10;

/// A user's credit card billing days.
///
/// Purchases made on or after the closing day belong to the next billing
/// cycle, and every credit card charge is due on the due day of the month it
/// is attributed to. There is one configuration per user, not per card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingConfig {
    closing_day: u8,
    due_day: u8,
}

impl BillingConfig {
    /// Create a billing configuration.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidBillingDay] if either day is outside of `1..=31`.
    pub fn new(closing_day: u8, due_day: u8) -> Result<Self, Error> {
        Ok(Self {
            closing_day: validate_day(closing_day)?,
            due_day: validate_day(due_day)?,
        })
    }

    /// Build the configuration from the nullable values stored for a user,
    /// falling back to the defaults for missing values.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidBillingDay] if a stored day is outside of `1..=31`.
    pub fn from_stored(closing_day: Option<u8>, due_day: Option<u8>) -> Result<Self, Error> {
        Self::new(
            closing_day.unwrap_or(DEFAULT_CLOSING_DAY),
            due_day.unwrap_or(DEFAULT_DUE_DAY),
        )
    }

    /// The day of the month on which the card statement closes.
    pub fn closing_day(&self) -> u8 {
        self.closing_day
    }

    /// The day of the month on which the card statement is due.
    pub fn due_day(&self) -> u8 {
        self.due_day
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            closing_day: DEFAULT_CLOSING_DAY,
            due_day: DEFAULT_DUE_DAY,
        }
    }
}

fn validate_day(day: u8) -> Result<u8, Error> {
    if (1..=31).contains(&day) {
        Ok(day)
    } else {
        Err(Error::InvalidBillingDay(day))
    }
}
