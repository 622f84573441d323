//! Enumerations describing how and in which direction money moved.

use std::{fmt::Display, str::FromStr};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Whether a transaction brings money in or takes it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Money earned.
    Income,
    /// Money spent.
    Expense,
}

impl TransactionType {
    /// The string stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "INCOME",
            Self::Expense => "EXPENSE",
        }
    }

    /// The sign applied to an amount of this type when folding a balance.
    pub fn sign(self) -> f64 {
        match self {
            Self::Income => 1.0,
            Self::Expense => -1.0,
        }
    }
}

/// How a transaction was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Instant bank transfer.
    Pix,
    /// Charged to the user's credit card and paid through the card invoice.
    CreditCard,
    /// Debit card, leaves the bank account immediately.
    DebitCard,
    /// Cash.
    Cash,
    /// Anything else.
    Other,
    /// Bank slip.
    Boleto,
}

impl PaymentMethod {
    /// The string stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pix => "PIX",
            Self::CreditCard => "CREDIT_CARD",
            Self::DebitCard => "DEBIT_CARD",
            Self::Cash => "CASH",
            Self::Other => "OTHER",
            Self::Boleto => "BOLETO",
        }
    }

    /// Whether charges with this method follow the card billing cycle.
    pub fn is_credit_card(self) -> bool {
        self == Self::CreditCard
    }
}

/// Raised when a stored or submitted string is not a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\"{0}\" is not a recognised value")]
pub struct UnknownVariant(pub String);

impl FromStr for TransactionType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INCOME" => Ok(Self::Income),
            "EXPENSE" => Ok(Self::Expense),
            other => Err(UnknownVariant(other.to_owned())),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PIX" => Ok(Self::Pix),
            "CREDIT_CARD" => Ok(Self::CreditCard),
            "DEBIT_CARD" => Ok(Self::DebitCard),
            "CASH" => Ok(Self::Cash),
            "OTHER" => Ok(Self::Other),
            "BOLETO" => Ok(Self::Boleto),
            other => Err(UnknownVariant(other.to_owned())),
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

impl ToSql for PaymentMethod {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for PaymentMethod {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

#[cfg(test)]
mod tests {
    use crate::transaction::{PaymentMethod, TransactionType};

    #[test]
    fn payment_method_round_trips_through_str() {
        for method in [
            PaymentMethod::Pix,
            PaymentMethod::CreditCard,
            PaymentMethod::DebitCard,
            PaymentMethod::Cash,
            PaymentMethod::Other,
            PaymentMethod::Boleto,
        ] {
            assert_eq!(method.as_str().parse(), Ok(method));
        }
    }

    #[test]
    fn serde_uses_screaming_snake_case() {
        let method: PaymentMethod = serde_json::from_str("\"CREDIT_CARD\"").unwrap();
        let kind: TransactionType = serde_json::from_str("\"EXPENSE\"").unwrap();

        assert_eq!(method, PaymentMethod::CreditCard);
        assert_eq!(kind, TransactionType::Expense);
    }

    #[test]
    fn unknown_method_is_rejected() {
        assert!("PAYPAL".parse::<PaymentMethod>().is_err());
    }
}
