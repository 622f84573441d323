//! Validation of submitted purchases.

use serde::Deserialize;
use time::{Date, UtcOffset};

use crate::{
    Error,
    billing::parse_purchase_date,
    database_id::{AccountId, CategoryId},
    transaction::{PaymentMethod, TransactionType},
};

/// The largest number of installments a purchase can be split into.
pub const MAX_INSTALLMENTS: u32 = 120;

/// A purchase (or income) as submitted by the user.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    /// The positive amount of the purchase.
    pub amount: f64,
    /// What the purchase was for.
    pub description: String,
    /// Whether money was spent or earned.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// How the purchase was paid.
    pub payment_method: PaymentMethod,
    /// The category of the purchase.
    pub category_id: Option<CategoryId>,
    /// The bank account the purchase is paid from or into.
    pub bank_account_id: Option<AccountId>,
    /// The purchase date as `YYYY-MM-DD` or an RFC 3339 timestamp.
    pub date: String,
    /// How many monthly installments to split the purchase into.
    pub installments: Option<u32>,
    /// Whether the purchase repeats every month.
    #[serde(default)]
    pub is_recurring: bool,
}

/// How the rows of a purchase are laid out over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchasePlan {
    /// One row.
    Single,
    /// One row per monthly installment.
    Installments(u32),
    /// A recurring instruction and its first year of occurrences.
    Recurring,
}

/// A purchase that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPurchase {
    /// The positive amount of the purchase.
    pub amount: f64,
    /// The trimmed, non-empty description.
    pub description: String,
    /// Whether money was spent or earned.
    pub kind: TransactionType,
    /// How the purchase was paid.
    pub payment_method: PaymentMethod,
    /// The category of the purchase.
    pub category_id: Option<CategoryId>,
    /// The bank account of the purchase.
    pub bank_account_id: Option<AccountId>,
    /// The local calendar date of the purchase.
    pub purchase_date: Date,
    /// How the rows are laid out over time.
    pub plan: PurchasePlan,
}

impl PurchaseRequest {
    /// Validate the request before any date computation or write happens.
    ///
    /// `local_offset` is the user's UTC offset, used to resolve the purchase
    /// date to a local calendar day.
    ///
    /// # Errors
    ///
    /// This function will return a:
    /// - [Error::InvalidAmount] if the amount is not a positive finite number,
    /// - [Error::EmptyDescription] if the description is blank,
    /// - [Error::InvalidDate] if the date cannot be parsed,
    /// - [Error::InvalidInstallments] if installments is zero or too large,
    /// - or [Error::RecurringInstallments] if a recurring purchase is also
    ///   split into installments.
    pub fn validate(self, local_offset: UtcOffset) -> Result<ValidatedPurchase, Error> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(Error::InvalidAmount(self.amount));
        }

        let description = self.description.trim();
        if description.is_empty() {
            return Err(Error::EmptyDescription);
        }

        let purchase_date = parse_purchase_date(&self.date, local_offset)?.date();

        let plan = match (self.installments, self.is_recurring) {
            (Some(installments), _) if installments == 0 || installments > MAX_INSTALLMENTS => {
                return Err(Error::InvalidInstallments(installments));
            }
            (Some(installments), true) if installments >= 2 => {
                return Err(Error::RecurringInstallments);
            }
            (_, true) => PurchasePlan::Recurring,
            (Some(installments), false) if installments >= 2 => {
                PurchasePlan::Installments(installments)
            }
            (_, false) => PurchasePlan::Single,
        };

        Ok(ValidatedPurchase {
            amount: self.amount,
            description: description.to_owned(),
            kind: self.kind,
            payment_method: self.payment_method,
            category_id: self.category_id,
            bank_account_id: self.bank_account_id,
            purchase_date,
            plan,
        })
    }
}

#[cfg(test)]
mod tests {
    use time::{UtcOffset, macros::date, macros::offset};

    use crate::{
        Error,
        transaction::{
            PaymentMethod, PurchasePlan, PurchaseRequest, TransactionType, ValidatedPurchase,
        },
    };

    fn request() -> PurchaseRequest {
        PurchaseRequest {
            amount: 90.0,
            description: "  Shoes ".to_owned(),
            kind: TransactionType::Expense,
            payment_method: PaymentMethod::CreditCard,
            category_id: None,
            bank_account_id: None,
            date: "2024-03-07".to_owned(),
            installments: None,
            is_recurring: false,
        }
    }

    #[test]
    fn valid_single_purchase() {
        let got = request().validate(UtcOffset::UTC);

        assert_eq!(
            got,
            Ok(ValidatedPurchase {
                amount: 90.0,
                description: "Shoes".to_owned(),
                kind: TransactionType::Expense,
                payment_method: PaymentMethod::CreditCard,
                category_id: None,
                bank_account_id: None,
                purchase_date: date!(2024 - 03 - 07),
                plan: PurchasePlan::Single,
            })
        );
    }

    #[test]
    fn deserializes_form_field_names() {
        let json = r#"{
            "amount": 150.5,
            "description": "TV",
            "type": "EXPENSE",
            "paymentMethod": "CREDIT_CARD",
            "categoryId": 3,
            "date": "2024-03-07",
            "installments": 10,
            "isRecurring": false
        }"#;

        let request: PurchaseRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.payment_method, PaymentMethod::CreditCard);
        assert_eq!(request.category_id, Some(3));
        assert_eq!(request.bank_account_id, None);
        assert_eq!(request.installments, Some(10));
    }

    #[test]
    fn rejects_non_positive_amounts() {
        for amount in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let mut request = request();
            request.amount = amount;

            assert!(matches!(
                request.validate(UtcOffset::UTC),
                Err(Error::InvalidAmount(_))
            ));
        }
    }

    #[test]
    fn rejects_blank_description() {
        let mut request = request();
        request.description = "   ".to_owned();

        assert_eq!(request.validate(UtcOffset::UTC), Err(Error::EmptyDescription));
    }

    #[test]
    fn rejects_malformed_date() {
        let mut request = request();
        request.date = "tomorrow".to_owned();

        assert_eq!(
            request.validate(UtcOffset::UTC),
            Err(Error::InvalidDate("tomorrow".to_owned()))
        );
    }

    #[test]
    fn timestamp_resolves_to_local_day() {
        let mut request = request();
        request.date = "2024-03-08T02:00:00Z".to_owned();

        let got = request.validate(offset!(-3)).unwrap();

        assert_eq!(got.purchase_date, date!(2024 - 03 - 07));
    }

    #[test]
    fn installment_counts() {
        let plan = |installments| {
            let mut request = request();
            request.installments = installments;
            request.validate(UtcOffset::UTC).map(|purchase| purchase.plan)
        };

        assert_eq!(plan(Some(1)), Ok(PurchasePlan::Single));
        assert_eq!(plan(Some(3)), Ok(PurchasePlan::Installments(3)));
        assert_eq!(plan(Some(0)), Err(Error::InvalidInstallments(0)));
        assert_eq!(plan(Some(121)), Err(Error::InvalidInstallments(121)));
    }

    #[test]
    fn recurring_cannot_have_installments() {
        let mut request = request();
        request.is_recurring = true;
        request.installments = Some(3);

        assert_eq!(
            request.validate(UtcOffset::UTC),
            Err(Error::RecurringInstallments)
        );
    }

    #[test]
    fn recurring_with_single_installment_is_recurring() {
        let mut request = request();
        request.is_recurring = true;
        request.installments = Some(1);

        assert_eq!(
            request.validate(UtcOffset::UTC).map(|purchase| purchase.plan),
            Ok(PurchasePlan::Recurring)
        );
    }
}
