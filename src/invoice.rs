//! Credit card invoices and paying them off from a bank account.
//!
//! Card purchases never touch a bank balance directly. They are grouped into a
//! monthly invoice by due date, and settling the invoice writes the single
//! expense that moves the money out of a bank account.

use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;
use time::{Date, Month};

use crate::{
    Error,
    account::get_account,
    billing::{BillingConfig, month_bounds, period_key, with_day},
    database_id::{AccountId, DatabaseId, TransactionId},
    transaction::{
        PaymentMethod, Transaction, TransactionType, insert_transaction, map_transaction_row,
        transaction_columns,
    },
    user::UserID,
};

/// A record of an invoice having been paid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceSettlement {
    /// The ID of the settlement.
    pub id: DatabaseId,
    /// The owner.
    pub user_id: UserID,
    /// The invoice month as `YYYY-MM`.
    pub period: String,
    /// The expense that paid the invoice.
    pub transaction_id: Option<TransactionId>,
    /// The day the user settled the invoice.
    pub settled_on: Date,
}

/// The credit card charges due in one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invoice {
    /// The invoice month as `YYYY-MM`.
    pub period: String,
    /// The day the invoice is due.
    pub due_date: Date,
    /// The card charges and refunds on the invoice, ordered by date.
    pub transactions: Vec<Transaction>,
    /// The charges minus the refunds, rounded to the cent.
    pub total: f64,
    /// The settlement, if the invoice has been paid.
    pub settlement: Option<InvoiceSettlement>,
}

/// Create the invoice settlement table.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn create_invoice_settlement_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS invoice_settlement (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                period TEXT NOT NULL,
                transaction_id INTEGER,
                settled_on TEXT NOT NULL,
                UNIQUE(user_id, period),
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(transaction_id) REFERENCES \"transaction\"(id) ON DELETE SET NULL
                )",
        (),
    )?;

    Ok(())
}

/// Get the credit card invoice due in `month` of `year`.
///
/// The invoice holds every non-deleted credit card transaction whose due
/// date falls in the month. Card income, such as a refund or chargeback, is
/// subtracted from the total.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn get_invoice(
    user_id: UserID,
    year: i32,
    month: Month,
    config: &BillingConfig,
    connection: &Connection,
) -> Result<Invoice, Error> {
    let (start, end) = month_bounds(year, month)?;

    let transactions = connection
        .prepare(&format!(
            "SELECT {} FROM \"transaction\"
             WHERE user_id = ?1
               AND payment_method = 'CREDIT_CARD'
               AND deleted_at IS NULL
               AND due_date BETWEEN ?2 AND ?3
             ORDER BY date ASC, id ASC",
            transaction_columns()
        ))?
        .query_map((user_id.as_i64(), start, end), map_transaction_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let total_cents: i64 = transactions
        .iter()
        .map(|transaction| {
            let cents = (transaction.amount * 100.0).round() as i64;
            match transaction.kind {
                TransactionType::Expense => cents,
                TransactionType::Income => -cents,
            }
        })
        .sum();
    let period = period_key(start);
    let settlement = get_settlement(user_id, &period, connection)?;

    Ok(Invoice {
        due_date: with_day(start, config.due_day()),
        period,
        transactions,
        total: total_cents as f64 / 100.0,
        settlement,
    })
}

/// Pay the credit card invoice due in `month` of `year` from a bank account.
///
/// Writes one expense for the invoice total, dated on the invoice due date and
/// assigned to `bank_account_id`, and records the settlement. An invoice can
/// only be settled once.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidPaymentMethod] if `payment_method` is the credit card,
/// - [Error::InvalidForeignKey] if the bank account does not belong to the user,
/// - [Error::EmptyInvoice] if the refunds cover the charges or there are none,
/// - [Error::InvoiceAlreadySettled] if the invoice has already been paid,
/// - or [Error::SqlError] if there is some other SQL error.
#[allow(clippy::too_many_arguments)]
pub fn settle_invoice(
    user_id: UserID,
    year: i32,
    month: Month,
    bank_account_id: AccountId,
    payment_method: PaymentMethod,
    today: Date,
    config: &BillingConfig,
    connection: &Connection,
) -> Result<(InvoiceSettlement, Transaction), Error> {
    if payment_method.is_credit_card() {
        return Err(Error::InvalidPaymentMethod(payment_method.to_string()));
    }

    let account = get_account(bank_account_id, user_id, connection).map_err(|error| match error {
        Error::NotFound => Error::InvalidForeignKey,
        error => error,
    })?;

    let tx = connection.unchecked_transaction()?;

    let invoice = get_invoice(user_id, year, month, config, &tx)?;
    if invoice.settlement.is_some() {
        return Err(Error::InvoiceAlreadySettled(invoice.period));
    }
    if invoice.total <= 0.0 {
        return Err(Error::EmptyInvoice(invoice.period));
    }

    let payment = insert_transaction(
        Transaction::build(
            user_id,
            invoice.total,
            TransactionType::Expense,
            payment_method,
            invoice.due_date,
            invoice.due_date,
            &format!("Credit card invoice {}", invoice.period),
        )
        .bank_account_id(Some(account.id)),
        &tx,
    )?;

    let settlement = tx
        .prepare(
            "INSERT INTO invoice_settlement (user_id, period, transaction_id, settled_on)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING id, user_id, period, transaction_id, settled_on",
        )?
        .query_row(
            (user_id.as_i64(), &invoice.period, payment.id, today),
            map_settlement_row,
        )?;

    tx.commit()?;

    tracing::info!(
        "Settled invoice {} of user {user_id} for {:.2} from account {}",
        invoice.period,
        invoice.total,
        account.id
    );

    Ok((settlement, payment))
}

fn get_settlement(
    user_id: UserID,
    period: &str,
    connection: &Connection,
) -> Result<Option<InvoiceSettlement>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, period, transaction_id, settled_on FROM invoice_settlement
             WHERE user_id = ?1 AND period = ?2",
        )?
        .query_row((user_id.as_i64(), period), map_settlement_row)
        .optional()
        .map_err(|error| error.into())
}

fn map_settlement_row(row: &Row) -> Result<InvoiceSettlement, rusqlite::Error> {
    Ok(InvoiceSettlement {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        period: row.get(2)?,
        transaction_id: row.get(3)?,
        settled_on: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::{Month, macros::date};

    use crate::{
        Error,
        account::{BankAccount, create_account, get_account_balance},
        billing::{BalanceCutoff, BillingConfig},
        db::initialize,
        transaction::{
            PaymentMethod, PurchasePlan, TransactionType, ValidatedPurchase, create_purchase,
            soft_delete_transaction,
        },
        user::{User, create_user},
    };

    use super::{get_invoice, settle_invoice};

    fn setup() -> (Connection, User, BankAccount) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user = create_user("Ana", "Etc/UTC", &conn).unwrap();
        let account = create_account(user.id, "Checking", 1000.0, &conn).unwrap();
        (conn, user, account)
    }

    fn card_purchase(
        amount: f64,
        purchase_date: time::Date,
        plan: PurchasePlan,
    ) -> ValidatedPurchase {
        ValidatedPurchase {
            amount,
            description: "Groceries".to_owned(),
            kind: TransactionType::Expense,
            payment_method: PaymentMethod::CreditCard,
            category_id: None,
            bank_account_id: None,
            purchase_date,
            plan,
        }
    }

    fn buy(conn: &Connection, user: &User, purchase: ValidatedPurchase) {
        create_purchase(user.id, purchase, &BillingConfig::default(), conn).unwrap();
    }

    #[test]
    fn invoice_groups_charges_by_due_month() {
        let (conn, user, _) = setup();
        // Before the closing day, due in March.
        buy(&conn, &user, card_purchase(10.1, date!(2024 - 03 - 02), PurchasePlan::Single));
        // After the closing day, due in April.
        buy(&conn, &user, card_purchase(20.2, date!(2024 - 03 - 07), PurchasePlan::Single));
        buy(
            &conn,
            &user,
            card_purchase(60.0, date!(2024 - 02 - 20), PurchasePlan::Installments(2)),
        );

        let march =
            get_invoice(user.id, 2024, Month::March, &BillingConfig::default(), &conn).unwrap();
        let april =
            get_invoice(user.id, 2024, Month::April, &BillingConfig::default(), &conn).unwrap();

        assert_eq!(march.period, "2024-03");
        assert_eq!(march.due_date, date!(2024 - 03 - 10));
        assert_eq!(march.transactions.len(), 2);
        assert_eq!(march.total, 40.1);
        assert_eq!(april.transactions.len(), 2);
        assert_eq!(april.total, 50.2);
        assert_eq!(april.settlement, None);
    }

    #[test]
    fn deleted_charges_are_not_invoiced() {
        let (conn, user, _) = setup();
        buy(&conn, &user, card_purchase(10.0, date!(2024 - 03 - 02), PurchasePlan::Single));
        let invoice =
            get_invoice(user.id, 2024, Month::March, &BillingConfig::default(), &conn).unwrap();

        soft_delete_transaction(invoice.transactions[0].id, user.id, &conn).unwrap();

        let invoice =
            get_invoice(user.id, 2024, Month::March, &BillingConfig::default(), &conn).unwrap();
        assert!(invoice.transactions.is_empty());
        assert_eq!(invoice.total, 0.0);
    }

    #[test]
    fn card_refund_is_subtracted_from_the_invoice() {
        let (conn, user, account) = setup();
        buy(&conn, &user, card_purchase(100.0, date!(2024 - 03 - 02), PurchasePlan::Single));
        let mut refund = card_purchase(30.0, date!(2024 - 03 - 04), PurchasePlan::Single);
        refund.kind = TransactionType::Income;
        refund.description = "Refund".to_owned();
        buy(&conn, &user, refund);

        let invoice =
            get_invoice(user.id, 2024, Month::March, &BillingConfig::default(), &conn).unwrap();
        let (_, payment) = settle_invoice(
            user.id,
            2024,
            Month::March,
            account.id,
            PaymentMethod::Pix,
            date!(2024 - 03 - 08),
            &BillingConfig::default(),
            &conn,
        )
        .unwrap();

        assert_eq!(invoice.transactions.len(), 2);
        assert_eq!(invoice.total, 70.0);
        assert_eq!(payment.amount, 70.0);
    }

    #[test]
    fn fully_refunded_invoice_has_nothing_to_pay() {
        let (conn, user, account) = setup();
        buy(&conn, &user, card_purchase(50.0, date!(2024 - 03 - 02), PurchasePlan::Single));
        let mut refund = card_purchase(50.0, date!(2024 - 03 - 04), PurchasePlan::Single);
        refund.kind = TransactionType::Income;
        buy(&conn, &user, refund);

        let result = settle_invoice(
            user.id,
            2024,
            Month::March,
            account.id,
            PaymentMethod::Pix,
            date!(2024 - 03 - 08),
            &BillingConfig::default(),
            &conn,
        );

        assert_eq!(
            result.map(|_| ()),
            Err(Error::EmptyInvoice("2024-03".to_owned()))
        );
    }

    #[test]
    fn settling_reduces_the_bank_balance_from_the_due_date() {
        let (conn, user, account) = setup();
        buy(&conn, &user, card_purchase(150.0, date!(2024 - 03 - 02), PurchasePlan::Single));

        let (settlement, payment) = settle_invoice(
            user.id,
            2024,
            Month::March,
            account.id,
            PaymentMethod::Pix,
            date!(2024 - 03 - 08),
            &BillingConfig::default(),
            &conn,
        )
        .unwrap();

        assert_eq!(settlement.period, "2024-03");
        assert_eq!(settlement.transaction_id, Some(payment.id));
        assert_eq!(settlement.settled_on, date!(2024 - 03 - 08));
        assert_eq!(payment.amount, 150.0);
        assert_eq!(payment.date, date!(2024 - 03 - 10));
        assert_eq!(payment.description, "Credit card invoice 2024-03");

        let before = get_account_balance(
            account.id,
            user.id,
            BalanceCutoff::EndOfDay(date!(2024 - 03 - 09)),
            &conn,
        );
        let after = get_account_balance(
            account.id,
            user.id,
            BalanceCutoff::EndOfDay(date!(2024 - 03 - 10)),
            &conn,
        );
        assert_eq!(before, Ok(1000.0));
        assert_eq!(after, Ok(850.0));

        let invoice =
            get_invoice(user.id, 2024, Month::March, &BillingConfig::default(), &conn).unwrap();
        assert_eq!(invoice.settlement, Some(settlement));
    }

    #[test]
    fn invoice_can_only_be_settled_once() {
        let (conn, user, account) = setup();
        buy(&conn, &user, card_purchase(150.0, date!(2024 - 03 - 02), PurchasePlan::Single));
        let settle = || {
            settle_invoice(
                user.id,
                2024,
                Month::March,
                account.id,
                PaymentMethod::Pix,
                date!(2024 - 03 - 08),
                &BillingConfig::default(),
                &conn,
            )
        };
        settle().unwrap();

        assert_eq!(
            settle().map(|_| ()),
            Err(Error::InvoiceAlreadySettled("2024-03".to_owned()))
        );
    }

    #[test]
    fn empty_invoice_is_rejected() {
        let (conn, user, account) = setup();

        let result = settle_invoice(
            user.id,
            2024,
            Month::March,
            account.id,
            PaymentMethod::Pix,
            date!(2024 - 03 - 08),
            &BillingConfig::default(),
            &conn,
        );

        assert_eq!(
            result.map(|_| ()),
            Err(Error::EmptyInvoice("2024-03".to_owned()))
        );
    }

    #[test]
    fn card_cannot_pay_its_own_invoice() {
        let (conn, user, account) = setup();
        buy(&conn, &user, card_purchase(150.0, date!(2024 - 03 - 02), PurchasePlan::Single));

        let result = settle_invoice(
            user.id,
            2024,
            Month::March,
            account.id,
            PaymentMethod::CreditCard,
            date!(2024 - 03 - 08),
            &BillingConfig::default(),
            &conn,
        );

        assert_eq!(
            result.map(|_| ()),
            Err(Error::InvalidPaymentMethod("CREDIT_CARD".to_owned()))
        );
    }

    #[test]
    fn account_of_another_user_is_rejected() {
        let (conn, user, _) = setup();
        let other = create_user("Bia", "Etc/UTC", &conn).unwrap();
        let account = create_account(other.id, "Savings", 0.0, &conn).unwrap();
        buy(&conn, &user, card_purchase(150.0, date!(2024 - 03 - 02), PurchasePlan::Single));

        let result = settle_invoice(
            user.id,
            2024,
            Month::March,
            account.id,
            PaymentMethod::Pix,
            date!(2024 - 03 - 08),
            &BillingConfig::default(),
            &conn,
        );

        assert_eq!(result.map(|_| ()), Err(Error::InvalidForeignKey));
    }
}
