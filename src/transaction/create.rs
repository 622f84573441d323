//! Turns a validated purchase into ledger rows.

use rusqlite::Connection;
use serde::Serialize;

use crate::{
    Error,
    account::get_account,
    billing::{
        BillingConfig, installment_description, installment_schedule, recurring_schedule,
        single_purchase,
    },
    category::ensure_category_owner,
    recurring::{
        NewRecurringTransaction, RecurringTransaction, insert_recurring_transaction,
        materialize_occurrences,
    },
    transaction::{
        InstallmentPlan, PurchasePlan, Transaction, ValidatedPurchase, insert_installment_plan,
        insert_transaction,
    },
    user::UserID,
};

/// The rows written for a purchase.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CreatedPurchase {
    /// A one-off purchase.
    Single(Transaction),
    /// A purchase split into installments.
    Installments {
        /// The plan shared by the installments.
        plan: InstallmentPlan,
        /// One row per installment, in order.
        transactions: Vec<Transaction>,
    },
    /// A recurring instruction and its first occurrences.
    Recurring {
        /// The new instruction.
        recurring: RecurringTransaction,
        /// The occurrences generated for the first year.
        transactions: Vec<Transaction>,
    },
}

impl CreatedPurchase {
    /// The ledger rows that were written.
    pub fn transactions(&self) -> &[Transaction] {
        match self {
            CreatedPurchase::Single(transaction) => std::slice::from_ref(transaction),
            CreatedPurchase::Installments { transactions, .. }
            | CreatedPurchase::Recurring { transactions, .. } => transactions,
        }
    }
}

/// Write the rows for a purchase.
///
/// A single purchase writes one row. An installment purchase writes an
/// [InstallmentPlan] and one row per installment, splitting the amount evenly
/// to the cent with any remainder added to the first installment. A recurring
/// purchase writes a [RecurringTransaction] and its first twelve occurrences.
///
/// Either every row is written or none are.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidForeignKey] if the category or bank account does not belong to the user,
/// - [Error::InvalidAmount] if the amount is too small to split into the installments,
/// - [Error::DateOutOfRange] if a computed date is not representable,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_purchase(
    user_id: UserID,
    purchase: ValidatedPurchase,
    config: &BillingConfig,
    connection: &Connection,
) -> Result<CreatedPurchase, Error> {
    if let Some(category_id) = purchase.category_id {
        ensure_category_owner(category_id, user_id, connection)?;
    }

    if let Some(account_id) = purchase.bank_account_id {
        get_account(account_id, user_id, connection).map_err(|error| match error {
            Error::NotFound => Error::InvalidForeignKey,
            error => error,
        })?;
    }

    let tx = connection.unchecked_transaction()?;

    let created = match purchase.plan {
        PurchasePlan::Single => {
            let occurrence =
                single_purchase(purchase.purchase_date, purchase.payment_method, config)?;

            let builder = Transaction::build(
                user_id,
                purchase.amount,
                purchase.kind,
                purchase.payment_method,
                occurrence.date,
                occurrence.due_date,
                &purchase.description,
            )
            .category_id(purchase.category_id)
            .bank_account_id(purchase.bank_account_id);

            CreatedPurchase::Single(insert_transaction(builder, &tx)?)
        }
        PurchasePlan::Installments(installments) => {
            let schedule = installment_schedule(
                purchase.purchase_date,
                purchase.payment_method,
                installments,
                config,
            )?;
            let amounts = split_amount(purchase.amount, installments)?;

            let plan = insert_installment_plan(
                user_id,
                &purchase.description,
                purchase.amount,
                installments,
                purchase.purchase_date,
                &tx,
            )?;

            let transactions = schedule
                .iter()
                .zip(amounts)
                .zip(0..)
                .map(|((occurrence, amount), index)| {
                    let builder = Transaction::build(
                        user_id,
                        amount,
                        purchase.kind,
                        purchase.payment_method,
                        occurrence.date,
                        occurrence.due_date,
                        &installment_description(&purchase.description, index, installments),
                    )
                    .category_id(purchase.category_id)
                    .bank_account_id(purchase.bank_account_id)
                    .installment(plan.id, index + 1);

                    insert_transaction(builder, &tx)
                })
                .collect::<Result<Vec<_>, _>>()?;

            CreatedPurchase::Installments { plan, transactions }
        }
        PurchasePlan::Recurring => {
            let schedule =
                recurring_schedule(purchase.purchase_date, purchase.payment_method, config)?;

            let recurring = insert_recurring_transaction(
                NewRecurringTransaction {
                    user_id,
                    amount: purchase.amount,
                    description: purchase.description,
                    kind: purchase.kind,
                    payment_method: purchase.payment_method,
                    category_id: purchase.category_id,
                    bank_account_id: purchase.bank_account_id,
                    start_date: purchase.purchase_date,
                },
                &tx,
            )?;

            let transactions = materialize_occurrences(&recurring, &schedule, &tx)?;

            CreatedPurchase::Recurring {
                recurring,
                transactions,
            }
        }
    };

    tx.commit()?;

    tracing::info!(
        "Created {} transaction(s) for user {user_id}",
        created.transactions().len()
    );

    Ok(created)
}

/// Split `amount` into `installments` parts that add up to it exactly in cents.
fn split_amount(amount: f64, installments: u32) -> Result<Vec<f64>, Error> {
    let total_cents = (amount * 100.0).round() as i64;
    let count = i64::from(installments);
    let base = total_cents / count;

    if base == 0 {
        return Err(Error::InvalidAmount(amount));
    }

    let remainder = total_cents - base * count;

    Ok((0..count)
        .map(|index| {
            let cents = if index == 0 { base + remainder } else { base };
            cents as f64 / 100.0
        })
        .collect())
}
