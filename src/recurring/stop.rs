//! Stopping a recurring transaction.

use rusqlite::Connection;
use time::Date;

use crate::{
    Error,
    database_id::RecurringId,
    recurring::{delete_pending_occurrences, get_recurring_transaction},
    user::UserID,
};

/// Stop a recurring transaction.
///
/// The recurring transaction is deactivated, never deleted, and every
/// occurrence due on or after `today` is deleted. Earlier occurrences are
/// kept. Returns the number of deleted occurrences.
///
/// Stopping an already stopped recurring transaction deletes any pending
/// occurrences left over and is otherwise a no-op.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the recurring transaction does not exist or belongs to another user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn stop_recurring_transaction(
    id: RecurringId,
    user_id: UserID,
    today: Date,
    connection: &Connection,
) -> Result<usize, Error> {
    let tx = connection.unchecked_transaction()?;

    let recurring = get_recurring_transaction(id, user_id, &tx)?;

    tx.execute(
        "UPDATE recurring_transaction SET active = 0 WHERE id = ?1",
        [recurring.id],
    )?;

    let deleted = delete_pending_occurrences(recurring.id, today, &tx)?;

    tx.commit()?;

    tracing::info!(
        "Stopped recurring transaction {} and removed {deleted} pending occurrences",
        recurring.id
    );

    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        billing::BillingConfig,
        db::initialize,
        recurring::{
            RecurringTransaction, get_occurrences, get_recurring_transaction,
            stop_recurring_transaction,
        },
        transaction::{
            CreatedPurchase, PaymentMethod, PurchasePlan, TransactionType, ValidatedPurchase,
            create_purchase,
        },
        user::{User, create_user},
    };

    fn setup() -> (Connection, User, RecurringTransaction) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user = create_user("Ana", "Etc/UTC", &conn).unwrap();

        let created = create_purchase(
            user.id,
            ValidatedPurchase {
                amount: 1200.0,
                description: "Rent".to_owned(),
                kind: TransactionType::Expense,
                payment_method: PaymentMethod::Boleto,
                category_id: None,
                bank_account_id: None,
                purchase_date: date!(2024 - 01 - 15),
                plan: PurchasePlan::Recurring,
            },
            &BillingConfig::default(),
            &conn,
        )
        .unwrap();

        let CreatedPurchase::Recurring { recurring, .. } = created else {
            panic!("expected a recurring purchase");
        };

        (conn, user, recurring)
    }

    #[test]
    fn stop_deactivates_and_removes_pending_rows() {
        let (conn, user, recurring) = setup();
        let today = date!(2024 - 06 - 15);

        let deleted = stop_recurring_transaction(recurring.id, user.id, today, &conn);

        // Jun-Dec, including today.
        assert_eq!(deleted, Ok(7));
        let stopped = get_recurring_transaction(recurring.id, user.id, &conn).unwrap();
        assert!(!stopped.active);

        let remaining = get_occurrences(recurring.id, user.id, &conn).unwrap();
        assert_eq!(remaining.len(), 5);
        assert!(remaining.iter().all(|t| t.due_date < today));
    }

    #[test]
    fn stopping_twice_is_harmless() {
        let (conn, user, recurring) = setup();
        let today = date!(2024 - 06 - 15);
        stop_recurring_transaction(recurring.id, user.id, today, &conn).unwrap();

        let deleted = stop_recurring_transaction(recurring.id, user.id, today, &conn);

        assert_eq!(deleted, Ok(0));
    }

    #[test]
    fn other_user_cannot_stop() {
        let (conn, user, recurring) = setup();
        let other = create_user("Bia", "Etc/UTC", &conn).unwrap();

        let result =
            stop_recurring_transaction(recurring.id, other.id, date!(2024 - 06 - 15), &conn);

        assert_eq!(result, Err(Error::NotFound));
        assert!(
            get_recurring_transaction(recurring.id, user.id, &conn)
                .unwrap()
                .active
        );
        assert_eq!(
            get_occurrences(recurring.id, user.id, &conn).unwrap().len(),
            12
        );
    }
}
