//! Recurring transactions: standing monthly instructions and the ledger rows
//! generated from them.
//!
//! A recurring transaction is created together with its first twelve
//! occurrences, see [crate::transaction::create_purchase]. Editing or stopping
//! it only touches occurrences that are not yet due, and
//! [extend_recurring_transactions] keeps a year of occurrences ahead of today.

mod core;
mod edit;
mod extend;
mod stop;

pub use core::{
    NewRecurringTransaction, RecurringTransaction, create_recurring_transaction_table,
    delete_pending_occurrences, get_active_recurring_transactions, get_occurrences,
    get_recurring_transaction, insert_recurring_transaction, materialize_occurrences,
};
pub use edit::{EditedRecurring, RecurringEdit, edit_recurring_transaction};
pub use extend::{ExtendedRecurring, ExtensionReport, extend_recurring_transactions};
pub use stop::stop_recurring_transaction;
