//! Transaction management for the ledger.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - Database functions for storing, querying, and managing transactions
//! - Validation of submitted purchases and writing their rows
//! - Installment plans that group the installments of one purchase

mod core;
mod create;
mod installment_plan;
mod kind;
mod request;

pub(crate) use core::transaction_columns;
pub use core::{
    Transaction, TransactionBuilder, count_transactions, create_transaction_table,
    get_deleted_transactions, get_transaction, get_transactions_in_month,
    insert_recurring_occurrence, insert_transaction, map_transaction_row, restore_transaction,
    soft_delete_transaction,
};
pub use create::{CreatedPurchase, create_purchase};
pub use installment_plan::{
    InstallmentPlan, create_installment_plan_table, delete_installment_plan,
    get_installment_plan, insert_installment_plan,
};
pub use kind::{PaymentMethod, TransactionType, UnknownVariant};
pub use request::{MAX_INSTALLMENTS, PurchasePlan, PurchaseRequest, ValidatedPurchase};
