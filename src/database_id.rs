//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;
/// Database identifier for a ledger transaction.
pub type TransactionId = DatabaseId;
/// Database identifier for a recurring transaction.
pub type RecurringId = DatabaseId;
/// Database identifier for an installment plan.
pub type InstallmentPlanId = DatabaseId;
/// Database identifier for a category.
pub type CategoryId = DatabaseId;
/// Database identifier for a bank account.
pub type AccountId = DatabaseId;
