//! Budget Cycle is the ledger engine of a personal finance app.
//!
//! It records purchases and income, works out which month a credit card
//! purchase is billed in and when it is due, splits purchases into monthly
//! installments, and keeps recurring transactions generated a year ahead.
//! Bank balances, credit card invoices and monthly summaries are derived from
//! the ledger.
//!
//! Every operation takes a borrowed [rusqlite::Connection]; call
//! [initialize_db] once to create the schema. Date rules that depend on the
//! user's card live in [billing::BillingConfig] and are passed explicitly.

#![warn(missing_docs)]

pub mod account;
pub mod billing;
pub mod category;
pub mod database_id;
mod db;
mod error;
pub mod invoice;
pub mod logging;
pub mod recurring;
pub mod summary;
pub mod timezone;
pub mod transaction;
pub mod user;

pub use db::initialize as initialize_db;
pub use error::Error;
pub use user::{User, UserID, get_user_by_id};
