//! Bank accounts and their derived balances.

mod balance;
mod core;

pub use balance::{get_account_balance, get_total_account_balance};
pub use core::{
    BankAccount, create_account, create_account_table, get_account, get_accounts,
    map_row_to_account,
};
