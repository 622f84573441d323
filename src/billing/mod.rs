//! The billing-cycle and recurrence date engine.
//!
//! Everything in this module is pure date computation: given a purchase date,
//! a payment method and the user's [BillingConfig], it decides which month a
//! transaction is attributed to, when it is due, and the forward series of
//! dates for installment plans and recurring instructions. Persisting the
//! resulting rows is left to the [crate::transaction] and [crate::recurring]
//! modules.

mod calendar;
mod config;
mod schedule;

pub use calendar::{
    BalanceCutoff, add_months, anchor_at_noon, last_day_of_month, month_bounds,
    parse_purchase_date, period_key, shift_months, with_day,
};
pub use config::{BillingConfig, DEFAULT_CLOSING_DAY, DEFAULT_DUE_DAY};
pub use schedule::{
    EXTENSION_HORIZON_MONTHS, Occurrence, RECURRING_MONTHS, closing_offset, edit_schedule,
    extension_horizon, extension_schedule, installment_description, installment_schedule,
    next_anchor_date, recurring_schedule, retarget_due_date, single_purchase,
};
