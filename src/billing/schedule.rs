//! Computes the attributed ("visual") date and the due date of purchases,
//! installment plans and recurring instructions.

use std::collections::HashSet;

use serde::Serialize;
use time::Date;

use crate::{
    Error,
    billing::{
        BillingConfig,
        calendar::{add_months, period_key, shift_months, with_day},
    },
    transaction::PaymentMethod,
};

/// How many occurrences of a recurring instruction are materialised when it
/// is created or edited.
pub const RECURRING_MONTHS: u32 = 12;

/// How far ahead, in months, the extension job keeps recurring instructions
/// materialised.
pub const EXTENSION_HORIZON_MONTHS: u32 = 12;

/// The dates of a single ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    /// The date the row is attributed to for budgeting and display.
    pub date: Date,
    /// The date the money actually moves.
    pub due_date: Date,
}

impl Occurrence {
    fn on(date: Date, method: PaymentMethod, config: &BillingConfig) -> Self {
        let due_date = if method.is_credit_card() {
            with_day(date, config.due_day())
        } else {
            date
        };

        Self { date, due_date }
    }
}

/// The number of billing cycles a credit card purchase is pushed forward.
///
/// A purchase on or after the closing day lands on the next statement.
pub fn closing_offset(purchase_date: Date, closing_day: u8) -> u32 {
    if purchase_date.day() >= closing_day {
        1
    } else {
        0
    }
}

fn month_offset(purchase_date: Date, method: PaymentMethod, config: &BillingConfig) -> u32 {
    if method.is_credit_card() {
        closing_offset(purchase_date, config.closing_day())
    } else {
        0
    }
}

/// The dates of a one-off purchase.
///
/// Credit card purchases are attributed to the month of the statement they
/// land on and are due on the due day of that month. Every other method is
/// attributed to and due on the purchase date.
///
/// # Errors
///
/// Returns [Error::DateOutOfRange] if the attributed date is not representable.
pub fn single_purchase(
    purchase_date: Date,
    method: PaymentMethod,
    config: &BillingConfig,
) -> Result<Occurrence, Error> {
    let date = add_months(purchase_date, month_offset(purchase_date, method, config))?;

    Ok(Occurrence::on(date, method, config))
}

/// The dates of each installment of a purchase split into `installments`
/// monthly payments, in order.
///
/// # Errors
///
/// Returns [Error::InvalidInstallments] if `installments` is less than two, or
/// [Error::DateOutOfRange] if a date is not representable.
pub fn installment_schedule(
    purchase_date: Date,
    method: PaymentMethod,
    installments: u32,
    config: &BillingConfig,
) -> Result<Vec<Occurrence>, Error> {
    if installments < 2 {
        return Err(Error::InvalidInstallments(installments));
    }

    monthly_series(purchase_date, method, installments, config)
}

/// The first [RECURRING_MONTHS] occurrences of a recurring instruction
/// starting on `start_date`.
///
/// # Errors
///
/// Returns [Error::DateOutOfRange] if a date is not representable.
pub fn recurring_schedule(
    start_date: Date,
    method: PaymentMethod,
    config: &BillingConfig,
) -> Result<Vec<Occurrence>, Error> {
    monthly_series(start_date, method, RECURRING_MONTHS, config)
}

fn monthly_series(
    start_date: Date,
    method: PaymentMethod,
    count: u32,
    config: &BillingConfig,
) -> Result<Vec<Occurrence>, Error> {
    let offset = month_offset(start_date, method, config);
    let anchor_day = start_date.day();

    (0..count)
        .map(|index| {
            shift_months(start_date, offset + index, anchor_day)
                .map(|date| Occurrence::on(date, method, config))
        })
        .collect()
}

/// The first date on or after `today` that falls on `anchor_day` (clamped to
/// the length of the month).
///
/// # Errors
///
/// Returns [Error::DateOutOfRange] if the date is not representable.
pub fn next_anchor_date(today: Date, anchor_day: u8) -> Result<Date, Error> {
    let this_month = with_day(today, anchor_day);

    if this_month < today {
        shift_months(today, 1, anchor_day)
    } else {
        Ok(this_month)
    }
}

/// The occurrences regenerated after a recurring instruction is edited to
/// start on `new_start_date`.
///
/// The series starts on the first date on or after `today` that falls on the
/// new anchor day, so an anchor day that has already passed this month is
/// skipped. Every later occurrence is one month after the previous one.
/// Months listed in `taken_periods` already hold an occurrence and are
/// stepped over, so the result always has [RECURRING_MONTHS] occurrences in
/// as many distinct months.
///
/// # Errors
///
/// Returns [Error::DateOutOfRange] if a date is not representable.
pub fn edit_schedule(
    new_start_date: Date,
    method: PaymentMethod,
    today: Date,
    taken_periods: &HashSet<String>,
    config: &BillingConfig,
) -> Result<Vec<Occurrence>, Error> {
    let anchor_day = new_start_date.day();
    let first = next_anchor_date(today, anchor_day)?;
    let offset = month_offset(first, method, config);

    let mut occurrences = Vec::with_capacity(RECURRING_MONTHS as usize);
    let mut index = 0;

    while occurrences.len() < RECURRING_MONTHS as usize {
        let date = shift_months(first, offset + index, anchor_day)?;
        index += 1;

        if taken_periods.contains(&period_key(date)) {
            continue;
        }

        occurrences.push(Occurrence::on(date, method, config));
    }

    Ok(occurrences)
}

/// The occurrences that extend a recurring instruction from its latest
/// materialised date up to `horizon`.
///
/// Steps one month at a time from `last_date`, snapping each date to
/// `anchor_day`, and stops after the first date that reaches `horizon`.
/// Nothing is generated when `last_date` is already on or after `horizon`.
///
/// # Errors
///
/// Returns [Error::DateOutOfRange] if a date is not representable.
pub fn extension_schedule(
    last_date: Date,
    anchor_day: u8,
    method: PaymentMethod,
    horizon: Date,
    config: &BillingConfig,
) -> Result<Vec<Occurrence>, Error> {
    let mut occurrences = Vec::new();
    let mut current = last_date;

    while current < horizon {
        current = shift_months(current, 1, anchor_day)?;
        occurrences.push(Occurrence::on(current, method, config));
    }

    Ok(occurrences)
}

/// The horizon the extension job fills up to, one year after `today`.
///
/// # Errors
///
/// Returns [Error::DateOutOfRange] if the date is not representable.
pub fn extension_horizon(today: Date) -> Result<Date, Error> {
    add_months(today, EXTENSION_HORIZON_MONTHS)
}

/// Move `due_date` to `due_day` within the same month.
pub fn retarget_due_date(due_date: Date, due_day: u8) -> Date {
    with_day(due_date, due_day)
}

/// Append the installment label, e.g. `"Laptop (2/10)"`.
pub fn installment_description(description: &str, index: u32, installments: u32) -> String {
    format!("{description} ({}/{installments})", index + 1)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use time::{Duration, macros::date};

    use crate::{
        Error,
        billing::{
            BillingConfig,
            schedule::{
                Occurrence, closing_offset, edit_schedule, extension_horizon,
                extension_schedule, installment_description, installment_schedule,
                next_anchor_date, recurring_schedule, retarget_due_date, single_purchase,
            },
        },
        transaction::PaymentMethod,
    };

    fn config() -> BillingConfig {
        BillingConfig::new(6, 10).unwrap()
    }

    #[test]
    fn offset_is_one_on_or_after_closing_day() {
        assert_eq!(closing_offset(date!(2024 - 03 - 05), 6), 0);
        assert_eq!(closing_offset(date!(2024 - 03 - 06), 6), 1);
        assert_eq!(closing_offset(date!(2024 - 03 - 31), 6), 1);
        assert_eq!(closing_offset(date!(2024 - 03 - 01), 1), 1);
    }

    #[test]
    fn offset_matches_comparison_for_every_day() {
        for closing_day in 1..=31 {
            for day in 1..=31 {
                let purchase = date!(2024 - 01 - 01).replace_day(day).unwrap();
                let want = u32::from(day >= closing_day);

                assert_eq!(closing_offset(purchase, closing_day), want);
            }
        }
    }

    #[test]
    fn card_purchase_after_closing_moves_to_next_month() {
        let got = single_purchase(date!(2024 - 03 - 07), PaymentMethod::CreditCard, &config());

        assert_eq!(
            got,
            Ok(Occurrence {
                date: date!(2024 - 04 - 07),
                due_date: date!(2024 - 04 - 10),
            })
        );
    }

    #[test]
    fn card_purchase_before_closing_stays_in_month() {
        let got = single_purchase(date!(2024 - 03 - 05), PaymentMethod::CreditCard, &config());

        assert_eq!(
            got,
            Ok(Occurrence {
                date: date!(2024 - 03 - 05),
                due_date: date!(2024 - 03 - 10),
            })
        );
    }

    #[test]
    fn non_card_purchase_is_due_on_purchase_date() {
        let purchase = date!(2024 - 03 - 07);

        for method in [
            PaymentMethod::Pix,
            PaymentMethod::DebitCard,
            PaymentMethod::Cash,
            PaymentMethod::Other,
            PaymentMethod::Boleto,
        ] {
            assert_eq!(
                single_purchase(purchase, method, &config()),
                Ok(Occurrence {
                    date: purchase,
                    due_date: purchase,
                })
            );
        }
    }

    #[test]
    fn due_day_is_clamped_in_short_months() {
        let config = BillingConfig::new(6, 31).unwrap();

        let got = single_purchase(date!(2024 - 01 - 10), PaymentMethod::CreditCard, &config);

        assert_eq!(
            got,
            Ok(Occurrence {
                date: date!(2024 - 02 - 10),
                due_date: date!(2024 - 02 - 29),
            })
        );
    }

    #[test]
    fn three_installments_after_closing_day() {
        let got = installment_schedule(
            date!(2024 - 03 - 07),
            PaymentMethod::CreditCard,
            3,
            &config(),
        )
        .unwrap();

        assert_eq!(
            got,
            vec![
                Occurrence {
                    date: date!(2024 - 04 - 07),
                    due_date: date!(2024 - 04 - 10),
                },
                Occurrence {
                    date: date!(2024 - 05 - 07),
                    due_date: date!(2024 - 05 - 10),
                },
                Occurrence {
                    date: date!(2024 - 06 - 07),
                    due_date: date!(2024 - 06 - 10),
                },
            ]
        );
    }

    #[test]
    fn installments_increase_by_one_month_and_are_due_on_due_day() {
        let got = installment_schedule(
            date!(2024 - 01 - 31),
            PaymentMethod::CreditCard,
            12,
            &config(),
        )
        .unwrap();

        for pair in got.windows(2) {
            let (previous, next) = (pair[0].date, pair[1].date);
            let months_between = (next.year() - previous.year()) * 12
                + i32::from(u8::from(next.month()))
                - i32::from(u8::from(previous.month()));

            assert!(previous < next);
            assert_eq!(months_between, 1);
        }

        assert!(got.iter().all(|occurrence| occurrence.due_date.day() == 10));
        // The anchor day survives February.
        assert_eq!(got[0].date, date!(2024 - 02 - 29));
        assert_eq!(got[1].date, date!(2024 - 03 - 31));
    }

    #[test]
    fn installments_need_at_least_two() {
        let got = installment_schedule(
            date!(2024 - 03 - 07),
            PaymentMethod::CreditCard,
            1,
            &config(),
        );

        assert_eq!(got, Err(Error::InvalidInstallments(1)));
    }

    #[test]
    fn installment_description_is_one_based() {
        assert_eq!(installment_description("Laptop", 0, 3), "Laptop (1/3)");
        assert_eq!(installment_description("Laptop", 2, 3), "Laptop (3/3)");
    }

    #[test]
    fn recurring_non_card_runs_for_twelve_months_on_start_day() {
        let got = recurring_schedule(date!(2024 - 01 - 15), PaymentMethod::Pix, &config()).unwrap();

        assert_eq!(got.len(), 12);
        for (month, occurrence) in (1..=12u8).zip(&got) {
            assert_eq!(occurrence.date, occurrence.due_date);
            assert_eq!(occurrence.date.day(), 15);
            assert_eq!(occurrence.date.year(), 2024);
            assert_eq!(u8::from(occurrence.date.month()), month);
        }
    }

    #[test]
    fn recurring_card_applies_offset_once() {
        let got =
            recurring_schedule(date!(2024 - 01 - 20), PaymentMethod::CreditCard, &config()).unwrap();

        assert_eq!(got.len(), 12);
        assert_eq!(
            got[0],
            Occurrence {
                date: date!(2024 - 02 - 20),
                due_date: date!(2024 - 02 - 10),
            }
        );
        assert_eq!(got[11].date, date!(2025 - 01 - 20));
    }

    #[test]
    fn next_anchor_date_keeps_this_month_when_not_passed() {
        assert_eq!(
            next_anchor_date(date!(2024 - 05 - 10), 20),
            Ok(date!(2024 - 05 - 20))
        );
        assert_eq!(
            next_anchor_date(date!(2024 - 05 - 10), 10),
            Ok(date!(2024 - 05 - 10))
        );
    }

    #[test]
    fn next_anchor_date_skips_passed_day() {
        assert_eq!(
            next_anchor_date(date!(2024 - 05 - 10), 5),
            Ok(date!(2024 - 06 - 05))
        );
    }

    #[test]
    fn edit_schedule_is_uniform_after_skipping() {
        let got = edit_schedule(
            date!(2023 - 01 - 05),
            PaymentMethod::Boleto,
            date!(2024 - 05 - 10),
            &HashSet::new(),
            &config(),
        )
        .unwrap();

        assert_eq!(got.len(), 12);
        assert_eq!(got[0].date, date!(2024 - 06 - 05));
        assert_eq!(got[1].date, date!(2024 - 07 - 05));
        assert_eq!(got[11].date, date!(2025 - 05 - 05));

        let mut months: Vec<_> = got.iter().map(|o| (o.date.year(), o.date.month())).collect();
        months.dedup();
        assert_eq!(months.len(), 12);
    }

    #[test]
    fn edit_schedule_starts_this_month_when_day_not_passed() {
        let got = edit_schedule(
            date!(2024 - 01 - 25),
            PaymentMethod::Cash,
            date!(2024 - 05 - 10),
            &HashSet::new(),
            &config(),
        )
        .unwrap();

        assert_eq!(got[0].date, date!(2024 - 05 - 25));
        assert!(got.iter().all(|o| o.date >= date!(2024 - 05 - 10)));
    }

    #[test]
    fn edit_schedule_steps_over_taken_months() {
        let taken = HashSet::from(["2024-05".to_owned(), "2024-07".to_owned()]);

        let got = edit_schedule(
            date!(2024 - 05 - 20),
            PaymentMethod::Pix,
            date!(2024 - 05 - 10),
            &taken,
            &config(),
        )
        .unwrap();

        let dates: Vec<_> = got.iter().map(|o| o.date).collect();
        assert_eq!(dates.len(), 12);
        assert_eq!(dates[0], date!(2024 - 06 - 20));
        assert_eq!(dates[1], date!(2024 - 08 - 20));
        assert_eq!(dates[11], date!(2025 - 06 - 20));
        assert!(
            got.iter()
                .all(|o| o.date.month() != time::Month::July || o.date.year() != 2024)
        );
    }

    #[test]
    fn extension_fills_until_horizon_is_reached() {
        let horizon = date!(2025 - 05 - 10);

        let got = extension_schedule(
            date!(2025 - 02 - 15),
            15,
            PaymentMethod::Pix,
            horizon,
            &config(),
        )
        .unwrap();

        let dates: Vec<_> = got.iter().map(|o| o.date).collect();
        assert_eq!(
            dates,
            vec![
                date!(2025 - 03 - 15),
                date!(2025 - 04 - 15),
                date!(2025 - 05 - 15)
            ]
        );
    }

    #[test]
    fn extension_resnaps_to_anchor_day() {
        let got = extension_schedule(
            date!(2025 - 02 - 28),
            31,
            PaymentMethod::CreditCard,
            date!(2025 - 03 - 01),
            &config(),
        )
        .unwrap();

        assert_eq!(
            got,
            vec![Occurrence {
                date: date!(2025 - 03 - 31),
                due_date: date!(2025 - 03 - 10),
            }]
        );
    }

    #[test]
    fn extension_is_empty_at_horizon() {
        let horizon = date!(2025 - 05 - 10);

        let got = extension_schedule(horizon, 10, PaymentMethod::Pix, horizon, &config());

        assert_eq!(got, Ok(vec![]));

        let got = extension_schedule(
            horizon + Duration::days(3),
            13,
            PaymentMethod::Pix,
            horizon,
            &config(),
        );

        assert_eq!(got, Ok(vec![]));
    }

    #[test]
    fn horizon_is_one_year_ahead() {
        assert_eq!(
            extension_horizon(date!(2024 - 02 - 29)),
            Ok(date!(2025 - 02 - 28))
        );
    }

    #[test]
    fn retarget_keeps_year_and_month() {
        assert_eq!(
            retarget_due_date(date!(2024 - 04 - 10), 25),
            date!(2024 - 04 - 25)
        );
        assert_eq!(
            retarget_due_date(date!(2024 - 02 - 10), 30),
            date!(2024 - 02 - 29)
        );
    }
}
