//! Calendar arithmetic used by the billing engine.
//!
//! Month arithmetic clamps the day of the month to the last valid day of the
//! target month, e.g. adding one month to 31 January gives 28 (or 29)
//! February, never 2 or 3 March.

use time::{
    Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset,
    format_description::well_known::Rfc3339, macros::format_description, macros::time,
};

use crate::Error;

/// The time of day that plain calendar dates are anchored to.
///
/// Anchoring at midday keeps the calendar date stable when the instant is
/// shifted by any UTC offset within ±12 hours.
pub const NOON: Time = time!(12:00:00);

/// The last instant of a day.
pub const END_OF_DAY: Time = time!(23:59:59.999_999_999);

/// Get the number of days in `month` of `year`.
pub fn last_day_of_month(year: i32, month: Month) -> u8 {
    match month {
        Month::January
        | Month::March
        | Month::May
        | Month::July
        | Month::August
        | Month::October
        | Month::December => 31,
        Month::April | Month::June | Month::September | Month::November => 30,
        Month::February => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

/// Replace the day of the month of `date`, clamping `day` to the last day of
/// the month.
pub fn with_day(date: Date, day: u8) -> Date {
    let day = day.clamp(1, last_day_of_month(date.year(), date.month()));

    Date::from_calendar_date(date.year(), date.month(), day)
        .expect("clamped day should always be valid for the month")
}

/// Move `date` forward by `months` calendar months and snap the day of the
/// month to `day` (clamped to the target month).
///
/// # Errors
///
/// Returns [Error::DateOutOfRange] if the resulting year is not representable.
pub fn shift_months(date: Date, months: u32, day: u8) -> Result<Date, Error> {
    let month_index = i64::from(date.year()) * 12 + i64::from(u8::from(date.month()) - 1);
    let target_index = month_index + i64::from(months);

    let year = i32::try_from(target_index.div_euclid(12)).map_err(|_| Error::DateOutOfRange(date))?;
    let month = Month::try_from((target_index.rem_euclid(12) + 1) as u8)
        .map_err(|_| Error::DateOutOfRange(date))?;

    let first_of_month =
        Date::from_calendar_date(year, month, 1).map_err(|_| Error::DateOutOfRange(date))?;

    Ok(with_day(first_of_month, day))
}

/// Add `months` calendar months to `date`, keeping its day of the month
/// where the target month allows it.
///
/// # Errors
///
/// Returns [Error::DateOutOfRange] if the resulting year is not representable.
pub fn add_months(date: Date, months: u32) -> Result<Date, Error> {
    shift_months(date, months, date.day())
}

/// The first and last day of `month` in `year`.
pub fn month_bounds(year: i32, month: Month) -> Result<(Date, Date), Error> {
    let start = Date::from_calendar_date(year, month, 1)
        .map_err(|_| Error::InvalidDate(format!("{year}-{month}")))?;

    Ok((start, with_day(start, 31)))
}

/// The key identifying the calendar month of `date`, e.g. `"2024-03"`.
pub fn period_key(date: Date) -> String {
    format!("{:04}-{:02}", date.year(), u8::from(date.month()))
}

/// Anchor a calendar date at [NOON] in the given local offset.
pub fn anchor_at_noon(date: Date, local_offset: UtcOffset) -> OffsetDateTime {
    PrimitiveDateTime::new(date, NOON).assume_offset(local_offset)
}

/// Parse a purchase date from user input.
///
/// Plain calendar dates (`2024-03-07`) are anchored at midday local time.
/// RFC 3339 timestamps are converted to the local offset first, so an
/// instant late in the evening UTC lands on the local calendar day.
///
/// # Errors
///
/// Returns [Error::InvalidDate] if `input` is neither format.
pub fn parse_purchase_date(input: &str, local_offset: UtcOffset) -> Result<OffsetDateTime, Error> {
    let input = input.trim();

    if let Ok(date) = Date::parse(input, format_description!("[year]-[month]-[day]")) {
        return Ok(anchor_at_noon(date, local_offset));
    }

    OffsetDateTime::parse(input, &Rfc3339)
        .map(|timestamp| timestamp.to_offset(local_offset))
        .map_err(|_| Error::InvalidDate(input.to_owned()))
}

/// The instant up to which transactions count towards a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceCutoff {
    /// Include everything up to the end of the given day.
    EndOfDay(Date),
    /// Include everything up to the end of the given month.
    EndOfMonth(i32, Month),
}

impl BalanceCutoff {
    /// Choose the cutoff for a balance shown on `today`.
    ///
    /// The current balance (no month selected, or the current month) includes
    /// everything up to the end of today. Any other month uses the end of
    /// that month, so a historical snapshot does not change depending on when
    /// it is queried.
    pub fn for_view(today: Date, viewed_month: Option<(i32, Month)>) -> Self {
        match viewed_month {
            Some((year, month)) if (year, month) != (today.year(), today.month()) => {
                BalanceCutoff::EndOfMonth(year, month)
            }
            _ => BalanceCutoff::EndOfDay(today),
        }
    }

    /// The last calendar date included by the cutoff.
    pub fn last_included_date(&self) -> Result<Date, Error> {
        match *self {
            BalanceCutoff::EndOfDay(date) => Ok(date),
            BalanceCutoff::EndOfMonth(year, month) => month_bounds(year, month).map(|(_, end)| end),
        }
    }

    /// The last instant included by the cutoff.
    pub fn instant(&self) -> Result<PrimitiveDateTime, Error> {
        self.last_included_date()
            .map(|date| PrimitiveDateTime::new(date, END_OF_DAY))
    }
}
