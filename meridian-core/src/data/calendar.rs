//! Month-start calendar arithmetic.

use chrono::{Datelike, Months, NaiveDate};

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Month start `n` months after the month containing `date`.
pub fn add_months(date: NaiveDate, n: u32) -> NaiveDate {
    let start = month_start(date);
    start.checked_add_months(Months::new(n)).unwrap_or(start)
}

/// Month start `n` months before the month containing `date`.
pub fn sub_months(date: NaiveDate, n: u32) -> NaiveDate {
    let start = month_start(date);
    start.checked_sub_months(Months::new(n)).unwrap_or(start)
}

/// `periods` consecutive month starts, the first one month after `last`.
pub fn months_after(last: NaiveDate, periods: usize) -> Vec<NaiveDate> {
    (1..=periods as u32).map(|i| add_months(last, i)).collect()
}

/// `periods` consecutive month starts ending at the month containing `end`.
pub fn months_ending(end: NaiveDate, periods: usize) -> Vec<NaiveDate> {
    (0..periods as u32)
        .rev()
        .map(|i| sub_months(end, i))
        .collect()
}
