//! calendar helpers shared by the calculators: day counts, month
//! arithmetic with day-of-month clamping, and overdue-day computation

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};

/// whole days from `start` to `end`, negative when `end` is earlier
pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// whole elapsed days between two instants, floored at zero
pub fn elapsed_days(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    (end - start).num_days().max(0) as u32
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

/// the given day in (year, month), clamped to the month length
pub fn clamped_date(year: i32, month: u32, day: u32) -> NaiveDate {
    let day = day.clamp(1, days_in_month(year, month));
    // day is within the month so construction cannot fail
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

/// shift (year, month) by `months`, returning the new pair
pub fn shift_month(year: i32, month: u32, months: u32) -> (i32, u32) {
    let zero_based = (month as i64 - 1) + months as i64;
    let year = year + (zero_based / 12) as i32;
    let month = (zero_based % 12) as u32 + 1;
    (year, month)
}

/// add calendar months to a date, clamping the day to the target month
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    let (year, month) = shift_month(date.year(), date.month(), months);
    clamped_date(year, month, date.day())
}

/// add calendar months to an instant, keeping the time of day
pub fn add_months_utc(instant: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    instant
        .checked_add_months(Months::new(months))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// this month's occurrence of the monthly due day
pub fn due_date_in_month(today: NaiveDate, due_day: u8) -> NaiveDate {
    clamped_date(today.year(), today.month(), due_day as u32)
}

/// next occurrence of the monthly due day strictly after `today`
pub fn next_monthly_due_date(today: NaiveDate, due_day: u8) -> NaiveDate {
    let this_month = due_date_in_month(today, due_day);
    if this_month > today {
        return this_month;
    }
    let (year, month) = shift_month(today.year(), today.month(), 1);
    clamped_date(year, month, due_day as u32)
}

/// days past this month's due date, zero on or before it
pub fn days_overdue(today: NaiveDate, due_day: u8) -> u32 {
    days_between(due_date_in_month(today, due_day), today).max(0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 4), 30);
        assert_eq!(days_in_month(2024, 12), 31);
    }

    #[test]
    fn test_leap_year() {
        assert!(is_leap_year(2024));
        assert!(!is_leap_year(2023));
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(1900));
    }

    #[test]
    fn test_add_months_clamps_day() {
        assert_eq!(add_months(date(2024, 1, 31), 1), date(2024, 2, 29));
        assert_eq!(add_months(date(2023, 1, 31), 1), date(2023, 2, 28));
        assert_eq!(add_months(date(2024, 11, 15), 3), date(2025, 2, 15));
        assert_eq!(add_months(date(2024, 5, 10), 0), date(2024, 5, 10));
    }

    #[test]
    fn test_add_months_utc() {
        let start = Utc.with_ymd_and_hms(2024, 1, 31, 10, 0, 0).unwrap();
        let end = add_months_utc(start, 1);
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 2, 29, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_next_due_date_rolls_forward() {
        // 20th of a 31-day month, due on the 15th
        assert_eq!(next_monthly_due_date(date(2024, 7, 20), 15), date(2024, 8, 15));
        // strictly after today
        assert_eq!(next_monthly_due_date(date(2024, 7, 15), 15), date(2024, 8, 15));
        assert_eq!(next_monthly_due_date(date(2024, 7, 10), 15), date(2024, 7, 15));
        // year end
        assert_eq!(next_monthly_due_date(date(2024, 12, 20), 5), date(2025, 1, 5));
        // short month clamp
        assert_eq!(next_monthly_due_date(date(2025, 2, 10), 31), date(2025, 2, 28));
    }

    #[test]
    fn test_days_overdue() {
        assert_eq!(days_overdue(date(2024, 7, 10), 15), 0);
        assert_eq!(days_overdue(date(2024, 7, 15), 15), 0);
        assert_eq!(days_overdue(date(2024, 7, 25), 15), 10);
        assert_eq!(days_overdue(date(2024, 2, 29), 31), 0);
    }

    #[test]
    fn test_elapsed_days() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(elapsed_days(start, end), 31);
        assert_eq!(elapsed_days(end, start), 0);
    }
}
