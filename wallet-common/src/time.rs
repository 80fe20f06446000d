use chrono::{DateTime, NaiveDate, Utc};

/// Extracts the UTC calendar date, used to decide whether the wallet
/// aggregate's rolling daily-prize accumulator should reset (§3, §4.5).
pub fn utc_date(at: DateTime<Utc>) -> NaiveDate {
    at.date_naive()
}

pub fn is_new_utc_day(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last {
        None => true,
        Some(last) => utc_date(last) != utc_date(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn same_day_is_not_new() {
        let a = Utc.with_ymd_and_hms(2026, 8, 1, 23, 59, 59).unwrap();
        let b = Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap();
        assert!(!is_new_utc_day(Some(a), b));
    }

    #[test]
    fn rollover_crosses_midnight_utc() {
        let a = Utc.with_ymd_and_hms(2026, 8, 1, 23, 59, 59).unwrap();
        let b = Utc.with_ymd_and_hms(2026, 8, 2, 0, 0, 0).unwrap();
        assert!(is_new_utc_day(Some(a), b));
    }

    #[test]
    fn no_prior_timestamp_is_new() {
        let now = Utc::now();
        assert!(is_new_utc_day(None, now));
    }
}
