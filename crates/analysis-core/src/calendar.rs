use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::BTreeSet;

/// NSE trading holidays for 2025.
const NSE_HOLIDAYS_2025: &[&str] = &[
    "2025-01-26", "2025-02-26", "2025-03-14", "2025-03-31", "2025-04-06", "2025-04-10",
    "2025-04-14", "2025-04-18", "2025-05-01", "2025-06-07", "2025-07-06", "2025-08-15",
    "2025-08-27", "2025-10-02", "2025-10-21", "2025-10-22", "2025-11-05", "2025-12-25",
];

/// Exchange calendar: weekends plus a static holiday set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradingCalendar {
    holidays: BTreeSet<NaiveDate>,
}

impl TradingCalendar {
    pub fn new(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    /// Calendar with no holidays, only weekends closed
    pub fn weekdays_only() -> Self {
        Self::new(std::iter::empty())
    }

    /// Parse a comma-separated `YYYY-MM-DD` list. Unparseable entries are skipped.
    pub fn from_list(list: &str) -> Self {
        Self::new(
            list.split(',')
                .filter_map(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()),
        )
    }

    pub fn holidays(&self) -> impl Iterator<Item = &NaiveDate> {
        self.holidays.iter()
    }

    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }

    /// First trading day strictly after `date`.
    pub fn next_trading_day(&self, date: NaiveDate) -> NaiveDate {
        let mut next = date + Duration::days(1);
        while !self.is_trading_day(next) {
            next += Duration::days(1);
        }
        next
    }

    /// Trading days in `[start, end]`, ascending.
    pub fn trading_days(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let mut days = Vec::new();
        let mut day = start;
        while day <= end {
            if self.is_trading_day(day) {
                days.push(day);
            }
            day += Duration::days(1);
        }
        days
    }

    /// The last `n` trading days ending at `end`, looking back at most
    /// `lookback_days` calendar days. May return fewer than `n` days.
    pub fn last_trading_days(&self, end: NaiveDate, n: usize, lookback_days: i64) -> Vec<NaiveDate> {
        let days = self.trading_days(end - Duration::days(lookback_days), end);
        let skip = days.len().saturating_sub(n);
        days[skip..].to_vec()
    }
}

impl Default for TradingCalendar {
    fn default() -> Self {
        Self::from_list(&NSE_HOLIDAYS_2025.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_default_calendar_has_holidays() {
        let cal = TradingCalendar::default();
        assert_eq!(cal.holidays().count(), NSE_HOLIDAYS_2025.len());
        assert!(!cal.is_trading_day(d("2025-08-15")));
        assert!(cal.is_trading_day(d("2025-08-14")));
    }

    #[test]
    fn test_next_trading_day_skips_weekend() {
        let cal = TradingCalendar::weekdays_only();
        // Friday -> Monday
        assert_eq!(cal.next_trading_day(d("2025-01-03")), d("2025-01-06"));
        // Saturday -> Monday
        assert_eq!(cal.next_trading_day(d("2025-01-04")), d("2025-01-06"));
    }

    #[test]
    fn test_next_trading_day_skips_holiday_and_weekend() {
        let cal = TradingCalendar::default();
        // Thursday 2025-04-17 -> Good Friday holiday -> weekend -> Monday
        assert_eq!(cal.next_trading_day(d("2025-04-17")), d("2025-04-21"));
        // Monday 2025-10-20 -> two holidays -> Thursday
        assert_eq!(cal.next_trading_day(d("2025-10-20")), d("2025-10-23"));
    }

    #[test]
    fn test_trading_days_exclude_weekends_and_holidays() {
        let cal = TradingCalendar::default();
        let days = cal.trading_days(d("2025-01-01"), d("2025-12-31"));
        assert!(!days.is_empty());
        for day in &days {
            assert!(!matches!(day.weekday(), Weekday::Sat | Weekday::Sun));
            assert!(!NSE_HOLIDAYS_2025.contains(&day.format("%Y-%m-%d").to_string().as_str()));
        }
        assert!(days.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_last_trading_days_window() {
        let cal = TradingCalendar::weekdays_only();
        let days = cal.last_trading_days(d("2025-01-10"), 5, 30);
        assert_eq!(days, vec![d("2025-01-06"), d("2025-01-07"), d("2025-01-08"), d("2025-01-09"), d("2025-01-10")]);

        let short = cal.last_trading_days(d("2025-01-10"), 100, 10);
        assert!(short.len() < 100);
    }

    #[test]
    fn test_from_list_skips_garbage() {
        let cal = TradingCalendar::from_list("2025-01-01, nope ,2025-12-25");
        assert_eq!(cal.holidays().count(), 2);
    }
}
