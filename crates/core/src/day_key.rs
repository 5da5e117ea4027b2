use std::fmt;

use chrono::{Datelike, Local, Months, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::CoreError;

pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// Years a period may fall in. Keeps every DayKey at four digits.
pub const MIN_YEAR: i32 = 1;
pub const MAX_YEAR: i32 = 9999;

/// One calendar day in the local timezone, rendered as `YYYY-MM-DD`.
///
/// This is the only key shared by the local snapshot, the remote rows and the
/// in-memory map.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey(NaiveDate);

impl DayKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, CoreError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| CoreError::InvalidDayKey(format!("{year:04}-{month:02}-{day:02}")))
    }

    /// Parses a `YYYY-MM-DD` key. Surrounding whitespace is ignored.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        NaiveDate::parse_from_str(s.trim(), DAY_KEY_FORMAT)
            .map(Self)
            .map_err(|_| CoreError::InvalidDayKey(s.to_string()))
    }

    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Day of month, 1-based.
    pub fn day(&self) -> u32 {
        self.0.day()
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DAY_KEY_FORMAT))
    }
}

impl fmt::Debug for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DayKey({self})")
    }
}

impl Serialize for DayKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DayKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DayKey::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// One calendar month: the unit of a remote fetch and of in-flight dedup.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeriodKey {
    // Always the 1st of the month, year within MIN_YEAR..=MAX_YEAR.
    first: NaiveDate,
}

impl PeriodKey {
    /// `month0` is zero-based (0 = January).
    pub fn new(year: i32, month0: u32) -> Result<Self, CoreError> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(CoreError::InvalidPeriod { year, month0 });
        }
        month0
            .checked_add(1)
            .and_then(|month| NaiveDate::from_ymd_opt(year, month, 1))
            .map(|first| Self { first })
            .ok_or(CoreError::InvalidPeriod { year, month0 })
    }

    /// The month containing `day`.
    pub fn containing(day: DayKey) -> Result<Self, CoreError> {
        Self::new(day.0.year(), day.0.month0())
    }

    /// The month containing today's local date.
    pub fn current() -> Self {
        let today = Local::now().date_naive();
        let year = today.year().clamp(MIN_YEAR, MAX_YEAR);
        Self::new(year, today.month0()).unwrap_or(Self::min())
    }

    fn min() -> Self {
        Self {
            first: NaiveDate::MIN.with_year(MIN_YEAR).unwrap_or(NaiveDate::MIN),
        }
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn month0(&self) -> u32 {
        self.first.month0()
    }

    /// Month number as shown to users, 1-based.
    pub fn month(&self) -> u32 {
        self.first.month()
    }

    pub fn first_day(&self) -> DayKey {
        DayKey(self.first)
    }

    /// Half-open range `[first day, first day of next month)`.
    pub fn day_range(&self) -> (DayKey, DayKey) {
        let end = self
            .first
            .checked_add_months(Months::new(1))
            .unwrap_or(NaiveDate::MAX);
        (DayKey(self.first), DayKey(end))
    }

    pub fn contains(&self, day: DayKey) -> bool {
        day.0.year() == self.year() && day.0.month0() == self.month0()
    }

    /// The following month; saturates at December of `MAX_YEAR`.
    pub fn next(&self) -> Self {
        self.first
            .checked_add_months(Months::new(1))
            .filter(|first| first.year() <= MAX_YEAR)
            .map(|first| Self { first })
            .unwrap_or(*self)
    }

    /// The preceding month; saturates at January of `MIN_YEAR`.
    pub fn prev(&self) -> Self {
        self.first
            .checked_sub_months(Months::new(1))
            .filter(|first| first.year() >= MIN_YEAR)
            .map(|first| Self { first })
            .unwrap_or(*self)
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl fmt::Debug for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeriodKey({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_key_is_zero_padded() {
        let day = DayKey::from_ymd(2025, 3, 7).unwrap();
        assert_eq!(day.to_string(), "2025-03-07");
        assert_eq!(DayKey::parse(" 2025-03-07 ").unwrap(), day);
    }

    #[test]
    fn day_key_rejects_malformed() {
        assert!(DayKey::parse("2025-13-01").is_err());
        assert!(DayKey::parse("yesterday").is_err());
        assert!(DayKey::parse("").is_err());
    }

    #[test]
    fn november_range_is_half_open() {
        let nov = PeriodKey::new(2025, 10).unwrap();
        let (from, to) = nov.day_range();
        assert_eq!(from.to_string(), "2025-11-01");
        assert_eq!(to.to_string(), "2025-12-01");
        assert!(nov.contains(DayKey::parse("2025-11-30").unwrap()));
        assert!(!nov.contains(to));
    }

    #[test]
    fn december_rolls_into_next_year() {
        let dec = PeriodKey::new(2025, 11).unwrap();
        assert_eq!(dec.day_range().1.to_string(), "2026-01-01");
        assert_eq!(dec.next(), PeriodKey::new(2026, 0).unwrap());
        assert_eq!(PeriodKey::new(2026, 0).unwrap().prev(), dec);
    }

    #[test]
    fn navigation_saturates_at_bounds() {
        let last = PeriodKey::new(MAX_YEAR, 11).unwrap();
        assert_eq!(last.next(), last);
        let first = PeriodKey::new(MIN_YEAR, 0).unwrap();
        assert_eq!(first.prev(), first);
    }

    #[test]
    fn rejects_out_of_range_periods() {
        assert!(PeriodKey::new(2025, 12).is_err());
        assert!(PeriodKey::new(0, 0).is_err());
        assert!(PeriodKey::new(10_000, 0).is_err());
    }

    #[test]
    fn period_of_day() {
        let day = DayKey::parse("2024-02-29").unwrap();
        let period = PeriodKey::containing(day).unwrap();
        assert_eq!((period.year(), period.month0(), period.month()), (2024, 1, 2));
        assert_eq!(period.to_string(), "2024-02");
    }
}
