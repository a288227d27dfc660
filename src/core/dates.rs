//! Calendar helpers and serde adapters for dates coming back from the store.
//!
//! The store hands dates back in several shapes (`2025-03-10`,
//! `2025-03-10T00:00:00.000Z`, `2025-03-10T12:30:00+00:00`). Every date field is
//! reduced to the calendar day as written, without timezone shifting.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer, de::Error};
use std::fmt::Display;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Fev", "Mar", "Abr", "Mai", "Jun", "Jul", "Ago", "Set", "Out", "Nov", "Dez",
];

/// Parses a calendar day from a plain date or a full timestamp.
pub fn parse_day(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(day) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(day);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.date_naive());
    }
    parse_naive_timestamp(value).map(|ts| ts.date())
}

/// Formats a day the way the store expects date columns.
pub fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Parses a timestamp, treating values without an offset as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Some(ts) = parse_naive_timestamp(value) {
        return Some(ts.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}

fn parse_naive_timestamp(value: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// A calendar month, the bucket unit for time series and monthly payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    pub fn of(day: NaiveDate) -> Self {
        Self {
            year: day.year(),
            month: day.month(),
        }
    }

    pub fn previous(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// The `count` months ending at (and including) `self`, oldest first.
    pub fn trailing(self, count: usize) -> Vec<Month> {
        let mut months = Vec::with_capacity(count);
        let mut current = self;
        for _ in 0..count {
            months.push(current);
            current = current.previous();
        }
        months.reverse();
        months
    }

    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(self) -> NaiveDate {
        self.next().first_day().pred_opt().unwrap_or(NaiveDate::MAX)
    }

    /// Day `day` of this month, clamped to the month's last day.
    pub fn day(self, day: u32) -> NaiveDate {
        let last = self.last_day();
        let day = day.clamp(1, last.day());
        NaiveDate::from_ymd_opt(self.year, self.month, day).unwrap_or(last)
    }

    pub fn contains(self, day: NaiveDate) -> bool {
        Month::of(day) == self
    }

    /// Portuguese three-letter month name, as shown on the dashboard charts.
    pub fn abbreviation(self) -> &'static str {
        MONTH_ABBREVIATIONS[(self.month.clamp(1, 12) - 1) as usize]
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

pub(crate) fn month_abbreviation(month: u32) -> Option<&'static str> {
    MONTH_ABBREVIATIONS.get(month.checked_sub(1)? as usize).copied()
}

/// Treats an explicit `null` the same as a missing field.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub mod day {
    use super::*;

    pub fn serialize<S: Serializer>(day: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_day(*day))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_day(&raw).ok_or_else(|| D::Error::custom(format!("invalid date: {raw}")))
    }
}

pub mod optional_day {
    use super::*;

    pub fn serialize<S: Serializer>(
        day: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match day {
            Some(day) => super::day::serialize(day, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => parse_day(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid date: {raw}"))),
            None => Ok(None),
        }
    }
}

pub mod optional_timestamp {
    use super::*;

    pub fn serialize<S: Serializer>(
        ts: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => serializer.serialize_str(&ts.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse_timestamp(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}"))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_day_formats() {
        assert_eq!(parse_day("2025-03-10"), Some(date(2025, 3, 10)));
        assert_eq!(parse_day("2025-03-10T00:00:00.000Z"), Some(date(2025, 3, 10)));
        assert_eq!(parse_day("2025-03-10T23:59:00+00:00"), Some(date(2025, 3, 10)));
        assert_eq!(parse_day("2025-03-10T08:15:00.123456"), Some(date(2025, 3, 10)));
        assert_eq!(parse_day("10/03/2025"), None);
    }

    #[test]
    fn test_parse_timestamp_without_offset_is_utc() {
        let ts = parse_timestamp("2025-03-10 08:15:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-03-10T08:15:00+00:00");
    }

    #[test]
    fn test_trailing_months_wrap_year() {
        let months = Month::of(date(2025, 2, 14)).trailing(6);
        let labels: Vec<String> = months.iter().map(|m| m.to_string()).collect();
        assert_eq!(
            labels,
            vec!["2024-09", "2024-10", "2024-11", "2024-12", "2025-01", "2025-02"]
        );
        assert_eq!(months[3].abbreviation(), "Dez");
    }

    #[test]
    fn test_day_is_clamped_to_month_end() {
        let feb = Month { year: 2025, month: 2 };
        assert_eq!(feb.day(31), date(2025, 2, 28));
        assert_eq!(feb.day(10), date(2025, 2, 10));
        assert_eq!(Month { year: 2024, month: 2 }.last_day(), date(2024, 2, 29));
    }
}
