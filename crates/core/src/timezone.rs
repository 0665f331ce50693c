//! Epoch to calendar-date conversion under an explicit time zone.
//!
//! The same epoch falls on different calendar days depending on the zone,
//! so report dates are always computed against a configured zone instead
//! of whatever the host process happens to run in.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::RevshareError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportTimeZone {
    #[default]
    Utc,
    /// Zone of the executing process. Output is then host dependent.
    Local,
    Fixed(FixedOffset),
}

impl ReportTimeZone {
    /// Calendar date of `epoch_secs` in this zone, or `None` when the
    /// epoch, or its local wall time, is outside the representable range.
    pub fn date_of(&self, epoch_secs: i64) -> Option<NaiveDate> {
        let utc = DateTime::<Utc>::from_timestamp(epoch_secs, 0)?.naive_utc();
        let offset = match self {
            Self::Utc => return Some(utc.date()),
            Self::Local => Local.offset_from_utc_datetime(&utc),
            Self::Fixed(offset) => *offset,
        };
        utc.checked_add_signed(Duration::seconds(i64::from(offset.local_minus_utc())))
            .map(|local| local.date())
    }
}

impl FromStr for ReportTimeZone {
    type Err = RevshareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_lowercase().as_str() {
            "utc" | "z" | "gmt" => return Ok(Self::Utc),
            "local" => return Ok(Self::Local),
            _ => {}
        }
        parse_offset(s)
            .map(Self::Fixed)
            .ok_or_else(|| RevshareError::Config(format!("invalid time zone: {s:?}")))
    }
}

/// Parses `+HH:MM`, `-HH:MM` or `+HHMM`.
fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

impl fmt::Display for ReportTimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utc => f.write_str("UTC"),
            Self::Local => f.write_str("local"),
            Self::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

impl<'de> Deserialize<'de> for ReportTimeZone {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for ReportTimeZone {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_zones() {
        assert_eq!("UTC".parse::<ReportTimeZone>().unwrap(), ReportTimeZone::Utc);
        assert_eq!("utc".parse::<ReportTimeZone>().unwrap(), ReportTimeZone::Utc);
        assert_eq!(
            "local".parse::<ReportTimeZone>().unwrap(),
            ReportTimeZone::Local
        );
    }

    #[test]
    fn test_parse_fixed_offsets() {
        let plus = "+02:00".parse::<ReportTimeZone>().unwrap();
        assert_eq!(
            plus,
            ReportTimeZone::Fixed(FixedOffset::east_opt(7200).unwrap())
        );
        let minus = "-0530".parse::<ReportTimeZone>().unwrap();
        assert_eq!(
            minus,
            ReportTimeZone::Fixed(FixedOffset::west_opt(5 * 3600 + 1800).unwrap())
        );
        assert_eq!(plus.to_string(), "+02:00");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!("Europe/Paris".parse::<ReportTimeZone>().is_err());
        assert!("+25:00".parse::<ReportTimeZone>().is_err());
        assert!("+2".parse::<ReportTimeZone>().is_err());
    }

    #[test]
    fn test_date_depends_on_zone() {
        // 2023-11-14T23:30:00Z
        let epoch = 1_700_004_600;
        let utc = ReportTimeZone::Utc.date_of(epoch).unwrap();
        let paris = "+01:00"
            .parse::<ReportTimeZone>()
            .unwrap()
            .date_of(epoch)
            .unwrap();
        assert_eq!(utc.to_string(), "2023-11-14");
        assert_eq!(paris.to_string(), "2023-11-15");
    }

    #[test]
    fn test_out_of_range_epoch() {
        assert!(ReportTimeZone::Utc.date_of(i64::MAX).is_none());
    }

    #[test]
    fn test_offset_past_calendar_end_is_out_of_range() {
        let last = chrono::NaiveDateTime::MAX.and_utc().timestamp();
        let first = chrono::NaiveDateTime::MIN.and_utc().timestamp();
        assert!(ReportTimeZone::Utc.date_of(last).is_some());

        let east: ReportTimeZone = "+23:00".parse().unwrap();
        assert!(east.date_of(last).is_none());
        assert!(east.date_of(first).is_some());

        let west: ReportTimeZone = "-23:00".parse().unwrap();
        assert!(west.date_of(first).is_none());
        assert!(west.date_of(last).is_some());
    }
}
