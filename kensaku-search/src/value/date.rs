//! Date/time search values.
//!
//! The precision of the literal determines the range it covers:
//! - `2023` -> the whole year
//! - `2023-01` -> the whole month
//! - `2023-01-15` -> the whole day
//! - `2023-01-15T10:30` -> the whole minute
//! - `2023-01-15T10:30:00` -> the whole second
//! - `2023-01-15T10:30:00.250` -> that instant
//!
//! A time may carry `Z` or a `±hh:mm` offset; without one it is read as UTC.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use std::fmt;

use super::ValueParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DateTimePrecision {
    Year,
    Month,
    Day,
    Minute,
    Second,
    Fraction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateTimeSearchValue {
    pub start: DateTime<Utc>,
    /// Last instant covered by the literal (inclusive)
    pub end: DateTime<Utc>,
    pub precision: DateTimePrecision,
}

impl DateTimeSearchValue {
    pub fn parse(s: &str) -> Result<Self, ValueParseError> {
        parse_partial(s).ok_or_else(|| ValueParseError::Date(s.to_string()))
    }
}

fn parse_partial(s: &str) -> Option<DateTimeSearchValue> {
    let (date_part, time_part) = match s.split_once('T') {
        Some((d, t)) => (d, Some(t)),
        None => (s, None),
    };

    let mut fields = date_part.split('-');
    let year = parse_fixed(fields.next()?, 4)? as i32;
    let month = match fields.next() {
        Some(m) => Some(parse_fixed(m, 2)?),
        None => None,
    };
    let day = match fields.next() {
        Some(d) => Some(parse_fixed(d, 2)?),
        None => None,
    };
    if fields.next().is_some() {
        return None;
    }

    let date = NaiveDate::from_ymd_opt(year, month.unwrap_or(1), day.unwrap_or(1))?;

    let (naive, offset, precision) = match time_part {
        None => {
            let precision = match (month, day) {
                (None, _) => DateTimePrecision::Year,
                (Some(_), None) => DateTimePrecision::Month,
                (Some(_), Some(_)) => DateTimePrecision::Day,
            };
            (date.and_hms_opt(0, 0, 0)?, FixedOffset::east_opt(0)?, precision)
        }
        Some(time) => {
            // A time is only meaningful on a full date
            day?;
            let (clock, offset) = split_offset(time)?;
            let (naive, precision) = parse_clock(date, clock)?;
            (naive, offset, precision)
        }
    };

    let start = offset
        .from_local_datetime(&naive)
        .single()?
        .with_timezone(&Utc);

    let next = match precision {
        DateTimePrecision::Year => {
            let next = NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)?.and_hms_opt(0, 0, 0)?;
            offset.from_local_datetime(&next).single()?.with_timezone(&Utc)
        }
        DateTimePrecision::Month => {
            let (y, m) = if date.month() == 12 {
                (date.year() + 1, 1)
            } else {
                (date.year(), date.month() + 1)
            };
            let next = NaiveDate::from_ymd_opt(y, m, 1)?.and_hms_opt(0, 0, 0)?;
            offset.from_local_datetime(&next).single()?.with_timezone(&Utc)
        }
        DateTimePrecision::Day => start + Duration::days(1),
        DateTimePrecision::Minute => start + Duration::minutes(1),
        DateTimePrecision::Second => start + Duration::seconds(1),
        DateTimePrecision::Fraction => {
            return Some(DateTimeSearchValue {
                start,
                end: start,
                precision,
            });
        }
    };

    Some(DateTimeSearchValue {
        start,
        end: next - Duration::microseconds(1),
        precision,
    })
}

/// Parse exactly `width` ASCII digits.
fn parse_fixed(s: &str, width: usize) -> Option<u32> {
    if s.len() != width || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// `10:30:00+09:00` -> (`10:30:00`, +09:00)
fn split_offset(time: &str) -> Option<(&str, FixedOffset)> {
    if let Some(clock) = time.strip_suffix('Z') {
        return Some((clock, FixedOffset::east_opt(0)?));
    }

    match time.rfind(['+', '-']) {
        Some(idx) => {
            let (clock, offset) = time.split_at(idx);
            let sign = if offset.starts_with('-') { -1 } else { 1 };
            let (hours, minutes) = offset[1..].split_once(':')?;
            let hours = parse_fixed(hours, 2)? as i32;
            let minutes = parse_fixed(minutes, 2)? as i32;
            if hours > 14 || minutes > 59 {
                return None;
            }
            Some((clock, FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))?))
        }
        None => Some((time, FixedOffset::east_opt(0)?)),
    }
}

fn parse_clock(date: NaiveDate, clock: &str) -> Option<(NaiveDateTime, DateTimePrecision)> {
    let mut fields = clock.split(':');
    let hour = parse_fixed(fields.next()?, 2)?;
    let minute = parse_fixed(fields.next()?, 2)?;
    let seconds = fields.next();
    if fields.next().is_some() {
        return None;
    }

    let Some(seconds) = seconds else {
        return Some((date.and_hms_opt(hour, minute, 0)?, DateTimePrecision::Minute));
    };

    match seconds.split_once('.') {
        None => {
            let second = parse_fixed(seconds, 2)?;
            Some((date.and_hms_opt(hour, minute, second)?, DateTimePrecision::Second))
        }
        Some((whole, fraction)) => {
            let second = parse_fixed(whole, 2)?;
            if fraction.is_empty()
                || fraction.len() > 9
                || !fraction.bytes().all(|b| b.is_ascii_digit())
            {
                return None;
            }
            let nanos: u32 = format!("{:0<9}", fraction).parse().ok()?;
            Some((
                date.and_hms_nano_opt(hour, minute, second, nanos)?,
                DateTimePrecision::Fraction,
            ))
        }
    }
}

impl fmt::Display for DateTimeSearchValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use chrono::SecondsFormat;
        write!(
            f,
            "{}..{}",
            self.start.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            self.end.to_rfc3339_opts(SecondsFormat::AutoSi, true)
        )
    }
}
