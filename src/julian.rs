//! Julian day to calendar date-time conversion.
//!
//! W2 files index samples by fractional day of year relative to a
//! reference year. Days past the end of the reference year roll over into
//! the following years, so day 367 of 2017 is 2 January 2018.
//!
//! Leap years follow the simplified `year % 4 == 0` rule. Century years
//! such as 1900 and 2100 are therefore treated as leap years; exported
//! dates depend on this, so it is kept as-is.
//!
//! Time of day is truncated, not rounded, to whole minutes.

use crate::constants::{
    DAYS_IN_LEAP_YEAR, DAYS_IN_YEAR, DAYS_PER_MONTH, EPOCH_DAY, EPOCH_MONTH, EPOCH_YEAR,
    MINUTES_PER_DAY, MONTH_ABBREVIATIONS,
};
use crate::error::{ExportError, Result};
use chrono::{Datelike, NaiveDate, TimeDelta};
use std::fmt;

/// Days in four consecutive years under the simplified leap rule
const DAYS_PER_LEAP_CYCLE: i64 = 3 * DAYS_IN_YEAR + DAYS_IN_LEAP_YEAR;

/// Calendar date and time to minute resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDateTime {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
}

/// Leap year test used for Julian day resolution (`year % 4 == 0`)
pub fn is_leap_year(year: i64) -> bool {
    year % 4 == 0
}

fn days_in_year(year: i64) -> i64 {
    if is_leap_year(year) {
        DAYS_IN_LEAP_YEAR
    } else {
        DAYS_IN_YEAR
    }
}

/// Convert a fractional Julian day relative to `reference_year` into a
/// calendar date-time.
pub fn julian_to_date(julian_day: f64, reference_year: i32) -> Result<CalendarDateTime> {
    let whole_day = julian_day.floor();
    let fraction = julian_day - whole_day;

    let (year, day_of_year) = resolve_year(whole_day as i64, i64::from(reference_year));

    let out_of_range = || ExportError::DateComputation {
        julian_day,
        day_of_year,
        year: year.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32,
    };

    let (month, day) = month_and_day(day_of_year, is_leap_year(year)).ok_or_else(out_of_range)?;
    let year = i32::try_from(year).map_err(|_| out_of_range())?;

    let decimal_hour = fraction * 24.0;
    let hour = decimal_hour.trunc();
    let minute = ((decimal_hour - hour) * 60.0).trunc();

    Ok(CalendarDateTime {
        year,
        month,
        day,
        hour: hour as u32,
        minute: minute as u32,
    })
}

/// Roll whole days past the end of the year into the following years.
///
/// Whole four-year cycles are skipped at once so pathological inputs stay
/// bounded; every cycle holds exactly one leap year under the `% 4` rule.
fn resolve_year(mut day: i64, mut year: i64) -> (i64, i64) {
    if day > DAYS_IN_LEAP_YEAR + DAYS_PER_LEAP_CYCLE {
        let cycles = (day - DAYS_IN_LEAP_YEAR - 1) / DAYS_PER_LEAP_CYCLE;
        day -= cycles * DAYS_PER_LEAP_CYCLE;
        year = year.saturating_add(cycles.saturating_mul(4));
    }

    while day > days_in_year(year) {
        day -= days_in_year(year);
        year += 1;
    }

    (year, day)
}

fn month_and_day(day_of_year: i64, leap: bool) -> Option<(u32, u32)> {
    if day_of_year < 1 {
        return None;
    }

    let mut remaining = day_of_year;
    for (index, &length) in DAYS_PER_MONTH.iter().enumerate() {
        let length = if index == 1 && leap { length + 1 } else { length };
        if remaining <= length {
            return Some((index as u32 + 1, remaining as u32));
        }
        remaining -= length;
    }

    None
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(EPOCH_YEAR, EPOCH_MONTH, EPOCH_DAY).unwrap_or(NaiveDate::MIN)
}

fn month_index(name: &str) -> Option<u32> {
    MONTH_ABBREVIATIONS
        .iter()
        .position(|abbr| abbr.eq_ignore_ascii_case(name))
        .map(|index| index as u32 + 1)
}

impl CalendarDateTime {
    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    /// Day of the year, counting 29 February in `% 4` leap years
    pub fn day_of_year(&self) -> i64 {
        let leap_day = i64::from(self.month > 2 && is_leap_year(i64::from(self.year)));
        let preceding: i64 = DAYS_PER_MONTH[..(self.month - 1) as usize].iter().sum();
        preceding + leap_day + i64::from(self.day)
    }

    /// `(year, month, day, hour, minute)`
    pub fn components(&self) -> (i32, u32, u32, u32, u32) {
        (self.year, self.month, self.day, self.hour, self.minute)
    }

    pub fn month_abbreviation(&self) -> &'static str {
        MONTH_ABBREVIATIONS[(self.month - 1) as usize]
    }

    /// Fixed-width date, e.g. `05Jan2014`
    pub fn date_string(&self) -> String {
        format!(
            "{:02}{}{:04}",
            self.day,
            self.month_abbreviation(),
            self.year
        )
    }

    /// Fixed-width time, e.g. `0130`
    pub fn time_string(&self) -> String {
        format!("{:02}{:02}", self.hour, self.minute)
    }

    /// Date and time as accepted by [`parse_hec_datetime`], e.g. `05Jan2014 0130`
    pub fn hec_string(&self) -> String {
        format!("{} {}", self.date_string(), self.time_string())
    }

    /// Spreadsheet-style date-time, e.g. `01/05/2014 01:30`
    pub fn excel_string(&self) -> String {
        format!(
            "{:02}/{:02}/{:04} {:02}:{:02}",
            self.month, self.day, self.year, self.hour, self.minute
        )
    }

    /// Block label of the month containing this date, e.g. `01JAN2014`
    pub fn block_label(&self) -> String {
        format!(
            "01{}{:04}",
            self.month_abbreviation().to_uppercase(),
            self.year
        )
    }

    /// Minutes since 31 Dec 1899 00:00.
    ///
    /// The day is added as an offset from the first of the month, so a
    /// 29 February that only exists under the simplified leap rule lands
    /// on 1 March instead of failing. `None` when the year is outside the
    /// representable calendar range.
    pub fn to_minutes(&self) -> Option<i64> {
        let first_of_month = NaiveDate::from_ymd_opt(self.year, self.month, 1)?;
        let days = (first_of_month - epoch()).num_days() + i64::from(self.day) - 1;
        Some(days * MINUTES_PER_DAY + i64::from(self.hour) * 60 + i64::from(self.minute))
    }

    /// Decode a timestamp produced by [`CalendarDateTime::to_minutes`]
    pub fn from_minutes(minutes: i64) -> Option<Self> {
        let days = minutes.div_euclid(MINUTES_PER_DAY);
        let minute_of_day = minutes.rem_euclid(MINUTES_PER_DAY);
        let date = epoch().checked_add_signed(TimeDelta::try_days(days)?)?;

        Some(Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
            hour: (minute_of_day / 60) as u32,
            minute: (minute_of_day % 60) as u32,
        })
    }
}

impl fmt::Display for CalendarDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hec_string())
    }
}

/// Parse a `DDMonYYYY HHMM` date-time into minutes since 31 Dec 1899.
///
/// The time is optional and defaults to `0000`; `2400` is the end of the
/// day. Month names are matched case-insensitively.
pub fn parse_hec_datetime(input: &str) -> Result<i64> {
    let invalid = |reason: &str| ExportError::InvalidDateTime {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let mut fields = input.split_whitespace();
    let date_part = fields.next().ok_or_else(|| invalid("empty date"))?;
    let time_part = fields.next().unwrap_or("0000");
    if fields.next().is_some() {
        return Err(invalid("unexpected trailing text"));
    }

    let day_digits = date_part
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| invalid("missing month"))?;
    let (day_str, rest) = date_part.split_at(day_digits);
    if rest.len() < 4 || !rest.is_char_boundary(3) {
        return Err(invalid("expected DDMonYYYY"));
    }
    let (month_str, year_str) = rest.split_at(3);

    let day: u32 = day_str.parse().map_err(|_| invalid("bad day"))?;
    let month = month_index(month_str).ok_or_else(|| invalid("unknown month"))?;
    let year: i32 = year_str.parse().map_err(|_| invalid("bad year"))?;
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| invalid("no such date"))?;

    if time_part.len() != 4 || !time_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("expected HHMM"));
    }
    let hour: i64 = time_part[..2].parse().map_err(|_| invalid("bad hour"))?;
    let minute: i64 = time_part[2..].parse().map_err(|_| invalid("bad minute"))?;
    if minute > 59 || hour > 24 || (hour == 24 && minute != 0) {
        return Err(invalid("time out of range"));
    }

    let days = (date - epoch()).num_days();
    Ok(days * MINUTES_PER_DAY + hour * 60 + minute)
}
