//! Date and time helpers over `chrono` and `chrono-tz`.
//!
//! Constructors validate every field up front and report the offending one
//! through [`TemporalError::InvalidValue`], so `date(2014, 2, 29)` fails with
//! a readable reason instead of a bare `None`.
//!
//! Patterns for [`format_date`], [`format_date_time`] and the parsers are
//! `strftime` patterns (`%Y-%m-%d`, `%d::%b::%Y %H::%M::%S`, ...).

use std::fmt::{self, Write as _};
use std::time::SystemTime;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Datelike, Days, Month, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::TemporalError;

pub type Result<T> = std::result::Result<T, TemporalError>;

/// `20140427`
pub const BASIC_ISO_DATE: &str = "%Y%m%d";
/// `2014-04-27T21:39:48`
pub const ISO_LOCAL_DATE_TIME: &str = "%Y-%m-%dT%H:%M:%S";

const SECONDS_PER_DAY: u32 = 86_400;

/// Three-letter zone abbreviations and the region each one stands for.
///
/// These are ambiguous (`IST` is India, Ireland and Israel), which is why
/// [`zone`] rejects them and only [`zone_from_short_id`] consults this table.
pub const SHORT_IDS: &[(&str, &str)] = &[
    ("ACT", "Australia/Darwin"),
    ("AET", "Australia/Sydney"),
    ("AGT", "America/Argentina/Buenos_Aires"),
    ("ART", "Africa/Cairo"),
    ("AST", "America/Anchorage"),
    ("BET", "America/Sao_Paulo"),
    ("BST", "Asia/Dhaka"),
    ("CAT", "Africa/Harare"),
    ("CNT", "America/St_Johns"),
    ("CST", "America/Chicago"),
    ("CTT", "Asia/Shanghai"),
    ("EAT", "Africa/Addis_Ababa"),
    ("ECT", "Europe/Paris"),
    ("EST", "Etc/GMT+5"),
    ("HST", "Etc/GMT+10"),
    ("IET", "America/Indiana/Indianapolis"),
    ("IST", "Asia/Kolkata"),
    ("JST", "Asia/Tokyo"),
    ("MIT", "Pacific/Apia"),
    ("MST", "Etc/GMT+7"),
    ("NET", "Asia/Yerevan"),
    ("NST", "Pacific/Auckland"),
    ("PLT", "Asia/Karachi"),
    ("PNT", "America/Phoenix"),
    ("PRT", "America/Puerto_Rico"),
    ("PST", "America/Los_Angeles"),
    ("SST", "Pacific/Guadalcanal"),
    ("VST", "Asia/Ho_Chi_Minh"),
];

/// Calendar unit for [`plus`] and [`minus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Days,
    Weeks,
    Months,
    Years,
}

impl Unit {
    fn field(self) -> &'static str {
        match self {
            Unit::Days => "days",
            Unit::Weeks => "weeks",
            Unit::Months => "months",
            Unit::Years => "years",
        }
    }
}

/// A date-based amount of time such as "1 year, 2 months and 3 days".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Period {
    pub years: i64,
    pub months: i64,
    pub days: i64,
}

impl Period {
    pub fn is_zero(&self) -> bool {
        self.years == 0 && self.months == 0 && self.days == 0
    }

    pub fn total_months(&self) -> i64 {
        self.years * 12 + self.months
    }
}

/// ISO-8601 style: `P1Y2M3D`, `P4M`, `P0D`.
impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("P0D");
        }
        f.write_char('P')?;
        if self.years != 0 {
            write!(f, "{}Y", self.years)?;
        }
        if self.months != 0 {
            write!(f, "{}M", self.months)?;
        }
        if self.days != 0 {
            write!(f, "{}D", self.days)?;
        }
        Ok(())
    }
}

fn check_range(field: &'static str, value: u32, min: u32, max: u32) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(TemporalError::invalid_value(
            field,
            format!("{value} is outside the valid range {min} - {max}"),
        ))
    }
}

fn month_name(month: u32) -> &'static str {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map_or("?", |m| m.name())
}

// ============================================================================
// Construction
// ============================================================================

pub fn date(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    if NaiveDate::from_ymd_opt(year, 1, 1).is_none() {
        return Err(TemporalError::invalid_value("year", format!("{year} is not representable")));
    }
    check_range("month", month, 1, 12)?;
    check_range("day", day, 1, 31)?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        let reason = if month == 2 && day == 29 {
            format!("Invalid date 'February 29' as '{year}' is not a leap year")
        } else {
            format!("Invalid date '{} {day}'", month_name(month))
        };
        TemporalError::invalid_value("day", reason)
    })
}

pub fn time(hour: u32, minute: u32, second: u32, nano: u32) -> Result<NaiveTime> {
    check_range("hour", hour, 0, 23)?;
    check_range("minute", minute, 0, 59)?;
    check_range("second", second, 0, 59)?;
    check_range("nano", nano, 0, 999_999_999)?;

    NaiveTime::from_hms_nano_opt(hour, minute, second, nano)
        .ok_or_else(|| TemporalError::invalid_value("time", format!("{hour}:{minute}:{second}.{nano}")))
}

pub fn date_time(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Result<NaiveDateTime> {
    Ok(date(year, month, day)?.and_time(time(hour, minute, second, 0)?))
}

/// The `ordinal`-th day of `year`, starting at 1.
pub fn date_of_year_day(year: i32, ordinal: u32) -> Result<NaiveDate> {
    let max = if is_leap_year(year) { 366 } else { 365 };
    check_range("day of year", ordinal, 1, max)?;
    NaiveDate::from_yo_opt(year, ordinal)
        .ok_or_else(|| TemporalError::invalid_value("year", format!("{year} is not representable")))
}

/// Days counted from 1970-01-01.
pub fn date_from_epoch_day(epoch_day: i64) -> Result<NaiveDate> {
    shift_days(epoch(), epoch_day)
        .ok_or_else(|| TemporalError::invalid_value("epoch day", format!("{epoch_day} is out of range")))
}

pub fn to_epoch_day(date: NaiveDate) -> i64 {
    date.signed_duration_since(epoch()).num_days()
}

pub fn time_from_second_of_day(second_of_day: u32) -> Result<NaiveTime> {
    check_range("second of day", second_of_day, 0, SECONDS_PER_DAY - 1)?;
    NaiveTime::from_num_seconds_from_midnight_opt(second_of_day, 0)
        .ok_or_else(|| TemporalError::invalid_value("second of day", second_of_day.to_string()))
}

/// The UTC wall-clock time `epoch_second` seconds after 1970-01-01T00:00:00.
pub fn date_time_from_epoch_second(epoch_second: i64, nano: u32) -> Result<NaiveDateTime> {
    check_range("nano", nano, 0, 999_999_999)?;
    DateTime::from_timestamp(epoch_second, nano)
        .map(|instant| instant.naive_utc())
        .ok_or_else(|| TemporalError::invalid_value("epoch second", format!("{epoch_second} is out of range")))
}

pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

pub fn length_of_month(date: NaiveDate) -> u32 {
    last_day_of_month(date).day()
}

fn epoch() -> NaiveDate {
    // NaiveDate's default is 1970-01-01
    NaiveDate::default()
}

// ============================================================================
// Zones
// ============================================================================

/// Looks up a region id such as `"Asia/Kolkata"` or `"UTC"`.
pub fn zone(id: &str) -> Result<Tz> {
    id.parse::<Tz>().map_err(|_| TemporalError::UnknownZone(id.to_string()))
}

/// Like [`zone`], but resolves the abbreviations in [`SHORT_IDS`] first.
pub fn zone_from_short_id(id: &str) -> Result<Tz> {
    match SHORT_IDS.iter().find(|(short, _)| *short == id) {
        Some((_, region)) => zone(region),
        None => zone(id),
    }
}

pub fn today_in(zone: Tz) -> NaiveDate {
    Utc::now().with_timezone(&zone).date_naive()
}

pub fn now_in(zone: Tz) -> NaiveDateTime {
    local_date_time(Utc::now(), zone)
}

/// Wall-clock time in `zone` at `instant`.
pub fn local_date_time(instant: DateTime<Utc>, zone: Tz) -> NaiveDateTime {
    instant.with_timezone(&zone).naive_local()
}

/// Pins a wall-clock time to `zone`. Ambiguous times (clocks going back)
/// resolve to the earlier offset; times skipped by a forward jump fail.
pub fn zoned(local: NaiveDateTime, zone: Tz) -> Result<DateTime<Tz>> {
    zone.from_local_datetime(&local)
        .earliest()
        .ok_or_else(|| TemporalError::invalid_value("local date-time", format!("{local} does not exist in {zone}")))
}

// ============================================================================
// Arithmetic and adjusters
// ============================================================================

fn shift_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    let magnitude = Days::new(days.unsigned_abs());
    if days >= 0 {
        date.checked_add_days(magnitude)
    } else {
        date.checked_sub_days(magnitude)
    }
}

fn shift_months(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        date.checked_add_months(magnitude)
    } else {
        date.checked_sub_months(magnitude)
    }
}

/// Adds `amount` units to `date`. Month and year steps clamp to the end of
/// the target month, so Jan 31 plus one month is Feb 28 (or 29).
pub fn plus(date: NaiveDate, amount: i64, unit: Unit) -> Result<NaiveDate> {
    let shifted = match unit {
        Unit::Days => shift_days(date, amount),
        Unit::Weeks => amount.checked_mul(7).and_then(|days| shift_days(date, days)),
        Unit::Months => shift_months(date, amount),
        Unit::Years => amount.checked_mul(12).and_then(|months| shift_months(date, months)),
    };
    shifted.ok_or_else(|| TemporalError::invalid_value(unit.field(), format!("{date} plus {amount} is out of range")))
}

pub fn minus(date: NaiveDate, amount: i64, unit: Unit) -> Result<NaiveDate> {
    let negated = amount
        .checked_neg()
        .ok_or_else(|| TemporalError::invalid_value(unit.field(), format!("{amount} cannot be negated")))?;
    plus(date, negated, unit)
}

pub fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    (28..=31).rev().find_map(|day| date.with_day(day)).unwrap_or(date)
}

pub fn first_day_of_year(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.ordinal0()))
}

pub fn last_day_of_year(date: NaiveDate) -> NaiveDate {
    let days_in_year = if is_leap_year(date.year()) { 366 } else { 365 };
    let remaining = days_in_year - date.ordinal();
    date + Days::new(u64::from(remaining))
}

/// Years, months and days from `start` (inclusive) to `end` (exclusive).
/// All three components carry the same sign.
pub fn period_between(start: NaiveDate, end: NaiveDate) -> Period {
    let proleptic_month = |d: NaiveDate| i64::from(d.year()) * 12 + i64::from(d.month0());
    let mut total_months = proleptic_month(end) - proleptic_month(start);
    let mut days = i64::from(end.day()) - i64::from(start.day());

    if total_months > 0 && days < 0 {
        total_months -= 1;
        days = shift_months(start, total_months)
            .map_or(days, |anchor| end.signed_duration_since(anchor).num_days());
    } else if total_months < 0 && days > 0 {
        total_months += 1;
        days -= i64::from(length_of_month(end));
    }

    Period {
        years: total_months / 12,
        months: total_months % 12,
        days,
    }
}

// ============================================================================
// Formatting and parsing
// ============================================================================

fn pattern_items(pattern: &str) -> Result<Vec<Item<'_>>> {
    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(TemporalError::InvalidPattern(pattern.to_string()));
    }
    Ok(items)
}

/// Fails with `InvalidPattern` for malformed patterns and for patterns that
/// ask a date for time fields.
pub fn format_date(date: &NaiveDate, pattern: &str) -> Result<String> {
    let items = pattern_items(pattern)?;
    let mut out = String::new();
    write!(out, "{}", date.format_with_items(items.iter()))
        .map_err(|_| TemporalError::InvalidPattern(pattern.to_string()))?;
    Ok(out)
}

pub fn format_date_time(date_time: &NaiveDateTime, pattern: &str) -> Result<String> {
    let items = pattern_items(pattern)?;
    let mut out = String::new();
    write!(out, "{}", date_time.format_with_items(items.iter()))
        .map_err(|_| TemporalError::InvalidPattern(pattern.to_string()))?;
    Ok(out)
}

fn parse_error(input: &str, pattern: &str, err: chrono::ParseError) -> TemporalError {
    TemporalError::Parse {
        input: input.to_string(),
        pattern: pattern.to_string(),
        reason: err.to_string(),
    }
}

pub fn parse_date(text: &str, pattern: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, pattern).map_err(|err| parse_error(text, pattern, err))
}

pub fn parse_date_time(text: &str, pattern: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, pattern).map_err(|err| parse_error(text, pattern, err))
}

// ============================================================================
// Legacy conversions
// ============================================================================

pub fn to_epoch_millis(instant: DateTime<Utc>) -> i64 {
    instant.timestamp_millis()
}

pub fn from_epoch_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| TemporalError::invalid_value("epoch millis", format!("{millis} is out of range")))
}

pub fn from_system_time(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

pub fn to_system_time(instant: DateTime<Utc>) -> SystemTime {
    SystemTime::from(instant)
}
