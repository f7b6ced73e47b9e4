//! Oracle datetime and interval images, converted through `chrono`.
//!
//! Layouts (all multi-byte integers big-endian):
//! - DATE (7): century+100, year+100, month, day, hour+1, minute+1, second+1
//! - TIMESTAMP (11): DATE followed by a u32 nanosecond count
//! - TIMESTAMP WITH TIME ZONE (13): UTC TIMESTAMP, offset hour+20, offset minute+60
//! - TIME (7): hour+1, minute+1, second+1, u32 nanoseconds
//! - INTERVAL YEAR TO MONTH (5): years+2^31 as u32, months+60
//! - INTERVAL DAY TO SECOND (11): days+2^31 as u32, hour+60, minute+60,
//!   second+60, nanoseconds+2^31 as u32

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike,
};

use crate::{DomError, Result};

pub const DATE_LEN: usize = 7;
pub const TIMESTAMP_LEN: usize = 11;
pub const TIMESTAMP_TZ_LEN: usize = 13;
pub const TIME_LEN: usize = 7;
pub const YEAR_MONTH_LEN: usize = 5;
pub const DAY_SECOND_LEN: usize = 11;

const INTERVAL_BIAS: i64 = 0x8000_0000;

fn bad(what: &str) -> DomError {
    DomError::malformed(0, format!("invalid {what} image"))
}

fn be_u32(b: &[u8]) -> u32 {
    u32::from_be_bytes([b[0], b[1], b[2], b[3]])
}

fn date_part(b: &[u8]) -> Result<NaiveDateTime> {
    let year = (b[0] as i32 - 100) * 100 + (b[1] as i32 - 100);
    let date = NaiveDate::from_ymd_opt(year, b[2] as u32, b[3] as u32).ok_or_else(|| bad("date"))?;
    let time = NaiveTime::from_hms_opt(
        (b[4] as u32).wrapping_sub(1),
        (b[5] as u32).wrapping_sub(1),
        (b[6] as u32).wrapping_sub(1),
    )
    .ok_or_else(|| bad("date"))?;
    Ok(date.and_time(time))
}

fn write_date_part(dt: &NaiveDateTime, out: &mut [u8]) {
    let year = dt.year();
    out[0] = (year.div_euclid(100) + 100) as u8;
    out[1] = (year.rem_euclid(100) + 100) as u8;
    out[2] = dt.month() as u8;
    out[3] = dt.day() as u8;
    out[4] = dt.hour() as u8 + 1;
    out[5] = dt.minute() as u8 + 1;
    out[6] = dt.second() as u8 + 1;
}

pub fn decode_date(b: &[u8]) -> Result<NaiveDateTime> {
    if b.len() != DATE_LEN {
        return Err(bad("date"));
    }
    date_part(b)
}

pub fn encode_date(dt: &NaiveDateTime) -> [u8; DATE_LEN] {
    let mut out = [0u8; DATE_LEN];
    write_date_part(dt, &mut out);
    out
}

/// Accepts both the 11-byte form and a 7-byte form without fractions.
pub fn decode_timestamp(b: &[u8]) -> Result<NaiveDateTime> {
    match b.len() {
        DATE_LEN => date_part(b),
        TIMESTAMP_LEN => {
            let dt = date_part(&b[..DATE_LEN])?;
            let nanos = be_u32(&b[DATE_LEN..]);
            if nanos >= 1_000_000_000 {
                return Err(bad("timestamp"));
            }
            dt.with_nanosecond(nanos).ok_or_else(|| bad("timestamp"))
        }
        _ => Err(bad("timestamp")),
    }
}

pub fn encode_timestamp(dt: &NaiveDateTime) -> [u8; TIMESTAMP_LEN] {
    let mut out = [0u8; TIMESTAMP_LEN];
    write_date_part(dt, &mut out);
    let nanos = dt.nanosecond().min(999_999_999);
    out[DATE_LEN..].copy_from_slice(&nanos.to_be_bytes());
    out
}

pub fn decode_timestamp_tz(b: &[u8]) -> Result<DateTime<FixedOffset>> {
    if b.len() != TIMESTAMP_TZ_LEN {
        return Err(bad("timestamp with time zone"));
    }
    let utc = decode_timestamp(&b[..TIMESTAMP_LEN])?;
    if b[11] & 0x80 != 0 {
        // Region-id zones need a zone database.
        return Err(bad("timestamp with time zone (region id)"));
    }
    let hours = b[11] as i32 - 20;
    let minutes = b[12] as i32 - 60;
    let seconds = hours * 3600 + hours.signum() * minutes.abs() * 60;
    let seconds = if hours == 0 { minutes * 60 } else { seconds };
    let offset = FixedOffset::east_opt(seconds).ok_or_else(|| bad("time zone offset"))?;
    Ok(offset.from_utc_datetime(&utc))
}

pub fn encode_timestamp_tz(dt: &DateTime<FixedOffset>) -> [u8; TIMESTAMP_TZ_LEN] {
    let mut out = [0u8; TIMESTAMP_TZ_LEN];
    out[..TIMESTAMP_LEN].copy_from_slice(&encode_timestamp(&dt.naive_utc()));
    let seconds = dt.offset().local_minus_utc();
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    out[11] = (hours + 20) as u8;
    out[12] = (minutes + 60) as u8;
    out
}

pub fn decode_time(b: &[u8]) -> Result<NaiveTime> {
    if b.len() != TIME_LEN {
        return Err(bad("time"));
    }
    NaiveTime::from_hms_nano_opt(
        (b[0] as u32).wrapping_sub(1),
        (b[1] as u32).wrapping_sub(1),
        (b[2] as u32).wrapping_sub(1),
        be_u32(&b[3..]),
    )
    .ok_or_else(|| bad("time"))
}

pub fn encode_time(t: &NaiveTime) -> [u8; TIME_LEN] {
    let mut out = [0u8; TIME_LEN];
    out[0] = t.hour() as u8 + 1;
    out[1] = t.minute() as u8 + 1;
    out[2] = t.second() as u8 + 1;
    out[3..].copy_from_slice(&t.nanosecond().min(999_999_999).to_be_bytes());
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct YearMonth {
    pub years: i32,
    pub months: i32,
}

impl YearMonth {
    pub fn total_months(&self) -> i64 {
        self.years as i64 * 12 + self.months as i64
    }

    /// ISO 8601 duration, e.g. `P1Y2M` or `-P3M`.
    pub fn to_iso(&self) -> String {
        let total = self.total_months();
        let sign = if total < 0 { "-" } else { "" };
        let total = total.abs();
        let (years, months) = (total / 12, total % 12);
        match (years, months) {
            (0, m) => format!("{sign}P{m}M"),
            (y, 0) => format!("{sign}P{y}Y"),
            (y, m) => format!("{sign}P{y}Y{m}M"),
        }
    }
}

pub fn decode_year_month(b: &[u8]) -> Result<YearMonth> {
    if b.len() != YEAR_MONTH_LEN {
        return Err(bad("interval year to month"));
    }
    let years = be_u32(b) as i64 - INTERVAL_BIAS;
    let months = b[4] as i32 - 60;
    if !(-11..=11).contains(&months) {
        return Err(bad("interval year to month"));
    }
    Ok(YearMonth {
        years: years as i32,
        months,
    })
}

pub fn encode_year_month(v: &YearMonth) -> [u8; YEAR_MONTH_LEN] {
    let mut out = [0u8; YEAR_MONTH_LEN];
    out[..4].copy_from_slice(&((v.years as i64 + INTERVAL_BIAS) as u32).to_be_bytes());
    out[4] = (v.months + 60) as u8;
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DaySecond {
    pub days: i32,
    pub hours: i32,
    pub minutes: i32,
    pub seconds: i32,
    pub nanos: i32,
}

impl DaySecond {
    pub fn total_nanos(&self) -> i128 {
        let secs = self.days as i128 * 86_400
            + self.hours as i128 * 3_600
            + self.minutes as i128 * 60
            + self.seconds as i128;
        secs * 1_000_000_000 + self.nanos as i128
    }

    /// ISO 8601 duration, e.g. `P1DT2H3M4.5S`.
    pub fn to_iso(&self) -> String {
        let total = self.total_nanos();
        let sign = if total < 0 { "-" } else { "" };
        let total = total.abs();
        let nanos = total % 1_000_000_000;
        let secs = total / 1_000_000_000;
        let days = secs / 86_400;
        let hours = secs % 86_400 / 3_600;
        let minutes = secs % 3_600 / 60;
        let seconds = secs % 60;
        let mut out = format!("{sign}P");
        if days != 0 {
            out.push_str(&format!("{days}D"));
        }
        out.push('T');
        if hours != 0 {
            out.push_str(&format!("{hours}H"));
        }
        if minutes != 0 {
            out.push_str(&format!("{minutes}M"));
        }
        if seconds != 0 || nanos != 0 || (days == 0 && hours == 0 && minutes == 0) {
            if nanos == 0 {
                out.push_str(&format!("{seconds}S"));
            } else {
                let frac = format!("{nanos:09}");
                out.push_str(&format!("{seconds}.{}S", frac.trim_end_matches('0')));
            }
        }
        if out.ends_with('T') {
            out.pop();
        }
        out
    }
}

pub fn decode_day_second(b: &[u8]) -> Result<DaySecond> {
    if b.len() != DAY_SECOND_LEN {
        return Err(bad("interval day to second"));
    }
    let v = DaySecond {
        days: (be_u32(b) as i64 - INTERVAL_BIAS) as i32,
        hours: b[4] as i32 - 60,
        minutes: b[5] as i32 - 60,
        seconds: b[6] as i32 - 60,
        nanos: (be_u32(&b[7..]) as i64 - INTERVAL_BIAS) as i32,
    };
    if v.hours.abs() > 23 || v.minutes.abs() > 59 || v.seconds.abs() > 59 || v.nanos.abs() > 999_999_999 {
        return Err(bad("interval day to second"));
    }
    Ok(v)
}

pub fn encode_day_second(v: &DaySecond) -> [u8; DAY_SECOND_LEN] {
    let mut out = [0u8; DAY_SECOND_LEN];
    out[..4].copy_from_slice(&((v.days as i64 + INTERVAL_BIAS) as u32).to_be_bytes());
    out[4] = (v.hours + 60) as u8;
    out[5] = (v.minutes + 60) as u8;
    out[6] = (v.seconds + 60) as u8;
    out[7..].copy_from_slice(&((v.nanos as i64 + INTERVAL_BIAS) as u32).to_be_bytes());
    out
}

/// `2024-01-02T03:04:05[.fraction]`
pub fn naive_to_iso(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

pub fn time_to_iso(t: &NaiveTime) -> String {
    t.format("%H:%M:%S%.f").to_string()
}

pub fn offset_to_iso(dt: &DateTime<FixedOffset>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.f%:z").to_string()
}
