//! Conversion between Excel's 1900-epoch serial date numbers and
//! [`chrono::NaiveDateTime`].
//!
//! Excel's epoch is 1899-12-31 (serial 1 is 1900-01-01), to accommodate the
//! well-known Lotus 1-2-3 leap-year bug: 1900 is incorrectly treated as a
//! leap year, so serial 60 is the fictitious "1900-02-29" and every real
//! date from 1900-03-01 onward is numbered one higher than its true day
//! count from the epoch. We reproduce that quirk rather than "fix" it,
//! since it's what every `.xlsx` file in the wild actually encodes.

use chrono::{Duration, NaiveDate, NaiveDateTime};

const EXCEL_EPOCH_OFFSET_DAYS: i64 = 25_568; // days between 1899-12-31 and the Unix epoch
const LEAP_BUG_THRESHOLD: i64 = 60; // serial for the fictitious 1900-02-29

pub fn to_excel_serial(dt: NaiveDateTime) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    let duration = dt.signed_duration_since(epoch);
    let mut days = duration.num_days() + EXCEL_EPOCH_OFFSET_DAYS;
    if days >= LEAP_BUG_THRESHOLD {
        days += 1;
    }
    let frac = (duration - Duration::days(duration.num_days())).num_milliseconds() as f64 / 86_400_000.0;
    days as f64 + frac
}

pub fn from_excel_serial(serial: f64) -> NaiveDateTime {
    let mut days = serial.trunc() as i64;
    if days >= LEAP_BUG_THRESHOLD + 1 {
        days -= 1;
    }
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    let frac_ms = (serial.fract() * 86_400_000.0).round() as i64;
    epoch + Duration::days(days - EXCEL_EPOCH_OFFSET_DAYS) + Duration::milliseconds(frac_ms)
}
