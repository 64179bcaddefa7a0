//! Packed FAT date/time fields.
//!
//! date: bits 15-9 year since 1980, 8-5 month, 4-0 day.
//! time: bits 15-11 hour, 10-5 minute, 4-0 seconds / 2.
//! FAT stores local time without a zone; it is reported as UTC.

use time::macros::datetime;
use time::{Date, Duration, Month, OffsetDateTime, Time};

/// Returned for packed dates that do not name a real day (month 0, day 0, ...).
pub const FAT_EPOCH: OffsetDateTime = datetime!(1980-01-01 0:00 UTC);

const START_YEAR: i32 = 1980;

pub fn decode_date(raw: u16) -> Option<Date> {
    let year  = START_YEAR + (raw >> 9) as i32;
    let month = Month::try_from(((raw >> 5) & 0x0F) as u8).ok()?;
    let day   = (raw & 0x1F) as u8;
    Date::from_calendar_date(year, month, day).ok()
}

pub fn decode_time(raw: u16) -> Option<Time> {
    let hour   = (raw >> 11) as u8;
    let minute = ((raw >> 5) & 0x3F) as u8;
    let second = ((raw & 0x1F) * 2) as u8;
    Time::from_hms(hour, minute, second).ok()
}

/// Combine a packed date and time. An invalid time keeps the date at midnight.
pub fn decode_timestamp(date: u16, time: u16) -> OffsetDateTime {
    match decode_date(date) {
        Some(d) => d.with_time(decode_time(time).unwrap_or(Time::MIDNIGHT)).assume_utc(),
        None => FAT_EPOCH,
    }
}

/// Creation time: as [`decode_timestamp`] plus the 10 ms refinement byte (0-199).
pub fn decode_creation(date: u16, time: u16, refinement: u8) -> OffsetDateTime {
    match decode_date(date) {
        Some(_) => {
            decode_timestamp(date, time) + Duration::milliseconds(10 * i64::from(refinement.min(199)))
        }
        None => FAT_EPOCH,
    }
}
