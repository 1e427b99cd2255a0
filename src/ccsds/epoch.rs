//! Epoch strings of ephemeris messages.
//!
//! Two layouts are accepted, both read as UTC:
//!
//! ```text
//! YYYY-MM-DDThh:mm:ss[.fff]
//! YYYY-DOYThh:mm:ss[.fff]
//! ```
use nom::{
    character::complete::{char, digit1},
    combinator::{all_consuming, map_res, opt},
    sequence::preceded,
    IResult, Parser,
};

use crate::{
    constants::{JD_NOV_17_1858, MJD},
    time_system::{
        converter::TimeConverter,
        gregorian::{day_of_year_to_month_day, days_in_month, mjd_from_day_and_seconds},
        TimeSystem,
    },
    timecore_errors::TimeCoreError,
};

fn number(input: &str) -> IResult<&str, u32> {
    map_res(digit1, str::parse::<u32>).parse(input)
}

/// `YYYY-DDD` or `YYYY-MM-DD`, returning the year and the one or two trailing numbers.
fn date_part(input: &str) -> IResult<&str, (i32, u32, Option<u32>)> {
    all_consuming((
        map_res(digit1, str::parse::<i32>),
        preceded(char('-'), number),
        opt(preceded(char('-'), number)),
    ))
    .parse(input)
}

/// Split `hh:mm:ss[.fff]` into hours, minutes and seconds.
fn time_part(text: &str) -> Option<(u32, u32, f64)> {
    if text.len() < 8 || text.matches(':').count() != 2 {
        return None;
    }
    let mut fields = text.split(':');
    let hour = fields.next()?.parse::<u32>().ok()?;
    let minute = fields.next()?.parse::<u32>().ok()?;
    let seconds = fields.next()?.parse::<f64>().ok()?;
    (hour < 24 && minute < 60 && (0.0..61.0).contains(&seconds)).then_some((hour, minute, seconds))
}

/// Parse an ephemeris message epoch.
///
/// Arguments
/// -----------------
/// * `text`: Epoch text in UTC, calendar or day-of-year layout.
/// * `converter`: Converter holding the leap-second table used for the UTC → A1 step.
///
/// Return
/// ----------
/// * The epoch as an A1 modified julian date (standard origin), or
///   [`TimeCoreError::InvalidCcsdsEpoch`] for a malformed text or a day that does not exist
///   (day 366 of a non-leap year, February 30, …). A missing leap-second table is a
///   [`TimeCoreError::MissingLeapSecondTable`].
pub fn parse_ccsds_epoch(text: &str, converter: &TimeConverter) -> Result<MJD, TimeCoreError> {
    let text = text.trim();
    let invalid = |why: &str| TimeCoreError::InvalidCcsdsEpoch(format!("\"{text}\": {why}"));

    let (date, time) = text
        .split_once(['T', 't'])
        .ok_or_else(|| invalid("missing 'T' separator"))?;

    let (hour, minute, seconds) =
        time_part(time).ok_or_else(|| invalid("hh:mm:ss part is not formatted correctly"))?;

    let (_, (year, second_field, third_field)) =
        date_part(date).map_err(|_| invalid("date part is not formatted correctly"))?;

    let (month, day) = match third_field {
        None => {
            let doy = u16::try_from(second_field)
                .map_err(|_| invalid("day of year is out of range"))?;
            day_of_year_to_month_day(year, doy).ok_or_else(|| {
                invalid(&format!("day number {doy} does not exist in year {year}"))
            })?
        }
        Some(day) => {
            let month = u8::try_from(second_field)
                .ok()
                .filter(|m| (1..=12).contains(m))
                .ok_or_else(|| invalid("month is out of range"))?;
            let day = u8::try_from(day)
                .ok()
                .filter(|d| *d >= 1 && *d <= days_in_month(year, month))
                .ok_or_else(|| invalid("day of month is out of range"))?;
            (month, day)
        }
    };

    let seconds_of_day = hour as f64 * 3600.0 + minute as f64 * 60.0 + seconds;
    let utc = mjd_from_day_and_seconds(year, month, day, seconds_of_day);
    converter.convert(utc, TimeSystem::UTC, TimeSystem::A1, JD_NOV_17_1858)
}
