//! FILENAME: core/engine/src/functions/datetime.rs
//! PURPOSE: Date and time built-ins (NOW, TODAY, DATE, YEAR, WEEKDAY, ...).
//! CONTEXT: Dates are serial numbers: whole days since 1899-12-30, with the
//! time of day as the fractional part. 2000-01-01 is 36526.

use chrono::{Datelike, Duration, Local, Months, NaiveDate, NaiveDateTime, Timelike};

use super::{integer, number, optional, FnResult, FunctionRegistry};
use crate::cell::CellError;
use crate::evaluator::EvalResult;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// 9999-12-31, the last representable date.
const MAX_SERIAL: f64 = 2_958_465.0;

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register_builtin("NOW", 0, Some(0), fn_now);
    registry.register_builtin("TODAY", 0, Some(0), fn_today);
    registry.register_builtin("DATE", 3, Some(3), fn_date);
    registry.register_builtin("YEAR", 1, Some(1), fn_year);
    registry.register_builtin("MONTH", 1, Some(1), fn_month);
    registry.register_builtin("DAY", 1, Some(1), fn_day);
    registry.register_builtin("WEEKDAY", 1, Some(2), fn_weekday);
    registry.register_builtin("HOUR", 1, Some(1), fn_hour);
    registry.register_builtin("MINUTE", 1, Some(1), fn_minute);
    registry.register_builtin("SECOND", 1, Some(1), fn_second);
    registry.register_builtin("DAYS", 2, Some(2), fn_days);
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

pub(crate) fn date_to_serial(date: NaiveDate) -> f64 {
    (date - epoch()).num_days() as f64
}

pub(crate) fn datetime_to_serial(datetime: NaiveDateTime) -> f64 {
    let seconds = datetime.time().num_seconds_from_midnight() as f64;
    date_to_serial(datetime.date()) + seconds / SECONDS_PER_DAY
}

/// Converts a serial number back to a date-time; negative serials are #NUM!.
pub(crate) fn serial_to_datetime(serial: f64) -> Result<NaiveDateTime, CellError> {
    if !(0.0..=MAX_SERIAL).contains(&serial) {
        return Err(CellError::Num);
    }
    let days = serial.floor();
    let seconds = ((serial - days) * SECONDS_PER_DAY).round() as i64;
    epoch()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| midnight.checked_add_signed(Duration::days(days as i64)))
        .and_then(|date| date.checked_add_signed(Duration::seconds(seconds)))
        .ok_or(CellError::Num)
}

fn datetime_arg(args: &[EvalResult], index: usize) -> Result<NaiveDateTime, CellError> {
    serial_to_datetime(number(&args[index])?)
}

fn fn_now(_args: &[EvalResult]) -> FnResult {
    Ok(EvalResult::Number(datetime_to_serial(Local::now().naive_local())))
}

fn fn_today(_args: &[EvalResult]) -> FnResult {
    Ok(EvalResult::Number(date_to_serial(Local::now().date_naive())))
}

/// DATE(year, month, day). Years below 1900 are offset by 1900; months and
/// days outside their usual range roll over into neighbouring periods.
fn fn_date(args: &[EvalResult]) -> FnResult {
    let mut year = integer(&args[0])?;
    let month = integer(&args[1])?;
    let day = integer(&args[2])?;

    if (0..1900).contains(&year) {
        year += 1900;
    }
    if !(1900..=9999).contains(&year) {
        return Err(CellError::Num);
    }

    let first_of_year = NaiveDate::from_ymd_opt(year as i32, 1, 1).ok_or(CellError::Num)?;
    let months = month.checked_sub(1).ok_or(CellError::Num)?;
    let month_count = u32::try_from(months.unsigned_abs()).map_err(|_| CellError::Num)?;
    let month_count = Months::new(month_count);
    let first_of_month = if months >= 0 {
        first_of_year.checked_add_months(month_count)
    } else {
        first_of_year.checked_sub_months(month_count)
    }
    .ok_or(CellError::Num)?;

    let offset = day
        .checked_sub(1)
        .and_then(Duration::try_days)
        .ok_or(CellError::Num)?;
    let date = first_of_month.checked_add_signed(offset).ok_or(CellError::Num)?;
    let serial = date_to_serial(date);
    if !(0.0..=MAX_SERIAL).contains(&serial) {
        return Err(CellError::Num);
    }
    Ok(EvalResult::Number(serial))
}

fn fn_year(args: &[EvalResult]) -> FnResult {
    Ok(EvalResult::Number(datetime_arg(args, 0)?.year() as f64))
}

fn fn_month(args: &[EvalResult]) -> FnResult {
    Ok(EvalResult::Number(datetime_arg(args, 0)?.month() as f64))
}

fn fn_day(args: &[EvalResult]) -> FnResult {
    Ok(EvalResult::Number(datetime_arg(args, 0)?.day() as f64))
}

/// WEEKDAY(serial, [type = 1])
/// Type 1: Sunday = 1 .. Saturday = 7. Type 2: Monday = 1 .. Sunday = 7.
/// Type 3: Monday = 0 .. Sunday = 6.
fn fn_weekday(args: &[EvalResult]) -> FnResult {
    let weekday = datetime_arg(args, 0)?.weekday();
    let value = match optional(args, 1, 1, integer)? {
        1 => weekday.number_from_sunday(),
        2 => weekday.number_from_monday(),
        3 => weekday.num_days_from_monday(),
        _ => return Err(CellError::Num),
    };
    Ok(EvalResult::Number(value as f64))
}

fn fn_hour(args: &[EvalResult]) -> FnResult {
    Ok(EvalResult::Number(datetime_arg(args, 0)?.hour() as f64))
}

fn fn_minute(args: &[EvalResult]) -> FnResult {
    Ok(EvalResult::Number(datetime_arg(args, 0)?.minute() as f64))
}

fn fn_second(args: &[EvalResult]) -> FnResult {
    Ok(EvalResult::Number(datetime_arg(args, 0)?.second() as f64))
}

/// DAYS(end, start): whole days between two dates.
fn fn_days(args: &[EvalResult]) -> FnResult {
    let end = number(&args[0])?.floor();
    let start = number(&args[1])?.floor();
    Ok(EvalResult::Number(end - start))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[EvalResult]) -> EvalResult {
        FunctionRegistry::new().call(name, args)
    }

    fn n(v: f64) -> EvalResult {
        EvalResult::Number(v)
    }

    #[test]
    fn test_serial_epoch() {
        let date = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        assert_eq!(date_to_serial(date), 36526.0);
        let noon = date.and_hms_opt(12, 0, 0).unwrap();
        assert_eq!(datetime_to_serial(noon), 36526.5);
        assert_eq!(serial_to_datetime(36526.5), Ok(noon));
        assert_eq!(serial_to_datetime(-1.0), Err(CellError::Num));
    }

    #[test]
    fn test_date_parts() {
        assert_eq!(call("DATE", &[n(2000.0), n(1.0), n(1.0)]), n(36526.0));
        assert_eq!(call("YEAR", &[n(36526.0)]), n(2000.0));
        assert_eq!(call("MONTH", &[n(36526.0)]), n(1.0));
        assert_eq!(call("DAY", &[n(36526.0)]), n(1.0));
    }

    #[test]
    fn test_date_rolls_over() {
        // Month 13 of 1999 is January 2000; day 0 is the last day of the previous month.
        assert_eq!(call("DATE", &[n(1999.0), n(13.0), n(1.0)]), n(36526.0));
        assert_eq!(call("DATE", &[n(2000.0), n(3.0), n(0.0)]), call("DATE", &[n(2000.0), n(2.0), n(29.0)]));
        assert_eq!(call("DATE", &[n(100.0), n(1.0), n(1.0)]), call("DATE", &[n(2000.0), n(1.0), n(1.0)]));
        assert_eq!(call("DATE", &[n(10000.0), n(1.0), n(1.0)]), EvalResult::Error(CellError::Num));
    }

    #[test]
    fn test_date_out_of_range_parts_are_num_errors() {
        let num = EvalResult::Error(CellError::Num);
        // 2^32 + 1 months must not wrap around to month 1
        assert_eq!(call("DATE", &[n(2000.0), n(4_294_967_297.0), n(1.0)]), num);
        assert_eq!(call("DATE", &[n(2000.0), n(-4_294_967_297.0), n(1.0)]), num);
        assert_eq!(call("DATE", &[n(2000.0), n(1.0), n(1e18)]), num);
        assert_eq!(call("DATE", &[n(2000.0), n(1.0), n(-1e300)]), num);
        assert_eq!(call("DATE", &[n(2000.0), n(-1e300), n(1.0)]), num);
        assert_eq!(call("DATE", &[n(2000.0), n(4_000_000.0), n(1.0)]), num);
        assert_eq!(call("DATE", &[n(9999.0), n(12.0), n(32.0)]), num);
        assert_eq!(call("DATE", &[n(9999.0), n(12.0), n(31.0)]), n(MAX_SERIAL));
    }

    #[test]
    fn test_weekday() {
        // 2000-01-01 was a Saturday
        assert_eq!(call("WEEKDAY", &[n(36526.0)]), n(7.0));
        assert_eq!(call("WEEKDAY", &[n(36526.0), n(2.0)]), n(6.0));
        assert_eq!(call("WEEKDAY", &[n(36526.0), n(3.0)]), n(5.0));
        assert_eq!(call("WEEKDAY", &[n(36526.0), n(9.0)]), EvalResult::Error(CellError::Num));
    }

    #[test]
    fn test_time_parts() {
        // 18:30:15 on 2000-01-01
        let serial = 36526.0 + (18.0 * 3600.0 + 30.0 * 60.0 + 15.0) / 86_400.0;
        assert_eq!(call("HOUR", &[n(serial)]), n(18.0));
        assert_eq!(call("MINUTE", &[n(serial)]), n(30.0));
        assert_eq!(call("SECOND", &[n(serial)]), n(15.0));
    }

    #[test]
    fn test_days_and_now() {
        assert_eq!(call("DAYS", &[n(36560.0), n(36526.0)]), n(34.0));
        match call("NOW", &[]) {
            EvalResult::Number(now) => assert!(now > 36526.0),
            other => panic!("Expected number, got {:?}", other),
        }
        match (call("TODAY", &[]), call("NOW", &[])) {
            (EvalResult::Number(today), EvalResult::Number(now)) => {
                assert_eq!(today.fract(), 0.0);
                assert!(now >= today);
            }
            other => panic!("Expected numbers, got {:?}", other),
        }
    }
}
