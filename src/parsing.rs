//! Primitive converters between single CSV fields and Rust values.
//!
//! Every parser here consumes the *whole* field: leading or trailing
//! garbage (including whitespace) is an error rather than a partial match.
//!
//! ```
//! use flatcsv::parsing::{parse_integer, parse_real, format_integer, format_real};
//!
//! let i: i32 = parse_integer("-34").unwrap();
//! assert_eq!(i, -34);
//! assert!(parse_integer::<i32>("34abc").is_err());
//!
//! let x: f64 = parse_real("1.5e3").unwrap();
//! assert_eq!(format_real(x), "1500.0");
//! assert_eq!(format_integer(i), "-34");
//! ```
use std::fmt::Write;
use std::num::{ParseFloatError, ParseIntError};
use std::str::FromStr;

use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime};

use crate::conv_error::{CResult, ConvError};
use crate::field_plan::FieldKind;

/// Parse a full-string base-10 integer into any of Rust's integer types.
///
/// Values that do not fit in `I` are errors, as are empty strings and any
/// characters other than digits and a single leading sign.
pub fn parse_integer<I>(s: &str) -> CResult<I>
where I: FromStr<Err = ParseIntError>
{
    s.parse::<I>()
        .map_err(|e| ConvError::parsing(s, FieldKind::Integer, format!("Invalid integer format ({e})")))
}

/// Parse a full-string decimal or scientific floating point literal.
///
/// `inf`, `-inf` and `NaN` are accepted, matching what [`format_real`] writes
/// for non-finite values.
pub fn parse_real<F>(s: &str) -> CResult<F>
where F: FromStr<Err = ParseFloatError>
{
    s.parse::<F>()
        .map_err(|e| ConvError::parsing(s, FieldKind::Float, format!("Invalid real number format ({e})")))
}

/// Parse a date and time using a strftime-style layout (e.g. `"%Y-%m-%d %H:%M:%S"`).
pub fn parse_datetime(s: &str, layout: &str) -> CResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, layout)
        .map_err(|e| ConvError::parsing(s, FieldKind::DateTime, format!("does not match layout '{layout}' ({e})")))
}

/// Parse a calendar date using a strftime-style layout (e.g. `"%d/%m/%Y"`).
pub fn parse_date(s: &str, layout: &str) -> CResult<NaiveDate> {
    NaiveDate::parse_from_str(s, layout)
        .map_err(|e| ConvError::parsing(s, FieldKind::DateTime, format!("does not match layout '{layout}' ({e})")))
}

/// Write an integer in its canonical decimal form.
pub fn format_integer<I: itoa::Integer>(v: I) -> String {
    let mut b = itoa::Buffer::new();
    b.format(v).to_string()
}

/// Write a float as the shortest string that parses back to the same value.
pub fn format_real<F: ryu::Float>(v: F) -> String {
    let mut b = ryu::Buffer::new();
    b.format(v).to_string()
}

/// Write a date and time with the same layout used by [`parse_datetime`].
pub fn format_datetime(v: &NaiveDateTime, layout: &str) -> CResult<String> {
    let mut s = String::new();
    write!(&mut s, "{}", v.format(layout))
        .map_err(|_| ConvError::FormattingError { kind: FieldKind::DateTime, layout: layout.to_string() })?;
    Ok(s)
}

/// Write a calendar date with the same layout used by [`parse_date`].
pub fn format_date(v: &NaiveDate, layout: &str) -> CResult<String> {
    let mut s = String::new();
    write!(&mut s, "{}", v.format(layout))
        .map_err(|_| ConvError::FormattingError { kind: FieldKind::DateTime, layout: layout.to_string() })?;
    Ok(s)
}

/// `true` if every specifier in `layout` is one chrono understands.
pub(crate) fn is_valid_layout(layout: &str) -> bool {
    !StrftimeItems::new(layout).any(|item| matches!(item, Item::Error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer() -> CResult<()> {
        assert_eq!(parse_integer::<i64>("42")?, 42);
        assert_eq!(parse_integer::<i64>("-7")?, -7);
        assert_eq!(parse_integer::<i8>("+5")?, 5);
        assert_eq!(parse_integer::<u64>("18446744073709551615")?, u64::MAX);
        Ok(())
    }

    #[test]
    fn test_integer_rejects_partial() {
        for bad in ["", " 1", "1 ", "12x", "1.0", "--1", "0x10"] {
            assert!(parse_integer::<i32>(bad).is_err(), "'{bad}' should not parse as an integer");
        }

        // out of range for the target type
        assert!(parse_integer::<i8>("200").is_err());
        assert!(parse_integer::<u32>("-1").is_err());
    }

    #[test]
    fn test_real() -> CResult<()> {
        assert_eq!(parse_real::<f64>("12.45678")?, 12.45678);
        assert_eq!(parse_real::<f64>("-23.5")?, -23.5);
        assert_eq!(parse_real::<f64>("1.34e-03")?, 1.34e-3);
        assert_eq!(parse_real::<f32>("3")?, 3.0);
        assert!(parse_real::<f64>("NaN")?.is_nan());

        for bad in ["", "1.5.2", "abc", "1e", " 2.0"] {
            assert!(parse_real::<f64>(bad).is_err(), "'{bad}' should not parse as a float");
        }
        Ok(())
    }

    #[test]
    fn test_error_mentions_text_and_kind() {
        let e = parse_integer::<i32>("abc").unwrap_err();
        let msg = e.to_string();
        assert!(msg.contains("'abc'"), "{msg}");
        assert!(msg.contains("integer"), "{msg}");
    }

    #[test]
    fn test_canonical_output() {
        assert_eq!(format_integer(34), "34");
        assert_eq!(format_integer(-1_i8), "-1");
        assert_eq!(format_real(34.0_f64), "34.0");
        assert_eq!(format_real(0.1_f32), "0.1");
        assert_eq!(format_real(f64::INFINITY), "inf");
    }

    #[test]
    fn test_datetime_layout() -> CResult<()> {
        let layout = "%d/%m/%Y %H:%M";
        let dt = parse_datetime("03/02/2021 14:30", layout)?;
        assert_eq!(dt, NaiveDate::from_ymd_opt(2021, 2, 3).unwrap().and_hms_opt(14, 30, 0).unwrap());
        assert_eq!(format_datetime(&dt, layout)?, "03/02/2021 14:30");

        assert!(parse_datetime("2021-02-03 14:30", layout).is_err());
        Ok(())
    }

    #[test]
    fn test_date_layout() -> CResult<()> {
        let d = parse_date("2020-12-31", "%Y-%m-%d")?;
        assert_eq!(d, NaiveDate::from_ymd_opt(2020, 12, 31).unwrap());
        assert_eq!(format_date(&d, "%Y%m%d")?, "20201231");

        // a plain date has no hour to write
        let e = format_date(&d, "%Y-%m-%d %H").unwrap_err();
        assert!(matches!(e, ConvError::FormattingError { .. }));
        Ok(())
    }

    #[test]
    fn test_layout_validation() {
        assert!(is_valid_layout("%Y-%m-%d %H:%M:%S"));
        assert!(!is_valid_layout("%Y-%Q"));
    }
}
