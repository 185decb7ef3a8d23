//! Strict re-typing of text columns into dates.
//!
//! Unlike the range filters, conversion never drops a row: a value that is
//! not a recognisable date aborts the whole pass.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use super::model::{Dataset, Value};
use crate::error::{CleanError, Result};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%Y%m%d"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

/// Parse a textual date or timestamp.
///
/// Timestamps falling exactly on midnight collapse to a plain date, so a
/// column of `2019-05-21 00:00:00` values is written back as `2019-05-21`.
/// Offsets (`2019-05-21T10:00:00+02:00`) are normalised to UTC.
pub fn parse_date(s: &str) -> Option<Value> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(Value::Date(d));
        }
    }

    let naive = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc()))?;

    if naive.time() == NaiveTime::MIN {
        Some(Value::Date(naive.date()))
    } else {
        Some(Value::DateTime(naive))
    }
}

/// Convert one cell; `None` means the value cannot be read as a date.
fn to_date(value: &Value) -> Option<Value> {
    match value {
        Value::Null | Value::Date(_) | Value::DateTime(_) => Some(value.clone()),
        Value::String(s) if s.trim().is_empty() => Some(Value::Null),
        Value::String(s) => parse_date(s),
        // `20190521` is inferred as an integer on load
        Value::Integer(i) => parse_date(&i.to_string()),
        Value::Float(v) if v.is_nan() => Some(Value::Null),
        Value::Float(_) | Value::Bool(_) => None,
    }
}

/// Return a copy of `dataset` with `column` converted to dates.
///
/// Nulls stay null.  The first unparseable value fails with
/// `TypeConversion`; no row is silently dropped.
pub fn retype_dates(dataset: &Dataset, column: &str) -> Result<Dataset> {
    let idx = dataset.column_index(column)?;
    let mut out = dataset.clone();

    for row in out.rows.iter_mut() {
        let converted = to_date(row.get(idx)).ok_or_else(|| CleanError::TypeConversion {
            row: row.source_row,
            column: column.to_string(),
            value: row.output_text(idx),
            target: "a date",
        })?;
        row.set(idx, converted);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Row;

    fn date(y: i32, m: u32, d: u32) -> Value {
        Value::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_parse_common_date_spellings() {
        assert_eq!(parse_date("2019-05-21"), Some(date(2019, 5, 21)));
        assert_eq!(parse_date("2019/05/21"), Some(date(2019, 5, 21)));
        assert_eq!(parse_date("05/21/2019"), Some(date(2019, 5, 21)));
        assert_eq!(parse_date(" 2019-05-21 "), Some(date(2019, 5, 21)));
    }

    #[test]
    fn test_midnight_timestamp_collapses_to_date() {
        assert_eq!(parse_date("2019-05-21 00:00:00"), Some(date(2019, 5, 21)));
        match parse_date("2019-05-21T13:45:00") {
            Some(Value::DateTime(dt)) => assert_eq!(dt.to_string(), "2019-05-21 13:45:00"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_rfc3339_is_normalised_to_utc() {
        match parse_date("2019-05-21T10:30:00+02:00") {
            Some(Value::DateTime(dt)) => assert_eq!(dt.to_string(), "2019-05-21 08:30:00"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_garbage_and_impossible_dates() {
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("2019-02-30"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_retype_keeps_nulls_and_converts_integers() {
        let ds = Dataset::new(
            vec!["last_review".into()],
            vec![
                Row::new(vec![Value::String("2019-01-01".into())]),
                Row::new(vec![Value::Null]),
                Row::new(vec![Value::Integer(20190102)]),
            ],
        );
        let out = retype_dates(&ds, "last_review").unwrap();
        assert_eq!(out.rows[0].cells[0], date(2019, 1, 1));
        assert_eq!(out.rows[1].cells[0], Value::Null);
        assert_eq!(out.rows[2].cells[0], date(2019, 1, 2));
        // input left untouched
        assert_eq!(ds.rows[0].cells[0], Value::String("2019-01-01".into()));
    }

    #[test]
    fn test_conversion_error_names_the_source_row() {
        let ds = Dataset::new(
            vec!["last_review".into()],
            vec![
                Row::from_text(["2019-01-01"]),
                Row::from_text(["2019-01-02"]),
                Row::from_text(["garbage"]),
            ],
        );
        // the first two rows were filtered away before conversion
        let survivors = ds.select(&[2]);
        match retype_dates(&survivors, "last_review") {
            Err(CleanError::TypeConversion { row, value, .. }) => {
                assert_eq!(row, 2);
                assert_eq!(value, "garbage");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_retype_aborts_on_malformed_value() {
        let ds = Dataset::new(
            vec!["last_review".into()],
            vec![
                Row::new(vec![Value::String("2019-01-01".into())]),
                Row::new(vec![Value::String("not a date".into())]),
            ],
        );
        match retype_dates(&ds, "last_review") {
            Err(CleanError::TypeConversion { row, value, .. }) => {
                assert_eq!(row, 1);
                assert_eq!(value, "not a date");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_retype_missing_column() {
        let ds = Dataset::new(vec!["price".into()], vec![]);
        assert!(matches!(
            retype_dates(&ds, "last_review"),
            Err(CleanError::MissingColumn(_))
        ));
    }
}
