//! Conversion between record field values and cell values
//!
//! Encoding never fails: anything that cannot be rendered the intended way
//! is logged and written in a plainer form. Decoding returns a
//! [`DecodeError`] that the import engine records against the field.

use std::fmt::{self, Write as _};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use log::warn;
use sheetwise_core::CellValue;
use thiserror::Error;

use crate::options::{EngineOptions, DEFAULT_DATETIME_FORMAT, DEFAULT_DATE_FORMAT};
use crate::schema::ColumnSchema;
use crate::value::{FieldKind, FieldValue};

/// Largest serial Excel accepts (9999-12-31)
const MAX_EXCEL_SERIAL: f64 = 2_958_466.0;

/// Largest integer an f64 holds exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Why a cell could not be turned into a field value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("'{text}' is not a valid {expected}")]
    Invalid { text: String, expected: &'static str },

    #[error("'{0}' is not one of the allowed options")]
    UnknownLabel(String),

    #[error("'{0}' is not a known option code")]
    UnknownCode(String),

    #[error("'{0}' is not one of the allowed values")]
    UnknownName(String),

    #[error("{value} does not fit in {target}")]
    OutOfRange { value: String, target: &'static str },
}

impl DecodeError {
    pub(crate) fn invalid(text: impl Into<String>, kind: FieldKind) -> Self {
        DecodeError::Invalid {
            text: text.into(),
            expected: kind.describe(),
        }
    }
}

/// Render a field value as a cell
pub fn encode(value: &FieldValue, column: &ColumnSchema, options: &EngineOptions) -> CellValue {
    match value {
        FieldValue::Empty => CellValue::Empty,
        FieldValue::Text(s) | FieldValue::Symbol(s) if s.is_empty() => CellValue::Empty,
        FieldValue::Text(s) | FieldValue::Symbol(s) => CellValue::String(s.clone()),
        FieldValue::Integer(i) => CellValue::Number(*i as f64),
        FieldValue::Number(n) => CellValue::Number(*n),
        FieldValue::Boolean(b) => CellValue::Boolean(*b),
        FieldValue::Date(d) => {
            let pattern = pattern_for(column, &options.date_format);
            CellValue::String(render(column, pattern, d.format(pattern), || {
                d.format(DEFAULT_DATE_FORMAT).to_string()
            }))
        }
        FieldValue::DateTime(dt) => {
            let pattern = pattern_for(column, &options.datetime_format);
            CellValue::String(render(column, pattern, dt.format(pattern), || {
                dt.format(DEFAULT_DATETIME_FORMAT).to_string()
            }))
        }
        FieldValue::Code(code) if code.is_empty() => CellValue::Empty,
        FieldValue::Code(code) => {
            match column.enumeration.as_ref().and_then(|e| e.label_for(code)) {
                Some(label) => CellValue::string(label),
                None => {
                    warn!(
                        "field '{}': no option label for code '{}', writing the code",
                        column.field, code
                    );
                    CellValue::string(code.as_str())
                }
            }
        }
    }
}

/// Read a cell into the field value its column expects
pub fn decode(
    cell: &CellValue,
    column: &ColumnSchema,
    options: &EngineOptions,
) -> Result<FieldValue, DecodeError> {
    match cell {
        CellValue::Empty => Ok(FieldValue::Empty),
        CellValue::String(s) => decode_text(s, column, options),
        CellValue::Number(n) => decode_number(*n, column, options),
        CellValue::Boolean(b) => match column.kind {
            FieldKind::Boolean => Ok(FieldValue::Boolean(*b)),
            _ => decode_text(&cell.to_string(), column, options),
        },
    }
}

/// Read typed text, as found in a string cell or a data file
pub fn decode_text(
    text: &str,
    column: &ColumnSchema,
    options: &EngineOptions,
) -> Result<FieldValue, DecodeError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(FieldValue::Empty);
    }
    let invalid = || DecodeError::invalid(trimmed, column.kind);

    match column.kind {
        FieldKind::Text => Ok(FieldValue::Text(text.to_string())),
        FieldKind::Integer => parse_integer(trimmed)
            .map(FieldValue::Integer)
            .ok_or_else(invalid),
        FieldKind::Number => trimmed
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(FieldValue::Number)
            .ok_or_else(invalid),
        FieldKind::Boolean => parse_bool(trimmed)
            .map(FieldValue::Boolean)
            .ok_or_else(invalid),
        FieldKind::Date => parse_date(trimmed, pattern_for(column, &options.date_format))
            .map(FieldValue::Date)
            .ok_or_else(invalid),
        FieldKind::DateTime => {
            parse_datetime(trimmed, pattern_for(column, &options.datetime_format))
                .map(FieldValue::DateTime)
                .ok_or_else(invalid)
        }
        FieldKind::Coded => match &column.enumeration {
            Some(reference) => reference
                .code_for(trimmed)
                .map(|code| FieldValue::Code(code.to_string()))
                .ok_or_else(|| DecodeError::UnknownLabel(trimmed.to_string())),
            None => Ok(FieldValue::Code(trimmed.to_string())),
        },
        FieldKind::Named => Ok(FieldValue::Symbol(trimmed.to_string())),
    }
}

fn decode_number(
    n: f64,
    column: &ColumnSchema,
    options: &EngineOptions,
) -> Result<FieldValue, DecodeError> {
    let invalid = || DecodeError::invalid(n.to_string(), column.kind);
    match column.kind {
        FieldKind::Integer => integral(n).map(FieldValue::Integer).ok_or_else(invalid),
        FieldKind::Number => Ok(FieldValue::Number(n)),
        FieldKind::Boolean => match n {
            x if x == 1.0 => Ok(FieldValue::Boolean(true)),
            x if x == 0.0 => Ok(FieldValue::Boolean(false)),
            _ => Err(invalid()),
        },
        FieldKind::Date => serial_to_datetime(n)
            .map(|dt| FieldValue::Date(dt.date()))
            .ok_or_else(invalid),
        FieldKind::DateTime => serial_to_datetime(n)
            .map(FieldValue::DateTime)
            .ok_or_else(invalid),
        // integral numbers print without a trailing ".0"
        FieldKind::Text | FieldKind::Coded | FieldKind::Named => {
            decode_text(&n.to_string(), column, options)
        }
    }
}

fn pattern_for<'a>(column: &'a ColumnSchema, default: &'a str) -> &'a str {
    column.date_format.as_deref().unwrap_or(default)
}

/// Format with `pattern`, or fall back when the pattern cannot render the value
fn render<D: fmt::Display>(
    column: &ColumnSchema,
    pattern: &str,
    formatted: D,
    fallback: impl FnOnce() -> String,
) -> String {
    let mut out = String::new();
    match write!(out, "{}", formatted) {
        Ok(()) => out,
        Err(_) => {
            warn!(
                "field '{}': date pattern '{}' is not usable, writing ISO format",
                column.field, pattern
            );
            fallback()
        }
    }
}

fn integral(n: f64) -> Option<i64> {
    (n.is_finite() && n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER).then(|| n as i64)
}

fn parse_integer(s: &str) -> Option<i64> {
    s.parse::<i64>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().and_then(integral))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Some(true),
        "false" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

fn parse_date(s: &str, pattern: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, pattern)
        .or_else(|_| NaiveDate::parse_from_str(s, DEFAULT_DATE_FORMAT))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, DEFAULT_DATETIME_FORMAT)
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| s.parse::<f64>().ok().and_then(serial_to_datetime).map(|dt| dt.date()))
}

fn parse_datetime(s: &str, pattern: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, pattern)
        .or_else(|_| NaiveDateTime::parse_from_str(s, DEFAULT_DATETIME_FORMAT))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, DEFAULT_DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .or_else(|| s.parse::<f64>().ok().and_then(serial_to_datetime))
}

/// Excel serial date (1900 system) to a timestamp.
///
/// Serial 1 is 1900-01-01. Serial 60 is the fictitious 1900-02-29, which
/// has no timestamp; later serials skip it.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(1.0..MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    let days = serial.trunc() as i64;
    if days == 60 {
        return None;
    }
    let adjusted = if days > 60 { days - 1 } else { days };
    let seconds = (serial.fract() * 86_400.0).round() as i64;
    NaiveDate::from_ymd_opt(1899, 12, 31)?
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::days(adjusted))?
        .checked_add_signed(Duration::seconds(seconds))
}
