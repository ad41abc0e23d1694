use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use sqlx::{Arguments, mysql::MySqlArguments};

use crate::error::{AppError, AppResult};

/// A value bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    I64(i64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Null,
}

/// Collects values into MySQL arguments in placeholder order.
pub fn to_arguments(values: &[SqlValue]) -> MySqlArguments {
    let mut args = MySqlArguments::default();
    for value in values {
        match value {
            SqlValue::String(v) => args.add(v.clone()),
            SqlValue::U64(v) => args.add(*v),
            SqlValue::I64(v) => args.add(*v),
            SqlValue::F64(v) => args.add(*v),
            SqlValue::Bool(v) => args.add(*v),
            SqlValue::Date(v) => args.add(*v),
            SqlValue::DateTime(v) => args.add(*v),
            SqlValue::Null => args.add(None::<String>),
        }
    }
    args
}

/// What a column or filter accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueKind {
    /// Positive integer key.
    Id,
    Number,
    /// `YYYY-MM-DD`
    Date,
    Text,
    /// Text restricted to a fixed set of values.
    OneOf(&'static [&'static str]),
}

const MAX_TEXT_LEN: usize = 255;

impl ValueKind {
    /// Validates `value` for `field` and converts it to a bindable value.
    ///
    /// Numbers may arrive as JSON numbers or as numeric strings (query
    /// strings carry everything as text); anything else is rejected rather
    /// than coerced.
    pub fn coerce(&self, field: &str, value: &Value) -> AppResult<SqlValue> {
        match self {
            ValueKind::Id => {
                let id = match value {
                    Value::Number(n) => n.as_u64(),
                    Value::String(s) => s.trim().parse::<u64>().ok(),
                    _ => None,
                };
                match id {
                    Some(id) if id > 0 => Ok(SqlValue::U64(id)),
                    _ => Err(AppError::validation(format!("{field} must be a positive integer"))),
                }
            }
            ValueKind::Number => {
                let n = match value {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().parse::<f64>().ok(),
                    _ => None,
                };
                match n {
                    Some(n) if n.is_finite() => Ok(SqlValue::F64(n)),
                    _ => Err(AppError::validation(format!("{field} must be numeric"))),
                }
            }
            ValueKind::Date => value
                .as_str()
                .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
                .map(SqlValue::Date)
                .ok_or_else(|| AppError::validation(format!("{field} must be a date (YYYY-MM-DD)"))),
            ValueKind::Text => match value.as_str().map(str::trim) {
                Some(s) if !s.is_empty() && s.len() <= MAX_TEXT_LEN => {
                    Ok(SqlValue::String(s.to_string()))
                }
                _ => Err(AppError::validation(format!(
                    "{field} must be non-empty text of at most {MAX_TEXT_LEN} characters"
                ))),
            },
            ValueKind::OneOf(allowed) => match value.as_str().map(str::trim) {
                Some(s) if allowed.contains(&s) => Ok(SqlValue::String(s.to_string())),
                _ => Err(AppError::validation(format!(
                    "{field} must be one of: {}",
                    allowed.join(", ")
                ))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_accept_numbers_and_numeric_strings() {
        assert_eq!(ValueKind::Id.coerce("id", &json!(7)).unwrap(), SqlValue::U64(7));
        assert_eq!(ValueKind::Id.coerce("id", &json!(" 12 ")).unwrap(), SqlValue::U64(12));
        assert!(ValueKind::Id.coerce("id", &json!(0)).is_err());
        assert!(ValueKind::Id.coerce("id", &json!(-3)).is_err());
        assert!(ValueKind::Id.coerce("id", &json!("7; DROP TABLE kpi")).is_err());
    }

    #[test]
    fn numbers_are_not_coerced_from_garbage() {
        assert_eq!(ValueKind::Number.coerce("score", &json!("4.5")).unwrap(), SqlValue::F64(4.5));
        assert!(ValueKind::Number.coerce("score", &json!("abc")).is_err());
        assert!(ValueKind::Number.coerce("score", &json!(true)).is_err());
        assert!(ValueKind::Number.coerce("score", &json!("NaN")).is_err());
    }

    #[test]
    fn dates_must_be_iso() {
        let d = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        assert_eq!(ValueKind::Date.coerce("from", &json!("2026-01-31")).unwrap(), SqlValue::Date(d));
        assert!(ValueKind::Date.coerce("from", &json!("31/01/2026")).is_err());
        assert!(ValueKind::Date.coerce("from", &json!("2026-02-30")).is_err());
    }

    #[test]
    fn one_of_checks_membership() {
        let kind = ValueKind::OneOf(&["pending", "approved"]);
        assert!(kind.coerce("status", &json!("pending")).is_ok());
        assert!(kind.coerce("status", &json!("Pending")).is_err());
    }

    #[test]
    fn text_length_is_bounded() {
        assert!(ValueKind::Text.coerce("title", &json!("")).is_err());
        assert!(ValueKind::Text.coerce("title", &json!("x".repeat(256))).is_err());
        assert!(ValueKind::Text.coerce("title", &json!("Fire safety")).is_ok());
    }
}
