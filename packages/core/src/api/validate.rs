//! Explicit request-validation helpers.
//!
//! Request bodies arrive as raw `serde_json::Value` so that missing or
//! mistyped fields surface as 400 responses with per-field messages
//! instead of the framework's generic deserialization rejection. Each
//! helper records its failure in the shared [`FieldErrors`] map and
//! returns `None`; callers reject the request when the map is non-empty.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::error::{ApiError, FieldErrors};

pub(crate) fn require_string(
    body: &Value,
    field: &str,
    errors: &mut FieldErrors,
) -> Option<String> {
    match body.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::String(_)) => {
            errors.insert(field.to_string(), "may not be blank".to_string());
            None
        }
        Some(_) => {
            errors.insert(field.to_string(), "must be a string".to_string());
            None
        }
        None => {
            errors.insert(field.to_string(), "this field is required".to_string());
            None
        }
    }
}

pub(crate) fn require_int(body: &Value, field: &str, errors: &mut FieldErrors) -> Option<i64> {
    match body.get(field) {
        Some(value) => match value.as_i64() {
            Some(n) => Some(n),
            None => {
                errors.insert(field.to_string(), "must be an integer".to_string());
                None
            }
        },
        None => {
            errors.insert(field.to_string(), "this field is required".to_string());
            None
        }
    }
}

pub(crate) fn require_positive_int(
    body: &Value,
    field: &str,
    errors: &mut FieldErrors,
) -> Option<i64> {
    match body.get(field) {
        Some(value) => match value.as_i64() {
            Some(n) if n > 0 => Some(n),
            Some(_) | None => {
                errors.insert(field.to_string(), "must be a positive integer".to_string());
                None
            }
        },
        None => {
            errors.insert(field.to_string(), "this field is required".to_string());
            None
        }
    }
}

/// RFC 3339 timestamp, e.g. `2025-11-20T10:00:00Z`.
pub(crate) fn require_timestamp(
    body: &Value,
    field: &str,
    errors: &mut FieldErrors,
) -> Option<DateTime<Utc>> {
    match body.get(field).and_then(Value::as_str) {
        Some(raw) => match DateTime::parse_from_rfc3339(raw) {
            Ok(parsed) => Some(parsed.with_timezone(&Utc)),
            Err(_) => {
                errors.insert(
                    field.to_string(),
                    "must be an RFC 3339 timestamp".to_string(),
                );
                None
            }
        },
        None => {
            errors.insert(
                field.to_string(),
                "this field is required and must be an RFC 3339 timestamp".to_string(),
            );
            None
        }
    }
}

/// Optional boolean field: absent yields `None` with no error recorded;
/// present-but-not-boolean records a field error.
pub(crate) fn optional_bool(
    body: &Value,
    field: &str,
    errors: &mut FieldErrors,
) -> Option<bool> {
    match body.get(field) {
        None => None,
        Some(Value::Bool(b)) => Some(*b),
        Some(_) => {
            errors.insert(field.to_string(), "must be a boolean".to_string());
            None
        }
    }
}

/// Parse a `YYYY-MM-DD` query parameter.
pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        ApiError::bad_request(format!("invalid date '{}', expected YYYY-MM-DD", raw))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn require_string_rejects_blank_and_missing() {
        let mut errors = FieldErrors::new();
        assert!(require_string(&json!({"name": "  "}), "name", &mut errors).is_none());
        assert!(require_string(&json!({}), "name", &mut errors).is_none());
        assert!(require_string(&json!({"name": 3}), "name", &mut errors).is_none());
        assert_eq!(errors.len(), 1); // same field, last message wins
    }

    #[test]
    fn require_positive_int_rejects_zero_and_strings() {
        let mut errors = FieldErrors::new();
        assert_eq!(
            require_positive_int(&json!({"dosage_mg": 100}), "dosage_mg", &mut errors),
            Some(100)
        );
        assert!(require_positive_int(&json!({"dosage_mg": 0}), "dosage_mg", &mut errors).is_none());
        assert!(
            require_positive_int(&json!({"dosage_mg": "invalid"}), "dosage_mg", &mut errors)
                .is_none()
        );
    }

    #[test]
    fn require_timestamp_parses_rfc3339() {
        let mut errors = FieldErrors::new();
        let parsed = require_timestamp(
            &json!({"taken_at": "2025-11-20T10:00:00+00:00"}),
            "taken_at",
            &mut errors,
        );
        assert!(parsed.is_some());
        assert!(errors.is_empty());

        assert!(require_timestamp(&json!({"taken_at": "nope"}), "taken_at", &mut errors).is_none());
        assert!(!errors.is_empty());
    }

    #[test]
    fn parse_date_rejects_malformed() {
        assert!(parse_date("2025-11-20").is_ok());
        assert!(parse_date("invalid-date").is_err());
        assert!(parse_date("2025-13-40").is_err());
    }
}
