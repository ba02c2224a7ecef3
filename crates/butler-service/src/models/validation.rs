//! Request field validation.
//!
//! Request bodies are deserialized loosely (every field is an optional JSON
//! value) so that a missing or mistyped field is reported as a 422 field
//! error instead of a 400 parse failure. A [`Validator`] collects every
//! violation before the handler runs; `finish` turns them into
//! [`ButlerError::Validation`].

use crate::errors::ButlerError;
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum number of decimal places a price may carry.
pub const PRICE_DECIMAL_PLACES: usize = 2;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Collects field errors across one request body.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    fn reject(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Require a JSON string. Postgres `TEXT` cannot store NUL, so it is
    /// rejected here rather than at insert time.
    pub fn string(&mut self, field: &str, value: Option<&Value>) -> Option<String> {
        match value {
            None | Some(Value::Null) => {
                self.reject(field, "is required");
                None
            }
            Some(Value::String(s)) if s.contains('\0') => {
                self.reject(field, "must not contain NUL characters");
                None
            }
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                self.reject(field, "must be a string");
                None
            }
        }
    }

    /// Require a string of at least `min` characters.
    pub fn min_chars(&mut self, field: &str, value: Option<&Value>, min: usize) -> Option<String> {
        let s = self.string(field, value)?;
        if s.chars().count() < min {
            self.reject(field, format!("must be at least {min} characters"));
            return None;
        }
        Some(s)
    }

    /// Require a string of exactly `len` characters.
    pub fn exact_chars(&mut self, field: &str, value: Option<&Value>, len: usize) -> Option<String> {
        let s = self.string(field, value)?;
        if s.chars().count() != len {
            self.reject(field, format!("must be exactly {len} characters"));
            return None;
        }
        Some(s)
    }

    /// Require a string that is not blank.
    pub fn non_empty(&mut self, field: &str, value: Option<&Value>) -> Option<String> {
        let s = self.string(field, value)?;
        if s.trim().is_empty() {
            self.reject(field, "must not be empty");
            return None;
        }
        Some(s)
    }

    /// Require an email address. Returns it trimmed and lower-cased.
    pub fn email(&mut self, field: &str, value: Option<&Value>) -> Option<String> {
        let s = self.string(field, value)?;
        let normalized = s.trim().to_lowercase();
        if !is_plausible_email(&normalized) {
            self.reject(field, "must be a valid email address");
            return None;
        }
        Some(normalized)
    }

    /// Require an ISO-8601 date (`YYYY-MM-DD`) or RFC 3339 timestamp.
    pub fn iso_date(&mut self, field: &str, value: Option<&Value>) -> Option<String> {
        let s = self.string(field, value)?;
        let trimmed = s.trim();
        let valid = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").is_ok()
            || DateTime::parse_from_rfc3339(trimmed).is_ok();
        if !valid {
            self.reject(field, "must be an ISO 8601 date");
            return None;
        }
        Some(trimmed.to_string())
    }

    /// Require a non-negative currency amount; returns integer cents.
    ///
    /// Accepts a JSON number or a numeric string with at most
    /// [`PRICE_DECIMAL_PLACES`] decimals.
    pub fn price_cents(&mut self, field: &str, value: Option<&Value>) -> Option<i64> {
        let text = match value {
            None | Some(Value::Null) => {
                self.reject(field, "is required");
                return None;
            }
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.trim().to_string(),
            Some(_) => {
                self.reject(field, "must be a number");
                return None;
            }
        };

        match parse_cents(&text) {
            Ok(cents) => Some(cents),
            Err(message) => {
                self.reject(field, message);
                None
            }
        }
    }

    /// Fail with every collected error, if any.
    pub fn finish(self) -> Result<(), ButlerError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ButlerError::Validation(self.errors))
        }
    }
}

fn is_plausible_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

/// Parse a decimal amount such as `"12"`, `"12.5"` or `"12.50"` into cents.
fn parse_cents(text: &str) -> Result<i64, &'static str> {
    if text.starts_with('-') {
        return Err("must not be negative");
    }

    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (text, ""),
    };

    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if whole.is_empty()
        || !all_digits(whole)
        || !all_digits(fraction)
        || (text.contains('.') && fraction.is_empty())
    {
        return Err("must be a valid price");
    }

    if fraction.len() > PRICE_DECIMAL_PLACES {
        return Err("must have at most 2 decimal places");
    }

    let whole: i64 = whole.parse().map_err(|_| "must be a valid price")?;
    let fraction_cents: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().map_err(|_| "must be a valid price")? * 10,
        _ => fraction.parse().map_err(|_| "must be a valid price")?,
    };

    whole
        .checked_mul(100)
        .and_then(|cents| cents.checked_add(fraction_cents))
        .ok_or("must be a valid price")
}

/// Render integer cents as a decimal number (`1250` -> `12.5`).
pub fn cents_to_decimal(cents: i64) -> serde_json::Number {
    let exact = serde_json::Number::from(cents / 100);
    if cents % 100 == 0 {
        return exact;
    }
    #[allow(clippy::cast_precision_loss)]
    let as_float = cents as f64 / 100.0;
    serde_json::Number::from_f64(as_float).unwrap_or(exact)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use serde_json::json;

    fn errors_of(validator: Validator) -> Vec<FieldError> {
        match validator.finish() {
            Err(ButlerError::Validation(errors)) => errors,
            other => panic!("expected validation errors, got {other:?}"),
        }
    }

    #[test]
    fn test_min_chars_boundary() {
        let mut v = Validator::new();
        assert!(v
            .min_chars("description", Some(&json!("1234567")), 8)
            .is_none());
        assert_eq!(
            v.min_chars("description", Some(&json!("12345678")), 8),
            Some("12345678".to_string())
        );

        let errors = errors_of(v);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "description");
        assert_eq!(errors[0].message, "must be at least 8 characters");
    }

    #[test]
    fn test_min_chars_counts_characters_not_bytes() {
        let mut v = Validator::new();
        // five characters, ten bytes
        assert!(v.min_chars("name", Some(&json!("ñññññ")), 5).is_some());
        assert!(v.finish().is_ok());
    }

    #[test]
    fn test_missing_and_mistyped_fields() {
        let mut v = Validator::new();
        assert!(v.string("name", None).is_none());
        assert!(v.string("name", Some(&Value::Null)).is_none());
        assert!(v.string("description", Some(&json!(42))).is_none());

        let messages: Vec<String> = errors_of(v).into_iter().map(|e| e.message).collect();
        assert_eq!(
            messages,
            vec!["is required", "is required", "must be a string"]
        );
    }

    #[test]
    fn test_string_rejects_nul() {
        let mut v = Validator::new();
        assert!(v.string("name", Some(&json!("Brun\u{0}ch"))).is_none());
        assert!(v.min_chars("description", Some(&json!("Weekend\u{0}plates")), 8).is_none());

        let errors = errors_of(v);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "name");
        assert_eq!(errors[0].message, "must not contain NUL characters");
    }

    #[test]
    fn test_exact_chars() {
        let mut v = Validator::new();
        assert!(v.exact_chars("code", Some(&json!("123456")), 6).is_some());
        assert!(v.exact_chars("code", Some(&json!("12345")), 6).is_none());
        assert!(v.exact_chars("code", Some(&json!("1234567")), 6).is_none());
        assert_eq!(errors_of(v).len(), 2);
    }

    #[test]
    fn test_non_empty_rejects_blank() {
        let mut v = Validator::new();
        assert!(v.non_empty("gender", Some(&json!("   "))).is_none());
        assert!(v.non_empty("gender", Some(&json!("female"))).is_some());
        assert_eq!(errors_of(v)[0].message, "must not be empty");
    }

    #[test]
    fn test_email_is_normalized() {
        let mut v = Validator::new();
        assert_eq!(
            v.email("email", Some(&json!("  Chef.Anna@Example.COM "))),
            Some("chef.anna@example.com".to_string())
        );
        assert!(v.finish().is_ok());
    }

    #[test]
    fn test_email_rejects_malformed() {
        for bad in ["plainaddress", "@example.com", "a@b", "a@@b.com", "a b@c.com", "a@.com"] {
            let mut v = Validator::new();
            assert!(
                v.email("email", Some(&json!(bad))).is_none(),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_iso_date() {
        let mut v = Validator::new();
        assert!(v.iso_date("birthdate", Some(&json!("1990-04-23"))).is_some());
        assert!(v
            .iso_date("birthdate", Some(&json!("1990-04-23T10:00:00Z")))
            .is_some());
        assert!(v.iso_date("birthdate", Some(&json!("23/04/1990"))).is_none());
        assert!(v.iso_date("birthdate", Some(&json!("1990-13-01"))).is_none());
        assert_eq!(errors_of(v).len(), 2);
    }

    #[test]
    fn test_price_accepts_numbers_and_numeric_strings() {
        let mut v = Validator::new();
        assert_eq!(v.price_cents("price", Some(&json!(12))), Some(1200));
        assert_eq!(v.price_cents("price", Some(&json!(12.5))), Some(1250));
        assert_eq!(v.price_cents("price", Some(&json!(19.99))), Some(1999));
        assert_eq!(v.price_cents("price", Some(&json!("7.05"))), Some(705));
        assert_eq!(v.price_cents("price", Some(&json!("12.5"))), Some(1250));
        assert_eq!(v.price_cents("price", Some(&json!(" 0 "))), Some(0));
        assert!(v.finish().is_ok());
    }

    #[test]
    fn test_price_rejections() {
        let cases = [
            (json!(-1), "must not be negative"),
            (json!("-0.50"), "must not be negative"),
            (json!("12.345"), "must have at most 2 decimal places"),
            (json!("twelve"), "must be a valid price"),
            (json!("12."), "must be a valid price"),
            (json!(".5"), "must be a valid price"),
            (json!(true), "must be a number"),
        ];

        for (value, expected) in cases {
            let mut v = Validator::new();
            assert!(v.price_cents("price", Some(&value)).is_none());
            assert_eq!(errors_of(v)[0].message, expected, "for {value}");
        }
    }

    #[test]
    fn test_price_overflow_is_rejected() {
        let mut v = Validator::new();
        assert!(v
            .price_cents("price", Some(&json!("99999999999999999999")))
            .is_none());
        assert_eq!(errors_of(v)[0].message, "must be a valid price");
    }

    #[test]
    fn test_cents_to_decimal() {
        assert_eq!(json!(cents_to_decimal(1200)), json!(12));
        assert_eq!(json!(cents_to_decimal(1250)), json!(12.5));
        assert_eq!(json!(cents_to_decimal(1999)), json!(19.99));
        assert_eq!(json!(cents_to_decimal(0)), json!(0));
    }
}
