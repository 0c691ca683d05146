//! Reusable field validators
//!
//! Each validator is a closure taking the field name and its value. Validators
//! other than [`required`] let nulls through so they can be combined freely.

use crate::core::field::{FieldFormat, FieldValue};

/// Validator: field is present (not null, not a blank string)
pub fn required() -> impl Fn(&str, &FieldValue) -> Result<(), String> + Send + Sync + Clone {
    |_: &str, value: &FieldValue| match value {
        FieldValue::Null => Err("can't be blank".to_string()),
        FieldValue::String(s) if s.trim().is_empty() => Err("can't be blank".to_string()),
        _ => Ok(()),
    }
}

/// Validator: number must be positive
pub fn positive() -> impl Fn(&str, &FieldValue) -> Result<(), String> + Send + Sync + Clone {
    |_: &str, value: &FieldValue| {
        let num = match value {
            FieldValue::Integer(i) => *i as f64,
            FieldValue::Float(f) => *f,
            _ => return Ok(()),
        };
        if num <= 0.0 {
            Err(format!("must be greater than 0 (got {num})"))
        } else {
            Ok(())
        }
    }
}

/// Validator: string length must be within range
pub fn string_length(
    min: usize,
    max: usize,
) -> impl Fn(&str, &FieldValue) -> Result<(), String> + Send + Sync + Clone {
    move |_: &str, value: &FieldValue| {
        let Some(s) = value.as_string() else {
            return Ok(());
        };
        let len = s.chars().count();
        if len < min {
            Err(format!("is too short (minimum is {min} characters)"))
        } else if len > max {
            Err(format!("is too long (maximum is {max} characters)"))
        } else {
            Ok(())
        }
    }
}

/// Validator: value must be in allowed list
pub fn in_list(
    allowed: Vec<String>,
) -> impl Fn(&str, &FieldValue) -> Result<(), String> + Send + Sync + Clone {
    move |_: &str, value: &FieldValue| match value.as_string() {
        Some(s) if !allowed.iter().any(|a| a == s) => {
            Err(format!("is not included in the list ({})", allowed.join(", ")))
        }
        _ => Ok(()),
    }
}

/// Validator: string must match a format
pub fn format(
    format: FieldFormat,
) -> impl Fn(&str, &FieldValue) -> Result<(), String> + Send + Sync + Clone {
    move |_: &str, value: &FieldValue| {
        if value.is_null() || format.validate(value) {
            Ok(())
        } else {
            Err("is invalid".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(value: &str) -> FieldValue {
        FieldValue::String(value.to_string())
    }

    #[test]
    fn test_required_rejects_null_and_blank() {
        let v = required();
        assert!(v("title", &FieldValue::Null).is_err());
        assert!(v("title", &s("   ")).is_err());
        assert!(v("title", &s("foo")).is_ok());
        assert!(v("count", &FieldValue::Integer(0)).is_ok());
    }

    #[test]
    fn test_positive() {
        let v = positive();
        assert!(v("price", &FieldValue::Float(-5.0)).is_err());
        assert!(v("price", &FieldValue::Integer(0)).is_err());
        assert!(v("price", &FieldValue::Integer(3)).is_ok());
        assert!(v("name", &s("hello")).is_ok());
    }

    #[test]
    fn test_string_length_bounds() {
        let v = string_length(3, 5);
        let short = v("name", &s("ab")).unwrap_err();
        assert!(short.contains("minimum is 3"));
        let long = v("name", &s("abcdef")).unwrap_err();
        assert!(long.contains("maximum is 5"));
        assert!(v("name", &s("abc")).is_ok());
        assert!(v("name", &FieldValue::Null).is_ok());
    }

    #[test]
    fn test_in_list() {
        let v = in_list(vec!["draft".into(), "live".into()]);
        assert!(v("state", &s("draft")).is_ok());
        assert!(v("state", &s("gone")).is_err());
    }

    #[test]
    fn test_format_allows_null() {
        let v = format(FieldFormat::Email);
        assert!(v("email", &FieldValue::Null).is_ok());
        assert!(v("email", &s("nope")).is_err());
        assert!(v("email", &s("a@b.io")).is_ok());
    }
}
