//! Field value types, typed parsing and comparison

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::OnceLock;
use uuid::Uuid;

/// A polymorphic field value that can hold different types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Uuid(Uuid),
    DateTime(DateTime<Utc>),
    Null,
}

impl FieldValue {
    /// Get the value as a string if possible
    pub fn as_string(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as an integer if possible
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the value as a UUID if possible
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            FieldValue::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Convert a JSON value read from a serialized entity.
    ///
    /// Arrays and objects are kept as their JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Boolean(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => n.as_f64().map_or(FieldValue::Null, FieldValue::Float),
            },
            Value::String(s) => FieldValue::String(s.clone()),
            other => FieldValue::String(other.to_string()),
        }
    }

    /// Text used for tabular output
    pub fn to_display_string(&self) -> String {
        match self {
            FieldValue::String(s) => s.clone(),
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::Boolean(b) => b.to_string(),
            FieldValue::Uuid(u) => u.to_string(),
            FieldValue::DateTime(dt) => dt.to_rfc3339(),
            FieldValue::Null => String::new(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            FieldValue::Null => 0,
            FieldValue::Boolean(_) => 1,
            FieldValue::Integer(_) | FieldValue::Float(_) => 2,
            FieldValue::String(_) => 3,
            FieldValue::Uuid(_) => 4,
            FieldValue::DateTime(_) => 5,
        }
    }

    /// Total ordering used for sorting and range checks.
    ///
    /// Nulls sort first. Integers and floats compare numerically. Values of
    /// unrelated kinds are ordered by kind so the ordering stays total.
    pub fn compare(&self, other: &FieldValue) -> Ordering {
        match (self, other) {
            (FieldValue::String(a), FieldValue::String(b)) => a.cmp(b),
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a.cmp(b),
            (FieldValue::Float(a), FieldValue::Float(b)) => a.total_cmp(b),
            (FieldValue::Integer(a), FieldValue::Float(b)) => (*a as f64).total_cmp(b),
            (FieldValue::Float(a), FieldValue::Integer(b)) => a.total_cmp(&(*b as f64)),
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => a.cmp(b),
            (FieldValue::Uuid(a), FieldValue::Uuid(b)) => a.cmp(b),
            (FieldValue::DateTime(a), FieldValue::DateTime(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Declared type of a filterable field.
///
/// Raw request values are parsed with it, and record values are coerced to
/// it before comparison (JSON carries UUIDs and timestamps as strings).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    Uuid,
    DateTime,
}

impl FieldType {
    /// Parse a raw request value. `None` when the text does not fit the type.
    pub fn parse(&self, raw: &str) -> Option<FieldValue> {
        let raw = raw.trim();
        match self {
            FieldType::String => Some(FieldValue::String(raw.to_string())),
            FieldType::Integer => raw.parse().ok().map(FieldValue::Integer),
            FieldType::Float => raw.parse().ok().map(FieldValue::Float),
            FieldType::Boolean => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "t" => Some(FieldValue::Boolean(true)),
                "false" | "0" | "no" | "f" => Some(FieldValue::Boolean(false)),
                _ => None,
            },
            FieldType::Uuid => Uuid::parse_str(raw).ok().map(FieldValue::Uuid),
            FieldType::DateTime => DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| FieldValue::DateTime(dt.with_timezone(&Utc))),
        }
    }

    /// Bring a record value to this type. Nulls stay null.
    pub fn coerce(&self, value: &FieldValue) -> Option<FieldValue> {
        match (self, value) {
            (_, FieldValue::Null) => Some(FieldValue::Null),
            (FieldType::String, FieldValue::String(_)) => Some(value.clone()),
            (FieldType::String, other) => Some(FieldValue::String(other.to_display_string())),
            (FieldType::Float, FieldValue::Integer(i)) => Some(FieldValue::Float(*i as f64)),
            (FieldType::Integer, FieldValue::Integer(_))
            | (FieldType::Float, FieldValue::Float(_))
            | (FieldType::Boolean, FieldValue::Boolean(_))
            | (FieldType::Uuid, FieldValue::Uuid(_))
            | (FieldType::DateTime, FieldValue::DateTime(_)) => Some(value.clone()),
            (_, FieldValue::String(s)) => self.parse(s),
            _ => None,
        }
    }
}

/// Field format validators for automatic validation
#[derive(Debug, Clone)]
pub enum FieldFormat {
    Email,
    Uuid,
    Url,
    Slug,
    Custom(Regex),
}

impl FieldFormat {
    /// Validate a field value against this format
    pub fn validate(&self, value: &FieldValue) -> bool {
        let Some(string_value) = value.as_string() else {
            return false;
        };

        match self {
            FieldFormat::Email => Self::matches(
                &EMAIL_REGEX,
                r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$",
                string_value,
            ),
            FieldFormat::Uuid => Uuid::parse_str(string_value).is_ok(),
            FieldFormat::Url => {
                Self::matches(&URL_REGEX, r"^https?://[^\s/$.?#].[^\s]*$", string_value)
            }
            FieldFormat::Slug => {
                Self::matches(&SLUG_REGEX, r"^[a-z0-9]+(?:-[a-z0-9]+)*$", string_value)
            }
            FieldFormat::Custom(regex) => regex.is_match(string_value),
        }
    }

    fn matches(cell: &'static OnceLock<Option<Regex>>, pattern: &str, value: &str) -> bool {
        cell.get_or_init(|| Regex::new(pattern).ok())
            .as_ref()
            .is_some_and(|regex| regex.is_match(value))
    }
}

static EMAIL_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
static URL_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
static SLUG_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
