//! Validation error collection and reusable field validators
//!
//! Entities report their own validation failures through
//! [`ValidationErrors`]; the resource service refuses to persist an entity
//! whose collection is not empty.

pub mod validators;

use crate::core::field::FieldValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Per-field validation messages, in the order the fields were checked
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: IndexMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Run a validator against a field value and record its message on failure
    pub fn check<V>(&mut self, field: &str, value: &FieldValue, validator: V)
    where
        V: Fn(&str, &FieldValue) -> Result<(), String>,
    {
        if let Err(message) = validator(field, value) {
            self.add(field, message);
        }
    }

    /// Append every message from `other`
    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.fields {
            self.fields.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields with at least one message
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Messages recorded for one field
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .map(|(field, messages)| (field.as_str(), messages.as_slice()))
    }

    /// Flattened `field message` strings, useful for logs
    pub fn full_messages(&self) -> Vec<String> {
        self.iter()
            .flat_map(|(field, messages)| messages.iter().map(move |m| format!("{field} {m}")))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_add_groups_by_field() {
        let mut errors = ValidationErrors::new();
        errors.add("title", "can't be blank");
        errors.add("title", "is too short");
        errors.add("body", "can't be blank");

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("title").map(<[String]>::len), Some(2));
        assert_eq!(
            errors.full_messages(),
            vec![
                "title can't be blank",
                "title is too short",
                "body can't be blank"
            ]
        );
    }

    #[test]
    fn test_check_records_only_failures() {
        let mut errors = ValidationErrors::new();
        errors.check("title", &FieldValue::Null, validators::required());
        errors.check(
            "body",
            &FieldValue::String("text".into()),
            validators::required(),
        );

        assert!(errors.get("title").is_some());
        assert!(errors.get("body").is_none());
    }

    #[test]
    fn test_serializes_as_map() {
        let mut errors = ValidationErrors::new();
        errors.add("title", "can't be blank");
        assert_eq!(
            serde_json::to_value(&errors).expect("serialize should succeed"),
            json!({"title": ["can't be blank"]})
        );
    }
}
