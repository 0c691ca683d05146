//! The entity abstraction every administered type implements

use crate::core::field::FieldValue;
use crate::core::validation::ValidationErrors;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Untyped attribute map submitted for build/update
pub type Attributes = Map<String, Value>;

/// Base trait for all administered entities.
///
/// Field access and attribute assignment default to going through the serde
/// representation, so a plain `#[derive(Serialize, Deserialize, Default)]`
/// struct only has to provide names and identifier accessors. Types that
/// want cheaper field access can override [`Resource::field_value`].
///
/// ```rust,ignore
/// #[derive(Clone, Debug, Default, Serialize, Deserialize)]
/// struct Article {
///     id: Option<i64>,
///     title: String,
///     published: bool,
/// }
///
/// impl Resource for Article {
///     fn resource_name() -> &'static str { "articles" }
///     fn resource_name_singular() -> &'static str { "article" }
///     fn id(&self) -> Option<i64> { self.id }
///     fn set_id(&mut self, id: i64) { self.id = Some(id) }
/// }
/// ```
pub trait Resource: Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Whether [`Resource::slug`] identifies records (friendly lookups)
    const SLUGGED: bool = false;

    /// The plural resource name used as the registry key (e.g., "articles")
    fn resource_name() -> &'static str;

    /// The singular resource name (e.g., "article")
    fn resource_name_singular() -> &'static str;

    /// Key under which request bodies nest this resource's attributes
    fn param_key() -> &'static str {
        Self::resource_name_singular()
    }

    /// Identifier, absent until the entity has been persisted
    fn id(&self) -> Option<i64>;

    /// Set by the store when the entity is first persisted
    fn set_id(&mut self, id: i64);

    /// Human-readable unique key, when the type supports one
    fn slug(&self) -> Option<&str> {
        None
    }

    fn is_persisted(&self) -> bool {
        self.id().is_some()
    }

    /// Serialized form used for responses and default field access
    fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Get the value of a specific field by name
    fn field_value(&self, field: &str) -> Option<FieldValue> {
        if field == "id" {
            return Some(self.id().map_or(FieldValue::Null, FieldValue::Integer));
        }
        match self.to_json() {
            Value::Object(map) => map.get(field).map(FieldValue::from_json),
            _ => None,
        }
    }

    /// Apply submitted attributes.
    ///
    /// Each attribute is applied on its own; one that does not fit the field's
    /// type is reported as invalid and leaves the entity unchanged for that
    /// field. `id` is never assignable.
    fn assign_attributes(&mut self, attrs: &Attributes) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        for (key, value) in attrs {
            if key == "id" {
                continue;
            }
            let Value::Object(mut current) = self.to_json() else {
                errors.add(key.as_str(), "cannot be assigned");
                continue;
            };
            current.insert(key.clone(), value.clone());
            match serde_json::from_value::<Self>(Value::Object(current)) {
                Ok(mut updated) => {
                    if let Some(id) = self.id() {
                        updated.set_id(id);
                    }
                    *self = updated;
                }
                Err(_) => errors.add(key.as_str(), "is invalid"),
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Entity-level validation run before every save
    fn validate(&self) -> ValidationErrors {
        ValidationErrors::new()
    }
}
