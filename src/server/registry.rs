//! Resource registry: maps resource keys to their endpoints

use super::controller::ResourceEndpoint;
use crate::core::error::{AdminError, AdminResult};
use indexmap::IndexMap;
use std::sync::Arc;

/// Registry for all administered resources
///
/// Populated at startup, then shared read-only by the exposure layer.
#[derive(Default, Clone)]
pub struct ResourceRegistry {
    endpoints: IndexMap<String, Arc<dyn ResourceEndpoint>>,
}

impl ResourceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an endpoint under its resource name.
    ///
    /// A second registration for the same name replaces the first.
    pub fn register(&mut self, endpoint: Arc<dyn ResourceEndpoint>) {
        let name = endpoint.resource_name().to_string();
        if self.endpoints.insert(name.clone(), endpoint).is_some() {
            tracing::warn!(resource = name.as_str(), "replacing registered resource");
        }
    }

    /// Look up a resource by key
    pub fn get(&self, name: &str) -> AdminResult<Arc<dyn ResourceEndpoint>> {
        self.endpoints
            .get(name)
            .cloned()
            .ok_or_else(|| AdminError::UnknownResource {
                resource: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.endpoints.contains_key(name)
    }

    /// Registered resource names, in registration order
    pub fn resource_names(&self) -> Vec<&str> {
        self.endpoints.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::AuthContext;
    use crate::core::params::Params;
    use async_trait::async_trait;
    use serde_json::{Value, json};

    /// Minimal endpoint for registry tests
    struct StubEndpoint(&'static str);

    #[async_trait]
    impl ResourceEndpoint for StubEndpoint {
        fn resource_name(&self) -> &'static str {
            self.0
        }

        fn metadata(&self) -> Value {
            json!({ "resource": self.0 })
        }

        async fn index(&self, _: &AuthContext, _: &Params) -> AdminResult<Value> {
            Ok(json!([]))
        }

        async fn show(&self, _: &AuthContext, key: &str) -> AdminResult<Value> {
            Err(AdminError::not_found(self.0, key))
        }

        async fn new_resource(&self, _: &AuthContext) -> AdminResult<Value> {
            Ok(json!({}))
        }

        async fn create(&self, _: &AuthContext, body: &Value) -> AdminResult<Value> {
            Ok(body.clone())
        }

        async fn update(&self, _: &AuthContext, _: &str, body: &Value, _: &Params) -> AdminResult<Value> {
            Ok(body.clone())
        }

        async fn destroy(&self, _: &AuthContext, _: &str) -> AdminResult<()> {
            Ok(())
        }

        async fn export(&self, _: &AuthContext, _: &Params) -> AdminResult<Value> {
            Ok(json!({"columns": [], "rows": []}))
        }
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry = ResourceRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.resource_names().is_empty());
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ResourceRegistry::new();
        registry.register(Arc::new(StubEndpoint("articles")));
        registry.register(Arc::new(StubEndpoint("authors")));

        assert_eq!(registry.resource_names(), vec!["articles", "authors"]);
        assert!(registry.contains("authors"));
        assert_eq!(registry.get("articles").unwrap().resource_name(), "articles");
    }

    #[test]
    fn test_unknown_resource() {
        let registry = ResourceRegistry::new();
        let err = registry.get("ghosts").err().unwrap();
        assert!(matches!(err, AdminError::UnknownResource { .. }));
    }

    #[test]
    fn test_register_duplicate_replaces() {
        let mut registry = ResourceRegistry::new();
        registry.register(Arc::new(StubEndpoint("articles")));
        registry.register(Arc::new(StubEndpoint("articles")));
        assert_eq!(registry.len(), 1);
    }
}
