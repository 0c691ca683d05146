//! Configuration loading and management
//!
//! ```yaml
//! default_per_page: 25
//! max_per_page: 100
//! resources:
//!   - name: articles
//!     per_page: 10
//!     authorization:
//!       index: public
//!       show: public
//!       destroy: admin_only
//!       batch_action: role:editor
//!     fallback_policy: authenticated
//! ```

use crate::core::auth::{AuthPolicy, PolicyAuthorizer};
use crate::core::descriptor::ResourceDescriptor;
use crate::core::error::{AdminError, AdminResult};
use crate::core::resource::Resource;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-resource settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Registry key (plural resource name)
    pub name: String,

    #[serde(default)]
    pub per_page: Option<usize>,

    /// Action name -> policy string (see [`AuthPolicy::parse_policy`])
    #[serde(default)]
    pub authorization: IndexMap<String, String>,

    /// Policy for actions missing from `authorization`
    #[serde(default)]
    pub fallback_policy: Option<String>,
}

/// Complete configuration for the admin layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub default_per_page: Option<usize>,

    #[serde(default)]
    pub max_per_page: Option<usize>,

    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
}

impl AdminConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> AdminResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| AdminError::Config {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> AdminResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> AdminResult<()> {
        if self.max_per_page == Some(0) || self.default_per_page == Some(0) {
            return Err(AdminError::Config {
                message: "page sizes must be positive".to_string(),
            });
        }
        if let Some(resource) = self.resources.iter().find(|r| r.per_page == Some(0)) {
            return Err(AdminError::Config {
                message: format!("per_page for {} must be positive", resource.name),
            });
        }
        if let Some(resource) = self.resources.iter().find(|r| r.name.trim().is_empty()) {
            return Err(AdminError::Config {
                message: format!("resource entry without a name: {resource:?}"),
            });
        }
        Ok(())
    }

    /// Merge another configuration into this one.
    ///
    /// Values set in `other` win; resources are matched by name and their
    /// policy maps are merged entry by entry.
    pub fn merge(mut self, other: AdminConfig) -> Self {
        if other.default_per_page.is_some() {
            self.default_per_page = other.default_per_page;
        }
        if other.max_per_page.is_some() {
            self.max_per_page = other.max_per_page;
        }

        for incoming in other.resources {
            match self.resources.iter_mut().find(|r| r.name == incoming.name) {
                Some(existing) => {
                    if incoming.per_page.is_some() {
                        existing.per_page = incoming.per_page;
                    }
                    if incoming.fallback_policy.is_some() {
                        existing.fallback_policy = incoming.fallback_policy;
                    }
                    existing.authorization.extend(incoming.authorization);
                }
                None => self.resources.push(incoming),
            }
        }
        self
    }

    pub fn resource(&self, name: &str) -> Option<&ResourceConfig> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Page size for a resource: its own entry, then the global default
    pub fn per_page_for(&self, name: &str) -> Option<usize> {
        self.resource(name)
            .and_then(|r| r.per_page)
            .or(self.default_per_page)
    }

    /// Policy authorizer for a resource, when its entry declares any policy
    pub fn policy_authorizer(&self, name: &str) -> Option<PolicyAuthorizer> {
        let resource = self.resource(name)?;
        if resource.authorization.is_empty() && resource.fallback_policy.is_none() {
            return None;
        }

        let mut authorizer = PolicyAuthorizer::new();
        for (action, policy) in &resource.authorization {
            authorizer = authorizer.policy(action, AuthPolicy::parse_policy(policy));
        }
        if let Some(fallback) = &resource.fallback_policy {
            authorizer = authorizer.fallback(AuthPolicy::parse_policy(fallback));
        }
        Some(authorizer)
    }

    /// Apply page-size settings to a descriptor
    pub fn apply<E: Resource>(&self, descriptor: ResourceDescriptor<E>) -> ResourceDescriptor<E> {
        descriptor.with_paging(self.per_page_for(E::resource_name()), self.max_per_page)
    }
}
