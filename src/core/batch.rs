//! Batch actions over a set of selected records
//!
//! A batch request names an action and a list of ids. The dispatcher
//! resolves the action and authorizes it for the collection before looking
//! at the ids. It then loads the records, authorizes every one of them and
//! only then hands the whole set to the action's handler. A single denial
//! aborts the batch before anything is mutated.

use crate::core::auth::{AuthContext, AuthTarget, Authorizer};
use crate::core::descriptor::ResourceDescriptor;
use crate::core::error::{AdminError, AdminResult};
use crate::core::params::BatchRequest;
use crate::core::resource::{Attributes, Resource};
use crate::core::store::Store;
use async_trait::async_trait;
use serde::Serialize;

/// Runs a batch action over already-authorized records.
///
/// Returns whether the batch as a whole succeeded.
#[async_trait]
pub trait BatchHandler<E: Resource>: Send + Sync {
    async fn perform(&self, store: &dyn Store<E>, records: Vec<E>) -> anyhow::Result<bool>;
}

/// Supplies the redirect target after a successful batch action
pub trait AfterBatchAction<E: Resource>: Send + Sync {
    fn redirect_after(&self, action: &str, records: &[E]) -> Option<String>;
}

impl<E, F> AfterBatchAction<E> for F
where
    E: Resource,
    F: Fn(&str, &[E]) -> Option<String> + Send + Sync,
{
    fn redirect_after(&self, action: &str, records: &[E]) -> Option<String> {
        self(action, records)
    }
}

/// Deletes every selected record
#[derive(Debug, Clone, Copy, Default)]
pub struct DestroyAll;

#[async_trait]
impl<E: Resource> BatchHandler<E> for DestroyAll {
    async fn perform(&self, store: &dyn Store<E>, records: Vec<E>) -> anyhow::Result<bool> {
        for record in &records {
            if let Some(id) = record.id() {
                store.delete(id).await?;
            }
        }
        Ok(true)
    }
}

/// Assigns the same attributes to every selected record.
///
/// Nothing is written unless every record accepts the attributes and still
/// validates.
#[derive(Debug, Clone, Default)]
pub struct UpdateAll {
    attributes: Attributes,
}

impl UpdateAll {
    pub fn new(attributes: Attributes) -> Self {
        Self { attributes }
    }

    /// Convenience for a single attribute, e.g. `UpdateAll::set("published", true)`
    pub fn set(field: &str, value: impl Into<serde_json::Value>) -> Self {
        let mut attributes = Attributes::new();
        attributes.insert(field.to_string(), value.into());
        Self { attributes }
    }
}

#[async_trait]
impl<E: Resource> BatchHandler<E> for UpdateAll {
    async fn perform(&self, store: &dyn Store<E>, records: Vec<E>) -> anyhow::Result<bool> {
        let mut updated = Vec::with_capacity(records.len());
        for mut record in records {
            if record.assign_attributes(&self.attributes).is_err() || !record.validate().is_empty() {
                tracing::debug!(
                    resource = E::resource_name(),
                    id = ?record.id(),
                    "batch update rejected by record"
                );
                return Ok(false);
            }
            updated.push(record);
        }
        for record in updated {
            store.update(record).await?;
        }
        Ok(true)
    }
}

/// Summary of a performed batch action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub action: String,
    pub count: usize,
    pub ids: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

/// Result of a batch dispatch that did not fail outright
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatchOutcome {
    /// The id list was empty; nothing ran
    NoTargets { action: String },
    /// The handler reported failure
    Rejected { action: String },
    Performed(BatchReport),
}

impl BatchOutcome {
    pub fn is_performed(&self) -> bool {
        matches!(self, BatchOutcome::Performed(_))
    }
}

/// Resolves, authorizes and runs batch actions for one resource type
pub struct BatchDispatcher<'a, E: Resource> {
    descriptor: &'a ResourceDescriptor<E>,
    store: &'a dyn Store<E>,
}

impl<'a, E: Resource> BatchDispatcher<'a, E> {
    pub fn new(descriptor: &'a ResourceDescriptor<E>, store: &'a dyn Store<E>) -> Self {
        Self { descriptor, store }
    }

    pub async fn dispatch(
        &self,
        request: &BatchRequest,
        subject: &AuthContext,
        authorizer: Option<&dyn Authorizer<E>>,
    ) -> AdminResult<BatchOutcome> {
        let resource = E::resource_name();
        let Some(decl) = self.descriptor.batch_action(&request.action) else {
            return Err(AdminError::UnsupportedAction {
                resource: resource.to_string(),
                action: request.action.clone(),
            });
        };

        let auth_action = format!("batch_action_{}", decl.name);
        if let Some(authorizer) = authorizer {
            if !authorizer.authorize(subject, &auth_action, AuthTarget::Collection) {
                tracing::warn!(resource, action = auth_action.as_str(), "batch action denied");
                return Err(AdminError::forbidden(resource, &auth_action));
            }
        }

        if request.ids.is_empty() {
            tracing::debug!(resource, action = decl.name.as_str(), "batch action without targets");
            return Ok(BatchOutcome::NoTargets {
                action: decl.name.clone(),
            });
        }

        let records = self
            .store
            .find_many(&request.ids)
            .await
            .map_err(|e| AdminError::storage(resource, "find_many", e))?;

        if let Some(authorizer) = authorizer {
            if let Some(denied) = records
                .iter()
                .find(|r| !authorizer.authorize(subject, &auth_action, AuthTarget::Record(*r)))
            {
                tracing::warn!(
                    resource,
                    action = auth_action.as_str(),
                    id = ?denied.id(),
                    "batch action denied"
                );
                return Err(AdminError::forbidden(resource, &auth_action));
            }
        }

        let ids: Vec<i64> = records.iter().filter_map(|r| r.id()).collect();
        let count = records.len();

        let succeeded = decl
            .handler()
            .perform(self.store, records.clone())
            .await
            .map_err(|e| AdminError::storage(resource, &auth_action, e))?;

        if !succeeded {
            tracing::info!(resource, action = decl.name.as_str(), "batch action rejected");
            return Ok(BatchOutcome::Rejected {
                action: decl.name.clone(),
            });
        }

        let redirect = self
            .descriptor
            .after_batch_action()
            .and_then(|hook| hook.redirect_after(&decl.name, &records));

        tracing::info!(resource, action = decl.name.as_str(), count, "batch action performed");
        Ok(BatchOutcome::Performed(BatchReport {
            action: decl.name.clone(),
            count,
            ids,
            redirect,
        }))
    }
}
