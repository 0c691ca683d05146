//! Resource service: refined listing and CRUD for one resource type

use crate::core::auth::{AuthContext, Authorizer};
use crate::core::batch::{BatchDispatcher, BatchOutcome};
use crate::core::descriptor::ResourceDescriptor;
use crate::core::error::{AdminError, AdminResult};
use crate::core::field::FieldValue;
use crate::core::params::BatchRequest;
use crate::core::pipeline::{self, Relation};
use crate::core::query::{RefinementSpec, ResultSet};
use crate::core::resource::{Attributes, Resource};
use crate::core::store::Store;
use crate::core::validation::ValidationErrors;
use serde::Serialize;
use std::sync::Arc;

/// Outcome of a create or update
#[derive(Debug, Clone)]
pub enum Mutation<E> {
    /// Persisted; carries the stored entity
    Saved(E),
    /// Rejected by validation; nothing was written
    Invalid { resource: E, errors: ValidationErrors },
}

impl<E: Resource> Mutation<E> {
    pub fn is_success(&self) -> bool {
        matches!(self, Mutation::Saved(_))
    }

    /// The entity, saved or not
    pub fn resource(&self) -> &E {
        match self {
            Mutation::Saved(resource) | Mutation::Invalid { resource, .. } => resource,
        }
    }

    pub fn errors(&self) -> Option<&ValidationErrors> {
        match self {
            Mutation::Saved(_) => None,
            Mutation::Invalid { errors, .. } => Some(errors),
        }
    }

    /// Turn a rejected mutation into [`AdminError::ValidationFailed`]
    pub fn into_result(self) -> AdminResult<E> {
        match self {
            Mutation::Saved(resource) => Ok(resource),
            Mutation::Invalid { errors, .. } => Err(AdminError::ValidationFailed {
                resource: E::resource_name_singular().to_string(),
                errors,
            }),
        }
    }
}

/// Tabular projection of the refined collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Export {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<FieldValue>>,
}

impl Export {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Per-request service for one resource type.
///
/// Cheap to construct: the descriptor and store are shared.
pub struct ResourceService<E: Resource> {
    descriptor: Arc<ResourceDescriptor<E>>,
    store: Arc<dyn Store<E>>,
    subject: AuthContext,
}

impl<E: Resource> Clone for ResourceService<E> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            store: self.store.clone(),
            subject: self.subject.clone(),
        }
    }
}

impl<E: Resource> ResourceService<E> {
    pub fn new(descriptor: Arc<ResourceDescriptor<E>>, store: Arc<dyn Store<E>>) -> Self {
        Self {
            descriptor,
            store,
            subject: AuthContext::Anonymous,
        }
    }

    /// Same service acting on behalf of `subject`
    pub fn with_subject(mut self, subject: AuthContext) -> Self {
        self.subject = subject;
        self
    }

    pub fn subject(&self) -> &AuthContext {
        &self.subject
    }

    pub fn descriptor(&self) -> &ResourceDescriptor<E> {
        &self.descriptor
    }

    pub fn store(&self) -> &dyn Store<E> {
        self.store.as_ref()
    }

    /// The unrefined base collection
    pub async fn resources_relation(&self) -> AdminResult<Relation<E>> {
        self.store
            .all()
            .await
            .map(Relation::new)
            .map_err(|e| AdminError::storage(E::resource_name(), "all", e))
    }

    /// Scoped, filtered, ordered page of the collection
    pub async fn resources(&self, spec: &RefinementSpec) -> AdminResult<ResultSet<E>> {
        let relation = self.resources_relation().await?;
        let result = pipeline::refine(&self.descriptor, relation, spec);
        tracing::debug!(
            resource = E::resource_name(),
            scope = ?result.scope,
            total = result.pagination.total,
            page = result.pagination.page,
            "refined collection"
        );
        Ok(result)
    }

    /// Resolve a record by slug (when the type has them) or numeric id
    pub async fn find(&self, key: &str) -> AdminResult<E> {
        let resource = E::resource_name();
        let key = key.trim();

        if E::SLUGGED {
            let by_slug = self
                .store
                .find_by_slug(key)
                .await
                .map_err(|e| AdminError::storage(resource, "find_by_slug", e))?;
            if let Some(record) = by_slug {
                return Ok(record);
            }
        }

        let Ok(id) = key.parse::<i64>() else {
            return Err(AdminError::not_found(E::resource_name_singular(), key));
        };
        self.store
            .find(id)
            .await
            .map_err(|e| AdminError::storage(resource, "find", e))?
            .ok_or_else(|| AdminError::not_found(E::resource_name_singular(), key))
    }

    /// Unsaved entity with the given attributes applied.
    ///
    /// Attributes that do not fit their field are skipped.
    pub fn build(&self, attrs: Option<&Attributes>) -> E {
        let mut entity = E::default();
        if let Some(attrs) = attrs {
            if let Err(errors) = entity.assign_attributes(attrs) {
                tracing::debug!(
                    resource = E::resource_name(),
                    fields = ?errors.iter().map(|(f, _)| f).collect::<Vec<_>>(),
                    "skipped ill-typed attributes while building"
                );
            }
        }
        entity
    }

    /// Validate and persist a built entity
    pub async fn create(&self, entity: E) -> AdminResult<Mutation<E>> {
        let errors = entity.validate();
        if !errors.is_empty() {
            tracing::debug!(resource = E::resource_name(), errors = errors.len(), "create rejected");
            return Ok(Mutation::Invalid {
                resource: entity,
                errors,
            });
        }

        let saved = self
            .store
            .insert(entity)
            .await
            .map_err(|e| AdminError::storage(E::resource_name(), "insert", e))?;
        tracing::info!(resource = E::resource_name(), id = ?saved.id(), "created");
        Ok(Mutation::Saved(saved))
    }

    /// Build and create in one step; ill-typed attributes are reported as errors
    pub async fn create_from(&self, attrs: &Attributes) -> AdminResult<Mutation<E>> {
        let mut entity = E::default();
        let assign_errors = entity.assign_attributes(attrs).err();
        match assign_errors {
            Some(mut errors) => {
                errors.merge(entity.validate());
                Ok(Mutation::Invalid {
                    resource: entity,
                    errors,
                })
            }
            None => self.create(entity).await,
        }
    }

    /// Assign attributes, validate and persist
    pub async fn update(&self, mut entity: E, attrs: &Attributes) -> AdminResult<Mutation<E>> {
        let mut errors = entity.assign_attributes(attrs).err().unwrap_or_default();
        errors.merge(entity.validate());
        if !errors.is_empty() {
            tracing::debug!(
                resource = E::resource_name(),
                id = ?entity.id(),
                errors = errors.len(),
                "update rejected"
            );
            return Ok(Mutation::Invalid {
                resource: entity,
                errors,
            });
        }

        let saved = self
            .store
            .update(entity)
            .await
            .map_err(|e| AdminError::storage(E::resource_name(), "update", e))?;
        tracing::info!(resource = E::resource_name(), id = ?saved.id(), "updated");
        Ok(Mutation::Saved(saved))
    }

    /// Delete by identity
    pub async fn destroy(&self, entity: &E) -> AdminResult<()> {
        let Some(id) = entity.id() else {
            return Err(AdminError::not_found(E::resource_name_singular(), "unsaved"));
        };
        self.store
            .delete(id)
            .await
            .map_err(|e| AdminError::storage(E::resource_name(), "delete", e))?;
        tracing::info!(resource = E::resource_name(), id, "destroyed");
        Ok(())
    }

    /// Run a batch action as this service's subject
    pub async fn batch(
        &self,
        request: &BatchRequest,
        authorizer: Option<&dyn Authorizer<E>>,
    ) -> AdminResult<BatchOutcome> {
        BatchDispatcher::new(&self.descriptor, self.store.as_ref())
            .dispatch(request, &self.subject, authorizer)
            .await
    }

    /// Refined collection without pagination, projected to export columns
    pub async fn export(&self, spec: &RefinementSpec) -> AdminResult<Export> {
        let relation = self.resources_relation().await?;
        let (refined, _) = pipeline::refine_unpaginated(&self.descriptor, relation, spec);
        let columns = self.attrs_for_export().to_vec();
        let rows = refined
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|c| record.field_value(c).unwrap_or(FieldValue::Null))
                    .collect()
            })
            .collect();
        Ok(Export { columns, rows })
    }

    pub fn attrs_for_index(&self) -> &[String] {
        self.descriptor.attrs_for_index()
    }

    pub fn attrs_for_show(&self) -> &[String] {
        self.descriptor.attrs_for_show()
    }

    pub fn attrs_for_form(&self) -> &[String] {
        self.descriptor.attrs_for_form()
    }

    pub fn attrs_for_export(&self) -> &[String] {
        self.descriptor.attrs_for_export()
    }
}
