//! Generic controller adapter
//!
//! [`ResourceController`] wires one resource type's descriptor, store and
//! authorizer into the standard admin actions. Every call gets a fresh
//! [`ResourceService`] bound to the acting subject. The controller also
//! implements [`ResourceEndpoint`], the JSON-level interface the registry
//! and the REST exposure work with.

use crate::core::auth::{AuthContext, AuthTarget, Authorizer};
use crate::core::batch::BatchOutcome;
use crate::core::descriptor::ResourceDescriptor;
use crate::core::error::{AdminError, AdminResult};
use crate::core::params::{BatchRequest, Params};
use crate::core::query::ResultSet;
use crate::core::resource::{Attributes, Resource};
use crate::core::service::{Export, Mutation, ResourceService};
use crate::core::store::Store;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Controller for one resource type
pub struct ResourceController<E: Resource> {
    descriptor: Arc<ResourceDescriptor<E>>,
    store: Arc<dyn Store<E>>,
    authorizer: Option<Arc<dyn Authorizer<E>>>,
}

impl<E: Resource> ResourceController<E> {
    pub fn new(descriptor: ResourceDescriptor<E>, store: impl Store<E> + 'static) -> Self {
        Self::from_parts(Arc::new(descriptor), Arc::new(store))
    }

    pub fn from_parts(descriptor: Arc<ResourceDescriptor<E>>, store: Arc<dyn Store<E>>) -> Self {
        Self {
            descriptor,
            store,
            authorizer: None,
        }
    }

    /// Enable authorization checks. Without an authorizer every action is allowed.
    pub fn with_authorizer(mut self, authorizer: impl Authorizer<E> + 'static) -> Self {
        self.authorizer = Some(Arc::new(authorizer));
        self
    }

    pub fn has_authorizer(&self) -> bool {
        self.authorizer.is_some()
    }

    pub fn descriptor(&self) -> &ResourceDescriptor<E> {
        &self.descriptor
    }

    pub fn service(&self, subject: &AuthContext) -> ResourceService<E> {
        ResourceService::new(self.descriptor.clone(), self.store.clone()).with_subject(subject.clone())
    }

    fn authorize(
        &self,
        subject: &AuthContext,
        action: &str,
        target: AuthTarget<'_, E>,
    ) -> AdminResult<()> {
        let Some(authorizer) = &self.authorizer else {
            return Ok(());
        };
        if authorizer.authorize(subject, action, target) {
            return Ok(());
        }
        tracing::warn!(resource = E::resource_name(), action, "authorization denied");
        Err(AdminError::forbidden(E::resource_name(), action))
    }

    /// Form attributes with `belongs_to` associations replaced by their foreign keys
    pub fn permitted_attributes(&self) -> Vec<String> {
        self.descriptor
            .attrs_for_form()
            .iter()
            .map(|attr| match self.descriptor.association(attr) {
                Some(association) => association.foreign_key.clone(),
                None => attr.clone(),
            })
            .collect()
    }

    /// Extract the permitted attributes from a request body.
    ///
    /// Attributes may be nested under the param key or sent flat.
    pub fn permit(&self, body: &Value) -> AdminResult<Attributes> {
        let Value::Object(outer) = body else {
            return Err(AdminError::InvalidBody {
                message: format!("expected a JSON object for {}", E::param_key()),
            });
        };
        let submitted = match outer.get(E::param_key()) {
            Some(Value::Object(nested)) => nested,
            _ => outer,
        };

        let permitted = self.permitted_attributes();
        let mut attrs = Attributes::new();
        for (key, value) in submitted {
            if permitted.iter().any(|p| p == key) {
                attrs.insert(key.clone(), value.clone());
            } else {
                tracing::debug!(
                    resource = E::resource_name(),
                    attribute = key.as_str(),
                    "dropping unpermitted attribute"
                );
            }
        }
        Ok(attrs)
    }

    pub async fn index(&self, subject: &AuthContext, params: &Params) -> AdminResult<ResultSet<E>> {
        self.authorize(subject, "index", AuthTarget::Collection)?;
        self.service(subject).resources(&params.refinement()).await
    }

    pub async fn show(&self, subject: &AuthContext, key: &str) -> AdminResult<E> {
        let record = self.service(subject).find(key).await?;
        self.authorize(subject, "show", AuthTarget::Record(&record))?;
        Ok(record)
    }

    /// Unsaved entity for a new-record form
    pub async fn new_resource(&self, subject: &AuthContext, attrs: Option<&Attributes>) -> AdminResult<E> {
        self.authorize(subject, "new", AuthTarget::Collection)?;
        Ok(self.service(subject).build(attrs))
    }

    pub async fn create(&self, subject: &AuthContext, body: &Value) -> AdminResult<Mutation<E>> {
        self.authorize(subject, "create", AuthTarget::Collection)?;
        let attrs = self.permit(body)?;
        self.service(subject).create_from(&attrs).await
    }

    pub async fn update(&self, subject: &AuthContext, key: &str, body: &Value) -> AdminResult<Mutation<E>> {
        let service = self.service(subject);
        let record = service.find(key).await?;
        self.authorize(subject, "update", AuthTarget::Record(&record))?;
        let attrs = self.permit(body)?;
        service.update(record, &attrs).await
    }

    pub async fn destroy(&self, subject: &AuthContext, key: &str) -> AdminResult<()> {
        let service = self.service(subject);
        let record = service.find(key).await?;
        self.authorize(subject, "destroy", AuthTarget::Record(&record))?;
        service.destroy(&record).await
    }

    /// Batch action; authorization happens per record inside the dispatcher
    pub async fn batch(&self, subject: &AuthContext, request: &BatchRequest) -> AdminResult<BatchOutcome> {
        self.service(subject)
            .batch(request, self.authorizer.as_deref())
            .await
    }

    pub async fn export(&self, subject: &AuthContext, params: &Params) -> AdminResult<Export> {
        self.authorize(subject, "export", AuthTarget::Collection)?;
        self.service(subject).export(&params.refinement()).await
    }
}

/// Listing envelope returned by [`ResourceEndpoint::index`]
#[derive(Debug, Serialize)]
pub struct IndexPage<'a> {
    #[serde(flatten)]
    pub result: ResultSet<Value>,
    pub columns: &'a [String],
    pub batch_actions: Vec<&'a str>,
}

/// Type-erased, JSON-level view of a resource controller
#[async_trait]
pub trait ResourceEndpoint: Send + Sync {
    /// Registry key (plural resource name)
    fn resource_name(&self) -> &'static str;

    /// Declared attributes, filters, scopes and batch actions
    fn metadata(&self) -> Value;

    async fn index(&self, subject: &AuthContext, params: &Params) -> AdminResult<Value>;

    async fn show(&self, subject: &AuthContext, key: &str) -> AdminResult<Value>;

    async fn new_resource(&self, subject: &AuthContext) -> AdminResult<Value>;

    /// Create; validation failures surface as [`AdminError::ValidationFailed`]
    async fn create(&self, subject: &AuthContext, body: &Value) -> AdminResult<Value>;

    /// Update, or run a batch action when `params` carries one
    async fn update(
        &self,
        subject: &AuthContext,
        key: &str,
        body: &Value,
        params: &Params,
    ) -> AdminResult<Value>;

    async fn destroy(&self, subject: &AuthContext, key: &str) -> AdminResult<()>;

    async fn export(&self, subject: &AuthContext, params: &Params) -> AdminResult<Value>;
}

fn to_value<T: Serialize>(value: &T) -> AdminResult<Value> {
    serde_json::to_value(value).map_err(|e| AdminError::InvalidBody {
        message: e.to_string(),
    })
}

#[async_trait]
impl<E: Resource> ResourceEndpoint for ResourceController<E> {
    fn resource_name(&self) -> &'static str {
        E::resource_name()
    }

    fn metadata(&self) -> Value {
        let d = &self.descriptor;
        serde_json::json!({
            "resource": E::resource_name(),
            "param_key": E::param_key(),
            "attrs_for_index": d.attrs_for_index(),
            "attrs_for_show": d.attrs_for_show(),
            "attrs_for_form": d.attrs_for_form(),
            "attrs_for_export": d.attrs_for_export(),
            "permitted": self.permitted_attributes(),
            "filters": d.filters(),
            "orderable": d.orderable_fields(),
            "scopes": d.scopes().iter().map(|s| &s.name).collect::<Vec<_>>(),
            "default_scope": d.default_scope().map(|s| &s.name),
            "batch_actions": d.batch_actions().iter().map(|b| serde_json::json!({
                "name": b.name,
                "confirm": b.confirm,
                "only": b.only,
                "except": b.except,
            })).collect::<Vec<_>>(),
            "per_page": d.per_page(),
        })
    }

    async fn index(&self, subject: &AuthContext, params: &Params) -> AdminResult<Value> {
        let result = ResourceController::index(self, subject, params).await?;
        let batch_actions = self.descriptor.batch_actions_for_scope(result.scope.as_deref());
        let page = IndexPage {
            result: result.map(|r| r.to_json()),
            columns: self.descriptor.attrs_for_index(),
            batch_actions,
        };
        to_value(&page)
    }

    async fn show(&self, subject: &AuthContext, key: &str) -> AdminResult<Value> {
        Ok(ResourceController::show(self, subject, key).await?.to_json())
    }

    async fn new_resource(&self, subject: &AuthContext) -> AdminResult<Value> {
        Ok(ResourceController::new_resource(self, subject, None).await?.to_json())
    }

    async fn create(&self, subject: &AuthContext, body: &Value) -> AdminResult<Value> {
        let saved = ResourceController::create(self, subject, body).await?.into_result()?;
        Ok(saved.to_json())
    }

    async fn update(
        &self,
        subject: &AuthContext,
        key: &str,
        body: &Value,
        params: &Params,
    ) -> AdminResult<Value> {
        if let Some(request) = params.batch_request() {
            let outcome = self.batch(subject, &request).await?;
            return to_value(&outcome);
        }
        let saved = ResourceController::update(self, subject, key, body).await?.into_result()?;
        Ok(saved.to_json())
    }

    async fn destroy(&self, subject: &AuthContext, key: &str) -> AdminResult<()> {
        ResourceController::destroy(self, subject, key).await
    }

    async fn export(&self, subject: &AuthContext, params: &Params) -> AdminResult<Value> {
        let export = ResourceController::export(self, subject, params).await?;
        to_value(&export)
    }
}
