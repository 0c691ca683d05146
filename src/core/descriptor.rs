//! Immutable per-resource-type declarations
//!
//! A [`ResourceDescriptor`] is built once at registration time through
//! [`ResourceDescriptorBuilder`] and then shared read-only (behind an `Arc`)
//! by every service instance of that resource type.
//!
//! ```rust,ignore
//! let descriptor = ResourceDescriptor::<Article>::builder()
//!     .attrs_for_index(&["title", "published"])
//!     .attrs_for_form(&["title", "body", "author"])
//!     .belongs_to("author", "author_id")
//!     .filter("title", FieldType::String, FilterKind::Contains)
//!     .orderable(&["title", "created_at"])
//!     .default_scope("unpublished", |a: &Article| !a.published)
//!     .scope("published", |a: &Article| a.published)
//!     .batch_action("destroy", DestroyAll)
//!     .build()?;
//! ```

use crate::core::batch::{AfterBatchAction, BatchHandler};
use crate::core::error::{AdminError, AdminResult};
use crate::core::field::FieldType;
use crate::core::query::{DEFAULT_MAX_PER_PAGE, DEFAULT_PER_PAGE, OrderSpec};
use crate::core::resource::Resource;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Predicate backing a named scope
pub type ScopeFn<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// How a filter value is matched against a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Equality on the typed value
    Exact,
    /// Case-insensitive substring (string fields only)
    Contains,
    /// Inclusive bounds written `min..max`, `min..` or `..max`
    Range,
    /// Comma-separated set of accepted values
    OneOf,
}

/// A filterable field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDecl {
    pub field: String,
    pub field_type: FieldType,
    pub kind: FilterKind,
}

/// A named, parameterless narrowing of the base collection
pub struct ScopeDecl<E> {
    pub name: String,
    pub default: bool,
    predicate: ScopeFn<E>,
}

impl<E> ScopeDecl<E> {
    pub fn matches(&self, record: &E) -> bool {
        (self.predicate)(record)
    }
}

/// A declared batch action and the handler that runs it
pub struct BatchActionDecl<E: Resource> {
    pub name: String,
    /// Offer the action only while one of these scopes is active
    pub only: Vec<String>,
    /// Never offer the action while one of these scopes is active
    pub except: Vec<String>,
    /// The UI should ask for confirmation before running it
    pub confirm: bool,
    handler: Arc<dyn BatchHandler<E>>,
}

impl<E: Resource> BatchActionDecl<E> {
    pub fn new(name: impl Into<String>, handler: impl BatchHandler<E> + 'static) -> Self {
        Self {
            name: name.into(),
            only: Vec::new(),
            except: Vec::new(),
            confirm: false,
            handler: Arc::new(handler),
        }
    }

    pub fn only(mut self, scopes: &[&str]) -> Self {
        self.only = scopes.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn except(mut self, scopes: &[&str]) -> Self {
        self.except = scopes.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn confirm(mut self) -> Self {
        self.confirm = true;
        self
    }

    pub fn handler(&self) -> &Arc<dyn BatchHandler<E>> {
        &self.handler
    }

    /// Whether the action is offered while `scope` is the active scope
    pub fn available_in(&self, scope: Option<&str>) -> bool {
        if !self.only.is_empty() {
            return scope.is_some_and(|s| self.only.iter().any(|o| o == s));
        }
        !scope.is_some_and(|s| self.except.iter().any(|e| e == s))
    }
}

/// `belongs_to` association: form attribute name and the field it writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    pub name: String,
    pub foreign_key: String,
}

/// Static metadata for one resource type
pub struct ResourceDescriptor<E: Resource> {
    attrs_for_index: Vec<String>,
    attrs_for_show: Vec<String>,
    attrs_for_form: Vec<String>,
    attrs_for_export: Vec<String>,
    filters: Vec<FilterDecl>,
    orderable: Vec<String>,
    default_order: Option<OrderSpec>,
    scopes: Vec<ScopeDecl<E>>,
    batch_actions: Vec<BatchActionDecl<E>>,
    associations: Vec<Association>,
    per_page: usize,
    max_per_page: usize,
    after_batch_action: Option<Arc<dyn AfterBatchAction<E>>>,
}

impl<E: Resource> ResourceDescriptor<E> {
    pub fn builder() -> ResourceDescriptorBuilder<E> {
        ResourceDescriptorBuilder::new()
    }

    pub fn resource_name(&self) -> &'static str {
        E::resource_name()
    }

    pub fn attrs_for_index(&self) -> &[String] {
        &self.attrs_for_index
    }

    pub fn attrs_for_show(&self) -> &[String] {
        &self.attrs_for_show
    }

    pub fn attrs_for_form(&self) -> &[String] {
        &self.attrs_for_form
    }

    pub fn attrs_for_export(&self) -> &[String] {
        &self.attrs_for_export
    }

    pub fn filters(&self) -> &[FilterDecl] {
        &self.filters
    }

    pub fn filter(&self, field: &str) -> Option<&FilterDecl> {
        self.filters.iter().find(|f| f.field == field)
    }

    pub fn orderable_fields(&self) -> &[String] {
        &self.orderable
    }

    pub fn is_orderable(&self, field: &str) -> bool {
        self.orderable.iter().any(|f| f == field)
    }

    pub fn default_order(&self) -> Option<&OrderSpec> {
        self.default_order.as_ref()
    }

    pub fn scopes(&self) -> &[ScopeDecl<E>] {
        &self.scopes
    }

    pub fn scope(&self, name: &str) -> Option<&ScopeDecl<E>> {
        self.scopes.iter().find(|s| s.name == name)
    }

    pub fn default_scope(&self) -> Option<&ScopeDecl<E>> {
        self.scopes.iter().find(|s| s.default)
    }

    pub fn batch_actions(&self) -> &[BatchActionDecl<E>] {
        &self.batch_actions
    }

    pub fn batch_action(&self, name: &str) -> Option<&BatchActionDecl<E>> {
        self.batch_actions.iter().find(|b| b.name == name)
    }

    /// Names of the batch actions offered while `scope` is active
    pub fn batch_actions_for_scope(&self, scope: Option<&str>) -> Vec<&str> {
        self.batch_actions
            .iter()
            .filter(|b| b.available_in(scope))
            .map(|b| b.name.as_str())
            .collect()
    }

    pub fn associations(&self) -> &[Association] {
        &self.associations
    }

    pub fn association(&self, name: &str) -> Option<&Association> {
        self.associations.iter().find(|a| a.name == name)
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    pub fn max_per_page(&self) -> usize {
        self.max_per_page
    }

    pub fn after_batch_action(&self) -> Option<&Arc<dyn AfterBatchAction<E>>> {
        self.after_batch_action.as_ref()
    }

    /// Copy with a different page size; used when configuration overrides it
    pub(crate) fn with_paging(mut self, per_page: Option<usize>, max_per_page: Option<usize>) -> Self {
        if let Some(max) = max_per_page {
            self.max_per_page = max.max(1);
        }
        if let Some(per_page) = per_page {
            self.per_page = per_page;
        }
        self.per_page = self.per_page.clamp(1, self.max_per_page);
        self
    }
}

impl<E: Resource> fmt::Debug for ResourceDescriptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDescriptor")
            .field("resource", &E::resource_name())
            .field("attrs_for_index", &self.attrs_for_index)
            .field("filters", &self.filters)
            .field("orderable", &self.orderable)
            .field(
                "scopes",
                &self.scopes.iter().map(|s| &s.name).collect::<Vec<_>>(),
            )
            .field(
                "batch_actions",
                &self.batch_actions.iter().map(|b| &b.name).collect::<Vec<_>>(),
            )
            .field("per_page", &self.per_page)
            .finish_non_exhaustive()
    }
}

/// Fluent builder for [`ResourceDescriptor`]
pub struct ResourceDescriptorBuilder<E: Resource> {
    inner: ResourceDescriptor<E>,
}

fn to_strings(attrs: &[&str]) -> Vec<String> {
    attrs.iter().map(|a| a.to_string()).collect()
}

impl<E: Resource> ResourceDescriptorBuilder<E> {
    pub fn new() -> Self {
        Self {
            inner: ResourceDescriptor {
                attrs_for_index: Vec::new(),
                attrs_for_show: Vec::new(),
                attrs_for_form: Vec::new(),
                attrs_for_export: Vec::new(),
                filters: Vec::new(),
                orderable: Vec::new(),
                default_order: None,
                scopes: Vec::new(),
                batch_actions: Vec::new(),
                associations: Vec::new(),
                per_page: DEFAULT_PER_PAGE,
                max_per_page: DEFAULT_MAX_PER_PAGE,
                after_batch_action: None,
            },
        }
    }

    pub fn attrs_for_index(mut self, attrs: &[&str]) -> Self {
        self.inner.attrs_for_index = to_strings(attrs);
        self
    }

    pub fn attrs_for_show(mut self, attrs: &[&str]) -> Self {
        self.inner.attrs_for_show = to_strings(attrs);
        self
    }

    pub fn attrs_for_form(mut self, attrs: &[&str]) -> Self {
        self.inner.attrs_for_form = to_strings(attrs);
        self
    }

    pub fn attrs_for_export(mut self, attrs: &[&str]) -> Self {
        self.inner.attrs_for_export = to_strings(attrs);
        self
    }

    pub fn filter(mut self, field: &str, field_type: FieldType, kind: FilterKind) -> Self {
        self.inner.filters.retain(|f| f.field != field);
        self.inner.filters.push(FilterDecl {
            field: field.to_string(),
            field_type,
            kind,
        });
        self
    }

    pub fn orderable(mut self, fields: &[&str]) -> Self {
        for field in fields {
            if !self.inner.is_orderable(field) {
                self.inner.orderable.push(field.to_string());
            }
        }
        self
    }

    pub fn default_order(mut self, order: OrderSpec) -> Self {
        self.inner.default_order = Some(order);
        self
    }

    pub fn scope<F>(self, name: &str, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.push_scope(name, false, Arc::new(predicate))
    }

    /// A scope applied whenever the request names none (or an unknown one)
    pub fn default_scope<F>(self, name: &str, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.push_scope(name, true, Arc::new(predicate))
    }

    fn push_scope(mut self, name: &str, default: bool, predicate: ScopeFn<E>) -> Self {
        self.inner.scopes.push(ScopeDecl {
            name: name.to_string(),
            default,
            predicate,
        });
        self
    }

    pub fn batch_action(self, name: &str, handler: impl BatchHandler<E> + 'static) -> Self {
        self.batch_action_decl(BatchActionDecl::new(name, handler))
    }

    pub fn batch_action_decl(mut self, decl: BatchActionDecl<E>) -> Self {
        self.inner.batch_actions.push(decl);
        self
    }

    pub fn belongs_to(mut self, name: &str, foreign_key: &str) -> Self {
        self.inner.associations.push(Association {
            name: name.to_string(),
            foreign_key: foreign_key.to_string(),
        });
        self
    }

    pub fn per_page(mut self, per_page: usize) -> Self {
        self.inner.per_page = per_page.max(1);
        self
    }

    pub fn max_per_page(mut self, max_per_page: usize) -> Self {
        self.inner.max_per_page = max_per_page.max(1);
        self
    }

    pub fn after_batch_action(mut self, hook: impl AfterBatchAction<E> + 'static) -> Self {
        self.inner.after_batch_action = Some(Arc::new(hook));
        self
    }

    /// Finish the declaration.
    ///
    /// Rejects duplicate scope or batch action names and more than one
    /// default scope.
    pub fn build(self) -> AdminResult<ResourceDescriptor<E>> {
        let descriptor = self.inner;
        let resource = E::resource_name();

        if descriptor.scopes.iter().filter(|s| s.default).count() > 1 {
            return Err(AdminError::Config {
                message: format!("{resource} declares more than one default scope"),
            });
        }
        if let Some(name) = first_duplicate(descriptor.scopes.iter().map(|s| s.name.as_str())) {
            return Err(AdminError::Config {
                message: format!("{resource} declares scope '{name}' twice"),
            });
        }
        if let Some(name) =
            first_duplicate(descriptor.batch_actions.iter().map(|b| b.name.as_str()))
        {
            return Err(AdminError::Config {
                message: format!("{resource} declares batch action '{name}' twice"),
            });
        }

        let mut descriptor = descriptor;
        descriptor.per_page = descriptor.per_page.min(descriptor.max_per_page);
        Ok(descriptor)
    }
}

impl<E: Resource> Default for ResourceDescriptorBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

fn first_duplicate<'a>(names: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut seen = Vec::new();
    for name in names {
        if seen.contains(&name) {
            return Some(name);
        }
        seen.push(name);
    }
    None
}
