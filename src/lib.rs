//! # This-Admin
//!
//! A generic administration layer for building back-office REST APIs in Rust.
//!
//! ## Features
//!
//! - **Declarative resources**: index/show/form/export attributes, filters,
//!   orderable fields, scopes and batch actions declared once per type
//! - **Refinement pipeline**: scope → filter → order → paginate, tolerant of
//!   malformed request parameters
//! - **Batch actions**: per-record authorization before anything runs
//! - **Pluggable authorization**: policy tables from YAML or closures
//! - **Storage agnostic**: implement [`core::Store`] for any backend
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use admin::prelude::*;
//!
//! #[derive(Clone, Debug, Default, Serialize, Deserialize)]
//! struct Article {
//!     id: Option<i64>,
//!     title: String,
//!     published: bool,
//! }
//!
//! impl Resource for Article {
//!     fn resource_name() -> &'static str { "articles" }
//!     fn resource_name_singular() -> &'static str { "article" }
//!     fn id(&self) -> Option<i64> { self.id }
//!     fn set_id(&mut self, id: i64) { self.id = Some(id) }
//! }
//!
//! let descriptor = ResourceDescriptor::<Article>::builder()
//!     .attrs_for_index(&["title", "published"])
//!     .attrs_for_form(&["title", "published"])
//!     .filter("title", FieldType::String, FilterKind::Contains)
//!     .orderable(&["title"])
//!     .scope("published", |a: &Article| a.published)
//!     .batch_action("destroy", DestroyAll)
//!     .build()?;
//!
//! AdminBuilder::new()
//!     .register(descriptor, InMemoryStore::<Article>::new())
//!     .serve("127.0.0.1:3000")
//!     .await?;
//! ```

pub mod config;
pub mod core;
pub mod server;
pub mod storage;

/// Install a `tracing` subscriber honouring `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core Traits ===
    pub use crate::core::{
        auth::{
            AuthContext, AuthPolicy, AuthProvider, AuthTarget, Authorizer, FnAuthorizer,
            HeaderAuthProvider, NoAuthProvider, PolicyAuthorizer,
        },
        batch::{AfterBatchAction, BatchHandler, BatchOutcome, BatchReport, DestroyAll, UpdateAll},
        descriptor::{BatchActionDecl, FilterKind, ResourceDescriptor},
        error::{AdminError, AdminResult},
        field::{FieldFormat, FieldType, FieldValue},
        params::{BatchRequest, Params},
        query::{Direction, OrderSpec, PaginationMeta, RefinementSpec, ResultSet},
        resource::{Attributes, Resource},
        service::{Export, Mutation, ResourceService},
        store::Store,
        validation::{ValidationErrors, validators},
    };

    // === Configuration ===
    pub use crate::config::AdminConfig;

    // === Server ===
    pub use crate::server::{AdminBuilder, ResourceController, ResourceEndpoint, ResourceRegistry};

    // === Storage ===
    #[cfg(feature = "in-memory")]
    pub use crate::storage::InMemoryStore;

    // === External dependencies ===
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};
    pub use std::sync::Arc;
}
