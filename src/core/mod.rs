//! Core module containing the resource abstraction, refinement pipeline and services

pub mod auth;
pub mod batch;
pub mod descriptor;
pub mod error;
pub mod field;
pub mod params;
pub mod pipeline;
pub mod query;
pub mod resource;
pub mod service;
pub mod store;
pub mod validation;

pub use auth::{
    AuthContext, AuthPolicy, AuthProvider, AuthTarget, Authorizer, FnAuthorizer,
    HeaderAuthProvider, NoAuthProvider, PolicyAuthorizer,
};
pub use batch::{
    AfterBatchAction, BatchDispatcher, BatchHandler, BatchOutcome, BatchReport, DestroyAll,
    UpdateAll,
};
pub use descriptor::{
    Association, BatchActionDecl, FilterDecl, FilterKind, ResourceDescriptor,
    ResourceDescriptorBuilder, ScopeDecl,
};
pub use error::{AdminError, AdminResult, ErrorResponse};
pub use field::{FieldFormat, FieldType, FieldValue};
pub use params::{BatchRequest, Params, parse_ids};
pub use pipeline::Relation;
pub use query::{Direction, OrderSpec, PageSpec, PaginationMeta, RefinementSpec, ResultSet};
pub use resource::{Attributes, Resource};
pub use service::{Export, Mutation, ResourceService};
pub use store::Store;
pub use validation::ValidationErrors;
