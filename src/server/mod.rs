//! Server module: controllers, registry and HTTP exposure
//!
//! This module provides an `AdminBuilder` that registers:
//! - one [`ResourceController`] per administered resource type
//! - the REST routes over all registered resources
//! - health and introspection routes

pub mod builder;
pub mod controller;
pub mod exposure;
pub mod registry;

pub use builder::AdminBuilder;
pub use controller::{IndexPage, ResourceController, ResourceEndpoint};
pub use exposure::{AdminState, RestExposure};
pub use registry::ResourceRegistry;
