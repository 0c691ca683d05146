//! AdminBuilder for fluent API to build HTTP servers

use super::controller::{ResourceController, ResourceEndpoint};
use super::exposure::{AdminState, RestExposure};
use super::registry::ResourceRegistry;
use crate::config::AdminConfig;
use crate::core::auth::{AuthProvider, NoAuthProvider};
use crate::core::descriptor::ResourceDescriptor;
use crate::core::error::AdminResult;
use crate::core::resource::Resource;
use crate::core::store::Store;
use anyhow::Result;
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builder for the admin HTTP application
///
/// # Example
///
/// ```ignore
/// let app = AdminBuilder::new()
///     .with_config_file("admin.yaml")?
///     .with_auth_provider(HeaderAuthProvider)
///     .register(article_descriptor()?, InMemoryStore::<Article>::new())
///     .build();
/// ```
pub struct AdminBuilder {
    registry: ResourceRegistry,
    config: AdminConfig,
    auth_provider: Arc<dyn AuthProvider>,
    custom_routes: Vec<Router>,
    cors: Option<CorsLayer>,
}

impl AdminBuilder {
    pub fn new() -> Self {
        Self {
            registry: ResourceRegistry::new(),
            config: AdminConfig::default(),
            auth_provider: Arc::new(NoAuthProvider),
            custom_routes: Vec::new(),
            cors: None,
        }
    }

    /// Merge a configuration into the builder's.
    ///
    /// Only resources registered afterwards pick it up.
    pub fn with_config(mut self, config: AdminConfig) -> Self {
        self.config = self.config.merge(config);
        self
    }

    pub fn with_config_file(self, path: impl AsRef<Path>) -> AdminResult<Self> {
        let config = AdminConfig::from_yaml_file(path)?;
        Ok(self.with_config(config))
    }

    /// How the acting subject is resolved from request headers
    pub fn with_auth_provider(mut self, provider: impl AuthProvider + 'static) -> Self {
        self.auth_provider = Arc::new(provider);
        self
    }

    /// Add routes that don't fit the resource pattern (login, webhooks, ...)
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Answer cross-origin requests, e.g. with `CorsLayer::permissive()`
    pub fn with_cors(mut self, cors: CorsLayer) -> Self {
        self.cors = Some(cors);
        self
    }

    /// Register a resource type.
    ///
    /// Page sizes and, when the resource's entry declares policies, a
    /// policy authorizer come from the configuration.
    pub fn register<E: Resource>(
        self,
        descriptor: ResourceDescriptor<E>,
        store: impl Store<E> + 'static,
    ) -> Self {
        let descriptor = self.config.apply(descriptor);
        let mut controller = ResourceController::new(descriptor, store);
        if let Some(authorizer) = self.config.policy_authorizer(E::resource_name()) {
            controller = controller.with_authorizer(authorizer);
        }
        self.register_endpoint(controller)
    }

    /// Register a fully assembled controller (or any other endpoint) as is
    pub fn register_endpoint(mut self, endpoint: impl ResourceEndpoint + 'static) -> Self {
        tracing::debug!(resource = endpoint.resource_name(), "registering resource");
        self.registry.register(Arc::new(endpoint));
        self
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Build the router with request tracing
    pub fn build(self) -> Router {
        let state = AdminState {
            registry: Arc::new(self.registry),
            auth_provider: self.auth_provider,
        };
        let mut app = RestExposure::build_router(state, self.custom_routes);
        if let Some(cors) = self.cors {
            app = app.layer(cors);
        }
        app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
    }

    /// Serve on `addr` until Ctrl+C or SIGTERM
    pub async fn serve(self, addr: &str) -> Result<()> {
        let resources = self.registry.resource_names().join(", ");
        let app = self.build();
        let listener = TcpListener::bind(addr).await?;

        tracing::info!(%addr, resources = resources.as_str(), "admin server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for AdminBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
