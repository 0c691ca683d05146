//! REST API exposure
//!
//! Builds an Axum `Router` over a [`ResourceRegistry`]:
//!
//! ```text
//! GET    /health
//! GET    /_resources                  registered resources and their metadata
//! GET    /{resource}                  refined, paginated listing
//! GET    /{resource}/new              unsaved entity for a form
//! GET    /{resource}/export           export rows (no pagination)
//! POST   /{resource}                  create (201, or 422 with errors)
//! GET    /{resource}/{id}             show (id or slug)
//! PUT    /{resource}/{id}             update, or batch action with ?batch_action=
//! PATCH  /{resource}/{id}             same as PUT
//! DELETE /{resource}/{id}             destroy (204)
//! ```
//!
//! For batch actions the `{id}` segment carries the comma-separated id list.

use crate::core::auth::{AuthContext, AuthProvider};
use crate::core::error::AdminError;
use crate::core::params::Params;
use crate::server::registry::ResourceRegistry;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::Arc;

/// Shared state of the REST handlers
#[derive(Clone)]
pub struct AdminState {
    pub registry: Arc<ResourceRegistry>,
    pub auth_provider: Arc<dyn AuthProvider>,
}

impl AdminState {
    fn subject(&self, headers: &HeaderMap) -> AuthContext {
        self.auth_provider.extract_context(headers)
    }
}

type HandlerResult<T> = Result<T, AdminError>;

/// REST API exposure implementation
pub struct RestExposure;

impl RestExposure {
    /// Build the REST router, merging any custom routes
    pub fn build_router(state: AdminState, custom_routes: Vec<Router>) -> Router {
        let resource_routes = Router::new()
            .route("/_resources", get(list_resources))
            .route("/{resource}", get(index).post(create))
            .route("/{resource}/new", get(new_resource))
            .route("/{resource}/export", get(export))
            .route(
                "/{resource}/{id}",
                get(show).put(update).patch(update).delete(destroy),
            )
            .with_state(state);

        let mut app = Self::health_routes().merge(resource_routes);
        for custom_router in custom_routes {
            app = app.merge(custom_router);
        }
        app
    }

    /// Build health check routes
    fn health_routes() -> Router {
        Router::new()
            .route("/health", get(Self::health_check))
            .route("/healthz", get(Self::health_check))
    }

    /// Health check endpoint handler
    async fn health_check() -> Json<Value> {
        Json(json!({
            "status": "ok",
            "service": env!("CARGO_PKG_NAME"),
        }))
    }
}

fn parse_body(body: &Bytes) -> HandlerResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_slice(body).map_err(|e| AdminError::InvalidBody {
        message: e.to_string(),
    })
}

async fn list_resources(State(state): State<AdminState>) -> Json<Value> {
    let resources: Vec<Value> = state
        .registry
        .resource_names()
        .into_iter()
        .filter_map(|name| state.registry.get(name).ok())
        .map(|endpoint| endpoint.metadata())
        .collect();
    Json(json!({ "resources": resources }))
}

async fn index(
    State(state): State<AdminState>,
    Path(resource): Path<String>,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
) -> HandlerResult<Json<Value>> {
    let endpoint = state.registry.get(&resource)?;
    let params: Params = query.into_iter().collect();
    let subject = state.subject(&headers);
    Ok(Json(endpoint.index(&subject, &params).await?))
}

async fn new_resource(
    State(state): State<AdminState>,
    Path(resource): Path<String>,
    headers: HeaderMap,
) -> HandlerResult<Json<Value>> {
    let endpoint = state.registry.get(&resource)?;
    let subject = state.subject(&headers);
    Ok(Json(endpoint.new_resource(&subject).await?))
}

async fn export(
    State(state): State<AdminState>,
    Path(resource): Path<String>,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
) -> HandlerResult<Json<Value>> {
    let endpoint = state.registry.get(&resource)?;
    let params: Params = query.into_iter().collect();
    let subject = state.subject(&headers);
    Ok(Json(endpoint.export(&subject, &params).await?))
}

async fn create(
    State(state): State<AdminState>,
    Path(resource): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> HandlerResult<impl IntoResponse> {
    let endpoint = state.registry.get(&resource)?;
    let body = parse_body(&body)?;
    let subject = state.subject(&headers);
    let created = endpoint.create(&subject, &body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn show(
    State(state): State<AdminState>,
    Path((resource, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> HandlerResult<Json<Value>> {
    let endpoint = state.registry.get(&resource)?;
    let subject = state.subject(&headers);
    Ok(Json(endpoint.show(&subject, &id).await?))
}

async fn update(
    State(state): State<AdminState>,
    Path((resource, id)): Path<(String, String)>,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
    body: Bytes,
) -> HandlerResult<Json<Value>> {
    let endpoint = state.registry.get(&resource)?;
    let mut params: Params = query.into_iter().collect();
    params.push("id", id.as_str());
    let body = parse_body(&body)?;
    let subject = state.subject(&headers);
    Ok(Json(endpoint.update(&subject, &id, &body, &params).await?))
}

async fn destroy(
    State(state): State<AdminState>,
    Path((resource, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> HandlerResult<StatusCode> {
    let endpoint = state.registry.get(&resource)?;
    let subject = state.subject(&headers);
    endpoint.destroy(&subject, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
