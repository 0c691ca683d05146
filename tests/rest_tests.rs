//! End-to-end tests for the REST exposure, driven through the router
//! without binding a socket.

mod common;

use admin::core::auth::{ADMIN_ID_HEADER, USER_ID_HEADER, USER_ROLES_HEADER};
use admin::prelude::*;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::*;
use tower::ServiceExt;
use uuid::Uuid;

fn app_with(store: InMemoryStore<Article>) -> Router {
    AdminBuilder::new()
        .register(article_descriptor(), store)
        .build()
}

fn app() -> Router {
    app_with(scenario_store())
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn send_json(app: Router, method: Method, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

fn item_titles(page: &Value) -> Vec<&str> {
    page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["title"].as_str().unwrap())
        .collect()
}

// =============================================================================
// Introspection
// =============================================================================

#[tokio::test]
async fn test_health() {
    let (status, body) = get(app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_resources_lists_metadata() {
    let (status, body) = get(app(), "/_resources").await;
    assert_eq!(status, StatusCode::OK);
    let article = &body["resources"][0];
    assert_eq!(article["resource"], "articles");
    assert_eq!(article["permitted"], json!(["title", "body", "published", "author_id"]));
    assert_eq!(article["scopes"], json!(["published", "drafts"]));
}

#[tokio::test]
async fn test_unknown_resource_is_404() {
    let (status, body) = get(app(), "/comments").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "UNKNOWN_RESOURCE");
}

// =============================================================================
// Index
// =============================================================================

#[tokio::test]
async fn test_index_envelope() {
    let (status, body) = get(app(), "/articles").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item_titles(&body), vec!["foo", "bar", "baz"]);
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["page"], 1);
    assert_eq!(body["columns"], json!(["title", "published"]));
    assert_eq!(body["batch_actions"], json!(["destroy", "publish"]));
}

#[tokio::test]
async fn test_index_with_refinement_params() {
    let uri = "/articles?scope=drafts&order%5Bfield%5D=title&order%5Bdirection%5D=desc";
    let (status, body) = get(app(), uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item_titles(&body), vec!["foo", "bar"]);
    assert_eq!(body["scope"], "drafts");
}

#[tokio::test]
async fn test_index_hides_batch_actions_excluded_from_scope() {
    let (_, body) = get(app(), "/articles?scope=published").await;
    assert_eq!(body["batch_actions"], json!(["destroy"]));
}

#[tokio::test]
async fn test_index_filter_and_paging() {
    let (_, body) = get(app(), "/articles?filter%5Btitle%5D=foo").await;
    assert_eq!(item_titles(&body), vec!["foo"]);

    let (_, body) = get(app(), "/articles?per_page=2&page=2").await;
    assert_eq!(item_titles(&body), vec!["baz"]);
    assert_eq!(body["pagination"]["total_pages"], 2);
}

#[tokio::test]
async fn test_index_tolerates_garbage_params() {
    let (status, body) = get(app(), "/articles?page=abc&per_page=-3&filter%5Bviews%5D=lots").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item_titles(&body).len(), 3);
}

// =============================================================================
// Show / new
// =============================================================================

#[tokio::test]
async fn test_show_by_id_and_slug() {
    let (status, body) = get(app(), "/articles/2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "bar");

    let (status, body) = get(app(), "/articles/baz-post").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 3);
}

#[tokio::test]
async fn test_show_missing_is_404() {
    let (status, body) = get(app(), "/articles/404").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "RESOURCE_NOT_FOUND");
}

#[tokio::test]
async fn test_new_returns_unsaved_entity() {
    let (status, body) = get(app(), "/articles/new").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], Value::Null);
    assert_eq!(body["title"], "");
}

// =============================================================================
// Create / update / destroy
// =============================================================================

#[tokio::test]
async fn test_create_nested_body() {
    let store = scenario_store();
    let body = json!({"article": {"title": "qux", "author_id": 7, "views": 999}});
    let (status, created) = send_json(app_with(store.clone()), Method::POST, "/articles", body).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["id"], 4);
    assert_eq!(created["author_id"], 7);
    // views is not a form attribute
    assert_eq!(created["views"], 0);
    assert_eq!(store.len().unwrap(), 4);
}

#[tokio::test]
async fn test_create_invalid_is_422() {
    let store = scenario_store();
    let (status, body) =
        send_json(app_with(store.clone()), Method::POST, "/articles", json!({"body": "x"})).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert_eq!(body["details"]["errors"]["title"], json!(["can't be blank"]));
    assert_eq!(store.len().unwrap(), 3);
}

#[tokio::test]
async fn test_create_malformed_json_is_400() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/articles")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_BODY");
}

#[tokio::test]
async fn test_update_patch() {
    let store = scenario_store();
    let (status, body) = send_json(
        app_with(store.clone()),
        Method::PATCH,
        "/articles/1",
        json!({"article": {"published": true}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["published"], true);
    assert!(store.find(1).await.unwrap().unwrap().published);
}

#[tokio::test]
async fn test_destroy_is_204() {
    let store = scenario_store();
    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/articles/2")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app_with(store.clone()), request).await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(store.find(2).await.unwrap().is_none());
}

// =============================================================================
// Batch actions
// =============================================================================

#[tokio::test]
async fn test_batch_destroy_through_update_route() {
    let store = scenario_store();
    let (status, body) = send_json(
        app_with(store.clone()),
        Method::PATCH,
        "/articles/1,2?batch_action=destroy",
        json!({}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "performed");
    assert_eq!(body["ids"], json!([1, 2]));
    assert_eq!(ids(&store.all().await.unwrap()), vec![3]);
}

#[tokio::test]
async fn test_unknown_batch_action_is_400() {
    let store = scenario_store();
    let (status, body) = send_json(
        app_with(store.clone()),
        Method::PATCH,
        "/articles/1,2?batch_action=archive",
        json!({}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "UNSUPPORTED_ACTION");
    assert_eq!(store.len().unwrap(), 3);
}

// =============================================================================
// Export
// =============================================================================

#[tokio::test]
async fn test_export_rows() {
    let (status, body) = get(app(), "/articles/export?scope=drafts&per_page=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["columns"], json!(["id", "title", "published"]));
    assert_eq!(body["rows"], json!([[1, "foo", false], [2, "bar", false]]));
}

// =============================================================================
// Authorization from configuration
// =============================================================================

fn guarded_app(store: InMemoryStore<Article>) -> Router {
    let config = AdminConfig::from_yaml_str(
        r#"
resources:
  - name: articles
    authorization:
      index: public
      show: public
      destroy: admin_only
      batch_action: role:editor
"#,
    )
    .unwrap();
    AdminBuilder::new()
        .with_config(config)
        .with_auth_provider(HeaderAuthProvider)
        .register(article_descriptor(), store)
        .build()
}

fn delete(uri: &str) -> axum::http::request::Builder {
    Request::builder().method(Method::DELETE).uri(uri)
}

#[tokio::test]
async fn test_public_actions_need_no_identity() {
    let (status, _) = get(guarded_app(scenario_store()), "/articles").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_destroy_requires_admin() {
    let store = scenario_store();

    let request = delete("/articles/1").body(Body::empty()).unwrap();
    let (status, body) = send(guarded_app(store.clone()), request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
    assert_eq!(store.len().unwrap(), 3);

    let request = delete("/articles/1")
        .header(ADMIN_ID_HEADER, Uuid::new_v4().to_string())
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(guarded_app(store.clone()), request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(store.len().unwrap(), 2);
}

#[tokio::test]
async fn test_batch_requires_role() {
    let store = scenario_store();
    let user = Uuid::new_v4().to_string();

    let request = Request::builder()
        .method(Method::PATCH)
        .uri("/articles/1,2?batch_action=publish")
        .header(USER_ID_HEADER, user.as_str())
        .header(USER_ROLES_HEADER, "viewer")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(guarded_app(store.clone()), request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let request = Request::builder()
        .method(Method::PATCH)
        .uri("/articles/1,2?batch_action=publish")
        .header(USER_ID_HEADER, user.as_str())
        .header(USER_ROLES_HEADER, "viewer, editor")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(guarded_app(store.clone()), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert!(store.all().await.unwrap().iter().all(|a| a.published));
}
