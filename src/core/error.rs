//! Typed error handling for the admin layer
//!
//! Only four failures are meaningful to callers of the resource layer:
//! a record that does not resolve, a rejected validation, a denied
//! authorization and an unknown batch action. Everything else is
//! infrastructure (storage, configuration, malformed bodies).
//!
//! Malformed refinement input (unknown filter fields, bad order directions,
//! unparseable page numbers) is never an error: the pipeline degrades that
//! dimension to a no-op instead.
//!
//! # Example
//!
//! ```rust,ignore
//! match service.find("42").await {
//!     Ok(article) => render(article),
//!     Err(AdminError::NotFound { key, .. }) => println!("no article {key}"),
//!     Err(e) => eprintln!("other error: {e}"),
//! }
//! ```

use crate::core::validation::ValidationErrors;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Convenience alias used throughout the crate
pub type AdminResult<T> = Result<T, AdminError>;

/// The main error type of the admin layer
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    /// Identifier or slug did not resolve to a record
    #[error("{resource} '{key}' not found")]
    NotFound { resource: String, key: String },

    /// The entity's own validation rejected a create/update
    #[error("{resource} is invalid: {}", .errors.full_messages().join(", "))]
    ValidationFailed {
        resource: String,
        errors: ValidationErrors,
    },

    /// The authorization capability denied the action
    #[error("not authorized to {action} {resource}")]
    Forbidden { resource: String, action: String },

    /// Batch action name is not declared for the resource
    #[error("batch action '{action}' is not supported by {resource}")]
    UnsupportedAction { resource: String, action: String },

    /// No resource registered under the requested key
    #[error("unknown resource: {resource}")]
    UnknownResource { resource: String },

    /// Request body could not be used
    #[error("invalid request body: {message}")]
    InvalidBody { message: String },

    /// Configuration could not be loaded or applied
    #[error("configuration error: {message}")]
    Config { message: String },

    /// The underlying store failed
    #[error("storage error during {operation} on {resource}: {source}")]
    Storage {
        resource: String,
        operation: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AdminError {
    pub fn not_found(resource: &str, key: impl ToString) -> Self {
        AdminError::NotFound {
            resource: resource.to_string(),
            key: key.to_string(),
        }
    }

    pub fn forbidden(resource: &str, action: &str) -> Self {
        AdminError::Forbidden {
            resource: resource.to_string(),
            action: action.to_string(),
        }
    }

    pub fn storage(resource: &str, operation: &str, source: anyhow::Error) -> Self {
        AdminError::Storage {
            resource: resource.to_string(),
            operation: operation.to_string(),
            source,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AdminError::NotFound { .. } | AdminError::UnknownResource { .. } => {
                StatusCode::NOT_FOUND
            }
            AdminError::ValidationFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AdminError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AdminError::UnsupportedAction { .. } | AdminError::InvalidBody { .. } => {
                StatusCode::BAD_REQUEST
            }
            AdminError::Config { .. } | AdminError::Storage { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AdminError::NotFound { .. } => "RESOURCE_NOT_FOUND",
            AdminError::ValidationFailed { .. } => "VALIDATION_FAILED",
            AdminError::Forbidden { .. } => "FORBIDDEN",
            AdminError::UnsupportedAction { .. } => "UNSUPPORTED_ACTION",
            AdminError::UnknownResource { .. } => "UNKNOWN_RESOURCE",
            AdminError::InvalidBody { .. } => "INVALID_BODY",
            AdminError::Config { .. } => "CONFIG_ERROR",
            AdminError::Storage { .. } => "STORAGE_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AdminError::NotFound { resource, key } => Some(serde_json::json!({
                "resource": resource,
                "key": key,
            })),
            AdminError::ValidationFailed { errors, .. } => {
                Some(serde_json::json!({ "errors": errors }))
            }
            AdminError::UnsupportedAction { action, .. } => {
                Some(serde_json::json!({ "batch_action": action }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        if let AdminError::Storage { source, .. } = &self {
            tracing::error!(error = %source, "storage failure");
        }
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

impl From<serde_yaml::Error> for AdminError {
    fn from(err: serde_yaml::Error) -> Self {
        AdminError::Config {
            message: err.to_string(),
        }
    }
}
