//! Authorization for admin actions
//!
//! Three pieces:
//! - [`AuthContext`]: who is acting, extracted from the request by an
//!   [`AuthProvider`]
//! - [`AuthPolicy`]: declarative rules, usually loaded from configuration
//! - [`Authorizer`]: the capability consulted before every action, either
//!   policy based ([`PolicyAuthorizer`]) or a closure ([`FnAuthorizer`])
//!
//! Action names are `index`, `show`, `new`, `create`, `update`, `destroy`,
//! `export` and `batch_action_<name>`.

use crate::core::resource::Resource;
use axum::http::HeaderMap;
use std::collections::HashMap;
use std::marker::PhantomData;
use uuid::Uuid;

/// Header carrying an administrator id
pub const ADMIN_ID_HEADER: &str = "x-admin-id";
/// Header carrying a user id
pub const USER_ID_HEADER: &str = "x-user-id";
/// Comma-separated user roles
pub const USER_ROLES_HEADER: &str = "x-user-roles";
/// Name of a calling service
pub const SERVICE_NAME_HEADER: &str = "x-service-name";

/// The acting subject
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthContext {
    /// Authenticated user
    User { user_id: Uuid, roles: Vec<String> },

    /// Service-to-service communication
    Service { service_name: String },

    /// System administrator
    Admin { admin_id: Uuid },

    /// No authentication
    #[default]
    Anonymous,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        matches!(self, AuthContext::Admin { .. })
    }

    pub fn is_service(&self) -> bool {
        matches!(self, AuthContext::Service { .. })
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, AuthContext::Anonymous)
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            AuthContext::User { user_id, .. } => Some(*user_id),
            _ => None,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        match self {
            AuthContext::User { roles, .. } => roles.iter().any(|r| r == role),
            _ => false,
        }
    }
}

/// Authorization policy for an action
#[derive(Debug, Clone)]
pub enum AuthPolicy {
    /// Anyone, including anonymous subjects
    Public,

    /// Any non-anonymous subject
    Authenticated,

    /// User must have one of these roles
    HasRole(Vec<String>),

    ServiceOnly,

    AdminOnly,

    /// Nobody
    Deny,

    /// All must pass
    And(Vec<AuthPolicy>),

    /// Any may pass
    Or(Vec<AuthPolicy>),

    Custom(fn(&AuthContext) -> bool),
}

impl AuthPolicy {
    /// Check if auth context satisfies this policy
    pub fn check(&self, context: &AuthContext) -> bool {
        match self {
            AuthPolicy::Public => true,
            AuthPolicy::Authenticated => !context.is_anonymous(),
            AuthPolicy::HasRole(required) => required.iter().any(|r| context.has_role(r)),
            AuthPolicy::ServiceOnly => context.is_service(),
            AuthPolicy::AdminOnly => context.is_admin(),
            AuthPolicy::Deny => false,
            AuthPolicy::And(policies) => policies.iter().all(|p| p.check(context)),
            AuthPolicy::Or(policies) => policies.iter().any(|p| p.check(context)),
            AuthPolicy::Custom(f) => f(context),
        }
    }

    /// Parse policy from string (for YAML config).
    ///
    /// `role:a|b` accepts any listed role and `admin_or_role:a` also lets
    /// administrators through. Unknown strings mean `authenticated`.
    pub fn parse_policy(s: &str) -> Self {
        let s = s.trim();
        if let Some(roles) = s.strip_prefix("role:") {
            return AuthPolicy::HasRole(split_roles(roles));
        }
        if let Some(roles) = s.strip_prefix("admin_or_role:") {
            return AuthPolicy::Or(vec![
                AuthPolicy::AdminOnly,
                AuthPolicy::HasRole(split_roles(roles)),
            ]);
        }
        match s {
            "public" => AuthPolicy::Public,
            "authenticated" => AuthPolicy::Authenticated,
            "service_only" => AuthPolicy::ServiceOnly,
            "admin_only" => AuthPolicy::AdminOnly,
            "deny" => AuthPolicy::Deny,
            other => {
                tracing::debug!(policy = other, "unknown policy, using authenticated");
                AuthPolicy::Authenticated
            }
        }
    }
}

fn split_roles(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

/// What an action is aimed at
#[derive(Debug)]
pub enum AuthTarget<'a, E> {
    /// The resource type as a whole (index, new, create, export)
    Collection,
    /// One concrete record
    Record(&'a E),
}

impl<E> Clone for AuthTarget<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for AuthTarget<'_, E> {}

/// Capability answering "may `subject` perform `action` on `target`?"
pub trait Authorizer<E: Resource>: Send + Sync {
    fn authorize(&self, subject: &AuthContext, action: &str, target: AuthTarget<'_, E>) -> bool;
}

/// Per-action policy table.
///
/// Actions without an entry use the fallback policy, `authenticated` unless
/// set otherwise. A `batch_action` entry covers every `batch_action_<name>`
/// without its own entry.
#[derive(Debug, Clone)]
pub struct PolicyAuthorizer {
    policies: HashMap<String, AuthPolicy>,
    fallback: AuthPolicy,
}

impl PolicyAuthorizer {
    pub fn new() -> Self {
        Self {
            policies: HashMap::new(),
            fallback: AuthPolicy::Authenticated,
        }
    }

    pub fn policy(mut self, action: &str, policy: AuthPolicy) -> Self {
        self.policies.insert(action.to_string(), policy);
        self
    }

    pub fn fallback(mut self, policy: AuthPolicy) -> Self {
        self.fallback = policy;
        self
    }

    pub fn policy_for(&self, action: &str) -> &AuthPolicy {
        self.policies
            .get(action)
            .or_else(|| {
                action
                    .strip_prefix("batch_action_")
                    .and_then(|_| self.policies.get("batch_action"))
            })
            .unwrap_or(&self.fallback)
    }
}

impl Default for PolicyAuthorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Resource> Authorizer<E> for PolicyAuthorizer {
    fn authorize(&self, subject: &AuthContext, action: &str, _target: AuthTarget<'_, E>) -> bool {
        self.policy_for(action).check(subject)
    }
}

/// Authorizer backed by a closure, for record-level rules
pub struct FnAuthorizer<E, F> {
    check: F,
    _resource: PhantomData<fn(&E)>,
}

impl<E, F> FnAuthorizer<E, F>
where
    E: Resource,
    F: Fn(&AuthContext, &str, AuthTarget<'_, E>) -> bool + Send + Sync,
{
    pub fn new(check: F) -> Self {
        Self {
            check,
            _resource: PhantomData,
        }
    }
}

impl<E, F> Authorizer<E> for FnAuthorizer<E, F>
where
    E: Resource,
    F: Fn(&AuthContext, &str, AuthTarget<'_, E>) -> bool + Send + Sync,
{
    fn authorize(&self, subject: &AuthContext, action: &str, target: AuthTarget<'_, E>) -> bool {
        (self.check)(subject, action, target)
    }
}

/// Resolves the acting subject from request headers
pub trait AuthProvider: Send + Sync {
    fn extract_context(&self, headers: &HeaderMap) -> AuthContext;
}

/// Every request is anonymous (development default)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuthProvider;

impl AuthProvider for NoAuthProvider {
    fn extract_context(&self, _headers: &HeaderMap) -> AuthContext {
        AuthContext::Anonymous
    }
}

/// Trusts identity headers set by an upstream gateway.
///
/// Checked in order: [`ADMIN_ID_HEADER`], [`SERVICE_NAME_HEADER`], then
/// [`USER_ID_HEADER`] with [`USER_ROLES_HEADER`]. Malformed ids fall through
/// to anonymous.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderAuthProvider;

impl HeaderAuthProvider {
    fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    fn uuid(headers: &HeaderMap, name: &str) -> Option<Uuid> {
        let raw = Self::header(headers, name)?;
        match Uuid::parse_str(raw) {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::debug!(header = name, value = raw, "ignoring malformed identity header");
                None
            }
        }
    }
}

impl AuthProvider for HeaderAuthProvider {
    fn extract_context(&self, headers: &HeaderMap) -> AuthContext {
        if let Some(admin_id) = Self::uuid(headers, ADMIN_ID_HEADER) {
            return AuthContext::Admin { admin_id };
        }
        if let Some(service_name) = Self::header(headers, SERVICE_NAME_HEADER) {
            return AuthContext::Service {
                service_name: service_name.to_string(),
            };
        }
        if let Some(user_id) = Self::uuid(headers, USER_ID_HEADER) {
            let roles = Self::header(headers, USER_ROLES_HEADER)
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|r| !r.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            return AuthContext::User { user_id, roles };
        }
        AuthContext::Anonymous
    }
}
