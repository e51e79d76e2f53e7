//! Optional role check in front of the table API
//!
//! The crate does not issue or verify credentials itself. The embedding
//! application supplies an [`Authenticator`] that maps a bearer token to the
//! current user, and [`AccessRules`] say which role reads and writes need.

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// User role, ordered by privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => formatter.write_str("user"),
            Role::Admin => formatter.write_str("admin"),
        }
    }
}

/// The user a request is made on behalf of
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: i64,
    pub role: Role,
}

/// Resolves bearer tokens to users
#[async_trait]
pub trait Authenticator: Send + Sync + 'static {
    /// The user owning `token`, or `None` if the token is invalid or expired
    async fn current_user(&self, token: &str) -> Option<CurrentUser>;
}

/// Minimum role for reading (GET/HEAD/OPTIONS) and for everything else
///
/// `None` leaves that class of request open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRules {
    pub read: Option<Role>,
    pub write: Option<Role>,
}

impl AccessRules {
    /// Any signed-in user may read; only admins may modify rows
    pub fn admin_writes() -> Self {
        Self {
            read: Some(Role::User),
            write: Some(Role::Admin),
        }
    }

    /// Role needed for a request method
    pub fn required_role(&self, method: &Method) -> Option<Role> {
        if method == Method::GET || method == Method::HEAD || method == Method::OPTIONS {
            self.read
        } else {
            self.write
        }
    }
}

/// Why a request was refused
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("Access denied. No token provided.")]
    MissingToken,

    #[error("Invalid token.")]
    InvalidToken,

    #[error("Access denied. {0} privileges required.")]
    InsufficientRole(Role),
}

impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        let status = match self {
            AccessError::MissingToken => StatusCode::UNAUTHORIZED,
            AccessError::InvalidToken | AccessError::InsufficientRole(_) => StatusCode::FORBIDDEN,
        };

        (
            status,
            Json(serde_json::json!({
                "error": self.to_string()
            })),
        )
            .into_response()
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Authenticator plus rules, shared by the access middleware
#[derive(Clone)]
pub struct AccessGuard {
    authenticator: Arc<dyn Authenticator>,
    rules: AccessRules,
}

impl AccessGuard {
    pub fn new(authenticator: Arc<dyn Authenticator>, rules: AccessRules) -> Self {
        Self { authenticator, rules }
    }

    pub fn rules(&self) -> AccessRules {
        self.rules
    }

    /// Check a request against the rules
    ///
    /// # Returns
    ///
    /// The authenticated user, or `None` when the request class is open
    pub async fn check(
        &self,
        method: &Method,
        headers: &HeaderMap,
    ) -> Result<Option<CurrentUser>, AccessError> {
        let Some(required) = self.rules.required_role(method) else {
            return Ok(None);
        };

        let token = bearer_token(headers).ok_or(AccessError::MissingToken)?;
        let user = self
            .authenticator
            .current_user(token)
            .await
            .ok_or(AccessError::InvalidToken)?;

        if user.role < required {
            return Err(AccessError::InsufficientRole(required));
        }
        Ok(Some(user))
    }
}

/// Middleware enforcing an [`AccessGuard`]
///
/// The authenticated user is stored in the request extensions.
pub async fn enforce_access(State(guard): State<AccessGuard>, mut request: Request, next: Next) -> Response {
    let outcome = guard.check(request.method(), request.headers()).await;
    match outcome {
        Ok(Some(user)) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(None) => next.run(request).await,
        Err(error) => {
            tracing::warn!(method = %request.method(), path = %request.uri().path(), %error, "request refused");
            error.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    struct FixedTokens;

    #[async_trait]
    impl Authenticator for FixedTokens {
        async fn current_user(&self, token: &str) -> Option<CurrentUser> {
            match token {
                "admin-token" => Some(CurrentUser { id: 1, role: Role::Admin }),
                "user-token" => Some(CurrentUser { id: 2, role: Role::User }),
                _ => None,
            }
        }
    }

    fn headers(authorization: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(authorization).unwrap());
        headers
    }

    fn guard() -> AccessGuard {
        AccessGuard::new(Arc::new(FixedTokens), AccessRules::admin_writes())
    }

    #[test]
    fn test_role_order() {
        assert!(Role::User < Role::Admin);
        assert_eq!(Role::Admin.to_string(), "admin");
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_required_role_by_method() {
        let rules = AccessRules::admin_writes();
        assert_eq!(rules.required_role(&Method::GET), Some(Role::User));
        assert_eq!(rules.required_role(&Method::DELETE), Some(Role::Admin));
        assert_eq!(rules.required_role(&Method::OPTIONS), Some(Role::User));
        assert_eq!(rules.required_role(&Method::PUT), Some(Role::Admin));
        assert_eq!(AccessRules::default().required_role(&Method::POST), None);
    }

    #[tokio::test]
    async fn test_check() {
        let guard = guard();

        assert_eq!(
            guard.check(&Method::GET, &HeaderMap::new()).await,
            Err(AccessError::MissingToken)
        );
        assert_eq!(
            guard.check(&Method::GET, &headers("Bearer nope")).await,
            Err(AccessError::InvalidToken)
        );
        assert_eq!(
            guard.check(&Method::PUT, &headers("Bearer user-token")).await,
            Err(AccessError::InsufficientRole(Role::Admin))
        );

        let user = guard
            .check(&Method::GET, &headers("Bearer user-token"))
            .await
            .unwrap();
        assert_eq!(user.map(|user| user.id), Some(2));

        let admin = guard
            .check(&Method::DELETE, &headers("Bearer admin-token"))
            .await
            .unwrap();
        assert_eq!(admin.map(|user| user.role), Some(Role::Admin));
    }

    #[tokio::test]
    async fn test_open_rules_skip_authentication() {
        let guard = AccessGuard::new(Arc::new(FixedTokens), AccessRules::default());
        assert_eq!(guard.check(&Method::POST, &HeaderMap::new()).await, Ok(None));
    }
}
