/*!
 * # Authentication and Authorization
 *
 * Bearer JWT authentication for the marketplace API:
 *
 * - `AuthService` issues and validates HS256 access tokens and keeps an
 *   in-memory revocation list for logged out tokens.
 * - `auth_middleware` is the single place a bearer token is turned into an
 *   `AuthUser` request extension.
 * - `role_middleware` restricts a router to a set of roles.
 * - `AuthRouterExt` composes both onto an axum `Router`.
 */

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entities::{user, Role};

pub mod password;

pub use password::{hash_password, verify_password, MIN_PASSWORD_LEN};

/// Claim structure for JWT access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,   // user id
    pub email: String,
    pub name: String,
    pub role: Role,
    pub jti: String,   // token id, used for revocation
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub iss: String,
    pub aud: String,
}

/// Authenticated caller, inserted into request extensions by `auth_middleware`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub token_id: String,
    pub expires_at: i64,
}

impl AuthUser {
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl TryFrom<Claims> for AuthUser {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        Ok(Self {
            user_id,
            email: claims.email,
            name: claims.name,
            role: claims.role,
            token_id: claims.jti,
            expires_at: claims.exp,
        })
    }
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub access_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_audience: String,
        jwt_issuer: String,
        access_token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_audience,
            jwt_issuer,
            access_token_expiration,
        }
    }
}

impl From<&AppConfig> for AuthConfig {
    fn from(config: &AppConfig) -> Self {
        Self::new(
            config.jwt_secret.clone(),
            config.auth_audience.clone(),
            config.auth_issuer.clone(),
            Duration::from_secs(config.jwt_expiration),
        )
    }
}

/// Access token handed back by register and login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccessToken {
    pub token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Lifetime in seconds
    pub expires_in: u64,
}

/// Issues and validates tokens. Revoked token ids are kept until their expiry.
/// Tokens of deactivated accounts are refused until the account is reactivated.
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    revoked_tokens: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
    blocked_users: Arc<RwLock<HashSet<Uuid>>>,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("issuer", &self.config.jwt_issuer)
            .field("audience", &self.config.jwt_audience)
            .field("access_token_expiration", &self.config.access_token_expiration)
            .finish_non_exhaustive()
    }
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
            revoked_tokens: Arc::new(RwLock::new(HashMap::new())),
            blocked_users: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn issue_token(&self, user: &user::Model) -> Result<AccessToken, AuthError> {
        let now = Utc::now();
        let lifetime = ChronoDuration::from_std(self.config.access_token_expiration)
            .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        Ok(AccessToken {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_expiration.as_secs(),
        })
    }

    pub async fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);
        validation.validate_nbf = true;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })?
            .claims;

        if self.is_revoked(&claims.jti).await {
            return Err(AuthError::RevokedToken);
        }
        if let Ok(user_id) = Uuid::parse_str(&claims.sub) {
            if self.blocked_users.read().await.contains(&user_id) {
                return Err(AuthError::RevokedToken);
            }
        }

        Ok(claims)
    }

    /// Revokes a token id until `expires_at` (unix seconds).
    pub async fn revoke(&self, token_id: &str, expires_at: i64) {
        let expiry = Utc
            .timestamp_opt(expires_at, 0)
            .single()
            .unwrap_or_else(Utc::now);

        let mut revoked = self.revoked_tokens.write().await;
        revoked.insert(token_id.to_string(), expiry);
        let now = Utc::now();
        revoked.retain(|_, expiry| *expiry > now);
        debug!(token_id, "token revoked");
    }

    /// Refuses every token of `user_id`, including ones already issued.
    pub async fn block_user(&self, user_id: Uuid) {
        self.blocked_users.write().await.insert(user_id);
        debug!(%user_id, "user tokens blocked");
    }

    pub async fn unblock_user(&self, user_id: Uuid) {
        self.blocked_users.write().await.remove(&user_id);
    }

    async fn is_revoked(&self, token_id: &str) -> bool {
        self.revoked_tokens.read().await.contains_key(token_id)
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    RevokedToken,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message): (StatusCode, &str, String) = match &self {
            Self::MissingAuth => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING",
                "Authentication required".to_string(),
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_TOKEN",
                "Invalid authentication token".to_string(),
            ),
            Self::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "AUTH_TOKEN_EXPIRED",
                "Token has expired".to_string(),
            ),
            Self::RevokedToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REVOKED_TOKEN",
                "Authentication token has been revoked".to_string(),
            ),
            Self::TokenCreation(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_TOKEN_CREATION_FAILED",
                "Could not issue token".to_string(),
            ),
            Self::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                "AUTH_INSUFFICIENT_PERMISSIONS",
                "Insufficient permissions".to_string(),
            ),
            Self::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        };

        let body = Json(serde_json::json!({
            "error": {
                "code": error_code,
                "message": error_message,
            },
            "message": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<AuthError> for crate::errors::ServiceError {
    fn from(err: AuthError) -> Self {
        use crate::errors::ServiceError;
        match err {
            AuthError::MissingAuth
            | AuthError::InvalidToken
            | AuthError::TokenExpired
            | AuthError::RevokedToken => ServiceError::Unauthorized(err.to_string()),
            AuthError::InsufficientPermissions => ServiceError::Forbidden(err.to_string()),
            AuthError::TokenCreation(msg) => ServiceError::JwtError(msg),
            AuthError::InternalError(msg) => ServiceError::InternalError(msg),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Validates the bearer token and inserts the caller as an `AuthUser` extension.
///
/// Expects an `Arc<AuthService>` extension installed by the outer router.
pub async fn auth_middleware(mut request: Request, next: Next) -> Result<Response, AuthError> {
    let auth_service = request
        .extensions()
        .get::<Arc<AuthService>>()
        .cloned()
        .ok_or_else(|| AuthError::InternalError("Authentication service not available".into()))?;

    let token = bearer_token(request.headers()).ok_or(AuthError::MissingAuth)?;
    let claims = auth_service.validate_token(token).await.map_err(|e| {
        warn!(error = %e, "rejected bearer token");
        e
    })?;
    let user = AuthUser::try_from(claims)?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Rejects callers whose role is not in the allowed set.
pub async fn role_middleware(
    State(allowed): State<Arc<[Role]>>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingAuth)?;

    if !user.has_any_role(&allowed) {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_roles(self, roles: &[Role]) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_roles(self, roles: &[Role]) -> Self {
        let allowed: Arc<[Role]> = Arc::from(roles);
        self.layer(axum::middleware::from_fn_with_state(allowed, role_middleware))
            .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::{body::Body, http::Request as HttpRequest, routing::get, Extension, Router};
    use tower::ServiceExt;

    fn service() -> AuthService {
        AuthService::new(AuthConfig::new(
            "unit_test_secret_with_enough_entropy_0123".into(),
            "iwanyu-clients".into(),
            "iwanyu-api".into(),
            Duration::from_secs(3600),
        ))
    }

    fn user(role: Role) -> user::Model {
        let now = Utc::now();
        user::Model {
            id: Uuid::new_v4(),
            name: "Aline".into(),
            email: "aline@iwanyu.com".into(),
            password_hash: String::new(),
            role,
            is_active: true,
            email_verified: false,
            phone: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn token_round_trip_carries_role() {
        let auth = service();
        let account = user(Role::Vendor);
        let issued = auth.issue_token(&account).unwrap();
        assert_eq!(issued.token_type, "Bearer");
        assert_eq!(issued.expires_in, 3600);

        let claims = auth.validate_token(&issued.token).await.unwrap();
        assert_eq!(claims.sub, account.id.to_string());
        assert_eq!(claims.role, Role::Vendor);
        assert_eq!(claims.aud, "iwanyu-clients");
    }

    #[tokio::test]
    async fn token_from_other_secret_is_rejected() {
        let other = AuthService::new(AuthConfig::new(
            "a_completely_different_secret_value_987".into(),
            "iwanyu-clients".into(),
            "iwanyu-api".into(),
            Duration::from_secs(3600),
        ));
        let issued = other.issue_token(&user(Role::Customer)).unwrap();
        assert_matches!(
            service().validate_token(&issued.token).await,
            Err(AuthError::InvalidToken)
        );
    }

    #[tokio::test]
    async fn blocked_user_tokens_are_refused_until_unblocked() {
        let auth = service();
        let account = user(Role::Customer);
        let issued = auth.issue_token(&account).unwrap();

        auth.block_user(account.id).await;
        assert_matches!(
            auth.validate_token(&issued.token).await,
            Err(AuthError::RevokedToken)
        );

        auth.unblock_user(account.id).await;
        assert!(auth.validate_token(&issued.token).await.is_ok());
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let rendered = format!("{:?}", service());
        assert!(rendered.contains("iwanyu-api"));
        assert!(!rendered.contains("unit_test_secret"));
    }

    #[tokio::test]
    async fn revoked_token_is_rejected() {
        let auth = service();
        let issued = auth.issue_token(&user(Role::Customer)).unwrap();
        let claims = auth.validate_token(&issued.token).await.unwrap();

        auth.revoke(&claims.jti, claims.exp).await;
        assert_matches!(
            auth.validate_token(&issued.token).await,
            Err(AuthError::RevokedToken)
        );
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert!(bearer_token(&headers).is_none());

        headers.insert(header::AUTHORIZATION, "bearer  tok123 ".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("tok123"));
    }

    async fn whoami(user: AuthUser) -> String {
        user.email
    }

    fn app(auth: Arc<AuthService>) -> Router {
        let admin = Router::new()
            .route("/admin", get(whoami))
            .with_roles(&[Role::Admin]);
        Router::new()
            .route("/me", get(whoami))
            .with_auth()
            .merge(admin)
            .layer(Extension(auth))
    }

    async fn call(app: Router, uri: &str, token: Option<&str>) -> StatusCode {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        app.oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn middleware_enforces_token_and_role() {
        let auth = Arc::new(service());
        let customer = auth.issue_token(&user(Role::Customer)).unwrap().token;
        let admin = auth.issue_token(&user(Role::Admin)).unwrap().token;

        assert_eq!(call(app(auth.clone()), "/me", None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(
            call(app(auth.clone()), "/me", Some("garbage")).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(call(app(auth.clone()), "/me", Some(&customer)).await, StatusCode::OK);
        assert_eq!(
            call(app(auth.clone()), "/admin", Some(&customer)).await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(call(app(auth), "/admin", Some(&admin)).await, StatusCode::OK);
    }
}
