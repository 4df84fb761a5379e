/**
 * Authentication Routes
 * Admin login, token verification and the auth middleware
 */
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use bcrypt::verify;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::middleware::ValidatedJson;
use crate::db::models::UserRecord;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// ============================================================================
// Types
// ============================================================================

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

/// The authenticated admin, placed in request extensions by [`require_auth`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
}

impl TryFrom<Claims> for AuthUser {
    type Error = std::num::ParseIntError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        Ok(Self {
            id: claims.sub.parse()?,
            email: claims.email,
        })
    }
}

/// Whoever is calling: an admin, or nobody on a public route.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<AuthUser>);

impl Viewer {
    pub fn is_admin(&self) -> bool {
        self.0.is_some()
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<AuthUser>().cloned()))
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub expires_at: i64,
    pub user: AuthUser,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<AuthUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of a 401 from the auth middleware.
#[derive(Debug, Serialize, Deserialize)]
pub struct UnauthorizedResponse {
    pub error: String,
    pub message: String,
}

// ============================================================================
// Tokens
// ============================================================================

pub fn issue_token(
    secret: &str,
    ttl_hours: i64,
    user_id: i64,
    email: &str,
) -> Result<(String, i64), jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let exp = (now + Duration::hours(ttl_hours)).timestamp();

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp,
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok((token, exp))
}

/// Verify and decode a token, checking signature and expiry.
pub fn verify_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(token_data.claims)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, &'static str> {
    let token = extract_bearer_token(headers).ok_or("No authorization token provided")?;
    let claims = verify_token(&state.config.auth.jwt_secret, token).map_err(|e| {
        tracing::debug!("Token verification failed: {}", e);
        "Invalid or expired token"
    })?;
    AuthUser::try_from(claims).map_err(|_| "Invalid or expired token")
}

// ============================================================================
// Public routes
// ============================================================================

const CONTENT_RESOURCES: &[&str] = &[
    "personal-info",
    "hero",
    "about-cards",
    "skill-categories",
    "skills",
    "projects",
    "achievements",
    "contact-info",
    "social-links",
];

/// Routes reachable without a token. `*` matches exactly one path segment.
const PUBLIC_ROUTES: &[(&str, &str)] = &[
    ("GET", "/health"),
    ("GET", "/health/*"),
    ("POST", "/api/auth/login"),
    ("POST", "/api/auth/verify"),
    ("GET", "/api/portfolio"),
    ("GET", "/api/files"),
    ("GET", "/api/files/*"),
    ("GET", "/storage/files/*"),
];

fn matches_pattern(pattern: &str, path: &str) -> bool {
    let pattern: Vec<&str> = pattern.trim_end_matches('/').split('/').collect();
    let path: Vec<&str> = path.trim_end_matches('/').split('/').collect();
    pattern.len() == path.len()
        && pattern
            .iter()
            .zip(&path)
            .all(|(p, s)| (*p == "*" && !s.is_empty()) || p == s)
}

fn method_matches(allowed: &str, method: &Method) -> bool {
    allowed == method.as_str() || (allowed == "GET" && *method == Method::HEAD)
}

pub fn is_public(method: &Method, path: &str) -> bool {
    if *method == Method::OPTIONS {
        return true;
    }
    let fixed = PUBLIC_ROUTES
        .iter()
        .any(|(m, p)| method_matches(m, method) && matches_pattern(p, path));
    fixed
        || CONTENT_RESOURCES.iter().any(|resource| {
            let base = format!("/api/{}", resource);
            (method_matches("GET", method)
                && (matches_pattern(&base, path) || matches_pattern(&format!("{}/*", base), path)))
                || (*method == Method::POST && matches_pattern(&format!("{}/query", base), path))
        })
}

/// Auth middleware.
///
/// A valid bearer token attaches [`AuthUser`] on any route. Protected
/// routes without one get a 401; public routes continue anonymously.
pub async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let public = is_public(request.method(), request.uri().path());

    match authenticate(&state, request.headers()) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(_) if public => next.run(request).await,
        Err(message) => {
            tracing::warn!(
                method = %request.method(),
                path = %request.uri().path(),
                "Rejected unauthenticated request"
            );
            (
                StatusCode::UNAUTHORIZED,
                Json(UnauthorizedResponse {
                    error: "Unauthorized".to_string(),
                    message: message.to_string(),
                }),
            )
                .into_response()
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = sqlx::query_as::<_, UserRecord>(
        "SELECT id, email, password_hash, last_login, created_at, updated_at \
         FROM users WHERE LOWER(email) = LOWER($1)",
    )
    .bind(payload.email.trim())
    .fetch_optional(state.db.pool())
    .await
    .map_err(|e| {
        tracing::error!("Database error during login: {}", e);
        ApiError::from(e)
    })?;

    let Some(user) = user else {
        tracing::warn!("Login attempt for unknown user: {}", payload.email);
        return Err(ApiError::unauthorized("Invalid credentials"));
    };

    // bcrypt is CPU-bound; keep the async executor free.
    let password = payload.password;
    let hash = user.password_hash.clone();
    let password_ok = tokio::task::spawn_blocking(move || verify(&password, &hash).unwrap_or(false))
        .await
        .map_err(|e| ApiError::internal("Failed to verify credentials").reason(e.to_string()))?;

    if !password_ok {
        tracing::warn!("Failed login attempt for: {}", user.email);
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    if let Err(e) = sqlx::query("UPDATE users SET last_login = now(), updated_at = now() WHERE id = $1")
        .bind(user.id)
        .execute(state.db.pool())
        .await
    {
        tracing::error!("Failed to record last login for {}: {}", user.email, e);
    }

    let auth = &state.config.auth;
    let (token, expires_at) = issue_token(&auth.jwt_secret, auth.token_ttl_hours, user.id, &user.email)
        .map_err(|e| {
            tracing::error!("Failed to create access token: {}", e);
            ApiError::internal("Failed to create token")
        })?;

    tracing::info!("Successful login for user: {}", user.email);

    Ok(Json(LoginResponse {
        success: true,
        token,
        expires_at,
        user: AuthUser {
            id: user.id,
            email: user.email,
        },
    }))
}

/// POST /api/auth/verify
pub async fn verify_session(State(state): State<AppState>, headers: HeaderMap) -> Json<VerifyResponse> {
    match authenticate(&state, &headers) {
        Ok(user) => Json(VerifyResponse {
            success: true,
            is_valid: true,
            user: Some(user),
            error: None,
        }),
        Err(message) => Json(VerifyResponse {
            success: false,
            is_valid: false,
            user: None,
            error: Some(message.to_string()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::db::Database;
    use axum::body::Body;
    use axum::routing::{get, post};
    use axum::Router;
    use tower::ServiceExt;

    const SECRET: &str = "test-secret";

    fn state() -> AppState {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = SECRET.to_string();
        let db = Database::connect_lazy("postgres://postgres@127.0.0.1:1/none").unwrap();
        AppState::new(db, config)
    }

    async fn whoami(viewer: Viewer) -> Json<Option<AuthUser>> {
        Json(viewer.0)
    }

    fn app() -> Router {
        let state = state();
        Router::new()
            .route("/api/projects", get(whoami).post(whoami))
            .route("/api/auth/verify", post(verify_session))
            .layer(axum::middleware::from_fn_with_state(state.clone(), require_auth))
            .with_state(state)
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {}", token)
    }

    #[test]
    fn test_token_round_trip() {
        let (token, exp) = issue_token(SECRET, 1, 7, "admin@example.com").unwrap();
        let claims = verify_token(SECRET, &token).unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.email, "admin@example.com");
        assert_eq!(claims.exp, exp);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let (token, _) = issue_token("other-secret", 1, 7, "admin@example.com").unwrap();
        assert!(verify_token(SECRET, &token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let (token, _) = issue_token(SECRET, -2, 7, "admin@example.com").unwrap();
        assert!(verify_token(SECRET, &token).is_err());
    }

    #[test]
    fn test_public_route_matching() {
        assert!(is_public(&Method::GET, "/health"));
        assert!(is_public(&Method::GET, "/health/detailed"));
        assert!(is_public(&Method::GET, "/api/projects"));
        assert!(is_public(&Method::GET, "/api/projects/12"));
        assert!(is_public(&Method::HEAD, "/api/projects/12"));
        assert!(is_public(&Method::POST, "/api/projects/query"));
        assert!(is_public(&Method::GET, "/storage/files/a.png"));
        assert!(is_public(&Method::OPTIONS, "/api/projects/12"));

        assert!(!is_public(&Method::POST, "/api/projects"));
        assert!(!is_public(&Method::PUT, "/api/projects/12"));
        assert!(!is_public(&Method::DELETE, "/api/projects/12"));
        assert!(!is_public(&Method::GET, "/api/projects/12/extra"));
        assert!(!is_public(&Method::GET, "/api/dashboard/overview"));
        assert!(!is_public(&Method::POST, "/api/files/upload"));
    }

    #[tokio::test]
    async fn test_tampered_token_returns_401() {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

        let (token, _) = issue_token(SECRET, 1, 7, "admin@example.com").unwrap();
        let segments: Vec<&str> = token.split('.').collect();
        let mut claims: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segments[1]).unwrap()).unwrap();
        claims["sub"] = serde_json::json!("1");
        let forged = URL_SAFE_NO_PAD.encode(claims.to_string());
        let tampered = format!("{}.{}.{}", segments[0], forged, segments[2]);

        let req = axum::http::Request::post("/api/projects")
            .header("authorization", bearer(&tampered))
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: UnauthorizedResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.error, "Unauthorized");
    }

    #[tokio::test]
    async fn test_protected_route_without_token_returns_401() {
        let req = axum::http::Request::post("/api/projects")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_token_attaches_user() {
        let (token, _) = issue_token(SECRET, 1, 7, "admin@example.com").unwrap();
        let req = axum::http::Request::post("/api/projects")
            .header("authorization", bearer(&token))
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let user: Option<AuthUser> = serde_json::from_slice(&body).unwrap();
        assert_eq!(user.map(|u| u.id), Some(7));
    }

    #[tokio::test]
    async fn test_public_route_with_bad_token_is_anonymous() {
        let req = axum::http::Request::get("/api/projects")
            .header("authorization", "Bearer nonsense")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let user: Option<AuthUser> = serde_json::from_slice(&body).unwrap();
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn test_verify_reports_invalid_token() {
        let req = axum::http::Request::post("/api/auth/verify")
            .header("authorization", "Bearer nonsense")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: VerifyResponse = serde_json::from_slice(&body).unwrap();
        assert!(!body.is_valid);
    }
}
