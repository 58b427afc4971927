//! Authentication middleware
//!
//! Protects routes that require a bearer token.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use sha2::{Digest, Sha256};

use crate::AppState;
use crate::error::AppError;

fn extract_token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_owned())
}

/// Compare digests so the comparison time does not depend on how many
/// leading bytes of the token are right.
fn tokens_match(presented: &str, expected: &str) -> bool {
    Sha256::digest(presented.as_bytes()) == Sha256::digest(expected.as_bytes())
}

/// Look up a configured secret. An unset or blank secret is a server
/// misconfiguration, not a client error.
fn configured_secret<'a>(secret: Option<&'a str>, key: &str) -> Result<&'a str, AppError> {
    secret
        .map(str::trim)
        .filter(|secret| !secret.is_empty())
        .ok_or_else(|| AppError::Config(format!("{key} is not set")))
}

fn verify_bearer(headers: &HeaderMap, expected: &str) -> Result<(), AppError> {
    let token = extract_token_from_headers(headers).ok_or(AppError::Unauthorized)?;
    if !tokens_match(&token, expected) {
        tracing::warn!("Rejected request with invalid bearer token");
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

/// Middleware for the cron endpoint
///
/// # Usage
/// ```ignore
/// let cron_routes = Router::new()
///     .route("/check-overdue", ...)
///     .layer(middleware::from_fn_with_state(state, require_cron_secret));
/// ```
pub async fn require_cron_secret(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let secret = configured_secret(state.config.auth.cron_secret.as_deref(), "auth.cron_secret")?;
    verify_bearer(request.headers(), secret)?;
    Ok(next.run(request).await)
}

/// Middleware for the management API
pub async fn require_api_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let secret = configured_secret(state.config.auth.api_token.as_deref(), "auth.api_token")?;
    verify_bearer(request.headers(), secret)?;
    Ok(next.run(request).await)
}
