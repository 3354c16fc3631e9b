use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::Engine as _;
use sha2::{Digest, Sha256};

use crate::config::AdminCredentials;
use crate::state::AppState;

/// Hex SHA-256 of a password, the form stored in `ADMIN_PASSWORD_HASH`.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Decode an `Authorization: Basic ...` header into (username, password).
pub fn parse_basic(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

/// Check a username/password pair against the configured admin.
pub fn verify(admin: &AdminCredentials, username: &str, password: &str) -> bool {
    let user_ok = constant_time_eq(admin.username.as_bytes(), username.as_bytes());
    let pass_ok = constant_time_eq(
        admin.password_sha256.as_bytes(),
        hash_password(password).as_bytes(),
    );
    user_ok & pass_ok
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Middleware guarding the admin routes with HTTP Basic auth.
pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(admin) = state.config.admin.as_ref() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            "Admin access is not configured".to_string(),
        )
            .into_response();
    };

    match parse_basic(req.headers()) {
        Some((user, pass)) if verify(admin, &user, &pass) => next.run(req).await,
        _ => {
            tracing::warn!("Rejected admin request to {}", req.uri().path());
            let mut resp = (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()).into_response();
            resp.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"admin\""),
            );
            resp
        }
    }
}
