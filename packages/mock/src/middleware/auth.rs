//! HTTP basic authentication for the admin account.
//!
//! When [`MockConfig::admin`] is set, every request except the `GET /`
//! greeting must carry `Authorization: Basic base64(user:password)` with the
//! configured credentials. Otherwise the middleware answers 401 with
//! CouchDB's `unauthorized` body. With no admin configured every request
//! passes through untouched.
//!
//! [`MockConfig::admin`]: crate::config::MockConfig::admin

use std::sync::Arc;

use axum::{
    body::Body,
    extract::Request,
    http::{header, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use couchflow_api::reasons;

use crate::config::Credentials;
use crate::error::AppError;

/// Decode a `Basic` authorization header into `(username, password)`.
pub fn parse_basic(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

/// Axum `from_fn` middleware that enforces the admin credentials.
pub async fn basic_auth_middleware(
    admin: Option<Arc<Credentials>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(admin) = admin else {
        return next.run(req).await;
    };
    if req.method() == Method::GET && req.uri().path() == "/" {
        return next.run(req).await;
    }

    let supplied = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(parse_basic);

    match supplied {
        None => AppError::Unauthorized(reasons::AUTH_REQUIRED).into_response(),
        Some(Some((user, password)))
            if user == admin.username && password == admin.password =>
        {
            next.run(req).await
        }
        Some(_) => {
            tracing::debug!("rejected credentials");
            AppError::Unauthorized(reasons::BAD_CREDENTIALS).into_response()
        }
    }
}
