use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::{verify_token, Claims};
use crate::error::ApiError;

/// The authenticated principal, available to handlers as a request
/// extension once the middleware has run.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
        }
    }
}

/// Bearer-JWT gate for the `/api` routes.
///
/// With `auth.required` set (the default everywhere), a missing or invalid
/// token is a 401 before any handler runs. With it unset, requests pass
/// through and a valid token still attaches the principal, so role checks
/// keep working on trusted networks.
pub async fn require_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match bearer_token(&headers) {
        Ok(token) => match verify_token(&token, &state.auth.jwt_secret) {
            Ok(claims) => {
                request.extensions_mut().insert(AuthUser::from(claims));
            }
            Err(e) => {
                warn!("token rejected: {}", e);
                if state.auth.required {
                    return Err(ApiError::unauthorized("invalid token"));
                }
            }
        },
        Err(reason) => {
            if state.auth.required {
                return Err(ApiError::unauthorized(reason));
            }
        }
    }
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Result<String, &'static str> {
    let header = headers
        .get("authorization")
        .ok_or("missing authorization header")?;
    let value = header
        .to_str()
        .map_err(|_| "malformed authorization header")?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or("authorization header must use the Bearer scheme")?;
    if token.trim().is_empty() {
        return Err("empty bearer token");
    }
    Ok(token.to_string())
}
