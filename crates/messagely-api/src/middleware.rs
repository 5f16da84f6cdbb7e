use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use messagely_types::api::Claims;

use crate::auth::{AppState, decode_token};
use crate::error::ApiError;

/// Extract and validate the bearer token from the Authorization header.
/// On success the decoded `Claims` are available to handlers as an extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthorized)?;

    let claims = decode_token(&state.jwt_secret, token).map_err(|_| ApiError::Unauthorized)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// The token must belong to the user named in the path.
pub fn ensure_correct_user(claims: &Claims, username: &str) -> Result<(), ApiError> {
    if claims.username == username {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}
