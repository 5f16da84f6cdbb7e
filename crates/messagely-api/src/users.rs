use axum::{
    Extension, Json,
    extract::{Path, State},
};

use messagely_types::api::{
    Claims, IncomingMessagesResponse, OutgoingMessagesResponse, UserResponse, UsersResponse,
};

use crate::auth::AppState;
use crate::error::{ApiError, blocking};
use crate::middleware::ensure_correct_user;

/// GET /users — any logged-in user may list everyone's public profile.
pub async fn list_users(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<UsersResponse>, ApiError> {
    let users = blocking(move || Ok(state.users.all()?)).await?;
    Ok(Json(UsersResponse { users }))
}

/// GET /users/{username}
pub async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UserResponse>, ApiError> {
    ensure_correct_user(&claims, &username)?;

    let user = blocking(move || Ok(state.users.get(&username)?)).await?;
    Ok(Json(UserResponse { user }))
}

/// GET /users/{username}/to
pub async fn messages_to(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<IncomingMessagesResponse>, ApiError> {
    ensure_correct_user(&claims, &username)?;

    let messages = blocking(move || Ok(state.users.messages_to(&username)?)).await?;
    Ok(Json(IncomingMessagesResponse { messages }))
}

/// GET /users/{username}/from
pub async fn messages_from(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<OutgoingMessagesResponse>, ApiError> {
    ensure_correct_user(&claims, &username)?;

    let messages = blocking(move || Ok(state.users.messages_from(&username)?)).await?;
    Ok(Json(OutgoingMessagesResponse { messages }))
}
