use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::debug;

use messagely_types::api::{
    Claims, MessageResponse, ReadReceipt, ReadReceiptResponse, SendMessageRequest, SentMessage,
    SentMessageResponse,
};
use messagely_types::models::Message;

use crate::auth::AppState;
use crate::error::{ApiError, blocking};
use crate::store::summary;

/// POST /messages — send a message from the logged-in user.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.body.trim().is_empty() {
        return Err(ApiError::BadRequest("Missing data: body".into()));
    }

    let row = blocking(move || {
        state
            .db
            .insert_message(&claims.username, &req.to_username, &req.body, Utc::now())?
            .ok_or_else(|| ApiError::NotFound(format!("No such user: {}", req.to_username)))
    })
    .await?;

    debug!("Message {} sent {} -> {}", row.id, row.from_username, row.to_username);

    Ok((
        StatusCode::CREATED,
        Json(SentMessageResponse {
            message: SentMessage {
                id: row.id,
                from_username: row.from_username,
                to_username: row.to_username,
                body: row.body,
                sent_at: row.sent_at,
            },
        }),
    ))
}

/// GET /messages/{id} — only the sender or the recipient may read a message.
pub async fn get_message(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MessageResponse>, ApiError> {
    let row = blocking(move || {
        state
            .db
            .get_message(id)?
            .ok_or_else(|| ApiError::NotFound(format!("No such message: {}", id)))
    })
    .await?;

    if row.from_user.username != claims.username && row.to_user.username != claims.username {
        return Err(ApiError::Unauthorized);
    }

    Ok(Json(MessageResponse {
        message: Message {
            id: row.id,
            from_user: summary(row.from_user),
            to_user: summary(row.to_user),
            body: row.body,
            sent_at: row.sent_at,
            read_at: row.read_at,
        },
    }))
}

/// POST /messages/{id}/read — only the recipient may mark a message read.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ReadReceiptResponse>, ApiError> {
    let read_at = blocking(move || {
        let row = state
            .db
            .get_message(id)?
            .ok_or_else(|| ApiError::NotFound(format!("No such message: {}", id)))?;

        if row.to_user.username != claims.username {
            return Err(ApiError::Unauthorized);
        }

        state
            .db
            .mark_message_read(id, Utc::now())?
            .ok_or_else(|| ApiError::NotFound(format!("No such message: {}", id)))
    })
    .await?;

    Ok(Json(ReadReceiptResponse {
        message: ReadReceipt { id, read_at },
    }))
}
