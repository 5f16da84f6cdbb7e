use serde::{Deserialize, Serialize};

use crate::models::{IncomingMessage, Message, OutgoingMessage, UserDetail, UserSummary};

// -- Token claims --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    pub iat: usize,
    pub exp: usize,
}

// -- Auth --

/// Absent and `null` fields both deserialize as `None`, so registration can
/// report them as missing data instead of failing JSON extraction.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

// -- Users --

#[derive(Debug, Serialize, Deserialize)]
pub struct UsersResponse {
    pub users: Vec<UserSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: UserDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IncomingMessagesResponse {
    pub messages: Vec<IncomingMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OutgoingMessagesResponse {
    pub messages: Vec<OutgoingMessage>,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub to_username: String,
    pub body: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SentMessage {
    pub id: i64,
    pub from_username: String,
    pub to_username: String,
    pub body: String,
    pub sent_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SentMessageResponse {
    pub message: SentMessage,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: Message,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub id: i64,
    pub read_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadReceiptResponse {
    pub message: ReadReceipt,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub status: u16,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}
