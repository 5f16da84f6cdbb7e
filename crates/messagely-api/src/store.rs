use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use messagely_db::Database;
use messagely_db::models::{NewUserRow, PeerMessageRow, ProfileRow, UserRow};
use messagely_types::api::RegisterRequest;
use messagely_types::models::{IncomingMessage, OutgoingMessage, User, UserDetail, UserSummary};

use crate::error::StoreError;
use crate::password::{hash_password, verify_password};

/// Data access for users and the messages they exchange.
///
/// Stateless apart from its configuration: every call goes straight to the
/// database, and the database owns the records. Calls block, so async
/// callers should run them through `spawn_blocking`.
pub struct UserStore {
    db: Arc<Database>,
    work_factor: u32,
}

impl UserStore {
    pub fn new(db: Arc<Database>, work_factor: u32) -> Self {
        Self { db, work_factor }
    }

    /// Register a new user. The returned record carries the password hash.
    pub fn register(&self, req: &RegisterRequest) -> Result<User, StoreError> {
        // Text fields are stored trimmed, so " alice" and "alice" are one account.
        let username = text_field(&req.username);
        let password = req.password.as_deref().unwrap_or_default();
        let first_name = text_field(&req.first_name);
        let last_name = text_field(&req.last_name);
        let phone = text_field(&req.phone);

        let missing: Vec<&str> = [
            ("username", username.is_empty()),
            ("password", password.is_empty()),
            ("first_name", first_name.is_empty()),
            ("last_name", last_name.is_empty()),
            ("phone", phone.is_empty()),
        ]
        .into_iter()
        .filter_map(|(field, empty)| empty.then_some(field))
        .collect();

        if !missing.is_empty() {
            return Err(StoreError::Validation(missing.join(", ")));
        }

        let password_hash = hash_password(password, self.work_factor)?;

        let row = self
            .db
            .insert_user(&NewUserRow {
                username,
                password_hash: &password_hash,
                first_name,
                last_name,
                phone,
                now: Utc::now(),
            })?
            .ok_or_else(|| StoreError::Conflict(username.to_string()))?;

        debug!("Registered user {}", row.username);
        Ok(user(row))
    }

    /// Is this username/password pair valid? Fails with `NotFound` for an
    /// unknown username.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<bool, StoreError> {
        let hash = self
            .db
            .get_password_hash(username)?
            .ok_or_else(|| StoreError::NotFound(username.to_string()))?;

        Ok(verify_password(password, &hash)?)
    }

    /// Record a login. Returns the new `last_login_at`, which is always later
    /// than the previous one.
    pub fn update_login_timestamp(&self, username: &str) -> Result<DateTime<Utc>, StoreError> {
        self.db
            .touch_last_login(username, Utc::now())?
            .ok_or_else(|| StoreError::NotFound(username.to_string()))
    }

    pub fn all(&self) -> Result<Vec<UserSummary>, StoreError> {
        let rows = self.db.list_users()?;
        Ok(rows.into_iter().map(summary).collect())
    }

    pub fn get(&self, username: &str) -> Result<UserDetail, StoreError> {
        let row = self
            .db
            .get_user(username)?
            .ok_or_else(|| StoreError::NotFound(username.to_string()))?;

        Ok(UserDetail {
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            join_at: row.join_at,
            last_login_at: row.last_login_at,
        })
    }

    /// Messages sent by `username`. An existing user with nothing sent gets
    /// an empty list; an unknown user gets `NotFound`.
    pub fn messages_from(&self, username: &str) -> Result<Vec<OutgoingMessage>, StoreError> {
        let rows = self
            .db
            .get_messages_from(username)?
            .ok_or_else(|| StoreError::NotFound(username.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row: PeerMessageRow| OutgoingMessage {
                id: row.id,
                to_user: summary(row.peer),
                body: row.body,
                sent_at: row.sent_at,
                read_at: row.read_at,
            })
            .collect())
    }

    /// Messages received by `username`, with the same existence rules as
    /// `messages_from`.
    pub fn messages_to(&self, username: &str) -> Result<Vec<IncomingMessage>, StoreError> {
        let rows = self
            .db
            .get_messages_to(username)?
            .ok_or_else(|| StoreError::NotFound(username.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row: PeerMessageRow| IncomingMessage {
                id: row.id,
                from_user: summary(row.peer),
                body: row.body,
                sent_at: row.sent_at,
                read_at: row.read_at,
            })
            .collect())
    }
}

/// A request text field with surrounding whitespace removed; absent reads as empty.
fn text_field(value: &Option<String>) -> &str {
    value.as_deref().map(str::trim).unwrap_or_default()
}

pub(crate) fn summary(row: ProfileRow) -> UserSummary {
    UserSummary {
        username: row.username,
        first_name: row.first_name,
        last_name: row.last_name,
        phone: row.phone,
    }
}

fn user(row: UserRow) -> User {
    User {
        username: row.username,
        password: row.password,
        first_name: row.first_name,
        last_name: row.last_name,
        phone: row.phone,
        join_at: row.join_at,
        last_login_at: row.last_login_at,
    }
}
