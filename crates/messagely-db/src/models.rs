//! Database row types — these map directly to SQLite rows.
//! Distinct from messagely-types API models to keep the DB layer independent.
use chrono::{DateTime, Utc};

pub struct UserRow {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub join_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
}

/// Columns of a new `users` row supplied by the caller.
pub struct NewUserRow<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone: &'a str,
    pub now: DateTime<Utc>,
}

/// The public columns of a user, as joined onto message rows.
pub struct ProfileRow {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

pub struct MessageRow {
    pub id: i64,
    pub from_username: String,
    pub to_username: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

/// A message joined with the profile of the user on the other end.
pub struct PeerMessageRow {
    pub id: i64,
    pub peer: ProfileRow,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

/// A message joined with both the sender and the recipient profiles.
pub struct MessageDetailRow {
    pub id: i64,
    pub from_user: ProfileRow,
    pub to_user: ProfileRow,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}
