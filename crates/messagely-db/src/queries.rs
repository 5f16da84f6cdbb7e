use crate::Database;
use crate::models::{
    MessageDetailRow, MessageRow, NewUserRow, PeerMessageRow, ProfileRow, UserRow,
};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, Row};

impl Database {
    // -- Users --

    /// Insert a user. Returns `None` when the username is already taken.
    pub fn insert_user(&self, user: &NewUserRow<'_>) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "INSERT INTO users (username, password, first_name, last_name, phone, join_at, last_login_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                     ON CONFLICT(username) DO NOTHING
                     RETURNING username, password, first_name, last_name, phone, join_at, last_login_at",
                    rusqlite::params![
                        user.username,
                        user.password_hash,
                        user.first_name,
                        user.last_name,
                        user.phone,
                        user.now,
                    ],
                    user_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_password_hash(&self, username: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT password FROM users WHERE username = ?1",
                [username],
                |row| row.get(0),
            )
            .optional()
        })
    }

    /// Set `last_login_at` to `now`, or one microsecond past the stored value if
    /// the clock has not moved beyond it. Returns `None` for an unknown username.
    pub fn touch_last_login(&self, username: &str, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let previous: Option<DateTime<Utc>> = tx
                .query_row(
                    "SELECT last_login_at FROM users WHERE username = ?1",
                    [username],
                    |row| row.get(0),
                )
                .optional()?;

            let Some(previous) = previous else {
                return Ok(None);
            };

            let next = if now > previous {
                now
            } else {
                previous + Duration::microseconds(1)
            };

            tx.execute(
                "UPDATE users SET last_login_at = ?2 WHERE username = ?1",
                rusqlite::params![username, next],
            )?;
            tx.commit()?;

            Ok(Some(next))
        })
    }

    pub fn list_users(&self) -> Result<Vec<ProfileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT username, first_name, last_name, phone FROM users ORDER BY username",
            )?;

            let rows = stmt
                .query_map([], |row| profile_from_row(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn get_user(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, username))
    }

    /// Messages sent by `username`, each joined with the recipient's profile.
    /// `None` means the user does not exist; an empty list means they sent nothing.
    pub fn get_messages_from(&self, username: &str) -> Result<Option<Vec<PeerMessageRow>>> {
        self.with_conn(|conn| {
            if !query_user_exists(conn, username)? {
                return Ok(None);
            }
            query_peer_messages(
                conn,
                "SELECT m.id, u.username, u.first_name, u.last_name, u.phone, m.body, m.sent_at, m.read_at
                 FROM messages m
                 JOIN users u ON m.to_username = u.username
                 WHERE m.from_username = ?1
                 ORDER BY m.id",
                username,
            )
            .map(Some)
        })
    }

    /// Messages received by `username`, each joined with the sender's profile.
    /// `None` means the user does not exist; an empty list means they received nothing.
    pub fn get_messages_to(&self, username: &str) -> Result<Option<Vec<PeerMessageRow>>> {
        self.with_conn(|conn| {
            if !query_user_exists(conn, username)? {
                return Ok(None);
            }
            query_peer_messages(
                conn,
                "SELECT m.id, u.username, u.first_name, u.last_name, u.phone, m.body, m.sent_at, m.read_at
                 FROM messages m
                 JOIN users u ON m.from_username = u.username
                 WHERE m.to_username = ?1
                 ORDER BY m.id",
                username,
            )
            .map(Some)
        })
    }

    // -- Messages --

    /// Insert a message. Returns `None` if either user does not exist.
    pub fn insert_message(
        &self,
        from_username: &str,
        to_username: &str,
        body: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            if !query_user_exists(conn, from_username)? || !query_user_exists(conn, to_username)? {
                return Ok(None);
            }

            let row = conn.query_row(
                "INSERT INTO messages (from_username, to_username, body, sent_at)
                 VALUES (?1, ?2, ?3, ?4)
                 RETURNING id, from_username, to_username, body, sent_at, read_at",
                rusqlite::params![from_username, to_username, body, now],
                |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        from_username: row.get(1)?,
                        to_username: row.get(2)?,
                        body: row.get(3)?,
                        sent_at: row.get(4)?,
                        read_at: row.get(5)?,
                    })
                },
            )?;

            Ok(Some(row))
        })
    }

    pub fn get_message(&self, id: i64) -> Result<Option<MessageDetailRow>> {
        self.with_conn(|conn| {
            // JOIN users twice to fetch both profiles in a single query
            conn.query_row(
                "SELECT m.id,
                        f.username, f.first_name, f.last_name, f.phone,
                        t.username, t.first_name, t.last_name, t.phone,
                        m.body, m.sent_at, m.read_at
                 FROM messages m
                 JOIN users f ON m.from_username = f.username
                 JOIN users t ON m.to_username = t.username
                 WHERE m.id = ?1",
                [id],
                |row| {
                    Ok(MessageDetailRow {
                        id: row.get(0)?,
                        from_user: profile_from_row(row, 1)?,
                        to_user: profile_from_row(row, 5)?,
                        body: row.get(9)?,
                        sent_at: row.get(10)?,
                        read_at: row.get(11)?,
                    })
                },
            )
            .optional()
        })
    }

    /// Stamp `read_at` on a message. An already-read message keeps its first timestamp.
    /// Returns the effective `read_at`, or `None` if the message does not exist.
    pub fn mark_message_read(&self, id: i64, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
        self.with_conn(|conn| {
            conn.query_row(
                "UPDATE messages SET read_at = COALESCE(read_at, ?2) WHERE id = ?1 RETURNING read_at",
                rusqlite::params![id, now],
                |row| row.get(0),
            )
            .optional()
        })
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        username: row.get(0)?,
        password: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        phone: row.get(4)?,
        join_at: row.get(5)?,
        last_login_at: row.get(6)?,
    })
}

/// Read four profile columns starting at `offset`.
fn profile_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<ProfileRow> {
    Ok(ProfileRow {
        username: row.get(offset)?,
        first_name: row.get(offset + 1)?,
        last_name: row.get(offset + 2)?,
        phone: row.get(offset + 3)?,
    })
}

fn query_user(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT username, password, first_name, last_name, phone, join_at, last_login_at
         FROM users WHERE username = ?1",
    )?;

    stmt.query_row([username], user_from_row).optional()
}

fn query_user_exists(conn: &Connection, username: &str) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
        [username],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn query_peer_messages(conn: &Connection, sql: &str, username: &str) -> Result<Vec<PeerMessageRow>> {
    let mut stmt = conn.prepare(sql)?;

    let rows = stmt
        .query_map([username], |row| {
            Ok(PeerMessageRow {
                id: row.get(0)?,
                peer: profile_from_row(row, 1)?,
                body: row.get(5)?,
                sent_at: row.get(6)?,
                read_at: row.get(7)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
