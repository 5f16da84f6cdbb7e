use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{debug, warn};

use messagely_db::Database;
use messagely_types::api::{Claims, LoginRequest, RegisterRequest, TokenResponse};

use crate::error::{ApiError, StoreError, blocking};
use crate::store::UserStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub users: UserStore,
    pub jwt_secret: String,
    pub token_ttl: Duration,
}

/// POST /auth/register — registers, logs in, and returns a token.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let st = state.clone();
    let username = blocking(move || {
        let user = st.users.register(&req)?;
        st.users.update_login_timestamp(&user.username)?;
        Ok(user.username)
    })
    .await?;

    let token = create_token(&state.jwt_secret, &username, state.token_ttl)?;

    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

/// POST /auth/login — checks credentials, updates the last login, returns a token.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let st = state.clone();
    let username = blocking(move || {
        let username = req.username.as_deref().unwrap_or_default().trim().to_string();
        let password = req.password.unwrap_or_default();

        // An unknown username gets the same answer as a wrong password.
        let valid = match st.users.authenticate(&username, &password) {
            Ok(valid) => valid,
            Err(StoreError::NotFound(_)) => false,
            Err(e) => return Err(e.into()),
        };

        if !valid {
            warn!("Failed login for {}", username);
            return Err(ApiError::BadRequest("Invalid username/password".into()));
        }

        st.users.update_login_timestamp(&username)?;
        Ok(username)
    })
    .await?;

    let token = create_token(&state.jwt_secret, &username, state.token_ttl)?;
    debug!("Issued token for {}", username);

    Ok(Json(TokenResponse { token }))
}

pub fn create_token(secret: &str, username: &str, ttl: Duration) -> anyhow::Result<String> {
    let now = Utc::now();
    let expires = now
        .checked_add_signed(ttl)
        .ok_or_else(|| anyhow::anyhow!("Token lifetime out of range: {}", ttl))?;

    let claims = Claims {
        username: username.to_string(),
        iat: now.timestamp() as usize,
        exp: expires.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn decode_token(secret: &str, token: &str) -> anyhow::Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        let token = create_token("secret", "alice", Duration::hours(1)).unwrap();
        let claims = decode_token("secret", &token).unwrap();
        assert_eq!(claims.username, "alice");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = create_token("secret", "alice", Duration::hours(1)).unwrap();
        assert!(decode_token("not-the-secret", &token).is_err());
    }

    #[test]
    fn out_of_range_lifetime_is_an_error() {
        assert!(create_token("secret", "alice", Duration::MAX).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = create_token("secret", "alice", Duration::hours(-2)).unwrap();
        assert!(decode_token("secret", &token).is_err());
    }
}
