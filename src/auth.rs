use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use http::HeaderMap;
use rand::{distributions::Alphanumeric, Rng};
use tracing::warn;

use crate::errors::AppError;
use crate::handler::{SiteDB, WithDB};
use crate::models::{Session, User};

const TOKEN_LENGTH: usize = 48;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(anyhow::Error::msg(e.to_string())))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        warn!("stored password hash failed to parse");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

pub fn create_session(
    conn: &mut SqliteConnection,
    for_user_id: &str,
    ttl_seconds: i64,
) -> Result<Session, diesel::result::Error> {
    use crate::schema::sessions;

    let now = Utc::now();
    let session = Session {
        token: generate_token(),
        user_id: for_user_id.to_string(),
        expires_at: (now + Duration::seconds(ttl_seconds)).to_rfc3339(),
        created_at: now.to_rfc3339(),
    };

    diesel::insert_into(sessions::table)
        .values(&session)
        .execute(conn)?;

    Ok(session)
}

pub fn delete_session(
    conn: &mut SqliteConnection,
    session_token: &str,
) -> Result<(), diesel::result::Error> {
    use crate::schema::sessions::dsl::*;
    diesel::delete(sessions.filter(token.eq(session_token))).execute(conn)?;
    Ok(())
}

fn session_user(
    conn: &mut SqliteConnection,
    session_token: &str,
) -> Result<Option<User>, diesel::result::Error> {
    use crate::schema::sessions::dsl as session_dsl;
    use crate::schema::users::dsl as user_dsl;

    let session: Option<Session> = session_dsl::sessions
        .filter(session_dsl::token.eq(session_token))
        .first(conn)
        .optional()?;

    let Some(session) = session else {
        return Ok(None);
    };

    let expired = DateTime::parse_from_rfc3339(&session.expires_at)
        .map(|expiry| expiry < Utc::now())
        .unwrap_or(true);
    if expired {
        diesel::delete(session_dsl::sessions.filter(session_dsl::token.eq(session_token)))
            .execute(conn)?;
        return Ok(None);
    }

    user_dsl::users
        .filter(user_dsl::id.eq(&session.user_id))
        .first(conn)
        .optional()
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// The capability check every mutating endpoint runs before any side
/// effect: resolves the bearer token to a live admin user or rejects with
/// 401.
pub fn require_session(db: &SiteDB, headers: &HeaderMap) -> Result<User, AppError> {
    let token = bearer_token(headers).ok_or(AppError::Unauthorized)?;
    let mut conn = db.dbconn()?;
    session_user(&mut conn, token)
        .map_err(|e| db.handle_errors(e))?
        .ok_or(AppError::Unauthorized)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("changeme123").unwrap();
        assert!(verify_password("changeme123", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn bearer_token_requires_the_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::AUTHORIZATION, "Bearer abc123".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc123"));

        let mut basic = HeaderMap::new();
        basic.insert(http::header::AUTHORIZATION, "Basic abc123".parse().unwrap());
        assert_eq!(bearer_token(&basic), None);

        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn tokens_are_long_and_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_LENGTH);
        assert_ne!(a, b);
    }
}
