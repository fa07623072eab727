use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::Json;
use diesel::prelude::*;
use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth;
use crate::errors::AppError;
use crate::handler::WithDB;
use crate::models::{User, UserView};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    token: String,
    user: UserView,
}

pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<LoginBody>,
) -> Result<Json<LoginResponse>, AppError> {
    // Counted before the credential check so failed guesses burn attempts.
    if !state.limiter.check(addr.ip()) {
        warn!("rate limited login from {}", addr.ip());
        return Err(AppError::RateLimited);
    }

    let mut conn = state.db.dbconn()?;

    let user: Option<User> = {
        use crate::schema::users::dsl::*;
        users
            .filter(email.eq(&body.email))
            .first(&mut conn)
            .optional()
            .map_err(|e| state.db.handle_errors(e))?
    };

    let Some(user) = user else {
        return Err(AppError::Unauthorized);
    };
    if !auth::verify_password(&body.password, &user.password) {
        return Err(AppError::Unauthorized);
    }

    let session = auth::create_session(
        &mut conn,
        &user.id,
        state.config.auth.session_ttl_seconds,
    )
    .map_err(|e| state.db.handle_errors(e))?;

    info!("login for {}", user.email);

    Ok(Json(LoginResponse {
        token: session.token,
        user: UserView::from(user),
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    if let Some(token) = auth::bearer_token(&headers) {
        let mut conn = state.db.dbconn()?;
        auth::delete_session(&mut conn, token).map_err(|e| state.db.handle_errors(e))?;
    }

    Ok(StatusCode::NO_CONTENT)
}
