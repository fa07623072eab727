use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use diesel::prelude::*;
use http::{HeaderMap, StatusCode};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth;
use crate::errors::AppError;
use crate::handler::WithDB;
use crate::models::{NewUser, User, UserView};

use super::{ensure, now, AppState};

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    email: String,
    password: String,
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserPatch {
    email: Option<String>,
    #[serde(default)]
    name: Option<Option<String>>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePassword {
    current_password: String,
    new_password: String,
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let well_formed = email.contains('@')
        && !email.starts_with('@')
        && !email.ends_with('@')
        && !email.contains(char::is_whitespace);
    ensure(well_formed, "Must be a valid email")
}

fn validate_password(password: &str) -> Result<(), AppError> {
    ensure(
        password.chars().count() >= 6,
        "Password must be at least 6 characters",
    )
}

pub async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<UserView>>, AppError> {
    auth::require_session(&state.db, &headers)?;

    use crate::schema::users::dsl::*;
    let mut conn = state.db.dbconn()?;
    let all: Vec<User> = users
        .order(created_at.asc())
        .load(&mut conn)
        .map_err(|e| state.db.handle_errors(e))?;

    Ok(Json(all.into_iter().map(UserView::from).collect()))
}

pub async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateUser>,
) -> Result<impl IntoResponse, AppError> {
    auth::require_session(&state.db, &headers)?;

    validate_email(&body.email)?;
    validate_password(&body.password)?;
    if let Some(name) = &body.name {
        ensure(name.chars().count() <= 100, "Name must be at most 100 characters")?;
    }

    let password_hash = auth::hash_password(&body.password)?;
    let user_id = Uuid::new_v4().to_string();
    let timestamp = now();

    let created = state.db.run_txn(|conn| {
        use crate::schema::users;

        let existing: Option<String> = users::table
            .filter(users::email.eq(&body.email))
            .select(users::id)
            .first(conn)
            .optional()?;
        if existing.is_some() {
            // Surfaced as 409 by the unique-violation mapping.
            return Err(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                Box::new("A user with this email already exists".to_string()),
            ));
        }

        let new_user = NewUser {
            id: &user_id,
            email: &body.email,
            password: &password_hash,
            name: body.name.as_deref(),
            created_at: &timestamp,
            updated_at: &timestamp,
        };

        diesel::insert_into(users::table)
            .values(&new_user)
            .execute(conn)?;

        users::table.filter(users::id.eq(&user_id)).first::<User>(conn)
    })?;

    Ok((StatusCode::CREATED, Json(UserView::from(created))))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<UserPatch>,
) -> Result<Json<UserView>, AppError> {
    auth::require_session(&state.db, &headers)?;

    if let Some(email) = &patch.email {
        validate_email(email)?;
    }
    if let Some(password) = &patch.password {
        validate_password(password)?;
    }
    if let Some(Some(name)) = &patch.name {
        ensure(name.chars().count() <= 100, "Name must be at most 100 characters")?;
    }

    let password_hash = match &patch.password {
        Some(password) => Some(auth::hash_password(password)?),
        None => None,
    };

    let timestamp = now();

    let updated = state.db.run_txn(|conn| {
        use crate::schema::users;

        if let Some(email) = &patch.email {
            let taken: Option<String> = users::table
                .filter(users::email.eq(email))
                .filter(users::id.ne(&user_id))
                .select(users::id)
                .first(conn)
                .optional()?;
            if taken.is_some() {
                return Err(diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::UniqueViolation,
                    Box::new("A user with this email already exists".to_string()),
                ));
            }
        }

        let existing: User = users::table
            .filter(users::id.eq(&user_id))
            .first(conn)?;

        diesel::update(users::table.filter(users::id.eq(&user_id)))
            .set((
                users::email.eq(patch.email.as_deref().unwrap_or(&existing.email)),
                users::name.eq(match &patch.name {
                    Some(name) => name.as_deref(),
                    None => existing.name.as_deref(),
                }),
                users::password.eq(password_hash.as_deref().unwrap_or(&existing.password)),
                users::updated_at.eq(&timestamp),
            ))
            .execute(conn)?;

        users::table.filter(users::id.eq(&user_id)).first::<User>(conn)
    })?;

    Ok(Json(UserView::from(updated)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let caller = auth::require_session(&state.db, &headers)?;

    if caller.id == user_id {
        return Err(AppError::Validation(
            "You cannot delete your own account".into(),
        ));
    }

    state.db.run_txn(|conn| {
        use crate::schema::users::dsl::*;

        let total: i64 = users.count().get_result(conn)?;
        if total <= 1 {
            // Mapped to a 400 below; the transaction never deletes.
            return Err(diesel::result::Error::RollbackTransaction);
        }

        let deleted = diesel::delete(users.filter(id.eq(&user_id))).execute(conn)?;
        if deleted == 0 {
            return Err(diesel::result::Error::NotFound);
        }
        Ok(())
    })
    .map_err(|e| match e {
        AppError::Database(diesel::result::Error::RollbackTransaction) => {
            AppError::Validation("Cannot delete the last admin user".into())
        }
        other => other,
    })?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn change_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ChangePassword>,
) -> Result<StatusCode, AppError> {
    let caller = auth::require_session(&state.db, &headers)?;

    ensure(!body.current_password.is_empty(), "Current password is required")?;
    validate_password(&body.new_password)?;

    if !auth::verify_password(&body.current_password, &caller.password) {
        return Err(AppError::Validation("Current password is incorrect".into()));
    }

    let password_hash = auth::hash_password(&body.new_password)?;
    let timestamp = now();

    state.db.run_txn(|conn| {
        use crate::schema::users::dsl::*;
        diesel::update(users.filter(id.eq(&caller.id)))
            .set((password.eq(&password_hash), updated_at.eq(&timestamp)))
            .execute(conn)
    })?;

    Ok(StatusCode::NO_CONTENT)
}
