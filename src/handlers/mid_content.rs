use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use diesel::dsl::max;
use diesel::prelude::*;
use http::{HeaderMap, StatusCode};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth;
use crate::errors::AppError;
use crate::handler::{SiteDB, WithDB};
use crate::models::{MidContent, MidContentChanges, NewMidContent};
use crate::ordering;
use crate::theme::LinkButton;

use super::{ensure, now, AppState};

use super::links::ReorderBody;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMidContent {
    image: Option<String>,
    headline: String,
    description: Option<String>,
    #[serde(default)]
    link_buttons: Vec<LinkButton>,
    active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MidContentPatch {
    #[serde(default)]
    image: Option<Option<String>>,
    headline: Option<String>,
    description: Option<String>,
    link_buttons: Option<Vec<LinkButton>>,
    active: Option<bool>,
}

fn validate_headline(headline: &str) -> Result<(), AppError> {
    ensure(!headline.is_empty(), "Headline is required")?;
    ensure(
        headline.chars().count() <= 200,
        "Headline must be at most 200 characters",
    )
}

pub async fn list_mid_content(
    State(state): State<AppState>,
) -> Result<Json<Vec<MidContent>>, AppError> {
    use crate::schema::mid_contents::dsl::*;

    let mut conn = state.db.dbconn()?;
    let all: Vec<MidContent> = mid_contents
        .order(position.asc())
        .load(&mut conn)
        .map_err(|e| state.db.handle_errors(e))?;

    Ok(Json(all))
}

pub async fn create_mid_content(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateMidContent>,
) -> Result<impl IntoResponse, AppError> {
    auth::require_session(&state.db, &headers)?;

    validate_headline(&body.headline)?;

    // Buttons are stored as JSON text but only ever a validated shape.
    let buttons_json = serde_json::to_string(&body.link_buttons)
        .map_err(|e| AppError::Internal(anyhow::Error::new(e)))?;

    let item_id = Uuid::new_v4().to_string();
    let timestamp = now();

    let item = state.db.run_txn(|conn| {
        use crate::schema::mid_contents;

        let current_max: Option<i32> = mid_contents::table
            .select(max(mid_contents::position))
            .first(conn)?;

        let new_item = NewMidContent {
            id: &item_id,
            image: body.image.as_deref(),
            headline: &body.headline,
            description: body.description.as_deref().unwrap_or(""),
            link_buttons: &buttons_json,
            position: ordering::next_position(current_max),
            active: body.active.unwrap_or(true),
            created_at: &timestamp,
            updated_at: &timestamp,
        };

        diesel::insert_into(mid_contents::table)
            .values(&new_item)
            .execute(conn)?;

        mid_contents::table
            .filter(mid_contents::id.eq(&item_id))
            .first::<MidContent>(conn)
    })?;

    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_mid_content(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<MidContentPatch>,
) -> Result<Json<MidContent>, AppError> {
    auth::require_session(&state.db, &headers)?;

    if let Some(headline) = &patch.headline {
        validate_headline(headline)?;
    }

    let buttons_json = match &patch.link_buttons {
        Some(buttons) => Some(
            serde_json::to_string(buttons)
                .map_err(|e| AppError::Internal(anyhow::Error::new(e)))?,
        ),
        None => None,
    };

    let timestamp = now();

    let item = state.db.run_txn(|conn| {
        use crate::schema::mid_contents;

        let changes = MidContentChanges {
            image: patch.image.clone(),
            headline: patch.headline.clone(),
            description: patch.description.clone(),
            link_buttons: buttons_json.clone(),
            active: patch.active,
            updated_at: Some(timestamp.clone()),
        };

        let updated = diesel::update(
            mid_contents::table.filter(mid_contents::id.eq(&item_id)),
        )
        .set(&changes)
        .execute(conn)?;
        if updated == 0 {
            return Err(diesel::result::Error::NotFound);
        }

        mid_contents::table
            .filter(mid_contents::id.eq(&item_id))
            .first::<MidContent>(conn)
    })?;

    Ok(Json(item))
}

pub async fn delete_mid_content(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    auth::require_session(&state.db, &headers)?;

    let deleted = state.db.run_txn(|conn| {
        use crate::schema::mid_contents::dsl::*;
        diesel::delete(mid_contents.filter(id.eq(&item_id))).execute(conn)
    })?;

    if deleted == 0 {
        return Err(AppError::NotFound);
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn reorder_mid_content(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ReorderBody>,
) -> Result<Json<Vec<MidContent>>, AppError> {
    auth::require_session(&state.db, &headers)?;

    Ok(Json(apply_reorder(&state.db, &body.ordered_ids)?))
}

/// Id-set check and position writes share one transaction; a concurrent
/// insert or delete fails the check instead of sneaking past it.
fn apply_reorder(db: &SiteDB, ordered_ids: &[String]) -> Result<Vec<MidContent>, AppError> {
    let timestamp = now();
    let mut mismatch: Option<String> = None;

    let result = db.run_txn(|conn| {
        use crate::schema::mid_contents::dsl::*;

        let existing: Vec<String> = mid_contents.select(id).load(conn)?;
        if let Err(message) = ordering::check_reorder_ids(&existing, ordered_ids) {
            mismatch = Some(message);
            return Err(diesel::result::Error::RollbackTransaction);
        }

        for (item_id, index) in ordering::position_assignments(ordered_ids) {
            diesel::update(mid_contents.filter(id.eq(item_id)))
                .set((position.eq(index), updated_at.eq(&timestamp)))
                .execute(conn)?;
        }

        mid_contents.order(position.asc()).load::<MidContent>(conn)
    });

    result.map_err(|e| match mismatch.take() {
        Some(message) => AppError::Validation(message),
        None => e,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    use std::sync::Arc;

    use diesel::r2d2::{ConnectionManager, Pool};
    use diesel::SqliteConnection;

    fn test_db() -> SiteDB {
        let manager = ConnectionManager::<SqliteConnection>::new(":memory:");
        let pool = Pool::builder().max_size(1).build(manager).unwrap();
        {
            let mut conn = pool.get().unwrap();
            crate::apply_schema(&mut conn).unwrap();
        }
        SiteDB::new(Arc::new(pool))
    }

    fn insert_block(db: &SiteDB, block_id: &str, pos: i32) {
        use crate::schema::mid_contents;

        let new_item = NewMidContent {
            id: block_id,
            image: None,
            headline: "h",
            description: "",
            link_buttons: "[]",
            position: pos,
            active: true,
            created_at: "2026-01-01T00:00:00+00:00",
            updated_at: "2026-01-01T00:00:00+00:00",
        };
        let mut conn = db.dbconn().unwrap();
        diesel::insert_into(mid_contents::table)
            .values(&new_item)
            .execute(&mut conn)
            .unwrap();
    }

    #[test]
    fn reorder_is_checked_against_the_current_id_set() {
        let db = test_db();
        insert_block(&db, "a", 0);
        insert_block(&db, "b", 1);

        let stale = vec!["b".to_string(), "a".to_string(), "gone".to_string()];
        let err = apply_reorder(&db, &stale).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let all = apply_reorder(&db, &["b".to_string(), "a".to_string()]).unwrap();
        let got: Vec<(&str, i32)> = all.iter().map(|m| (m.id.as_str(), m.position)).collect();
        assert_eq!(got, vec![("b", 0), ("a", 1)]);
    }
}
