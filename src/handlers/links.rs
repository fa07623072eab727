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
use crate::models::{Link, LinkChanges, NewLink};
use crate::ordering;

use super::{ensure, now, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLink {
    title: String,
    url: String,
    icon: Option<String>,
    logo_image: Option<String>,
    color: Option<String>,
    #[serde(default = "default_active")]
    active: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkPatch {
    title: Option<String>,
    url: Option<String>,
    #[serde(default)]
    icon: Option<Option<String>>,
    #[serde(default)]
    logo_image: Option<Option<String>>,
    #[serde(default)]
    color: Option<Option<String>>,
    active: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderBody {
    pub ordered_ids: Vec<String>,
}

fn default_active() -> bool {
    true
}

fn validate_link_fields(
    title: Option<&str>,
    url_value: Option<&str>,
    icon: Option<&str>,
    color: Option<&str>,
) -> Result<(), AppError> {
    if let Some(t) = title {
        ensure(!t.is_empty(), "Title is required")?;
        ensure(t.chars().count() <= 100, "Title must be at most 100 characters")?;
    }
    if let Some(u) = url_value {
        ensure(url::Url::parse(u).is_ok(), "Must be a valid URL")?;
    }
    if let Some(i) = icon {
        ensure(i.chars().count() <= 10, "Icon must be at most 10 characters")?;
    }
    if let Some(c) = color {
        ensure(c.chars().count() <= 30, "Color must be at most 30 characters")?;
    }
    Ok(())
}

pub async fn list_links(State(state): State<AppState>) -> Result<Json<Vec<Link>>, AppError> {
    use crate::schema::links::dsl::*;

    let mut conn = state.db.dbconn()?;
    let all: Vec<Link> = links
        .order(position.asc())
        .load(&mut conn)
        .map_err(|e| state.db.handle_errors(e))?;

    Ok(Json(all))
}

pub async fn create_link(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateLink>,
) -> Result<impl IntoResponse, AppError> {
    auth::require_session(&state.db, &headers)?;

    validate_link_fields(
        Some(&body.title),
        Some(&body.url),
        body.icon.as_deref(),
        body.color.as_deref(),
    )?;

    let link_id = Uuid::new_v4().to_string();
    let timestamp = now();

    let link = state.db.run_txn(|conn| {
        use crate::schema::links;

        let current_max: Option<i32> = links::table.select(max(links::position)).first(conn)?;

        let new_link = NewLink {
            id: &link_id,
            title: &body.title,
            url: &body.url,
            icon: body.icon.as_deref(),
            logo_image: body.logo_image.as_deref(),
            color: body.color.as_deref(),
            active: body.active,
            position: ordering::next_position(current_max),
            created_at: &timestamp,
            updated_at: &timestamp,
        };

        diesel::insert_into(links::table)
            .values(&new_link)
            .execute(conn)?;

        links::table.filter(links::id.eq(&link_id)).first::<Link>(conn)
    })?;

    Ok((StatusCode::CREATED, Json(link)))
}

pub async fn update_link(
    State(state): State<AppState>,
    Path(link_id): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<LinkPatch>,
) -> Result<Json<Link>, AppError> {
    auth::require_session(&state.db, &headers)?;

    validate_link_fields(
        patch.title.as_deref(),
        patch.url.as_deref(),
        patch.icon.as_ref().and_then(|i| i.as_deref()),
        patch.color.as_ref().and_then(|c| c.as_deref()),
    )?;

    let timestamp = now();

    let link = state.db.run_txn(|conn| {
        use crate::schema::links;

        let changes = LinkChanges {
            title: patch.title.clone(),
            url: patch.url.clone(),
            icon: patch.icon.clone(),
            logo_image: patch.logo_image.clone(),
            color: patch.color.clone(),
            active: patch.active,
            updated_at: Some(timestamp.clone()),
        };

        let updated =
            diesel::update(links::table.filter(links::id.eq(&link_id)))
                .set(&changes)
                .execute(conn)?;
        if updated == 0 {
            return Err(diesel::result::Error::NotFound);
        }

        links::table.filter(links::id.eq(&link_id)).first::<Link>(conn)
    })?;

    Ok(Json(link))
}

pub async fn delete_link(
    State(state): State<AppState>,
    Path(link_id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    auth::require_session(&state.db, &headers)?;

    let deleted = state.db.run_txn(|conn| {
        use crate::schema::links::dsl::*;
        diesel::delete(links.filter(id.eq(&link_id))).execute(conn)
    })?;

    if deleted == 0 {
        return Err(AppError::NotFound);
    }

    // Remaining positions may now have gaps; the next reorder re-densifies.
    Ok(StatusCode::NO_CONTENT)
}

/// Applies a full permutation of the collection as one transaction, so
/// readers never observe a half-applied ordering.
pub async fn reorder_links(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ReorderBody>,
) -> Result<Json<Vec<Link>>, AppError> {
    auth::require_session(&state.db, &headers)?;

    Ok(Json(apply_reorder(&state.db, &body.ordered_ids)?))
}

/// The id set is read and checked inside the same transaction that writes
/// the positions, so a concurrent insert or delete cannot slip between the
/// check and the updates.
fn apply_reorder(db: &SiteDB, ordered_ids: &[String]) -> Result<Vec<Link>, AppError> {
    let timestamp = now();
    let mut mismatch: Option<String> = None;

    let result = db.run_txn(|conn| {
        use crate::schema::links::dsl::*;

        let existing: Vec<String> = links.select(id).load(conn)?;
        if let Err(message) = ordering::check_reorder_ids(&existing, ordered_ids) {
            mismatch = Some(message);
            return Err(diesel::result::Error::RollbackTransaction);
        }

        for (link_id, index) in ordering::position_assignments(ordered_ids) {
            diesel::update(links.filter(id.eq(link_id)))
                .set((position.eq(index), updated_at.eq(&timestamp)))
                .execute(conn)?;
        }

        links.order(position.asc()).load::<Link>(conn)
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

    fn insert_link(db: &SiteDB, link_id: &str, pos: i32) {
        use crate::schema::links;

        let new_link = NewLink {
            id: link_id,
            title: "t",
            url: "https://example.com",
            icon: None,
            logo_image: None,
            color: None,
            active: true,
            position: pos,
            created_at: "2026-01-01T00:00:00+00:00",
            updated_at: "2026-01-01T00:00:00+00:00",
        };
        let mut conn = db.dbconn().unwrap();
        diesel::insert_into(links::table)
            .values(&new_link)
            .execute(&mut conn)
            .unwrap();
    }

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reorder_assigns_positions_by_index() {
        let db = test_db();
        insert_link(&db, "a", 0);
        insert_link(&db, "b", 1);
        insert_link(&db, "c", 2);

        let all = apply_reorder(&db, &ids(&["c", "a", "b"])).unwrap();
        let got: Vec<(&str, i32)> = all.iter().map(|l| (l.id.as_str(), l.position)).collect();
        assert_eq!(got, vec![("c", 0), ("a", 1), ("b", 2)]);
    }

    #[test]
    fn reorder_rejects_an_id_set_that_no_longer_matches() {
        let db = test_db();
        insert_link(&db, "a", 0);
        insert_link(&db, "b", 1);
        insert_link(&db, "c", 2);

        // The collection changes after the caller read it.
        {
            use crate::schema::links::dsl::*;
            let mut conn = db.dbconn().unwrap();
            diesel::delete(links.filter(id.eq("c")))
                .execute(&mut conn)
                .unwrap();
        }

        let err = apply_reorder(&db, &ids(&["c", "a", "b"])).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // Nothing was applied.
        {
            use crate::schema::links::dsl::*;
            let mut conn = db.dbconn().unwrap();
            let got: Vec<(String, i32)> = links
                .select((id, position))
                .order(position.asc())
                .load(&mut conn)
                .unwrap();
            assert_eq!(got, vec![("a".to_string(), 0), ("b".to_string(), 1)]);
        }
    }
}
