use axum::extract::{Path, State};
use axum::Json;
use diesel::prelude::*;
use http::HeaderMap;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth;
use crate::errors::AppError;
use crate::handler::WithDB;
use crate::models::{NewPage, Page};
use crate::sanitize::sanitize_html;

use super::{ensure, now, AppState};

#[derive(Debug, Deserialize)]
pub struct UpsertPage {
    title: String,
    content: String,
    active: Option<bool>,
}

pub async fn list_pages(State(state): State<AppState>) -> Result<Json<Vec<Page>>, AppError> {
    use crate::schema::pages::dsl::*;

    let mut conn = state.db.dbconn()?;
    let all: Vec<Page> = pages
        .order(slug.asc())
        .load(&mut conn)
        .map_err(|e| state.db.handle_errors(e))?;

    Ok(Json(all))
}

pub async fn get_page(
    State(state): State<AppState>,
    Path(page_slug): Path<String>,
) -> Result<Json<Page>, AppError> {
    use crate::schema::pages::dsl::*;

    let mut conn = state.db.dbconn()?;
    let page: Page = pages
        .filter(slug.eq(&page_slug))
        .first(&mut conn)
        .map_err(|e| state.db.handle_errors(e))?;

    Ok(Json(page))
}

/// Static pages are keyed by slug and upserted: editing a page that does
/// not exist yet creates it.
pub async fn upsert_page(
    State(state): State<AppState>,
    Path(page_slug): Path<String>,
    headers: HeaderMap,
    Json(body): Json<UpsertPage>,
) -> Result<Json<Page>, AppError> {
    auth::require_session(&state.db, &headers)?;

    ensure(!body.title.is_empty(), "Title is required")?;
    ensure(
        body.title.chars().count() <= 200,
        "Title must be at most 200 characters",
    )?;

    let content_clean = sanitize_html(&body.content);
    let page_id = Uuid::new_v4().to_string();
    let timestamp = now();

    let page = state.db.run_txn(|conn| {
        use crate::schema::pages;

        let existing: Option<Page> = pages::table
            .filter(pages::slug.eq(&page_slug))
            .first(conn)
            .optional()?;

        match existing {
            Some(current) => {
                diesel::update(pages::table.filter(pages::slug.eq(&page_slug)))
                    .set((
                        pages::title.eq(&body.title),
                        pages::content.eq(&content_clean),
                        pages::active.eq(body.active.unwrap_or(current.active)),
                        pages::updated_at.eq(&timestamp),
                    ))
                    .execute(conn)?;
            }
            None => {
                let new_page = NewPage {
                    id: &page_id,
                    slug: &page_slug,
                    title: &body.title,
                    content: &content_clean,
                    active: body.active.unwrap_or(true),
                    created_at: &timestamp,
                    updated_at: &timestamp,
                };
                diesel::insert_into(pages::table)
                    .values(&new_page)
                    .execute(conn)?;
            }
        }

        pages::table
            .filter(pages::slug.eq(&page_slug))
            .first::<Page>(conn)
    })?;

    Ok(Json(page))
}
