use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use diesel::prelude::*;
use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth;
use crate::errors::AppError;
use crate::handler::WithDB;
use crate::models::{NewPost, Post, PostChanges};
use crate::post_util;
use crate::sanitize::sanitize_html;

use super::{ensure, now, AppState};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    page: Option<i64>,
    limit: Option<i64>,
    published: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostList {
    posts: Vec<Post>,
    total: i64,
    page: i64,
    total_pages: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePost {
    title: String,
    content: String,
    excerpt: Option<String>,
    hero_image: Option<String>,
    meta_title: Option<String>,
    meta_description: Option<String>,
    meta_keywords: Option<String>,
    og_image: Option<String>,
    #[serde(default)]
    published: bool,
}

/// Partial update. Absent fields leave the row alone; explicit `null`
/// clears nullable columns.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPatch {
    title: Option<String>,
    slug: Option<String>,
    content: Option<String>,
    excerpt: Option<String>,
    #[serde(default)]
    hero_image: Option<Option<String>>,
    #[serde(default)]
    meta_title: Option<Option<String>>,
    #[serde(default)]
    meta_description: Option<Option<String>>,
    #[serde(default)]
    meta_keywords: Option<Option<String>>,
    #[serde(default)]
    og_image: Option<Option<String>>,
    published: Option<bool>,
}

fn validate_title(title: &str) -> Result<(), AppError> {
    ensure(!title.is_empty(), "Title is required")?;
    ensure(title.chars().count() <= 200, "Title must be at most 200 characters")
}

fn validate_lengths(
    excerpt: Option<&str>,
    meta_title: Option<&str>,
    meta_description: Option<&str>,
    meta_keywords: Option<&str>,
) -> Result<(), AppError> {
    if let Some(e) = excerpt {
        ensure(e.chars().count() <= 300, "Excerpt must be at most 300 characters")?;
    }
    if let Some(t) = meta_title {
        ensure(t.chars().count() <= 70, "Meta title must be at most 70 characters")?;
    }
    if let Some(d) = meta_description {
        ensure(d.chars().count() <= 160, "Meta description must be at most 160 characters")?;
    }
    if let Some(k) = meta_keywords {
        ensure(k.chars().count() <= 500, "Meta keywords must be at most 500 characters")?;
    }
    Ok(())
}

pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<PostList>, AppError> {
    use crate::schema::posts::dsl::*;

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(crate::DEFAULT_PAGE_SIZE).clamp(1, 100);
    let published_only = query.published.as_deref() == Some("true");

    let (results, total) = state.db.run_txn(|conn| {
        let total: i64 = if published_only {
            posts.filter(published.eq(true)).count().get_result(conn)?
        } else {
            posts.count().get_result(conn)?
        };

        let results: Vec<Post> = if published_only {
            posts
                .filter(published.eq(true))
                .order(created_at.desc())
                .offset((page - 1) * limit)
                .limit(limit)
                .load(conn)?
        } else {
            posts
                .order(created_at.desc())
                .offset((page - 1) * limit)
                .limit(limit)
                .load(conn)?
        };

        Ok((results, total))
    })?;

    Ok(Json(PostList {
        posts: results,
        total,
        page,
        total_pages: (total + limit - 1) / limit,
    }))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<Post>, AppError> {
    use crate::schema::posts::dsl::*;

    let mut conn = state.db.dbconn()?;
    let post: Post = posts
        .filter(id.eq(&post_id))
        .first(&mut conn)
        .map_err(|e| state.db.handle_errors(e))?;

    Ok(Json(post))
}

pub async fn create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreatePost>,
) -> Result<impl IntoResponse, AppError> {
    auth::require_session(&state.db, &headers)?;

    validate_title(&body.title)?;
    ensure(!body.content.is_empty(), "Content is required")?;
    validate_lengths(
        body.excerpt.as_deref(),
        body.meta_title.as_deref(),
        body.meta_description.as_deref(),
        body.meta_keywords.as_deref(),
    )?;

    let candidate = post_util::generate_slug(&body.title);
    ensure(!candidate.is_empty(), "Title must contain at least one letter or digit")?;

    let content_clean = sanitize_html(&body.content);
    let excerpt_value = match &body.excerpt {
        Some(e) if !e.is_empty() => e.clone(),
        _ => post_util::derive_excerpt(&content_clean),
    };

    let post_id = Uuid::new_v4().to_string();
    let timestamp = now();
    let published_at_value = post_util::publish_transition(None, body.published, &timestamp);

    let post = state.db.run_txn(|conn| {
        use crate::schema::posts;

        let unique_slug = post_util::ensure_unique_slug(conn, &candidate, None)?;

        let new_post = NewPost {
            id: &post_id,
            title: &body.title,
            slug: &unique_slug,
            content: &content_clean,
            excerpt: &excerpt_value,
            hero_image: body.hero_image.as_deref(),
            meta_title: body.meta_title.as_deref(),
            meta_description: body.meta_description.as_deref(),
            meta_keywords: body.meta_keywords.as_deref(),
            og_image: body.og_image.as_deref(),
            published: body.published,
            published_at: published_at_value.as_deref(),
            created_at: &timestamp,
            updated_at: &timestamp,
        };

        diesel::insert_into(posts::table)
            .values(&new_post)
            .execute(conn)?;

        posts::table.filter(posts::id.eq(&post_id)).first::<Post>(conn)
    })?;

    info!("created post {} with slug {}", post.id, post.slug);
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<PostPatch>,
) -> Result<Json<Post>, AppError> {
    auth::require_session(&state.db, &headers)?;

    if let Some(title) = &patch.title {
        validate_title(title)?;
    }
    if let Some(content) = &patch.content {
        ensure(!content.is_empty(), "Content is required")?;
    }
    validate_lengths(
        patch.excerpt.as_deref(),
        patch.meta_title.as_ref().and_then(|t| t.as_deref()),
        patch.meta_description.as_ref().and_then(|d| d.as_deref()),
        patch.meta_keywords.as_ref().and_then(|k| k.as_deref()),
    )?;

    let slug_source = patch
        .slug
        .as_deref()
        .or(patch.title.as_deref())
        .map(post_util::generate_slug);
    if let Some(candidate) = &slug_source {
        ensure(!candidate.is_empty(), "Slug must contain at least one letter or digit")?;
    }

    let timestamp = now();

    let post = state.db.run_txn(|conn| {
        use crate::schema::posts;

        let existing: Post = posts::table
            .filter(posts::id.eq(&post_id))
            .first(conn)?;

        let mut changes = PostChanges {
            title: patch.title.clone(),
            excerpt: patch.excerpt.clone(),
            hero_image: patch.hero_image.clone(),
            meta_title: patch.meta_title.clone(),
            meta_description: patch.meta_description.clone(),
            meta_keywords: patch.meta_keywords.clone(),
            og_image: patch.og_image.clone(),
            published: patch.published,
            updated_at: Some(timestamp.clone()),
            ..Default::default()
        };

        if let Some(candidate) = &slug_source {
            changes.slug = Some(post_util::ensure_unique_slug(
                conn,
                candidate,
                Some(&post_id),
            )?);
        }

        if let Some(content) = &patch.content {
            let content_clean = sanitize_html(content);
            if patch.excerpt.is_none() {
                changes.excerpt = Some(post_util::derive_excerpt(&content_clean));
            }
            changes.content = Some(content_clean);
        }

        if let Some(publish) = patch.published {
            // First publish stamps the timestamp; it never resets after.
            changes.published_at = Some(post_util::publish_transition(
                existing.published_at.as_deref(),
                publish,
                &timestamp,
            ));
        }

        diesel::update(posts::table.filter(posts::id.eq(&post_id)))
            .set(&changes)
            .execute(conn)?;

        posts::table.filter(posts::id.eq(&post_id)).first::<Post>(conn)
    })?;

    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    auth::require_session(&state.db, &headers)?;

    let deleted = state.db.run_txn(|conn| {
        use crate::schema::posts::dsl::*;
        diesel::delete(posts.filter(id.eq(&post_id))).execute(conn)
    })?;

    if deleted == 0 {
        return Err(AppError::NotFound);
    }

    Ok(StatusCode::NO_CONTENT)
}
