use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use http::HeaderMap;
use serde::Deserialize;

use crate::auth;
use crate::constants::SETTINGS_ID;
use crate::errors::AppError;
use crate::handler::WithDB;
use crate::models::{Settings, SettingsChanges};
use crate::theme;

use super::{ensure, now, AppState};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    site_title: Option<String>,
    site_description: Option<String>,
    site_url: Option<String>,
    #[serde(default)]
    site_logo: Option<Option<String>>,
    hero_title: Option<String>,
    hero_subtitle: Option<String>,
    #[serde(default)]
    hero_image: Option<Option<String>>,
    meta_title: Option<String>,
    meta_description: Option<String>,
    #[serde(default)]
    og_image: Option<Option<String>>,
    theme: Option<String>,
    social_links: Option<String>,
    footer_text: Option<String>,
    #[serde(default)]
    favicon: Option<Option<String>>,
}

fn default_settings(timestamp: String) -> Settings {
    Settings {
        id: SETTINGS_ID.to_string(),
        site_title: "My Site".into(),
        site_description: String::new(),
        site_url: String::new(),
        site_logo: None,
        hero_title: "Welcome".into(),
        hero_subtitle: String::new(),
        hero_image: None,
        meta_title: String::new(),
        meta_description: String::new(),
        og_image: None,
        theme: "{}".into(),
        social_links: "[]".into(),
        footer_text: String::new(),
        favicon: None,
        updated_at: timestamp,
    }
}

pub async fn get_settings(State(state): State<AppState>) -> Result<Json<Settings>, AppError> {
    use crate::schema::settings::dsl::*;

    let mut conn = state.db.dbconn()?;
    let row: Option<Settings> = settings
        .filter(id.eq(SETTINGS_ID))
        .first(&mut conn)
        .optional()
        .map_err(|e| state.db.handle_errors(e))?;

    Ok(Json(row.unwrap_or_else(|| default_settings(now()))))
}

pub async fn update_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<Settings>, AppError> {
    auth::require_session(&state.db, &headers)?;

    if let Some(title) = &patch.site_title {
        ensure(!title.is_empty(), "Site title is required")?;
        ensure(title.chars().count() <= 100, "Site title must be at most 100 characters")?;
    }
    if let Some(description) = &patch.site_description {
        ensure(
            description.chars().count() <= 500,
            "Site description must be at most 500 characters",
        )?;
    }
    if let Some(footer) = &patch.footer_text {
        ensure(footer.chars().count() <= 500, "Footer text must be at most 500 characters")?;
    }

    // Stored as text columns, but only shapes that parse are let through.
    if let Some(theme_json) = &patch.theme {
        theme::validate_theme(theme_json)
            .map_err(|e| AppError::Validation(format!("Invalid theme: {}", e)))?;
    }
    if let Some(social_json) = &patch.social_links {
        theme::validate_social_links(social_json)
            .map_err(|e| AppError::Validation(format!("Invalid social links: {}", e)))?;
    }

    let timestamp = now();

    let row = state.db.run_txn(|conn| {
        use crate::schema::settings;

        let exists: Option<String> = settings::table
            .filter(settings::id.eq(SETTINGS_ID))
            .select(settings::id)
            .first(conn)
            .optional()?;

        if exists.is_none() {
            diesel::insert_into(settings::table)
                .values((settings::id.eq(SETTINGS_ID), settings::updated_at.eq(&timestamp)))
                .execute(conn)?;
        }

        let changes = SettingsChanges {
            site_title: patch.site_title.clone(),
            site_description: patch.site_description.clone(),
            site_url: patch.site_url.clone(),
            site_logo: patch.site_logo.clone(),
            hero_title: patch.hero_title.clone(),
            hero_subtitle: patch.hero_subtitle.clone(),
            hero_image: patch.hero_image.clone(),
            meta_title: patch.meta_title.clone(),
            meta_description: patch.meta_description.clone(),
            og_image: patch.og_image.clone(),
            theme: patch.theme.clone(),
            social_links: patch.social_links.clone(),
            footer_text: patch.footer_text.clone(),
            favicon: patch.favicon.clone(),
            updated_at: Some(timestamp.clone()),
        };

        diesel::update(settings::table.filter(settings::id.eq(SETTINGS_ID)))
            .set(&changes)
            .execute(conn)?;

        settings::table
            .filter(settings::id.eq(SETTINGS_ID))
            .first::<Settings>(conn)
    })?;

    Ok(Json(row))
}
