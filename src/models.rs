use diesel::prelude::*;
use serde::Serialize;

use crate::schema::{links, mid_contents, pages, posts, sessions, settings, uploads, users};

#[derive(Debug, Queryable, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub hero_image: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub og_image: Option<String>,
    pub published: bool,
    pub published_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = posts)]
pub struct NewPost<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub slug: &'a str,
    pub content: &'a str,
    pub excerpt: &'a str,
    pub hero_image: Option<&'a str>,
    pub meta_title: Option<&'a str>,
    pub meta_description: Option<&'a str>,
    pub meta_keywords: Option<&'a str>,
    pub og_image: Option<&'a str>,
    pub published: bool,
    pub published_at: Option<&'a str>,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// Partial update applied to a post row. `None` leaves the column alone;
/// `Some(None)` on a nullable column clears it.
#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = posts)]
pub struct PostChanges {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub hero_image: Option<Option<String>>,
    pub meta_title: Option<Option<String>>,
    pub meta_description: Option<Option<String>>,
    pub meta_keywords: Option<Option<String>>,
    pub og_image: Option<Option<String>>,
    pub published: Option<bool>,
    pub published_at: Option<Option<String>>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Queryable, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = pages)]
pub struct NewPage<'a> {
    pub id: &'a str,
    pub slug: &'a str,
    pub title: &'a str,
    pub content: &'a str,
    pub active: bool,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

#[derive(Debug, Queryable, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: String,
    pub title: String,
    pub url: String,
    pub icon: Option<String>,
    pub logo_image: Option<String>,
    pub color: Option<String>,
    pub active: bool,
    #[serde(rename = "order")]
    pub position: i32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = links)]
pub struct NewLink<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub url: &'a str,
    pub icon: Option<&'a str>,
    pub logo_image: Option<&'a str>,
    pub color: Option<&'a str>,
    pub active: bool,
    pub position: i32,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = links)]
pub struct LinkChanges {
    pub title: Option<String>,
    pub url: Option<String>,
    pub icon: Option<Option<String>>,
    pub logo_image: Option<Option<String>>,
    pub color: Option<Option<String>>,
    pub active: Option<bool>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Queryable, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MidContent {
    pub id: String,
    pub image: Option<String>,
    pub headline: String,
    pub description: String,
    pub link_buttons: String,
    #[serde(rename = "order")]
    pub position: i32,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = mid_contents)]
pub struct NewMidContent<'a> {
    pub id: &'a str,
    pub image: Option<&'a str>,
    pub headline: &'a str,
    pub description: &'a str,
    pub link_buttons: &'a str,
    pub position: i32,
    pub active: bool,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = mid_contents)]
pub struct MidContentChanges {
    pub image: Option<Option<String>>,
    pub headline: Option<String>,
    pub description: Option<String>,
    pub link_buttons: Option<String>,
    pub active: Option<bool>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Queryable, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Upload {
    pub id: String,
    pub filename: String,
    pub original: String,
    pub path: String,
    pub mime_type: String,
    pub size: i32,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub created_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = uploads)]
pub struct NewUpload<'a> {
    pub id: &'a str,
    pub filename: &'a str,
    pub original: &'a str,
    pub path: &'a str,
    pub mime_type: &'a str,
    pub size: i32,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub created_at: &'a str,
}

#[derive(Debug, Queryable)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// What the users API returns; the password hash never leaves the server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub created_at: String,
}

impl From<User> for UserView {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub id: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub name: Option<&'a str>,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

#[derive(Debug, Queryable, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub id: String,
    pub site_title: String,
    pub site_description: String,
    pub site_url: String,
    pub site_logo: Option<String>,
    pub hero_title: String,
    pub hero_subtitle: String,
    pub hero_image: Option<String>,
    pub meta_title: String,
    pub meta_description: String,
    pub og_image: Option<String>,
    pub theme: String,
    pub social_links: String,
    pub footer_text: String,
    pub favicon: Option<String>,
    pub updated_at: String,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = settings)]
pub struct SettingsChanges {
    pub site_title: Option<String>,
    pub site_description: Option<String>,
    pub site_url: Option<String>,
    pub site_logo: Option<Option<String>>,
    pub hero_title: Option<String>,
    pub hero_subtitle: Option<String>,
    pub hero_image: Option<Option<String>>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub og_image: Option<Option<String>>,
    pub theme: Option<String>,
    pub social_links: Option<String>,
    pub footer_text: Option<String>,
    pub favicon: Option<Option<String>>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = sessions)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub expires_at: String,
    pub created_at: String,
}
