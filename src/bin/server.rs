use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use clap::Parser;
use diesel::prelude::*;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use linkbio::auth;
use linkbio::config::SiteConfig;
use linkbio::handler::SiteDB;
use linkbio::handlers::{self, AppState};
use linkbio::models::NewUser;
use linkbio::rate_limit::RateLimiter;
use linkbio::uploads::UploadStore;

// Large enough that the pipeline's own 5 MiB gate is what callers hit.
const BODY_LIMIT: usize = 16 * 1024 * 1024;

#[derive(Parser)]
#[command(author, version, about)]
struct Opt {
    /// Configuration file to use
    #[arg(short, long, default_value = "linkbio.toml")]
    config: String,
}

/// Without at least one admin there is no way to log in and create one, so
/// a fresh database gets the seed account.
fn bootstrap_admin(conn: &mut SqliteConnection) -> Result<(), anyhow::Error> {
    use linkbio::schema::users::dsl::*;

    let total: i64 = users.count().get_result(conn)?;
    if total > 0 {
        return Ok(());
    }

    let user_id = uuid::Uuid::new_v4().to_string();
    let hash = auth::hash_password("changeme123")
        .map_err(|e| anyhow::anyhow!("seed password hash failed: {:?}", e))?;
    let now = chrono::Utc::now().to_rfc3339();

    diesel::insert_into(users)
        .values(&NewUser {
            id: &user_id,
            email: "admin@example.com",
            password: &hash,
            name: Some("Admin"),
            created_at: &now,
            updated_at: &now,
        })
        .execute(conn)?;

    warn!("seeded admin@example.com with the default password; change it");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let opt = Opt::parse();
    let raw = std::fs::read_to_string(&opt.config)
        .with_context(|| format!("reading config file {}", opt.config))?;
    let config: Arc<SiteConfig> = Arc::new(toml::from_str(&raw)?);

    let dbpool = Arc::new(linkbio::new_dbconn_pool(&config.database_url)?);
    {
        let mut conn = dbpool.get()?;
        linkbio::apply_schema(&mut conn)?;
        bootstrap_admin(&mut conn)?;
    }
    info!("database ready at {}", config.database_url);

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.fetch.timeout_seconds))
        .user_agent(concat!("linkbio-image-import/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let state = AppState {
        db: Arc::new(SiteDB::new(dbpool)),
        store: UploadStore::new(&config.uploads_dir),
        http_client,
        limiter: Arc::new(RateLimiter::new(
            config.auth.login_max_attempts,
            Duration::from_secs(config.auth.login_window_seconds),
        )),
        config: config.clone(),
    };

    let app = Router::new()
        .route("/api/auth/login", post(handlers::session::login))
        .route("/api/auth/logout", post(handlers::session::logout))
        .route(
            "/api/posts",
            get(handlers::posts::list_posts).post(handlers::posts::create_post),
        )
        .route(
            "/api/posts/:id",
            get(handlers::posts::get_post)
                .put(handlers::posts::update_post)
                .delete(handlers::posts::delete_post),
        )
        .route(
            "/api/links",
            get(handlers::links::list_links).post(handlers::links::create_link),
        )
        .route("/api/links/reorder", put(handlers::links::reorder_links))
        .route(
            "/api/links/:id",
            put(handlers::links::update_link).delete(handlers::links::delete_link),
        )
        .route(
            "/api/mid-content",
            get(handlers::mid_content::list_mid_content)
                .post(handlers::mid_content::create_mid_content),
        )
        .route(
            "/api/mid-content/reorder",
            put(handlers::mid_content::reorder_mid_content),
        )
        .route(
            "/api/mid-content/:id",
            put(handlers::mid_content::update_mid_content)
                .delete(handlers::mid_content::delete_mid_content),
        )
        .route("/api/pages", get(handlers::pages::list_pages))
        .route(
            "/api/pages/:slug",
            get(handlers::pages::get_page).put(handlers::pages::upsert_page),
        )
        .route(
            "/api/settings",
            get(handlers::settings::get_settings).put(handlers::settings::update_settings),
        )
        .route(
            "/api/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/api/users/change-password",
            put(handlers::users::change_password),
        )
        .route(
            "/api/users/:id",
            put(handlers::users::update_user).delete(handlers::users::delete_user),
        )
        .route("/api/upload", post(handlers::media::upload))
        .route("/api/upload/from-url", post(handlers::media::upload_from_url))
        .route("/uploads/*path", get(handlers::media::serve_upload))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
