use std::sync::Arc;

use crate::config::SiteConfig;
use crate::handler::SiteDB;
use crate::rate_limit::RateLimiter;
use crate::uploads::UploadStore;

pub mod links;
pub mod media;
pub mod mid_content;
pub mod pages;
pub mod posts;
pub mod session;
pub mod settings;
pub mod users;

/// Everything a request handler needs, cloned cheaply per request.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<SiteDB>,
    pub store: UploadStore,
    pub http_client: reqwest::Client,
    pub limiter: Arc<RateLimiter>,
    pub config: Arc<SiteConfig>,
}

pub(crate) fn ensure(condition: bool, message: &str) -> Result<(), crate::errors::AppError> {
    if condition {
        Ok(())
    } else {
        Err(crate::errors::AppError::Validation(message.to_string()))
    }
}

pub(crate) fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
