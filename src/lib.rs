use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2;

pub mod auth;
pub mod config;
pub mod constants;
pub mod errors;
pub mod handler;
pub mod handlers;
pub mod media_util;
pub mod models;
pub mod ordering;
pub mod post_util;
pub mod rate_limit;
pub mod sanitize;
pub mod schema;
pub mod theme;
pub mod uploads;

pub use crate::constants::*;

pub type DbPool = r2d2::Pool<r2d2::ConnectionManager<SqliteConnection>>;

pub fn new_dbconn_pool(db_file: &str) -> Result<DbPool, anyhow::Error> {
    let manager = r2d2::ConnectionManager::<SqliteConnection>::new(db_file);
    Ok(r2d2::Pool::new(manager)?)
}

/// Applies the embedded schema. Idempotent; the server runs this at startup
/// and db tests run it against in-memory sqlite.
pub fn apply_schema(conn: &mut SqliteConnection) -> Result<(), anyhow::Error> {
    conn.batch_execute(include_str!("../sql/schema.sql"))?;
    Ok(())
}
