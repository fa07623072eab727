use std::sync::Arc;

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::SqliteConnection;
use tracing::error;

use crate::errors::AppError;

pub trait WithDB {
    fn dbpool(&self) -> &Pool<ConnectionManager<SqliteConnection>>;

    fn handle_errors(&self, e: diesel::result::Error) -> AppError {
        match e {
            diesel::result::Error::NotFound => AppError::NotFound,
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                info,
            ) => AppError::Conflict(info.message().to_string()),
            _ => {
                error!("{:?}", e);
                AppError::Database(e)
            }
        }
    }

    fn dbconn(
        &self,
    ) -> Result<PooledConnection<ConnectionManager<SqliteConnection>>, AppError> {
        self.dbpool().get().map_err(|e| {
            error!("{:?}", e);
            AppError::Internal(anyhow::Error::new(e))
        })
    }

    fn run_txn<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, diesel::result::Error>,
    {
        let mut conn = self.dbconn()?;
        conn.transaction(|conn| f(conn))
            .map_err(|e| self.handle_errors(e))
    }
}

pub struct SiteDB {
    dbpool: Arc<Pool<ConnectionManager<SqliteConnection>>>,
}

impl SiteDB {
    pub fn new(dbpool: Arc<Pool<ConnectionManager<SqliteConnection>>>) -> Self {
        Self { dbpool }
    }
}

impl WithDB for SiteDB {
    fn dbpool(&self) -> &Pool<ConnectionManager<SqliteConnection>> {
        &self.dbpool
    }
}
