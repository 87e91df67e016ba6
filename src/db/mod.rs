use crate::core::{AppError, ServiceError};
use sqlx::mysql::{MySql, MySqlConnection, MySqlPool, MySqlPoolOptions};
use sqlx::Transaction;
use std::time::Duration;
use tracing::{debug, error};

const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Db {
    pool: MySqlPool,
}

impl Db {
    /// Builds the pool without touching the network; connections are opened
    /// on first use.
    pub fn connect_lazy(database_uri: &str) -> Result<Self, AppError> {
        Self::connect_lazy_with(database_uri, ACQUIRE_TIMEOUT)
    }

    /// Like [`Db::connect_lazy`], giving up on a connection after `acquire_timeout`.
    pub fn connect_lazy_with(
        database_uri: &str,
        acquire_timeout: Duration,
    ) -> Result<Self, AppError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(acquire_timeout)
            .connect_lazy(&driver_uri(database_uri))?;
        Ok(Self { pool })
    }

    /// Opens a unit of work. Dropping the session without committing rolls
    /// it back.
    pub async fn session(&self) -> Result<Session, ServiceError> {
        debug!("getting database session");
        let tx = self.pool.begin().await.map_err(|e| {
            error!(error = %e, "failed to open database session");
            ServiceError::from(e)
        })?;
        Ok(Session { tx: Some(tx) })
    }

    /// Runs `SELECT 1` inside its own session.
    pub async fn health(&self) -> Result<bool, ServiceError> {
        let mut session = self.session().await?;
        let probe = sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(session.conn()?)
            .await;
        match probe {
            Ok(v) => {
                session.commit().await?;
                Ok(v == 1)
            }
            Err(e) => {
                // rollback failures are already logged
                let _ = session.rollback().await;
                Err(e.into())
            }
        }
    }
}

pub struct Session {
    tx: Option<Transaction<'static, MySql>>,
}

impl Session {
    pub fn conn(&mut self) -> Result<&mut MySqlConnection, ServiceError> {
        match self.tx.as_mut() {
            Some(tx) => Ok(&mut **tx),
            None => Err(ServiceError::Database("session already closed".into())),
        }
    }

    pub async fn commit(mut self) -> Result<(), ServiceError> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }
        Ok(())
    }

    pub async fn rollback(mut self) -> Result<(), ServiceError> {
        if let Some(tx) = self.tx.take() {
            if let Err(e) = tx.rollback().await {
                error!(error = %e, "database session rollback failed");
                return Err(e.into());
            }
        }
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.tx.is_some() {
            debug!("database session dropped without commit, rolling back");
        }
        debug!("database session closed");
    }
}

/// The driver only understands the bare `mysql` scheme, so `mysql+pymysql`
/// style dialect suffixes are stripped.
fn driver_uri(database_uri: &str) -> String {
    match database_uri.split_once("://") {
        Some((scheme, rest)) => {
            let base = scheme.split('+').next().unwrap_or(scheme);
            format!("{base}://{rest}")
        }
        None => database_uri.to_string(),
    }
}
