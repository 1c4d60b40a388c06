#[cfg(test)]
mod tests;

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::{debug, warn};

pub type DbPool = Pool<Sqlite>;

/// One audit trail row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuditRecord {
    pub id: i64,
    pub actor: String,
    pub action: String,
    pub detail: String,
    pub created_at: DateTime<Utc>,
}

/// SQLite-backed audit trail for ingestion, deletion, and query events.
///
/// The audit log is a side channel: `record` swallows its own failures so a
/// broken trail can never abort the primary request path.
#[derive(Debug, Clone)]
pub struct AuditLog {
    pool: DbPool,
}

impl AuditLog {
    #[inline]
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to create audit database connection pool")?;

        let log = Self { pool };
        log.initialize_schema().await?;

        Ok(log)
    }

    #[inline]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn initialize_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                actor TEXT NOT NULL,
                action TEXT NOT NULL,
                detail TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create audit_log table")?;

        debug!("Audit log schema ready");
        Ok(())
    }

    /// Record an action. Failures are logged and swallowed.
    #[inline]
    pub async fn record(&self, actor: &str, action: &str, detail: &serde_json::Value) {
        if let Err(e) = self.try_record(actor, action, detail).await {
            warn!("Failed to record audit entry '{}': {}", action, e);
        }
    }

    async fn try_record(
        &self,
        actor: &str,
        action: &str,
        detail: &serde_json::Value,
    ) -> Result<()> {
        sqlx::query("INSERT INTO audit_log (actor, action, detail, created_at) VALUES (?, ?, ?, ?)")
            .bind(actor)
            .bind(action)
            .bind(detail.to_string())
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .context("Failed to insert audit entry")?;

        debug!("Recorded audit entry: {} by {}", action, actor);
        Ok(())
    }

    /// Most recent entries, newest first.
    #[inline]
    pub async fn recent(&self, limit: i64) -> Result<Vec<AuditRecord>> {
        let records = sqlx::query_as::<_, AuditRecord>(
            "SELECT id, actor, action, detail, created_at
             FROM audit_log
             ORDER BY id DESC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch audit entries")?;

        Ok(records)
    }
}
