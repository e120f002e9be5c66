use crate::cache::CacheSnapshot;
use crate::traits::SnapshotMirror;
use crate::types::{AggregatorError, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::time::Duration;
use tracing::info;

/// Write-through copy of published snapshots in PostgreSQL, stored as
/// key → JSONB with an expiry. Nothing reads it back for correctness.
pub struct PgSnapshotMirror {
    pool: PgPool,
}

impl PgSnapshotMirror {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        let mirror = Self { pool };
        mirror.ensure_schema().await?;
        info!("Snapshot mirror connected");
        Ok(mirror)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS snapshot_mirror (
                key TEXT PRIMARY KEY,
                value JSONB NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotMirror for PgSnapshotMirror {
    async fn store(&self, key: &str, snapshot: &CacheSnapshot, ttl: Duration) -> Result<()> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| AggregatorError::Mirror(format!("invalid ttl: {}", e)))?;
        let expires_at = Utc::now() + ttl;

        sqlx::query(
            r#"
            INSERT INTO snapshot_mirror (key, value, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE SET
                value = EXCLUDED.value,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(key)
        .bind(Json(snapshot))
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AggregatorError::Mirror(e.to_string()))?;

        sqlx::query("DELETE FROM snapshot_mirror WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await
            .map_err(|e| AggregatorError::Mirror(e.to_string()))?;

        Ok(())
    }
}
