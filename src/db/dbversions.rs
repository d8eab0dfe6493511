use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Error as SqlxError;
use std::time::Duration;
use tracing::{error, info};

use super::VersionStore;
use crate::models::{SyncError, Version};

const CREATE_SCHEMA_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS document_versions (
        document    TEXT        NOT NULL,
        number      INTEGER     NOT NULL CHECK (number >= 1),
        content     TEXT        NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (document, number)
    )
"#;

/// Version row from database
#[derive(Debug, Clone, sqlx::FromRow)]
struct VersionRow {
    number: i32,
    content: String,
    created_at: DateTime<Utc>,
}

impl From<VersionRow> for Version {
    fn from(row: VersionRow) -> Self {
        Version {
            number: row.number as u32,
            content: row.content,
            created_at: row.created_at,
        }
    }
}

fn unavailable(e: SqlxError) -> SyncError {
    SyncError::StorageUnavailable(e.to_string())
}

/// PostgreSQL backed version store
pub struct PgVersionStore {
    pool: PgPool,
}

impl PgVersionStore {
    /// Create a new database connection pool
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    ///
    /// # Returns
    /// * `Result<Self, SqlxError>` - Database connection pool or error
    pub async fn connect(database_url: &str) -> Result<Self, SqlxError> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2) // Keep some connections alive
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600)) // Close idle connections after 10 minutes
            .max_lifetime(Duration::from_secs(1800)) // Recycle connections after 30 minutes
            .connect(database_url)
            .await?;

        info!("Database connection pool created successfully");

        Ok(Self { pool })
    }

    /// Create the versions table when it does not exist yet.
    pub async fn migrate(&self) -> Result<(), SqlxError> {
        sqlx::query(CREATE_SCHEMA_SQL).execute(&self.pool).await?;
        info!("Schema for document_versions is in place");
        Ok(())
    }

    fn log_pool_state(&self, action: &str, doc_id: &str) {
        let pool_idle = self.pool.num_idle() as u32;
        let pool_size = self.pool.size();
        info!(
            "{} for document '{}'. Pool connections: {} idle, {} in use",
            action,
            doc_id,
            pool_idle,
            pool_size.saturating_sub(pool_idle)
        );
    }
}

#[async_trait]
impl VersionStore for PgVersionStore {
    async fn append_version(&self, doc_id: &str, content: &str) -> Result<u32, SyncError> {
        self.log_pool_state("Appending version", doc_id);

        // Begin a transaction
        let mut tx = match self.pool.begin().await {
            Ok(tx) => tx,
            Err(e) => {
                error!(
                    "Failed to acquire connection from pool for document {}: {}. Pool state: {} idle, {} total",
                    doc_id,
                    e,
                    self.pool.num_idle(),
                    self.pool.size()
                );
                return Err(unavailable(e));
            }
        };

        // Concurrent saves of one document take turns, so numbers stay contiguous
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(doc_id)
            .execute(&mut *tx)
            .await
            .map_err(unavailable)?;

        let query_sql = r#"
            INSERT INTO document_versions (document, number, content)
            SELECT $1, COALESCE(MAX(number), 0) + 1, $2
            FROM document_versions
            WHERE document = $1
            RETURNING number;
        "#;
        let number: i32 = sqlx::query_scalar(query_sql)
            .bind(doc_id)
            .bind(content)
            .fetch_one(&mut *tx)
            .await
            .map_err(unavailable)?;

        // Commit the transaction
        tx.commit().await.map_err(unavailable)?;

        info!("Version {} of document '{}' saved", number, doc_id);
        Ok(number as u32)
    }

    async fn update_version(&self, doc_id: &str, number: u32, content: &str) -> Result<(), SyncError> {
        self.log_pool_state("Updating version", doc_id);

        let query_sql = r#"
            UPDATE document_versions
            SET content = $3,
                updated_at = NOW()
            WHERE document = $1
                AND number = $2;
        "#;
        let result = sqlx::query(query_sql)
            .bind(doc_id)
            .bind(number as i32)
            .bind(content)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;

        if result.rows_affected() == 0 {
            return Err(SyncError::NotFound {
                document: doc_id.to_string(),
                version: number,
            });
        }

        info!("Version {} of document '{}' updated in place", number, doc_id);
        Ok(())
    }

    async fn get_version(&self, doc_id: &str, number: u32) -> Result<Version, SyncError> {
        let query_sql = r#"
            SELECT number, content, created_at
            FROM document_versions
            WHERE document = $1
                AND number = $2;
        "#;
        let row = sqlx::query_as::<_, VersionRow>(query_sql)
            .bind(doc_id)
            .bind(number as i32)
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;

        match row {
            Some(row) => Ok(row.into()),
            None => Err(SyncError::NotFound {
                document: doc_id.to_string(),
                version: number,
            }),
        }
    }

    async fn count(&self, doc_id: &str) -> Result<u32, SyncError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM document_versions WHERE document = $1")
            .bind(doc_id)
            .fetch_one(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(count as u32)
    }
}
