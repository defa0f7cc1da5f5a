//! PostgreSQL implementation of the forensic store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};

use super::{ForensicRecord, ForensicStore, ForensicStoreError, Grantor};

/// SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL-backed forensic store.
#[derive(Clone)]
pub struct PostgresForensicStore {
    pool: PgPool,
}

/// Row type for record queries.
#[derive(FromRow)]
struct RecordRow {
    document_id: String,
    recipient_email: String,
    grantor_id: String,
    watermark_hash: String,
    signature: String,
    device_hash: String,
    created_at: DateTime<Utc>,
}

impl From<RecordRow> for ForensicRecord {
    fn from(row: RecordRow) -> Self {
        Self {
            document_id: row.document_id,
            recipient_email: row.recipient_email,
            grantor_id: row.grantor_id,
            watermark_hash: row.watermark_hash,
            signature: row.signature,
            device_hash: row.device_hash,
            created_at: row.created_at,
        }
    }
}

/// Row type for grantor queries.
#[derive(FromRow)]
struct GrantorRow {
    id: String,
    email: String,
    display_name: Option<String>,
}

impl From<GrantorRow> for Grantor {
    fn from(row: GrantorRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            display_name: row.display_name,
        }
    }
}

impl PostgresForensicStore {
    /// Connect to `database_url` and run migrations.
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, ForensicStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .connect(database_url)
            .await
            .map_err(|e| ForensicStoreError::Connection(e.to_string()))?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::info!(
            max_connections = max_connections,
            "Forensic store connected and migrations applied"
        );

        Ok(Self { pool })
    }

    /// Create a store from an existing pool (for testing).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ForensicStore for PostgresForensicStore {
    async fn insert(&self, record: &ForensicRecord) -> Result<(), ForensicStoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO forensic_records
                (document_id, recipient_email, grantor_id, watermark_hash, signature, device_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&record.document_id)
        .bind(&record.recipient_email)
        .bind(&record.grantor_id)
        .bind(&record.watermark_hash)
        .bind(&record.signature)
        .bind(&record.device_hash)
        .bind(record.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                tracing::debug!(document_id = %record.document_id, "Stored forensic record");
                Ok(())
            }
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                Err(ForensicStoreError::Conflict {
                    document_id: record.document_id.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get(
        &self,
        document_id: &str,
        recipient_email: &str,
    ) -> Result<Option<ForensicRecord>, ForensicStoreError> {
        let row: Option<RecordRow> = sqlx::query_as(
            r#"
            SELECT document_id, recipient_email, grantor_id, watermark_hash, signature, device_hash, created_at
            FROM forensic_records
            WHERE document_id = $1 AND recipient_email = $2
            "#,
        )
        .bind(document_id)
        .bind(recipient_email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn grantor(&self, grantor_id: &str) -> Result<Option<Grantor>, ForensicStoreError> {
        let row: Option<GrantorRow> = sqlx::query_as(
            r#"
            SELECT id, email, display_name
            FROM grantors
            WHERE id = $1
            "#,
        )
        .bind(grantor_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn ping(&self) -> Result<(), ForensicStoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| ForensicStoreError::Connection(e.to_string()))?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
