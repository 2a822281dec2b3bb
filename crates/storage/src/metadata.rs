//! Durable email metadata in SQLite.

use chrono::Utc;
use newsbrief_core::error::StorageError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// Metadata for one processed email.
#[derive(Debug, Clone)]
pub struct EmailMetadata {
    pub email_id: String,
    pub subject: String,
    pub sender: String,
    pub received_at: String,
    /// Number of chunks this email's body was split into
    pub chunk_count: i64,
    /// Cleaned links harvested from the email body
    pub links: Vec<String>,
    /// Headlines extracted from the email at processing time
    pub headlines: Vec<String>,
    /// ID of the analysis produced for this email, once analyzed
    pub analysis_id: Option<String>,
    pub stored_at: String,
}

/// SQLite-backed store for email metadata.
pub struct MetadataStore {
    pool: SqlitePool,
}

impl MetadataStore {
    /// Open (or create) the metadata database at `path`.
    ///
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database
    /// (useful for tests).
    pub async fn new(path: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StorageError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("Email metadata store initialized at {path}");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS email_metadata (
                email_id     TEXT PRIMARY KEY,
                subject      TEXT NOT NULL,
                sender       TEXT NOT NULL,
                received_at  TEXT NOT NULL,
                chunk_count  INTEGER NOT NULL DEFAULT 0,
                links        TEXT NOT NULL DEFAULT '[]',
                headlines    TEXT NOT NULL DEFAULT '[]',
                analysis_id  TEXT,
                stored_at    TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::MigrationFailed(format!("email_metadata table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_email_received_at ON email_metadata(received_at DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::MigrationFailed(format!("received_at index: {e}")))?;

        debug!("Metadata migrations complete");
        Ok(())
    }

    /// Store metadata for an email. Replaces any existing row with the
    /// same id, so re-fetching an email is harmless.
    pub async fn store(&self, meta: &EmailMetadata) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO email_metadata
                (email_id, subject, sender, received_at, chunk_count, links, headlines, analysis_id, stored_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&meta.email_id)
        .bind(&meta.subject)
        .bind(&meta.sender)
        .bind(&meta.received_at)
        .bind(meta.chunk_count)
        .bind(serde_json::to_string(&meta.links).unwrap_or_else(|_| "[]".into()))
        .bind(serde_json::to_string(&meta.headlines).unwrap_or_else(|_| "[]".into()))
        .bind(&meta.analysis_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Storage(format!("store failed: {e}")))?;

        Ok(())
    }

    /// Get metadata by email id.
    pub async fn get(&self, email_id: &str) -> Result<EmailMetadata, StorageError> {
        let row = sqlx::query("SELECT * FROM email_metadata WHERE email_id = ?")
            .bind(email_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Storage(format!("get failed: {e}")))?
            .ok_or_else(|| StorageError::NotFound(email_id.to_string()))?;

        Self::row_to_metadata(&row)
    }

    /// Record the analysis id for an already-stored email.
    pub async fn set_analysis_id(
        &self,
        email_id: &str,
        analysis_id: &str,
    ) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE email_metadata SET analysis_id = ? WHERE email_id = ?")
            .bind(analysis_id)
            .bind(email_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Storage(format!("update failed: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(email_id.to_string()));
        }
        Ok(())
    }

    /// List all stored emails, newest first.
    pub async fn list(&self) -> Result<Vec<EmailMetadata>, StorageError> {
        let rows = sqlx::query("SELECT * FROM email_metadata ORDER BY received_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Storage(format!("list failed: {e}")))?;

        rows.iter().map(Self::row_to_metadata).collect()
    }

    fn row_to_metadata(row: &sqlx::sqlite::SqliteRow) -> Result<EmailMetadata, StorageError> {
        let links_json: String = row
            .try_get("links")
            .map_err(|e| StorageError::Storage(format!("links column: {e}")))?;
        let links: Vec<String> = serde_json::from_str(&links_json)
            .map_err(|e| StorageError::Storage(format!("links decode: {e}")))?;
        let headlines_json: String = row
            .try_get("headlines")
            .map_err(|e| StorageError::Storage(format!("headlines column: {e}")))?;
        let headlines: Vec<String> = serde_json::from_str(&headlines_json)
            .map_err(|e| StorageError::Storage(format!("headlines decode: {e}")))?;

        Ok(EmailMetadata {
            email_id: row
                .try_get("email_id")
                .map_err(|e| StorageError::Storage(format!("email_id column: {e}")))?,
            subject: row
                .try_get("subject")
                .map_err(|e| StorageError::Storage(format!("subject column: {e}")))?,
            sender: row
                .try_get("sender")
                .map_err(|e| StorageError::Storage(format!("sender column: {e}")))?,
            received_at: row
                .try_get("received_at")
                .map_err(|e| StorageError::Storage(format!("received_at column: {e}")))?,
            chunk_count: row
                .try_get("chunk_count")
                .map_err(|e| StorageError::Storage(format!("chunk_count column: {e}")))?,
            links,
            headlines,
            analysis_id: row
                .try_get("analysis_id")
                .map_err(|e| StorageError::Storage(format!("analysis_id column: {e}")))?,
            stored_at: row
                .try_get("stored_at")
                .map_err(|e| StorageError::Storage(format!("stored_at column: {e}")))?,
        })
    }
}
