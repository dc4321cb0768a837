use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::{HistoryStore, Message, Role};
use crate::core::errors::HistoryError;

const SCHEMA_VERSION: i64 = 1;

#[derive(Debug, Clone)]
pub struct SqliteHistoryStore {
    db_path: PathBuf,
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    pub async fn new(db_path: PathBuf) -> Result<Self, HistoryError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| HistoryError::Directory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let connect_options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(connect_options)
            .await?;

        let store = Self { db_path, pool };
        store.init_db().await?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    async fn init_db(&self) -> Result<(), HistoryError> {
        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await?;

        if version == SCHEMA_VERSION {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "\
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                role TEXT NOT NULL CHECK(role IN ('user', 'bot')),
                content TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            )",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_session_ts ON messages(session_id, timestamp, id)",
        )
        .execute(&mut *tx)
        .await?;

        let pragma = format!("PRAGMA user_version = {}", SCHEMA_VERSION);
        sqlx::query(&pragma).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Largest timestamp across all sessions, used to seed the clock at startup.
    pub async fn latest_timestamp(&self) -> Result<Option<i64>, HistoryError> {
        let latest: Option<i64> = sqlx::query_scalar("SELECT MAX(timestamp) FROM messages")
            .fetch_one(&self.pool)
            .await?;
        Ok(latest)
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn append(
        &self,
        session_id: &str,
        role: Role,
        text: &str,
        timestamp: i64,
    ) -> Result<(), HistoryError> {
        sqlx::query(
            "INSERT INTO messages (session_id, role, content, timestamp) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(session_id)
        .bind(role.as_str())
        .bind(text)
        .bind(timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn query_ordered(&self, session_id: &str) -> Result<Vec<Message>, HistoryError> {
        let rows = sqlx::query(
            "\
            SELECT session_id, role, content, timestamp
            FROM messages
            WHERE session_id = ?1
            ORDER BY timestamp ASC, id ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(message_from_row).collect()
    }

    async fn delete_before(&self, session_id: &str, cutoff: i64) -> Result<u64, HistoryError> {
        let result = sqlx::query("DELETE FROM messages WHERE session_id = ?1 AND timestamp < ?2")
            .bind(session_id)
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn replace_before(
        &self,
        session_id: &str,
        cutoff: i64,
        replacement: &Message,
    ) -> Result<u64, HistoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM messages WHERE session_id = ?1 AND timestamp < ?2")
            .bind(session_id)
            .bind(cutoff)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO messages (session_id, role, content, timestamp) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(session_id)
        .bind(replacement.role.as_str())
        .bind(&replacement.text)
        .bind(replacement.timestamp)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }
}

fn message_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Message, HistoryError> {
    let role: String = row.try_get("role")?;

    Ok(Message {
        session_id: row.try_get("session_id")?,
        role: role.parse()?,
        text: row.try_get("content")?,
        timestamp: row.try_get("timestamp")?,
    })
}
