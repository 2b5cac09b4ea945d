use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::{domain::BugId, error::BugError, protocol::BugRecord};

/// Persistent record cache shared by every presenter session. Reads for
/// different ids may run concurrently; writes to the same id are
/// last-write-wins.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn save_bug(&self, record: &BugRecord) -> Result<()> {
        let payload = record
            .data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .with_context(|| format!("failed to serialize payload for bug {}", record.bug_id.0))?;

        sqlx::query(
            "INSERT INTO bugs (bug_id, payload, error_code, error_message, fetched_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(bug_id) DO UPDATE SET
                payload = excluded.payload,
                error_code = excluded.error_code,
                error_message = excluded.error_message,
                fetched_at = excluded.fetched_at",
        )
        .bind(record.bug_id.0)
        .bind(payload)
        .bind(record.error.as_ref().map(|error| error.code))
        .bind(record.error.as_ref().map(|error| error.message.as_str()))
        .bind(record.fetched_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_bug(&self, bug_id: BugId) -> Result<Option<BugRecord>> {
        let row = sqlx::query(
            "SELECT bug_id, payload, error_code, error_message, fetched_at
             FROM bugs
             WHERE bug_id = ?",
        )
        .bind(bug_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            let data = r
                .get::<Option<String>, _>(1)
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
                .with_context(|| format!("corrupt cached payload for bug {}", bug_id.0))?;
            let error = r.get::<Option<i64>, _>(2).map(|code| BugError {
                code,
                message: r.get::<Option<String>, _>(3).unwrap_or_default(),
            });
            Ok(BugRecord {
                bug_id: BugId(r.get::<i64, _>(0)),
                data,
                error,
                fetched_at: r.get::<DateTime<Utc>, _>(4),
            })
        })
        .transpose()
    }

    pub async fn delete_bug(&self, bug_id: BugId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM bugs WHERE bug_id = ?")
            .bind(bug_id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_bug_ids(&self) -> Result<Vec<BugId>> {
        let rows = sqlx::query("SELECT bug_id FROM bugs ORDER BY bug_id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| BugId(r.get::<i64, _>(0)))
            .collect())
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
