//! SQLite adapter for the bundle repository.
//!
//! One shared connection serves every query. File databases run in WAL mode
//! so readers are never blocked by the writer. Schema and indices are created
//! on connect; the `bundles` table layout is an on-disk contract shared with
//! external tooling and must not drift.

use crate::traits::BundleStore;
use crate::{StoreError, StoreResult};
use async_trait::async_trait;
use bifrost_types::{Bundle, BundleFilter, BundleId, BundleUpdate, Transition};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{QueryBuilder, Row, Sqlite};
use std::path::Path;
use std::str::FromStr;

const BUNDLE_COLUMNS: &str = "id, version, tag, note, author, is_disposed, created_at";

/// SQLite-backed bundle store.
#[derive(Clone)]
pub struct SqliteBundleStore {
    pool: SqlitePool,
}

impl SqliteBundleStore {
    /// Open (creating if missing) a database file and initialize the schema.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Backend(format!(
                    "failed to create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        Self::connect_with(options).await
    }

    /// Private in-memory database, mainly for tests.
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StoreError::Backend(format!("invalid sqlite options: {e}")))?;
        Self::connect_with(options).await
    }

    /// Create adapter from an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> StoreResult<Self> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn connect_with(options: SqliteConnectOptions) -> StoreResult<Self> {
        // A single connection that never idles out; an in-memory database
        // lives exactly as long as its connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Backend(format!("failed to open sqlite: {e}")))?;
        Self::from_pool(pool).await
    }

    async fn init_schema(&self) -> StoreResult<()> {
        let ddl = [
            r#"
            CREATE TABLE IF NOT EXISTS bundles (
                id TEXT PRIMARY KEY NOT NULL,
                version TEXT NOT NULL,
                tag TEXT NOT NULL,
                note TEXT,
                author TEXT NOT NULL,
                is_disposed INTEGER NOT NULL DEFAULT 0 CHECK (is_disposed IN (0, 1)),
                created_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_bundles_version_tag_disposed_created
            ON bundles (version, tag, is_disposed, created_at DESC)
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_bundles_author_disposed_created
            ON bundles (author, is_disposed, created_at DESC)
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_bundles_disposed_created
            ON bundles (is_disposed, created_at DESC)
            "#,
        ];

        for stmt in ddl {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Backend(format!("schema init failed: {e}")))?;
        }
        tracing::debug!("sqlite: bundles table ready");
        Ok(())
    }
}

#[async_trait]
impl BundleStore for SqliteBundleStore {
    async fn save(&self, bundle: &Bundle) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bundles (id, version, tag, note, author, is_disposed, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(bundle.id.as_str())
        .bind(&bundle.version)
        .bind(&bundle.tag)
        .bind(&bundle.note)
        .bind(&bundle.author)
        .bind(i64::from(bundle.is_disposed))
        .bind(format_timestamp(&bundle.created_at))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_conflict)?;

        Ok(())
    }

    async fn get_by_id(&self, id: &BundleId) -> StoreResult<Option<Bundle>> {
        let row = sqlx::query(&format!("SELECT {BUNDLE_COLUMNS} FROM bundles WHERE id = ?"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        row.map(bundle_from_row).transpose()
    }

    async fn get_by_version_tag(&self, version: &str, tag: &str) -> StoreResult<Option<Bundle>> {
        tracing::debug!(version, tag, "querying latest active bundle");
        let row = sqlx::query(&format!(
            r#"
            SELECT {BUNDLE_COLUMNS}
              FROM bundles
             WHERE version = ? AND tag = ? AND is_disposed = 0
             ORDER BY created_at DESC, rowid DESC
             LIMIT 1
            "#
        ))
        .bind(version)
        .bind(tag)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        row.map(bundle_from_row).transpose()
    }

    async fn list(&self, filter: &BundleFilter) -> StoreResult<Vec<Bundle>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {BUNDLE_COLUMNS} FROM bundles"));

        let mut sep = " WHERE ";
        if !filter.include_disposed {
            qb.push(sep).push("is_disposed = 0");
            sep = " AND ";
        }
        if let Some(author) = &filter.author {
            qb.push(sep).push("author = ").push_bind(author.clone());
            sep = " AND ";
        }
        if let Some(version) = &filter.version {
            qb.push(sep).push("version = ").push_bind(version.clone());
            sep = " AND ";
        }
        if let Some(tag) = &filter.tag {
            qb.push(sep).push("tag = ").push_bind(tag.clone());
        }

        qb.push(" ORDER BY created_at DESC, rowid DESC");

        // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded.
        match (filter.limit, filter.offset) {
            (None, None) => {}
            (limit, offset) => {
                let limit = limit.map(to_i64).transpose()?.unwrap_or(-1);
                qb.push(" LIMIT ").push_bind(limit);
                if let Some(offset) = offset {
                    qb.push(" OFFSET ").push_bind(to_i64(offset)?);
                }
            }
        }

        tracing::debug!(sql = qb.sql(), "listing bundles");
        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        rows.into_iter().map(bundle_from_row).collect()
    }

    async fn update(&self, id: &BundleId, update: &BundleUpdate) -> StoreResult<Bundle> {
        let Some(note) = &update.note else {
            return Err(StoreError::NoChanges(format!(
                "no fields provided to update for bundle {}",
                id
            )));
        };

        let result = sqlx::query("UPDATE bundles SET note = ? WHERE id = ?")
            .bind(note)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("bundle {} not found", id)));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("bundle {} not found", id)))
    }

    async fn set_disposed(
        &self,
        id: &BundleId,
        disposed: bool,
    ) -> StoreResult<(Transition, Bundle)> {
        let target = i64::from(disposed);
        let row = sqlx::query(&format!(
            r#"
            UPDATE bundles
               SET is_disposed = ?
             WHERE id = ?
               AND is_disposed != ?
            RETURNING {BUNDLE_COLUMNS}
            "#
        ))
        .bind(target)
        .bind(id.as_str())
        .bind(target)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        if let Some(row) = row {
            return Ok((Transition::Applied, bundle_from_row(row)?));
        }

        match self.get_by_id(id).await? {
            Some(bundle) => Ok((Transition::Unchanged, bundle)),
            None => Err(StoreError::NotFound(format!("bundle {} not found", id))),
        }
    }
}

fn bundle_from_row(row: SqliteRow) -> StoreResult<Bundle> {
    let id: String = row
        .try_get("id")
        .map_err(|e| StoreError::InvalidData(e.to_string()))?;
    let note: Option<String> = row
        .try_get("note")
        .map_err(|e| StoreError::InvalidData(e.to_string()))?;
    let is_disposed: i64 = row
        .try_get("is_disposed")
        .map_err(|e| StoreError::InvalidData(e.to_string()))?;
    let created_at: String = row
        .try_get("created_at")
        .map_err(|e| StoreError::InvalidData(e.to_string()))?;

    Ok(Bundle {
        id: BundleId::new(id),
        version: row
            .try_get("version")
            .map_err(|e| StoreError::InvalidData(e.to_string()))?,
        tag: row
            .try_get("tag")
            .map_err(|e| StoreError::InvalidData(e.to_string()))?,
        note: note.unwrap_or_default(),
        author: row
            .try_get("author")
            .map_err(|e| StoreError::InvalidData(e.to_string()))?,
        is_disposed: is_disposed != 0,
        created_at: parse_timestamp(&created_at)?,
    })
}

/// `2025-01-01T00:00:00.000Z`: millisecond RFC 3339, sortable as text.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidData(format!("invalid created_at {raw:?}: {e}")))
}

fn map_sqlx_conflict(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::Conflict(db_err.message().to_string())
        }
        _ => StoreError::Backend(err.to_string()),
    }
}

fn to_i64(value: usize) -> StoreResult<i64> {
    i64::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("value {value} exceeds i64 range")))
}
