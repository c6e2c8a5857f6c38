//! SQLite implementation of `CaptionRepository`.
//!
//! # Schema Versioning
//!
//! The database has a `schema_version` table that tracks the schema version.
//! When the schema needs to change, increment `CURRENT_SCHEMA_VERSION` and add
//! a migration in `run_migrations()`. Migrations run sequentially from the
//! current version to the target version.


use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::warn;
use uuid::Uuid;

use super::CaptionRepository;
use crate::caption::{Caption, CaptionId, UserId};
use crate::error::RepositoryError;
use crate::filter::{FilterOptions, FilterValue};

/// Current schema version. Increment this when making schema changes and add
/// corresponding migration logic in `run_migrations()`.
const CURRENT_SCHEMA_VERSION: i64 = 1;

const CAPTION_COLUMNS: &str = "id, text, author_id, approved, created_at";

/// SQLite-backed caption repository.
///
/// Uses `tokio::task::spawn_blocking` to run synchronous rusqlite operations
/// without blocking the async runtime.
pub struct SqliteRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRepository {
    /// Open (or create) the database at `path` and bring the schema up to date.
    ///
    /// The database is configured with `journal_mode = WAL` and
    /// `busy_timeout = 5000ms` so the bot and the operator CLI can share it.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_string_lossy();
        let is_in_memory = path_str == ":memory:";

        if !is_in_memory && !path_str.is_empty() {
            if let Some(parent) = path_ref.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        RepositoryError::storage(
                            "create database directory",
                            format!("{}: {}", parent.display(), e),
                        )
                    })?;
                }
            }
        }

        let conn = Connection::open(path_ref)
            .map_err(|e| RepositoryError::storage("open database", e.to_string()))?;

        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(|e| RepositoryError::storage("set journal_mode", e.to_string()))?;
        if !journal_mode.eq_ignore_ascii_case("wal")
            && !(is_in_memory && journal_mode.eq_ignore_ascii_case("memory"))
        {
            warn!(
                "SQLite kept journal_mode '{}' instead of WAL; concurrent CLI access may block",
                journal_mode
            );
        }

        conn.execute_batch("PRAGMA busy_timeout = 5000;")
            .map_err(|e| RepositoryError::storage("configure pragmas", e.to_string()))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                version INTEGER NOT NULL
            );
            "#,
        )
        .map_err(|e| RepositoryError::storage("create schema_version table", e.to_string()))?;

        let current_version: i64 = conn
            .query_row(
                "SELECT version FROM schema_version WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| RepositoryError::storage("get schema version", e.to_string()))?
            .unwrap_or(0);

        Self::run_migrations(&conn, current_version)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create a new in-memory SQLite repository (for tests and dry runs).
    pub fn new_in_memory() -> Result<Self, RepositoryError> {
        Self::new(":memory:")
    }

    fn run_migrations(conn: &Connection, from_version: i64) -> Result<(), RepositoryError> {
        if from_version > CURRENT_SCHEMA_VERSION {
            return Err(RepositoryError::storage(
                "schema version",
                format!(
                    "Database schema version {} is newer than supported version {}. \
                     Please upgrade the application.",
                    from_version, CURRENT_SCHEMA_VERSION
                ),
            ));
        }

        if from_version == CURRENT_SCHEMA_VERSION {
            return Ok(());
        }

        if from_version < 1 {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS caption (
                    id TEXT PRIMARY KEY,
                    text TEXT NOT NULL UNIQUE,
                    author_id INTEGER NOT NULL,
                    approved INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_caption_approved
                    ON caption(approved);
                "#,
            )
            .map_err(|e| RepositoryError::storage("migration v1", e.to_string()))?;
        }

        conn.execute(
            "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?1)",
            params![CURRENT_SCHEMA_VERSION],
        )
        .map_err(|e| RepositoryError::storage("update schema version", e.to_string()))?;

        Ok(())
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, operation: &'static str, f: F) -> Result<T, RepositoryError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, RepositoryError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = lock(&conn, operation)?;
            f(&*guard)
        })
        .await
        .map_err(|e| RepositoryError::storage(operation, e.to_string()))?
    }
}

fn lock<'a>(
    conn: &'a Mutex<Connection>,
    operation: &'static str,
) -> Result<MutexGuard<'a, Connection>, RepositoryError> {
    conn.lock()
        .map_err(|_| RepositoryError::storage(operation, "connection mutex poisoned"))
}

// =============================================================================
// Row and filter conversion helpers
// =============================================================================

fn caption_from_row(row: &Row<'_>) -> rusqlite::Result<(String, String, i64, bool, String)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn decode_caption(
    (id, text, author_id, approved, created_at): (String, String, i64, bool, String),
) -> Result<Caption, RepositoryError> {
    let id = Uuid::parse_str(&id).map_err(|_| RepositoryError::corruption("caption id"))?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|_| RepositoryError::corruption("caption timestamp"))?
        .with_timezone(&Utc);
    Ok(Caption {
        id: CaptionId(id),
        text,
        author_id: UserId(author_id),
        approved,
        created_at,
    })
}

/// Render `filter` as a `WHERE` clause (empty if unfiltered) plus bind values.
///
/// Column names come from the fixed `CaptionField` whitelist; values are always
/// bound as parameters.
pub(super) fn where_clause(filter: &FilterOptions) -> (String, Vec<Value>) {
    if filter.is_empty() {
        return (String::new(), Vec::new());
    }

    let mut parts = Vec::with_capacity(filter.conditions().len());
    let mut values = Vec::with_capacity(filter.conditions().len());
    for (i, condition) in filter.conditions().iter().enumerate() {
        parts.push(format!(
            "{} {} ?{}",
            condition.field.column(),
            condition.operator.as_sql(),
            i + 1
        ));
        values.push(match &condition.value {
            FilterValue::Bool(flag) => Value::Integer(i64::from(*flag)),
            FilterValue::Int(n) => Value::Integer(*n),
            FilterValue::Text(s) => Value::Text(s.clone()),
        });
    }

    (format!(" WHERE {}", parts.join(" AND ")), values)
}

fn usize_to_i64(value: usize, operation: &'static str) -> Result<i64, RepositoryError> {
    i64::try_from(value).map_err(|_| {
        RepositoryError::storage(
            operation,
            format!("{} exceeds maximum storable value ({})", value, i64::MAX),
        )
    })
}

fn map_insert_error(e: rusqlite::Error) -> RepositoryError {
    if let rusqlite::Error::SqliteFailure(ref failure, ref message) = e {
        match failure.extended_code {
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE => {
                let field = if message.as_deref().is_some_and(|m| m.contains("caption.id")) {
                    "id"
                } else {
                    "text"
                };
                return RepositoryError::UniqueViolation { field };
            }
            rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                return RepositoryError::UniqueViolation { field: "id" };
            }
            _ => {}
        }
    }
    RepositoryError::storage("insert", e.to_string())
}

// =============================================================================
// CaptionRepository trait implementation
// =============================================================================

#[async_trait]
impl CaptionRepository for SqliteRepository {
    async fn insert(&self, caption: &Caption) -> Result<(), RepositoryError> {
        let id = caption.id.to_string();
        let text = caption.text.clone();
        let author_id = caption.author_id.0;
        let approved = caption.approved;
        let created_at = caption.created_at.to_rfc3339();

        self.with_conn("insert", move |conn| {
            conn.execute(
                "INSERT INTO caption (id, text, author_id, approved, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, text, author_id, approved, created_at],
            )
            .map_err(map_insert_error)?;
            Ok(())
        })
        .await
    }

    async fn exists_by_text(&self, text: &str) -> Result<bool, RepositoryError> {
        let text = text.to_string();
        self.with_conn("exists_by_text", move |conn| {
            conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM caption WHERE text = ?1)",
                params![text],
                |row| row.get(0),
            )
            .map_err(|e| RepositoryError::storage("exists_by_text", e.to_string()))
        })
        .await
    }

    async fn get(&self, id: CaptionId) -> Result<Option<Caption>, RepositoryError> {
        let id = id.to_string();
        self.with_conn("get", move |conn| {
            let raw = conn
                .query_row(
                    &format!("SELECT {} FROM caption WHERE id = ?1", CAPTION_COLUMNS),
                    params![id],
                    caption_from_row,
                )
                .optional()
                .map_err(|e| RepositoryError::storage("get", e.to_string()))?;
            raw.map(decode_caption).transpose()
        })
        .await
    }

    async fn select(
        &self,
        limit: usize,
        offset: usize,
        filter: &FilterOptions,
    ) -> Result<Vec<Caption>, RepositoryError> {
        let limit = usize_to_i64(limit, "select limit")?;
        let offset = usize_to_i64(offset, "select offset")?;
        let (clause, mut values) = where_clause(filter);
        let next = values.len();
        values.push(Value::Integer(limit));
        values.push(Value::Integer(offset));

        let sql = format!(
            "SELECT {} FROM caption{} ORDER BY rowid LIMIT ?{} OFFSET ?{}",
            CAPTION_COLUMNS,
            clause,
            next + 1,
            next + 2
        );

        self.with_conn("select", move |conn| {
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| RepositoryError::storage("select", e.to_string()))?;
            let rows = stmt
                .query_map(params_from_iter(values), caption_from_row)
                .map_err(|e| RepositoryError::storage("select", e.to_string()))?;

            let mut captions = Vec::new();
            for row in rows {
                let raw = row.map_err(|e| RepositoryError::storage("select", e.to_string()))?;
                captions.push(decode_caption(raw)?);
            }
            Ok(captions)
        })
        .await
    }

    async fn update(&self, caption: &Caption) -> Result<bool, RepositoryError> {
        let id = caption.id.to_string();
        let text = caption.text.clone();
        let author_id = caption.author_id.0;
        let approved = caption.approved;
        let created_at = caption.created_at.to_rfc3339();

        self.with_conn("update", move |conn| {
            let changed = conn
                .execute(
                    "UPDATE caption
                     SET text = ?2, author_id = ?3, approved = ?4, created_at = ?5
                     WHERE id = ?1",
                    params![id, text, author_id, approved, created_at],
                )
                .map_err(|e| RepositoryError::storage("update", e.to_string()))?;
            Ok(changed > 0)
        })
        .await
    }

    async fn delete(&self, id: CaptionId) -> Result<bool, RepositoryError> {
        let id = id.to_string();
        self.with_conn("delete", move |conn| {
            let changed = conn
                .execute("DELETE FROM caption WHERE id = ?1", params![id])
                .map_err(|e| RepositoryError::storage("delete", e.to_string()))?;
            Ok(changed > 0)
        })
        .await
    }

    async fn random(&self, filter: &FilterOptions) -> Result<Option<Caption>, RepositoryError> {
        let (clause, values) = where_clause(filter);
        let sql = format!(
            "SELECT {} FROM caption{} ORDER BY RANDOM() LIMIT 1",
            CAPTION_COLUMNS, clause
        );

        self.with_conn("random", move |conn| {
            let raw = conn
                .query_row(&sql, params_from_iter(values), caption_from_row)
                .optional()
                .map_err(|e| RepositoryError::storage("random", e.to_string()))?;
            raw.map(decode_caption).transpose()
        })
        .await
    }

    async fn count(&self, filter: &FilterOptions) -> Result<usize, RepositoryError> {
        let (clause, values) = where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM caption{}", clause);

        self.with_conn("count", move |conn| {
            let count: i64 = conn
                .query_row(&sql, params_from_iter(values), |row| row.get(0))
                .map_err(|e| RepositoryError::storage("count", e.to_string()))?;
            usize::try_from(count).map_err(|_| RepositoryError::corruption("row count"))
        })
        .await
    }
}
