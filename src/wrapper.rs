use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;
use sql_cursor_pagination::{FieldValue, SortField};
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePool};
use sqlx::{Sqlite, query::Query};
use tracing::debug;

use crate::Error;
use crate::builders::FetchPageBuilder;

/// A SQLite connection pool that serves cursor-paginated queries.
#[derive(Debug, Clone)]
pub struct PaginatedDatabase {
   pool: SqlitePool,
   path: Option<PathBuf>,
}

impl PaginatedDatabase {
   /// Open (creating if needed) the database file at `path` in WAL mode.
   pub async fn connect(path: impl AsRef<Path>) -> Result<Self, Error> {
      let path = path.as_ref();
      if let Some(parent) = path.parent()
         && !parent.as_os_str().is_empty()
      {
         std::fs::create_dir_all(parent)?;
      }

      let options = SqliteConnectOptions::new()
         .filename(path)
         .create_if_missing(true)
         .journal_mode(SqliteJournalMode::Wal);
      let pool = SqlitePool::connect_with(options).await?;

      debug!(path = %path.display(), "Connected to database");

      Ok(Self {
         pool,
         path: Some(path.to_path_buf()),
      })
   }

   /// Wrap an existing pool, e.g. one the application also writes through.
   pub fn from_pool(pool: SqlitePool) -> Self {
      Self { pool, path: None }
   }

   /// Path of the database file, when opened with [`connect`](Self::connect).
   pub fn path(&self) -> Option<&Path> {
      self.path.as_deref()
   }

   /// The underlying pool.
   pub fn pool(&self) -> &SqlitePool {
      &self.pool
   }

   /// Start a paginated SELECT.
   ///
   /// `query` is a plain SELECT ending in its FROM or WHERE clause (no
   /// ORDER BY, LIMIT, GROUP BY or compound select); `values` are its bind
   /// values. Cursors are bound to `query_name` and to `sort_fields`,
   /// which must end in a unique column.
   ///
   /// ```no_run
   /// # use sqlx_sqlite_cursor_pagination::{CursorSecret, PaginatedDatabase, SortField};
   /// # async fn example(db: PaginatedDatabase, secret: CursorSecret) -> sqlx_sqlite_cursor_pagination::Result<()> {
   /// let page = db
   ///    .fetch_page(
   ///       "SELECT id, first_name FROM users".into(),
   ///       vec![],
   ///       "ListUsers",
   ///       vec![SortField::asc("first_name"), SortField::asc("id")],
   ///    )
   ///    .first(20)
   ///    .secret(secret)
   ///    .await?;
   /// # Ok(())
   /// # }
   /// ```
   pub fn fetch_page(
      &self,
      query: String,
      values: Vec<JsonValue>,
      query_name: impl Into<String>,
      sort_fields: Vec<SortField>,
   ) -> FetchPageBuilder {
      FetchPageBuilder::new(
         self.pool.clone(),
         query,
         values,
         query_name.into(),
         sort_fields,
      )
   }

   /// Close every connection in the pool
   pub async fn close(self) -> Result<(), Error> {
      self.pool.close().await;
      Ok(())
   }
}

type SqliteQuery<'a> = Query<'a, Sqlite, SqliteArguments<'a>>;

/// Bind a caller-supplied parameter.
pub(crate) fn bind_value(query: SqliteQuery<'_>, value: JsonValue) -> SqliteQuery<'_> {
   match value {
      JsonValue::Null => query.bind(None::<String>),
      JsonValue::Bool(b) => query.bind(b),
      JsonValue::Number(number) => bind_number(query, &number),
      JsonValue::String(s) => query.bind(s),
      // Arrays and objects are stored as JSON text
      other => query.bind(other),
   }
}

/// Bind a sort-key value taken from a cursor.
pub(crate) fn bind_field_value(query: SqliteQuery<'_>, value: FieldValue) -> SqliteQuery<'_> {
   match value {
      FieldValue::Bool(b) => query.bind(b),
      FieldValue::Number(number) => bind_number(query, &number),
      FieldValue::String(s) => query.bind(s),
   }
}

fn bind_number<'a>(query: SqliteQuery<'a>, number: &serde_json::Number) -> SqliteQuery<'a> {
   // Integers keep INTEGER affinity so they compare exactly against INTEGER columns
   if let Some(n) = number.as_i64() {
      query.bind(n)
   } else if let Some(n) = number.as_u64() {
      query.bind(n as f64)
   } else {
      query.bind(number.as_f64().unwrap_or_default())
   }
}
