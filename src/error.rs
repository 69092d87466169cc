/// Result type alias for SQLite pagination operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for SQLite pagination operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Error from SQLx operations.
   #[error(transparent)]
   Sqlx(#[from] sqlx::Error),

   /// Error from the pagination engine.
   #[error(transparent)]
   Pagination(sql_cursor_pagination::Error),

   /// SQLite type that cannot be mapped to JSON.
   #[error("unsupported datatype: {0}")]
   UnsupportedDatatype(String),

   /// Pagination base query has a top-level clause the page query cannot
   /// be appended to.
   #[error(
      "pagination base query must not contain top-level ORDER BY, LIMIT, GROUP BY, HAVING, WINDOW or compound (UNION/INTERSECT/EXCEPT) clauses; ORDER BY and LIMIT are added automatically and subqueries are fine"
   )]
   InvalidPaginationQuery,

   /// I/O error when accessing database files.
   #[error("io error: {0}")]
   Io(#[from] std::io::Error),
}

/// Errors raised inside the adapter's own `run_query` come back wrapped by
/// the engine; unwrap them so callers see the error they raised.
impl From<sql_cursor_pagination::Error> for Error {
   fn from(err: sql_cursor_pagination::Error) -> Self {
      match err {
         sql_cursor_pagination::Error::Query(source) => match source.downcast::<Error>() {
            Ok(inner) => *inner,
            Err(source) => Error::Pagination(sql_cursor_pagination::Error::Query(source)),
         },
         other => Error::Pagination(other),
      }
   }
}

impl Error {
   /// Extract a structured error code from the error type.
   ///
   /// This provides machine-readable error codes for error handling.
   pub fn error_code(&self) -> String {
      match self {
         Error::Sqlx(e) => {
            if let Some(code) = e.as_database_error().and_then(|db_err| db_err.code()) {
               return format!("SQLITE_{}", code);
            }
            "SQLX_ERROR".to_string()
         }
         Error::Pagination(e) => e.error_code(),
         Error::UnsupportedDatatype(_) => "UNSUPPORTED_DATATYPE".to_string(),
         Error::InvalidPaginationQuery => "INVALID_PAGINATION_QUERY".to_string(),
         Error::Io(_) => "IO_ERROR".to_string(),
      }
   }

   /// Whether the error was caused by the page request (bad `first`/`last`,
   /// invalid or foreign cursors) rather than the database or the query.
   pub fn is_query_error(&self) -> bool {
      matches!(self, Error::Pagination(e) if e.is_query_error())
   }
}
