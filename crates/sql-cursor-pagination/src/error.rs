/// Result type alias for pagination operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error raised by a caller-supplied `run_query` function.
pub type QueryError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for cursor pagination.
///
/// Variants fall into two families. Query errors are detectable from the
/// request alone (bad `first`/`last`, foreign or tampered cursors, bad sort
/// configuration) and are safe to surface to whoever built the request; see
/// [`Error::is_query_error`]. [`Error::Unexpected`] and [`Error::Query`]
/// indicate a bug in the host application or a failure in its query layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Neither `first` nor `last` was provided.
   #[error("one of `first`/`last` required")]
   FirstOrLastRequired,

   /// `first` is not a safe integer (or infinity).
   #[error("`first` must be an integer")]
   FirstNotInteger,

   /// `last` is not a safe integer (or infinity).
   #[error("`last` must be an integer")]
   LastNotInteger,

   /// `first` is zero or negative.
   #[error("`first` must be > 0")]
   FirstOutOfRange,

   /// `last` is zero or negative.
   #[error("`last` must be > 0")]
   LastOutOfRange,

   /// Both `first` and `last` were provided and `first <= last`.
   #[error("`first` must be > `last`")]
   FirstNotGreaterThanLast,

   /// The `before` cursor could not be decoded.
   #[error("`before` cursor invalid")]
   BeforeCursorInvalid,

   /// The `after` cursor could not be decoded.
   #[error("`after` cursor invalid")]
   AfterCursorInvalid,

   /// More nodes were requested than the configured maximum.
   #[error("too many nodes requested; the limit is {max_nodes}")]
   TooManyNodes { max_nodes: u64 },

   /// The `before` cursor was issued for a different query.
   #[error("`before` cursor created for different query")]
   BeforeCursorWrongQuery,

   /// The `after` cursor was issued for a different query.
   #[error("`after` cursor created for different query")]
   AfterCursorWrongQuery,

   /// The `before` cursor was issued for a different sort configuration.
   #[error("`before` cursor created for different sort configuration")]
   BeforeCursorWrongSortConfig,

   /// The `after` cursor was issued for a different sort configuration.
   #[error("`after` cursor created for different sort configuration")]
   AfterCursorWrongSortConfig,

   /// Pagination requires at least one sort field.
   #[error("sort fields must contain at least one field")]
   EmptySortFields,

   /// The same qualified field name appears twice in the sort fields.
   #[error("duplicate sort field '{name}'")]
   DuplicateSortField { name: String },

   /// Field name contains invalid characters.
   ///
   /// Field names are one or more dot-separated segments of `[A-Za-z0-9_]`.
   #[error("invalid field name '{name}': must match [A-Za-z0-9_]+(.[A-Za-z0-9_]+)*")]
   InvalidFieldName { name: String },

   /// Field alias is empty.
   #[error("invalid alias for field '{name}': must not be empty")]
   InvalidAlias { name: String },

   /// Query name is empty.
   #[error("query name must not be empty")]
   EmptyQueryName,

   /// Cursor generation concurrency must be at least one.
   #[error("cursor generation concurrency must be greater than zero")]
   InvalidConcurrency,

   /// Cursor secret source is too short.
   #[error("cursor secret must be at least {min} characters, got {len}")]
   SecretTooShort { len: usize, min: usize },

   /// Placeholder contains characters outside `[A-Za-z0-9_?:]`.
   #[error("invalid placeholder '{placeholder}': must match [A-Za-z0-9_?:]+")]
   InvalidPlaceholder { placeholder: String },

   /// Error raised by the caller's `run_query` function, passed through unchanged.
   #[error(transparent)]
   Query(QueryError),

   /// The host application broke a contract (missing fields, duplicate
   /// cursors, unconsumed fragments, too many rows, ...).
   #[error("{0}")]
   Unexpected(String),
}

impl Error {
   /// Whether this error was caused by the shape of the request rather than
   /// a bug in the host application.
   pub fn is_query_error(&self) -> bool {
      !matches!(self, Error::Query(_) | Error::Unexpected(_))
   }

   /// Extract a structured error code from the error type.
   ///
   /// This provides machine-readable error codes for error handling.
   pub fn error_code(&self) -> String {
      match self {
         Error::FirstOrLastRequired => "FIRST_OR_LAST_REQUIRED".to_string(),
         Error::FirstNotInteger => "FIRST_NOT_INTEGER".to_string(),
         Error::LastNotInteger => "LAST_NOT_INTEGER".to_string(),
         Error::FirstOutOfRange => "FIRST_OUT_OF_RANGE".to_string(),
         Error::LastOutOfRange => "LAST_OUT_OF_RANGE".to_string(),
         Error::FirstNotGreaterThanLast => "FIRST_NOT_GREATER_THAN_LAST".to_string(),
         Error::BeforeCursorInvalid => "BEFORE_CURSOR_INVALID".to_string(),
         Error::AfterCursorInvalid => "AFTER_CURSOR_INVALID".to_string(),
         Error::TooManyNodes { .. } => "TOO_MANY_NODES".to_string(),
         Error::BeforeCursorWrongQuery => "BEFORE_CURSOR_WRONG_QUERY".to_string(),
         Error::AfterCursorWrongQuery => "AFTER_CURSOR_WRONG_QUERY".to_string(),
         Error::BeforeCursorWrongSortConfig => "BEFORE_CURSOR_WRONG_SORT_CONFIG".to_string(),
         Error::AfterCursorWrongSortConfig => "AFTER_CURSOR_WRONG_SORT_CONFIG".to_string(),
         Error::EmptySortFields => "EMPTY_SORT_FIELDS".to_string(),
         Error::DuplicateSortField { .. } => "DUPLICATE_SORT_FIELD".to_string(),
         Error::InvalidFieldName { .. } => "INVALID_FIELD_NAME".to_string(),
         Error::InvalidAlias { .. } => "INVALID_ALIAS".to_string(),
         Error::EmptyQueryName => "EMPTY_QUERY_NAME".to_string(),
         Error::InvalidConcurrency => "INVALID_CONCURRENCY".to_string(),
         Error::SecretTooShort { .. } => "SECRET_TOO_SHORT".to_string(),
         Error::InvalidPlaceholder { .. } => "INVALID_PLACEHOLDER".to_string(),
         Error::Query(_) => "QUERY_ERROR".to_string(),
         Error::Unexpected(_) => "UNEXPECTED".to_string(),
      }
   }
}
