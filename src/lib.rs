//! # sqlx-sqlite-cursor-pagination
//!
//! Keyset pagination with encrypted cursors for SQLite, built on SQLx and the
//! `sql-cursor-pagination` engine.
//!
//! ## Core Types
//!
//! - **[`PaginatedDatabase`]**: SQLite pool that serves `fetch_page`
//! - **[`FetchPageBuilder`]**: `first`/`last`/`after`/`before` for one page; await it
//! - **[`Error`]**: Error type for database and pagination failures
//!
//! ## Example
//!
//! ```no_run
//! use sqlx_sqlite_cursor_pagination::{CursorSecret, PaginatedDatabase, SortField};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = PaginatedDatabase::connect("app.db").await?;
//! let secret = CursorSecret::new("a secret of at least thirty characters")?;
//! let sort = vec![SortField::asc("last_name"), SortField::asc("id")];
//!
//! let page = db
//!    .fetch_page("SELECT * FROM users".into(), vec![], "ListUsers", sort.clone())
//!    .first(20)
//!    .secret(secret.clone())
//!    .await?;
//!
//! if let (true, Some(end)) = (page.page_info.has_next_page, page.page_info.end_cursor) {
//!    let next = db
//!       .fetch_page("SELECT * FROM users".into(), vec![], "ListUsers", sort)
//!       .first(20)
//!       .after(end)
//!       .secret(secret)
//!       .await?;
//! #  let _ = next;
//! }
//! # Ok(())
//! # }
//! ```

mod builders;
mod decode;
mod error;
mod query;
mod wrapper;

pub use builders::{FetchPageBuilder, Row};
pub use error::{Error, Result};
pub use wrapper::PaginatedDatabase;

// Re-export the engine types used with the builder
pub use sql_cursor_pagination::{
   BoundaryCursor, Count, Cursor, CursorField, CursorSecret, Edge, FieldValue, Order, Page,
   PageInfo, PaginationConfig, RawEdge, RawPage, SortField, generate_secret,
};
