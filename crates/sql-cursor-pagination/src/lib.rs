//! # sql-cursor-pagination
//!
//! Relative (keyset) pagination over any SQL execution layer, with opaque,
//! tamper-evident cursors.
//!
//! ## Core Types
//!
//! - **[`with_pagination`]** / **[`with_raw_pagination`]**: Fetch a page through a
//!   caller-supplied `run_query` function
//! - **[`PageQuery`]**: `first`/`last`/`after`/`before` and the sort order of one request
//! - **[`PaginationSetup`]**: Query name, [`CursorSecret`] and [`PaginationConfig`]
//! - **[`QueryContent`]**: LIMIT, ORDER BY and WHERE parts `run_query` must use
//! - **[`SqlBuilder`]** / **[`FragmentBuilder`]**: Parameterized SQL fragments
//! - **[`Error`]**: Error type for pagination operations
//!
//! ## Cursors
//!
//! A cursor records the sort-key values of a row and the name of the query
//! it came from. Cursors are sealed with AES-256-GCM under keys derived from
//! a secret, so clients can neither read nor forge them, and a cursor issued
//! for one query is rejected by every other.

mod config;
mod cursor;
mod error;
mod field;
mod fragment;
mod page;
mod pagination;
mod query;
mod secret;
mod value;

// Re-export public types
pub use config::PaginationConfig;
pub use cursor::{
   BoundaryCursor, Cursor, CursorField, Resolved, build_cursor, decrypt_cursor, encrypt_cursor,
   resolve_cursor,
};
pub use error::{Error, QueryError, Result};
pub use field::{Order, SortField, quote_field, validate_field_name};
pub use fragment::{
   Fragment, FragmentBuilder, Placeholder, RawFragment, SqlBuilder, validate_placeholder,
};
pub use page::{Edge, Page, PageInfo, RawEdge, RawPage};
pub use pagination::{with_pagination, with_raw_pagination};
pub use query::{Count, PageQuery, PaginationSetup, QueryContent};
pub use secret::{CursorSecret, MIN_SECRET_LENGTH, generate_secret};
pub use value::{FieldValue, Node};
