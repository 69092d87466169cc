//! Paginated query builder

use std::future::{Future, IntoFuture};
use std::pin::Pin;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use sql_cursor_pagination::{
   BoundaryCursor, Count, CursorSecret, Page, PageQuery, PaginationConfig, PaginationSetup,
   QueryContent, RawPage, SortField, with_pagination, with_raw_pagination,
};
use sqlx::sqlite::SqlitePool;
use tracing::debug;

use crate::Error;
use crate::decode::decode_rows;
use crate::query::build_page_query;
use crate::wrapper::{bind_field_value, bind_value};

/// A decoded result row, columns in SELECT order.
pub type Row = IndexMap<String, JsonValue>;

/// Builder for paginated SELECT queries with cursor pagination
///
/// Awaiting the builder fetches a [`Page`] with sealed cursors and requires
/// [`secret`](Self::secret). [`execute_raw`](Self::execute_raw) fetches a
/// [`RawPage`] without one.
pub struct FetchPageBuilder {
   pool: SqlitePool,
   query: String,
   values: Vec<JsonValue>,
   page: PageQuery,
   setup: PaginationSetup,
}

impl FetchPageBuilder {
   pub(crate) fn new(
      pool: SqlitePool,
      query: String,
      values: Vec<JsonValue>,
      query_name: String,
      sort_fields: Vec<SortField>,
   ) -> Self {
      Self {
         pool,
         query,
         values,
         page: PageQuery::new(sort_fields),
         setup: PaginationSetup::new(query_name),
      }
   }

   /// Take rows from the start of the window.
   pub fn first(mut self, first: impl Into<Count>) -> Self {
      self.page.first = Some(first.into());
      self
   }

   /// Take rows from the end of the window.
   pub fn last(mut self, last: impl Into<Count>) -> Self {
      self.page.last = Some(last.into());
      self
   }

   /// Only rows after this cursor (e.g. the `end_cursor` of the previous page).
   pub fn after(mut self, cursor: impl Into<BoundaryCursor>) -> Self {
      self.page.after = Some(cursor.into());
      self
   }

   /// Only rows before this cursor (e.g. the `start_cursor` of the next page).
   pub fn before(mut self, cursor: impl Into<BoundaryCursor>) -> Self {
      self.page.before = Some(cursor.into());
      self
   }

   /// Secret used to seal and open cursors
   pub fn secret(mut self, secret: CursorSecret) -> Self {
      self.setup.secret = Some(secret);
      self
   }

   /// Override the default limits
   pub fn config(mut self, config: PaginationConfig) -> Self {
      self.setup.config = config;
      self
   }

   /// Execute the paginated query and return a page with sealed cursors
   pub async fn execute(self) -> Result<Page<Row>, Error> {
      let Self {
         pool,
         query,
         values,
         page,
         setup,
      } = self;

      let page = with_pagination(page, &setup, |content| {
         run_page_query(pool, query, values, content)
      })
      .await?;

      Ok(page)
   }

   /// Execute the paginated query without sealing cursors
   ///
   /// Only raw boundary cursors are accepted.
   pub async fn execute_raw(self) -> Result<RawPage<Row>, Error> {
      let Self {
         pool,
         query,
         values,
         page,
         setup,
      } = self;

      let page = with_raw_pagination(page, &setup, |content| {
         run_page_query(pool, query, values, content)
      })
      .await?;

      Ok(page)
   }
}

impl IntoFuture for FetchPageBuilder {
   type Output = Result<Page<Row>, Error>;
   type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

   fn into_future(self) -> Self::IntoFuture {
      Box::pin(self.execute())
   }
}

async fn run_page_query(
   pool: SqlitePool,
   base_query: String,
   values: Vec<JsonValue>,
   content: QueryContent,
) -> Result<Vec<Row>, Error> {
   let (sql, cursor_values) = build_page_query(&base_query, &content, values.len())?;
   debug!(sql = %sql, cursor_values = cursor_values.len(), "Running page query");

   let mut q = sqlx::query(&sql);
   for value in values {
      q = bind_value(q, value);
   }
   for value in cursor_values {
      q = bind_field_value(q, value);
   }

   let rows = q.fetch_all(&pool).await?;
   decode_rows(rows)
}
