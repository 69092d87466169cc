//! The pagination engine.
//!
//! [`with_pagination`] and [`with_raw_pagination`] validate a [`PageQuery`],
//! build the ORDER BY and WHERE fragments for it, hand them to the caller's
//! `run_query` function and turn the returned rows into a page.
//!
//! Requests for `last` rows without `first` run the query in reverse sort
//! order and reverse the rows afterwards, so every page is a single query
//! with one ORDER BY and one LIMIT.

use std::collections::HashSet;
use std::future::Future;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use crate::cursor::{Resolved, build_cursor, encrypt_cursor, resolve_cursor};
use crate::field::{order_by_sql, validate_sort_fields};
use crate::query::Usage;
use crate::{
   Count, Cursor, CursorSecret, Edge, Error, Node, Order, Page, PageInfo, PageQuery,
   PaginationSetup, QueryContent, QueryError, RawEdge, RawPage, Result, SortField, SqlBuilder,
};

const DUPLICATE_CURSOR: &str = "Duplicate cursor. Cursors must be unique. Ensure you are \
   including a unique field in the sort fields, e.g. the primary `id` field";

/// Fetch a page with sealed cursors.
///
/// `setup.secret` must be set. `run_query` is called exactly once with the
/// [`QueryContent`] it must splice into its query, and must return the rows
/// in the order the query produced them.
///
/// ```no_run
/// use serde_json::Value;
/// use sql_cursor_pagination::{
///    CursorSecret, PageQuery, PaginationSetup, QueryError, SortField, with_pagination,
/// };
///
/// # async fn example(secret: CursorSecret) -> sql_cursor_pagination::Result<()> {
/// let query = PageQuery::new(vec![SortField::asc("first_name"), SortField::asc("id")])
///    .with_first(20);
/// let setup = PaginationSetup::new("ListUsers").with_secret(secret);
///
/// let page = with_pagination(query, &setup, |content| async move {
///    let order_by = content.order_by().to_raw();
///    let where_clause = content.where_clause().to_raw();
///    let limit = content.limit();
///    // run `SELECT ... WHERE {where_clause} ORDER BY {order_by} LIMIT {limit}`
///    # let _ = (order_by, where_clause, limit);
///    Ok::<Vec<Value>, QueryError>(vec![])
/// })
/// .await?;
///
/// for edge in &page.edges {
///    println!("{} {}", edge.node, edge.cursor);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn with_pagination<N, F, Fut, E>(
   query: PageQuery,
   setup: &PaginationSetup,
   run_query: F,
) -> Result<Page<N>>
where
   N: Node,
   F: FnOnce(QueryContent) -> Fut,
   Fut: Future<Output = std::result::Result<Vec<N>, E>>,
   E: Into<QueryError>,
{
   let Some(secret) = setup.secret.as_ref() else {
      return Err(Error::Unexpected(
         "a cursor secret is required to generate cursors; use `with_raw_pagination` without one"
            .into(),
      ));
   };

   let window = fetch_window(&query, setup, Some(secret), run_query).await?;
   let sealed = seal_cursors(
      &window.cursors,
      secret,
      setup.config.cursor_generation_concurrency,
   )
   .await?;

   let edges: Vec<Edge<N>> = window
      .nodes
      .into_iter()
      .zip(window.cursors)
      .zip(sealed)
      .map(|((node, raw_cursor), cursor)| Edge {
         node,
         cursor,
         raw_cursor,
      })
      .collect();

   let page_info = PageInfo {
      has_next_page: window.has_next_page,
      has_previous_page: window.has_previous_page,
      start_cursor: edges.first().map(|edge| edge.cursor.clone()),
      end_cursor: edges.last().map(|edge| edge.cursor.clone()),
   };

   Ok(Page { edges, page_info })
}

/// Fetch a page without sealing cursors.
///
/// For callers that never hand cursors to untrusted parties. Only
/// [`BoundaryCursor::Raw`](crate::BoundaryCursor::Raw) boundaries are
/// accepted; `setup.secret` is ignored.
pub async fn with_raw_pagination<N, F, Fut, E>(
   query: PageQuery,
   setup: &PaginationSetup,
   run_query: F,
) -> Result<RawPage<N>>
where
   N: Node,
   F: FnOnce(QueryContent) -> Fut,
   Fut: Future<Output = std::result::Result<Vec<N>, E>>,
   E: Into<QueryError>,
{
   let window = fetch_window(&query, setup, None, run_query).await?;

   let edges = window
      .nodes
      .into_iter()
      .zip(window.cursors)
      .map(|(node, raw_cursor)| RawEdge { node, raw_cursor })
      .collect();

   Ok(RawPage {
      edges,
      page_info: PageInfo {
         has_next_page: window.has_next_page,
         has_previous_page: window.has_previous_page,
         start_cursor: None,
         end_cursor: None,
      },
   })
}

/// Rows of a page with their raw cursors, before sealing.
struct Window<N> {
   nodes: Vec<N>,
   cursors: Vec<Cursor>,
   has_next_page: bool,
   has_previous_page: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
   Before,
   After,
}

async fn fetch_window<N, F, Fut, E>(
   query: &PageQuery,
   setup: &PaginationSetup,
   secret: Option<&CursorSecret>,
   run_query: F,
) -> Result<Window<N>>
where
   N: Node,
   F: FnOnce(QueryContent) -> Fut,
   Fut: Future<Output = std::result::Result<Vec<N>, E>>,
   E: Into<QueryError>,
{
   let PageQuery {
      first,
      last,
      after,
      before,
      sort_fields,
   } = query;
   let (first, last) = (*first, *last);
   let query_name = setup.query_name.as_str();

   validate_sort_fields(sort_fields)?;
   if query_name.is_empty() {
      return Err(Error::EmptyQueryName);
   }
   if setup.config.cursor_generation_concurrency == 0 {
      return Err(Error::InvalidConcurrency);
   }

   let requested = validate_counts(first, last)?;

   let before = resolve_boundary(before.as_ref(), secret, Boundary::Before)?;
   let after = resolve_boundary(after.as_ref(), secret, Boundary::After)?;

   if let Some(max_nodes) = setup.config.max_nodes
      && (requested.is_unbounded() || requested.get() > max_nodes as f64)
   {
      return Err(Error::TooManyNodes { max_nodes });
   }

   // One extra row tells whether another page exists
   let requested_rows = requested.rows();
   let limit = requested_rows.map(|n| n + 1);
   let flip = first.is_none();

   let mut order_by = SqlBuilder::new();
   order_by.append_text(order_by_sql(sort_fields, flip));

   for (cursor, boundary) in [(&before, Boundary::Before), (&after, Boundary::After)] {
      if let Some(cursor) = cursor {
         check_cursor(cursor, boundary, query_name, sort_fields)?;
      }
   }
   let where_clause = where_builder(sort_fields, after.as_ref(), before.as_ref())?;

   debug!(
      query_name,
      requested = ?requested_rows,
      limit = ?limit,
      flip,
      has_after = after.is_some(),
      has_before = before.is_some(),
      "Running paginated query"
   );

   let usage = Usage::default();
   let content = QueryContent::new(
      limit,
      &usage,
      order_by.into_tracked_fragment_builder(usage.order_by.clone()),
      where_clause.into_tracked_fragment_builder(usage.where_clause.clone()),
   );

   let mut rows = run_query(content)
      .await
      .map_err(|e| Error::Query(e.into()))?;

   if let Some(message) = usage.unused() {
      return Err(Error::Unexpected(message.to_string()));
   }

   if let Some(limit) = limit
      && rows.len() as u64 > limit
   {
      return Err(Error::Unexpected(
         "Query returned too many rows. Did you forget to add the `LIMIT`?".into(),
      ));
   }

   debug!(rows = rows.len(), "Paginated query returned");

   let overflowed = match requested_rows.map(to_usize) {
      Some(requested) if rows.len() > requested => {
         rows.truncate(requested);
         true
      }
      _ => false,
   };

   if flip {
      rows.reverse();
   }

   if let Some(first) = first.and_then(Count::rows) {
      rows.truncate(to_usize(first));
   }
   let first_len = rows.len();

   if let Some(last) = last.and_then(Count::rows).map(to_usize)
      && rows.len() > last
   {
      rows.drain(..rows.len() - last);
   }

   let has_next_page = first.is_some() && overflowed;
   // With both `first` and `last` this only reports rows dropped from the
   // `first` window, not rows before the window itself
   let has_previous_page = last.is_some() && if flip { overflowed } else { rows.len() < first_len };

   let cursors = build_cursors(&rows, query_name, sort_fields)?;

   debug!(
      edges = rows.len(),
      has_next_page, has_previous_page, "Assembled page"
   );

   Ok(Window {
      nodes: rows,
      cursors,
      has_next_page,
      has_previous_page,
   })
}

/// Validate `first`/`last` and return the number of rows to fetch.
fn validate_counts(first: Option<Count>, last: Option<Count>) -> Result<Count> {
   if first.is_none() && last.is_none() {
      return Err(Error::FirstOrLastRequired);
   }

   if first.is_some_and(|n| !n.is_integer()) {
      return Err(Error::FirstNotInteger);
   }
   if last.is_some_and(|n| !n.is_integer()) {
      return Err(Error::LastNotInteger);
   }

   if first.is_some_and(|n| n.get() <= 0.0) {
      return Err(Error::FirstOutOfRange);
   }
   if last.is_some_and(|n| n.get() <= 0.0) {
      return Err(Error::LastOutOfRange);
   }

   match (first, last) {
      (Some(first), Some(last)) if first <= last => Err(Error::FirstNotGreaterThanLast),
      (Some(first), _) => Ok(first),
      (None, Some(last)) => Ok(last),
      (None, None) => Err(Error::FirstOrLastRequired),
   }
}

fn resolve_boundary(
   boundary: Option<&crate::BoundaryCursor>,
   secret: Option<&CursorSecret>,
   kind: Boundary,
) -> Result<Option<Cursor>> {
   match resolve_cursor(boundary, secret)? {
      Resolved::Absent => Ok(None),
      Resolved::Cursor(cursor) => Ok(Some(cursor)),
      Resolved::Invalid => Err(match kind {
         Boundary::Before => Error::BeforeCursorInvalid,
         Boundary::After => Error::AfterCursorInvalid,
      }),
   }
}

/// Reject cursors issued for another query or another sort configuration.
fn check_cursor(
   cursor: &Cursor,
   boundary: Boundary,
   query_name: &str,
   sort_fields: &[SortField],
) -> Result<()> {
   if cursor.query_name != query_name {
      return Err(match boundary {
         Boundary::Before => Error::BeforeCursorWrongQuery,
         Boundary::After => Error::AfterCursorWrongQuery,
      });
   }

   if !cursor.matches_sort_fields(sort_fields) {
      return Err(match boundary {
         Boundary::Before => Error::BeforeCursorWrongSortConfig,
         Boundary::After => Error::AfterCursorWrongSortConfig,
      });
   }

   Ok(())
}

/// WHERE predicate for the window between the two cursors.
///
/// With no cursors the predicate is always true. Otherwise each cursor
/// contributes a tie-break tree and the trees are ANDed.
fn where_builder(
   sort_fields: &[SortField],
   after: Option<&Cursor>,
   before: Option<&Cursor>,
) -> Result<SqlBuilder> {
   let mut builder = SqlBuilder::new();

   if after.is_none() && before.is_none() {
      builder.append_text("1 = 1");
      return Ok(builder);
   }

   builder.append_text("(");
   if let Some(cursor) = after {
      builder.append_text("(");
      append_tie_break(&mut builder, sort_fields, cursor, false)?;
      builder.append_text(")");
   }
   if let Some(cursor) = before {
      if after.is_some() {
         builder.append_text(" AND ");
      }
      builder.append_text("(");
      append_tie_break(&mut builder, sort_fields, cursor, true)?;
      builder.append_text(")");
   }
   builder.append_text(")");

   Ok(builder)
}

/// Append `(f0 > v0) OR (f0 = v0 AND f1 > v1) OR ...`, with `<` for
/// descending fields. `reverse` flips every comparison, for `before` trees.
fn append_tie_break(
   builder: &mut SqlBuilder,
   sort_fields: &[SortField],
   cursor: &Cursor,
   reverse: bool,
) -> Result<()> {
   for i in 0..sort_fields.len() {
      if i > 0 {
         builder.append_text(" OR ");
      }
      builder.append_text("(");

      for (j, field) in sort_fields[..=i].iter().enumerate() {
         let value = cursor.value_of(field.name()).ok_or_else(|| {
            Error::Unexpected(format!("cursor has no value for \"{}\"", field.name()))
         })?;

         let op = if j < i {
            "="
         } else {
            match field.order().flipped_if(reverse) {
               Order::Asc => ">",
               Order::Desc => "<",
            }
         };

         if j > 0 {
            builder.append_text(" AND ");
         }
         builder
            .append_text(format!("{} {op} ", field.quoted_name()))
            .append_value(value.clone());
      }

      builder.append_text(")");
   }

   Ok(())
}

fn build_cursors<N: Node>(
   rows: &[N],
   query_name: &str,
   sort_fields: &[SortField],
) -> Result<Vec<Cursor>> {
   let mut seen = HashSet::with_capacity(rows.len());
   let mut cursors = Vec::with_capacity(rows.len());

   for node in rows {
      let cursor = build_cursor(node, query_name, sort_fields)?;
      let key = serde_json::to_string(&cursor)
         .map_err(|e| Error::Unexpected(format!("failed to serialize cursor: {e}")))?;
      if !seen.insert(key) {
         return Err(Error::Unexpected(DUPLICATE_CURSOR.to_string()));
      }
      cursors.push(cursor);
   }

   Ok(cursors)
}

/// Seal cursors at most `concurrency` at a time, keeping row order.
///
/// Runs on whatever executor polls the returned future; no runtime is
/// required.
async fn seal_cursors(
   cursors: &[Cursor],
   secret: &CursorSecret,
   concurrency: usize,
) -> Result<Vec<String>> {
   stream::iter(cursors)
      .map(|cursor| async move { encrypt_cursor(cursor, secret) })
      .boxed()
      .buffered(concurrency)
      .try_collect()
      .await
}

fn to_usize(n: u64) -> usize {
   usize::try_from(n).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::{BoundaryCursor, CursorField, FieldValue, Placeholder, decrypt_cursor};
   use serde_json::{Value, json};

   // ─── Fixtures ───

   fn secret() -> CursorSecret {
      CursorSecret::new("some secret that is at least 30 characters").unwrap()
   }

   fn setup() -> PaginationSetup {
      PaginationSetup::new("TestQuery").with_secret(secret())
   }

   fn sort_fields() -> Vec<SortField> {
      vec![
         SortField::asc("first_name"),
         SortField::desc("last_name"),
         SortField::asc("id"),
      ]
   }

   /// Users in `first_name ASC, last_name DESC, id ASC` order.
   fn users() -> Vec<Value> {
      vec![
         json!({ "id": 5, "first_name": "Anika", "last_name": "Molina" }),
         json!({ "id": 1, "first_name": "Anika", "last_name": "Duncan" }),
         json!({ "id": 4, "first_name": "Cooper", "last_name": "Molina" }),
         json!({ "id": 2, "first_name": "Jermaine", "last_name": "O'connor" }),
         json!({ "id": 3, "first_name": "Joseph", "last_name": "Rhodes" }),
      ]
   }

   fn raw_cursor(user: &Value) -> Cursor {
      build_cursor(user, "TestQuery", &sort_fields()).unwrap()
   }

   /// What a `run_query` function saw.
   #[derive(Debug, Default, Clone)]
   struct Seen {
      limit: Option<u64>,
      order_by: String,
      where_sql: String,
      where_bindings: Vec<FieldValue>,
   }

   fn consume(content: &QueryContent) -> Seen {
      let order_by = content
         .order_by()
         .with_array_bindings(Placeholder::default())
         .unwrap();
      let where_clause = content
         .where_clause()
         .with_array_bindings(Placeholder::default())
         .unwrap();

      Seen {
         limit: content.limit(),
         order_by: order_by.sql,
         where_sql: where_clause.sql,
         where_bindings: where_clause.bindings,
      }
   }

   /// Run a pagination call whose query returns `rows`, recording what the
   /// query saw.
   async fn paginate(
      query: PageQuery,
      setup: &PaginationSetup,
      rows: Vec<Value>,
   ) -> (Result<Page<Value>>, Seen) {
      let seen = std::sync::Arc::new(std::sync::Mutex::new(Seen::default()));
      let recorder = seen.clone();

      let result = with_pagination(query, setup, move |content| async move {
         *recorder.lock().unwrap() = consume(&content);
         Ok::<_, QueryError>(rows)
      })
      .await;

      let seen = seen.lock().unwrap().clone();
      (result, seen)
   }

   fn ids(page: &Page<Value>) -> Vec<i64> {
      page.nodes().map(|n| n["id"].as_i64().unwrap()).collect()
   }

   async fn expect_error(query: PageQuery) -> Error {
      paginate(query, &setup(), users()).await.0.unwrap_err()
   }

   // ─── first / last validation ───

   #[tokio::test]
   async fn first_or_last_required() {
      let err = expect_error(PageQuery::new(sort_fields())).await;
      assert!(matches!(err, Error::FirstOrLastRequired));
   }

   #[tokio::test]
   async fn first_and_last_must_be_integers() {
      let err = expect_error(PageQuery::new(sort_fields()).with_first(1.5)).await;
      assert!(matches!(err, Error::FirstNotInteger));

      let err = expect_error(PageQuery::new(sort_fields()).with_last(f64::NAN)).await;
      assert!(matches!(err, Error::LastNotInteger));
   }

   #[tokio::test]
   async fn first_and_last_must_be_positive() {
      let err = expect_error(PageQuery::new(sort_fields()).with_first(0)).await;
      assert!(matches!(err, Error::FirstOutOfRange));

      let err = expect_error(PageQuery::new(sort_fields()).with_last(-1)).await;
      assert!(matches!(err, Error::LastOutOfRange));
   }

   #[tokio::test]
   async fn first_must_exceed_last() {
      let err = expect_error(PageQuery::new(sort_fields()).with_first(2).with_last(2)).await;
      assert!(matches!(err, Error::FirstNotGreaterThanLast));
   }

   #[tokio::test]
   async fn too_many_nodes() {
      let err = expect_error(PageQuery::new(sort_fields()).with_first(101)).await;
      assert!(matches!(err, Error::TooManyNodes { max_nodes: 100 }));

      let err = expect_error(PageQuery::new(sort_fields()).with_last(Count::ALL)).await;
      assert!(matches!(err, Error::TooManyNodes { .. }));
   }

   #[tokio::test]
   async fn unlimited_max_nodes_allows_all_rows() {
      let setup = setup().with_max_nodes(None);
      let (page, seen) = paginate(
         PageQuery::new(sort_fields()).with_first(Count::ALL),
         &setup,
         users(),
      )
      .await;
      let page = page.unwrap();

      assert_eq!(seen.limit, None);
      assert_eq!(ids(&page), vec![5, 1, 4, 2, 3]);
      assert!(!page.page_info.has_next_page);
   }

   // ─── setup validation ───

   #[tokio::test]
   async fn setup_shape_is_validated() {
      let query = PageQuery::new(sort_fields()).with_first(1);

      let err = paginate(query.clone(), &PaginationSetup::new("").with_secret(secret()), users())
         .await
         .0
         .unwrap_err();
      assert!(matches!(err, Error::EmptyQueryName));

      let err = paginate(
         query.clone(),
         &setup().with_cursor_generation_concurrency(0),
         users(),
      )
      .await
      .0
      .unwrap_err();
      assert!(matches!(err, Error::InvalidConcurrency));

      let err = expect_error(PageQuery::new(vec![]).with_first(1)).await;
      assert!(matches!(err, Error::EmptySortFields));

      let err = expect_error(PageQuery::new(vec![SortField::asc("id;")]).with_first(1)).await;
      assert!(matches!(err, Error::InvalidFieldName { .. }));
   }

   #[tokio::test]
   async fn secret_required_for_sealed_cursors() {
      let (result, _) = paginate(
         PageQuery::new(sort_fields()).with_first(1),
         &PaginationSetup::new("TestQuery"),
         users(),
      )
      .await;

      assert!(matches!(result, Err(Error::Unexpected(_))));
   }

   // ─── cursor resolution ───

   #[tokio::test]
   async fn invalid_cursors() {
      let err = expect_error(PageQuery::new(sort_fields()).with_first(1).with_after("invalid")).await;
      assert!(matches!(err, Error::AfterCursorInvalid));

      let err = expect_error(PageQuery::new(sort_fields()).with_first(1).with_before("invalid")).await;
      assert!(matches!(err, Error::BeforeCursorInvalid));

      // `before` is resolved first
      let err = expect_error(
         PageQuery::new(sort_fields())
            .with_first(1)
            .with_after("invalid")
            .with_before("invalid"),
      )
      .await;
      assert!(matches!(err, Error::BeforeCursorInvalid));
   }

   #[tokio::test]
   async fn cursor_from_another_secret_is_invalid() {
      let other = CursorSecret::new(&"x".repeat(30)).unwrap();
      let cursor = encrypt_cursor(&raw_cursor(&users()[0]), &other).unwrap();

      let err = expect_error(PageQuery::new(sort_fields()).with_first(1).with_after(cursor)).await;
      assert!(matches!(err, Error::AfterCursorInvalid));
   }

   #[tokio::test]
   async fn cursor_from_another_query_is_rejected() {
      let mut cursor = raw_cursor(&users()[0]);
      cursor.query_name = "OtherQuery".into();
      let sealed = encrypt_cursor(&cursor, &secret()).unwrap();

      let err = expect_error(
         PageQuery::new(sort_fields())
            .with_first(1)
            .with_after(sealed.clone()),
      )
      .await;
      assert!(matches!(err, Error::AfterCursorWrongQuery));

      let err = expect_error(PageQuery::new(sort_fields()).with_last(1).with_before(sealed)).await;
      assert!(matches!(err, Error::BeforeCursorWrongQuery));
   }

   #[tokio::test]
   async fn cursor_from_another_sort_config_is_rejected() {
      let cursor = build_cursor(&users()[0], "TestQuery", &[SortField::asc("id")]).unwrap();
      let sealed = encrypt_cursor(&cursor, &secret()).unwrap();

      let err = expect_error(
         PageQuery::new(sort_fields())
            .with_first(1)
            .with_after(sealed.clone()),
      )
      .await;
      assert!(matches!(err, Error::AfterCursorWrongSortConfig));

      let err = expect_error(PageQuery::new(sort_fields()).with_first(1).with_before(sealed)).await;
      assert!(matches!(err, Error::BeforeCursorWrongSortConfig));
   }

   #[tokio::test]
   async fn too_many_nodes_checked_before_cursor_binding() {
      let mut cursor = raw_cursor(&users()[0]);
      cursor.query_name = "OtherQuery".into();
      let sealed = encrypt_cursor(&cursor, &secret()).unwrap();

      let err = expect_error(PageQuery::new(sort_fields()).with_first(500).with_after(sealed)).await;
      assert!(matches!(err, Error::TooManyNodes { .. }));
   }

   #[tokio::test]
   async fn encoded_boundary_rejected_without_secret() {
      let result = with_raw_pagination(
         PageQuery::new(sort_fields()).with_first(1).with_after("abc.def"),
         &PaginationSetup::new("TestQuery"),
         |content| async move {
            consume(&content);
            Ok::<_, QueryError>(users())
         },
      )
      .await;

      let err = result.unwrap_err();
      assert!(matches!(err, Error::Unexpected(_)));
      assert!(err.to_string().contains("no cursor secret"));
   }

   // ─── generated SQL ───

   #[tokio::test]
   async fn first_without_cursors() {
      let (page, seen) = paginate(
         PageQuery::new(sort_fields()).with_first(3),
         &setup(),
         users()[..4].to_vec(),
      )
      .await;
      let page = page.unwrap();

      assert_eq!(seen.limit, Some(4));
      assert_eq!(seen.order_by, r#""first_name" ASC, "last_name" DESC, "id" ASC"#);
      assert_eq!(seen.where_sql, "1 = 1");
      assert!(seen.where_bindings.is_empty());

      assert_eq!(ids(&page), vec![5, 1, 4]);
      assert!(page.page_info.has_next_page);
      assert!(!page.page_info.has_previous_page);
   }

   #[tokio::test]
   async fn after_cursor_builds_tie_break_tree() {
      let after = raw_cursor(&users()[1]);
      let (page, seen) = paginate(
         PageQuery::new(sort_fields())
            .with_first(1)
            .with_after(BoundaryCursor::raw(after).unwrap()),
         &setup(),
         users()[2..4].to_vec(),
      )
      .await;

      assert_eq!(
         seen.where_sql,
         concat!(
            r#"((("first_name" > ?) OR ("first_name" = ? AND "last_name" < ?)"#,
            r#" OR ("first_name" = ? AND "last_name" = ? AND "id" > ?)))"#,
         )
      );
      assert_eq!(
         seen.where_bindings,
         vec![
            FieldValue::from("Anika"),
            FieldValue::from("Anika"),
            FieldValue::from("Duncan"),
            FieldValue::from("Anika"),
            FieldValue::from("Duncan"),
            FieldValue::from(1),
         ]
      );

      let page = page.unwrap();
      assert_eq!(ids(&page), vec![4]);
      assert!(page.page_info.has_next_page);
   }

   #[tokio::test]
   async fn before_cursor_flips_comparisons_and_last_flips_order() {
      let before = raw_cursor(&users()[2]);
      let (page, seen) = paginate(
         PageQuery::new(sort_fields())
            .with_last(2)
            .with_before(BoundaryCursor::raw(before).unwrap()),
         &setup(),
         // Reverse order, as the flipped query returns them
         vec![users()[1].clone(), users()[0].clone()],
      )
      .await;

      assert_eq!(seen.limit, Some(3));
      assert_eq!(seen.order_by, r#""first_name" DESC, "last_name" ASC, "id" DESC"#);
      assert_eq!(
         seen.where_sql,
         concat!(
            r#"((("first_name" < ?) OR ("first_name" = ? AND "last_name" > ?)"#,
            r#" OR ("first_name" = ? AND "last_name" = ? AND "id" < ?)))"#,
         )
      );

      let page = page.unwrap();
      assert_eq!(ids(&page), vec![5, 1]);
      assert!(!page.page_info.has_next_page);
      assert!(!page.page_info.has_previous_page);
   }

   #[tokio::test]
   async fn after_and_before_are_intersected() {
      let sort_fields = vec![SortField::asc("id")];
      let setup = setup();
      let after = build_cursor(&json!({ "id": 1 }), "TestQuery", &sort_fields).unwrap();
      let before = build_cursor(&json!({ "id": 4 }), "TestQuery", &sort_fields).unwrap();

      let (_, seen) = paginate(
         PageQuery::new(sort_fields)
            .with_first(10)
            .with_after(encrypt_cursor(&after, &secret()).unwrap())
            .with_before(encrypt_cursor(&before, &secret()).unwrap()),
         &setup,
         vec![json!({ "id": 2 }), json!({ "id": 3 })],
      )
      .await;

      assert_eq!(seen.where_sql, r#"((("id" > ?)) AND (("id" < ?)))"#);
      assert_eq!(
         seen.where_bindings,
         vec![FieldValue::from(1), FieldValue::from(4)]
      );
   }

   #[tokio::test]
   async fn qualified_names_are_quoted_and_read_by_alias() {
      let sort_fields = vec![
         SortField::asc("users.email").with_alias("email_alias"),
         SortField::asc("users.id"),
      ];
      let rows = vec![
         json!({ "id": 1, "email_alias": "a@example.com" }),
         json!({ "id": 2, "email_alias": "b@example.com" }),
      ];

      let (page, seen) = paginate(PageQuery::new(sort_fields).with_first(5), &setup(), rows).await;
      let page = page.unwrap();

      assert_eq!(seen.order_by, r#""users"."email" ASC, "users"."id" ASC"#);
      assert_eq!(page.edges[0].raw_cursor.fields[0].field, "users.email");
      assert_eq!(
         page.edges[0].raw_cursor.fields[0].value,
         FieldValue::from("a@example.com")
      );
   }

   // ─── post-processing ───

   #[tokio::test]
   async fn last_with_overflow_has_previous_page() {
      let mut rows = users()[2..].to_vec();
      rows.reverse();

      let (page, _) = paginate(PageQuery::new(sort_fields()).with_last(2), &setup(), rows).await;
      let page = page.unwrap();

      assert_eq!(ids(&page), vec![2, 3]);
      assert!(page.page_info.has_previous_page);
      assert!(!page.page_info.has_next_page);
   }

   #[tokio::test]
   async fn first_and_last_take_tail_of_first_window() {
      let (page, seen) = paginate(
         PageQuery::new(sort_fields()).with_first(3).with_last(2),
         &setup(),
         users()[..4].to_vec(),
      )
      .await;
      let page = page.unwrap();

      assert_eq!(seen.limit, Some(4));
      assert_eq!(seen.order_by, r#""first_name" ASC, "last_name" DESC, "id" ASC"#);
      assert_eq!(ids(&page), vec![1, 4]);
      assert!(page.page_info.has_next_page);
      // Approximation: only the row dropped from the `first` window counts
      assert!(page.page_info.has_previous_page);
   }

   #[tokio::test]
   async fn first_and_last_without_dropped_rows() {
      let (page, _) = paginate(
         PageQuery::new(sort_fields()).with_first(3).with_last(2),
         &setup(),
         users()[..2].to_vec(),
      )
      .await;
      let page = page.unwrap();

      assert_eq!(ids(&page), vec![5, 1]);
      assert!(!page.page_info.has_next_page);
      assert!(!page.page_info.has_previous_page);
   }

   #[tokio::test]
   async fn edges_carry_sealed_and_raw_cursors() {
      let (page, _) = paginate(
         PageQuery::new(sort_fields()).with_first(5),
         &setup(),
         users(),
      )
      .await;
      let page = page.unwrap();

      for (edge, user) in page.edges.iter().zip(users()) {
         assert_eq!(edge.raw_cursor, raw_cursor(&user));
         assert_eq!(
            decrypt_cursor(&edge.cursor, &secret()),
            Some(edge.raw_cursor.clone())
         );
      }

      assert_eq!(
         page.page_info.start_cursor.as_deref(),
         Some(page.edges[0].cursor.as_str())
      );
      assert_eq!(
         page.page_info.end_cursor.as_deref(),
         Some(page.edges[4].cursor.as_str())
      );
   }

   #[tokio::test]
   async fn empty_page_has_no_boundary_cursors() {
      let (page, _) = paginate(PageQuery::new(sort_fields()).with_first(5), &setup(), vec![]).await;
      let page = page.unwrap();

      assert!(page.edges.is_empty());
      assert_eq!(page.page_info, PageInfo::default());
   }

   #[tokio::test]
   async fn concurrency_does_not_change_order() {
      let serial = setup().with_cursor_generation_concurrency(1);
      let wide = setup().with_cursor_generation_concurrency(64);

      let (a, _) = paginate(PageQuery::new(sort_fields()).with_first(5), &serial, users()).await;
      let (b, _) = paginate(PageQuery::new(sort_fields()).with_first(5), &wide, users()).await;

      assert_eq!(a.unwrap(), b.unwrap());
   }

   #[test]
   fn runs_without_a_tokio_runtime() {
      let page = futures::executor::block_on(with_pagination(
         PageQuery::new(sort_fields()).with_first(2),
         &setup(),
         |content| async move {
            consume(&content);
            Ok::<_, QueryError>(users()[..3].to_vec())
         },
      ))
      .unwrap();

      assert_eq!(page.edges.len(), 2);
      assert!(page.page_info.has_next_page);
      assert_eq!(
         decrypt_cursor(&page.edges[1].cursor, &secret()),
         Some(page.edges[1].raw_cursor.clone())
      );
   }

   #[tokio::test]
   async fn raw_pagination_returns_raw_cursors() {
      let page = with_raw_pagination(
         PageQuery::new(sort_fields())
            .with_first(2)
            .with_after(BoundaryCursor::raw(raw_cursor(&users()[0])).unwrap()),
         &PaginationSetup::new("TestQuery"),
         |content| async move {
            let seen = consume(&content);
            assert_eq!(seen.where_bindings.len(), 6);
            Ok::<_, QueryError>(users()[1..4].to_vec())
         },
      )
      .await
      .unwrap();

      assert_eq!(page.edges.len(), 2);
      assert_eq!(page.edges[0].raw_cursor, raw_cursor(&users()[1]));
      assert!(page.page_info.has_next_page);
      assert_eq!(page.page_info.start_cursor, None);
   }

   // ─── run_query contract ───

   #[tokio::test]
   async fn unused_parts_are_reported() {
      let query = PageQuery::new(sort_fields()).with_first(1);

      let err = with_pagination(query.clone(), &setup(), |content| async move {
         content.order_by().to_raw();
         content.where_clause().to_raw();
         Ok::<_, QueryError>(Vec::<Value>::new())
      })
      .await
      .unwrap_err();
      assert!(err.to_string().contains("limit"));

      let err = with_pagination(query.clone(), &setup(), |content| async move {
         content.limit();
         content.where_clause().to_raw();
         Ok::<_, QueryError>(Vec::<Value>::new())
      })
      .await
      .unwrap_err();
      assert!(err.to_string().contains("ORDER BY"));

      let err = with_pagination(query, &setup(), |content| async move {
         content.limit();
         content.order_by().to_raw();
         Ok::<_, QueryError>(Vec::<Value>::new())
      })
      .await
      .unwrap_err();
      assert!(err.to_string().contains("WHERE"));
      assert!(!err.is_query_error());
   }

   #[tokio::test]
   async fn too_many_rows_is_unexpected() {
      let (result, _) = paginate(PageQuery::new(sort_fields()).with_first(2), &setup(), users()).await;

      let err = result.unwrap_err();
      assert!(matches!(err, Error::Unexpected(_)));
      assert!(err.to_string().contains("too many rows"));
   }

   #[tokio::test]
   async fn run_query_error_passes_through() {
      let err = with_pagination(
         PageQuery::new(sort_fields()).with_first(2),
         &setup(),
         |_content| async move { Err::<Vec<Value>, _>("connection refused") },
      )
      .await
      .unwrap_err();

      assert!(matches!(err, Error::Query(_)));
      assert_eq!(err.to_string(), "connection refused");
   }

   #[tokio::test]
   async fn duplicate_cursors_fail_the_page() {
      let rows = vec![
         json!({ "id": 1, "first_name": "Anika" }),
         json!({ "id": 2, "first_name": "Anika" }),
      ];

      let (result, _) = paginate(
         PageQuery::new(vec![SortField::asc("first_name")]).with_first(5),
         &setup(),
         rows,
      )
      .await;

      let err = result.unwrap_err();
      assert!(err.to_string().contains("Duplicate cursor"));
   }

   #[tokio::test]
   async fn missing_sort_field_on_row() {
      let (result, _) = paginate(
         PageQuery::new(sort_fields()).with_first(5),
         &setup(),
         vec![json!({ "id": 1 })],
      )
      .await;

      assert_eq!(
         result.unwrap_err().to_string(),
         "\"first_name\" field is missing"
      );
   }

   #[test]
   fn cursor_values_looked_up_by_name() {
      // Same fields as the sort config, stored in a different order
      let cursor = Cursor {
         query_name: "TestQuery".into(),
         fields: vec![
            CursorField {
               field: "id".into(),
               value: 1.into(),
            },
            CursorField {
               field: "first_name".into(),
               value: "Anika".into(),
            },
         ],
      };
      let sort_fields = vec![SortField::asc("first_name"), SortField::asc("id")];

      let fragment = where_builder(&sort_fields, Some(&cursor), None)
         .unwrap()
         .into_fragment_builder()
         .with_array_bindings(Placeholder::default())
         .unwrap();

      assert_eq!(
         fragment.bindings,
         vec![
            FieldValue::from("Anika"),
            FieldValue::from("Anika"),
            FieldValue::from(1)
         ]
      );
   }
}
