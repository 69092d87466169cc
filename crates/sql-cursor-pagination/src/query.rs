//! Page requests and the content handed to `run_query`.

use crate::fragment::UsageFlag;
use crate::{BoundaryCursor, CursorSecret, FragmentBuilder, PaginationConfig, SortField};

/// Largest integer exactly representable as an `f64` (2^53 - 1).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Number of rows requested through `first` or `last`.
///
/// Either a whole number or [`Count::ALL`]. Anything else (fractions, NaN,
/// values beyond 2^53) is rejected when the page is requested.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Count(f64);

impl Count {
   /// Every row in the window.
   pub const ALL: Count = Count(f64::INFINITY);

   /// Wrap a raw count.
   pub fn new(value: f64) -> Self {
      Count(value)
   }

   /// The raw value.
   pub fn get(self) -> f64 {
      self.0
   }

   /// Whether this is [`Count::ALL`].
   pub fn is_unbounded(self) -> bool {
      self.0 == f64::INFINITY
   }

   /// Whole number whose successor is still exactly representable, or
   /// positive infinity.
   pub(crate) fn is_integer(self) -> bool {
      if self.is_unbounded() {
         return true;
      }
      let next = self.0 + 1.0;
      next.is_finite() && next.fract() == 0.0 && next.abs() <= MAX_SAFE_INTEGER
   }

   /// Row count for a validated, positive count; `None` when unbounded.
   pub(crate) fn rows(self) -> Option<u64> {
      if self.is_unbounded() {
         None
      } else {
         Some(self.0 as u64)
      }
   }
}

impl From<f64> for Count {
   fn from(value: f64) -> Self {
      Count(value)
   }
}

impl From<i32> for Count {
   fn from(value: i32) -> Self {
      Count(value.into())
   }
}

impl From<u32> for Count {
   fn from(value: u32) -> Self {
      Count(value.into())
   }
}

impl From<i64> for Count {
   fn from(value: i64) -> Self {
      Count(value as f64)
   }
}

impl From<u64> for Count {
   fn from(value: u64) -> Self {
      Count(value as f64)
   }
}

impl From<usize> for Count {
   fn from(value: usize) -> Self {
      Count(value as f64)
   }
}

/// The page a caller asks for.
///
/// `first` takes rows from the start of the window, `last` from the end. Both
/// may be given, in which case `last` rows are taken from the end of the
/// `first`-sized prefix. `after`/`before` bound the window by cursors from a
/// previous page.
///
/// ```
/// use sql_cursor_pagination::{PageQuery, SortField};
///
/// let query = PageQuery::new(vec![SortField::asc("first_name"), SortField::asc("id")])
///    .with_first(20)
///    .with_after("<cursor from a previous page>");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageQuery {
   /// Rows to take from the start of the window
   pub first: Option<Count>,
   /// Rows to take from the end of the window
   pub last: Option<Count>,
   /// Only rows strictly after this cursor
   pub after: Option<BoundaryCursor>,
   /// Only rows strictly before this cursor
   pub before: Option<BoundaryCursor>,
   /// Sort order, highest priority first; must end in a unique column
   pub sort_fields: Vec<SortField>,
}

impl PageQuery {
   /// An empty request over `sort_fields`.
   pub fn new(sort_fields: Vec<SortField>) -> Self {
      Self {
         sort_fields,
         ..Default::default()
      }
   }

   pub fn with_first(mut self, first: impl Into<Count>) -> Self {
      self.first = Some(first.into());
      self
   }

   pub fn with_last(mut self, last: impl Into<Count>) -> Self {
      self.last = Some(last.into());
      self
   }

   pub fn with_after(mut self, after: impl Into<BoundaryCursor>) -> Self {
      self.after = Some(after.into());
      self
   }

   pub fn with_before(mut self, before: impl Into<BoundaryCursor>) -> Self {
      self.before = Some(before.into());
      self
   }
}

/// Per-query settings that stay the same from page to page.
#[derive(Debug, Clone)]
pub struct PaginationSetup {
   /// Name cursors are bound to; a cursor from another query is rejected
   pub query_name: String,
   /// Secret cursors are sealed with; required by `with_pagination`
   pub secret: Option<CursorSecret>,
   /// Limits for each call
   pub config: PaginationConfig,
}

impl PaginationSetup {
   /// Setup with default limits and no secret.
   pub fn new(query_name: impl Into<String>) -> Self {
      Self {
         query_name: query_name.into(),
         secret: None,
         config: PaginationConfig::default(),
      }
   }

   pub fn with_secret(mut self, secret: CursorSecret) -> Self {
      self.secret = Some(secret);
      self
   }

   pub fn with_config(mut self, config: PaginationConfig) -> Self {
      self.config = config;
      self
   }

   pub fn with_max_nodes(mut self, max_nodes: Option<u64>) -> Self {
      self.config.max_nodes = max_nodes;
      self
   }

   pub fn with_cursor_generation_concurrency(mut self, concurrency: usize) -> Self {
      self.config.cursor_generation_concurrency = concurrency;
      self
   }
}

/// Which parts of the [`QueryContent`] the caller consumed.
#[derive(Debug, Clone, Default)]
pub(crate) struct Usage {
   pub(crate) limit: UsageFlag,
   pub(crate) order_by: UsageFlag,
   pub(crate) where_clause: UsageFlag,
}

impl Usage {
   /// Message naming the first part that was never read, if any.
   pub(crate) fn unused(&self) -> Option<&'static str> {
      if !self.limit.is_set() {
         return Some("You need to request the limit from `limit()` and add it to the query");
      }
      if !self.order_by.is_set() {
         return Some(
            "You need to request the `ORDER BY` fragment from `order_by()` and add it to the query",
         );
      }
      if !self.where_clause.is_set() {
         return Some(
            "You need to request the `WHERE` fragment from `where_clause()` and add it to the query",
         );
      }
      None
   }
}

/// The parts a `run_query` function must splice into its query.
///
/// All three must be read (`limit()`, and a view of each fragment), otherwise
/// the pagination call fails after `run_query` returns.
#[derive(Debug)]
pub struct QueryContent {
   limit: Option<u64>,
   limit_used: UsageFlag,
   order_by: FragmentBuilder,
   where_clause: FragmentBuilder,
}

impl QueryContent {
   pub(crate) fn new(
      limit: Option<u64>,
      usage: &Usage,
      order_by: FragmentBuilder,
      where_clause: FragmentBuilder,
   ) -> Self {
      Self {
         limit,
         limit_used: usage.limit.clone(),
         order_by,
         where_clause,
      }
   }

   /// Maximum number of rows to return; `None` means no limit.
   ///
   /// One more than the page size, so the engine can tell whether another
   /// page exists.
   pub fn limit(&self) -> Option<u64> {
      self.limit_used.mark();
      self.limit
   }

   /// ORDER BY expression list, without the `ORDER BY` keyword.
   pub fn order_by(&self) -> &FragmentBuilder {
      &self.order_by
   }

   /// WHERE predicate, without the `WHERE` keyword.
   pub fn where_clause(&self) -> &FragmentBuilder {
      &self.where_clause
   }
}
