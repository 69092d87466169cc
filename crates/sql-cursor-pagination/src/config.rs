//! Configuration for pagination calls

/// Limits applied to a single pagination call
///
/// # Examples
///
/// ```
/// use sql_cursor_pagination::PaginationConfig;
///
/// // Use defaults
/// let config = PaginationConfig::default();
///
/// // Customize specific fields
/// let config = PaginationConfig {
///    max_nodes: Some(500),
///    cursor_generation_concurrency: 4,
/// };
///
/// // Override just one field
/// let config = PaginationConfig {
///    max_nodes: None,
///    ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationConfig {
   /// Maximum number of rows a single page may request
   ///
   /// Requests for more (including `first`/`last` of `Count::ALL`) fail with
   /// `Error::TooManyNodes`. `None` removes the limit.
   ///
   /// Default: 100
   pub max_nodes: Option<u64>,

   /// Number of cursors sealed in parallel for one page
   ///
   /// Only affects throughput; edges are always returned in row order.
   /// Must be at least 1.
   ///
   /// Default: 10
   pub cursor_generation_concurrency: usize,
}

impl Default for PaginationConfig {
   fn default() -> Self {
      Self {
         max_nodes: Some(100),
         cursor_generation_concurrency: 10,
      }
   }
}
