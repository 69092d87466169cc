//! Splicing pagination fragments into a caller's base query.
//!
//! The base query is a plain SELECT whose last clause is FROM or WHERE. The
//! page query appends the engine's WHERE predicate (joined with `AND` to the
//! parenthesized base predicate when the base query already filters), then
//! its ORDER BY and LIMIT, each on a new line so a trailing `--` comment in
//! the base query cannot swallow them:
//!
//! ```text
//! SELECT id, first_name FROM users WHERE (active = ?1 OR role = ?2
//! ) AND (((("first_name" > ?3) OR ("first_name" = ?4 AND "id" > ?5))))
//! ORDER BY "first_name" ASC, "id" ASC
//! LIMIT 21
//! ```

use sql_cursor_pagination::{FieldValue, Placeholder, QueryContent};

use crate::Error;

/// Check whether `keyword` appears as a standalone keyword at position `i`
/// in the uppercased byte slice `bytes`.
///
/// "Standalone" means the character before and after the keyword (if present)
/// is not an identifier character (`[A-Z0-9_]`).
fn is_keyword_at(bytes: &[u8], i: usize, keyword: &[u8]) -> bool {
   let end = i + keyword.len();
   if end > bytes.len() || &bytes[i..end] != keyword {
      return false;
   }

   let is_ident = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
   let before_ok = i == 0 || !is_ident(bytes[i - 1]);
   let after_ok = end >= bytes.len() || !is_ident(bytes[end]);

   before_ok && after_ok
}

/// Index of the closing quote of a quoted literal or identifier starting at
/// `i`, honouring doubled-quote escapes (`''`, `""`).
fn skip_quoted(bytes: &[u8], i: usize, quote: u8) -> usize {
   let mut j = i + 1;
   while j < bytes.len() {
      if bytes[j] == quote {
         if bytes.get(j + 1) == Some(&quote) {
            j += 2;
            continue;
         }
         return j;
      }
      j += 1;
   }
   j
}

/// Index of the end of a `--` line comment.
fn skip_line_comment(bytes: &[u8], i: usize) -> usize {
   let mut j = i + 2;
   while j < bytes.len() && bytes[j] != b'\n' {
      j += 1;
   }
   j
}

/// Index of the closing `/` of a `/* … */` block comment.
fn skip_block_comment(bytes: &[u8], i: usize) -> usize {
   let mut j = i + 2;
   while j + 1 < bytes.len() {
      if bytes[j] == b'*' && bytes[j + 1] == b'/' {
         return j + 1;
      }
      j += 1;
   }
   bytes.len().saturating_sub(1)
}

/// Position and length of the first of `keywords` at paren depth 0, outside
/// quotes and comments.
fn find_top_level_keyword(query: &str, keywords: &[&[u8]]) -> Option<(usize, usize)> {
   let upper = query.to_ascii_uppercase();
   let bytes = upper.as_bytes();
   let mut depth: i32 = 0;
   let mut i = 0;

   while i < bytes.len() {
      match bytes[i] {
         b'(' => depth += 1,
         b')' => depth -= 1,
         b'\'' | b'"' | b'`' => i = skip_quoted(bytes, i, bytes[i]),
         b'[' => {
            while i < bytes.len() && bytes[i] != b']' {
               i += 1;
            }
         }
         b'-' if bytes.get(i + 1) == Some(&b'-') => i = skip_line_comment(bytes, i),
         b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i),
         _ if depth == 0 => {
            if let Some(keyword) = keywords
               .iter()
               .find(|keyword| is_keyword_at(bytes, i, keyword))
            {
               return Some((i, keyword.len()));
            }
         }
         _ => {}
      }
      i += 1;
   }

   None
}

/// Clauses that may not appear at the top level of a base query: ORDER BY
/// and LIMIT are added by the page query, and the cursor predicate cannot be
/// appended after grouping, windows or compound selects.
const REJECTED_KEYWORDS: &[&[u8]] = &[
   b"ORDER",
   b"LIMIT",
   b"GROUP",
   b"HAVING",
   b"WINDOW",
   b"UNION",
   b"INTERSECT",
   b"EXCEPT",
];

/// Reject base queries with a top-level ORDER BY, LIMIT, GROUP BY, HAVING,
/// WINDOW or compound operator.
///
/// Clauses inside subqueries, comments and string literals are allowed.
pub(crate) fn validate_base_query(query: &str) -> Result<(), Error> {
   if find_top_level_keyword(query, REJECTED_KEYWORDS).is_some() {
      return Err(Error::InvalidPaginationQuery);
   }

   Ok(())
}

/// Byte offset just past the top-level `WHERE` keyword.
fn top_level_where_end(query: &str) -> Option<usize> {
   find_top_level_keyword(query, &[b"WHERE"]).map(|(start, len)| start + len)
}

/// Build the page query from the base query and the engine's fragments.
///
/// `param_offset` is the number of the caller's own bind values. Cursor
/// values are bound as `?N` starting at `param_offset + 1`, so they never
/// collide with the caller's parameters.
///
/// Returns the SQL and the cursor values to bind after the caller's values.
pub(crate) fn build_page_query(
   base_query: &str,
   content: &QueryContent,
   param_offset: usize,
) -> Result<(String, Vec<FieldValue>), Error> {
   validate_base_query(base_query)?;

   let where_clause = content
      .where_clause()
      .with_array_bindings(Placeholder::generated(move |i| {
         format!("?{}", param_offset + i + 1)
      }))?;
   let order_by = content.order_by().with_array_bindings(Placeholder::default())?;

   // SQLite treats a negative LIMIT as no limit
   let limit = content
      .limit()
      .map_or(-1, |limit| i64::try_from(limit).unwrap_or(i64::MAX));

   let base = base_query.trim_end().trim_end_matches(';').trim_end();
   let sql = match top_level_where_end(base) {
      Some(end) => {
         let (head, predicate) = base.split_at(end);
         format!("{} ({}\n) AND ({})", head, predicate.trim(), where_clause.sql)
      }
      None => format!("{}\nWHERE {}", base, where_clause.sql),
   };
   let sql = format!("{}\nORDER BY {}\nLIMIT {}", sql, order_by.sql, limit);

   Ok((sql, where_clause.bindings))
}
