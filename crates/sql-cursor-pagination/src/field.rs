//! Sort field definitions, field-name validation and identifier quoting.
//!
//! A sort field pairs a (possibly dot-qualified) column name used in the
//! generated SQL with the alias the column is read back under from a result
//! row. The alias defaults to the last dot segment of the name:
//!
//! ```
//! use sql_cursor_pagination::{Order, SortField};
//!
//! let field = SortField::asc("users.id");
//! assert_eq!(field.name(), "users.id");
//! assert_eq!(field.alias(), "id");
//! assert_eq!(field.order(), Order::Asc);
//!
//! let aliased = SortField::desc("email").with_alias("email_alias");
//! assert_eq!(aliased.alias(), "email_alias");
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Sort order for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Order {
   /// Ascending order (smallest first)
   Asc,
   /// Descending order (largest first)
   Desc,
}

impl Order {
   /// Return the opposite sort order.
   pub fn reversed(self) -> Self {
      match self {
         Order::Asc => Order::Desc,
         Order::Desc => Order::Asc,
      }
   }

   /// Reverse the order when `flip` is set.
   pub(crate) fn flipped_if(self, flip: bool) -> Self {
      if flip { self.reversed() } else { self }
   }

   pub(crate) fn as_sql(self) -> &'static str {
      match self {
         Order::Asc => "ASC",
         Order::Desc => "DESC",
      }
   }
}

/// A field in the sort order used for cursor pagination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortField {
   name: String,
   #[serde(default, skip_serializing_if = "Option::is_none")]
   alias: Option<String>,
   order: Order,
}

impl SortField {
   /// Create a sort field with the given order.
   pub fn new(name: impl Into<String>, order: Order) -> Self {
      Self {
         name: name.into(),
         alias: None,
         order,
      }
   }

   /// Create a sort field with ascending order.
   pub fn asc(name: impl Into<String>) -> Self {
      Self::new(name, Order::Asc)
   }

   /// Create a sort field with descending order.
   pub fn desc(name: impl Into<String>) -> Self {
      Self::new(name, Order::Desc)
   }

   /// Read the value from the row under `alias` instead of the last segment
   /// of the name.
   pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
      self.alias = Some(alias.into());
      self
   }

   /// Qualified field name as used in the SQL.
   pub fn name(&self) -> &str {
      &self.name
   }

   /// Key the field's value is read from on a result row.
   pub fn alias(&self) -> &str {
      match &self.alias {
         Some(alias) => alias,
         None => default_alias(&self.name),
      }
   }

   /// Sort order of the field.
   pub fn order(&self) -> Order {
      self.order
   }

   /// The field's name, quoted for interpolation into SQL.
   pub fn quoted_name(&self) -> String {
      quote_field(&self.name)
   }
}

/// Last dot segment of a field name.
fn default_alias(name: &str) -> &str {
   name.rsplit('.').next().unwrap_or(name)
}

/// Validate that a field name is safe for SQL interpolation.
///
/// Accepts one or more dot-separated, non-empty segments of `[A-Za-z0-9_]`,
/// which covers plain column names and qualified names like `table.column`.
pub fn validate_field_name(name: &str) -> Result<(), Error> {
   let valid = !name.is_empty()
      && name.split('.').all(|segment| {
         !segment.is_empty()
            && segment
               .bytes()
               .all(|b| b.is_ascii_alphanumeric() || b == b'_')
      });

   if !valid {
      return Err(Error::InvalidFieldName {
         name: name.to_string(),
      });
   }

   Ok(())
}

/// Quote each dot segment of a field name as an identifier.
///
/// Any embedded double quotes are doubled per SQL standard (`"` → `""`).
pub fn quote_field(name: &str) -> String {
   name
      .split('.')
      .map(|segment| format!("\"{}\"", segment.replace('"', "\"\"")))
      .collect::<Vec<_>>()
      .join(".")
}

/// Validate a sort configuration: non-empty, valid names and aliases, and
/// no qualified name used twice.
pub(crate) fn validate_sort_fields(sort_fields: &[SortField]) -> Result<(), Error> {
   if sort_fields.is_empty() {
      return Err(Error::EmptySortFields);
   }

   let mut seen = HashSet::with_capacity(sort_fields.len());
   for field in sort_fields {
      validate_field_name(field.name())?;

      if field.alias().is_empty() {
         return Err(Error::InvalidAlias {
            name: field.name().to_string(),
         });
      }

      if !seen.insert(field.name()) {
         return Err(Error::DuplicateSortField {
            name: field.name().to_string(),
         });
      }
   }

   Ok(())
}

/// Build the ORDER BY expression list (without the `ORDER BY` keyword).
///
/// When `flip` is set every order is reversed, which is how `last N`
/// requests read from the far end of the window.
pub(crate) fn order_by_sql(sort_fields: &[SortField], flip: bool) -> String {
   sort_fields
      .iter()
      .map(|field| {
         format!(
            "{} {}",
            field.quoted_name(),
            field.order().flipped_if(flip).as_sql()
         )
      })
      .collect::<Vec<_>>()
      .join(", ")
}
