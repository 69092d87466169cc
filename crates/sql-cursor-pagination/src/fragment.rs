//! Parameterized SQL fragments.
//!
//! A [`SqlBuilder`] accumulates literal SQL text and bound values in sequence.
//! Values are never inlined into the text; they are tracked positionally and
//! only turned into placeholders when the builder is finalized into a
//! [`FragmentBuilder`] view:
//!
//! ```
//! use sql_cursor_pagination::{FieldValue, Placeholder, SqlBuilder};
//!
//! let mut builder = SqlBuilder::new();
//! builder
//!    .append_text("\"id\" > ")
//!    .append_value(FieldValue::from(3))
//!    .append_text(" AND \"name\" = ")
//!    .append_value(FieldValue::from("Anika"));
//!
//! let fragment = builder
//!    .into_fragment_builder()
//!    .with_array_bindings(Placeholder::generated(|i| format!("?{}", i + 1)))
//!    .unwrap();
//!
//! assert_eq!(fragment.sql, "\"id\" > ?1 AND \"name\" = ?2");
//! assert_eq!(fragment.bindings.len(), 2);
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use indexmap::IndexMap;
use serde::Serialize;

use crate::{Error, FieldValue};

/// Shared flag recording whether a fragment (or the limit) was consumed.
#[derive(Debug, Clone, Default)]
pub(crate) struct UsageFlag(Arc<AtomicBool>);

impl UsageFlag {
   pub(crate) fn mark(&self) {
      self.0.store(true, Ordering::SeqCst);
   }

   pub(crate) fn is_set(&self) -> bool {
      self.0.load(Ordering::SeqCst)
   }
}

#[derive(Debug, Clone)]
enum Part {
   Text(String),
   Value,
}

/// Mutable accumulator of SQL text and bound values.
#[derive(Debug, Clone, Default)]
pub struct SqlBuilder {
   parts: Vec<Part>,
   bindings: Vec<FieldValue>,
}

impl SqlBuilder {
   /// Create an empty builder.
   pub fn new() -> Self {
      Self::default()
   }

   /// Append literal SQL text.
   pub fn append_text(&mut self, text: impl Into<String>) -> &mut Self {
      self.parts.push(Part::Text(text.into()));
      self
   }

   /// Append a bound value; it becomes a placeholder in the finished SQL.
   pub fn append_value(&mut self, value: FieldValue) -> &mut Self {
      self.parts.push(Part::Value);
      self.bindings.push(value);
      self
   }

   /// Freeze the builder into its read-only views.
   pub fn into_fragment_builder(self) -> FragmentBuilder {
      self.into_tracked_fragment_builder(UsageFlag::default())
   }

   pub(crate) fn into_tracked_fragment_builder(self, usage: UsageFlag) -> FragmentBuilder {
      FragmentBuilder {
         parts: self.parts,
         bindings: self.bindings,
         usage,
      }
   }
}

/// Placeholder used by [`FragmentBuilder::with_array_bindings`].
pub enum Placeholder {
   /// The same placeholder token at every bound site (e.g. `?`).
   Fixed(String),
   /// A token generated from the zero-based index of the bound site
   /// (e.g. `?1`, `:0`).
   Generated(Box<dyn Fn(usize) -> String + Send + Sync>),
}

impl Placeholder {
   /// The same placeholder token at every bound site.
   pub fn fixed(token: impl Into<String>) -> Self {
      Placeholder::Fixed(token.into())
   }

   /// A placeholder generated from the index of each bound site.
   pub fn generated(f: impl Fn(usize) -> String + Send + Sync + 'static) -> Self {
      Placeholder::Generated(Box::new(f))
   }
}

impl Default for Placeholder {
   fn default() -> Self {
      Placeholder::Fixed("?".to_string())
   }
}

impl From<&str> for Placeholder {
   fn from(token: &str) -> Self {
      Placeholder::fixed(token)
   }
}

impl fmt::Debug for Placeholder {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      match self {
         Placeholder::Fixed(token) => f.debug_tuple("Fixed").field(token).finish(),
         Placeholder::Generated(_) => f.write_str("Generated(..)"),
      }
   }
}

/// Validate a placeholder token against `[A-Za-z0-9_?:]+`.
pub fn validate_placeholder(placeholder: &str) -> Result<(), Error> {
   let valid = !placeholder.is_empty()
      && placeholder
         .bytes()
         .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'?' | b':'));

   if !valid {
      return Err(Error::InvalidPlaceholder {
         placeholder: placeholder.to_string(),
      });
   }

   Ok(())
}

/// Finished SQL text with its bindings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fragment<B> {
   /// SQL text containing placeholders
   pub sql: String,
   /// Values for the placeholders
   pub bindings: B,
}

/// Literal segments and bindings, alternating: `strings[0]`, `bindings[0]`,
/// `strings[1]`, ... `strings.len()` is always `bindings.len() + 1`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawFragment {
   /// Literal SQL segments between bound values
   pub strings: Vec<String>,
   /// Bound values in order
   pub bindings: Vec<FieldValue>,
}

/// Read-only views over a finished [`SqlBuilder`].
///
/// Producing any view marks the fragment as used.
#[derive(Debug)]
pub struct FragmentBuilder {
   parts: Vec<Part>,
   bindings: Vec<FieldValue>,
   usage: UsageFlag,
}

impl FragmentBuilder {
   /// SQL with a placeholder at each bound site and the values as a list in
   /// placeholder order.
   pub fn with_array_bindings(
      &self,
      placeholder: Placeholder,
   ) -> Result<Fragment<Vec<FieldValue>>, Error> {
      if let Placeholder::Fixed(token) = &placeholder {
         validate_placeholder(token)?;
      }

      let mut sql = String::new();
      let mut index = 0;
      for part in &self.parts {
         match part {
            Part::Text(text) => sql.push_str(text),
            Part::Value => {
               match &placeholder {
                  Placeholder::Fixed(token) => sql.push_str(token),
                  Placeholder::Generated(generate) => {
                     let token = generate(index);
                     validate_placeholder(&token)?;
                     sql.push_str(&token);
                  }
               }
               index += 1;
            }
         }
      }

      self.usage.mark();

      Ok(Fragment {
         sql,
         bindings: self.bindings.clone(),
      })
   }

   /// SQL with named placeholders and the values keyed by placeholder name.
   ///
   /// `placeholder` receives a counter of *distinct* values: bound sites
   /// carrying an identical value share one placeholder, so the map has one
   /// entry per distinct value rather than per occurrence.
   pub fn with_object_bindings(
      &self,
      placeholder: impl Fn(usize) -> String,
   ) -> Result<Fragment<IndexMap<String, FieldValue>>, Error> {
      let mut sql = String::new();
      let mut named: IndexMap<String, FieldValue> = IndexMap::new();
      let mut values = self.bindings.iter();

      for part in &self.parts {
         match part {
            Part::Text(text) => sql.push_str(text),
            Part::Value => {
               let Some(value) = values.next() else {
                  return Err(Error::Unexpected(
                     "fragment has more placeholders than bindings".into(),
                  ));
               };

               let existing = named
                  .iter()
                  .find(|(_, bound)| bound.binds_same(value))
                  .map(|(name, _)| name.clone());

               let name = match existing {
                  Some(name) => name,
                  None => {
                     let name = placeholder(named.len());
                     validate_placeholder(&name)?;
                     named.insert(name.clone(), value.clone());
                     name
                  }
               };
               sql.push_str(&name);
            }
         }
      }

      self.usage.mark();

      Ok(Fragment {
         sql,
         bindings: named,
      })
   }

   /// Hand the literal segments and bindings to a template composer, for
   /// query APIs that take alternating literal/parameter input.
   pub fn to_template<T>(&self, compose: impl FnOnce(&[String], &[FieldValue]) -> T) -> T {
      self.usage.mark();

      let strings = self.segments();
      compose(&strings, &self.bindings)
   }

   /// Literal segments and bindings as plain data.
   pub fn to_raw(&self) -> RawFragment {
      self.usage.mark();

      RawFragment {
         strings: self.segments(),
         bindings: self.bindings.clone(),
      }
   }

   /// Whether any view of this fragment has been produced.
   pub fn is_used(&self) -> bool {
      self.usage.is_set()
   }

   fn segments(&self) -> Vec<String> {
      let mut strings = Vec::with_capacity(self.bindings.len() + 1);
      let mut current = String::new();
      for part in &self.parts {
         match part {
            Part::Text(text) => current.push_str(text),
            Part::Value => strings.push(std::mem::take(&mut current)),
         }
      }
      strings.push(current);
      strings
   }
}
