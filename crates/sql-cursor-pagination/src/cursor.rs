//! Cursors and the cursor codec.
//!
//! A [`Cursor`] records the sort-key values of a boundary row together with
//! the name of the query it was issued for. On the wire it is sealed with
//! AES-256-GCM under a nonce derived from the cursor's own bytes, so the
//! same cursor always encodes to the same string:
//!
//! ```text
//! <base64url(nonce)>.<base64url(ciphertext || tag)>
//! ```
//!
//! Decoding never fails loudly. Malformed, forged and stale cursors all
//! decode to `None`, which the engine turns into a typed
//! "cursor invalid" error.

use std::collections::HashSet;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::field::validate_field_name;
use crate::{CursorSecret, Error, FieldValue, Node, SortField};

/// One sort-key value in a cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CursorField {
   /// Qualified field name (as in [`SortField::name`])
   pub field: String,
   /// Value of the field on the boundary row
   pub value: FieldValue,
}

/// Sort-key values of a boundary row, bound to the query that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Cursor {
   /// Name of the query the cursor was issued for
   pub query_name: String,
   /// One entry per sort field, in sort priority order
   pub fields: Vec<CursorField>,
}

impl Cursor {
   /// Check the cursor's shape: a non-empty query name and valid,
   /// non-repeated field names.
   pub fn validate(&self) -> Result<(), Error> {
      if self.query_name.is_empty() {
         return Err(Error::EmptyQueryName);
      }

      let mut seen = HashSet::with_capacity(self.fields.len());
      for CursorField { field, .. } in &self.fields {
         validate_field_name(field)?;
         if !seen.insert(field.as_str()) {
            return Err(Error::DuplicateSortField {
               name: field.clone(),
            });
         }
      }

      Ok(())
   }

   /// Value stored for the qualified field `name`.
   pub fn value_of(&self, name: &str) -> Option<&FieldValue> {
      self
         .fields
         .iter()
         .find(|f| f.field == name)
         .map(|f| &f.value)
   }

   /// Whether the cursor carries exactly the fields of `sort_fields`.
   pub(crate) fn matches_sort_fields(&self, sort_fields: &[SortField]) -> bool {
      if self.fields.len() != sort_fields.len() {
         return false;
      }

      let names: HashSet<&str> = self.fields.iter().map(|f| f.field.as_str()).collect();
      names.len() == sort_fields.len() && sort_fields.iter().all(|f| names.contains(f.name()))
   }
}

/// A page boundary supplied by the caller.
///
/// Absence of a boundary is expressed with `Option<BoundaryCursor>`.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryCursor {
   /// A cursor string previously returned in a page
   Encoded(String),
   /// A trusted cursor the caller already holds in decoded form; it is not
   /// decrypted
   Raw(Cursor),
}

impl BoundaryCursor {
   /// Boundary from a cursor string.
   pub fn encoded(cursor: impl Into<String>) -> Self {
      BoundaryCursor::Encoded(cursor.into())
   }

   /// Boundary from a decoded cursor, validating its shape.
   pub fn raw(cursor: Cursor) -> Result<Self, Error> {
      cursor.validate()?;
      Ok(BoundaryCursor::Raw(cursor))
   }
}

impl From<String> for BoundaryCursor {
   fn from(cursor: String) -> Self {
      BoundaryCursor::Encoded(cursor)
   }
}

impl From<&str> for BoundaryCursor {
   fn from(cursor: &str) -> Self {
      BoundaryCursor::Encoded(cursor.to_string())
   }
}

/// Outcome of resolving a boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
   /// No boundary was given
   Absent,
   /// The boundary decoded to this cursor
   Cursor(Cursor),
   /// The boundary is malformed, forged, or was sealed under another secret
   Invalid,
}

/// Seal a cursor into its string form.
pub fn encrypt_cursor(cursor: &Cursor, secret: &CursorSecret) -> Result<String, Error> {
   let plaintext = serde_json::to_vec(cursor)
      .map_err(|e| Error::Unexpected(format!("failed to serialize cursor: {e}")))?;

   let nonce = secret.nonce_for(&plaintext);
   let ciphertext = secret.seal(&nonce, &plaintext)?;

   Ok(format!(
      "{}.{}",
      URL_SAFE_NO_PAD.encode(nonce),
      URL_SAFE_NO_PAD.encode(ciphertext)
   ))
}

/// Open a cursor string, returning `None` if it is not a valid cursor sealed
/// under `secret`.
pub fn decrypt_cursor(encoded: &str, secret: &CursorSecret) -> Option<Cursor> {
   let (nonce, ciphertext) = encoded.split_once('.')?;
   if nonce.is_empty() || ciphertext.is_empty() || ciphertext.contains('.') {
      trace!("cursor is not two dot-separated segments");
      return None;
   }

   let nonce = URL_SAFE_NO_PAD.decode(nonce).ok()?;
   let ciphertext = URL_SAFE_NO_PAD.decode(ciphertext).ok()?;

   let Some(plaintext) = secret.open(&nonce, &ciphertext) else {
      trace!("cursor failed authentication");
      return None;
   };

   let cursor: Cursor = serde_json::from_slice(&plaintext).ok()?;
   cursor.validate().ok()?;
   Some(cursor)
}

/// Resolve an optional boundary into a cursor.
///
/// An encoded boundary requires a secret; passing one without a secret is a
/// usage error rather than an invalid cursor.
pub fn resolve_cursor(
   boundary: Option<&BoundaryCursor>,
   secret: Option<&CursorSecret>,
) -> Result<Resolved, Error> {
   match boundary {
      None => Ok(Resolved::Absent),
      Some(BoundaryCursor::Encoded(encoded)) => {
         let Some(secret) = secret else {
            return Err(Error::Unexpected(
               "string cursor not supported when no cursor secret is provided".into(),
            ));
         };
         Ok(match decrypt_cursor(encoded, secret) {
            Some(cursor) => Resolved::Cursor(cursor),
            None => Resolved::Invalid,
         })
      }
      Some(BoundaryCursor::Raw(cursor)) => Ok(match cursor.validate() {
         Ok(()) => Resolved::Cursor(cursor.clone()),
         Err(_) => Resolved::Invalid,
      }),
   }
}

/// Build the cursor for a result row from the active sort fields.
pub fn build_cursor<N: Node>(
   node: &N,
   query_name: &str,
   sort_fields: &[SortField],
) -> Result<Cursor, Error> {
   let mut fields = Vec::with_capacity(sort_fields.len());
   for sort_field in sort_fields {
      let alias = sort_field.alias();
      let value = node
         .field(alias)
         .ok_or_else(|| Error::Unexpected(format!("\"{alias}\" field is missing")))?;
      let value = FieldValue::from_json(value).ok_or_else(|| {
         Error::Unexpected(format!(
            "\"{alias}\" field must be a string, number or boolean"
         ))
      })?;

      fields.push(CursorField {
         field: sort_field.name().to_string(),
         value,
      });
   }

   Ok(Cursor {
      query_name: query_name.to_string(),
      fields,
   })
}
