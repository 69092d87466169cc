//! Pagination results.

use serde::Serialize;

use crate::Cursor;

/// Whether more rows exist around the page, and its boundary cursors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
   /// `true` when `first` was requested and more rows follow the page
   pub has_next_page: bool,
   /// `true` when `last` was requested and more rows precede the page
   pub has_previous_page: bool,
   /// Cursor of the first edge
   #[serde(skip_serializing_if = "Option::is_none")]
   pub start_cursor: Option<String>,
   /// Cursor of the last edge
   #[serde(skip_serializing_if = "Option::is_none")]
   pub end_cursor: Option<String>,
}

/// A row and its cursor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge<N> {
   pub node: N,
   /// Sealed cursor, safe to hand to clients
   pub cursor: String,
   /// The same cursor unsealed, for chaining calls in-process with
   /// `BoundaryCursor::raw`. Never serialized.
   #[serde(skip_serializing)]
   pub raw_cursor: Cursor,
}

/// A page with sealed cursors, from `with_pagination`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<N> {
   pub edges: Vec<Edge<N>>,
   pub page_info: PageInfo,
}

impl<N> Page<N> {
   /// The rows of the page, in order.
   pub fn nodes(&self) -> impl Iterator<Item = &N> {
      self.edges.iter().map(|edge| &edge.node)
   }

   /// Drop the sealed cursors, keeping the raw ones.
   pub fn into_raw(self) -> RawPage<N> {
      RawPage {
         edges: self
            .edges
            .into_iter()
            .map(|edge| RawEdge {
               node: edge.node,
               raw_cursor: edge.raw_cursor,
            })
            .collect(),
         page_info: PageInfo {
            start_cursor: None,
            end_cursor: None,
            ..self.page_info
         },
      }
   }
}

/// A row and its unsealed cursor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEdge<N> {
   pub node: N,
   pub raw_cursor: Cursor,
}

/// A page without sealed cursors, from `with_raw_pagination`.
///
/// `page_info` never carries start/end cursors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPage<N> {
   pub edges: Vec<RawEdge<N>>,
   pub page_info: PageInfo,
}

impl<N> RawPage<N> {
   /// The rows of the page, in order.
   pub fn nodes(&self) -> impl Iterator<Item = &N> {
      self.edges.iter().map(|edge| &edge.node)
   }
}
