// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_height_map --heading-base-level=0

//! Understory Height Map: vertical layout for partially measured text.
//!
//! A text view that only lays out what is on screen still needs to know how tall the
//! whole document is, where a given offset sits vertically, and which offset lies at a
//! given scroll position. This crate keeps that answer in a persistent binary tree whose
//! leaves are rows:
//!
//! - Line leaves: a single row, possibly joining several source lines under a collapsed
//!   range, carrying widget and collapse decorations.
//! - Range leaves: a plain span of one or more source lines with one height between them,
//!   estimated by a [`HeightOracle`] until measured.
//! - Branches cache the length, height, and row count of their children, so offset and
//!   height queries descend in `O(depth)`.
//!
//! The core concepts are:
//!
//! - [`Document`]: the read-only text storage, with an adapter for `str`.
//! - [`Overlay`] and [`OverlaySet`]: point widgets and collapsed ranges, queried per
//!   update. Overlays that do not affect height are ignored.
//! - [`HeightMap::apply_changes`]: rebuilds only the rows touched by a batch of
//!   [`ChangedRange`]s, sharing every untouched subtree with the previous map.
//! - [`HeightMap::update_height`]: feeds [`MeasuredLine`] records for a window of rows
//!   back into the map, splitting plain ranges into measured lines as needed.
//! - [`HeightMap::row_at_offset`], [`HeightMap::row_at_height`] and
//!   [`HeightMap::for_each_row`]: queries for hit testing and virtualization.
//!
//! Every update returns a new root; old roots stay valid and unchanged.
//!
//! ## Minimal example
//!
//! ```rust
//! use understory_height_map::{ChangedRange, HeightMap, HeightOracle, MeasuredLine, Overlay};
//!
//! let doc = "fn main() {\n    println!(\"hi\");\n}";
//! let oracle = HeightOracle::new(doc);
//! let widgets = [Overlay::widget(12, 30.0)];
//!
//! // Build the map for the whole document.
//! let map = HeightMap::empty().apply_changes(
//!     &oracle,
//!     &[&widgets],
//!     &[ChangedRange::new(0, 0, 0, doc.len())],
//! );
//! assert_eq!(map.length(), doc.len());
//! // Three rows of 14 plus the widget.
//! assert_eq!(map.height(), 72.0);
//!
//! // The surface measured the first row.
//! let map = map.update_height(&oracle, 0, false, 0, 11, &[MeasuredLine::new(11, 18.0)]);
//! assert_eq!(map.height(), 76.0);
//! assert_eq!(map.offset_at_height(&oracle, 20.0), 12);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod apply;
mod build;
mod change;
mod document;
mod measure;
mod node;
mod oracle;
mod overlay;
mod query;
mod update;

pub use change::ChangedRange;
pub use document::{Document, LineSpan};
pub use measure::MeasuredLine;
pub use node::{BranchNode, HeightMap, LineDeco, LineNode, Node, RangeNode};
pub use oracle::{HeightOracle, OracleConfig};
pub use overlay::{Overlay, OverlayFlags, OverlaySet};
pub use query::RowInfo;
