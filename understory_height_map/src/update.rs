// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Applying measured row heights and refreshing estimates.

use alloc::vec::Vec;

use crate::document::Document;
use crate::measure::{MeasuredHeights, MeasuredLine};
use crate::node::{HeightMap, Node, RangeNode};
use crate::oracle::{HeightOracle, row_text_length};

/// The measured window `[from, to)`.
///
/// A non-empty row is inside when it overlaps the window; an empty row (only the final
/// one can be empty) is inside when it lies within the window or on either edge.
#[derive(Copy, Clone, Debug)]
struct Window {
    from: usize,
    to: usize,
}

impl Window {
    fn covers(&self, start: usize, end: usize) -> bool {
        if start == end {
            self.from <= start && start <= self.to
        } else {
            start < self.to && end > self.from
        }
    }

    fn reaches(&self, start: usize, end: usize) -> bool {
        start <= self.to && end >= self.from
    }
}

impl HeightMap {
    /// Returns a map with measured heights applied to the rows in `[from, from + length)`.
    ///
    /// `base_offset` is the document position of this map's first character (`0` for a
    /// root). `measured` holds one record per row in the window, in order. A Line leaf
    /// takes its record directly; a Range leaf covering several lines is split into one
    /// Line per measured line, with plain ranges keeping estimates for the lines outside
    /// the window.
    ///
    /// Rows outside the window keep their heights, unless `force_all` is set: then they
    /// are re-estimated from `oracle`, which is how stale estimates are dropped after a
    /// global change such as toggling line wrapping.
    ///
    /// # Panics
    ///
    /// Panics if `measured` holds fewer records than the window has rows. In debug
    /// builds, also panics if a record's length does not match its row.
    #[must_use]
    pub fn update_height<D: Document + ?Sized>(
        &self,
        oracle: &HeightOracle<'_, D>,
        base_offset: usize,
        force_all: bool,
        from: usize,
        length: usize,
        measured: &[MeasuredLine],
    ) -> Self {
        let _span = tracing::debug_span!(
            "update_height",
            from,
            length,
            force_all,
            records = measured.len()
        )
        .entered();
        let window = Window {
            from,
            to: from.saturating_add(length),
        };
        let mut records = MeasuredHeights::new(measured);
        let last = base_offset + self.length() >= oracle.doc().len();
        let map = self.update(oracle, base_offset, last, force_all, window, &mut records);
        if records.remaining() > 0 {
            tracing::warn!(
                unused = records.remaining(),
                "measurement records left over after updating the window"
            );
        }
        map
    }

    /// `last` is set for the subtree holding the final row of the document, the only
    /// row without a line break of its own.
    fn update<D: Document + ?Sized>(
        &self,
        oracle: &HeightOracle<'_, D>,
        offset: usize,
        last: bool,
        force: bool,
        window: Window,
        records: &mut MeasuredHeights<'_>,
    ) -> Self {
        let end = offset + self.length();
        match self.node() {
            Node::Branch(branch) => {
                if !force && !window.reaches(offset, end) {
                    return self.clone();
                }
                let left_len = branch.left().length();
                let left = branch
                    .left()
                    .update(oracle, offset, false, force, window, records);
                let right = branch
                    .right()
                    .update(oracle, offset + left_len, last, force, window, records);
                if left.ptr_eq(branch.left()) && right.ptr_eq(branch.right()) {
                    self.clone()
                } else {
                    Self::balanced(left, right)
                }
            }
            Node::Line(line) => {
                let height = if window.covers(offset, end) {
                    records.next_for(row_text_length(line.length(), last))
                } else if force {
                    oracle.height_for_row(line.length(), line.collapsed(), line.widget_height(), last)
                } else {
                    return self.clone();
                };
                self.with_height(height)
            }
            Node::Range(range) => {
                // The empty line after a trailing break sits on the range's end.
                let trailing_empty = last && end > offset && oracle.doc().line_at(end).start == end;
                if window.covers(offset, end) || (trailing_empty && window.covers(end, end)) {
                    self.materialize(oracle, offset, last, range, window, records)
                } else if force {
                    self.with_height(oracle.height_for_span(offset, end, last))
                } else {
                    self.clone()
                }
            }
        }
    }

    /// Splits a measured range into rows, measuring the ones inside the window.
    fn materialize<D: Document + ?Sized>(
        &self,
        oracle: &HeightOracle<'_, D>,
        offset: usize,
        last: bool,
        range: &RangeNode,
        window: Window,
        records: &mut MeasuredHeights<'_>,
    ) -> Self {
        let end = offset + range.length();
        if oracle.span_lines(offset, end, last) <= 1 {
            let height = records.next_for(row_text_length(range.length(), last));
            return self.with_height(height);
        }

        let doc = oracle.doc();
        let mut nodes = Vec::new();
        let mut unmeasured: Option<usize> = None;
        let mut pos = offset;
        loop {
            let line = doc.line_at(pos);
            let owns_break = line.end < end;
            let row_end = if owns_break { line.end + 1 } else { end };
            if window.covers(pos, row_end) {
                if let Some(start) = unmeasured.take() {
                    nodes.push(Self::range(pos - start, oracle.height_for_span(start, pos, false)));
                }
                let height = records.next_for(line.end.min(end) - pos);
                nodes.push(Self::line(row_end - pos, height));
            } else if unmeasured.is_none() {
                unmeasured = Some(pos);
            }
            // The last range also holds the empty line after a trailing break.
            if row_end == end && !(last && owns_break) {
                break;
            }
            pos = row_end;
        }
        if let Some(start) = unmeasured {
            nodes.push(Self::range(end - start, oracle.height_for_span(start, end, last)));
        }
        tracing::trace!(from = offset, length = range.length(), rows = nodes.len(), "materialized range");
        Self::of(nodes)
    }
}
