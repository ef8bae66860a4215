// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rebuilding a line-aligned span of the document into leaves.

use alloc::vec::Vec;

use smallvec::SmallVec;

use crate::document::Document;
use crate::node::{HeightMap, LineDeco};
use crate::oracle::HeightOracle;
use crate::overlay::Overlay;

/// Builds the leaves for `[from, to)` of the oracle's document.
///
/// `from` must be a line start; `to` must be the end of the document or directly follow
/// a line break. `overlays` are the height-relevant overlays touching the span, sorted
/// by start. Rows without decorations are merged into plain ranges.
pub(crate) fn build_region<D: Document + ?Sized>(
    oracle: &HeightOracle<'_, D>,
    overlays: &[Overlay],
    from: usize,
    to: usize,
) -> Vec<HeightMap> {
    let doc_len = oracle.doc().len();
    let mut builder = NodeBuilder::new(oracle, from, to);
    for overlay in overlays {
        if overlay.is_point() {
            // A point on the far edge belongs to the row after the span.
            if overlay.from < from || overlay.from > to || (overlay.from == to && to < doc_len) {
                continue;
            }
            if let Some(height) = overlay.widget_height {
                builder.add_widget(overlay.from, height);
            }
        } else {
            builder.add_collapse(overlay.from, overlay.to);
        }
    }
    builder.finish()
}

struct NodeBuilder<'a, 'd, D: Document + ?Sized> {
    oracle: &'a HeightOracle<'d, D>,
    end: usize,
    nodes: Vec<HeightMap>,
    /// Everything before `pos` has been consumed.
    pos: usize,
    /// Start of the row being built.
    line_start: usize,
    decos: SmallVec<[LineDeco; 2]>,
    widgets: f64,
    hidden: usize,
    /// Start of the pending run of plain rows.
    plain_start: Option<usize>,
}

impl<'a, 'd, D: Document + ?Sized> NodeBuilder<'a, 'd, D> {
    fn new(oracle: &'a HeightOracle<'d, D>, from: usize, to: usize) -> Self {
        Self {
            oracle,
            end: to,
            nodes: Vec::new(),
            pos: from,
            line_start: from,
            decos: SmallVec::new(),
            widgets: 0.0,
            hidden: 0,
            plain_start: None,
        }
    }

    /// Consumes text up to `target`, closing a row at every line break on the way.
    fn advance_to(&mut self, target: usize) {
        while self.pos < target {
            let line = self.oracle.doc().line_at(self.pos);
            if line.end < target {
                self.finish_row(line.end + 1, false);
                self.pos = line.end + 1;
            } else {
                self.pos = target;
            }
        }
    }

    fn add_widget(&mut self, pos: usize, height: f64) {
        assert!(
            height.is_finite() && height >= 0.0,
            "widget heights must be finite and non-negative; got {height:?}"
        );
        if pos < self.pos {
            // Hidden inside a collapsed range.
            return;
        }
        self.advance_to(pos);
        self.decos.push(LineDeco::Widget {
            offset: pos - self.line_start,
            height,
        });
        self.widgets += height;
    }

    fn add_collapse(&mut self, from: usize, to: usize) {
        let from = from.max(self.pos);
        let to = to.min(self.end);
        if to <= from {
            return;
        }
        self.advance_to(from);
        self.decos.push(LineDeco::Collapsed {
            offset: from - self.line_start,
            length: to - from,
        });
        self.hidden += to - from;
        // Breaks inside the hidden text do not end the row.
        self.pos = to;
    }

    /// Closes the current row at `end`. Only the `last` row of the document lacks a break.
    fn finish_row(&mut self, end: usize, last: bool) {
        if self.decos.is_empty() {
            self.plain_start.get_or_insert(self.line_start);
        } else {
            self.flush_plain(false);
            let length = end - self.line_start;
            let height = self
                .oracle
                .height_for_row(length, self.hidden, self.widgets, last);
            self.nodes.push(HeightMap::decorated_line(
                length,
                height,
                self.decos.drain(..),
            ));
            self.widgets = 0.0;
            self.hidden = 0;
        }
        self.line_start = end;
    }

    fn flush_plain(&mut self, last: bool) {
        if let Some(start) = self.plain_start.take() {
            let height = self.oracle.height_for_span(start, self.line_start, last);
            self.nodes
                .push(HeightMap::range(self.line_start - start, height));
        }
    }

    fn finish(mut self) -> Vec<HeightMap> {
        self.advance_to(self.end);
        let last = self.end == self.oracle.doc().len();
        if self.line_start < self.end || !self.decos.is_empty() || last {
            self.finish_row(self.end, last);
        }
        self.flush_plain(last);
        self.nodes
    }
}
