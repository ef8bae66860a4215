// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Translating between document offsets and vertical positions.

use crate::document::Document;
use crate::node::{HeightMap, Node};
use crate::oracle::HeightOracle;

/// Geometry of a single row.
///
/// Rows inside a plain range have no recorded heights of their own; they share the
/// range's height evenly.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RowInfo {
    /// Document offset of the row's first character.
    pub from: usize,
    /// Length of the row, including the line break that ends it, if any.
    pub length: usize,
    /// Distance from the top of the document to the top of the row.
    pub top: f64,
    /// Height of the row.
    pub height: f64,
}

impl RowInfo {
    /// One past the row's last unit.
    #[must_use]
    pub const fn to(&self) -> usize {
        self.from + self.length
    }

    /// Distance from the top of the document to the bottom of the row.
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    fn overlaps(&self, from: usize, to: usize) -> bool {
        if self.length == 0 {
            from <= self.from && self.from <= to
        } else {
            self.from <= to && self.to() > from
        }
    }
}

impl HeightMap {
    /// The row containing document position `pos`.
    ///
    /// A position on the boundary between two rows belongs to the later one; positions
    /// past the end resolve to the last row.
    #[must_use]
    pub fn row_at_offset<D: Document + ?Sized>(&self, oracle: &HeightOracle<'_, D>, pos: usize) -> RowInfo {
        let cursor = self.descend(|offset, _, left| pos < offset + left.length());
        let index = match cursor.leaf.node() {
            Node::Range(_) => oracle.lines_in(cursor.offset, pos.min(cursor.end())) - 1,
            _ => 0,
        };
        cursor.row(oracle, index)
    }

    /// The row covering vertical position `height`, clamped to the first and last rows.
    #[must_use]
    pub fn row_at_height<D: Document + ?Sized>(&self, oracle: &HeightOracle<'_, D>, height: f64) -> RowInfo {
        let cursor = self.descend(|_, top, left| height < top + left.height());
        let index = match cursor.leaf.node() {
            Node::Range(range) => {
                let per_row = range.height() / cursor.row_count(oracle) as f64;
                row_index(height - cursor.top, per_row)
            }
            _ => 0,
        };
        cursor.row(oracle, index)
    }

    /// Distance from the top of the document to the top of the row containing `pos`.
    #[must_use]
    pub fn height_at_offset<D: Document + ?Sized>(&self, oracle: &HeightOracle<'_, D>, pos: usize) -> f64 {
        self.row_at_offset(oracle, pos).top
    }

    /// Document offset of the start of the row covering vertical position `height`.
    #[must_use]
    pub fn offset_at_height<D: Document + ?Sized>(&self, oracle: &HeightOracle<'_, D>, height: f64) -> usize {
        self.row_at_height(oracle, height).from
    }

    /// Calls `f` for every row overlapping `[from, to]`, in document order.
    pub fn for_each_row<D: Document + ?Sized>(
        &self,
        oracle: &HeightOracle<'_, D>,
        from: usize,
        to: usize,
        mut f: impl FnMut(RowInfo),
    ) {
        Cursor::root(self).visit(oracle, from, to, &mut f);
    }

    fn descend(&self, mut go_left: impl FnMut(usize, f64, &Self) -> bool) -> Cursor<'_> {
        let mut cursor = Cursor::root(self);
        while let Node::Branch(branch) = cursor.leaf.node() {
            let left = branch.left();
            if go_left(cursor.offset, cursor.top, left) {
                cursor.leaf = left;
                cursor.last = false;
            } else {
                cursor.offset += left.length();
                cursor.top += left.height();
                cursor.leaf = branch.right();
            }
        }
        cursor
    }
}

/// Index of the evenly split row `distance` below the top of a range.
#[allow(
    clippy::cast_possible_truncation,
    reason = "Float to index conversion saturates; callers clamp to the row count"
)]
fn row_index(distance: f64, per_row: f64) -> usize {
    if per_row > 0.0 {
        (distance / per_row) as usize
    } else {
        0
    }
}

/// A node reached from the root, with its position in the document.
#[derive(Copy, Clone, Debug)]
struct Cursor<'m> {
    leaf: &'m HeightMap,
    offset: usize,
    top: f64,
    /// Whether the node holds the final row of the document.
    last: bool,
}

impl<'m> Cursor<'m> {
    fn root(map: &'m HeightMap) -> Self {
        Self {
            leaf: map,
            offset: 0,
            top: 0.0,
            last: true,
        }
    }

    fn end(&self) -> usize {
        self.offset + self.leaf.length()
    }

    fn row_count<D: Document + ?Sized>(&self, oracle: &HeightOracle<'_, D>) -> usize {
        match self.leaf.node() {
            Node::Range(_) => oracle.span_lines(self.offset, self.end(), self.last).max(1),
            _ => 1,
        }
    }

    /// Rows of a leaf: one per source line for a range, a single one otherwise.
    fn rows<'d, D: Document + ?Sized>(&self, oracle: &HeightOracle<'d, D>) -> Rows<'d, D> {
        let count = self.row_count(oracle);
        Rows {
            doc: oracle.doc(),
            pos: self.offset,
            end: self.end(),
            top: self.top,
            per_row: self.leaf.height() / count as f64,
            remaining: count,
        }
    }

    fn row<D: Document + ?Sized>(&self, oracle: &HeightOracle<'_, D>, index: usize) -> RowInfo {
        let mut rows = self.rows(oracle);
        let index = index.min(rows.remaining - 1);
        rows.nth(index).unwrap_or(RowInfo {
            from: self.offset,
            length: self.leaf.length(),
            top: self.top,
            height: self.leaf.height(),
        })
    }

    fn visit<D: Document + ?Sized>(
        &self,
        oracle: &HeightOracle<'_, D>,
        from: usize,
        to: usize,
        f: &mut dyn FnMut(RowInfo),
    ) {
        if self.offset > to || self.end() < from {
            return;
        }
        if let Node::Branch(branch) = self.leaf.node() {
            let left = Self {
                leaf: branch.left(),
                last: false,
                ..*self
            };
            let right = Self {
                leaf: branch.right(),
                offset: self.offset + branch.left().length(),
                top: self.top + branch.left().height(),
                last: self.last,
            };
            left.visit(oracle, from, to, f);
            right.visit(oracle, from, to, f);
            return;
        }
        for row in self.rows(oracle) {
            if row.from > to {
                break;
            }
            if row.overlaps(from, to) {
                f(row);
            }
        }
    }
}

/// Walks the rows of a leaf, splitting its height evenly between them.
struct Rows<'d, D: Document + ?Sized> {
    doc: &'d D,
    pos: usize,
    end: usize,
    top: f64,
    per_row: f64,
    remaining: usize,
}

impl<D: Document + ?Sized> Iterator for Rows<'_, D> {
    type Item = RowInfo;

    fn next(&mut self) -> Option<RowInfo> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        // The final row takes whatever is left, including a trailing empty line.
        let row_end = if self.remaining == 0 {
            self.end
        } else {
            (self.doc.line_at(self.pos).end + 1).min(self.end)
        };
        let row = RowInfo {
            from: self.pos,
            length: row_end - self.pos,
            top: self.top,
            height: self.per_row,
        };
        self.pos = row_end;
        self.top += self.per_row;
        Some(row)
    }
}
