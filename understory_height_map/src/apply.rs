// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural updates after text or overlay changes.

use alloc::vec::Vec;

use crate::build::build_region;
use crate::change::{ChangedRange, assert_well_formed};
use crate::document::Document;
use crate::node::HeightMap;
use crate::oracle::HeightOracle;
use crate::overlay::{OverlaySet, relevant_overlays};

impl HeightMap {
    /// Returns a map for the new document after replacing every changed range.
    ///
    /// `oracle` must already be bound to the new document, and `overlays` must describe
    /// the overlays of the new document. Changes are given in ascending order with old
    /// positions in `from_a`/`to_a` and new positions in `from_b`/`to_b`; an overlay-only
    /// change is a range replaced by itself.
    ///
    /// Only the leaves touching a change are rebuilt. Everything outside keeps its
    /// heights, measured or not, and is shared with `self`.
    ///
    /// # Panics
    ///
    /// Panics if the changes overlap, are out of order, or do not fit the map and the
    /// document, and if a widget declares a negative or non-finite height.
    #[must_use]
    pub fn apply_changes<D: Document + ?Sized>(
        &self,
        oracle: &HeightOracle<'_, D>,
        overlays: &[&dyn OverlaySet],
        changes: &[ChangedRange],
    ) -> Self {
        let doc_len = oracle.doc().len();
        let _span = tracing::debug_span!("apply_changes", changes = changes.len(), doc_len).entered();
        assert_well_formed(changes, self.length(), doc_len);

        // Back to front, so positions before each change are still old positions.
        let mut map = self.clone();
        let mut index = changes.len();
        while index > 0 {
            index -= 1;
            let mut change = changes[index];
            let region = loop {
                let floor = index.checked_sub(1).map(|prev| changes[prev].to_a);
                if let Some(region) = Region::around(&map, oracle, overlays, &change, floor) {
                    break region;
                }
                // The region reaches back into the previous change: rebuild both together.
                let prev = changes[index - 1];
                change = ChangedRange::new(prev.from_a, change.to_a, prev.from_b, change.to_b);
                index -= 1;
            };
            map = map.replace_region(oracle, overlays, region);
        }
        debug_assert_eq!(
            map.length(),
            doc_len,
            "height map length diverged from its document"
        );
        map
    }

    fn replace_region<D: Document + ?Sized>(
        &self,
        oracle: &HeightOracle<'_, D>,
        overlays: &[&dyn OverlaySet],
        mut region: Region,
    ) -> Self {
        let relevant = relevant_overlays(overlays, region.start_b, region.end_b);
        let mut leaves = build_region(oracle, &relevant, region.start_b, region.end_b);

        // Keep neighbouring plain rows fused into one range.
        if region.first > 0 {
            let prev = self.leaf(region.first - 1).as_range();
            let new = leaves.first().and_then(Self::as_range);
            if let (Some(prev), Some(new)) = (prev, new) {
                leaves[0] = Self::range(prev.length() + new.length(), prev.height() + new.height());
                region.first -= 1;
            }
        }
        if region.end < self.size() {
            let next = self.leaf(region.end).as_range();
            let new = leaves.last().and_then(Self::as_range);
            if let (Some(next), Some(new)) = (next, new) {
                let fused = Self::range(new.length() + next.length(), new.height() + next.height());
                let last = leaves.len() - 1;
                leaves[last] = fused;
                region.end += 1;
            }
        }

        tracing::trace!(
            from = region.start_b,
            to = region.end_b,
            replaced = region.end - region.first,
            rows = leaves.len(),
            "rebuilt changed region"
        );

        let mut pieces = Vec::with_capacity(leaves.len() + 2 * self.depth());
        self.decompose_left(region.first, &mut pieces);
        pieces.append(&mut leaves);
        self.decompose_right(region.end, &mut pieces);
        if pieces.is_empty() {
            Self::empty()
        } else {
            Self::of(pieces)
        }
    }
}

/// The run of old leaves `[first, end)` being replaced, and where it lands in the new document.
#[derive(Copy, Clone, Debug)]
struct Region {
    first: usize,
    end: usize,
    start_a: usize,
    start_b: usize,
    end_b: usize,
}

impl Region {
    /// The leaves touching `change`, from the one containing `from_a` through the one
    /// containing `to_a`, widened until no collapsed overlay crosses its edges.
    ///
    /// `floor` is the old end of the previous change in the batch, if any. Positions at
    /// or before it cannot be mapped through `change` alone, so `None` is returned as
    /// soon as the region starts there.
    fn around<D: Document + ?Sized>(
        map: &HeightMap,
        oracle: &HeightOracle<'_, D>,
        overlays: &[&dyn OverlaySet],
        change: &ChangedRange,
        floor: Option<usize>,
    ) -> Option<Self> {
        let doc_len = oracle.doc().len();
        let (first, start_a) = map.leaf_at(change.from_a);
        if floor.is_some_and(|floor| start_a <= floor) {
            return None;
        }
        let (last, last_start) = map.leaf_at(change.to_a);
        let end_a = last_start + map.leaf(last).length();
        let mut region = Self {
            first,
            end: last + 1,
            start_a,
            start_b: change.map_before(start_a),
            end_b: change.map_after(end_a),
        };
        region.take_trailing_row(map, doc_len);
        // A collapsed range hiding the break on either edge joins the rows there.
        loop {
            let (start_b, end_b) = (region.start_b, region.end_b);
            let (mut lo, mut hi) = (start_b, end_b);
            for set in overlays {
                set.for_each_overlay(start_b, end_b, &mut |overlay| {
                    if !overlay.is_collapsed() || !overlay.affects_height() {
                        return;
                    }
                    if start_b > 0 && overlay.from < start_b && overlay.to >= start_b {
                        lo = lo.min(overlay.from);
                    }
                    if end_b < doc_len && overlay.from < end_b && overlay.to >= end_b {
                        // Reaching the edge still swallows the break that ends the region.
                        hi = hi.max(overlay.to).max(end_b + 1);
                    }
                });
            }
            if !region.widen(map, change, lo, hi.min(doc_len), doc_len, floor)? {
                return Some(region);
            }
        }
    }

    /// Grows the region so that it covers new positions `[lo, hi)`.
    ///
    /// Returns whether it grew, or `None` if it would start at or before `floor`.
    fn widen(
        &mut self,
        map: &HeightMap,
        change: &ChangedRange,
        lo: usize,
        hi: usize,
        doc_len: usize,
        floor: Option<usize>,
    ) -> Option<bool> {
        let mut grew = false;
        if lo < self.start_b {
            let (first, start_a) = map.leaf_at(change.unmap_before(lo));
            if floor.is_some_and(|floor| start_a <= floor) {
                return None;
            }
            self.first = first;
            self.start_a = start_a;
            self.start_b = change.map_before(start_a);
            grew = true;
        }
        if hi > self.end_b {
            let (last, last_start) = map.leaf_at(change.unmap_after(hi - 1));
            if last + 1 > self.end {
                self.end = last + 1;
                self.end_b = change.map_after(last_start + map.leaf(last).length());
                self.take_trailing_row(map, doc_len);
                grew = true;
            }
        }
        Some(grew)
    }

    /// A region reaching the end of the document also takes the empty row after a
    /// trailing break, which is rebuilt as part of it.
    fn take_trailing_row(&mut self, map: &HeightMap, doc_len: usize) {
        if self.end_b == doc_len {
            self.end = map.size();
        }
    }
}
