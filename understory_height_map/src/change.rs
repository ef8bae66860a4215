// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Edit descriptors consumed by [`HeightMap::apply_changes`](crate::HeightMap::apply_changes).

/// A replaced range: `[from_a, to_a)` in the old document became `[from_b, to_b)` in the new one.
///
/// Overlay changes are expressed the same way: a range whose overlays changed is
/// reported as replaced by itself.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChangedRange {
    /// Start of the replaced range in the old document.
    pub from_a: usize,
    /// End of the replaced range in the old document.
    pub to_a: usize,
    /// Start of the replacement in the new document.
    pub from_b: usize,
    /// End of the replacement in the new document.
    pub to_b: usize,
}

impl ChangedRange {
    /// Creates a new changed range.
    #[must_use]
    pub const fn new(from_a: usize, to_a: usize, from_b: usize, to_b: usize) -> Self {
        Self {
            from_a,
            to_a,
            from_b,
            to_b,
        }
    }

    /// Maps an old position at or before `from_a` into the new document.
    ///
    /// `pos` must lie after every earlier change in the same batch.
    pub(crate) const fn map_before(&self, pos: usize) -> usize {
        self.from_b - (self.from_a - pos)
    }

    /// Maps an old position at or after `to_a` into the new document.
    pub(crate) const fn map_after(&self, pos: usize) -> usize {
        self.to_b + (pos - self.to_a)
    }

    /// Maps a new position at or before `from_b` back into the old document.
    ///
    /// Positions before an earlier change in the same batch map to the start of the document at worst.
    pub(crate) const fn unmap_before(&self, pos: usize) -> usize {
        self.from_a.saturating_sub(self.from_b - pos)
    }

    /// Maps a new position at or after `to_b` back into the old document.
    pub(crate) const fn unmap_after(&self, pos: usize) -> usize {
        self.to_a + (pos - self.to_b)
    }
}

/// Panics unless `changes` is a well-formed batch for a map of `old_len` and a document of `new_len`.
pub(crate) fn assert_well_formed(changes: &[ChangedRange], old_len: usize, new_len: usize) {
    let mut prev: Option<&ChangedRange> = None;
    for change in changes {
        assert!(
            change.from_a <= change.to_a && change.from_b <= change.to_b,
            "inverted changed range {change:?}"
        );
        if let Some(prev) = prev {
            assert!(
                prev.to_a <= change.from_a && prev.to_b <= change.from_b,
                "changed ranges out of order or overlapping: {prev:?} then {change:?}"
            );
        }
        prev = Some(change);
    }
    if let Some(last) = prev {
        assert!(
            last.to_a <= old_len,
            "changed range {last:?} ends past the height map (length {old_len})"
        );
        assert!(
            last.to_b <= new_len,
            "changed range {last:?} ends past the document (length {new_len})"
        );
        assert_eq!(
            old_len - last.to_a,
            new_len - last.to_b,
            "text after the last change must be unchanged"
        );
    }
}
