// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The read-only view of the text storage that a height map is built against.

use alloc::borrow::Cow;

/// Bounds of a single source line, excluding its terminating line break.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct LineSpan {
    /// Offset of the first character of the line.
    pub start: usize,
    /// Offset of the line break ending the line, or the document length for the last line.
    pub end: usize,
}

impl LineSpan {
    /// Length of the line's text, without the line break.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns `true` for an empty line.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Text storage as seen by the height map.
///
/// Offsets are in whatever unit the storage uses (bytes for the `str` adapter); the
/// height map never interprets text beyond locating line breaks. Lines are separated
/// by a single break character, which occupies one unit.
pub trait Document {
    /// Total length of the document.
    fn len(&self) -> usize;

    /// Returns `true` for an empty document.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The line containing `pos`. Positions past the end resolve to the last line.
    fn line_at(&self, pos: usize) -> LineSpan;

    /// Text between `from` and `to`.
    ///
    /// The height map itself only locates line breaks and never calls this; it rounds
    /// out the interface for surfaces that measure rows from the same storage.
    fn slice(&self, from: usize, to: usize) -> Cow<'_, str>;

    /// Number of source lines that intersect `[from, to]`.
    ///
    /// The default walks line by line; storages with a line index should override it.
    fn lines_in(&self, from: usize, to: usize) -> usize {
        let to = to.min(self.len());
        let mut count = 1;
        let mut line = self.line_at(from);
        while line.end < to {
            count += 1;
            line = self.line_at(line.end + 1);
        }
        count
    }
}

impl Document for str {
    fn len(&self) -> usize {
        Self::len(self)
    }

    fn line_at(&self, pos: usize) -> LineSpan {
        let bytes = self.as_bytes();
        let pos = pos.min(bytes.len());
        let start = bytes[..pos]
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);
        let end = bytes[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(bytes.len(), |i| pos + i);
        LineSpan { start, end }
    }

    fn slice(&self, from: usize, to: usize) -> Cow<'_, str> {
        Cow::Borrowed(self.get(from..to).unwrap_or_default())
    }

    fn lines_in(&self, from: usize, to: usize) -> usize {
        let to = to.min(Self::len(self));
        let from = from.min(to);
        1 + self.as_bytes()[from..to]
            .iter()
            .filter(|&&b| b == b'\n')
            .count()
    }
}
