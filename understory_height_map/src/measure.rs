// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Measurement records supplied by the rendering surface.

/// The measured layout of one row.
///
/// `length` is the row's text length in document units, excluding the line break that
/// ends it but including any text hidden inside the row. `height` is the measured height
/// of the whole row, widgets included.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MeasuredLine {
    /// Text length of the measured row.
    pub length: usize,
    /// Measured height of the row.
    pub height: f64,
}

impl MeasuredLine {
    /// Creates a new record.
    #[must_use]
    pub const fn new(length: usize, height: f64) -> Self {
        Self { length, height }
    }
}

/// Consuming cursor over a batch of [`MeasuredLine`] records.
#[derive(Debug)]
pub(crate) struct MeasuredHeights<'a> {
    lines: &'a [MeasuredLine],
    index: usize,
}

impl<'a> MeasuredHeights<'a> {
    pub(crate) const fn new(lines: &'a [MeasuredLine]) -> Self {
        Self { lines, index: 0 }
    }

    /// Takes the record for the next row, which must be `length` long.
    ///
    /// # Panics
    ///
    /// Panics if the batch has no records left: the caller promised to measure every
    /// row of the window.
    pub(crate) fn next_for(&mut self, length: usize) -> f64 {
        let Some(record) = self.lines.get(self.index) else {
            panic!(
                "measurement batch ran out after {} rows; the window needs more",
                self.lines.len()
            );
        };
        self.index += 1;
        debug_assert_eq!(
            record.length, length,
            "measured row {} does not line up with the height map",
            self.index - 1
        );
        debug_assert!(
            record.height.is_finite(),
            "measured heights must be finite; got {:?}",
            record.height
        );
        record.height.max(0.0)
    }

    /// Number of records not consumed yet.
    pub(crate) const fn remaining(&self) -> usize {
        self.lines.len() - self.index
    }
}
