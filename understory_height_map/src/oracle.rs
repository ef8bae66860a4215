// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Height estimates for content that has not been measured yet.

use crate::document::Document;

/// Layout parameters the oracle estimates from.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct OracleConfig {
    /// Height of a single unwrapped row.
    pub line_height: f64,
    /// Average character width, used to derive [`wrap_width`](Self::wrap_width).
    pub char_width: f64,
    /// Estimated number of characters that fit on one visual line when wrapping.
    pub wrap_width: usize,
    /// Whether long lines wrap onto multiple visual lines.
    pub line_wrapping: bool,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            line_height: 14.0,
            char_width: 7.0,
            wrap_width: 30,
            line_wrapping: false,
        }
    }
}

/// Estimates heights from the current document snapshot.
///
/// The oracle borrows the document rather than owning it: it is rebuilt (or rebound
/// with [`HeightOracle::set_doc`]) for each snapshot and cannot outlive the one it reads.
#[derive(Debug)]
pub struct HeightOracle<'d, D: Document + ?Sized = str> {
    doc: &'d D,
    config: OracleConfig,
}

impl<D: Document + ?Sized> Clone for HeightOracle<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: Document + ?Sized> Copy for HeightOracle<'_, D> {}

impl<'d, D: Document + ?Sized> HeightOracle<'d, D> {
    /// Creates an oracle over `doc` with the default configuration.
    #[must_use]
    pub fn new(doc: &'d D) -> Self {
        Self::with_config(doc, OracleConfig::default())
    }

    /// Creates an oracle over `doc` with an explicit configuration.
    #[must_use]
    pub fn with_config(doc: &'d D, config: OracleConfig) -> Self {
        debug_assert!(
            config.line_height.is_finite() && config.line_height >= 0.0,
            "line height must be finite and non-negative; got {:?}",
            config.line_height
        );
        Self { doc, config }
    }

    /// Rebinds the oracle to a new document snapshot, keeping its configuration.
    #[must_use]
    pub fn set_doc<'n>(self, doc: &'n D) -> HeightOracle<'n, D> {
        HeightOracle {
            doc,
            config: self.config,
        }
    }

    /// The document this oracle reads.
    #[must_use]
    pub fn doc(&self) -> &'d D {
        self.doc
    }

    /// The current configuration.
    #[must_use]
    pub const fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// Turns line wrapping on or off. Returns `true` if estimates changed.
    pub fn set_line_wrapping(&mut self, line_wrapping: bool) -> bool {
        let changed = self.config.line_wrapping != line_wrapping;
        self.config.line_wrapping = line_wrapping;
        changed
    }

    /// Updates the measured line height and character width and the available content
    /// width. Returns `true` if estimates changed.
    ///
    /// When this returns `true` while wrapping is enabled (or the line height changed),
    /// callers should refresh unmeasured heights with a forced
    /// [`HeightMap::update_height`](crate::HeightMap::update_height).
    pub fn set_measurements(&mut self, line_height: f64, char_width: f64, content_width: f64) -> bool {
        debug_assert!(
            line_height.is_finite() && char_width.is_finite() && content_width.is_finite(),
            "oracle measurements must be finite"
        );
        let wrap_width = if char_width > 0.0 {
            #[allow(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                reason = "Clamped to at least one character; fractional characters do not fit"
            )]
            let chars = (content_width / char_width) as usize;
            chars.max(1)
        } else {
            self.config.wrap_width
        };
        let line_height = line_height.max(0.0);
        let changed = line_height != self.config.line_height
            || (self.config.line_wrapping && wrap_width != self.config.wrap_width);
        self.config.line_height = line_height;
        self.config.char_width = char_width;
        self.config.wrap_width = wrap_width;
        changed
    }

    /// Estimated height of a source line with `line_length` visible characters.
    #[must_use]
    pub fn estimate_height(&self, line_length: usize) -> f64 {
        if !self.config.line_wrapping {
            return self.config.line_height;
        }
        let rows = line_length.div_ceil(self.config.wrap_width.max(1)).max(1);
        rows as f64 * self.config.line_height
    }

    /// Number of source lines intersecting `[from, to]`.
    #[must_use]
    pub fn lines_in(&self, from: usize, to: usize) -> usize {
        self.doc.lines_in(from, to)
    }

    /// Estimated height of the plain rows covering `[from, to)`, which starts at a line start.
    ///
    /// Every row except the last one in the document owns the line break that ends it.
    /// A span that is not `last` therefore stops at the break just before `to`; the
    /// last span also takes in the (possibly empty) line after its final break.
    pub(crate) fn height_for_span(&self, from: usize, to: usize, last: bool) -> f64 {
        let end = span_last_pos(from, to, last);
        if !self.config.line_wrapping {
            return self.doc.lines_in(from, end) as f64 * self.config.line_height;
        }
        let mut height = 0.0;
        let mut line = self.doc.line_at(from);
        loop {
            height += self.estimate_height(line.len());
            if line.end >= end {
                break;
            }
            line = self.doc.line_at(line.end + 1);
        }
        height
    }

    /// Number of source lines in the plain span `[from, to)`.
    pub(crate) fn span_lines(&self, from: usize, to: usize, last: bool) -> usize {
        self.doc.lines_in(from, span_last_pos(from, to, last))
    }

    /// Estimated height of a single row covering `length` units, of which `hidden` are
    /// collapsed, plus `widgets` worth of widget height.
    pub(crate) fn height_for_row(
        &self,
        length: usize,
        hidden: usize,
        widgets: f64,
        last: bool,
    ) -> f64 {
        let visible = row_text_length(length, last).saturating_sub(hidden);
        self.estimate_height(visible) + widgets
    }
}

/// Text length of a row covering `length` units, without its line break.
pub(crate) const fn row_text_length(length: usize, last: bool) -> usize {
    if last { length } else { length.saturating_sub(1) }
}

/// The last position whose line belongs to the span `[from, to)`.
const fn span_last_pos(from: usize, to: usize, last: bool) -> usize {
    if !last && to > from { to - 1 } else { to }
}
