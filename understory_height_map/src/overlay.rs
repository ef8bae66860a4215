// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Overlays (decorations) and the snapshot interface the height map reads them through.

use alloc::vec::Vec;

bitflags::bitflags! {
    /// Flags describing how an [`Overlay`] takes part in layout.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct OverlayFlags: u8 {
        /// The overlay is anchored at a single position rather than covering a range.
        const POINT           = 0b0000_0001;
        /// The overlay hides the text it covers, joining the lines it spans into one row.
        const COLLAPSED       = 0b0000_0010;
        /// The overlay can change heights or line structure.
        ///
        /// Overlays without this flag are ignored by the height map.
        const HEIGHT_RELEVANT = 0b0000_0100;
    }
}

impl Default for OverlayFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// An annotation on a point or range of the document.
///
/// Only two kinds matter for heights: a point overlay carrying a widget (adds the
/// widget's declared height to its row) and a collapsed range overlay (hides its text).
/// Everything else is inert.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Overlay {
    /// Start of the covered range (the anchor for point overlays).
    pub from: usize,
    /// End of the covered range. Equal to `from` for point overlays.
    pub to: usize,
    /// Caller-declared estimated height of the widget, if this overlay renders one.
    pub widget_height: Option<f64>,
    /// Kind and relevance flags.
    pub flags: OverlayFlags,
}

impl Overlay {
    /// A point overlay without a widget. Inert for height purposes.
    #[must_use]
    pub const fn point(pos: usize) -> Self {
        Self {
            from: pos,
            to: pos,
            widget_height: None,
            flags: OverlayFlags::POINT,
        }
    }

    /// A point overlay rendering a widget of the given estimated height.
    #[must_use]
    pub fn widget(pos: usize, height: f64) -> Self {
        debug_assert!(
            height.is_finite() && height >= 0.0,
            "widget heights must be finite and non-negative; got {height:?}"
        );
        Self {
            from: pos,
            to: pos,
            widget_height: Some(height),
            flags: OverlayFlags::POINT | OverlayFlags::HEIGHT_RELEVANT,
        }
    }

    /// A range overlay that only styles its text. Inert for height purposes.
    #[must_use]
    pub const fn range(from: usize, to: usize) -> Self {
        Self {
            from,
            to,
            widget_height: None,
            flags: OverlayFlags::empty(),
        }
    }

    /// A range overlay hiding `[from, to)`.
    #[must_use]
    pub fn collapsed(from: usize, to: usize) -> Self {
        Self {
            from,
            to,
            widget_height: None,
            flags: OverlayFlags::COLLAPSED | OverlayFlags::HEIGHT_RELEVANT,
        }
    }

    /// Clears [`OverlayFlags::HEIGHT_RELEVANT`], making the overlay inert.
    #[must_use]
    pub fn height_irrelevant(mut self) -> Self {
        self.flags.remove(OverlayFlags::HEIGHT_RELEVANT);
        self
    }

    /// Returns `true` for point overlays.
    #[must_use]
    pub const fn is_point(&self) -> bool {
        self.flags.contains(OverlayFlags::POINT)
    }

    /// Returns `true` if the overlay hides its covered text.
    #[must_use]
    pub const fn is_collapsed(&self) -> bool {
        !self.is_point() && self.flags.contains(OverlayFlags::COLLAPSED)
    }

    /// Returns `true` if the overlay changes heights or line structure.
    #[must_use]
    pub fn affects_height(&self) -> bool {
        if !self.flags.contains(OverlayFlags::HEIGHT_RELEVANT) {
            return false;
        }
        if self.is_point() {
            self.widget_height.is_some()
        } else {
            self.is_collapsed() && self.to > self.from
        }
    }
}

/// An ordered, queryable snapshot of overlays.
///
/// The snapshot must already reflect the document version the height map is being
/// updated to.
pub trait OverlaySet {
    /// Calls `f` for every overlay touching `[from, to]`, ordered by start position.
    ///
    /// Point overlays at exactly `from` or `to` and ranges ending at `from` or starting
    /// at `to` count as touching.
    fn for_each_overlay(&self, from: usize, to: usize, f: &mut dyn FnMut(&Overlay));
}

impl OverlaySet for [Overlay] {
    fn for_each_overlay(&self, from: usize, to: usize, f: &mut dyn FnMut(&Overlay)) {
        for overlay in self {
            if overlay.from <= to && overlay.to >= from {
                f(overlay);
            }
        }
    }
}

impl OverlaySet for Vec<Overlay> {
    fn for_each_overlay(&self, from: usize, to: usize, f: &mut dyn FnMut(&Overlay)) {
        self.as_slice().for_each_overlay(from, to, f);
    }
}

impl<const N: usize> OverlaySet for [Overlay; N] {
    fn for_each_overlay(&self, from: usize, to: usize, f: &mut dyn FnMut(&Overlay)) {
        self.as_slice().for_each_overlay(from, to, f);
    }
}

impl<T: OverlaySet + ?Sized> OverlaySet for &T {
    fn for_each_overlay(&self, from: usize, to: usize, f: &mut dyn FnMut(&Overlay)) {
        (**self).for_each_overlay(from, to, f);
    }
}

/// Collects the height-relevant overlays of all `sets` touching `[from, to]`, sorted by
/// start. Points sort before ranges starting at the same position.
pub(crate) fn relevant_overlays(
    sets: &[&dyn OverlaySet],
    from: usize,
    to: usize,
) -> Vec<Overlay> {
    let mut found = Vec::new();
    for set in sets {
        set.for_each_overlay(from, to, &mut |overlay| {
            if overlay.affects_height() {
                found.push(*overlay);
            }
        });
    }
    found.sort_by_key(|o| (o.from, !o.is_point(), o.to));
    found
}
