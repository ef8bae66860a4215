// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Height map nodes: the leaf variants, branches with cached aggregates, and balancing.

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use smallvec::SmallVec;

/// Height or structure contributed by an overlay inside a [`LineNode`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum LineDeco {
    /// A widget anchored `offset` units into the row, adding `height`.
    Widget {
        /// Anchor offset relative to the start of the row.
        offset: usize,
        /// Declared height of the widget.
        height: f64,
    },
    /// `length` units starting `offset` units into the row are hidden.
    Collapsed {
        /// Start of the hidden text relative to the start of the row.
        offset: usize,
        /// Number of hidden units.
        length: usize,
    },
}

impl LineDeco {
    /// Offset of the decoration relative to the start of its row.
    #[must_use]
    pub const fn offset(&self) -> usize {
        match *self {
            Self::Widget { offset, .. } | Self::Collapsed { offset, .. } => offset,
        }
    }
}

/// A single row that carries height-relevant decorations.
#[derive(Clone, Debug, PartialEq)]
pub struct LineNode {
    length: usize,
    height: f64,
    decos: SmallVec<[LineDeco; 2]>,
}

impl LineNode {
    /// Units covered, including the terminating line break if there is one.
    #[must_use]
    pub const fn length(&self) -> usize {
        self.length
    }

    /// Current height of the row.
    #[must_use]
    pub const fn height(&self) -> f64 {
        self.height
    }

    /// Decorations in the row, ordered by offset.
    #[must_use]
    pub fn decos(&self) -> &[LineDeco] {
        &self.decos
    }

    /// Sum of the widget heights in this row.
    #[must_use]
    pub fn widget_height(&self) -> f64 {
        self.decos
            .iter()
            .map(|deco| match *deco {
                LineDeco::Widget { height, .. } => height,
                LineDeco::Collapsed { .. } => 0.0,
            })
            .sum()
    }

    /// Number of hidden units in this row.
    #[must_use]
    pub fn collapsed(&self) -> usize {
        self.decos
            .iter()
            .map(|deco| match *deco {
                LineDeco::Collapsed { length, .. } => length,
                LineDeco::Widget { .. } => 0,
            })
            .sum()
    }
}

/// A plain span of one or more lines sharing a single, usually estimated, height.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RangeNode {
    length: usize,
    height: f64,
}

impl RangeNode {
    /// Units covered, including the terminating line break if there is one.
    #[must_use]
    pub const fn length(&self) -> usize {
        self.length
    }

    /// Current height of the span.
    #[must_use]
    pub const fn height(&self) -> f64 {
        self.height
    }
}

/// An internal node joining two subtrees.
#[derive(Clone, Debug)]
pub struct BranchNode {
    left: HeightMap,
    right: HeightMap,
    length: usize,
    height: f64,
    size: usize,
}

impl BranchNode {
    /// The subtree covering the start of this branch.
    #[must_use]
    pub const fn left(&self) -> &HeightMap {
        &self.left
    }

    /// The subtree covering the end of this branch.
    #[must_use]
    pub const fn right(&self) -> &HeightMap {
        &self.right
    }
}

/// The three kinds of height map node.
#[derive(Clone, Debug)]
pub enum Node {
    /// A decorated row.
    Line(LineNode),
    /// A plain span.
    Range(RangeNode),
    /// Two joined subtrees.
    Branch(BranchNode),
}

/// A persistent height map over a document.
///
/// `HeightMap` is a cheap handle onto an immutable tree. Operations that change the
/// map return a new handle; untouched subtrees are shared with the previous version,
/// which stays valid and unchanged for anyone still holding it.
///
/// Every leaf covers the text of its row including the line break that ends it, so
/// leaves start at line starts and only the last leaf may lack a break (and may be
/// empty, for an empty last line).
#[derive(Clone, Debug)]
pub struct HeightMap(Arc<Node>);

impl Default for HeightMap {
    fn default() -> Self {
        Self::empty()
    }
}

impl HeightMap {
    /// The map of an empty, unmeasured document: one empty range of height zero.
    #[must_use]
    pub fn empty() -> Self {
        Self::range(0, 0.0)
    }

    /// A plain span leaf.
    #[must_use]
    pub fn range(length: usize, height: f64) -> Self {
        debug_assert!(
            height.is_finite() && height >= 0.0,
            "heights must be finite and non-negative; got {height:?}"
        );
        Self(Arc::new(Node::Range(RangeNode { length, height })))
    }

    /// An undecorated row leaf.
    #[must_use]
    pub fn line(length: usize, height: f64) -> Self {
        Self::decorated_line(length, height, [])
    }

    /// A row leaf carrying `decos`, which must be ordered by offset.
    #[must_use]
    pub fn decorated_line(
        length: usize,
        height: f64,
        decos: impl IntoIterator<Item = LineDeco>,
    ) -> Self {
        debug_assert!(
            height.is_finite() && height >= 0.0,
            "heights must be finite and non-negative; got {height:?}"
        );
        Self(Arc::new(Node::Line(LineNode {
            length,
            height,
            decos: decos.into_iter().collect(),
        })))
    }

    /// Builds a balanced map from an ordered sequence of leaves or subtrees.
    ///
    /// Subtrees are shared, and only split where needed to keep the two halves of
    /// every new branch within a factor of two of each other in size.
    ///
    /// # Panics
    ///
    /// Panics if `nodes` is empty.
    #[must_use]
    pub fn from_nodes(nodes: Vec<Self>) -> Self {
        assert!(!nodes.is_empty(), "a height map needs at least one node");
        Self::of(nodes)
    }

    /// The node behind this handle.
    #[must_use]
    pub fn node(&self) -> &Node {
        &self.0
    }

    /// Units of text covered.
    #[must_use]
    pub fn length(&self) -> usize {
        match self.node() {
            Node::Line(line) => line.length,
            Node::Range(range) => range.length,
            Node::Branch(branch) => branch.length,
        }
    }

    /// Best-known vertical extent.
    #[must_use]
    pub fn height(&self) -> f64 {
        match self.node() {
            Node::Line(line) => line.height,
            Node::Range(range) => range.height,
            Node::Branch(branch) => branch.height,
        }
    }

    /// Number of rows (leaves) represented.
    #[must_use]
    pub fn size(&self) -> usize {
        match self.node() {
            Node::Line(_) | Node::Range(_) => 1,
            Node::Branch(branch) => branch.size,
        }
    }

    /// Number of node levels, counting a lone leaf as one.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self.node() {
            Node::Line(_) | Node::Range(_) => 1,
            Node::Branch(branch) => 1 + branch.left.depth().max(branch.right.depth()),
        }
    }

    /// Returns `true` if both handles point at the same node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Recomputes every cached aggregate and structural rule.
    ///
    /// # Panics
    ///
    /// Panics on the first broken invariant; any such failure is a bug in this crate.
    pub fn check_invariants(&self) {
        self.check();
    }

    fn check(&self) -> Aggregate {
        match self.node() {
            Node::Line(line) => {
                let mut last = 0;
                let mut hidden_end = 0;
                for deco in &line.decos {
                    assert!(deco.offset() >= last, "row decorations out of order in {self}");
                    last = deco.offset();
                    match *deco {
                        LineDeco::Widget { offset, height } => {
                            assert!(
                                height.is_finite() && height >= 0.0,
                                "invalid widget height in {self}"
                            );
                            assert!(offset <= line.length, "widget past its row in {self}");
                        }
                        LineDeco::Collapsed { offset, length } => {
                            assert!(length > 0, "empty collapse in {self}");
                            assert!(offset >= hidden_end, "overlapping collapses in {self}");
                            hidden_end = offset + length;
                            assert!(hidden_end <= line.length, "collapse past its row in {self}");
                        }
                    }
                }
                Aggregate::leaf(line.length, line.height)
            }
            Node::Range(range) => Aggregate::leaf(range.length, range.height),
            Node::Branch(branch) => {
                let left = branch.left.check();
                let right = branch.right.check();
                assert!(
                    !left.ends_empty,
                    "an empty leaf may only end the document: {self}"
                );
                assert_eq!(branch.length, left.length + right.length, "branch length");
                assert_eq!(branch.size, left.size + right.size, "branch size");
                assert!(
                    branch.height == left.height + right.height,
                    "branch height {} differs from {} + {}",
                    branch.height,
                    left.height,
                    right.height
                );
                Aggregate {
                    length: branch.length,
                    height: branch.height,
                    size: branch.size,
                    ends_empty: right.ends_empty,
                }
            }
        }
    }

    pub(crate) fn branch(left: Self, right: Self) -> Self {
        Self(Arc::new(Node::Branch(BranchNode {
            length: left.length() + right.length(),
            height: left.height() + right.height(),
            size: left.size() + right.size(),
            left,
            right,
        })))
    }

    /// Joins two subtrees, rebuilding them when one outweighs the other more than twofold.
    pub(crate) fn balanced(left: Self, right: Self) -> Self {
        if left.size() > 2 * right.size() || right.size() > 2 * left.size() {
            Self::of(vec![left, right])
        } else {
            Self::branch(left, right)
        }
    }

    pub(crate) fn of(mut nodes: Vec<Self>) -> Self {
        if nodes.len() == 1 {
            return nodes.swap_remove(0);
        }
        // Take nodes from whichever end is lighter until the two sides meet, splitting
        // the innermost subtree of a side that ends up more than twice the other.
        let (mut i, mut j) = (0, nodes.len());
        let (mut before, mut after) = (0, 0);
        loop {
            if i == j {
                if before > after * 2 {
                    let (left, right, size) = match nodes[i - 1].node() {
                        Node::Branch(split) => (split.left.clone(), split.right.clone(), split.size),
                        _ => break,
                    };
                    i -= 1;
                    nodes.splice(i..=i, [left, right]);
                    j += 1;
                    before -= size;
                } else if after > before * 2 {
                    let (left, right, size) = match nodes[j].node() {
                        Node::Branch(split) => (split.left.clone(), split.right.clone(), split.size),
                        _ => break,
                    };
                    nodes.splice(j..=j, [left, right]);
                    j += 2;
                    after -= size;
                } else {
                    break;
                }
            } else if before < after {
                before += nodes[i].size();
                i += 1;
            } else {
                j -= 1;
                after += nodes[j].size();
            }
        }
        let split = i.clamp(1, nodes.len() - 1);
        let right = nodes.split_off(split);
        Self::branch(Self::of(nodes), Self::of(right))
    }

    /// This leaf with its height replaced, or the same node when the height is unchanged.
    pub(crate) fn with_height(&self, height: f64) -> Self {
        match self.node() {
            Node::Line(line) if line.height != height => Self(Arc::new(Node::Line(LineNode {
                height,
                ..line.clone()
            }))),
            Node::Range(range) if range.height != height => Self::range(range.length, height),
            _ => self.clone(),
        }
    }

    /// The range leaf, if this is one.
    pub(crate) fn as_range(&self) -> Option<&RangeNode> {
        match self.node() {
            Node::Range(range) => Some(range),
            _ => None,
        }
    }

    /// Index and start offset of the leaf containing `pos`.
    ///
    /// A position on a leaf boundary belongs to the leaf starting there; positions at or
    /// past the end belong to the last leaf.
    pub(crate) fn leaf_at(&self, pos: usize) -> (usize, usize) {
        let (mut node, mut pos) = (self, pos);
        let (mut index, mut start) = (0, 0);
        while let Node::Branch(branch) = node.node() {
            let left_len = branch.left.length();
            if pos < left_len {
                node = &branch.left;
            } else {
                pos -= left_len;
                start += left_len;
                index += branch.left.size();
                node = &branch.right;
            }
        }
        (index, start)
    }

    /// The leaf at `index`, clamped to the last leaf.
    pub(crate) fn leaf(&self, index: usize) -> &Self {
        let (mut node, mut index) = (self, index);
        while let Node::Branch(branch) = node.node() {
            let left_size = branch.left.size();
            if index < left_size {
                node = &branch.left;
            } else {
                index -= left_size;
                node = &branch.right;
            }
        }
        node
    }

    /// Pushes the maximal subtrees covering leaves `[0, index)` onto `out`, in order.
    pub(crate) fn decompose_left(&self, index: usize, out: &mut Vec<Self>) {
        if index == 0 {
            return;
        }
        if index >= self.size() {
            out.push(self.clone());
            return;
        }
        if let Node::Branch(branch) = self.node() {
            let left_size = branch.left.size();
            if index >= left_size {
                out.push(branch.left.clone());
                branch.right.decompose_left(index - left_size, out);
            } else {
                branch.left.decompose_left(index, out);
            }
        }
    }

    /// Pushes the maximal subtrees covering leaves `[index, size)` onto `out`, in order.
    pub(crate) fn decompose_right(&self, index: usize, out: &mut Vec<Self>) {
        if index >= self.size() {
            return;
        }
        if index == 0 {
            out.push(self.clone());
            return;
        }
        if let Node::Branch(branch) = self.node() {
            let left_size = branch.left.size();
            if index < left_size {
                branch.left.decompose_right(index, out);
                out.push(branch.right.clone());
            } else {
                branch.right.decompose_right(index - left_size, out);
            }
        }
    }

    fn fmt_leaves(&self, f: &mut fmt::Formatter<'_>, first: &mut bool) -> fmt::Result {
        if let Node::Branch(branch) = self.node() {
            branch.left.fmt_leaves(f, first)?;
            return branch.right.fmt_leaves(f, first);
        }
        if !*first {
            f.write_str(" ")?;
        }
        *first = false;
        match self.node() {
            Node::Range(range) => write!(f, "range({})", range.length),
            Node::Line(line) => {
                write!(f, "line({}", line.length)?;
                for (i, deco) in line.decos.iter().enumerate() {
                    f.write_str(if i == 0 { ":" } else { "," })?;
                    match *deco {
                        LineDeco::Widget { offset, height } => write!(f, "{offset},{height}")?,
                        LineDeco::Collapsed { offset, length } => write!(f, "{offset},-{length}")?,
                    }
                }
                f.write_str(")")
            }
            Node::Branch(_) => Ok(()),
        }
    }
}

/// Leaves in order, separated by spaces: `range(LEN)`, `line(LEN)`, or
/// `line(LEN:offset,value,...)` where a widget shows its height and a collapse its
/// negated hidden length. Meant for diagnostics and tests only.
impl fmt::Display for HeightMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_leaves(f, &mut true)
    }
}

struct Aggregate {
    length: usize,
    height: f64,
    size: usize,
    ends_empty: bool,
}

impl Aggregate {
    fn leaf(length: usize, height: f64) -> Self {
        assert!(
            height.is_finite() && height >= 0.0,
            "leaf height must be finite and non-negative; got {height:?}"
        );
        Self {
            length,
            height,
            size: 1,
            ends_empty: length == 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;
    use alloc::vec::Vec;

    use super::{HeightMap, LineDeco, Node};

    fn lines(count: usize) -> Vec<HeightMap> {
        (0..count).map(|_| HeightMap::line(11, 10.0)).collect()
    }

    #[test]
    fn empty_map_is_one_range() {
        let map = HeightMap::empty();
        assert_eq!(map.length(), 0);
        assert_eq!(map.size(), 1);
        assert_eq!(map.height(), 0.0);
        assert_eq!(map.to_string(), "range(0)");
        map.check_invariants();
    }

    #[test]
    fn branches_sum_their_children() {
        let map = HeightMap::branch(HeightMap::range(20, 28.0), HeightMap::line(7, 14.0));
        assert_eq!(map.length(), 27);
        assert_eq!(map.height(), 42.0);
        assert_eq!(map.size(), 2);
        assert_eq!(map.depth(), 2);
        map.check_invariants();
    }

    #[test]
    fn builds_balanced_trees() {
        for count in [1, 2, 3, 7, 100, 257] {
            let map = HeightMap::from_nodes(lines(count));
            map.check_invariants();
            assert_eq!(map.size(), count);
            let bound = usize::BITS - count.leading_zeros() + 1;
            assert!(
                map.depth() <= bound as usize,
                "{count} leaves built {} levels deep",
                map.depth()
            );
        }
    }

    #[test]
    fn from_nodes_splits_lopsided_subtrees() {
        let big = HeightMap::from_nodes(lines(64));
        let map = HeightMap::from_nodes(alloc::vec![HeightMap::range(5, 1.0), big.clone()]);
        map.check_invariants();
        assert_eq!(map.size(), 65);
        assert!(map.depth() <= 8, "depth {}", map.depth());
        // Untouched halves of the big subtree are reused rather than copied.
        let Node::Branch(root) = map.node() else {
            panic!("expected a branch");
        };
        let Node::Branch(big_root) = big.node() else {
            panic!("expected a branch");
        };
        assert!(root.right().ptr_eq(big_root.right()));
    }

    #[test]
    fn balanced_leaves_even_pairs_alone() {
        let left = HeightMap::from_nodes(lines(3));
        let right = HeightMap::from_nodes(lines(4));
        let map = HeightMap::balanced(left.clone(), right.clone());
        let Node::Branch(branch) = map.node() else {
            panic!("expected a branch");
        };
        assert!(branch.left().ptr_eq(&left));
        assert!(branch.right().ptr_eq(&right));

        let lopsided = HeightMap::balanced(HeightMap::line(11, 10.0), right);
        lopsided.check_invariants();
        assert_eq!(lopsided.size(), 5);
        assert_eq!(lopsided.depth(), 4);
    }

    #[test]
    fn locates_leaves_by_position_and_index() {
        let map = HeightMap::from_nodes(alloc::vec![
            HeightMap::range(11, 14.0),
            HeightMap::line(5, 14.0),
            HeightMap::line(8, 14.0),
            HeightMap::range(0, 14.0),
        ]);
        assert_eq!(map.leaf_at(0), (0, 0));
        assert_eq!(map.leaf_at(10), (0, 0));
        assert_eq!(map.leaf_at(11), (1, 11));
        assert_eq!(map.leaf_at(16), (2, 16));
        // The end of the document belongs to the empty last line.
        assert_eq!(map.leaf_at(24), (3, 24));
        assert_eq!(map.leaf(2).length(), 8);
        assert_eq!(map.leaf(9).length(), 0);
    }

    #[test]
    fn decomposition_covers_each_side() {
        let map = HeightMap::from_nodes(lines(13));
        for index in 0..=13 {
            let mut left = Vec::new();
            let mut right = Vec::new();
            map.decompose_left(index, &mut left);
            map.decompose_right(index, &mut right);
            let left_size: usize = left.iter().map(HeightMap::size).sum();
            let right_size: usize = right.iter().map(HeightMap::size).sum();
            assert_eq!(left_size, index);
            assert_eq!(right_size, 13 - index);
            let mut all = left;
            all.extend(right);
            let rebuilt = HeightMap::from_nodes(all);
            assert_eq!(rebuilt.length(), map.length());
            assert_eq!(rebuilt.to_string(), map.to_string());
        }
    }

    #[test]
    fn displays_decorations() {
        let map = HeightMap::from_nodes(alloc::vec![
            HeightMap::decorated_line(
                11,
                34.0,
                [LineDeco::Widget {
                    offset: 5,
                    height: 20.0
                }]
            ),
            HeightMap::range(11, 14.0),
            HeightMap::decorated_line(
                26,
                14.0,
                [LineDeco::Collapsed {
                    offset: 3,
                    length: 21
                }]
            ),
        ]);
        assert_eq!(map.to_string(), "line(11:5,20) range(11) line(26:3,-21)");
        assert_eq!(map.length(), 48);
    }

    #[test]
    #[should_panic(expected = "empty leaf")]
    fn rejects_inner_empty_leaves() {
        HeightMap::branch(HeightMap::range(0, 0.0), HeightMap::line(3, 1.0)).check_invariants();
    }
}
