// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounding-box hierarchy over recorded paint operations.
//!
//! An [`RTree`] is built exactly once from the device-space bounds of every
//! operation in a recording. Afterwards it answers two questions:
//!
//! - [`search`](RTree::search): which operations touch a query rectangle.
//! - [`search_non_overlapping_drawn_rects`](RTree::search_non_overlapping_drawn_rects):
//!   the minimal set of pairwise-disjoint rectangles covering the *drawn*
//!   geometry near a query rectangle. The embedder uses these as hit regions.
//!
//! Nodes live in a flat arena. Leaves keep insertion (paint) order, and
//! each level groups up to [`MAX_CHILDREN`] consecutive entries of the level
//! below, so recordings with spatial locality between neighbouring ops prune
//! well without any sorting pass.

use alloc::vec::Vec;
use core::mem::size_of;

use kurbo::Rect;

/// Maximum number of children per node.
pub const MAX_CHILDREN: usize = 11;

/// Per-entry metadata supplied alongside the bounds in [`RTree::insert`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DrawMetadata {
    /// Whether the entry paints pixels (as opposed to a clip, transform, or
    /// save/restore entry that is indexed only for spatial queries).
    pub is_draw: bool,
}

impl DrawMetadata {
    /// Metadata for a pixel-producing operation.
    pub const DRAW: Self = Self { is_draw: true };
    /// Metadata for a state-only operation.
    pub const STATE: Self = Self { is_draw: false };
}

/// Returns whether two rectangles overlap with non-zero area.
///
/// Touching edges do not count, and a zero-area rectangle never intersects
/// anything.
#[inline]
#[must_use]
pub fn intersects(a: Rect, b: Rect) -> bool {
    a.x0.max(b.x0) < a.x1.min(b.x1) && a.y0.max(b.y0) < a.y1.min(b.y1)
}

#[derive(Clone, Copy, Debug)]
struct Leaf {
    bounds: Rect,
    index: usize,
}

#[derive(Clone, Copy, Debug)]
struct Node {
    bounds: Rect,
    /// Start of the child range, in `leaves` for height 0 and in `nodes`
    /// otherwise.
    first: usize,
    count: usize,
    height: u32,
}

/// A bulk-loaded, immutable-after-build R-tree over recorded operations.
#[derive(Clone, Debug, Default)]
pub struct RTree {
    leaves: Vec<Leaf>,
    nodes: Vec<Node>,
    root: Option<usize>,
    /// Bounds of draw operations, keyed by insertion index.
    draw_rects: Vec<Option<Rect>>,
    inserted: bool,
}

impl RTree {
    /// Creates an empty tree awaiting its single [`insert`](Self::insert).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the hierarchy over `rects`.
    ///
    /// When `metadata` is `None` every entry is treated as a draw operation.
    ///
    /// # Panics
    ///
    /// Panics if called more than once on the same tree, or if `metadata`
    /// does not have one entry per rectangle.
    pub fn insert(&mut self, rects: &[Rect], metadata: Option<&[DrawMetadata]>) {
        assert!(!self.inserted, "RTree::insert called more than once");
        if let Some(metadata) = metadata {
            assert_eq!(
                metadata.len(),
                rects.len(),
                "RTree metadata length does not match rect count"
            );
        }
        self.inserted = true;

        self.draw_rects = rects
            .iter()
            .enumerate()
            .map(|(i, rect)| {
                let is_draw = metadata.is_none_or(|m| m[i].is_draw);
                is_draw.then_some(*rect)
            })
            .collect();

        self.leaves = rects
            .iter()
            .enumerate()
            .map(|(index, &bounds)| Leaf { bounds, index })
            .collect();

        self.bulk_load();
    }

    /// Returns whether [`insert`](Self::insert) has been called.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.inserted
    }

    /// Returns the number of indexed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Returns `true` if no entries are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Returns the insertion indices of every entry whose bounds intersect
    /// `query`.
    ///
    /// This is a bounding-volume test: no false negatives, no particular
    /// result order.
    #[must_use]
    pub fn search(&self, query: Rect) -> Vec<usize> {
        let mut results = Vec::new();
        if let Some(root) = self.root {
            if intersects(self.nodes[root].bounds, query) {
                self.search_node(root, query, &mut results);
            }
        }
        results
    }

    /// Returns pairwise-disjoint rectangles covering the drawn geometry that
    /// intersects `query`.
    ///
    /// Candidates are clustered incrementally: a candidate that overlaps an
    /// existing result is unioned into the first such result, which then
    /// absorbs every other result it has grown to overlap. Candidates that
    /// overlap nothing become new results. The cost is quadratic in the
    /// number of candidates, which is bounded by the ops near `query`.
    #[must_use]
    pub fn search_non_overlapping_drawn_rects(&self, query: Rect) -> Vec<Rect> {
        let mut results: Vec<Rect> = Vec::new();
        for index in self.search(query) {
            let Some(rect) = self.draw_rects.get(index).copied().flatten() else {
                continue;
            };

            let Some(first) = results.iter().position(|r| intersects(*r, rect)) else {
                results.push(rect);
                continue;
            };
            results[first] = results[first].union(rect);

            // Fold the remainder of the list into the grown rect.
            let mut i = first + 1;
            while i < results.len() {
                if intersects(results[i], results[first]) {
                    let absorbed = results.remove(i);
                    results[first] = results[first].union(absorbed);
                } else {
                    i += 1;
                }
            }

            // Growth may have reached results that precede `first` or that
            // were skipped before the last union.
            coalesce(&mut results, first);
        }
        results
    }

    /// Approximate heap plus inline memory used by the tree.
    #[must_use]
    pub fn bytes_used(&self) -> usize {
        size_of::<Self>()
            + self.leaves.capacity() * size_of::<Leaf>()
            + self.nodes.capacity() * size_of::<Node>()
            + self.draw_rects.capacity() * size_of::<Option<Rect>>()
    }

    fn search_node(&self, idx: usize, query: Rect, out: &mut Vec<usize>) {
        let node = self.nodes[idx];
        let range = node.first..node.first + node.count;
        if node.height == 0 {
            for leaf in &self.leaves[range] {
                if intersects(leaf.bounds, query) {
                    out.push(leaf.index);
                }
            }
        } else {
            for child in range {
                if intersects(self.nodes[child].bounds, query) {
                    self.search_node(child, query, out);
                }
            }
        }
    }

    /// Builds the levels bottom-up; each level's nodes are contiguous.
    fn bulk_load(&mut self) {
        self.nodes.clear();
        self.root = None;
        if self.leaves.is_empty() {
            return;
        }

        for (chunk_idx, chunk) in self.leaves.chunks(MAX_CHILDREN).enumerate() {
            self.nodes.push(Node {
                bounds: union_all(chunk.iter().map(|leaf| leaf.bounds)),
                first: chunk_idx * MAX_CHILDREN,
                count: chunk.len(),
                height: 0,
            });
        }

        let mut level_start = 0;
        let mut level_len = self.nodes.len();
        let mut height = 0;
        while level_len > 1 {
            height += 1;
            let next_start = self.nodes.len();
            let mut first = level_start;
            while first < level_start + level_len {
                let count = MAX_CHILDREN.min(level_start + level_len - first);
                let bounds = union_all(self.nodes[first..first + count].iter().map(|n| n.bounds));
                self.nodes.push(Node {
                    bounds,
                    first,
                    count,
                    height,
                });
                first += count;
            }
            level_start = next_start;
            level_len = self.nodes.len() - next_start;
        }
        self.root = Some(self.nodes.len() - 1);
    }
}

fn union_all(mut rects: impl Iterator<Item = Rect>) -> Rect {
    let first = rects.next().unwrap_or(Rect::ZERO);
    rects.fold(first, |a, b| a.union(b))
}

/// Merges every result overlapping `results[grown]` into it until the grown
/// rect overlaps nothing else.
fn coalesce(results: &mut Vec<Rect>, mut grown: usize) {
    loop {
        let target = results[grown];
        let Some(other) = results
            .iter()
            .enumerate()
            .position(|(i, r)| i != grown && intersects(*r, target))
        else {
            return;
        };
        let absorbed = results.remove(other);
        if other < grown {
            grown -= 1;
        }
        results[grown] = results[grown].union(absorbed);
    }
}
