// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Embedded-view placement: mutator stacks and their folded form.
//!
//! The rendering pipeline describes where a platform view sits by a stack of
//! mutators collected while walking its layer tree, outermost first. The
//! compositor wants something flatter: a node transform, a chain of clips
//! each expressed in the coordinate space reached after the transforms that
//! preceded it, and a single opacity. [`ViewMutators::fold`] performs that
//! conversion.

use alloc::vec::Vec;

use kurbo::{Affine, BezPath, Rect, RoundedRect, Shape, Size};

/// One entry of a [`MutatorsStack`].
#[derive(Clone, Debug, PartialEq)]
pub enum Mutator {
    /// Multiplies opacity; values outside `[0, 1]` are clamped when folded.
    Opacity(f32),
    /// Applies a transform to everything above it in the stack.
    Transform(Affine),
    /// Clips to a rectangle.
    ClipRect(Rect),
    /// Clips to a rounded rectangle (folded to its bounds).
    ClipRoundedRect(RoundedRect),
    /// Clips to a path (folded to its bounds).
    ClipPath(BezPath),
}

impl Mutator {
    /// Returns the clip bounds if this is a clip mutator.
    #[must_use]
    pub fn clip_bounds(&self) -> Option<Rect> {
        match self {
            Self::ClipRect(rect) => Some(*rect),
            Self::ClipRoundedRect(rrect) => Some(rrect.rect()),
            Self::ClipPath(path) => Some(path.bounding_box()),
            Self::Opacity(_) | Self::Transform(_) => None,
        }
    }
}

/// Ordered mutators, bottom (outermost) first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MutatorsStack {
    mutators: Vec<Mutator>,
}

impl MutatorsStack {
    /// Creates an empty stack.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mutators: Vec::new(),
        }
    }

    /// Pushes a mutator on top.
    pub fn push(&mut self, mutator: Mutator) {
        self.mutators.push(mutator);
    }

    /// Pops the top mutator.
    pub fn pop(&mut self) -> Option<Mutator> {
        self.mutators.pop()
    }

    /// Iterates from bottom to top.
    pub fn iter(&self) -> core::slice::Iter<'_, Mutator> {
        self.mutators.iter()
    }

    /// Product of every transform in the stack, bottom to top.
    #[must_use]
    pub fn total_transform(&self) -> Affine {
        self.mutators
            .iter()
            .fold(Affine::IDENTITY, |total, mutator| match mutator {
                Mutator::Transform(transform) => total * *transform,
                _ => total,
            })
    }

    /// Number of mutators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mutators.len()
    }

    /// Returns `true` if the stack is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mutators.is_empty()
    }
}

impl<'a> IntoIterator for &'a MutatorsStack {
    type Item = &'a Mutator;
    type IntoIter = core::slice::Iter<'a, Mutator>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<Mutator> for MutatorsStack {
    fn from_iter<T: IntoIterator<Item = Mutator>>(iter: T) -> Self {
        Self {
            mutators: iter.into_iter().collect(),
        }
    }
}

/// Placement parameters for one embedded view in one frame.
///
/// `transform` is the view's placement as the pipeline computed it. It must
/// agree with the product of the transforms in `mutators`; the embedder
/// checks this at preroll.
#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddedViewParams {
    /// Placement transform reported by the pipeline.
    pub transform: Affine,
    /// Logical size of the view.
    pub size: Size,
    /// Mutators applied to the view.
    pub mutators: MutatorsStack,
}

impl EmbeddedViewParams {
    /// Params for a view of `size` with no mutators.
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            transform: Affine::IDENTITY,
            size,
            mutators: MutatorsStack::new(),
        }
    }

    /// Params for a view of `size` under `mutators`, placed at their total
    /// transform.
    #[must_use]
    pub fn with_mutators(size: Size, mutators: MutatorsStack) -> Self {
        Self {
            transform: mutators.total_transform(),
            size,
            mutators,
        }
    }

    /// Returns `true` if `transform` matches the mutator stack's total
    /// transform within rounding error.
    #[must_use]
    pub fn is_placement_consistent(&self) -> bool {
        let total = self.mutators.total_transform().as_coeffs();
        self.transform
            .as_coeffs()
            .iter()
            .zip(total)
            .all(|(a, b)| (a - b).abs() <= 1e-9 * (1.0 + a.abs().max(b.abs())))
    }
}

/// A clip rectangle paired with the transform accumulated since the
/// previous clip.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformedClip {
    /// Transform to apply before this clip.
    pub transform: Affine,
    /// Clip bounds in the space reached after `transform`.
    pub rect: Rect,
}

/// The folded form of a [`MutatorsStack`].
#[derive(Clone, Debug, PartialEq)]
pub struct ViewMutators {
    /// Transform accumulated after the last clip.
    pub transform: Affine,
    /// Clips in stack order.
    pub clips: Vec<TransformedClip>,
    /// Product of every opacity in the stack, each clamped to `[0, 1]`.
    pub opacity: f32,
}

impl Default for ViewMutators {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            clips: Vec::new(),
            opacity: 1.0,
        }
    }
}

impl ViewMutators {
    /// Folds `stack` from bottom to top.
    #[must_use]
    pub fn fold(stack: &MutatorsStack) -> Self {
        let mut folded = Self::default();
        let mut since_clip = Affine::IDENTITY;
        for mutator in stack {
            match mutator {
                Mutator::Opacity(alpha) => folded.opacity *= alpha.clamp(0.0, 1.0),
                Mutator::Transform(transform) => since_clip *= *transform,
                Mutator::ClipRect(_) | Mutator::ClipRoundedRect(_) | Mutator::ClipPath(_) => {
                    if let Some(rect) = mutator.clip_bounds() {
                        folded.clips.push(TransformedClip {
                            transform: since_clip,
                            rect,
                        });
                    }
                    since_clip = Affine::IDENTITY;
                }
            }
        }
        folded.transform = since_clip;
        folded
    }
}
