// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays storage for persistent view holders.

use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;
use kurbo::{Affine, Rect, Size};
use understory_dirty::{CycleHandling, DirtyTracker};

use crate::dirty;
use crate::layer::ViewId;
use crate::mutator::TransformedClip;
use crate::session::{ContentId, TransformId, ViewportProperties};

/// A handle to a holder in a [`ViewHolderStore`].
///
/// Contains both a slot index and a generation counter so that stale handles
/// can be detected after a view is destroyed and the slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewHolderId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl ViewHolderId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for ViewHolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ViewHolderId({}@gen{})", self.idx, self.generation)
    }
}

/// Initial attributes of a view holder.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewCreateArgs {
    /// Whether input reaches the view.
    pub hit_testable: bool,
    /// Whether the view may take focus.
    pub focusable: bool,
    /// Region of the view expected to be covered by content above it.
    pub occlusion_hint: Rect,
}

impl Default for ViewCreateArgs {
    fn default() -> Self {
        Self {
            hit_testable: true,
            focusable: true,
            occlusion_hint: Rect::ZERO,
        }
    }
}

/// Compositor resources of a destroyed holder, to be released by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReleasedHolder {
    /// The holder's transform node.
    pub transform: TransformId,
    /// The holder's viewport.
    pub viewport: ContentId,
}

/// Struct-of-arrays storage for the compositor-side holders of platform
/// views.
///
/// A holder outlives frames: it is created when a view is registered (or the
/// first time an unregistered view is submitted) and released when the view is
/// destroyed. Attribute setters compare against the stored value and mark the
/// matching [`dirty`] channel only on change, so a view that sits still costs
/// no session traffic.
#[derive(Debug)]
pub struct ViewHolderStore {
    // -- Identity --
    pub(crate) view: Vec<ViewId>,
    pub(crate) transform_node: Vec<TransformId>,
    pub(crate) viewport: Vec<ContentId>,

    // -- Attributes --
    pub(crate) transform: Vec<Affine>,
    pub(crate) opacity: Vec<f32>,
    pub(crate) clips: Vec<Vec<TransformedClip>>,
    pub(crate) size: Vec<Size>,
    pub(crate) occlusion_hint: Vec<Rect>,
    pub(crate) focusable: Vec<bool>,
    pub(crate) hit_testable: Vec<bool>,
    pub(crate) elevation: Vec<f64>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,
    by_view: HashMap<ViewId, ViewHolderId>,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,
}

impl Default for ViewHolderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewHolderStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            view: Vec::new(),
            transform_node: Vec::new(),
            viewport: Vec::new(),
            transform: Vec::new(),
            opacity: Vec::new(),
            clips: Vec::new(),
            size: Vec::new(),
            occlusion_hint: Vec::new(),
            focusable: Vec::new(),
            hit_testable: Vec::new(),
            elevation: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            by_view: HashMap::new(),
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
        }
    }

    // -- Allocation API --

    /// Registers a holder for `view` backed by the given compositor nodes.
    ///
    /// The holder starts with an identity transform, full opacity, no clips,
    /// zero size, and the flags in `args`. Hit-testability is marked dirty so
    /// the first evaluation pushes it.
    ///
    /// # Panics
    ///
    /// Panics if `view` already has a holder.
    pub fn insert(
        &mut self,
        view: ViewId,
        transform_node: TransformId,
        viewport: ContentId,
        args: ViewCreateArgs,
    ) -> ViewHolderId {
        assert!(
            !self.by_view.contains_key(&view),
            "view holder for {view:?} already exists"
        );

        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            let i = idx as usize;
            self.generation[i] += 1;
            self.view[i] = view;
            self.transform_node[i] = transform_node;
            self.viewport[i] = viewport;
            self.transform[i] = Affine::IDENTITY;
            self.opacity[i] = 1.0;
            self.clips[i].clear();
            self.size[i] = Size::ZERO;
            self.occlusion_hint[i] = args.occlusion_hint;
            self.focusable[i] = args.focusable;
            self.hit_testable[i] = args.hit_testable;
            self.elevation[i] = 0.0;
            idx
        } else {
            // Allocate a new slot.
            let idx = self.len;
            self.len += 1;
            self.view.push(view);
            self.transform_node.push(transform_node);
            self.viewport.push(viewport);
            self.transform.push(Affine::IDENTITY);
            self.opacity.push(1.0);
            self.clips.push(Vec::new());
            self.size.push(Size::ZERO);
            self.occlusion_hint.push(args.occlusion_hint);
            self.focusable.push(args.focusable);
            self.hit_testable.push(args.hit_testable);
            self.elevation.push(0.0);
            self.generation.push(0);
            idx
        };

        self.dirty.mark(idx, dirty::HIT_TEST);

        let id = ViewHolderId {
            idx,
            generation: self.generation[idx as usize],
        };
        self.by_view.insert(view, id);
        id
    }

    /// Removes the holder for `view`, returning the compositor nodes the
    /// caller must release.
    pub fn remove(&mut self, view: ViewId) -> Option<ReleasedHolder> {
        let id = self.by_view.remove(&view)?;
        let idx = id.idx;

        // Drop any pending updates for the slot.
        self.dirty.remove_key(idx);

        // Bump generation so old handles immediately fail validation.
        self.generation[idx as usize] += 1;
        self.free_list.push(idx);

        Some(ReleasedHolder {
            transform: self.transform_node[idx as usize],
            viewport: self.viewport[idx as usize],
        })
    }

    /// Returns the holder registered for `view`.
    #[must_use]
    pub fn get(&self, view: ViewId) -> Option<ViewHolderId> {
        self.by_view.get(&view).copied()
    }

    /// Returns whether the given handle refers to a live holder.
    #[must_use]
    pub fn is_alive(&self, id: ViewHolderId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    /// Number of live holders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_view.len()
    }

    /// Returns `true` if no holders are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_view.is_empty()
    }

    // -- Getters --

    /// The view a holder hosts.
    #[must_use]
    pub fn view(&self, id: ViewHolderId) -> ViewId {
        self.validate(id);
        self.view[id.idx as usize]
    }

    /// The holder's transform node.
    #[must_use]
    pub fn transform_node(&self, id: ViewHolderId) -> TransformId {
        self.validate(id);
        self.transform_node[id.idx as usize]
    }

    /// The holder's viewport.
    #[must_use]
    pub fn viewport(&self, id: ViewHolderId) -> ContentId {
        self.validate(id);
        self.viewport[id.idx as usize]
    }

    /// The holder's logical size.
    #[must_use]
    pub fn size(&self, id: ViewHolderId) -> Size {
        self.validate(id);
        self.size[id.idx as usize]
    }

    /// Whether input reaches the view.
    #[must_use]
    pub fn hit_testable(&self, id: ViewHolderId) -> bool {
        self.validate(id);
        self.hit_testable[id.idx as usize]
    }

    /// Whether the view may take focus.
    #[must_use]
    pub fn focusable(&self, id: ViewHolderId) -> bool {
        self.validate(id);
        self.focusable[id.idx as usize]
    }

    // -- Mutation API (marks dirty on change) --

    /// Sets the node transform.
    pub fn set_transform(&mut self, id: ViewHolderId, transform: Affine) {
        self.validate(id);
        let i = id.idx as usize;
        if self.transform[i] != transform {
            self.transform[i] = transform;
            self.dirty.mark(id.idx, dirty::TRANSFORM);
        }
    }

    /// Sets the folded opacity.
    pub fn set_opacity(&mut self, id: ViewHolderId, opacity: f32) {
        self.validate(id);
        let i = id.idx as usize;
        if self.opacity[i] != opacity {
            self.opacity[i] = opacity;
            self.dirty.mark(id.idx, dirty::OPACITY);
        }
    }

    /// Sets the clip chain.
    pub fn set_clips(&mut self, id: ViewHolderId, clips: &[TransformedClip]) {
        self.validate(id);
        let i = id.idx as usize;
        if self.clips[i] != clips {
            self.clips[i].clear();
            self.clips[i].extend_from_slice(clips);
            self.dirty.mark(id.idx, dirty::CLIP);
        }
    }

    /// Sets the logical size.
    pub fn set_size(&mut self, id: ViewHolderId, size: Size) {
        self.validate(id);
        let i = id.idx as usize;
        if self.size[i] != size {
            self.size[i] = size;
            self.dirty.mark(id.idx, dirty::PROPERTIES);
        }
    }

    /// Sets the occlusion hint.
    pub fn set_occlusion_hint(&mut self, id: ViewHolderId, hint: Rect) {
        self.validate(id);
        let i = id.idx as usize;
        if self.occlusion_hint[i] != hint {
            self.occlusion_hint[i] = hint;
            self.dirty.mark(id.idx, dirty::PROPERTIES);
        }
    }

    /// Sets focusability.
    pub fn set_focusable(&mut self, id: ViewHolderId, focusable: bool) {
        self.validate(id);
        let i = id.idx as usize;
        if self.focusable[i] != focusable {
            self.focusable[i] = focusable;
            self.dirty.mark(id.idx, dirty::PROPERTIES);
        }
    }

    /// Sets hit-testability.
    pub fn set_hit_testable(&mut self, id: ViewHolderId, hit_testable: bool) {
        self.validate(id);
        let i = id.idx as usize;
        if self.hit_testable[i] != hit_testable {
            self.hit_testable[i] = hit_testable;
            self.dirty.mark(id.idx, dirty::HIT_TEST);
        }
    }

    /// Sets the scene depth.
    pub fn set_elevation(&mut self, id: ViewHolderId, elevation: f64) {
        self.validate(id);
        let i = id.idx as usize;
        if self.elevation[i] != elevation {
            self.elevation[i] = elevation;
            self.dirty.mark(id.idx, dirty::ELEVATION);
        }
    }

    /// Re-marks viewport properties so they are reported again by the next
    /// evaluation.
    pub(crate) fn defer_properties(&mut self, idx: u32) {
        self.dirty.mark(idx, dirty::PROPERTIES);
    }

    // -- Raw-index accessors --
    //
    // These accept raw slot indices (as found in `ViewChanges`) rather than
    // `ViewHolderId` handles, skipping generation validation.

    /// The view hosted at raw slot `idx`.
    #[must_use]
    pub fn view_at(&self, idx: u32) -> ViewId {
        self.view[self.slot(idx)]
    }

    /// The transform node at raw slot `idx`.
    #[must_use]
    pub fn transform_node_at(&self, idx: u32) -> TransformId {
        self.transform_node[self.slot(idx)]
    }

    /// The viewport at raw slot `idx`.
    #[must_use]
    pub fn viewport_at(&self, idx: u32) -> ContentId {
        self.viewport[self.slot(idx)]
    }

    /// The node transform at raw slot `idx`.
    #[must_use]
    pub fn transform_at(&self, idx: u32) -> Affine {
        self.transform[self.slot(idx)]
    }

    /// The opacity at raw slot `idx`.
    #[must_use]
    pub fn opacity_at(&self, idx: u32) -> f32 {
        self.opacity[self.slot(idx)]
    }

    /// The clip chain at raw slot `idx`.
    #[must_use]
    pub fn clips_at(&self, idx: u32) -> &[TransformedClip] {
        &self.clips[self.slot(idx)]
    }

    /// The logical size at raw slot `idx`.
    #[must_use]
    pub fn size_at(&self, idx: u32) -> Size {
        self.size[self.slot(idx)]
    }

    /// Whether the holder at raw slot `idx` is hit-testable.
    #[must_use]
    pub fn hit_testable_at(&self, idx: u32) -> bool {
        self.hit_testable[self.slot(idx)]
    }

    /// The elevation at raw slot `idx`.
    #[must_use]
    pub fn elevation_at(&self, idx: u32) -> f64 {
        self.elevation[self.slot(idx)]
    }

    /// The viewport properties at raw slot `idx`.
    #[must_use]
    pub fn properties_at(&self, idx: u32) -> ViewportProperties {
        let i = self.slot(idx);
        ViewportProperties {
            logical_size: self.size[i],
            occlusion_hint: self.occlusion_hint[i],
            focusable: self.focusable[i],
        }
    }

    // -- Internal helpers --

    fn slot(&self, idx: u32) -> usize {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
        idx as usize
    }

    fn validate(&self, id: ViewHolderId) {
        assert!(
            self.is_alive(id),
            "stale ViewHolderId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }
}
