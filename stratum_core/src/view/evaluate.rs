// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Draining view-holder changes.
//!
//! Evaluation drains each dirty channel into one list of [`ViewChanges`].
//! There is nothing to recompute: holders are flat siblings, so the stored
//! attribute *is* the value to push. The embedder turns each list into the
//! matching session command.
//!
//! [`ViewChanges`] uses raw slot indices (`u32`) rather than
//! [`ViewHolderId`] handles so that the embedder can read attributes through
//! the `*_at()` accessors (e.g.
//! [`transform_at`](super::ViewHolderStore::transform_at)) without paying for
//! generation checks.
//!
//! [`ViewHolderId`]: super::ViewHolderId

use alloc::vec::Vec;

use super::store::ViewHolderStore;
use crate::dirty;

/// The set of changes produced by a single [`ViewHolderStore::evaluate`] call.
///
/// Each field contains the raw slot indices of holders whose attribute in the
/// corresponding category changed, in ascending slot order.
#[derive(Clone, Debug, Default)]
pub struct ViewChanges {
    /// Holders whose node transform changed.
    pub transforms: Vec<u32>,
    /// Holders whose opacity changed.
    pub opacities: Vec<u32>,
    /// Holders whose clip chain changed.
    pub clips: Vec<u32>,
    /// Holders whose viewport properties changed.
    pub properties: Vec<u32>,
    /// Holders whose hit-testability changed.
    pub hit_test: Vec<u32>,
    /// Holders whose elevation changed.
    pub elevations: Vec<u32>,
}

impl ViewChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.transforms.clear();
        self.opacities.clear();
        self.clips.clear();
        self.properties.clear();
        self.hit_test.clear();
        self.elevations.clear();
    }

    /// Returns whether nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
            && self.opacities.is_empty()
            && self.clips.is_empty()
            && self.properties.is_empty()
            && self.hit_test.is_empty()
            && self.elevations.is_empty()
    }
}

impl ViewHolderStore {
    /// Drains every dirty channel and returns the set of changes.
    pub fn evaluate(&mut self) -> ViewChanges {
        let mut changes = ViewChanges::default();
        self.evaluate_into(&mut changes);
        changes
    }

    /// Like [`evaluate`](Self::evaluate), but reuses a caller-provided buffer
    /// to avoid allocation.
    pub fn evaluate_into(&mut self, changes: &mut ViewChanges) {
        changes.clear();
        changes.transforms = self.drain(dirty::TRANSFORM);
        changes.opacities = self.drain(dirty::OPACITY);
        changes.clips = self.drain(dirty::CLIP);
        changes.properties = self.drain(dirty::PROPERTIES);
        changes.hit_test = self.drain(dirty::HIT_TEST);
        changes.elevations = self.drain(dirty::ELEVATION);
    }

    fn drain(&mut self, channel: understory_dirty::Channel) -> Vec<u32> {
        self.dirty.drain(channel).deterministic().run().collect()
    }
}
