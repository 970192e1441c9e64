// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Platform-view and embedder-layer identity types.

use core::fmt;

/// A platform-view id supplied by the rendering pipeline.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u64);

impl fmt::Debug for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ViewId({})", self.0)
    }
}

/// Identifies a layer within one frame.
///
/// The root layer has no view; every other layer is the overlay painted above
/// one embedded view.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EmbedderLayerId(pub Option<ViewId>);

impl EmbedderLayerId {
    /// The root layer.
    pub const ROOT: Self = Self(None);

    /// The overlay layer of `view`.
    #[inline]
    #[must_use]
    pub const fn embedded(view: ViewId) -> Self {
        Self(Some(view))
    }

    /// Returns whether this is the root layer.
    #[inline]
    #[must_use]
    pub const fn is_root(self) -> bool {
        self.0.is_none()
    }

    /// Returns the embedded view, if any.
    #[inline]
    #[must_use]
    pub const fn view(self) -> Option<ViewId> {
        self.0
    }
}

impl fmt::Debug for EmbedderLayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            None => f.write_str("EmbedderLayerId(root)"),
            Some(view) => write!(f, "EmbedderLayerId({})", view.0),
        }
    }
}

impl From<ViewId> for EmbedderLayerId {
    fn from(view: ViewId) -> Self {
        Self::embedded(view)
    }
}
