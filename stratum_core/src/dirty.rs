// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! Stratum uses multi-channel dirty tracking (via [`understory_dirty`]) to
//! keep compositor traffic for platform views proportional to what actually
//! changed. Each channel is one attribute of a persistent view holder that
//! maps to one kind of session command.
//!
//! # Propagation semantics
//!
//! View holders are siblings under the scene root, so no channel has
//! dependency edges: every channel is **local-only** and only the explicitly
//! marked holder appears in the drain output.
//!
//! Marking happens in the [`ViewHolderStore`] setters, which compare against
//! the stored value first. Writing an unchanged attribute marks nothing.
//!
//! # Consumption
//!
//! Callers never query dirty state directly. Each
//! [`ViewHolderStore::evaluate`] call drains every channel and surfaces the
//! results as [`ViewChanges`], from which the embedder emits exactly the
//! commands that changed.
//!
//! [`ViewHolderStore`]: crate::view::ViewHolderStore
//! [`ViewHolderStore::evaluate`]: crate::view::ViewHolderStore::evaluate
//! [`ViewChanges`]: crate::view::ViewChanges

use understory_dirty::Channel;

/// Node transform (the transform left after the last clip) changed.
pub const TRANSFORM: Channel = Channel::new(0);

/// Folded opacity changed.
pub const OPACITY: Channel = Channel::new(1);

/// Clip chain changed.
pub const CLIP: Channel = Channel::new(2);

/// Viewport properties (logical size, occlusion hint, focusability) changed.
pub const PROPERTIES: Channel = Channel::new(3);

/// Hit-testability changed.
pub const HIT_TEST: Channel = Channel::new(4);

/// Depth in the scene changed.
pub const ELEVATION: Channel = Channel::new(5);
