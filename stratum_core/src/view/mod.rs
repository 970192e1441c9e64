// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Persistent compositor-side holders for platform views.
//!
//! Each platform view the pipeline embeds is hosted by a *view holder*: a
//! transform node plus a viewport in the compositor scene. Unlike layers,
//! holders persist across frames so that the embedder can push only the
//! attributes that changed since the previous frame:
//!
//! - **transform**, **opacity**, **clips**: folded from the view's mutator
//!   stack every frame it is shown.
//! - **properties**: logical size, occlusion hint, and focusability, sent as
//!   one viewport-properties update. Zero-size updates are deferred.
//! - **hit test**: whether input reaches the view.
//! - **elevation**: depth among the frame's layers.
//!
//! Holders are stored in struct-of-arrays layout with generational handles.

mod evaluate;
mod store;

pub use evaluate::ViewChanges;
pub use store::{ReleasedHolder, ViewCreateArgs, ViewHolderId, ViewHolderStore};
