// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame-scoped paint layers.
//!
//! Every frame starts with a root layer sized to the frame. Each embedded
//! view prerolled during the frame adds one more layer, the *overlay* that
//! holds whatever the pipeline paints above that view. Layers are identified
//! by [`EmbedderLayerId`] and live only until the next frame begins or the
//! current one is cancelled.
//!
//! A layer's lifecycle:
//!
//! 1. Created by `begin_frame` (root) or `preroll_composite_embedded_view`.
//! 2. Drawn into through [`EmbedderLayer::canvas`] while the frame
//!    accumulates. A [`CanvasSpy`](crate::canvas::CanvasSpy) watches the
//!    command stream so that layers which painted nothing visible never get a
//!    surface.
//! 3. [Finalized](EmbedderLayer::finalize) exactly once during submit,
//!    yielding a [`Picture`](crate::canvas::Picture) and, when hit regions
//!    are enabled, an [`RTree`](crate::rtree::RTree).

mod embedder_layer;
mod id;

pub use embedder_layer::EmbedderLayer;
pub use id::{EmbedderLayerId, ViewId};
