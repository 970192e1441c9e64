// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend contract for platform integrations.
//!
//! Stratum splits platform-specific work into the collaborators an
//! [`ExternalViewEmbedder`](crate::embedder::ExternalViewEmbedder) is built
//! from. Each platform integration provides the following pieces:
//!
//! - **Session**: Implements [`Session`] to forward scene mutations to the
//!   compositor (e.g. a Flatland channel, a test recorder). Presents are
//!   fire-and-forget; the compositor's answers come back as
//!   [`SessionEvent`](crate::session::SessionEvent)s that the owner feeds to
//!   [`ExternalViewEmbedder::handle_session_event`] on the raster thread.
//!
//! - **Surface producer**: Implements [`SurfaceProducer`] to hand out
//!   [`Surface`]s and take them back for recycling once presented. Recycling
//!   is gated on each surface's release fence, which is the producer's
//!   concern, not the embedder's.
//!
//! - **Platform frame**: Implements [`PlatformFrame`] for whatever the
//!   windowing layer needs to hear once a frame's rasterization is enqueued
//!   (e.g. a swapchain submit).
//!
//! # Crate boundaries
//!
//! `stratum_core` owns the data model, the submit algorithm, and this
//! contract module. Platform crates depend on `stratum_core` and provide the
//! glue; the shell wires both together in its raster loop.
//!
//! [`ExternalViewEmbedder::handle_session_event`]: crate::embedder::ExternalViewEmbedder::handle_session_event

use alloc::vec::Vec;

use kurbo::Size;

use crate::session::{PresentArgs, SessionCommand};
use crate::surface::Surface;

/// An ordered command queue to the compositor.
///
/// # Frame loop pseudocode
///
/// A raster-thread frame drives the embedder like this:
///
/// ```rust,ignore
/// fn on_frame(embedder: &mut ExternalViewEmbedder<MySession, MyProducer>) {
///     embedder.begin_frame(frame_size, device_pixel_ratio);
///
///     // Record: the pipeline paints the root and prerolls platform views.
///     draw_background(embedder.root_canvas().unwrap());
///     embedder.preroll_composite_embedded_view(video, params);
///     draw_controls(embedder.composite_embedded_view(video));
///     embedder.end_frame();
///
///     // Submit: allocate, finalize, build the scene, present, rasterize.
///     let report = embedder.submit_frame(swapchain_frame);
/// }
///
/// fn on_session_event(embedder: &mut ExternalViewEmbedder<..>, event: SessionEvent) {
///     if let Err(err) = embedder.handle_session_event(event) {
///         shell.tear_down_session(err);
///     }
/// }
/// ```
pub trait Session {
    /// Queues a scene mutation.
    fn enqueue(&mut self, command: SessionCommand);

    /// Atomically applies every queued mutation.
    fn present(&mut self, args: PresentArgs);
}

/// Hands out render targets and takes them back for recycling.
pub trait SurfaceProducer {
    /// The surface type produced.
    type Surface: Surface;

    /// Produces a surface of `size`, or `None` if resources are exhausted.
    fn produce_surface(&mut self, size: Size) -> Option<Self::Surface>;

    /// Returns every surface used in a frame, after its present was enqueued.
    fn submit_surfaces(&mut self, surfaces: Vec<Self::Surface>);
}

/// The platform's per-frame hand-off object.
pub trait PlatformFrame {
    /// Completes the hand-off. Called exactly once per submitted frame.
    fn submit(self);
}
