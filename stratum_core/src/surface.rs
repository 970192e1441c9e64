// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render targets handed out by a [`SurfaceProducer`](crate::backend::SurfaceProducer).

use alloc::boxed::Box;
use core::fmt;

use kurbo::Size;

use crate::canvas::Canvas;
use crate::session::ContentId;

/// An opaque GPU synchronization primitive.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fence(pub u64);

impl fmt::Debug for Fence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fence({})", self.0)
    }
}

/// Token for registering a surface's buffer with the compositor out of band.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferImportToken(pub u64);

/// A fixed-size render target used by exactly one layer for one frame.
///
/// The embedder owns a surface from [`produce_surface`] until it hands it
/// back through [`submit_surfaces`]. The compositor reads it through its
/// image id; the acquire fence gates that read on GPU completion and the
/// release fence gates the next GPU write on the compositor being done.
///
/// [`produce_surface`]: crate::backend::SurfaceProducer::produce_surface
/// [`submit_surfaces`]: crate::backend::SurfaceProducer::submit_surfaces
pub trait Surface {
    /// Pixel size.
    fn size(&self) -> Size;

    /// The compositor image bound to this surface, once registered.
    fn image_id(&self) -> Option<ContentId>;

    /// Records the compositor image registered for this surface.
    fn set_image_id(&mut self, image: ContentId);

    /// Token used to register the surface's buffer with the compositor.
    fn import_token(&self) -> BufferImportToken;

    /// Signaled when GPU writes to the surface complete.
    fn acquire_fence(&self) -> Fence;

    /// Signaled when the compositor stops reading the surface.
    fn release_fence(&self) -> Fence;

    /// Installs a callback run when the producer retires the surface, used to
    /// release its compositor image.
    fn set_release_image_callback(&mut self, callback: Box<dyn FnOnce()>);

    /// The canvas that rasterizes into this surface.
    fn canvas(&mut self) -> &mut dyn Canvas;

    /// Submits pending GPU work.
    fn flush(&mut self);
}
