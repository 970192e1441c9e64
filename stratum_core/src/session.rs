// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compositor session vocabulary and present flow control.
//!
//! The embedder talks to the compositor through an ordered command queue
//! ([`SessionCommand`]) flushed by an atomic present ([`PresentArgs`]). The
//! compositor answers asynchronously with [`SessionEvent`]s, which the owner
//! must deliver on the raster thread.
//!
//! [`SessionConnection`] wraps a [`Session`] with the present-credit
//! protocol:
//!
//! - Each issued present spends one credit. Credits come back with
//!   [`SessionEvent::NextFrameBegin`].
//! - A present requested with no credits left is *withheld*. Withheld
//!   presents coalesce into a single pending present (their fences merge) and
//!   it is issued as soon as a credit arrives. Nothing is queued beyond that.
//! - Release fences are rotated by one present: the fences of the surfaces
//!   shown by present N are handed to the compositor with present N+1, when
//!   those surfaces have been replaced on screen.

use alloc::vec::Vec;
use core::mem;

use kurbo::{Affine, Point, Rect, Size, Vec2};

use crate::backend::Session;
use crate::layer::ViewId;
use crate::mutator::TransformedClip;
use crate::surface::{BufferImportToken, Fence};

/// A compositor transform node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransformId(pub u64);

/// A compositor content node: an image or a viewport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId(pub u64);

/// How image content combines with what is beneath it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Replace the destination; the content is treated as opaque.
    Src,
    /// Alpha-blend over the destination.
    SrcOver,
}

/// How a hit region participates in input and accessibility.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HitTestInteraction {
    /// Hittable and visible to accessibility.
    #[default]
    Default,
    /// Hittable but hidden from accessibility.
    SemanticallyInvisible,
}

/// A hittable rectangle, positioned by its center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitRegion {
    /// Center of the region in the node's coordinates.
    pub center: Point,
    /// Extent of the region.
    pub size: Size,
    /// Input and accessibility behavior.
    pub interaction: HitTestInteraction,
}

impl HitRegion {
    /// The region covering `rect`.
    #[must_use]
    pub fn from_rect(rect: Rect, interaction: HitTestInteraction) -> Self {
        Self {
            center: rect.center(),
            size: rect.size(),
            interaction,
        }
    }

    /// The covered rectangle.
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::from_center_size(self.center, self.size)
    }
}

/// Properties of a viewport hosting an embedded view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportProperties {
    /// Logical size of the hosted view.
    pub logical_size: Size,
    /// Region of the view expected to be covered by content above it.
    pub occlusion_hint: Rect,
    /// Whether the hosted view may receive focus.
    pub focusable: bool,
}

/// One mutation of the compositor scene.
#[derive(Clone, Debug, PartialEq)]
#[expect(missing_docs, reason = "field names are self-describing")]
pub enum SessionCommand {
    /// Creates a transform node.
    CreateTransform(TransformId),
    /// Makes a transform the scene root.
    SetRootTransform(TransformId),
    /// Appends `child` to `parent`'s children; later children draw on top.
    AddChild { parent: TransformId, child: TransformId },
    /// Detaches `child` from `parent`.
    RemoveChild { parent: TransformId, child: TransformId },
    /// Destroys a transform node.
    ReleaseTransform(TransformId),
    /// Sets a translation-only transform.
    SetTranslation { transform: TransformId, translation: Vec2 },
    /// Sets a scale.
    SetScale { transform: TransformId, scale: Vec2 },
    /// Sets a full 2D affine transform.
    SetTransform { transform: TransformId, matrix: Affine },
    /// Sets depth; larger values are closer to the viewer.
    SetElevation { transform: TransformId, elevation: f64 },
    /// Sets group opacity.
    SetOpacity { transform: TransformId, opacity: f32 },
    /// Replaces the clip chain.
    SetClips {
        transform: TransformId,
        clips: Vec<TransformedClip>,
    },
    /// Registers a surface buffer as an image.
    CreateImage {
        image: ContentId,
        import_token: BufferImportToken,
        size: Size,
    },
    /// Destroys an image.
    ReleaseImage(ContentId),
    /// Binds (or unbinds, with `None`) content to a transform.
    SetContent {
        transform: TransformId,
        content: Option<ContentId>,
    },
    /// Sets the on-screen size of an image.
    SetImageDestinationSize { image: ContentId, size: Size },
    /// Sets image blending.
    SetImageBlending { image: ContentId, mode: BlendMode },
    /// Replaces the node's hit regions, including the implicit full-content
    /// region.
    SetHitRegions {
        transform: TransformId,
        regions: Vec<HitRegion>,
    },
    /// Makes the node hittable everywhere.
    SetInfiniteHitRegion {
        transform: TransformId,
        interaction: HitTestInteraction,
    },
    /// Creates a viewport hosting `view`.
    CreateViewport {
        viewport: ContentId,
        view: ViewId,
        properties: ViewportProperties,
    },
    /// Updates a viewport.
    SetViewportProperties {
        viewport: ContentId,
        properties: ViewportProperties,
    },
    /// Destroys a viewport.
    ReleaseViewport(ContentId),
}

/// Arguments of one atomic present.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PresentArgs {
    /// Fences the compositor waits on before reading this present's surfaces.
    pub acquire_fences: Vec<Fence>,
    /// Fences the compositor signals once it stops reading the previous
    /// present's surfaces.
    pub release_fences: Vec<Fence>,
}

/// Errors reported by the compositor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum SessionError {
    /// A command in the queue was rejected.
    #[error("compositor rejected a session command")]
    BadOperation,
    /// A present arrived with no credits left.
    #[error("present issued without present credits")]
    NoPresentsRemaining,
    /// The connection to the compositor was lost.
    #[error("compositor session lost")]
    Lost,
}

/// Asynchronous notifications from the compositor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// The compositor is ready for more presents.
    NextFrameBegin {
        /// Credits returned.
        additional_present_credits: u32,
    },
    /// Presents were shown.
    FramePresented {
        /// How many presents this event acknowledges.
        presents_handled: u32,
    },
    /// The session failed.
    Error(SessionError),
}

/// Result of [`SessionConnection::present`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PresentOutcome {
    /// The present went out.
    Presented,
    /// No credits were left; the present is pending until credits return.
    Withheld,
}

/// A [`Session`] plus present-credit bookkeeping.
#[derive(Debug)]
pub struct SessionConnection<S> {
    session: S,
    credits: u32,
    present_pending: bool,
    acquire_fences: Vec<Fence>,
    /// Handed out with the next issued present.
    release_fences: Vec<Fence>,
    /// Fences of surfaces in the pending present; become `release_fences`
    /// once it is issued.
    next_release_fences: Vec<Fence>,
    presents_issued: u64,
    presents_handled: u64,
}

impl<S: Session> SessionConnection<S> {
    /// Wraps `session` with `initial_credits` presents available.
    #[must_use]
    pub fn new(session: S, initial_credits: u32) -> Self {
        Self {
            session,
            credits: initial_credits,
            present_pending: false,
            acquire_fences: Vec::new(),
            release_fences: Vec::new(),
            next_release_fences: Vec::new(),
            presents_issued: 0,
            presents_handled: 0,
        }
    }

    /// Queues a command.
    pub fn enqueue(&mut self, command: SessionCommand) {
        self.session.enqueue(command);
    }

    /// Presents the queued commands, or withholds the present if no credits
    /// remain.
    ///
    /// `acquire` are the fences of this frame's surfaces; `release` are the
    /// fences those same surfaces will be released through, one present later.
    pub fn present(&mut self, acquire: Vec<Fence>, release: Vec<Fence>) -> PresentOutcome {
        self.acquire_fences.extend(acquire);
        self.next_release_fences.extend(release);
        if self.credits == 0 {
            self.present_pending = true;
            return PresentOutcome::Withheld;
        }
        self.issue();
        PresentOutcome::Presented
    }

    /// Adds returned credits. Returns `true` if a withheld present was issued.
    pub fn on_next_frame_begin(&mut self, additional_credits: u32) -> bool {
        self.credits = self.credits.saturating_add(additional_credits);
        if self.present_pending && self.credits > 0 {
            self.issue();
            return true;
        }
        false
    }

    /// Records acknowledged presents.
    pub fn on_frame_presented(&mut self, presents_handled: u32) {
        self.presents_handled =
            (self.presents_handled + u64::from(presents_handled)).min(self.presents_issued);
    }

    /// Credits currently available.
    #[must_use]
    pub fn credits(&self) -> u32 {
        self.credits
    }

    /// Whether a withheld present is waiting for credits.
    #[must_use]
    pub fn is_present_pending(&self) -> bool {
        self.present_pending
    }

    /// Presents issued so far.
    #[must_use]
    pub fn presents_issued(&self) -> u64 {
        self.presents_issued
    }

    /// Presents issued but not yet acknowledged.
    #[must_use]
    pub fn presents_in_flight(&self) -> u64 {
        self.presents_issued - self.presents_handled
    }

    /// The wrapped session.
    #[must_use]
    pub fn session(&self) -> &S {
        &self.session
    }

    /// The wrapped session, mutably.
    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    fn issue(&mut self) {
        self.credits -= 1;
        self.present_pending = false;
        let args = PresentArgs {
            acquire_fences: mem::take(&mut self.acquire_fences),
            release_fences: mem::replace(
                &mut self.release_fences,
                mem::take(&mut self.next_release_fences),
            ),
        };
        self.presents_issued += 1;
        self.session.present(args);
    }
}
