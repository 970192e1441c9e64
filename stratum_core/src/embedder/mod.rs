// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The external-view embedder: per-frame layer bookkeeping and scene
//! submission.
//!
//! An [`ExternalViewEmbedder`] sits between a rendering pipeline that paints
//! into canvases and a compositor that hosts platform views. Per frame:
//!
//! ```text
//!   begin_frame ──► root layer
//!        │
//!        ├─► preroll_composite_embedded_view(v) ──► overlay layer for v
//!        │        (root_canvas / composite_embedded_view record draws)
//!        ▼
//!   submit_frame
//!        1. Allocate   surfaces for layers that drew
//!        2. Finalize   recordings into pictures
//!        3. Scene      commands in composition order
//!        4. Present    via the credit-limited connection
//!        5. Rasterize  pictures onto surfaces
//!        6. Recycle    surfaces back to the producer
//!        7. frame.submit()
//! ```
//!
//! Composition order is paint order is depth order: the root first, then each
//! prerolled view followed by the overlay painted above it. Every entry gets a
//! strictly larger elevation than the one before it.
//!
//! # State
//!
//! Frame-scoped state (layers, composition order, frame size) is cleared by
//! `begin_frame` and [`cancel_frame`](ExternalViewEmbedder::cancel_frame).
//! Compositor resources persist: the root transform, a grow-only pool of
//! layer nodes reused by image position, the view-holder store, and the
//! optional input interceptor. Reset unbinds and detaches them; it never
//! releases them.

mod submit;
#[cfg(test)]
mod tests;

pub use submit::SubmitReport;

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use hashbrown::HashMap;
use kurbo::{Rect, Size};

use crate::backend::{Session, SurfaceProducer};
use crate::canvas::Canvas;
use crate::config::EmbedderConfig;
use crate::layer::{EmbedderLayer, EmbedderLayerId, ViewId};
use crate::mutator::EmbeddedViewParams;
use crate::session::{
    ContentId, SessionCommand, SessionConnection, SessionError, SessionEvent, TransformId,
    ViewportProperties,
};
use crate::trace::{CreditsEvent, FramePresentedEvent, Tracer};
use crate::view::{ViewCreateArgs, ViewHolderId, ViewHolderStore};

/// Where the embedder is in its frame cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FrameState {
    /// Between frames.
    #[default]
    Idle,
    /// Between `begin_frame` and `submit_frame`; layers accept draws.
    Accumulating,
    /// Inside `submit_frame`; layers are read-only.
    Submitting,
}

/// Hands out compositor node ids.
#[derive(Debug, Default)]
struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    fn transform(&mut self) -> TransformId {
        self.next += 1;
        TransformId(self.next)
    }

    fn content(&mut self) -> ContentId {
        self.next += 1;
        ContentId(self.next)
    }
}

/// Composes a frame of layers and platform views into a compositor scene.
///
/// Generic over the compositor [`Session`] and the [`SurfaceProducer`]. One
/// instance per on-screen scene, driven from a single raster thread.
pub struct ExternalViewEmbedder<S, P> {
    config: EmbedderConfig,
    connection: SessionConnection<S>,
    producer: P,
    ids: IdAllocator,

    // -- Persistent compositor resources --
    root_transform: TransformId,
    root_scale: Option<f64>,
    /// Children of the root, in attach order.
    attached: Vec<TransformId>,
    /// Grow-only pool of image layer nodes, indexed by image position.
    layer_nodes: Vec<TransformId>,
    /// How many pool nodes have content bound since the last reset.
    bound_layer_nodes: usize,
    views: ViewHolderStore,
    interceptor: Option<TransformId>,
    /// Images whose surfaces were retired by the producer, awaiting release.
    released_images: Rc<RefCell<Vec<ContentId>>>,

    // -- Frame-scoped state --
    state: FrameState,
    layers: HashMap<EmbedderLayerId, EmbedderLayer>,
    composition_order: Vec<EmbedderLayerId>,
    frame_size: Size,
    frame_dpr: f64,
    frame_index: u64,
}

impl<S, P> fmt::Debug for ExternalViewEmbedder<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalViewEmbedder")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("composition_order", &self.composition_order)
            .field("frame_size", &self.frame_size)
            .field("frame_index", &self.frame_index)
            .field("layer_nodes", &self.layer_nodes.len())
            .field("views", &self.views.len())
            .finish_non_exhaustive()
    }
}

impl<S: Session, P: SurfaceProducer> ExternalViewEmbedder<S, P> {
    /// Creates an embedder and roots its scene in a fresh transform.
    #[must_use]
    pub fn new(session: S, producer: P, config: EmbedderConfig) -> Self {
        let mut ids = IdAllocator::default();
        let mut connection = SessionConnection::new(session, config.initial_present_credits);
        let root_transform = ids.transform();
        connection.enqueue(SessionCommand::CreateTransform(root_transform));
        connection.enqueue(SessionCommand::SetRootTransform(root_transform));
        Self {
            config,
            connection,
            producer,
            ids,
            root_transform,
            root_scale: None,
            attached: Vec::new(),
            layer_nodes: Vec::new(),
            bound_layer_nodes: 0,
            views: ViewHolderStore::new(),
            interceptor: None,
            released_images: Rc::default(),
            state: FrameState::Idle,
            layers: HashMap::new(),
            composition_order: Vec::new(),
            frame_size: Size::ZERO,
            frame_dpr: 1.0,
            frame_index: 0,
        }
    }

    // -- Frame API --

    /// Starts a frame of `size` pixels at `device_pixel_ratio`.
    ///
    /// Any frame still accumulating is discarded first.
    ///
    /// # Panics
    ///
    /// Panics if `device_pixel_ratio` is not positive and finite.
    pub fn begin_frame(&mut self, size: Size, device_pixel_ratio: f64) {
        assert!(
            device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0,
            "device_pixel_ratio must be positive and finite, got {device_pixel_ratio}"
        );
        if self.state == FrameState::Accumulating {
            log::debug!("begin_frame while accumulating; discarding the unsubmitted frame");
        }
        self.reset();

        self.frame_size = size;
        self.frame_dpr = device_pixel_ratio;
        let root = EmbedderLayer::new(EmbedderLayerId::ROOT, None, size, self.config.hit_regions);
        self.layers.insert(EmbedderLayerId::ROOT, root);
        self.composition_order.push(EmbedderLayerId::ROOT);
        self.state = FrameState::Accumulating;
    }

    /// Adds the overlay layer for `view_id`, painted above the view.
    ///
    /// # Panics
    ///
    /// Panics if no frame is accumulating, if `view_id` was already
    /// prerolled this frame, or if the placement transform disagrees with
    /// the mutator stack.
    pub fn preroll_composite_embedded_view(&mut self, view_id: ViewId, params: EmbeddedViewParams) {
        self.assert_accumulating("preroll_composite_embedded_view");
        let id = EmbedderLayerId::embedded(view_id);
        assert!(
            !self.layers.contains_key(&id),
            "view {view_id:?} prerolled twice in one frame"
        );
        assert!(
            params.is_placement_consistent(),
            "placement transform of {view_id:?} disagrees with its mutator stack"
        );
        let layer = EmbedderLayer::new(id, Some(params), self.frame_size, self.config.hit_regions);
        self.layers.insert(id, layer);
        self.composition_order.push(id);
    }

    /// The overlay canvas for `view_id`.
    ///
    /// # Panics
    ///
    /// Panics if `view_id` was not prerolled this frame.
    pub fn composite_embedded_view(&mut self, view_id: ViewId) -> &mut dyn Canvas {
        self.assert_accumulating("composite_embedded_view");
        match self.layers.get_mut(&EmbedderLayerId::embedded(view_id)) {
            Some(layer) => layer.canvas(),
            None => panic!("composite_embedded_view({view_id:?}) without a preroll this frame"),
        }
    }

    /// The root layer's canvas, or `None` (with a warning) outside a frame.
    pub fn root_canvas(&mut self) -> Option<&mut dyn Canvas> {
        if self.state != FrameState::Accumulating {
            log::warn!("root_canvas requested before begin_frame");
            return None;
        }
        self.layers
            .get_mut(&EmbedderLayerId::ROOT)
            .map(EmbedderLayer::canvas)
    }

    /// Canvases of the overlay layers, in composition order.
    pub fn current_canvases(&mut self) -> Vec<&mut dyn Canvas> {
        if self.state != FrameState::Accumulating {
            return Vec::new();
        }
        let order = &self.composition_order;
        let mut overlays: Vec<(usize, &mut EmbedderLayer)> = self
            .layers
            .iter_mut()
            .filter(|(id, _)| !id.is_root())
            .map(|(id, layer)| {
                let position = order.iter().position(|o| o == id).unwrap_or(usize::MAX);
                (position, layer)
            })
            .collect();
        overlays.sort_by_key(|(position, _)| *position);
        overlays
            .into_iter()
            .map(|(_, layer)| layer.canvas())
            .collect()
    }

    /// Synchronization hook for pipelines that need one. Recordings are
    /// finalized lazily by [`submit_frame`](Self::submit_frame).
    pub fn end_frame(&mut self) {}

    /// Discards the current frame without submitting it. Safe in any state.
    pub fn cancel_frame(&mut self) {
        self.reset();
    }

    // -- Platform-view lifecycle --

    /// Registers a persistent holder for `view_id`.
    ///
    /// The holder's nodes are created immediately; it joins the scene the
    /// first frame the view is prerolled.
    ///
    /// # Panics
    ///
    /// Panics if `view_id` already has a holder.
    pub fn create_view(&mut self, view_id: ViewId, args: ViewCreateArgs) -> ViewHolderId {
        assert!(
            self.views.get(view_id).is_none(),
            "view {view_id:?} created twice"
        );
        let transform = self.ids.transform();
        let viewport = self.ids.content();
        self.connection
            .enqueue(SessionCommand::CreateTransform(transform));
        self.connection.enqueue(SessionCommand::CreateViewport {
            viewport,
            view: view_id,
            properties: ViewportProperties {
                logical_size: Size::ZERO,
                occlusion_hint: args.occlusion_hint,
                focusable: args.focusable,
            },
        });
        self.connection.enqueue(SessionCommand::SetContent {
            transform,
            content: Some(viewport),
        });
        self.views.insert(view_id, transform, viewport, args)
    }

    /// Releases the holder of `view_id`. Returns whether one existed.
    pub fn destroy_view(&mut self, view_id: ViewId) -> bool {
        let Some(released) = self.views.remove(view_id) else {
            return false;
        };
        if let Some(position) = self.attached.iter().position(|&t| t == released.transform) {
            self.attached.remove(position);
            self.connection.enqueue(SessionCommand::RemoveChild {
                parent: self.root_transform,
                child: released.transform,
            });
        }
        self.connection
            .enqueue(SessionCommand::ReleaseViewport(released.viewport));
        self.connection
            .enqueue(SessionCommand::ReleaseTransform(released.transform));
        true
    }

    /// Updates the view's occlusion hint, hit-testability, and focusability.
    ///
    /// Changes are pushed at the next submit; unchanged values push nothing.
    ///
    /// # Panics
    ///
    /// Panics if `view_id` has no holder.
    pub fn set_view_properties(
        &mut self,
        view_id: ViewId,
        occlusion_hint: Rect,
        hit_testable: bool,
        focusable: bool,
    ) {
        let Some(holder) = self.views.get(view_id) else {
            panic!("set_view_properties for unknown view {view_id:?}");
        };
        self.views.set_occlusion_hint(holder, occlusion_hint);
        self.views.set_hit_testable(holder, hit_testable);
        self.views.set_focusable(holder, focusable);
    }

    // -- Session events --

    /// Feeds a compositor event to the present connection.
    ///
    /// Must be called on the raster thread.
    ///
    /// # Errors
    ///
    /// Returns the session's error; the session is unusable afterwards and
    /// recovering it is the shell's responsibility.
    pub fn handle_session_event(&mut self, event: SessionEvent) -> Result<(), SessionError> {
        self.handle_session_event_traced(event, &mut Tracer::none())
    }

    /// Like [`handle_session_event`](Self::handle_session_event), reporting
    /// to `tracer`.
    ///
    /// # Errors
    ///
    /// Returns the session's error.
    pub fn handle_session_event_traced(
        &mut self,
        event: SessionEvent,
        tracer: &mut Tracer<'_>,
    ) -> Result<(), SessionError> {
        match event {
            SessionEvent::NextFrameBegin {
                additional_present_credits,
            } => {
                let flushed_pending = self
                    .connection
                    .on_next_frame_begin(additional_present_credits);
                if flushed_pending {
                    log::debug!("issued withheld present after credits returned");
                }
                tracer.credits_granted(&CreditsEvent {
                    granted: additional_present_credits,
                    available: self.connection.credits(),
                    flushed_pending,
                });
                Ok(())
            }
            SessionEvent::FramePresented { presents_handled } => {
                self.connection.on_frame_presented(presents_handled);
                tracer.frame_presented(&FramePresentedEvent {
                    presents_handled,
                    in_flight: self.connection.presents_in_flight(),
                });
                Ok(())
            }
            SessionEvent::Error(err) => {
                log::error!("compositor session error: {err}");
                Err(err)
            }
        }
    }

    // -- Accessors --

    /// Layer ids in composition order.
    #[must_use]
    pub fn composition_order(&self) -> &[EmbedderLayerId] {
        &self.composition_order
    }

    /// Size passed to the current `begin_frame`, or zero between frames.
    #[must_use]
    pub fn frame_size(&self) -> Size {
        self.frame_size
    }

    /// Current frame state.
    #[must_use]
    pub fn frame_state(&self) -> FrameState {
        self.state
    }

    /// Number of live view holders.
    #[must_use]
    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    /// Size of the persistent layer-node pool.
    #[must_use]
    pub fn layer_node_count(&self) -> usize {
        self.layer_nodes.len()
    }

    /// Frames submitted so far.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Present connection state.
    #[must_use]
    pub fn connection(&self) -> &SessionConnection<S> {
        &self.connection
    }

    /// The compositor session.
    #[must_use]
    pub fn session(&self) -> &S {
        self.connection.session()
    }

    /// The compositor session, mutably.
    pub fn session_mut(&mut self) -> &mut S {
        self.connection.session_mut()
    }

    /// The surface producer.
    #[must_use]
    pub fn producer(&self) -> &P {
        &self.producer
    }

    /// The surface producer, mutably.
    pub fn producer_mut(&mut self) -> &mut P {
        &mut self.producer
    }

    // -- Internal helpers --

    fn assert_accumulating(&self, operation: &str) {
        assert!(
            self.state == FrameState::Accumulating,
            "{operation} called while {:?}; call begin_frame first",
            self.state
        );
    }

    /// Clears frame-scoped state, unbinds pooled layer nodes, and detaches
    /// everything from the root. Persistent nodes are kept.
    fn reset(&mut self) {
        self.layers.clear();
        self.composition_order.clear();
        self.frame_size = Size::ZERO;
        self.frame_dpr = 1.0;

        for &node in &self.layer_nodes[..self.bound_layer_nodes] {
            self.connection.enqueue(SessionCommand::SetContent {
                transform: node,
                content: None,
            });
        }
        self.bound_layer_nodes = 0;
        self.detach_all();

        self.state = FrameState::Idle;
    }

    fn attach(&mut self, child: TransformId) {
        self.connection.enqueue(SessionCommand::AddChild {
            parent: self.root_transform,
            child,
        });
        self.attached.push(child);
    }

    fn detach_all(&mut self) {
        for child in self.attached.drain(..) {
            self.connection.enqueue(SessionCommand::RemoveChild {
                parent: self.root_transform,
                child,
            });
        }
    }
}
