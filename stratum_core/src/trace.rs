// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for frame submission.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! embedder calls at each stage of submission and session-event handling. All
//! method bodies default to no-ops, so implementing only the events you care
//! about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! Events carry no timestamps: `stratum_core` has no clock. Sinks that need
//! timing stamp events on arrival.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): gates [`HitRegionCount`] events plus
//!   the corresponding `TraceSink` method.

use crate::layer::EmbedderLayerId;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which step of `submit_frame` is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Producing surfaces for layers that drew.
    Allocate,
    /// Finalizing recordings into pictures.
    Finalize,
    /// Emitting scene commands in composition order.
    Scene,
    /// Presenting the session.
    Present,
    /// Replaying pictures onto surfaces.
    Rasterize,
    /// Returning surfaces to the producer.
    Recycle,
}

impl PhaseKind {
    /// All phases in execution order.
    pub const ALL: [Self; 6] = [
        Self::Allocate,
        Self::Finalize,
        Self::Scene,
        Self::Present,
        Self::Rasterize,
        Self::Recycle,
    ];

    /// Short lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Allocate => "allocate",
            Self::Finalize => "finalize",
            Self::Scene => "scene",
            Self::Present => "present",
            Self::Rasterize => "rasterize",
            Self::Recycle => "recycle",
        }
    }
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when `submit_frame` starts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameBeginEvent {
    /// Monotonic frame counter.
    pub frame_index: u64,
    /// Frame width in pixels.
    pub width: f64,
    /// Frame height in pixels.
    pub height: f64,
    /// Device pixel ratio.
    pub device_pixel_ratio: f64,
    /// Number of layers in composition order.
    pub layer_count: u32,
}

/// Marks the beginning of a submit phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseBeginEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
}

/// Marks the end of a submit phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseEndEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
}

/// Emitted for each surface request, successful or not.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// The layer the surface is for.
    pub layer: EmbedderLayerId,
    /// Requested width in pixels.
    pub width: f64,
    /// Requested height in pixels.
    pub height: f64,
}

/// Emitted when a present is issued or withheld.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresentEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Acquire fences contributed by this frame.
    pub acquire_fences: u32,
    /// Credits remaining after the present.
    pub credits_remaining: u32,
}

/// Emitted when the compositor returns present credits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CreditsEvent {
    /// Credits returned by this event.
    pub granted: u32,
    /// Credits available afterwards.
    pub available: u32,
    /// Whether a withheld present went out as a result.
    pub flushed_pending: bool,
}

/// Emitted when the compositor acknowledges presents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FramePresentedEvent {
    /// Presents acknowledged by this event.
    pub presents_handled: u32,
    /// Presents still unacknowledged afterwards.
    pub in_flight: u64,
}

/// Number of hit regions emitted for one layer.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HitRegionCount {
    /// The layer.
    pub layer: EmbedderLayerId,
    /// Regions emitted.
    pub regions: u32,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the embedder.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when `submit_frame` starts.
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        _ = e;
    }

    /// Called at the beginning of a submit phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a submit phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called when a layer's surface was produced.
    fn on_surface_allocated(&mut self, e: &SurfaceEvent) {
        _ = e;
    }

    /// Called when the producer could not supply a surface.
    fn on_surface_failed(&mut self, e: &SurfaceEvent) {
        _ = e;
    }

    /// Called when a present goes out.
    fn on_present_issued(&mut self, e: &PresentEvent) {
        _ = e;
    }

    /// Called when a present is withheld for lack of credits.
    fn on_present_withheld(&mut self, e: &PresentEvent) {
        _ = e;
    }

    /// Called when credits return.
    fn on_credits_granted(&mut self, e: &CreditsEvent) {
        _ = e;
    }

    /// Called when presents are acknowledged.
    fn on_frame_presented(&mut self, e: &FramePresentedEvent) {
        _ = e;
    }

    /// Called with per-layer hit-region counts (requires `trace-rich`
    /// feature).
    #[cfg(feature = "trace-rich")]
    fn on_hit_regions(&mut self, frame_index: u64, counts: &[HitRegionCount]) {
        _ = (frame_index, counts);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

/// Generates a `Tracer` method that forwards one event to the sink.
macro_rules! forward {
    ($(#[$doc:meta])* $name:ident => $sink_method:ident($event:ty)) => {
        $(#[$doc])*
        #[inline]
        pub fn $name(&mut self, e: &$event) {
            #[cfg(feature = "trace")]
            if let Some(s) = &mut self.sink {
                s.$sink_method(e);
            }
            #[cfg(not(feature = "trace"))]
            {
                _ = e;
            }
        }
    };
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    forward!(
        /// Emits a [`FrameBeginEvent`].
        frame_begin => on_frame_begin(FrameBeginEvent)
    );
    forward!(
        /// Emits a [`PhaseBeginEvent`].
        phase_begin => on_phase_begin(PhaseBeginEvent)
    );
    forward!(
        /// Emits a [`PhaseEndEvent`].
        phase_end => on_phase_end(PhaseEndEvent)
    );
    forward!(
        /// Emits a surface-allocated [`SurfaceEvent`].
        surface_allocated => on_surface_allocated(SurfaceEvent)
    );
    forward!(
        /// Emits a surface-failed [`SurfaceEvent`].
        surface_failed => on_surface_failed(SurfaceEvent)
    );
    forward!(
        /// Emits a present-issued [`PresentEvent`].
        present_issued => on_present_issued(PresentEvent)
    );
    forward!(
        /// Emits a present-withheld [`PresentEvent`].
        present_withheld => on_present_withheld(PresentEvent)
    );
    forward!(
        /// Emits a [`CreditsEvent`].
        credits_granted => on_credits_granted(CreditsEvent)
    );
    forward!(
        /// Emits a [`FramePresentedEvent`].
        frame_presented => on_frame_presented(FramePresentedEvent)
    );

    /// Emits hit-region counts (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn hit_regions(&mut self, frame_index: u64, counts: &[HitRegionCount]) {
        if let Some(s) = &mut self.sink {
            s.on_hit_regions(frame_index, counts);
        }
    }

    /// Brackets `f` with begin and end events for `phase`.
    #[inline]
    pub fn phase<R>(&mut self, frame_index: u64, phase: PhaseKind, f: impl FnOnce(&mut Self) -> R) -> R {
        self.phase_begin(&PhaseBeginEvent { frame_index, phase });
        let result = f(self);
        self.phase_end(&PhaseEndEvent { frame_index, phase });
        result
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
