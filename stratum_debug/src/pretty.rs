// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use stratum_core::layer::EmbedderLayerId;
use stratum_core::trace::{
    CreditsEvent, FrameBeginEvent, FramePresentedEvent, HitRegionCount, PhaseBeginEvent,
    PhaseEndEvent, PresentEvent, SurfaceEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// `root` or `view=N`.
pub(crate) fn layer_label(layer: EmbedderLayerId) -> String {
    match layer.view() {
        None => "root".to_owned(),
        Some(view) => format!("view={}", view.0),
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[frame] frame={} size={}x{} dpr={} layers={}",
            e.frame_index, e.width, e.height, e.device_pixel_ratio, e.layer_count,
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {}",
            e.frame_index,
            e.phase.name(),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {}",
            e.frame_index,
            e.phase.name(),
        );
    }

    fn on_surface_allocated(&mut self, e: &SurfaceEvent) {
        let _ = writeln!(
            self.writer,
            "[surface] frame={} {} {}x{}",
            e.frame_index,
            layer_label(e.layer),
            e.width,
            e.height,
        );
    }

    fn on_surface_failed(&mut self, e: &SurfaceEvent) {
        let _ = writeln!(
            self.writer,
            "[surface:FAILED] frame={} {} {}x{}",
            e.frame_index,
            layer_label(e.layer),
            e.width,
            e.height,
        );
    }

    fn on_present_issued(&mut self, e: &PresentEvent) {
        let _ = writeln!(
            self.writer,
            "[present] frame={} fences={} credits={}",
            e.frame_index, e.acquire_fences, e.credits_remaining,
        );
    }

    fn on_present_withheld(&mut self, e: &PresentEvent) {
        let _ = writeln!(
            self.writer,
            "[present:withheld] frame={} fences={}",
            e.frame_index, e.acquire_fences,
        );
    }

    fn on_credits_granted(&mut self, e: &CreditsEvent) {
        let flushed = if e.flushed_pending { " flushed" } else { "" };
        let _ = writeln!(
            self.writer,
            "[credits] +{} available={}{flushed}",
            e.granted, e.available,
        );
    }

    fn on_frame_presented(&mut self, e: &FramePresentedEvent) {
        let _ = writeln!(
            self.writer,
            "[presented] handled={} in_flight={}",
            e.presents_handled, e.in_flight,
        );
    }

    fn on_hit_regions(&mut self, frame_index: u64, counts: &[HitRegionCount]) {
        let total: u32 = counts.iter().map(|c| c.regions).sum();
        let _ = writeln!(
            self.writer,
            "[hit] frame={frame_index} layers={} regions={total}",
            counts.len(),
        );
    }
}
