// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as little-endian records. Each record starts with a tag byte
//! and the nanoseconds elapsed since the recorder was created, since core
//! events carry no timestamps of their own. [`decode`] reads them back as an
//! iterator of [`Record`].
//!
//! Rich events ([`on_hit_regions`](TraceSink::on_hit_regions)) store only the
//! layer count and the region total.

use std::time::Instant;

use stratum_core::layer::{EmbedderLayerId, ViewId};
use stratum_core::trace::{
    CreditsEvent, FrameBeginEvent, FramePresentedEvent, HitRegionCount, PhaseBeginEvent,
    PhaseEndEvent, PhaseKind, PresentEvent, SurfaceEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_FRAME_BEGIN: u8 = 1;
const TAG_PHASE_BEGIN: u8 = 2;
const TAG_PHASE_END: u8 = 3;
const TAG_SURFACE_ALLOCATED: u8 = 4;
const TAG_SURFACE_FAILED: u8 = 5;
const TAG_PRESENT_ISSUED: u8 = 6;
const TAG_PRESENT_WITHHELD: u8 = 7;
const TAG_CREDITS_GRANTED: u8 = 8;
const TAG_FRAME_PRESENTED: u8 = 9;
const TAG_HIT_REGIONS: u8 = 10;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug)]
pub struct RecorderSink {
    buf: Vec<u8>,
    start: Instant,
}

impl Default for RecorderSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecorderSink {
    /// Creates an empty recorder; timestamps count from now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            start: Instant::now(),
        }
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn begin_record(&mut self, tag: u8) {
        let nanos = u64::try_from(self.start.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.write_u8(tag);
        self.write_u64(nanos);
    }

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    fn write_layer(&mut self, layer: EmbedderLayerId) {
        match layer.view() {
            Some(view) => {
                self.write_u8(1);
                self.write_u64(view.0);
            }
            None => {
                self.write_u8(0);
                self.write_u64(0);
            }
        }
    }

    fn write_phase(&mut self, p: PhaseKind) {
        let index = PhaseKind::ALL.iter().position(|&k| k == p).unwrap_or(0);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "there are six phases"
        )]
        self.write_u8(index as u8);
    }

    fn write_surface(&mut self, tag: u8, e: &SurfaceEvent) {
        self.begin_record(tag);
        self.write_u64(e.frame_index);
        self.write_layer(e.layer);
        self.write_f64(e.width);
        self.write_f64(e.height);
    }

    fn write_present(&mut self, tag: u8, e: &PresentEvent) {
        self.begin_record(tag);
        self.write_u64(e.frame_index);
        self.write_u32(e.acquire_fences);
        self.write_u32(e.credits_remaining);
    }
}

impl TraceSink for RecorderSink {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        self.begin_record(TAG_FRAME_BEGIN);
        self.write_u64(e.frame_index);
        self.write_f64(e.width);
        self.write_f64(e.height);
        self.write_f64(e.device_pixel_ratio);
        self.write_u32(e.layer_count);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.begin_record(TAG_PHASE_BEGIN);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.begin_record(TAG_PHASE_END);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
    }

    fn on_surface_allocated(&mut self, e: &SurfaceEvent) {
        self.write_surface(TAG_SURFACE_ALLOCATED, e);
    }

    fn on_surface_failed(&mut self, e: &SurfaceEvent) {
        self.write_surface(TAG_SURFACE_FAILED, e);
    }

    fn on_present_issued(&mut self, e: &PresentEvent) {
        self.write_present(TAG_PRESENT_ISSUED, e);
    }

    fn on_present_withheld(&mut self, e: &PresentEvent) {
        self.write_present(TAG_PRESENT_WITHHELD, e);
    }

    fn on_credits_granted(&mut self, e: &CreditsEvent) {
        self.begin_record(TAG_CREDITS_GRANTED);
        self.write_u32(e.granted);
        self.write_u32(e.available);
        self.write_u8(u8::from(e.flushed_pending));
    }

    fn on_frame_presented(&mut self, e: &FramePresentedEvent) {
        self.begin_record(TAG_FRAME_PRESENTED);
        self.write_u32(e.presents_handled);
        self.write_u64(e.in_flight);
    }

    fn on_hit_regions(&mut self, frame_index: u64, counts: &[HitRegionCount]) {
        self.begin_record(TAG_HIT_REGIONS);
        self.write_u64(frame_index);
        self.write_u32(u32::try_from(counts.len()).unwrap_or(u32::MAX));
        self.write_u32(counts.iter().map(|c| c.regions).sum());
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedEvent {
    /// A [`FrameBeginEvent`].
    FrameBegin(FrameBeginEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A surface was produced.
    SurfaceAllocated(SurfaceEvent),
    /// A surface could not be produced.
    SurfaceFailed(SurfaceEvent),
    /// A present went out.
    PresentIssued(PresentEvent),
    /// A present was withheld.
    PresentWithheld(PresentEvent),
    /// A [`CreditsEvent`].
    CreditsGranted(CreditsEvent),
    /// A [`FramePresentedEvent`].
    FramePresented(FramePresentedEvent),
    /// Hit-region totals for a frame.
    HitRegions {
        /// Frame counter.
        frame_index: u64,
        /// Layers that set hit regions.
        layers: u32,
        /// Regions across those layers.
        regions: u32,
    },
}

/// One decoded record.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    /// Nanoseconds since the recorder was created.
    pub at_nanos: u64,
    /// The event.
    pub event: RecordedEvent,
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`Record`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded records.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?.try_into().ok()?;
        self.pos += N;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_f64(&mut self) -> Option<f64> {
        self.read_u64().map(f64::from_bits)
    }

    fn read_layer(&mut self) -> Option<EmbedderLayerId> {
        let embedded = self.read_u8()?;
        let view = self.read_u64()?;
        Some(if embedded != 0 {
            EmbedderLayerId::embedded(ViewId(view))
        } else {
            EmbedderLayerId::ROOT
        })
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        PhaseKind::ALL.get(usize::from(self.read_u8()?)).copied()
    }

    fn read_surface(&mut self) -> Option<SurfaceEvent> {
        Some(SurfaceEvent {
            frame_index: self.read_u64()?,
            layer: self.read_layer()?,
            width: self.read_f64()?,
            height: self.read_f64()?,
        })
    }

    fn read_present(&mut self) -> Option<PresentEvent> {
        Some(PresentEvent {
            frame_index: self.read_u64()?,
            acquire_fences: self.read_u32()?,
            credits_remaining: self.read_u32()?,
        })
    }

    fn decode_event(&mut self, tag: u8) -> Option<RecordedEvent> {
        Some(match tag {
            TAG_FRAME_BEGIN => RecordedEvent::FrameBegin(FrameBeginEvent {
                frame_index: self.read_u64()?,
                width: self.read_f64()?,
                height: self.read_f64()?,
                device_pixel_ratio: self.read_f64()?,
                layer_count: self.read_u32()?,
            }),
            TAG_PHASE_BEGIN => RecordedEvent::PhaseBegin(PhaseBeginEvent {
                frame_index: self.read_u64()?,
                phase: self.read_phase()?,
            }),
            TAG_PHASE_END => RecordedEvent::PhaseEnd(PhaseEndEvent {
                frame_index: self.read_u64()?,
                phase: self.read_phase()?,
            }),
            TAG_SURFACE_ALLOCATED => RecordedEvent::SurfaceAllocated(self.read_surface()?),
            TAG_SURFACE_FAILED => RecordedEvent::SurfaceFailed(self.read_surface()?),
            TAG_PRESENT_ISSUED => RecordedEvent::PresentIssued(self.read_present()?),
            TAG_PRESENT_WITHHELD => RecordedEvent::PresentWithheld(self.read_present()?),
            TAG_CREDITS_GRANTED => RecordedEvent::CreditsGranted(CreditsEvent {
                granted: self.read_u32()?,
                available: self.read_u32()?,
                flushed_pending: self.read_u8()? != 0,
            }),
            TAG_FRAME_PRESENTED => RecordedEvent::FramePresented(FramePresentedEvent {
                presents_handled: self.read_u32()?,
                in_flight: self.read_u64()?,
            }),
            TAG_HIT_REGIONS => RecordedEvent::HitRegions {
                frame_index: self.read_u64()?,
                layers: self.read_u32()?,
                regions: self.read_u32()?,
            },
            _ => return None, // unknown tag → stop iteration
        })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        let at_nanos = self.read_u64()?;
        let event = self.decode_event(tag)?;
        Some(Record { at_nanos, event })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
