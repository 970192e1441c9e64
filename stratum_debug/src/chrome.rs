// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::pretty::layer_label;
use crate::recorder::{Record, RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Submit phases become duration slices; everything else is an instant
/// event. Timestamps are the recorder's, in microseconds.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let events: Vec<Value> = decode(bytes).map(to_json).collect();
    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn to_json(record: Record) -> Value {
    let ts = nanos_to_us(record.at_nanos);
    match record.event {
        RecordedEvent::FrameBegin(e) => instant(
            "FrameBegin",
            "Frame",
            ts,
            json!({
                "frame_index": e.frame_index,
                "width": e.width,
                "height": e.height,
                "device_pixel_ratio": e.device_pixel_ratio,
                "layer_count": e.layer_count,
            }),
        ),
        RecordedEvent::PhaseBegin(e) => json!({
            "ph": "B",
            "name": e.phase.name(),
            "cat": "Submit",
            "ts": ts,
            "pid": 0,
            "tid": 0,
            "args": {
                "frame_index": e.frame_index,
            }
        }),
        RecordedEvent::PhaseEnd(e) => json!({
            "ph": "E",
            "name": e.phase.name(),
            "cat": "Submit",
            "ts": ts,
            "pid": 0,
            "tid": 0,
            "args": {
                "frame_index": e.frame_index,
            }
        }),
        RecordedEvent::SurfaceAllocated(e) | RecordedEvent::SurfaceFailed(e) => {
            let failed = matches!(record.event, RecordedEvent::SurfaceFailed(_));
            instant(
                if failed { "SurfaceFailed" } else { "Surface" },
                "Surface",
                ts,
                json!({
                    "frame_index": e.frame_index,
                    "layer": layer_label(e.layer),
                    "width": e.width,
                    "height": e.height,
                }),
            )
        }
        RecordedEvent::PresentIssued(e) | RecordedEvent::PresentWithheld(e) => {
            let withheld = matches!(record.event, RecordedEvent::PresentWithheld(_));
            instant(
                if withheld { "PresentWithheld" } else { "Present" },
                "Session",
                ts,
                json!({
                    "frame_index": e.frame_index,
                    "acquire_fences": e.acquire_fences,
                    "credits_remaining": e.credits_remaining,
                }),
            )
        }
        RecordedEvent::CreditsGranted(e) => instant(
            "CreditsGranted",
            "Session",
            ts,
            json!({
                "granted": e.granted,
                "available": e.available,
                "flushed_pending": e.flushed_pending,
            }),
        ),
        RecordedEvent::FramePresented(e) => instant(
            "FramePresented",
            "Session",
            ts,
            json!({
                "presents_handled": e.presents_handled,
                "in_flight": e.in_flight,
            }),
        ),
        RecordedEvent::HitRegions {
            frame_index,
            layers,
            regions,
        } => instant(
            "HitRegions",
            "Rich",
            ts,
            json!({
                "frame_index": frame_index,
                "layers": layers,
                "regions": regions,
            }),
        ),
    }
}

/// A thread-scoped instant event.
fn instant(name: &str, cat: &str, ts: f64, args: Value) -> Value {
    json!({
        "ph": "i",
        "name": name,
        "cat": cat,
        "ts": ts,
        "pid": 0,
        "tid": 0,
        "s": "t",
        "args": args,
    })
}

fn nanos_to_us(nanos: u64) -> f64 {
    nanos as f64 / 1000.0
}
