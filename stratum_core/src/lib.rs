// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame composition for pipelines that embed platform views.
//!
//! `stratum_core` splits each frame a rendering pipeline paints into a stack
//! of layers interleaved with externally owned platform views (video,
//! browser views, other processes' surfaces), and turns that stack into
//! incremental compositor scene updates. It is `no_std` compatible (with
//! `alloc`).
//!
//! # Architecture
//!
//! ```text
//!   pipeline paints ──► EmbedderLayer canvases (CanvasSpy<PictureRecorder>)
//!                                   │
//!                                   ▼ submit_frame
//!          Picture + RTree ──► hit regions
//!                                   │
//!   ViewHolderStore::evaluate() ──► SessionCommands ──► SessionConnection
//!                                   │                       (credits, fences)
//!                                   ▼
//!          Surfaces rasterized, recycled, platform frame submitted
//! ```
//!
//! **[`embedder`]**: The [`ExternalViewEmbedder`](embedder::ExternalViewEmbedder)
//! and its frame cycle.
//!
//! **[`layer`]**: Per-frame layers: a recording canvas that remembers
//! whether anything visible was drawn.
//!
//! **[`canvas`]**: The [`Canvas`](canvas::Canvas) command surface, picture
//! recording, and draw detection.
//!
//! **[`rtree`]**: Bulk-loaded R-tree over recorded draws that yields
//! disjoint rectangles for hit testing.
//!
//! **[`view`]**: Persistent view holders with change tracking via
//! [`dirty`] channels.
//!
//! **[`mutator`]**: Mutator stacks and their folded form.
//!
//! **[`backend`]**, **[`session`]**, **[`surface`]**: The collaborator
//! contract platform integrations implement.
//!
//! **[`config`]**: [`EmbedderConfig`](config::EmbedderConfig) presets.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! submit instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-layer
//!   hit-region count events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod backend;
pub mod canvas;
pub mod config;
pub mod dirty;
pub mod embedder;
pub mod layer;
pub mod mutator;
pub mod rtree;
pub mod session;
pub mod surface;
pub mod trace;
pub mod view;
