// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recorded op lists and the recorder that produces them.

use alloc::string::ToString;
use alloc::sync::Arc;
use alloc::vec::Vec;

use kurbo::{Affine, BezPath, Point, Rect, RoundedRect, Shape};

use super::{Canvas, Color, DrawOp, ImageId, Paint, TextRun, Vertices, points_bounds};
use crate::rtree::{DrawMetadata, RTree};

/// An immutable recording of canvas commands.
///
/// Cloning is cheap; the op list is shared.
#[derive(Clone, Debug, PartialEq)]
pub struct Picture {
    ops: Arc<[DrawOp]>,
    cull_rect: Rect,
}

impl Picture {
    /// The bounds the recording was made against.
    #[must_use]
    pub fn cull_rect(&self) -> Rect {
        self.cull_rect
    }

    /// Number of recorded ops.
    #[must_use]
    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    /// The recorded ops in paint order.
    #[must_use]
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Replays every op onto `canvas`.
    pub fn playback(&self, canvas: &mut dyn Canvas) {
        for op in self.ops.iter() {
            op.apply(canvas);
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct State {
    transform: Affine,
    /// Device-space clip bounds.
    clip: Rect,
}

/// A [`Canvas`] that records ops and their device-space bounds.
///
/// Each op's bounds are computed at record time from the current transform
/// and clip. Draw ops use their local geometry (outset by half the stroke
/// width). State ops use the current clip and are flagged as non-draws so
/// that they participate in spatial queries without becoming hit regions.
#[derive(Debug)]
pub struct PictureRecorder {
    cull_rect: Rect,
    build_rtree: bool,
    ops: Vec<DrawOp>,
    bounds: Vec<Rect>,
    metadata: Vec<DrawMetadata>,
    state: State,
    stack: Vec<State>,
}

impl PictureRecorder {
    /// Starts a recording against `bounds`.
    ///
    /// When `build_rtree` is set, [`finish`](Self::finish) also returns an
    /// [`RTree`] over the recorded ops.
    #[must_use]
    pub fn new(bounds: Rect, build_rtree: bool) -> Self {
        Self {
            cull_rect: bounds,
            build_rtree,
            ops: Vec::new(),
            bounds: Vec::new(),
            metadata: Vec::new(),
            state: State {
                transform: Affine::IDENTITY,
                clip: bounds,
            },
            stack: Vec::new(),
        }
    }

    /// Number of ops recorded so far.
    #[must_use]
    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    /// Device-space bounds of each recorded op, in record order.
    #[must_use]
    pub fn op_bounds(&self) -> &[Rect] {
        &self.bounds
    }

    /// Ends the recording.
    #[must_use]
    pub fn finish(self) -> (Picture, Option<RTree>) {
        let rtree = self.build_rtree.then(|| {
            let mut tree = RTree::new();
            tree.insert(&self.bounds, Some(&self.metadata));
            tree
        });
        let picture = Picture {
            ops: self.ops.into(),
            cull_rect: self.cull_rect,
        };
        (picture, rtree)
    }

    fn push_state_op(&mut self, op: DrawOp) {
        self.bounds.push(self.state.clip);
        self.metadata.push(DrawMetadata::STATE);
        self.ops.push(op);
    }

    /// Records a draw whose local bounds are `local`.
    fn push_draw(&mut self, op: DrawOp, local: Rect) {
        let device = self.state.transform.transform_rect_bbox(local.abs());
        self.push_device_draw(op, device);
    }

    fn push_device_draw(&mut self, op: DrawOp, device: Rect) {
        self.bounds.push(device.intersect(self.state.clip));
        self.metadata.push(DrawMetadata::DRAW);
        self.ops.push(op);
    }

    fn intersect_clip(&mut self, local: Rect) {
        let device = self.state.transform.transform_rect_bbox(local.abs());
        self.state.clip = self.state.clip.intersect(device);
    }
}

impl Canvas for PictureRecorder {
    fn save(&mut self) {
        self.stack.push(self.state);
        self.push_state_op(DrawOp::Save);
    }

    fn save_layer(&mut self, bounds: Option<Rect>, paint: Option<&Paint>) {
        self.stack.push(self.state);
        self.push_state_op(DrawOp::SaveLayer {
            bounds,
            paint: paint.copied(),
        });
    }

    fn restore(&mut self) {
        // Unbalanced restores are ignored, matching the usual canvas contract.
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
        self.push_state_op(DrawOp::Restore);
    }

    fn concat(&mut self, transform: Affine) {
        self.state.transform *= transform;
        self.push_state_op(DrawOp::Concat(transform));
    }

    fn clip_rect(&mut self, rect: Rect) {
        self.intersect_clip(rect);
        self.push_state_op(DrawOp::ClipRect(rect));
    }

    fn clip_rrect(&mut self, rrect: RoundedRect) {
        self.intersect_clip(rrect.rect());
        self.push_state_op(DrawOp::ClipRoundedRect(rrect));
    }

    fn clip_path(&mut self, path: &BezPath) {
        self.intersect_clip(path.bounding_box());
        self.push_state_op(DrawOp::ClipPath(path.clone()));
    }

    fn flush(&mut self) {
        self.push_state_op(DrawOp::Flush);
    }

    fn draw_paint(&mut self, paint: &Paint) {
        let clip = self.state.clip;
        self.push_device_draw(DrawOp::DrawPaint(*paint), clip);
    }

    fn clear(&mut self, color: Color) {
        if color.is_transparent() {
            // Erasing produces nothing to hit.
            self.push_state_op(DrawOp::Clear(color));
        } else {
            let clip = self.state.clip;
            self.push_device_draw(DrawOp::Clear(color), clip);
        }
    }

    fn draw_rect(&mut self, rect: Rect, paint: &Paint) {
        self.push_draw(DrawOp::DrawRect(rect, *paint), rect.inflate(paint.outset(), paint.outset()));
    }

    fn draw_rrect(&mut self, rrect: RoundedRect, paint: &Paint) {
        let local = rrect.rect().inflate(paint.outset(), paint.outset());
        self.push_draw(DrawOp::DrawRoundedRect(rrect, *paint), local);
    }

    fn draw_oval(&mut self, oval: Rect, paint: &Paint) {
        self.push_draw(DrawOp::DrawOval(oval, *paint), oval.inflate(paint.outset(), paint.outset()));
    }

    fn draw_circle(&mut self, center: Point, radius: f64, paint: &Paint) {
        let r = radius.abs() + paint.outset();
        let local = Rect::new(center.x - r, center.y - r, center.x + r, center.y + r);
        self.push_draw(
            DrawOp::DrawCircle {
                center,
                radius,
                paint: *paint,
            },
            local,
        );
    }

    fn draw_path(&mut self, path: &BezPath, paint: &Paint) {
        let local = path.bounding_box().inflate(paint.outset(), paint.outset());
        self.push_draw(DrawOp::DrawPath(path.clone(), *paint), local);
    }

    fn draw_points(&mut self, points: &[Point], paint: &Paint) {
        let local = points_bounds(points).inflate(paint.outset(), paint.outset());
        self.push_draw(DrawOp::DrawPoints(points.to_vec(), *paint), local);
    }

    fn draw_text(&mut self, text: &TextRun, paint: &Paint) {
        let local = text.bounds().inflate(paint.outset(), paint.outset());
        self.push_draw(DrawOp::DrawText(text.clone(), *paint), local);
    }

    fn draw_vertices(&mut self, vertices: &Vertices, paint: &Paint) {
        self.push_draw(DrawOp::DrawVertices(vertices.clone(), *paint), vertices.bounds());
    }

    fn draw_image(&mut self, image: ImageId, dst: Rect, paint: Option<&Paint>) {
        self.push_draw(
            DrawOp::DrawImage {
                image,
                dst,
                paint: paint.copied(),
            },
            dst,
        );
    }

    fn draw_picture(&mut self, picture: &Picture, transform: Option<Affine>) {
        let local = transform
            .unwrap_or(Affine::IDENTITY)
            .transform_rect_bbox(picture.cull_rect());
        self.push_draw(
            DrawOp::DrawPicture {
                picture: picture.clone(),
                transform,
            },
            local,
        );
    }

    fn draw_shadow(&mut self, path: &BezPath, color: Color, elevation: f64) {
        let spread = elevation.abs();
        let local = path.bounding_box().inflate(spread, spread);
        self.push_draw(
            DrawOp::DrawShadow {
                path: path.clone(),
                color,
                elevation,
            },
            local,
        );
    }

    fn draw_annotation(&mut self, rect: Rect, key: &str) {
        self.push_draw(
            DrawOp::DrawAnnotation {
                rect,
                key: key.to_string(),
            },
            rect,
        );
    }
}
