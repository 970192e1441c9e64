// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Detecting whether a canvas received visible drawing.

use kurbo::{Affine, BezPath, Point, Rect, RoundedRect};

use super::{Canvas, Color, ImageId, Paint, Picture, TextRun, Vertices};

/// A [`Canvas`] that rasterizes nothing and remembers whether anything
/// visible was drawn.
///
/// The test errs toward false positives: images, pictures, shadows, and
/// annotations always count, while paint-bearing draws count only when their
/// color has non-zero alpha. State ops never count.
#[derive(Clone, Copy, Debug, Default)]
pub struct DidDrawCanvas {
    did_draw: bool,
}

impl DidDrawCanvas {
    /// Creates a canvas that has not been drawn into.
    #[must_use]
    pub const fn new() -> Self {
        Self { did_draw: false }
    }

    /// Returns whether any visible draw has been observed.
    #[must_use]
    pub const fn did_draw(&self) -> bool {
        self.did_draw
    }

    fn mark_paint(&mut self, paint: &Paint) {
        if !paint.is_transparent() {
            self.did_draw = true;
        }
    }
}

impl Canvas for DidDrawCanvas {
    fn save(&mut self) {}

    fn save_layer(&mut self, _bounds: Option<Rect>, _paint: Option<&Paint>) {}

    fn restore(&mut self) {}

    fn concat(&mut self, _transform: Affine) {}

    fn clip_rect(&mut self, _rect: Rect) {}

    fn clip_rrect(&mut self, _rrect: RoundedRect) {}

    fn clip_path(&mut self, _path: &BezPath) {}

    fn flush(&mut self) {}

    fn draw_paint(&mut self, paint: &Paint) {
        self.mark_paint(paint);
    }

    fn clear(&mut self, color: Color) {
        if !color.is_transparent() {
            self.did_draw = true;
        }
    }

    fn draw_rect(&mut self, _rect: Rect, paint: &Paint) {
        self.mark_paint(paint);
    }

    fn draw_rrect(&mut self, _rrect: RoundedRect, paint: &Paint) {
        self.mark_paint(paint);
    }

    fn draw_oval(&mut self, _oval: Rect, paint: &Paint) {
        self.mark_paint(paint);
    }

    fn draw_circle(&mut self, _center: Point, _radius: f64, paint: &Paint) {
        self.mark_paint(paint);
    }

    fn draw_path(&mut self, _path: &BezPath, paint: &Paint) {
        self.mark_paint(paint);
    }

    fn draw_points(&mut self, _points: &[Point], paint: &Paint) {
        self.mark_paint(paint);
    }

    fn draw_text(&mut self, _text: &TextRun, paint: &Paint) {
        self.mark_paint(paint);
    }

    fn draw_vertices(&mut self, _vertices: &Vertices, paint: &Paint) {
        self.mark_paint(paint);
    }

    fn draw_image(&mut self, _image: ImageId, _dst: Rect, _paint: Option<&Paint>) {
        self.did_draw = true;
    }

    fn draw_picture(&mut self, _picture: &Picture, _transform: Option<Affine>) {
        self.did_draw = true;
    }

    fn draw_shadow(&mut self, _path: &BezPath, _color: Color, _elevation: f64) {
        self.did_draw = true;
    }

    fn draw_annotation(&mut self, _rect: Rect, _key: &str) {
        self.did_draw = true;
    }
}

/// Forwards every command to a target canvas while tracking visible drawing.
///
/// The spy is itself a [`Canvas`]; drawing into it is drawing into the
/// target.
#[derive(Debug)]
pub struct CanvasSpy<C> {
    target: C,
    did_draw: DidDrawCanvas,
}

impl<C: Canvas> CanvasSpy<C> {
    /// Wraps `target`.
    #[must_use]
    pub const fn new(target: C) -> Self {
        Self {
            target,
            did_draw: DidDrawCanvas::new(),
        }
    }

    /// Returns whether anything visible has been drawn.
    ///
    /// Monotonic: once `true`, stays `true` for the life of the spy.
    #[must_use]
    pub const fn did_draw_into_canvas(&self) -> bool {
        self.did_draw.did_draw()
    }

    /// The command-receiving facade.
    pub fn spying_canvas(&mut self) -> &mut dyn Canvas {
        self
    }

    /// The wrapped canvas.
    #[must_use]
    pub const fn target(&self) -> &C {
        &self.target
    }

    /// Unwraps the target canvas.
    #[must_use]
    pub fn into_target(self) -> C {
        self.target
    }
}

impl<C: Canvas> Canvas for CanvasSpy<C> {
    fn save(&mut self) {
        self.target.save();
        self.did_draw.save();
    }

    fn save_layer(&mut self, bounds: Option<Rect>, paint: Option<&Paint>) {
        self.target.save_layer(bounds, paint);
        self.did_draw.save_layer(bounds, paint);
    }

    fn restore(&mut self) {
        self.target.restore();
        self.did_draw.restore();
    }

    fn concat(&mut self, transform: Affine) {
        self.target.concat(transform);
        self.did_draw.concat(transform);
    }

    fn clip_rect(&mut self, rect: Rect) {
        self.target.clip_rect(rect);
        self.did_draw.clip_rect(rect);
    }

    fn clip_rrect(&mut self, rrect: RoundedRect) {
        self.target.clip_rrect(rrect);
        self.did_draw.clip_rrect(rrect);
    }

    fn clip_path(&mut self, path: &BezPath) {
        self.target.clip_path(path);
        self.did_draw.clip_path(path);
    }

    fn flush(&mut self) {
        self.target.flush();
        self.did_draw.flush();
    }

    fn draw_paint(&mut self, paint: &Paint) {
        self.target.draw_paint(paint);
        self.did_draw.draw_paint(paint);
    }

    fn clear(&mut self, color: Color) {
        self.target.clear(color);
        self.did_draw.clear(color);
    }

    fn draw_rect(&mut self, rect: Rect, paint: &Paint) {
        self.target.draw_rect(rect, paint);
        self.did_draw.draw_rect(rect, paint);
    }

    fn draw_rrect(&mut self, rrect: RoundedRect, paint: &Paint) {
        self.target.draw_rrect(rrect, paint);
        self.did_draw.draw_rrect(rrect, paint);
    }

    fn draw_oval(&mut self, oval: Rect, paint: &Paint) {
        self.target.draw_oval(oval, paint);
        self.did_draw.draw_oval(oval, paint);
    }

    fn draw_circle(&mut self, center: Point, radius: f64, paint: &Paint) {
        self.target.draw_circle(center, radius, paint);
        self.did_draw.draw_circle(center, radius, paint);
    }

    fn draw_path(&mut self, path: &BezPath, paint: &Paint) {
        self.target.draw_path(path, paint);
        self.did_draw.draw_path(path, paint);
    }

    fn draw_points(&mut self, points: &[Point], paint: &Paint) {
        self.target.draw_points(points, paint);
        self.did_draw.draw_points(points, paint);
    }

    fn draw_text(&mut self, text: &TextRun, paint: &Paint) {
        self.target.draw_text(text, paint);
        self.did_draw.draw_text(text, paint);
    }

    fn draw_vertices(&mut self, vertices: &Vertices, paint: &Paint) {
        self.target.draw_vertices(vertices, paint);
        self.did_draw.draw_vertices(vertices, paint);
    }

    fn draw_image(&mut self, image: ImageId, dst: Rect, paint: Option<&Paint>) {
        self.target.draw_image(image, dst, paint);
        self.did_draw.draw_image(image, dst, paint);
    }

    fn draw_picture(&mut self, picture: &Picture, transform: Option<Affine>) {
        self.target.draw_picture(picture, transform);
        self.did_draw.draw_picture(picture, transform);
    }

    fn draw_shadow(&mut self, path: &BezPath, color: Color, elevation: f64) {
        self.target.draw_shadow(path, color, elevation);
        self.did_draw.draw_shadow(path, color, elevation);
    }

    fn draw_annotation(&mut self, rect: Rect, key: &str) {
        self.target.draw_annotation(rect, key);
        self.did_draw.draw_annotation(rect, key);
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Vec2;

    use super::*;
    use crate::canvas::PictureRecorder;

    fn spy() -> CanvasSpy<PictureRecorder> {
        CanvasSpy::new(PictureRecorder::new(Rect::new(0.0, 0.0, 100.0, 100.0), false))
    }

    #[test]
    fn transparent_rect_is_not_a_draw() {
        let mut spy = spy();
        spy.draw_rect(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            &Paint::fill(Color::from_rgba8(255, 0, 0, 0)),
        );
        spy.clear(Color::TRANSPARENT);
        assert!(!spy.did_draw_into_canvas());
        // The command still reached the target.
        assert_eq!(spy.target().op_count(), 2);
    }

    #[test]
    fn opaque_draw_sticks_through_state_ops() {
        let mut spy = spy();
        spy.draw_rect(Rect::new(0.0, 0.0, 10.0, 10.0), &Paint::fill(Color::BLACK));
        assert!(spy.did_draw_into_canvas());
        spy.save();
        spy.clip_rect(Rect::new(0.0, 0.0, 1.0, 1.0));
        spy.translate(Vec2::new(3.0, 3.0));
        spy.restore();
        spy.draw_rect(Rect::ZERO, &Paint::fill(Color::TRANSPARENT));
        assert!(spy.did_draw_into_canvas());
    }

    #[test]
    fn state_ops_never_mark() {
        let mut spy = spy();
        spy.save_layer(None, Some(&Paint::fill(Color::BLACK)));
        spy.clip_rrect(RoundedRect::new(0.0, 0.0, 5.0, 5.0, 1.0));
        spy.clip_path(&BezPath::new());
        spy.rotate(1.0);
        spy.flush();
        spy.restore();
        assert!(!spy.did_draw_into_canvas());
    }

    #[test]
    fn images_and_annotations_always_mark() {
        let mut canvas = DidDrawCanvas::new();
        canvas.draw_image(ImageId(3), Rect::ZERO, Some(&Paint::fill(Color::TRANSPARENT)));
        assert!(canvas.did_draw());

        let mut canvas = DidDrawCanvas::new();
        canvas.draw_annotation(Rect::ZERO, "url");
        assert!(canvas.did_draw());

        let mut canvas = DidDrawCanvas::new();
        canvas.draw_shadow(&BezPath::new(), Color::TRANSPARENT, 4.0);
        assert!(canvas.did_draw());
    }

    #[test]
    fn empty_picture_still_marks() {
        let picture = PictureRecorder::new(Rect::ZERO, false).finish().0;
        let mut spy = spy();
        spy.spying_canvas().draw_picture(&picture, None);
        assert!(spy.did_draw_into_canvas());
        assert_eq!(spy.into_target().op_count(), 1);
    }
}
