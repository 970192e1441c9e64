// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canvas command surface, recording, and draw spying.
//!
//! The embedder never rasterizes anything itself. Layers record into a
//! [`PictureRecorder`], the [`CanvasSpy`] watches the same command stream to
//! decide whether a layer needs a surface at all, and the finalized
//! [`Picture`] is replayed onto a surface canvas after the present has been
//! enqueued.
//!
//! The [`Canvas`] trait is deliberately small: it is the set of calls the
//! rendering pipeline issues against layer canvases, split into three groups
//! that matter to the spy:
//!
//! - **State**: `save`, `save_layer`, `restore`, `concat`, the clip calls,
//!   and `flush`. These never produce pixels.
//! - **Paint-bearing draws**: shapes, text, vertices, `draw_paint`, and
//!   `clear`. These produce pixels unless their color is fully transparent.
//! - **Opaque-to-analysis draws**: images, pictures, shadows, and
//!   annotations. These are always assumed to produce pixels.

mod picture;
mod spy;

pub use picture::{Picture, PictureRecorder};
pub use spy::{CanvasSpy, DidDrawCanvas};

use alloc::string::String;
use alloc::vec::Vec;

use kurbo::{Affine, BezPath, Point, Rect, RoundedRect, Vec2};

/// An 8-bit-per-channel straight-alpha color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha; `0` is fully transparent.
    pub a: u8,
}

impl Color {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::from_rgba8(0, 0, 0, 0);
    /// Opaque black.
    pub const BLACK: Self = Self::from_rgba8(0, 0, 0, 255);
    /// Opaque white.
    pub const WHITE: Self = Self::from_rgba8(255, 255, 255, 255);

    /// Creates a color from its components.
    #[must_use]
    pub const fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Returns whether the color contributes nothing when drawn.
    #[must_use]
    pub const fn is_transparent(self) -> bool {
        self.a == 0
    }
}

/// How a shape is filled.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum PaintStyle {
    /// Fill the interior.
    #[default]
    Fill,
    /// Stroke the outline with the given width in local units.
    Stroke {
        /// Stroke width.
        width: f64,
    },
}

/// Paint parameters for paint-bearing draws.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Paint {
    /// Color, including alpha.
    pub color: Color,
    /// Fill or stroke.
    pub style: PaintStyle,
}

impl Paint {
    /// A fill paint of the given color.
    #[must_use]
    pub const fn fill(color: Color) -> Self {
        Self {
            color,
            style: PaintStyle::Fill,
        }
    }

    /// A stroke paint of the given color and width.
    #[must_use]
    pub const fn stroke(color: Color, width: f64) -> Self {
        Self {
            color,
            style: PaintStyle::Stroke { width },
        }
    }

    /// Returns whether drawing with this paint leaves no visible trace.
    #[must_use]
    pub const fn is_transparent(&self) -> bool {
        self.color.is_transparent()
    }

    /// Half the stroke width, or zero for fills.
    pub(crate) fn outset(&self) -> f64 {
        match self.style {
            PaintStyle::Fill => 0.0,
            PaintStyle::Stroke { width } => width.abs() * 0.5,
        }
    }
}

/// Opaque handle to an image owned by the rendering pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageId(pub u64);

/// A run of shaped text.
///
/// Layout is out of scope; bounds are estimated conservatively from the
/// glyph count and font size.
#[derive(Clone, Debug, PartialEq)]
pub struct TextRun {
    /// The text.
    pub text: String,
    /// Baseline origin of the first glyph.
    pub origin: Point,
    /// Font size in local units.
    pub font_size: f64,
}

impl TextRun {
    /// Conservative local bounds: one em of advance per character, one em of
    /// ascent, and a quarter em of descent.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        let advance = self.text.chars().count() as f64 * self.font_size;
        Rect::new(
            self.origin.x,
            self.origin.y - self.font_size,
            self.origin.x + advance,
            self.origin.y + self.font_size * 0.25,
        )
    }
}

/// A triangle mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Vertices {
    /// Vertex positions in local units.
    pub positions: Vec<Point>,
}

impl Vertices {
    /// Bounding box of all positions.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        points_bounds(&self.positions)
    }
}

pub(crate) fn points_bounds(points: &[Point]) -> Rect {
    let mut iter = points.iter();
    let Some(first) = iter.next() else {
        return Rect::ZERO;
    };
    iter.fold(Rect::from_points(*first, *first), |acc, p| {
        acc.union_pt(*p)
    })
}

/// Receives drawing commands.
///
/// Implemented by recorders, spies, and backend surface canvases. The trait is
/// object safe so that layers can hand out `&mut dyn Canvas`.
pub trait Canvas {
    /// Pushes the transform and clip state.
    fn save(&mut self);

    /// Pushes state and starts an offscreen layer composited on `restore`.
    fn save_layer(&mut self, bounds: Option<Rect>, paint: Option<&Paint>);

    /// Pops the most recent `save` or `save_layer`.
    fn restore(&mut self);

    /// Pre-multiplies the current transform by `transform`.
    fn concat(&mut self, transform: Affine);

    /// Translates the current transform.
    fn translate(&mut self, offset: Vec2) {
        self.concat(Affine::translate(offset));
    }

    /// Scales the current transform.
    fn scale(&mut self, sx: f64, sy: f64) {
        self.concat(Affine::scale_non_uniform(sx, sy));
    }

    /// Rotates the current transform by `radians` about the local origin.
    fn rotate(&mut self, radians: f64) {
        self.concat(Affine::rotate(radians));
    }

    /// Intersects the clip with a rectangle.
    fn clip_rect(&mut self, rect: Rect);

    /// Intersects the clip with a rounded rectangle.
    fn clip_rrect(&mut self, rrect: RoundedRect);

    /// Intersects the clip with a path.
    fn clip_path(&mut self, path: &BezPath);

    /// Submits pending work to the backing store.
    fn flush(&mut self);

    /// Fills the whole clip with `paint`.
    fn draw_paint(&mut self, paint: &Paint);

    /// Replaces the whole clip with `color`.
    fn clear(&mut self, color: Color);

    /// Draws a rectangle.
    fn draw_rect(&mut self, rect: Rect, paint: &Paint);

    /// Draws a rounded rectangle.
    fn draw_rrect(&mut self, rrect: RoundedRect, paint: &Paint);

    /// Draws the ellipse inscribed in `oval`.
    fn draw_oval(&mut self, oval: Rect, paint: &Paint);

    /// Draws a circle.
    fn draw_circle(&mut self, center: Point, radius: f64, paint: &Paint);

    /// Draws a path.
    fn draw_path(&mut self, path: &BezPath, paint: &Paint);

    /// Draws a point cloud.
    fn draw_points(&mut self, points: &[Point], paint: &Paint);

    /// Draws a run of text.
    fn draw_text(&mut self, text: &TextRun, paint: &Paint);

    /// Draws a triangle mesh.
    fn draw_vertices(&mut self, vertices: &Vertices, paint: &Paint);

    /// Draws an image into `dst`.
    fn draw_image(&mut self, image: ImageId, dst: Rect, paint: Option<&Paint>);

    /// Replays a recorded picture, optionally under an extra transform.
    fn draw_picture(&mut self, picture: &Picture, transform: Option<Affine>);

    /// Draws the shadow cast by `path` at `elevation`.
    fn draw_shadow(&mut self, path: &BezPath, color: Color, elevation: f64);

    /// Attaches an annotation (e.g. a link target) to `rect`.
    fn draw_annotation(&mut self, rect: Rect, key: &str);
}

/// One recorded [`Canvas`] call.
#[derive(Clone, Debug, PartialEq)]
#[expect(missing_docs, reason = "fields mirror the Canvas method parameters")]
pub enum DrawOp {
    Save,
    SaveLayer {
        bounds: Option<Rect>,
        paint: Option<Paint>,
    },
    Restore,
    Concat(Affine),
    ClipRect(Rect),
    ClipRoundedRect(RoundedRect),
    ClipPath(BezPath),
    Flush,
    DrawPaint(Paint),
    Clear(Color),
    DrawRect(Rect, Paint),
    DrawRoundedRect(RoundedRect, Paint),
    DrawOval(Rect, Paint),
    DrawCircle {
        center: Point,
        radius: f64,
        paint: Paint,
    },
    DrawPath(BezPath, Paint),
    DrawPoints(Vec<Point>, Paint),
    DrawText(TextRun, Paint),
    DrawVertices(Vertices, Paint),
    DrawImage {
        image: ImageId,
        dst: Rect,
        paint: Option<Paint>,
    },
    DrawPicture {
        picture: Picture,
        transform: Option<Affine>,
    },
    DrawShadow {
        path: BezPath,
        color: Color,
        elevation: f64,
    },
    DrawAnnotation {
        rect: Rect,
        key: String,
    },
}

impl DrawOp {
    /// Returns whether the op can produce pixels.
    ///
    /// State ops are indexed for spatial queries but never become hit
    /// regions.
    #[must_use]
    pub fn is_draw(&self) -> bool {
        !matches!(
            self,
            Self::Save
                | Self::SaveLayer { .. }
                | Self::Restore
                | Self::Concat(_)
                | Self::ClipRect(_)
                | Self::ClipRoundedRect(_)
                | Self::ClipPath(_)
                | Self::Flush
        )
    }

    /// Issues this op against `canvas`.
    pub fn apply(&self, canvas: &mut dyn Canvas) {
        match self {
            Self::Save => canvas.save(),
            Self::SaveLayer { bounds, paint } => canvas.save_layer(*bounds, paint.as_ref()),
            Self::Restore => canvas.restore(),
            Self::Concat(transform) => canvas.concat(*transform),
            Self::ClipRect(rect) => canvas.clip_rect(*rect),
            Self::ClipRoundedRect(rrect) => canvas.clip_rrect(*rrect),
            Self::ClipPath(path) => canvas.clip_path(path),
            Self::Flush => canvas.flush(),
            Self::DrawPaint(paint) => canvas.draw_paint(paint),
            Self::Clear(color) => canvas.clear(*color),
            Self::DrawRect(rect, paint) => canvas.draw_rect(*rect, paint),
            Self::DrawRoundedRect(rrect, paint) => canvas.draw_rrect(*rrect, paint),
            Self::DrawOval(oval, paint) => canvas.draw_oval(*oval, paint),
            Self::DrawCircle {
                center,
                radius,
                paint,
            } => canvas.draw_circle(*center, *radius, paint),
            Self::DrawPath(path, paint) => canvas.draw_path(path, paint),
            Self::DrawPoints(points, paint) => canvas.draw_points(points, paint),
            Self::DrawText(text, paint) => canvas.draw_text(text, paint),
            Self::DrawVertices(vertices, paint) => canvas.draw_vertices(vertices, paint),
            Self::DrawImage { image, dst, paint } => canvas.draw_image(*image, *dst, paint.as_ref()),
            Self::DrawPicture { picture, transform } => canvas.draw_picture(picture, *transform),
            Self::DrawShadow {
                path,
                color,
                elevation,
            } => canvas.draw_shadow(path, *color, *elevation),
            Self::DrawAnnotation { rect, key } => canvas.draw_annotation(*rect, key),
        }
    }
}
