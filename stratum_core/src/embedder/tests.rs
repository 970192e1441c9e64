// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::Cell;

use kurbo::{Affine, Rect, Size, Vec2};

use super::{ExternalViewEmbedder, FrameState, SubmitReport};
use crate::backend::{PlatformFrame, Session, SurfaceProducer};
use crate::canvas::{Canvas, Color, Paint, PictureRecorder};
use crate::config::EmbedderConfig;
use crate::layer::{EmbedderLayerId, ViewId};
use crate::mutator::{EmbeddedViewParams, Mutator, MutatorsStack};
use crate::session::{
    BlendMode, ContentId, HitRegion, HitTestInteraction, PresentArgs, SessionCommand,
    SessionError, SessionEvent, TransformId,
};
use crate::surface::{BufferImportToken, Fence, Surface};
use crate::view::ViewCreateArgs;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct FakeSession {
    commands: Vec<SessionCommand>,
    presents: Vec<PresentArgs>,
}

impl Session for FakeSession {
    fn enqueue(&mut self, command: SessionCommand) {
        self.commands.push(command);
    }

    fn present(&mut self, args: PresentArgs) {
        self.presents.push(args);
    }
}

struct FakeSurface {
    serial: u64,
    size: Size,
    image: Option<ContentId>,
    acquire: Fence,
    release: Fence,
    on_release: Option<Box<dyn FnOnce()>>,
    recorder: PictureRecorder,
    flushed: bool,
}

impl Surface for FakeSurface {
    fn size(&self) -> Size {
        self.size
    }

    fn image_id(&self) -> Option<ContentId> {
        self.image
    }

    fn set_image_id(&mut self, image: ContentId) {
        self.image = Some(image);
    }

    fn import_token(&self) -> BufferImportToken {
        BufferImportToken(self.serial)
    }

    fn acquire_fence(&self) -> Fence {
        self.acquire
    }

    fn release_fence(&self) -> Fence {
        self.release
    }

    fn set_release_image_callback(&mut self, callback: Box<dyn FnOnce()>) {
        self.on_release = Some(callback);
    }

    fn canvas(&mut self) -> &mut dyn Canvas {
        &mut self.recorder
    }

    fn flush(&mut self) {
        self.flushed = true;
    }
}

/// Hands out surfaces, reusing submitted ones of the same size.
#[derive(Default)]
struct FakeProducer {
    next_serial: u64,
    next_fence: u64,
    fail_remaining: usize,
    produced: Vec<Size>,
    pool: Vec<FakeSurface>,
}

impl FakeProducer {
    fn fence(&mut self) -> Fence {
        self.next_fence += 1;
        Fence(self.next_fence)
    }

    /// Destroys every pooled surface, firing their release callbacks.
    fn retire_all(&mut self) {
        for mut surface in self.pool.drain(..) {
            if let Some(callback) = surface.on_release.take() {
                callback();
            }
        }
    }
}

impl SurfaceProducer for FakeProducer {
    type Surface = FakeSurface;

    fn produce_surface(&mut self, size: Size) -> Option<FakeSurface> {
        self.produced.push(size);
        if self.fail_remaining > 0 {
            self.fail_remaining -= 1;
            return None;
        }
        let acquire = self.fence();
        let release = self.fence();
        if let Some(pos) = self.pool.iter().position(|s| s.size == size) {
            let mut surface = self.pool.swap_remove(pos);
            surface.acquire = acquire;
            surface.release = release;
            surface.recorder = PictureRecorder::new(size.to_rect(), false);
            surface.flushed = false;
            return Some(surface);
        }
        self.next_serial += 1;
        Some(FakeSurface {
            serial: self.next_serial,
            size,
            image: None,
            acquire,
            release,
            on_release: None,
            recorder: PictureRecorder::new(size.to_rect(), false),
            flushed: false,
        })
    }

    fn submit_surfaces(&mut self, surfaces: Vec<FakeSurface>) {
        self.pool.extend(surfaces);
    }
}

#[derive(Default)]
struct FakeFrame {
    submits: Rc<Cell<u32>>,
}

impl PlatformFrame for FakeFrame {
    fn submit(self) {
        self.submits.set(self.submits.get() + 1);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

type Embedder = ExternalViewEmbedder<FakeSession, FakeProducer>;

const FRAME: Size = Size::new(512.0, 512.0);

fn embedder() -> Embedder {
    with_config(EmbedderConfig::new())
}

fn with_config(config: EmbedderConfig) -> Embedder {
    ExternalViewEmbedder::new(FakeSession::default(), FakeProducer::default(), config)
}

fn green() -> Paint {
    Paint::fill(Color::from_rgba8(0, 255, 0, 255))
}

fn submit(e: &mut Embedder) -> SubmitReport {
    e.submit_frame(FakeFrame::default())
}

fn take_commands(e: &mut Embedder) -> Vec<SessionCommand> {
    core::mem::take(&mut e.session_mut().commands)
}

fn draw_root(e: &mut Embedder, rect: Rect) {
    e.root_canvas()
        .expect("frame is accumulating")
        .draw_rect(rect, &green());
}

fn preroll(e: &mut Embedder, view: u64, size: Size) {
    e.preroll_composite_embedded_view(ViewId(view), EmbeddedViewParams::new(size));
}

fn preroll_with(e: &mut Embedder, view: u64, size: Size, mutators: Vec<Mutator>) {
    let params =
        EmbeddedViewParams::with_mutators(size, mutators.into_iter().collect::<MutatorsStack>());
    e.preroll_composite_embedded_view(ViewId(view), params);
}

fn view_node(e: &Embedder, view: u64) -> TransformId {
    let holder = e.views.get(ViewId(view)).expect("view has a holder");
    e.views.transform_node(holder)
}

/// Children added to `parent`, in order.
fn children_of(commands: &[SessionCommand], parent: TransformId) -> Vec<TransformId> {
    commands
        .iter()
        .filter_map(|c| match c {
            SessionCommand::AddChild { parent: p, child } if *p == parent => Some(*child),
            _ => None,
        })
        .collect()
}

fn elevation_of(commands: &[SessionCommand], node: TransformId) -> Option<f64> {
    commands.iter().rev().find_map(|c| match c {
        SessionCommand::SetElevation {
            transform,
            elevation,
        } if *transform == node => Some(*elevation),
        _ => None,
    })
}

fn content_of(commands: &[SessionCommand], node: TransformId) -> Option<ContentId> {
    commands.iter().rev().find_map(|c| match c {
        SessionCommand::SetContent { transform, content } if *transform == node => *content,
        _ => None,
    })
}

fn blend_of(commands: &[SessionCommand], image: ContentId) -> Option<BlendMode> {
    commands.iter().rev().find_map(|c| match c {
        SessionCommand::SetImageBlending { image: i, mode } if *i == image => Some(*mode),
        _ => None,
    })
}

fn hit_regions_of(commands: &[SessionCommand], node: TransformId) -> Option<Vec<HitRegion>> {
    commands.iter().rev().find_map(|c| match c {
        SessionCommand::SetHitRegions { transform, regions } if *transform == node => {
            Some(regions.clone())
        }
        _ => None,
    })
}

fn touches(command: &SessionCommand, node: TransformId) -> bool {
    match command {
        SessionCommand::SetTranslation { transform, .. }
        | SessionCommand::SetTransform { transform, .. }
        | SessionCommand::SetOpacity { transform, .. }
        | SessionCommand::SetClips { transform, .. }
        | SessionCommand::SetElevation { transform, .. } => *transform == node,
        _ => false,
    }
}

fn viewport_updates(commands: &[SessionCommand]) -> Vec<Size> {
    commands
        .iter()
        .filter_map(|c| match c {
            SessionCommand::SetViewportProperties { properties, .. } => {
                Some(properties.logical_size)
            }
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// End-to-end scenarios
// ---------------------------------------------------------------------------

#[test]
fn single_rect_on_root() {
    let mut e = embedder();
    e.begin_frame(FRAME, 1.0);
    draw_root(&mut e, Rect::new(128.0, 256.0, 144.0, 272.0));
    let report = submit(&mut e);

    assert_eq!(e.producer().produced, [FRAME]);
    assert_eq!(report.surfaces, 1);
    assert_eq!(report.hit_regions, 1);
    assert!(report.presented);

    let commands = &e.session().commands;
    let node = e.layer_nodes[0];
    let regions = hit_regions_of(commands, node).expect("hit regions were set");
    assert_eq!(regions.len(), 1);
    assert_eq!(regions[0].rect(), Rect::new(128.0, 256.0, 144.0, 272.0));
    assert_eq!(
        regions[0].interaction,
        HitTestInteraction::SemanticallyInvisible
    );
    let image = content_of(commands, node).expect("image bound");
    assert_eq!(blend_of(commands, image), Some(BlendMode::Src));
}

#[test]
fn view_between_root_and_overlay() {
    let mut e = embedder();
    e.begin_frame(FRAME, 1.0);
    draw_root(&mut e, Rect::new(128.0, 256.0, 144.0, 272.0));
    preroll(&mut e, 7, Size::new(256.0, 512.0));
    e.composite_embedded_view(ViewId(7))
        .draw_rect(Rect::new(0.0, 0.0, 64.0, 64.0), &green());
    let report = submit(&mut e);

    assert_eq!(report.surfaces, 2);
    assert_eq!(
        e.composition_order(),
        [EmbedderLayerId::ROOT, EmbedderLayerId::embedded(ViewId(7))]
    );

    let commands = &e.session().commands;
    let view = view_node(&e, 7);
    let children = children_of(commands, e.root_transform);
    assert_eq!(children, [e.layer_nodes[0], view, e.layer_nodes[1]]);

    let elevations: Vec<f64> = children
        .iter()
        .map(|&n| elevation_of(commands, n).expect("every child has an elevation"))
        .collect();
    assert!(
        elevations.windows(2).all(|w| w[0] < w[1]),
        "elevations not increasing: {elevations:?}"
    );

    let overlay = content_of(commands, e.layer_nodes[1]).expect("overlay bound");
    assert_eq!(blend_of(commands, overlay), Some(BlendMode::SrcOver));
    assert!(commands.iter().any(|c| matches!(
        c,
        SessionCommand::CreateViewport { view: ViewId(7), .. }
    )));
    assert_eq!(viewport_updates(commands), [Size::new(256.0, 512.0)]);
}

#[test]
fn disjoint_rects_stay_separate() {
    let mut e = embedder();
    e.begin_frame(FRAME, 1.0);
    draw_root(&mut e, Rect::new(10.0, 10.0, 20.0, 20.0));
    draw_root(&mut e, Rect::new(400.0, 400.0, 410.0, 410.0));
    let report = submit(&mut e);

    assert_eq!(report.hit_regions, 2);
    let regions = hit_regions_of(&e.session().commands, e.layer_nodes[0]).unwrap();
    let mut rects: Vec<Rect> = regions.iter().map(HitRegion::rect).collect();
    rects.sort_by(|a, b| a.x0.total_cmp(&b.x0));
    assert_eq!(
        rects,
        [
            Rect::new(10.0, 10.0, 20.0, 20.0),
            Rect::new(400.0, 400.0, 410.0, 410.0)
        ]
    );
}

#[test]
fn overlapping_rects_merge_to_union() {
    let mut e = embedder();
    e.begin_frame(FRAME, 1.0);
    draw_root(&mut e, Rect::new(10.0, 10.0, 60.0, 60.0));
    draw_root(&mut e, Rect::new(30.0, 30.0, 80.0, 80.0));
    let report = submit(&mut e);

    assert_eq!(report.hit_regions, 1);
    let regions = hit_regions_of(&e.session().commands, e.layer_nodes[0]).unwrap();
    assert_eq!(regions[0].rect(), Rect::new(10.0, 10.0, 80.0, 80.0));
}

#[test]
fn cancel_leaves_no_residue() {
    let mut e = embedder();
    e.begin_frame(FRAME, 1.0);
    preroll(&mut e, 1, Size::new(100.0, 100.0));
    e.cancel_frame();
    assert_eq!(e.frame_state(), FrameState::Idle);
    assert!(e.composition_order().is_empty());
    assert_eq!(e.frame_size(), Size::ZERO);
    e.cancel_frame();

    e.begin_frame(FRAME, 1.0);
    assert_eq!(e.composition_order(), [EmbedderLayerId::ROOT]);
    assert!(e.current_canvases().is_empty());
    submit(&mut e);

    assert_eq!(e.view_count(), 0);
    assert!(
        !e.session()
            .commands
            .iter()
            .any(|c| matches!(c, SessionCommand::CreateViewport { .. }))
    );
}

// ---------------------------------------------------------------------------
// Frame state contract
// ---------------------------------------------------------------------------

#[test]
#[should_panic(expected = "prerolled twice")]
fn duplicate_preroll_panics() {
    let mut e = embedder();
    e.begin_frame(FRAME, 1.0);
    preroll(&mut e, 1, Size::new(10.0, 10.0));
    preroll(&mut e, 1, Size::new(10.0, 10.0));
}

#[test]
#[should_panic(expected = "disagrees with its mutator stack")]
fn inconsistent_placement_panics() {
    let mut e = embedder();
    e.begin_frame(FRAME, 1.0);
    let mut params = EmbeddedViewParams::new(Size::new(10.0, 10.0));
    params.mutators.push(Mutator::Transform(Affine::translate((5.0, 0.0))));
    e.preroll_composite_embedded_view(ViewId(1), params);
}

#[test]
#[should_panic(expected = "device_pixel_ratio must be positive and finite")]
fn zero_device_pixel_ratio_panics() {
    let mut e = embedder();
    e.begin_frame(FRAME, 0.0);
}

#[test]
#[should_panic(expected = "without a preroll")]
fn composite_without_preroll_panics() {
    let mut e = embedder();
    e.begin_frame(FRAME, 1.0);
    e.composite_embedded_view(ViewId(3));
}

#[test]
#[should_panic(expected = "preroll_composite_embedded_view called while Idle")]
fn preroll_outside_frame_panics() {
    let mut e = embedder();
    preroll(&mut e, 1, Size::new(10.0, 10.0));
}

#[test]
#[should_panic(expected = "submit_frame called while Idle")]
fn submit_outside_frame_panics() {
    let mut e = embedder();
    submit(&mut e);
}

#[test]
fn root_canvas_outside_frame_is_none() {
    let mut e = embedder();
    assert!(e.root_canvas().is_none());
    e.begin_frame(FRAME, 1.0);
    assert!(e.root_canvas().is_some());
    submit(&mut e);
    assert!(e.root_canvas().is_none());
}

#[test]
fn begin_frame_discards_unsubmitted_frame() {
    let mut e = embedder();
    e.begin_frame(FRAME, 1.0);
    preroll(&mut e, 1, Size::new(10.0, 10.0));
    e.begin_frame(Size::new(64.0, 64.0), 1.0);
    assert_eq!(e.composition_order(), [EmbedderLayerId::ROOT]);
    assert_eq!(e.frame_size(), Size::new(64.0, 64.0));
    assert_eq!(e.frame_state(), FrameState::Accumulating);
}

#[test]
fn current_canvases_follow_composition_order() {
    let mut e = embedder();
    e.begin_frame(FRAME, 1.0);
    preroll(&mut e, 1, Size::new(10.0, 10.0));
    preroll(&mut e, 2, Size::new(10.0, 10.0));
    let mut canvases = e.current_canvases();
    assert_eq!(canvases.len(), 2);
    canvases[1].draw_rect(Rect::new(0.0, 0.0, 4.0, 4.0), &green());

    let overlay_2 = &e.layers[&EmbedderLayerId::embedded(ViewId(2))];
    let overlay_1 = &e.layers[&EmbedderLayerId::embedded(ViewId(1))];
    assert!(overlay_2.did_draw());
    assert!(!overlay_1.did_draw());
}

// ---------------------------------------------------------------------------
// Surfaces
// ---------------------------------------------------------------------------

#[test]
fn undrawn_overlay_gets_no_surface() {
    let mut e = embedder();
    e.begin_frame(FRAME, 1.0);
    draw_root(&mut e, Rect::new(0.0, 0.0, 10.0, 10.0));
    preroll(&mut e, 4, Size::new(100.0, 100.0));
    let report = submit(&mut e);

    assert_eq!(report.surfaces, 1);
    assert_eq!(e.producer().produced.len(), 1);
    assert_eq!(e.layer_node_count(), 1);
    let children = children_of(&e.session().commands, e.root_transform);
    assert_eq!(children, [e.layer_nodes[0], view_node(&e, 4)]);
}

#[test]
fn transparent_draws_allocate_nothing() {
    let mut e = embedder();
    e.begin_frame(FRAME, 1.0);
    e.root_canvas()
        .unwrap()
        .draw_rect(Rect::new(0.0, 0.0, 10.0, 10.0), &Paint::fill(Color::TRANSPARENT));
    let report = submit(&mut e);

    assert_eq!(report.surfaces, 0);
    assert!(e.producer().produced.is_empty());
    assert!(report.presented);
}

#[test]
fn failed_surface_skips_only_that_layer() {
    let mut e = embedder();
    e.producer_mut().fail_remaining = 1;
    e.begin_frame(FRAME, 1.0);
    draw_root(&mut e, Rect::new(0.0, 0.0, 10.0, 10.0));
    preroll(&mut e, 3, Size::new(100.0, 100.0));
    e.composite_embedded_view(ViewId(3))
        .draw_rect(Rect::new(0.0, 0.0, 10.0, 10.0), &green());
    let submits = Rc::new(Cell::new(0));
    let report = e.submit_frame(FakeFrame {
        submits: Rc::clone(&submits),
    });

    assert_eq!(report.skipped_layers, [EmbedderLayerId::ROOT]);
    assert_eq!(report.surfaces, 1);
    assert_eq!(submits.get(), 1);
    assert_eq!(
        e.composition_order(),
        [EmbedderLayerId::ROOT, EmbedderLayerId::embedded(ViewId(3))]
    );

    // The overlay sits above the view, so it must still blend.
    let commands = &e.session().commands;
    let children = children_of(commands, e.root_transform);
    assert_eq!(children, [view_node(&e, 3), e.layer_nodes[0]]);
    let overlay = content_of(commands, e.layer_nodes[0]).unwrap();
    assert_eq!(blend_of(commands, overlay), Some(BlendMode::SrcOver));
}

#[test]
fn pictures_are_rasterized_and_recycled() {
    let mut e = embedder();
    e.begin_frame(FRAME, 1.0);
    draw_root(&mut e, Rect::new(5.0, 5.0, 50.0, 50.0));
    let submits = Rc::new(Cell::new(0));
    e.submit_frame(FakeFrame {
        submits: Rc::clone(&submits),
    });

    assert_eq!(submits.get(), 1);
    let pool = &e.producer().pool;
    assert_eq!(pool.len(), 1);
    let surface = &pool[0];
    assert!(surface.flushed);
    // Clear, then the recorded rect.
    assert_eq!(surface.recorder.op_count(), 2);
    assert_eq!(
        surface.recorder.op_bounds()[1],
        Rect::new(5.0, 5.0, 50.0, 50.0)
    );
}

#[test]
fn recycled_surfaces_keep_their_image() {
    let mut e = embedder();
    for _ in 0..2 {
        e.begin_frame(FRAME, 1.0);
        draw_root(&mut e, Rect::new(0.0, 0.0, 10.0, 10.0));
        submit(&mut e);
    }
    let creates = e
        .session()
        .commands
        .iter()
        .filter(|c| matches!(c, SessionCommand::CreateImage { .. }))
        .count();
    assert_eq!(creates, 1);
}

#[test]
fn retired_surfaces_release_their_image() {
    let mut e = embedder();
    e.begin_frame(FRAME, 1.0);
    draw_root(&mut e, Rect::new(0.0, 0.0, 10.0, 10.0));
    submit(&mut e);
    let first = content_of(&e.session().commands, e.layer_nodes[0]).unwrap();

    e.producer_mut().retire_all();
    take_commands(&mut e);
    e.begin_frame(FRAME, 1.0);
    draw_root(&mut e, Rect::new(0.0, 0.0, 10.0, 10.0));
    submit(&mut e);

    let commands = &e.session().commands;
    assert!(commands.contains(&SessionCommand::ReleaseImage(first)));
    let second = content_of(commands, e.layer_nodes[0]).unwrap();
    assert_ne!(first, second);
}

// ---------------------------------------------------------------------------
// Scene structure
// ---------------------------------------------------------------------------

#[test]
fn composition_order_is_deterministic() {
    fn frame(e: &mut Embedder) -> Vec<TransformId> {
        e.begin_frame(FRAME, 1.0);
        draw_root(e, Rect::new(0.0, 0.0, 10.0, 10.0));
        for view in 1..=3 {
            preroll(e, view, Size::new(50.0, 50.0));
            e.composite_embedded_view(ViewId(view))
                .draw_rect(Rect::new(0.0, 0.0, 5.0, 5.0), &green());
        }
        submit(e);
        let commands = take_commands(e);
        children_of(&commands, e.root_transform)
    }

    let mut e = embedder();
    let first = frame(&mut e);
    let second = frame(&mut e);
    assert_eq!(first.len(), 7);
    assert_eq!(first, second);
    assert_eq!(first[0], e.layer_nodes[0]);
    assert_eq!(first[1], view_node(&e, 1));
    assert_eq!(first[6], e.layer_nodes[3]);
}

#[test]
fn elevations_follow_the_layer_formula() {
    let mut e = embedder();
    e.begin_frame(FRAME, 1.0);
    draw_root(&mut e, Rect::new(0.0, 0.0, 10.0, 10.0));
    for view in 1..=2 {
        preroll(&mut e, view, Size::new(50.0, 50.0));
        e.composite_embedded_view(ViewId(view))
            .draw_rect(Rect::new(0.0, 0.0, 5.0, 5.0), &green());
    }
    submit(&mut e);

    let commands = &e.session().commands;
    let children = children_of(commands, e.root_transform);
    let elevations: Vec<f64> = children
        .iter()
        .map(|&n| elevation_of(commands, n).unwrap())
        .collect();
    let step = 0.0001_f64;
    let expected = [
        0.0,
        step,
        step + 100.0,
        2.0 * step + 100.0,
        2.0 * step + 200.0,
    ];
    for (got, want) in elevations.iter().zip(expected) {
        assert!((got - want).abs() < 1e-3, "{elevations:?}");
    }
    assert!(elevations.windows(2).all(|w| w[0] < w[1]), "{elevations:?}");
}

#[test]
fn elevations_stay_distinct_under_many_views() {
    let mut e = embedder();
    e.begin_frame(FRAME, 1.0);
    draw_root(&mut e, Rect::new(0.0, 0.0, 10.0, 10.0));
    for view in 1..=30 {
        preroll(&mut e, view, Size::new(20.0, 20.0));
        e.composite_embedded_view(ViewId(view))
            .draw_rect(Rect::new(0.0, 0.0, 5.0, 5.0), &green());
    }
    submit(&mut e);

    let commands = &e.session().commands;
    let children = children_of(commands, e.root_transform);
    assert_eq!(children.len(), 61, "root image plus 30 views and 30 overlays");
    let elevations: Vec<f64> = children
        .iter()
        .map(|&n| elevation_of(commands, n).unwrap())
        .collect();
    assert!(elevations.windows(2).all(|w| w[0] < w[1]), "{elevations:?}");
}

#[test]
fn reset_unbinds_and_detaches_without_destroying() {
    let mut e = embedder();
    e.begin_frame(FRAME, 1.0);
    draw_root(&mut e, Rect::new(0.0, 0.0, 10.0, 10.0));
    preroll(&mut e, 2, Size::new(10.0, 10.0));
    submit(&mut e);
    let node = e.layer_nodes[0];
    let view = view_node(&e, 2);
    take_commands(&mut e);

    e.begin_frame(FRAME, 1.0);
    let commands = take_commands(&mut e);
    assert!(commands.contains(&SessionCommand::SetContent {
        transform: node,
        content: None
    }));
    for child in [node, view] {
        assert!(commands.contains(&SessionCommand::RemoveChild {
            parent: e.root_transform,
            child,
        }));
    }
    assert!(
        !commands
            .iter()
            .any(|c| matches!(c, SessionCommand::ReleaseTransform(_)))
    );
    assert_eq!(e.layer_node_count(), 1);
    assert_eq!(e.view_count(), 1);
}

#[test]
fn root_scale_tracks_device_pixel_ratio() {
    let mut e = embedder();
    let scales = |e: &mut Embedder| -> Vec<Vec2> {
        take_commands(e)
            .into_iter()
            .filter_map(|c| match c {
                SessionCommand::SetScale { scale, .. } => Some(scale),
                _ => None,
            })
            .collect()
    };

    e.begin_frame(FRAME, 2.0);
    submit(&mut e);
    assert_eq!(scales(&mut e), [Vec2::new(0.5, 0.5)]);

    e.begin_frame(FRAME, 2.0);
    submit(&mut e);
    assert!(scales(&mut e).is_empty());
}

#[test]
fn disabled_hit_regions_keep_implicit_region() {
    let mut e = with_config(EmbedderConfig {
        hit_regions: false,
        ..EmbedderConfig::new()
    });
    e.begin_frame(FRAME, 1.0);
    draw_root(&mut e, Rect::new(0.0, 0.0, 10.0, 10.0));
    let report = submit(&mut e);

    assert_eq!(report.hit_regions, 0);
    assert!(
        !e.session()
            .commands
            .iter()
            .any(|c| matches!(c, SessionCommand::SetHitRegions { .. }))
    );
}

#[test]
fn input_interceptor_sits_on_top() {
    let mut e = with_config(EmbedderConfig::with_input_interception());
    e.begin_frame(FRAME, 1.0);
    draw_root(&mut e, Rect::new(0.0, 0.0, 10.0, 10.0));
    preroll(&mut e, 1, Size::new(10.0, 10.0));
    e.composite_embedded_view(ViewId(1))
        .draw_rect(Rect::new(0.0, 0.0, 5.0, 5.0), &green());
    submit(&mut e);

    let commands = &e.session().commands;
    let interceptor = e.interceptor.expect("interceptor created");
    assert!(commands.contains(&SessionCommand::SetInfiniteHitRegion {
        transform: interceptor,
        interaction: HitTestInteraction::SemanticallyInvisible,
    }));
    let children = children_of(commands, e.root_transform);
    assert_eq!(children.last(), Some(&interceptor));
    let top = elevation_of(commands, interceptor).unwrap();
    assert!((top - 600.0).abs() < 1e-3, "{top}");
    for &child in &children[..children.len() - 1] {
        assert!(elevation_of(commands, child).unwrap() < top);
    }
}

// ---------------------------------------------------------------------------
// View holders
// ---------------------------------------------------------------------------

#[test]
fn view_mutators_become_commands() {
    let mut e = embedder();
    e.begin_frame(FRAME, 1.0);
    preroll_with(
        &mut e,
        5,
        Size::new(100.0, 100.0),
        vec![
            Mutator::ClipRect(Rect::new(0.0, 0.0, 200.0, 200.0)),
            Mutator::Transform(Affine::translate((10.0, 20.0))),
            Mutator::Opacity(0.5),
        ],
    );
    submit(&mut e);

    let node = view_node(&e, 5);
    let commands = &e.session().commands;
    assert!(commands.contains(&SessionCommand::SetTranslation {
        transform: node,
        translation: Vec2::new(10.0, 20.0),
    }));
    assert!(commands.contains(&SessionCommand::SetOpacity {
        transform: node,
        opacity: 0.5,
    }));
    assert!(commands.iter().any(|c| matches!(
        c,
        SessionCommand::SetClips { transform, clips } if *transform == node && clips.len() == 1
    )));
    assert!(commands.contains(&SessionCommand::SetInfiniteHitRegion {
        transform: node,
        interaction: HitTestInteraction::Default,
    }));
}

#[test]
fn rotated_view_uses_full_transform() {
    let mut e = embedder();
    e.begin_frame(FRAME, 1.0);
    let rotation = Affine::rotate(0.5);
    preroll_with(
        &mut e,
        5,
        Size::new(100.0, 100.0),
        vec![Mutator::Transform(rotation)],
    );
    submit(&mut e);

    let node = view_node(&e, 5);
    assert!(e.session().commands.contains(&SessionCommand::SetTransform {
        transform: node,
        matrix: rotation,
    }));
}

#[test]
fn unchanged_view_attributes_are_not_resent() {
    let mutators = |opacity| {
        vec![
            Mutator::Transform(Affine::translate((10.0, 20.0))),
            Mutator::Opacity(opacity),
        ]
    };
    let mut e = embedder();
    e.begin_frame(FRAME, 1.0);
    preroll_with(&mut e, 5, Size::new(100.0, 100.0), mutators(0.5));
    submit(&mut e);
    let node = view_node(&e, 5);
    take_commands(&mut e);

    e.begin_frame(FRAME, 1.0);
    preroll_with(&mut e, 5, Size::new(100.0, 100.0), mutators(0.5));
    submit(&mut e);
    let commands = take_commands(&mut e);
    assert!(!commands.iter().any(|c| touches(c, node)), "{commands:?}");
    assert!(viewport_updates(&commands).is_empty());

    e.begin_frame(FRAME, 1.0);
    preroll_with(&mut e, 5, Size::new(100.0, 100.0), mutators(0.25));
    submit(&mut e);
    let commands = take_commands(&mut e);
    let touched: Vec<&SessionCommand> = commands.iter().filter(|c| touches(c, node)).collect();
    assert_eq!(
        touched,
        [&SessionCommand::SetOpacity {
            transform: node,
            opacity: 0.25,
        }]
    );
}

#[test]
fn zero_size_view_defers_properties() {
    let mut e = embedder();
    e.begin_frame(FRAME, 1.0);
    preroll(&mut e, 6, Size::new(0.0, 100.0));
    submit(&mut e);
    assert!(viewport_updates(&take_commands(&mut e)).is_empty());

    e.begin_frame(FRAME, 1.0);
    preroll(&mut e, 6, Size::new(0.0, 100.0));
    submit(&mut e);
    assert!(viewport_updates(&take_commands(&mut e)).is_empty());

    e.begin_frame(FRAME, 1.0);
    preroll(&mut e, 6, Size::new(50.0, 100.0));
    submit(&mut e);
    assert_eq!(
        viewport_updates(&take_commands(&mut e)),
        [Size::new(50.0, 100.0)]
    );
}

#[test]
fn view_lifecycle() {
    let mut e = embedder();
    take_commands(&mut e);
    e.create_view(ViewId(9), ViewCreateArgs::default());
    let commands = take_commands(&mut e);
    assert_eq!(e.view_count(), 1);
    let node = view_node(&e, 9);
    let viewport = e.views.viewport(e.views.get(ViewId(9)).unwrap());
    assert_eq!(commands[0], SessionCommand::CreateTransform(node));
    assert!(matches!(
        commands[1],
        SessionCommand::CreateViewport { viewport: v, view: ViewId(9), .. } if v == viewport
    ));
    assert_eq!(
        commands[2],
        SessionCommand::SetContent {
            transform: node,
            content: Some(viewport),
        }
    );

    // Shown once, then hidden and made non-hittable.
    e.begin_frame(FRAME, 1.0);
    preroll(&mut e, 9, Size::new(30.0, 30.0));
    submit(&mut e);
    take_commands(&mut e);
    e.set_view_properties(ViewId(9), Rect::ZERO, false, true);
    e.begin_frame(FRAME, 1.0);
    submit(&mut e);
    let commands = take_commands(&mut e);
    assert!(commands.contains(&SessionCommand::SetHitRegions {
        transform: node,
        regions: Vec::new(),
    }));
    assert!(!children_of(&commands, e.root_transform).contains(&node));

    // Unchanged properties push nothing.
    e.set_view_properties(ViewId(9), Rect::ZERO, false, true);
    e.begin_frame(FRAME, 1.0);
    submit(&mut e);
    assert!(
        !take_commands(&mut e)
            .iter()
            .any(|c| matches!(c, SessionCommand::SetHitRegions { .. }))
    );

    assert!(e.destroy_view(ViewId(9)));
    let commands = take_commands(&mut e);
    assert!(commands.contains(&SessionCommand::ReleaseViewport(viewport)));
    assert!(commands.contains(&SessionCommand::ReleaseTransform(node)));
    assert_eq!(e.view_count(), 0);
    assert!(!e.destroy_view(ViewId(9)));
}

#[test]
fn destroying_a_shown_view_detaches_it() {
    let mut e = embedder();
    e.begin_frame(FRAME, 1.0);
    preroll(&mut e, 2, Size::new(10.0, 10.0));
    submit(&mut e);
    let node = view_node(&e, 2);
    take_commands(&mut e);

    assert!(e.destroy_view(ViewId(2)));
    let commands = take_commands(&mut e);
    assert_eq!(
        commands[0],
        SessionCommand::RemoveChild {
            parent: e.root_transform,
            child: node,
        }
    );
}

#[test]
#[should_panic(expected = "created twice")]
fn duplicate_create_view_panics() {
    let mut e = embedder();
    e.create_view(ViewId(1), ViewCreateArgs::default());
    e.create_view(ViewId(1), ViewCreateArgs::default());
}

#[test]
#[should_panic(expected = "unknown view")]
fn properties_for_unknown_view_panic() {
    let mut e = embedder();
    e.set_view_properties(ViewId(1), Rect::ZERO, true, true);
}

// ---------------------------------------------------------------------------
// Presents and session events
// ---------------------------------------------------------------------------

#[test]
fn presents_wait_for_credits() {
    let mut e = embedder();
    e.begin_frame(FRAME, 1.0);
    draw_root(&mut e, Rect::new(0.0, 0.0, 10.0, 10.0));
    assert!(submit(&mut e).presented);

    e.begin_frame(FRAME, 1.0);
    draw_root(&mut e, Rect::new(0.0, 0.0, 10.0, 10.0));
    assert!(!submit(&mut e).presented);
    assert_eq!(e.session().presents.len(), 1);
    assert!(e.connection().is_present_pending());

    e.handle_session_event(SessionEvent::NextFrameBegin {
        additional_present_credits: 1,
    })
    .unwrap();
    assert_eq!(e.session().presents.len(), 2);
    assert!(!e.connection().is_present_pending());
}

#[test]
fn release_fences_lag_one_present() {
    let mut e = embedder();
    let mut fences = Vec::new();
    for _ in 0..2 {
        e.begin_frame(FRAME, 1.0);
        draw_root(&mut e, Rect::new(0.0, 0.0, 10.0, 10.0));
        submit(&mut e);
        let surface = &e.producer().pool[0];
        fences.push((surface.acquire, surface.release));
        e.handle_session_event(SessionEvent::NextFrameBegin {
            additional_present_credits: 1,
        })
        .unwrap();
    }

    let presents = &e.session().presents;
    assert_eq!(presents[0].acquire_fences, [fences[0].0]);
    assert!(presents[0].release_fences.is_empty());
    assert_eq!(presents[1].acquire_fences, [fences[1].0]);
    assert_eq!(presents[1].release_fences, [fences[0].1]);
}

#[test]
fn session_events_update_connection() {
    let mut e = embedder();
    e.begin_frame(FRAME, 1.0);
    submit(&mut e);
    assert_eq!(e.connection().presents_in_flight(), 1);

    e.handle_session_event(SessionEvent::FramePresented {
        presents_handled: 1,
    })
    .unwrap();
    assert_eq!(e.connection().presents_in_flight(), 0);

    assert_eq!(
        e.handle_session_event(SessionEvent::Error(SessionError::Lost)),
        Err(SessionError::Lost)
    );
}

#[cfg(feature = "trace")]
#[test]
fn submit_reports_every_phase() {
    use crate::trace::{PhaseBeginEvent, PhaseKind, TraceSink, Tracer};

    #[derive(Default)]
    struct Phases(Vec<PhaseKind>);

    impl TraceSink for Phases {
        fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
            self.0.push(e.phase);
        }
    }

    let mut e = embedder();
    let mut sink = Phases::default();
    e.begin_frame(FRAME, 1.0);
    e.submit_frame_traced(FakeFrame::default(), &mut Tracer::new(&mut sink));
    assert_eq!(sink.0, PhaseKind::ALL);
}
