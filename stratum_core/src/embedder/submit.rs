// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame submission.
//!
//! Scene emission runs in two passes over the composition order. The first
//! pass computes elevations and writes every shown view's folded mutators
//! into the view-holder store, which marks only what changed. One
//! [`evaluate`](crate::view::ViewHolderStore::evaluate) then drains the
//! changes, and the second pass emits commands in composition order: each
//! view's changed attributes, each drawn layer's image binding.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;

use hashbrown::HashMap;
use kurbo::{Affine, Vec2};

use super::{ExternalViewEmbedder, FrameState};
use crate::backend::{PlatformFrame, Session, SurfaceProducer};
use crate::canvas::Color;
use crate::layer::EmbedderLayerId;
use crate::mutator::ViewMutators;
use crate::session::{
    BlendMode, ContentId, HitRegion, HitTestInteraction, PresentOutcome, SessionCommand,
    TransformId,
};
use crate::surface::Surface;
use crate::trace::{FrameBeginEvent, PhaseKind, PresentEvent, SurfaceEvent, Tracer};
use crate::view::{ViewChanges, ViewCreateArgs};

/// Summary of one [`submit_frame`](ExternalViewEmbedder::submit_frame).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitReport {
    /// Index of the submitted frame.
    pub frame_index: u64,
    /// Surfaces produced and rasterized.
    pub surfaces: usize,
    /// Hit regions emitted across all layers.
    pub hit_regions: usize,
    /// Whether the present went out (`false`: withheld for credits).
    pub presented: bool,
    /// Layers that drew but got no surface.
    pub skipped_layers: Vec<EmbedderLayerId>,
}

/// One step of the second scene pass.
#[derive(Clone, Copy, Debug)]
enum SceneEntry {
    View { idx: u32 },
    Image {
        layer: EmbedderLayerId,
        slot: usize,
        elevation: f64,
        /// Nothing lies beneath this image.
        bottom: bool,
    },
}

impl<S: Session, P: SurfaceProducer> ExternalViewEmbedder<S, P> {
    /// Submits the accumulated frame and returns to [`FrameState::Idle`].
    ///
    /// # Panics
    ///
    /// Panics if no frame is accumulating.
    pub fn submit_frame<F: PlatformFrame>(&mut self, frame: F) -> SubmitReport {
        self.submit_frame_traced(frame, &mut Tracer::none())
    }

    /// Like [`submit_frame`](Self::submit_frame), reporting each phase to
    /// `tracer`.
    ///
    /// # Panics
    ///
    /// Panics if no frame is accumulating.
    pub fn submit_frame_traced<F: PlatformFrame>(
        &mut self,
        frame: F,
        tracer: &mut Tracer<'_>,
    ) -> SubmitReport {
        assert!(
            self.state == FrameState::Accumulating,
            "submit_frame called while {:?}; call begin_frame first",
            self.state
        );
        self.state = FrameState::Submitting;
        let frame_index = self.frame_index;
        self.frame_index += 1;
        let order = self.composition_order.clone();

        tracer.frame_begin(&FrameBeginEvent {
            frame_index,
            width: self.frame_size.width,
            height: self.frame_size.height,
            device_pixel_ratio: self.frame_dpr,
            layer_count: count_u32(order.len()),
        });

        let mut skipped_layers = Vec::new();
        let (mut surfaces, images, slots) = tracer.phase(frame_index, PhaseKind::Allocate, |t| {
            self.allocate_surfaces(frame_index, &order, &mut skipped_layers, t)
        });

        tracer.phase(frame_index, PhaseKind::Finalize, |_| {
            for (id, layer) in &mut self.layers {
                if slots.contains_key(id) {
                    layer.finalize();
                }
            }
        });

        let hit_regions = tracer.phase(frame_index, PhaseKind::Scene, |t| {
            self.build_scene(frame_index, &order, &surfaces, &images, &slots, t)
        });

        let presented = tracer.phase(frame_index, PhaseKind::Present, |t| {
            let acquire = surfaces.iter().map(Surface::acquire_fence).collect::<Vec<_>>();
            let release = surfaces.iter().map(Surface::release_fence).collect::<Vec<_>>();
            let event = PresentEvent {
                frame_index,
                acquire_fences: count_u32(acquire.len()),
                credits_remaining: 0,
            };
            match self.connection.present(acquire, release) {
                PresentOutcome::Presented => {
                    t.present_issued(&PresentEvent {
                        credits_remaining: self.connection.credits(),
                        ..event
                    });
                    true
                }
                PresentOutcome::Withheld => {
                    log::debug!("frame {frame_index}: present withheld until credits return");
                    t.present_withheld(&event);
                    false
                }
            }
        });

        tracer.phase(frame_index, PhaseKind::Rasterize, |_| {
            for id in &order {
                let Some(&slot) = slots.get(id) else {
                    continue;
                };
                let surface = &mut surfaces[slot];
                let canvas = surface.canvas();
                canvas.clear(Color::TRANSPARENT);
                if let Some(picture) = self.layers.get(id).and_then(|layer| layer.picture()) {
                    picture.playback(canvas);
                }
                surface.flush();
            }
        });

        let surface_count = surfaces.len();
        tracer.phase(frame_index, PhaseKind::Recycle, |_| {
            self.producer.submit_surfaces(surfaces);
        });

        frame.submit();
        self.state = FrameState::Idle;

        SubmitReport {
            frame_index,
            surfaces: surface_count,
            hit_regions,
            presented,
            skipped_layers,
        }
    }

    /// Produces a surface for every layer that drew.
    ///
    /// Returns the surfaces, their image ids (parallel to the surfaces), and
    /// each layer's slot.
    fn allocate_surfaces(
        &mut self,
        frame_index: u64,
        order: &[EmbedderLayerId],
        skipped: &mut Vec<EmbedderLayerId>,
        tracer: &mut Tracer<'_>,
    ) -> (Vec<P::Surface>, Vec<ContentId>, HashMap<EmbedderLayerId, usize>) {
        let mut surfaces = Vec::new();
        let mut images = Vec::new();
        let mut slots = HashMap::new();
        for &id in order {
            let Some(layer) = self.layers.get(&id) else {
                continue;
            };
            if !layer.did_draw() {
                continue;
            }
            let size = layer.surface_size();
            let event = SurfaceEvent {
                frame_index,
                layer: id,
                width: size.width,
                height: size.height,
            };
            let Some(mut surface) = self.producer.produce_surface(size) else {
                log::error!(
                    "no {}x{} surface for layer {:?}; skipping it this frame",
                    size.width,
                    size.height,
                    id.view()
                );
                tracer.surface_failed(&event);
                skipped.push(id);
                continue;
            };
            let image = match surface.image_id() {
                Some(image) => image,
                None => self.register_image(&mut surface),
            };
            tracer.surface_allocated(&event);
            slots.insert(id, surfaces.len());
            surfaces.push(surface);
            images.push(image);
        }
        (surfaces, images, slots)
    }

    /// Imports a surface's buffer as a compositor image.
    ///
    /// The release callback queues the image for `ReleaseImage` at the next
    /// submit.
    fn register_image(&mut self, surface: &mut P::Surface) -> ContentId {
        let image = self.ids.content();
        self.connection.enqueue(SessionCommand::CreateImage {
            image,
            import_token: surface.import_token(),
            size: surface.size(),
        });
        surface.set_image_id(image);
        let released = Rc::clone(&self.released_images);
        surface.set_release_image_callback(Box::new(move || released.borrow_mut().push(image)));
        image
    }

    /// Emits the frame's scene. Returns the number of hit regions emitted.
    fn build_scene(
        &mut self,
        frame_index: u64,
        order: &[EmbedderLayerId],
        surfaces: &[P::Surface],
        images: &[ContentId],
        slots: &HashMap<EmbedderLayerId, usize>,
        tracer: &mut Tracer<'_>,
    ) -> usize {
        let released: Vec<ContentId> = self.released_images.borrow_mut().drain(..).collect();
        for image in released {
            self.connection.enqueue(SessionCommand::ReleaseImage(image));
        }

        self.detach_all();
        if self.root_scale != Some(self.frame_dpr) {
            let inverse = 1.0 / self.frame_dpr;
            self.connection.enqueue(SessionCommand::SetScale {
                transform: self.root_transform,
                scale: Vec2::new(inverse, inverse),
            });
            self.root_scale = Some(self.frame_dpr);
        }

        // Pass 1: elevations and view-holder updates.
        let step = self.config.layer_elevation_step;
        let mut embedded_views_height = 0.0_f64;
        let mut image_index = 0_usize;
        let mut plan = Vec::with_capacity(order.len() * 2);
        for &id in order {
            if let Some(view_id) = id.view() {
                let holder = match self.views.get(view_id) {
                    Some(holder) => holder,
                    None => self.create_view(view_id, ViewCreateArgs::default()),
                };
                if let Some(params) = self.layers.get(&id).and_then(|l| l.view_params()) {
                    let folded = ViewMutators::fold(&params.mutators);
                    self.views.set_transform(holder, folded.transform);
                    self.views.set_opacity(holder, folded.opacity);
                    self.views.set_clips(holder, &folded.clips);
                    self.views.set_size(holder, params.size);
                }
                let elevation = step * image_index as f64 + embedded_views_height;
                self.views.set_elevation(holder, elevation);
                plan.push(SceneEntry::View { idx: holder.idx });
                embedded_views_height += self.config.platform_view_elevation;
            }
            if let Some(&slot) = slots.get(&id) {
                let elevation = step * image_index as f64 + embedded_views_height;
                plan.push(SceneEntry::Image {
                    layer: id,
                    slot,
                    elevation,
                    bottom: plan.is_empty(),
                });
                image_index += 1;
            }
        }
        let changes = self.views.evaluate();

        // Pass 2: commands in composition order.
        let mut shown = Vec::new();
        let mut hit_region_total = 0;
        #[cfg(feature = "trace-rich")]
        let mut counts = Vec::new();
        let mut image_index = 0_usize;
        for entry in &plan {
            match *entry {
                SceneEntry::View { idx } => {
                    self.attach(self.views.transform_node_at(idx));
                    self.emit_view_changes(idx, &changes, true);
                    shown.push(idx);
                }
                SceneEntry::Image {
                    layer,
                    slot,
                    elevation,
                    bottom,
                } => {
                    let mode = if bottom {
                        BlendMode::Src
                    } else {
                        BlendMode::SrcOver
                    };
                    let regions = self.bind_layer_node(
                        image_index,
                        layer,
                        &surfaces[slot],
                        images[slot],
                        elevation,
                        mode,
                    );
                    hit_region_total += regions;
                    #[cfg(feature = "trace-rich")]
                    counts.push(crate::trace::HitRegionCount {
                        layer,
                        regions: count_u32(regions),
                    });
                    image_index += 1;
                }
            }
        }

        // Holders changed outside the scene (e.g. `set_view_properties` on a
        // view not shown this frame) still get their updates.
        let mut hidden: Vec<u32> = [
            &changes.transforms,
            &changes.opacities,
            &changes.clips,
            &changes.properties,
            &changes.hit_test,
            &changes.elevations,
        ]
        .into_iter()
        .flatten()
        .copied()
        .filter(|idx| !shown.contains(idx))
        .collect();
        hidden.sort_unstable();
        hidden.dedup();
        for idx in hidden {
            self.emit_view_changes(idx, &changes, false);
        }

        if self.config.intercept_all_input {
            let node = match self.interceptor {
                Some(node) => node,
                None => {
                    let node = self.ids.transform();
                    self.connection.enqueue(SessionCommand::CreateTransform(node));
                    self.connection.enqueue(SessionCommand::SetInfiniteHitRegion {
                        transform: node,
                        interaction: HitTestInteraction::SemanticallyInvisible,
                    });
                    self.interceptor = Some(node);
                    node
                }
            };
            self.attach(node);
            self.connection.enqueue(SessionCommand::SetElevation {
                transform: node,
                elevation: embedded_views_height + self.config.input_interceptor_elevation,
            });
        }

        #[cfg(feature = "trace-rich")]
        tracer.hit_regions(frame_index, &counts);
        #[cfg(not(feature = "trace-rich"))]
        let _ = (frame_index, tracer);

        hit_region_total
    }

    /// Binds one drawn layer's image to the pool node at `image_index`,
    /// growing the pool if needed. Returns the number of hit regions set.
    fn bind_layer_node(
        &mut self,
        image_index: usize,
        layer: EmbedderLayerId,
        surface: &P::Surface,
        image: ContentId,
        elevation: f64,
        mode: BlendMode,
    ) -> usize {
        let node = match self.layer_nodes.get(image_index) {
            Some(&node) => node,
            None => {
                let node = self.ids.transform();
                self.connection.enqueue(SessionCommand::CreateTransform(node));
                self.layer_nodes.push(node);
                node
            }
        };
        self.attach(node);
        self.connection.enqueue(SessionCommand::SetContent {
            transform: node,
            content: Some(image),
        });
        self.bound_layer_nodes = self.bound_layer_nodes.max(image_index + 1);
        self.connection.enqueue(SessionCommand::SetImageDestinationSize {
            image,
            size: surface.size(),
        });
        self.connection.enqueue(SessionCommand::SetElevation {
            transform: node,
            elevation,
        });
        self.connection
            .enqueue(SessionCommand::SetImageBlending { image, mode });

        if !self.config.hit_regions {
            return 0;
        }
        let regions: Vec<HitRegion> = self
            .layers
            .get(&layer)
            .map(|l| l.hit_regions())
            .unwrap_or_default()
            .into_iter()
            .map(|rect| HitRegion::from_rect(rect, HitTestInteraction::SemanticallyInvisible))
            .collect();
        let count = regions.len();
        self.connection.enqueue(SessionCommand::SetHitRegions {
            transform: node,
            regions,
        });
        count
    }

    /// Emits the commands for holder `idx`'s drained changes.
    ///
    /// Zero-size property updates are deferred to a later frame; `shown`
    /// controls whether that deserves a warning.
    fn emit_view_changes(&mut self, idx: u32, changes: &ViewChanges, shown: bool) {
        let node = self.views.transform_node_at(idx);
        if changes.clips.contains(&idx) {
            self.connection.enqueue(SessionCommand::SetClips {
                transform: node,
                clips: self.views.clips_at(idx).to_vec(),
            });
        }
        if changes.transforms.contains(&idx) {
            self.connection
                .enqueue(transform_command(node, self.views.transform_at(idx)));
        }
        if changes.opacities.contains(&idx) {
            self.connection.enqueue(SessionCommand::SetOpacity {
                transform: node,
                opacity: self.views.opacity_at(idx),
            });
        }
        if changes.elevations.contains(&idx) {
            self.connection.enqueue(SessionCommand::SetElevation {
                transform: node,
                elevation: self.views.elevation_at(idx),
            });
        }
        if changes.properties.contains(&idx) {
            let size = self.views.size_at(idx);
            if size.width <= 0.0 || size.height <= 0.0 {
                if shown {
                    log::warn!(
                        "view {:?} has zero size {}x{}; deferring its viewport update",
                        self.views.view_at(idx),
                        size.width,
                        size.height
                    );
                }
                self.views.defer_properties(idx);
            } else {
                self.connection.enqueue(SessionCommand::SetViewportProperties {
                    viewport: self.views.viewport_at(idx),
                    properties: self.views.properties_at(idx),
                });
            }
        }
        if changes.hit_test.contains(&idx) {
            let command = if self.views.hit_testable_at(idx) {
                SessionCommand::SetInfiniteHitRegion {
                    transform: node,
                    interaction: HitTestInteraction::Default,
                }
            } else {
                SessionCommand::SetHitRegions {
                    transform: node,
                    regions: Vec::new(),
                }
            };
            self.connection.enqueue(command);
        }
    }
}

/// `SetTranslation` when `matrix` only translates, else `SetTransform`.
fn transform_command(transform: TransformId, matrix: Affine) -> SessionCommand {
    let [a, b, c, d, _, _] = matrix.as_coeffs();
    if a == 1.0 && b == 0.0 && c == 0.0 && d == 1.0 {
        SessionCommand::SetTranslation {
            transform,
            translation: matrix.translation(),
        }
    } else {
        SessionCommand::SetTransform { transform, matrix }
    }
}

fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
