// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A single frame-scoped paint layer.

use alloc::vec::Vec;

use kurbo::{Rect, Size};

use super::id::EmbedderLayerId;
use crate::canvas::{Canvas, CanvasSpy, Picture, PictureRecorder};
use crate::mutator::EmbeddedViewParams;
use crate::rtree::RTree;

/// One paint layer: the root background or the overlay above one embedded
/// view.
///
/// A layer records while the frame accumulates and is finalized exactly once
/// at submit, after which its canvas is gone and only the [`Picture`] (and
/// optional [`RTree`]) remain.
#[derive(Debug)]
pub struct EmbedderLayer {
    id: EmbedderLayerId,
    view_params: Option<EmbeddedViewParams>,
    surface_size: Size,
    recording: Option<CanvasSpy<PictureRecorder>>,
    did_draw: bool,
    picture: Option<Picture>,
    rtree: Option<RTree>,
}

impl EmbedderLayer {
    /// Creates a layer recording against a `surface_size` canvas.
    ///
    /// `build_rtree` controls whether [`hit_regions`](Self::hit_regions) can
    /// report anything after finalization.
    #[must_use]
    pub fn new(
        id: EmbedderLayerId,
        view_params: Option<EmbeddedViewParams>,
        surface_size: Size,
        build_rtree: bool,
    ) -> Self {
        let recorder = PictureRecorder::new(surface_size.to_rect(), build_rtree);
        Self {
            id,
            view_params,
            surface_size,
            recording: Some(CanvasSpy::new(recorder)),
            did_draw: false,
            picture: None,
            rtree: None,
        }
    }

    /// The layer's id.
    #[must_use]
    pub fn id(&self) -> EmbedderLayerId {
        self.id
    }

    /// Placement of the embedded view beneath this layer, if any.
    #[must_use]
    pub fn view_params(&self) -> Option<&EmbeddedViewParams> {
        self.view_params.as_ref()
    }

    /// Size of the surface this layer rasterizes into.
    #[must_use]
    pub fn surface_size(&self) -> Size {
        self.surface_size
    }

    /// The recording canvas.
    ///
    /// # Panics
    ///
    /// Panics if the layer has been finalized.
    pub fn canvas(&mut self) -> &mut dyn Canvas {
        match &mut self.recording {
            Some(spy) => spy.spying_canvas(),
            None => panic!("canvas requested for finalized layer {:?}", self.id),
        }
    }

    /// Returns whether anything visible was drawn into the layer.
    #[must_use]
    pub fn did_draw(&self) -> bool {
        self.recording
            .as_ref()
            .map_or(self.did_draw, CanvasSpy::did_draw_into_canvas)
    }

    /// Returns whether [`finalize`](Self::finalize) has run.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.recording.is_none()
    }

    /// Ends recording, keeping the picture and optional R-tree.
    ///
    /// # Panics
    ///
    /// Panics if called more than once.
    pub fn finalize(&mut self) {
        let Some(spy) = self.recording.take() else {
            panic!("layer {:?} finalized twice", self.id);
        };
        self.did_draw = spy.did_draw_into_canvas();
        let (picture, rtree) = spy.into_target().finish();
        self.picture = Some(picture);
        self.rtree = rtree;
    }

    /// The finalized picture.
    #[must_use]
    pub fn picture(&self) -> Option<&Picture> {
        self.picture.as_ref()
    }

    /// Disjoint rectangles covering what this layer drew, in surface
    /// coordinates. Empty when the layer was built without an R-tree.
    ///
    /// # Panics
    ///
    /// Panics if the layer has not been finalized.
    #[must_use]
    pub fn hit_regions(&self) -> Vec<Rect> {
        assert!(
            self.is_finalized(),
            "hit regions requested before layer {:?} was finalized",
            self.id
        );
        self.rtree.as_ref().map_or_else(Vec::new, |rtree| {
            rtree.search_non_overlapping_drawn_rects(self.surface_size.to_rect())
        })
    }
}
