// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Embedder configuration.

/// Configuration for the [`ExternalViewEmbedder`](crate::embedder::ExternalViewEmbedder).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EmbedderConfig {
    /// Build an R-tree per layer and replace each layer's full-surface hit
    /// region with the disjoint rectangles it actually drew.
    pub hit_regions: bool,
    /// Place a full-frame, semantically invisible hit region above all
    /// content so the shell receives every input event.
    pub intercept_all_input: bool,
    /// Depth added per image layer. The smallest increment the compositor
    /// resolves without z-fighting.
    pub layer_elevation_step: f64,
    /// Depth reserved for each platform view, added to every layer above it.
    pub platform_view_elevation: f64,
    /// Depth of the input interceptor above the topmost platform view.
    pub input_interceptor_elevation: f64,
    /// Presents allowed before the compositor first returns credits.
    pub initial_present_credits: u32,
}

impl EmbedderConfig {
    /// Default configuration: precise hit regions, no input interception.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            hit_regions: true,
            intercept_all_input: false,
            layer_elevation_step: 0.0001,
            platform_view_elevation: 100.0,
            input_interceptor_elevation: 500.0,
            initial_present_credits: 1,
        }
    }

    /// Configuration for shells that route all input themselves (e.g. when
    /// embedded in a host that performs its own hit testing).
    #[must_use]
    pub const fn with_input_interception() -> Self {
        Self {
            intercept_all_input: true,
            ..Self::new()
        }
    }
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self::new()
    }
}
