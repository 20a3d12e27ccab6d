#![forbid(unsafe_code)]

//! Whole-recording overview summary.
//!
//! Everything an overview strip needs to draw itself, gathered in one pass:
//! the current viewport rectangle in recording coordinates, bad-channel
//! rows, visible annotation spans and event positions. The z-score raster
//! backing (available once precompute finishes) stays with the data window;
//! only its readiness is reported here.

use sigscope_core::{ChannelLayout, ViewExtent, ViewportState};
use sigscope_style::Rgba;

use crate::annotations::AnnotationEngine;
use crate::events::EventMarkers;

/// One annotation span in overview coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct OverviewSpan {
    /// Onset in seconds.
    pub onset: f64,
    /// End in seconds.
    pub offset: f64,
    /// Per-description color index.
    pub color_idx: usize,
}

/// Snapshot of the overview strip contents.
#[derive(Debug, Clone, PartialEq)]
pub struct OverviewMap {
    /// Viewport rectangle: `(t_start, t_stop, first_row, n_rows)`.
    pub view_rect: (f64, f64, usize, usize),
    /// Total extent: `(duration, n_channels)`.
    pub total: (f64, usize),
    /// Display-order rows of bad channels.
    pub bad_rows: Vec<usize>,
    /// Annotation spans after the visibility filter.
    pub annotations: Vec<OverviewSpan>,
    /// Event times with their render color.
    pub events: Vec<(f64, Rgba)>,
    /// True once the z-score background raster is available.
    pub zscore_ready: bool,
}

impl OverviewMap {
    /// Gather the overview snapshot.
    #[must_use]
    pub fn build(
        viewport: &ViewportState,
        ext: &ViewExtent,
        layout: &ChannelLayout,
        annotations: &AnnotationEngine,
        events: &EventMarkers,
        event_color: Rgba,
        zscore_ready: bool,
    ) -> Self {
        let bad_rows = layout
            .order
            .iter()
            .enumerate()
            .filter(|&(_, &idx)| layout.is_bad(idx))
            .map(|(row, _)| row)
            .collect();

        // The overview always spans the whole recording; the engine's
        // viewport filter is bypassed on purpose, only the per-description
        // visibility flags apply.
        let spans = annotations
            .visible_regions(0.0, ext.time_max())
            .into_iter()
            .map(|view| OverviewSpan {
                onset: view.onset,
                offset: view.offset,
                color_idx: view.color_idx,
            })
            .collect();

        let events = events
            .in_window(0.0, ext.time_max())
            .iter()
            .map(|m| (m.time, event_color))
            .collect();

        Self {
            view_rect: (
                viewport.t_start,
                viewport.t_stop(),
                viewport.ch_start,
                viewport.n_channels,
            ),
            total: (ext.time_max(), ext.total_channels),
            bad_rows,
            annotations: spans,
            events,
            zscore_ready,
        }
    }
}
