#![forbid(unsafe_code)]

//! The interactive browsing unit.
//!
//! [`Browser`] owns the viewport, data window, trace set, annotation
//! engine, cursor and event layers, plus the precompute loader. Every
//! mutation funnels through a navigation method that fans the update out
//! explicitly: viewport change → data window re-resolve → trace re-sync.
//! Nothing here blocks except a live viewport-sized fetch; the loader
//! communicates only through [`Browser::poll`].
//!
//! The annotation store stays with the host and is passed into the
//! annotation methods, keeping the engine's commit path the single writer.

use std::sync::Arc;
use std::time::Duration;

use sigscope_core::{
    ChannelLayout, ChunkTransform, DataSource, FetchError, Redraw, ScrollStep, SegmentLayout,
    SelectionState, TransformContext, ViewExtent, ViewportState,
};
use sigscope_data::{
    DataWindow, LoadEvent, LoadJob, MemoryProbe, PrecomputeLoader, PrecomputePolicy,
    ResolveParams, ZscoreRaster, should_precompute,
};
use sigscope_style::{ColorResolver, Rgba, Theme, is_dark_background};
use sigscope_view::{
    AnnotationEngine, CursorLine, EpochColorMatrix, EventMarker, EventMarkers, OverviewMap,
    ProbeReading, TimeCursor, TraceParams, TraceSet, probe, visible_picks,
};

use crate::settings::DisplaySettings;

/// Wait granted to the loader when a browser closes.
const SHUTDOWN_WAIT: Duration = Duration::from_secs(3);

/// One open browsing session over a recording.
pub struct Browser {
    source: Arc<dyn DataSource + Send + Sync>,
    transform: Arc<dyn ChunkTransform + Send + Sync>,
    layout: ChannelLayout,
    extent: ViewExtent,
    viewport: ViewportState,
    selection: Option<SelectionState>,
    window: DataWindow,
    traces: TraceSet,
    annotations: AnnotationEngine,
    cursor: TimeCursor,
    events: EventMarkers,
    resolver: ColorResolver,
    epoch_colors: Option<EpochColorMatrix>,
    loader: Option<PrecomputeLoader>,
    precompute_policy: PrecomputePolicy,
    pixel_width: usize,
    last_fetch_error: Option<FetchError>,
}

impl Browser {
    /// Open a browser over a recording.
    ///
    /// `background` is the host's actual render background; dark mode is
    /// detected from it unless the settings force a mode.
    pub fn new(
        source: Arc<dyn DataSource + Send + Sync>,
        transform: Arc<dyn ChunkTransform + Send + Sync>,
        layout: ChannelLayout,
        segments: Option<SegmentLayout>,
        settings: &DisplaySettings,
        background: Rgba,
    ) -> Self {
        let extent = ViewExtent {
            sfreq: layout.sfreq,
            total_samples: source.n_samples(),
            total_channels: layout.len(),
            segments,
        };
        let mut viewport = ViewportState::new(&extent, settings.duration, settings.n_channels);
        settings.apply(&mut viewport);
        let dark = settings
            .dark_mode
            .unwrap_or_else(|| is_dark_background(background));
        let annotations = AnnotationEngine::new(layout.names.clone(), extent.time_max());

        let mut browser = Self {
            source,
            transform,
            layout,
            extent,
            viewport,
            selection: None,
            window: DataWindow::new(TransformContext::default()),
            traces: TraceSet::default(),
            annotations,
            cursor: TimeCursor::default(),
            events: EventMarkers::default(),
            resolver: ColorResolver::new(Theme::default(), dark),
            epoch_colors: None,
            loader: None,
            precompute_policy: settings.precompute,
            pixel_width: 1920,
            last_fetch_error: None,
        };
        browser.update(Redraw::full());
        browser
    }

    // -- accessors ------------------------------------------------------

    /// Current viewport state.
    #[must_use]
    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    /// Recording geometry.
    #[must_use]
    pub fn extent(&self) -> &ViewExtent {
        &self.extent
    }

    /// Channel metadata.
    #[must_use]
    pub fn layout(&self) -> &ChannelLayout {
        &self.layout
    }

    /// The resolved buffer for drawing: `(times, data)`.
    #[must_use]
    pub fn buffer(&self) -> (&[f64], &[Vec<f64>]) {
        (self.window.times(), self.window.data())
    }

    /// Visible traces.
    #[must_use]
    pub fn traces(&self) -> &TraceSet {
        &self.traces
    }

    /// The annotation engine (all region edits go through it).
    pub fn annotations_mut(&mut self) -> &mut AnnotationEngine {
        &mut self.annotations
    }

    /// Read access to the annotation engine.
    #[must_use]
    pub fn annotations(&self) -> &AnnotationEngine {
        &self.annotations
    }

    /// The time cursor.
    pub fn cursor_mut(&mut self) -> &mut TimeCursor {
        &mut self.cursor
    }

    /// Cursor lines for the current viewport.
    #[must_use]
    pub fn cursor_lines(&self) -> Vec<CursorLine> {
        self.cursor.lines(&self.viewport, &self.extent)
    }

    /// Replace the event layer.
    pub fn set_events(&mut self, markers: Vec<EventMarker>) {
        self.events = EventMarkers::new(markers);
    }

    /// Event markers in the current window.
    #[must_use]
    pub fn events_in_view(&self) -> &[EventMarker] {
        let (t0, t1) = self.viewport.time_range();
        self.events.in_window(t0, t1)
    }

    /// Segment color assignments (segmented mode).
    pub fn set_epoch_colors(&mut self, colors: EpochColorMatrix) -> Redraw {
        self.epoch_colors = Some(colors);
        self.refresh_trace_colors();
        Redraw::TRACES
    }

    /// Grouped browsing state; `Some` switches to one-group-at-a-time.
    pub fn set_selection(&mut self, selection: Option<SelectionState>) -> Redraw {
        self.selection = selection;
        self.update(Redraw::full());
        Redraw::full()
    }

    /// The error from the most recent failed fetch, if any.
    pub fn take_fetch_error(&mut self) -> Option<FetchError> {
        self.last_fetch_error.take()
    }

    /// View width in pixels, feeding automatic decimation.
    pub fn set_pixel_width(&mut self, width: usize) -> Redraw {
        if self.pixel_width == width {
            return Redraw::empty();
        }
        self.pixel_width = width;
        self.update(Redraw::DATA);
        Redraw::DATA
    }

    // -- navigation -----------------------------------------------------

    /// Scroll the time window.
    pub fn hscroll(&mut self, step: ScrollStep) -> Redraw {
        let flags = self.viewport.hscroll(step, &self.extent);
        self.update(flags);
        flags
    }

    /// Scroll the channel window.
    pub fn vscroll(&mut self, step: ScrollStep) -> Redraw {
        let flags = self
            .viewport
            .vscroll(step, &self.extent, self.selection.as_mut());
        self.update(flags);
        flags
    }

    /// Grow or shrink the time window.
    pub fn change_duration(&mut self, step: f64) -> Redraw {
        let flags = self.viewport.change_duration(step, &self.extent);
        self.update(flags);
        flags
    }

    /// Grow or shrink the channel window.
    pub fn change_nchan(&mut self, step: ScrollStep) -> Redraw {
        let flags = self.viewport.change_nchan(step, &self.extent);
        self.update(flags);
        flags
    }

    /// Toggle butterfly mode.
    pub fn toggle_butterfly(&mut self) -> Redraw {
        let flags = self.viewport.set_butterfly(!self.viewport.butterfly);
        self.update(flags);
        flags
    }

    /// Multiply the amplitude scale.
    pub fn scale_all(&mut self, step: f64) -> Redraw {
        let flags = self.viewport.scale_all(step);
        self.update(flags);
        flags
    }

    /// Toggle DC removal.
    pub fn toggle_dc(&mut self) -> Redraw {
        self.viewport.remove_dc = !self.viewport.remove_dc;
        self.update(Redraw::DATA);
        Redraw::DATA
    }

    /// Toggle the bad status of the channel at `ch_idx`.
    pub fn toggle_bad_channel(&mut self, ch_idx: usize) -> Redraw {
        let bad = self.layout.toggle_bad(ch_idx);
        tracing::debug!(ch_idx, bad, "bad-channel toggle");
        self.refresh_trace_colors();
        Redraw::TRACES | Redraw::OVERVIEW | Redraw::YAXIS
    }

    // -- precompute -----------------------------------------------------

    /// Start the background precompute if the policy allows it.
    pub fn enable_precompute(&mut self, probe: &dyn MemoryProbe) {
        if !should_precompute(self.precompute_policy, probe) {
            return;
        }
        let job = self.load_job();
        let loader = self
            .loader
            .get_or_insert_with(|| PrecomputeLoader::new(job.clone()));
        loader.rerun(job);
    }

    /// The host's processing chain changed: drop the cache, bump the
    /// context and (if precompute ran) load again.
    pub fn transform_changed(&mut self, ctx: TransformContext) -> Redraw {
        self.window.set_ctx(ctx);
        let job = self.load_job();
        if let Some(loader) = &mut self.loader {
            loader.rerun(job);
        }
        self.update(Redraw::DATA);
        Redraw::DATA
    }

    /// Drain loader notifications; call once per interactive tick.
    ///
    /// Installs a finished cache (after which the window stops fetching)
    /// and re-resolves the current view from it.
    pub fn poll(&mut self) -> Redraw {
        let Some(loader) = &mut self.loader else {
            return Redraw::empty();
        };
        let mut flags = Redraw::empty();
        for event in loader.poll() {
            match event {
                LoadEvent::Progress(f) => {
                    tracing::debug!(fraction = f, "precompute progress");
                }
                LoadEvent::Finished(cache) => {
                    if self.window.install_cache(cache) {
                        tracing::info!("precompute finished, serving from cache");
                        flags |= Redraw::DATA | Redraw::OVERVIEW;
                    }
                }
                LoadEvent::Failed(e) => {
                    tracing::warn!(error = %e, "precompute failed, staying on live fetch");
                }
            }
        }
        self.update(flags);
        flags
    }

    /// Progress fraction of the running load.
    #[must_use]
    pub fn precompute_progress(&self) -> f64 {
        self.loader.as_ref().map_or(0.0, PrecomputeLoader::progress)
    }

    /// True once viewport changes are served from the cache.
    #[must_use]
    pub fn precompute_ready(&self) -> bool {
        self.window.is_precomputed()
    }

    /// The z-score overview raster, once available.
    #[must_use]
    pub fn zscore(&self) -> Option<&ZscoreRaster> {
        self.window.zscore()
    }

    /// Release resources; the loader gets a bounded wait.
    pub fn shutdown(&mut self) {
        if let Some(loader) = &mut self.loader {
            loader.shutdown(SHUTDOWN_WAIT);
        }
        self.loader = None;
    }

    // -- readouts -------------------------------------------------------

    /// Probe the resolved buffer at view coordinates.
    #[must_use]
    pub fn probe_at(&self, x: f64, y: f64) -> Option<ProbeReading> {
        probe(
            &self.traces,
            self.window.times(),
            self.window.data(),
            &self.layout,
            &self.viewport,
            &self.extent,
            x,
            y,
        )
    }

    /// Build the overview snapshot.
    #[must_use]
    pub fn overview(&mut self) -> OverviewMap {
        let event_color = self.resolver.event_color();
        OverviewMap::build(
            &self.viewport,
            &self.extent,
            &self.layout,
            &self.annotations,
            &self.events,
            event_color,
            self.window.zscore().is_some(),
        )
    }

    // -- internals ------------------------------------------------------

    fn load_job(&self) -> LoadJob {
        let picks = self.layout.all_picks();
        let scalings = picks
            .iter()
            .map(|&p| 2.0 * self.layout.scaling(self.layout.types[p]))
            .collect();
        LoadJob {
            source: Arc::clone(&self.source),
            transform: Arc::clone(&self.transform),
            picks,
            scalings,
            ctx: self.window.ctx(),
            max_pixel_width: self.pixel_width,
        }
    }

    fn trace_params(&self) -> TraceParams<'_> {
        TraceParams {
            viewport: &self.viewport,
            layout: &self.layout,
            selection: self.selection.as_ref(),
            epoch_colors: self.epoch_colors.as_ref(),
        }
    }

    fn refresh_trace_colors(&mut self) {
        let params = TraceParams {
            viewport: &self.viewport,
            layout: &self.layout,
            selection: self.selection.as_ref(),
            epoch_colors: self.epoch_colors.as_ref(),
        };
        self.traces.refresh_colors(&params, &mut self.resolver);
    }

    /// Fan a viewport change out to the derived state.
    fn update(&mut self, flags: Redraw) {
        if flags.contains(Redraw::TRACES) {
            let params = TraceParams {
                viewport: &self.viewport,
                layout: &self.layout,
                selection: self.selection.as_ref(),
                epoch_colors: self.epoch_colors.as_ref(),
            };
            self.traces.sync(&params, &mut self.resolver);
        }
        if flags.contains(Redraw::DATA) {
            // The same row order the trace set maps `range_idx` against.
            let picks = visible_picks(&self.trace_params());
            let params = ResolveParams {
                viewport: &self.viewport,
                extent: &self.extent,
                layout: &self.layout,
                picks: &picks,
                pixel_width: self.pixel_width,
            };
            if let Err(e) =
                self.window
                    .resolve(&params, self.source.as_ref(), self.transform.as_ref())
            {
                tracing::warn!(error = %e, "fetch failed, keeping last buffer");
                self.last_fetch_error = Some(e);
            }
        }
    }
}

impl Drop for Browser {
    fn drop(&mut self) {
        self.shutdown();
    }
}
