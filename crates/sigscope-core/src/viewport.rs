#![forbid(unsafe_code)]

//! The scrollable time/channel viewport and its navigation operations.
//!
//! [`ViewportState`] is pure data plus invariant checks: every mutation is a
//! synchronous navigation operation that clamps against the recording's
//! [`ViewExtent`] and returns [`Redraw`] flags for the owner to fan out.
//! Background loading never touches it.
//!
//! # Invariants
//!
//! 1. `0 <= t_start` and `t_start + duration <= time_max` after every
//!    operation.
//! 2. `0 <= ch_start` and `ch_start + n_channels <= total_channels + 1`
//!    (one padding row).
//! 3. `duration` never drops below three samples (one segment in segmented
//!    mode) and the visible channel window never drops below two display
//!    rows.
//!
//! Violations of these from the outside are programmer errors and trip
//! debug assertions; clamping inside the operations is the defined policy.

use crate::redraw::Redraw;
use crate::segments::SegmentLayout;
use crate::SelectionState;

/// Out-of-range sample handling for the resolved window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Clipping {
    /// Pass values through untouched.
    #[default]
    None,
    /// Truncate to half a display row in either direction.
    Clamp,
    /// Replace samples whose scaled magnitude exceeds the value with
    /// missing markers (NaN) instead of truncating.
    Value(f64),
}

/// Decimation factor selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Decimation {
    /// No decimation, exact passthrough.
    None,
    /// Fixed integer factor.
    Factor(usize),
    /// Derive the factor from the view pixel width so roughly five samples
    /// land on each pixel.
    #[default]
    Auto,
}

/// How a decimation window is reduced to output samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DownsampleMethod {
    /// Keep every ds-th sample. Cheapest, aliases.
    Subsample,
    /// Average non-overlapping windows.
    Mean,
    /// Two points (max, then min) per window: a sawtooth envelope that
    /// keeps transient spikes visible.
    #[default]
    Peak,
}

/// One scroll request, horizontal or vertical.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollStep {
    /// Back one full window.
    PageBack,
    /// Forward one full window.
    PageForward,
    /// Back one small step (quarter window, or one segment).
    StepBack,
    /// Forward one small step.
    StepForward,
    /// Relative units (wheel delta); scaled by the scroll sensitivity
    /// horizontally, rows vertically.
    Relative(f64),
}

/// Fixed geometry of the recording the viewport scrolls over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewExtent {
    /// Sampling frequency in Hz.
    pub sfreq: f64,
    /// Total samples on the concatenated time axis.
    pub total_samples: usize,
    /// Total channels in display order.
    pub total_channels: usize,
    /// Present for segmented (epoched) recordings.
    pub segments: Option<SegmentLayout>,
}

impl ViewExtent {
    /// Timestamp of the last sample.
    #[must_use]
    pub fn time_max(&self) -> f64 {
        self.total_samples.saturating_sub(1) as f64 / self.sfreq
    }

    /// Seconds per sample.
    #[must_use]
    pub fn sample_interval(&self) -> f64 {
        1.0 / self.sfreq
    }

    /// Bottom row coordinate: one padding row below the last channel.
    #[must_use]
    pub fn row_max(&self) -> usize {
        self.total_channels + 1
    }

    /// Smallest allowed window duration: three samples, or one segment.
    #[must_use]
    pub fn min_duration(&self) -> f64 {
        match &self.segments {
            Some(seg) => seg.segment_duration(),
            None => 3.0 * self.sample_interval(),
        }
    }
}

/// The currently visible time/channel sub-window plus display settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportState {
    /// Left edge of the time window in seconds.
    pub t_start: f64,
    /// Width of the time window in seconds.
    pub duration: f64,
    /// First visible display row.
    pub ch_start: usize,
    /// Number of visible channels (excluding the padding row).
    pub n_channels: usize,
    /// Number of whole segments shown (segmented mode only).
    pub n_segments_shown: usize,
    /// Trace amplitude multiplier.
    pub scale_factor: f64,
    /// Overlay all channels of a type at one row instead of separate rows.
    pub butterfly: bool,
    /// Out-of-range sample handling.
    pub clipping: Clipping,
    /// Decimation factor selection.
    pub decimation: Decimation,
    /// Decimation window reduction.
    pub downsample_method: DownsampleMethod,
    /// Subtract the per-channel mean over the visible window.
    pub remove_dc: bool,
    /// Wheel units per full window of horizontal scroll.
    pub scroll_sensitivity: f64,
}

impl ViewportState {
    /// Create a viewport at the origin, clamped into the extent.
    #[must_use]
    pub fn new(ext: &ViewExtent, duration: f64, n_channels: usize) -> Self {
        let duration = duration.clamp(ext.min_duration(), ext.time_max().max(ext.min_duration()));
        let n_channels = n_channels.clamp(1, ext.total_channels.max(1));
        let n_segments_shown = ext
            .segments
            .as_ref()
            .map_or(0, |seg| {
                ((duration / seg.segment_duration()).round() as usize).clamp(1, seg.n_segments)
            });
        let vp = Self {
            t_start: 0.0,
            duration,
            ch_start: 0,
            n_channels,
            n_segments_shown,
            scale_factor: 1.0,
            butterfly: false,
            clipping: Clipping::default(),
            decimation: Decimation::default(),
            downsample_method: DownsampleMethod::default(),
            remove_dc: true,
            scroll_sensitivity: 100.0,
        };
        vp.validate(ext);
        vp
    }

    /// Right edge of the time window.
    #[must_use]
    pub fn t_stop(&self) -> f64 {
        self.t_start + self.duration
    }

    /// `(t_start, t_stop)` in seconds.
    #[must_use]
    pub fn time_range(&self) -> (f64, f64) {
        (self.t_start, self.t_stop())
    }

    /// Sample range covered by the window, end-exclusive and clamped to the
    /// recording.
    #[must_use]
    pub fn sample_range(&self, ext: &ViewExtent) -> (usize, usize) {
        let start = (self.t_start * ext.sfreq).round() as usize;
        let stop = ((self.t_stop() * ext.sfreq).round() as usize + 1).min(ext.total_samples);
        (start.min(stop), stop)
    }

    /// Debug-check the viewport invariants against an extent.
    pub fn validate(&self, ext: &ViewExtent) {
        debug_assert!(self.t_start >= 0.0, "t_start {} < 0", self.t_start);
        debug_assert!(
            self.t_stop() <= ext.time_max() + 1e-9,
            "window [{}, {}] exceeds recording end {}",
            self.t_start,
            self.t_stop(),
            ext.time_max(),
        );
        debug_assert!(
            self.ch_start + self.n_channels <= ext.total_channels + 1,
            "channel window {}+{} exceeds {} channels",
            self.ch_start,
            self.n_channels,
            ext.total_channels,
        );
        debug_assert!(self.duration > 0.0, "non-positive duration");
        debug_assert!(self.n_channels >= 1, "empty channel window");
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Scroll the time window.
    ///
    /// A step that would push past either edge shifts the window to exactly
    /// touch that edge; the duration is preserved.
    pub fn hscroll(&mut self, step: ScrollStep, ext: &ViewExtent) -> Redraw {
        let small_step = match &ext.segments {
            Some(_) => self.duration / self.n_segments_shown.max(1) as f64,
            None => 0.25 * self.duration,
        };
        let rel_step = match step {
            ScrollStep::PageBack => -self.duration,
            ScrollStep::PageForward => self.duration,
            ScrollStep::StepBack => -small_step,
            ScrollStep::StepForward => small_step,
            ScrollStep::Relative(x) => {
                if ext.segments.is_some() {
                    x.signum() * small_step
                } else {
                    x * self.duration / self.scroll_sensitivity
                }
            }
        };

        let mut xmin = self.t_start + rel_step;
        if xmin < 0.0 {
            xmin = 0.0;
        } else if xmin + self.duration > ext.time_max() {
            xmin = (ext.time_max() - self.duration).max(0.0);
        }
        self.t_start = xmin;
        self.validate(ext);
        Redraw::horizontal()
    }

    /// Scroll the channel window.
    ///
    /// In grouped mode this is group-index arithmetic on `selection`; in
    /// butterfly mode it is a no-op; otherwise row arithmetic clamped to the
    /// channel order.
    pub fn vscroll(
        &mut self,
        step: ScrollStep,
        ext: &ViewExtent,
        selection: Option<&mut SelectionState>,
    ) -> Redraw {
        if let Some(sel) = selection {
            let delta = match step {
                ScrollStep::PageForward | ScrollStep::StepForward => 1,
                ScrollStep::PageBack | ScrollStep::StepBack => -1,
                ScrollStep::Relative(x) => x.round() as isize,
            };
            return if sel.scroll(delta) {
                Redraw::vertical()
            } else {
                Redraw::empty()
            };
        }
        if self.butterfly {
            return Redraw::empty();
        }

        let delta = match step {
            ScrollStep::PageForward => self.n_channels as isize,
            ScrollStep::PageBack => -(self.n_channels as isize),
            ScrollStep::StepForward => 1,
            ScrollStep::StepBack => -1,
            ScrollStep::Relative(x) => x.round() as isize,
        };
        let max_start = ext.total_channels.saturating_sub(self.n_channels) as isize;
        let next = (self.ch_start as isize + delta).clamp(0, max_start) as usize;
        if next == self.ch_start {
            return Redraw::empty();
        }
        self.ch_start = next;
        self.validate(ext);
        Redraw::vertical()
    }

    /// Grow or shrink the time window by `step` (fraction of the current
    /// duration, sign gives direction).
    ///
    /// Clamps to the minimum duration; expansion beyond the right edge
    /// pulls the left edge back instead of exceeding the recording.
    pub fn change_duration(&mut self, step: f64, ext: &ViewExtent) -> Redraw {
        let (min_dur, rel_step) = match &ext.segments {
            Some(seg) => {
                // Segmented mode grows/shrinks by whole segments.
                let dir: isize = if step > 0.0 { 1 } else { -1 };
                self.n_segments_shown = self
                    .n_segments_shown
                    .saturating_add_signed(dir)
                    .clamp(1, seg.n_segments);
                (
                    seg.segment_duration(),
                    seg.segment_duration() * dir as f64,
                )
            }
            None => (3.0 * ext.sample_interval(), self.duration * step),
        };

        let mut xmin = self.t_start;
        let mut xmax = self.t_stop() + rel_step;

        if xmax - xmin < min_dur {
            xmax = xmin + min_dur;
        }
        if xmax > ext.time_max() {
            let diff = xmax - ext.time_max();
            xmax = ext.time_max();
            xmin -= diff;
        }
        if xmin < 0.0 {
            xmin = 0.0;
        }

        self.t_start = xmin;
        self.duration = xmax - xmin;
        self.validate(ext);
        Redraw::horizontal()
    }

    /// Grow or shrink the channel window.
    ///
    /// The window never drops below two display rows; growth past the last
    /// row shifts the window up instead. No-op in butterfly mode.
    pub fn change_nchan(&mut self, step: ScrollStep, ext: &ViewExtent) -> Redraw {
        if self.butterfly {
            return Redraw::empty();
        }
        let delta = match step {
            ScrollStep::PageForward => self.n_channels as isize,
            ScrollStep::PageBack => -(self.n_channels as isize),
            ScrollStep::StepForward => 1,
            ScrollStep::StepBack => -1,
            ScrollStep::Relative(x) => x.round() as isize,
        };

        let mut ymin = self.ch_start as isize;
        let mut ymax = (self.ch_start + self.n_channels + 1) as isize + delta;
        if ymax > ext.row_max() as isize {
            ymax = ext.row_max() as isize;
            ymin -= delta;
        }
        if ymin < 0 {
            ymin = 0;
        }
        if ymax - ymin <= 2 {
            ymax = ymin + 2;
        }

        self.n_channels = (ymax - ymin - 1) as usize;
        let max_start = ext.total_channels.saturating_sub(self.n_channels);
        self.ch_start = (ymin as usize).min(max_start);
        self.validate(ext);
        Redraw::vertical()
    }

    /// Toggle butterfly mode.
    pub fn set_butterfly(&mut self, butterfly: bool) -> Redraw {
        if self.butterfly == butterfly {
            return Redraw::empty();
        }
        self.butterfly = butterfly;
        Redraw::full()
    }

    /// Multiply the trace amplitude scale.
    pub fn scale_all(&mut self, step: f64) -> Redraw {
        debug_assert!(step > 0.0, "non-positive scale step");
        self.scale_factor *= step;
        match self.clipping {
            // Clipping depends on the scaled values, so the window is stale.
            Clipping::Clamp | Clipping::Value(_) => Redraw::DATA | Redraw::TRACES,
            Clipping::None => Redraw::TRACES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extent() -> ViewExtent {
        // 20 s at 100 Hz, 10 channels.
        ViewExtent {
            sfreq: 100.0,
            total_samples: 2001,
            total_channels: 10,
            segments: None,
        }
    }

    fn viewport() -> ViewportState {
        ViewportState::new(&extent(), 5.0, 4)
    }

    #[test]
    fn page_forward_clamps_to_right_edge() {
        let ext = extent();
        let mut vp = viewport();
        vp.t_start = 13.0;
        // Attempting to land at t_start=18 with a 5 s window touches the
        // right edge exactly instead.
        vp.hscroll(ScrollStep::PageForward, &ext);
        assert_eq!(vp.t_start, 15.0);
        assert_eq!(vp.duration, 5.0);
    }

    #[test]
    fn page_back_clamps_to_zero() {
        let ext = extent();
        let mut vp = viewport();
        vp.t_start = 2.0;
        vp.hscroll(ScrollStep::PageBack, &ext);
        assert_eq!(vp.t_start, 0.0);
        assert_eq!(vp.duration, 5.0);
    }

    #[test]
    fn step_is_quarter_window() {
        let ext = extent();
        let mut vp = viewport();
        vp.hscroll(ScrollStep::StepForward, &ext);
        assert_eq!(vp.t_start, 1.25);
    }

    #[test]
    fn relative_scroll_uses_sensitivity() {
        let ext = extent();
        let mut vp = viewport();
        vp.hscroll(ScrollStep::Relative(10.0), &ext);
        assert!((vp.t_start - 0.5).abs() < 1e-12);
    }

    #[test]
    fn vscroll_clamps_to_channel_count() {
        let ext = extent();
        let mut vp = viewport();
        vp.vscroll(ScrollStep::Relative(100.0), &ext, None);
        assert_eq!(vp.ch_start, 6);
        vp.vscroll(ScrollStep::Relative(-100.0), &ext, None);
        assert_eq!(vp.ch_start, 0);
    }

    #[test]
    fn vscroll_noop_in_butterfly() {
        let ext = extent();
        let mut vp = viewport();
        vp.butterfly = true;
        assert_eq!(vp.vscroll(ScrollStep::PageForward, &ext, None), Redraw::empty());
        assert_eq!(vp.ch_start, 0);
    }

    #[test]
    fn vscroll_delegates_to_selection() {
        use crate::channels::{ChannelGroup, SelectionState};
        let ext = extent();
        let mut vp = viewport();
        let mut sel = SelectionState::new(vec![
            ChannelGroup {
                name: "A".into(),
                picks: vec![0, 1],
            },
            ChannelGroup {
                name: "B".into(),
                picks: vec![2, 3],
            },
        ]);
        let flags = vp.vscroll(ScrollStep::PageForward, &ext, Some(&mut sel));
        assert_eq!(sel.current_idx(), 1);
        assert_eq!(flags, Redraw::vertical());
        // Row window untouched in grouped mode.
        assert_eq!(vp.ch_start, 0);
    }

    #[test]
    fn change_duration_respects_minimum() {
        let ext = extent();
        let mut vp = viewport();
        for _ in 0..50 {
            vp.change_duration(-0.5, &ext);
        }
        assert!(vp.duration >= ext.min_duration());
        assert!(vp.duration <= ext.time_max());
    }

    #[test]
    fn change_duration_pulls_left_edge_back() {
        let ext = extent();
        let mut vp = viewport();
        vp.t_start = 15.0;
        vp.change_duration(0.5, &ext);
        // 5 s window at 15 s grows by 2.5 s: right edge pinned at 20,
        // left edge pulled back.
        assert_eq!(vp.t_stop(), ext.time_max());
        assert!((vp.t_start - 12.5).abs() < 1e-9);
    }

    #[test]
    fn change_nchan_keeps_two_rows() {
        let ext = extent();
        let mut vp = viewport();
        for _ in 0..20 {
            vp.change_nchan(ScrollStep::StepBack, &ext);
        }
        assert_eq!(vp.n_channels, 1);
    }

    #[test]
    fn change_nchan_page_shifts_up_at_bottom() {
        let ext = extent();
        let mut vp = viewport();
        vp.ch_start = 8;
        vp.n_channels = 2;
        vp.change_nchan(ScrollStep::PageForward, &ext);
        assert!(vp.ch_start + vp.n_channels <= ext.total_channels + 1);
        assert!(vp.n_channels > 2);
    }

    #[test]
    fn segmented_scroll_steps_one_segment() {
        let seg = SegmentLayout::new(10, 100, 100.0);
        let ext = ViewExtent {
            sfreq: 100.0,
            total_samples: 1000,
            total_channels: 5,
            segments: Some(seg),
        };
        let mut vp = ViewportState::new(&ext, 2.0, 3);
        assert_eq!(vp.n_segments_shown, 2);
        vp.hscroll(ScrollStep::StepForward, &ext);
        assert!((vp.t_start - 1.0).abs() < 1e-12);
    }

    #[test]
    fn segmented_duration_steps_whole_segments() {
        let seg = SegmentLayout::new(10, 100, 100.0);
        let ext = ViewExtent {
            sfreq: 100.0,
            total_samples: 1000,
            total_channels: 5,
            segments: Some(seg),
        };
        let mut vp = ViewportState::new(&ext, 2.0, 3);
        vp.change_duration(1.0, &ext);
        assert_eq!(vp.n_segments_shown, 3);
        assert!((vp.duration - 3.0).abs() < 1e-12);
    }

    #[test]
    fn sample_range_covers_window() {
        let ext = extent();
        let vp = viewport();
        let (start, stop) = vp.sample_range(&ext);
        assert_eq!(start, 0);
        assert_eq!(stop, 501);
    }

    #[test]
    fn scale_all_multiplies() {
        let mut vp = viewport();
        vp.scale_all(2.0);
        vp.scale_all(2.0);
        assert_eq!(vp.scale_factor, 4.0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_step() -> impl Strategy<Value = ScrollStep> {
            prop_oneof![
                Just(ScrollStep::PageBack),
                Just(ScrollStep::PageForward),
                Just(ScrollStep::StepBack),
                Just(ScrollStep::StepForward),
                (-50.0f64..50.0).prop_map(ScrollStep::Relative),
            ]
        }

        proptest! {
            #[test]
            fn invariants_hold_under_any_navigation(
                ops in proptest::collection::vec((0u8..4, arb_step(), -0.9f64..0.9), 1..40)
            ) {
                let ext = extent();
                let mut vp = viewport();
                for (op, step, frac) in ops {
                    match op {
                        0 => { vp.hscroll(step, &ext); }
                        1 => { vp.vscroll(step, &ext, None); }
                        2 => { vp.change_duration(frac, &ext); }
                        _ => { vp.change_nchan(step, &ext); }
                    }
                    prop_assert!(vp.t_start >= 0.0);
                    prop_assert!(vp.t_stop() <= ext.time_max() + 1e-9);
                    prop_assert!(vp.duration >= ext.min_duration() - 1e-12);
                    prop_assert!(vp.ch_start + vp.n_channels <= ext.total_channels + 1);
                    prop_assert!(vp.n_channels >= 1);
                }
            }
        }
    }
}
