#![forbid(unsafe_code)]

//! Value readout under the pointer.
//!
//! Given view coordinates `(time, row)`, find the single trace within half
//! a row, look up the sample at that time and invert the display
//! normalization to report the value in the channel's own unit.

use sigscope_core::{ChannelLayout, ViewExtent, ViewportState};

use crate::traces::TraceSet;

/// A resolved probe hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReading {
    /// Native channel index.
    pub ch_idx: usize,
    /// Probed time; relative to the segment start in segmented mode.
    pub time: f64,
    /// Normalized row value as drawn (trace offset not included).
    pub row_value: f64,
    /// Value in display units.
    pub display_value: f64,
    /// Display unit label.
    pub unit: &'static str,
}

/// Probe the resolved window at view coordinates `(x, y)`.
///
/// `times`/`data` are the current window buffer; rows correspond to the
/// trace set's `range_idx`. Returns `None` between traces, on ambiguous
/// (overlaid) rows, or outside the window.
#[must_use]
pub fn probe(
    traces: &TraceSet,
    times: &[f64],
    data: &[Vec<f64>],
    layout: &ChannelLayout,
    viewport: &ViewportState,
    ext: &ViewExtent,
    x: f64,
    y: f64,
) -> Option<ProbeReading> {
    let ch_idx = traces.channel_at_row(y)?;
    let entry = traces.entries().iter().find(|e| e.ch_idx == ch_idx)?;
    if times.is_empty() {
        return None;
    }
    let idx = times.partition_point(|&t| t < x);
    if idx >= times.len() {
        return None;
    }
    let row_value = *data.get(entry.range_idx)?.get(idx)?;

    // Inverse of the display normalization. Butterfly rows span a full
    // row per scaling unit, regular rows half of one.
    let scaler = if viewport.butterfly { 1.0 } else { 2.0 };
    let ch_type = layout.types[ch_idx];
    let inv_norm =
        scaler * layout.scaling(ch_type) * layout.unit_scaling(ch_type) / viewport.scale_factor;

    let time = match &ext.segments {
        Some(seg) => times[idx] % seg.segment_duration(),
        None => times[idx],
    };

    Some(ProbeReading {
        ch_idx,
        time,
        row_value,
        display_value: row_value * inv_norm,
        unit: ch_type.unit(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traces::TraceParams;
    use sigscope_core::ChannelType;
    use sigscope_style::{ColorResolver, Theme};

    fn fixtures() -> (ViewExtent, ChannelLayout, ViewportState, TraceSet) {
        let ext = ViewExtent {
            sfreq: 100.0,
            total_samples: 2001,
            total_channels: 4,
            segments: None,
        };
        let layout = ChannelLayout::new(
            (0..4).map(|i| format!("EEG {i:03}")).collect(),
            vec![ChannelType::Eeg; 4],
            100.0,
        );
        let vp = ViewportState::new(&ext, 5.0, 4);
        let mut traces = TraceSet::default();
        let mut resolver = ColorResolver::new(Theme::default(), false);
        traces.sync(
            &TraceParams {
                viewport: &vp,
                layout: &layout,
                selection: None,
                epoch_colors: None,
            },
            &mut resolver,
        );
        (ext, layout, vp, traces)
    }

    #[test]
    fn probe_reads_value_under_pointer() {
        let (ext, layout, vp, traces) = fixtures();
        let times: Vec<f64> = (0..501).map(|i| i as f64 / 100.0).collect();
        let mut data = vec![vec![0.0; 501]; 4];
        data[1][200] = 0.25;

        let reading = probe(&traces, &times, &data, &layout, &vp, &ext, 2.0, 2.2).unwrap();
        assert_eq!(reading.ch_idx, 1);
        assert_eq!(reading.row_value, 0.25);
        // 0.25 rows * 2 * 20e-6 V/row * 1e6 µV/V = 10 µV.
        assert!((reading.display_value - 10.0).abs() < 1e-9);
        assert_eq!(reading.unit, "µV");
    }

    #[test]
    fn probe_misses_between_rows() {
        let (ext, layout, vp, traces) = fixtures();
        let times = vec![0.0, 1.0];
        let data = vec![vec![0.0; 2]; 4];
        assert!(probe(&traces, &times, &data, &layout, &vp, &ext, 0.5, 1.5).is_none());
    }

    #[test]
    fn probe_respects_scale_factor() {
        let (ext, layout, mut vp, traces) = fixtures();
        vp.scale_factor = 2.0;
        let times = vec![0.0];
        let data = vec![vec![0.5]; 4];
        let reading = probe(&traces, &times, &data, &layout, &vp, &ext, 0.0, 1.0).unwrap();
        // Doubling the visual scale halves the physical value per row.
        assert!((reading.display_value - 10.0).abs() < 1e-9);
    }

    #[test]
    fn probe_past_window_end_misses() {
        let (ext, layout, vp, traces) = fixtures();
        let times = vec![0.0, 1.0];
        let data = vec![vec![0.0; 2]; 4];
        assert!(probe(&traces, &times, &data, &layout, &vp, &ext, 5.0, 1.0).is_none());
    }
}
