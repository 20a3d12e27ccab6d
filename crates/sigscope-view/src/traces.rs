#![forbid(unsafe_code)]

//! Mapping from screen rows to data channels.
//!
//! One [`TraceEntry`] exists per visible channel. On every viewport or
//! selection change the set is re-synced: entries whose channel stays
//! visible are updated in place, entries whose channel scrolled away are
//! recycled onto newly visible channels by explicit re-index. Recycling
//! bounds allocation churn; an entry is never silently reused for an
//! unrelated channel.
//!
//! In segmented mode a channel's color can vary along the time axis (one
//! color per segment). A curve carries one color, so each parent entry owns
//! child entries, one per additional distinct color the channel exhibits
//! across the whole recording; the child count grows and shrinks with the
//! color assignments.

use sigscope_core::{ChannelLayout, SelectionState, ViewportState};
use sigscope_style::{ColorResolver, Rgba};

/// Per-channel, per-segment color assignments (segmented mode).
#[derive(Debug, Clone, Default)]
pub struct EpochColorMatrix {
    /// `colors[ch_idx][segment]`, native channel order.
    pub colors: Vec<Vec<Rgba>>,
}

impl EpochColorMatrix {
    /// Distinct colors of one channel across the whole recording, in
    /// first-seen order.
    #[must_use]
    pub fn distinct(&self, ch_idx: usize) -> Vec<Rgba> {
        let mut seen = Vec::new();
        if let Some(row) = self.colors.get(ch_idx) {
            for &c in row {
                if !seen.contains(&c) {
                    seen.push(c);
                }
            }
        }
        seen
    }
}

/// A child curve covering one additional color of its parent channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildTrace {
    /// Render color of this segment set.
    pub color: Rgba,
}

/// One visible channel row.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEntry {
    /// Native channel index.
    pub ch_idx: usize,
    /// Row index within the resolved data window.
    pub range_idx: usize,
    /// Position in the display order (stable across scrolling).
    pub order_idx: usize,
    /// Vertical screen position in row units.
    pub ypos: f64,
    /// Render color.
    pub color: Rgba,
    /// Whether the channel is currently marked bad.
    pub is_bad: bool,
    /// Extra color segments (segmented mode only).
    pub children: Vec<ChildTrace>,
}

/// Inputs to one trace sync.
pub struct TraceParams<'a> {
    /// Current viewport.
    pub viewport: &'a ViewportState,
    /// Channel metadata.
    pub layout: &'a ChannelLayout,
    /// Grouped browsing state, if active.
    pub selection: Option<&'a SelectionState>,
    /// Per-segment colors, if the recording is segmented.
    pub epoch_colors: Option<&'a EpochColorMatrix>,
}

/// The set of visible traces.
#[derive(Debug, Default)]
pub struct TraceSet {
    entries: Vec<TraceEntry>,
}

impl TraceSet {
    /// Current entries, unordered with respect to rows.
    #[must_use]
    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    /// Native channel index shown at screen row `row`, if any.
    #[must_use]
    pub fn channel_at_row(&self, row: f64) -> Option<usize> {
        let mut hits = self
            .entries
            .iter()
            .filter(|e| (e.ypos - row).abs() < 0.5);
        let first = hits.next()?;
        // Ambiguous rows (butterfly overlays) identify no single channel.
        if hits.next().is_some() {
            return None;
        }
        Some(first.ch_idx)
    }

    /// Screen row of a native channel index, if visible.
    #[must_use]
    pub fn row_of(&self, ch_idx: usize) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.ch_idx == ch_idx)
            .map(|e| e.ypos)
    }

    /// `(row, name)` pairs for axis labeling, sorted by row.
    #[must_use]
    pub fn axis_labels<'a>(&self, layout: &'a ChannelLayout) -> Vec<(f64, &'a str)> {
        let mut labels: Vec<(f64, &str)> = self
            .entries
            .iter()
            .map(|e| (e.ypos, layout.names[e.ch_idx].as_str()))
            .collect();
        labels.sort_by(|a, b| a.0.total_cmp(&b.0));
        labels
    }

    /// Recompute the visible set, recycling freed entries.
    pub fn sync(&mut self, params: &TraceParams<'_>, resolver: &mut ColorResolver) {
        let picks = visible_picks(params);

        // Partition: entries still on a visible channel vs. recyclable.
        let (mut kept, mut free): (Vec<TraceEntry>, Vec<TraceEntry>) = self
            .entries
            .drain(..)
            .partition(|e| picks.contains(&e.ch_idx));
        let mut missing: Vec<usize> = picks
            .iter()
            .copied()
            .filter(|p| !kept.iter().any(|e| e.ch_idx == *p))
            .collect();

        // Shrink: drop surplus freed entries outright.
        free.truncate(missing.len());
        // Grow: blank entries for channels no freed entry covers.
        while free.len() < missing.len() {
            free.push(TraceEntry {
                ch_idx: 0,
                range_idx: 0,
                order_idx: 0,
                ypos: 0.0,
                color: Rgba::BLACK,
                is_bad: false,
                children: Vec::new(),
            });
        }
        // Recycle: re-index every freed entry onto a newly needed channel.
        for (entry, ch_idx) in free.iter_mut().zip(missing) {
            entry.ch_idx = ch_idx;
            entry.children.clear();
        }

        kept.append(&mut free);
        for entry in &mut kept {
            refresh_entry(entry, &picks, params, resolver);
        }
        self.entries = kept;
    }

    /// Re-resolve colors only (theme flip, bad-channel toggle, segment
    /// recoloring), keeping the row mapping.
    pub fn refresh_colors(&mut self, params: &TraceParams<'_>, resolver: &mut ColorResolver) {
        for entry in &mut self.entries {
            entry.is_bad = params.layout.is_bad(entry.ch_idx);
            apply_colors(entry, params, resolver);
        }
    }
}

/// Channels that should be visible, in row order.
///
/// This is the row order the resolved data window must follow: an entry's
/// `range_idx` is its channel's position in this list.
#[must_use]
pub fn visible_picks(params: &TraceParams<'_>) -> Vec<usize> {
    if let Some(selection) = params.selection {
        return selection.current().picks.clone();
    }
    if params.viewport.butterfly {
        params.layout.all_picks()
    } else {
        params
            .layout
            .picks(params.viewport.ch_start, params.viewport.n_channels)
    }
}

fn refresh_entry(
    entry: &mut TraceEntry,
    picks: &[usize],
    params: &TraceParams<'_>,
    resolver: &mut ColorResolver,
) {
    entry.range_idx = picks
        .iter()
        .position(|&p| p == entry.ch_idx)
        .expect("entry channel not in picks");
    entry.order_idx = params.layout.order_idx(entry.ch_idx);
    entry.is_bad = params.layout.is_bad(entry.ch_idx);
    entry.ypos = ypos_for(entry, params);
    apply_colors(entry, params, resolver);
}

fn ypos_for(entry: &TraceEntry, params: &TraceParams<'_>) -> f64 {
    let vp = params.viewport;
    if vp.butterfly {
        if let Some(selection) = params.selection {
            // One row per group; every channel of a group overlays there.
            let group = selection
                .groups()
                .iter()
                .position(|g| g.picks.contains(&entry.ch_idx))
                .unwrap_or(0);
            return (group + 1) as f64;
        }
        let ch_type = params.layout.types[entry.ch_idx];
        let type_row = params
            .layout
            .butterfly_type_order()
            .iter()
            .position(|&t| t == ch_type)
            .unwrap_or(0);
        (type_row + 1) as f64
    } else if params.selection.is_some() {
        // Grouped mode shows one group starting at the top.
        (entry.range_idx + 1) as f64
    } else {
        (entry.range_idx + vp.ch_start + 1) as f64
    }
}

fn apply_colors(entry: &mut TraceEntry, params: &TraceParams<'_>, resolver: &mut ColorResolver) {
    if let Some(matrix) = params.epoch_colors {
        // Segmented mode: parent takes the first distinct color, children
        // track the rest. Bad channels keep their uniform bad color via
        // the matrix the owner maintains.
        let distinct = matrix.distinct(entry.ch_idx);
        if let Some((&first, rest)) = distinct.split_first() {
            entry.color = resolver.resolve(first);
            let wanted = rest.len();
            entry.children.truncate(wanted);
            while entry.children.len() < wanted {
                entry.children.push(ChildTrace {
                    color: Rgba::TRANSPARENT,
                });
            }
            for (child, &color) in entry.children.iter_mut().zip(rest) {
                child.color = resolver.resolve(color);
            }
            return;
        }
    }
    let ch_type = params.layout.types[entry.ch_idx];
    entry.color = resolver.trace_color(ch_type, entry.is_bad);
    entry.children.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigscope_core::{ChannelType, ViewExtent};
    use sigscope_style::Theme;

    fn fixtures(n: usize) -> (ViewExtent, ChannelLayout, ViewportState, ColorResolver) {
        let ext = ViewExtent {
            sfreq: 100.0,
            total_samples: 1000,
            total_channels: n,
            segments: None,
        };
        let names = (0..n).map(|i| format!("EEG {i:03}")).collect();
        let layout = ChannelLayout::new(names, vec![ChannelType::Eeg; n], 100.0);
        let vp = ViewportState::new(&ext, 5.0, 4);
        let resolver = ColorResolver::new(Theme::default(), false);
        (ext, layout, vp, resolver)
    }

    fn params<'a>(
        vp: &'a ViewportState,
        layout: &'a ChannelLayout,
    ) -> TraceParams<'a> {
        TraceParams {
            viewport: vp,
            layout,
            selection: None,
            epoch_colors: None,
        }
    }

    #[test]
    fn sync_creates_one_entry_per_visible_channel() {
        let (_, layout, vp, mut resolver) = fixtures(10);
        let mut traces = TraceSet::default();
        traces.sync(&params(&vp, &layout), &mut resolver);
        assert_eq!(traces.entries().len(), 4);
        let chans: Vec<usize> = traces.entries().iter().map(|e| e.ch_idx).collect();
        assert_eq!(chans, vec![0, 1, 2, 3]);
        // Rows are offset by one for the padding row.
        assert_eq!(traces.row_of(0), Some(1.0));
        assert_eq!(traces.row_of(3), Some(4.0));
    }

    #[test]
    fn scroll_recycles_entries() {
        let (ext, layout, mut vp, mut resolver) = fixtures(10);
        let mut traces = TraceSet::default();
        traces.sync(&params(&vp, &layout), &mut resolver);

        vp.vscroll(sigscope_core::ScrollStep::Relative(2.0), &ext, None);
        traces.sync(&params(&vp, &layout), &mut resolver);
        let mut chans: Vec<usize> = traces.entries().iter().map(|e| e.ch_idx).collect();
        chans.sort_unstable();
        assert_eq!(chans, vec![2, 3, 4, 5]);
        // Still four entries: scrolled-off channels were recycled.
        assert_eq!(traces.entries().len(), 4);
        // Row positions track the new window.
        assert_eq!(traces.row_of(2), Some(3.0));
    }

    #[test]
    fn kept_entries_update_rows_in_place() {
        let (ext, layout, mut vp, mut resolver) = fixtures(10);
        let mut traces = TraceSet::default();
        traces.sync(&params(&vp, &layout), &mut resolver);
        vp.vscroll(sigscope_core::ScrollStep::StepForward, &ext, None);
        traces.sync(&params(&vp, &layout), &mut resolver);
        // Rows are absolute: channel 1 is now the top of the window at
        // row ch_start + 1.
        assert_eq!(traces.row_of(1), Some(2.0));
        assert_eq!(traces.row_of(4), Some(5.0));
        assert_eq!(traces.row_of(0), None);
    }

    #[test]
    fn grow_and_shrink_follow_channel_count() {
        let (ext, layout, mut vp, mut resolver) = fixtures(10);
        let mut traces = TraceSet::default();
        traces.sync(&params(&vp, &layout), &mut resolver);
        vp.change_nchan(sigscope_core::ScrollStep::PageForward, &ext);
        traces.sync(&params(&vp, &layout), &mut resolver);
        assert_eq!(traces.entries().len(), vp.n_channels);
        vp.change_nchan(sigscope_core::ScrollStep::Relative(-6.0), &ext);
        traces.sync(&params(&vp, &layout), &mut resolver);
        assert_eq!(traces.entries().len(), vp.n_channels);
    }

    #[test]
    fn butterfly_overlays_by_type() {
        let ext = ViewExtent {
            sfreq: 100.0,
            total_samples: 1000,
            total_channels: 4,
            segments: None,
        };
        let layout = ChannelLayout::new(
            vec!["E1".into(), "M1".into(), "E2".into(), "M2".into()],
            vec![
                ChannelType::Eeg,
                ChannelType::MegMag,
                ChannelType::Eeg,
                ChannelType::MegMag,
            ],
            100.0,
        );
        let mut vp = ViewportState::new(&ext, 5.0, 2);
        vp.set_butterfly(true);
        let mut resolver = ColorResolver::new(Theme::default(), false);
        let mut traces = TraceSet::default();
        traces.sync(&params(&vp, &layout), &mut resolver);

        // All four channels visible, EEG on row 1, MEG on row 2.
        assert_eq!(traces.entries().len(), 4);
        assert_eq!(traces.row_of(0), Some(1.0));
        assert_eq!(traces.row_of(2), Some(1.0));
        assert_eq!(traces.row_of(1), Some(2.0));
        // Overlaid rows identify no single channel.
        assert_eq!(traces.channel_at_row(1.0), None);
    }

    #[test]
    fn bad_channel_changes_color() {
        let (_, mut layout, vp, mut resolver) = fixtures(4);
        let mut traces = TraceSet::default();
        traces.sync(&params(&vp, &layout), &mut resolver);
        let good = traces.entries()[1].color;

        layout.toggle_bad(1);
        traces.refresh_colors(&params(&vp, &layout), &mut resolver);
        let entry = traces
            .entries()
            .iter()
            .find(|e| e.ch_idx == 1)
            .unwrap();
        assert!(entry.is_bad);
        assert_ne!(entry.color, good);
        assert_eq!(entry.color, Rgba::rgb(211, 211, 211));
    }

    #[test]
    fn selection_shows_current_group_from_top() {
        use sigscope_core::ChannelGroup;
        let (_, layout, vp, mut resolver) = fixtures(10);
        let selection = SelectionState::new(vec![
            ChannelGroup {
                name: "front".into(),
                picks: vec![7, 8, 9],
            },
            ChannelGroup {
                name: "back".into(),
                picks: vec![0, 1],
            },
        ]);
        let mut traces = TraceSet::default();
        let p = TraceParams {
            viewport: &vp,
            layout: &layout,
            selection: Some(&selection),
            epoch_colors: None,
        };
        traces.sync(&p, &mut resolver);
        assert_eq!(traces.entries().len(), 3);
        assert_eq!(traces.row_of(7), Some(1.0));
        assert_eq!(traces.row_of(9), Some(3.0));
    }

    #[test]
    fn epoch_colors_spawn_children() {
        let (_, layout, vp, mut resolver) = fixtures(4);
        let red = Rgba::rgb(255, 0, 0);
        let black = Rgba::BLACK;
        let mut matrix = EpochColorMatrix {
            colors: vec![vec![black, black, black]; 4],
        };
        // Channel 2 has two bad segments in a distinct color.
        matrix.colors[2][1] = red;
        matrix.colors[2][2] = red;

        let mut traces = TraceSet::default();
        let p = TraceParams {
            viewport: &vp,
            layout: &layout,
            selection: None,
            epoch_colors: Some(&matrix),
        };
        traces.sync(&p, &mut resolver);

        let plain = traces.entries().iter().find(|e| e.ch_idx == 0).unwrap();
        assert!(plain.children.is_empty());
        let multi = traces.entries().iter().find(|e| e.ch_idx == 2).unwrap();
        assert_eq!(multi.color, black);
        assert_eq!(multi.children, vec![ChildTrace { color: red }]);
    }

    #[test]
    fn children_shrink_when_colors_unify() {
        let (_, layout, vp, mut resolver) = fixtures(4);
        let mut matrix = EpochColorMatrix {
            colors: vec![vec![Rgba::BLACK; 3]; 4],
        };
        matrix.colors[0][0] = Rgba::rgb(255, 0, 0);
        let mut traces = TraceSet::default();
        {
            let p = TraceParams {
                viewport: &vp,
                layout: &layout,
                selection: None,
                epoch_colors: Some(&matrix),
            };
            traces.sync(&p, &mut resolver);
        }
        assert_eq!(traces.entries()[0].children.len(), 1);

        matrix.colors[0][0] = Rgba::BLACK;
        let p = TraceParams {
            viewport: &vp,
            layout: &layout,
            selection: None,
            epoch_colors: Some(&matrix),
        };
        traces.refresh_colors(&p, &mut resolver);
        assert!(traces.entries()[0].children.is_empty());
    }

    #[test]
    fn axis_labels_sorted_by_row() {
        let (_, layout, vp, mut resolver) = fixtures(10);
        let mut traces = TraceSet::default();
        traces.sync(&params(&vp, &layout), &mut resolver);
        let labels = traces.axis_labels(&layout);
        assert_eq!(labels[0], (1.0, "EEG 000"));
        assert_eq!(labels[3], (4.0, "EEG 003"));
    }
}
