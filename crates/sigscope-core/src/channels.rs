#![forbid(unsafe_code)]

//! Channel metadata, display order, and pick resolution.
//!
//! The host hands over channel names, types, the bad-channel set and the
//! display order once; everything else here is derived. Picks are indices
//! into the host's channel list, in display order, restricted to the current
//! viewport rows (or to the whole order in butterfly mode).
//!
//! Grouped/selection browsing replaces row arithmetic entirely: the visible
//! set is one named group at a time and vertical scrolling steps through
//! groups, see [`SelectionState`].

use std::collections::BTreeSet;
use std::collections::HashMap;

/// Signal type of a channel, driving scaling, unit labels and color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChannelType {
    /// EEG electrode.
    Eeg,
    /// MEG magnetometer.
    MegMag,
    /// MEG gradiometer.
    MegGrad,
    /// MEG reference sensor.
    RefMeg,
    /// Electrooculogram.
    Eog,
    /// Electrocardiogram.
    Ecg,
    /// Electromyogram.
    Emg,
    /// Stereo-EEG depth electrode.
    Seeg,
    /// Deep-brain-stimulation electrode.
    Dbs,
    /// Electrocorticography grid electrode.
    Ecog,
    /// Near-infrared oxyhemoglobin.
    Hbo,
    /// Near-infrared deoxyhemoglobin.
    Hbr,
    /// Stimulus/trigger channel.
    Stim,
    /// Respiration monitor.
    Resp,
    /// Anything else.
    Misc,
}

impl ChannelType {
    /// Display unit after unit scaling has been applied.
    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Eeg | Self::Eog | Self::Ecg | Self::Emg | Self::Ecog => "µV",
            Self::MegMag | Self::RefMeg => "fT",
            Self::MegGrad => "fT/cm",
            Self::Seeg | Self::Dbs => "mV",
            Self::Hbo | Self::Hbr => "µM",
            Self::Stim | Self::Resp | Self::Misc => "AU",
        }
    }

    /// Default per-type scaling: raw values are divided by this to land in
    /// display rows (one row spans roughly two scalings).
    #[must_use]
    pub const fn default_scaling(self) -> f64 {
        match self {
            Self::Eeg => 20e-6,
            Self::MegMag | Self::RefMeg => 1e-12,
            Self::MegGrad => 4e-11,
            Self::Eog => 150e-6,
            Self::Ecg => 5e-4,
            Self::Emg => 1e-3,
            Self::Seeg | Self::Dbs | Self::Ecog => 1e-4,
            Self::Hbo | Self::Hbr => 10e-6,
            Self::Stim | Self::Resp | Self::Misc => 1.0,
        }
    }

    /// Default unit scaling: multiplies raw SI values into display units.
    #[must_use]
    pub const fn default_unit_scaling(self) -> f64 {
        match self {
            Self::Eeg | Self::Eog | Self::Ecg | Self::Emg | Self::Ecog => 1e6,
            Self::MegMag | Self::RefMeg => 1e15,
            Self::MegGrad => 1e13,
            Self::Seeg | Self::Dbs => 1e3,
            Self::Hbo | Self::Hbr => 1e6,
            Self::Stim | Self::Resp | Self::Misc => 1.0,
        }
    }

    /// Whether the channel carries signal data (as opposed to triggers).
    #[must_use]
    pub const fn is_data(self) -> bool {
        !matches!(self, Self::Stim | Self::Resp | Self::Misc)
    }
}

/// Immutable-ish channel metadata plus the mutable bad set.
///
/// `order` defines display order (e.g. grouped by type); `names`/`types` are
/// in the host's native channel order, which picks also refer to.
#[derive(Debug, Clone)]
pub struct ChannelLayout {
    /// Channel names in native order.
    pub names: Vec<String>,
    /// Channel types in native order.
    pub types: Vec<ChannelType>,
    /// Native indices in display order.
    pub order: Vec<usize>,
    /// Names of channels currently marked bad.
    pub bads: BTreeSet<String>,
    /// Sampling frequency in Hz.
    pub sfreq: f64,
    /// Per-type scaling overrides; falls back to the type default.
    pub scalings: HashMap<ChannelType, f64>,
    /// Per-type unit-scaling overrides; falls back to the type default.
    pub unit_scalings: HashMap<ChannelType, f64>,
}

impl ChannelLayout {
    /// Build a layout with identity display order and default scalings.
    #[must_use]
    pub fn new(names: Vec<String>, types: Vec<ChannelType>, sfreq: f64) -> Self {
        debug_assert_eq!(names.len(), types.len(), "names/types length mismatch");
        let order = (0..names.len()).collect();
        Self {
            names,
            types,
            order,
            bads: BTreeSet::new(),
            sfreq,
            scalings: HashMap::new(),
            unit_scalings: HashMap::new(),
        }
    }

    /// Number of channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True if the layout has no channels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Effective scaling for a channel type.
    #[must_use]
    pub fn scaling(&self, ch_type: ChannelType) -> f64 {
        self.scalings
            .get(&ch_type)
            .copied()
            .unwrap_or_else(|| ch_type.default_scaling())
    }

    /// Effective unit scaling for a channel type.
    #[must_use]
    pub fn unit_scaling(&self, ch_type: ChannelType) -> f64 {
        self.unit_scalings
            .get(&ch_type)
            .copied()
            .unwrap_or_else(|| ch_type.default_unit_scaling())
    }

    /// Whether the channel at native index `idx` is marked bad.
    #[must_use]
    pub fn is_bad(&self, idx: usize) -> bool {
        self.bads.contains(&self.names[idx])
    }

    /// Toggle the bad status of the channel at native index `idx`.
    ///
    /// Returns the new status.
    pub fn toggle_bad(&mut self, idx: usize) -> bool {
        let name = &self.names[idx];
        if self.bads.remove(name) {
            false
        } else {
            self.bads.insert(name.clone());
            true
        }
    }

    /// Position of native index `idx` in the display order.
    ///
    /// Out-of-order indices are a programmer error.
    #[must_use]
    pub fn order_idx(&self, idx: usize) -> usize {
        self.order
            .iter()
            .position(|&o| o == idx)
            .expect("channel index not present in display order")
    }

    /// Native channel indices for the viewport rows
    /// `ch_start..ch_start + n_channels`, in display order.
    #[must_use]
    pub fn picks(&self, ch_start: usize, n_channels: usize) -> Vec<usize> {
        let stop = (ch_start + n_channels).min(self.order.len());
        self.order[ch_start.min(stop)..stop].to_vec()
    }

    /// All channel indices in display order (butterfly mode shows everything).
    #[must_use]
    pub fn all_picks(&self) -> Vec<usize> {
        self.order.clone()
    }

    /// Distinct data-channel types present, in display-order of first
    /// appearance. Butterfly mode assigns one row per entry.
    #[must_use]
    pub fn butterfly_type_order(&self) -> Vec<ChannelType> {
        let mut seen = Vec::new();
        for &idx in &self.order {
            let t = self.types[idx];
            if !seen.contains(&t) {
                seen.push(t);
            }
        }
        seen
    }
}

/// A named channel group for grouped/selection browsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelGroup {
    /// Group label (e.g. "Left-temporal").
    pub name: String,
    /// Native channel indices belonging to the group.
    pub picks: Vec<usize>,
}

/// Grouped browsing: one group visible at a time.
///
/// Vertical scrolling in this mode is group-index arithmetic, not row
/// arithmetic; see `ViewportState::vscroll`.
#[derive(Debug, Clone)]
pub struct SelectionState {
    groups: Vec<ChannelGroup>,
    current: usize,
}

impl SelectionState {
    /// Create a selection over at least one group.
    #[must_use]
    pub fn new(groups: Vec<ChannelGroup>) -> Self {
        debug_assert!(!groups.is_empty(), "selection with no groups");
        Self { groups, current: 0 }
    }

    /// The group currently shown.
    #[must_use]
    pub fn current(&self) -> &ChannelGroup {
        &self.groups[self.current]
    }

    /// Index of the current group.
    #[must_use]
    pub fn current_idx(&self) -> usize {
        self.current
    }

    /// All groups.
    #[must_use]
    pub fn groups(&self) -> &[ChannelGroup] {
        &self.groups
    }

    /// Step `delta` groups forward/backward, clamped to the group list.
    ///
    /// Returns true if the current group changed.
    pub fn scroll(&mut self, delta: isize) -> bool {
        let last = self.groups.len() - 1;
        let next = self
            .current
            .saturating_add_signed(delta)
            .min(last);
        let changed = next != self.current;
        self.current = next;
        changed
    }

    /// Jump directly to group `idx`, clamped.
    pub fn scroll_to(&mut self, idx: usize) -> bool {
        let next = idx.min(self.groups.len() - 1);
        let changed = next != self.current;
        self.current = next;
        changed
    }
}
