#![forbid(unsafe_code)]

//! Annotation regions: creation, merging, channel restriction, store sync.
//!
//! The external [`AnnotationStore`] is the source of truth; the engine's
//! region list is a derived projection kept aligned with store order (region
//! `i` mirrors store index `i`). Every mutation goes through the engine's
//! commit path so the two cannot diverge within a session; an out-of-band
//! store change requires [`AnnotationEngine::sync_from_store`].
//!
//! # Merge rules
//!
//! Committing a region (drag release, resize, numeric edit, programmatic
//! add) runs the merge pass over committed regions of the same description
//! whose intervals intersect the new interval, inclusive of touching edges:
//!
//! - No participant restricted: all participants collapse into one region
//!   spanning the union, absorbed regions are removed from list and store,
//!   and the merged result is persisted.
//! - Any participant restricted: the operation is rejected, the edited
//!   region keeps its last committed geometry (a new drag is discarded),
//!   and the store is not touched. Channel-restricted and unrestricted
//!   annotations of one description never overlap.
//!
//! Zero-duration regions are valid; `start > stop` is rejected with a
//! message, never silently corrected.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::fmt;

use bitflags::bitflags;

// ---------------------------------------------------------------------------
// Store contract
// ---------------------------------------------------------------------------

/// One annotation as the store reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredAnnotation {
    /// Onset in seconds.
    pub onset: f64,
    /// Duration in seconds (zero is valid).
    pub duration: f64,
    /// Free-form label.
    pub description: String,
    /// Channel names the annotation is restricted to; `None` or empty
    /// means it applies to all channels.
    pub channels: Option<Vec<String>>,
}

/// The host's annotation storage.
///
/// Indices are store-relative positions, stable only until the next
/// mutation. `append` adds at the end.
pub trait AnnotationStore {
    /// All stored annotations, in store order.
    fn list(&self) -> Vec<StoredAnnotation>;
    /// Append an annotation.
    fn append(&mut self, annotation: StoredAnnotation);
    /// Delete the annotation at `index`.
    fn delete(&mut self, index: usize);
    /// Overwrite the onset of the annotation at `index`.
    fn set_onset(&mut self, index: usize, value: f64);
    /// Overwrite the duration of the annotation at `index`.
    fn set_duration(&mut self, index: usize, value: f64);
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why an annotation edit was rejected. The store is never mutated for a
/// rejected edit.
#[derive(Debug)]
pub enum AnnotError {
    /// Start would end up later than stop.
    InvalidBounds {
        /// Requested start.
        start: f64,
        /// Requested stop.
        stop: f64,
    },
    /// The merge pass hit a channel-restricted participant.
    RestrictedOverlap {
        /// Description of the colliding regions.
        description: String,
    },
    /// A drag was started without a current description.
    NoDescription,
    /// The operation needs a selected region and none is selected.
    NoSelection,
    /// A drag release arrived without a drag in progress.
    NoActiveDrag,
}

impl fmt::Display for AnnotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBounds { start, stop } => {
                write!(f, "start ({start} s) can't be later than stop ({stop} s)")
            }
            Self::RestrictedOverlap { description } => write!(
                f,
                "channel-restricted and unrestricted \"{description}\" annotations must not overlap"
            ),
            Self::NoDescription => write!(f, "no description set, add one first"),
            Self::NoSelection => write!(f, "no annotation selected"),
            Self::NoActiveDrag => write!(f, "no annotation drag in progress"),
        }
    }
}

impl std::error::Error for AnnotError {}

/// Result type for annotation edits.
pub type AnnotResult<T> = Result<T, AnnotError>;

// ---------------------------------------------------------------------------
// Regions
// ---------------------------------------------------------------------------

/// One committed annotation region.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Onset in seconds.
    pub onset: f64,
    /// Duration in seconds.
    pub duration: f64,
    /// Label; merge partners share it.
    pub description: String,
    /// Native channel indices the region is restricted to; `None` means
    /// all channels.
    pub channels: Option<BTreeSet<usize>>,
    /// Exactly one region can be selected at a time.
    pub selected: bool,
}

impl Region {
    /// End of the region.
    #[must_use]
    pub fn offset(&self) -> f64 {
        self.onset + self.duration
    }

    /// Whether the region carries a non-empty channel restriction.
    #[must_use]
    pub fn is_restricted(&self) -> bool {
        self.channels.as_ref().is_some_and(|c| !c.is_empty())
    }

    /// Inclusive interval intersection: touching edges count.
    #[must_use]
    pub fn intersects(&self, onset: f64, offset: f64) -> bool {
        self.onset <= offset && self.offset() >= onset
    }
}

bitflags! {
    /// Render style of a region.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RegionStyle: u8 {
        /// Currently selected.
        const SELECTED = 1 << 0;
        /// Carries a channel restriction (rendered dashed/translucent).
        const RESTRICTED = 1 << 1;
    }
}

/// A region as handed to the renderer after visibility filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionView {
    /// Index into the engine's region list.
    pub region_idx: usize,
    /// Onset in seconds.
    pub onset: f64,
    /// End in seconds.
    pub offset: f64,
    /// Label.
    pub description: String,
    /// Stable per-description color index.
    pub color_idx: usize,
    /// Style flags.
    pub style: RegionStyle,
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    anchor: f64,
    current: f64,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The annotation editing state machine.
#[derive(Debug)]
pub struct AnnotationEngine {
    ch_names: Vec<String>,
    time_max: f64,
    regions: Vec<Region>,
    /// Known labels in first-seen order; position doubles as color index.
    descriptions: Vec<String>,
    visible: HashMap<String, bool>,
    current_description: Option<String>,
    selected: Option<usize>,
    drag: Option<DragState>,
}

impl AnnotationEngine {
    /// Create an engine over a recording's channels and length.
    #[must_use]
    pub fn new(ch_names: Vec<String>, time_max: f64) -> Self {
        Self {
            ch_names,
            time_max,
            regions: Vec::new(),
            descriptions: Vec::new(),
            visible: HashMap::new(),
            current_description: None,
            selected: None,
            drag: None,
        }
    }

    /// Rebuild the in-memory projection from the store.
    ///
    /// Required whenever the store changed outside the engine's commit
    /// path. Selection and any live drag are discarded.
    pub fn sync_from_store(&mut self, store: &dyn AnnotationStore) {
        self.regions.clear();
        self.selected = None;
        self.drag = None;
        for stored in store.list() {
            self.register_description(&stored.description);
            let channels = stored.channels.as_ref().map(|names| {
                names
                    .iter()
                    .filter_map(|name| {
                        let idx = self.ch_names.iter().position(|n| n == name);
                        if idx.is_none() {
                            tracing::warn!(name = %name, "annotation restricted to unknown channel");
                        }
                        idx
                    })
                    .collect::<BTreeSet<usize>>()
            });
            self.regions.push(Region {
                onset: stored.onset,
                duration: stored.duration,
                description: stored.description,
                channels,
                selected: false,
            });
        }
        if self.current_description.is_none() {
            self.current_description = self.descriptions.first().cloned();
        }
    }

    // -- descriptions and visibility ------------------------------------

    /// Known descriptions in first-seen order.
    #[must_use]
    pub fn descriptions(&self) -> &[String] {
        &self.descriptions
    }

    /// The description applied to newly dragged regions.
    #[must_use]
    pub fn current_description(&self) -> Option<&str> {
        self.current_description.as_deref()
    }

    /// Set (and register) the current description.
    pub fn set_current_description(&mut self, description: &str) {
        self.register_description(description);
        self.current_description = Some(description.to_string());
    }

    /// Stable color index of a description.
    #[must_use]
    pub fn color_index(&self, description: &str) -> usize {
        self.descriptions
            .iter()
            .position(|d| d == description)
            .unwrap_or(0)
    }

    /// Show or hide all regions of one description. Display-only: the
    /// region list and the store are unaffected.
    pub fn set_description_visible(&mut self, description: &str, visible: bool) {
        self.visible.insert(description.to_string(), visible);
    }

    /// Show or hide every description.
    pub fn set_all_visible(&mut self, visible: bool) {
        for d in &self.descriptions {
            self.visible.insert(d.clone(), visible);
        }
    }

    fn register_description(&mut self, description: &str) {
        if !self.descriptions.iter().any(|d| d == description) {
            self.descriptions.push(description.to_string());
            self.visible.insert(description.to_string(), true);
        }
    }

    // -- regions --------------------------------------------------------

    /// All committed regions, in store order.
    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Index of the selected region.
    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Regions to render for the current time window: per-description
    /// visibility plus viewport intersection. Purely a display filter.
    #[must_use]
    pub fn visible_regions(&self, t_start: f64, duration: f64) -> Vec<RegionView> {
        let stop = t_start + duration;
        self.regions
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                self.visible.get(&r.description).copied().unwrap_or(true)
                    && r.intersects(t_start, stop)
            })
            .map(|(i, r)| {
                let mut style = RegionStyle::empty();
                if r.selected {
                    style |= RegionStyle::SELECTED;
                }
                if r.is_restricted() {
                    style |= RegionStyle::RESTRICTED;
                }
                RegionView {
                    region_idx: i,
                    onset: r.onset,
                    offset: r.offset(),
                    description: r.description.clone(),
                    color_idx: self.color_index(&r.description),
                    style,
                }
            })
            .collect()
    }

    // -- selection ------------------------------------------------------

    /// Select the topmost region containing `t`, preferring the current
    /// description (it is drawn on top). Any previous selection is cleared
    /// first. Returns the selected index.
    pub fn select_at(&mut self, t: f64) -> Option<usize> {
        let hit = self
            .regions
            .iter()
            .enumerate()
            .filter(|(_, r)| r.onset <= t && t <= r.offset())
            .max_by_key(|(i, r)| {
                let on_top = Some(r.description.as_str()) == self.current_description.as_deref();
                (on_top, *i)
            })
            .map(|(i, _)| i);
        match hit {
            Some(idx) => self.select(idx),
            None => self.deselect(),
        }
        hit
    }

    /// Select region `idx`, deselecting any previous selection.
    pub fn select(&mut self, idx: usize) {
        self.deselect();
        self.regions[idx].selected = true;
        self.selected = Some(idx);
    }

    /// Clear the selection.
    pub fn deselect(&mut self) {
        if let Some(old) = self.selected.take() {
            if let Some(region) = self.regions.get_mut(old) {
                region.selected = false;
            }
        }
    }

    // -- drag creation --------------------------------------------------

    /// Start dragging a new region at time `t`.
    pub fn begin_drag(&mut self, t: f64) -> AnnotResult<()> {
        if self.current_description.is_none() {
            return Err(AnnotError::NoDescription);
        }
        let anchor = t.clamp(0.0, self.time_max);
        self.drag = Some(DragState {
            anchor,
            current: anchor,
        });
        Ok(())
    }

    /// Track the drag endpoint.
    pub fn update_drag(&mut self, t: f64) {
        if let Some(drag) = &mut self.drag {
            drag.current = t.clamp(0.0, self.time_max);
        }
    }

    /// The ephemeral region under the pointer, for live rendering.
    #[must_use]
    pub fn drag_region(&self) -> Option<(f64, f64)> {
        self.drag
            .map(|d| (d.anchor.min(d.current), d.anchor.max(d.current)))
    }

    /// Release the drag: commit the region and run the merge pass.
    ///
    /// On a restricted-overlap rejection the drag is discarded entirely
    /// (there is no pre-drag geometry to restore) and the store is not
    /// touched. Returns the committed region's index.
    pub fn finish_drag(
        &mut self,
        t: f64,
        store: &mut dyn AnnotationStore,
    ) -> AnnotResult<usize> {
        let drag = self.drag.take().ok_or(AnnotError::NoActiveDrag)?;
        let description = self
            .current_description
            .clone()
            .ok_or(AnnotError::NoDescription)?;
        let stop = t.clamp(0.0, self.time_max);
        let onset = drag.anchor.min(stop);
        let offset = drag.anchor.max(stop);
        let idx = self.commit(onset, offset, &description, None, None, store)?;
        self.select(idx);
        Ok(idx)
    }

    // -- edits ----------------------------------------------------------

    /// Programmatically add a region (e.g. from a dialog), merge rules
    /// included. Zero duration is valid.
    pub fn add_region(
        &mut self,
        onset: f64,
        duration: f64,
        description: &str,
        channels: Option<BTreeSet<usize>>,
        store: &mut dyn AnnotationStore,
    ) -> AnnotResult<usize> {
        if duration < 0.0 {
            return Err(AnnotError::InvalidBounds {
                start: onset,
                stop: onset + duration,
            });
        }
        self.register_description(description);
        let description = description.to_string();
        self.commit(onset, onset + duration, &description, channels, None, store)
    }

    /// Resize the selected region to `[start, stop]` and re-run the merge
    /// pass.
    ///
    /// `start > stop` and restricted-overlap collisions are rejected with
    /// the region left at its committed geometry; the store is untouched.
    pub fn resize_selected(
        &mut self,
        start: f64,
        stop: f64,
        store: &mut dyn AnnotationStore,
    ) -> AnnotResult<usize> {
        let idx = self.selected.ok_or(AnnotError::NoSelection)?;
        if start > stop {
            tracing::warn!(start, stop, "rejected annotation resize");
            return Err(AnnotError::InvalidBounds { start, stop });
        }
        let start = start.clamp(0.0, self.time_max);
        let stop = stop.clamp(0.0, self.time_max);
        let region = self.regions[idx].clone();
        let idx = self.commit(
            start,
            stop,
            &region.description.clone(),
            region.channels.clone(),
            Some(idx),
            store,
        )?;
        self.select(idx);
        Ok(idx)
    }

    /// Remove region `idx` from the list, the display layer and the store
    /// in one step.
    pub fn remove(&mut self, idx: usize, store: &mut dyn AnnotationStore) {
        store.delete(idx);
        self.regions.remove(idx);
        match self.selected {
            Some(sel) if sel == idx => self.selected = None,
            Some(sel) if sel > idx => self.selected = Some(sel - 1),
            _ => {}
        }
    }

    /// Remove the selected region.
    pub fn remove_selected(&mut self, store: &mut dyn AnnotationStore) -> AnnotResult<()> {
        let idx = self.selected.ok_or(AnnotError::NoSelection)?;
        self.remove(idx, store);
        Ok(())
    }

    /// Toggle channel membership of the selected region (shift-click on a
    /// trace in annotation mode).
    ///
    /// Adding the first channel turns a full region into a restricted one;
    /// removing the last restriction turns it back into a full region.
    /// Returns the new membership state.
    pub fn toggle_channel(
        &mut self,
        ch_idx: usize,
        store: &mut dyn AnnotationStore,
    ) -> AnnotResult<bool> {
        let idx = self.selected.ok_or(AnnotError::NoSelection)?;
        let region = &mut self.regions[idx];
        let mut channels = region.channels.take().unwrap_or_default();
        let now_member = if channels.contains(&ch_idx) {
            channels.remove(&ch_idx);
            false
        } else {
            channels.insert(ch_idx);
            true
        };
        region.channels = if channels.is_empty() {
            None
        } else {
            Some(channels)
        };

        // The store contract has no channel setter: persist by replacing
        // the entry. The region moves to the end of the store, so the
        // mirror list follows.
        let region = self.regions.remove(idx);
        store.delete(idx);
        store.append(self.to_stored(&region));
        self.regions.push(region);
        let end = self.regions.len() - 1;
        self.selected = Some(end);
        self.regions[end].selected = true;
        Ok(now_member)
    }

    // -- internals ------------------------------------------------------

    fn to_stored(&self, region: &Region) -> StoredAnnotation {
        StoredAnnotation {
            onset: region.onset,
            duration: region.duration,
            description: region.description.clone(),
            channels: region.channels.as_ref().map(|set| {
                set.iter()
                    .map(|&i| self.ch_names[i].clone())
                    .collect::<Vec<_>>()
            }),
        }
    }

    /// Commit `[onset, offset]` with the merge pass.
    ///
    /// `editing` names the region being resized, which participates with
    /// its new interval and is excluded from the overlap scan. Nothing is
    /// mutated until every check has passed.
    fn commit(
        &mut self,
        onset: f64,
        offset: f64,
        description: &str,
        channels: Option<BTreeSet<usize>>,
        editing: Option<usize>,
        store: &mut dyn AnnotationStore,
    ) -> AnnotResult<usize> {
        debug_assert!(offset >= onset, "commit with inverted interval");

        let partners: Vec<usize> = self
            .regions
            .iter()
            .enumerate()
            .filter(|(i, r)| {
                Some(*i) != editing
                    && r.description == description
                    && r.intersects(onset, offset)
            })
            .map(|(i, _)| i)
            .collect();

        let new_restricted = channels.as_ref().is_some_and(|c| !c.is_empty());
        let any_restricted =
            new_restricted || partners.iter().any(|&i| self.regions[i].is_restricted());
        if !partners.is_empty() && any_restricted {
            tracing::warn!(description, "rejected merge across channel restriction");
            return Err(AnnotError::RestrictedOverlap {
                description: description.to_string(),
            });
        }

        let mut merged_onset = onset;
        let mut merged_offset = offset;
        for &i in &partners {
            merged_onset = merged_onset.min(self.regions[i].onset);
            merged_offset = merged_offset.max(self.regions[i].offset());
        }

        // Remove absorbed partners back-to-front so store indices stay
        // valid while deleting.
        for &i in partners.iter().rev() {
            store.delete(i);
            self.regions.remove(i);
            match self.selected {
                Some(sel) if sel == i => self.selected = None,
                Some(sel) if sel > i => self.selected = Some(sel - 1),
                _ => {}
            }
        }

        match editing {
            Some(mut idx) => {
                idx -= partners.iter().filter(|&&p| p < idx).count();
                store.set_onset(idx, merged_onset);
                store.set_duration(idx, merged_offset - merged_onset);
                let region = &mut self.regions[idx];
                region.onset = merged_onset;
                region.duration = merged_offset - merged_onset;
                Ok(idx)
            }
            None => {
                let region = Region {
                    onset: merged_onset,
                    duration: merged_offset - merged_onset,
                    description: description.to_string(),
                    channels,
                    selected: false,
                };
                store.append(self.to_stored(&region));
                self.regions.push(region);
                Ok(self.regions.len() - 1)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
