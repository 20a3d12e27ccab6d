#![forbid(unsafe_code)]

//! The time cursor.
//!
//! A single marker time placed by click. In segmented mode the cursor shows
//! at the same relative offset in every visible segment, each replica
//! bounded to its own segment (upper bound backed off by one sample so a
//! replica on the boundary stays in its segment).

use sigscope_core::{ViewExtent, ViewportState};

/// One rendered cursor line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorLine {
    /// Position in seconds.
    pub time: f64,
    /// Draggable range of this line.
    pub bounds: (f64, f64),
}

/// Cursor placement state.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeCursor {
    time: Option<f64>,
}

impl TimeCursor {
    /// Whether a cursor is placed.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.time.is_some()
    }

    /// The marker time, if placed.
    #[must_use]
    pub fn time(&self) -> Option<f64> {
        self.time
    }

    /// Place (or move) the cursor, clamped to the recording.
    pub fn place(&mut self, t: f64, ext: &ViewExtent) {
        self.time = Some(t.clamp(0.0, ext.time_max()));
    }

    /// Remove the cursor.
    pub fn remove(&mut self) {
        self.time = None;
    }

    /// Lines to render for the current viewport.
    ///
    /// Continuous recordings get one line bounded by the recording;
    /// segmented recordings get one replica per visible segment.
    #[must_use]
    pub fn lines(&self, viewport: &ViewportState, ext: &ViewExtent) -> Vec<CursorLine> {
        let Some(time) = self.time else {
            return Vec::new();
        };
        match &ext.segments {
            None => vec![CursorLine {
                time,
                bounds: (0.0, ext.time_max()),
            }],
            Some(seg) => {
                let rel = time % seg.segment_duration();
                let (t0, t1) = viewport.time_range();
                seg.visible_segments(t0, t1)
                    .map(|idx| {
                        let bounds = seg.cursor_bounds(idx);
                        CursorLine {
                            time: (seg.boundary(idx) + rel).clamp(bounds.0, bounds.1),
                            bounds,
                        }
                    })
                    .collect()
            }
        }
    }
}
