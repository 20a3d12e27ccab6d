#![forbid(unsafe_code)]

//! Event marker lines.
//!
//! Stimulus/event times the host extracted from the recording, drawn as
//! vertical lines. Purely display-side: a global visibility toggle plus
//! viewport filtering.

/// One event occurrence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventMarker {
    /// Time in seconds.
    pub time: f64,
    /// Host-defined event id, used for labeling.
    pub id: u32,
}

/// The event marker layer.
#[derive(Debug, Clone, Default)]
pub struct EventMarkers {
    markers: Vec<EventMarker>,
    hidden: bool,
}

impl EventMarkers {
    /// Create the layer from host-supplied events, sorted by time.
    #[must_use]
    pub fn new(mut markers: Vec<EventMarker>) -> Self {
        markers.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self {
            markers,
            hidden: false,
        }
    }

    /// All markers, sorted by time.
    #[must_use]
    pub fn all(&self) -> &[EventMarker] {
        &self.markers
    }

    /// Whether the layer is shown.
    #[must_use]
    pub fn visible(&self) -> bool {
        !self.hidden
    }

    /// Toggle the layer; returns the new visibility.
    pub fn toggle(&mut self) -> bool {
        self.hidden = !self.hidden;
        !self.hidden
    }

    /// Markers inside `[t_start, t_stop]`, empty while hidden.
    #[must_use]
    pub fn in_window(&self, t_start: f64, t_stop: f64) -> &[EventMarker] {
        if self.hidden {
            return &[];
        }
        let lo = self.markers.partition_point(|m| m.time < t_start);
        let hi = self.markers.partition_point(|m| m.time <= t_stop);
        &self.markers[lo..hi]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer() -> EventMarkers {
        EventMarkers::new(vec![
            EventMarker { time: 5.0, id: 2 },
            EventMarker { time: 1.0, id: 1 },
            EventMarker { time: 9.0, id: 1 },
        ])
    }

    #[test]
    fn markers_are_sorted() {
        let ev = layer();
        let times: Vec<f64> = ev.all().iter().map(|m| m.time).collect();
        assert_eq!(times, vec![1.0, 5.0, 9.0]);
    }

    #[test]
    fn window_filter_is_inclusive() {
        let ev = layer();
        let hits = ev.in_window(1.0, 5.0);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, 1);
    }

    #[test]
    fn hidden_layer_yields_nothing() {
        let mut ev = layer();
        assert!(!ev.toggle());
        assert!(ev.in_window(0.0, 10.0).is_empty());
        assert!(ev.toggle());
        assert_eq!(ev.in_window(0.0, 10.0).len(), 3);
    }
}
