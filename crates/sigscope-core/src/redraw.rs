#![forbid(unsafe_code)]

//! Redraw propagation flags.
//!
//! Navigation operations return a [`Redraw`] set describing which derived
//! state must be recomputed. The owner fans the update out explicitly
//! (data window, then traces, then display layers) instead of relying on
//! implicit event propagation.

use bitflags::bitflags;

bitflags! {
    /// What must be recomputed after a viewport mutation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Redraw: u8 {
        /// The resolved `(times, data)` window is stale.
        const DATA = 1 << 0;
        /// The row-to-channel trace mapping is stale.
        const TRACES = 1 << 1;
        /// Annotation-region visibility must be refiltered.
        const REGIONS = 1 << 2;
        /// The time cursor must be re-placed (epoch bounds may have moved).
        const CURSOR = 1 << 3;
        /// The overview map's viewport rectangle is stale.
        const OVERVIEW = 1 << 4;
        /// Channel-axis labels are stale.
        const YAXIS = 1 << 5;
    }
}

impl Redraw {
    /// Everything derived from the viewport.
    #[must_use]
    pub const fn full() -> Self {
        Self::all()
    }

    /// Flags after a pure horizontal move.
    #[must_use]
    pub const fn horizontal() -> Self {
        Self::DATA
            .union(Self::REGIONS)
            .union(Self::CURSOR)
            .union(Self::OVERVIEW)
    }

    /// Flags after a pure vertical move.
    #[must_use]
    pub const fn vertical() -> Self {
        Self::DATA
            .union(Self::TRACES)
            .union(Self::OVERVIEW)
            .union(Self::YAXIS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizontal_excludes_traces() {
        assert!(!Redraw::horizontal().contains(Redraw::TRACES));
        assert!(Redraw::horizontal().contains(Redraw::DATA));
    }

    #[test]
    fn vertical_includes_yaxis() {
        assert!(Redraw::vertical().contains(Redraw::YAXIS));
    }

    #[test]
    fn full_is_all() {
        assert_eq!(Redraw::full(), Redraw::all());
    }
}
