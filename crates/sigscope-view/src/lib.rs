#![forbid(unsafe_code)]

//! Display-side state machines for sigscope.
//!
//! [`traces::TraceSet`] owns the mapping from screen rows to channels and
//! recycles trace entries as the visible set changes. [`annotations`] holds
//! the region state machine with its merge and rollback rules, keeping the
//! in-memory projection consistent with the external store. The smaller
//! modules cover the time cursor, value probe, event markers and the
//! overview summary.

pub mod annotations;
pub mod cursor;
pub mod events;
pub mod overview;
pub mod probe;
pub mod traces;

pub use annotations::{
    AnnotError, AnnotResult, AnnotationEngine, AnnotationStore, Region, RegionStyle, RegionView,
    StoredAnnotation,
};
pub use cursor::{CursorLine, TimeCursor};
pub use events::{EventMarker, EventMarkers};
pub use overview::OverviewMap;
pub use probe::{ProbeReading, probe};
pub use traces::{ChildTrace, EpochColorMatrix, TraceEntry, TraceParams, TraceSet, visible_picks};
