#![forbid(unsafe_code)]

//! sigscope public facade.
//!
//! This crate re-exports the stable surface of the sigscope workspace: the
//! browsing core for multichannel time-series signals. The host supplies a
//! [`DataSource`], a [`ChunkTransform`] and an [`AnnotationStore`]; sigscope
//! owns viewport navigation, data-window resolution with decimation, the
//! background precompute path, trace/row management and annotation editing.
//! Rendering stays with the host: everything exposed here is plain data.

// --- Core re-exports -------------------------------------------------------

pub use sigscope_core::{
    ChannelGroup, ChannelLayout, ChannelType, Chunk, ChunkTransform, Clipping, DataSource,
    Decimation, DownsampleMethod, FetchError, FetchResult, Redraw, ScrollStep, SegmentLayout,
    SelectionState, TransformContext, ViewExtent, ViewportState,
};

// --- Data re-exports -------------------------------------------------------

pub use sigscope_data::{
    DataWindow, LoadEvent, LoadJob, MemoryProbe, PrecomputeCache, PrecomputeLoader,
    PrecomputePolicy, ResolveParams, ZscoreRaster, should_precompute,
};

// --- Style re-exports ------------------------------------------------------

pub use sigscope_style::{ColorResolver, Lab, Rgba, Theme, invert_lightness, is_dark_background};

// --- View re-exports -------------------------------------------------------

pub use sigscope_view::{
    AnnotError, AnnotResult, AnnotationEngine, AnnotationStore, CursorLine, EpochColorMatrix,
    EventMarker, EventMarkers, OverviewMap, ProbeReading, Region, RegionStyle, RegionView,
    StoredAnnotation, TimeCursor, TraceEntry, TraceSet,
};

// --- Runtime re-exports ----------------------------------------------------

pub use sigscope_runtime::{
    Browser, BrowserId, BrowserRegistry, DisplaySettings, FileStorage, MemoryStorage,
    SettingsStorage, StorageError,
};

/// Commonly used types for host integration.
pub mod prelude {
    pub use crate::{
        AnnotationStore, Browser, BrowserRegistry, ChannelLayout, ChannelType, ChunkTransform,
        DataSource, DisplaySettings, Redraw, ScrollStep, StoredAnnotation, ViewportState,
    };
}
