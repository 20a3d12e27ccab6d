#![forbid(unsafe_code)]

//! Core contracts for the sigscope browsing pipeline.
//!
//! This crate holds the pieces every other sigscope crate builds on: the
//! scrollable [`viewport::ViewportState`] with its navigation operations,
//! channel metadata and pick resolution in [`channels`], segmented-recording
//! (epoch) layout in [`segments`], and the host-facing data-source traits in
//! [`source`]. Nothing here renders or blocks; everything is synchronous
//! state plus invariant checks.

pub mod channels;
pub mod redraw;
pub mod segments;
pub mod source;
pub mod viewport;

pub use channels::{ChannelGroup, ChannelLayout, ChannelType, SelectionState};
pub use redraw::Redraw;
pub use segments::SegmentLayout;
pub use source::{
    Chunk, ChunkTransform, DataSource, FetchError, FetchResult, IdentityTransform,
    TransformContext,
};
pub use viewport::{Clipping, Decimation, DownsampleMethod, ScrollStep, ViewExtent, ViewportState};
