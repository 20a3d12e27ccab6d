#![forbid(unsafe_code)]

//! Data resolution for the sigscope viewport.
//!
//! [`window::DataWindow`] turns a viewport plus a data source into the
//! `(times, data)` buffer a renderer consumes, running the fixed pipeline
//! fetch → transform → scale → DC removal → clipping → decimation.
//! [`precompute::PrecomputeLoader`] runs the same pipeline over the whole
//! recording on a background thread and hands the result over as an
//! immutable cache, after which the window stops fetching entirely.

pub mod decimate;
pub mod precompute;
pub mod window;
pub mod zscore;

pub use decimate::{auto_factor, downsample};
pub use precompute::{
    LoadEvent, LoadJob, MemoryProbe, PrecomputeCache, PrecomputeLoader, PrecomputePolicy,
    should_precompute,
};
pub use window::{DataWindow, ResolveParams};
pub use zscore::ZscoreRaster;
