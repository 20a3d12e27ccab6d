#![forbid(unsafe_code)]

//! Host-facing data contracts.
//!
//! The host owns the recording; sigscope only ever asks for viewport-sized
//! (or precompute-chunk-sized) pieces of it through [`DataSource`], and runs
//! the host's opaque per-chunk processing through [`ChunkTransform`]. Both
//! must be pure given the same [`TransformContext`]: the precompute path
//! relies on live-fetched and cached data being interchangeable.

use std::fmt;
use std::io;

/// One fetched piece of the recording.
///
/// `data` is channel-major (`picks.len()` rows), `times` holds one timestamp
/// per column on the concatenated time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Channel-major sample values, one row per requested pick.
    pub data: Vec<Vec<f64>>,
    /// Timestamps, one per sample column.
    pub times: Vec<f64>,
}

impl Chunk {
    /// Number of sample columns.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.times.len()
    }

    /// Number of channel rows.
    #[must_use]
    pub fn n_channels(&self) -> usize {
        self.data.len()
    }
}

/// Why a fetch failed.
#[derive(Debug)]
pub enum FetchError {
    /// I/O failure in the host's storage layer.
    Io(io::Error),
    /// The host returned fewer samples than the request covered.
    Truncated {
        /// Samples the request covered.
        expected: usize,
        /// Samples actually returned.
        got: usize,
    },
    /// The requested range lies outside the recording.
    OutOfRange {
        /// First requested sample.
        start: usize,
        /// Total samples in the recording.
        total: usize,
    },
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Truncated { expected, got } => {
                write!(f, "truncated read: expected {expected} samples, got {got}")
            }
            Self::OutOfRange { start, total } => {
                write!(f, "sample {start} out of range (recording has {total})")
            }
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Truncated { .. } | Self::OutOfRange { .. } => None,
        }
    }
}

impl From<io::Error> for FetchError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Read access to the host's recording.
///
/// Implementations may hit disk; the interactive path only ever requests
/// viewport-sized ranges, the precompute worker requests larger chunks off
/// the interactive thread.
pub trait DataSource {
    /// Fetch samples `sample_start..sample_stop` for the given native
    /// channel indices. `None` means "to the end of the recording".
    fn fetch_chunk(
        &self,
        picks: &[usize],
        sample_start: usize,
        sample_stop: Option<usize>,
    ) -> FetchResult<Chunk>;

    /// Total number of samples in the recording.
    fn n_samples(&self) -> usize;
}

/// Upstream parameters the host transform depends on.
///
/// The version counter changes whenever the host's processing chain
/// (projections, whitening, filters) changes; a precomputed cache built
/// under an older version must be discarded and rebuilt, never patched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransformContext {
    /// Monotonic version of the host processing chain.
    pub version: u64,
}

/// The host's opaque per-chunk processing (filtering, projection, ...).
///
/// Must be pure given the same context: the same `(range, picks, context)`
/// always yields the same output.
pub trait ChunkTransform {
    /// Process `data` in place for the given sample range and picks.
    fn apply(
        &self,
        data: &mut [Vec<f64>],
        sample_start: usize,
        sample_stop: usize,
        picks: &[usize],
        ctx: &TransformContext,
    );
}

/// A transform that leaves chunks untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl ChunkTransform for IdentityTransform {
    fn apply(
        &self,
        _data: &mut [Vec<f64>],
        _sample_start: usize,
        _sample_stop: usize,
        _picks: &[usize],
        _ctx: &TransformContext,
    ) {
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_dimensions() {
        let chunk = Chunk {
            data: vec![vec![0.0; 4]; 2],
            times: vec![0.0, 0.1, 0.2, 0.3],
        };
        assert_eq!(chunk.n_samples(), 4);
        assert_eq!(chunk.n_channels(), 2);
    }

    #[test]
    fn fetch_error_display() {
        let e = FetchError::Truncated {
            expected: 100,
            got: 60,
        };
        assert_eq!(e.to_string(), "truncated read: expected 100 samples, got 60");
        let e = FetchError::from(io::Error::other("disk gone"));
        assert!(e.to_string().contains("disk gone"));
    }
}
