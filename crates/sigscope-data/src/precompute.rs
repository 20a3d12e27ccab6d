#![forbid(unsafe_code)]

//! Background precompute of the whole recording.
//!
//! One worker thread fetches and transforms the dataset in a small number of
//! chunks (about ten: finer chunking costs more in per-call overhead than it
//! buys in progress-reporting granularity),
//! then hands the finished [`PrecomputeCache`] to the interactive thread
//! through the event channel. The cache is built entirely on the worker and
//! never touched by it again after the handoff.
//!
//! # Concurrency contract
//!
//! - At most one load in flight. A rerun requested mid-load sets a pending
//!   flag that is consumed exactly once after the in-flight load finishes.
//! - Progress events are strictly increasing and in chunk order; `Finished`
//!   is delivered exactly once per load, after the last progress event.
//! - Cancellation is checked between chunks only; a run is never
//!   interrupted mid-chunk. No partial cache is ever published.
//! - Shutdown waits a bounded time for the current chunk, then detaches.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use sigscope_core::{ChunkTransform, DataSource, FetchError, TransformContext};

use crate::zscore::{ZscoreRaster, zscore_raster};

/// Chunk count for the full-dataset load.
const N_CHUNKS: usize = 10;

/// The finished full-recording buffer, plus side products.
///
/// Rows are in display order and already transformed and scaled; DC removal
/// is deliberately not baked in, it depends on the visible window and is
/// re-applied at view time.
#[derive(Debug, Clone)]
pub struct PrecomputeCache {
    /// Channel-major samples, display order, all channels.
    pub data: Vec<Vec<f64>>,
    /// Timestamps for every sample column.
    pub times: Vec<f64>,
    /// Overview raster computed from the finished buffer.
    pub zscore: ZscoreRaster,
    /// Transform context the cache was built under.
    pub ctx: TransformContext,
}

/// One-way notifications from the worker to the interactive thread.
#[derive(Debug)]
pub enum LoadEvent {
    /// Fraction complete in `(0, 1]`, strictly increasing.
    Progress(f64),
    /// The finished cache; delivered exactly once per load.
    Finished(Arc<PrecomputeCache>),
    /// The load aborted on a fetch failure; no cache was published.
    Failed(FetchError),
}

/// Whether precompute runs at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrecomputePolicy {
    /// Decide from the memory probe.
    #[default]
    Auto,
    /// Always precompute, regardless of memory.
    On,
    /// Never precompute; serve every viewport from live fetch.
    Off,
}

/// Host-supplied memory estimation for the `Auto` policy.
///
/// The arithmetic (disk size × format multiplier × 2) is a heuristic tied
/// to specific on-disk formats, so it lives behind this trait rather than
/// in fixed code.
pub trait MemoryProbe {
    /// On-disk size of the dataset, if known.
    fn dataset_bytes(&self) -> Option<u64>;
    /// Expansion factor from the on-disk sample format to f64 in memory.
    fn format_multiplier(&self) -> f64;
    /// Currently free memory, if determinable.
    fn free_bytes(&self) -> Option<u64>;
}

/// Evaluate the precompute policy against available memory.
///
/// `Auto` with an inconclusive probe disables precompute; the viewer keeps
/// working from the live fetch path.
#[must_use]
pub fn should_precompute(policy: PrecomputePolicy, probe: &dyn MemoryProbe) -> bool {
    match policy {
        PrecomputePolicy::On => true,
        PrecomputePolicy::Off => false,
        PrecomputePolicy::Auto => {
            let (Some(disk), Some(free)) = (probe.dataset_bytes(), probe.free_bytes()) else {
                tracing::info!("memory estimate unavailable, precompute disabled");
                return false;
            };
            // Data is loaded into a working copy before processing, hence
            // the factor of two on top of the format expansion.
            let expected = (disk as f64 * probe.format_multiplier() * 2.0) as u64;
            if expected < free {
                tracing::debug!(expected, free, "precompute fits in memory");
                true
            } else {
                tracing::info!(
                    expected,
                    free,
                    "precomputed data would not fit in free memory, precompute disabled"
                );
                false
            }
        }
    }
}

/// Everything the worker needs; cheap to clone for reruns.
#[derive(Clone)]
pub struct LoadJob {
    /// The host recording.
    pub source: Arc<dyn DataSource + Send + Sync>,
    /// The host processing chain.
    pub transform: Arc<dyn ChunkTransform + Send + Sync>,
    /// Native channel indices in display order.
    pub picks: Vec<usize>,
    /// Per-pick normalization divisors (`2 × type scaling`).
    pub scalings: Vec<f64>,
    /// Context the transform runs under.
    pub ctx: TransformContext,
    /// Width cap for the z-score raster.
    pub max_pixel_width: usize,
}

impl std::fmt::Debug for LoadJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadJob")
            .field("picks", &self.picks.len())
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}

/// Owner of the single background load.
#[derive(Debug)]
pub struct PrecomputeLoader {
    job: LoadJob,
    rx: Option<mpsc::Receiver<LoadEvent>>,
    handle: Option<JoinHandle<()>>,
    cancel: Arc<AtomicBool>,
    pending_rerun: bool,
    progress: f64,
}

impl PrecomputeLoader {
    /// Create an idle loader for a job.
    #[must_use]
    pub fn new(job: LoadJob) -> Self {
        Self {
            job,
            rx: None,
            handle: None,
            cancel: Arc::new(AtomicBool::new(false)),
            pending_rerun: false,
            progress: 0.0,
        }
    }

    /// True while a load is in flight.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.rx.is_some()
    }

    /// Last observed progress fraction of the current load.
    #[must_use]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Start a load if none is running; otherwise queue a rerun.
    pub fn request(&mut self) {
        if self.is_running() {
            self.pending_rerun = true;
        } else {
            self.start();
        }
    }

    /// Replace the job (upstream transform parameters changed) and load
    /// again. Mid-load this queues: the replay happens exactly once, after
    /// the in-flight load finishes.
    pub fn rerun(&mut self, job: LoadJob) {
        self.job = job;
        self.request();
    }

    /// Drain worker events.
    ///
    /// Must be called from the interactive thread; consuming a terminal
    /// event here is what triggers a queued rerun.
    pub fn poll(&mut self) -> Vec<LoadEvent> {
        let Some(rx) = self.rx.take() else {
            return Vec::new();
        };
        let mut events = Vec::new();
        let mut done = false;
        while let Ok(event) = rx.try_recv() {
            match &event {
                LoadEvent::Progress(f) => self.progress = *f,
                LoadEvent::Finished(_) | LoadEvent::Failed(_) => done = true,
            }
            events.push(event);
        }
        if done {
            if let Some(handle) = self.handle.take() {
                let _ = handle.join();
            }
            if self.pending_rerun {
                self.pending_rerun = false;
                self.start();
            }
        } else {
            self.rx = Some(rx);
        }
        events
    }

    /// Stop accepting the current run and wait up to `timeout` for the
    /// worker to finish its chunk, then detach it.
    pub fn shutdown(&mut self, timeout: Duration) {
        self.pending_rerun = false;
        self.cancel.store(true, Ordering::Relaxed);
        let Some(handle) = self.handle.take() else {
            self.rx = None;
            return;
        };
        let deadline = Instant::now() + timeout;
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        if handle.is_finished() {
            let _ = handle.join();
        } else {
            tracing::info!("detaching unfinished precompute worker");
            drop(handle);
        }
        self.rx = None;
    }

    fn start(&mut self) {
        debug_assert!(!self.is_running(), "second load while one is in flight");
        let (tx, rx) = mpsc::channel();
        self.cancel = Arc::new(AtomicBool::new(false));
        self.progress = 0.0;
        let job = self.job.clone();
        let cancel = Arc::clone(&self.cancel);
        let handle = thread::Builder::new()
            .name("sigscope-precompute".into())
            .spawn(move || run_load(&job, &cancel, &tx))
            .expect("failed to spawn precompute worker");
        self.rx = Some(rx);
        self.handle = Some(handle);
    }
}

impl Drop for PrecomputeLoader {
    fn drop(&mut self) {
        self.shutdown(Duration::from_secs(3));
    }
}

fn run_load(job: &LoadJob, cancel: &AtomicBool, tx: &mpsc::Sender<LoadEvent>) {
    let total = job.source.n_samples();
    let n_chunks = N_CHUNKS.min(total.max(1));
    let chunk_size = total / n_chunks;

    let mut data: Vec<Vec<f64>> = vec![Vec::with_capacity(total); job.picks.len()];
    let mut times: Vec<f64> = Vec::with_capacity(total);

    for n in 0..n_chunks {
        if cancel.load(Ordering::Relaxed) {
            tracing::debug!("precompute cancelled between chunks");
            return;
        }
        let start = n * chunk_size;
        // The last chunk runs to the end to absorb division rounding.
        let stop = if n == n_chunks - 1 {
            None
        } else {
            Some(start + chunk_size)
        };
        let mut chunk = match job.source.fetch_chunk(&job.picks, start, stop) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::warn!(chunk = n, error = %e, "precompute aborted");
                let _ = tx.send(LoadEvent::Failed(e));
                return;
            }
        };
        let chunk_stop = start + chunk.n_samples();
        job.transform
            .apply(&mut chunk.data, start, chunk_stop, &job.picks, &job.ctx);
        for (row, (acc, div)) in chunk
            .data
            .iter()
            .zip(data.iter_mut().zip(job.scalings.iter()))
        {
            acc.extend(row.iter().map(|v| v / div));
        }
        times.extend_from_slice(&chunk.times);

        let _ = tx.send(LoadEvent::Progress((n + 1) as f64 / n_chunks as f64));
    }

    let zscore = zscore_raster(&data, job.max_pixel_width);
    let cache = PrecomputeCache {
        data,
        times,
        zscore,
        ctx: job.ctx,
    };
    let _ = tx.send(LoadEvent::Finished(Arc::new(cache)));
}
