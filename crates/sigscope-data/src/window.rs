#![forbid(unsafe_code)]

//! Resolution of the viewport into a drawable `(times, data)` buffer.
//!
//! [`DataWindow`] is a pure function of viewport + data source; it owns no
//! lifecycle beyond caching its last successful result. The pipeline order
//! is fixed: resolve sample range → fetch (live or from the precompute
//! cache) → host transform → per-channel-type scaling → DC removal over the
//! visible window → clipping → decimation.
//!
//! Rows of the resolved buffer correspond one-to-one with the requested
//! picks, in pick order, regardless of which source served them.
//!
//! # Failure
//!
//! A failed fetch leaves the previous buffer untouched and surfaces the
//! error; no partially written buffer is ever observable.

use std::sync::Arc;

use sigscope_core::{
    ChannelLayout, ChunkTransform, Clipping, DataSource, Decimation, FetchResult,
    TransformContext, ViewExtent, ViewportState,
};

use crate::decimate::{auto_factor, downsample};
use crate::precompute::PrecomputeCache;

/// Inputs to one resolution pass.
#[derive(Debug, Clone, Copy)]
pub struct ResolveParams<'a> {
    /// Current viewport.
    pub viewport: &'a ViewportState,
    /// Recording geometry.
    pub extent: &'a ViewExtent,
    /// Channel metadata.
    pub layout: &'a ChannelLayout,
    /// Native channel indices to resolve, in display order.
    pub picks: &'a [usize],
    /// View width in pixels, for automatic decimation.
    pub pixel_width: usize,
}

/// The resolved viewport buffer and its data source state.
#[derive(Debug, Default)]
pub struct DataWindow {
    times: Vec<f64>,
    data: Vec<Vec<f64>>,
    cache: Option<Arc<PrecomputeCache>>,
    ctx: TransformContext,
}

impl DataWindow {
    /// Create an empty window under a transform context.
    #[must_use]
    pub fn new(ctx: TransformContext) -> Self {
        Self {
            ctx,
            ..Self::default()
        }
    }

    /// Timestamps of the last successful resolution.
    #[must_use]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Channel-major samples of the last successful resolution, one row per
    /// requested pick.
    #[must_use]
    pub fn data(&self) -> &[Vec<f64>] {
        &self.data
    }

    /// True once a precompute cache serves this window.
    #[must_use]
    pub fn is_precomputed(&self) -> bool {
        self.cache.is_some()
    }

    /// The active transform context.
    #[must_use]
    pub fn ctx(&self) -> TransformContext {
        self.ctx
    }

    /// Install a finished precompute cache.
    ///
    /// A cache built under a stale transform context is rejected: the
    /// rerun that is already queued will deliver a fresh one.
    pub fn install_cache(&mut self, cache: Arc<PrecomputeCache>) -> bool {
        if cache.ctx != self.ctx {
            tracing::debug!(
                cache_version = cache.ctx.version,
                current_version = self.ctx.version,
                "discarding stale precompute cache"
            );
            return false;
        }
        self.cache = Some(cache);
        true
    }

    /// Drop the cache and fall back to live fetch.
    pub fn clear_cache(&mut self) {
        self.cache = None;
    }

    /// Move to a new transform context, invalidating any cache built under
    /// the old one.
    pub fn set_ctx(&mut self, ctx: TransformContext) {
        if self.ctx != ctx {
            self.ctx = ctx;
            self.cache = None;
        }
    }

    /// The installed cache's overview raster, if any.
    #[must_use]
    pub fn zscore(&self) -> Option<&crate::zscore::ZscoreRaster> {
        self.cache.as_ref().map(|c| &c.zscore)
    }

    /// Resolve the viewport into a fresh `(times, data)` buffer.
    ///
    /// Serves from the precompute cache when one is installed and never
    /// calls `fetch_chunk` in that case.
    pub fn resolve(
        &mut self,
        params: &ResolveParams<'_>,
        source: &dyn DataSource,
        transform: &dyn ChunkTransform,
    ) -> FetchResult<()> {
        let vp = params.viewport;
        vp.validate(params.extent);
        let (start, stop) = vp.sample_range(params.extent);

        let (mut times, mut data) = match &self.cache {
            Some(cache) => slice_cache(cache, params, start, stop),
            None => {
                let mut chunk = source.fetch_chunk(params.picks, start, Some(stop))?;
                transform.apply(&mut chunk.data, start, stop, params.picks, &self.ctx);
                for (row, &pick) in chunk.data.iter_mut().zip(params.picks.iter()) {
                    let div = 2.0 * params.layout.scaling(params.layout.types[pick]);
                    for v in row.iter_mut() {
                        *v /= div;
                    }
                }
                (chunk.times, chunk.data)
            }
        };

        if vp.remove_dc {
            for row in &mut data {
                remove_dc(row);
            }
        }

        match vp.clipping {
            Clipping::None => {}
            Clipping::Clamp => {
                for row in &mut data {
                    for v in row.iter_mut() {
                        *v = v.clamp(-0.5, 0.5);
                    }
                }
            }
            Clipping::Value(clip) => {
                for row in &mut data {
                    for v in row.iter_mut() {
                        if (*v * vp.scale_factor).abs() > clip {
                            *v = f64::NAN;
                        }
                    }
                }
            }
        }

        let ds = match vp.decimation {
            Decimation::None => 1,
            Decimation::Factor(k) => k.max(1),
            Decimation::Auto => auto_factor(times.len(), params.pixel_width),
        };
        if ds > 1 {
            (times, data) = downsample(&times, &data, ds, vp.downsample_method);
        }

        self.times = times;
        self.data = data;
        Ok(())
    }
}

/// Subtract the mean over the visible window, ignoring missing markers.
fn remove_dc(row: &mut [f64]) {
    let finite: Vec<f64> = row.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return;
    }
    let mean = finite.iter().sum::<f64>() / finite.len() as f64;
    for v in row.iter_mut() {
        *v -= mean;
    }
}

/// Slice the requested picks and sample range out of the cache.
fn slice_cache(
    cache: &PrecomputeCache,
    params: &ResolveParams<'_>,
    start: usize,
    stop: usize,
) -> (Vec<f64>, Vec<Vec<f64>>) {
    let stop = stop.min(cache.times.len());
    let start = start.min(stop);
    let times = cache.times[start..stop].to_vec();
    let data = params
        .picks
        .iter()
        .map(|&pick| cache.data[params.layout.order_idx(pick)][start..stop].to_vec())
        .collect();
    (times, data)
}
