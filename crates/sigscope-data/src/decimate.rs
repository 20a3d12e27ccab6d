#![forbid(unsafe_code)]

//! Display decimation.
//!
//! Three interchangeable reductions over non-overlapping windows of `ds`
//! samples, adjusted for multi-channel data. `Peak` is the default: it emits
//! a (max, min) pair per window, a sawtooth envelope that keeps transient
//! spikes visible where `Mean` and `Subsample` would blur or skip them.
//!
//! Mean and peak windows take their timestamps from offset `ds / 2` so the
//! reduced points sit visually centered over the samples they summarize.
//! A window containing a missing marker (NaN) stays missing in the output.

use sigscope_core::DownsampleMethod;

/// Factor for automatic decimation: roughly five samples per pixel of view
/// width. `1` disables decimation.
#[must_use]
pub fn auto_factor(n_samples: usize, pixel_width: usize) -> usize {
    if pixel_width == 0 {
        return 1;
    }
    (n_samples / (pixel_width * 5)).max(1)
}

/// Reduce `(times, data)` by factor `ds` with the given method.
///
/// `ds <= 1` is an exact passthrough. Rows shorter than one window come
/// back empty for `Mean`/`Peak`, matching the window count `n / ds`.
#[must_use]
pub fn downsample(
    times: &[f64],
    data: &[Vec<f64>],
    ds: usize,
    method: DownsampleMethod,
) -> (Vec<f64>, Vec<Vec<f64>>) {
    if ds <= 1 {
        return (times.to_vec(), data.to_vec());
    }
    match method {
        DownsampleMethod::Subsample => {
            let out_times = times.iter().copied().step_by(ds).collect();
            let out_data = data
                .iter()
                .map(|row| row.iter().copied().step_by(ds).collect())
                .collect();
            (out_times, out_data)
        }
        DownsampleMethod::Mean => {
            let n = times.len() / ds;
            let stx = ds / 2;
            let out_times = (0..n).map(|i| times[stx + i * ds]).collect();
            let out_data = data
                .iter()
                .map(|row| {
                    (0..n)
                        .map(|i| {
                            let window = &row[i * ds..(i + 1) * ds];
                            window.iter().sum::<f64>() / ds as f64
                        })
                        .collect()
                })
                .collect();
            (out_times, out_data)
        }
        DownsampleMethod::Peak => {
            let n = times.len() / ds;
            let stx = ds / 2;
            let mut out_times = Vec::with_capacity(n * 2);
            for i in 0..n {
                // Each (max, min) pair shares its window's timestamp.
                out_times.push(times[stx + i * ds]);
                out_times.push(times[stx + i * ds]);
            }
            let out_data = data
                .iter()
                .map(|row| {
                    let mut out = Vec::with_capacity(n * 2);
                    for i in 0..n {
                        let window = &row[i * ds..(i + 1) * ds];
                        if window.iter().any(|v| v.is_nan()) {
                            out.push(f64::NAN);
                            out.push(f64::NAN);
                        } else {
                            let max = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                            let min = window.iter().copied().fold(f64::INFINITY, f64::min);
                            out.push(max);
                            out.push(min);
                        }
                    }
                    out
                })
                .collect();
            (out_times, out_data)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> (Vec<f64>, Vec<Vec<f64>>) {
        let times: Vec<f64> = (0..n).map(|i| i as f64 * 0.01).collect();
        let data = vec![(0..n).map(|i| i as f64).collect::<Vec<_>>()];
        (times, data)
    }

    #[test]
    fn factor_one_is_identity() {
        let (times, data) = ramp(100);
        let (t, d) = downsample(&times, &data, 1, DownsampleMethod::Subsample);
        assert_eq!(t, times);
        assert_eq!(d, data);
    }

    #[test]
    fn auto_factor_targets_five_per_pixel() {
        assert_eq!(auto_factor(5000, 100), 10);
        // Fewer samples than pixels: no decimation.
        assert_eq!(auto_factor(50, 100), 1);
        assert_eq!(auto_factor(1000, 0), 1);
    }

    #[test]
    fn subsample_keeps_every_nth() {
        let (times, data) = ramp(10);
        let (t, d) = downsample(&times, &data, 3, DownsampleMethod::Subsample);
        assert_eq!(d[0], vec![0.0, 3.0, 6.0, 9.0]);
        assert_eq!(t.len(), 4);
    }

    #[test]
    fn mean_averages_windows() {
        let (times, data) = ramp(9);
        let (t, d) = downsample(&times, &data, 3, DownsampleMethod::Mean);
        assert_eq!(d[0], vec![1.0, 4.0, 7.0]);
        // Timestamps are centered: offset ds/2 = 1.
        assert_eq!(t, vec![0.01, 0.04, 0.07]);
    }

    #[test]
    fn peak_emits_max_then_min() {
        let times: Vec<f64> = (0..6).map(|i| i as f64).collect();
        let data = vec![vec![1.0, 5.0, 2.0, -3.0, 0.0, 4.0]];
        let (t, d) = downsample(&times, &data, 3, DownsampleMethod::Peak);
        assert_eq!(d[0], vec![5.0, 1.0, 4.0, -3.0]);
        assert_eq!(t, vec![1.0, 1.0, 4.0, 4.0]);
    }

    #[test]
    fn peak_length_is_twice_window_count() {
        for (n, ds) in [(100, 7), (64, 8), (10, 3), (5, 10)] {
            let (times, data) = ramp(n);
            let (_, d) = downsample(&times, &data, ds, DownsampleMethod::Peak);
            assert_eq!(d[0].len(), 2 * (n / ds), "n={n} ds={ds}");
        }
    }

    #[test]
    fn nan_window_stays_missing() {
        let times: Vec<f64> = (0..4).map(|i| i as f64).collect();
        let data = vec![vec![1.0, f64::NAN, 3.0, 4.0]];
        let (_, d) = downsample(&times, &data, 2, DownsampleMethod::Peak);
        assert!(d[0][0].is_nan());
        assert!(d[0][1].is_nan());
        assert_eq!(d[0][2], 4.0);
        assert_eq!(d[0][3], 3.0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn peak_output_length(n in 1usize..500, ds in 2usize..32) {
                let (times, data) = ramp(n);
                let (t, d) = downsample(&times, &data, ds, DownsampleMethod::Peak);
                prop_assert_eq!(d[0].len(), 2 * (n / ds));
                prop_assert_eq!(t.len(), d[0].len());
            }

            #[test]
            fn mean_never_exceeds_window_bounds(
                values in proptest::collection::vec(-100.0f64..100.0, 8..64)
            ) {
                let times: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
                let data = vec![values.clone()];
                let (_, d) = downsample(&times, &data, 4, DownsampleMethod::Mean);
                let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
                let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                for v in &d[0] {
                    prop_assert!(*v >= lo - 1e-9 && *v <= hi + 1e-9);
                }
            }
        }
    }
}
