#![forbid(unsafe_code)]

//! Full-recording z-score raster.
//!
//! Side product of the precompute pass: the time axis is collapsed to at
//! most the screen pixel width by block means, each channel row is
//! z-scored, and sign/magnitude map to a two-color alpha raster (red for
//! positive, blue for negative deviation). The raster backs the overview
//! strip once precompute finishes.

use sigscope_style::Rgba;

/// One RGBA row per channel, at most `width` columns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ZscoreRaster {
    /// Columns per row.
    pub width: usize,
    /// Channel-major pixels, display order.
    pub rows: Vec<Vec<Rgba>>,
}

impl ZscoreRaster {
    /// True if the raster carries no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.width == 0
    }
}

/// Collapse a channel row to `width` block means of `collapse_by` samples.
fn collapse(row: &[f64], width: usize, collapse_by: usize) -> Vec<f64> {
    (0..width)
        .map(|i| {
            let window = &row[i * collapse_by..(i + 1) * collapse_by];
            window.iter().sum::<f64>() / collapse_by as f64
        })
        .collect()
}

fn zscore(row: &mut [f64]) {
    let finite: Vec<f64> = row.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return;
    }
    let n = finite.len() as f64;
    let mean = finite.iter().sum::<f64>() / n;
    let var = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    if std == 0.0 {
        for v in row.iter_mut() {
            *v = 0.0;
        }
        return;
    }
    for v in row.iter_mut() {
        *v = (*v - mean) / std;
    }
}

/// Build the raster from the full (already transformed) recording.
#[must_use]
pub fn zscore_raster(data: &[Vec<f64>], max_pixel_width: usize) -> ZscoreRaster {
    let n_samples = data.first().map_or(0, Vec::len);
    if n_samples == 0 || max_pixel_width == 0 {
        return ZscoreRaster::default();
    }
    let collapse_by = n_samples / max_pixel_width;
    let width = if collapse_by > 0 {
        max_pixel_width
    } else {
        n_samples
    };

    let rows = data
        .iter()
        .map(|row| {
            let mut z = if collapse_by > 0 {
                collapse(row, width, collapse_by)
            } else {
                row.clone()
            };
            zscore(&mut z);

            let zmin = z.iter().copied().fold(f64::INFINITY, f64::min);
            let zmax = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            z.iter()
                .map(|&value| {
                    let value = if value.is_nan() { 0.0 } else { value };
                    if value == 0.0 {
                        Rgba::TRANSPARENT
                    } else if value < 0.0 {
                        let alpha = (255.0 * value / zmin).clamp(0.0, 255.0) as u8;
                        Rgba::rgba(0, 0, 255, alpha)
                    } else {
                        let alpha = (255.0 * value / zmax).clamp(0.0, 255.0) as u8;
                        Rgba::rgba(255, 0, 0, alpha)
                    }
                })
                .collect()
        })
        .collect();

    ZscoreRaster { width, rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_data_gives_empty_raster() {
        assert!(zscore_raster(&[], 100).is_empty());
        assert!(zscore_raster(&[vec![]], 100).is_empty());
    }

    #[test]
    fn short_rows_keep_native_width() {
        let raster = zscore_raster(&[vec![1.0, 2.0, 3.0]], 100);
        assert_eq!(raster.width, 3);
        assert_eq!(raster.rows[0].len(), 3);
    }

    #[test]
    fn long_rows_collapse_to_pixel_width() {
        let row: Vec<f64> = (0..1000).map(|i| i as f64).collect();
        let raster = zscore_raster(&[row], 64);
        assert_eq!(raster.width, 64);
        assert_eq!(raster.rows[0].len(), 64);
    }

    #[test]
    fn sign_maps_to_color() {
        let raster = zscore_raster(&[vec![-2.0, 0.0, 2.0]], 10);
        let row = &raster.rows[0];
        assert_eq!(row[0].rgb_triple(), (0, 0, 255));
        assert_eq!(row[1], Rgba::TRANSPARENT);
        assert_eq!(row[2].rgb_triple(), (255, 0, 0));
    }

    #[test]
    fn extremes_are_fully_opaque() {
        let raster = zscore_raster(&[vec![-3.0, 1.0, 1.0, 3.0]], 10);
        let row = &raster.rows[0];
        assert_eq!(row[0].a, 255);
        assert_eq!(row[3].a, 255);
        assert!(row[1].a < 255);
    }

    #[test]
    fn flat_rows_are_transparent() {
        let raster = zscore_raster(&[vec![5.0; 8]], 10);
        assert!(raster.rows[0].iter().all(|p| *p == Rgba::TRANSPARENT));
    }
}
