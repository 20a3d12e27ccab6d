#![forbid(unsafe_code)]

//! RGBA color type and CIELab conversions.
//!
//! The Lab round trip follows the easyRGB reference formulas with the D65
//! 2-degree observer, which is what the lightness inversion and the
//! dark-background detector are calibrated against.

/// D65 reference white, 2-degree observer.
const REF_XYZ: [f64; 3] = [95.047, 100.000, 108.883];

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    /// Red channel (0–255).
    pub r: u8,
    /// Green channel (0–255).
    pub g: u8,
    /// Blue channel (0–255).
    pub b: u8,
    /// Alpha channel (0 = transparent, 255 = opaque).
    pub a: u8,
}

impl Rgba {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Create an opaque color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Create a color with explicit alpha.
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Same color with a different alpha.
    #[must_use]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// The opaque RGB triple, ignoring alpha.
    #[must_use]
    pub const fn rgb_triple(self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }
}

/// A CIELab color (L in 0–100, a/b roughly -128–127).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lab {
    /// Lightness (0 = black, 100 = white).
    pub l: f64,
    /// Green–red axis.
    pub a: f64,
    /// Blue–yellow axis.
    pub b: f64,
}

fn srgb_to_xyz(rgb: [f64; 3]) -> [f64; 3] {
    let mut c = rgb;
    for v in &mut c {
        *v = if *v > 0.04045 {
            ((*v + 0.055) / 1.055).powf(2.4)
        } else {
            *v / 12.92
        } * 100.0;
    }
    [
        0.4124 * c[0] + 0.3576 * c[1] + 0.1805 * c[2],
        0.2126 * c[0] + 0.7152 * c[1] + 0.0722 * c[2],
        0.0193 * c[0] + 0.1192 * c[1] + 0.9505 * c[2],
    ]
}

impl From<Rgba> for Lab {
    fn from(color: Rgba) -> Self {
        let rgb = [
            color.r as f64 / 255.0,
            color.g as f64 / 255.0,
            color.b as f64 / 255.0,
        ];
        let xyz = srgb_to_xyz(rgb);
        let mut f = [0.0; 3];
        for (fi, (x, r)) in f.iter_mut().zip(xyz.iter().zip(REF_XYZ.iter())) {
            let t = x / r;
            *fi = if t > 0.008856 {
                t.cbrt()
            } else {
                7.787 * t + 16.0 / 116.0
            };
        }
        Self {
            l: 116.0 * f[1] - 16.0,
            a: 500.0 * (f[0] - f[1]),
            b: 200.0 * (f[1] - f[2]),
        }
    }
}

impl Lab {
    /// Convert back to RGBA (opaque), clipping to the sRGB gamut.
    #[must_use]
    pub fn to_rgba(self) -> Rgba {
        let fy = (self.l + 16.0) / 116.0;
        let fx = self.a / 500.0 + fy;
        let fz = fy - self.b / 200.0;
        let mut xyz = [fx, fy, fz];
        for v in &mut xyz {
            // Same threshold as f(t) inverted: t^3 > 0.008856.
            *v = if *v > 0.206_893_034_422_963_83 {
                v.powi(3)
            } else {
                (*v - 16.0 / 116.0) / 7.787
            };
        }
        for (v, r) in xyz.iter_mut().zip(REF_XYZ.iter()) {
            *v *= r / 100.0;
        }
        let lin = [
            3.2406 * xyz[0] - 1.5372 * xyz[1] - 0.4986 * xyz[2],
            -0.9689 * xyz[0] + 1.8758 * xyz[1] + 0.0415 * xyz[2],
            0.0557 * xyz[0] - 0.2040 * xyz[1] + 1.0570 * xyz[2],
        ];
        let mut out = [0u8; 3];
        for (o, v) in out.iter_mut().zip(lin.iter()) {
            let s = if *v > 0.0031308 {
                1.055 * v.powf(1.0 / 2.4) - 0.055
            } else {
                v * 12.92
            };
            *o = (s.clamp(0.0, 1.0) * 255.0).round() as u8;
        }
        Rgba::rgb(out[0], out[1], out[2])
    }
}

/// Invert the perceptual lightness of a color, keeping hue and alpha.
///
/// Used as the fallback for colors the dark-palette dictionary misses.
#[must_use]
pub fn invert_lightness(color: Rgba) -> Rgba {
    let mut lab = Lab::from(color);
    lab.l = 100.0 - lab.l;
    lab.to_rgba().with_alpha(color.a)
}

/// Perceptual theme detection: a background is dark when its CIELab
/// lightness is below the midpoint.
#[must_use]
pub fn is_dark_background(background: Rgba) -> bool {
    Lab::from(background).l < 50.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lab_endpoints() {
        let black = Lab::from(Rgba::BLACK);
        assert!(black.l.abs() < 1e-6);
        let white = Lab::from(Rgba::WHITE);
        assert!((white.l - 100.0).abs() < 1e-3);
    }

    #[test]
    fn lab_round_trip_is_close() {
        for color in [
            Rgba::rgb(70, 130, 180),
            Rgba::rgb(139, 69, 19),
            Rgba::rgb(46, 139, 87),
            Rgba::rgb(170, 51, 119),
        ] {
            let back = Lab::from(color).to_rgba();
            assert!((back.r as i16 - color.r as i16).abs() <= 1, "{color:?} -> {back:?}");
            assert!((back.g as i16 - color.g as i16).abs() <= 1, "{color:?} -> {back:?}");
            assert!((back.b as i16 - color.b as i16).abs() <= 1, "{color:?} -> {back:?}");
        }
    }

    #[test]
    fn invert_lightness_swaps_extremes() {
        assert_eq!(invert_lightness(Rgba::BLACK), Rgba::WHITE);
        assert_eq!(invert_lightness(Rgba::WHITE), Rgba::BLACK);
    }

    #[test]
    fn invert_lightness_keeps_alpha() {
        let c = Rgba::rgba(10, 20, 30, 75);
        assert_eq!(invert_lightness(c).a, 75);
    }

    #[test]
    fn dark_background_detection() {
        assert!(is_dark_background(Rgba::rgb(30, 30, 30)));
        assert!(!is_dark_background(Rgba::WHITE));
        // Mid grays land on the perceptual midpoint, not the numeric one.
        assert!(is_dark_background(Rgba::rgb(100, 100, 100)));
        assert!(!is_dark_background(Rgba::rgb(150, 150, 150)));
    }
}
