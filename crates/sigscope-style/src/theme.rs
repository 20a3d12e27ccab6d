#![forbid(unsafe_code)]

//! Trace and region color resolution.
//!
//! All stored colors are light-mode. Dark mode first consults a hand-tuned
//! dictionary (perceptual-inversion results for the handful of colors that
//! matter look muddy, so these were picked by eye), then falls back to the
//! CIELab lightness inversion. Resolution is cached per (color, dark) pair.

use std::collections::HashMap;

use sigscope_core::ChannelType;

use crate::color::{Rgba, invert_lightness};

/// Hand-tuned light→dark replacements, checked before the Lab fallback.
const DARK_DICT: [(Rgba, Rgba); 10] = [
    // background: white -> near-black panel gray
    (Rgba::rgb(255, 255, 255), Rgba::rgb(30, 30, 30)),
    // black traces -> white
    (Rgba::rgb(0, 0, 0), Rgba::rgb(255, 255, 255)),
    // darkblue (mag) -> lightblue
    (Rgba::rgb(0, 0, 139), Rgba::rgb(173, 216, 230)),
    // blue (grad, hbr) -> cornflowerblue
    (Rgba::rgb(0, 0, 255), Rgba::rgb(100, 149, 237)),
    // steelblue (ref_meg) -> lightsteelblue
    (Rgba::rgb(70, 130, 180), Rgba::rgb(176, 196, 222)),
    // magenta (ecg) -> violet
    (Rgba::rgb(191, 0, 191), Rgba::rgb(238, 130, 238)),
    // saddlebrown (seeg) -> sandybrown
    (Rgba::rgb(139, 69, 19), Rgba::rgb(244, 164, 96)),
    // seagreen (dbs) -> lightseagreen
    (Rgba::rgb(46, 139, 87), Rgba::rgb(32, 178, 170)),
    // hbo -> hotpink
    (Rgba::rgb(170, 51, 119), Rgba::rgb(255, 105, 180)),
    // lightgray (bad channels) -> dimgray
    (Rgba::rgb(211, 211, 211), Rgba::rgb(105, 105, 105)),
];

/// Cycle for per-description annotation colors; red is reserved for bad
/// channels and kept out of the cycle.
const ANNOTATION_CYCLE: [Rgba; 9] = [
    Rgba::rgb(0x1f, 0x77, 0xb4),
    Rgba::rgb(0xff, 0x7f, 0x0e),
    Rgba::rgb(0x2c, 0xa0, 0x2c),
    Rgba::rgb(0x94, 0x67, 0xbd),
    Rgba::rgb(0x8c, 0x56, 0x4b),
    Rgba::rgb(0xe3, 0x77, 0xc2),
    Rgba::rgb(0x7f, 0x7f, 0x7f),
    Rgba::rgb(0xbc, 0xbd, 0x22),
    Rgba::rgb(0x17, 0xbe, 0xcf),
];

/// Static light-mode palette: channel types, bad channels, events.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Light-mode background.
    pub background: Rgba,
    /// Color for channels marked bad.
    pub bad_channel: Rgba,
    /// Color for event marker lines.
    pub event: Rgba,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Rgba::WHITE,
            bad_channel: Rgba::rgb(211, 211, 211),
            event: Rgba::rgb(0, 255, 255),
        }
    }
}

impl Theme {
    /// Light-mode color for a channel type.
    #[must_use]
    pub fn channel_color(&self, ch_type: ChannelType) -> Rgba {
        match ch_type {
            ChannelType::MegMag => Rgba::rgb(0, 0, 139),
            ChannelType::MegGrad | ChannelType::Hbr => Rgba::rgb(0, 0, 255),
            ChannelType::RefMeg => Rgba::rgb(70, 130, 180),
            ChannelType::Ecg => Rgba::rgb(191, 0, 191),
            ChannelType::Seeg => Rgba::rgb(139, 69, 19),
            ChannelType::Dbs => Rgba::rgb(46, 139, 87),
            ChannelType::Hbo => Rgba::rgb(170, 51, 119),
            _ => Rgba::BLACK,
        }
    }

    /// Light-mode color for the n-th annotation description.
    #[must_use]
    pub fn annotation_color(&self, description_idx: usize) -> Rgba {
        ANNOTATION_CYCLE[description_idx % ANNOTATION_CYCLE.len()]
    }
}

/// Cached `(light-mode color, dark flag) -> render color` resolution.
///
/// The cache never invalidates: resolution is a pure function of its key.
#[derive(Debug, Default)]
pub struct ColorResolver {
    theme: Theme,
    dark: bool,
    cache: HashMap<Rgba, Rgba>,
}

impl ColorResolver {
    /// Create a resolver for the given theme, detecting dark mode from the
    /// actual render background.
    #[must_use]
    pub fn new(theme: Theme, dark: bool) -> Self {
        Self {
            theme,
            dark,
            cache: HashMap::new(),
        }
    }

    /// Whether dark mode is active.
    #[must_use]
    pub fn dark(&self) -> bool {
        self.dark
    }

    /// The underlying light-mode theme.
    #[must_use]
    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Switch dark mode, dropping the cache.
    pub fn set_dark(&mut self, dark: bool) {
        if self.dark != dark {
            self.dark = dark;
            self.cache.clear();
        }
    }

    /// Resolve a stored light-mode color for the current mode.
    pub fn resolve(&mut self, color: Rgba) -> Rgba {
        if !self.dark {
            return color;
        }
        if let Some(&hit) = self.cache.get(&color) {
            return hit;
        }
        let opaque = color.with_alpha(255);
        let resolved = DARK_DICT
            .iter()
            .find(|(light, _)| *light == opaque)
            .map_or_else(|| invert_lightness(color), |(_, dark)| dark.with_alpha(color.a));
        self.cache.insert(color, resolved);
        resolved
    }

    /// Render color for a channel trace.
    pub fn trace_color(&mut self, ch_type: ChannelType, is_bad: bool) -> Rgba {
        let light = if is_bad {
            self.theme.bad_channel
        } else {
            self.theme.channel_color(ch_type)
        };
        self.resolve(light)
    }

    /// Render color for the n-th annotation description.
    pub fn annotation_color(&mut self, description_idx: usize) -> Rgba {
        let light = self.theme.annotation_color(description_idx);
        self.resolve(light)
    }

    /// Render color for event markers.
    pub fn event_color(&mut self) -> Rgba {
        let light = self.theme.event;
        self.resolve(light)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_mode_is_identity() {
        let mut r = ColorResolver::new(Theme::default(), false);
        let c = Rgba::rgb(1, 2, 3);
        assert_eq!(r.resolve(c), c);
    }

    #[test]
    fn dark_mode_uses_dictionary() {
        let mut r = ColorResolver::new(Theme::default(), true);
        assert_eq!(r.resolve(Rgba::BLACK), Rgba::WHITE);
        assert_eq!(r.resolve(Rgba::rgb(0, 0, 139)), Rgba::rgb(173, 216, 230));
    }

    #[test]
    fn dark_mode_dictionary_preserves_alpha() {
        let mut r = ColorResolver::new(Theme::default(), true);
        let c = Rgba::rgba(0, 0, 255, 80);
        assert_eq!(r.resolve(c), Rgba::rgba(100, 149, 237, 80));
    }

    #[test]
    fn dark_mode_falls_back_to_inversion() {
        let mut r = ColorResolver::new(Theme::default(), true);
        // Not in the dictionary: must come back lighter, same alpha.
        let c = Rgba::rgb(40, 40, 60);
        let resolved = r.resolve(c);
        assert_ne!(resolved, c);
        use crate::color::Lab;
        assert!(Lab::from(resolved).l > Lab::from(c).l);
    }

    #[test]
    fn bad_channels_resolve_to_bad_color() {
        let mut r = ColorResolver::new(Theme::default(), false);
        assert_eq!(
            r.trace_color(ChannelType::Eeg, true),
            Rgba::rgb(211, 211, 211)
        );
        assert_eq!(r.trace_color(ChannelType::Eeg, false), Rgba::BLACK);
    }

    #[test]
    fn annotation_cycle_wraps() {
        let theme = Theme::default();
        assert_eq!(theme.annotation_color(0), theme.annotation_color(9));
    }

    #[test]
    fn resolve_is_cached() {
        let mut r = ColorResolver::new(Theme::default(), true);
        let first = r.resolve(Rgba::rgb(12, 34, 56));
        let second = r.resolve(Rgba::rgb(12, 34, 56));
        assert_eq!(first, second);
        assert_eq!(r.cache.len(), 1);
    }

    #[test]
    fn set_dark_invalidates() {
        let mut r = ColorResolver::new(Theme::default(), true);
        r.resolve(Rgba::BLACK);
        r.set_dark(false);
        assert_eq!(r.resolve(Rgba::BLACK), Rgba::BLACK);
    }
}
