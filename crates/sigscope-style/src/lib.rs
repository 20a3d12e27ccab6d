#![forbid(unsafe_code)]

//! Deterministic color resolution for sigscope traces and regions.
//!
//! Stored colors are always light-mode; dark mode is derived, first through
//! a hand-tuned palette dictionary and then through a perceptual-lightness
//! inversion in CIELab space for anything the dictionary misses. Theme
//! detection itself is perceptual: a background is "dark" when its CIELab
//! lightness falls below the midpoint.

pub mod color;
pub mod theme;

pub use color::{Lab, Rgba, is_dark_background, invert_lightness};
pub use theme::{ColorResolver, Theme};
