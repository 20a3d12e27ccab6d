#![forbid(unsafe_code)]

//! Session runtime for sigscope.
//!
//! [`browser::Browser`] composes viewport, data window, trace set,
//! annotation engine and the precompute loader into one interactive unit,
//! fanning updates out explicitly after every mutation. Open browsers live
//! in an explicit [`registry::BrowserRegistry`] with owned handles and
//! explicit teardown. [`settings`] persists display settings across
//! sessions.

pub mod browser;
pub mod registry;
pub mod settings;

pub use browser::Browser;
pub use registry::{BrowserId, BrowserRegistry};
pub use settings::{
    DisplaySettings, FileStorage, MemoryStorage, SettingsStorage, StorageError, StorageResult,
};
