#![forbid(unsafe_code)]

//! Registry of open browsers.
//!
//! Browsers are owned here with explicit handles and explicit teardown;
//! closing a browser gives its background loader the bounded shutdown wait
//! before the instance is dropped. Handles stay valid across other opens
//! and closes.

use crate::browser::Browser;

/// Opaque handle to an open browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BrowserId(u64);

/// Owner of every open browser instance.
#[derive(Default)]
pub struct BrowserRegistry {
    next: u64,
    browsers: Vec<(BrowserId, Browser)>,
}

impl BrowserRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open browsers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.browsers.len()
    }

    /// True if no browser is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.browsers.is_empty()
    }

    /// Register a browser, returning its handle.
    pub fn open(&mut self, browser: Browser) -> BrowserId {
        let id = BrowserId(self.next);
        self.next += 1;
        self.browsers.push((id, browser));
        id
    }

    /// Look up a browser.
    #[must_use]
    pub fn get(&self, id: BrowserId) -> Option<&Browser> {
        self.browsers
            .iter()
            .find(|(bid, _)| *bid == id)
            .map(|(_, b)| b)
    }

    /// Look up a browser mutably.
    pub fn get_mut(&mut self, id: BrowserId) -> Option<&mut Browser> {
        self.browsers
            .iter_mut()
            .find(|(bid, _)| *bid == id)
            .map(|(_, b)| b)
    }

    /// Close one browser: shut its loader down, then drop it.
    ///
    /// Returns false for an unknown (already closed) handle.
    pub fn close(&mut self, id: BrowserId) -> bool {
        let Some(pos) = self.browsers.iter().position(|(bid, _)| *bid == id) else {
            return false;
        };
        let (_, mut browser) = self.browsers.remove(pos);
        browser.shutdown();
        true
    }

    /// Close every browser.
    pub fn close_all(&mut self) {
        for (_, browser) in &mut self.browsers {
            browser.shutdown();
        }
        self.browsers.clear();
    }

    /// Iterate over open browsers.
    pub fn iter(&self) -> impl Iterator<Item = (BrowserId, &Browser)> {
        self.browsers.iter().map(|(id, b)| (*id, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::DisplaySettings;
    use sigscope_core::{ChannelLayout, ChannelType, Chunk, DataSource, FetchResult, IdentityTransform};
    use sigscope_style::Rgba;
    use std::sync::Arc;

    struct ZeroSource;

    impl DataSource for ZeroSource {
        fn fetch_chunk(
            &self,
            picks: &[usize],
            start: usize,
            stop: Option<usize>,
        ) -> FetchResult<Chunk> {
            let stop = stop.unwrap_or(1000).min(1000);
            Ok(Chunk {
                data: vec![vec![0.0; stop - start]; picks.len()],
                times: (start..stop).map(|i| i as f64 / 100.0).collect(),
            })
        }

        fn n_samples(&self) -> usize {
            1000
        }
    }

    fn open_one(registry: &mut BrowserRegistry) -> BrowserId {
        let layout = ChannelLayout::new(
            (0..4).map(|i| format!("CH {i}")).collect(),
            vec![ChannelType::Eeg; 4],
            100.0,
        );
        let mut settings = DisplaySettings::default();
        settings.duration = 5.0;
        settings.n_channels = 4;
        let browser = Browser::new(
            Arc::new(ZeroSource),
            Arc::new(IdentityTransform),
            layout,
            None,
            &settings,
            Rgba::WHITE,
        );
        registry.open(browser)
    }

    #[test]
    fn handles_stay_valid_across_closes() {
        let mut registry = BrowserRegistry::new();
        let a = open_one(&mut registry);
        let b = open_one(&mut registry);
        assert_eq!(registry.len(), 2);

        assert!(registry.close(a));
        assert!(registry.get(a).is_none());
        assert!(registry.get(b).is_some());
        // Closing twice is a no-op.
        assert!(!registry.close(a));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn close_all_empties() {
        let mut registry = BrowserRegistry::new();
        open_one(&mut registry);
        open_one(&mut registry);
        registry.close_all();
        assert!(registry.is_empty());
    }

    #[test]
    fn ids_are_never_reused() {
        let mut registry = BrowserRegistry::new();
        let a = open_one(&mut registry);
        registry.close(a);
        let b = open_one(&mut registry);
        assert_ne!(a, b);
    }
}
