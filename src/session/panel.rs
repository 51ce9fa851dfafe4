//! Inspection panel caches.
//!
//! The session never looks at panel contents, it only marks them stale after state changes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use strum_macros::{Display, EnumIter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
pub enum PanelKind {
    Locals,
    Registers,
    Goroutines,
    Stack,
    Threads,
    Globals,
    Breakpoints,
    Expressions,
}

/// Invalidation contract of a panel.
pub trait PanelCache: Send + Sync {
    /// Mark content as stale, the panel refetches it on next render.
    fn clear(&self);
}

enum LoadState<T> {
    Stale,
    Loading,
    Loaded(T),
}

/// Content loaded in background on demand.
///
/// Every [`PanelCache::clear`] starts a new generation, results of loads started
/// in an older generation are thrown away.
pub struct AsyncLoad<T> {
    inner: Mutex<(u64, LoadState<T>)>,
}

impl<T> Default for AsyncLoad<T> {
    fn default() -> Self {
        Self {
            inner: Mutex::new((0, LoadState::Stale)),
        }
    }
}

impl<T: Clone> AsyncLoad<T> {
    /// Loaded content, `None` while stale or loading.
    pub fn get(&self) -> Option<T> {
        match &self.inner.lock().unwrap().1 {
            LoadState::Loaded(data) => Some(data.clone()),
            LoadState::Stale | LoadState::Loading => None,
        }
    }

    /// Returns a generation token if the caller should start loading.
    pub fn begin_load(&self) -> Option<u64> {
        let mut guard = self.inner.lock().unwrap();
        let (generation, state) = &mut *guard;
        match *state {
            LoadState::Stale => {
                *state = LoadState::Loading;
                Some(*generation)
            }
            LoadState::Loading | LoadState::Loaded(_) => None,
        }
    }

    pub fn finish_load(&self, generation: u64, data: T) {
        let mut inner = self.inner.lock().unwrap();
        if inner.0 == generation {
            inner.1 = LoadState::Loaded(data);
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self.inner.lock().unwrap().1, LoadState::Stale)
    }
}

impl<T: Send> PanelCache for AsyncLoad<T> {
    fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.0 += 1;
        inner.1 = LoadState::Stale;
    }
}

/// Panel caches known to the session.
#[derive(Default, Clone)]
pub struct Panels {
    caches: HashMap<PanelKind, Arc<dyn PanelCache>>,
}

impl Panels {
    pub fn register(&mut self, kind: PanelKind, cache: Arc<dyn PanelCache>) {
        self.caches.insert(kind, cache);
    }

    /// Clear a panel, unregistered panels are ignored.
    pub fn clear(&self, kind: PanelKind) {
        if let Some(cache) = self.caches.get(&kind) {
            cache.clear();
        }
    }
}
