//! Explicit window-fetch memoization.
//!
//! The cache is an injectable wrapper scoped to the store instance it wraps
//! and keyed by the full tuple of window bounds. It never outlives its store,
//! so reusing the same parameters against a different store can never serve
//! stale cross-store results.

use std::cell::RefCell;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use price_map_property_models::ComparableRecord;
use price_map_spatial::SearchWindow;

use crate::{ComparableStore, StoreError};

/// Exact-match cache key: bit patterns of the four coordinate bounds plus
/// both dates. Bit patterns make the key `Ord` without tolerating any
/// floating-point slack; a window differing in the last ulp is a different
/// fetch.
type WindowKey = (u64, u64, u64, u64, NaiveDate, NaiveDate);

const fn window_key(window: &SearchWindow) -> WindowKey {
    (
        window.north.to_bits(),
        window.south.to_bits(),
        window.east.to_bits(),
        window.west.to_bits(),
        window.earliest_date,
        window.latest_date,
    )
}

/// A [`ComparableStore`] wrapper that memoizes window fetches.
///
/// Useful when a parameter grid revisits the same derived window (for
/// example, candidates that differ only in geohash precision). Interior
/// mutability keeps the trait object shape; the pipeline is single-threaded
/// so `RefCell` suffices.
pub struct CachedStore<S> {
    inner: S,
    cache: RefCell<BTreeMap<WindowKey, Vec<ComparableRecord>>>,
}

impl<S: ComparableStore> CachedStore<S> {
    /// Wraps a store with an empty cache.
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: RefCell::new(BTreeMap::new()),
        }
    }

    /// Number of distinct windows currently cached.
    #[must_use]
    pub fn cached_windows(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Drops all cached results, keeping the wrapped store.
    pub fn clear(&self) {
        self.cache.borrow_mut().clear();
    }

    /// Unwraps the inner store, discarding the cache.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ComparableStore> ComparableStore for CachedStore<S> {
    fn fetch_in_window(&self, window: &SearchWindow) -> Result<Vec<ComparableRecord>, StoreError> {
        let key = window_key(window);

        if let Some(hit) = self.cache.borrow().get(&key) {
            log::debug!("Window cache hit ({} rows)", hit.len());
            return Ok(hit.clone());
        }

        let records = self.inner.fetch_in_window(window)?;
        self.cache.borrow_mut().insert(key, records.clone());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingStore {
        fetches: Cell<usize>,
    }

    impl ComparableStore for CountingStore {
        fn fetch_in_window(
            &self,
            _window: &SearchWindow,
        ) -> Result<Vec<ComparableRecord>, StoreError> {
            self.fetches.set(self.fetches.get() + 1);
            Ok(Vec::new())
        }
    }

    fn window(north: f64) -> SearchWindow {
        SearchWindow {
            north,
            south: 52.0,
            east: 0.2,
            west: 0.1,
            earliest_date: NaiveDate::from_ymd_opt(2019, 6, 15).unwrap(),
            latest_date: NaiveDate::from_ymd_opt(2021, 6, 15).unwrap(),
        }
    }

    #[test]
    fn second_fetch_is_served_from_cache() {
        let store = CachedStore::new(CountingStore {
            fetches: Cell::new(0),
        });

        store.fetch_in_window(&window(52.3)).unwrap();
        store.fetch_in_window(&window(52.3)).unwrap();

        assert_eq!(store.cached_windows(), 1);
        assert_eq!(store.into_inner().fetches.get(), 1);
    }

    #[test]
    fn different_bounds_miss() {
        let store = CachedStore::new(CountingStore {
            fetches: Cell::new(0),
        });

        store.fetch_in_window(&window(52.3)).unwrap();
        store.fetch_in_window(&window(52.4)).unwrap();

        assert_eq!(store.cached_windows(), 2);
        assert_eq!(store.into_inner().fetches.get(), 2);
    }

    #[test]
    fn clear_empties_the_cache() {
        let store = CachedStore::new(CountingStore {
            fetches: Cell::new(0),
        });

        store.fetch_in_window(&window(52.3)).unwrap();
        store.clear();
        assert_eq!(store.cached_windows(), 0);

        store.fetch_in_window(&window(52.3)).unwrap();
        assert_eq!(store.into_inner().fetches.get(), 2);
    }
}
