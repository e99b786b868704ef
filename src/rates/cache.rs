use crate::core::currency::Currency;
use crate::rates::{RateError, RateProvider};
use log::debug;
use moka::sync::Cache;
use rust_decimal::Decimal;
use std::fmt;

/// Upper bound on cached currency pairs.
const DEFAULT_CAPACITY: u64 = 1_024;

/// Memoizing wrapper around another provider.
///
/// The first lookup of each `(from, to)` pair reaches the inner provider;
/// later lookups are served from the cache. Failures are not cached, so a
/// transient error is retried on the next call. Concurrent misses on the
/// same pair share a single inner lookup. The cache belongs to this
/// instance and is safe to share between ledgers and threads.
pub struct CachedRates<P> {
    inner: P,
    cache: Cache<(Currency, Currency), Decimal>,
}

impl<P: RateProvider> CachedRates<P> {
    pub fn new(inner: P) -> Self {
        Self::with_capacity(inner, DEFAULT_CAPACITY)
    }

    /// Cache at most `capacity` pairs, evicting the least useful first.
    pub fn with_capacity(inner: P, capacity: u64) -> Self {
        Self {
            inner,
            cache: Cache::builder().max_capacity(capacity).build(),
        }
    }

    /// Number of cached pairs.
    pub fn cached_pairs(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    /// Drop every cached rate.
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P> fmt::Debug for CachedRates<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedRates")
            .field("cached_pairs", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl<P: RateProvider> RateProvider for CachedRates<P> {
    fn rate(&self, from: &Currency, to: &Currency) -> Result<Decimal, RateError> {
        if from == to {
            return Ok(Decimal::ONE);
        }
        self.cache
            .try_get_with((from.clone(), to.clone()), || -> Result<Decimal, RateError> {
                let rate = self.inner.rate(from, to)?;
                debug!("cached rate {}/{} = {}", from, to, rate);
                Ok(rate)
            })
            .map_err(|e| RateError::clone(&e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[derive(Default)]
    struct Flaky {
        calls: AtomicUsize,
        fail_first: bool,
    }

    impl RateProvider for Flaky {
        fn rate(&self, from: &Currency, to: &Currency) -> Result<Decimal, RateError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && call == 0 {
                return Err(RateError::Timeout {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
            Ok(dec!(0.25))
        }
    }

    #[test]
    fn test_second_lookup_hits_cache() {
        let rates = CachedRates::new(Flaky::default());
        assert_eq!(rates.rate(&Currency::JPY, &Currency::TWD).unwrap(), dec!(0.25));
        assert_eq!(rates.rate(&Currency::JPY, &Currency::TWD).unwrap(), dec!(0.25));
        assert_eq!(rates.inner().calls.load(Ordering::SeqCst), 1);
        assert_eq!(rates.cached_pairs(), 1);
    }

    #[test]
    fn test_distinct_pairs_looked_up_separately() {
        let rates = CachedRates::new(Flaky::default());
        rates.rate(&Currency::JPY, &Currency::TWD).unwrap();
        rates.rate(&Currency::USD, &Currency::TWD).unwrap();
        assert_eq!(rates.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_identity_not_cached() {
        let rates = CachedRates::new(Flaky::default());
        assert_eq!(rates.rate(&Currency::TWD, &Currency::TWD).unwrap(), Decimal::ONE);
        assert_eq!(rates.inner().calls.load(Ordering::SeqCst), 0);
        assert_eq!(rates.cached_pairs(), 0);
    }

    #[test]
    fn test_failure_not_cached() {
        let rates = CachedRates::new(Flaky {
            fail_first: true,
            ..Default::default()
        });
        assert!(matches!(
            rates.rate(&Currency::JPY, &Currency::TWD),
            Err(RateError::Timeout { .. })
        ));
        assert_eq!(rates.cached_pairs(), 0);
        assert_eq!(rates.rate(&Currency::JPY, &Currency::TWD).unwrap(), dec!(0.25));
    }

    #[test]
    fn test_capacity_bounds_entries() {
        let rates = CachedRates::with_capacity(Flaky::default(), 1);
        rates.rate(&Currency::JPY, &Currency::TWD).unwrap();
        rates.rate(&Currency::USD, &Currency::TWD).unwrap();
        rates.rate(&Currency::EUR, &Currency::TWD).unwrap();
        assert!(rates.cached_pairs() <= 1);
    }

    #[test]
    fn test_clear() {
        let rates = CachedRates::new(Flaky::default());
        rates.rate(&Currency::JPY, &Currency::TWD).unwrap();
        rates.clear();
        rates.rate(&Currency::JPY, &Currency::TWD).unwrap();
        assert_eq!(rates.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_shared_across_threads() {
        let rates = Arc::new(CachedRates::new(Flaky::default()));
        rates.rate(&Currency::JPY, &Currency::TWD).unwrap();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let rates = Arc::clone(&rates);
                thread::spawn(move || rates.rate(&Currency::JPY, &Currency::TWD).unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), dec!(0.25));
        }
        assert_eq!(rates.inner().calls.load(Ordering::SeqCst), 1);
    }
}
