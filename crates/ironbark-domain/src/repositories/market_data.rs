use crate::errors::DataError;
use crate::value_objects::bar::Bar;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

/// Port for historical bar retrieval. Returned sequences are ordered by
/// timestamp and possibly sparse; gaps are never synthesized. An empty
/// range is a `DataError::NotFound`, not an empty vector.
pub trait BarRepository: Send + Sync {
    fn get_bars(&self, symbol: &str, start: i64, end: i64) -> Result<Vec<Bar>, DataError>;
}

impl<T: BarRepository + ?Sized> BarRepository for Box<T> {
    fn get_bars(&self, symbol: &str, start: i64, end: i64) -> Result<Vec<Bar>, DataError> {
        (**self).get_bars(symbol, start, end)
    }
}

/// In-memory store, used by tests and as the backing for pre-loaded runs.
#[derive(Debug, Default)]
pub struct MemoryBarRepository {
    series: BTreeMap<String, Vec<Bar>>,
}

impl MemoryBarRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bars(bars: Vec<Bar>) -> Self {
        let mut repo = Self::new();
        for bar in bars {
            repo.series.entry(bar.symbol.clone()).or_default().push(bar);
        }
        for series in repo.series.values_mut() {
            series.sort_by_key(|bar| bar.timestamp);
        }
        repo
    }

    pub fn insert_series(&mut self, symbol: &str, mut bars: Vec<Bar>) {
        bars.sort_by_key(|bar| bar.timestamp);
        self.series.insert(symbol.to_string(), bars);
    }
}

impl BarRepository for MemoryBarRepository {
    fn get_bars(&self, symbol: &str, start: i64, end: i64) -> Result<Vec<Bar>, DataError> {
        let bars: Vec<Bar> = self
            .series
            .get(symbol)
            .map(|series| {
                series
                    .iter()
                    .filter(|bar| bar.timestamp >= start && bar.timestamp <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if bars.is_empty() {
            return Err(DataError::NotFound {
                symbol: symbol.to_string(),
                start,
                end,
            });
        }
        Ok(bars)
    }
}

/// Caches per-(symbol, range) results for the duration of a run set, so the
/// optimizer's repeated engine invocations hit storage once. Reads are safe
/// to share across worker threads.
pub struct CachedBarRepository<R: BarRepository> {
    inner: R,
    cache: RwLock<HashMap<(String, i64, i64), Arc<Vec<Bar>>>>,
}

impl<R: BarRepository> CachedBarRepository<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn cached_ranges(&self) -> usize {
        self.cache.read().map(|cache| cache.len()).unwrap_or(0)
    }
}

impl<R: BarRepository> BarRepository for CachedBarRepository<R> {
    fn get_bars(&self, symbol: &str, start: i64, end: i64) -> Result<Vec<Bar>, DataError> {
        let key = (symbol.to_string(), start, end);
        if let Ok(cache) = self.cache.read() {
            if let Some(bars) = cache.get(&key) {
                return Ok(bars.as_ref().clone());
            }
        }

        let bars = Arc::new(self.inner.get_bars(symbol, start, end)?);
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key, Arc::clone(&bars));
        }
        Ok(bars.as_ref().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DataError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn bar(symbol: &str, timestamp: i64) -> Bar {
        Bar {
            symbol: symbol.to_string(),
            timestamp,
            open: 10.0,
            high: 10.0,
            low: 10.0,
            close: 10.0,
            volume: 1,
        }
    }

    #[test]
    fn memory_repo_filters_range_and_errors_when_empty() {
        let repo = MemoryBarRepository::from_bars(vec![
            bar("BHP", 1),
            bar("BHP", 5),
            bar("BHP", 9),
        ]);
        let bars = repo.get_bars("BHP", 2, 9).unwrap();
        assert_eq!(bars.len(), 2);

        let err = repo.get_bars("BHP", 100, 200).unwrap_err();
        assert!(matches!(err, DataError::NotFound { .. }));
        let err = repo.get_bars("CSL", 1, 9).unwrap_err();
        assert!(matches!(err, DataError::NotFound { .. }));
    }

    struct Counting {
        inner: MemoryBarRepository,
        calls: AtomicUsize,
    }

    impl BarRepository for Counting {
        fn get_bars(&self, symbol: &str, start: i64, end: i64) -> Result<Vec<Bar>, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get_bars(symbol, start, end)
        }
    }

    #[test]
    fn cache_serves_repeat_reads_from_memory() {
        let counting = Counting {
            inner: MemoryBarRepository::from_bars(vec![bar("BHP", 1), bar("BHP", 2)]),
            calls: AtomicUsize::new(0),
        };
        let cached = CachedBarRepository::new(counting);

        let first = cached.get_bars("BHP", 1, 2).unwrap();
        let second = cached.get_bars("BHP", 1, 2).unwrap();
        assert_eq!(first, second);
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cached.cached_ranges(), 1);
    }
}
