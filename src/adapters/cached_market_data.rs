//! Time-to-live memoization over any [`MarketDataPort`].

use std::collections::BTreeMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use dashmap::DashMap;

use crate::domain::classifier::InstrumentMetadata;
use crate::domain::error::ModelfolioError;
use crate::domain::price::PricePoint;
use crate::ports::market_data_port::MarketDataPort;

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

type HistoryKey = (Vec<String>, NaiveDate, NaiveDate);

struct Cached<V> {
    value: V,
    stored_at: Instant,
}

/// Caches successful responses per request for `ttl`. Errors are never
/// cached. Keys include every argument so distinct requests never share an
/// entry.
pub struct CachedMarketData<M> {
    inner: M,
    ttl: Duration,
    histories: DashMap<HistoryKey, Cached<BTreeMap<String, Vec<PricePoint>>>>,
    prices: DashMap<String, Cached<f64>>,
    expense_ratios: DashMap<String, Cached<Option<f64>>>,
    metadata: DashMap<String, Cached<InstrumentMetadata>>,
}

impl<M: MarketDataPort> CachedMarketData<M> {
    pub fn new(inner: M, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            histories: DashMap::new(),
            prices: DashMap::new(),
            expense_ratios: DashMap::new(),
            metadata: DashMap::new(),
        }
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }

    /// Number of live and stale entries across all request kinds.
    pub fn len(&self) -> usize {
        self.histories.len() + self.prices.len() + self.expense_ratios.len() + self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops entries older than the TTL.
    pub fn cleanup_stale(&self) {
        let ttl = self.ttl;
        self.histories.retain(|_, v| v.stored_at.elapsed() <= ttl);
        self.prices.retain(|_, v| v.stored_at.elapsed() <= ttl);
        self.expense_ratios.retain(|_, v| v.stored_at.elapsed() <= ttl);
        self.metadata.retain(|_, v| v.stored_at.elapsed() <= ttl);
    }

    pub fn clear(&self) {
        self.histories.clear();
        self.prices.clear();
        self.expense_ratios.clear();
        self.metadata.clear();
    }
}

fn cached<K, V>(
    map: &DashMap<K, Cached<V>>,
    ttl: Duration,
    key: K,
    kind: &'static str,
    fetch: impl FnOnce() -> Result<V, ModelfolioError>,
) -> Result<V, ModelfolioError>
where
    K: Eq + Hash,
    V: Clone,
{
    let hit = map
        .get(&key)
        .filter(|entry| entry.stored_at.elapsed() <= ttl)
        .map(|entry| entry.value.clone());
    if let Some(value) = hit {
        tracing::debug!(kind, "market data cache hit");
        return Ok(value);
    }

    let value = fetch()?;
    map.insert(
        key,
        Cached {
            value: value.clone(),
            stored_at: Instant::now(),
        },
    );
    Ok(value)
}

impl<M: MarketDataPort> MarketDataPort for CachedMarketData<M> {
    fn get_price_history(
        &self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<String, Vec<PricePoint>>, ModelfolioError> {
        let mut key_tickers = tickers.to_vec();
        key_tickers.sort();
        cached(
            &self.histories,
            self.ttl,
            (key_tickers, start, end),
            "price_history",
            || self.inner.get_price_history(tickers, start, end),
        )
    }

    fn get_current_price(&self, ticker: &str) -> Result<f64, ModelfolioError> {
        cached(&self.prices, self.ttl, ticker.to_uppercase(), "current_price", || {
            self.inner.get_current_price(ticker)
        })
    }

    fn get_expense_ratio(&self, ticker: &str) -> Result<Option<f64>, ModelfolioError> {
        cached(
            &self.expense_ratios,
            self.ttl,
            ticker.to_uppercase(),
            "expense_ratio",
            || self.inner.get_expense_ratio(ticker),
        )
    }

    fn get_instrument_metadata(&self, ticker: &str) -> Result<InstrumentMetadata, ModelfolioError> {
        cached(
            &self.metadata,
            self.ttl,
            ticker.to_uppercase(),
            "instrument_metadata",
            || self.inner.get_instrument_metadata(ticker),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingMarket {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingMarket {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn hit(&self) -> Result<(), ModelfolioError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ModelfolioError::DataSource {
                    reason: "offline".into(),
                });
            }
            Ok(())
        }
    }

    impl MarketDataPort for CountingMarket {
        fn get_price_history(
            &self,
            tickers: &[String],
            start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<BTreeMap<String, Vec<PricePoint>>, ModelfolioError> {
            self.hit()?;
            Ok(tickers
                .iter()
                .map(|t| {
                    (
                        t.clone(),
                        vec![PricePoint {
                            date: start,
                            close: 1.0,
                        }],
                    )
                })
                .collect())
        }

        fn get_current_price(&self, _ticker: &str) -> Result<f64, ModelfolioError> {
            self.hit()?;
            Ok(100.0)
        }

        fn get_expense_ratio(&self, _ticker: &str) -> Result<Option<f64>, ModelfolioError> {
            self.hit()?;
            Ok(Some(0.001))
        }

        fn get_instrument_metadata(
            &self,
            _ticker: &str,
        ) -> Result<InstrumentMetadata, ModelfolioError> {
            self.hit()?;
            Ok(InstrumentMetadata::default())
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn repeated_requests_hit_cache() {
        let cache = CachedMarketData::new(CountingMarket::default(), DEFAULT_TTL);
        assert_eq!(cache.get_current_price("VOO").unwrap(), 100.0);
        assert_eq!(cache.get_current_price("voo").unwrap(), 100.0);
        assert_eq!(cache.inner().calls(), 1);

        cache.get_expense_ratio("VOO").unwrap();
        cache.get_instrument_metadata("VOO").unwrap();
        assert_eq!(cache.inner().calls(), 3);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn history_key_covers_all_arguments() {
        let cache = CachedMarketData::new(CountingMarket::default(), DEFAULT_TTL);
        let ab = vec!["A".to_string(), "B".to_string()];
        let ba = vec!["B".to_string(), "A".to_string()];

        cache.get_price_history(&ab, date(1), date(5)).unwrap();
        cache.get_price_history(&ba, date(1), date(5)).unwrap();
        assert_eq!(cache.inner().calls(), 1);

        cache.get_price_history(&ab, date(2), date(5)).unwrap();
        cache.get_price_history(&["A".to_string()], date(1), date(5)).unwrap();
        assert_eq!(cache.inner().calls(), 3);
    }

    #[test]
    fn zero_ttl_always_refetches() {
        let cache = CachedMarketData::new(CountingMarket::default(), Duration::ZERO);
        cache.get_current_price("VOO").unwrap();
        std::thread::sleep(Duration::from_millis(2));
        cache.get_current_price("VOO").unwrap();
        assert_eq!(cache.inner().calls(), 2);

        cache.cleanup_stale();
        assert!(cache.is_empty());
    }

    #[test]
    fn errors_are_not_cached() {
        let market = CountingMarket {
            fail: true,
            ..Default::default()
        };
        let cache = CachedMarketData::new(market, DEFAULT_TTL);
        assert!(cache.get_current_price("VOO").is_err());
        assert!(cache.get_current_price("VOO").is_err());
        assert_eq!(cache.inner().calls(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_empties_every_map() {
        let cache = CachedMarketData::new(CountingMarket::default(), DEFAULT_TTL);
        cache.get_current_price("VOO").unwrap();
        cache.get_price_history(&["VOO".to_string()], date(1), date(2)).unwrap();
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }
}
