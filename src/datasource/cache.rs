//! Caching wrapper around a market data source.
//!
//! Rights records are cached per symbol for a fixed TTL; a fresh fetch skips
//! the cache and replaces the entry. Quotes are always fetched, but the last
//! good quote is served when the backend fails.

use super::{DataSourceError, MarketDataSource};
use crate::domain::{Quote, RawRightsRecord, Symbol};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct CachedDataSource {
    inner: Arc<dyn MarketDataSource>,
    rights_ttl: Duration,
    rights: RwLock<HashMap<Symbol, (Instant, Vec<RawRightsRecord>)>>,
    quotes: RwLock<HashMap<Symbol, Quote>>,
}

impl CachedDataSource {
    pub fn new(inner: Arc<dyn MarketDataSource>, rights_ttl: Duration) -> Self {
        Self {
            inner,
            rights_ttl,
            rights: RwLock::new(HashMap::new()),
            quotes: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl MarketDataSource for CachedDataSource {
    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote, DataSourceError> {
        match self.inner.fetch_quote(symbol).await {
            Ok(quote) => {
                self.quotes.write().await.insert(symbol.clone(), quote.clone());
                Ok(quote)
            }
            Err(e) if e.is_unavailable() => {
                if let Some(last) = self.quotes.read().await.get(symbol) {
                    warn!("Quote fetch for {} failed ({}), serving last known quote", symbol, e);
                    return Ok(last.clone());
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_rights_records(&self, symbol: &Symbol) -> Result<Vec<RawRightsRecord>, DataSourceError> {
        if let Some((fetched_at, records)) = self.rights.read().await.get(symbol) {
            if fetched_at.elapsed() < self.rights_ttl {
                debug!("Rights cache hit for {}", symbol);
                return Ok(records.clone());
            }
        }

        self.fetch_rights_records_fresh(symbol).await
    }

    async fn fetch_rights_records_fresh(
        &self,
        symbol: &Symbol,
    ) -> Result<Vec<RawRightsRecord>, DataSourceError> {
        let records = self.inner.fetch_rights_records_fresh(symbol).await?;
        self.rights
            .write()
            .await
            .insert(symbol.clone(), (Instant::now(), records.clone()));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MockDataSource;
    use crate::domain::{Decimal, TimeMs};

    fn record(ex_date: &str) -> RawRightsRecord {
        RawRightsRecord {
            ex_date: ex_date.to_string(),
            cash_dividend: Some(Decimal::from_i64(3)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_rights_served_from_cache_within_ttl() {
        let mock = MockDataSource::new().with_rights("2330", vec![record("2024-06-13")]);
        let calls = mock.rights_calls();
        let cached = CachedDataSource::new(Arc::new(mock), Duration::from_secs(3600));
        let symbol = Symbol::new("2330");

        assert_eq!(cached.fetch_rights_records(&symbol).await.unwrap().len(), 1);
        assert_eq!(cached.fetch_rights_records(&symbol).await.unwrap().len(), 1);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);

        cached.fetch_rights_records_fresh(&symbol).await.unwrap();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
        // The fresh result replaced the entry.
        cached.fetch_rights_records(&symbol).await.unwrap();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_rights_are_refetched() {
        let mock = MockDataSource::new().with_rights("2330", vec![record("2024-06-13")]);
        let calls = mock.rights_calls();
        let cached = CachedDataSource::new(Arc::new(mock), Duration::ZERO);
        let symbol = Symbol::new("2330");

        cached.fetch_rights_records(&symbol).await.unwrap();
        cached.fetch_rights_records(&symbol).await.unwrap();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_last_known_quote_served_on_outage() {
        let mock = MockDataSource::new().with_price("2330", "1085");
        let outage = mock.outage_switch();
        let cached = CachedDataSource::new(Arc::new(mock), Duration::from_secs(60));
        let symbol = Symbol::new("2330");

        let fresh = cached.fetch_quote(&symbol).await.unwrap();
        outage.store(true, std::sync::atomic::Ordering::SeqCst);
        let stale = cached.fetch_quote(&symbol).await.unwrap();
        assert_eq!(stale, fresh);
        assert!(stale.timestamp <= TimeMs::now());

        assert!(cached.fetch_quote(&Symbol::new("2317")).await.is_err());
    }
}
