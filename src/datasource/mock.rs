//! Mock data source for testing without network calls.

use super::{DataSourceError, MarketDataSource};
use crate::domain::{Decimal, Quote, RawRightsRecord, Symbol, TimeMs};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

type RightsTable = HashMap<Symbol, Vec<RawRightsRecord>>;

/// Holds rights fetches at their start until released.
#[derive(Debug, Default)]
pub struct FetchGate {
    entered: Notify,
    release: Notify,
}

impl FetchGate {
    /// Wait until a fetch is parked at the gate.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let one parked fetch continue.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

/// Mock data source that returns predefined test data.
///
/// Clones share the rights table, counters and switches.
#[derive(Debug, Clone, Default)]
pub struct MockDataSource {
    quotes: HashMap<Symbol, Quote>,
    rights: Arc<Mutex<RightsTable>>,
    failing: HashSet<Symbol>,
    outage: Arc<AtomicBool>,
    rights_gate: Option<Arc<FetchGate>>,
    rights_calls: Arc<AtomicUsize>,
    quote_calls: Arc<AtomicUsize>,
}

impl MockDataSource {
    /// Create a new mock data source with empty data.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quote(mut self, quote: Quote) -> Self {
        self.quotes.insert(quote.symbol.clone(), quote);
        self
    }

    /// Add a quote with only a price set. An unparseable price becomes zero.
    pub fn with_price(self, symbol: &str, price: &str) -> Self {
        let quote = Quote {
            symbol: Symbol::new(symbol),
            name: None,
            price: Decimal::from_str_canonical(price).unwrap_or_default(),
            change: Decimal::zero(),
            change_percent: Decimal::zero(),
            timestamp: TimeMs::now(),
        };
        self.with_quote(quote)
    }

    /// Set the rights records returned for a symbol.
    pub fn with_rights(self, symbol: &str, records: Vec<RawRightsRecord>) -> Self {
        self.rights_table().insert(Symbol::new(symbol), records);
        self
    }

    /// Append a record the backend starts publishing later.
    pub fn publish_right(&self, symbol: &str, record: RawRightsRecord) {
        self.rights_table()
            .entry(Symbol::new(symbol))
            .or_default()
            .push(record);
    }

    /// Park every rights fetch at `gate` until the test releases it.
    pub fn with_rights_gate(mut self, gate: Arc<FetchGate>) -> Self {
        self.rights_gate = Some(gate);
        self
    }

    /// Make every request for `symbol` fail with a server error.
    pub fn with_failure(mut self, symbol: &str) -> Self {
        self.failing.insert(Symbol::new(symbol));
        self
    }

    /// Counter of `fetch_rights_records` calls, shared with clones.
    pub fn rights_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.rights_calls)
    }

    /// Counter of `fetch_quote` calls, shared with clones.
    pub fn quote_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.quote_calls)
    }

    /// When set, every request fails with a network error.
    pub fn outage_switch(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.outage)
    }

    fn rights_table(&self) -> MutexGuard<'_, RightsTable> {
        self.rights.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(&self, symbol: &Symbol) -> Result<(), DataSourceError> {
        if self.outage.load(Ordering::SeqCst) {
            return Err(DataSourceError::NetworkError("connection refused".to_string()));
        }
        if self.failing.contains(symbol) {
            return Err(DataSourceError::HttpError {
                status: 503,
                message: "Server error".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MarketDataSource for MockDataSource {
    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote, DataSourceError> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available(symbol)?;
        self.quotes
            .get(symbol)
            .cloned()
            .ok_or_else(|| DataSourceError::NotFound(symbol.to_string()))
    }

    async fn fetch_rights_records(&self, symbol: &Symbol) -> Result<Vec<RawRightsRecord>, DataSourceError> {
        self.rights_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.rights_gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        self.check_available(symbol)?;
        let records = self.rights_table().get(symbol).cloned().unwrap_or_default();
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_configured_quote() {
        let mock = MockDataSource::new().with_price("2330", "1085");
        let quote = mock.fetch_quote(&Symbol::new("2330")).await.unwrap();
        assert_eq!(quote.price.to_string(), "1085");

        let missing = mock.fetch_quote(&Symbol::new("2317")).await;
        assert!(matches!(missing, Err(DataSourceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_mock_unknown_symbol_has_no_rights() {
        let mock = MockDataSource::new();
        let records = mock.fetch_rights_records(&Symbol::new("2330")).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(mock.rights_calls().load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_published_right_is_seen_by_clones() {
        let mock = MockDataSource::new();
        let handle = mock.clone();
        handle.publish_right(
            "2330",
            RawRightsRecord {
                ex_date: "2024-07-01".to_string(),
                ..Default::default()
            },
        );
        let records = mock.fetch_rights_records(&Symbol::new("2330")).await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_mock_failure_injection() {
        let mock = MockDataSource::new()
            .with_price("2330", "1085")
            .with_failure("2330");
        let err = mock.fetch_rights_records(&Symbol::new("2330")).await.unwrap_err();
        assert!(err.is_unavailable());

        let healthy = MockDataSource::new().with_price("2317", "150");
        healthy.outage_switch().store(true, Ordering::SeqCst);
        assert!(matches!(
            healthy.fetch_quote(&Symbol::new("2317")).await,
            Err(DataSourceError::NetworkError(_))
        ));
    }
}
