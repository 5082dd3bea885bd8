//! Data source abstraction for fetching quotes and rights records from a market data backend.

use crate::domain::{Quote, RawRightsRecord, Symbol};
use async_trait::async_trait;
use std::fmt;

pub mod cache;
pub mod http;
pub mod mock;

pub use cache::CachedDataSource;
pub use http::MarketApiDataSource;
pub use mock::{FetchGate, MockDataSource};

/// Market data source for quotes and corporate-action records.
///
/// Implementations handle retry/backoff themselves.
#[async_trait]
pub trait MarketDataSource: Send + Sync + fmt::Debug {
    /// Fetch the latest quote for a symbol.
    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote, DataSourceError>;

    /// Fetch every known dividend/split record for a symbol.
    ///
    /// A symbol the backend has no rights data for yields an empty list, not an error.
    async fn fetch_rights_records(&self, symbol: &Symbol) -> Result<Vec<RawRightsRecord>, DataSourceError>;

    /// Like `fetch_rights_records`, but never answered from a cache.
    async fn fetch_rights_records_fresh(
        &self,
        symbol: &Symbol,
    ) -> Result<Vec<RawRightsRecord>, DataSourceError> {
        self.fetch_rights_records(symbol).await
    }
}

/// Error type for data source operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSourceError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 5xx server error)
    HttpError { status: u16, message: String },
    /// Parsing error (invalid JSON or malformed response)
    ParseError(String),
    /// Rate limit exceeded
    RateLimited,
    /// The backend has no data for the symbol
    NotFound(String),
    /// No backend configured
    NotConfigured,
    /// Other error
    Other(String),
}

impl DataSourceError {
    /// Whether the error came from the backend being unreachable or unhealthy.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            DataSourceError::NetworkError(_)
                | DataSourceError::RateLimited
                | DataSourceError::NotConfigured
                | DataSourceError::HttpError { .. }
        )
    }
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            DataSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            DataSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            DataSourceError::RateLimited => write!(f, "Rate limited"),
            DataSourceError::NotFound(symbol) => write!(f, "No market data for {}", symbol),
            DataSourceError::NotConfigured => write!(f, "Market data backend not configured"),
            DataSourceError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for DataSourceError {}

/// Stand-in used when no market data backend is configured.
///
/// Every fetch fails with `NotConfigured`, so refreshes leave records untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredDataSource;

#[async_trait]
impl MarketDataSource for UnconfiguredDataSource {
    async fn fetch_quote(&self, _symbol: &Symbol) -> Result<Quote, DataSourceError> {
        Err(DataSourceError::NotConfigured)
    }

    async fn fetch_rights_records(&self, _symbol: &Symbol) -> Result<Vec<RawRightsRecord>, DataSourceError> {
        Err(DataSourceError::NotConfigured)
    }
}
