//! HTTP client for the market data backend proxy.
//!
//! Endpoints:
//! - `GET {base}/api/stock/{symbol}` -> `{symbol, name?, price, change, changePercent, timestamp}`
//! - `GET {base}/api/dividend/{symbol}` -> `{dividends: [{exDate, cashDividend, stockDividend, ...}]}`

use super::{DataSourceError, MarketDataSource};
use crate::config::MarketApiConfig;
use crate::domain::{Decimal, Quote, RawRightsRecord, Symbol, TimeMs};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Market data source backed by the backend proxy's REST API.
#[derive(Debug, Clone)]
pub struct MarketApiDataSource {
    client: Client,
    base_url: String,
    dividends_enabled: bool,
    max_elapsed: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    symbol: Option<String>,
    name: Option<String>,
    price: Option<Decimal>,
    change: Option<Decimal>,
    change_percent: Option<Decimal>,
    timestamp: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct DividendResponse {
    #[serde(default)]
    dividends: Vec<RawRightsRecord>,
}

impl MarketApiDataSource {
    pub fn new(config: &MarketApiConfig) -> Result<Self, DataSourceError> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataSourceError::Other(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            dividends_enabled: config.dividends_enabled,
            max_elapsed: timeout * 2,
        })
    }

    /// GET a JSON document; `Ok(None)` on 404.
    async fn get_json(&self, url: &str) -> Result<Option<serde_json::Value>, DataSourceError> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(self.max_elapsed),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .get(url)
                .header("Accept", "application/json")
                .send()
                .await
                .map_err(|e| {
                    backoff::Error::transient(DataSourceError::NetworkError(e.to_string()))
                })?;

            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(backoff::Error::transient(DataSourceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map(Some)
                .map_err(|e| backoff::Error::permanent(DataSourceError::ParseError(e.to_string())))
        })
        .await
    }
}

#[async_trait]
impl MarketDataSource for MarketApiDataSource {
    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote, DataSourceError> {
        let url = format!("{}/api/stock/{}", self.base_url, symbol);
        debug!("Fetching quote for symbol={}", symbol);

        let body = self
            .get_json(&url)
            .await?
            .ok_or_else(|| DataSourceError::NotFound(symbol.to_string()))?;
        parse_quote(symbol, body)
    }

    async fn fetch_rights_records(&self, symbol: &Symbol) -> Result<Vec<RawRightsRecord>, DataSourceError> {
        if !self.dividends_enabled {
            return Ok(Vec::new());
        }
        let url = format!("{}/api/dividend/{}", self.base_url, symbol);
        debug!("Fetching rights records for symbol={}", symbol);

        match self.get_json(&url).await? {
            None => {
                debug!("No rights data for symbol={} (404)", symbol);
                Ok(Vec::new())
            }
            Some(body) => parse_dividends(body),
        }
    }
}

fn parse_quote(symbol: &Symbol, body: serde_json::Value) -> Result<Quote, DataSourceError> {
    let response: QuoteResponse =
        serde_json::from_value(body).map_err(|e| DataSourceError::ParseError(e.to_string()))?;

    if response.symbol.is_none() {
        return Err(DataSourceError::ParseError("Missing symbol field".to_string()));
    }
    let price = response
        .price
        .filter(|p| p.is_positive())
        .ok_or_else(|| DataSourceError::ParseError(format!("No usable price for {}", symbol)))?;

    Ok(Quote {
        symbol: symbol.clone(),
        name: response.name.filter(|n| !n.trim().is_empty()),
        price,
        change: response.change.unwrap_or_default(),
        change_percent: response.change_percent.unwrap_or_default(),
        timestamp: response
            .timestamp
            .as_ref()
            .and_then(parse_timestamp)
            .unwrap_or_else(TimeMs::now),
    })
}

fn parse_dividends(body: serde_json::Value) -> Result<Vec<RawRightsRecord>, DataSourceError> {
    let response: DividendResponse =
        serde_json::from_value(body).map_err(|e| DataSourceError::ParseError(e.to_string()))?;
    Ok(response.dividends)
}

/// Accepts epoch milliseconds or an RFC 3339 string.
fn parse_timestamp(value: &serde_json::Value) -> Option<TimeMs> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().map(TimeMs::new),
        serde_json::Value::String(s) => chrono::DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| TimeMs::new(dt.timestamp_millis())),
        _ => None,
    }
}
