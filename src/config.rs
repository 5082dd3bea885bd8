use crate::domain::{BasisMode, Decimal};
use crate::engine::CostSchedule;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    /// None when no market data backend is configured; refreshes then fail as unavailable.
    pub market_api: Option<MarketApiConfig>,
    pub brokerage_fee_rate: Decimal,
    pub transaction_tax_rate: Decimal,
    pub min_brokerage_fee: Decimal,
    pub rights_refresh_interval_ms: i64,
    pub batch_delay_ms: u64,
    pub dividend_cache_ttl_ms: u64,
    pub basis_mode: BasisMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketApiConfig {
    pub base_url: String,
    pub dividends_enabled: bool,
    pub timeout_ms: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let market_api = match env_map.get("MARKET_API_BASE_URL").map(|s| s.trim()) {
            None | Some("") => None,
            Some(base_url) => {
                if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                    return Err(ConfigError::InvalidValue(
                        "MARKET_API_BASE_URL".to_string(),
                        format!("must be an http(s) URL, got {}", base_url),
                    ));
                }
                Some(MarketApiConfig {
                    base_url: base_url.to_string(),
                    dividends_enabled: parse_bool(&env_map, "MARKET_API_DIVIDENDS", true)?,
                    timeout_ms: parse_number(&env_map, "MARKET_API_TIMEOUT_MS", 15_000)?,
                })
            }
        };

        let brokerage_fee_rate = parse_rate(&env_map, "BROKERAGE_FEE_RATE", "0.1425")?;
        let transaction_tax_rate = parse_rate(&env_map, "TRANSACTION_TAX_RATE", "0.3")?;
        let min_brokerage_fee = parse_rate(&env_map, "MIN_BROKERAGE_FEE", "0")?;

        let rights_refresh_interval_ms =
            parse_number(&env_map, "RIGHTS_REFRESH_INTERVAL_MS", 86_400_000)?;
        let batch_delay_ms = parse_number(&env_map, "BATCH_DELAY_MS", 300)?;
        let dividend_cache_ttl_ms = parse_number(&env_map, "DIVIDEND_CACHE_TTL_MS", 86_400_000)?;

        let basis_mode = match env_map
            .get("BASIS_MODE")
            .map(|s| s.as_str())
            .unwrap_or("exclude_cash")
        {
            "exclude_cash" => BasisMode::ExcludeCash,
            "income_inclusive" => BasisMode::IncomeInclusive,
            other => {
                return Err(ConfigError::InvalidValue(
                    "BASIS_MODE".to_string(),
                    format!("must be exclude_cash or income_inclusive, got {}", other),
                ))
            }
        };

        Ok(Config {
            port,
            database_path,
            market_api,
            brokerage_fee_rate,
            transaction_tax_rate,
            min_brokerage_fee,
            rights_refresh_interval_ms,
            batch_delay_ms,
            dividend_cache_ttl_ms,
            basis_mode,
        })
    }

    /// Default cost schedule for new accounts and ad-hoc quotes.
    pub fn cost_schedule(&self) -> CostSchedule {
        CostSchedule::new(self.brokerage_fee_rate, self.transaction_tax_rate)
            .with_min_fee(self.min_brokerage_fee)
    }
}

fn parse_number<T: std::str::FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match env_map.get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), format!("must be a non-negative integer, got {}", raw))
        }),
    }
}

fn parse_bool(env_map: &HashMap<String, String>, key: &str, default: bool) -> Result<bool, ConfigError> {
    match env_map.get(key).map(|s| s.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::InvalidValue(
                key.to_string(),
                format!("must be true or false, got {}", v),
            )),
        },
    }
}

/// Percent rates and currency amounts: decimal, >= 0.
fn parse_rate(env_map: &HashMap<String, String>, key: &str, default: &str) -> Result<Decimal, ConfigError> {
    let raw = env_map.get(key).map(|s| s.as_str()).unwrap_or(default);
    let value = Decimal::from_str_canonical(raw).map_err(|_| {
        ConfigError::InvalidValue(key.to_string(), format!("must be a decimal number, got {}", raw))
    })?;
    if value.is_negative() {
        return Err(ConfigError::InvalidValue(key.to_string(), "must be >= 0".to_string()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_env() -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("DATABASE_PATH".to_string(), "/tmp/twfolio.db".to_string());
        env
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_env_map(base_env()).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.market_api.is_none());
        assert_eq!(config.brokerage_fee_rate.to_string(), "0.1425");
        assert_eq!(config.transaction_tax_rate.to_string(), "0.3");
        assert!(config.min_brokerage_fee.is_zero());
        assert_eq!(config.rights_refresh_interval_ms, 86_400_000);
        assert_eq!(config.batch_delay_ms, 300);
        assert_eq!(config.dividend_cache_ttl_ms, 86_400_000);
        assert_eq!(config.basis_mode, BasisMode::ExcludeCash);
    }

    #[test]
    fn test_config_missing_database_path() {
        let result = Config::from_env_map(HashMap::new());
        assert!(matches!(result, Err(ConfigError::MissingEnv(ref k)) if k == "DATABASE_PATH"));
    }

    #[test]
    fn test_config_invalid_port() {
        let mut env = base_env();
        env.insert("PORT".to_string(), "not_a_number".to_string());
        assert!(matches!(
            Config::from_env_map(env),
            Err(ConfigError::InvalidValue(ref k, _)) if k == "PORT"
        ));
    }

    #[test]
    fn test_config_market_api() {
        let mut env = base_env();
        env.insert("MARKET_API_BASE_URL".to_string(), "http://localhost:3001".to_string());
        env.insert("MARKET_API_DIVIDENDS".to_string(), "false".to_string());
        env.insert("MARKET_API_TIMEOUT_MS".to_string(), "5000".to_string());
        let config = Config::from_env_map(env).unwrap();
        assert_eq!(
            config.market_api,
            Some(MarketApiConfig {
                base_url: "http://localhost:3001".to_string(),
                dividends_enabled: false,
                timeout_ms: 5000,
            })
        );
    }

    #[test]
    fn test_config_rejects_non_http_base_url() {
        let mut env = base_env();
        env.insert("MARKET_API_BASE_URL".to_string(), "localhost:3001".to_string());
        assert!(matches!(
            Config::from_env_map(env),
            Err(ConfigError::InvalidValue(ref k, _)) if k == "MARKET_API_BASE_URL"
        ));
    }

    #[test]
    fn test_config_invalid_basis_mode() {
        let mut env = base_env();
        env.insert("BASIS_MODE".to_string(), "average".to_string());
        assert!(matches!(
            Config::from_env_map(env),
            Err(ConfigError::InvalidValue(ref k, _)) if k == "BASIS_MODE"
        ));
    }

    #[test]
    fn test_config_negative_rate_rejected() {
        let mut env = base_env();
        env.insert("TRANSACTION_TAX_RATE".to_string(), "-0.3".to_string());
        assert!(Config::from_env_map(env).is_err());
    }

    #[test]
    fn test_config_cost_schedule() {
        let mut env = base_env();
        env.insert("MIN_BROKERAGE_FEE".to_string(), "20".to_string());
        let schedule = Config::from_env_map(env).unwrap().cost_schedule();
        assert_eq!(schedule.min_brokerage_fee.to_string(), "20");
        assert_eq!(schedule.fee_rate_percent.to_string(), "0.1425");
    }
}
