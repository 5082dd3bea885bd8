pub mod api;
pub mod config;
pub mod datasource;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use config::Config;
pub use datasource::{
    CachedDataSource, DataSourceError, MarketApiDataSource, MarketDataSource, MockDataSource,
    UnconfiguredDataSource,
};
pub use db::{init_db, Repository};
pub use domain::{
    Account, AccountId, AppSettings, BasisMode, Decimal, GainLossMode, Position, PositionId,
    RightsEvent, RightsEventKind, RightsLedger, Side, Symbol, TimeMs,
};
pub use engine::{CostError, CostSchedule, RightsError};
pub use error::AppError;
