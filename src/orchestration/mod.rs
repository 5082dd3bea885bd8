//! Coordination between the market data source, the rights engine and storage.

pub mod enhance;
pub mod locks;
pub mod orchestrator;
pub mod session;

pub use enhance::{Enhancer, FreshnessPolicy, RefreshError, RefreshResult};
pub use locks::SymbolLocks;
pub use orchestrator::{BatchFailure, BatchReport, OrchestrationError, Orchestrator};
pub use session::Session;
