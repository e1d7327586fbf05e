pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use config::EngineConfig;
pub use error::{Result, SyncError};
