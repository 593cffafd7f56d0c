//! Configuration, paths and logging for the Tac client.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{Config, RealtimeSettings, DEFAULT_LOG_LEVEL, DEFAULT_SHARE_BASE_URL};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level, LogConfig};
pub use paths::Paths;
