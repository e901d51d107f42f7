//! Utility modules shared by the module host and the license CLI

pub mod env;
pub mod logging;
pub mod time;

pub use env::{env_bool, env_opt};
#[cfg(feature = "json-logging")]
pub use logging::init_json_logging;
pub use logging::{init_logging, init_logging_from_config};
pub use time::{days_between, utc_now};
