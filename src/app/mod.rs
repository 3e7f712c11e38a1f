//! Application module
//!
//! Wiring used by the `postcraft` binary:
//! - Configuration handling
//! - Logging setup
//! - Runtime initialization (services, session cache, orchestrator)

pub mod config;
pub mod logging;
pub mod runtime;

pub use config::AppConfig;
pub use logging::init_logging;
pub use runtime::{build_orchestrator, initialize_app, open_session_cache};
