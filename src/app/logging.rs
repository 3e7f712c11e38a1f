//! Logging configuration and initialization
//!
//! Logs go to stderr; stdout is reserved for the JSON event stream.

use crate::app::config::AppConfig;
use tracing::{debug, trace};

/// Initialize tracing/logging for the application
pub fn init_logging(config: &AppConfig) {
    let log_level = config.log_level();

    let installed = tracing_subscriber::fmt()
        .with_env_filter(log_level.as_str())
        .with_writer(std::io::stderr)
        .with_target(config.verbose >= 2) // Show target module for -vv and above
        .with_thread_ids(config.verbose >= 3) // Show thread IDs for -vvv
        .with_line_number(config.verbose >= 3) // Show line numbers for -vvv
        .try_init();

    if installed.is_ok() {
        debug!("Postcraft started with log level: {}", log_level);
        trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());
    }
}
