//! Application configuration
//!
//! Process-level settings taken from the command line, as opposed to the
//! pipeline settings in [`crate::config::PipelineConfig`].

use crate::error::{PipelineError, Result};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Verbosity level for logging
    pub verbose: u8,
    /// Directory searched for `postcraft.yml`
    pub working_dir: PathBuf,
    /// Explicit `--config` file
    pub config_path: Option<PathBuf>,
    /// Level from the pipeline config, used when no `-v` flag is given
    pub configured_level: Option<String>,
}

impl AppConfig {
    pub fn new(verbose: u8) -> Result<Self> {
        let working_dir = std::env::current_dir().map_err(|e| {
            PipelineError::Config(format!("Failed to get current directory: {e}"))
        })?;

        Ok(Self {
            verbose,
            working_dir,
            config_path: None,
            configured_level: None,
        })
    }

    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = dir;
        self
    }

    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn with_configured_level(mut self, level: Option<String>) -> Self {
        self.configured_level = level;
        self
    }

    /// Filter directive for the subscriber; `-v` flags win over the config file
    pub fn log_level(&self) -> String {
        match self.verbose {
            0 => self
                .configured_level
                .clone()
                .unwrap_or_else(|| "info".to_string()),
            1 => "debug".to_string(),
            2 => "trace".to_string(),
            _ => "trace,hyper=debug,reqwest=debug".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            verbose: 0,
            working_dir: PathBuf::from("."),
            config_path: None,
            configured_level: None,
        }
    }
}
