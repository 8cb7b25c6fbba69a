//! Tracing subscriber setup for the CLI and embedding applications

use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, or by `level` when unset
pub struct Logger {
    level: String,
    initialized: bool,
}

impl Logger {
    pub fn new() -> Self {
        Self::with_level("info")
    }

    pub fn with_level(level: &str) -> Self {
        Self {
            level: level.to_string(),
            initialized: false,
        }
    }

    pub fn level(&self) -> &str {
        &self.level
    }

    /// Safe to call more than once, also when another subscriber is already installed
    pub fn init(&mut self) {
        if self.initialized {
            return;
        }
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));
        let installed = fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok();
        self.initialized = true;
        if installed {
            info!("Logger initialized with level: {}", self.level);
        } else {
            debug!("global subscriber already set, keeping it");
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}
