//! # Runtime Configuration Module
//!
//! Environment variable-based configuration for the coroutine runtime that the
//! [`Scheduler`](crate::scheduler::Scheduler) runs request tasks on.
//!
//! ## Environment Variables
//!
//! ### `BRRTD_WORKERS`
//!
//! Number of worker threads the `may` runtime multiplexes coroutines over.
//! Default: available parallelism (at least 1).
//!
//! ### `BRRTD_STACK_SIZE`
//!
//! Stack size for each request coroutine. Accepts values in:
//! - Decimal: `65536` (64 KB)
//! - Hexadecimal: `0x10000` (64 KB)
//!
//! Default: `0x10000` (64 KB)
//!
//! Stack size affects:
//! - **Memory usage**: Total = stack_size × in-flight requests
//! - **Stack overflows**: Too small causes crashes in deep handlers
//!
//! ### `BRRTD_WORKER_PIN`
//!
//! `true`/`1` pins worker threads to CPU cores. Default: `false`.
//!
//! ## Usage
//!
//! ```rust
//! use brrtdispatch::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! assert!(config.workers >= 1);
//! ```

use std::env;

/// Default coroutine stack size (64 KB).
pub const DEFAULT_STACK_SIZE: usize = 0x10000;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Number of worker threads
    pub workers: usize,
    /// Stack size for request coroutines in bytes
    pub stack_size: usize,
    /// Pin worker threads to cores
    pub pin_workers: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            stack_size: DEFAULT_STACK_SIZE,
            pin_workers: false,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables, falling back to defaults
    /// for unset or unparsable values.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let workers = env::var("BRRTD_WORKERS")
            .ok()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.workers);
        let stack_size = env::var("BRRTD_STACK_SIZE")
            .ok()
            .and_then(|s| parse_size(&s))
            .unwrap_or(defaults.stack_size);
        let pin_workers = env::var("BRRTD_WORKER_PIN")
            .map(|s| matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(defaults.pin_workers);
        Self {
            workers,
            stack_size,
            pin_workers,
        }
    }

    /// Fixed worker count with default stack size.
    #[must_use]
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            ..Self::default()
        }
    }

    /// Push this configuration into the global `may` runtime.
    ///
    /// `may` reads the worker count when its scheduler first starts, so this
    /// must run before the first coroutine is spawned for the worker count to
    /// take effect. Stack size applies to every later spawn.
    pub fn apply(&self) {
        may::config()
            .set_workers(self.workers)
            .set_stack_size(self.stack_size)
            .set_worker_pin(self.pin_workers);
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Parse a decimal or `0x`-prefixed hexadecimal size.
fn parse_size(value: &str) -> Option<usize> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix("0x") {
        usize::from_str_radix(hex, 16).ok()
    } else {
        value.parse().ok()
    }
}
