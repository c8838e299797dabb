//! # Global runtime configuration.
//!
//! Provides [`Config`] centralized settings for the bot runtime.
//!
//! Config is used by the [`ContextBuilder`](crate::ContextBuilder) when wiring
//! the scheduler, shutdown orchestrator, presence tracker and bulk loaders.
//!
//! ## Sentinel values
//! - `presence_concurrency = 0` → unlimited (no semaphore created)
//! - `bulk_batch_size = 0` → clamped to 1
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

/// Global configuration for the bot runtime.
///
/// ## Field semantics
/// - `shutdown_deadline`: Deadline for a signal-driven shutdown (drain + shutdownables + disconnect)
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `presence_concurrency`: Max concurrently running presence handlers (`0` = unlimited)
/// - `bulk_batch_size`: Keys per batch for [`BulkLoader`](crate::BulkLoader)s built from this config
/// - `exit_code`: Process exit status used when the forced-exit timer fires
/// - `auto_pause_property`: Name of the per-guild boolean property that enables auto pause
///
/// ## Notes
/// All fields are public for flexibility. Prefer using helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum time a shutdown may take before the process is terminated unconditionally.
    ///
    /// Only used by [`BotContext::run_until_signal`](crate::BotContext::run_until_signal);
    /// explicit shutdown calls pass their own deadline.
    pub shutdown_deadline: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items. Minimum value is 1 (enforced by Bus).
    pub bus_capacity: usize,

    /// Maximum number of voice presence handlers running at once.
    ///
    /// - `0` = unlimited (no semaphore)
    /// - `n > 0` = at most `n` handlers run simultaneously
    pub presence_concurrency: usize,

    /// Number of keys loaded per request by bulk loaders.
    pub bulk_batch_size: usize,

    /// Exit status passed to `std::process::exit` by the forced-exit timer.
    pub exit_code: i32,

    /// Guild property consulted by the presence tracker.
    ///
    /// Guilds that never set the property are treated as having auto pause enabled.
    pub auto_pause_property: String,
}

impl Config {
    /// Returns the presence concurrency limit as an `Option`.
    ///
    /// - `None` → unlimited (no semaphore)
    /// - `Some(n)` → at most `n` concurrent handlers
    #[inline]
    pub fn presence_limit(&self) -> Option<usize> {
        if self.presence_concurrency == 0 {
            None
        } else {
            Some(self.presence_concurrency)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the bulk batch size clamped to a minimum of 1.
    #[inline]
    pub fn bulk_batch_size_clamped(&self) -> usize {
        self.bulk_batch_size.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `shutdown_deadline = 30s`
    /// - `bus_capacity = 1024`
    /// - `presence_concurrency = 0` (unlimited)
    /// - `bulk_batch_size = 50`
    /// - `exit_code = 0`
    /// - `auto_pause_property = "enableAutoPause"`
    fn default() -> Self {
        Self {
            shutdown_deadline: Duration::from_secs(30),
            bus_capacity: 1024,
            presence_concurrency: 0,
            bulk_batch_size: 50,
            exit_code: 0,
            auto_pause_property: "enableAutoPause".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels_are_clamped() {
        let cfg = Config {
            bus_capacity: 0,
            bulk_batch_size: 0,
            ..Config::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert_eq!(cfg.bulk_batch_size_clamped(), 1);
        assert_eq!(cfg.presence_limit(), None);
    }

    #[test]
    fn test_presence_limit() {
        let cfg = Config {
            presence_concurrency: 4,
            ..Config::default()
        };
        assert_eq!(cfg.presence_limit(), Some(4));
    }
}
