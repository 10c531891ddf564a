//! Configuration Module
//!
//! Loads the initial global store options from environment variables.

use std::env;

use tracing::warn;

use crate::options::{ResolvedOptions, StoreOptions};

/// Startup configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Mount stores on creation and un-mount them on scope teardown
    pub auto_mount_and_unmount: bool,
    /// Clear a store once its use count drops below one
    pub auto_clear_unused: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DEFAULT_OPTIONS` - JSON object, e.g. `{"autoClearUnused":false}`
    /// - `CACHE_AUTO_MOUNT_AND_UNMOUNT` - boolean (default: true)
    /// - `CACHE_AUTO_CLEAR_UNUSED` - boolean (default: true)
    ///
    /// The single-flag variables win over the JSON object.
    pub fn from_env() -> Self {
        let mut options = StoreOptions::new();

        if let Ok(raw) = env::var("CACHE_DEFAULT_OPTIONS") {
            match serde_json::from_str::<StoreOptions>(&raw) {
                Ok(parsed) => options = options.overlay(&parsed),
                Err(err) => warn!(%err, "ignoring invalid CACHE_DEFAULT_OPTIONS"),
            }
        }

        let flags = StoreOptions {
            auto_mount_and_unmount: env_flag("CACHE_AUTO_MOUNT_AND_UNMOUNT"),
            auto_clear_unused: env_flag("CACHE_AUTO_CLEAR_UNUSED"),
        };
        options.overlay(&flags).apply_to(ResolvedOptions::default()).into()
    }

    /// Initial global store options described by this config.
    pub fn default_options(&self) -> ResolvedOptions {
        ResolvedOptions {
            auto_mount_and_unmount: self.auto_mount_and_unmount,
            auto_clear_unused: self.auto_clear_unused,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        ResolvedOptions::default().into()
    }
}

impl From<ResolvedOptions> for Config {
    fn from(options: ResolvedOptions) -> Self {
        Self {
            auto_mount_and_unmount: options.auto_mount_and_unmount,
            auto_clear_unused: options.auto_clear_unused,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name).ok().and_then(|v| parse_flag(&v))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
