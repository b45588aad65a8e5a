//! Launcher grid configuration loaded from TOML.
//!
//! Every key is optional; missing keys take the defaults below. Semantic validation runs after
//! deserialization so a zero capacity never reaches the grid.
//!
//! ```toml
//! page_capacity = 2
//! max_pages = 64
//! badge_display_cap = 999
//! long_press_ms = 500
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of slots per page.
pub const DEFAULT_PAGE_CAPACITY: usize = 2;
/// Default upper bound on linked pages.
pub const DEFAULT_MAX_PAGES: usize = 64;
/// Default largest badge count rendered literally.
pub const DEFAULT_BADGE_DISPLAY_CAP: u32 = 999;
/// Default press-and-hold threshold before edit mode engages.
pub const DEFAULT_LONG_PRESS_MS: u64 = 500;

#[derive(Debug, Error)]
/// Configuration load and validation failures.
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {message}")]
    Read {
        /// Config path on disk.
        path: String,
        /// Underlying I/O error text.
        message: String,
    },
    /// The TOML body did not deserialize.
    #[error("failed to parse launcher config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value parsed but is not usable.
    #[error("invalid launcher config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
/// Tunables for the grid, badge overlay, and drag reducer.
pub struct LauncherConfig {
    /// Slots per page.
    pub page_capacity: usize,
    /// Maximum number of linked pages; exceeding it fails page allocation.
    pub max_pages: usize,
    /// Largest badge count rendered as a literal number.
    pub badge_display_cap: u32,
    /// Press-and-hold duration that enters edit mode.
    pub long_press_ms: u64,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            page_capacity: DEFAULT_PAGE_CAPACITY,
            max_pages: DEFAULT_MAX_PAGES,
            badge_display_cap: DEFAULT_BADGE_DISPLAY_CAP,
            long_press_ms: DEFAULT_LONG_PRESS_MS,
        }
    }
}

impl LauncherConfig {
    /// Parses and validates a TOML body.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
    /// [`ConfigError::Invalid`] when a limit is zero.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file is unreadable, otherwise as
    /// [`LauncherConfig::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        Self::from_toml_str(&raw)
    }

    /// Checks semantic constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `page_capacity` or `max_pages` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_capacity == 0 {
            return Err(ConfigError::Invalid(
                "page_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_pages == 0 {
            return Err(ConfigError::Invalid(
                "max_pages must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns a copy with a different page capacity.
    pub fn with_page_capacity(mut self, page_capacity: usize) -> Self {
        self.page_capacity = page_capacity;
        self
    }

    /// Returns a copy with a different page limit.
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }
}
