//! Server configuration.
//!
//! All settings live in a single `config.toml`, by default at
//! `~/.config/ecp-ical/config.toml`. Every key is optional.
//!
//! ```toml
//! bind = "0.0.0.0:8080"
//!
//! [storage]
//! backend = "file"
//! data_dir = "/var/lib/ecp-ical"
//!
//! [site]
//! default_tag = "ecp club event"
//! timeout_secs = 30
//!
//! [feed]
//! ttl_days = 7
//! refresh_hours = 12
//! brand = "ECP"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ecp_ical_core::TracingOutputFormat;
use ecp_ical_scrape::SiteConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};
use crate::feed::FeedBranding;
use crate::pipeline::{FeedSettings, MAX_TTL_DAYS};
use crate::store::{EntityStore, FileStore, MemoryStore};

/// Default listen address.
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Configuration for the feed server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub bind: String,

    /// Entity store settings.
    pub storage: StorageSettings,

    /// Upstream site settings.
    pub site: SiteSettings,

    /// Feed and cache settings.
    pub feed: FeedFileSettings,

    /// Logging settings.
    pub log: LogSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            storage: StorageSettings::default(),
            site: SiteSettings::default(),
            feed: FeedFileSettings::default(),
            log: LogSettings::default(),
        }
    }
}

/// Where entities are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process memory; lost on restart.
    Memory,
    /// JSON documents under the data directory.
    #[default]
    File,
}

/// Entity store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,

    /// Directory of the file backend. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
}

/// Upstream site settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
    /// Listing URL template with a `{date}` placeholder.
    pub listing_url: String,

    /// Prefix identifying event links on listing pages.
    pub event_prefix: String,

    /// Tag given to links without tags.
    pub default_tag: String,

    /// Outbound request timeout in seconds.
    pub timeout_secs: u64,

    /// Overrides the `User-Agent` header.
    pub user_agent: Option<String>,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            listing_url: SiteConfig::DEFAULT_LISTING_TEMPLATE.to_string(),
            event_prefix: SiteConfig::DEFAULT_EVENT_PREFIX.to_string(),
            default_tag: SiteConfig::DEFAULT_TAG.to_string(),
            timeout_secs: SiteConfig::DEFAULT_TIMEOUT_SECS,
            user_agent: None,
        }
    }
}

/// Feed and cache settings as written in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedFileSettings {
    /// Lifetime of cached pages and records, in days.
    pub ttl_days: u32,

    /// Expected subscriber refresh interval, in hours.
    pub refresh_hours: u32,

    /// Calendar name prefix.
    pub brand: String,

    /// Calendar color as `r:g:b`.
    pub color: String,

    /// `PRODID` written to the calendar.
    pub product_id: String,
}

impl Default for FeedFileSettings {
    fn default() -> Self {
        let settings = FeedSettings::default();
        Self {
            ttl_days: settings.ttl_days,
            refresh_hours: settings.refresh_hours,
            brand: settings.branding.brand,
            color: settings.branding.color,
            product_id: settings.branding.product_id,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `pretty`, `compact` or `json`.
    pub format: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            format: "compact".to_string(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from the default path, or defaults if absent.
    pub fn load() -> ServerResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ServerResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ServerError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&content)
    }

    /// Parses configuration from TOML text.
    pub fn parse(content: &str) -> ServerResult<Self> {
        toml::from_str(content)
            .map_err(|e| ServerError::config(format!("failed to parse config: {e}")))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ecp-ical")
    }

    /// Returns the default data directory path.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ecp-ical")
    }

    /// Builder: set the listen address.
    pub fn with_bind(mut self, bind: impl Into<String>) -> Self {
        self.bind = bind.into();
        self
    }

    /// Builder: use the file backend rooted at `dir`.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage.backend = StorageBackend::File;
        self.storage.data_dir = Some(dir.into());
        self
    }

    /// Builder: set the storage backend.
    pub fn with_backend(mut self, backend: StorageBackend) -> Self {
        self.storage.backend = backend;
        self
    }

    /// Builder: set the log format.
    pub fn with_log_format(mut self, format: impl Into<String>) -> Self {
        self.log.format = format.into();
        self
    }

    /// Directory of the file backend.
    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .unwrap_or_else(Self::default_data_dir)
    }

    /// Builds the upstream site configuration.
    pub fn to_site_config(&self) -> ServerResult<SiteConfig> {
        let mut site = SiteConfig::new(&self.site.listing_url, &self.site.event_prefix)?
            .with_default_tag(&self.site.default_tag)
            .with_timeout(Duration::from_secs(self.site.timeout_secs.max(1)));
        if let Some(ref agent) = self.site.user_agent {
            site = site.with_user_agent(agent);
        }
        Ok(site)
    }

    /// Builds the pipeline settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `ttl_days` is outside
    /// `1..=MAX_TTL_DAYS`.
    pub fn feed_settings(&self) -> ServerResult<FeedSettings> {
        if !(1..=MAX_TTL_DAYS).contains(&self.feed.ttl_days) {
            return Err(ServerError::config(format!(
                "feed.ttl_days must be between 1 and {MAX_TTL_DAYS}, got {}",
                self.feed.ttl_days
            )));
        }
        Ok(FeedSettings {
            ttl_days: self.feed.ttl_days,
            refresh_hours: self.feed.refresh_hours,
            branding: FeedBranding {
                brand: self.feed.brand.clone(),
                color: self.feed.color.clone(),
                product_id: self.feed.product_id.clone(),
            },
        })
    }

    /// Parses the configured log format.
    pub fn log_format(&self) -> ServerResult<TracingOutputFormat> {
        self.log.format.parse().map_err(ServerError::config)
    }

    /// Opens the configured entity store.
    pub fn open_store(&self) -> Arc<dyn EntityStore> {
        match self.storage.backend {
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
            StorageBackend::File => Arc::new(FileStore::new(self.data_dir())),
        }
    }
}
