//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{ServerConfig, StorageBackend};

/// ecp-ical - the ECP club calendar as an iCalendar feed
#[derive(Debug, Parser)]
#[command(name = "ecp-ical")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "ECP_ICAL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, short, env = "ECP_ICAL_BIND")]
    pub bind: Option<String>,

    /// Directory of the file-backed store
    #[arg(long, env = "ECP_ICAL_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Keep cached pages and events in memory only
    #[arg(long, conflicts_with = "data_dir")]
    pub memory: bool,

    /// Log line format
    #[arg(long, value_enum, env = "ECP_ICAL_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,
}

/// Log formats selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl LogFormat {
    fn as_str(self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        }
    }
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration.
    pub fn apply(&self, mut config: ServerConfig) -> ServerConfig {
        if let Some(ref bind) = self.bind {
            config = config.with_bind(bind);
        }
        if let Some(ref dir) = self.data_dir {
            config = config.with_data_dir(dir);
        }
        if self.memory {
            config = config.with_backend(StorageBackend::Memory);
        }
        if let Some(format) = self.log_format {
            config = config.with_log_format(format.as_str());
        }
        config
    }
}
