//! 🔧 App Configuration — the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." — every developer at 3am 🦆
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of.
//!
//! ```toml
//! [source_config.S3]
//! bucket = "the-logs"
//! prefix = "2024/06/"
//!
//! [sink_config.File]
//! path = "harvest.ndjson"
//!
//! [runtime]
//! workers = 8
//! on_fetch_error = "skip"
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use tracing::info;

use crate::backends::{
    FileSink, FileSinkConfig, RemoteStore, S3Remote, S3SourceConfig, Sink, SinkOpener, StdoutSink,
};
use crate::supervisors::FetchErrorPolicy;

/// 📦 The AppConfig: one struct to rule them all, and in the Figment bind them.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// 📡 Where the objects live.
    pub source_config: SourceConfig,
    /// 🚰 Where the records go.
    pub sink_config: SinkConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// 📡 Sources we know how to list and fetch from.
#[derive(Debug, Deserialize, Clone)]
pub enum SourceConfig {
    S3(S3SourceConfig),
}

impl SourceConfig {
    pub fn bucket(&self) -> &str {
        match self {
            SourceConfig::S3(s3) => &s3.bucket,
        }
    }

    pub fn prefix(&self) -> &str {
        match self {
            SourceConfig::S3(s3) => &s3.prefix,
        }
    }

    /// 🔌 Build the remote store this config describes.
    pub async fn connect(&self) -> Result<Arc<dyn RemoteStore>> {
        match self {
            SourceConfig::S3(s3) => Ok(Arc::new(S3Remote::connect(s3).await?)),
        }
    }
}

/// 🚰 Sinks we know how to write records into.
#[derive(Debug, Deserialize, Clone)]
pub enum SinkConfig {
    File(FileSinkConfig),
    Stdout {},
}

#[async_trait]
impl SinkOpener for SinkConfig {
    async fn open(&self) -> Result<Box<dyn Sink>> {
        match self {
            SinkConfig::File(file_config) => Ok(Box::new(FileSink::open(file_config).await?)),
            SinkConfig::Stdout {} => Ok(Box::new(StdoutSink::new())),
        }
    }
}

/// ⚙️ Knobs for how the run behaves, all with defaults.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// 🧵 How many fetch workers to hire.
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub on_fetch_error: FetchErrorPolicy,
    /// ⏱️ Deadline for a single listing call. Unset means no deadline.
    #[serde(default)]
    pub list_timeout_secs: Option<u64>,
    /// ⏱️ Deadline for a single object download. Unset means no deadline.
    #[serde(default)]
    pub fetch_timeout_secs: Option<u64>,
    #[serde(default = "default_progress")]
    pub progress: bool,
}

fn default_workers() -> usize {
    4
}

fn default_progress() -> bool {
    true
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            on_fetch_error: FetchErrorPolicy::default(),
            list_timeout_secs: None,
            fetch_timeout_secs: None,
            progress: default_progress(),
        }
    }
}

impl RuntimeConfig {
    pub fn list_timeout(&self) -> Option<Duration> {
        self.list_timeout_secs.map(Duration::from_secs)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_secs.map(Duration::from_secs)
    }
}

/// 🚀 Load the config — from a file, from env vars, or from the sheer power of hoping.
///
/// 🔧 `BIGBITE_*` environment variables are the base layer, `__` separating
/// nesting levels (`BIGBITE_RUNTIME__WORKERS=8`). If a TOML file is given it is
/// merged on top, and the file wins on conflicts.
///
/// 💀 Returns an error if the result doesn't parse. The message says which
/// layers were involved, so you know where to look.
pub fn load_config(config_file_name: Option<&Path>) -> Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {}",
        config_file_name
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(environment only)".into())
    );

    let config = Figment::new().merge(Env::prefixed("BIGBITE_").split("__"));
    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (BIGBITE_*). \
             The file exists in our hearts, but apparently not in a shape serde recognizes.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (BIGBITE_*). \
                 No file was provided — this one's all on the environment. Classic."
            .to_string(),
    };
    config.extract().context(context_msg)
}
