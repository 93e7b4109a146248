// ai
//! 🔧 *[the supervisor is handed a clipboard. it reads it once. it never asks again.]*
//!
//! `RunConfig` is everything one harvest needs to know, already resolved: a
//! connected remote store, a sink that knows how to open itself, the bucket and
//! prefix, how many fetch workers to hire, and the two cancellation cords.
//!
//! 🧠 Knowledge graph:
//! - built by `crate::run` from an `AppConfig`, or by hand in tests and embedders
//! - `list_cancel` stops scheduling, `fetch_cancel` stops everything downstream
//! - timeouts are per remote call, `None` means "take as long as you like"

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::backends::{RemoteStore, SinkOpener};
use crate::errors::RunError;

/// 🧯 What a fetch worker does when an object won't come down.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FetchErrorPolicy {
    /// 💀 The first failed fetch ends the run.
    #[default]
    Abort,
    /// 🙈 Note the key in the report and keep going.
    Skip,
}

/// 📋 The resolved configuration of a single run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub remote: Arc<dyn RemoteStore>,
    pub sink: Arc<dyn SinkOpener>,
    pub bucket: String,
    pub prefix: String,
    pub workers: usize,
    pub on_fetch_error: FetchErrorPolicy,
    pub list_cancel: CancellationToken,
    pub fetch_cancel: CancellationToken,
    pub list_timeout: Option<Duration>,
    pub fetch_timeout: Option<Duration>,
    pub progress: bool,
}

impl RunConfig {
    /// 🏗️ A run over `bucket`/`prefix` with one worker, abort-on-error, no
    /// timeouts, fresh cancellation tokens and no progress bar.
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        sink: Arc<dyn SinkOpener>,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            remote,
            sink,
            bucket: bucket.into(),
            prefix: prefix.into(),
            workers: 1,
            on_fetch_error: FetchErrorPolicy::default(),
            list_cancel: CancellationToken::new(),
            fetch_cancel: CancellationToken::new(),
            list_timeout: None,
            fetch_timeout: None,
            progress: false,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_fetch_policy(mut self, policy: FetchErrorPolicy) -> Self {
        self.on_fetch_error = policy;
        self
    }

    /// 🛑 Hand in the two cords. Either may be a child of some bigger cord.
    pub fn with_cancellation(mut self, list: CancellationToken, fetch: CancellationToken) -> Self {
        self.list_cancel = list;
        self.fetch_cancel = fetch;
        self
    }

    pub fn with_timeouts(mut self, list: Option<Duration>, fetch: Option<Duration>) -> Self {
        self.list_timeout = list;
        self.fetch_timeout = fetch;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// 🔍 Refuse configurations that could never produce a run.
    pub(crate) fn validate(&self) -> Result<(), RunError> {
        if self.workers == 0 {
            return Err(RunError::InvalidConfig(
                "workers must be at least 1, somebody has to do the fetching".into(),
            ));
        }
        if self.bucket.trim().is_empty() {
            return Err(RunError::InvalidConfig("bucket must not be empty".into()));
        }
        Ok(())
    }
}
