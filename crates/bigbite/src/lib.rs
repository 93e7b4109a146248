//! 🪣 bigbite — read every object under an S3 prefix, line by line, into one sink.
//!
//! One enumerator lists the prefix, a fixed crew of fetch workers downloads and
//! splits objects, and a single aggregator appends every record to the sink.
//! Each object's lines stay in order; objects interleave however the workers
//! finish. With one worker the output is in listing order, full stop.
//!
//! Two ways in:
//! - [`harvest`] takes a fully resolved [`RunConfig`] (bring your own remote and sink)
//! - [`run`] takes an [`AppConfig`] from [`app_config::load_config`] and wires up S3

pub mod app_config;
pub mod backends;
mod common;
mod errors;
mod progress;
mod splitter;
mod supervisors;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::app_config::AppConfig;
use crate::supervisors::Supervisor;

pub use common::{ListPage, Record};
pub use errors::{RunError, Stage};
pub use progress::render_summary;
pub use splitter::{Records, SplitError, split_records};
pub use supervisors::{FetchErrorPolicy, RunConfig, RunPhase, RunReport, SkippedObject};

/// 🧵 Run one harvest to completion.
///
/// Returns only after the sink has been closed (or was never opened). The
/// error, if any, is the first thing that went wrong.
pub async fn harvest(config: RunConfig) -> Result<RunReport, RunError> {
    Supervisor::new(config).run().await
}

/// 🚀 Connect to the configured source and sink and harvest.
///
/// `cancel` is the root cord: listing and fetching each get a child of it,
/// so pulling it stops the whole run.
pub async fn run(app_config: AppConfig, cancel: CancellationToken) -> Result<RunReport> {
    let remote = app_config
        .source_config
        .connect()
        .await
        .context("💀 could not connect to the object store")?;

    let runtime = &app_config.runtime;
    let run_config = RunConfig::new(
        remote,
        Arc::new(app_config.sink_config.clone()),
        app_config.source_config.bucket(),
        app_config.source_config.prefix(),
    )
    .with_workers(runtime.workers)
    .with_fetch_policy(runtime.on_fetch_error)
    .with_cancellation(cancel.child_token(), cancel.child_token())
    .with_timeouts(runtime.list_timeout(), runtime.fetch_timeout())
    .with_progress(runtime.progress);

    let report = harvest(run_config).await.with_context(|| {
        format!(
            "💀 harvesting s3://{}/{} did not finish cleanly",
            app_config.source_config.bucket(),
            app_config.source_config.prefix()
        )
    })?;
    Ok(report)
}
