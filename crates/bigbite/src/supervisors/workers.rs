//! 🧵 Workers: the ones who actually do the work while the Supervisor takes all
//! the credit in the sprint retro.
//!
//! Three kinds of them, wired in a line by two hand-offs:
//!
//! ```text
//! Enumerator ──dispatch──▶ FetchWorker × N ──aggregation──▶ Aggregator ──▶ Sink
//! ```
//!
//! 🚀 Fetch workers and the aggregator are spawned onto the runtime and report
//! back through their `JoinHandle` with a tally. The enumerator runs inline
//! in the supervisor's own task, so it doesn't need to be a [`Worker`]. 🦆
//!
//! ⚠️ "If you're reading this, the code review went poorly."

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

mod aggregator;
mod enumerator;
mod fetch_worker;

pub(crate) use aggregator::Aggregator;
pub(crate) use enumerator::Enumerator;
pub(crate) use fetch_worker::FetchWorker;

use super::config::RunConfig;
use crate::errors::RunError;
use super::failure::FailureSlot;

/// 🏗️ A background worker, that does work. duh.
///
/// `start` spawns it and hands back the handle. The tally is what it has to
/// show for itself. Failures don't travel this way: they go in the
/// [`FailureSlot`], first come first served.
pub(crate) trait Worker {
    type Tally: Send + 'static;

    fn start(self) -> JoinHandle<Self::Tally>;
}

/// 🎒 What every stage of one run carries: the config, the halt cord, the failure slot.
#[derive(Debug, Clone)]
pub(crate) struct RunContext {
    pub(crate) config: Arc<RunConfig>,
    /// 🛑 Pulled by the first fatal failure. Internal to one run.
    pub(crate) halt: CancellationToken,
    pub(crate) failures: Arc<FailureSlot>,
}

impl RunContext {
    pub(crate) fn new(config: Arc<RunConfig>) -> Self {
        Self {
            config,
            halt: CancellationToken::new(),
            failures: Arc::new(FailureSlot::default()),
        }
    }

    /// 💀 Record a failure that ends the run, and tell everyone to stop.
    pub(crate) fn abort(&self, failure: RunError) {
        self.failures.record(failure);
        self.halt.cancel();
    }
}
