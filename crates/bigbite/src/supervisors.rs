//! 🎬 *[camera pans across a dimly lit server room]*
//! 🎬 "In a world where workers toil endlessly..."
//! 🎬 "One supervisor dared to manage them all."
//! 🎬 *[record scratch]* 🦆
//!
//! 📦 The Supervisor wires one run together and waits for it to end:
//!
//! 1. hire the aggregator and the fetch workers first, so nobody ever sends
//!    into a hand-off that no one drains
//! 2. run the enumerator right here, inline, until the listing is done
//! 3. wait for every fetch worker, then for the aggregator
//! 4. add up the tallies, and return the first failure if there was one
//!
//! Nothing returns before the aggregator does, so a caller that gets a result
//! back can trust the sink has been closed.
//!
//! ⚠️ DO NOT MAKE THIS PUB EVER
//! 💀 WORKERS ARE SUPERVISORS PRIVATE LITTLE MINIONS WHOM THE WORLD FORGOT ABOUT

pub mod config;
mod failure;
pub(crate) mod hand_off;
mod report;
mod workers;

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, info};

pub use config::{FetchErrorPolicy, RunConfig};
pub use report::{RunReport, SkippedObject};

use crate::common::Record;
use crate::errors::{RunError, Stage};
use hand_off::HandOff;
use report::FetchTally;
use workers::{Aggregator, Enumerator, FetchWorker, RunContext, Worker};

/// 🚦 Where a run is. Forward only, with one emergency exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Listing,
    Draining,
    Finalizing,
    Done,
    Failed,
}

impl RunPhase {
    pub fn can_advance_to(self, next: RunPhase) -> bool {
        use RunPhase::*;
        matches!(
            (self, next),
            (Idle, Listing)
                | (Listing, Draining)
                | (Draining, Finalizing)
                | (Finalizing, Done)
                | (Idle | Listing | Draining | Finalizing, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Done | RunPhase::Failed)
    }
}

/// 📦 The Supervisor: because even async tasks need someone hovering over them
/// asking "is it done yet?" every 5 milliseconds.
#[derive(Debug)]
pub(crate) struct Supervisor {
    config: Arc<RunConfig>,
    phase: RunPhase,
}

impl Supervisor {
    pub(crate) fn new(config: RunConfig) -> Self {
        Self {
            config: Arc::new(config),
            phase: RunPhase::Idle,
        }
    }

    fn advance(&mut self, next: RunPhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "run phase went {:?} → {:?}",
            self.phase,
            next
        );
        debug!("🚦 run phase {:?} → {:?}", self.phase, next);
        self.phase = next;
    }

    /// 🧵 Run the whole pipeline to completion and report.
    pub(crate) async fn run(mut self) -> Result<RunReport, RunError> {
        if let Err(invalid) = self.config.validate() {
            self.advance(RunPhase::Failed);
            return Err(invalid);
        }
        let the_workers = self.config.workers;
        let the_start = Instant::now();
        info!(
            "🚀 harvesting s3://{}/{} with {} fetch workers, on fetch error: {:?}",
            self.config.bucket, self.config.prefix, the_workers, self.config.on_fetch_error
        );

        let ctx = RunContext::new(self.config.clone());
        let (mut dispatch_producers, jobs) = HandOff::<String>::new("dispatch").split(1);
        let (record_producers, records) = HandOff::<Record>::new("aggregation").split(the_workers);

        let the_aggregator = Aggregator::new(ctx.clone(), records).start();
        let the_fetchers: Vec<_> = record_producers
            .into_iter()
            .enumerate()
            .map(|(id, producer)| FetchWorker::new(id, ctx.clone(), jobs.clone(), producer).start())
            .collect();
        // -- 🚪 the supervisor keeps no consumer: if every worker dies, the enumerator must notice
        drop(jobs);

        self.advance(RunPhase::Listing);
        let listing = match dispatch_producers.pop() {
            Some(producer) => Enumerator::new(ctx.clone(), producer).run().await,
            None => Default::default(),
        };

        self.advance(RunPhase::Draining);
        let mut the_tallies: Vec<FetchTally> = Vec::with_capacity(the_workers);
        for (id, joined) in join_all(the_fetchers).await.into_iter().enumerate() {
            match joined {
                Ok(tally) => the_tallies.push(tally),
                Err(join_error) => ctx.abort(RunError::Crashed {
                    stage: Stage::Fetching,
                    reason: format!("fetch worker {id}: {join_error}"),
                }),
            }
        }

        self.advance(RunPhase::Finalizing);
        let the_sink_tally = match the_aggregator.await {
            Ok(tally) => tally,
            Err(join_error) => {
                ctx.abort(RunError::Crashed {
                    stage: Stage::Aggregating,
                    reason: join_error.to_string(),
                });
                Default::default()
            }
        };

        let report = RunReport::assemble(
            the_workers,
            listing,
            the_tallies,
            the_sink_tally,
            the_start.elapsed(),
        );

        // -- 🥇 every stage has been joined, so the slot has exactly one owner left
        let the_failure = match Arc::into_inner(ctx.failures) {
            Some(slot) => slot.into_first(),
            None => Some(RunError::Crashed {
                stage: Stage::Aggregating,
                reason: "a stage outlived the run".into(),
            }),
        };
        match the_failure {
            Some(failure) => {
                self.advance(RunPhase::Failed);
                Err(failure)
            }
            None => {
                self.advance(RunPhase::Done);
                info!(
                    "✅ harvest done: {} objects, {} records written in {:?}",
                    report.objects_fetched, report.records_written, report.elapsed
                );
                Ok(report)
            }
        }
    }
}
