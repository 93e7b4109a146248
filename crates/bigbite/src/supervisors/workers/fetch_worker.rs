//! 🪣 *[a key slides across the table. the worker picks it up, walks to the bucket,]*
//! *[and comes back with an armful of lines. it sets them down one at a time.]*
//!
//! A fetch worker takes keys from the shared dispatch consumer, downloads each
//! object, splits it into records and pushes them, in order, to the
//! aggregation hand-off. Records of one object never interleave with each other
//! out of order: one worker owns one object from fetch to last record.
//!
//! 🧠 Knowledge graph:
//! - dispatch closed and drained: normal exit
//! - `halt` pulled: finish nothing new, leave
//! - `fetch_cancel` pulled: record the cancellation, pull `halt`, leave. The
//!   cords are only checked between keys, so an object already being fetched
//!   is finished and handed over first
//! - fetch failed: [`FetchErrorPolicy`] decides between ending the run and skipping the key
//! - not text: the object is skipped whole, never half-written
//! - aggregation send fails: the aggregator is gone, leave quietly

use std::sync::Arc;

use tracing::{debug, warn};

use super::{RunContext, Worker};
use crate::common::{Record, within};
use crate::errors::{RunError, Stage};
use crate::splitter::split_records;
use crate::supervisors::config::FetchErrorPolicy;
use crate::supervisors::hand_off::{Consumer, Producer};
use crate::supervisors::report::{FetchTally, SkippedObject};
use tokio::task::JoinHandle;

#[derive(Debug)]
pub(crate) struct FetchWorker {
    id: usize,
    ctx: RunContext,
    jobs: Consumer<String>,
    records: Producer<Record>,
}

/// 🚦 Whether to reach for the next key.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

impl FetchWorker {
    pub(crate) fn new(
        id: usize,
        ctx: RunContext,
        jobs: Consumer<String>,
        records: Producer<Record>,
    ) -> Self {
        Self {
            id,
            ctx,
            jobs,
            records,
        }
    }

    async fn run(self) -> FetchTally {
        let mut tally = FetchTally::default();
        debug!("🧵 fetch worker {} reporting for duty", self.id);

        loop {
            let next = tokio::select! {
                biased;
                _ = self.ctx.halt.cancelled() => None,
                _ = self.ctx.config.fetch_cancel.cancelled() => {
                    self.ctx.abort(RunError::Cancelled { stage: Stage::Fetching });
                    None
                }
                key = self.jobs.recv() => key,
            };
            let Some(key) = next else {
                break;
            };
            if self.harvest(key, &mut tally).await == Flow::Stop {
                break;
            }
        }

        debug!(
            "🏁 fetch worker {} clocking out: {} objects, {} records, {} skipped",
            self.id,
            tally.objects,
            tally.records,
            tally.skipped.len()
        );
        tally
    }

    /// 🪣 Fetch one object, split it, hand over every record.
    async fn harvest(&self, key: String, tally: &mut FetchTally) -> Flow {
        let config = &self.ctx.config;
        // -- 🪢 no cord checks in here: a key that was taken gets finished
        let fetched = within(
            config.fetch_timeout,
            "fetch",
            config.remote.fetch_object(&config.bucket, &key),
        )
        .await;
        let content = match fetched {
            Ok(content) => content,
            Err(source) => {
                return match config.on_fetch_error {
                    FetchErrorPolicy::Abort => {
                        self.ctx.abort(RunError::Fetch { key, source });
                        Flow::Stop
                    }
                    FetchErrorPolicy::Skip => {
                        warn!("🙈 worker {} skipping '{}': {:#}", self.id, key, source);
                        tally.skipped.push(SkippedObject {
                            key: key.clone(),
                            cause: RunError::Fetch { key, source },
                        });
                        Flow::Continue
                    }
                };
            }
        };
        tally.objects += 1;
        tally.bytes += content.len() as u64;

        let lines: Vec<&str> = match split_records(&content) {
            Ok(records) => records.collect(),
            Err(split_error) => {
                warn!("🙈 worker {} skipping '{}': {}", self.id, key, split_error);
                tally.skipped.push(SkippedObject {
                    key: key.clone(),
                    cause: RunError::Split {
                        key,
                        source: split_error.into(),
                    },
                });
                return Flow::Continue;
            }
        };

        let origin: Arc<str> = Arc::from(key.as_str());
        for line in &lines {
            if self.records.send(Record::new(origin.clone(), *line)).await.is_err() {
                debug!("🚪 worker {} found the aggregator gone mid-object '{}'", self.id, key);
                return Flow::Stop;
            }
            tally.records += 1;
        }
        debug!(
            "🪣 worker {} hauled '{}': {} bytes, {} records",
            self.id,
            key,
            content.len(),
            lines.len()
        );
        Flow::Continue
    }
}

impl Worker for FetchWorker {
    type Tally = FetchTally;

    fn start(self) -> JoinHandle<FetchTally> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::backends::{InMemoryRemote, InMemorySink};
    use crate::supervisors::config::RunConfig;
    use crate::supervisors::hand_off::HandOff;

    struct Rig {
        ctx: RunContext,
        keys: Producer<String>,
        records: Consumer<Record>,
        worker: FetchWorker,
    }

    fn a_rig(remote: InMemoryRemote, policy: FetchErrorPolicy) -> Rig {
        let the_config = RunConfig::new(Arc::new(remote), Arc::new(InMemorySink::new()), "b", "")
            .with_fetch_policy(policy);
        let ctx = RunContext::new(Arc::new(the_config));
        let (mut key_producers, jobs) = HandOff::new("dispatch").split(1);
        let (mut record_producers, records) = HandOff::new("aggregation").split(1);
        let worker = FetchWorker::new(
            0,
            ctx.clone(),
            jobs,
            record_producers.pop().expect("💀 one record producer"),
        );
        Rig {
            ctx,
            keys: key_producers.pop().expect("💀 one key producer"),
            records,
            worker,
        }
    }

    /// 🧺 Feed `keys`, close the door, and collect everything the worker sends.
    async fn run_with(rig: Rig, keys: &[&str]) -> (RunContext, FetchTally, Vec<(String, String)>) {
        let Rig {
            ctx,
            keys: the_keys,
            records,
            worker,
        } = rig;
        let the_worker = worker.start();
        let the_collector = tokio::spawn(async move {
            let mut the_records = Vec::new();
            while let Some(record) = records.recv().await {
                the_records.push((record.origin.to_string(), record.text));
            }
            the_records
        });
        for key in keys {
            if the_keys.send(key.to_string()).await.is_err() {
                break;
            }
        }
        drop(the_keys);

        let the_tally = tokio::time::timeout(Duration::from_secs(5), the_worker)
            .await
            .expect("💀 the worker never clocked out")
            .expect("💀 the worker panicked");
        let the_records = the_collector.await.expect("💀 collector");
        (ctx, the_tally, the_records)
    }

    fn pair(origin: &str, text: &str) -> (String, String) {
        (origin.to_string(), text.to_string())
    }

    #[tokio::test]
    async fn the_one_where_objects_come_back_as_records_in_order() {
        let the_remote = InMemoryRemote::new()
            .object("x", "1\n2\n")
            .object("y", "3");
        let (ctx, the_tally, the_records) =
            run_with(a_rig(the_remote, FetchErrorPolicy::Abort), &["x", "y"]).await;

        assert_eq!(
            the_records,
            vec![pair("x", "1"), pair("x", "2"), pair("y", "3")]
        );
        assert_eq!(the_tally.objects, 2);
        assert_eq!(the_tally.bytes, 5);
        assert_eq!(the_tally.records, 3);
        assert!(!ctx.halt.is_cancelled());
    }

    #[tokio::test]
    async fn the_one_where_abort_means_abort() {
        let the_remote = InMemoryRemote::new()
            .object("x", "1\n")
            .failing_object("x")
            .object("y", "2\n");
        let (ctx, the_tally, the_records) =
            run_with(a_rig(the_remote, FetchErrorPolicy::Abort), &["x", "y"]).await;

        assert!(the_records.is_empty());
        assert_eq!(the_tally.objects, 0);
        assert!(ctx.halt.is_cancelled());
        let the_failure = Arc::into_inner(ctx.failures).and_then(|slot| slot.into_first());
        assert!(matches!(the_failure, Some(RunError::Fetch { ref key, .. }) if key == "x"));
    }

    #[tokio::test]
    async fn the_one_where_skip_means_skip() {
        let the_remote = InMemoryRemote::new()
            .object("x", "1\n")
            .failing_object("x")
            .object("y", "2\n");
        let (ctx, the_tally, the_records) =
            run_with(a_rig(the_remote, FetchErrorPolicy::Skip), &["x", "y"]).await;

        assert_eq!(the_records, vec![pair("y", "2")]);
        assert_eq!(the_tally.skipped.len(), 1);
        assert_eq!(the_tally.skipped[0].key, "x");
        assert!(matches!(the_tally.skipped[0].cause, RunError::Fetch { .. }));
        assert!(!ctx.halt.is_cancelled());
    }

    #[tokio::test]
    async fn the_one_where_binary_objects_are_skipped_whole() {
        let the_remote = InMemoryRemote::new()
            .object("bin", vec![b'o', b'k', b'\n', 0xff, 0xfe])
            .object("txt", "fine\n");
        let (ctx, the_tally, the_records) =
            run_with(a_rig(the_remote, FetchErrorPolicy::Abort), &["bin", "txt"]).await;

        // -- 🧹 not even the valid first line of the binary object gets through
        assert_eq!(the_records, vec![pair("txt", "fine")]);
        assert_eq!(the_tally.skipped.len(), 1);
        assert!(matches!(the_tally.skipped[0].cause, RunError::Split { .. }));
        assert!(!ctx.halt.is_cancelled());
    }

    #[tokio::test]
    async fn the_one_where_the_fetch_cord_is_pulled() {
        let rig = a_rig(InMemoryRemote::new().object("x", "1\n"), FetchErrorPolicy::Abort);
        rig.ctx.config.fetch_cancel.cancel();
        let (ctx, the_tally, the_records) = run_with(rig, &["x"]).await;

        assert!(the_records.is_empty());
        assert_eq!(the_tally.objects, 0);
        assert!(ctx.halt.is_cancelled());
        let the_failure = Arc::into_inner(ctx.failures).and_then(|slot| slot.into_first());
        assert!(matches!(
            the_failure,
            Some(RunError::Cancelled {
                stage: Stage::Fetching
            })
        ));
    }

    #[tokio::test]
    async fn the_one_where_the_fetch_cord_lets_the_object_in_hand_finish() {
        let the_remote = InMemoryRemote::new()
            .object("x", "1\n2\n")
            .slow_object("x", Duration::from_millis(200))
            .object("y", "3\n");
        let rig = a_rig(the_remote.clone(), FetchErrorPolicy::Abort);
        let the_cord = rig.ctx.config.fetch_cancel.clone();
        let the_puller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            the_cord.cancel();
        });

        let (ctx, the_tally, the_records) = run_with(rig, &["x", "y"]).await;
        the_puller.await.expect("💀 puller");

        // -- 🪢 x was already on its way when the cord went, so it lands; y is never started
        assert_eq!(the_records, vec![pair("x", "1"), pair("x", "2")]);
        assert_eq!(the_tally.objects, 1);
        assert_eq!(the_remote.fetched().await, vec!["x"]);
        assert!(ctx.halt.is_cancelled());
        let the_failure = Arc::into_inner(ctx.failures).and_then(|slot| slot.into_first());
        assert!(matches!(
            the_failure,
            Some(RunError::Cancelled {
                stage: Stage::Fetching
            })
        ));
    }

    #[tokio::test]
    async fn the_one_where_the_aggregator_is_gone() {
        let rig = a_rig(
            InMemoryRemote::new().object("x", "1\n2\n3\n"),
            FetchErrorPolicy::Abort,
        );
        rig.records.close();
        let (_ctx, the_tally, the_records) = run_with(rig, &["x"]).await;

        assert!(the_records.is_empty());
        assert_eq!(the_tally.objects, 1);
        assert_eq!(the_tally.records, 0);
    }
}
