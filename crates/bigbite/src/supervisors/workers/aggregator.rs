//! 🎬 *[records pour in from every worker. somewhere, a sink waits.]*
//! *[the clock on the wall reads 2:47am. nobody asked for this data. and yet.]*
//!
//! 🗑️ The aggregator is the only stage that touches the sink. It opens it,
//! appends every record that arrives on the aggregation hand-off in arrival
//! order, and closes it. It is also the only one that owns progress.
//!
//! 🧠 Knowledge graph:
//! - it drains until the aggregation channel is closed AND empty, which only
//!   happens after the last fetch worker has left
//! - it ignores `halt`: whatever made it into the channel gets written
//! - append fails: stop appending, close the sink anyway, slam the channel shut
//!   so workers stop producing, pull `halt`
//! - close is attempted on every path that got as far as opening

use tracing::{debug, info};

use super::{RunContext, Worker};
use crate::backends::Sink;
use crate::common::Record;
use crate::errors::RunError;
use crate::progress::ProgressMetrics;
use crate::supervisors::hand_off::Consumer;
use crate::supervisors::report::SinkTally;
use tokio::task::JoinHandle;

#[derive(Debug)]
pub(crate) struct Aggregator {
    ctx: RunContext,
    records: Consumer<Record>,
}

impl Aggregator {
    pub(crate) fn new(ctx: RunContext, records: Consumer<Record>) -> Self {
        Self { ctx, records }
    }

    async fn run(self) -> SinkTally {
        let mut tally = SinkTally::default();
        let config = &self.ctx.config;

        let mut sink = match config.sink.open().await {
            Ok(sink) => sink,
            Err(source) => {
                self.records.close();
                self.ctx.abort(RunError::SinkOpen { source });
                return tally;
            }
        };
        debug!("🚪 sink open, aggregator draining");

        let label = format!("s3://{}/{}", config.bucket, config.prefix);
        let mut progress = ProgressMetrics::new(label, config.progress);

        if let Err(failure) = self.drain(sink.as_mut(), &mut tally, &mut progress).await {
            // -- 🛑 no more appends. tell the producers before anything else
            self.records.close();
            self.ctx.abort(failure);
        }

        if let Err(source) = sink.close().await {
            self.ctx.abort(RunError::SinkClose { source });
        }
        progress.finish();
        info!(
            "🏁 aggregator done: {} records, {} bytes written",
            tally.records, tally.bytes
        );
        tally
    }

    async fn drain(
        &self,
        sink: &mut dyn Sink,
        tally: &mut SinkTally,
        progress: &mut ProgressMetrics,
    ) -> Result<(), RunError> {
        while let Some(record) = self.records.recv().await {
            let the_number = tally.records + 1;
            sink.append(&record.text)
                .await
                .map_err(|source| RunError::SinkWrite {
                    record_number: the_number,
                    origin: record.origin.to_string(),
                    source,
                })?;
            // -- 📏 the newline the sink adds counts too
            let the_bytes = record.text.len() as u64 + 1;
            tally.records = the_number;
            tally.bytes += the_bytes;
            progress.update(the_bytes, 1);
        }
        debug!("🏁 aggregation channel closed and drained");
        Ok(())
    }
}

impl Worker for Aggregator {
    type Tally = SinkTally;

    fn start(self) -> JoinHandle<SinkTally> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::backends::{InMemoryRemote, InMemorySink, SinkEvent};
    use crate::supervisors::config::RunConfig;
    use crate::supervisors::hand_off::{HandOff, Producer};

    fn a_rig(sink: &InMemorySink) -> (RunContext, Producer<Record>, Aggregator) {
        let the_config = RunConfig::new(Arc::new(InMemoryRemote::new()), Arc::new(sink.clone()), "b", "");
        let ctx = RunContext::new(Arc::new(the_config));
        let (mut producers, records) = HandOff::new("aggregation").split(1);
        let the_producer = producers.pop().expect("💀 one producer");
        let the_aggregator = Aggregator::new(ctx.clone(), records);
        (ctx, the_producer, the_aggregator)
    }

    fn a_record(text: &str) -> Record {
        Record::new(Arc::from("k"), text)
    }

    #[tokio::test]
    async fn the_one_where_everything_lands_in_arrival_order() {
        let the_sink = InMemorySink::new();
        let (ctx, the_producer, the_aggregator) = a_rig(&the_sink);
        let the_task = the_aggregator.start();

        for text in ["one", "two", "three"] {
            the_producer.send(a_record(text)).await.expect("💀 aggregator is listening");
        }
        drop(the_producer);

        let the_tally = tokio::time::timeout(Duration::from_secs(5), the_task)
            .await
            .expect("💀 aggregator never finished")
            .expect("💀 aggregator panicked");

        assert_eq!(
            the_tally,
            SinkTally {
                records: 3,
                bytes: 4 + 4 + 6
            }
        );
        assert_eq!(
            the_sink.events().await,
            vec![
                SinkEvent::Opened,
                SinkEvent::Appended("one".into()),
                SinkEvent::Appended("two".into()),
                SinkEvent::Appended("three".into()),
                SinkEvent::Closed,
            ]
        );
        assert!(!ctx.halt.is_cancelled());
    }

    #[tokio::test]
    async fn the_one_where_the_second_append_fails_and_the_sink_still_closes() {
        let the_sink = InMemorySink::new().failing_on_append(2);
        let (ctx, the_producer, the_aggregator) = a_rig(&the_sink);
        let the_task = the_aggregator.start();

        the_producer.send(a_record("one")).await.expect("💀 first send");
        the_producer.send(a_record("two")).await.expect("💀 second send");
        // -- 🚪 sooner or later the door slams and sends start failing
        let mut the_refusals = 0;
        for _ in 0..100 {
            if the_producer.send(a_record("more")).await.is_err() {
                the_refusals += 1;
                break;
            }
        }
        assert_eq!(the_refusals, 1, "the aggregator should have closed the channel");

        let the_tally = the_task.await.expect("💀 aggregator panicked");
        assert_eq!(the_tally.records, 1);
        assert_eq!(
            the_sink.events().await,
            vec![
                SinkEvent::Opened,
                SinkEvent::Appended("one".into()),
                SinkEvent::Closed,
            ]
        );
        assert!(ctx.halt.is_cancelled());
        let the_failure = Arc::into_inner(ctx.failures).and_then(|slot| slot.into_first());
        assert!(matches!(
            the_failure,
            Some(RunError::SinkWrite {
                record_number: 2,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn the_one_where_the_sink_never_opens() {
        let the_sink = InMemorySink::new().failing_on_open();
        let (ctx, the_producer, the_aggregator) = a_rig(&the_sink);
        let the_tally = the_aggregator.start().await.expect("💀 aggregator panicked");

        assert_eq!(the_tally, SinkTally::default());
        assert!(the_producer.send(a_record("x")).await.is_err());
        assert!(the_sink.events().await.is_empty());
        assert!(ctx.halt.is_cancelled());
        let the_failure = Arc::into_inner(ctx.failures).and_then(|slot| slot.into_first());
        assert!(matches!(the_failure, Some(RunError::SinkOpen { .. })));
    }
}
