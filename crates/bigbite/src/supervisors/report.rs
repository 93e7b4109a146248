//! 🧾 What each stage brings back when it clocks out, and the report they add up to.
//!
//! Every stage keeps its own tally in a local variable and hands it back through
//! its `JoinHandle`. The supervisor sums them once everyone is home. No shared
//! counters, no atomics, nobody reading a number while someone else writes it.

use std::time::Duration;

use crate::errors::RunError;

/// 📡 What the enumerator saw.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct ListingTally {
    pub(crate) pages: usize,
    pub(crate) listed: usize,
    pub(crate) dispatched: usize,
}

/// 🪣 What one fetch worker did.
#[derive(Debug, Default)]
pub(crate) struct FetchTally {
    pub(crate) objects: usize,
    pub(crate) bytes: u64,
    pub(crate) records: u64,
    pub(crate) skipped: Vec<SkippedObject>,
}

/// 📝 What the aggregator got into the sink.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct SinkTally {
    pub(crate) records: u64,
    pub(crate) bytes: u64,
}

/// 🙈 An object that was listed but contributed nothing, and why.
#[derive(Debug)]
pub struct SkippedObject {
    pub key: String,
    /// Either a [`RunError::Fetch`] (under the skip policy) or a [`RunError::Split`].
    pub cause: RunError,
}

/// 📊 The numbers from one finished run.
#[derive(Debug)]
pub struct RunReport {
    pub pages_listed: usize,
    pub objects_listed: usize,
    pub objects_dispatched: usize,
    pub objects_fetched: usize,
    pub bytes_fetched: u64,
    pub records_split: u64,
    pub records_written: u64,
    pub bytes_written: u64,
    pub skipped: Vec<SkippedObject>,
    pub workers: usize,
    pub elapsed: Duration,
}

impl RunReport {
    pub(crate) fn assemble(
        workers: usize,
        listing: ListingTally,
        fetches: Vec<FetchTally>,
        sink: SinkTally,
        elapsed: Duration,
    ) -> Self {
        let mut the_report = Self {
            pages_listed: listing.pages,
            objects_listed: listing.listed,
            objects_dispatched: listing.dispatched,
            objects_fetched: 0,
            bytes_fetched: 0,
            records_split: 0,
            records_written: sink.records,
            bytes_written: sink.bytes,
            skipped: Vec::new(),
            workers,
            elapsed,
        };
        for tally in fetches {
            the_report.objects_fetched += tally.objects;
            the_report.bytes_fetched += tally.bytes;
            the_report.records_split += tally.records;
            the_report.skipped.extend(tally.skipped);
        }
        // -- 🔤 workers finish in whatever order; the report shouldn't care
        the_report.skipped.sort_by(|a, b| a.key.cmp(&b.key));
        the_report
    }

    /// 🙈 Just the keys that were skipped, sorted.
    pub fn skipped_keys(&self) -> Vec<&str> {
        self.skipped.iter().map(|s| s.key.as_str()).collect()
    }
}
