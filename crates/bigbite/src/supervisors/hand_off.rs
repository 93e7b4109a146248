// ai
//! 🤝 hand_off.rs — the one place the pipeline's plumbing is allowed to close.
//!
//! 🎬 *[two stages stand on either side of a very small table]*
//! *["You first," says the producer. "No, you first," says the consumer.]*
//! *[the table has room for exactly one item. nobody is getting ahead of anybody.]*
//!
//! A `HandOff<T>` is a rendezvous: `send` returns only once a consumer has
//! taken the item. Under the hood it is an `async-channel` with a single slot
//! plus a per-item acknowledgement, and a closing protocol that is written down
//! instead of implied:
//!
//! - 🤝 **Nobody runs ahead.** The slot holds at most one item, and its sender is
//!   still waiting on it. A sender that gives up (its future is dropped) takes
//!   the item back with it: consumers skip parcels nobody is waiting on.
//! - 👥 **Producers are counted up front.** `split(n)` hands out exactly `n`
//!   [`Producer`]s and sets an atomic roster to `n`. Producers don't clone.
//!   Nobody sneaks in a sender the roster doesn't know about.
//! - 🚪 **The last producer out closes the door.** Each producer's `Drop`
//!   decrements the roster. Whoever takes it to zero calls `close()`. Drop runs on
//!   return, on `?`, and on panic unwind, so a dead producer can't leave the
//!   consumer waiting forever.
//! - 🛑 **A consumer may slam the door early** ([`Consumer::close`]). Every
//!   pending and future `send` then fails, which is how a dying aggregator tells
//!   the workers to stop talking. The last consumer to drop slams it too, so a
//!   sender is never left waiting on a hand-off nobody reads.
//!
//! 🧠 Knowledge graph:
//! - dispatch hand-off: roster of 1 (the enumerator), consumer cloned into every fetch worker
//! - aggregation hand-off: roster of `workers`, one consumer (the aggregator)
//! - a slow sink backs pressure all the way up to the listing, one item at a time 🦆

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_channel::{Receiver, Sender};
use tokio::sync::oneshot;
use tracing::{debug, trace};

/// 📦 One item in the slot, with the line back to the sender still waiting on it.
struct Parcel<T> {
    item: T,
    taken: oneshot::Sender<()>,
}

/// 🤝 A named rendezvous waiting to be split into producers and a consumer.
pub(crate) struct HandOff<T> {
    name: &'static str,
    tx: Sender<Parcel<T>>,
    rx: Receiver<Parcel<T>>,
}

/// 📤 One registered sending end. Not `Clone`, on purpose: the roster must add up.
pub(crate) struct Producer<T> {
    name: &'static str,
    tx: Sender<Parcel<T>>,
    roster: Arc<AtomicUsize>,
}

/// 📥 The receiving end. Clone it for every consumer that shares the work.
pub(crate) struct Consumer<T> {
    name: &'static str,
    rx: Receiver<Parcel<T>>,
    roster: Arc<AtomicUsize>,
}

/// 🚪 The consumers have left the building; the item was not taken.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Closed;

impl<T> HandOff<T> {
    pub(crate) fn new(name: &'static str) -> Self {
        let (tx, rx) = async_channel::bounded(1);
        Self { name, tx, rx }
    }

    /// 👥 Hand out exactly `producers` producers and the consumer.
    ///
    /// With zero producers the channel is closed immediately: nobody is coming,
    /// so there is no point letting the consumer wait for them.
    pub(crate) fn split(self, producers: usize) -> (Vec<Producer<T>>, Consumer<T>) {
        let the_roster = Arc::new(AtomicUsize::new(producers));
        let the_producers = (0..producers)
            .map(|_| Producer {
                name: self.name,
                tx: self.tx.clone(),
                roster: the_roster.clone(),
            })
            .collect();
        if producers == 0 {
            self.tx.close();
        }
        (
            the_producers,
            Consumer {
                name: self.name,
                rx: self.rx,
                roster: Arc::new(AtomicUsize::new(1)),
            },
        )
    }
}

impl<T> Producer<T> {
    /// 📤 Wait until a consumer has taken the item. Fails only if the hand-off was closed first.
    pub(crate) async fn send(&self, item: T) -> Result<(), Closed> {
        let (taken, was_taken) = oneshot::channel();
        self.tx
            .send(Parcel { item, taken })
            .await
            .map_err(|_| Closed)?;
        was_taken.await.map_err(|_| Closed)
    }
}

impl<T> Drop for Producer<T> {
    fn drop(&mut self) {
        // -- 🧮 AcqRel: whoever sees 1 here is provably the last one out
        if self.roster.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.tx.close();
            debug!("🚪 last producer left the '{}' hand-off, door closed", self.name);
        }
    }
}

impl<T> Consumer<T> {
    /// 📥 Next item, or `None` once the hand-off is closed and drained.
    pub(crate) async fn recv(&self) -> Option<T> {
        loop {
            let Parcel { item, taken } = self.rx.recv().await.ok()?;
            if taken.send(()).is_ok() {
                return Some(item);
            }
            trace!("🫥 a sender on '{}' gave up before its item was taken", self.name);
        }
    }

    /// 🛑 Close from the receiving side. Pending and future sends fail.
    pub(crate) fn close(&self) {
        if self.rx.close() {
            debug!("🛑 consumer slammed the '{}' hand-off shut", self.name);
        }
        // -- 🧹 whatever sits in the slot is refused, which wakes its sender
        while self.rx.try_recv().is_ok() {}
    }

    #[cfg(test)]
    pub(crate) fn is_closed(&self) -> bool {
        self.rx.is_closed()
    }
}

impl<T> Clone for Consumer<T> {
    fn clone(&self) -> Self {
        self.roster.fetch_add(1, Ordering::AcqRel);
        Self {
            name: self.name,
            rx: self.rx.clone(),
            roster: self.roster.clone(),
        }
    }
}

impl<T> Drop for Consumer<T> {
    fn drop(&mut self) {
        if self.roster.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.close();
        }
    }
}

impl<T> std::fmt::Debug for HandOff<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandOff").field("name", &self.name).finish_non_exhaustive()
    }
}

impl<T> std::fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer").field("name", &self.name).finish_non_exhaustive()
    }
}

impl<T> std::fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumer").field("name", &self.name).finish_non_exhaustive()
    }
}
