//! 📡 *[the enumerator opens the bucket's table of contents. it reads one page at a time.]*
//! *[every key it finds, it slides across the table to whichever worker is free.]*
//!
//! The enumerator walks the listing for `bucket`/`prefix` page by page and hands
//! each key, in listing order, to the dispatch hand-off. It owns the dispatch
//! channel's only producer. When `run` returns, that producer drops and the
//! channel closes behind it, whatever the reason for stopping.
//!
//! 🧠 Knowledge graph:
//! - listing failure or `list_cancel`: the failure is recorded, but `halt` is NOT
//!   pulled. Keys already handed off still get fetched and written. The cord is
//!   checked before each page and each key, never in the middle of a listing call.
//! - `halt` (someone downstream died) or a closed channel: stop quietly
//! - cursors must advance: a truncated page with no token, or the same token
//!   twice, is treated as a listing failure rather than looped on forever

use anyhow::{Result, bail};
use tracing::{debug, info, trace};

use super::RunContext;
use crate::common::{ListPage, within};
use crate::errors::{RunError, Stage};
use crate::supervisors::hand_off::{Closed, Producer};
use crate::supervisors::report::ListingTally;

#[derive(Debug)]
pub(crate) struct Enumerator {
    ctx: RunContext,
    jobs: Producer<String>,
}

/// 🚦 How one attempt to hand a key over ended.
enum Dispatch {
    Sent,
    Halted,
    Cancelled,
    NobodyListening,
}

impl Enumerator {
    pub(crate) fn new(ctx: RunContext, jobs: Producer<String>) -> Self {
        Self { ctx, jobs }
    }

    /// 📡 List and dispatch until the listing ends, fails, or someone says stop.
    pub(crate) async fn run(self) -> ListingTally {
        let mut tally = ListingTally::default();
        let config = &self.ctx.config;
        let mut cursor: Option<String> = None;

        'listing: loop {
            if self.ctx.halt.is_cancelled() {
                debug!("🛑 enumerator saw the halt before listing page {}", tally.pages + 1);
                break;
            }

            if config.list_cancel.is_cancelled() {
                self.ctx.failures.record(RunError::Cancelled {
                    stage: Stage::Listing,
                });
                break;
            }

            // -- 🪢 a page already asked for is waited out, the cord is checked again before dispatch
            let the_page_number = tally.pages + 1;
            let listed = within(
                config.list_timeout,
                "listing",
                config
                    .remote
                    .list_objects(&config.bucket, &config.prefix, cursor.as_deref()),
            )
            .await;
            let listed = listed.and_then(|page| {
                let next = next_cursor(&page, cursor.as_deref())?;
                Ok((page, next))
            });

            let (page, next) = match listed {
                Ok(listed) => listed,
                Err(source) => {
                    self.ctx.failures.record(RunError::Enumeration {
                        page: the_page_number,
                        source,
                    });
                    break;
                }
            };
            tally.pages = the_page_number;
            tally.listed += page.keys.len();
            debug!(
                "📄 page {} listed: {} keys, more to come: {}",
                the_page_number,
                page.keys.len(),
                next.is_some()
            );

            for key in page.keys {
                match self.dispatch(key).await {
                    Dispatch::Sent => tally.dispatched += 1,
                    Dispatch::Halted => {
                        debug!("🛑 enumerator stops dispatching, the run is halting");
                        break 'listing;
                    }
                    Dispatch::Cancelled => {
                        self.ctx.failures.record(RunError::Cancelled {
                            stage: Stage::Listing,
                        });
                        break 'listing;
                    }
                    Dispatch::NobodyListening => {
                        debug!("🚪 no fetch workers left to take keys");
                        break 'listing;
                    }
                }
            }

            match next {
                Some(token) => cursor = Some(token),
                None => break,
            }
        }

        info!(
            "📡 listing done: {} pages, {} keys listed, {} dispatched",
            tally.pages, tally.listed, tally.dispatched
        );
        tally
    }

    async fn dispatch(&self, key: String) -> Dispatch {
        trace!("📨 dispatching '{}'", key);
        tokio::select! {
            biased;
            _ = self.ctx.halt.cancelled() => Dispatch::Halted,
            _ = self.ctx.config.list_cancel.cancelled() => Dispatch::Cancelled,
            sent = self.jobs.send(key) => match sent {
                Ok(()) => Dispatch::Sent,
                Err(Closed) => Dispatch::NobodyListening,
            },
        }
    }
}

/// 🧭 Where to list next, or `None` when the listing is complete.
fn next_cursor(page: &ListPage, previous: Option<&str>) -> Result<Option<String>> {
    if !page.truncated {
        return Ok(None);
    }
    match page.next_token.as_deref() {
        None => bail!("💀 page says there is more, but came without a continuation token"),
        Some(token) if Some(token) == previous => {
            bail!("💀 continuation token '{token}' did not advance, the listing would loop forever")
        }
        Some(token) => Ok(Some(token.to_string())),
    }
}
