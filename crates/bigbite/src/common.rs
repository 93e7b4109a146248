// ai
//! 📦 Common data structures — the building blocks of bigbite
//!
//! 🎬 COLD OPEN — INT. S3 BUCKET — 3:47 AM
//!
//! Eleven thousand objects sit under a prefix. Each one is a little pile of
//! newline-delimited JSON somebody dumped there "temporarily" in 2019. Nobody
//! remembers what they are. Everybody wants them in one file. By morning.
//!
//! This module holds the humble structs that ferry those lines downstream:
//! a [`ListPage`] from the enumerator's point of view, and a [`Record`] from
//! everyone else's. They don't ask questions. They carry the data.
//!
//! 🦆 The duck is here because every file must have one.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};

/// 📄 One page of a listing, exactly as the remote store handed it over.
///
/// 🧠 Knowledge graph: `keys` keep the store's order. `next_token` is the opaque
/// cursor for the next call. `truncated` is the store admitting there's more.
/// A page that says `truncated = true` but carries no token is a liar, and the
/// enumerator treats it as such.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// 🗝️ Object identifiers, in listing order
    pub keys: Vec<String>,
    /// 🔖 Continuation cursor for the next page, if the store gave us one
    pub next_token: Option<String>,
    /// 📚 "There's more where that came from"
    pub truncated: bool,
}

/// 🎯 One line of text, lifted out of one object, on its way to the sink.
///
/// Immutable once built. The fetch worker that split it owns it until it
/// hits the aggregation hand-off, and then the aggregator owns it. Nobody
/// else gets a turn.
///
/// `origin` is the key of the object this line came from. It is an `Arc<str>`
/// because a 40k-line object would otherwise clone its own key 40k times,
/// and the allocator has been through enough.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub origin: Arc<str>,
    pub text: String,
}

impl Record {
    pub fn new(origin: Arc<str>, text: impl Into<String>) -> Self {
        Self {
            origin,
            text: text.into(),
        }
    }
}

/// ⏰ Run `fut` under an optional deadline.
///
/// `None` means "take as long as you need", which is what the remote store
/// was going to do anyway. `Some(limit)` turns a stalled call into a regular
/// error with a readable message instead of a run that never ends.
pub(crate) async fn within<T, F>(limit: Option<Duration>, what: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
            anyhow!(
                "⏰ {what} timed out after {limit:?}. We waited. We refreshed. We waited some more."
            )
        })?,
        None => fut.await,
    }
}
