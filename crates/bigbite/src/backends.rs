//! 🔌 Backends — where the real I/O happens.
//!
//! 🚰 Remote stores pour the data, Sinks slurp it up.
//! And in between, we panic! (kidding, we use anyhow)
//!
//! 🎭 This module is the casting agency. Need to list a bucket? Fetch an object?
//! Append a line to a file? We've got a backend for that. Two, sometimes.
//! One of them is in RAM and exists purely so the tests can sleep at night.
//!
//! 🧠 Knowledge graph:
//! - [`RemoteStore`]: list a page of keys, fetch one object. That's the whole contract.
//! - [`Sink`]: append one record, close when done. Also the whole contract.
//! - [`SinkOpener`]: hands the aggregator a fresh [`Sink`] at run start, so the
//!   aggregator owns the sink's whole life (open → append… → close).
//! - Concrete backends: `s3` (aws-sdk-s3), `file`, `stdout`, `in_mem`.
//!
//! 🦆 The duck is here because every file must have one. This is law. Do not question the duck.

use anyhow::Result;
use async_trait::async_trait;

use crate::common::ListPage;

pub mod file;
pub mod in_mem;
pub mod s3;
pub mod stdout;

pub use file::{FileSink, FileSinkConfig};
pub use in_mem::{InMemoryRemote, InMemorySink, SinkEvent};
pub use s3::{S3Remote, S3SourceConfig};
pub use stdout::StdoutSink;

// ===== Remote Object Capability =====

/// 🪣 A remote object store that can list keys under a prefix and fetch objects.
///
/// # Contract
/// - `list_objects` returns one page. Pass `None` as the cursor for the first page,
///   then whatever `next_token` the previous page returned.
/// - `fetch_object` returns the object's complete content.
/// - Both may fail. Neither retries. Retrying is somebody else's personality.
#[async_trait]
pub trait RemoteStore: std::fmt::Debug + Send + Sync {
    /// 📄 One page of keys under `prefix`, starting at `continuation`.
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ListPage>;

    /// 📦 The full content of one object.
    async fn fetch_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
}

// ===== Sink Capability =====

/// 🕳️ An append-only destination for records.
///
/// # Contract
/// - `append` writes exactly one record, in the order it is called.
/// - `close` flushes and releases. The aggregator calls it on every exit path
///   it controls, success or not. Skipping `close` is a bug. It is also rude.
#[async_trait]
pub trait Sink: std::fmt::Debug + Send {
    /// 📥 Append one record.
    async fn append(&mut self, record: &str) -> Result<()>;
    /// 🗑️ Flush, finalize, release.
    async fn close(&mut self) -> Result<()>;
}

/// 🚪 Something that knows how to open a [`Sink`] for one run.
///
/// The aggregator calls `open` when it starts, not the caller. That way the
/// sink's handle lives exactly as long as the aggregator does.
#[async_trait]
pub trait SinkOpener: std::fmt::Debug + Send + Sync {
    async fn open(&self) -> Result<Box<dyn Sink>>;
}
