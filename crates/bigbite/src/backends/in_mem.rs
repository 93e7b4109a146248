//! # Previously, on bigbite...
//!
//! 🎬 The data was trapped in a bucket nobody could reach from CI. Someone had to
//! pretend to be S3. Someone had to pretend to be a file. Someone had to write
//! backends so simple they live entirely in RAM, gone the moment you blink.
//!
//! That someone was this module.
//!
//! `in_mem` provides an in-memory [`RemoteStore`](super::RemoteStore) and
//! [`Sink`](super::Sink) for testing and dry runs. The [`InMemoryRemote`] serves
//! pages of keys and object bodies from a HashMap, and can be told to fail a
//! page, fail an object, or dawdle on an object. The [`InMemorySink`] collects
//! every append (and every open/close) behind an `Arc<Mutex<...>>` so callers
//! can inspect what arrived — great for assertions, great for trust issues.
//!
//! 🦆
//!
//! ✅ No network calls. No disk I/O. No heartbeat. Just vibes and heap memory.

mod in_mem_remote;
mod in_mem_sink;

pub use in_mem_remote::InMemoryRemote;
pub use in_mem_sink::{InMemorySink, SinkEvent};
