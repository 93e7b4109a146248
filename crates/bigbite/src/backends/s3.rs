// ai
//! 🪣🚀🌐 S3 Backend — the cloud-to-ground data paratrooper.
//!
//! INT. AWS CONSOLE — NIGHT. A lone bucket sits in us-east-1, bloated with
//! newline-delimited logs under a prefix nobody has listed since the intern left.
//! The data has been waiting. Patient. Ready to be paged through by a Rust
//! process with a continuation token and something to prove.
//!
//! This module wraps the AWS S3 SDK and exposes a [`RemoteStore`](super::RemoteStore)
//! implementation: `ListObjectsV2` for pages of keys, `GetObject` for bodies.
//!
//! 🧠 Knowledge graph:
//! - Config co-located: `S3SourceConfig` lives in `s3_remote.rs`
//! - Trait impl: `impl RemoteStore for S3Remote`
//! - Transport: `list_objects_v2` → `ListPage`; `get_object` → `ByteStream::collect()` → `Vec<u8>`
//! - `endpoint_url` + `force_path_style` make MinIO & friends (and wiremock) work
//!
//! 🦆 The duck has no clearance for AWS. It watches from the edge of the VPC.

mod s3_remote;

pub use s3_remote::{S3Remote, S3SourceConfig};
