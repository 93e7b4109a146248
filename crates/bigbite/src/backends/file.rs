// ai
//! 📂 Previously, on "Things That Could Go Wrong With A File"...
//!
//! The disk was quiet. Too quiet. A lone aggregator had been tasked with writing
//! lines into a file — just a file, they said. Simple, they said. What could go wrong?
//!
//! The directory didn't exist. The disk was full. Last night's run was still in there,
//! and tonight's run politely appended itself underneath. That last one is a feature.
//!
//! 🚰 Aggregator → FileSink → BufWriter → disk
//! 💀 Disk full → `SinkWrite` error, the run stops, nothing further is appended
//! 🦆 (mandatory, no notes)

mod file_sink;

pub use file_sink::{FileSink, FileSinkConfig};
