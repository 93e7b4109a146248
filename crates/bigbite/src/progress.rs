// AI
//! 📊 progress.rs — "Are we there yet?" — every harvest, every time, forever.
//!
//! 🚀 Two jobs live here. While the run is going, [`ProgressMetrics`] keeps a
//! spinner alive on stderr with records, bytes and a sliding-window rate. When the
//! run is over, [`render_summary`] turns a [`RunReport`] into a comfy table for
//! whoever is still watching the terminal.
//!
//! ⚠️ We never know the total up front. A bucket prefix doesn't come with a
//! size, so there's no percent and no ETA. Just a spinner and honest numbers.
//!
//! 🦆 The duck has nothing to do with this module. It's just vibing.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::NOTHING};
use indicatif::{ProgressBar, ProgressStyle};

use crate::supervisors::RunReport;

// -- 📏 one mebibyte. not a megabyte. there's a difference and I will die on this hill.
const MIB: u64 = 1024 * 1024;

/// ⏳ How far back the rate looks.
const RATE_WINDOW: Duration = Duration::from_secs(5);

/// 📦 Bytes, in whichever unit doesn't make the reader count digits.
pub(crate) fn format_bytes(bytes: u64) -> String {
    if bytes >= 512 * MIB {
        format!("{:.2} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= 1024 {
        format!("{:.2} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{} bytes", bytes)
    }
}

/// 🔢 "1000000" → "1,000,000". You're welcome, eyes.
pub(crate) fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// ⏱️ MM:SS, or HH:MM:SS if you should probably call your mom.
pub(crate) fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// 📡 Throughput right now, give or take five seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Rates {
    records_per_sec: f64,
    mib_per_sec: f64,
}

/// 📊 Live counters for the aggregator, and the spinner that shows them.
///
/// Owned by the aggregator alone. Nobody else writes to it, nobody else reads it.
pub(crate) struct ProgressMetrics {
    /// 🏷️ what are we even harvesting? shown above the numbers
    label: String,
    total_bytes: u64,
    total_records: u64,
    /// 🎨 hidden when progress is switched off, so callers never have to check
    progress_bar: ProgressBar,
    /// 🔄 (when, bytes, records) samples inside the rate window
    rate_samples: VecDeque<(Instant, u64, u64)>,
    start_time: Instant,
}

impl std::fmt::Debug for ProgressMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // -- 🎭 ProgressBar doesn't derive Debug, so neither can we
        f.debug_struct("ProgressMetrics")
            .field("label", &self.label)
            .field("total_bytes", &self.total_bytes)
            .field("total_records", &self.total_records)
            .finish()
    }
}

impl ProgressMetrics {
    pub(crate) fn new(label: String, visible: bool) -> Self {
        let progress_bar = if visible {
            let the_bar = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
                the_bar.set_style(style);
            }
            the_bar.enable_steady_tick(Duration::from_millis(120));
            the_bar
        } else {
            ProgressBar::hidden()
        };

        let start_time = Instant::now();
        // -- 🔄 seed the window with t=0 so the first rate has something to compare to
        let mut rate_samples = VecDeque::new();
        rate_samples.push_back((start_time, 0u64, 0u64));

        Self {
            label,
            total_bytes: 0,
            total_records: 0,
            progress_bar,
            rate_samples,
            start_time,
        }
    }

    /// 🔄 Count one more record of `bytes` bytes, and redraw.
    pub(crate) fn update(&mut self, bytes: u64, records: u64) {
        self.total_bytes += bytes;
        self.total_records += records;
        if self.progress_bar.is_hidden() {
            return;
        }
        let rates = self.calculate_rates(Instant::now());
        self.render(rates);
    }

    pub(crate) fn finish(&self) {
        self.progress_bar.finish_and_clear();
    }

    fn calculate_rates(&mut self, now: Instant) -> Rates {
        while let Some(&(timestamp, _, _)) = self.rate_samples.front() {
            if now.duration_since(timestamp) > RATE_WINDOW {
                self.rate_samples.pop_front();
            } else {
                break;
            }
        }
        self.rate_samples
            .push_back((now, self.total_bytes, self.total_records));

        if let Some(&(oldest_time, oldest_bytes, oldest_records)) = self.rate_samples.front() {
            let elapsed = now.duration_since(oldest_time).as_secs_f64();
            if elapsed > 0.0 {
                let bytes_delta = self.total_bytes.saturating_sub(oldest_bytes);
                let records_delta = self.total_records.saturating_sub(oldest_records);
                return Rates {
                    records_per_sec: records_delta as f64 / elapsed,
                    mib_per_sec: (bytes_delta as f64 / elapsed) / MIB as f64,
                };
            }
        }
        // -- 💤 not enough elapsed time yet
        Rates {
            records_per_sec: 0.0,
            mib_per_sec: 0.0,
        }
    }

    fn render(&self, rates: Rates) {
        let mut table = Table::new();
        table.load_preset(NOTHING);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.add_row(vec![
            Cell::new(format!("{} records/s", format_number(rates.records_per_sec as u64)))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{} records", format_number(self.total_records)))
                .set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new(format!("{:.2} MiB/s", rates.mib_per_sec)).set_alignment(CellAlignment::Right),
            Cell::new(format_bytes(self.total_bytes)).set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new(format!("{} elapsed", format_duration(self.start_time.elapsed())))
                .set_alignment(CellAlignment::Right),
            Cell::new(""),
        ]);
        self.progress_bar
            .set_message(format!("harvesting: {}\n{}", self.label, table));
    }
}

/// 🧾 The end-of-run table. Two columns, no borders, numbers on the right.
pub fn render_summary(report: &RunReport) -> Table {
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let rows: Vec<(&str, String)> = vec![
        ("pages listed", format_number(report.pages_listed as u64)),
        ("objects listed", format_number(report.objects_listed as u64)),
        ("objects fetched", format_number(report.objects_fetched as u64)),
        ("bytes fetched", format_bytes(report.bytes_fetched)),
        ("records written", format_number(report.records_written)),
        ("bytes written", format_bytes(report.bytes_written)),
        ("objects skipped", format_number(report.skipped.len() as u64)),
        ("workers", report.workers.to_string()),
        ("elapsed", format_duration(report.elapsed)),
    ];
    for (what, value) in rows {
        table.add_row(vec![
            Cell::new(what),
            Cell::new(value).set_alignment(CellAlignment::Right),
        ]);
    }
    for skipped in &report.skipped {
        table.add_row(vec![
            Cell::new(format!("  skipped: {}", skipped.key)),
            Cell::new(skipped.cause.to_string()).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}
