use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::{
    fs::{File, OpenOptions},
    io::{self, AsyncWriteExt},
};
use tracing::{debug, trace};

use crate::backends::{Sink, SinkOpener};

// -- 🚰 FileSinkConfig — lives here, cozy next to its FileSink bestie. No long-distance config relationships.
// KNOWLEDGE GRAPH: one backend = one config = one file. Clean.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct FileSinkConfig {
    pub path: PathBuf,
    /// 🧨 Start from an empty file instead of appending to whatever is there.
    /// Off by default: appending never eats yesterday's results.
    #[serde(default)]
    pub truncate: bool,
}

/// 🚰 FileSink — appends one record per line to a file. I/O only.
///
/// It's a BufWriter around a tokio `File`. Simple. Honest. Does not complain.
/// Does not retry. Does not have opinions about your data format. Each record
/// gets exactly one `\n` after it, and that's the whole file format.
///
/// ⚠️ Appends by default. Run it twice, get everything twice. Set `truncate = true`
/// if you wanted a fresh file. He who forgets this, deduplicates in shame.
#[derive(Debug)]
pub struct FileSink {
    file_buf: io::BufWriter<File>,
    path: PathBuf,
}

impl FileSink {
    /// 🚀 Opens (or creates) the sink file and wraps it in a BufWriter.
    pub async fn open(sink_config: &FileSinkConfig) -> Result<Self> {
        let mut the_options = OpenOptions::new();
        the_options.create(true);
        if sink_config.truncate {
            the_options.write(true).truncate(true);
        } else {
            the_options.append(true);
        }

        // -- 💀 The file refused to be born. Perhaps the directory didn't exist. Perhaps permissions
        // -- were set by someone who really, truly, did not want this file to exist.
        let file_handle = the_options.open(&sink_config.path).await.with_context(|| {
            format!(
                "💀 The sink file '{}' could not be conjured into existence. \
                 We stared at the path. The path stared back. \
                 One of us was wrong about whether the parent directory existed. \
                 It was us. It was always us.",
                sink_config.path.display()
            )
        })?;
        debug!(
            "📂 sink file '{}' open (truncate: {})",
            sink_config.path.display(),
            sink_config.truncate
        );

        // -- 📦 BufWriter: because issuing one syscall per line is a war crime.
        Ok(Self {
            file_buf: io::BufWriter::new(file_handle),
            path: sink_config.path.clone(),
        })
    }
}

#[async_trait]
impl Sink for FileSink {
    /// 📡 Write one record and its newline. That's the whole job.
    async fn append(&mut self, record: &str) -> Result<()> {
        trace!("📬 {} bytes walked into the file sink", record.len());
        self.file_buf.write_all(record.as_bytes()).await?;
        self.file_buf.write_all(b"\n").await?;
        Ok(())
    }

    /// 🗑️ Flush the BufWriter and close up shop.
    ///
    /// KNOWLEDGE GRAPH: `flush()` is explicit because async Drop is not a thing in Rust yet.
    /// The handle itself is released when the sink is dropped, flush or no flush.
    async fn close(&mut self) -> Result<()> {
        trace!("🎬 final flush. the file sink takes its bow");
        self.file_buf.flush().await.with_context(|| {
            format!(
                "💀 Error flushing '{}' — the buffer held its data to the very end, \
                 only for the disk to say no. The bytes are still in memory. The file remains unwritten.",
                self.path.display()
            )
        })
    }
}

#[async_trait]
impl SinkOpener for FileSinkConfig {
    async fn open(&self) -> Result<Box<dyn Sink>> {
        Ok(Box::new(FileSink::open(self).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn write_lines(config: &FileSinkConfig, lines: &[&str]) {
        let mut the_sink = config.open().await.expect("💀 sink should open in a temp dir");
        for line in lines {
            the_sink.append(line).await.expect("💀 append to a temp file failed");
        }
        the_sink.close().await.expect("💀 flush failed");
    }

    #[tokio::test]
    async fn the_one_where_each_record_gets_its_own_line() {
        let the_dir = tempfile::tempdir().expect("💀 no temp dir, no test");
        let the_config = FileSinkConfig {
            path: the_dir.path().join("results.json"),
            truncate: false,
        };

        write_lines(&the_config, &["x", "y", ""]).await;

        let the_contents = tokio::fs::read_to_string(&the_config.path)
            .await
            .expect("💀 the file we just wrote vanished");
        assert_eq!(the_contents, "x\ny\n\n");
    }

    #[tokio::test]
    async fn the_one_where_a_second_run_appends_instead_of_clobbering() {
        let the_dir = tempfile::tempdir().expect("💀 no temp dir, no test");
        let the_config = FileSinkConfig {
            path: the_dir.path().join("results.json"),
            truncate: false,
        };

        write_lines(&the_config, &["first"]).await;
        write_lines(&the_config, &["second"]).await;

        let the_contents = tokio::fs::read_to_string(&the_config.path)
            .await
            .expect("💀 the file we just wrote vanished");
        assert_eq!(the_contents, "first\nsecond\n");
    }

    #[tokio::test]
    async fn the_one_where_truncate_starts_from_a_clean_slate() {
        let the_dir = tempfile::tempdir().expect("💀 no temp dir, no test");
        let the_path = the_dir.path().join("results.json");
        tokio::fs::write(&the_path, "stale\n")
            .await
            .expect("💀 could not plant the stale file");

        let the_config = FileSinkConfig {
            path: the_path.clone(),
            truncate: true,
        };
        write_lines(&the_config, &["fresh"]).await;

        let the_contents = tokio::fs::read_to_string(&the_path)
            .await
            .expect("💀 the file we just wrote vanished");
        assert_eq!(the_contents, "fresh\n");
    }

    #[tokio::test]
    async fn the_one_where_a_missing_directory_is_an_error_not_a_panic() {
        let the_dir = tempfile::tempdir().expect("💀 no temp dir, no test");
        let the_config = FileSinkConfig {
            path: the_dir.path().join("nope").join("results.json"),
            truncate: false,
        };
        let the_error = the_config
            .open()
            .await
            .expect_err("💀 a file in a missing directory should not open");
        assert!(the_error.to_string().contains("could not be conjured"));
    }
}
