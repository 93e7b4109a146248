//! 📺 StdoutSink — for when the destination is a pipe, and the pipe is someone else's problem.
//!
//! `bigbite | jq .` is a perfectly valid sink strategy. We don't judge. We flush.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{self, AsyncWriteExt};

use crate::backends::Sink;

/// 📺 Writes each record plus `\n` to standard output through a buffer.
#[derive(Debug)]
pub struct StdoutSink {
    out: io::BufWriter<io::Stdout>,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self {
            out: io::BufWriter::new(io::stdout()),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sink for StdoutSink {
    async fn append(&mut self, record: &str) -> Result<()> {
        self.out.write_all(record.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        // -- 🚿 a closed pipe downstream (`| head`) shows up right here
        self.out
            .flush()
            .await
            .context("💀 stdout would not take the last of our bytes. Did somebody close the pipe?")
    }
}
