use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;

use crate::backends::{Sink, SinkOpener};

/// 📒 Everything that ever happened to an [`InMemorySink`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Opened,
    Appended(String),
    Closed,
}

/// 📦 A sink that never forgets. Unlike my dad, who forgot my soccer game in 1998.
///
/// `InMemorySink` hoards every event in a shared Vec wrapped in a Mutex wrapped
/// in an Arc. It's types all the way down.
///
/// Clone-able because tests need to peek inside after handing a copy off to the
/// pipeline. The `Arc` means everyone shares the same Vec. Communist data, but
/// in a good way. The borrow checker approved. Barely. It had notes.
///
/// 💀 Can be rigged to fail: on open, or on the Nth append (1-based).
#[derive(Debug, Default, Clone)]
pub struct InMemorySink {
    /// 🔒 The vault. The evidence locker. The "I told you I received that record" proof.
    events: Arc<tokio::sync::Mutex<Vec<SinkEvent>>>,
    fail_on_append: Option<u64>,
    fail_on_open: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 💀 The `record_number`th append (1-based) fails, and nothing is stored for it.
    pub fn failing_on_append(mut self, record_number: u64) -> Self {
        self.fail_on_append = Some(record_number);
        self
    }

    /// 💀 Opening fails. The aggregator never gets a sink at all.
    pub fn failing_on_open(mut self) -> Self {
        self.fail_on_open = true;
        self
    }

    /// 📜 Everything that happened, in order.
    pub async fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().await.clone()
    }

    /// 📝 Just the appended records, in order.
    pub async fn records(&self) -> Vec<String> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Appended(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Sink for InMemorySink {
    /// 🚰 Lock, count, push. The Mutex is load-bearing. Do not remove.
    async fn append(&mut self, record: &str) -> Result<()> {
        let mut the_events = self.events.lock().await;
        let the_number = the_events
            .iter()
            .filter(|e| matches!(e, SinkEvent::Appended(_)))
            .count() as u64
            + 1;
        if self.fail_on_append == Some(the_number) {
            bail!("💀 append #{the_number} failed (on purpose, the disk is pretend-full)");
        }
        the_events.push(SinkEvent::Appended(record.to_string()));
        Ok(())
    }

    /// 🗑️ Nothing to flush. We live in RAM. We just write it in the diary.
    async fn close(&mut self) -> Result<()> {
        self.events.lock().await.push(SinkEvent::Closed);
        Ok(())
    }
}

#[async_trait]
impl SinkOpener for InMemorySink {
    async fn open(&self) -> Result<Box<dyn Sink>> {
        if self.fail_on_open {
            bail!("💀 the pretend sink refused to open");
        }
        self.events.lock().await.push(SinkEvent::Opened);
        Ok(Box::new(self.clone()))
    }
}
