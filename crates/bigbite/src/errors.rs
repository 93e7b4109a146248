// ai
//! 💀 errors.rs — the many ways a run can end badly, typed and labelled.
//!
//! Everywhere else in bigbite we speak `anyhow` with a heavy `.context(...)`
//! accent. But the run result is the one value a caller actually `match`es on,
//! so it gets a proper enum. Each variant says which stage tripped and on what.
//!
//! 🧠 Knowledge graph:
//! - `Enumeration` / `Fetch` / `SinkWrite` are the run-fatal taxonomy
//! - `Split` never ends a run: it only shows up as a reason in the skip list
//! - `Cancelled` is somebody pulling the cord, `Crashed` is a task panicking
//! - Backends return `anyhow::Error`; it rides along as `source` so the full
//!   context chain survives all the way to the CLI's error printer 🦆

use std::fmt;

use thiserror::Error;

/// 🏭 Which stage of the pipeline we're talking about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Listing,
    Fetching,
    Aggregating,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let the_name = match self {
            Stage::Listing => "listing",
            Stage::Fetching => "fetching",
            Stage::Aggregating => "aggregating",
        };
        f.write_str(the_name)
    }
}

/// 💀 The first thing that went wrong in a run. There is only ever one.
#[derive(Debug, Error)]
pub enum RunError {
    /// 📡 The listing call failed, timed out, or handed back nonsense pagination.
    #[error("listing failed on page {page}")]
    Enumeration {
        page: usize,
        #[source]
        source: anyhow::Error,
    },

    /// 🪣 Fetching one object's content failed.
    #[error("fetching object '{key}' failed")]
    Fetch {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// 🧹 The object's content is not line-oriented text. Non-fatal: the object is skipped.
    #[error("object '{key}' could not be split into records")]
    Split {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// 🚪 The sink refused to open.
    #[error("opening the sink failed")]
    SinkOpen {
        #[source]
        source: anyhow::Error,
    },

    /// 📝 Appending record number `record_number` (1-based) failed.
    #[error("writing record #{record_number} (from '{origin}') to the sink failed")]
    SinkWrite {
        record_number: u64,
        origin: String,
        #[source]
        source: anyhow::Error,
    },

    /// 🚽 The final flush/close of the sink failed.
    #[error("closing the sink failed")]
    SinkClose {
        #[source]
        source: anyhow::Error,
    },

    /// 🛑 A cancellation handle fired.
    #[error("run cancelled while {stage}")]
    Cancelled { stage: Stage },

    /// 🔥 A stage task panicked or was torn down by the runtime.
    #[error("the {stage} stage crashed: {reason}")]
    Crashed { stage: Stage, reason: String },

    /// 🔧 The run configuration cannot possibly work.
    #[error("invalid run configuration: {0}")]
    InvalidConfig(String),
}

impl RunError {
    /// 🏭 The stage this failure belongs to, when there is one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            RunError::Enumeration { .. } => Some(Stage::Listing),
            RunError::Fetch { .. } | RunError::Split { .. } => Some(Stage::Fetching),
            RunError::SinkOpen { .. } | RunError::SinkWrite { .. } | RunError::SinkClose { .. } => {
                Some(Stage::Aggregating)
            }
            RunError::Cancelled { stage } | RunError::Crashed { stage, .. } => Some(*stage),
            RunError::InvalidConfig(_) => None,
        }
    }
}
