//! 🥇 The first failure of a run, kept. Every later one, logged and let go.

use std::sync::OnceLock;

use tracing::{debug, warn};

use crate::errors::RunError;

/// 🥇 A write-once slot. The first stage to report a failure owns the run's outcome.
#[derive(Debug, Default)]
pub(crate) struct FailureSlot {
    first: OnceLock<RunError>,
}

impl FailureSlot {
    /// 📮 Report a failure. Returns `true` if this one got there first.
    pub(crate) fn record(&self, failure: RunError) -> bool {
        let the_message = format!("{failure}");
        match self.first.set(failure) {
            Ok(()) => {
                warn!("💀 first failure, the run ends with it: {the_message}");
                true
            }
            Err(late @ RunError::Cancelled { .. }) => {
                // -- 🛑 every worker notices the same cord; once is plenty
                debug!("🥈 also noticed: {late}");
                false
            }
            Err(late) => {
                warn!("🥈 also failed, after the first failure (discarded): {late}");
                false
            }
        }
    }

    pub(crate) fn into_first(self) -> Option<RunError> {
        self.first.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Stage;

    #[test]
    fn the_one_where_second_place_gets_nothing() {
        let the_slot = FailureSlot::default();
        assert!(the_slot.record(RunError::Cancelled {
            stage: Stage::Fetching
        }));
        assert!(!the_slot.record(RunError::InvalidConfig("late".into())));
        assert!(matches!(
            the_slot.into_first(),
            Some(RunError::Cancelled {
                stage: Stage::Fetching
            })
        ));
    }
}
