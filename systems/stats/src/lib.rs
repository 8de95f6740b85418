#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure observer that maintains the casualty, damage and rescue counters.

use rescue_replay_core::{ReplayEvent, StatsSnapshot};

/// Tracks running counters from events the replay engine applied successfully.
#[derive(Debug, Default)]
pub struct StatsTracker {
    current: StatsSnapshot,
}

impl StatsTracker {
    /// Creates a tracker with every counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest counter values.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        self.current
    }

    /// Consumes applied events and publishes a snapshot whenever a counter changed.
    ///
    /// Only events that were applied to the board may be passed in; skipped
    /// events must never reach the tracker. At most one snapshot is pushed per
    /// call, reflecting every event of the batch.
    pub fn handle(&mut self, applied: &[ReplayEvent], out: &mut Vec<StatsSnapshot>) {
        let before = self.current;

        for event in applied {
            match event {
                ReplayEvent::PortraitLost { .. } => {
                    self.current.casualties = self.current.casualties.saturating_add(1);
                }
                ReplayEvent::PortraitRescued { .. } => {
                    self.current.saved = self.current.saved.saturating_add(1);
                }
                ReplayEvent::WallDamaged {
                    damage: Some(total),
                    ..
                }
                | ReplayEvent::WallDestroyed {
                    damage: Some(total),
                    ..
                } => {
                    self.current.damage = *total;
                }
                _ => {}
            }
        }

        if self.current != before {
            out.push(self.current);
        }
    }
}
