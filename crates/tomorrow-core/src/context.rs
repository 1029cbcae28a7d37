//! Per-tick borrow bundle handed to each component.

use rand::Rng;
use tomorrow_db::TimelineStore;
use tomorrow_types::{ParticipantId, TimelineData};
use tracing::warn;

use crate::config::TomorrowConfig;
use crate::environment::Environment;
use crate::target::day_index;

/// Everything a component may touch while processing one participant.
pub struct TickContext<'a, E: Environment + ?Sized, R: Rng> {
    /// Game time of this tick.
    pub now: u64,
    /// Sanitized configuration.
    pub config: &'a TomorrowConfig,
    /// Durable timeline store.
    pub store: &'a TimelineStore,
    /// Host world.
    pub env: &'a mut E,
    /// Randomness source.
    pub rng: &'a mut R,
}

impl<E: Environment + ?Sized, R: Rng> TickContext<'_, E, R> {
    /// Day index of this tick.
    pub const fn today(&self) -> u64 {
        day_index(self.now, self.config.time.ticks_per_day)
    }

    /// Write a participant's timeline through to disk.
    ///
    /// A failed write keeps the in-memory value; the next successful save
    /// reconciles the file.
    pub fn commit(&self, participant: ParticipantId, data: TimelineData) {
        if let Err(e) = self.store.commit(participant, data) {
            warn!(participant = %participant, error = %e, "Failed to persist timeline, keeping in memory");
        }
    }

    /// Whether gate diagnostics are promoted to `info`.
    pub const fn verbose(&self) -> bool {
        self.config.debug.verbose_logs
    }
}
