//! The per-tick entry point.
//!
//! The host calls [`TomorrowRuntime::run_tick`] once per server tick. For
//! every present participant, in order:
//!
//! 1. **Trigger**: wake edge detection and encounter creation.
//! 2. **Encounter**: advance the active encounter, if any.
//! 3. **Artifact**: step the participant's echo compass, if they hold one.

use std::sync::Arc;

use rand::Rng;
use tomorrow_db::TimelineStore;
use tomorrow_types::{Outcome, ParticipantId};
use tracing::{debug, info};

use crate::artifact::{ArtifactTick, tick_artifact};
use crate::config::TomorrowConfig;
use crate::context::TickContext;
use crate::encounter::{EncounterMachine, EncounterStep};
use crate::environment::Environment;
use crate::trigger::{TriggerEngine, TriggerOutcome};

/// What happened during one tick, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Game time of the tick.
    pub time: u64,
    /// Participants that were processed.
    pub participants: u32,
    /// Participants the host listed but could not describe.
    pub missing: u32,
    /// Encounters started.
    pub triggered: Vec<ParticipantId>,
    /// First visits resolved.
    pub first_visits: Vec<ParticipantId>,
    /// Encounters finalized, with their outcome.
    pub finalized: Vec<(ParticipantId, Outcome)>,
    /// Participants skipped because their encounter world was unavailable.
    pub skipped: Vec<ParticipantId>,
    /// Compasses that calibrated.
    pub calibrated: Vec<ParticipantId>,
}

impl TickSummary {
    /// Whether anything beyond routine progress happened.
    pub fn is_notable(&self) -> bool {
        !(self.triggered.is_empty()
            && self.first_visits.is_empty()
            && self.finalized.is_empty()
            && self.calibrated.is_empty())
    }
}

/// Owns the components and their transient state.
pub struct TomorrowRuntime<R: Rng> {
    config: TomorrowConfig,
    store: Arc<TimelineStore>,
    trigger: TriggerEngine,
    encounters: EncounterMachine,
    rng: R,
}

impl<R: Rng> TomorrowRuntime<R> {
    /// Build a runtime. The configuration is sanitized here.
    pub fn new(config: TomorrowConfig, store: Arc<TimelineStore>, rng: R) -> Self {
        Self {
            config: config.sanitized(),
            store,
            trigger: TriggerEngine::new(),
            encounters: EncounterMachine::new(),
            rng,
        }
    }

    /// The sanitized configuration in effect.
    pub const fn config(&self) -> &TomorrowConfig {
        &self.config
    }

    /// The shared timeline store.
    pub const fn store(&self) -> &Arc<TimelineStore> {
        &self.store
    }

    /// The encounter machine, for inspecting transient counters.
    pub const fn encounters(&self) -> &EncounterMachine {
        &self.encounters
    }

    /// Process one tick for every participant.
    pub fn run_tick<E: Environment + ?Sized>(&mut self, env: &mut E) -> TickSummary {
        let Self {
            config,
            store,
            trigger,
            encounters,
            rng,
        } = self;

        let now = env.current_time();
        let mut summary = TickSummary {
            time: now,
            ..TickSummary::default()
        };

        for id in env.participants() {
            let Some(participant) = env.participant(id) else {
                debug!(participant = %id, "Participant vanished before processing");
                summary.missing = summary.missing.saturating_add(1);
                continue;
            };
            summary.participants = summary.participants.saturating_add(1);

            let mut ctx = TickContext {
                now,
                config: &*config,
                store: store.as_ref(),
                env: &mut *env,
                rng: &mut *rng,
            };

            if matches!(
                trigger.observe(&mut ctx, &participant),
                TriggerOutcome::Triggered(_)
            ) {
                summary.triggered.push(id);
            }

            match encounters.advance(&mut ctx, &participant) {
                EncounterStep::FirstVisitResolved => summary.first_visits.push(id),
                EncounterStep::Finalized(outcome) => summary.finalized.push((id, outcome)),
                EncounterStep::Skipped => summary.skipped.push(id),
                EncounterStep::Idle
                | EncounterStep::FirstVisit
                | EncounterStep::AwaitingTomorrow
                | EncounterStep::TomorrowProgress { .. } => {}
            }

            if tick_artifact(&mut ctx, &participant) == ArtifactTick::Calibrated {
                summary.calibrated.push(id);
            }
        }

        if summary.is_notable() {
            info!(
                time = now,
                triggered = summary.triggered.len(),
                first_visits = summary.first_visits.len(),
                finalized = summary.finalized.len(),
                calibrated = summary.calibrated.len(),
                "Tick summary"
            );
        }
        summary
    }
}
