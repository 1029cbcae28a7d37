//! Wake-up detection and encounter creation.
//!
//! The engine remembers each participant's sleeping flag from the previous
//! tick (in memory only). A participant who was asleep and is now awake may
//! start an encounter, subject to the gates below, evaluated in order:
//!
//! 1. no encounter already active, and fewer finalized encounters than the
//!    configured maximum;
//! 2. the trigger cooldown has elapsed since the last trigger;
//! 3. the wake roll succeeds.
//!
//! With `debug.force_event` every awake tick is an edge, and gates 2 and 3
//! are skipped. Gate 1 always applies.

use std::collections::BTreeMap;

use rand::Rng;
use tomorrow_types::{
    ActiveEvent, BlockPos, Cue, GrantedItem, Note, Outcome, ParticipantId, ParticipantState,
};
use tracing::info;

use crate::context::TickContext;
use crate::environment::Environment;
use crate::target::generate_target;

/// Log a gate decision at `info` when verbose logging is on, else at `debug`.
macro_rules! gate_log {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            ::tracing::info!($($arg)+);
        } else {
            ::tracing::debug!($($arg)+);
        }
    };
}

/// Why a wake edge did not start an encounter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    /// An encounter is already running.
    ActiveEvent,
    /// The participant has used up their encounters.
    MaxEncounters {
        /// Finalized encounters so far.
        completed: u32,
    },
    /// The last trigger was too recent.
    Cooldown {
        /// Ticks until the cooldown expires.
        remaining: u64,
    },
    /// The wake roll failed.
    RollFailed {
        /// The roll that was drawn.
        roll: f64,
    },
}

/// Result of observing one participant for one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
    /// Not a qualifying wake edge.
    NoEdge,
    /// A wake edge that failed a gate.
    Rejected(Rejection),
    /// A new encounter was created with this target cell.
    Triggered(BlockPos),
}

/// Tracks sleep transitions and creates encounters.
#[derive(Debug, Default)]
pub struct TriggerEngine {
    was_sleeping: BTreeMap<ParticipantId, bool>,
}

impl TriggerEngine {
    /// Create an engine with no remembered sleep state.
    pub const fn new() -> Self {
        Self {
            was_sleeping: BTreeMap::new(),
        }
    }

    /// Observe one participant for this tick.
    pub fn observe<E: Environment + ?Sized, R: Rng>(
        &mut self,
        ctx: &mut TickContext<'_, E, R>,
        participant: &ParticipantState,
    ) -> TriggerOutcome {
        let was_sleeping = self
            .was_sleeping
            .insert(participant.id, participant.sleeping)
            .unwrap_or(false);

        let force = ctx.config.debug.force_event;
        let edge = if force {
            !participant.sleeping
        } else {
            was_sleeping && !participant.sleeping
        };
        if !edge {
            return TriggerOutcome::NoEdge;
        }

        match Self::evaluate_gates(ctx, participant, force) {
            Ok(()) => TriggerOutcome::Triggered(Self::start_encounter(ctx, participant)),
            Err(rejection) => TriggerOutcome::Rejected(rejection),
        }
    }

    fn evaluate_gates<E: Environment + ?Sized, R: Rng>(
        ctx: &mut TickContext<'_, E, R>,
        participant: &ParticipantState,
        force: bool,
    ) -> Result<(), Rejection> {
        let verbose = ctx.verbose();
        let data = ctx.store.get_or_create(participant.id);

        if data.active_event.is_some() {
            gate_log!(verbose, participant = %participant.name, "Wake ignored, encounter already active");
            return Err(Rejection::ActiveEvent);
        }

        let max = ctx.config.trigger.max_encounters_per_participant;
        if data.completed_encounters >= max {
            gate_log!(
                verbose,
                participant = %participant.name,
                completed = data.completed_encounters,
                max,
                "Wake ignored, encounter limit reached"
            );
            return Err(Rejection::MaxEncounters {
                completed: data.completed_encounters,
            });
        }

        if force {
            gate_log!(verbose, participant = %participant.name, "Force mode, skipping cooldown and roll");
            return Ok(());
        }

        if let Some(last) = data.last_trigger_time {
            let elapsed = ctx.now.saturating_sub(last);
            let cooldown = ctx.config.cooldown_ticks();
            if elapsed < cooldown {
                let remaining = cooldown.saturating_sub(elapsed);
                gate_log!(verbose, participant = %participant.name, remaining, "Wake ignored, cooldown active");
                return Err(Rejection::Cooldown { remaining });
            }
        }

        let roll = ctx.rng.random::<f64>();
        let chance = ctx.config.trigger.wake_event_chance;
        if roll > chance {
            gate_log!(verbose, participant = %participant.name, roll, chance, "Wake roll failed");
            return Err(Rejection::RollFailed { roll });
        }

        gate_log!(verbose, participant = %participant.name, roll, chance, "Wake roll passed");
        Ok(())
    }

    fn start_encounter<E: Environment + ?Sized, R: Rng>(
        ctx: &mut TickContext<'_, E, R>,
        participant: &ParticipantState,
    ) -> BlockPos {
        let origin = participant.position.block();
        let config = ctx.config;
        let range = &config.target;
        let planar = generate_target(origin, range.min_distance, range.max_distance, ctx.rng);
        let height = ctx
            .env
            .terrain_height(&participant.world_key, planar.x, planar.z);
        let target = planar.with_height(height);

        let mut snapshot = participant.equipment.clone();
        snapshot.inventory.retain(|entry| entry.count > 0);

        let event = ActiveEvent {
            world_key: participant.world_key.clone(),
            target_x: target.x,
            target_y: target.y,
            target_z: target.z,
            created_at_time: ctx.now,
            created_at_day: ctx.today(),
            participant_name: participant.name.clone(),
            snapshot,
            first_visit_done: false,
            tomorrow_branch_resolved: false,
            resolved_outcome: Outcome::Pending,
            marker: None,
        };

        let mut data = ctx.store.get_or_create(participant.id);
        data.active_event = Some(event);
        data.last_trigger_time = Some(ctx.now);
        ctx.commit(participant.id, data);

        ctx.env.give_or_drop(
            participant.id,
            GrantedItem::Note(Note::Coordinates { target }),
        );
        ctx.env.play_cue(participant.id, Cue::TriggerConfirm);

        info!(
            participant = %participant.name,
            world = %participant.world_key,
            target = %target,
            day = ctx.today(),
            "Encounter triggered"
        );
        target
    }
}
