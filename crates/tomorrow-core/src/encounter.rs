//! The per-participant encounter state machine.
//!
//! ```text
//! AwaitingFirstVisit ──(reach the echo)──▶ TomorrowBranch ──(stand there long enough)──▶ Resolved
//!         │                                      │
//!         └──────(incapacitated / no levels)─────┴──────────────────────────────────────▶ Resolved
//! ```
//!
//! Phase state is persisted on the [`ActiveEvent`]; the short-lived
//! cooldowns and progress counters live in [`EncounterMachine`] only and are
//! lost on restart.

use std::collections::BTreeMap;

use rand::Rng;
use tomorrow_types::{
    ActiveEvent, Cue, EffectKind, EncounterRecord, FinalNote, GrantedItem, Note, Outcome,
    ParticipantId, ParticipantState, TimelineData,
};
use tracing::{debug, info};

use crate::artifact::grant_artifact;
use crate::context::TickContext;
use crate::environment::{Environment, MarkerSpawn};

/// Extra distance beyond the attack radius where the presence heartbeat plays.
pub const PRESENCE_BUFFER: u32 = 5;

/// Ticks between two presence heartbeats.
pub const PRESENCE_CUE_INTERVAL: u32 = 35;

/// A heartbeat cue plays every this many progress ticks in the tomorrow branch.
pub const PROGRESS_HEARTBEAT_EVERY: u32 = 20;

/// Duration of the status effects applied by a drain pulse.
pub const EFFECT_DURATION_TICKS: u32 = 80;

/// Probability that a drain pulse also applies nausea.
pub const NAUSEA_CHANCE: f64 = 0.45;

/// Transient per-participant counters. All start at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncounterCounters {
    /// Ticks until the echo may drain levels again.
    pub attack_cooldown: u32,
    /// Ticks until the next presence heartbeat.
    pub presence_cooldown: u32,
    /// Consecutive ticks spent at the echo point in the tomorrow branch.
    pub tomorrow_progress: u32,
    /// Ticks until the next tomorrow drain pulse.
    pub pulse_cooldown: u32,
}

/// The reward decision at the end of the tomorrow branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardDecision {
    /// The compass is granted.
    Granted,
    /// Fewer levels than required, regardless of the roll.
    NotEnoughLevels,
    /// Enough levels but the roll failed.
    Unlucky,
}

impl RewardDecision {
    /// Decide from a uniform `roll` in `[0, 1)`.
    pub const fn evaluate(roll: f64, chance: f64, levels: u32, required: u32) -> Self {
        if levels < required {
            Self::NotEnoughLevels
        } else if roll <= chance {
            Self::Granted
        } else {
            Self::Unlucky
        }
    }

    /// Whether the compass is granted.
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }

    const fn note(self, required: u32) -> FinalNote {
        match self {
            Self::Granted => FinalNote::Granted { price: required },
            Self::NotEnoughLevels => FinalNote::NotEnoughLevels { required },
            Self::Unlucky => FinalNote::Unlucky,
        }
    }
}

/// What happened to a participant's encounter this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncounterStep {
    /// No active encounter.
    Idle,
    /// The event's world is unavailable or the participant is elsewhere.
    Skipped,
    /// Phase one ran without resolving.
    FirstVisit,
    /// Phase one resolved this tick.
    FirstVisitResolved,
    /// Phase two is not yet unlocked or the participant is away from the point.
    AwaitingTomorrow,
    /// Phase two progressed.
    TomorrowProgress {
        /// Consecutive ticks at the point so far.
        progress: u32,
    },
    /// The encounter finalized this tick.
    Finalized(Outcome),
}

/// Drives every participant's active encounter.
#[derive(Debug, Default)]
pub struct EncounterMachine {
    counters: BTreeMap<ParticipantId, EncounterCounters>,
}

impl EncounterMachine {
    /// Create a machine with no transient state.
    pub const fn new() -> Self {
        Self {
            counters: BTreeMap::new(),
        }
    }

    /// Current counters for a participant (all zero if none).
    pub fn counters(&self, participant: ParticipantId) -> EncounterCounters {
        self.counters.get(&participant).copied().unwrap_or_default()
    }

    /// Drop all transient state for a participant.
    pub fn forget(&mut self, participant: ParticipantId) {
        self.counters.remove(&participant);
    }

    /// Advance the participant's active encounter by one tick.
    pub fn advance<E: Environment + ?Sized, R: Rng>(
        &mut self,
        ctx: &mut TickContext<'_, E, R>,
        participant: &ParticipantState,
    ) -> EncounterStep {
        let Some(mut data) = ctx.store.get(participant.id) else {
            return EncounterStep::Idle;
        };
        let Some(mut event) = data.active_event.take() else {
            return EncounterStep::Idle;
        };

        if participant.incapacitated {
            return self.finalize(ctx, participant, data, event, Outcome::PlayerDied, false);
        }
        if participant.levels == 0 {
            return self.finalize(ctx, participant, data, event, Outcome::NoLevelsEscape, false);
        }

        if !ctx.env.world_exists(&event.world_key) || participant.world_key != event.world_key {
            debug!(
                participant = %participant.name,
                event_world = %event.world_key,
                world = %participant.world_key,
                "Encounter world unavailable, skipping tick"
            );
            return EncounterStep::Skipped;
        }

        if event.first_visit_done {
            return self.tomorrow_branch(ctx, participant, data, event);
        }

        let (step, dirty) = self.first_visit(ctx, participant, &mut event);
        if dirty {
            data.active_event = Some(event);
            ctx.commit(participant.id, data);
        }
        step
    }

    /// Phase one. Returns the step and whether `event` changed.
    fn first_visit<E: Environment + ?Sized, R: Rng>(
        &mut self,
        ctx: &mut TickContext<'_, E, R>,
        participant: &ParticipantState,
        event: &mut ActiveEvent,
    ) -> (EncounterStep, bool) {
        let config = ctx.config;
        let cfg = &config.first_visit;
        let id = participant.id;

        let to_target = participant.position.distance_to(event.target().center());
        let spawned = to_target <= f64::from(cfg.spawn_radius) && ensure_marker(ctx, participant, event);

        let Some(marker_pos) = event.marker.and_then(|marker| ctx.env.resolve_marker(marker)) else {
            return (EncounterStep::FirstVisit, spawned);
        };
        let to_marker = participant.position.distance_to(marker_pos);
        let counters = self.counters.entry(id).or_default();

        if to_marker <= f64::from(cfg.vanish_radius) {
            if let Some(marker) = event.marker.take() {
                ctx.env.despawn_marker(marker);
            }
            event.complete_first_visit();
            counters.attack_cooldown = 0;
            counters.presence_cooldown = 0;

            ctx.env.play_cue(id, Cue::MarkerVanished);
            ctx.env
                .give_or_drop(id, GrantedItem::Note(Note::TomorrowWarning));
            info!(participant = %participant.name, day = ctx.today(), "Echo reached, first visit done");
            return (EncounterStep::FirstVisitResolved, true);
        }

        if to_marker <= f64::from(cfg.attack_radius.saturating_add(PRESENCE_BUFFER)) {
            if counters.presence_cooldown == 0 {
                ctx.env.play_cue(id, Cue::Heartbeat);
                counters.presence_cooldown = PRESENCE_CUE_INTERVAL;
            } else {
                counters.presence_cooldown = counters.presence_cooldown.saturating_sub(1);
            }
        } else {
            counters.presence_cooldown = 0;
        }

        if to_marker <= f64::from(cfg.attack_radius) {
            if counters.attack_cooldown == 0 {
                let loss = cfg.levels_per_hit.min(participant.levels);
                if loss > 0 {
                    ctx.env.remove_levels(id, loss);
                    ctx.env.play_cue(id, Cue::LevelsDrained);
                    debug!(participant = %participant.name, loss, "Echo drained levels");
                }
                counters.attack_cooldown = cfg.attack_cooldown_ticks;
            } else {
                counters.attack_cooldown = counters.attack_cooldown.saturating_sub(1);
            }
        } else {
            counters.attack_cooldown = 0;
        }

        (EncounterStep::FirstVisit, spawned)
    }

    /// Phase two.
    fn tomorrow_branch<E: Environment + ?Sized, R: Rng>(
        &mut self,
        ctx: &mut TickContext<'_, E, R>,
        participant: &ParticipantState,
        data: TimelineData,
        event: ActiveEvent,
    ) -> EncounterStep {
        let config = ctx.config;
        let cfg = &config.tomorrow;
        let id = participant.id;

        if ctx.today() < event.created_at_day.saturating_add(1) {
            return EncounterStep::AwaitingTomorrow;
        }

        let counters = self.counters.entry(id).or_default();
        let to_target = participant.position.distance_to(event.target().center());
        if to_target > f64::from(cfg.trigger_radius) {
            counters.tomorrow_progress = 0;
            counters.pulse_cooldown = 0;
            return EncounterStep::AwaitingTomorrow;
        }

        counters.tomorrow_progress = counters.tomorrow_progress.saturating_add(1);
        let progress = counters.tomorrow_progress;
        ctx.env.play_cue(id, Cue::Distortion);
        if progress.is_multiple_of(PROGRESS_HEARTBEAT_EVERY) {
            ctx.env.play_cue(id, Cue::Heartbeat);
        }

        let mut levels = participant.levels;
        if counters.pulse_cooldown == 0 {
            let loss = cfg.drain_per_pulse.min(levels);
            if loss > 0 {
                ctx.env.remove_levels(id, loss);
                ctx.env.play_cue(id, Cue::LevelsDrained);
                levels = levels.saturating_sub(loss);
            }
            ctx.env
                .apply_effect(id, EffectKind::Slowness, EFFECT_DURATION_TICKS);
            ctx.env
                .apply_effect(id, EffectKind::Weakness, EFFECT_DURATION_TICKS);
            if ctx.rng.random::<f64>() < NAUSEA_CHANCE {
                ctx.env
                    .apply_effect(id, EffectKind::Nausea, EFFECT_DURATION_TICKS);
            }
            counters.pulse_cooldown = cfg.pulse_ticks;
        } else {
            counters.pulse_cooldown = counters.pulse_cooldown.saturating_sub(1);
        }

        if progress < cfg.duration_ticks {
            return EncounterStep::TomorrowProgress { progress };
        }

        let reward = &config.artifact;
        let roll = ctx.rng.random::<f64>();
        let decision = RewardDecision::evaluate(roll, reward.reward_chance, levels, reward.required_levels);
        info!(
            participant = %participant.name,
            roll,
            levels,
            required = reward.required_levels,
            decision = ?decision,
            "Tomorrow branch complete"
        );

        if decision.is_granted() {
            if reward.required_levels > 0 {
                ctx.env.remove_levels(id, reward.required_levels);
            }
            grant_artifact(ctx, participant, &event);
        } else {
            ctx.env.play_cue(id, Cue::RewardDenied);
        }

        let ending = decision.note(reward.required_levels);
        ctx.env
            .give_or_drop(id, GrantedItem::Note(Note::AlreadyHere { ending }));
        ctx.env.play_cue(id, Cue::Departure);

        let outcome = if decision.is_granted() {
            Outcome::TomorrowBranchCompass
        } else {
            Outcome::TomorrowBranchNoCompass
        };
        self.finalize(ctx, participant, data, event, outcome, decision.is_granted())
    }

    /// Close the encounter: record history, bump the count, clean up.
    ///
    /// `data.active_event` must already be taken out.
    fn finalize<E: Environment + ?Sized, R: Rng>(
        &mut self,
        ctx: &mut TickContext<'_, E, R>,
        participant: &ParticipantState,
        mut data: TimelineData,
        mut event: ActiveEvent,
        outcome: Outcome,
        artifact_granted: bool,
    ) -> EncounterStep {
        event.resolve(outcome);

        let resolved_day = ctx.today();
        data.history.push(EncounterRecord {
            world_key: event.world_key.clone(),
            x: event.target_x,
            y: event.target_y,
            z: event.target_z,
            created_day: event.created_at_day,
            resolved_day,
            outcome: event.resolved_outcome,
            artifact_granted,
        });
        data.completed_encounters = data.completed_encounters.saturating_add(1);
        data.active_event = None;
        self.forget(participant.id);

        if let Some(marker) = event.marker.take()
            && ctx.env.resolve_marker(marker).is_some()
        {
            ctx.env.despawn_marker(marker);
        }

        info!(
            participant = %participant.name,
            outcome = %event.resolved_outcome,
            completed = data.completed_encounters,
            created_day = event.created_at_day,
            resolved_day,
            "Encounter finalized"
        );
        ctx.commit(participant.id, data);
        EncounterStep::Finalized(event.resolved_outcome)
    }
}

/// Spawn the echo if none is alive. Returns whether a new one was placed.
fn ensure_marker<E: Environment + ?Sized, R: Rng>(
    ctx: &mut TickContext<'_, E, R>,
    participant: &ParticipantState,
    event: &mut ActiveEvent,
) -> bool {
    if event
        .marker
        .is_some_and(|marker| ctx.env.resolve_marker(marker).is_some())
    {
        return false;
    }

    let request = MarkerSpawn {
        world_key: event.world_key.clone(),
        cell: event.target(),
        display_name: format!("{} (Echo)", event.participant_name),
        equipment: event.snapshot.clone(),
    };
    let Some(marker) = ctx.env.spawn_marker(&request) else {
        debug!(participant = %participant.name, target = %request.cell, "Echo spawn refused, retrying next tick");
        return false;
    };

    event.marker = Some(marker);
    ctx.env.play_cue(participant.id, Cue::MarkerArrived);
    info!(participant = %participant.name, marker = %marker, target = %request.cell, "Echo spawned");
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use tomorrow_db::TimelineStore;
    use tomorrow_types::{BlockPos, EquipmentSnapshot};

    use super::*;
    use crate::artifact::find_owned_artifact;
    use crate::config::TomorrowConfig;
    use crate::testkit::{FakeEnvironment, OVERWORLD};

    const TARGET: BlockPos = BlockPos::new(100, 64, 0);

    struct Harness {
        config: TomorrowConfig,
        store: TimelineStore,
        env: FakeEnvironment,
        rng: SmallRng,
        machine: EncounterMachine,
    }

    impl Harness {
        fn new(config: TomorrowConfig) -> Self {
            Self {
                config: config.sanitized(),
                store: TimelineStore::ephemeral(),
                env: FakeEnvironment::new(),
                rng: SmallRng::seed_from_u64(21),
                machine: EncounterMachine::new(),
            }
        }

        /// Add a participant with an encounter targeting [`TARGET`], created on day 0.
        fn start(&mut self, levels: u32, first_visit_done: bool) -> ParticipantId {
            let mut alice = self.env.add_participant("Alice");
            alice.levels = levels;
            self.env.update(&alice);

            let event = ActiveEvent {
                world_key: OVERWORLD.to_owned(),
                target_x: TARGET.x,
                target_y: TARGET.y,
                target_z: TARGET.z,
                created_at_time: 0,
                created_at_day: 0,
                participant_name: "Alice".to_owned(),
                snapshot: EquipmentSnapshot::default(),
                first_visit_done,
                tomorrow_branch_resolved: false,
                resolved_outcome: if first_visit_done {
                    Outcome::FirstVisitDone
                } else {
                    Outcome::Pending
                },
                marker: None,
            };
            let data = TimelineData {
                completed_encounters: 0,
                last_trigger_time: Some(0),
                active_event: Some(event),
                history: Vec::new(),
            };
            self.store.commit(alice.id, data).unwrap();
            alice.id
        }

        fn step(&mut self, id: ParticipantId) -> EncounterStep {
            let participant = self.env.participant(id).unwrap();
            let mut ctx = TickContext {
                now: self.env.time,
                config: &self.config,
                store: &self.store,
                env: &mut self.env,
                rng: &mut self.rng,
            };
            let step = self.machine.advance(&mut ctx, &participant);
            self.env.time += 1;
            step
        }

        fn stand(&mut self, id: ParticipantId, dx: i32) {
            self.env
                .move_to(id, BlockPos::new(TARGET.x + dx, TARGET.y, TARGET.z))
                .unwrap();
        }

        fn event(&self, id: ParticipantId) -> Option<ActiveEvent> {
            self.store.get(id).and_then(|data| data.active_event)
        }
    }

    fn short_branch() -> TomorrowConfig {
        let mut config = TomorrowConfig::default();
        config.tomorrow.duration_ticks = 40;
        config
    }

    #[test]
    fn reward_boundary() {
        assert_eq!(RewardDecision::evaluate(0.0, 1.0, 10, 10), RewardDecision::Granted);
        assert_eq!(
            RewardDecision::evaluate(0.0, 1.0, 9, 10),
            RewardDecision::NotEnoughLevels
        );
        assert_eq!(RewardDecision::evaluate(0.5, 0.5, 10, 10), RewardDecision::Granted);
        assert_eq!(RewardDecision::evaluate(0.51, 0.5, 10, 10), RewardDecision::Unlucky);
        assert_eq!(RewardDecision::evaluate(0.0, 0.0, 0, 0), RewardDecision::Granted);
        assert_eq!(
            RewardDecision::evaluate(0.99, 0.0, 3, 10),
            RewardDecision::NotEnoughLevels
        );
    }

    #[test]
    fn far_away_nothing_happens() {
        let mut h = Harness::new(TomorrowConfig::default());
        let id = h.start(30, false);
        assert_eq!(h.step(id), EncounterStep::FirstVisit);
        assert!(h.env.spawn_requests.is_empty());
        assert_eq!(h.event(id).unwrap().marker, None);
    }

    #[test]
    fn approach_spawns_echo_then_vanishes_on_contact() {
        let mut h = Harness::new(TomorrowConfig::default());
        let id = h.start(30, false);

        h.stand(id, 20);
        assert_eq!(h.step(id), EncounterStep::FirstVisit);
        let marker = h.event(id).unwrap().marker.unwrap();
        assert!(h.env.markers.contains_key(&marker));
        let request = h.env.spawn_requests.first().unwrap();
        assert_eq!(request.display_name, "Alice (Echo)");
        assert_eq!(request.cell, TARGET);
        assert_eq!(h.env.count_cue(id, Cue::MarkerArrived), 1);

        assert_eq!(h.step(id), EncounterStep::FirstVisit);
        assert_eq!(h.env.spawn_requests.len(), 1);

        h.stand(id, 2);
        assert_eq!(h.step(id), EncounterStep::FirstVisitResolved);
        let event = h.event(id).unwrap();
        assert!(event.first_visit_done);
        assert_eq!(event.marker, None);
        assert_eq!(event.resolved_outcome, Outcome::FirstVisitDone);
        assert!(h.env.markers.is_empty());
        assert_eq!(h.env.notes_for(id), vec![Note::TomorrowWarning]);
        assert_eq!(h.env.count_cue(id, Cue::MarkerVanished), 1);
        assert_eq!(h.machine.counters(id), EncounterCounters::default());
    }

    #[test]
    fn refused_spawn_is_retried() {
        let mut h = Harness::new(TomorrowConfig::default());
        let id = h.start(30, false);
        h.stand(id, 20);

        h.env.refuse_spawns = true;
        h.step(id);
        h.step(id);
        assert_eq!(h.event(id).unwrap().marker, None);
        assert_eq!(h.env.spawn_requests.len(), 2);

        h.env.refuse_spawns = false;
        h.step(id);
        assert!(h.event(id).unwrap().marker.is_some());
        assert_eq!(h.env.spawn_requests.len(), 3);
    }

    #[test]
    fn lost_marker_is_replaced() {
        let mut h = Harness::new(TomorrowConfig::default());
        let id = h.start(30, false);
        h.stand(id, 20);
        h.step(id);
        let first = h.event(id).unwrap().marker.unwrap();

        h.env.markers.clear();
        h.step(id);
        let second = h.event(id).unwrap().marker.unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn echo_drains_levels_on_cooldown_and_counters_reset_on_leaving() {
        let mut h = Harness::new(TomorrowConfig::default());
        let id = h.start(30, false);
        h.stand(id, 20);
        h.step(id);

        h.stand(id, 10);
        h.step(id);
        assert_eq!(h.env.levels(id), 29);
        assert_eq!(h.env.count_cue(id, Cue::Heartbeat), 1);
        assert_eq!(h.machine.counters(id).attack_cooldown, 30);

        for _ in 0..30 {
            h.step(id);
        }
        assert_eq!(h.env.levels(id), 29);
        h.step(id);
        assert_eq!(h.env.levels(id), 28);
        assert_eq!(h.env.count_cue(id, Cue::Heartbeat), 1);

        h.stand(id, 30);
        h.step(id);
        assert_eq!(h.machine.counters(id), EncounterCounters::default());
    }

    #[test]
    fn presence_heartbeat_without_attack() {
        let mut h = Harness::new(TomorrowConfig::default());
        let id = h.start(30, false);
        h.stand(id, 15);
        for _ in 0..37 {
            h.step(id);
        }
        assert_eq!(h.env.count_cue(id, Cue::Heartbeat), 2);
        assert_eq!(h.env.levels(id), 30);
    }

    #[test]
    fn incapacitated_participant_finalizes_as_died() {
        let mut h = Harness::new(TomorrowConfig::default());
        let id = h.start(30, false);
        h.stand(id, 20);
        h.step(id);
        let marker = h.event(id).unwrap().marker.unwrap();

        let mut alice = h.env.participant(id).unwrap();
        alice.incapacitated = true;
        h.env.update(&alice);
        assert_eq!(h.step(id), EncounterStep::Finalized(Outcome::PlayerDied));

        let data = h.store.get(id).unwrap();
        assert!(data.active_event.is_none());
        assert_eq!(data.completed_encounters, 1);
        let record = data.history.first().unwrap();
        assert_eq!(record.outcome, Outcome::PlayerDied);
        assert!(!record.artifact_granted);
        assert_eq!((record.x, record.y, record.z), (TARGET.x, TARGET.y, TARGET.z));
        assert!(h.env.despawned.contains(&marker));
        assert!(h.env.markers.is_empty());

        assert_eq!(h.step(id), EncounterStep::Idle);
        assert_eq!(h.store.get(id).unwrap().completed_encounters, 1);
    }

    #[test]
    fn no_levels_finalizes_as_escape() {
        let mut h = Harness::new(TomorrowConfig::default());
        let id = h.start(0, true);
        assert_eq!(h.step(id), EncounterStep::Finalized(Outcome::NoLevelsEscape));
        assert_eq!(h.store.get(id).unwrap().history.len(), 1);
    }

    #[test]
    fn unavailable_world_skips_without_change() {
        let mut h = Harness::new(TomorrowConfig::default());
        let id = h.start(30, false);
        h.stand(id, 2);
        let before = h.store.get(id).unwrap();

        h.env.worlds.clear();
        assert_eq!(h.step(id), EncounterStep::Skipped);

        h.env.worlds.insert(OVERWORLD.to_owned());
        let mut alice = h.env.participant(id).unwrap();
        alice.world_key = "nether".to_owned();
        h.env.update(&alice);
        assert_eq!(h.step(id), EncounterStep::Skipped);

        assert_eq!(h.store.get(id).unwrap(), before);
        assert!(h.env.spawn_requests.is_empty());
    }

    #[test]
    fn tomorrow_branch_waits_for_next_day() {
        let mut h = Harness::new(short_branch());
        let id = h.start(30, true);
        h.stand(id, 0);
        h.env.time = 23_990;
        for _ in 0..10 {
            assert_eq!(h.step(id), EncounterStep::AwaitingTomorrow);
        }
        assert_eq!(h.step(id), EncounterStep::TomorrowProgress { progress: 1 });
    }

    #[test]
    fn tomorrow_branch_grants_compass_after_full_duration() {
        let mut h = Harness::new(short_branch());
        let id = h.start(30, true);
        h.stand(id, 1);
        h.env.time = 24_000;

        for tick in 1..40 {
            assert_eq!(h.step(id), EncounterStep::TomorrowProgress { progress: tick });
            assert!(h.store.get(id).unwrap().history.is_empty());
        }
        assert_eq!(
            h.step(id),
            EncounterStep::Finalized(Outcome::TomorrowBranchCompass)
        );

        // Two pulses (progress 1 and 22) then the price.
        assert_eq!(h.env.levels(id), 30 - 2 - 10);
        let data = h.store.get(id).unwrap();
        assert_eq!(data.completed_encounters, 1);
        assert!(data.active_event.is_none());
        let record = data.history.first().unwrap();
        assert!(record.artifact_granted);
        assert_eq!(record.created_day, 0);
        assert_eq!(record.resolved_day, 1);

        let (_, compass) = find_owned_artifact(&h.env, id).unwrap();
        assert_eq!(compass.target.pos, TARGET);
        assert_eq!(
            h.env.notes_for(id),
            vec![Note::AlreadyHere {
                ending: FinalNote::Granted { price: 10 }
            }]
        );
        assert_eq!(h.env.count_cue(id, Cue::Departure), 1);
        assert_eq!(h.env.count_cue(id, Cue::Distortion), 40);
        assert_eq!(h.env.count_cue(id, Cue::Heartbeat), 2);

        let slowness = h
            .env
            .effects
            .iter()
            .filter(|(_, effect, ticks)| *effect == EffectKind::Slowness && *ticks == EFFECT_DURATION_TICKS)
            .count();
        assert_eq!(slowness, 2);
    }

    #[test]
    fn tomorrow_branch_level_boundary() {
        // 12 levels, minus two pulses, leaves exactly the 10 required.
        let mut h = Harness::new(short_branch());
        let id = h.start(12, true);
        h.stand(id, 0);
        h.env.time = 24_000;
        let last = (0..40).map(|_| h.step(id)).last().unwrap();
        assert_eq!(last, EncounterStep::Finalized(Outcome::TomorrowBranchCompass));
        assert_eq!(h.env.levels(id), 0);

        // One fewer and the reward is refused.
        let mut h = Harness::new(short_branch());
        let id = h.start(11, true);
        h.stand(id, 0);
        h.env.time = 24_000;
        let last = (0..40).map(|_| h.step(id)).last().unwrap();
        assert_eq!(last, EncounterStep::Finalized(Outcome::TomorrowBranchNoCompass));
        assert_eq!(h.env.levels(id), 9);
        assert!(find_owned_artifact(&h.env, id).is_none());
        assert_eq!(
            h.env.notes_for(id),
            vec![Note::AlreadyHere {
                ending: FinalNote::NotEnoughLevels { required: 10 }
            }]
        );
        assert_eq!(h.env.count_cue(id, Cue::RewardDenied), 1);
        assert!(!h.store.get(id).unwrap().history.first().unwrap().artifact_granted);
    }

    #[test]
    fn failed_roll_is_unlucky() {
        let mut config = short_branch();
        config.artifact.reward_chance = 0.0;
        let mut h = Harness::new(config);
        let id = h.start(30, true);
        h.stand(id, 0);
        h.env.time = 24_000;
        let last = (0..40).map(|_| h.step(id)).last().unwrap();
        assert_eq!(last, EncounterStep::Finalized(Outcome::TomorrowBranchNoCompass));
        assert_eq!(
            h.env.notes_for(id),
            vec![Note::AlreadyHere {
                ending: FinalNote::Unlucky
            }]
        );
        assert_eq!(h.env.levels(id), 28);
    }

    #[test]
    fn leaving_the_point_resets_progress() {
        let mut h = Harness::new(short_branch());
        let id = h.start(30, true);
        h.stand(id, 0);
        h.env.time = 24_000;
        for _ in 0..25 {
            h.step(id);
        }
        assert_eq!(h.machine.counters(id).tomorrow_progress, 25);

        h.stand(id, 10);
        assert_eq!(h.step(id), EncounterStep::AwaitingTomorrow);
        assert_eq!(h.machine.counters(id), EncounterCounters::default());

        h.stand(id, 0);
        assert_eq!(h.step(id), EncounterStep::TomorrowProgress { progress: 1 });
    }
}
