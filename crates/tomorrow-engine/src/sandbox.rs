//! A scripted stand-in for a game server.
//!
//! Residents sleep through the last quarter of every day and react to the
//! notes the core hands them: coordinates send them walking to the echo
//! point, the warning makes them wait for the next day, and the next day
//! they walk back and stand there until the encounter resolves. Everything
//! else the core asks for (cues, effects, compass pointers) is logged.

use std::collections::BTreeMap;

use tomorrow_core::{Environment, ItemSlot, MarkerSpawn};
use tomorrow_types::{
    ArtifactDisplay, BlockPos, Cue, EffectKind, EquipmentSnapshot, GlobalPos, GrantedItem,
    InventoryEntry, ItemStackSnapshot, MarkerId, Note, ParticipantId, ParticipantState, Position,
    TagMap, TimelineData,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::runner::SimulatedWorld;

/// The only world in the sandbox.
pub const SANDBOX_WORLD: &str = "overworld";

/// Blocks walked per awake tick.
const WALK_SPEED: f64 = 0.6;

/// Spacing between residents' starting points along the x axis.
const HOME_SPACING: i32 = 50;

const STARTING_LEVELS: u32 = 30;

/// High half of every resident id; the low half is the resident's index.
/// Ids stay the same across restarts so stored timelines are picked up again.
const RESIDENT_ID_PREFIX: u64 = 0x746f_6d6f_7272_6f77;

/// What a resident is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    /// Nothing to do.
    Idle,
    /// Walking to the coordinates from a note.
    Visit(BlockPos),
    /// Warned off; waiting for the day after `day`.
    AwaitTomorrow {
        /// The echo point.
        target: BlockPos,
        /// Day the warning was received.
        day: u64,
    },
    /// Walking back to (and standing at) the echo point.
    Return(BlockPos),
}

#[derive(Debug)]
struct Resident {
    state: ParticipantState,
    plan: Plan,
    compasses: Vec<TagMap>,
    pointer: Option<GlobalPos>,
}

/// In-memory world driven one tick at a time.
#[derive(Debug)]
pub struct SandboxWorld {
    time: u64,
    ticks_per_day: u64,
    residents: BTreeMap<ParticipantId, Resident>,
    markers: BTreeMap<MarkerId, Position>,
}

impl SandboxWorld {
    /// Create a world with one resident per name, starting at nightfall of
    /// day 0 so everyone wakes up on day 1.
    pub fn new(ticks_per_day: u64, names: &[String]) -> Self {
        let ticks_per_day = ticks_per_day.max(4);
        let mut world = Self {
            time: night_start(ticks_per_day),
            ticks_per_day,
            residents: BTreeMap::new(),
            markers: BTreeMap::new(),
        };
        let mut home_x: i32 = 0;
        for (index, name) in (0_u64..).zip(names) {
            world.add_resident(index, name, home_x);
            home_x = home_x.saturating_add(HOME_SPACING);
        }
        world
    }

    fn add_resident(&mut self, index: u64, name: &str, home_x: i32) {
        let id = ParticipantId::from(Uuid::from_u64_pair(RESIDENT_ID_PREFIX, index));
        let y = self.terrain_height(SANDBOX_WORLD, home_x, 0);
        let state = ParticipantState {
            id,
            name: name.to_owned(),
            world_key: SANDBOX_WORLD.to_owned(),
            position: BlockPos::new(home_x, y, 0).center(),
            sleeping: self.is_night(),
            incapacitated: false,
            levels: STARTING_LEVELS,
            equipment: starter_kit(),
        };
        self.residents.insert(
            id,
            Resident {
                state,
                plan: Plan::Idle,
                compasses: Vec::new(),
                pointer: None,
            },
        );
        info!(resident = name, id = %id, "Resident joined");
    }

    /// Pick up where a previous session left off.
    ///
    /// The clock moves forward to the latest stored trigger so day arithmetic
    /// and cooldowns stay consistent, and every resident with an open
    /// encounter heads back to its echo point.
    pub fn resume(&mut self, timelines: &BTreeMap<ParticipantId, TimelineData>) {
        let latest = timelines
            .values()
            .filter_map(|data| data.last_trigger_time)
            .max()
            .unwrap_or(0);
        if latest > self.time {
            self.time = latest;
        }
        let night = self.is_night();

        for (id, resident) in &mut self.residents {
            resident.state.sleeping = night;
            let Some(event) = timelines.get(id).and_then(|data| data.active_event.as_ref()) else {
                continue;
            };
            let target = event.target();
            resident.plan = if event.first_visit_done {
                Plan::AwaitTomorrow {
                    target,
                    day: event.created_at_day,
                }
            } else {
                Plan::Visit(target)
            };
            info!(
                resident = %resident.state.name,
                target = %target,
                plan = ?resident.plan,
                "Resuming open encounter"
            );
        }
        debug!(time = self.time, "Sandbox clock resumed");
    }

    /// Ids of all residents.
    pub fn resident_ids(&self) -> Vec<ParticipantId> {
        self.residents.keys().copied().collect()
    }

    /// A resident's current plan.
    pub fn plan(&self, id: ParticipantId) -> Option<Plan> {
        self.residents.get(&id).map(|r| r.plan)
    }

    /// Number of echo compasses a resident carries.
    pub fn compass_count(&self, id: ParticipantId) -> usize {
        self.residents.get(&id).map_or(0, |r| r.compasses.len())
    }

    /// Where a resident's compass currently points.
    pub fn pointer(&self, id: ParticipantId) -> Option<&GlobalPos> {
        self.residents.get(&id).and_then(|r| r.pointer.as_ref())
    }

    fn day(&self) -> u64 {
        self.time.checked_div(self.ticks_per_day).unwrap_or(0)
    }

    fn is_night(&self) -> bool {
        self.time.checked_rem(self.ticks_per_day).unwrap_or(0) >= night_start(self.ticks_per_day)
    }

    fn move_resident(&mut self, id: ParticipantId, goal: BlockPos) {
        let Some(resident) = self.residents.get(&id) else {
            return;
        };
        let next = step_towards(resident.state.position, goal.center(), WALK_SPEED);
        let cell = next.block();
        let ground = f64::from(self.terrain_height(SANDBOX_WORLD, cell.x, cell.z));
        if let Some(resident) = self.residents.get_mut(&id) {
            resident.state.position = Position::new(next.x, ground, next.z);
        }
    }
}

impl SimulatedWorld for SandboxWorld {
    fn advance(&mut self) {
        self.time = self.time.saturating_add(1);
        let night = self.is_night();
        let today = self.day();

        for id in self.resident_ids() {
            let Some(resident) = self.residents.get_mut(&id) else {
                continue;
            };
            resident.state.sleeping = night;
            if night {
                continue;
            }

            if let Plan::AwaitTomorrow { target, day } = resident.plan
                && today > day
            {
                info!(resident = %resident.state.name, target = %target, "Going back to the echo point");
                resident.plan = Plan::Return(target);
            }

            let plan = resident.plan;
            match plan {
                Plan::Visit(goal) | Plan::Return(goal) => self.move_resident(id, goal),
                Plan::Idle | Plan::AwaitTomorrow { .. } => {}
            }
        }
    }
}

impl Environment for SandboxWorld {
    fn current_time(&self) -> u64 {
        self.time
    }

    fn participants(&self) -> Vec<ParticipantId> {
        self.resident_ids()
    }

    fn participant(&self, id: ParticipantId) -> Option<ParticipantState> {
        self.residents.get(&id).map(|r| r.state.clone())
    }

    fn world_exists(&self, world_key: &str) -> bool {
        world_key == SANDBOX_WORLD
    }

    fn terrain_height(&self, _world_key: &str, x: i32, z: i32) -> i32 {
        // Gentle 16x16 terraces between y=64 and y=67.
        let terrace = x.div_euclid(16).wrapping_add(z.div_euclid(16)).rem_euclid(4);
        terrace.saturating_add(64)
    }

    fn height_bounds(&self, _world_key: &str) -> (i32, i32) {
        (-64, 319)
    }

    fn spawn_marker(&mut self, request: &MarkerSpawn) -> Option<MarkerId> {
        let marker = MarkerId::new();
        let centre = request.cell.center();
        self.markers.insert(
            marker,
            Position::new(centre.x, f64::from(request.cell.y), centre.z),
        );
        info!(name = %request.display_name, cell = %request.cell, "Echo appears");
        Some(marker)
    }

    fn despawn_marker(&mut self, marker: MarkerId) {
        if self.markers.remove(&marker).is_some() {
            info!(marker = %marker, "Echo fades");
        }
    }

    fn resolve_marker(&self, marker: MarkerId) -> Option<Position> {
        self.markers.get(&marker).copied()
    }

    fn give_or_drop(&mut self, participant: ParticipantId, item: GrantedItem) {
        let today = self.day();
        let Some(resident) = self.residents.get_mut(&participant) else {
            return;
        };
        let name = resident.state.name.clone();
        match item {
            GrantedItem::Note(Note::Coordinates { target }) => {
                info!(resident = %name, target = %target, "Note: coordinates, signed in your own hand");
                resident.plan = Plan::Visit(target);
            }
            GrantedItem::Note(Note::TomorrowWarning) => {
                info!(resident = %name, "Note: don't come here tomorrow");
                if let Plan::Visit(target) = resident.plan {
                    resident.plan = Plan::AwaitTomorrow { target, day: today };
                }
            }
            GrantedItem::Note(Note::AlreadyHere { ending }) => {
                info!(resident = %name, ending = ?ending, "Note: you have already been here");
                resident.plan = Plan::Idle;
            }
            GrantedItem::Artifact {
                artifact_id,
                tag,
                display: shown,
            } => {
                info!(
                    resident = %name,
                    artifact = %artifact_id,
                    issued_day = shown.issued_day,
                    "Received echo compass"
                );
                resident.compasses.push(tag);
            }
        }
    }

    fn remove_levels(&mut self, participant: ParticipantId, levels: u32) {
        if let Some(resident) = self.residents.get_mut(&participant) {
            resident.state.levels = resident.state.levels.saturating_sub(levels);
            debug!(resident = %resident.state.name, levels = resident.state.levels, "Levels taken");
        }
    }

    fn apply_effect(&mut self, participant: ParticipantId, effect: EffectKind, duration_ticks: u32) {
        debug!(participant = %participant, effect = ?effect, duration_ticks, "Effect applied");
    }

    fn play_cue(&mut self, participant: ParticipantId, cue: Cue) {
        debug!(participant = %participant, cue = ?cue, "Cue");
    }

    fn artifact_slots(&self, participant: ParticipantId) -> Vec<ItemSlot> {
        let held = self
            .residents
            .get(&participant)
            .map_or(0, |r| r.compasses.len());
        (0..held).map(ItemSlot::Inventory).collect()
    }

    fn read_tag(&self, participant: ParticipantId, slot: ItemSlot) -> Option<TagMap> {
        let ItemSlot::Inventory(index) = slot else {
            return None;
        };
        self.residents
            .get(&participant)
            .and_then(|r| r.compasses.get(index))
            .cloned()
    }

    fn write_tag(&mut self, participant: ParticipantId, slot: ItemSlot, tag: TagMap) {
        let ItemSlot::Inventory(index) = slot else {
            return;
        };
        if let Some(stored) = self
            .residents
            .get_mut(&participant)
            .and_then(|r| r.compasses.get_mut(index))
        {
            *stored = tag;
        }
    }

    fn set_pointer(&mut self, participant: ParticipantId, _slot: ItemSlot, pointer: GlobalPos) {
        if let Some(resident) = self.residents.get_mut(&participant) {
            resident.pointer = Some(pointer);
        }
    }

    fn set_display(&mut self, participant: ParticipantId, _slot: ItemSlot, shown: ArtifactDisplay) {
        let state = if shown.calibrated { "calibrated" } else { "unstable" };
        info!(
            participant = %participant,
            owner = %shown.owner_name,
            target = %shown.target,
            state,
            "Echo compass display updated"
        );
    }
}

const fn night_start(ticks_per_day: u64) -> u64 {
    ticks_per_day.saturating_mul(3) / 4
}

fn step_towards(from: Position, to: Position, speed: f64) -> Position {
    let dx = to.x - from.x;
    let dz = to.z - from.z;
    let remaining = dx.hypot(dz);
    if remaining <= speed {
        return Position::new(to.x, from.y, to.z);
    }
    let scale = speed / remaining;
    Position::new(dx.mul_add(scale, from.x), from.y, dz.mul_add(scale, from.z))
}

fn starter_kit() -> EquipmentSnapshot {
    EquipmentSnapshot {
        main_hand: ItemStackSnapshot {
            item_id: "iron_sword".to_owned(),
            count: 1,
        },
        head: "leather_helmet".to_owned(),
        inventory: vec![
            InventoryEntry {
                name: "Torch".to_owned(),
                count: 16,
            },
            InventoryEntry {
                name: "Bread".to_owned(),
                count: 5,
            },
        ],
        ..EquipmentSnapshot::default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use std::sync::Arc;

    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use tomorrow_core::{TomorrowConfig, TomorrowRuntime};
    use tomorrow_db::TimelineStore;
    use tomorrow_types::{ActiveEvent, Outcome};

    use super::*;

    #[test]
    fn residents_sleep_at_night_only() {
        let mut world = SandboxWorld::new(2_400, &["Alex".to_owned()]);
        let id = world.resident_ids().into_iter().next().unwrap();
        assert!(world.participant(id).unwrap().sleeping);

        while world.current_time() < 2_400 {
            world.advance();
        }
        assert!(!world.participant(id).unwrap().sleeping);
        assert_eq!(world.current_time(), 2_400);
    }

    #[test]
    fn resident_ids_are_stable() {
        let names = ["Alex".to_owned(), "Sam".to_owned()];
        let first = SandboxWorld::new(2_400, &names).resident_ids();
        let second = SandboxWorld::new(2_400, &names).resident_ids();
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn walking_reaches_goal() {
        let goal = BlockPos::new(30, 64, -40);
        let mut pos = Position::new(0.5, 64.0, 0.5);
        for _ in 0..100 {
            pos = step_towards(pos, goal.center(), WALK_SPEED);
        }
        assert_eq!(pos.block().x, 30);
        assert_eq!(pos.block().z, -40);
    }

    #[test]
    fn terrain_is_terraced() {
        let world = SandboxWorld::new(2_400, &[]);
        for (x, z) in [(0, 0), (-1, -1), (100, -300), (i32::MAX, i32::MIN)] {
            let y = world.terrain_height(SANDBOX_WORLD, x, z);
            assert!((64..=67).contains(&y));
        }
    }

    #[test]
    fn scripted_resident_completes_an_encounter() {
        let mut config = TomorrowConfig::default();
        config.trigger.wake_event_chance = 1.0;
        config.time.ticks_per_day = 2_400;
        let store = Arc::new(TimelineStore::ephemeral());
        let mut runtime = TomorrowRuntime::new(config, Arc::clone(&store), SmallRng::seed_from_u64(12));
        let mut world = SandboxWorld::new(2_400, &["Alex".to_owned()]);
        let id = world.resident_ids().into_iter().next().unwrap();

        let mut outcomes = Vec::new();
        for _ in 0..6_000 {
            outcomes.extend(runtime.run_tick(&mut world).finalized);
            world.advance();
        }

        assert_eq!(outcomes, vec![(id, Outcome::TomorrowBranchCompass)]);
        assert_eq!(world.plan(id), Some(Plan::Idle));
        assert_eq!(world.compass_count(id), 1);
        assert!(world.pointer(id).is_some());

        let data = store.get(id).unwrap();
        assert_eq!(data.completed_encounters, 1);
        let record = data.history.first().unwrap();
        assert_eq!(record.created_day, 1);
        assert_eq!(record.resolved_day, 2);
        assert!(record.artifact_granted);
    }

    #[test]
    fn restart_mid_encounter_finishes_it() {
        let mut config = TomorrowConfig::default();
        config.trigger.wake_event_chance = 1.0;
        config.time.ticks_per_day = 2_400;
        let store = Arc::new(TimelineStore::ephemeral());
        let names = ["Alex".to_owned()];

        let mut runtime = TomorrowRuntime::new(config.clone(), Arc::clone(&store), SmallRng::seed_from_u64(12));
        let mut world = SandboxWorld::new(2_400, &names);
        let id = world.resident_ids().into_iter().next().unwrap();
        for _ in 0..700 {
            runtime.run_tick(&mut world);
            world.advance();
        }
        let open = store.get(id).unwrap().active_event.unwrap();
        assert!(!open.first_visit_done);
        let triggered_at = store.get(id).unwrap().last_trigger_time.unwrap();

        let mut runtime = TomorrowRuntime::new(config, Arc::clone(&store), SmallRng::seed_from_u64(13));
        let mut world = SandboxWorld::new(2_400, &names);
        world.resume(&store.snapshot());
        assert_eq!(world.plan(id), Some(Plan::Visit(open.target())));
        assert!(world.current_time() >= triggered_at);

        let mut outcomes = Vec::new();
        for _ in 0..6_000 {
            outcomes.extend(runtime.run_tick(&mut world).finalized);
            world.advance();
        }
        assert_eq!(outcomes, vec![(id, Outcome::TomorrowBranchCompass)]);
        assert_eq!(world.compass_count(id), 1);
        let data = store.get(id).unwrap();
        assert!(data.active_event.is_none());
        assert_eq!(data.completed_encounters, 1);
    }

    #[test]
    fn resume_after_first_visit_waits_for_tomorrow() {
        let mut world = SandboxWorld::new(2_400, &["Alex".to_owned()]);
        let id = world.resident_ids().into_iter().next().unwrap();
        let target = BlockPos::new(120, 65, -40);
        let event = ActiveEvent {
            world_key: SANDBOX_WORLD.to_owned(),
            target_x: target.x,
            target_y: target.y,
            target_z: target.z,
            created_at_time: 12_100,
            created_at_day: 5,
            participant_name: "Alex".to_owned(),
            snapshot: EquipmentSnapshot::default(),
            first_visit_done: true,
            tomorrow_branch_resolved: false,
            resolved_outcome: Outcome::FirstVisitDone,
            marker: None,
        };
        let timelines = BTreeMap::from([(
            id,
            TimelineData {
                last_trigger_time: Some(12_100),
                active_event: Some(event),
                ..TimelineData::default()
            },
        )]);

        world.resume(&timelines);
        assert_eq!(world.current_time(), 12_100);
        assert_eq!(world.plan(id), Some(Plan::AwaitTomorrow { target, day: 5 }));
        assert!(!world.participant(id).unwrap().sleeping);

        while world.current_time() < 2_400 * 6 {
            world.advance();
        }
        assert_eq!(world.plan(id), Some(Plan::Return(target)));
    }
}
