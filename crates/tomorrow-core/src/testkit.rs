//! In-memory [`Environment`] that records every request.

use std::collections::{BTreeMap, BTreeSet};

use tomorrow_types::{
    ArtifactDisplay, BlockPos, Cue, EffectKind, EquipmentSnapshot, GlobalPos, GrantedItem,
    MarkerId, Note, ParticipantId, ParticipantState, Position, TagMap,
};

use crate::environment::{Environment, ItemSlot, MarkerSpawn};

pub(crate) const OVERWORLD: &str = "overworld";

/// A compass-type item held by a fake participant.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeItem {
    pub tag: TagMap,
    pub pointer: Option<GlobalPos>,
    pub display: Option<ArtifactDisplay>,
}

#[derive(Debug)]
pub(crate) struct FakeEnvironment {
    pub time: u64,
    pub surface: i32,
    pub bounds: (i32, i32),
    pub worlds: BTreeSet<String>,
    pub participants: BTreeMap<ParticipantId, ParticipantState>,
    /// Listed as present but never described.
    pub ghosts: Vec<ParticipantId>,
    pub markers: BTreeMap<MarkerId, Position>,
    pub refuse_spawns: bool,
    pub spawn_requests: Vec<MarkerSpawn>,
    pub despawned: Vec<MarkerId>,
    pub granted: Vec<(ParticipantId, GrantedItem)>,
    pub effects: Vec<(ParticipantId, EffectKind, u32)>,
    pub cues: Vec<(ParticipantId, Cue)>,
    pub items: BTreeMap<ParticipantId, Vec<FakeItem>>,
    pub off_hand: BTreeMap<ParticipantId, FakeItem>,
}

impl FakeEnvironment {
    pub fn new() -> Self {
        Self {
            time: 0,
            surface: 64,
            bounds: (-64, 319),
            worlds: BTreeSet::from([OVERWORLD.to_owned()]),
            participants: BTreeMap::new(),
            ghosts: Vec::new(),
            markers: BTreeMap::new(),
            refuse_spawns: false,
            spawn_requests: Vec::new(),
            despawned: Vec::new(),
            granted: Vec::new(),
            effects: Vec::new(),
            cues: Vec::new(),
            items: BTreeMap::new(),
            off_hand: BTreeMap::new(),
        }
    }

    /// Register an awake participant at the origin with 30 levels.
    pub fn add_participant(&mut self, name: &str) -> ParticipantState {
        let state = ParticipantState {
            id: ParticipantId::new(),
            name: name.to_owned(),
            world_key: OVERWORLD.to_owned(),
            position: Position::new(0.5, 64.0, 0.5),
            sleeping: false,
            incapacitated: false,
            levels: 30,
            equipment: EquipmentSnapshot::default(),
        };
        self.participants.insert(state.id, state.clone());
        state
    }

    /// Replace the stored participant state.
    pub fn update(&mut self, state: &ParticipantState) {
        self.participants.insert(state.id, state.clone());
    }

    /// Move a participant to the centre of a cell.
    pub fn move_to(&mut self, id: ParticipantId, cell: BlockPos) -> Option<ParticipantState> {
        let state = self.participants.get_mut(&id)?;
        state.position = cell.center();
        Some(state.clone())
    }

    pub fn levels(&self, id: ParticipantId) -> u32 {
        self.participants.get(&id).map_or(0, |p| p.levels)
    }

    pub fn notes_for(&self, id: ParticipantId) -> Vec<Note> {
        self.granted
            .iter()
            .filter(|(who, _)| *who == id)
            .filter_map(|(_, item)| match item {
                GrantedItem::Note(note) => Some(*note),
                GrantedItem::Artifact { .. } => None,
            })
            .collect()
    }

    pub fn cues_for(&self, id: ParticipantId) -> Vec<Cue> {
        self.cues
            .iter()
            .filter(|(who, _)| *who == id)
            .map(|(_, cue)| *cue)
            .collect()
    }

    pub fn count_cue(&self, id: ParticipantId, cue: Cue) -> usize {
        self.cues_for(id).into_iter().filter(|c| *c == cue).count()
    }

    pub fn item(&self, id: ParticipantId, slot: ItemSlot) -> Option<&FakeItem> {
        match slot {
            ItemSlot::Inventory(index) => self.items.get(&id).and_then(|items| items.get(index)),
            ItemSlot::OffHand => self.off_hand.get(&id),
        }
    }

    fn item_mut(&mut self, id: ParticipantId, slot: ItemSlot) -> Option<&mut FakeItem> {
        match slot {
            ItemSlot::Inventory(index) => self
                .items
                .get_mut(&id)
                .and_then(|items| items.get_mut(index)),
            ItemSlot::OffHand => self.off_hand.get_mut(&id),
        }
    }
}

impl Environment for FakeEnvironment {
    fn current_time(&self) -> u64 {
        self.time
    }

    fn participants(&self) -> Vec<ParticipantId> {
        self.participants
            .keys()
            .copied()
            .chain(self.ghosts.iter().copied())
            .collect()
    }

    fn participant(&self, id: ParticipantId) -> Option<ParticipantState> {
        self.participants.get(&id).cloned()
    }

    fn world_exists(&self, world_key: &str) -> bool {
        self.worlds.contains(world_key)
    }

    fn terrain_height(&self, _world_key: &str, _x: i32, _z: i32) -> i32 {
        self.surface
    }

    fn height_bounds(&self, _world_key: &str) -> (i32, i32) {
        self.bounds
    }

    fn spawn_marker(&mut self, request: &MarkerSpawn) -> Option<MarkerId> {
        self.spawn_requests.push(request.clone());
        if self.refuse_spawns {
            return None;
        }
        let marker = MarkerId::new();
        self.markers.insert(marker, request.cell.center());
        Some(marker)
    }

    fn despawn_marker(&mut self, marker: MarkerId) {
        self.markers.remove(&marker);
        self.despawned.push(marker);
    }

    fn resolve_marker(&self, marker: MarkerId) -> Option<Position> {
        self.markers.get(&marker).copied()
    }

    fn give_or_drop(&mut self, participant: ParticipantId, item: GrantedItem) {
        if let GrantedItem::Artifact { tag, display, .. } = &item {
            self.items.entry(participant).or_default().push(FakeItem {
                tag: tag.clone(),
                pointer: None,
                display: Some(display.clone()),
            });
        }
        self.granted.push((participant, item));
    }

    fn remove_levels(&mut self, participant: ParticipantId, levels: u32) {
        if let Some(state) = self.participants.get_mut(&participant) {
            state.levels = state.levels.saturating_sub(levels);
        }
    }

    fn apply_effect(&mut self, participant: ParticipantId, effect: EffectKind, duration_ticks: u32) {
        self.effects.push((participant, effect, duration_ticks));
    }

    fn play_cue(&mut self, participant: ParticipantId, cue: Cue) {
        self.cues.push((participant, cue));
    }

    fn artifact_slots(&self, participant: ParticipantId) -> Vec<ItemSlot> {
        let held = self.items.get(&participant).map_or(0, Vec::len);
        let mut slots: Vec<ItemSlot> = (0..held).map(ItemSlot::Inventory).collect();
        if self.off_hand.contains_key(&participant) {
            slots.push(ItemSlot::OffHand);
        }
        slots
    }

    fn read_tag(&self, participant: ParticipantId, slot: ItemSlot) -> Option<TagMap> {
        self.item(participant, slot).map(|item| item.tag.clone())
    }

    fn write_tag(&mut self, participant: ParticipantId, slot: ItemSlot, tag: TagMap) {
        if let Some(item) = self.item_mut(participant, slot) {
            item.tag = tag;
        }
    }

    fn set_pointer(&mut self, participant: ParticipantId, slot: ItemSlot, pointer: GlobalPos) {
        if let Some(item) = self.item_mut(participant, slot) {
            item.pointer = Some(pointer);
        }
    }

    fn set_display(&mut self, participant: ParticipantId, slot: ItemSlot, display: ArtifactDisplay) {
        if let Some(item) = self.item_mut(participant, slot) {
            item.display = Some(display);
        }
    }
}
