//! The narrow interface through which the core reaches the host world.
//!
//! The core never owns actors, inventories or audio. It reads participant
//! snapshots and issues requests through [`Environment`]; the host decides
//! how to render them. All distances are computed by the core from the
//! positions the host reports.

use tomorrow_types::{
    ArtifactDisplay, BlockPos, Cue, EffectKind, EquipmentSnapshot, GlobalPos, GrantedItem, MarkerId,
    ParticipantId, ParticipantState, Position, TagMap,
};

/// Where an item lives in a participant's inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ItemSlot {
    /// Non-equipped inventory slot index.
    Inventory(usize),
    /// The off hand.
    OffHand,
}

/// Everything the host needs to place an echo marker.
///
/// The marker is expected to stand still at the centre of `cell`, take no
/// damage and ignore gravity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerSpawn {
    /// World to spawn in.
    pub world_key: String,
    /// Cell to stand in.
    pub cell: BlockPos,
    /// Display name, `"<participant> (Echo)"`.
    pub display_name: String,
    /// Equipment copied from the participant at trigger time.
    pub equipment: EquipmentSnapshot,
}

/// Host world seen by the encounter core.
pub trait Environment {
    /// Current absolute game time in ticks.
    fn current_time(&self) -> u64;

    /// Participants present this tick.
    fn participants(&self) -> Vec<ParticipantId>;

    /// Snapshot of one participant, `None` if they left.
    fn participant(&self, id: ParticipantId) -> Option<ParticipantState>;

    /// Whether a world with this key is currently loaded.
    fn world_exists(&self, world_key: &str) -> bool;

    /// Y of the first free cell above the terrain surface at `(x, z)`.
    fn terrain_height(&self, world_key: &str, x: i32, z: i32) -> i32;

    /// Inclusive `(min, max)` buildable heights of a world.
    fn height_bounds(&self, world_key: &str) -> (i32, i32);

    /// Spawn an echo marker. `None` when the host refuses (e.g. area not loaded).
    fn spawn_marker(&mut self, request: &MarkerSpawn) -> Option<MarkerId>;

    /// Remove a marker. Unknown ids are ignored.
    fn despawn_marker(&mut self, marker: MarkerId);

    /// Current position of a live marker.
    fn resolve_marker(&self, marker: MarkerId) -> Option<Position>;

    /// Insert into the inventory, dropping at the participant's feet if full.
    fn give_or_drop(&mut self, participant: ParticipantId, item: GrantedItem);

    /// Take experience levels away. Never called with more than they have.
    fn remove_levels(&mut self, participant: ParticipantId, levels: u32);

    /// Apply a status effect for `duration_ticks`.
    fn apply_effect(&mut self, participant: ParticipantId, effect: EffectKind, duration_ticks: u32);

    /// Play a cue for the participant.
    fn play_cue(&mut self, participant: ParticipantId, cue: Cue);

    /// Slots holding compass-type items, non-equipped inventory first, then
    /// the off hand.
    fn artifact_slots(&self, participant: ParticipantId) -> Vec<ItemSlot>;

    /// Tag stored on the item in `slot`.
    fn read_tag(&self, participant: ParticipantId, slot: ItemSlot) -> Option<TagMap>;

    /// Replace the tag stored on the item in `slot`.
    fn write_tag(&mut self, participant: ParticipantId, slot: ItemSlot, tag: TagMap);

    /// Point the item in `slot` at a position.
    fn set_pointer(&mut self, participant: ParticipantId, slot: ItemSlot, pointer: GlobalPos);

    /// Update the item's visible name and description.
    fn set_display(&mut self, participant: ParticipantId, slot: ItemSlot, display: ArtifactDisplay);
}
