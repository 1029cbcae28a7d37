//! Core entity structs: positions, participant snapshots, the persisted
//! timeline, and the payloads handed to the host.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enums::Outcome;
use crate::ids::{ArtifactId, MarkerId, ParticipantId};

/// Item id used for empty equipment slots.
pub const EMPTY_ITEM: &str = "air";

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// Integer cell coordinates in a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BlockPos {
    /// East-west axis.
    pub x: i32,
    /// Vertical axis.
    pub y: i32,
    /// North-south axis.
    pub z: i32,
}

impl BlockPos {
    /// Construct a cell position.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Centre point of the cell.
    pub fn center(self) -> Position {
        Position {
            x: f64::from(self.x) + 0.5,
            y: f64::from(self.y) + 0.5,
            z: f64::from(self.z) + 0.5,
        }
    }
}

impl core::fmt::Display for BlockPos {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {} {}", self.x, self.y, self.z)
    }
}

/// Continuous position of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// East-west axis.
    pub x: f64,
    /// Vertical axis.
    pub y: f64,
    /// North-south axis.
    pub z: f64,
}

impl Position {
    /// Construct a position.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another position.
    pub fn distance_to(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dz.mul_add(dz, dx.mul_add(dx, dy * dy)).sqrt()
    }

    /// Cell containing this position.
    #[allow(clippy::cast_possible_truncation)]
    pub fn block(self) -> BlockPos {
        // Saturating float-to-int casts; world coordinates are far inside i32.
        BlockPos {
            x: self.x.floor() as i32,
            y: self.y.floor() as i32,
            z: self.z.floor() as i32,
        }
    }
}

/// A cell position qualified by the world it lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GlobalPos {
    /// World (dimension) key, e.g. `"overworld"`.
    pub world_key: String,
    /// Cell in that world.
    pub pos: BlockPos,
}

// ---------------------------------------------------------------------------
// Participant snapshot
// ---------------------------------------------------------------------------

/// One equipped stack, frozen by item id and count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStackSnapshot {
    /// Registry id of the item, [`EMPTY_ITEM`] when the slot is empty.
    pub item_id: String,
    /// Stack size.
    pub count: u32,
}

impl ItemStackSnapshot {
    /// A snapshot of an empty slot.
    pub fn empty() -> Self {
        Self {
            item_id: EMPTY_ITEM.to_owned(),
            count: 0,
        }
    }

    /// Whether the slot was empty.
    pub fn is_empty(&self) -> bool {
        self.item_id == EMPTY_ITEM || self.count == 0
    }
}

impl Default for ItemStackSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// A non-equipped inventory stack, recorded by display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    /// Display name shown to players.
    pub name: String,
    /// Stack size.
    pub count: u32,
}

/// Frozen copy of a participant's equipment and inventory at trigger time.
///
/// The marker actor is dressed from this snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentSnapshot {
    /// Main hand stack.
    #[serde(default)]
    pub main_hand: ItemStackSnapshot,
    /// Off hand stack.
    #[serde(default)]
    pub off_hand: ItemStackSnapshot,
    /// Helmet item id.
    #[serde(default = "empty_item")]
    pub head: String,
    /// Chestplate item id.
    #[serde(default = "empty_item")]
    pub chest: String,
    /// Leggings item id.
    #[serde(default = "empty_item")]
    pub legs: String,
    /// Boots item id.
    #[serde(default = "empty_item")]
    pub feet: String,
    /// Non-empty, non-equipped inventory stacks.
    #[serde(default)]
    pub inventory: Vec<InventoryEntry>,
}

fn empty_item() -> String {
    EMPTY_ITEM.to_owned()
}

impl Default for EquipmentSnapshot {
    fn default() -> Self {
        Self {
            main_hand: ItemStackSnapshot::empty(),
            off_hand: ItemStackSnapshot::empty(),
            head: empty_item(),
            chest: empty_item(),
            legs: empty_item(),
            feet: empty_item(),
            inventory: Vec::new(),
        }
    }
}

/// What the host reports about a participant for the current tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantState {
    /// Stable identity.
    pub id: ParticipantId,
    /// Display name.
    pub name: String,
    /// World the participant is currently in.
    pub world_key: String,
    /// Current position.
    pub position: Position,
    /// Whether the participant is in bed.
    pub sleeping: bool,
    /// Dead or dying.
    pub incapacitated: bool,
    /// Remaining levels (the resource drained by the encounter).
    pub levels: u32,
    /// Current equipment and inventory.
    pub equipment: EquipmentSnapshot,
}

// ---------------------------------------------------------------------------
// Persisted timeline
// ---------------------------------------------------------------------------

/// The single in-flight encounter of a participant.
///
/// Everything except the progression fields and the marker handle is fixed at
/// creation. Progression only moves forward: see
/// [`ActiveEvent::complete_first_visit`] and [`ActiveEvent::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveEvent {
    /// World the target lives in.
    pub world_key: String,
    /// Target cell, x.
    pub target_x: i32,
    /// Target cell, y (terrain height at creation).
    pub target_y: i32,
    /// Target cell, z.
    pub target_z: i32,
    /// Game time the encounter was created.
    pub created_at_time: u64,
    /// Game day the encounter was created.
    pub created_at_day: u64,
    /// Participant display name at creation; the echo wears it.
    pub participant_name: String,
    /// Frozen equipment the echo is dressed in.
    #[serde(default)]
    pub snapshot: EquipmentSnapshot,
    /// Whether phase one has resolved.
    #[serde(default)]
    pub first_visit_done: bool,
    /// Whether the encounter reached a terminal outcome.
    #[serde(default)]
    pub tomorrow_branch_resolved: bool,
    /// Latest outcome reached.
    #[serde(default = "pending_outcome")]
    pub resolved_outcome: Outcome,
    /// Handle of the spawned echo, if one was spawned and not yet removed.
    #[serde(default)]
    pub marker: Option<MarkerId>,
}

const fn pending_outcome() -> Outcome {
    Outcome::Pending
}

impl ActiveEvent {
    /// Target cell.
    pub const fn target(&self) -> BlockPos {
        BlockPos::new(self.target_x, self.target_y, self.target_z)
    }

    /// Mark phase one as resolved.
    ///
    /// Returns `false` (and changes nothing) if it was already resolved or
    /// the encounter is terminal.
    pub fn complete_first_visit(&mut self) -> bool {
        if self.first_visit_done || self.resolved_outcome.is_terminal() {
            return false;
        }
        self.first_visit_done = true;
        self.resolved_outcome = Outcome::FirstVisitDone;
        true
    }

    /// Record a terminal outcome.
    ///
    /// Returns `false` if `outcome` is not terminal or a terminal outcome was
    /// already recorded.
    pub fn resolve(&mut self, outcome: Outcome) -> bool {
        if !outcome.is_terminal() || self.resolved_outcome.is_terminal() {
            return false;
        }
        self.tomorrow_branch_resolved = true;
        self.resolved_outcome = outcome;
        true
    }
}

/// Immutable history entry written when an encounter finalizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterRecord {
    /// World the target lived in.
    pub world_key: String,
    /// Target x.
    pub x: i32,
    /// Target y.
    pub y: i32,
    /// Target z.
    pub z: i32,
    /// Day the encounter was created.
    pub created_day: u64,
    /// Day the encounter finalized.
    pub resolved_day: u64,
    /// Terminal outcome.
    pub outcome: Outcome,
    /// Whether the echo compass was granted.
    pub artifact_granted: bool,
}

/// Everything persisted for one participant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineData {
    /// Number of finalized encounters. Never decreases.
    #[serde(default)]
    pub completed_encounters: u32,
    /// Game time of the last trigger, `None` if never triggered.
    #[serde(default)]
    pub last_trigger_time: Option<u64>,
    /// In-flight encounter, at most one.
    #[serde(default)]
    pub active_event: Option<ActiveEvent>,
    /// Finalized encounters, oldest first. Append-only.
    #[serde(default)]
    pub history: Vec<EncounterRecord>,
}

// ---------------------------------------------------------------------------
// Payloads handed to the host
// ---------------------------------------------------------------------------

/// How the tomorrow branch ended, as told by the final note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FinalNote {
    /// The compass was granted for `price` levels.
    Granted {
        /// Levels deducted.
        price: u32,
    },
    /// The participant did not have the `required` levels.
    NotEnoughLevels {
        /// Levels that were required.
        required: u32,
    },
    /// Enough levels, but the reward roll failed.
    Unlucky,
}

/// A paper note handed to the participant. The host formats the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Note {
    /// "Coordinates: x y z. Signed: in your hand."
    Coordinates {
        /// Target cell.
        target: BlockPos,
    },
    /// "Don't come here tomorrow."
    TomorrowWarning,
    /// "You have already been here." plus the reward outcome.
    AlreadyHere {
        /// How the tomorrow branch ended.
        ending: FinalNote,
    },
}

/// Single value stored in an item's custom tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Text.
    Text(String),
}

/// An item's custom tag contents.
pub type TagMap = BTreeMap<String, TagValue>;

/// Display metadata for the echo compass. The host turns it into a name and
/// lore lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactDisplay {
    /// Owner display name.
    pub owner_name: String,
    /// Day the compass was issued.
    pub issued_day: u64,
    /// Echo point the compass belongs to.
    pub target: BlockPos,
    /// Whether the pointer has settled.
    pub calibrated: bool,
}

/// An item the core asks the host to put into a participant's inventory
/// (dropping it at their feet if full).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantedItem {
    /// A note.
    Note(Note),
    /// A freshly issued echo compass.
    Artifact {
        /// Identifier of the new artifact.
        artifact_id: ArtifactId,
        /// Tag contents to write on the item.
        tag: TagMap,
        /// Display metadata.
        display: ArtifactDisplay,
    },
}
