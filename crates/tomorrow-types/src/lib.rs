//! Shared type definitions for the Tomorrow Echo encounter system.
//!
//! Everything that crosses a crate boundary lives here: identifiers, the
//! persisted timeline, participant snapshots, and the payloads the core hands
//! to the host environment.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for participants, artifacts, markers
//! - [`enums`] -- Outcomes, artifact modes, cues, and status effects
//! - [`structs`] -- Positions, timeline data, notes, and artifact metadata

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{ArtifactMode, Cue, EffectKind, Outcome};
pub use ids::{ArtifactId, MarkerId, ParticipantId};
pub use structs::{
    ActiveEvent, ArtifactDisplay, BlockPos, EMPTY_ITEM, EncounterRecord, EquipmentSnapshot,
    FinalNote, GlobalPos, GrantedItem, InventoryEntry, ItemStackSnapshot, Note, ParticipantState,
    Position, TagMap, TagValue, TimelineData,
};
