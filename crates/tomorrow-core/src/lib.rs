//! Encounter logic for the Tomorrow Echo system.
//!
//! A participant who wakes up may be handed coordinates to an echo point.
//! Walking there spawns their echo; touching it ends the first visit.
//! Returning on a later day and standing at the point long enough drains
//! levels and, if they can pay, rewards them with an echo compass that
//! eventually points back at the place they met themselves.
//!
//! The crate is synchronous and host-agnostic: everything it needs from the
//! world goes through [`Environment`].
//!
//! # Modules
//!
//! - [`config`]: YAML configuration with sanitized defaults
//! - [`target`]: echo point placement and day arithmetic
//! - [`environment`]: the host interface
//! - [`context`]: per-tick borrow bundle
//! - [`trigger`]: wake edge detection and encounter creation
//! - [`encounter`]: the two-phase encounter state machine
//! - [`artifact`]: echo compass issuance and pointer updates
//! - [`tick`]: the per-tick runtime

pub mod artifact;
pub mod config;
pub mod context;
pub mod encounter;
pub mod environment;
pub mod target;
pub mod tick;
pub mod trigger;

#[cfg(test)]
mod testkit;

pub use artifact::{ArtifactState, ArtifactStep, ArtifactTick, GrantResult};
pub use config::{ConfigError, TomorrowConfig};
pub use context::TickContext;
pub use encounter::{EncounterCounters, EncounterMachine, EncounterStep, RewardDecision};
pub use environment::{Environment, ItemSlot, MarkerSpawn};
pub use target::{PlanarTarget, day_index, generate_target};
pub use tick::{TickSummary, TomorrowRuntime};
pub use trigger::{Rejection, TriggerEngine, TriggerOutcome};
