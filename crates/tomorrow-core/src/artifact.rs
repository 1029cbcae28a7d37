//! The echo compass: issuance, tag encoding, and per-tick pointer updates.
//!
//! All state lives in the item's tag, never in the timeline store. A compass
//! starts **chaotic**, pointing at a random cell near its holder that is
//! re-rolled every `chaos_update_ticks`. Once `calibrate_at` passes it becomes
//! **calibrated** and points at the echo point for good. The transition is
//! one-way; only re-issuing the compass through a new grant resets it.
//!
//! [`ArtifactState`] is pure and operates on a [`TagMap`]. The free functions
//! at the bottom apply it to the host through [`Environment`].

use rand::Rng;
use tomorrow_types::{
    ActiveEvent, ArtifactDisplay, ArtifactId, ArtifactMode, BlockPos, Cue, GlobalPos, GrantedItem,
    ParticipantId, ParticipantState, TagMap, TagValue,
};
use tracing::{debug, info};

use crate::context::TickContext;
use crate::environment::{Environment, ItemSlot};

/// Half-width of the square a chaotic compass points into.
pub const CHAOS_SPREAD: i32 = 64;

const KEY_UNIQUE: &str = "tomorrowEchoUnique";
const KEY_ARTIFACT_ID: &str = "artifactId";
const KEY_OWNER_ID: &str = "ownerId";
const KEY_OWNER_NAME: &str = "ownerName";
const KEY_ISSUED_AT_TIME: &str = "issuedAtTime";
const KEY_ISSUED_AT_DAY: &str = "issuedAtDay";
const KEY_MODE: &str = "mode";
const KEY_CALIBRATE_AT: &str = "calibrateAt";
const KEY_LAST_CHAOS_UPDATE: &str = "lastChaosUpdate";
const KEY_TARGET_WORLD: &str = "targetWorld";
const KEY_TARGET_X: &str = "targetX";
const KEY_TARGET_Y: &str = "targetY";
const KEY_TARGET_Z: &str = "targetZ";

const NEVER: &str = "never";
const UNSET: &str = "unset";

/// Metadata carried on an echo compass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactState {
    /// Stable identity, kept across re-issuance.
    pub artifact_id: ArtifactId,
    /// Participant the compass belongs to.
    pub owner: ParticipantId,
    /// Owner's display name at issue time.
    pub owner_name: String,
    /// Game time of issue.
    pub issued_at_time: u64,
    /// Day index of issue.
    pub issued_at_day: u64,
    /// Chaotic or calibrated.
    pub mode: ArtifactMode,
    /// When the compass calibrates, `None` for never.
    pub calibrate_at: Option<u64>,
    /// Last chaotic re-roll, `None` before the first.
    pub last_chaos_update: Option<u64>,
    /// The echo point.
    pub target: GlobalPos,
}

/// What [`ArtifactState::advance`] decided this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactStep {
    /// Nothing to do.
    Idle,
    /// Switched to calibrated; point here from now on.
    Calibrated(GlobalPos),
    /// Chaotic re-roll; point here until the next one.
    Rerolled(GlobalPos),
}

impl ArtifactState {
    /// A fresh chaotic compass for `owner` pointing (eventually) at `target`.
    pub fn issue(
        artifact_id: ArtifactId,
        owner: &ParticipantState,
        target: GlobalPos,
        now: u64,
        day: u64,
        calibration_delay: Option<u64>,
    ) -> Self {
        Self {
            artifact_id,
            owner: owner.id,
            owner_name: owner.name.clone(),
            issued_at_time: now,
            issued_at_day: day,
            mode: ArtifactMode::Chaotic,
            calibrate_at: calibration_delay.map(|delay| now.saturating_add(delay)),
            last_chaos_update: None,
            target,
        }
    }

    /// Whether `participant` owns this compass.
    pub fn is_owned_by(&self, participant: ParticipantId) -> bool {
        self.owner == participant
    }

    /// Decode from an item tag. Missing or malformed fields yield `None`.
    pub fn from_tag(tag: &TagMap) -> Option<Self> {
        if !matches!(tag.get(KEY_UNIQUE), Some(TagValue::Bool(true))) {
            return None;
        }

        let calibrate_at = match tag.get(KEY_CALIBRATE_AT)? {
            TagValue::Int(at) => Some(u64::try_from(*at).ok()?),
            TagValue::Text(text) if text == NEVER => None,
            _ => return None,
        };
        let last_chaos_update = match tag.get(KEY_LAST_CHAOS_UPDATE) {
            None => None,
            Some(TagValue::Int(at)) => Some(u64::try_from(*at).ok()?),
            Some(TagValue::Text(text)) if text == UNSET => None,
            Some(_) => return None,
        };

        Some(Self {
            artifact_id: ArtifactId::parse(text(tag, KEY_ARTIFACT_ID)?)?,
            owner: ParticipantId::parse(text(tag, KEY_OWNER_ID)?)?,
            owner_name: text(tag, KEY_OWNER_NAME)?.to_owned(),
            issued_at_time: unsigned(tag, KEY_ISSUED_AT_TIME)?,
            issued_at_day: unsigned(tag, KEY_ISSUED_AT_DAY)?,
            mode: ArtifactMode::from_tag(text(tag, KEY_MODE)?)?,
            calibrate_at,
            last_chaos_update,
            target: GlobalPos {
                world_key: text(tag, KEY_TARGET_WORLD)?.to_owned(),
                pos: BlockPos::new(
                    coordinate(tag, KEY_TARGET_X)?,
                    coordinate(tag, KEY_TARGET_Y)?,
                    coordinate(tag, KEY_TARGET_Z)?,
                ),
            },
        })
    }

    /// Encode into an item tag.
    pub fn to_tag(&self) -> TagMap {
        let mut tag = TagMap::new();
        tag.insert(KEY_UNIQUE.to_owned(), TagValue::Bool(true));
        tag.insert(
            KEY_ARTIFACT_ID.to_owned(),
            TagValue::Text(self.artifact_id.to_string()),
        );
        tag.insert(KEY_OWNER_ID.to_owned(), TagValue::Text(self.owner.to_string()));
        tag.insert(
            KEY_OWNER_NAME.to_owned(),
            TagValue::Text(self.owner_name.clone()),
        );
        tag.insert(KEY_ISSUED_AT_TIME.to_owned(), int(self.issued_at_time));
        tag.insert(KEY_ISSUED_AT_DAY.to_owned(), int(self.issued_at_day));
        tag.insert(
            KEY_MODE.to_owned(),
            TagValue::Text(self.mode.as_str().to_owned()),
        );
        tag.insert(
            KEY_CALIBRATE_AT.to_owned(),
            self.calibrate_at
                .map_or_else(|| TagValue::Text(NEVER.to_owned()), int),
        );
        tag.insert(
            KEY_LAST_CHAOS_UPDATE.to_owned(),
            self.last_chaos_update
                .map_or_else(|| TagValue::Text(UNSET.to_owned()), int),
        );
        tag.insert(
            KEY_TARGET_WORLD.to_owned(),
            TagValue::Text(self.target.world_key.clone()),
        );
        tag.insert(KEY_TARGET_X.to_owned(), TagValue::Int(i64::from(self.target.pos.x)));
        tag.insert(KEY_TARGET_Y.to_owned(), TagValue::Int(i64::from(self.target.pos.y)));
        tag.insert(KEY_TARGET_Z.to_owned(), TagValue::Int(i64::from(self.target.pos.z)));
        tag
    }

    /// Name and description metadata for the host.
    pub fn display(&self) -> ArtifactDisplay {
        ArtifactDisplay {
            owner_name: self.owner_name.clone(),
            issued_day: self.issued_at_day,
            target: self.target.pos,
            calibrated: self.mode == ArtifactMode::Calibrated,
        }
    }

    /// Step the compass for one tick.
    ///
    /// `holder_world` and `holder_cell` are where the holder stands now;
    /// `bounds` are that world's inclusive height limits.
    pub fn advance<R: Rng>(
        &mut self,
        now: u64,
        holder_world: &str,
        holder_cell: BlockPos,
        bounds: (i32, i32),
        chaos_interval: u32,
        rng: &mut R,
    ) -> ArtifactStep {
        if self.mode == ArtifactMode::Calibrated {
            return ArtifactStep::Idle;
        }

        if let Some(at) = self.calibrate_at
            && now >= at
        {
            self.mode = ArtifactMode::Calibrated;
            return ArtifactStep::Calibrated(self.target.clone());
        }

        let due = self
            .last_chaos_update
            .is_none_or(|last| now.saturating_sub(last) >= u64::from(chaos_interval));
        if !due {
            return ArtifactStep::Idle;
        }

        let dx = rng.random_range(-CHAOS_SPREAD..=CHAOS_SPREAD);
        let dz = rng.random_range(-CHAOS_SPREAD..=CHAOS_SPREAD);
        let (min_y, max_y) = bounds;
        let y = holder_cell.y.max(min_y).min(max_y);
        self.last_chaos_update = Some(now);

        ArtifactStep::Rerolled(GlobalPos {
            world_key: holder_world.to_owned(),
            pos: BlockPos::new(
                holder_cell.x.saturating_add(dx),
                y,
                holder_cell.z.saturating_add(dz),
            ),
        })
    }
}

fn int(value: u64) -> TagValue {
    TagValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
}

fn text<'a>(tag: &'a TagMap, key: &str) -> Option<&'a str> {
    match tag.get(key)? {
        TagValue::Text(value) => Some(value.as_str()),
        _ => None,
    }
}

fn unsigned(tag: &TagMap, key: &str) -> Option<u64> {
    match tag.get(key)? {
        TagValue::Int(value) => u64::try_from(*value).ok(),
        _ => None,
    }
}

fn coordinate(tag: &TagMap, key: &str) -> Option<i32> {
    match tag.get(key)? {
        TagValue::Int(value) => i32::try_from(*value).ok(),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Host-facing operations
// ---------------------------------------------------------------------------

/// What the controller did for one participant this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactTick {
    /// The participant holds no compass of theirs.
    Absent,
    /// The compass needed no update.
    Idle,
    /// The compass calibrated this tick.
    Calibrated,
    /// The chaotic pointer was re-rolled.
    Rerolled,
}

/// How a reward grant was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantResult {
    /// A new compass was handed over.
    Issued(ArtifactId),
    /// The owned compass was re-issued in place.
    Refreshed(ArtifactId),
}

impl GrantResult {
    /// Identity of the compass the participant now holds.
    pub const fn artifact_id(self) -> ArtifactId {
        match self {
            Self::Issued(id) | Self::Refreshed(id) => id,
        }
    }
}

/// First compass owned by `owner`, non-equipped inventory before off hand.
pub fn find_owned_artifact<E: Environment + ?Sized>(
    env: &E,
    owner: ParticipantId,
) -> Option<(ItemSlot, ArtifactState)> {
    env.artifact_slots(owner).into_iter().find_map(|slot| {
        let state = ArtifactState::from_tag(&env.read_tag(owner, slot)?)?;
        state.is_owned_by(owner).then_some((slot, state))
    })
}

/// Run the compass state machine for one participant.
pub fn tick_artifact<E: Environment + ?Sized, R: Rng>(
    ctx: &mut TickContext<'_, E, R>,
    participant: &ParticipantState,
) -> ArtifactTick {
    let Some((slot, mut state)) = find_owned_artifact(&*ctx.env, participant.id) else {
        return ArtifactTick::Absent;
    };

    let bounds = ctx.env.height_bounds(&participant.world_key);
    let step = state.advance(
        ctx.now,
        &participant.world_key,
        participant.position.block(),
        bounds,
        ctx.config.artifact.chaos_update_ticks,
        ctx.rng,
    );

    match step {
        ArtifactStep::Idle => ArtifactTick::Idle,
        ArtifactStep::Calibrated(pointer) => {
            ctx.env.set_pointer(participant.id, slot, pointer);
            ctx.env.write_tag(participant.id, slot, state.to_tag());
            ctx.env.set_display(participant.id, slot, state.display());
            ctx.env.play_cue(participant.id, Cue::ArtifactCalibrated);
            info!(
                participant = %participant.name,
                artifact = %state.artifact_id,
                target = %state.target.pos,
                "Echo compass calibrated"
            );
            ArtifactTick::Calibrated
        }
        ArtifactStep::Rerolled(pointer) => {
            debug!(participant = %participant.name, pointer = %pointer.pos, "Echo compass re-rolled");
            ctx.env.set_pointer(participant.id, slot, pointer);
            ctx.env.write_tag(participant.id, slot, state.to_tag());
            ArtifactTick::Rerolled
        }
    }
}

/// Hand out (or refresh) the compass for a finished encounter.
pub fn grant_artifact<E: Environment + ?Sized, R: Rng>(
    ctx: &mut TickContext<'_, E, R>,
    participant: &ParticipantState,
    event: &ActiveEvent,
) -> GrantResult {
    let target = GlobalPos {
        world_key: event.world_key.clone(),
        pos: event.target(),
    };
    let delay = ctx.config.artifact.calibration_delay();
    let day = ctx.today();

    if ctx.config.artifact.update_existing
        && let Some((slot, existing)) = find_owned_artifact(&*ctx.env, participant.id)
    {
        let state = ArtifactState::issue(existing.artifact_id, participant, target, ctx.now, day, delay);
        ctx.env.write_tag(participant.id, slot, state.to_tag());
        ctx.env.set_display(participant.id, slot, state.display());
        ctx.env.play_cue(participant.id, Cue::ArtifactGranted);
        info!(
            participant = %participant.name,
            artifact = %state.artifact_id,
            "Echo compass refreshed"
        );
        return GrantResult::Refreshed(state.artifact_id);
    }

    let state = ArtifactState::issue(ArtifactId::new(), participant, target, ctx.now, day, delay);
    ctx.env.give_or_drop(
        participant.id,
        GrantedItem::Artifact {
            artifact_id: state.artifact_id,
            tag: state.to_tag(),
            display: state.display(),
        },
    );
    ctx.env.play_cue(participant.id, Cue::ArtifactGranted);
    info!(
        participant = %participant.name,
        artifact = %state.artifact_id,
        calibrate_at = ?state.calibrate_at,
        "Echo compass issued"
    );
    GrantResult::Issued(state.artifact_id)
}
