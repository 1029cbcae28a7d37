//! Configuration loading and typed config structures for the encounter core.
//!
//! The configuration lives in `tomorrow-config.yaml`. Every field has a
//! default, and [`TomorrowConfig::sanitize`] clamps each value into a safe
//! range before the core ever reads it, so a hand-edited file can make the
//! event boring but never broken.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write the configuration file.
    #[error("failed to access config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse or emit YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `tomorrow-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomorrowConfig {
    /// When and how often encounters start.
    #[serde(default)]
    pub trigger: TriggerConfig,

    /// Where echo points are placed.
    #[serde(default)]
    pub target: TargetConfig,

    /// Phase one: meeting the echo.
    #[serde(default)]
    pub first_visit: FirstVisitConfig,

    /// Phase two: returning the next day.
    #[serde(default)]
    pub tomorrow: TomorrowBranchConfig,

    /// The echo compass reward.
    #[serde(default)]
    pub artifact: ArtifactConfig,

    /// Game time units.
    #[serde(default)]
    pub time: TimeConfig,

    /// Debug switches.
    #[serde(default)]
    pub debug: DebugConfig,

    /// Settings for the standalone engine host.
    #[serde(default)]
    pub host: HostConfig,
}

impl TomorrowConfig {
    /// Load configuration from a YAML file and sanitize it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string and sanitize it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to a mapping.
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.sanitize();
        Ok(config)
    }

    /// Load the file at `path`, falling back to defaults.
    ///
    /// A missing file is created with the (sanitized) defaults. A file that
    /// cannot be read or parsed is logged and left untouched; defaults are
    /// used for this run.
    pub fn load_or_init(path: &Path) -> Self {
        if path.exists() {
            match Self::from_file(path) {
                Ok(config) => return config,
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Failed to read config, using defaults");
                    return Self::default().sanitized();
                }
            }
        }

        let defaults = Self::default().sanitized();
        match defaults.save(path) {
            Ok(()) => info!(path = %path.display(), "Wrote default config"),
            Err(e) => error!(path = %path.display(), error = %e, "Failed to write config"),
        }
        defaults
    }

    /// Write the configuration as YAML, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Consume and return a sanitized copy.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.sanitize();
        self
    }

    /// Clamp every field into its safe range.
    ///
    /// Order matters where one bound depends on another (e.g. the attack
    /// radius must stay outside the vanish radius).
    pub fn sanitize(&mut self) {
        let t = &mut self.trigger;
        t.wake_event_chance = clamp_probability(t.wake_event_chance);
        t.max_encounters_per_participant = t.max_encounters_per_participant.max(1);
        t.cooldown_minutes = t.cooldown_minutes.max(1);

        let g = &mut self.target;
        g.min_distance = g.min_distance.max(16);
        g.max_distance = g.max_distance.max(g.min_distance.saturating_add(1));

        let f = &mut self.first_visit;
        f.spawn_radius = f.spawn_radius.max(8);
        f.vanish_radius = f.vanish_radius.max(1);
        f.attack_radius = f.attack_radius.max(f.vanish_radius.saturating_add(1));
        f.attack_cooldown_ticks = f.attack_cooldown_ticks.max(10);
        f.levels_per_hit = f.levels_per_hit.max(1);

        let b = &mut self.tomorrow;
        b.trigger_radius = b.trigger_radius.max(2);
        b.duration_ticks = b.duration_ticks.max(40);
        b.pulse_ticks = b.pulse_ticks.max(5);
        b.drain_per_pulse = b.drain_per_pulse.max(1);

        let a = &mut self.artifact;
        if a.calibration_delay_ticks >= 0 {
            a.calibration_delay_ticks = a.calibration_delay_ticks.max(40);
        }
        a.chaos_update_ticks = a.chaos_update_ticks.max(1);
        a.reward_chance = clamp_probability(a.reward_chance);

        self.time.ticks_per_day = self.time.ticks_per_day.max(1);
        self.time.ticks_per_second = self.time.ticks_per_second.max(1);
    }

    /// Trigger cooldown converted from minutes to ticks.
    pub fn cooldown_ticks(&self) -> u64 {
        u64::from(self.trigger.cooldown_minutes)
            .saturating_mul(60)
            .saturating_mul(u64::from(self.time.ticks_per_second))
    }
}

/// Clamp a probability into `[0, 1]`, mapping NaN to 0.
fn clamp_probability(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Trigger gating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Probability that waking up starts an encounter.
    #[serde(default = "default_wake_event_chance")]
    pub wake_event_chance: f64,

    /// Lifetime cap on finalized encounters per participant.
    #[serde(default = "default_max_encounters")]
    pub max_encounters_per_participant: u32,

    /// Minimum real minutes (converted to ticks) between two triggers.
    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: u32,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            wake_event_chance: default_wake_event_chance(),
            max_encounters_per_participant: default_max_encounters(),
            cooldown_minutes: default_cooldown_minutes(),
        }
    }
}

/// Echo point placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Minimum planar distance from the participant.
    #[serde(default = "default_min_distance")]
    pub min_distance: u32,

    /// Maximum planar distance from the participant.
    #[serde(default = "default_max_distance")]
    pub max_distance: u32,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            min_distance: default_min_distance(),
            max_distance: default_max_distance(),
        }
    }
}

/// Phase one radii and penalties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstVisitConfig {
    /// Distance to the echo point at which the echo is spawned.
    #[serde(default = "default_spawn_radius")]
    pub spawn_radius: u32,

    /// Distance to the echo at which it vanishes and phase one resolves.
    #[serde(default = "default_vanish_radius")]
    pub vanish_radius: u32,

    /// Distance to the echo at which it drains levels.
    #[serde(default = "default_attack_radius")]
    pub attack_radius: u32,

    /// Ticks between two level drains.
    #[serde(default = "default_attack_cooldown_ticks")]
    pub attack_cooldown_ticks: u32,

    /// Levels taken per drain.
    #[serde(default = "default_levels_per_hit")]
    pub levels_per_hit: u32,
}

impl Default for FirstVisitConfig {
    fn default() -> Self {
        Self {
            spawn_radius: default_spawn_radius(),
            vanish_radius: default_vanish_radius(),
            attack_radius: default_attack_radius(),
            attack_cooldown_ticks: default_attack_cooldown_ticks(),
            levels_per_hit: default_levels_per_hit(),
        }
    }
}

/// Phase two: standing at the echo point on a later day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TomorrowBranchConfig {
    /// Distance to the echo point that counts as "standing there".
    #[serde(default = "default_tomorrow_trigger_radius")]
    pub trigger_radius: u32,

    /// Consecutive ticks in radius needed to resolve.
    #[serde(default = "default_tomorrow_duration_ticks")]
    pub duration_ticks: u32,

    /// Ticks between drain pulses.
    #[serde(default = "default_tomorrow_pulse_ticks")]
    pub pulse_ticks: u32,

    /// Levels taken per pulse.
    #[serde(default = "default_tomorrow_drain_per_pulse")]
    pub drain_per_pulse: u32,
}

impl Default for TomorrowBranchConfig {
    fn default() -> Self {
        Self {
            trigger_radius: default_tomorrow_trigger_radius(),
            duration_ticks: default_tomorrow_duration_ticks(),
            pulse_ticks: default_tomorrow_pulse_ticks(),
            drain_per_pulse: default_tomorrow_drain_per_pulse(),
        }
    }
}

/// Echo compass reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Levels required, and deducted, for the compass.
    #[serde(default = "default_required_levels")]
    pub required_levels: u32,

    /// Ticks until a chaotic compass calibrates. Negative means never.
    #[serde(default = "default_calibration_delay_ticks")]
    pub calibration_delay_ticks: i64,

    /// Ticks between chaotic pointer re-rolls.
    #[serde(default = "default_chaos_update_ticks")]
    pub chaos_update_ticks: u32,

    /// Probability of the reward roll succeeding.
    #[serde(default = "default_reward_chance")]
    pub reward_chance: f64,

    /// Overwrite an already owned compass in place instead of keeping it.
    #[serde(default = "default_true")]
    pub update_existing: bool,
}

impl ArtifactConfig {
    /// Calibration delay in ticks, `None` for "never".
    pub fn calibration_delay(&self) -> Option<u64> {
        u64::try_from(self.calibration_delay_ticks).ok()
    }
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            required_levels: default_required_levels(),
            calibration_delay_ticks: default_calibration_delay_ticks(),
            chaos_update_ticks: default_chaos_update_ticks(),
            reward_chance: default_reward_chance(),
            update_existing: true,
        }
    }
}

/// Game time units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeConfig {
    /// Ticks in one game day.
    #[serde(default = "default_ticks_per_day")]
    pub ticks_per_day: u64,

    /// Ticks per real second, used to convert the trigger cooldown.
    #[serde(default = "default_ticks_per_second")]
    pub ticks_per_second: u32,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            ticks_per_day: default_ticks_per_day(),
            ticks_per_second: default_ticks_per_second(),
        }
    }
}

/// Debug switches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Trigger on any awake tick, ignoring cooldown and the roll.
    #[serde(default)]
    pub force_event: bool,

    /// Log every trigger gate decision at `info` instead of `debug`.
    #[serde(default)]
    pub verbose_logs: bool,
}

/// Settings for the standalone engine host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Timeline file location.
    #[serde(default = "default_state_file")]
    pub state_file: String,

    /// Real-time milliseconds between ticks (0 = as fast as possible).
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Stop after this many ticks (0 = run until interrupted).
    #[serde(default)]
    pub max_ticks: u64,

    /// RNG seed for reproducible runs. Unset means seed from the OS.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Names of the simulated participants.
    #[serde(default = "default_participants")]
    pub participants: Vec<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            tick_interval_ms: default_tick_interval_ms(),
            max_ticks: 0,
            seed: None,
            participants: default_participants(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_wake_event_chance() -> f64 {
    0.25
}

const fn default_max_encounters() -> u32 {
    1
}

const fn default_cooldown_minutes() -> u32 {
    120
}

const fn default_min_distance() -> u32 {
    80
}

const fn default_max_distance() -> u32 {
    400
}

const fn default_spawn_radius() -> u32 {
    24
}

const fn default_vanish_radius() -> u32 {
    3
}

const fn default_attack_radius() -> u32 {
    12
}

const fn default_attack_cooldown_ticks() -> u32 {
    30
}

const fn default_levels_per_hit() -> u32 {
    1
}

const fn default_tomorrow_trigger_radius() -> u32 {
    5
}

const fn default_tomorrow_duration_ticks() -> u32 {
    120
}

const fn default_tomorrow_pulse_ticks() -> u32 {
    20
}

const fn default_tomorrow_drain_per_pulse() -> u32 {
    1
}

const fn default_required_levels() -> u32 {
    10
}

const fn default_calibration_delay_ticks() -> i64 {
    -1
}

const fn default_chaos_update_ticks() -> u32 {
    20
}

const fn default_reward_chance() -> f64 {
    1.0
}

const fn default_ticks_per_day() -> u64 {
    24_000
}

const fn default_ticks_per_second() -> u32 {
    20
}

fn default_state_file() -> String {
    "tomorrow-state.json".to_owned()
}

fn default_participants() -> Vec<String> {
    vec!["Alex".to_owned(), "Sam".to_owned()]
}

const fn default_tick_interval_ms() -> u64 {
    50
}

const fn default_true() -> bool {
    true
}
