//! Headless host for the Tomorrow Echo system.
//!
//! Wires configuration, the timeline store and the encounter runtime
//! together and drives ticks against a scripted sandbox world.
//!
//! # Commands
//!
//! - `run` (default): run a session until the tick limit or Ctrl-C
//! - `inspect`: log every stored participant timeline and exit
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration (`TOMORROW_CONFIG`, default `tomorrow-config.yaml`)
//! 3. Load the timeline store (`TOMORROW_STATE`, default from config)
//! 4. Create the sandbox world and the runtime
//! 5. Run the session
//! 6. Save the store and log the result

mod error;
mod runner;
mod sandbox;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use tomorrow_core::{TomorrowConfig, TomorrowRuntime};
use tomorrow_db::TimelineStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::runner::SessionBounds;
use crate::sandbox::SandboxWorld;

const DEFAULT_CONFIG_PATH: &str = "tomorrow-config.yaml";
const CONFIG_PATH_ENV: &str = "TOMORROW_CONFIG";
const STATE_PATH_ENV: &str = "TOMORROW_STATE";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the command is unknown,
/// or the final save fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let command = std::env::args().nth(1).unwrap_or_else(|| "run".to_owned());
    info!(command, "tomorrow-engine starting");

    // 2. Load configuration.
    let config = load_config()?;
    let state_path = state_path(&config);

    match command.as_str() {
        "run" => run(config, &state_path).await?,
        "inspect" => inspect(&state_path),
        other => {
            return Err(EngineError::Usage {
                command: other.to_owned(),
            }
            .into());
        }
    }

    Ok(())
}

async fn run(config: TomorrowConfig, state_path: &Path) -> Result<(), EngineError> {
    // 3. Load the timeline store.
    let store = Arc::new(TimelineStore::load(state_path));

    // 4. Create the sandbox world and the runtime.
    let rng = config
        .host
        .seed
        .map_or_else(SmallRng::from_os_rng, SmallRng::seed_from_u64);
    let bounds = SessionBounds {
        max_ticks: config.host.max_ticks,
        tick_interval_ms: config.host.tick_interval_ms,
    };
    let mut world = SandboxWorld::new(config.time.ticks_per_day, &config.host.participants);
    world.resume(&store.snapshot());
    let mut runtime = TomorrowRuntime::new(config, Arc::clone(&store), rng);
    info!(
        residents = world.resident_ids().len(),
        ticks_per_day = runtime.config().time.ticks_per_day,
        wake_event_chance = runtime.config().trigger.wake_event_chance,
        force_event = runtime.config().debug.force_event,
        "Sandbox ready, entering tick loop"
    );

    // 5. Run the session.
    let result = runner::run_session(&mut runtime, &mut world, bounds).await?;

    // 6. Save and log.
    runner::log_session_end(&result);
    store.save()?;
    info!(path = %state_path.display(), "tomorrow-engine shutdown complete");
    Ok(())
}

/// Log every stored timeline.
fn inspect(state_path: &Path) {
    let store = TimelineStore::load(state_path);
    if store.is_empty() {
        info!(path = %state_path.display(), "No timelines stored");
        return;
    }

    for (id, data) in store.snapshot() {
        info!(
            participant = %id,
            completed = data.completed_encounters,
            last_trigger_time = ?data.last_trigger_time,
            active = data.active_event.is_some(),
            history = data.history.len(),
            "Timeline"
        );
        if let Some(event) = &data.active_event {
            info!(
                participant = %id,
                name = %event.participant_name,
                world = %event.world_key,
                target = %event.target(),
                created_day = event.created_at_day,
                first_visit_done = event.first_visit_done,
                outcome = %event.resolved_outcome,
                "Active encounter"
            );
        }
        for record in &data.history {
            info!(
                participant = %id,
                world = %record.world_key,
                x = record.x,
                y = record.y,
                z = record.z,
                created_day = record.created_day,
                resolved_day = record.resolved_day,
                outcome = %record.outcome,
                artifact_granted = record.artifact_granted,
                "Past encounter"
            );
        }
    }
}

/// Configuration file location, overridable through the environment.
fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV).map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Timeline file location, overridable through the environment.
fn state_path(config: &TomorrowConfig) -> PathBuf {
    std::env::var_os(STATE_PATH_ENV).map_or_else(|| PathBuf::from(&config.host.state_file), PathBuf::from)
}

/// Load the configuration, writing defaults if the file is missing.
fn load_config() -> Result<TomorrowConfig, EngineError> {
    let path = config_path();
    if path.exists() {
        let config = TomorrowConfig::from_file(&path)?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    } else {
        info!(path = %path.display(), "Config file not found, writing defaults");
        Ok(TomorrowConfig::load_or_init(&path))
    }
}
