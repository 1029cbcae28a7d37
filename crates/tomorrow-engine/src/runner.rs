//! Paced tick loop.
//!
//! [`run_session`] drives [`TomorrowRuntime::run_tick`] against a
//! [`SimulatedWorld`] until the tick limit is reached or the process is
//! interrupted, sleeping `tick_interval_ms` between ticks.

use std::time::Duration;

use rand::Rng;
use tomorrow_core::{Environment, TickSummary, TomorrowRuntime};
use tracing::info;

/// Errors that can occur during a session.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Listening for the interrupt signal failed.
    #[error("signal error: {source}")]
    Signal {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

/// A host world whose clock the engine owns.
pub trait SimulatedWorld: Environment {
    /// Move the world forward by one tick.
    fn advance(&mut self);
}

/// When a session stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionBounds {
    /// Stop after this many ticks (0 = unbounded).
    pub max_ticks: u64,
    /// Real-time pause between ticks.
    pub tick_interval_ms: u64,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEndReason {
    /// The configured tick limit was reached.
    MaxTicksReached,
    /// Ctrl-C was received.
    Interrupted,
}

/// Result of a session.
#[derive(Debug)]
pub struct SessionResult {
    /// Why it ended.
    pub end_reason: SessionEndReason,
    /// Ticks executed.
    pub total_ticks: u64,
    /// Encounters started during the session.
    pub encounters_triggered: u64,
    /// Encounters finalized during the session.
    pub encounters_finalized: u64,
    /// Summary of the last tick, if any ran.
    pub final_summary: Option<TickSummary>,
}

/// Run ticks until a bound is hit.
///
/// # Errors
///
/// Returns [`RunnerError::Signal`] if the interrupt handler cannot be installed.
pub async fn run_session<W: SimulatedWorld, R: Rng>(
    runtime: &mut TomorrowRuntime<R>,
    world: &mut W,
    bounds: SessionBounds,
) -> Result<SessionResult, RunnerError> {
    let mut result = SessionResult {
        end_reason: SessionEndReason::MaxTicksReached,
        total_ticks: 0,
        encounters_triggered: 0,
        encounters_finalized: 0,
        final_summary: None,
    };

    info!(
        max_ticks = bounds.max_ticks,
        tick_interval_ms = bounds.tick_interval_ms,
        start_time = world.current_time(),
        "Session starting"
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let pause = Duration::from_millis(bounds.tick_interval_ms);

    loop {
        let summary = runtime.run_tick(world);
        world.advance();

        result.total_ticks = result.total_ticks.saturating_add(1);
        result.encounters_triggered = result
            .encounters_triggered
            .saturating_add(count(summary.triggered.len()));
        result.encounters_finalized = result
            .encounters_finalized
            .saturating_add(count(summary.finalized.len()));
        result.final_summary = Some(summary);

        if bounds.max_ticks > 0 && result.total_ticks >= bounds.max_ticks {
            info!(max_ticks = bounds.max_ticks, "Tick limit reached");
            result.end_reason = SessionEndReason::MaxTicksReached;
            return Ok(result);
        }

        tokio::select! {
            signal = &mut shutdown => {
                signal?;
                info!("Interrupt received");
                result.end_reason = SessionEndReason::Interrupted;
                return Ok(result);
            }
            () = tokio::time::sleep(pause) => {}
        }
    }
}

fn count(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}

/// Log the end of a session.
pub fn log_session_end(result: &SessionResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        triggered = result.encounters_triggered,
        finalized = result.encounters_finalized,
        final_time = result.final_summary.as_ref().map(|s| s.time),
        "Session ended"
    );
}
