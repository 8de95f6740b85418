#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Event replay engine that applies a recorded simulation to the board.
//!
//! The engine walks the steps of a simulation log in order and applies every
//! event to the authoritative [`Board`]. Each applied event produces exactly
//! one batch of presentation requests on the injected [`PresentationPort`].
//! Events that cannot be applied are logged, recorded in the
//! [`ReplayReport`] and skipped without touching the board.

mod dispatch;
mod pacing;
mod path;

use std::time::Duration;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rescue_replay_core::{
    CancelToken, PresentationPort, ReplayError, ReplayEvent, StatsSnapshot, Step,
};
use rescue_replay_system_stats::StatsTracker;
use rescue_replay_world::Board;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use pacing::{InstantPacer, Pacer, ThreadPacer, DEFAULT_FRAME};
pub use path::{has_arrived, resume_index, ARRIVAL_EPSILON};

/// Default delay between two consecutive events.
pub const DEFAULT_EVENT_DELAY: Duration = Duration::from_secs(1);

/// Default number of cosmetic victim variants.
pub const DEFAULT_VICTIM_VARIANTS: u8 = 4;

/// Tunables of a replay run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayConfig {
    /// Pause inserted after every applied event.
    pub event_delay: Duration,
    /// Number of cosmetic variants a revealed victim is drawn from.
    pub victim_variants: u8,
    /// Seed of the cosmetic random number generator.
    pub seed: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            event_delay: DEFAULT_EVENT_DELAY,
            victim_variants: DEFAULT_VICTIM_VARIANTS,
            seed: 0,
        }
    }
}

/// Lifecycle of a replay engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    /// Created, no event applied yet.
    Idle,
    /// Applying events.
    Running,
    /// Terminal; the engine never runs again.
    Finished,
}

/// Fatal misuse of the replay engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum EngineError {
    /// `run` was called on an engine that already finished.
    #[error("replay already finished")]
    AlreadyFinished,
}

/// Event that was rejected during a replay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedEvent {
    /// Turn the event belonged to.
    pub turn: u32,
    /// Kind of the rejected event.
    pub kind: &'static str,
    /// Reason the event was rejected.
    pub error: ReplayError,
}

/// Outcome of a replay run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Number of events applied, waypoint actions included.
    pub applied: usize,
    /// Events rejected, in the order they were encountered.
    pub skipped: Vec<SkippedEvent>,
    /// Whether the run stopped because cancellation was requested.
    pub cancelled: bool,
    /// Counters at the end of the run.
    pub stats: StatsSnapshot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Progress {
    Continue,
    Cancelled,
}

/// Replays simulation steps against a board and a presentation port.
pub struct ReplayEngine<P, R = ChaCha8Rng> {
    board: Board,
    port: P,
    rng: R,
    pacer: Box<dyn Pacer>,
    cancel: CancelToken,
    config: ReplayConfig,
    stats: StatsTracker,
    state: EngineState,
    report: ReplayReport,
}

impl<P: PresentationPort> ReplayEngine<P, ChaCha8Rng> {
    /// Creates an engine whose cosmetic RNG is seeded from `config.seed`.
    #[must_use]
    pub fn new(board: Board, port: P, config: ReplayConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self::with_rng(board, port, config, rng)
    }
}

impl<P: PresentationPort, R: RngCore> ReplayEngine<P, R> {
    /// Creates an engine with an explicit cosmetic RNG.
    #[must_use]
    pub fn with_rng(board: Board, port: P, config: ReplayConfig, rng: R) -> Self {
        Self {
            board,
            port,
            rng,
            pacer: Box::new(ThreadPacer::default()),
            cancel: CancelToken::new(),
            config,
            stats: StatsTracker::new(),
            state: EngineState::Idle,
            report: ReplayReport::default(),
        }
    }

    /// Replaces the pacer used between events and arrival polls.
    #[must_use]
    pub fn with_pacer(mut self, pacer: impl Pacer + 'static) -> Self {
        self.pacer = Box::new(pacer);
        self
    }

    /// Replaces the cancellation token observed by the engine.
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops the replay when cancelled.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Read-only access to the board.
    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Read-only access to the presentation port.
    #[must_use]
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Latest counter values.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Consumes the engine and returns the board and the presentation port.
    pub fn into_parts(self) -> (Board, P) {
        (self.board, self.port)
    }

    /// Applies every event of `steps` in order.
    ///
    /// The engine moves from `Idle` to `Running` on the first call and is
    /// `Finished` once the steps are exhausted or cancellation is observed.
    /// Calling `run` again afterwards fails with [`EngineError::AlreadyFinished`].
    pub fn run<I>(&mut self, steps: I) -> Result<ReplayReport, EngineError>
    where
        I: IntoIterator<Item = Step>,
    {
        if self.state == EngineState::Finished {
            return Err(EngineError::AlreadyFinished);
        }

        self.state = EngineState::Running;
        info!(
            width = self.board.width(),
            height = self.board.height(),
            "replay_started"
        );

        'steps: for step in steps {
            debug!(turn = step.turn, events = step.events.len(), "turn_started");
            for event in step.events {
                if self.cancel.is_cancelled() {
                    break 'steps;
                }

                let applied_before = self.report.applied;
                let progress = self.process(step.turn, event);

                if progress == Progress::Cancelled || self.cancel.is_cancelled() {
                    break 'steps;
                }
                if self.report.applied > applied_before {
                    self.pacer.pause(self.config.event_delay);
                }
            }
        }

        self.state = EngineState::Finished;
        self.report.cancelled = self.cancel.is_cancelled();
        self.report.stats = self.stats.snapshot();
        info!(
            applied = self.report.applied,
            skipped = self.report.skipped.len(),
            cancelled = self.report.cancelled,
            casualties = self.report.stats.casualties,
            damage = self.report.stats.damage,
            saved = self.report.stats.saved,
            "replay_finished"
        );

        Ok(self.report.clone())
    }

    /// Applies one event, recording it as applied or skipped.
    pub(crate) fn process(&mut self, turn: u32, event: ReplayEvent) -> Progress {
        let kind = event.kind();
        match self.apply(turn, &event) {
            Ok(progress) => {
                self.report.applied += 1;
                debug!(turn, kind, "event_applied");
                self.publish_stats(&event);
                progress
            }
            Err(error) => {
                self.skip(turn, kind, error);
                Progress::Continue
            }
        }
    }

    pub(crate) fn skip(&mut self, turn: u32, kind: &'static str, error: ReplayError) {
        warn!(turn, kind, %error, "event_skipped");
        self.report.skipped.push(SkippedEvent { turn, kind, error });
    }

    fn publish_stats(&mut self, event: &ReplayEvent) {
        let mut published = Vec::new();
        self.stats
            .handle(std::slice::from_ref(event), &mut published);
        for snapshot in published {
            self.port.on_stats_changed(snapshot);
        }
    }
}
