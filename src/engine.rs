//! The session state machine.
//!
//! ```text
//! Setup -> Paused <-> ActiveFocus <-> ActiveDistraction
//!            |            |                 |
//!            +------> AwaitingCompletion <--+
//!                         |
//!                         +-> Setup (Completed / NotCompleted)
//!                         +-> Paused (Cancel)
//! ```
//!
//! Commands that make no sense in the current state are silent no-ops and
//! return `false`. Only the storage boundary produces errors.

use crate::models::{
    CompletionOutcome, EngineConfig, Mode, Phase, SessionRecord, TimerState, Turn,
};
use crate::persistence::{SessionStore, StorageError};
use crate::timer::{ClockSource, TickHandle};
use std::sync::mpsc::{self, Receiver, Sender};

/// Change notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    StateChanged(TimerState),
    /// Focus time ran out; the completion prompt is now pending.
    TimeUp,
    SessionSaved(SessionRecord),
    /// Nothing was measured, so nothing was written.
    SessionDiscarded,
    StorageFailed(String),
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The clock was not running.
    Idle,
    Advanced,
    /// Focus time reached zero and the session now awaits a decision.
    TimeUp,
}

/// How a completion prompt was resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Saved(SessionRecord),
    Discarded,
    Cancelled,
    /// No completion was pending.
    Ignored,
}

pub struct TimerEngine<C: ClockSource, S: SessionStore> {
    state: TimerState,
    config: EngineConfig,
    clock: C,
    store: S,
    ticker: Option<TickHandle>,
    next_generation: u64,
    subscribers: Vec<Sender<EngineEvent>>,
}

impl<C: ClockSource, S: SessionStore> TimerEngine<C, S> {
    /// Creates an engine in Setup. The planned duration never drops below one
    /// second, whatever the configured minimum.
    pub fn new(config: EngineConfig, clock: C, store: S) -> Self {
        let config = EngineConfig {
            minimum_target_secs: config.minimum_target_secs.max(1),
            ..config
        };
        let target = config.initial_target_secs.max(config.minimum_target_secs);
        Self {
            state: TimerState::setup(target),
            config,
            clock,
            store,
            ticker: None,
            next_generation: 0,
            subscribers: Vec::new(),
        }
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Generation of the live ticker, if any.
    #[cfg(test)]
    pub fn ticker_generation(&self) -> Option<u64> {
        self.ticker.as_ref().map(TickHandle::generation)
    }

    /// Registers a listener for engine events.
    pub fn subscribe(&mut self) -> Receiver<EngineEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Changes the planned duration by `delta_secs`. Only valid in Setup.
    pub fn adjust_target_duration(&mut self, delta_secs: i64) -> bool {
        if self.state.mode != Mode::Setup {
            return false;
        }

        let current = self.state.target_duration;
        let adjusted = if delta_secs >= 0 {
            current.saturating_add(delta_secs.unsigned_abs())
        } else {
            current.saturating_sub(delta_secs.unsigned_abs())
        };
        let target = adjusted.max(self.config.minimum_target_secs);
        if target == self.state.target_duration {
            return false;
        }

        self.state.target_duration = target;
        self.state.work_time_left = target;
        tracing::debug!(target: "chessbar::engine", target_secs = target, "Target duration adjusted");
        self.notify_state();
        true
    }

    /// Leaves Setup with the clock initialized but not ticking.
    pub fn start_session(&mut self) -> bool {
        if self.state.mode != Mode::Setup {
            return false;
        }

        self.state.work_time_left = self.state.target_duration;
        self.state.distraction_time_elapsed = 0;
        self.state.turn = Turn::Focus;
        self.state.completion_pending = false;
        self.state.running = false;
        self.state.mode = Mode::Active;
        tracing::info!(target: "chessbar::engine", target_secs = self.state.target_duration, "Session started");
        self.notify_state();
        true
    }

    /// Resumes a paused clock, or presses the chess-clock button on a running one.
    pub fn toggle_timer(&mut self) -> bool {
        if self.state.mode != Mode::Active || self.state.completion_pending {
            return false;
        }

        if self.state.running {
            self.state.turn = self.state.turn.flipped();
            tracing::debug!(target: "chessbar::engine", turn = ?self.state.turn, "Turn switched");
        } else {
            self.state.running = true;
            self.start_ticker();
            tracing::debug!(target: "chessbar::engine", turn = ?self.state.turn, "Clock resumed");
        }
        self.notify_state();
        true
    }

    pub fn pause(&mut self) -> bool {
        if !self.state.running {
            return false;
        }
        self.stop_ticker();
        self.state.running = false;
        self.notify_state();
        true
    }

    /// Stops the clock and asks whether the task was completed.
    pub fn request_finish(&mut self) -> bool {
        if self.state.mode != Mode::Active || self.state.completion_pending {
            return false;
        }
        self.stop_ticker();
        self.state.running = false;
        self.state.completion_pending = true;
        tracing::debug!(target: "chessbar::engine", "Completion requested");
        self.notify_state();
        true
    }

    /// Answers the completion prompt.
    ///
    /// On `Completed`/`NotCompleted` the engine always returns to Setup, even
    /// when saving fails; the storage error is returned afterwards.
    pub fn resolve_completion(
        &mut self,
        outcome: CompletionOutcome,
    ) -> Result<Resolution, StorageError> {
        if !self.state.completion_pending {
            return Ok(Resolution::Ignored);
        }

        if outcome == CompletionOutcome::Cancel {
            self.state.completion_pending = false;
            self.notify_state();
            return Ok(Resolution::Cancelled);
        }

        let record = SessionRecord {
            date: self.clock.now(),
            focus_seconds: self.state.focus_elapsed(),
            distraction_seconds: self.state.distraction_time_elapsed,
            estimated_seconds: self.state.target_duration,
            completed: outcome == CompletionOutcome::Completed,
        };

        let saved = if record.is_empty() {
            tracing::info!(target: "chessbar::engine", "Empty session discarded");
            self.emit(EngineEvent::SessionDiscarded);
            Ok(Resolution::Discarded)
        } else {
            match self.store.save(&record) {
                Ok(()) => {
                    tracing::info!(
                        target: "chessbar::engine",
                        focus = record.focus_seconds,
                        distraction = record.distraction_seconds,
                        completed = record.completed,
                        "Session saved"
                    );
                    self.emit(EngineEvent::SessionSaved(record.clone()));
                    Ok(Resolution::Saved(record))
                }
                Err(e) => {
                    tracing::warn!(target: "chessbar::engine", error = %e, "Failed to save session");
                    self.emit(EngineEvent::StorageFailed(e.to_string()));
                    Err(e)
                }
            }
        };

        self.reset();
        saved
    }

    /// Abandons any session and returns to Setup without saving.
    pub fn reset(&mut self) -> bool {
        self.stop_ticker();
        let fresh = TimerState::setup(self.state.target_duration);
        if self.state == fresh {
            return false;
        }
        self.state = fresh;
        self.notify_state();
        true
    }

    /// Advances the running counter by one second.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.state.running {
            return TickOutcome::Idle;
        }

        match self.state.turn {
            Turn::Focus => {
                if self.state.work_time_left > 0 {
                    self.state.work_time_left -= 1;
                }
                if self.state.work_time_left == 0 {
                    self.time_up();
                    return TickOutcome::TimeUp;
                }
            }
            Turn::Distraction => {
                self.state.distraction_time_elapsed += 1;
            }
        }
        self.notify_state();
        TickOutcome::Advanced
    }

    /// Handles a pulse from the clock source; stale generations are ignored.
    pub fn on_pulse(&mut self, generation: u64) -> TickOutcome {
        let live = self
            .ticker
            .as_ref()
            .is_some_and(|h| h.generation() == generation && !h.is_cancelled());
        if !live {
            tracing::trace!(target: "chessbar::engine", generation, "Ignoring stale pulse");
            return TickOutcome::Idle;
        }
        self.tick()
    }

    // ── Internals ────────────────────────────────────────────────────

    fn time_up(&mut self) {
        self.stop_ticker();
        self.state.running = false;
        self.state.completion_pending = true;
        tracing::info!(target: "chessbar::engine", "Focus time is up");
        self.emit(EngineEvent::TimeUp);
        self.notify_state();
    }

    fn start_ticker(&mut self) {
        self.stop_ticker();
        self.next_generation += 1;
        self.ticker = Some(self.clock.start_ticker(self.next_generation));
    }

    fn stop_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.cancel();
        }
    }

    fn notify_state(&mut self) {
        let state = self.state.clone();
        self.emit(EngineEvent::StateChanged(state));
    }

    fn emit(&mut self, event: EngineEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use chrono::{DateTime, Local, TimeZone};

    /// Clock whose pulses are driven by the test itself.
    struct ManualClock {
        now: DateTime<Local>,
        /// Clones of every handle handed out; they share the cancel flag.
        handles: Vec<TickHandle>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                now: Local.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap(),
                handles: Vec::new(),
            }
        }
    }

    impl ClockSource for ManualClock {
        fn now(&self) -> DateTime<Local> {
            self.now
        }

        fn start_ticker(&mut self, generation: u64) -> TickHandle {
            let handle = TickHandle::new(generation);
            self.handles.push(handle.clone());
            handle
        }
    }

    /// Store that always fails.
    struct FailingStore;

    impl SessionStore for FailingStore {
        fn save(&mut self, _record: &SessionRecord) -> Result<(), StorageError> {
            Err(StorageError::DirectoryCreation)
        }

        fn load_all(&self) -> Result<Vec<SessionRecord>, StorageError> {
            Ok(Vec::new())
        }

        fn delete(&mut self, _record: &SessionRecord) -> Result<(), StorageError> {
            Ok(())
        }
    }

    fn config(target: u64, minimum: u64) -> EngineConfig {
        EngineConfig {
            initial_target_secs: target,
            minimum_target_secs: minimum,
        }
    }

    fn create_test_engine() -> TimerEngine<ManualClock, MemoryStore> {
        TimerEngine::new(EngineConfig::default(), ManualClock::new(), MemoryStore::new())
    }

    fn saved(engine: &TimerEngine<ManualClock, MemoryStore>) -> Vec<SessionRecord> {
        engine.store().load_all().unwrap()
    }

    #[test]
    fn test_engine_initial_state() {
        let engine = create_test_engine();
        assert_eq!(engine.phase(), Phase::Setup);
        assert_eq!(engine.state(), &TimerState::setup(1500));
        assert_eq!(engine.ticker_generation(), None);
    }

    #[test]
    fn test_initial_target_respects_minimum() {
        let engine = TimerEngine::new(config(5, 60), ManualClock::new(), MemoryStore::new());
        assert_eq!(engine.state().target_duration, 60);
    }

    #[test]
    fn test_zero_minimum_still_keeps_target_positive() {
        let mut engine =
            TimerEngine::new(config(300, 0), ManualClock::new(), MemoryStore::new());
        assert!(engine.adjust_target_duration(-600));
        assert_eq!(engine.state().target_duration, 1);
        assert_eq!(engine.state().work_time_left, 1);

        assert!(!engine.adjust_target_duration(-i64::MAX));
        assert_eq!(engine.state().target_duration, 1);

        let engine = TimerEngine::new(config(0, 0), ManualClock::new(), MemoryStore::new());
        assert_eq!(engine.state().target_duration, 1);
    }

    #[test]
    fn test_adjust_saturates_on_huge_targets() {
        let mut engine =
            TimerEngine::new(config(u64::MAX, 60), ManualClock::new(), MemoryStore::new());
        assert!(!engine.adjust_target_duration(300));
        assert_eq!(engine.state().target_duration, u64::MAX);

        assert!(engine.adjust_target_duration(-300));
        assert_eq!(engine.state().target_duration, u64::MAX - 300);

        assert!(engine.adjust_target_duration(i64::MIN));
        assert_eq!(engine.state().target_duration, u64::MAX - 300 - (1u64 << 63));
    }

    #[test]
    fn test_adjust_in_setup_tracks_work_time() {
        let mut engine = create_test_engine();
        assert!(engine.adjust_target_duration(300));
        assert_eq!(engine.state().target_duration, 1800);
        assert_eq!(engine.state().work_time_left, 1800);

        assert!(engine.adjust_target_duration(-600));
        assert_eq!(engine.state().target_duration, 1200);
        assert_eq!(engine.state().work_time_left, 1200);
    }

    #[test]
    fn test_adjust_clamps_to_minimum() {
        let mut engine = create_test_engine();
        engine.adjust_target_duration(-1800);
        assert_eq!(engine.state().target_duration, 60);

        // Already at the floor: nothing changes
        assert!(!engine.adjust_target_duration(-300));
        assert_eq!(engine.state().target_duration, 60);

        engine.adjust_target_duration(i64::MIN);
        assert_eq!(engine.state().target_duration, 60);
    }

    #[test]
    fn test_adjust_has_no_ceiling() {
        let mut engine = create_test_engine();
        for _ in 0..10 {
            engine.adjust_target_duration(1800);
        }
        assert_eq!(engine.state().target_duration, 1500 + 10 * 1800);
    }

    #[test]
    fn test_target_never_below_minimum_for_any_sequence() {
        let mut engine = create_test_engine();
        let deltas = [-300, -600, 1800, -1800, -1800, 300, -300, -600, 600, -1800];
        for delta in deltas {
            engine.adjust_target_duration(delta);
            assert!(engine.state().target_duration >= 60);
            assert_eq!(engine.state().work_time_left, engine.state().target_duration);
        }
    }

    #[test]
    fn test_adjust_ignored_outside_setup() {
        let mut engine = create_test_engine();
        engine.start_session();
        let before = engine.state().clone();

        assert!(!engine.adjust_target_duration(300));
        assert_eq!(engine.state(), &before);

        engine.toggle_timer();
        let before = engine.state().clone();
        assert!(!engine.adjust_target_duration(-300));
        assert_eq!(engine.state(), &before);

        engine.request_finish();
        let before = engine.state().clone();
        assert!(!engine.adjust_target_duration(600));
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn test_start_session_goes_to_paused() {
        let mut engine = create_test_engine();
        engine.adjust_target_duration(300);
        assert!(engine.start_session());

        let state = engine.state();
        assert_eq!(engine.phase(), Phase::Paused);
        assert_eq!(state.mode, Mode::Active);
        assert!(!state.running);
        assert_eq!(state.turn, Turn::Focus);
        assert_eq!(state.work_time_left, 1800);
        assert_eq!(state.distraction_time_elapsed, 0);
        assert!(!state.completion_pending);
        assert_eq!(engine.ticker_generation(), None);

        // A second start is ignored
        assert!(!engine.start_session());
    }

    #[test]
    fn test_toggle_ignored_in_setup() {
        let mut engine = create_test_engine();
        assert!(!engine.toggle_timer());
        assert_eq!(engine.phase(), Phase::Setup);
        assert_eq!(engine.tick(), TickOutcome::Idle);
    }

    #[test]
    fn test_first_toggle_resumes_into_focus() {
        let mut engine = create_test_engine();
        engine.start_session();
        assert!(engine.toggle_timer());
        assert_eq!(engine.phase(), Phase::ActiveFocus);
        assert_eq!(engine.ticker_generation(), Some(1));
    }

    #[test]
    fn test_toggle_while_running_switches_turn_without_stopping() {
        let mut engine = create_test_engine();
        engine.start_session();
        engine.toggle_timer();
        engine.tick();
        engine.tick();

        engine.toggle_timer();
        assert_eq!(engine.phase(), Phase::ActiveDistraction);
        // Same ticker keeps going
        assert_eq!(engine.ticker_generation(), Some(1));
        // Counters are untouched by the switch
        assert_eq!(engine.state().work_time_left, 1498);
        assert_eq!(engine.state().distraction_time_elapsed, 0);

        engine.tick();
        assert_eq!(engine.state().distraction_time_elapsed, 1);

        engine.toggle_timer();
        assert_eq!(engine.phase(), Phase::ActiveFocus);
    }

    #[test]
    fn test_toggle_on_paused_clock_resumes_current_turn() {
        let mut engine = create_test_engine();
        engine.start_session();
        engine.toggle_timer();
        engine.toggle_timer(); // now Distraction
        engine.pause();
        assert_eq!(engine.phase(), Phase::Paused);

        // Resumes instead of switching turns
        engine.toggle_timer();
        assert_eq!(engine.phase(), Phase::ActiveDistraction);
    }

    #[test]
    fn test_exactly_one_counter_advances_per_tick() {
        let mut engine = create_test_engine();
        engine.start_session();
        engine.toggle_timer();

        let toggles_at = [3, 4, 9, 15, 16, 17, 30];
        for i in 0..40 {
            if toggles_at.contains(&i) {
                engine.toggle_timer();
            }
            let before = engine.state().clone();
            engine.tick();
            let after = engine.state();

            let focus_step = before.work_time_left - after.work_time_left;
            let distraction_step = after.distraction_time_elapsed - before.distraction_time_elapsed;
            assert_eq!(focus_step + distraction_step, 1);
        }

        let state = engine.state();
        assert_eq!(state.focus_elapsed() + state.distraction_time_elapsed, 40);
    }

    #[test]
    fn test_pause_stops_counting() {
        let mut engine = create_test_engine();
        engine.start_session();
        engine.toggle_timer();
        for _ in 0..10 {
            engine.tick();
        }

        assert!(engine.pause());
        assert_eq!(engine.phase(), Phase::Paused);
        assert_eq!(engine.ticker_generation(), None);
        let remaining = engine.state().work_time_left;

        assert_eq!(engine.tick(), TickOutcome::Idle);
        assert_eq!(engine.state().work_time_left, remaining);

        // Pausing a paused clock is a no-op
        assert!(!engine.pause());
    }

    #[test]
    fn test_restart_uses_new_generation_and_ignores_stale_pulses() {
        let mut engine = create_test_engine();
        engine.start_session();
        engine.toggle_timer();
        let first = engine.ticker_generation().unwrap();

        engine.pause();
        engine.toggle_timer();
        let second = engine.ticker_generation().unwrap();
        assert_ne!(first, second);

        let before = engine.state().work_time_left;
        assert_eq!(engine.on_pulse(first), TickOutcome::Idle);
        assert_eq!(engine.state().work_time_left, before);

        assert_eq!(engine.on_pulse(second), TickOutcome::Advanced);
        assert_eq!(engine.state().work_time_left, before - 1);
    }

    #[test]
    fn test_pulse_after_pause_is_ignored() {
        let mut engine = create_test_engine();
        engine.start_session();
        engine.toggle_timer();
        let generation = engine.ticker_generation().unwrap();
        engine.pause();

        assert_eq!(engine.on_pulse(generation), TickOutcome::Idle);
        assert_eq!(engine.state().work_time_left, 1500);
    }

    #[test]
    fn test_request_finish_from_running() {
        let mut engine = create_test_engine();
        engine.start_session();
        engine.toggle_timer();
        engine.tick();

        assert!(engine.request_finish());
        assert_eq!(engine.phase(), Phase::AwaitingCompletion);
        assert!(!engine.state().running);
        assert_eq!(engine.ticker_generation(), None);

        // Toggling is locked while a decision is pending
        assert!(!engine.toggle_timer());
        assert_eq!(engine.phase(), Phase::AwaitingCompletion);
    }

    #[test]
    fn test_request_finish_from_paused() {
        let mut engine = create_test_engine();
        engine.start_session();
        assert!(engine.request_finish());
        assert_eq!(engine.phase(), Phase::AwaitingCompletion);
    }

    #[test]
    fn test_request_finish_ignored_in_setup() {
        let mut engine = create_test_engine();
        assert!(!engine.request_finish());
        assert_eq!(engine.phase(), Phase::Setup);
    }

    #[test]
    fn test_round_trip_saves_one_record() {
        let mut engine = create_test_engine();
        engine.start_session();
        engine.toggle_timer();
        for _ in 0..42 {
            engine.tick();
        }
        engine.request_finish();

        let resolution = engine
            .resolve_completion(CompletionOutcome::Completed)
            .unwrap();

        let records = saved(&engine);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.focus_seconds, 42);
        assert_eq!(record.distraction_seconds, 0);
        assert_eq!(record.estimated_seconds, 1500);
        assert!(record.completed);
        assert_eq!(record.date, Local.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap());
        assert_eq!(resolution, Resolution::Saved(record.clone()));

        assert_eq!(engine.phase(), Phase::Setup);
        assert_eq!(engine.state(), &TimerState::setup(1500));
    }

    #[test]
    fn test_not_completed_records_distraction() {
        let mut engine = create_test_engine();
        engine.start_session();
        engine.toggle_timer();
        for _ in 0..5 {
            engine.tick();
        }
        engine.toggle_timer();
        for _ in 0..7 {
            engine.tick();
        }
        engine.request_finish();
        engine
            .resolve_completion(CompletionOutcome::NotCompleted)
            .unwrap();

        let records = saved(&engine);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].focus_seconds, 5);
        assert_eq!(records[0].distraction_seconds, 7);
        assert_eq!(records[0].total_seconds(), 12);
        assert!(!records[0].completed);
    }

    #[test]
    fn test_cancel_returns_to_paused_and_preserves_state() {
        let mut engine = create_test_engine();
        engine.start_session();
        engine.toggle_timer();
        for _ in 0..3 {
            engine.tick();
        }
        engine.request_finish();

        let resolution = engine.resolve_completion(CompletionOutcome::Cancel).unwrap();
        assert_eq!(resolution, Resolution::Cancelled);
        assert_eq!(engine.phase(), Phase::Paused);
        assert_eq!(engine.state().work_time_left, 1497);
        assert!(saved(&engine).is_empty());

        // And the session can continue
        engine.toggle_timer();
        assert_eq!(engine.phase(), Phase::ActiveFocus);
    }

    #[test]
    fn test_degenerate_session_is_not_saved() {
        let mut engine = create_test_engine();
        engine.start_session();
        engine.request_finish();

        let resolution = engine
            .resolve_completion(CompletionOutcome::Completed)
            .unwrap();
        assert_eq!(resolution, Resolution::Discarded);
        assert!(saved(&engine).is_empty());
        assert_eq!(engine.phase(), Phase::Setup);
    }

    #[test]
    fn test_resolve_without_pending_is_ignored() {
        let mut engine = create_test_engine();
        engine.start_session();
        engine.toggle_timer();
        engine.tick();

        let resolution = engine
            .resolve_completion(CompletionOutcome::Completed)
            .unwrap();
        assert_eq!(resolution, Resolution::Ignored);
        assert_eq!(engine.phase(), Phase::ActiveFocus);
        assert!(saved(&engine).is_empty());
    }

    #[test]
    fn test_second_resolution_cannot_save_twice() {
        let mut engine = create_test_engine();
        engine.start_session();
        engine.toggle_timer();
        engine.tick();
        engine.request_finish();

        engine
            .resolve_completion(CompletionOutcome::Completed)
            .unwrap();
        let again = engine
            .resolve_completion(CompletionOutcome::NotCompleted)
            .unwrap();

        assert_eq!(again, Resolution::Ignored);
        assert_eq!(saved(&engine).len(), 1);
    }

    #[test]
    fn test_reset_happens_even_when_save_fails() {
        let mut engine = TimerEngine::new(EngineConfig::default(), ManualClock::new(), FailingStore);
        let events = engine.subscribe();
        engine.start_session();
        engine.toggle_timer();
        engine.tick();
        engine.request_finish();

        let result = engine.resolve_completion(CompletionOutcome::Completed);
        assert!(matches!(result, Err(StorageError::DirectoryCreation)));
        assert_eq!(engine.phase(), Phase::Setup);
        assert_eq!(engine.state(), &TimerState::setup(1500));

        let failures: Vec<_> = events
            .try_iter()
            .filter(|e| matches!(e, EngineEvent::StorageFailed(_)))
            .collect();
        assert_eq!(failures.len(), 1);
    }

    #[test]
    fn test_auto_finish_when_focus_runs_out() {
        let mut engine = TimerEngine::new(config(5, 1), ManualClock::new(), MemoryStore::new());
        engine.start_session();
        engine.toggle_timer();

        let outcomes: Vec<_> = (0..5).map(|_| engine.tick()).collect();
        assert_eq!(&outcomes[..4], &[TickOutcome::Advanced; 4]);
        assert_eq!(outcomes[4], TickOutcome::TimeUp);

        assert_eq!(engine.phase(), Phase::AwaitingCompletion);
        assert_eq!(engine.state().work_time_left, 0);
        assert_eq!(engine.ticker_generation(), None);
    }

    #[test]
    fn test_auto_finish_resolves_like_manual_finish() {
        let mut engine = TimerEngine::new(config(5, 1), ManualClock::new(), MemoryStore::new());
        engine.start_session();
        engine.toggle_timer();
        for _ in 0..5 {
            engine.tick();
        }

        engine
            .resolve_completion(CompletionOutcome::Completed)
            .unwrap();
        let records = saved(&engine);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].focus_seconds, 5);
        assert_eq!(records[0].estimated_seconds, 5);
    }

    #[test]
    fn test_cancel_after_time_up_then_resume_finishes_again() {
        let mut engine = TimerEngine::new(config(2, 1), ManualClock::new(), MemoryStore::new());
        engine.start_session();
        engine.toggle_timer();
        engine.tick();
        engine.tick();
        engine.resolve_completion(CompletionOutcome::Cancel).unwrap();
        assert_eq!(engine.phase(), Phase::Paused);

        engine.toggle_timer();
        assert_eq!(engine.tick(), TickOutcome::TimeUp);
        assert_eq!(engine.phase(), Phase::AwaitingCompletion);
    }

    #[test]
    fn test_distraction_time_is_unbounded() {
        let mut engine = TimerEngine::new(config(5, 1), ManualClock::new(), MemoryStore::new());
        engine.start_session();
        engine.toggle_timer();
        engine.toggle_timer();
        for _ in 0..100 {
            assert_eq!(engine.tick(), TickOutcome::Advanced);
        }
        assert_eq!(engine.state().distraction_time_elapsed, 100);
        assert_eq!(engine.state().work_time_left, 5);
    }

    #[test]
    fn test_reset_discards_without_saving() {
        let mut engine = create_test_engine();
        engine.adjust_target_duration(600);
        engine.start_session();
        engine.toggle_timer();
        for _ in 0..20 {
            engine.tick();
        }

        assert!(engine.reset());
        assert_eq!(engine.state(), &TimerState::setup(2100));
        assert_eq!(engine.ticker_generation(), None);
        assert!(saved(&engine).is_empty());
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut engine = create_test_engine();
        engine.start_session();
        engine.toggle_timer();
        engine.tick();

        engine.reset();
        let once = engine.state().clone();
        assert!(!engine.reset());
        assert_eq!(engine.state(), &once);
    }

    #[test]
    fn test_events_are_emitted() {
        let mut engine = TimerEngine::new(config(1, 1), ManualClock::new(), MemoryStore::new());
        let events = engine.subscribe();

        engine.start_session();
        engine.toggle_timer();
        engine.tick();
        engine
            .resolve_completion(CompletionOutcome::Completed)
            .unwrap();

        let events: Vec<_> = events.try_iter().collect();
        assert!(events.contains(&EngineEvent::TimeUp));
        assert!(events
            .iter()
            .any(|e| matches!(e, EngineEvent::SessionSaved(r) if r.focus_seconds == 1)));
        assert_eq!(
            events.last(),
            Some(&EngineEvent::StateChanged(TimerState::setup(1)))
        );
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let mut engine = create_test_engine();
        let rx = engine.subscribe();
        drop(rx);
        engine.start_session();
        assert!(engine.subscribers.is_empty());
    }

    #[test]
    fn test_each_restart_cancels_the_previous_ticker() {
        let mut engine = create_test_engine();
        engine.start_session();
        engine.toggle_timer();
        engine.toggle_timer(); // switch, no new ticker
        engine.pause();
        engine.toggle_timer();
        engine.request_finish();
        engine.resolve_completion(CompletionOutcome::Cancel).unwrap();
        engine.toggle_timer();

        let handles = &engine.clock.handles;
        let generations: Vec<_> = handles.iter().map(TickHandle::generation).collect();
        assert_eq!(generations, vec![1, 2, 3]);
        assert!(handles[0].is_cancelled());
        assert!(handles[1].is_cancelled());
        assert!(!handles[2].is_cancelled());

        engine.reset();
        assert!(engine.clock.handles[2].is_cancelled());
    }
}
