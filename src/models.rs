//! Data models for the Chessbar application.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Default planned duration of a session (25 minutes).
pub const DEFAULT_TARGET_SECS: u64 = 25 * 60;
/// Shortest duration a session can be adjusted down to.
pub const DEFAULT_MINIMUM_TARGET_SECS: u64 = 60;

/// A finished session, as written to the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// When the session ended.
    pub date: DateTime<Local>,
    pub focus_seconds: u64,
    pub distraction_seconds: u64,
    /// The duration the user planned for the task.
    pub estimated_seconds: u64,
    /// Whether the user marked the task as done.
    pub completed: bool,
}

impl SessionRecord {
    /// Focus plus distraction time.
    pub fn total_seconds(&self) -> u64 {
        self.focus_seconds + self.distraction_seconds
    }

    /// True when nothing was measured; such sessions are never persisted.
    pub fn is_empty(&self) -> bool {
        self.total_seconds() == 0
    }
}

/// Whether the user is choosing a duration or running a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Setup,
    Active,
}

/// Which half of the chess clock is counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Turn {
    /// Work time counts down.
    #[default]
    Focus,
    /// Distraction time counts up.
    Distraction,
}

impl Turn {
    pub fn flipped(self) -> Self {
        match self {
            Self::Focus => Self::Distraction,
            Self::Distraction => Self::Focus,
        }
    }
}

/// The five states of the session state machine, derived from [`TimerState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    ActiveFocus,
    ActiveDistraction,
    Paused,
    AwaitingCompletion,
}

/// The user's answer to "Is the task completed?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Completed,
    NotCompleted,
    Cancel,
}

/// Timer state owned by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    pub target_duration: u64,
    pub work_time_left: u64,
    pub distraction_time_elapsed: u64,
    pub mode: Mode,
    pub running: bool,
    pub turn: Turn,
    pub completion_pending: bool,
}

impl Default for TimerState {
    fn default() -> Self {
        Self::setup(DEFAULT_TARGET_SECS)
    }
}

impl TimerState {
    /// A fresh Setup state with the given planned duration.
    pub fn setup(target_duration: u64) -> Self {
        Self {
            target_duration,
            work_time_left: target_duration,
            distraction_time_elapsed: 0,
            mode: Mode::Setup,
            running: false,
            turn: Turn::Focus,
            completion_pending: false,
        }
    }

    pub fn phase(&self) -> Phase {
        match (self.mode, self.running, self.completion_pending) {
            (Mode::Setup, _, _) => Phase::Setup,
            (Mode::Active, _, true) => Phase::AwaitingCompletion,
            (Mode::Active, false, false) => Phase::Paused,
            (Mode::Active, true, false) => match self.turn {
                Turn::Focus => Phase::ActiveFocus,
                Turn::Distraction => Phase::ActiveDistraction,
            },
        }
    }

    /// Returns true while the user is still choosing a duration.
    pub fn is_setup(&self) -> bool {
        self.mode == Mode::Setup
    }

    /// Seconds of focus consumed so far.
    pub fn focus_elapsed(&self) -> u64 {
        self.target_duration.saturating_sub(self.work_time_left)
    }

    /// The counter shown for the current turn.
    pub fn displayed_seconds(&self) -> u64 {
        match self.turn {
            Turn::Focus => self.work_time_left,
            Turn::Distraction => self.distraction_time_elapsed,
        }
    }

    /// Returns the share of focus time consumed (0.0 to 1.0).
    pub fn progress_percent(&self) -> f32 {
        if self.target_duration == 0 {
            return 1.0;
        }
        self.focus_elapsed() as f32 / self.target_duration as f32
    }
}

/// Options the engine itself understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub initial_target_secs: u64,
    pub minimum_target_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_target_secs: DEFAULT_TARGET_SECS,
            minimum_target_secs: DEFAULT_MINIMUM_TARGET_SECS,
        }
    }
}

/// User-configurable settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Planned duration offered when the app starts, in seconds.
    pub initial_target_secs: u64,
    /// Lower bound for duration adjustments, in seconds.
    pub minimum_target_secs: u64,
    /// Shortcut steps offered in the menu (each as a minus and a plus item).
    pub adjustment_steps_secs: Vec<u64>,
    /// Whether to play a chime when focus time runs out.
    pub sound_enabled: bool,
    /// Whether to show system notifications.
    pub notifications_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            initial_target_secs: DEFAULT_TARGET_SECS,
            minimum_target_secs: DEFAULT_MINIMUM_TARGET_SECS,
            adjustment_steps_secs: vec![300, 600, 1800],
            sound_enabled: true,
            notifications_enabled: true,
        }
    }
}

impl Settings {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            initial_target_secs: self.initial_target_secs,
            minimum_target_secs: self.minimum_target_secs,
        }
    }
}
