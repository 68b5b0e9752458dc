//! Clock source: wall-clock time and the one-second tick thread.

use crate::models::{Phase, TimerState};
use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Message sent from a tick thread to the main thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMessage {
    /// One second has passed for the ticker with this generation.
    Tick { generation: u64 },
}

/// Cancellable handle to a running ticker. Clones share the cancel flag.
#[derive(Debug, Clone)]
pub struct TickHandle {
    generation: u64,
    cancelled: Arc<AtomicBool>,
}

impl TickHandle {
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stops further pulses. Safe to call more than once.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }
}

/// Source of "now" and of periodic one-second pulses.
pub trait ClockSource {
    fn now(&self) -> DateTime<Local>;

    /// Starts a ticker tagged with `generation`. Pulses stop once the
    /// returned handle is cancelled.
    fn start_ticker(&mut self, generation: u64) -> TickHandle;
}

/// Real clock: one sleeper thread per started ticker, pulses delivered over a channel.
pub struct SystemClock {
    tx: Sender<TimerMessage>,
}

impl SystemClock {
    pub fn new(tx: Sender<TimerMessage>) -> Self {
        Self { tx }
    }
}

impl ClockSource for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    fn start_ticker(&mut self, generation: u64) -> TickHandle {
        let handle = TickHandle::new(generation);
        let cancelled = handle.flag();
        let tx = self.tx.clone();

        thread::spawn(move || run_ticker(generation, cancelled, tx));

        tracing::debug!(target: "chessbar::timer", generation, "Ticker started");
        handle
    }
}

/// Ticks every second until cancelled or the receiver goes away.
fn run_ticker(generation: u64, cancelled: Arc<AtomicBool>, tx: Sender<TimerMessage>) {
    loop {
        thread::sleep(Duration::from_secs(1));

        if cancelled.load(Ordering::SeqCst) {
            break;
        }
        if tx.send(TimerMessage::Tick { generation }).is_err() {
            break;
        }
    }
    tracing::trace!(target: "chessbar::timer", generation, "Ticker stopped");
}

/// Formats the tray title based on current timer state.
pub fn format_tray_title(state: &TimerState) -> String {
    match state.phase() {
        Phase::Setup => "♞".to_string(),
        Phase::ActiveFocus => format!("♞ {}", format_time(state.work_time_left)),
        Phase::ActiveDistraction => format!("⚠ {}", format_time(state.distraction_time_elapsed)),
        Phase::Paused => format!("⏸ {}", format_time(state.displayed_seconds())),
        Phase::AwaitingCompletion => "♞ ?".to_string(),
    }
}

/// Formats time in MM:SS format. Minutes are not wrapped into hours.
pub fn format_time(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
