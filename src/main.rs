//! Chessbar - a chess-clock productivity timer in the menubar.
//!
//! Focus time counts down while distraction time counts up; one button
//! flips between the two, like the clock in a chess game.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use chrono::{Local, NaiveDate};
use clap::Parser;
use muda::MenuEvent;
use tray_icon::{TrayIcon, TrayIconBuilder};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

mod app;
mod audio;
mod engine;
mod event;
mod history;
mod logging;
mod menu;
mod models;
mod notifications;
mod persistence;
mod timer;

use app::{App, HistoryView};
use audio::AudioPlayer;
use engine::EngineEvent;
use event::EventResult;
use logging::LogPreset;
use menu::MenuItems;
use timer::TimerMessage;

/// How often the event loop wakes up to drain channels.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(name = "chessbar")]
#[command(about = "Chess-clock productivity timer for the menubar")]
#[command(version)]
struct Cli {
    /// Path to the history database
    #[arg(long, value_name = "FILE")]
    database: Option<PathBuf>,

    /// Keep history in memory only
    #[arg(long, conflicts_with = "database")]
    in_memory: bool,

    /// Enable verbose logging (every state transition)
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging (everything, including ticks)
    #[arg(short, long)]
    debug: bool,

    /// Quiet mode (WARN and ERROR only)
    #[arg(short, long)]
    quiet: bool,
}

/// Application handler for the winit event loop.
struct Chessbar {
    app: App,
    tray: Option<TrayIcon>,
    menu_items: Option<MenuItems>,
    timer_rx: Receiver<TimerMessage>,
    engine_rx: Receiver<EngineEvent>,
    audio: Option<AudioPlayer>,
    /// The day the history items were last rendered for.
    history_day: NaiveDate,
}

impl Chessbar {
    fn new(
        app: App,
        tray: TrayIcon,
        timer_rx: Receiver<TimerMessage>,
        engine_rx: Receiver<EngineEvent>,
        history_day: NaiveDate,
    ) -> Self {
        // Audio is created on the main thread to avoid Send issues
        let audio = match AudioPlayer::new() {
            Ok(player) => Some(player),
            Err(e) => {
                tracing::warn!(target: "chessbar::audio", error = %e, "Audio unavailable");
                None
            }
        };

        Self {
            app,
            tray: Some(tray),
            menu_items: None,
            timer_rx,
            engine_rx,
            audio,
            history_day,
        }
    }

    fn set_menu_items(&mut self, items: MenuItems) {
        self.menu_items = Some(items);
    }

    fn update_tray_title(&self, title: &str) {
        if let Some(ref tray) = self.tray {
            tray.set_title(Some(title));
        }
    }

    fn refresh_history(&mut self) {
        let today = Local::now().date_naive();
        let Some(ref items) = self.menu_items else {
            return;
        };
        match self.app.history_at(today) {
            Ok(view) => {
                if let Err(e) = menu::update_history_items(items, &view.series, &view.days) {
                    tracing::warn!(target: "chessbar::menu", error = %e, "Failed to rebuild history menu");
                }
                self.history_day = today;
            }
            Err(e) => {
                tracing::warn!(target: "chessbar::storage", error = %e, "Failed to load history");
            }
        }
    }

    /// Re-anchors the history on the new day after midnight.
    fn refresh_history_on_new_day(&mut self) {
        if Local::now().date_naive() != self.history_day {
            tracing::debug!(target: "chessbar::menu", "Date changed, refreshing history");
            self.refresh_history();
        }
    }

    fn handle_time_up(&self) {
        let state = self.app.engine.state();

        if self.app.settings.sound_enabled {
            if let Some(ref audio) = self.audio {
                audio.play_chime();
            }
        }

        if self.app.settings.notifications_enabled {
            notifications::notify_time_up(state.focus_elapsed(), state.distraction_time_elapsed);
        }
    }

    fn handle_storage_failed(&self, reason: String) {
        if self.app.settings.sound_enabled {
            if let Some(ref audio) = self.audio {
                audio.play_alert();
            }
        }
        // Always shown, whatever the notification setting
        notifications::notify_storage_failed(reason);
    }

    fn process_timer_messages(&mut self) {
        while let Ok(msg) = self.timer_rx.try_recv() {
            match msg {
                TimerMessage::Tick { generation } => {
                    self.app.engine.on_pulse(generation);
                }
            }
        }
    }

    fn process_engine_events(&mut self) {
        while let Ok(event) = self.engine_rx.try_recv() {
            match event {
                EngineEvent::StateChanged(state) => {
                    self.update_tray_title(&timer::format_tray_title(&state));
                    if let Some(ref items) = self.menu_items {
                        menu::update_menu_items(items, &state);
                    }
                }
                EngineEvent::TimeUp => self.handle_time_up(),
                EngineEvent::SessionSaved(_) => self.refresh_history(),
                EngineEvent::SessionDiscarded => {}
                EngineEvent::StorageFailed(reason) => self.handle_storage_failed(reason),
            }
        }
    }

    fn process_menu_events(&mut self, event_loop: &ActiveEventLoop) {
        while let Ok(event) = MenuEvent::receiver().try_recv() {
            match event::handle_menu_event(&mut self.app, event.id().as_ref()) {
                EventResult::Quit => {
                    tracing::info!(target: "chessbar::startup", "Quitting");
                    event_loop.exit();
                    return;
                }
                EventResult::SettingsChanged => {
                    if let Some(ref items) = self.menu_items {
                        menu::update_settings_items(items, &self.app.settings);
                    }
                }
                EventResult::HistoryChanged => self.refresh_history(),
                EventResult::Continue => {}
            }
        }
    }
}

impl ApplicationHandler for Chessbar {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {
        // Nothing to do on resume for a tray-only app
    }

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        _event: WindowEvent,
    ) {
        // No window events for a tray-only app
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::wait_duration(POLL_INTERVAL));

        // Menu clicks before clock pulses
        self.process_menu_events(event_loop);
        self.process_timer_messages();
        self.process_engine_events();
        self.refresh_history_on_new_day();
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(LogPreset::from_flags(cli.verbose, cli.debug, cli.quiet));

    let store = app::open_store(cli.database.as_deref(), cli.in_memory);

    // Clock pulses travel from ticker threads to the event loop
    let (tx, timer_rx) = mpsc::channel();
    let mut app = App::new(store, tx);
    let engine_rx = app.subscribe();

    let today = Local::now().date_naive();
    let view = app.history_at(today).unwrap_or_else(|e| {
        tracing::warn!(target: "chessbar::storage", error = %e, "Starting with empty history");
        HistoryView {
            series: history::chart_series(&[], today),
            days: Vec::new(),
        }
    });

    // Create event loop (required for tray on macOS)
    let event_loop = EventLoop::new()?;

    let (built_menu, menu_items) = menu::build_menu(
        app.engine.state(),
        &app.settings,
        &view.series,
        &view.days,
    )?;

    // No icon image, the title text carries the clock
    let tray = TrayIconBuilder::new()
        .with_menu(Box::new(built_menu))
        .with_title(timer::format_tray_title(app.engine.state()))
        .with_tooltip("Chessbar - Chess-Clock Timer")
        .build()?;

    tracing::info!(
        target: "chessbar::startup",
        target_secs = app.engine.state().target_duration,
        "Chessbar ready"
    );

    let mut chessbar = Chessbar::new(app, tray, timer_rx, engine_rx, today);
    chessbar.set_menu_items(menu_items);

    event_loop.run_app(&mut chessbar)?;

    Ok(())
}
