//! Menu event handling.

use crate::app::App;
use crate::menu::{
    ADJUST_PREFIX, DELETE_PREFIX, ID_COMPLETED_CANCEL, ID_COMPLETED_NO, ID_COMPLETED_YES,
    ID_DISCARD, ID_FINISH, ID_NOTIF_TOGGLE, ID_PAUSE, ID_QUIT, ID_SOUND_TOGGLE, ID_START,
    ID_TOGGLE,
};
use crate::models::CompletionOutcome;
use chrono::NaiveDate;

/// A menu click translated into something the app understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    Adjust(i64),
    StartSession,
    Toggle,
    Pause,
    Finish,
    Resolve(CompletionOutcome),
    Discard,
    /// Deletes the `index`-th session listed under `day` in the history.
    DeleteSession { day: NaiveDate, index: usize },
    ToggleSound,
    ToggleNotifications,
    Quit,
}

/// Result of handling a menu event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventResult {
    /// Event handled, continue running.
    Continue,
    /// User requested quit.
    Quit,
    /// Settings changed, checkmarks need update.
    SettingsChanged,
    /// Stored sessions changed outside the engine, history needs reload.
    HistoryChanged,
}

/// Maps a menu item ID to a command. Informational items map to `None`.
pub fn parse_menu_id(id: &str) -> Option<MenuCommand> {
    let command = match id {
        ID_START => MenuCommand::StartSession,
        ID_TOGGLE => MenuCommand::Toggle,
        ID_PAUSE => MenuCommand::Pause,
        ID_FINISH => MenuCommand::Finish,
        ID_COMPLETED_YES => MenuCommand::Resolve(CompletionOutcome::Completed),
        ID_COMPLETED_NO => MenuCommand::Resolve(CompletionOutcome::NotCompleted),
        ID_COMPLETED_CANCEL => MenuCommand::Resolve(CompletionOutcome::Cancel),
        ID_DISCARD => MenuCommand::Discard,
        ID_SOUND_TOGGLE => MenuCommand::ToggleSound,
        ID_NOTIF_TOGGLE => MenuCommand::ToggleNotifications,
        ID_QUIT => MenuCommand::Quit,
        _ => {
            return parse_adjustment(id).map(MenuCommand::Adjust).or_else(|| {
                parse_delete_id(id).map(|(day, index)| MenuCommand::DeleteSession { day, index })
            })
        }
    };
    Some(command)
}

/// Parses "adjust_-300" into -300.
pub fn parse_adjustment(id: &str) -> Option<i64> {
    id.strip_prefix(ADJUST_PREFIX)?.parse().ok()
}

/// Parses "delete_2026-03-10_1" into the day and the session index.
pub fn parse_delete_id(id: &str) -> Option<(NaiveDate, usize)> {
    let (day, index) = id.strip_prefix(DELETE_PREFIX)?.rsplit_once('_')?;
    let day = NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()?;
    Some((day, index.parse().ok()?))
}

/// Handles a menu event and updates the app accordingly.
///
/// Timer changes reach the UI through engine events, so only changes the
/// engine does not report show up in the result.
pub fn handle_menu_event(app: &mut App, id: &str) -> EventResult {
    match parse_menu_id(id) {
        Some(command) => handle_command(app, command),
        None => EventResult::Continue,
    }
}

pub fn handle_command(app: &mut App, command: MenuCommand) -> EventResult {
    tracing::debug!(target: "chessbar::menu", ?command, "Menu command");

    let applied = match command {
        MenuCommand::Adjust(delta) => app.engine.adjust_target_duration(delta),
        MenuCommand::StartSession => app.engine.start_session(),
        MenuCommand::Toggle => app.engine.toggle_timer(),
        MenuCommand::Pause => app.engine.pause(),
        MenuCommand::Finish => app.engine.request_finish(),
        MenuCommand::Resolve(outcome) => {
            // A failed save has already been reported as an engine event.
            app.engine.resolve_completion(outcome).is_ok()
        }
        MenuCommand::Discard => app.engine.reset(),
        MenuCommand::DeleteSession { day, index } => {
            return match app.delete_session(day, index) {
                Ok(Some(_)) => EventResult::HistoryChanged,
                Ok(None) => EventResult::Continue,
                Err(e) => {
                    tracing::warn!(target: "chessbar::storage", error = %e, "Failed to delete session");
                    EventResult::Continue
                }
            };
        }
        MenuCommand::ToggleSound => {
            app.update_setting(|s| s.sound_enabled = !s.sound_enabled);
            return EventResult::SettingsChanged;
        }
        MenuCommand::ToggleNotifications => {
            app.update_setting(|s| s.notifications_enabled = !s.notifications_enabled);
            return EventResult::SettingsChanged;
        }
        MenuCommand::Quit => return EventResult::Quit,
    };

    if !applied {
        tracing::trace!(
            target: "chessbar::menu",
            ?command,
            phase = ?app.engine.phase(),
            "Command ignored in current state"
        );
    }
    EventResult::Continue
}
