//! Menu building and updating for the tray dropdown.

use crate::history::{axis_tick_label, format_compact, ChartSeries, DayBucket, DayGroup};
use crate::history::CHART_WINDOW_DAYS;
use crate::models::{Phase, SessionRecord, Settings, TimerState, Turn};
use chrono::NaiveDate;
use crate::timer::format_time;
use muda::accelerator::Accelerator;
use muda::{CheckMenuItem, Menu, MenuId, MenuItem, PredefinedMenuItem, Submenu};
use thiserror::Error;

// Menu item IDs as constants
pub const ID_STATUS: &str = "status";
pub const ID_COUNTER: &str = "counter";
pub const ID_PROGRESS: &str = "progress";
pub const ID_START: &str = "start";
pub const ID_TOGGLE: &str = "toggle";
pub const ID_PAUSE: &str = "pause";
pub const ID_FINISH: &str = "finish";
pub const ID_DISCARD: &str = "discard";
pub const ID_PROMPT: &str = "prompt";
pub const ID_COMPLETED_YES: &str = "completed_yes";
pub const ID_COMPLETED_NO: &str = "completed_no";
pub const ID_COMPLETED_CANCEL: &str = "completed_cancel";
pub const ID_TODAY: &str = "today";
pub const ID_SCALE: &str = "scale";
pub const ID_NO_SESSIONS: &str = "no_sessions";
pub const ID_SOUND_TOGGLE: &str = "sound_toggle";
pub const ID_NOTIF_TOGGLE: &str = "notif_toggle";
pub const ID_QUIT: &str = "quit";

/// Prefix of duration adjustment item IDs, followed by a signed delta in seconds.
pub const ADJUST_PREFIX: &str = "adjust_";

/// Prefix of per-session delete item IDs, followed by `<YYYY-MM-DD>_<index>`.
pub const DELETE_PREFIX: &str = "delete_";

#[derive(Error, Debug)]
pub enum MenuError {
    #[error("Menu error: {0}")]
    Muda(#[from] muda::Error),
}

/// Holds references to menu items that need dynamic updates.
pub struct MenuItems {
    pub status: MenuItem,
    pub counter: MenuItem,
    pub progress: MenuItem,
    pub adjust: Vec<(i64, MenuItem)>,
    pub start: MenuItem,
    pub toggle: MenuItem,
    pub pause: MenuItem,
    pub finish: MenuItem,
    pub discard: MenuItem,
    pub prompt: MenuItem,
    pub completed_yes: MenuItem,
    pub completed_no: MenuItem,
    pub completed_cancel: MenuItem,
    pub today: MenuItem,
    pub days: Vec<MenuItem>,
    pub scale: MenuItem,
    pub sessions: Submenu,
    pub sound_toggle: CheckMenuItem,
    pub notif_toggle: CheckMenuItem,
}

fn info_item(id: &str, text: String) -> MenuItem {
    MenuItem::with_id(MenuId::new(id), text, false, None::<Accelerator>)
}

fn action_item(id: &str, text: &str, enabled: bool) -> MenuItem {
    MenuItem::with_id(MenuId::new(id), text, enabled, None::<Accelerator>)
}

/// Builds the complete menu structure.
pub fn build_menu(
    state: &TimerState,
    settings: &Settings,
    series: &ChartSeries,
    groups: &[DayGroup],
) -> Result<(Menu, MenuItems), MenuError> {
    let menu = Menu::new();

    // Clock display (disabled, info only)
    let status = info_item(ID_STATUS, format_status(state));
    let counter = info_item(ID_COUNTER, format_counter(state));
    let progress = info_item(ID_PROGRESS, format_progress(state));
    menu.append(&status)?;
    menu.append(&counter)?;
    menu.append(&progress)?;

    menu.append(&PredefinedMenuItem::separator())?;

    // Duration shortcuts, minus then plus for each step
    let mut adjust = Vec::new();
    for &step in &settings.adjustment_steps_secs {
        for delta in [-(step as i64), step as i64] {
            let item = MenuItem::with_id(
                MenuId::new(format!("{}{}", ADJUST_PREFIX, delta)),
                format_adjust_label(delta),
                state.is_setup(),
                None::<Accelerator>,
            );
            menu.append(&item)?;
            adjust.push((delta, item));
        }
    }

    menu.append(&PredefinedMenuItem::separator())?;

    // Control buttons
    let start = action_item(ID_START, "▶  Start Session", state.is_setup());
    let toggle = action_item(ID_TOGGLE, &toggle_label(state), can_toggle(state));
    let pause = action_item(ID_PAUSE, "⏸  Pause", state.running);
    let finish = action_item(ID_FINISH, "⏹  Stop", can_toggle(state));
    let discard = action_item(ID_DISCARD, "✕  Discard Session", !state.is_setup());
    menu.append(&start)?;
    menu.append(&toggle)?;
    menu.append(&pause)?;
    menu.append(&finish)?;
    menu.append(&discard)?;

    menu.append(&PredefinedMenuItem::separator())?;

    // Completion prompt
    let pending = state.completion_pending;
    let prompt = info_item(ID_PROMPT, format_prompt(state));
    let completed_yes = action_item(ID_COMPLETED_YES, "✓  Yes", pending);
    let completed_no = action_item(ID_COMPLETED_NO, "✗  No", pending);
    let completed_cancel = action_item(ID_COMPLETED_CANCEL, "↩  Cancel", pending);
    menu.append(&prompt)?;
    menu.append(&completed_yes)?;
    menu.append(&completed_no)?;
    menu.append(&completed_cancel)?;

    menu.append(&PredefinedMenuItem::separator())?;

    // Today's totals and the weekly history
    let today = info_item(ID_TODAY, format_today(series, groups));
    menu.append(&today)?;

    let history_menu = Submenu::new("📊  Last 7 days", true);
    let mut days = Vec::with_capacity(CHART_WINDOW_DAYS as usize);
    for (i, bucket) in series.buckets.iter().rev().enumerate() {
        let item = info_item(&format!("day_{}", i), format_day_line(series, bucket));
        history_menu.append(&item)?;
        days.push(item);
    }
    history_menu.append(&PredefinedMenuItem::separator())?;
    let scale = info_item(ID_SCALE, format_scale(series));
    history_menu.append(&scale)?;
    menu.append(&history_menu)?;

    // Every stored session, one submenu per day
    let sessions = Submenu::new("🗂  History", true);
    fill_sessions_menu(&sessions, groups)?;
    menu.append(&sessions)?;

    // Settings submenu
    let (settings_menu, sound_toggle, notif_toggle) = build_settings_submenu(settings)?;
    menu.append(&settings_menu)?;

    menu.append(&PredefinedMenuItem::separator())?;

    let quit = action_item(ID_QUIT, "Quit Chessbar", true);
    menu.append(&quit)?;

    let items = MenuItems {
        status,
        counter,
        progress,
        adjust,
        start,
        toggle,
        pause,
        finish,
        discard,
        prompt,
        completed_yes,
        completed_no,
        completed_cancel,
        today,
        days,
        scale,
        sessions,
        sound_toggle,
        notif_toggle,
    };

    Ok((menu, items))
}

fn build_settings_submenu(
    settings: &Settings,
) -> Result<(Submenu, CheckMenuItem, CheckMenuItem), MenuError> {
    let submenu = Submenu::new("⚙  Settings", true);

    let sound_toggle = CheckMenuItem::with_id(
        MenuId::new(ID_SOUND_TOGGLE),
        "Sound Enabled",
        true,
        settings.sound_enabled,
        None::<Accelerator>,
    );
    submenu.append(&sound_toggle)?;

    let notif_toggle = CheckMenuItem::with_id(
        MenuId::new(ID_NOTIF_TOGGLE),
        "Notifications Enabled",
        true,
        settings.notifications_enabled,
        None::<Accelerator>,
    );
    submenu.append(&notif_toggle)?;

    Ok((submenu, sound_toggle, notif_toggle))
}

/// Updates the clock-related items from the current state.
pub fn update_menu_items(items: &MenuItems, state: &TimerState) {
    items.status.set_text(format_status(state));
    items.counter.set_text(format_counter(state));
    items.progress.set_text(format_progress(state));
    items.prompt.set_text(format_prompt(state));
    items.toggle.set_text(toggle_label(state));

    for (_, item) in &items.adjust {
        item.set_enabled(state.is_setup());
    }
    items.start.set_enabled(state.is_setup());
    items.toggle.set_enabled(can_toggle(state));
    items.pause.set_enabled(state.running);
    items.finish.set_enabled(can_toggle(state));
    items.discard.set_enabled(!state.is_setup());

    let pending = state.completion_pending;
    items.completed_yes.set_enabled(pending);
    items.completed_no.set_enabled(pending);
    items.completed_cancel.set_enabled(pending);
}

/// Updates the history items after the record set or the date changed.
pub fn update_history_items(
    items: &MenuItems,
    series: &ChartSeries,
    groups: &[DayGroup],
) -> Result<(), MenuError> {
    items.today.set_text(format_today(series, groups));
    for (item, bucket) in items.days.iter().zip(series.buckets.iter().rev()) {
        item.set_text(format_day_line(series, bucket));
    }
    items.scale.set_text(format_scale(series));
    fill_sessions_menu(&items.sessions, groups)
}

/// Replaces the contents of the history submenu. Each day gets a submenu with
/// one entry per session (holding its delete action) and the day's totals.
fn fill_sessions_menu(submenu: &Submenu, groups: &[DayGroup]) -> Result<(), MenuError> {
    while submenu.remove_at(0).is_some() {}

    if groups.is_empty() {
        submenu.append(&info_item(ID_NO_SESSIONS, "No sessions in history".to_string()))?;
        return Ok(());
    }

    for group in groups {
        let day_menu = Submenu::new(format_day_header(group.day), true);
        for (index, record) in group.records.iter().enumerate() {
            let row = Submenu::new(format_session_row(record), true);
            row.append(&action_item(
                &delete_item_id(group.day, index),
                "Delete Session",
                true,
            ))?;
            day_menu.append(&row)?;
        }
        day_menu.append(&PredefinedMenuItem::separator())?;
        day_menu.append(&MenuItem::new(group.summary_label(), false, None))?;
        submenu.append(&day_menu)?;
    }
    Ok(())
}

/// Updates the settings checkmarks.
pub fn update_settings_items(items: &MenuItems, settings: &Settings) {
    items.sound_toggle.set_checked(settings.sound_enabled);
    items.notif_toggle.set_checked(settings.notifications_enabled);
}

fn can_toggle(state: &TimerState) -> bool {
    !state.is_setup() && !state.completion_pending
}

fn turn_label(turn: Turn) -> &'static str {
    match turn {
        Turn::Focus => "Focus",
        Turn::Distraction => "Distractions",
    }
}

/// Formats the status line for the menu.
pub fn format_status(state: &TimerState) -> String {
    match state.phase() {
        Phase::Setup => format!("Ready  {}", format_time(state.target_duration)),
        Phase::ActiveFocus | Phase::ActiveDistraction => format!(
            "{}  {}",
            turn_label(state.turn),
            format_time(state.displayed_seconds())
        ),
        Phase::Paused => format!("Pause  {}", format_time(state.displayed_seconds())),
        Phase::AwaitingCompletion => format!("Stopped  {}", format_time(state.work_time_left)),
    }
}

/// Formats the line showing the clock that is not on turn.
pub fn format_counter(state: &TimerState) -> String {
    if state.is_setup() {
        return "Adjust the duration, then start".to_string();
    }
    let other = state.turn.flipped();
    let secs = match other {
        Turn::Focus => state.work_time_left,
        Turn::Distraction => state.distraction_time_elapsed,
    };
    format!("{}  {}", turn_label(other), format_time(secs))
}

/// Formats the focus progress bar for the menu.
pub fn format_progress(state: &TimerState) -> String {
    if state.is_setup() {
        return "░░░░░░░░░░░░░░░░░░░░  0%".to_string();
    }
    let pct = state.progress_percent();
    let filled = (pct * 20.0).round() as usize;
    let empty = 20 - filled.min(20);
    format!(
        "{}{}  {}%",
        "█".repeat(filled.min(20)),
        "░".repeat(empty),
        (pct * 100.0).round() as u32
    )
}

fn format_prompt(state: &TimerState) -> String {
    if state.completion_pending {
        "Is task completed?".to_string()
    } else {
        "—".to_string()
    }
}

/// Label of the play/switch button.
pub fn toggle_label(state: &TimerState) -> String {
    if state.running {
        format!("⇄  Switch to {}", turn_label(state.turn.flipped()))
    } else if state.focus_elapsed() == 0 && state.distraction_time_elapsed == 0 {
        "▶  Start".to_string()
    } else {
        format!("▶  Resume {}", turn_label(state.turn))
    }
}

/// "−5m" / "+30m" / "+1h".
pub fn format_adjust_label(delta_secs: i64) -> String {
    let sign = if delta_secs < 0 { "−" } else { "+" };
    format!("{}{}", sign, format_compact(delta_secs.unsigned_abs()))
}

/// One line of the weekly history: "Mon 09  Work 25m · Distractions 5m".
/// Only non-zero series are listed.
pub fn format_day_line(series: &ChartSeries, bucket: &DayBucket) -> String {
    let date = format!("{} {}", bucket.weekday_label(), bucket.day.format("%d"));
    let parts: Vec<String> = series
        .points
        .iter()
        .filter(|p| p.day == bucket.day)
        .map(|p| format!("{} {}", p.kind.label(), p.label()))
        .collect();
    if parts.is_empty() {
        return format!("{}  —", date);
    }
    format!("{}  {}", date, parts.join(" · "))
}

/// Today's totals with the number of completed sessions.
pub fn format_today(series: &ChartSeries, groups: &[DayGroup]) -> String {
    let today = series.buckets.last().map(|b| b.day);
    match groups.iter().find(|g| Some(g.day) == today) {
        Some(group) => format!(
            "{}  ({}/{} completed)",
            group.summary_label(),
            group.completed_count(),
            group.records.len()
        ),
        _ => "DAILY TOTAL: —".to_string(),
    }
}

/// Section title of a day in the history: "Tuesday, 10 March 2026".
pub fn format_day_header(day: NaiveDate) -> String {
    day.format("%A, %-d %B %Y").to_string()
}

/// One session in the history:
/// "14:05  Work 25:00 · Distractions 02:00 · Σ 27:00 · Est. 25:00 ✓".
/// Distractions are left out when there were none.
pub fn format_session_row(record: &SessionRecord) -> String {
    let mut parts = vec![format!("Work {}", format_time(record.focus_seconds))];
    if record.distraction_seconds > 0 {
        parts.push(format!(
            "Distractions {}",
            format_time(record.distraction_seconds)
        ));
    }
    parts.push(format!("Σ {}", format_time(record.total_seconds())));
    parts.push(format!("Est. {}", format_time(record.estimated_seconds)));

    let mark = if record.completed { "✓" } else { "✗" };
    format!(
        "{}  {} {}",
        record.date.format("%H:%M"),
        parts.join(" · "),
        mark
    )
}

pub fn delete_item_id(day: NaiveDate, index: usize) -> String {
    format!("{}{}_{}", DELETE_PREFIX, day.format("%Y-%m-%d"), index)
}

/// Axis scale line: "Scale: 0m · 20m · 40m · 60m".
pub fn format_scale(series: &ChartSeries) -> String {
    let ticks: Vec<String> = series.axis_ticks().into_iter().map(axis_tick_label).collect();
    format!("Scale: {}", ticks.join(" · "))
}
