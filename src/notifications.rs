//! System notifications for timer events.

use notify_rust::Notification;
use std::thread;

/// Body text for the time-up notification.
pub fn time_up_body(focus_secs: u64, distraction_secs: u64) -> String {
    let focus_mins = focus_secs / 60;
    if distraction_secs == 0 {
        format!(
            "You focused for {} min without distractions.\nIs the task completed?",
            focus_mins
        )
    } else {
        format!(
            "You focused for {} min, distracted for {} min.\nIs the task completed?",
            focus_mins,
            distraction_secs / 60
        )
    }
}

/// Shows a notification when focus time has run out.
/// Runs in a background thread to avoid blocking.
pub fn notify_time_up(focus_secs: u64, distraction_secs: u64) {
    thread::spawn(move || {
        let body = time_up_body(focus_secs, distraction_secs);
        if let Err(e) = Notification::new()
            .summary("Time's up! ♞")
            .body(&body)
            .sound_name("default")
            .show()
        {
            tracing::warn!(target: "chessbar::notify", error = %e, "Failed to show notification");
        }
    });
}

/// Tells the user a finished session could not be written to history.
/// The timer has already been reset at this point.
pub fn notify_storage_failed(reason: String) {
    thread::spawn(move || {
        if let Err(e) = Notification::new()
            .summary("Session not saved")
            .body(&format!("Your session could not be added to history: {}", reason))
            .show()
        {
            tracing::warn!(target: "chessbar::notify", error = %e, "Failed to show notification");
        }
    });
}
