//! Application shell: owns the engine, the settings and the history view.

use crate::engine::{EngineEvent, TimerEngine};
use crate::history::{chart_series, group_by_day_descending, ChartSeries, DayGroup};
use crate::models::{SessionRecord, Settings};
use crate::persistence::{Database, MemoryStore, SessionStore, StorageError, Store};
use crate::timer::{SystemClock, TimerMessage};
use chrono::NaiveDate;
use std::path::Path;
use std::sync::mpsc::{Receiver, Sender};

pub type Engine = TimerEngine<SystemClock, Store>;

/// Everything the history submenu shows.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryView {
    pub series: ChartSeries,
    pub days: Vec<DayGroup>,
}

pub struct App {
    pub engine: Engine,
    pub settings: Settings,
}

/// Opens the session store. A database that cannot be opened degrades to
/// an in-memory store so the timer stays usable.
pub fn open_store(database: Option<&Path>, in_memory: bool) -> Store {
    if in_memory {
        tracing::info!(target: "chessbar::startup", "Using in-memory history");
        return Store::Memory(MemoryStore::new());
    }

    let opened = match database {
        Some(path) => Database::open(path),
        None => Database::new(),
    };
    match opened {
        Ok(db) => Store::Sqlite(db),
        Err(e) => {
            tracing::warn!(
                target: "chessbar::startup",
                error = %e,
                "Could not open history database, sessions will not be kept"
            );
            Store::Memory(MemoryStore::new())
        }
    }
}

impl App {
    /// Creates the application around `store`, sending clock pulses to `tx`.
    pub fn new(store: Store, tx: Sender<TimerMessage>) -> Self {
        let settings = store.load_settings();
        let engine = TimerEngine::new(settings.engine_config(), SystemClock::new(tx), store);
        Self { engine, settings }
    }

    pub fn subscribe(&mut self) -> Receiver<EngineEvent> {
        self.engine.subscribe()
    }

    /// Updates a setting and saves it next to the history.
    pub fn update_setting<F>(&mut self, updater: F)
    where
        F: FnOnce(&mut Settings),
    {
        updater(&mut self.settings);
        if let Err(e) = self.engine.store().save_settings(&self.settings) {
            tracing::warn!(target: "chessbar::storage", error = %e, "Failed to save settings");
        }
    }

    /// History as seen on `today`. Days and the sessions inside each day are
    /// newest first.
    pub fn history_at(&self, today: NaiveDate) -> Result<HistoryView, StorageError> {
        let records = self.engine.store().load_all()?;
        let series = chart_series(&records, today);
        Ok(HistoryView {
            series,
            days: group_by_day_descending(&newest_first(records)),
        })
    }

    /// Deletes the `index`-th session of `day`, counted in history order.
    /// Returns the removed record, or `None` when there is no such session.
    pub fn delete_session(
        &mut self,
        day: NaiveDate,
        index: usize,
    ) -> Result<Option<SessionRecord>, StorageError> {
        let records = self.engine.store().load_all()?;
        let target = group_by_day_descending(&newest_first(records))
            .into_iter()
            .find(|group| group.day == day)
            .and_then(|group| group.records.into_iter().nth(index));
        let Some(record) = target else {
            tracing::debug!(target: "chessbar::storage", %day, index, "No session to delete");
            return Ok(None);
        };
        self.engine.store_mut().delete(&record)?;
        tracing::info!(target: "chessbar::storage", date = %record.date, "Deleted session");
        Ok(Some(record))
    }
}

fn newest_first(mut records: Vec<SessionRecord>) -> Vec<SessionRecord> {
    records.sort_by(|a, b| b.date.cmp(&a.date));
    records
}
