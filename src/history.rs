//! History aggregation: day buckets, chart series and labels.
//!
//! Everything here is a pure function of the records passed in.

use crate::models::SessionRecord;
use chrono::{Days, NaiveDate};
use std::collections::BTreeMap;

/// Days shown in the chart, ending today.
pub const CHART_WINDOW_DAYS: u64 = 7;

/// Which series a chart point belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Focus,
    Distraction,
}

impl ActivityKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Focus => "Work",
            Self::Distraction => "Distractions",
        }
    }
}

/// Per-day totals for one slot of the chart axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayBucket {
    pub day: NaiveDate,
    pub focus_seconds: u64,
    pub distraction_seconds: u64,
}

impl DayBucket {
    /// Abbreviated weekday, e.g. "Mon".
    pub fn weekday_label(&self) -> String {
        self.day.format("%a").to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartPoint {
    pub day: NaiveDate,
    pub kind: ActivityKind,
    pub seconds: u64,
}

impl ChartPoint {
    pub fn label(&self) -> String {
        format_compact(self.seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartSeries {
    /// Always `CHART_WINDOW_DAYS` buckets, oldest first.
    pub buckets: Vec<DayBucket>,
    /// Non-zero totals only.
    pub points: Vec<ChartPoint>,
    pub axis_step_seconds: u64,
}

impl ChartSeries {
    pub fn max_seconds(&self) -> u64 {
        self.points.iter().map(|p| p.seconds).max().unwrap_or(0)
    }

    /// Gridline values from zero up to the first step at or above the tallest bar.
    pub fn axis_ticks(&self) -> Vec<u64> {
        let max = self.max_seconds();
        let mut ticks = vec![0];
        let mut value = 0;
        while value < max {
            value += self.axis_step_seconds;
            ticks.push(value);
        }
        ticks
    }
}

/// Builds the trailing seven-day chart ending on `today`.
pub fn chart_series(records: &[SessionRecord], today: NaiveDate) -> ChartSeries {
    let start = today
        .checked_sub_days(Days::new(CHART_WINDOW_DAYS - 1))
        .unwrap_or(today);

    let mut buckets: Vec<DayBucket> = start
        .iter_days()
        .take(CHART_WINDOW_DAYS as usize)
        .map(|day| DayBucket {
            day,
            focus_seconds: 0,
            distraction_seconds: 0,
        })
        .collect();

    for record in records {
        let day = record.date.date_naive();
        if day < start || day > today {
            continue;
        }
        let index = (day - start).num_days() as usize;
        if let Some(bucket) = buckets.get_mut(index) {
            bucket.focus_seconds += record.focus_seconds;
            bucket.distraction_seconds += record.distraction_seconds;
        }
    }

    let mut points = Vec::new();
    for bucket in &buckets {
        if bucket.focus_seconds > 0 {
            points.push(ChartPoint {
                day: bucket.day,
                kind: ActivityKind::Focus,
                seconds: bucket.focus_seconds,
            });
        }
        if bucket.distraction_seconds > 0 {
            points.push(ChartPoint {
                day: bucket.day,
                kind: ActivityKind::Distraction,
                seconds: bucket.distraction_seconds,
            });
        }
    }

    let max = points.iter().map(|p| p.seconds).max().unwrap_or(0);
    ChartSeries {
        buckets,
        points,
        axis_step_seconds: axis_step_seconds(max),
    }
}

/// Picks a round gridline step for a chart whose tallest bar is `max_seconds`.
pub fn axis_step_seconds(max_seconds: u64) -> u64 {
    let step_minutes = match max_seconds {
        0..=900 => 5,
        901..=2400 => 10,
        2401..=5400 => 20,
        5401..=10800 => 30,
        _ => 60,
    };
    step_minutes * 60
}

/// Y-axis gridline label, always in minutes ("20m", "90m").
pub fn axis_tick_label(seconds: u64) -> String {
    format!("{}m", seconds / 60)
}

/// Bar annotation: "25m" below an hour, whole hours ("2h") from there on.
pub fn format_compact(seconds: u64) -> String {
    let minutes = seconds / 60;
    if minutes >= 60 {
        format!("{}h", minutes / 60)
    } else {
        format!("{}m", minutes)
    }
}

/// Daily total in the history listing: "1h 05m", or "25 min" under an hour.
pub fn format_daily_total(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else {
        format!("{:02} min", minutes)
    }
}

/// All records of one local calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayGroup {
    pub day: NaiveDate,
    pub records: Vec<SessionRecord>,
}

impl DayGroup {
    pub fn focus_total(&self) -> u64 {
        self.records.iter().map(|r| r.focus_seconds).sum()
    }

    pub fn distraction_total(&self) -> u64 {
        self.records.iter().map(|r| r.distraction_seconds).sum()
    }

    pub fn completed_count(&self) -> usize {
        self.records.iter().filter(|r| r.completed).count()
    }

    /// Footer line of the day: "DAILY TOTAL: Work 1h 05m · Distractions 03 min".
    pub fn summary_label(&self) -> String {
        format!(
            "DAILY TOTAL: Work {} · Distractions {}",
            format_daily_total(self.focus_total()),
            format_daily_total(self.distraction_total())
        )
    }
}

/// Groups records by local day, most recent day first. Records keep their
/// original relative order inside a day.
pub fn group_by_day_descending(records: &[SessionRecord]) -> Vec<DayGroup> {
    let mut by_day: BTreeMap<NaiveDate, Vec<SessionRecord>> = BTreeMap::new();
    for record in records {
        by_day
            .entry(record.date.date_naive())
            .or_default()
            .push(record.clone());
    }

    by_day
        .into_iter()
        .rev()
        .map(|(day, records)| DayGroup { day, records })
        .collect()
}
