//! Timeline types: busy/free intervals and produced schedule events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time::parse_iso_lenient;

/// A `[start, end)` span, busy (to be avoided) or free (available for
/// scheduling). Always timezone-aware; `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &TimeInterval) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Task,
    Break,
    Buffer,
}

/// An item placed on the timeline by the optimizer.
///
/// `start_iso`/`end_iso` stay strings end to end: they are LLM output and the
/// calendar provider accepts them with a timezone label attached at commit
/// time. `color_id` is an optional provider hint ("1".."11") carried through
/// from callers that set it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEvent {
    pub summary: String,
    pub start_iso: String,
    pub end_iso: String,
    #[serde(default)]
    pub description: String,
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,
}

impl ScheduleEvent {
    pub fn new(
        summary: impl Into<String>,
        start_iso: impl Into<String>,
        end_iso: impl Into<String>,
        event_type: EventType,
    ) -> Self {
        Self {
            summary: summary.into(),
            start_iso: start_iso.into(),
            end_iso: end_iso.into(),
            description: String::new(),
            event_type,
            color_id: None,
        }
    }

    /// Interval form, interpreting naive timestamps in `tz`.
    pub fn interval(&self, tz: chrono_tz::Tz) -> anyhow::Result<TimeInterval> {
        Ok(TimeInterval::new(
            parse_iso_lenient(&self.start_iso, tz)?,
            parse_iso_lenient(&self.end_iso, tz)?,
        ))
    }
}

/// True when any two `task`-type events overlap. Break/buffer events are
/// ignored; the packing rules only forbid task-on-task collisions.
pub fn tasks_overlap(events: &[ScheduleEvent], tz: chrono_tz::Tz) -> bool {
    let spans: Vec<TimeInterval> = events
        .iter()
        .filter(|e| e.event_type == EventType::Task)
        .filter_map(|e| e.interval(tz).ok())
        .collect();

    for (i, a) in spans.iter().enumerate() {
        for b in &spans[i + 1..] {
            if a.overlaps(b) {
                return true;
            }
        }
    }
    false
}

/// True when every event falls inside the union of `windows`.
pub fn within_windows(events: &[ScheduleEvent], windows: &[TimeInterval], tz: chrono_tz::Tz) -> bool {
    events.iter().all(|e| match e.interval(tz) {
        Ok(span) => windows.iter().any(|w| w.contains(&span)),
        Err(_) => false,
    })
}
