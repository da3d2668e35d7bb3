//! The three pipeline stages: extraction, optimization, commit.
//!
//! Stage policy in one line: model decode failures are recovered here (empty
//! result, raw text logged); gateway failures propagate to the router; commit
//! failures are per-item and never abort the batch.

use anyhow::{Result, bail};
use serde::Serialize;
use tracing::{info, warn};

use chrono_tz::Tz;
use chronos_core::event::{self, ScheduleEvent, TimeInterval};
use chronos_core::schema::{event_list_schema, task_list_schema};
use chronos_core::task::{self, Task};
use chronos_core::prompt;

use crate::gemini::ModelGateway;
use crate::google_calendar::CalendarGateway;

/// Turn a brain dump into candidate tasks.
///
/// An empty result means "nothing extracted", which callers must not treat as
/// a hard error; a real gateway failure comes back as `Err`.
pub async fn extract_tasks(
    model: &dyn ModelGateway,
    text: &str,
    date_iso: &str,
    busy: Option<&[TimeInterval]>,
) -> Result<Vec<Task>> {
    let instruction = prompt::parser_instruction(date_iso, busy);
    let raw = model
        .generate_structured(&instruction, &prompt::parser_prompt(text), Some(&task_list_schema()))
        .await?;

    let tasks: Vec<Task> = match serde_json::from_str(&raw) {
        Ok(tasks) => tasks,
        Err(e) => {
            warn!(error = %e, raw, "task extraction returned undecodable JSON");
            return Ok(Vec::new());
        }
    };

    for problem in task::check_batch(&tasks) {
        warn!(problem, "extraction batch invariant violation");
    }

    info!(count = tasks.len(), "extracted tasks");
    Ok(tasks)
}

/// Pack tasks into free windows around the busy intervals.
///
/// Same non-fatal decode policy as extraction. Packing-quality problems
/// (task overlaps, spills outside the windows) are warned about, never
/// rejected; naive timestamps are interpreted in `tz` for those checks.
pub async fn optimize_schedule(
    model: &dyn ModelGateway,
    tasks: &[Task],
    busy: &[TimeInterval],
    free_windows: &[TimeInterval],
    tz: Tz,
) -> Result<Vec<ScheduleEvent>> {
    let instruction = prompt::optimizer_instruction(busy);
    let raw = model
        .generate_structured(
            &instruction,
            &prompt::optimizer_prompt(tasks, free_windows),
            Some(&event_list_schema()),
        )
        .await?;

    let events: Vec<ScheduleEvent> = match serde_json::from_str(&raw) {
        Ok(events) => events,
        Err(e) => {
            warn!(error = %e, raw, "schedule optimization returned undecodable JSON");
            return Ok(Vec::new());
        }
    };

    if event::tasks_overlap(&events, tz) {
        warn!("optimized schedule places task events on top of each other");
    }
    if !free_windows.is_empty() && !event::within_windows(&events, free_windows, tz) {
        warn!("optimized schedule spills outside the free windows");
    }

    info!(count = events.len(), "optimized schedule");
    Ok(events)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreatedEntry {
    pub index: usize,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FailedEntry {
    pub index: usize,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct CommitOutcome {
    pub created: Vec<CreatedEntry>,
    pub failed: Vec<FailedEntry>,
}

/// Promote schedule events to real calendar events, partial-success style:
/// one bad item is recorded and the rest still go through.
///
/// Empty input is rejected before any provider call.
pub async fn commit_events(
    calendar: &dyn CalendarGateway,
    calendar_id: &str,
    events: &[ScheduleEvent],
) -> Result<CommitOutcome> {
    if events.is_empty() {
        bail!("no events to schedule");
    }

    calendar.authenticate().await?;

    let mut outcome = CommitOutcome::default();
    for (index, event) in events.iter().enumerate() {
        match calendar.create_event(calendar_id, event).await {
            Ok(remote) => {
                info!(
                    index,
                    summary = event.summary,
                    event_id = remote.id,
                    link = remote.html_link.as_deref().unwrap_or(""),
                    "created calendar event"
                );
                outcome.created.push(CreatedEntry { index, summary: event.summary.clone() });
            }
            Err(e) => {
                warn!(index, summary = event.summary, error = %e, "event creation failed");
                outcome.failed.push(FailedEntry { index, error: e.to_string() });
            }
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::TimeZone;
    use chronos_core::event::EventType;
    use chronos_core::schema::ResponseSchema;
    use crate::google_calendar::RemoteEvent;

    /// Replays scripted responses, newest-first pop (reminder-bot style).
    struct ScriptedModel {
        responses: Mutex<Vec<Result<String, String>>>,
    }

    impl ScriptedModel {
        fn returning(text: &str) -> Self {
            Self { responses: Mutex::new(vec![Ok(text.to_string())]) }
        }
    }

    #[async_trait]
    impl ModelGateway for ScriptedModel {
        async fn generate_structured(
            &self,
            _system_instruction: &str,
            _user_prompt: &str,
            _schema: Option<&ResponseSchema>,
        ) -> Result<String> {
            match self.responses.lock().unwrap().pop() {
                Some(Ok(s)) => Ok(s),
                Some(Err(e)) => bail!(e),
                None => bail!("no scripted response left"),
            }
        }
    }

    struct ScriptedCalendar {
        /// Indices whose create call should fail.
        fail_on: Vec<usize>,
        auth_calls: AtomicUsize,
        create_calls: AtomicUsize,
    }

    impl ScriptedCalendar {
        fn new(fail_on: Vec<usize>) -> Self {
            Self { fail_on, auth_calls: AtomicUsize::new(0), create_calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl CalendarGateway for ScriptedCalendar {
        async fn authenticate(&self) -> Result<()> {
            self.auth_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn list_busy_intervals(
            &self,
            _calendar_id: &str,
            _range_start: chrono::DateTime<chrono::Utc>,
            _range_end: chrono::DateTime<chrono::Utc>,
        ) -> Result<Vec<TimeInterval>> {
            Ok(Vec::new())
        }

        async fn create_event(&self, _calendar_id: &str, event: &ScheduleEvent) -> Result<RemoteEvent> {
            let call = self.create_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.contains(&call) {
                bail!("quota exhausted");
            }
            Ok(RemoteEvent { id: format!("remote-{}", event.summary), html_link: None })
        }
    }

    fn event(summary: &str) -> ScheduleEvent {
        ScheduleEvent::new(summary, "2024-01-01T09:00:00", "2024-01-01T10:00:00", EventType::Task)
    }

    #[tokio::test]
    async fn extraction_parses_model_output() {
        let model = ScriptedModel::returning(
            r#"[{"id":"t1","title":"call mom","priority":"P2","estimated_duration_minutes":15,
                "constraint_type":"flexible","fixed_time_iso":null},
               {"id":"t2","title":"gym","priority":"P2","estimated_duration_minutes":60,
                "constraint_type":"fixed","fixed_time_iso":"2024-01-01T18:00:00"}]"#,
        );

        let tasks = extract_tasks(&model, "call mom, gym at 6pm", "2024-01-01", None)
            .await
            .unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].estimated_duration_minutes, 15);
        assert_eq!(tasks[1].fixed_time_iso.as_deref(), Some("2024-01-01T18:00:00"));
        assert!(task::check_batch(&tasks).is_empty());
    }

    #[tokio::test]
    async fn extraction_decode_failure_yields_empty_not_error() {
        let model = ScriptedModel::returning("I could not find any tasks, sorry!");
        let tasks = extract_tasks(&model, "gibberish", "2024-01-01", None).await.unwrap();
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn extraction_gateway_failure_propagates() {
        let model = ScriptedModel { responses: Mutex::new(vec![Err("gemini error: 401".into())]) };
        let err = extract_tasks(&model, "x", "", None).await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn optimization_is_deterministic_for_a_fixed_stub() {
        let script = r#"[{"summary":"call mom","start_iso":"2024-01-01T09:00:00",
            "end_iso":"2024-01-01T09:15:00","description":"","event_type":"task"}]"#;
        let tasks = vec![Task::new("t1", "call mom").with_duration(15)];

        let first =
            optimize_schedule(&ScriptedModel::returning(script), &tasks, &[], &[], chrono_tz::UTC)
                .await
                .unwrap();
        let second =
            optimize_schedule(&ScriptedModel::returning(script), &tasks, &[], &[], chrono_tz::UTC)
                .await
                .unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].event_type, EventType::Task);
    }

    #[tokio::test]
    async fn optimization_warns_but_never_rejects_bad_packing() {
        // two clashing task events, both outside the free window
        let script = r#"[{"summary":"a","start_iso":"2024-01-01T20:00:00",
            "end_iso":"2024-01-01T21:00:00","description":"","event_type":"task"},
            {"summary":"b","start_iso":"2024-01-01T20:30:00",
            "end_iso":"2024-01-01T21:30:00","description":"","event_type":"task"}]"#;
        let tasks = vec![Task::new("t1", "a"), Task::new("t2", "b")];
        let windows = vec![TimeInterval::new(
            chrono::Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            chrono::Utc.with_ymd_and_hms(2024, 1, 1, 18, 0, 0).unwrap(),
        )];

        let events = optimize_schedule(
            &ScriptedModel::returning(script),
            &tasks,
            &[],
            &windows,
            chrono_tz::UTC,
        )
        .await
        .unwrap();

        assert!(event::tasks_overlap(&events, chrono_tz::UTC));
        assert!(!event::within_windows(&events, &windows, chrono_tz::UTC));
        // diagnostics are warn-only; the events come back untouched
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn commit_rejects_empty_batch_without_provider_calls() {
        let calendar = ScriptedCalendar::new(vec![]);
        assert!(commit_events(&calendar, "primary", &[]).await.is_err());
        assert_eq!(calendar.auth_calls.load(Ordering::SeqCst), 0);
        assert_eq!(calendar.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn commit_records_partial_success() {
        let calendar = ScriptedCalendar::new(vec![1]);
        let events = vec![event("a"), event("b"), event("c")];

        let outcome = commit_events(&calendar, "primary", &events).await.unwrap();
        assert_eq!(calendar.auth_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            outcome.created,
            vec![
                CreatedEntry { index: 0, summary: "a".into() },
                CreatedEntry { index: 2, summary: "c".into() },
            ]
        );
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].index, 1);
        assert!(outcome.failed[0].error.contains("quota"));
    }
}
