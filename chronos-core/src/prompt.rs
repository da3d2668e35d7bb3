//! Prompt templates for the two model-backed stages.
//!
//! The wording carries the actual scheduling policy (priority legend, duration
//! defaults, splitting rule, packing rules); keep edits deliberate.

use serde_json::json;

use crate::event::TimeInterval;
use crate::task::Task;

/// System instruction for the task extractor.
///
/// `date_iso` may be empty when neither the request nor the configuration
/// supplied one; the model then works without a reference date. Known busy
/// intervals, when given, are appended so fixed-time suggestions avoid them.
pub fn parser_instruction(date_iso: &str, busy: Option<&[TimeInterval]>) -> String {
    let mut s = format!(
        "You are a task parser. Extract tasks from user input.\n\
         Date: {date_iso}\n\
         Priority: P1=urgent, P2=standard, P3=low\n\
         Duration: estimate if missing (call=15m, gym=60m, meeting=30m, work=120m)\n\
         Constraints: if user says \"at 1pm\", mark constraint_type=\"fixed\" and set fixed_time_iso\n\
         IDs: short unique strings (t1, t2, etc)\n\
         Split tasks >2 hours into 1-hour blocks with 15min breaks.\n\
         Be concise. Output only valid JSON.\n"
    );

    if let Some(busy) = busy {
        if !busy.is_empty() {
            s.push_str(&format!(
                "Known busy intervals (avoid suggesting fixed times inside them): {}\n",
                intervals_json(busy)
            ));
        }
    }

    s
}

/// User prompt wrapping the raw brain dump.
pub fn parser_prompt(text: &str) -> String {
    format!("User Goal Description: {text}")
}

/// System instruction for the schedule optimizer. Busy intervals are embedded
/// verbatim as a conflict-avoidance directive.
pub fn optimizer_instruction(busy: &[TimeInterval]) -> String {
    format!(
        "Current Calendar Events: Given is the start and end date and time of events \
         already in the calendar: {busy}. Do not schedule tasks that overlap with these \
         events, instead choose slots around these start and end dates.\n\
         Schedule tasks into free windows. Output JSON list of events.\n\
         Priority: P1 first, then P2, then P3.\n\
         Rules:\n\
         - Don't exceed window duration\n\
         - Add 10min break between tasks if space allows\n\
         - Insert breaks explicitly as event_type='break'\n\
         - Use exact ISO start/end times\n\
         - Skip P3 if no time\n\
         Be concise. Output only valid JSON.\n",
        busy = intervals_json(busy)
    )
}

/// User prompt for the optimizer: the state payload the model packs from.
pub fn optimizer_prompt(tasks: &[Task], free_windows: &[TimeInterval]) -> String {
    let payload = json!({
        "tasks_to_schedule": tasks,
        "available_time_windows": free_windows,
    });
    // pretty-printed so window bounds line up readably inside the prompt
    let payload = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string());
    format!("Optimize this schedule:\n{payload}")
}

fn intervals_json(intervals: &[TimeInterval]) -> String {
    serde_json::to_string(intervals).unwrap_or_else(|_| "[]".to_string())
}
