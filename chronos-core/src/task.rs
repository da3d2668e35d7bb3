//! Task model: the unit of work produced by the extraction stage.
//!
//! Tasks live only for the duration of one request; nothing here is persisted
//! beyond the audit log.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    /// Urgent
    P1,
    /// Standard
    P2,
    /// Low; may be dropped entirely when no room remains
    P3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintType {
    /// Must start at `fixed_time_iso`.
    Fixed,
    /// Placement is decided by the optimizer.
    Flexible,
}

/// A candidate unit of work extracted from a brain dump.
///
/// `id` is only unique within one extraction batch (short strings like
/// "t1", "t2"). `fixed_time_iso` stays a raw string: it is model output that is
/// echoed downstream verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub priority: Priority,

    /// Minutes; positive. Extraction fills category defaults when the user
    /// gave none (call=15, gym=60, meeting=30, work=120).
    pub estimated_duration_minutes: u32,

    pub constraint_type: ConstraintType,

    /// Required when `constraint_type == Fixed`, null otherwise.
    pub fixed_time_iso: Option<String>,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            priority: Priority::P2,
            estimated_duration_minutes: 30,
            constraint_type: ConstraintType::Flexible,
            fixed_time_iso: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.estimated_duration_minutes = minutes;
        self
    }

    pub fn fixed_at(mut self, iso: impl Into<String>) -> Self {
        self.constraint_type = ConstraintType::Fixed;
        self.fixed_time_iso = Some(iso.into());
        self
    }
}

/// Check the batch invariants the extraction prompt is supposed to enforce:
/// non-empty ids unique within the batch, positive durations, and
/// `fixed_time_iso` present iff the constraint is fixed.
///
/// Violations are returned as human-readable strings; the stages log them
/// instead of rejecting the batch (prompt-enforced, not code-enforced).
pub fn check_batch(tasks: &[Task]) -> Vec<String> {
    let mut problems = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for t in tasks {
        if t.id.is_empty() {
            problems.push(format!("task '{}' has an empty id", t.title));
        } else if !seen.insert(t.id.as_str()) {
            problems.push(format!("duplicate task id '{}'", t.id));
        }

        if t.estimated_duration_minutes == 0 {
            problems.push(format!("task '{}' has zero duration", t.id));
        }

        match (t.constraint_type, t.fixed_time_iso.as_deref()) {
            (ConstraintType::Fixed, None) => {
                problems.push(format!("fixed task '{}' is missing fixed_time_iso", t.id));
            }
            (ConstraintType::Flexible, Some(_)) => {
                problems.push(format!("flexible task '{}' carries fixed_time_iso", t.id));
            }
            _ => {}
        }
    }

    problems
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_batch_passes() {
        let tasks = vec![
            Task::new("t1", "call mom").with_duration(15),
            Task::new("t2", "gym").with_duration(60).fixed_at("2024-01-01T18:00:00"),
        ];
        assert!(check_batch(&tasks).is_empty());
    }

    #[test]
    fn test_duplicate_ids_flagged() {
        let tasks = vec![Task::new("t1", "a"), Task::new("t1", "b")];
        let problems = check_batch(&tasks);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("duplicate"));
    }

    #[test]
    fn test_fixed_without_time_flagged() {
        let mut t = Task::new("t1", "dentist");
        t.constraint_type = ConstraintType::Fixed;
        let problems = check_batch(&[t]);
        assert!(problems[0].contains("missing fixed_time_iso"));
    }

    #[test]
    fn test_priority_order_matches_urgency() {
        assert!(Priority::P1 < Priority::P2);
        assert!(Priority::P2 < Priority::P3);
    }

    #[test]
    fn test_task_serde_shape() {
        let t = Task::new("t1", "gym").with_duration(60).fixed_at("2024-01-01T18:00:00");
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["priority"], "P2");
        assert_eq!(json["constraint_type"], "fixed");
        assert_eq!(json["fixed_time_iso"], "2024-01-01T18:00:00");

        let back: Task = serde_json::from_value(json).unwrap();
        assert_eq!(back, t);
    }
}
