use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 10;
pub const DEFAULT_PRIORITY: u8 = 5;

/// The authenticated user a request acts for. Every task query and mutation
/// takes one of these; there is no unscoped entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct OwnerId(i64);

impl OwnerId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse grouping of the 1..=10 priority scale. Lower numbers are more
/// urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityBand {
    High,
    Medium,
    Low,
}

impl PriorityBand {
    pub fn of(priority: u8) -> Self {
        match priority {
            0..=3 => Self::High,
            4..=7 => Self::Medium,
            _ => Self::Low,
        }
    }

    /// Inclusive bounds of the band on the priority scale.
    pub fn bounds(self) -> (u8, u8) {
        match self {
            Self::High => (MIN_PRIORITY, 3),
            Self::Medium => (4, 7),
            Self::Low => (8, MAX_PRIORITY),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for PriorityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: i64,
    pub owner: OwnerId,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: u8,
    pub due_date: Option<DateTime<Utc>>,
    pub order_index: f64,
    pub category_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Returns display icon: x=done, .=pending
    pub fn icon(&self) -> &'static str {
        if self.completed {
            "x"
        } else {
            "."
        }
    }

    pub fn band(&self) -> PriorityBand {
        PriorityBand::of(self.priority)
    }
}

/// Fields for a new task. `order_index` is allocated after the owner's
/// current last task when left unset.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<u8>,
    pub due_date: Option<DateTime<Utc>>,
    pub category_id: Option<i64>,
    pub order_index: Option<f64>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Partial update. A `None` slot leaves the field alone; for nullable
/// fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
    pub priority: Option<u8>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub category_id: Option<Option<i64>>,
    pub order_index: Option<f64>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.completed.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.category_id.is_none()
            && self.order_index.is_none()
    }

    /// Copy every supplied field onto `task`. Validation happens before this
    /// is called.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(category_id) = self.category_id {
            task.category_id = category_id;
        }
        if let Some(order_index) = self.order_index {
            task.order_index = order_index;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub id: i64,
    pub owner: OwnerId,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Task {
        let now = Utc::now();
        Task {
            id: 1,
            owner: OwnerId::new(1),
            title: "Write report".into(),
            description: Some("quarterly".into()),
            completed: false,
            priority: 5,
            due_date: Some(now),
            order_index: 1.0,
            category_id: Some(3),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn bands_cover_the_scale() {
        assert_eq!(PriorityBand::of(1), PriorityBand::High);
        assert_eq!(PriorityBand::of(3), PriorityBand::High);
        assert_eq!(PriorityBand::of(4), PriorityBand::Medium);
        assert_eq!(PriorityBand::of(7), PriorityBand::Medium);
        assert_eq!(PriorityBand::of(8), PriorityBand::Low);
        assert_eq!(PriorityBand::of(10), PriorityBand::Low);
        assert_eq!(PriorityBand::Medium.bounds(), (4, 7));
    }

    #[test]
    fn empty_patch_changes_nothing() {
        let mut task = sample();
        let before = task.clone();
        let patch = TaskPatch::default();
        assert!(patch.is_empty());
        patch.apply_to(&mut task);
        assert_eq!(task, before);
    }

    #[test]
    fn patch_touches_only_supplied_fields() {
        let mut task = sample();
        let patch = TaskPatch {
            priority: Some(2),
            description: Some(None),
            ..TaskPatch::default()
        };
        patch.apply_to(&mut task);
        assert_eq!(task.priority, 2);
        assert!(task.description.is_none());
        assert_eq!(task.title, "Write report");
        assert_eq!(task.category_id, Some(3));
        assert!(task.due_date.is_some());
    }

    #[test]
    fn patch_can_clear_nullable_fields() {
        let mut task = sample();
        let patch = TaskPatch {
            due_date: Some(None),
            category_id: Some(None),
            ..TaskPatch::default()
        };
        patch.apply_to(&mut task);
        assert!(task.due_date.is_none());
        assert!(task.category_id.is_none());
    }
}
