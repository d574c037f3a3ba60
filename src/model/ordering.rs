// Deterministic ordering of task lists.
//
// Keys, in order: due date, creation time, priority, title, id. Direction
// flips the date, creation and title keys but never priority.
use crate::model::item::Task;
use crate::model::matcher::filter_tasks;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use strum::{Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Compares optional keys. Present values sort before missing ones when
/// descending and after them when ascending.
fn compare_optional<T: Ord>(a: Option<&T>, b: Option<&T>, direction: SortDirection) -> Ordering {
    match (a, b, direction) {
        (Some(x), Some(y), SortDirection::Ascending) => x.cmp(y),
        (Some(x), Some(y), SortDirection::Descending) => y.cmp(x),
        (Some(_), None, SortDirection::Ascending) => Ordering::Greater,
        (Some(_), None, SortDirection::Descending) => Ordering::Less,
        (None, Some(_), SortDirection::Ascending) => Ordering::Less,
        (None, Some(_), SortDirection::Descending) => Ordering::Greater,
        (None, None, _) => Ordering::Equal,
    }
}

fn compare_titles(a: &Task, b: &Task, direction: SortDirection) -> Ordering {
    let ord = a.title.to_lowercase().cmp(&b.title.to_lowercase());
    match direction {
        SortDirection::Ascending => ord.reverse(),
        SortDirection::Descending => ord,
    }
}

/// Total order over tasks for a fixed direction.
pub fn compare_tasks(a: &Task, b: &Task, direction: SortDirection) -> Ordering {
    compare_optional(a.due_date.as_ref(), b.due_date.as_ref(), direction)
        .then_with(|| compare_optional(a.created_at.as_ref(), b.created_at.as_ref(), direction))
        .then(a.priority.rank().cmp(&b.priority.rank()))
        .then_with(|| compare_titles(a, b, direction))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn sort_tasks(mut tasks: Vec<Task>, direction: SortDirection) -> Vec<Task> {
    tasks.sort_by(|a, b| compare_tasks(a, b, direction));
    tasks
}

/// The two lists a task UI shows: open tasks and done tasks, each sorted
/// with its own direction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskView {
    pub incomplete: Vec<Task>,
    pub completed: Vec<Task>,
}

impl TaskView {
    /// Filters by `query` first, then splits and sorts.
    pub fn build(
        tasks: &[Task],
        query: &str,
        incomplete_direction: SortDirection,
        completed_direction: SortDirection,
    ) -> Self {
        let (completed, incomplete): (Vec<Task>, Vec<Task>) = filter_tasks(tasks, query)
            .into_iter()
            .partition(|t| t.completed);
        Self {
            incomplete: sort_tasks(incomplete, incomplete_direction),
            completed: sort_tasks(completed, completed_direction),
        }
    }

    pub fn len(&self) -> usize {
        self.incomplete.len() + self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
