// Logic for checking if tasks match search queries.
//
// A query is a single case-insensitive substring, matched against title,
// description and category. Missing fields count as empty strings.

use crate::model::item::Task;

impl Task {
    /// `needle` must already be lowercased.
    pub fn matches_search_term(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        let field_matches = |field: &str| field.to_lowercase().contains(needle);
        field_matches(&self.title)
            || field_matches(self.description.as_deref().unwrap_or_default())
            || field_matches(self.category.as_deref().unwrap_or_default())
    }
}

/// Returns the tasks matching `query`, in input order. A blank query returns
/// everything; otherwise surrounding spaces are part of the substring.
pub fn filter_tasks(tasks: &[Task], query: &str) -> Vec<Task> {
    if query.trim().is_empty() {
        return tasks.to_vec();
    }
    let needle = query.to_lowercase();
    tasks
        .iter()
        .filter(|t| t.matches_search_term(&needle))
        .cloned()
        .collect()
}
