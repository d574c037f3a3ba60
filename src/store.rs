// File: src/store.rs
// In-memory state of one open calendar: its path, the parsed document and the
// task list derived from it. All task edits go through a session; views are
// recomputed from it on demand.
use crate::error::SkippedRecord;
use crate::model::{
    CalendarDocument, ParsedCalendar, SortDirection, Task, TaskView, tasks_from_document,
};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct CalendarSession {
    path: PathBuf,
    name: String,
    document: CalendarDocument,
    tasks: Vec<Task>,
    skipped: Vec<SkippedRecord>,
    revision: u64,
    saved_revision: u64,
}

/// Calendar name shown to the user: the file stem.
pub fn calendar_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Unknown")
        .to_string()
}

impl CalendarSession {
    /// A calendar that does not exist on disk yet.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            name: calendar_name(path),
            document: CalendarDocument::new(),
            tasks: Vec::new(),
            skipped: Vec::new(),
            revision: 0,
            saved_revision: 0,
        }
    }

    pub fn from_parsed(path: &Path, parsed: ParsedCalendar) -> Self {
        let name = calendar_name(path);
        let (tasks, dropped) = tasks_from_document(&parsed.document, &name);
        let mut skipped = parsed.skipped;
        skipped.extend(dropped.into_iter().map(|(uid, reason)| SkippedRecord {
            line: None,
            uid: Some(uid),
            reason,
        }));

        log::info!(
            "Loaded {} tasks from calendar '{}' ({} skipped)",
            tasks.len(),
            name,
            skipped.len()
        );

        Self {
            path: path.to_path_buf(),
            name,
            document: parsed.document,
            tasks,
            skipped,
            revision: 0,
            saved_revision: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn document(&self) -> &CalendarDocument {
        &self.document
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Records left out of `tasks` at load time.
    pub fn skipped(&self) -> &[SkippedRecord] {
        &self.skipped
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Bumped on every edit. Views built at an older revision are stale.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_dirty(&self) -> bool {
        self.revision != self.saved_revision
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn add_task(&mut self, mut task: Task) -> &Task {
        task.calendar_name = self.name.clone();
        log::debug!("Adding task {} to '{}'", task.id, self.name);
        self.tasks.push(task);
        self.touch();
        &self.tasks[self.tasks.len() - 1]
    }

    /// Replaces the task with the same id. Returns false if there is none.
    pub fn update_task(&mut self, mut task: Task) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(slot) => {
                task.calendar_name = self.name.clone();
                *slot = task;
                self.touch();
                true
            }
            None => false,
        }
    }

    /// Flips completion and returns the new state.
    pub fn toggle_completed(&mut self, id: &str) -> Option<bool> {
        let task = self.tasks.iter_mut().find(|t| t.id == id)?;
        task.completed = !task.completed;
        let state = task.completed;
        self.touch();
        Some(state)
    }

    pub fn delete_task(&mut self, id: &str) -> Option<Task> {
        let idx = self.tasks.iter().position(|t| t.id == id)?;
        let removed = self.tasks.remove(idx);
        self.touch();
        Some(removed)
    }

    pub fn view(
        &self,
        query: &str,
        incomplete_direction: SortDirection,
        completed_direction: SortDirection,
    ) -> TaskView {
        TaskView::build(&self.tasks, query, incomplete_direction, completed_direction)
    }

    /// Called by the store once `document` is on disk.
    pub(crate) fn mark_saved(&mut self, document: CalendarDocument, revision: u64) {
        self.document = document;
        self.saved_revision = revision;
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}
