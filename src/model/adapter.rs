// File: src/model/adapter.rs
// Maps VTODO records to tasks and back.
use crate::error::SkipReason;
use crate::model::codec::{self, date_property, escape_text, format_timestamp};
use crate::model::document::{CalendarDocument, Entry, Property, VTodoRecord};
use crate::model::item::{DateType, Priority, Task, Timestamp, TodoStatus};
use std::collections::{HashMap, HashSet};

impl Task {
    /// Projects a record onto the task model. Records without a title are dropped.
    pub fn from_record(record: &VTodoRecord, calendar_name: &str) -> Result<Task, SkipReason> {
        let title = record
            .summary()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(SkipReason::MissingSummary)?;

        Ok(Task {
            id: record.uid().to_string(),
            title,
            description: record.description().filter(|d| !d.is_empty()),
            completed: record.status().is_completed(),
            priority: Priority::from_ical(record.priority()),
            category: record.categories().into_iter().next(),
            due_date: record.due().map(|d| d.date_naive()),
            created_at: record.created().or_else(|| record.dtstamp()),
            calendar_name: calendar_name.to_string(),
        })
    }

    /// Builds the record to persist for this task.
    ///
    /// With a `previous` record, unchanged tasks return it untouched; otherwise
    /// only modeled properties are rewritten and everything else is kept in place.
    pub fn to_record(&self, previous: Option<&VTodoRecord>) -> VTodoRecord {
        match previous {
            Some(prev) => self.merge_record(prev),
            None => self.fresh_record(),
        }
    }

    fn fresh_record(&self) -> VTodoRecord {
        let mut record = VTodoRecord::new(&self.id);
        record.set(
            "DTSTAMP",
            Some(Property::new("DTSTAMP", format_timestamp(&Timestamp::now()))),
        );
        if let Some(created) = &self.created_at {
            record.set("CREATED", Some(Property::new("CREATED", format_timestamp(created))));
        }
        record.set("SUMMARY", Some(Property::new("SUMMARY", escape_text(&self.title))));
        if let Some(desc) = self.description.as_deref().filter(|d| !d.is_empty()) {
            record.set("DESCRIPTION", Some(Property::new("DESCRIPTION", escape_text(desc))));
        }
        record.set("STATUS", Some(self.status_property(&TodoStatus::NeedsAction)));
        record.set("PRIORITY", Some(self.priority_property()));
        if let Some(cat) = &self.category {
            record.set(
                "CATEGORIES",
                Some(Property::new("CATEGORIES", escape_text(cat))),
            );
        }
        if let Some(due) = self.due_date {
            record.set("DUE", Some(date_property("DUE", &DateType::AllDay(due))));
        }
        record
    }

    fn merge_record(&self, prev: &VTodoRecord) -> VTodoRecord {
        if let Ok(before) = Task::from_record(prev, &self.calendar_name)
            && before.same_content(self)
        {
            return prev.clone();
        }

        let mut record = prev.clone();
        if prev.uid() != self.id {
            record.set("UID", Some(Property::new("UID", self.id.as_str())));
        }

        if prev.summary().map(|s| s.trim().to_string()).as_deref() != Some(self.title.as_str()) {
            record.set("SUMMARY", Some(Property::new("SUMMARY", escape_text(&self.title))));
        }

        if prev.description().filter(|d| !d.is_empty()) != self.description {
            let prop = self
                .description
                .as_deref()
                .filter(|d| !d.is_empty())
                .map(|d| Property::new("DESCRIPTION", escape_text(d)));
            record.set("DESCRIPTION", prop);
        }

        let status = prev.status();
        if status.is_completed() != self.completed {
            record.set("STATUS", Some(self.status_property(&status)));
        }

        // Lossy on purpose, see `Priority::to_ical`.
        record.set("PRIORITY", Some(self.priority_property()));

        let categories = prev.categories();
        if categories.first() != self.category.as_ref() {
            let prop = self.category.as_ref().map(|cat| {
                let mut merged = vec![cat.clone()];
                merged.extend(categories.iter().filter(|c| *c != cat).cloned());
                Property::new("CATEGORIES", codec::join_text_list(&merged))
            });
            record.set("CATEGORIES", prop);
        }

        let prev_due = prev.due();
        if prev_due.map(|d| d.date_naive()) != self.due_date {
            let prop = self
                .due_date
                .map(|d| date_property("DUE", &DateType::AllDay(d)));
            record.set("DUE", prop);
        }

        if prev.created() != self.created_at {
            let prop = self
                .created_at
                .map(|ts| Property::new("CREATED", format_timestamp(&ts)));
            record.set("CREATED", prop);
        }

        record.set(
            "DTSTAMP",
            Some(Property::new("DTSTAMP", format_timestamp(&Timestamp::now()))),
        );
        record
    }

    /// Completed tasks are COMPLETED. Incomplete tasks keep a previous
    /// non-completed status (IN-PROCESS, CANCELLED, ...) and otherwise become
    /// NEEDS-ACTION.
    fn status_property(&self, previous: &TodoStatus) -> Property {
        let status = if self.completed {
            TodoStatus::Completed
        } else if previous.is_completed() {
            TodoStatus::NeedsAction
        } else {
            previous.clone()
        };
        Property::new("STATUS", status.as_ical())
    }

    fn priority_property(&self) -> Property {
        Property::new("PRIORITY", self.priority.to_ical().to_string())
    }
}

/// Extracts tasks from a document. Records that cannot be projected are
/// returned separately with their reason.
///
/// Only the first record carrying a UID becomes a task. Later records with the
/// same UID (RECURRENCE-ID overrides) stay in the document untouched.
pub fn tasks_from_document(
    document: &CalendarDocument,
    calendar_name: &str,
) -> (Vec<Task>, Vec<(String, SkipReason)>) {
    let mut tasks = Vec::new();
    let mut dropped = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for record in document.todos() {
        if !seen.insert(record.uid()) {
            log::debug!("Keeping extra VTODO with UID {} as is", record.uid());
            continue;
        }
        match Task::from_record(record, calendar_name) {
            Ok(task) => tasks.push(task),
            Err(reason) => {
                log::warn!("Dropping VTODO {}: {}", record.uid(), reason);
                dropped.push((record.uid().to_string(), reason));
            }
        }
    }
    (tasks, dropped)
}

/// Re-injects `tasks` into a copy of `previous`.
///
/// Records are matched by UID. Matched records are rewritten through
/// [`Task::to_record`], tasks without a record are appended, and records that
/// were shown as tasks but are missing from `tasks` are deleted. Records that
/// never became tasks (e.g. no SUMMARY) are kept as they are.
///
/// Only the first record per UID is a task. Later records sharing that UID are
/// copied verbatim, unless the task itself was deleted.
pub fn merge_tasks(previous: &CalendarDocument, tasks: &[Task]) -> CalendarDocument {
    let by_id: HashMap<&str, &Task> = tasks.iter().map(|t| (t.id.as_str(), t)).collect();
    let mut written: HashSet<&str> = HashSet::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut deleted: HashSet<&str> = HashSet::new();
    let mut entries = Vec::with_capacity(previous.entries.len() + tasks.len());

    for entry in &previous.entries {
        match entry {
            Entry::Todo(record) => {
                let uid = record.uid();
                if !seen.insert(uid) {
                    if !deleted.contains(uid) {
                        entries.push(entry.clone());
                    }
                } else if let Some(task) = by_id.get(uid) {
                    written.insert(task.id.as_str());
                    entries.push(Entry::Todo(task.to_record(Some(record))));
                } else if Task::from_record(record, "").is_err() {
                    entries.push(entry.clone());
                } else {
                    log::debug!("Removing deleted task {}", uid);
                    deleted.insert(uid);
                }
            }
            other => entries.push(other.clone()),
        }
    }

    for task in tasks {
        if written.insert(task.id.as_str()) {
            log::debug!("Adding new task {}", task.id);
            entries.push(Entry::Todo(task.to_record(None)));
        }
    }

    CalendarDocument { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::codec::{parse, serialize};
    use chrono::NaiveDate;

    fn record(body: &str) -> VTodoRecord {
        let ics = format!("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VTODO\r\n{body}END:VTODO\r\nEND:VCALENDAR\r\n");
        parse(&ics)
            .expect("parse")
            .document
            .todos()
            .next()
            .cloned()
            .expect("one record")
    }

    #[test]
    fn test_from_record_fields() {
        let rec = record(
            "UID:t1\r\nSUMMARY:Pay\\, then file\r\nDESCRIPTION:line1\\nline2\r\nPRIORITY:2\r\nCATEGORIES:Work,Home\r\nDUE;VALUE=DATE:20241215\r\nCREATED:20240101T080000Z\r\n",
        );
        let task = Task::from_record(&rec, "Main").unwrap();
        assert_eq!(task.id, "t1");
        assert_eq!(task.title, "Pay, then file");
        assert_eq!(task.description.as_deref(), Some("line1\nline2"));
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.category.as_deref(), Some("Work"));
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2024, 12, 15));
        assert!(task.created_at.is_some());
        assert_eq!(task.calendar_name, "Main");
        assert!(!task.completed);
    }

    #[test]
    fn test_missing_summary_is_dropped() {
        let rec = record("UID:t1\r\nPRIORITY:2\r\n");
        assert_eq!(Task::from_record(&rec, ""), Err(SkipReason::MissingSummary));
    }

    #[test]
    fn test_datetime_due_truncated() {
        let rec = record("UID:t1\r\nSUMMARY:x\r\nDUE:20241215T233000Z\r\n");
        let task = Task::from_record(&rec, "").unwrap();
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2024, 12, 15));
    }

    #[test]
    fn test_created_falls_back_to_dtstamp() {
        let rec = record("UID:t1\r\nSUMMARY:x\r\nDTSTAMP:20240102T030405Z\r\n");
        let task = Task::from_record(&rec, "").unwrap();
        assert_eq!(
            task.created_at.map(|t| t.date_naive()),
            NaiveDate::from_ymd_opt(2024, 1, 2)
        );
    }

    #[test]
    fn test_unchanged_task_keeps_record() {
        let rec = record("UID:t1\r\nX-CUSTOM:keep me\r\nSUMMARY:x\r\nPRIORITY:2\r\n");
        let task = Task::from_record(&rec, "").unwrap();
        let out = task.to_record(Some(&rec));
        assert!(out.is_pristine());
        assert_eq!(out, rec);
    }

    #[test]
    fn test_modified_task_keeps_unknown_properties_in_place() {
        let rec = record(
            "UID:t1\r\nX-CUSTOM:keep me\r\nSUMMARY:x\r\nLOCATION:Office\r\nPRIORITY:2\r\n",
        );
        let mut task = Task::from_record(&rec, "").unwrap();
        task.completed = true;
        let out = task.to_record(Some(&rec));

        assert!(!out.is_pristine());
        assert_eq!(out.status(), TodoStatus::Completed);
        // Re-expanded representative, not the original 2.
        assert_eq!(out.priority(), Some(1));
        let unknown: Vec<&str> = out.unrecognized().map(|p| p.name.as_str()).collect();
        assert_eq!(unknown, vec!["X-CUSTOM", "LOCATION"]);
        let names: Vec<&str> = out.properties().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(&names[..4], &["UID", "X-CUSTOM", "SUMMARY", "LOCATION"]);
    }

    #[test]
    fn test_uncompleting_keeps_other_status() {
        let rec = record("UID:t1\r\nSUMMARY:x\r\nSTATUS:IN-PROCESS\r\n");
        let mut task = Task::from_record(&rec, "").unwrap();
        task.title = "y".to_string();
        let out = task.to_record(Some(&rec));
        assert_eq!(out.status(), TodoStatus::InProcess);
    }

    #[test]
    fn test_due_time_kept_when_date_unchanged() {
        let rec = record("UID:t1\r\nSUMMARY:x\r\nDUE:20241215T100000Z\r\n");
        let mut task = Task::from_record(&rec, "").unwrap();
        task.title = "renamed".to_string();
        let out = task.to_record(Some(&rec));
        assert_eq!(out.property("DUE").unwrap().value, "20241215T100000Z");

        task.due_date = NaiveDate::from_ymd_opt(2024, 12, 20);
        let out = task.to_record(Some(&rec));
        let due = out.property("DUE").unwrap();
        assert_eq!(due.value, "20241220");
        assert_eq!(due.param("VALUE"), Some("DATE"));
    }

    #[test]
    fn test_category_change_keeps_other_categories() {
        let rec = record("UID:t1\r\nSUMMARY:x\r\nCATEGORIES:Work,Urgent\r\n");
        let mut task = Task::from_record(&rec, "").unwrap();
        task.category = Some("Home".to_string());
        let out = task.to_record(Some(&rec));
        assert_eq!(out.categories(), vec!["Home", "Work", "Urgent"]);

        task.category = None;
        let out = task.to_record(Some(&rec));
        assert!(out.categories().is_empty());
    }

    #[test]
    fn test_fresh_record_roundtrip() {
        let mut task = Task::new("Write report; part 1, draft");
        task.description = Some("multi\nline".to_string());
        task.priority = Priority::Low;
        task.category = Some("Work".to_string());
        task.due_date = NaiveDate::from_ymd_opt(2025, 3, 1);

        let merged = merge_tasks(&CalendarDocument::new(), std::slice::from_ref(&task));
        let text = serialize(&merged);
        let reparsed = parse(&text).unwrap();
        let (tasks, dropped) = tasks_from_document(&reparsed.document, "");
        assert!(dropped.is_empty());
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].same_content(&task));
    }

    #[test]
    fn test_merge_keeps_untitled_records() {
        let ics = "BEGIN:VCALENDAR\r\nBEGIN:VTODO\r\nUID:a\r\nSUMMARY:A\r\nEND:VTODO\r\nBEGIN:VTODO\r\nUID:ghost\r\nEND:VTODO\r\nEND:VCALENDAR\r\n";
        let doc = parse(ics).unwrap().document;
        let merged = merge_tasks(&doc, &[]);
        let uids: Vec<&str> = merged.todos().map(|t| t.uid()).collect();
        assert_eq!(uids, vec!["ghost"]);
    }

    const SERIES: &str = "BEGIN:VCALENDAR\r\n\
BEGIN:VTODO\r\n\
UID:water\r\n\
SUMMARY:Water plants\r\n\
RRULE:FREQ=WEEKLY\r\n\
END:VTODO\r\n\
BEGIN:VTODO\r\n\
UID:water\r\n\
RECURRENCE-ID:20240108T090000Z\r\n\
SUMMARY:Water plants (moved)\r\n\
END:VTODO\r\n\
END:VCALENDAR\r\n";

    #[test]
    fn test_shared_uid_projects_first_record_only() {
        let doc = parse(SERIES).unwrap().document;
        let (tasks, dropped) = tasks_from_document(&doc, "");
        assert!(dropped.is_empty());
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Water plants");

        let merged = merge_tasks(&doc, &tasks);
        assert_eq!(serialize(&merged), SERIES);
    }

    #[test]
    fn test_shared_uid_override_survives_edit() {
        let doc = parse(SERIES).unwrap().document;
        let (mut tasks, _) = tasks_from_document(&doc, "");
        tasks[0].completed = true;

        let merged = merge_tasks(&doc, &tasks);
        let records: Vec<&VTodoRecord> = merged.todos().collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status(), TodoStatus::Completed);
        assert!(records[1].is_pristine());
        assert!(serialize(&merged).contains("RECURRENCE-ID:20240108T090000Z\r\nSUMMARY:Water plants (moved)\r\n"));
    }

    #[test]
    fn test_deleting_shared_uid_task_removes_overrides() {
        let doc = parse(SERIES).unwrap().document;
        let merged = merge_tasks(&doc, &[]);
        assert_eq!(merged.todos().count(), 0);
    }
}
