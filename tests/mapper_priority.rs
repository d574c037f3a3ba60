// File: tests/mapper_priority.rs
use caltodo::model::{CalendarDocument, Priority, Task, merge_tasks, parse, tasks_from_document};

fn task_with_priority(value: Option<&str>) -> Task {
    let prio = value
        .map(|v| format!("PRIORITY:{}\r\n", v))
        .unwrap_or_default();
    let text = format!(
        "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VTODO\r\nUID:x\r\nSUMMARY:x\r\n{}END:VTODO\r\nEND:VCALENDAR\r\n",
        prio
    );
    let parsed = parse(&text).unwrap();
    assert_eq!(parsed.skipped_count(), 0);
    let (mut tasks, _) = tasks_from_document(&parsed.document, "");
    tasks.remove(0)
}

#[test]
fn test_priority_buckets() {
    let cases = [
        (None, Priority::Medium),
        (Some("0"), Priority::Medium),
        (Some("1"), Priority::High),
        (Some("2"), Priority::High),
        (Some("3"), Priority::High),
        (Some("4"), Priority::Medium),
        (Some("5"), Priority::Medium),
        (Some("6"), Priority::Medium),
        (Some("7"), Priority::Low),
        (Some("8"), Priority::Low),
        (Some("9"), Priority::Low),
    ];
    for (input, expected) in cases {
        assert_eq!(
            task_with_priority(input).priority,
            expected,
            "PRIORITY {:?}",
            input
        );
    }
}

#[test]
fn test_out_of_range_priority_is_absent() {
    for input in ["10", "42", "-1", "300"] {
        assert_eq!(
            task_with_priority(Some(input)).priority,
            Priority::Medium,
            "PRIORITY {}",
            input
        );
    }
}

#[test]
fn test_priority_rewrite_is_lossy() {
    let text = "BEGIN:VCALENDAR\r\nBEGIN:VTODO\r\nUID:a\r\nSUMMARY:a\r\nPRIORITY:3\r\nEND:VTODO\r\nBEGIN:VTODO\r\nUID:b\r\nSUMMARY:b\r\nPRIORITY:9\r\nEND:VTODO\r\nBEGIN:VTODO\r\nUID:c\r\nSUMMARY:c\r\nPRIORITY:4\r\nEND:VTODO\r\nEND:VCALENDAR\r\n";
    let doc = parse(text).unwrap().document;
    let (tasks, _) = tasks_from_document(&doc, "");
    let edited: Vec<Task> = tasks
        .into_iter()
        .map(|mut t| {
            t.title.push('!');
            t
        })
        .collect();

    let merged = merge_tasks(&doc, &edited);
    assert_eq!(merged.find_todo("a").unwrap().priority(), Some(1));
    assert_eq!(merged.find_todo("b").unwrap().priority(), Some(8));
    assert_eq!(merged.find_todo("c").unwrap().priority(), Some(5));
}

#[test]
fn test_untouched_priority_is_not_rewritten() {
    let text = "BEGIN:VCALENDAR\r\nBEGIN:VTODO\r\nUID:a\r\nSUMMARY:a\r\nPRIORITY:3\r\nEND:VTODO\r\nEND:VCALENDAR\r\n";
    let doc = parse(text).unwrap().document;
    let (tasks, _) = tasks_from_document(&doc, "");
    let merged = merge_tasks(&doc, &tasks);
    assert_eq!(merged.find_todo("a").unwrap().priority(), Some(3));
}

#[test]
fn test_new_task_record_fields() {
    let mut task = Task::new("Fresh");
    task.priority = Priority::Low;
    let merged = merge_tasks(&CalendarDocument::new(), std::slice::from_ref(&task));
    let record = merged.find_todo(&task.id).unwrap();
    assert_eq!(record.uid(), task.id);
    assert_eq!(record.priority(), Some(8));
    assert!(record.dtstamp().is_some());
    assert_eq!(record.summary().as_deref(), Some("Fresh"));
}
