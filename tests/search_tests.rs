// File: tests/search_tests.rs
use caltodo::model::{SortDirection, Task, TaskView, filter_tasks};

fn sample() -> Vec<Task> {
    let mut milk = Task::new("Buy milk");
    milk.category = Some("Errands".to_string());
    let mut bank = Task::new("Call bank");
    bank.description = Some("Ask about the MORTGAGE rate".to_string());
    bank.completed = true;
    let report = Task::new("Write report");
    vec![milk, bank, report]
}

fn titles(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(|t| t.title.as_str()).collect()
}

#[test]
fn test_matches_title_description_and_category() {
    let tasks = sample();
    assert_eq!(titles(&filter_tasks(&tasks, "MILK")), vec!["Buy milk"]);
    assert_eq!(titles(&filter_tasks(&tasks, "mortgage")), vec!["Call bank"]);
    assert_eq!(titles(&filter_tasks(&tasks, "errand")), vec!["Buy milk"]);
    assert!(filter_tasks(&tasks, "nothing like this").is_empty());
}

#[test]
fn test_blank_query_returns_everything() {
    let tasks = sample();
    assert_eq!(filter_tasks(&tasks, ""), tasks);
    assert_eq!(filter_tasks(&tasks, "   \t"), tasks);
}

#[test]
fn test_spaces_are_part_of_the_query() {
    let tasks = sample();
    assert_eq!(titles(&filter_tasks(&tasks, " report")), vec!["Write report"]);
    assert!(filter_tasks(&tasks, "report ").is_empty());
}

#[test]
fn test_filter_is_idempotent() {
    let tasks = sample();
    for query in ["", "b", "MILK", "r", "zzz", " bank "] {
        let once = filter_tasks(&tasks, query);
        assert_eq!(filter_tasks(&once, query), once, "query {:?}", query);
    }
}

#[test]
fn test_filter_runs_before_split() {
    let tasks = sample();
    let view = TaskView::build(&tasks, "ba", SortDirection::Ascending, SortDirection::Descending);
    assert!(view.incomplete.is_empty());
    assert_eq!(titles(&view.completed), vec!["Call bank"]);
}
