// Tests for task sorting logic.
use caltodo::model::{Priority, SortDirection, Task, TaskView, Timestamp, compare_tasks, sort_tasks};
use chrono::{NaiveDate, TimeZone, Utc};
use std::cmp::Ordering;

fn task(id: &str, title: &str) -> Task {
    let mut t = Task::new(title);
    t.id = id.to_string();
    t.created_at = None;
    t
}

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

fn ids(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(|t| t.id.as_str()).collect()
}

#[test]
fn test_due_date_presence_rule() {
    let mut dated = task("dated", "x");
    dated.due_date = date(2024, 12, 15);
    let undated = task("undated", "x");

    assert_eq!(
        compare_tasks(&dated, &undated, SortDirection::Ascending),
        Ordering::Greater
    );
    assert_eq!(
        compare_tasks(&dated, &undated, SortDirection::Descending),
        Ordering::Less
    );
}

#[test]
fn test_due_dates_follow_direction() {
    let mut early = task("early", "x");
    early.due_date = date(2024, 1, 1);
    let mut late = task("late", "x");
    late.due_date = date(2024, 6, 1);

    let asc = sort_tasks(vec![late.clone(), early.clone()], SortDirection::Ascending);
    assert_eq!(ids(&asc), vec!["early", "late"]);
    let desc = sort_tasks(vec![early, late], SortDirection::Descending);
    assert_eq!(ids(&desc), vec!["late", "early"]);
}

#[test]
fn test_created_at_breaks_due_ties() {
    let mut older = task("older", "x");
    older.created_at = Some(Timestamp::Utc(Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()));
    let mut newer = task("newer", "x");
    newer.created_at = Some(Timestamp::Utc(Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap()));
    let never = task("never", "x");

    let asc = sort_tasks(
        vec![newer.clone(), never.clone(), older.clone()],
        SortDirection::Ascending,
    );
    assert_eq!(ids(&asc), vec!["never", "older", "newer"]);

    let desc = sort_tasks(vec![older, never, newer], SortDirection::Descending);
    assert_eq!(ids(&desc), vec!["newer", "older", "never"]);
}

#[test]
fn test_priority_ignores_direction() {
    let mut high = task("high", "x");
    high.priority = Priority::High;
    let mut low = task("low", "x");
    low.priority = Priority::Low;
    let medium = task("medium", "x");

    for direction in [SortDirection::Ascending, SortDirection::Descending] {
        let sorted = sort_tasks(vec![low.clone(), medium.clone(), high.clone()], direction);
        assert_eq!(ids(&sorted), vec!["high", "medium", "low"], "{}", direction);
    }
}

#[test]
fn test_title_flips_with_direction() {
    let apple = task("1", "apple");
    let banana = task("2", "Banana");

    let desc = sort_tasks(vec![banana.clone(), apple.clone()], SortDirection::Descending);
    assert_eq!(ids(&desc), vec!["1", "2"]);
    let asc = sort_tasks(vec![apple, banana], SortDirection::Ascending);
    assert_eq!(ids(&asc), vec!["2", "1"]);
}

#[test]
fn test_id_is_final_tie_break() {
    let a = task("a", "Same");
    let b = task("b", "same");
    for direction in [SortDirection::Ascending, SortDirection::Descending] {
        assert_eq!(compare_tasks(&a, &b, direction), Ordering::Less);
        assert_eq!(compare_tasks(&b, &a, direction), Ordering::Greater);
    }
}

#[test]
fn test_order_is_total_and_consistent() {
    let mut tasks = Vec::new();
    let dues = [None, date(2024, 1, 1), date(2024, 1, 2)];
    let prios = [Priority::High, Priority::Medium, Priority::Low];
    let titles = ["a", "B", "c"];
    let mut n = 0;
    for due in dues {
        for prio in prios {
            for title in titles {
                let mut t = task(&format!("id{:02}", n), title);
                t.due_date = due;
                t.priority = prio;
                tasks.push(t);
                n += 1;
            }
        }
    }

    for direction in [SortDirection::Ascending, SortDirection::Descending] {
        for a in &tasks {
            assert_eq!(compare_tasks(a, a, direction), Ordering::Equal);
            for b in &tasks {
                let ab = compare_tasks(a, b, direction);
                assert_eq!(ab, compare_tasks(b, a, direction).reverse());
                for c in &tasks {
                    if ab != Ordering::Greater
                        && compare_tasks(b, c, direction) != Ordering::Greater
                    {
                        assert_ne!(compare_tasks(a, c, direction), Ordering::Greater);
                    }
                }
            }
        }

        let sorted = sort_tasks(tasks.clone(), direction);
        let mut reversed_input = tasks.clone();
        reversed_input.reverse();
        assert_eq!(sorted, sort_tasks(reversed_input, direction));
    }
}

#[test]
fn test_view_sorts_each_group_independently() {
    let mut a = task("a", "x");
    a.due_date = date(2024, 1, 1);
    let mut b = task("b", "x");
    b.due_date = date(2024, 2, 1);
    let mut c = task("c", "x");
    c.due_date = date(2024, 1, 1);
    c.completed = true;
    let mut d = task("d", "x");
    d.due_date = date(2024, 2, 1);
    d.completed = true;

    let view = TaskView::build(
        &[a, b, c, d],
        "",
        SortDirection::Ascending,
        SortDirection::Descending,
    );
    assert_eq!(ids(&view.incomplete), vec!["a", "b"]);
    assert_eq!(ids(&view.completed), vec!["d", "c"]);
}

#[test]
fn test_direction_toggle() {
    assert_eq!(SortDirection::Ascending.toggled(), SortDirection::Descending);
    assert_eq!(SortDirection::default(), SortDirection::Ascending);
    assert_eq!("DESCENDING".parse::<SortDirection>().unwrap(), SortDirection::Descending);
}
