// File: ./src/model/mod.rs
pub mod adapter;
pub mod codec;
pub mod document;
pub mod item;
pub mod matcher;
pub mod ordering;

pub use adapter::{merge_tasks, tasks_from_document};
pub use codec::{ParsedCalendar, parse, serialize};
pub use document::{CalendarDocument, Component, Entry, Property, VTodoRecord};
pub use item::{DateType, Priority, Task, Timestamp, TodoStatus};
pub use matcher::filter_tasks;
pub use ordering::{SortDirection, TaskView, compare_tasks, sort_tasks};
