// File: ./src/model/item.rs
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

// --- DATE TYPES ---

/// A DATE-TIME value. `Floating` covers both bare local times and TZID-qualified
/// values, since timezones other than UTC are not interpreted.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Timestamp {
    Utc(DateTime<Utc>),
    Floating(NaiveDateTime),
}

impl Timestamp {
    /// Current UTC time truncated to whole seconds (the iCalendar resolution).
    pub fn now() -> Self {
        let now = Utc::now();
        Timestamp::Utc(now.with_nanosecond(0).unwrap_or(now))
    }

    /// Wall-clock value as written in the file.
    pub fn naive(&self) -> NaiveDateTime {
        match self {
            Timestamp::Utc(dt) => dt.naive_utc(),
            Timestamp::Floating(n) => *n,
        }
    }

    /// The date component as written. Never shifted by the local timezone.
    pub fn date_naive(&self) -> NaiveDate {
        self.naive().date()
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        let rank = |t: &Timestamp| match t {
            Timestamp::Utc(_) => 0,
            Timestamp::Floating(_) => 1,
        };
        self.naive()
            .cmp(&other.naive())
            .then(rank(self).cmp(&rank(other)))
    }
}

/// A DATE or DATE-TIME property value.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum DateType {
    AllDay(NaiveDate),
    Specific(Timestamp),
}

impl DateType {
    /// Calendar day of the value. A date-time is truncated to its own date part.
    pub fn date_naive(&self) -> NaiveDate {
        match self {
            DateType::AllDay(d) => *d,
            DateType::Specific(ts) => ts.date_naive(),
        }
    }

    /// Interprets the value as an instant-ish timestamp. All-day values map to midnight.
    pub fn to_timestamp(&self) -> Timestamp {
        match self {
            DateType::AllDay(d) => Timestamp::Floating(d.and_time(chrono::NaiveTime::MIN)),
            DateType::Specific(ts) => *ts,
        }
    }
}

// --- ENUMS ---

#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Buckets an iCalendar PRIORITY. Absent, 0 and out-of-range values are medium.
    pub fn from_ical(value: Option<u8>) -> Self {
        match value {
            Some(1..=3) => Priority::High,
            Some(4..=6) => Priority::Medium,
            Some(7..=9) => Priority::Low,
            _ => Priority::Medium,
        }
    }

    /// Representative PRIORITY written back for a bucket.
    ///
    /// This is lossy: a task loaded with PRIORITY:2 and then edited is saved as
    /// PRIORITY:1. Only three levels exist in the task model, so the original
    /// 1-9 granularity cannot be recovered once a record is rewritten.
    pub fn to_ical(self) -> u8 {
        match self {
            Priority::High => 1,
            Priority::Medium => 5,
            Priority::Low => 8,
        }
    }

    /// 0 = most important.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum TodoStatus {
    NeedsAction,
    InProcess,
    Completed,
    Cancelled,
    Other(String),
}

impl TodoStatus {
    pub fn from_ical(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "NEEDS-ACTION" => TodoStatus::NeedsAction,
            "IN-PROCESS" => TodoStatus::InProcess,
            "COMPLETED" => TodoStatus::Completed,
            "CANCELLED" => TodoStatus::Cancelled,
            _ => TodoStatus::Other(value.trim().to_string()),
        }
    }

    pub fn as_ical(&self) -> &str {
        match self {
            TodoStatus::NeedsAction => "NEEDS-ACTION",
            TodoStatus::InProcess => "IN-PROCESS",
            TodoStatus::Completed => "COMPLETED",
            TodoStatus::Cancelled => "CANCELLED",
            TodoStatus::Other(s) => s,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, TodoStatus::Completed)
    }
}

// --- TASK ---

/// Application-level view of a VTODO, as handed to the presentation layer.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,

    /// Which calendar the task was loaded from. Never written to the file.
    #[serde(default)]
    pub calendar_name: String,
}

impl Task {
    pub fn new(title: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.trim().to_string(),
            description: None,
            completed: false,
            priority: Priority::default(),
            category: None,
            due_date: None,
            created_at: Some(Timestamp::now()),
            calendar_name: String::new(),
        }
    }

    /// Field equality ignoring the transient calendar name.
    pub fn same_content(&self, other: &Task) -> bool {
        self.id == other.id
            && self.title == other.title
            && self.description == other.description
            && self.completed == other.completed
            && self.priority == other.priority
            && self.category == other.category
            && self.due_date == other.due_date
            && self.created_at == other.created_at
    }

    pub fn checkbox_symbol(&self) -> &'static str {
        if self.completed { "[✔]" } else { "[ ]" }
    }
}
