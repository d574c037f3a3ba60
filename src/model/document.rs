// In-memory form of an iCalendar file: ordered top-level entries, VTODO records
// and opaque foreign components.
use crate::model::codec;
use crate::model::item::{DateType, Timestamp, TodoStatus};

pub const PRODID: &str = "-//caltodo//caltodo//EN";

/// Properties the task mapper understands. Everything else on a VTODO is carried
/// through untouched.
pub const MODELED_KEYS: &[&str] = &[
    "UID",
    "SUMMARY",
    "DESCRIPTION",
    "DUE",
    "PRIORITY",
    "STATUS",
    "CATEGORIES",
    "CREATED",
    "DTSTAMP",
];

/// One content line: `NAME;PARAM=VALUE:VALUE`.
///
/// `value` and parameter values are kept exactly as written (still escaped,
/// quotes included). `raw` holds the original physical lines when the property
/// came from a file, so an untouched property re-serializes byte for byte.
#[derive(Debug, Clone)]
pub struct Property {
    pub name: String,
    pub params: Vec<(String, String)>,
    pub value: String,
    pub(crate) raw: Option<Vec<String>>,
}

impl PartialEq for Property {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.params == other.params && self.value == other.value
    }
}

impl Eq for Property {}

impl Property {
    pub fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            params: Vec::new(),
            value: value.into(),
            raw: None,
        }
    }

    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Parameter value with surrounding quotes removed.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.trim_matches('"'))
    }

    /// Unfolded content line without line terminator.
    pub fn to_content_line(&self) -> String {
        let mut line = self.name.clone();
        for (k, v) in &self.params {
            line.push(';');
            line.push_str(k);
            line.push('=');
            line.push_str(v);
        }
        line.push(':');
        line.push_str(&self.value);
        line
    }

    pub fn is_modeled(&self) -> bool {
        MODELED_KEYS.iter().any(|k| self.is(k))
    }
}

/// A component kept verbatim (VEVENT, VTIMEZONE, VALARM, invalid VTODO blocks...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub name: String,
    /// Physical lines from BEGIN to END inclusive.
    pub lines: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct VTodoRecord {
    pub(crate) properties: Vec<Property>,
    pub(crate) components: Vec<Component>,
    /// Original physical lines of the whole block. Dropped on the first edit.
    pub(crate) source: Option<Vec<String>>,
}

impl PartialEq for VTodoRecord {
    fn eq(&self, other: &Self) -> bool {
        self.properties == other.properties && self.components == other.components
    }
}

impl Eq for VTodoRecord {}

impl VTodoRecord {
    pub(crate) fn new(uid: &str) -> Self {
        Self {
            properties: vec![Property::new("UID", uid)],
            components: Vec::new(),
            source: None,
        }
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// True when the record will be written back exactly as it was read.
    pub fn is_pristine(&self) -> bool {
        self.source.is_some()
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.is(name))
    }

    /// Properties the mapper does not model, in file order.
    pub fn unrecognized(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter().filter(|p| !p.is_modeled())
    }

    pub fn uid(&self) -> &str {
        self.property("UID").map(|p| p.value.trim()).unwrap_or_default()
    }

    pub fn summary(&self) -> Option<String> {
        self.text("SUMMARY")
    }

    pub fn description(&self) -> Option<String> {
        self.text("DESCRIPTION")
    }

    pub fn status(&self) -> TodoStatus {
        self.property("STATUS")
            .map(|p| TodoStatus::from_ical(&p.value))
            .unwrap_or(TodoStatus::NeedsAction)
    }

    /// PRIORITY as an integer. Values outside 0-9 count as absent.
    pub fn priority(&self) -> Option<u8> {
        self.property("PRIORITY")
            .and_then(|p| p.value.trim().parse::<u8>().ok())
            .filter(|p| *p <= 9)
    }

    /// All CATEGORIES entries; several CATEGORIES lines are concatenated.
    pub fn categories(&self) -> Vec<String> {
        self.properties
            .iter()
            .filter(|p| p.is("CATEGORIES"))
            .flat_map(|p| codec::split_text_list(&p.value))
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    }

    pub fn due(&self) -> Option<DateType> {
        self.property("DUE").and_then(codec::parse_date_property)
    }

    pub fn created(&self) -> Option<Timestamp> {
        self.timestamp("CREATED")
    }

    pub fn dtstamp(&self) -> Option<Timestamp> {
        self.timestamp("DTSTAMP")
    }

    fn text(&self, name: &str) -> Option<String> {
        self.property(name).map(|p| codec::unescape_text(&p.value))
    }

    fn timestamp(&self, name: &str) -> Option<Timestamp> {
        self.property(name)
            .and_then(codec::parse_date_property)
            .map(|d| d.to_timestamp())
    }

    // --- EDITING (crate-internal; the mapper is the only writer) ---

    /// Replaces the first `name` property in place and drops any duplicates.
    /// `None` removes every occurrence. New properties go to the end.
    pub(crate) fn set(&mut self, name: &str, prop: Option<Property>) {
        self.source = None;
        let first = self.properties.iter().position(|p| p.is(name));
        match (first, prop) {
            (Some(idx), Some(prop)) => {
                self.properties[idx] = prop;
                let mut seen = 0usize;
                self.properties.retain(|p| {
                    if p.is(name) {
                        seen += 1;
                        seen == 1
                    } else {
                        true
                    }
                });
            }
            (None, Some(prop)) => self.properties.push(prop),
            (_, None) => self.properties.retain(|p| !p.is(name)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Property(Property),
    Todo(VTodoRecord),
    Component(Component),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CalendarDocument {
    pub(crate) entries: Vec<Entry>,
}

impl CalendarDocument {
    /// Empty calendar with the standard header.
    pub fn new() -> Self {
        Self {
            entries: vec![
                Entry::Property(Property::new("VERSION", "2.0")),
                Entry::Property(Property::new("PRODID", PRODID)),
                Entry::Property(Property::new("CALSCALE", "GREGORIAN")),
            ],
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Top-level properties in file order.
    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.entries.iter().filter_map(|e| match e {
            Entry::Property(p) => Some(p),
            _ => None,
        })
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties().find(|p| p.is(name))
    }

    pub fn todos(&self) -> impl Iterator<Item = &VTodoRecord> {
        self.entries.iter().filter_map(|e| match e {
            Entry::Todo(t) => Some(t),
            _ => None,
        })
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.entries.iter().filter_map(|e| match e {
            Entry::Component(c) => Some(c),
            _ => None,
        })
    }

    pub fn find_todo(&self, uid: &str) -> Option<&VTodoRecord> {
        self.todos().find(|t| t.uid() == uid)
    }

    pub fn todo_count(&self) -> usize {
        self.todos().count()
    }
}
