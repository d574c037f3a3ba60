// Parser and serializer for the VCALENDAR/VTODO subset of RFC 5545.
//
// Parsing is lenient: a broken VTODO block is reported and dropped, only a
// missing VCALENDAR container is fatal. Serialization re-emits untouched
// records from their original physical lines so a load/save cycle does not
// reflow or reorder anything it did not change.
use crate::error::{Error, Result, SkipReason, SkippedRecord};
use crate::model::document::{CalendarDocument, Component, Entry, Property, VTodoRecord};
use crate::model::item::{DateType, Timestamp};
use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

/// Maximum octets per physical line, excluding CRLF.
pub const FOLD_WIDTH: usize = 75;
const CRLF: &str = "\r\n";

/// Result of parsing one file.
#[derive(Debug, Clone)]
pub struct ParsedCalendar {
    pub document: CalendarDocument,
    pub skipped: Vec<SkippedRecord>,
}

impl ParsedCalendar {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// A logical (unfolded) line plus the physical lines it came from.
#[derive(Debug)]
struct ContentLine {
    text: String,
    raw: Vec<String>,
    line_no: usize,
}

impl ContentLine {
    fn begin_name(&self) -> Option<String> {
        marker(&self.text, "BEGIN:")
    }

    fn end_name(&self) -> Option<String> {
        marker(&self.text, "END:")
    }

    fn is_begin(&self, name: &str) -> bool {
        self.begin_name().is_some_and(|n| n == name)
    }

    fn is_end(&self, name: &str) -> bool {
        self.end_name().is_some_and(|n| n == name)
    }
}

fn marker(text: &str, prefix: &str) -> Option<String> {
    let head = text.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(text[prefix.len()..].trim().to_ascii_uppercase())
    } else {
        None
    }
}

/// Joins continuation lines (leading space or tab) onto the previous line.
/// Exactly one leading whitespace character is removed per continuation.
fn unfold(text: &str) -> Vec<ContentLine> {
    let mut out: Vec<ContentLine> = Vec::new();
    for (idx, physical) in text.lines().enumerate() {
        let physical = physical.strip_suffix('\r').unwrap_or(physical);
        if physical.is_empty() {
            continue;
        }
        if (physical.starts_with(' ') || physical.starts_with('\t'))
            && let Some(last) = out.last_mut()
        {
            last.text.push_str(&physical[1..]);
            last.raw.push(physical.to_string());
            continue;
        }
        out.push(ContentLine {
            text: physical.to_string(),
            raw: vec![physical.to_string()],
            line_no: idx + 1,
        });
    }
    out
}

/// Splits `NAME;P=V;Q="x:y":VALUE`. Returns `None` for lines with no name or colon.
pub fn parse_content_line(line: &str) -> Option<Property> {
    let bytes = line.as_bytes();
    let name_end = line.find([';', ':'])?;
    let name = &line[..name_end];
    if name.is_empty()
        || !name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return None;
    }

    let mut params = Vec::new();
    let mut pos = name_end;
    while bytes.get(pos) == Some(&b';') {
        let key_start = pos + 1;
        let eq = key_start + line[key_start..].find(['=', ':', ';'])?;
        if bytes[eq] != b'=' {
            return None;
        }
        let key = &line[key_start..eq];

        let mut cursor = eq + 1;
        let mut in_quote = false;
        while let Some(&b) = bytes.get(cursor) {
            match b {
                b'"' => in_quote = !in_quote,
                b';' | b':' if !in_quote => break,
                _ => {}
            }
            cursor += 1;
        }
        params.push((key.to_string(), line[eq + 1..cursor].to_string()));
        pos = cursor;
    }

    if bytes.get(pos) != Some(&b':') {
        return None;
    }

    Some(Property {
        name: name.to_string(),
        params,
        value: line[pos + 1..].to_string(),
        raw: None,
    })
}

fn to_property(line: &ContentLine) -> Option<Property> {
    let mut prop = parse_content_line(&line.text)?;
    prop.raw = Some(line.raw.clone());
    Some(prop)
}

/// Parses calendar text. Fails only when there is no BEGIN:VCALENDAR line.
pub fn parse(text: &str) -> Result<ParsedCalendar> {
    let lines = unfold(text);
    let start = lines
        .iter()
        .position(|l| l.is_begin("VCALENDAR"))
        .ok_or_else(|| Error::Format("missing BEGIN:VCALENDAR".to_string()))?;

    let mut document = CalendarDocument::default();
    let mut skipped = Vec::new();
    let mut closed = false;
    let mut i = start + 1;

    while i < lines.len() {
        let line = &lines[i];
        if line.is_end("VCALENDAR") {
            closed = true;
            break;
        }

        if line.is_begin("VTODO") {
            let (outcome, next) = read_todo(&lines, i);
            match outcome {
                TodoOutcome::Record(record) => document.entries.push(Entry::Todo(record)),
                TodoOutcome::Invalid(component, skip) => {
                    report_skip(&skip);
                    document.entries.push(Entry::Component(component));
                    skipped.push(skip);
                }
                TodoOutcome::Unterminated(skip) => {
                    report_skip(&skip);
                    skipped.push(skip);
                }
            }
            i = next;
            continue;
        }

        if line.begin_name().is_some() {
            match read_component(&lines, i) {
                Ok((component, next)) => {
                    document.entries.push(Entry::Component(component));
                    i = next;
                }
                Err(next) => {
                    log::warn!("Dropping unterminated component at line {}", line.line_no);
                    i = next;
                }
            }
            continue;
        }

        match to_property(line) {
            Some(prop) => document.entries.push(Entry::Property(prop)),
            None => log::debug!("Ignoring malformed line {}: {:?}", line.line_no, line.text),
        }
        i += 1;
    }

    if !closed {
        log::warn!("Calendar ends without END:VCALENDAR");
    }

    log::debug!(
        "Parsed calendar: {} VTODO, {} skipped",
        document.todo_count(),
        skipped.len()
    );
    Ok(ParsedCalendar { document, skipped })
}

fn report_skip(skip: &SkippedRecord) {
    log::warn!(
        "Skipping VTODO at line {}: {}",
        skip.line.unwrap_or_default(),
        skip.reason
    );
}

enum TodoOutcome {
    Record(VTodoRecord),
    /// Complete block that cannot be modeled; kept verbatim in the document.
    Invalid(Component, SkippedRecord),
    Unterminated(SkippedRecord),
}

fn read_todo(lines: &[ContentLine], start: usize) -> (TodoOutcome, usize) {
    let begin = &lines[start];
    let mut raw: Vec<String> = begin.raw.clone();
    let mut properties = Vec::new();
    let mut components = Vec::new();
    let mut j = start + 1;

    let unterminated = |properties: &[Property]| {
        TodoOutcome::Unterminated(SkippedRecord {
            line: Some(begin.line_no),
            uid: uid_of(properties),
            reason: SkipReason::Unterminated,
        })
    };

    while j < lines.len() {
        let line = &lines[j];
        if line.is_end("VTODO") {
            raw.extend(line.raw.iter().cloned());
            return (finish_todo(properties, components, raw, begin.line_no), j + 1);
        }
        if line.is_begin("VTODO") || line.is_end("VCALENDAR") {
            return (unterminated(&properties), j);
        }
        if line.begin_name().is_some() {
            match read_component(lines, j) {
                Ok((component, next)) => {
                    raw.extend(component.lines.iter().cloned());
                    components.push(component);
                    j = next;
                    continue;
                }
                Err(next) => return (unterminated(&properties), next),
            }
        }
        raw.extend(line.raw.iter().cloned());
        match to_property(line) {
            Some(prop) => properties.push(prop),
            None => log::debug!("Ignoring malformed line {}: {:?}", line.line_no, line.text),
        }
        j += 1;
    }

    (unterminated(&properties), lines.len())
}

fn uid_of(properties: &[Property]) -> Option<String> {
    properties
        .iter()
        .find(|p| p.is("UID"))
        .map(|p| p.value.trim().to_string())
        .filter(|u| !u.is_empty())
}

fn finish_todo(
    mut properties: Vec<Property>,
    components: Vec<Component>,
    raw: Vec<String>,
    line_no: usize,
) -> TodoOutcome {
    if let Some(prio) = properties.iter().find(|p| p.is("PRIORITY"))
        && prio.value.trim().parse::<i64>().is_err()
    {
        let skip = SkippedRecord {
            line: Some(line_no),
            uid: uid_of(&properties),
            reason: SkipReason::InvalidPriority(prio.value.clone()),
        };
        let component = Component {
            name: "VTODO".to_string(),
            lines: raw,
        };
        return TodoOutcome::Invalid(component, skip);
    }

    let mut source = Some(raw);
    if uid_of(&properties).is_none() {
        let uid = Uuid::new_v4().to_string();
        log::debug!("VTODO at line {} has no UID, assigned {}", line_no, uid);
        properties.retain(|p| !p.is("UID"));
        properties.insert(0, Property::new("UID", uid));
        source = None;
    }

    TodoOutcome::Record(VTodoRecord {
        properties,
        components,
        source,
    })
}

/// Collects `BEGIN:X` ... `END:X` (with nesting) starting at `start`.
/// On failure returns the index where scanning stopped; END:VCALENDAR is not consumed.
fn read_component(
    lines: &[ContentLine],
    start: usize,
) -> std::result::Result<(Component, usize), usize> {
    let name = lines[start].begin_name().unwrap_or_default();
    let mut collected: Vec<String> = lines[start].raw.clone();
    let mut depth = 0usize;

    for (j, line) in lines.iter().enumerate().skip(start + 1) {
        if line.is_end("VCALENDAR") {
            return Err(j);
        }
        collected.extend(line.raw.iter().cloned());
        if line.begin_name().is_some() {
            depth += 1;
        } else if line.end_name().is_some() {
            if depth == 0 {
                return Ok((
                    Component {
                        name,
                        lines: collected,
                    },
                    j + 1,
                ));
            }
            depth -= 1;
        }
    }
    Err(lines.len())
}

// --- SERIALIZATION ---

/// Writes the document as CRLF-terminated, folded iCalendar text.
pub fn serialize(document: &CalendarDocument) -> String {
    let mut out = String::new();
    push_folded(&mut out, "BEGIN:VCALENDAR");
    if document.property("VERSION").is_none() {
        push_folded(&mut out, "VERSION:2.0");
    }

    for entry in &document.entries {
        match entry {
            Entry::Property(prop) => push_property(&mut out, prop),
            Entry::Component(component) => push_raw(&mut out, &component.lines),
            Entry::Todo(record) => match &record.source {
                Some(lines) => push_raw(&mut out, lines),
                None => {
                    push_folded(&mut out, "BEGIN:VTODO");
                    for prop in &record.properties {
                        push_property(&mut out, prop);
                    }
                    for component in &record.components {
                        push_raw(&mut out, &component.lines);
                    }
                    push_folded(&mut out, "END:VTODO");
                }
            },
        }
    }

    push_folded(&mut out, "END:VCALENDAR");
    out
}

fn push_property(out: &mut String, prop: &Property) {
    match &prop.raw {
        Some(lines) => push_raw(out, lines),
        None => push_folded(out, &prop.to_content_line()),
    }
}

fn push_raw(out: &mut String, lines: &[String]) {
    for line in lines {
        out.push_str(line);
        out.push_str(CRLF);
    }
}

fn push_folded(out: &mut String, line: &str) {
    out.push_str(&fold_line(line));
}

/// Folds a logical line at 75 octets, never inside a UTF-8 sequence.
/// The result carries its own trailing CRLF.
pub fn fold_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len() + line.len() / FOLD_WIDTH * 3 + 2);
    let mut width = 0usize;
    for ch in line.chars() {
        let len = ch.len_utf8();
        if width + len > FOLD_WIDTH {
            out.push_str(CRLF);
            out.push(' ');
            width = 1;
        }
        out.push(ch);
        width += len;
    }
    out.push_str(CRLF);
    out
}

// --- TEXT VALUES ---

/// Escapes a TEXT value. CR, NUL and other control characters except
/// newline and tab are dropped.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push('\t'),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Reverses `escape_text` in a single pass. Unknown escapes are kept as written.
pub fn unescape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some(',') => out.push(','),
            Some(';') => out.push(';'),
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Splits a comma-separated TEXT list on unescaped commas and unescapes each item.
pub fn split_text_list(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for ch in value.chars() {
        if escaped {
            current.push('\\');
            current.push(ch);
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == ',' {
            items.push(unescape_text(&current));
            current.clear();
        } else {
            current.push(ch);
        }
    }
    if escaped {
        current.push('\\');
    }
    items.push(unescape_text(&current));
    items
}

pub fn join_text_list(items: &[String]) -> String {
    items
        .iter()
        .map(|i| escape_text(i))
        .collect::<Vec<_>>()
        .join(",")
}

// --- DATE VALUES ---

/// Parses a DATE or DATE-TIME property. `VALUE=DATE` or an 8-digit value is a
/// calendar day; a DATE-TIME with `Z` is UTC, anything else is floating.
pub fn parse_date_property(prop: &Property) -> Option<DateType> {
    let value = prop.value.trim();
    let date_only = prop
        .param("VALUE")
        .is_some_and(|v| v.eq_ignore_ascii_case("DATE"));
    if date_only || value.len() == 8 {
        if let Some(date) = parse_date(value) {
            return Some(DateType::AllDay(date));
        }
    }
    parse_datetime(value).map(DateType::Specific)
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    if value.len() != 8 {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y%m%d").ok()
}

pub fn parse_datetime(value: &str) -> Option<Timestamp> {
    match value.strip_suffix('Z').or_else(|| value.strip_suffix('z')) {
        Some(utc) => NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S")
            .ok()
            .map(|n| Timestamp::Utc(n.and_utc())),
        None => NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
            .ok()
            .map(Timestamp::Floating),
    }
}

pub fn format_timestamp(ts: &Timestamp) -> String {
    match ts {
        Timestamp::Utc(dt) => dt.format("%Y%m%dT%H%M%SZ").to_string(),
        Timestamp::Floating(n) => n.format("%Y%m%dT%H%M%S").to_string(),
    }
}

/// Builds a DATE or DATE-TIME property. All-day values carry `VALUE=DATE`.
pub fn date_property(name: &str, value: &DateType) -> Property {
    match value {
        DateType::AllDay(d) => {
            Property::new(name, d.format("%Y%m%d").to_string()).with_param("VALUE", "DATE")
        }
        DateType::Specific(ts) => Property::new(name, format_timestamp(ts)),
    }
}
