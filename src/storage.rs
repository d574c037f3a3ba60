// Manages the directory of .ics calendar files.
//
// Reads and writes run on tokio's blocking pool under a timeout. Saves to the
// same path are serialized through a per-path async queue and an advisory
// fs2 lock on a sidecar `.lock` file, and always go through a temp file that
// is renamed over the original.
use crate::error::{Error, Result};
use crate::model::{
    CalendarDocument, ParsedCalendar, Task, merge_tasks, parse, serialize, tasks_from_document,
};
use crate::store::{CalendarSession, calendar_name};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

pub const ICS_EXTENSION: &str = "ics";
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(10);

/// Summary of one calendar file, as shown in a calendar picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarFile {
    pub name: String,
    pub path: PathBuf,
    /// Number of VTODO records that map to a task.
    pub todo_count: usize,
    pub last_modified: Option<DateTime<Utc>>,
    /// Set when the file could not be parsed at all.
    pub parse_error: Option<String>,
}

pub fn is_calendar_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(ICS_EXTENSION))
}

/// Reads and parses one calendar file.
pub fn read_calendar(path: &Path) -> Result<ParsedCalendar> {
    let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse(&text).map_err(|e| match e {
        Error::Format(msg) => Error::Format(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

fn describe_file(path: &Path) -> CalendarFile {
    let name = calendar_name(path);
    let last_modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from);

    let (todo_count, parse_error) = match read_calendar(path) {
        Ok(parsed) => (tasks_from_document(&parsed.document, &name).0.len(), None),
        Err(e) => {
            log::warn!("Could not read calendar {}: {}", path.display(), e);
            (0, Some(e.to_string()))
        }
    };

    CalendarFile {
        name,
        path: path.to_path_buf(),
        todo_count,
        last_modified,
        parse_error,
    }
}

/// Lists the `.ics` files directly inside `dir`, newest first.
pub fn list_calendars_in(dir: &Path) -> Result<Vec<CalendarFile>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut files: Vec<CalendarFile> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(e) => {
                log::warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|p| is_calendar_file(p))
        .map(|p| describe_file(&p))
        .collect();

    files.sort_by(|a, b| {
        b.last_modified
            .cmp(&a.last_modified)
            .then_with(|| a.name.cmp(&b.name))
    });
    log::debug!("Found {} calendars in {}", files.len(), dir.display());
    Ok(files)
}

fn get_lock_path(file_path: &Path) -> PathBuf {
    let mut lock_path = file_path.to_path_buf();
    if let Some(ext) = lock_path.extension() {
        let mut new_ext = ext.to_os_string();
        new_ext.push(".lock");
        lock_path.set_extension(new_ext);
    } else {
        lock_path.set_extension("lock");
    }
    lock_path
}

/// Runs `f` while holding an exclusive advisory lock on `file_path`'s sidecar
/// lock file.
pub fn with_lock<F, T, E>(file_path: &Path, f: F) -> std::result::Result<T, E>
where
    F: FnOnce() -> std::result::Result<T, E>,
    E: From<io::Error>,
{
    let lock_path = get_lock_path(file_path);
    let file = fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)?;

    file.lock_exclusive()?;
    let result = f();
    file.unlock()?;
    result
}

/// Writes to a sibling temp file, syncs it and renames it over `path`.
pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> io::Result<()> {
    let path = path.as_ref();
    let mut tmp_ext = path.extension().unwrap_or_default().to_os_string();
    tmp_ext.push(".tmp");
    let tmp_path = path.with_extension(tmp_ext);

    let written = fs::File::create(&tmp_path).and_then(|mut file| {
        file.write_all(contents.as_ref())?;
        file.sync_all()
    });
    if let Err(e) = written.and_then(|_| fs::rename(&tmp_path, path)) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }
    Ok(())
}

fn write_calendar(path: &Path, text: &str) -> Result<()> {
    with_lock(path, || atomic_write(path, text)).map_err(|e| Error::write(path, e))?;
    log::info!("Saved {} bytes to {}", text.len(), path.display());
    Ok(())
}

fn timed_out(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, format!("{} timed out", what))
}

type WriteQueues = Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>;

/// Async front end over a calendars directory.
#[derive(Debug)]
pub struct CalendarStore {
    dir: PathBuf,
    io_timeout: Duration,
    write_queues: WriteQueues,
}

impl CalendarStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_timeout(dir, DEFAULT_IO_TIMEOUT)
    }

    pub fn with_timeout(dir: impl Into<PathBuf>, io_timeout: Duration) -> Self {
        Self {
            dir: dir.into(),
            io_timeout,
            write_queues: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for a calendar name. An existing `<name>.ics` in the
    /// directory is used as is. Otherwise characters other than letters,
    /// digits, `-`, `_` and spaces are dropped.
    pub fn path_for(&self, name: &str) -> PathBuf {
        if !name.is_empty() && !name.contains(['/', '\\']) {
            let exact = self.dir.join(format!("{}.{}", name, ICS_EXTENSION));
            if is_calendar_file(&exact) {
                return exact;
            }
        }

        let clean: String = name
            .chars()
            .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | ' '))
            .collect();
        let clean = clean.trim();
        let stem = if clean.is_empty() { "Untitled" } else { clean };
        self.dir.join(format!("{}.{}", stem, ICS_EXTENSION))
    }

    pub async fn list_calendars(&self) -> Result<Vec<CalendarFile>> {
        let dir = self.dir.clone();
        self.blocking(&self.dir, move || list_calendars_in(&dir)).await
    }

    pub async fn load_todos(&self, path: &Path) -> Result<CalendarSession> {
        let target = path.to_path_buf();
        let parsed = self.blocking(path, move || read_calendar(&target)).await?;
        Ok(CalendarSession::from_parsed(path, parsed))
    }

    /// Merges `tasks` into `previous`, writes the result and returns it.
    pub async fn save_todos(
        &self,
        path: &Path,
        tasks: &[Task],
        previous: &CalendarDocument,
    ) -> Result<CalendarDocument> {
        let merged = merge_tasks(previous, tasks);
        let text = serialize(&merged);
        log::debug!(
            "Saving {} tasks ({} records) to {}",
            tasks.len(),
            merged.todo_count(),
            path.display()
        );
        self.write_queued(path, text).await?;
        Ok(merged)
    }

    /// Saves the session's tasks and marks it clean. On failure the session
    /// keeps its edits and stays dirty.
    pub async fn save_session(&self, session: &mut CalendarSession) -> Result<()> {
        let revision = session.revision();
        let document = self
            .save_todos(session.path(), session.tasks(), session.document())
            .await?;
        session.mark_saved(document, revision);
        Ok(())
    }

    /// Creates an empty calendar called `name` unless one already exists, and
    /// opens it.
    pub async fn create_calendar(&self, name: &str) -> Result<CalendarSession> {
        let path = self.path_for(name);
        if path.exists() {
            return self.load_todos(&path).await;
        }

        let dir = self.dir.clone();
        self.blocking(&self.dir, move || {
            fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))
        })
        .await?;

        let document = CalendarDocument::new();
        self.write_queued(&path, serialize(&document)).await?;
        log::info!("Created calendar {}", path.display());
        Ok(CalendarSession::new(&path))
    }

    async fn blocking<T, F>(&self, path: &Path, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        match tokio::time::timeout(self.io_timeout, tokio::task::spawn_blocking(f)).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(Error::io(path, io::Error::other(join))),
            Err(_) => Err(Error::io(path, timed_out("read"))),
        }
    }

    /// Waits for earlier saves of the same path, then writes. The timeout
    /// covers both the wait and the write; a write that already started
    /// keeps the queue until it finishes.
    async fn write_queued(&self, path: &Path, text: String) -> Result<()> {
        let queue = self.write_queue(path);
        let target = path.to_path_buf();
        let job = async move {
            let guard = queue.lock_owned().await;
            tokio::task::spawn_blocking(move || {
                let _guard = guard;
                write_calendar(&target, &text)
            })
            .await
        };

        let outcome = match tokio::time::timeout(self.io_timeout, job).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(Error::write(path, io::Error::other(join))),
            Err(_) => {
                log::warn!("Save of {} timed out", path.display());
                Err(Error::write(path, timed_out("save")))
            }
        };
        self.release_queue(path);
        outcome
    }

    pub(crate) fn write_queue(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut queues = self
            .write_queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        queues.entry(queue_key(path)).or_default().clone()
    }

    /// Forgets the queue of `path` once no save holds or waits on it.
    fn release_queue(&self, path: &Path) {
        let key = queue_key(path);
        let mut queues = self
            .write_queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if queues.get(&key).is_some_and(|q| Arc::strong_count(q) == 1) {
            queues.remove(&key);
        }
    }
}

fn queue_key(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
