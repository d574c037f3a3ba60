// File: ./src/context.rs
/*! Application context abstraction for filesystem paths.

`AppContext` decides where the config file and the calendars directory live.

- `StandardContext`: uses `directories::ProjectDirs` for the config dir and
  discovers the calendars dir next to the executable, unless an override root
  is given (CLI `--root`).
- `TestContext`: a unique temporary directory, removed when dropped.

Code that touches the filesystem takes the context explicitly.
*/

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub const CALENDARS_DIR_NAME: &str = "calendars";

pub trait AppContext: Send + Sync + std::fmt::Debug {
    fn get_config_dir(&self) -> Result<PathBuf>;
    fn get_calendars_dir(&self) -> Result<PathBuf>;

    fn get_config_file_path(&self) -> Result<PathBuf> {
        Ok(self.get_config_dir()?.join("config.toml"))
    }
}

fn ensure_exists(path: PathBuf) -> Result<PathBuf> {
    if !path.exists() {
        std::fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create directory: {:?}", path))?;
    }
    Ok(path)
}

/// True if `dir` directly contains at least one `.ics` file.
pub fn has_ics_files(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .any(|e| crate::storage::is_calendar_file(&e.path()))
        })
        .unwrap_or(false)
}

/// Walks up from `start` looking for a `calendars` directory with `.ics`
/// files in it. Directories named `debug` are not searched.
pub fn find_calendars_dir_from(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .filter(|dir| dir.file_name().is_none_or(|n| n != "debug"))
        .map(|dir| dir.join(CALENDARS_DIR_NAME))
        .find(|candidate| candidate.is_dir() && has_ics_files(candidate))
}

/// Calendars directory for an installed binary: the nearest populated
/// `calendars` dir above the executable, else `calendars` next to it.
pub fn discover_calendars_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Cannot locate the executable")?;
    let exe_dir = exe
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Executable has no parent directory"))?;

    if let Some(found) = find_calendars_dir_from(exe_dir) {
        log::debug!("Using calendars directory {}", found.display());
        return Ok(found);
    }
    ensure_exists(exe_dir.join(CALENDARS_DIR_NAME))
}

// --- Production Implementation ---

#[derive(Clone, Debug)]
pub struct StandardContext {
    override_root: Option<PathBuf>,
}

impl StandardContext {
    /// When `override_root` is `Some(path)`, config and calendars live in
    /// `config` and `calendars` subdirectories of that root.
    pub fn new(override_root: Option<PathBuf>) -> Self {
        Self { override_root }
    }

    fn get_proj_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("com", "caltodo", "caltodo")
    }
}

impl AppContext for StandardContext {
    fn get_config_dir(&self) -> Result<PathBuf> {
        if let Some(root) = &self.override_root {
            return ensure_exists(root.join("config"));
        }
        let proj = Self::get_proj_dirs().ok_or_else(|| anyhow::anyhow!("No home directory"))?;
        ensure_exists(proj.config_dir().to_path_buf())
    }

    fn get_calendars_dir(&self) -> Result<PathBuf> {
        if let Some(root) = &self.override_root {
            return ensure_exists(root.join(CALENDARS_DIR_NAME));
        }
        discover_calendars_dir()
    }
}

// --- Test Implementation ---

#[derive(Clone, Debug)]
pub struct TestContext {
    pub root: PathBuf,
}

impl TestContext {
    /// Creates a new TestContext backed by a unique temporary directory.
    pub fn new() -> Self {
        let uuid = uuid::Uuid::new_v4();
        let root = std::env::temp_dir().join(format!("caltodo_test_{}", uuid));
        std::fs::create_dir_all(&root).expect("failed to create TestContext temp dir");
        Self { root }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AppContext for TestContext {
    fn get_config_dir(&self) -> Result<PathBuf> {
        let p = self.root.join("config");
        std::fs::create_dir_all(&p)?;
        Ok(p)
    }

    fn get_calendars_dir(&self) -> Result<PathBuf> {
        let p = self.root.join(CALENDARS_DIR_NAME);
        std::fs::create_dir_all(&p)?;
        Ok(p)
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_find_calendars_dir_walks_up() {
        let ctx = TestContext::new();
        let cals = ctx.root.join("app").join(CALENDARS_DIR_NAME);
        fs::create_dir_all(&cals).unwrap();
        fs::write(cals.join("Home.ics"), "BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n").unwrap();
        let nested = ctx.root.join("app").join("bin").join("x");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_calendars_dir_from(&nested), Some(cals));
    }

    #[test]
    fn test_find_ignores_empty_and_debug_dirs() {
        let ctx = TestContext::new();
        // Empty calendars dir is not a match.
        fs::create_dir_all(ctx.root.join("a").join(CALENDARS_DIR_NAME)).unwrap();
        // A populated calendars dir inside a debug dir is skipped.
        let debug_cals = ctx.root.join("a").join("debug").join(CALENDARS_DIR_NAME);
        fs::create_dir_all(&debug_cals).unwrap();
        fs::write(debug_cals.join("X.ics"), "").unwrap();

        assert_eq!(find_calendars_dir_from(&ctx.root.join("a").join("debug")), None);
    }

    #[test]
    fn test_override_root_layout() {
        let ctx = TestContext::new();
        let std_ctx = StandardContext::new(Some(ctx.root.clone()));
        assert_eq!(
            std_ctx.get_calendars_dir().unwrap(),
            ctx.root.join(CALENDARS_DIR_NAME)
        );
        assert_eq!(
            std_ctx.get_config_file_path().unwrap(),
            ctx.root.join("config").join("config.toml")
        );
    }
}
