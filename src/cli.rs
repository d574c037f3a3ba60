// File: ./src/cli.rs
//! Command-line parsing and help text for the `caltodo` binary.
use crate::model::{Priority, Task};
use chrono::NaiveDate;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub description: Option<String>,
}

impl NewTask {
    pub fn into_task(self) -> Task {
        let mut task = Task::new(&self.title);
        task.priority = self.priority;
        task.due_date = self.due_date;
        task.category = self.category;
        task.description = self.description;
        task
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    List,
    Path,
    Show {
        calendar: String,
        search: String,
        json: bool,
    },
    Add {
        calendar: String,
        task: NewTask,
    },
    Toggle {
        calendar: String,
        id: String,
    },
    Remove {
        calendar: String,
        id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub root: Option<PathBuf>,
    pub verbose: bool,
    pub command: Command,
}

fn take_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, String> {
    args.next()
        .ok_or_else(|| format!("Missing value for {}", flag))
}

/// Parses everything after the program name.
pub fn parse_args(args: &[String]) -> Result<Invocation, String> {
    let mut root = None;
    let mut verbose = false;
    let mut positional = Vec::new();
    let mut search = String::new();
    let mut json = false;
    let mut priority = Priority::default();
    let mut due_date = None;
    let mut category = None;
    let mut description = None;

    let mut iter = args.iter().cloned();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" | "help" => {
                return Ok(Invocation {
                    root,
                    verbose,
                    command: Command::Help,
                });
            }
            "-r" | "--root" => root = Some(PathBuf::from(take_value(&mut iter, &arg)?)),
            "-v" | "--verbose" => verbose = true,
            "--json" => json = true,
            "--search" => search = take_value(&mut iter, &arg)?,
            "--priority" => {
                let value = take_value(&mut iter, &arg)?;
                priority = value
                    .parse()
                    .map_err(|_| format!("Unknown priority '{}' (high, medium, low)", value))?;
            }
            "--due" => {
                let value = take_value(&mut iter, &arg)?;
                let date = NaiveDate::parse_from_str(&value, "%Y-%m-%d")
                    .map_err(|_| format!("Invalid date '{}', expected YYYY-MM-DD", value))?;
                due_date = Some(date);
            }
            "--category" => category = Some(take_value(&mut iter, &arg)?),
            "--description" => description = Some(take_value(&mut iter, &arg)?),
            flag if flag.starts_with('-') && flag.len() > 1 => {
                return Err(format!("Unknown option '{}'", flag));
            }
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let name = positional.next();
    let mut next = |what: &str| {
        positional
            .next()
            .ok_or_else(|| format!("Missing {}", what))
    };

    let command = match name.as_deref() {
        None | Some("list") => Command::List,
        Some("path") => Command::Path,
        Some("show") => Command::Show {
            calendar: next("calendar name")?,
            search,
            json,
        },
        Some("add") => Command::Add {
            calendar: next("calendar name")?,
            task: NewTask {
                title: next("task title")?,
                priority,
                due_date,
                category,
                description,
            },
        },
        Some("toggle") => Command::Toggle {
            calendar: next("calendar name")?,
            id: next("task id")?,
        },
        Some("rm") => Command::Remove {
            calendar: next("calendar name")?,
            id: next("task id")?,
        },
        Some(other) => return Err(format!("Unknown command '{}'", other)),
    };

    Ok(Invocation {
        root,
        verbose,
        command,
    })
}

/// One line of `show` output.
pub fn format_task_line(task: &Task) -> String {
    let mut line = format!("{} {} [{}]", task.checkbox_symbol(), task.title, task.priority);
    if let Some(due) = task.due_date {
        line.push_str(&format!(" due {}", due.format("%Y-%m-%d")));
    }
    if let Some(cat) = &task.category {
        line.push_str(&format!(" #{}", cat));
    }
    line.push_str(&format!("  ({})", task.id));
    line
}

pub fn print_help(binary_name: &str) {
    println!(
        "Caltodo v{} - To-do lists stored in plain iCalendar files",
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("USAGE:");
    println!("    {} [--root <path>] [-v] <command>", binary_name);
    println!();
    println!("COMMANDS:");
    println!("    list                              List calendars (default)");
    println!("    show <calendar> [--search <q>] [--json]");
    println!("                                      Show tasks, open first then done");
    println!("    add <calendar> <title> [--priority high|medium|low] [--due YYYY-MM-DD]");
    println!("        [--category <c>] [--description <d>]");
    println!("                                      Add a task (creates the calendar)");
    println!("    toggle <calendar> <id>            Mark a task done or not done");
    println!("    rm <calendar> <id>                Delete a task");
    println!("    path                              Print the calendars directory");
    println!();
    println!("OPTIONS:");
    println!("    -r, --root <path>     Use a different directory for config and calendars.");
    println!("    -v, --verbose         Log debug output to stderr.");
    println!("    -h, --help            Show this help message.");
}
