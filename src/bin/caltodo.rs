use anyhow::{Context, Result};
use caltodo::cli::{self, Command, Invocation};
use caltodo::config::Config;
use caltodo::context::{AppContext, StandardContext};
use caltodo::storage::CalendarStore;
use caltodo::store::CalendarSession;
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use std::env;

const BINARY_NAME: &str = "caltodo";

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let invocation = match cli::parse_args(&args) {
        Ok(inv) => inv,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            eprintln!("Run '{} --help' for usage.", BINARY_NAME);
            std::process::exit(2);
        }
    };

    if invocation.command == Command::Help {
        cli::print_help(BINARY_NAME);
        return Ok(());
    }

    let ctx = StandardContext::new(invocation.root.clone());
    let config = Config::load_or_default(&ctx)?;
    init_logging(&config, invocation.verbose);

    let dir = config.resolve_calendars_dir(&ctx)?;
    let store = CalendarStore::with_timeout(dir, config.io_timeout());
    run(&store, &config, &ctx, invocation).await
}

fn init_logging(config: &Config, verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        config.log_level_filter()
    };
    let _ = TermLogger::init(
        level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );
}

async fn open(store: &CalendarStore, name: &str) -> Result<CalendarSession> {
    let path = store.path_for(name);
    let session = store
        .load_todos(&path)
        .await
        .with_context(|| format!("Cannot open calendar '{}'", name))?;
    if session.skipped_count() > 0 {
        eprintln!(
            "Warning: {} malformed task(s) in '{}' were skipped",
            session.skipped_count(),
            name
        );
    }
    Ok(session)
}

async fn run(
    store: &CalendarStore,
    config: &Config,
    ctx: &dyn AppContext,
    invocation: Invocation,
) -> Result<()> {
    match invocation.command {
        Command::Help => cli::print_help(BINARY_NAME),
        Command::Path => {
            println!("{}", store.dir().display());
            if let Ok(cfg) = ctx.get_config_file_path() {
                println!("{}", cfg.display());
            }
        }
        Command::List => {
            let calendars = store.list_calendars().await?;
            if calendars.is_empty() {
                println!("No calendars in {}", store.dir().display());
            }
            for cal in calendars {
                match cal.parse_error {
                    Some(err) => println!("{:<24} (unreadable: {})", cal.name, err),
                    None => println!("{:<24} {:>4} tasks", cal.name, cal.todo_count),
                }
            }
        }
        Command::Show {
            calendar,
            search,
            json,
        } => {
            let session = open(store, &calendar).await?;
            let view = session.view(&search, config.incomplete_sort, config.completed_sort);
            if json {
                let all: Vec<_> = view.incomplete.iter().chain(&view.completed).collect();
                println!("{}", serde_json::to_string_pretty(&all)?);
            } else {
                for task in view.incomplete.iter().chain(&view.completed) {
                    println!("{}", cli::format_task_line(task));
                }
            }
        }
        Command::Add { calendar, task } => {
            let mut session = store.create_calendar(&calendar).await?;
            let id = session.add_task(task.into_task()).id.clone();
            store.save_session(&mut session).await?;
            println!("{}", id);
        }
        Command::Toggle { calendar, id } => {
            let mut session = open(store, &calendar).await?;
            let done = session
                .toggle_completed(&id)
                .ok_or_else(|| anyhow::anyhow!("No task with id '{}'", id))?;
            store.save_session(&mut session).await?;
            println!("{} {}", if done { "Completed" } else { "Reopened" }, id);
        }
        Command::Remove { calendar, id } => {
            let mut session = open(store, &calendar).await?;
            let removed = session
                .delete_task(&id)
                .ok_or_else(|| anyhow::anyhow!("No task with id '{}'", id))?;
            store.save_session(&mut session).await?;
            println!("Deleted '{}'", removed.title);
        }
    }
    Ok(())
}
