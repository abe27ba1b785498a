//! Event-sourced task orchestration CLI.
//!
//! Records tasks as events in `.hearth/events.json` and drives them to
//! completion depth-first, one task at a time, through an external model CLI.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use hearth::core::events::EventPayload;
use hearth::core::types::{Task, TaskStatus};
use hearth::engine::Hearth;
use hearth::error::HearthError;
use hearth::execution::LlmExecutor;
use hearth::exit_codes;
use hearth::io::caller::CommandCaller;
use hearth::io::config::load_config;
use hearth::io::event_store::FileEventStore;
use hearth::io::paths::HearthPaths;
use hearth::io::prompt::{PRESETS, preset};
use hearth::list::render_tree;
use hearth::logging;
use hearth::validate::validate_workspace;

#[derive(Parser)]
#[command(name = "hearth", version, about = "Event-sourced task orchestration")]
struct Cli {
    /// Workspace directory holding `.hearth/`.
    #[arg(short, long, global = true, default_value = ".")]
    workspace: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a task.
    Add {
        #[arg(short, long)]
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
        /// Parent task id.
        #[arg(short, long)]
        parent: Option<String>,
        /// Task that must be completed before this one becomes eligible.
        #[arg(long)]
        depends_on: Option<String>,
    },
    /// Print the task forest depth-first.
    List {
        /// Only show tasks with this status (todo, pending, in-progress, completed).
        #[arg(short, long)]
        status: Option<String>,
    },
    /// Mark a task completed. Fails while it has open subtasks.
    Complete { id: String },
    /// Print the id of the next eligible task.
    Next,
    /// Execute tasks until none are eligible.
    Run {
        /// Seed a canned root task first (hello, code-quality).
        #[arg(long)]
        preset: Option<String>,
    },
    /// Check config and the event log against the schema and log invariants.
    Validate,
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    let paths = HearthPaths::new(cli.workspace);
    match cli.command {
        Command::Add {
            title,
            description,
            parent,
            depends_on,
        } => cmd_add(&paths, title, description, parent, depends_on),
        Command::List { status } => cmd_list(&paths, status.as_deref()),
        Command::Complete { id } => cmd_complete(&paths, &id),
        Command::Next => cmd_next(&paths),
        Command::Run { preset } => cmd_run(&paths, preset.as_deref()),
        Command::Validate => cmd_validate(&paths),
    }
}

fn cmd_add(
    paths: &HearthPaths,
    title: String,
    description: String,
    parent: Option<String>,
    depends_on: Option<String>,
) -> Result<i32> {
    let mut hearth = open(paths)?;
    let id = new_task_id();
    let code = submit(
        &mut hearth,
        EventPayload::TaskCreated {
            task_id: id.clone(),
            title: title.clone(),
            description,
            parent_id: parent.clone(),
            depends_on: depends_on.clone(),
        },
    )?;
    if code != exit_codes::OK {
        return Ok(code);
    }

    println!("Created task {id}: {title}");
    if let Some(parent) = parent {
        println!("  parent: {parent}");
    }
    if let Some(depends_on) = depends_on {
        println!("  depends on: {depends_on}");
    }
    Ok(exit_codes::OK)
}

fn cmd_list(paths: &HearthPaths, status: Option<&str>) -> Result<i32> {
    let filter = status
        .map(|raw| {
            TaskStatus::parse_filter(raw).with_context(|| {
                format!("unknown status '{raw}' (expected todo, pending, in-progress or completed)")
            })
        })
        .transpose()?;
    let hearth = open(paths)?;
    let lines = render_tree(hearth.state(), filter);
    if lines.is_empty() {
        match filter {
            Some(status) => println!("No tasks found with status: {status}"),
            None => println!("No tasks found."),
        }
        return Ok(exit_codes::OK);
    }
    for line in lines {
        println!("{line}");
    }
    Ok(exit_codes::OK)
}

fn cmd_complete(paths: &HearthPaths, id: &str) -> Result<i32> {
    let mut hearth = open(paths)?;
    let Some(task) = hearth.task(id) else {
        bail!("task '{id}' not found");
    };
    if task.is_completed() {
        println!("Task {id} is already completed.");
        return Ok(exit_codes::OK);
    }
    let title = task.title.clone();
    let before = open_ancestors(&hearth, id);

    let code = submit(&mut hearth, EventPayload::task_completed(id))?;
    if code != exit_codes::OK {
        return Ok(code);
    }

    println!("Completed task {id}: {title}");
    for (ancestor_id, ancestor_title) in before {
        if hearth.task(&ancestor_id).is_some_and(Task::is_completed) {
            println!("  all subtasks done, completed {ancestor_id}: {ancestor_title}");
        }
    }
    Ok(exit_codes::OK)
}

fn cmd_next(paths: &HearthPaths) -> Result<i32> {
    let hearth = open(paths)?;
    match hearth.next_task() {
        Some(task) => {
            println!("{}", task.id);
            Ok(exit_codes::OK)
        }
        None => {
            eprintln!("no eligible tasks");
            Ok(exit_codes::COMPLETE)
        }
    }
}

fn cmd_run(paths: &HearthPaths, preset_name: Option<&str>) -> Result<i32> {
    let seed = match preset_name {
        Some(name) => match preset(name) {
            Some(preset) => Some(preset),
            None => {
                let known: Vec<&str> = PRESETS.iter().map(|preset| preset.name).collect();
                bail!("unknown preset '{name}' (expected one of: {})", known.join(", "));
            }
        },
        None => None,
    };
    let config = load_config(&paths.config_path).context("load config.toml")?;
    let executor = LlmExecutor::new(
        CommandCaller::new(config.caller.clone()),
        paths.clone(),
        &config,
    );
    let mut hearth = open(paths)?.with_executor(executor);

    if let Some(preset) = seed {
        let id = new_task_id();
        let code = submit(
            &mut hearth,
            EventPayload::TaskCreated {
                task_id: id.clone(),
                title: preset.title.to_string(),
                description: preset.description.to_string(),
                parent_id: None,
                depends_on: None,
            },
        )?;
        if code != exit_codes::OK {
            return Ok(code);
        }
        println!("Created task {id}: {}", preset.title);
    }

    let code = submit(&mut hearth, EventPayload::ExecuteTasksRequested {})?;
    if code != exit_codes::OK {
        return Ok(code);
    }

    let completed = hearth
        .tasks()
        .values()
        .filter(|task| task.is_completed())
        .count();
    println!(
        "Run finished: {completed}/{} tasks completed.",
        hearth.tasks().len()
    );
    Ok(exit_codes::OK)
}

fn cmd_validate(paths: &HearthPaths) -> Result<i32> {
    let outcome = validate_workspace(&paths.root)?;
    println!(
        "ok: {} events, {} tasks ({} completed)",
        outcome.events, outcome.tasks, outcome.completed
    );
    Ok(exit_codes::OK)
}

fn open(paths: &HearthPaths) -> Result<Hearth<FileEventStore>> {
    Hearth::open_workspace(paths)
        .with_context(|| format!("open {}", paths.events_path.display()))
}

/// Process `payload`, reporting a rejection on stderr as [`exit_codes::REJECTED`].
fn submit(hearth: &mut Hearth<FileEventStore>, payload: EventPayload) -> Result<i32> {
    match hearth.process(payload) {
        Ok(()) => Ok(exit_codes::OK),
        Err(HearthError::EventRejected(rejection)) => {
            eprintln!("{rejection}");
            Ok(exit_codes::REJECTED)
        }
        Err(err) => Err(err).context("process event"),
    }
}

/// Ancestors of `id` that are still open, nearest first.
fn open_ancestors(hearth: &Hearth<FileEventStore>, id: &str) -> Vec<(String, String)> {
    hearth
        .state()
        .ancestors(id)
        .into_iter()
        .filter(|task| !task.is_completed())
        .map(|task| (task.id.clone(), task.title.clone()))
        .collect()
}

/// `T-` followed by the first eight hex digits of a random UUID.
fn new_task_id() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("T-{}", &uuid[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_add_with_parent() {
        let cli = Cli::parse_from(["hearth", "add", "--title", "Write docs", "--parent", "T-1"]);
        match cli.command {
            Command::Add {
                title,
                description,
                parent,
                depends_on,
            } => {
                assert_eq!(title, "Write docs");
                assert_eq!(description, "");
                assert_eq!(parent.as_deref(), Some("T-1"));
                assert_eq!(depends_on, None);
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn parse_workspace_after_subcommand() {
        let cli = Cli::parse_from(["hearth", "next", "--workspace", "/tmp/ws"]);
        assert!(matches!(cli.command, Command::Next));
        assert_eq!(cli.workspace, PathBuf::from("/tmp/ws"));
    }

    #[test]
    fn parse_list_status() {
        let cli = Cli::parse_from(["hearth", "list", "--status", "pending"]);
        assert!(matches!(
            cli.command,
            Command::List { status: Some(ref status) } if status == "pending"
        ));
    }

    #[test]
    fn parse_run_preset() {
        let cli = Cli::parse_from(["hearth", "run", "--preset", "hello"]);
        assert!(matches!(
            cli.command,
            Command::Run { preset: Some(ref name) } if name == "hello"
        ));
    }

    #[test]
    fn add_requires_title() {
        assert!(Cli::try_parse_from(["hearth", "add"]).is_err());
    }

    #[test]
    fn task_ids_are_short_and_prefixed() {
        let id = new_task_id();
        assert!(id.starts_with("T-"));
        assert_eq!(id.len(), 10);
        assert!(id[2..].chars().all(|ch| ch.is_ascii_hexdigit()));
        assert_ne!(id, new_task_id());
    }
}
