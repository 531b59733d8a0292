use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use tasklist_core::{FilterMode, TaskError, TaskEvent, TaskId};
use tasklist_runtime::{doctor, ClearOutcome, TaskStore, Workspace};

mod render;
mod shell;

#[derive(Parser)]
#[command(name = "tasklist", version, about = "A small persistent task list")]
struct Cli {
    /// Workspace root holding `.tasklist/` (defaults to the current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create `.tasklist/` with a default config and the local database
    Init,

    /// Report config and backend reachability
    Doctor,

    /// Print tasks, newest first
    List {
        #[arg(long, default_value = "all")]
        filter: FilterMode,
    },

    /// Add a task
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Flip a task between active and completed
    Toggle { id: TaskId },

    /// Delete a task
    Delete { id: TaskId },

    /// Delete every completed task
    ClearCompleted {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Print the All / Active / Completed counts
    Counts,

    /// Interactive session over stdin
    Shell,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir()?,
    };
    debug!(root = %root.display(), "workspace root");

    match cli.cmd {
        Command::Init => {
            Workspace::init_root(&root)?;
            println!("Initialized tasklist in {}", root.display());
        }
        Command::Doctor => {
            let ws = Workspace::open(root)?;
            let report = doctor(&ws).await?;
            println!("config:  {}", if report.config_found { "found" } else { "missing" });
            println!(
                "remote:  {}",
                if report.remote_configured { "configured" } else { "not configured" }
            );
            println!("backend: {}", report.backend);
            match &report.load {
                Ok(n) => println!("load:    ok ({n} tasks)"),
                Err(e) => println!("load:    failed: {e}"),
            }
            if !report.is_healthy() {
                anyhow::bail!("doctor found problems");
            }
            println!("OK");
        }
        Command::List { filter } => {
            let store = connect(root).await?;
            store.set_filter(filter);
            print!("{}", render::render_list(&store.tasks(), &store.filtered_tasks(), filter));
            println!("{}", render::render_counts(store.counts()));
        }
        Command::Add { text } => {
            let store = connect(root).await?;
            let mut events = store.subscribe();
            let text = text.join(" ");
            store.add_task(&text).await.map_err(report)?;
            drain_feedback(&mut events);
        }
        Command::Toggle { id } => {
            let store = connect(root).await?;
            match store.toggle_task(&id).await.map_err(report)? {
                Some(task) => println!("{}", if task.completed { "Completed" } else { "Reopened" }),
                None => println!("No task with id {id}"),
            }
        }
        Command::Delete { id } => {
            let store = connect(root).await?;
            if store.delete_task(&id).await.map_err(report)? {
                println!("Deleted");
            } else {
                println!("No task with id {id}");
            }
        }
        Command::ClearCompleted { yes } => {
            let store = connect(root).await?;
            let mut events = store.subscribe();
            let outcome = store
                .clear_completed(|n| yes || confirm_on_stdin(n))
                .await
                .map_err(report)?;
            match outcome {
                ClearOutcome::NothingToClear => println!("No completed tasks"),
                ClearOutcome::Declined => println!("Nothing deleted"),
                ClearOutcome::Cleared(_) => drain_feedback(&mut events),
            }
        }
        Command::Counts => {
            let store = connect(root).await?;
            println!("{}", render::render_counts(store.counts()));
        }
        Command::Shell => {
            let store = connect(root).await?;
            shell::run(&store).await?;
        }
    }

    Ok(())
}

async fn connect(root: PathBuf) -> anyhow::Result<TaskStore> {
    let ws = Workspace::open(root)?;
    ws.connect().await
}

/// Carry the user-facing wording out through `main`'s error exit.
fn report(err: TaskError) -> anyhow::Error {
    if err.is_unavailable() {
        warn!("operation failed: {err}");
    }
    anyhow::anyhow!(render::render_error(&err))
}

fn drain_feedback(events: &mut broadcast::Receiver<TaskEvent>) {
    while let Ok(event) = events.try_recv() {
        if let Some(line) = render::render_event(&event) {
            println!("{line}");
        }
    }
}

fn confirm_on_stdin(count: usize) -> bool {
    print!("Delete all {count} completed task(s)? [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(_) => shell::is_yes(&line),
        Err(_) => false,
    }
}
