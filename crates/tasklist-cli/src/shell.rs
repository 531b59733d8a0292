use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::broadcast;
use tracing::{debug, info};

use tasklist_core::{FilterMode, TaskEvent, TaskId};
use tasklist_runtime::{ClearOutcome, TaskStore};

use crate::render;

const HELP: &str = "\
commands:
  add <text>       add a task
  toggle <id>      flip completed
  delete <id>      delete a task
  clear            delete all completed tasks
  filter <mode>    all | active | completed
  list             show the current view
  counts           show All / Active / Completed
  help             this text
  quit             leave";

#[derive(Debug, PartialEq, Eq)]
pub enum ShellCommand {
    Add(String),
    Toggle(TaskId),
    Delete(TaskId),
    Clear,
    Filter(FilterMode),
    List,
    Counts,
    Help,
    Quit,
    Empty,
}

pub fn parse_line(line: &str) -> Result<ShellCommand, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };

    let cmd = match word {
        "" => ShellCommand::Empty,
        "add" | "a" => ShellCommand::Add(rest.to_string()),
        "toggle" | "t" => ShellCommand::Toggle(id_arg(word, rest)?),
        "delete" | "rm" => ShellCommand::Delete(id_arg(word, rest)?),
        "clear" => ShellCommand::Clear,
        "filter" | "f" => ShellCommand::Filter(rest.parse().map_err(|e| format!("{e}"))?),
        "list" | "ls" => ShellCommand::List,
        "counts" => ShellCommand::Counts,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        other => return Err(format!("unknown command `{other}` (try `help`)")),
    };
    Ok(cmd)
}

fn id_arg(word: &str, rest: &str) -> Result<TaskId, String> {
    if rest.is_empty() {
        return Err(format!("usage: {word} <id>"));
    }
    // FromStr for TaskId cannot fail
    Ok(rest.parse().unwrap_or_else(|_| TaskId::Opaque(rest.to_string())))
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Read commands until `quit` or end of input. Operation failures are
/// printed and the session continues.
pub async fn run(store: &TaskStore) -> Result<()> {
    let mut events = store.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    info!(backend = %store.backend_kind(), "shell session started");
    println!("{}", render::render_counts(store.counts()));
    loop {
        prompt("> ")?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let cmd = match parse_line(&line) {
            Ok(cmd) => cmd,
            Err(msg) => {
                println!("{msg}");
                continue;
            }
        };
        debug!(?cmd, "shell command");

        match cmd {
            ShellCommand::Empty => {}
            ShellCommand::Quit => break,
            ShellCommand::Help => println!("{HELP}"),
            ShellCommand::List => show_list(store),
            ShellCommand::Counts => println!("{}", render::render_counts(store.counts())),
            ShellCommand::Filter(mode) => {
                store.set_filter(mode);
                show_list(store);
            }
            ShellCommand::Add(text) => {
                if let Err(e) = store.add_task(&text).await {
                    println!("{}", render::render_error(&e));
                }
            }
            ShellCommand::Toggle(id) => match store.toggle_task(&id).await {
                Ok(Some(_)) => show_list(store),
                Ok(None) => println!("No task with id {id}"),
                Err(e) => println!("{}", render::render_error(&e)),
            },
            ShellCommand::Delete(id) => match store.delete_task(&id).await {
                Ok(true) => show_list(store),
                Ok(false) => println!("No task with id {id}"),
                Err(e) => println!("{}", render::render_error(&e)),
            },
            ShellCommand::Clear => clear(store, &mut lines).await?,
        }
        drain(&mut events);
    }
    info!("shell session ended");
    Ok(())
}

async fn clear(store: &TaskStore, lines: &mut Lines<BufReader<Stdin>>) -> Result<()> {
    let pending = store.counts().completed;
    if pending == 0 {
        println!("No completed tasks");
        return Ok(());
    }
    // the answer is read here because the store's callback is synchronous
    prompt(&format!("Delete all {pending} completed task(s)? [y/N] "))?;
    let answer = lines.next_line().await?.unwrap_or_default();
    let yes = is_yes(&answer);

    match store.clear_completed(|_| yes).await {
        Ok(ClearOutcome::Declined) => println!("Nothing deleted"),
        Ok(ClearOutcome::NothingToClear) => println!("No completed tasks"),
        Ok(ClearOutcome::Cleared(_)) => {}
        Err(e) => println!("{}", render::render_error(&e)),
    }
    Ok(())
}

fn show_list(store: &TaskStore) {
    print!(
        "{}",
        render::render_list(&store.tasks(), &store.filtered_tasks(), store.filter_mode())
    );
}

fn drain(events: &mut broadcast::Receiver<TaskEvent>) {
    while let Ok(event) = events.try_recv() {
        if let Some(line) = render::render_event(&event) {
            println!("{line}");
        }
    }
}

fn prompt(text: &str) -> Result<()> {
    print!("{text}");
    std::io::stdout().flush()?;
    Ok(())
}
