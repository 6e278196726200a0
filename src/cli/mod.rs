#![forbid(unsafe_code)]

use std::io::{BufRead as _, IsTerminal as _, Write as _};
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{CommandFactory as _, Parser, Subcommand};

use crate::config::{self, Config};
use crate::error::TodoError;
use crate::logging;
use crate::output::table::Table;
use crate::task::model::{Priority, short_id};
use crate::task::storage::{FileStore, KeyValueStore};
use crate::task::store::{Outcome, TaskStore};
use crate::task::view::{FilterMode, View};
use crate::theme::ThemeStore;
use crate::tui;

#[derive(Debug, Parser)]
#[command(name = "simple-todo", version, about = "A simple todo list for the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Add(AddArgs),
    #[command(alias = "ls")]
    List(ListArgs),
    Toggle(IdArgs),
    #[command(alias = "rm")]
    Remove(IdArgs),
    Cycle(IdArgs),
    Priority(PriorityArgs),
    Edit(EditArgs),
    Clear(ClearArgs),
    Config(ConfigArgs),
    Completion(CompletionArgs),
    Version,
}

#[derive(Debug, Parser)]
pub struct AddArgs {
    /// Task text (words are joined with spaces)
    #[arg(required = true, num_args = 1..)]
    pub text: Vec<String>,
}

#[derive(Debug, Parser, Default)]
pub struct ListArgs {
    /// Which tasks to show (all, active, completed)
    #[arg(short = 'f', long = "filter", default_value_t = FilterMode::All)]
    pub filter: FilterMode,
    /// Output in JSON format
    #[arg(long = "json", conflicts_with = "csv")]
    pub json: bool,
    /// Output as CSV
    #[arg(long = "csv")]
    pub csv: bool,
}

#[derive(Debug, Parser)]
pub struct IdArgs {
    /// Task id or a unique prefix of it
    pub id: String,
}

#[derive(Debug, Parser)]
pub struct PriorityArgs {
    /// Task id or a unique prefix of it
    pub id: String,
    /// normal, pending or urgent
    pub priority: Priority,
}

#[derive(Debug, Parser)]
pub struct EditArgs {
    /// Task id or a unique prefix of it
    pub id: String,
    /// New text
    #[arg(short = 't', long = "text")]
    pub text: Option<String>,
    /// New priority
    #[arg(short = 'p', long = "priority")]
    pub priority: Option<Priority>,
}

#[derive(Debug, Parser)]
pub struct ClearArgs {
    /// Skip the confirmation prompt
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,
}

#[derive(Debug, Parser)]
pub struct CompletionArgs {
    pub shell: clap_complete::Shell,
}

#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub cmd: ConfigCmd,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCmd {
    List,
    Set(ConfigSetArgs),
    Get(ConfigGetArgs),
}

#[derive(Debug, Parser)]
pub struct ConfigSetArgs {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Parser)]
pub struct ConfigGetArgs {
    pub key: String,
}

pub async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.cmd {
        None => cmd_default().await,
        Some(Commands::Completion(args)) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "simple-todo", &mut std::io::stdout());
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Config(args)) => match args.cmd {
            ConfigCmd::List => {
                print!("{}", config::list_resolved_toml()?);
                Ok(ExitCode::SUCCESS)
            }
            ConfigCmd::Set(set) => {
                config::set_value_string(&set.key, &set.value)?;
                println!("Set {} = {}", set.key, set.value);
                Ok(ExitCode::SUCCESS)
            }
            ConfigCmd::Get(get) => match config::get_value_string(&get.key)? {
                Some(v) => {
                    println!("{v}");
                    Ok(ExitCode::SUCCESS)
                }
                None => anyhow::bail!(
                    "configuration key '{}' not found - use 'simple-todo config list' to see available keys",
                    get.key
                ),
            },
        },
        Some(Commands::Version) => Ok(cmd_version()),
        Some(cmd) => {
            let (cfg, files) = open_data().await?;
            let mut store = crate::task::open(&cfg, files);
            run_task_cmd(cmd, &cfg, &mut store)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn load_cfg() -> anyhow::Result<Config> {
    let cfg = tokio::task::spawn_blocking(|| -> anyhow::Result<Config> {
        let (cfg, _doc, _paths) = config::load()?;
        Ok(cfg)
    })
    .await??;
    Ok(cfg)
}

async fn open_data() -> anyhow::Result<(Config, FileStore)> {
    let cfg = load_cfg().await?;
    let dir = cfg.data_dir()?;
    match logging::init(&dir) {
        Ok(Some(path)) => tracing::debug!(log = %path.display(), "logging enabled"),
        Ok(None) => {}
        Err(e) => eprintln!("Warning: logging disabled: {e:#}"),
    }
    let files = FileStore::new(dir);
    files.ensure_dir()?;
    Ok((cfg, files))
}

async fn cmd_default() -> anyhow::Result<ExitCode> {
    let (cfg, files) = open_data().await?;
    let mut store = crate::task::open(&cfg, files.clone());

    if !tui::is_tty() {
        cmd_list(&cfg, &mut store, &ListArgs::default())?;
        return Ok(ExitCode::SUCCESS);
    }

    let themes = ThemeStore::new(files, cfg.ui.default_theme);
    tokio::task::spawn_blocking(move || tui::app::run(&cfg, store, themes)).await??;
    Ok(ExitCode::SUCCESS)
}

fn run_task_cmd<S: KeyValueStore>(
    cmd: Commands,
    cfg: &Config,
    store: &mut TaskStore<S>,
) -> anyhow::Result<()> {
    match cmd {
        Commands::Add(args) => cmd_add(store, &args),
        Commands::List(args) => cmd_list(cfg, store, &args),
        Commands::Toggle(args) => {
            let id = resolve_id(store, &args.id)?;
            applied(store.toggle(&id))?;
            ensure_saved(store)?;
            let state = store.get(&id).map_or("", |t| {
                if t.completed { "completed" } else { "active" }
            });
            println!("{} is now {state}", short_id(&id));
            Ok(())
        }
        Commands::Remove(args) => {
            let id = resolve_id(store, &args.id)?;
            applied(store.delete(&id))?;
            ensure_saved(store)?;
            println!("Deleted {}", short_id(&id));
            Ok(())
        }
        Commands::Cycle(args) => {
            let id = resolve_editable(store, &args.id)?;
            applied(store.cycle_priority(&id))?;
            ensure_saved(store)?;
            print_priority(store, &id);
            Ok(())
        }
        Commands::Priority(args) => {
            let id = resolve_editable(store, &args.id)?;
            applied(store.set_priority(&id, args.priority))?;
            ensure_saved(store)?;
            print_priority(store, &id);
            Ok(())
        }
        Commands::Edit(args) => cmd_edit(store, &args),
        Commands::Clear(args) => cmd_clear(store, &args),
        Commands::Config(_) | Commands::Completion(_) | Commands::Version => {
            anyhow::bail!("not a task command")
        }
    }
}

fn cmd_add<S: KeyValueStore>(store: &mut TaskStore<S>, args: &AddArgs) -> anyhow::Result<()> {
    let text = args.text.join(" ");
    applied(store.add(&text))?;
    ensure_saved(store)?;
    if let Some(task) = store.tasks().last() {
        println!("{}", task.id);
    }
    Ok(())
}

fn cmd_list<S: KeyValueStore>(
    cfg: &Config,
    store: &mut TaskStore<S>,
    args: &ListArgs,
) -> anyhow::Result<()> {
    store.set_filter(args.filter);
    let view = store.view();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }
    if args.csv {
        list_table(&view, cfg.ui.icons, true).print_csv()?;
        return Ok(());
    }

    if view.is_empty() {
        println!("{}", view.filter.empty_message());
    } else {
        list_table(&view, cfg.ui.icons, false).print()?;
    }
    println!("{}", view.summary());
    Ok(())
}

fn list_table(view: &View<'_>, icons: bool, full_ids: bool) -> Table {
    let mut t = Table::new(["ID", "DONE", "PRIORITY", "TEXT"]);
    for row in &view.tasks {
        let task = row.task;
        let done = match (icons, task.completed) {
            (true, true) => "✓",
            (true, false) => "○",
            (false, true) => "x",
            (false, false) => "",
        };
        let priority = if row.editable { task.priority.as_str() } else { "-" };
        let id = if full_ids { task.id.as_str() } else { task.short_id() };
        t.row([id, done, priority, task.text.as_str()]);
    }
    t
}

fn cmd_edit<S: KeyValueStore>(store: &mut TaskStore<S>, args: &EditArgs) -> anyhow::Result<()> {
    if args.text.is_none() && args.priority.is_none() {
        anyhow::bail!("nothing to change - pass --text and/or --priority");
    }
    let id = resolve_editable(store, &args.id)?;

    applied(store.start_edit(&id))?;
    if let Some(text) = &args.text {
        applied(store.update_draft_text(text.as_str()))?;
    }
    if let Some(priority) = args.priority {
        applied(store.update_draft_priority(priority))?;
    }
    if let Err(e) = applied(store.commit_edit()) {
        let _ = store.cancel_edit();
        return Err(e);
    }
    ensure_saved(store)?;
    println!("Updated {}", short_id(&id));
    Ok(())
}

fn cmd_clear<S: KeyValueStore>(store: &mut TaskStore<S>, args: &ClearArgs) -> anyhow::Result<()> {
    let count = store.tasks().len();
    if !args.yes {
        if !std::io::stdin().is_terminal() {
            anyhow::bail!("refusing to clear {count} tasks without --yes");
        }
        print!("Delete all {count} tasks? This cannot be undone. [y/N] ");
        std::io::stdout().flush()?;
        let mut answer = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut answer)
            .context("failed to read confirmation")?;
        if !matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
            return Err(TodoError::Cancelled.into());
        }
    }

    applied(store.clear_all())?;
    ensure_saved(store)?;
    println!("Cleared {count} tasks");
    Ok(())
}

fn cmd_version() -> ExitCode {
    println!("simple-todo version {}", env!("CARGO_PKG_VERSION"));
    println!("  rust: {}", rustc_version_runtime::version());
    println!(
        "  os/arch: {}/{}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    ExitCode::SUCCESS
}

/// Resolves an exact id or a unique id prefix.
fn resolve_id<S: KeyValueStore>(store: &TaskStore<S>, needle: &str) -> Result<String, TodoError> {
    let needle = needle.trim();
    if needle.is_empty() {
        return Err(TodoError::TaskNotFound(needle.to_owned()));
    }
    if let Some(task) = store.get(needle) {
        return Ok(task.id.clone());
    }

    let mut matches = store.tasks().iter().filter(|t| t.id.starts_with(needle));
    match (matches.next(), matches.next()) {
        (Some(task), None) => Ok(task.id.clone()),
        (Some(_), Some(_)) => Err(TodoError::AmbiguousTask(needle.to_owned())),
        (None, _) => Err(TodoError::TaskNotFound(needle.to_owned())),
    }
}

/// Completed tasks expose neither edit nor priority controls.
fn resolve_editable<S: KeyValueStore>(store: &TaskStore<S>, needle: &str) -> anyhow::Result<String> {
    let id = resolve_id(store, needle)?;
    if store.get(&id).is_some_and(|t| t.completed) {
        anyhow::bail!("task {} is completed; toggle it back to change it", short_id(&id));
    }
    Ok(id)
}

fn applied(outcome: Outcome) -> anyhow::Result<()> {
    match outcome.rejection() {
        None => Ok(()),
        Some(r) => anyhow::bail!("{r}"),
    }
}

fn ensure_saved<S: KeyValueStore>(store: &TaskStore<S>) -> anyhow::Result<()> {
    if let Some(err) = store.last_persist_error() {
        anyhow::bail!("failed to save tasks: {err}");
    }
    Ok(())
}

fn print_priority<S: KeyValueStore>(store: &TaskStore<S>, id: &str) {
    if let Some(task) = store.get(id) {
        println!("{} priority: {}", short_id(id), task.priority);
    }
}
