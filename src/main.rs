//! deskfs - an in-memory desktop file system you can drive from the shell.
//!
//! The engine state lives in a JSON snapshot between invocations.
//!
//! Usage:
//!   deskfs init                   Start a fresh file system
//!   deskfs ls [PATH]              List a folder
//!   deskfs mkdir Desktop/Notes    Create a folder
//!   deskfs cp a.txt Desktop       Copy items into a folder
//!   deskfs undo                   Undo the last operation
//!   deskfs --help                 Show help

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use deskfs_core::{CollisionPolicy, Content, EngineConfig, FsTree, Node, NodeId};
use deskfs_ops::{FsState, ItemKind, VirtualFs};
use deskfs_query::{ListOptions, SortBy, SortOrder};

const LOG_ENV: &str = "DESKFS_LOG";

#[derive(Parser)]
#[command(
    name = "deskfs",
    version,
    about = "An in-memory desktop file system with undo and clipboard",
    long_about = "deskfs keeps a virtual file tree with copy/cut/paste and full undo/redo.\n\n\
                  Paths are slash-separated names from the root, e.g. `Desktop/todo.txt`. \
                  State is kept in a JSON snapshot between invocations."
)]
struct Cli {
    /// Snapshot file holding the engine state
    #[arg(short, long, default_value = "deskfs.json", global = true)]
    state: PathBuf,

    /// TOML engine configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a fresh file system, replacing any existing snapshot
    Init,

    /// List the contents of a folder
    Ls {
        /// Folder to list
        #[arg(default_value = "/")]
        path: String,

        /// Sort key
        #[arg(long, default_value = "name")]
        sort: SortBy,

        /// Sort descending
        #[arg(short, long)]
        desc: bool,

        /// Only show names containing this text
        #[arg(short = 'q', long)]
        search: Option<String>,

        /// Include all descendants
        #[arg(short, long)]
        recursive: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the tree below a folder
    Tree {
        #[arg(default_value = "/")]
        path: String,

        /// Maximum depth to display
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Show details of a single item
    Stat { path: String },

    /// Create a folder
    Mkdir { path: String },

    /// Create a file
    Touch {
        path: String,

        /// Inline text content
        #[arg(short, long)]
        text: Option<String>,
    },

    /// Delete items and everything below them
    Rm {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Move items into a folder
    Mv {
        #[arg(required = true, num_args = 2..)]
        paths: Vec<String>,
    },

    /// Copy items into a folder
    Cp {
        #[arg(required = true, num_args = 2..)]
        paths: Vec<String>,
    },

    /// Rename an item
    Rename {
        path: String,
        name: String,

        /// Pick a free name instead of failing on a collision
        #[arg(short, long)]
        auto: bool,
    },

    /// Put items on the clipboard for copying
    Copy {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Put items on the clipboard for moving
    Cut {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Paste the clipboard into a folder
    Paste {
        #[arg(default_value = "/")]
        target: String,
    },

    /// Undo the last operation
    Undo,

    /// Redo the last undone operation
    Redo,

    /// Show the operation history
    History {
        /// Forget all history
        #[arg(long)]
        flush: bool,
    },

    /// Export the engine state as JSON
    Export {
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let mut fs = match cli.command {
        Command::Init => VirtualFs::new(config),
        _ => load_state(&cli.state, config)?,
    };
    let revision = fs.revision();

    match cli.command {
        Command::Init => {
            save_state(&cli.state, &fs)?;
            eprintln!("Initialized {}", cli.state.display());
            return Ok(());
        }
        Command::Ls {
            path,
            sort,
            desc,
            search,
            recursive,
            format,
        } => {
            let options = ListOptions {
                search,
                sort_by: sort,
                sort_order: if desc { SortOrder::Desc } else { SortOrder::Asc },
                recursive,
            };
            run_ls(&fs, &path, &options, format)?;
        }
        Command::Tree { path, depth } => run_tree(&fs, &path, depth)?,
        Command::Stat { path } => run_stat(&fs, &path)?,
        Command::Mkdir { path } => {
            let (parent, name) = split_parent(&path)?;
            let parent = fs.tree().parse_path(parent)?;
            let id = fs.create_item(ItemKind::Folder, name, &parent)?;
            println!("{}", fs.tree().display_path(id)?);
        }
        Command::Touch { path, text } => {
            let (parent, name) = split_parent(&path)?;
            let parent = fs.tree().parse_path(parent)?;
            let id = match text {
                Some(text) => fs.create_file(name, &parent, Content::Text(text))?,
                None => fs.create_item(ItemKind::File, name, &parent)?,
            };
            println!("{}", fs.tree().display_path(id)?);
        }
        Command::Rm { paths } => {
            let paths = parse_paths(fs.tree(), &paths)?;
            let removed = fs.delete_items(&paths)?;
            eprintln!("Deleted {removed} item(s)");
        }
        Command::Mv { mut paths } => {
            let target = take_target(&mut paths)?;
            let target = fs.tree().parse_path(&target)?;
            let sources = parse_paths(fs.tree(), &paths)?;
            let moved = fs.move_items(&sources, &target)?;
            eprintln!("Moved {moved} item(s)");
        }
        Command::Cp { mut paths } => {
            let target = take_target(&mut paths)?;
            let target = fs.tree().parse_path(&target)?;
            let sources = parse_paths(fs.tree(), &paths)?;
            for id in fs.copy_items(&sources, &target)? {
                println!("{}", fs.tree().display_path(id)?);
            }
        }
        Command::Rename { path, name, auto } => {
            let path = fs.tree().parse_path(&path)?;
            let policy = if auto {
                CollisionPolicy::AutoSuffix
            } else {
                CollisionPolicy::Reject
            };
            let settled = fs.rename_item_with(&path, &name, policy)?;
            println!("{settled}");
        }
        Command::Copy { paths } => {
            let paths = parse_paths(fs.tree(), &paths)?;
            fs.copy_to_clipboard(&paths)?;
            eprintln!("Copied {} item(s) to the clipboard", paths.len());
        }
        Command::Cut { paths } => {
            let paths = parse_paths(fs.tree(), &paths)?;
            fs.cut_to_clipboard(&paths)?;
            eprintln!("Cut {} item(s) to the clipboard", paths.len());
        }
        Command::Paste { target } => {
            let target = fs.tree().parse_path(&target)?;
            for id in fs.paste_from_clipboard(&target)? {
                println!("{}", fs.tree().display_path(id)?);
            }
        }
        Command::Undo => println!("Undid: {}", fs.undo_last_operation()?),
        Command::Redo => println!("Redid: {}", fs.redo_last_operation()?),
        Command::History { flush } => {
            if flush {
                fs.flush_history();
                eprintln!("History flushed");
            } else {
                run_history(&fs);
            }
        }
        Command::Export { output } => run_export(&fs, output)?,
    }

    if fs.revision() != revision {
        save_state(&cli.state, &fs)?;
    }

    Ok(())
}

/// Install a stderr subscriber. `DESKFS_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

/// Load the snapshot, or start fresh when none exists yet.
fn load_state(path: &Path, config: EngineConfig) -> Result<VirtualFs> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "no snapshot, starting fresh");
        return Ok(VirtualFs::new(config));
    }

    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let state: FsState = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    let fs = VirtualFs::from_state(state, config)
        .with_context(|| format!("Snapshot {} is not usable", path.display()))?;
    Ok(fs)
}

fn save_state(path: &Path, fs: &VirtualFs) -> Result<()> {
    let json = serde_json::to_string_pretty(&fs.to_state())?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::debug!(path = %path.display(), revision = fs.revision(), "saved snapshot");
    Ok(())
}

/// List a folder.
fn run_ls(fs: &VirtualFs, path: &str, options: &ListOptions, format: OutputFormat) -> Result<()> {
    let folder = fs.tree().parse_path(path)?;
    let nodes = fs.list(&folder, options)?;

    match format {
        OutputFormat::Text => {
            for node in &nodes {
                let name = if options.recursive {
                    fs.tree().display_path(node.id)?
                } else {
                    node.name.to_string()
                };
                println!(
                    "{:<8} {:>10}  {}  {}{}",
                    kind_label(node),
                    format_size(node.size),
                    node.timestamps.modified.format("%Y-%m-%d %H:%M"),
                    truncate(&name, 60),
                    if node.is_folder() { "/" } else { "" }
                );
            }
            if nodes.is_empty() {
                eprintln!("(empty)");
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&nodes)?);
        }
    }

    Ok(())
}

/// Print a folder and its descendants.
fn run_tree(fs: &VirtualFs, path: &str, max_depth: Option<usize>) -> Result<()> {
    let tree = fs.tree();
    let top = tree.resolve_names(path)?;
    let stats = fs.stats();

    println!("{}", "─".repeat(60));
    println!(
        " {} files, {} folders, {}",
        stats.files,
        stats.folders,
        format_size(stats.total_size)
    );
    println!("{}", "─".repeat(60));

    print_node(tree, top.id, 0, max_depth.unwrap_or(usize::MAX))?;
    Ok(())
}

fn print_node(tree: &FsTree, id: NodeId, depth: usize, max_depth: usize) -> Result<()> {
    let node = tree.node(id)?;
    let indent = "  ".repeat(depth);
    let name = if node.parent.is_none() {
        "/".to_string()
    } else {
        node.name.to_string()
    };

    if node.is_folder() {
        println!("{indent}▼ {name}/");
        if depth < max_depth {
            for child in node.children() {
                print_node(tree, *child, depth + 1, max_depth)?;
            }
        } else if node.child_count() > 0 {
            println!("{indent}    ... {} more", node.child_count());
        }
    } else {
        println!("{indent}  {name} ({})", format_size(node.size));
    }
    Ok(())
}

fn run_stat(fs: &VirtualFs, path: &str) -> Result<()> {
    let node = fs.tree().resolve_names(path)?;
    println!("Path:     {}", fs.tree().display_path(node.id)?);
    println!("Id:       {}", node.id);
    println!("Kind:     {}", kind_label(node));
    println!("Size:     {}", format_size(node.size));
    println!("Created:  {}", node.timestamps.created);
    println!("Modified: {}", node.timestamps.modified);
    if node.is_folder() {
        println!("Children: {}", node.child_count());
    }
    match node.content() {
        Some(Content::Text(text)) => println!("Content:  {}", truncate(text, 60)),
        Some(Content::Reference { uri, .. }) => println!("Content:  {uri}"),
        None => {}
    }
    Ok(())
}

fn run_history(fs: &VirtualFs) {
    let history = fs.history();
    if history.is_disabled() {
        println!(" History is disabled after a failed replay; run `deskfs history --flush`.");
    }

    let mut shown = false;
    for entry in fs.redo_operations() {
        println!(
            "   {:>4}  {}  {}  (undone)",
            entry.id,
            entry.timestamp.format("%H:%M:%S"),
            entry.description
        );
        shown = true;
    }
    for (i, entry) in fs.operations().rev().enumerate() {
        let marker = if i == 0 { ">" } else { " " };
        println!(
            " {marker} {:>4}  {}  {}",
            entry.id,
            entry.timestamp.format("%H:%M:%S"),
            entry.description
        );
        shown = true;
    }
    if !shown {
        println!(" No operations recorded.");
    }
}

/// Export the engine state to JSON.
fn run_export(fs: &VirtualFs, output: Option<PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(&fs.to_state())?;

    match output {
        Some(output_path) => {
            std::fs::write(&output_path, json)?;
            eprintln!("Exported to {}", output_path.display());
        }
        None => {
            println!("{}", json);
        }
    }

    Ok(())
}

fn parse_paths(tree: &FsTree, paths: &[String]) -> Result<Vec<Vec<NodeId>>> {
    paths
        .iter()
        .map(|p| tree.parse_path(p).with_context(|| format!("Cannot resolve '{p}'")))
        .collect()
}

fn take_target(paths: &mut Vec<String>) -> Result<String> {
    match paths.pop() {
        Some(target) if !paths.is_empty() => Ok(target),
        _ => bail!("Expected at least one source and a target folder"),
    }
}

/// Split `a/b/c` into the parent path `a/b` and the name `c`.
fn split_parent(path: &str) -> Result<(&str, &str)> {
    let trimmed = path.trim_end_matches('/');
    let (parent, name) = trimmed.rsplit_once('/').unwrap_or(("", trimmed));
    if name.is_empty() {
        bail!("'{path}' does not name an item");
    }
    Ok((parent, name))
}

fn kind_label(node: &Node) -> String {
    match node.file_type() {
        Some(file_type) => file_type.to_string(),
        None => "folder".to_string(),
    }
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Truncate a string to max characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 1).collect();
        format!("{head}…")
    }
}
