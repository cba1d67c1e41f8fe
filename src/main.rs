// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 tidywatch contributors

//! tidywatch: folder watcher and file organizer
//!
//! Watches a directory for newly appearing files, classifies each one by
//! extension against an ordered rule catalog, and moves matches into their
//! target subfolders.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use tidywatch::config::AppConfig;
use tidywatch::history::History;
use tidywatch::organizer::{wait_until_settled, Organizer};
use tidywatch::rules::RuleCatalog;
use tidywatch::watcher::{FolderWatcher, Notification};
use tidywatch::{Result, TidywatchError};

/// tidywatch CLI - folder watcher and file organizer
#[derive(Parser, Debug)]
#[command(name = "tidywatch")]
#[command(version = "0.3.0")]
#[command(about = "Sorts new files into subfolders by extension rules", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watch a directory for new files and sort them
    Watch {
        /// Directory to watch (overrides config)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Dry run mode (don't actually move files)
        #[arg(long)]
        dry_run: bool,

        /// Sort files already present in the directory on startup
        #[arg(long)]
        organize_existing: bool,
    },

    /// Sort the current contents of a directory once
    Sweep {
        /// Directory to sweep
        path: PathBuf,

        /// Dry run mode (show moves without performing them)
        #[arg(long)]
        dry_run: bool,
    },

    /// Rule catalog operations
    Rules {
        #[command(subcommand)]
        action: RulesCommands,
    },

    /// History and undo operations
    History {
        #[command(subcommand)]
        action: HistoryCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Initialize a new tidywatch project
    Init {
        /// Directory to initialize (default: current)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Force overwrite existing configuration
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum RulesCommands {
    /// Show the catalog in match order
    List,

    /// Write the built-in catalog as an editable rules file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "rules.json")]
        output: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryCommands {
    /// List recent history entries
    List {
        /// Number of entries to show
        #[arg(long, default_value = "10")]
        count: usize,
    },

    /// Undo recent moves
    Undo {
        /// Number of moves to undo
        #[arg(long, default_value = "1")]
        count: usize,

        /// Dry run (show what would be undone)
        #[arg(long)]
        dry_run: bool,
    },

    /// Clear all history
    Clear {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,

    /// Edit configuration interactively
    Edit,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if !cli.quiet {
        info!("tidywatch v0.3.0");
    }

    // Load configuration
    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Some(Commands::Watch { dir, dry_run, organize_existing }) => {
            run_watch(config, dir, dry_run, organize_existing).await
        }
        Some(Commands::Sweep { path, dry_run }) => {
            run_sweep(config, path, dry_run).await
        }
        Some(Commands::Rules { action }) => {
            run_rules_command(config, action).await
        }
        Some(Commands::History { action }) => {
            run_history_command(config, action).await
        }
        Some(Commands::Config { action }) => {
            run_config_command(config, action, &cli.config).await
        }
        Some(Commands::Init { dir, force }) => {
            run_init(dir, force).await
        }
        None => {
            // Default: run watch mode
            run_watch(config, None, false, false).await
        }
    }
}

/// Load the rule catalog named by the config, or the built-in one
fn load_catalog(config: &AppConfig) -> Result<RuleCatalog> {
    match &config.rules_file {
        Some(path) => {
            let catalog = RuleCatalog::load(Path::new(path))?;
            info!("Loaded {} rules from {}", catalog.len(), path);
            Ok(catalog)
        }
        None => Ok(RuleCatalog::builtin()),
    }
}

/// Build an organizer rooted at `watch_dir` per the config
fn build_organizer(config: &AppConfig, watch_dir: &Path, dry_run: bool) -> Result<Organizer> {
    let catalog = load_catalog(config)?;

    let destination_root = config
        .organizer
        .destination_root
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| watch_dir.to_path_buf());

    Ok(Organizer::new(
        catalog,
        destination_root,
        config.organizer.fallback_folder.clone(),
        config.organizer.ignore.clone(),
        dry_run,
        History::open(&config.history_file),
    ))
}

/// Run the watch mode (main sorter loop)
async fn run_watch(
    config: AppConfig,
    dir_override: Option<PathBuf>,
    dry_run: bool,
    organize_existing: bool,
) -> Result<()> {
    let watch_dir = dir_override.unwrap_or_else(|| PathBuf::from(&config.watch_path));

    info!("Watch directory: {:?}", watch_dir);

    if dry_run {
        warn!("DRY RUN MODE - files will not be moved");
    }

    let organizer = Arc::new(build_organizer(&config, &watch_dir, dry_run)?);
    info!("Catalog loaded: {} rules", organizer.catalog().len());

    // Sort whatever is already in the folder before watching; new sessions
    // never re-report pre-existing files on their own.
    if organize_existing {
        info!("Organizing existing files...");
        let moved = organizer.sweep(&watch_dir)?;
        info!("Organized {} existing files", moved);
    }

    // Setup file watcher with a channel sink
    let (tx, mut rx) = mpsc::unbounded_channel::<Notification>();
    let mut watcher = FolderWatcher::new();
    watcher.attach_sink(tx);
    watcher.start(&watch_dir)?;

    // Setup graceful shutdown
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = terminate => info!("Received SIGTERM, shutting down..."),
        }

        let _ = shutdown_tx.send(true);
    });

    let stable_wait = Duration::from_secs(config.organizer.stable_wait_secs);

    info!("Sorter active. Press Ctrl+C to stop.");
    info!("Waiting for files...");

    // Main event loop
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                break;
            }
            notification = rx.recv() => {
                match notification {
                    Some(Notification::FileAdded(path)) => {
                        let organizer = Arc::clone(&organizer);
                        tokio::spawn(async move {
                            // Wait for file stability
                            if !wait_until_settled(&path, stable_wait).await {
                                debug!("File disappeared before settling: {:?}", path);
                                return;
                            }

                            if let Err(e) = organizer.organize(&path) {
                                error!("Failed to organize {:?}: {}", path, e);
                            }
                        });
                    }
                    Some(Notification::Interrupted(reason)) => {
                        // The watch session is over; restart is a manual decision
                        error!("Watch interrupted: {}", reason);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    watcher.stop();
    info!("tidywatch stopped.");
    Ok(())
}

/// Run a one-shot sweep of a directory
async fn run_sweep(config: AppConfig, path: PathBuf, dry_run: bool) -> Result<()> {
    if !path.is_dir() {
        return Err(TidywatchError::InvalidWatchTarget(path));
    }

    let organizer = build_organizer(&config, &path, dry_run)?;
    let moved = organizer.sweep(&path)?;

    if dry_run {
        println!("Would move {} files", moved);
    } else {
        println!("Moved {} files", moved);
    }

    Ok(())
}

/// Run rule catalog commands
async fn run_rules_command(config: AppConfig, action: RulesCommands) -> Result<()> {
    match action {
        RulesCommands::List => {
            let catalog = load_catalog(&config)?;
            println!("Rules (match order):");
            for rule in catalog.rules() {
                println!("  {} - {} -> {}", rule.id, rule.label, rule.target_folder);
                println!("      {}", rule.extensions.join(" "));
            }
        }
        RulesCommands::Generate { output } => {
            RuleCatalog::builtin().save(&output)?;
            println!("Generated rules at {:?}", output);
            println!("Point rules_file in config.json at it to take effect");
        }
    }

    Ok(())
}

/// Run history commands
async fn run_history_command(config: AppConfig, action: HistoryCommands) -> Result<()> {
    let history = History::open(&config.history_file);

    match action {
        HistoryCommands::List { count } => {
            let moves = history.recent(count)?;
            if moves.is_empty() {
                println!("No moves recorded yet");
            }
            for entry in moves {
                let marker = if entry.reversed { "  (undone)" } else { "" };
                println!(
                    "{}  {} -> {}  [{}]{}",
                    entry.record.timestamp.format("%Y-%m-%d %H:%M"),
                    entry.record.original_path.display(),
                    entry.record.new_path.display(),
                    entry.record.rule_id,
                    marker
                );
            }
        }
        HistoryCommands::Undo { count, dry_run } => {
            let mut pending = history.reversible()?;
            pending.reverse();
            pending.truncate(count);

            if pending.is_empty() {
                println!("Nothing to undo");
                return Ok(());
            }

            let mut restored = 0;
            for record in pending {
                if !record.new_path.exists() {
                    warn!("Cannot undo {:?}: no longer at its destination", record.new_path);
                    continue;
                }
                if dry_run {
                    println!("Would restore {} -> {}",
                        record.new_path.display(),
                        record.original_path.display()
                    );
                    continue;
                }
                if record.original_path.exists() {
                    warn!("Cannot undo {:?}: original location is occupied", record.original_path);
                    continue;
                }

                std::fs::rename(&record.new_path, &record.original_path)?;
                history.record_reversal(&record.id)?;
                println!("Restored {}", record.original_path.display());
                restored += 1;
            }

            if !dry_run {
                println!("Restored {} of the requested moves", restored);
            }
        }
        HistoryCommands::Clear { force } => {
            if force {
                history.clear()?;
                println!("History cleared");
            } else {
                println!("This deletes the whole move ledger; re-run with --force to confirm");
            }
        }
    }

    Ok(())
}

/// Run config commands
async fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            let default_config = AppConfig::default();
            default_config.save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            println!("Configuration at {:?} is valid", config_path);
            println!("  Watch path: {}", config.watch_path);
            println!("  Rules file: {}", config.rules_file.as_deref().unwrap_or("(built-in)"));
            println!("  History file: {}", config.history_file);
        }
        ConfigCommands::Edit => {
            let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
            std::process::Command::new(editor)
                .arg(config_path)
                .status()?;
        }
    }

    Ok(())
}

/// Scaffold a fresh project: config, an editable rule catalog, a watch folder
async fn run_init(dir: Option<PathBuf>, force: bool) -> Result<()> {
    let target = dir.unwrap_or_else(|| PathBuf::from("."));
    let config_path = target.join("config.json");
    let rules_path = target.join("rules.json");

    for existing in [&config_path, &rules_path] {
        if existing.exists() && !force {
            return Err(TidywatchError::Config(format!(
                "{} already exists (pass --force to overwrite)",
                existing.display()
            )));
        }
    }

    let watch_dir = target.join("watch");
    std::fs::create_dir_all(&watch_dir)?;

    RuleCatalog::builtin().save(&rules_path)?;

    let config = AppConfig {
        watch_path: watch_dir.to_string_lossy().into_owned(),
        rules_file: Some(rules_path.to_string_lossy().into_owned()),
        ..AppConfig::default()
    };
    config.save(&config_path)?;

    println!("Initialized {}", target.display());
    println!("  config.json  sorter settings");
    println!("  rules.json   editable rule catalog (wired into the config)");
    println!("  watch/       drop files here");
    println!();
    println!("Run `tidywatch watch` to start sorting.");

    Ok(())
}
