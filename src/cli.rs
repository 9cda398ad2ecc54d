//! Command-line interface for tabkeep.
//!
//! Subcommands inspect a saved session, preview an archival sweep, or run a
//! headless walkthrough of the tab lifecycle.

use crate::archival::{self, TimeBucket};
use crate::artifacts::ScreenshotStore;
use crate::debug::DebugLevel;
use crate::engine::HeadlessEngine;
use crate::session::codec::decode_restore_url;
use crate::session::storage::{clear_session_at, load_session_from};
use crate::session::{PersistedTab, SessionWriter};
use crate::tab::{MemoryPressureLevel, TabRegistry};
use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tabkeep_config::{ArchivalRetention, Config};
use tokio::runtime::Runtime;

/// tabkeep - tab lifecycle and session persistence toolkit
#[derive(Parser)]
#[command(name = "tabkeep")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Log level (off, error, info, debug, trace); overrides DEBUG_LEVEL
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<DebugLevel>,

    /// Config file to use instead of ~/.config/tabkeep/config.yaml
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the tabs in a saved session with their age bucket and archival verdict
    Inspect {
        /// Session file (default: configured session path)
        #[arg(long, value_name = "PATH")]
        session: Option<PathBuf>,
    },
    /// Show which saved tabs an archival sweep would move out
    Sweep {
        /// Retention to apply (week, month, forever); defaults to the config value
        #[arg(long, value_name = "RETENTION")]
        retention: Option<ArchivalRetention>,

        /// Session file (default: configured session path)
        #[arg(long, value_name = "PATH")]
        session: Option<PathBuf>,
    },
    /// Walk through open, navigate, evict, persist, and restore with the headless engine
    Demo {
        /// Session file the demo writes (default: a file in the temp directory)
        #[arg(long, value_name = "PATH")]
        session: Option<PathBuf>,

        /// Extra background tabs to open
        #[arg(long, default_value_t = 3)]
        tabs: usize,
    },
}

/// Options that must be known before logging starts
#[derive(Clone, Debug, Default)]
pub struct RuntimeOptions {
    pub log_level: Option<DebugLevel>,
}

/// Result of CLI processing
pub enum CliResult {
    /// Run `command` once logging is up
    Continue(RuntimeOptions, Cli),
    /// Exit with the given code
    Exit(i32),
}

/// Parse CLI arguments
pub fn process_cli() -> CliResult {
    let cli = Cli::parse();
    if cli.command.is_none() {
        println!("No command given. Run `tabkeep --help` for usage.");
        return CliResult::Exit(2);
    }
    let options = RuntimeOptions {
        log_level: cli.log_level,
    };
    CliResult::Continue(options, cli)
}

/// Run the parsed subcommand
pub fn run(cli: Cli, runtime: Arc<Runtime>) -> Result<()> {
    let config = load_config(cli.config.as_ref())?;
    match cli.command {
        Some(Commands::Inspect { session }) => {
            let path = session.unwrap_or_else(|| config.session_file_path());
            inspect(&config, path)
        }
        Some(Commands::Sweep { retention, session }) => {
            let path = session.unwrap_or_else(|| config.session_file_path());
            sweep(retention.unwrap_or(config.archival_retention), path)
        }
        Some(Commands::Demo { session, tabs }) => {
            let path =
                session.unwrap_or_else(|| std::env::temp_dir().join("tabkeep-demo-session.yaml"));
            demo(config, path, tabs, runtime)
        }
        None => Ok(()),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => {
            Config::load_from(path).with_context(|| format!("Failed to load config {:?}", path))
        }
        None => Config::load().or_else(|e| {
            log::warn!("Config could not be loaded ({:#}), using defaults", e);
            Ok(Config::default())
        }),
    }
}

fn history_len(tab: &PersistedTab) -> Option<usize> {
    let snapshot = tab.session_snapshot.as_ref()?;
    decode_restore_url(&snapshot.restore_url)
        .ok()
        .map(|r| r.urls.len())
}

fn inspect(config: &Config, path: PathBuf) -> Result<()> {
    let Some(loaded) = load_session_from(&path)? else {
        println!("No saved session at {}", path.display());
        return Ok(());
    };
    let now = Utc::now();
    let retention = config.archival_retention;

    println!("Session: {}", path.display());
    println!("Saved at: {}", loaded.session.saved_at);
    println!(
        "Tabs: {} ({} unreadable record(s) skipped)",
        loaded.session.tabs.len(),
        loaded.skipped
    );
    println!();

    for (idx, tab) in loaded.session.tabs.iter().enumerate() {
        let selected = if loaded.session.selected == Some(tab.id) {
            "*"
        } else {
            " "
        };
        let bucket = archival::classify(tab, now, retention);
        let archived = if archival::is_archived(tab, now, retention) {
            " [archived]"
        } else {
            ""
        };
        let pinned = if tab.is_pinned { " [pinned]" } else { "" };
        let history = match history_len(tab) {
            Some(len) => format!("{} entries", len),
            None if tab.session_snapshot.is_some() => "unreadable snapshot".to_string(),
            None => "no snapshot".to_string(),
        };
        println!(
            "{}{:>3}. {:<10} {}{}{} ({})",
            selected,
            idx + 1,
            bucket.display_name(),
            tab.url,
            pinned,
            archived,
            history
        );
        if !tab.title.is_empty() {
            println!("        {}", tab.title);
        }
    }
    Ok(())
}

fn sweep(retention: ArchivalRetention, path: PathBuf) -> Result<()> {
    let Some(loaded) = load_session_from(&path)? else {
        println!("No saved session at {}", path.display());
        return Ok(());
    };
    let now = Utc::now();

    println!("Retention: {}", retention.display_name());
    let mut would_archive = 0;
    for bucket in [
        TimeBucket::Today,
        TimeBucket::Yesterday,
        TimeBucket::LastWeek,
        TimeBucket::LastMonth,
        TimeBucket::Older,
    ] {
        let tabs: Vec<&PersistedTab> = loaded
            .session
            .tabs
            .iter()
            .filter(|t| archival::classify(*t, now, retention) == bucket)
            .collect();
        if tabs.is_empty() {
            continue;
        }
        println!();
        println!("{} ({})", bucket.display_name(), tabs.len());
        for tab in tabs {
            let verdict = if archival::is_archived(tab, now, retention) {
                would_archive += 1;
                "archive"
            } else if tab.is_pinned {
                "keep (pinned)"
            } else {
                "keep"
            };
            println!("  {:<14} {}", verdict, tab.url);
        }
    }
    println!();
    println!(
        "{} of {} tab(s) would be archived",
        would_archive,
        loaded.session.tabs.len()
    );
    Ok(())
}

fn demo(config: Config, path: PathBuf, extra_tabs: usize, runtime: Arc<Runtime>) -> Result<()> {
    println!("=============================================");
    println!("  tabkeep headless demo");
    println!("=============================================");
    println!();

    // Start from an empty session so the relaunch only sees what this run wrote
    clear_session_at(&path)?;

    let (engine, events) = HeadlessEngine::new(config.max_history_entries);
    let stats = engine.stats();
    let writer = SessionWriter::new(Arc::clone(&runtime), path.clone());
    let mut registry = TabRegistry::new(Box::new(engine), config.clone()).with_writer(writer);
    if let Some(dir) = &config.screenshot_dir {
        registry = registry.with_artifacts(Box::new(ScreenshotStore::new(dir)));
    }

    let first = registry.open("https://example.com", None, false);
    registry.select(first)?;
    registry.drain_events(&events);
    for page in ["/page2", "/page3"] {
        registry.navigate(first, page)?;
        registry.drain_events(&events);
    }
    println!("Opened {} and navigated to /page2, /page3", first);

    let mut last = first;
    for i in 0..extra_tabs {
        last = registry.open(&format!("https://example.org/{i}"), Some(first), false);
        registry.select(last)?;
        registry.drain_events(&events);
    }
    println!(
        "Opened {} more tab(s); {} live handle(s)",
        extra_tabs,
        stats.live_handles()
    );

    let report = registry.reclaim_memory(MemoryPressureLevel::Critical);
    println!(
        "Critical memory pressure released {} handle(s); {} still live",
        report.evicted.len(),
        stats.live_handles()
    );

    if let Some(flush) = registry.on_app_background()? {
        println!(
            "Backgrounded: {} write(s) completed, {} failed, {} abandoned",
            flush.completed, flush.failed, flush.abandoned
        );
    }
    println!("Session written to {}", path.display());
    drop(registry);

    let (engine, events) = HeadlessEngine::new(config.max_history_entries);
    let mut restored = TabRegistry::new(Box::new(engine), config).with_session_path(&path);
    let summary = restored.restore_all()?;
    restored.drain_events(&events);
    println!(
        "Relaunched: {} tab(s) restored, {} skipped, {} degraded",
        summary.restored, summary.skipped, summary.degraded
    );

    println!(
        "Foreground after relaunch: {} (expected {})",
        restored
            .foreground_id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string()),
        last
    );

    restored.select(first)?;
    restored.drain_events(&events);
    if let Some(tab) = restored.get(first) {
        println!("First tab is back at {} ({:?})", tab.url(), tab.handle_state());
    }
    debug_info!("CLI", "demo finished with {} tabs", restored.tab_count());
    Ok(())
}
