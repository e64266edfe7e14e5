use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use dexview::api::{build_http_client, Gateway};
use dexview::app::{App, AppEvent};
use dexview::config::Config;
use dexview::favorites::SimulatedConfirmer;
use dexview::filter::{decode_location, settle, FilterState, ListFilterController};
use dexview::preferences::PreferenceManager;
use dexview::storage::{Database, DatabaseError, FAVORITES_KEY, THEME_KEY};
use dexview::ui;
use dexview::util::display_name;

/// How often another process's writes to the shared database are polled for.
const EXTERNAL_WATCH_INTERVAL: Duration = Duration::from_secs(1);

/// Get the config directory path (~/.config/dexview/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let config_dir = PathBuf::from(home).join(".config").join("dexview");
    Ok(config_dir)
}

#[derive(Parser, Debug)]
#[command(name = "dexview", about = "Terminal Pokédex backed by PokéAPI")]
struct Args {
    /// Start at this list location, e.g. "q=char&type=fire&sort=za"
    #[arg(long, value_name = "QUERY")]
    location: Option<String>,

    /// Print the visible page for the location and exit
    #[arg(long)]
    print: bool,

    /// Reset database (delete and recreate)
    #[arg(long)]
    reset_db: bool,

    /// Config file to use instead of ~/.config/dexview/config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

/// The filter state to start from: `--location`, else the stored location
/// when restoring is enabled, else the defaults.
fn initial_filter(args: &Args, prefs: &PreferenceManager) -> FilterState {
    if let Some(location) = &args.location {
        return decode_location(location);
    }
    match prefs.location() {
        Some(stored) if prefs.restore_location() => {
            tracing::debug!(location = %stored, "Restoring stored location");
            decode_location(stored)
        }
        _ => FilterState::default(),
    }
}

/// Non-interactive mode: resolve the location once and print the page.
async fn print_page(gateway: &Gateway, state: FilterState) -> Result<()> {
    let index = gateway
        .fetch_catalog_index()
        .await
        .context("Failed to load Pokémon")?;

    let mut controller = ListFilterController::new();
    controller.set_index(index);
    let step = controller.set_state(state);
    settle(&mut controller, gateway, step).await?;

    let page = controller.visible_page();
    if page.is_empty() {
        println!("No Pokémon found.");
    }
    for entry in page {
        println!("#{:03} {}", entry.id, display_name(&entry.name));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they never land in the TUI or in --print output
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // Set up config directory
    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
        tracing::info!(path = %config_dir.display(), "Created config directory");
    }

    // Directory holds the favorites database; keep it user-only on Unix
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(&config_dir) {
            Ok(metadata) => {
                let mut perms = metadata.permissions();
                perms.set_mode(0o700);
                if let Err(e) = std::fs::set_permissions(&config_dir, perms) {
                    tracing::warn!(
                        path = %config_dir.display(),
                        error = %e,
                        "Failed to set config directory permissions to 0700"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %config_dir.display(),
                    error = %e,
                    "Failed to read config directory metadata"
                );
            }
        }
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let db_path = config_dir.join("dexview.db");

    // Handle --reset-db flag
    if args.reset_db && db_path.exists() {
        std::fs::remove_file(&db_path).context("Failed to delete database")?;
        println!("Database reset.");
    }

    // Open database
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::Busy) => {
            eprintln!("Error: The dexview database is locked by another process. Please try again.");
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };

    let client = build_http_client(config.request_timeout()).context("Failed to build HTTP client")?;
    let gateway = Gateway::new(client, &config.api_base_url, &config.sprite_base_url)
        .context("Invalid API base URL")?
        .with_timeout(config.request_timeout());

    if args.print {
        // Printing works without stored preferences; only the location is lost
        let prefs = match PreferenceManager::load(&config, &db).await {
            Ok(prefs) => prefs,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored preferences, using config");
                PreferenceManager::from_config(&config)
            }
        };
        return print_page(&gateway, initial_filter(&args, &prefs)).await;
    }

    let confirmer = Arc::new(SimulatedConfirmer::new(config.confirm_delay()));
    let mut app = App::new(db.clone(), gateway, config, confirmer)
        .await
        .context("Failed to create application")?;
    let initial = initial_filter(&args, &app.prefs);

    // Writes from another dexview process sharing the database file
    let watcher = db.watch_external(
        vec![FAVORITES_KEY.to_string(), THEME_KEY.to_string()],
        EXTERNAL_WATCH_INTERVAL,
    );

    // Create event channel for background tasks
    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);

    // Run the TUI
    let result = ui::run(&mut app, initial, event_tx, event_rx).await;
    watcher.abort();
    result?;

    println!("Goodbye!");
    Ok(())
}
