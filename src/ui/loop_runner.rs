//! Main event loop for the TUI.
//!
//! This module contains the core event loop that multiplexes terminal input,
//! background task events, storage changes and periodic ticks.

use crate::app::{App, AppEvent};
use crate::filter::FilterState;
use crate::storage::{StorageEvent, LOCATION_KEY};
use anyhow::Result;
use crossterm::{
    event::{Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use super::events::{handle_app_event, handle_storage_event, resync_storage};
use super::helpers::{follow_recompute, spawn_catalog_load};
use super::input::handle_input;
use super::render::render;

/// Number of frames in the loading spinner animation.
const SPINNER_FRAMES: usize = 10;

/// Result of handling a key press event.
///
/// Returned by input handlers to signal whether the application should
/// continue running or terminate gracefully.
pub enum Action {
    /// Continue the event loop and process more events.
    Continue,
    /// Exit the application and restore the terminal.
    Quit,
}

/// Runs the TUI application event loop.
///
/// Uses `tokio::select!` to multiplex:
/// - **Signals**: SIGTERM/SIGINT end the loop (Unix only)
/// - **Terminal input**: Key presses from crossterm's async event stream
/// - **Background tasks**: Fetch and confirmation results via `AppEvent`
/// - **Storage changes**: Writes from other contexts and processes
/// - **Periodic tick**: 250ms timer for status expiry and the location write
///
/// `initial` is the filter state to start from. The catalog load is started
/// here.
///
/// # Panic Safety
///
/// Installs a panic hook that restores terminal state before unwinding,
/// ensuring the terminal is not left in raw mode on panic.
pub async fn run(
    app: &mut App,
    initial: FilterState,
    event_tx: mpsc::Sender<AppEvent>,
    mut event_rx: mpsc::Receiver<AppEvent>,
) -> Result<()> {
    // Install panic hook BEFORE setting up terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let mut storage_rx = app.db.subscribe();

    let step = app.restore_filter(initial);
    follow_recompute(app, step, &event_tx);
    spawn_catalog_load(app, &event_tx);

    let mut terminal = setup_terminal()?;
    let mut event_stream = crossterm::event::EventStream::new();
    let mut tick_interval = tokio::time::interval(Duration::from_millis(250));

    // Signal handlers for graceful shutdown (Unix only)
    #[cfg(unix)]
    let mut sigterm = signal(SignalKind::terminate())?;
    #[cfg(unix)]
    let mut sigint = signal(SignalKind::interrupt())?;

    loop {
        if app.needs_redraw {
            terminal.draw(|f| render(f, app))?;
            app.needs_redraw = false;
        }

        if app.clear_expired_status() {
            app.needs_redraw = true;
        }

        // Drain pending app events before handling more input so results
        // are not starved by rapid typing
        while let Ok(event) = event_rx.try_recv() {
            app.needs_redraw = true;
            handle_app_event(app, event, &event_tx).await;
        }

        #[cfg(unix)]
        let sigterm_fut = sigterm.recv();
        #[cfg(not(unix))]
        let sigterm_fut = std::future::pending::<Option<()>>();

        #[cfg(unix)]
        let sigint_fut = sigint.recv();
        #[cfg(not(unix))]
        let sigint_fut = std::future::pending::<Option<()>>();

        tokio::select! {
            biased;

            _ = sigterm_fut => {
                tracing::info!("Received SIGTERM, shutting down gracefully");
                break;
            }

            _ = sigint_fut => {
                tracing::info!("Received SIGINT, shutting down gracefully");
                break;
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind != KeyEventKind::Release => {
                        app.needs_redraw = true;
                        match handle_input(app, key.code, key.modifiers, &event_tx).await {
                            Ok(Action::Quit) => break,
                            Ok(Action::Continue) => {}
                            Err(e) => {
                                tracing::warn!(error = %e, "Input handler failed");
                                app.set_status(format!("Error: {}", e));
                            }
                        }
                    }
                    Some(Ok(Event::Resize(_, _))) => app.needs_redraw = true,
                    Some(Err(e)) => tracing::warn!(error = %e, "Terminal event stream error"),
                    None => {
                        tracing::info!("Terminal event stream closed");
                        break;
                    }
                    _ => {}
                }
            }

            Some(event) = event_rx.recv() => {
                app.needs_redraw = true;
                handle_app_event(app, event, &event_tx).await;
            }

            change = storage_rx.recv() => {
                handle_storage_change(app, change, &event_tx).await;
            }

            _ = tick_interval.tick() => {
                handle_tick(app).await;
            }
        }
    }

    // Flush a location change still inside its debounce window
    if let Some(location) = app.take_pending_location() {
        write_location(app, &location).await;
    }

    restore_terminal(terminal)?;
    Ok(())
}

async fn handle_storage_change(
    app: &mut App,
    change: Result<StorageEvent, broadcast::error::RecvError>,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    match change {
        Ok(event) => handle_storage_event(app, event, event_tx),
        Err(broadcast::error::RecvError::Lagged(missed)) => {
            tracing::warn!(missed, "Missed storage notifications, resyncing");
            resync_storage(app).await;
            app.needs_redraw = true;
        }
        // The sender lives in the database handle the app holds
        Err(broadcast::error::RecvError::Closed) => {}
    }
}

/// Periodic work: spinner animation and the debounced location write.
async fn handle_tick(app: &mut App) {
    let loading = app.catalog.shows_placeholder()
        || app.detail.content.is_loading()
        || app.favorites_view.content.is_loading();
    if loading {
        app.spinner_frame = (app.spinner_frame + 1) % SPINNER_FRAMES;
        app.needs_redraw = true;
    }

    write_due_location(app).await;
}

async fn write_due_location(app: &mut App) {
    if let Some(location) = app.take_due_location() {
        write_location(app, &location).await;
    }
}

async fn write_location(app: &mut App, location: &str) {
    tracing::debug!(location = %location, "Writing list location");
    if let Err(e) = app.prefs.set(&app.db, LOCATION_KEY, location).await {
        tracing::warn!(error = %e, "Failed to store list location");
    }
}

/// Set up the terminal for TUI rendering.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore terminal to normal state.
fn restore_terminal(mut terminal: Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
