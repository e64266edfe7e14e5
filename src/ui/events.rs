//! Application event handling.
//!
//! Processes background task results and storage changes made by other
//! contexts. Every handler drops results that a newer request has replaced.

use crate::api::ApiError;
use crate::app::{App, AppEvent, LoadState, View, CATALOG_LOAD_FAILED, FAVORITES_LOAD_FAILED};
use crate::favorites::{FavoriteChange, FavoriteError};
use crate::filter::LookupOutcome;
use crate::storage::{StorageEvent, FAVORITES_KEY, LOCATION_KEY, THEME_KEY};
use tokio::sync::mpsc;

use super::helpers::{follow_recompute, spawn_favorites_resolve};

pub(super) async fn handle_app_event(
    app: &mut App,
    event: AppEvent,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    match event {
        AppEvent::CatalogLoaded { generation, result } => {
            if generation != app.catalog.generation {
                tracing::debug!(
                    generation,
                    current = app.catalog.generation,
                    "Dropping stale catalog result"
                );
                return;
            }
            app.catalog.load_handle = None;
            app.catalog.loading = false;
            match result {
                Ok(index) => {
                    tracing::info!(count = index.len(), "Catalog index loaded");
                    let step = app.catalog.controller.set_index(index);
                    app.clamp_catalog_selection();
                    follow_recompute(app, step, event_tx);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to load catalog index");
                    app.catalog.load_error = Some(CATALOG_LOAD_FAILED.to_string());
                }
            }
        }
        AppEvent::CategoryMembersLoaded { ticket, result } => {
            let category = ticket.category.clone();
            match app.catalog.controller.complete_lookup(ticket, result) {
                LookupOutcome::Applied => {
                    app.catalog.lookup_handle = None;
                    app.clamp_catalog_selection();
                    tracing::debug!(category = %category, "Category applied");
                }
                LookupOutcome::Failed(_) => {
                    app.catalog.lookup_handle = None;
                }
                LookupOutcome::Superseded => {}
            }
        }
        AppEvent::DetailLoaded {
            id,
            generation,
            result,
        } => {
            if generation != app.detail.generation || id != app.detail.id {
                tracing::debug!(id, generation, "Dropping stale detail result");
                return;
            }
            app.detail.handle = None;
            app.detail.content = match result {
                Ok(record) => LoadState::Loaded(Box::new(record)),
                Err(e) => {
                    tracing::warn!(id, error = %e, "Failed to load detail");
                    LoadState::Failed(detail_error_message(&e))
                }
            };
        }
        AppEvent::FavoritesResolved { generation, result } => {
            if generation != app.favorites_view.generation {
                tracing::debug!(generation, "Dropping stale favorites result");
                return;
            }
            app.favorites_view.handle = None;
            app.favorites_view.content = match result {
                Ok(cards) => {
                    let len = cards.len();
                    app.favorites_view.selected =
                        app.favorites_view.selected.min(len.saturating_sub(1));
                    LoadState::Loaded(cards)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to resolve favorites");
                    LoadState::Failed(FAVORITES_LOAD_FAILED.to_string())
                }
            };
        }
        AppEvent::FavoriteConfirmed { change } => {
            tracing::debug!(id = change.id, seq = change.seq, "Favorite change confirmed");
        }
        AppEvent::FavoriteConfirmFailed { change, error } => {
            handle_confirm_failed(app, change, error).await;
        }
        AppEvent::TaskPanicked { task, error } => {
            tracing::error!(task, error = %error, "Background task panicked");
            app.set_status(format!("Internal error in {}: {}", task, error));
            // Leave the affected view out of its loading state
            match task {
                "catalog_load" => {
                    app.catalog.loading = false;
                    app.catalog.load_error = Some(CATALOG_LOAD_FAILED.to_string());
                }
                "detail_load" => {
                    app.detail.content = LoadState::Failed(error);
                }
                "favorites_resolve" => {
                    app.favorites_view.content =
                        LoadState::Failed(FAVORITES_LOAD_FAILED.to_string());
                }
                _ => {}
            }
        }
    }
}

fn detail_error_message(error: &ApiError) -> String {
    match error {
        ApiError::NotFound(id) => format!("No Pokémon with id {}", id),
        _ => "Failed to fetch Pokémon data".to_string(),
    }
}

async fn handle_confirm_failed(app: &mut App, change: FavoriteChange, error: FavoriteError) {
    tracing::warn!(id = change.id, error = ?error, "Favorite confirmation failed, rolling back");
    match app.favorites.rollback(change).await {
        Ok(true) => app.set_status(error.to_string()),
        // A later toggle or an external write already replaced this change
        Ok(false) => {}
        Err(e) => {
            tracing::error!(id = change.id, error = %e, "Failed to persist rollback");
            app.set_status(error.to_string());
        }
    }
}

// ============================================================================
// Storage Sync
// ============================================================================

/// Apply a write made by another storage context.
///
/// Events carrying this app's own origin are ignored. Nothing is persisted
/// here, so two contexts cannot echo a change back and forth.
pub(super) fn handle_storage_event(
    app: &mut App,
    event: StorageEvent,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    if event.origin == app.db.origin() {
        return;
    }
    tracing::debug!(key = %event.key, origin = ?event.origin, "Applying foreign storage change");

    match event.key.as_str() {
        FAVORITES_KEY => {
            app.favorites.apply_external(event.new_value.as_deref());
            if app.view == View::Favorites {
                spawn_favorites_resolve(app, event_tx);
            }
        }
        THEME_KEY => {
            app.prefs
                .apply_external(&app.config, THEME_KEY, event.new_value.as_deref());
            app.set_theme(app.prefs.theme_variant());
        }
        LOCATION_KEY => {
            // Read once at startup; later writes only update the stored copy
            app.prefs
                .apply_external(&app.config, LOCATION_KEY, event.new_value.as_deref());
        }
        other => {
            tracing::trace!(key = other, "Ignoring change to unwatched key");
        }
    }
    app.needs_redraw = true;
}

/// Re-read synced keys after missing change notifications.
pub(super) async fn resync_storage(app: &mut App) {
    if let Err(e) = app.favorites.reload().await {
        tracing::warn!(error = %e, "Failed to reload favorites");
    }
    match app.db.get_item(THEME_KEY).await {
        Ok(value) => {
            app.prefs
                .apply_external(&app.config, THEME_KEY, value.as_deref());
            app.set_theme(app.prefs.theme_variant());
        }
        Err(e) => tracing::warn!(error = %e, "Failed to reload theme"),
    }
}
