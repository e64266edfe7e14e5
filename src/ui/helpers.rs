//! Helper functions for UI operations.
//!
//! Background fetches are spawned here. Every task reports back through an
//! `AppEvent`; none of them touch `App` directly.

use crate::api::{ApiError, CardSummary, Gateway};
use crate::app::{App, AppEvent};
use crate::favorites::{FavoriteChange, FavoriteConfirmer};
use crate::filter::{LookupTicket, Recompute};
use crate::util::validate_url_for_open;
use futures::{FutureExt, StreamExt, TryStreamExt};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Detail requests in flight while resolving favorites.
const FAVORITES_CONCURRENCY: usize = 8;

/// Wraps a future to catch panics and convert them to errors.
///
/// # Returns
///
/// - `Ok(result)` if the future completes normally
/// - `Err(panic_message)` if the future panics
pub(super) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else if let Some(e) = panic.downcast_ref::<Box<dyn std::error::Error + Send>>() {
                e.to_string()
            } else {
                format!("Unknown panic: {:?}", (*panic).type_id())
            }
        })
}

/// Spawn `work` and send the event it produces. A panic becomes
/// `AppEvent::TaskPanicked` for `task`.
fn spawn_reporting<F>(task: &'static str, tx: mpsc::Sender<AppEvent>, work: F) -> JoinHandle<()>
where
    F: Future<Output = AppEvent> + Send + 'static,
{
    tokio::spawn(async move {
        let event = match catch_task_panic(work).await {
            Ok(event) => event,
            Err(error) => {
                tracing::error!(task, error = %error, "Background task panicked");
                AppEvent::TaskPanicked { task, error }
            }
        };
        if tx.send(event).await.is_err() {
            tracing::warn!(task, "Channel send failed (receiver dropped)");
        }
    })
}

// ============================================================================
// Catalog
// ============================================================================

/// Fetch the catalog index. Any earlier fetch is aborted and its result
/// would be dropped by the generation check anyway.
pub(super) fn spawn_catalog_load(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    let generation = app.begin_catalog_load();
    let gateway = app.gateway.clone();
    tracing::debug!(generation, "Spawning catalog load");

    app.catalog.load_handle = Some(spawn_reporting(
        "catalog_load",
        event_tx.clone(),
        async move {
            let result = gateway.fetch_catalog_index().await;
            AppEvent::CatalogLoaded { generation, result }
        },
    ));
}

/// Start the category lookup a filter intent asked for, if any.
pub(super) fn follow_recompute(app: &mut App, step: Recompute, event_tx: &mpsc::Sender<AppEvent>) {
    if let Recompute::NeedsMembers(ticket) = step {
        spawn_category_lookup(app, ticket, event_tx);
    }
}

fn spawn_category_lookup(app: &mut App, ticket: LookupTicket, event_tx: &mpsc::Sender<AppEvent>) {
    // The controller already superseded the previous ticket
    if let Some(handle) = app.catalog.lookup_handle.take() {
        handle.abort();
    }
    let gateway = app.gateway.clone();
    tracing::debug!(
        generation = ticket.generation,
        category = %ticket.category,
        "Spawning category lookup"
    );

    app.catalog.lookup_handle = Some(spawn_reporting(
        "category_lookup",
        event_tx.clone(),
        async move {
            let result = gateway.fetch_category_members(&ticket.category).await;
            AppEvent::CategoryMembersLoaded { ticket, result }
        },
    ));
}

// ============================================================================
// Detail
// ============================================================================

/// Open the detail view for `id` and fetch its record.
pub(super) fn spawn_detail_load(app: &mut App, id: i64, event_tx: &mpsc::Sender<AppEvent>) {
    let generation = app.begin_detail(id);
    let gateway = app.gateway.clone();
    tracing::debug!(id, generation, "Spawning detail load");

    app.detail.handle = Some(spawn_reporting(
        "detail_load",
        event_tx.clone(),
        async move {
            let result = gateway.fetch_detail(id).await;
            AppEvent::DetailLoaded {
                id,
                generation,
                result,
            }
        },
    ));
}

/// Open the artwork of the loaded detail record in the system browser.
pub(super) fn open_artwork(app: &mut App) {
    let Some(url) = app
        .detail
        .record()
        .and_then(|r| r.artwork_url())
        .map(str::to_string)
    else {
        app.set_status("No artwork available");
        return;
    };

    match validate_url_for_open(&url) {
        Ok(url) => match open::that(url.as_str()) {
            Ok(()) => app.set_status("Opened artwork in browser"),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Failed to open browser");
                app.set_status(format!("Failed to open browser: {}", e));
            }
        },
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "Refusing to open artwork URL");
            app.set_status(format!("Cannot open URL: {}", e));
        }
    }
}

// ============================================================================
// Favorites
// ============================================================================

/// Open the favorites view and resolve every favorite id to a card.
pub(super) fn spawn_favorites_resolve(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    let generation = app.begin_favorites();
    let gateway = app.gateway.clone();
    let ids = app.favorites.ids().to_vec();
    tracing::debug!(count = ids.len(), generation, "Spawning favorites resolve");

    app.favorites_view.handle = Some(spawn_reporting(
        "favorites_resolve",
        event_tx.clone(),
        async move {
            let result = resolve_cards(&gateway, ids).await;
            AppEvent::FavoritesResolved { generation, result }
        },
    ));
}

/// Fetch the card for every id with bounded concurrency, keeping `ids`
/// order. The first failure fails the whole batch.
pub async fn resolve_cards(
    gateway: &Gateway,
    ids: Vec<i64>,
) -> Result<Vec<CardSummary>, ApiError> {
    futures::stream::iter(ids)
        .map(|id| async move {
            let record = gateway.fetch_detail(id).await?;
            Ok::<_, ApiError>(CardSummary::for_requested(id, record))
        })
        .buffered(FAVORITES_CONCURRENCY)
        .try_collect()
        .await
}

/// Flip the favorite under the cursor and ask for confirmation.
pub(super) async fn toggle_favorite(app: &mut App, id: i64, event_tx: &mpsc::Sender<AppEvent>) {
    match app.favorites.toggle(id).await {
        Ok(change) => {
            spawn_favorite_confirm(Arc::clone(&app.confirmer), change, event_tx);
        }
        Err(e) => {
            tracing::error!(id, error = %e, "Failed to persist favorite");
            app.set_status("Failed to update favorite. Please try again.");
        }
    }
}

fn spawn_favorite_confirm(
    confirmer: Arc<dyn FavoriteConfirmer>,
    change: FavoriteChange,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    // Confirmations are independent and never aborted
    spawn_reporting("favorite_confirm", event_tx.clone(), async move {
        match confirmer.confirm(change).await {
            Ok(()) => AppEvent::FavoriteConfirmed { change },
            Err(error) => AppEvent::FavoriteConfirmFailed { change, error },
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::build_http_client;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn detail_json(id: i64, name: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "name": name,
            "height": 7,
            "weight": 69,
            "base_experience": 64,
            "sprites": { "front_default": format!("https://img.example/{}.png", id) },
            "types": [],
            "abilities": [],
            "stats": [],
            "moves": [],
            "forms": []
        })
    }

    async fn gateway_for(server: &MockServer) -> Gateway {
        Gateway::new(
            build_http_client(Duration::from_secs(5)).unwrap(),
            &format!("{}/api/v2", server.uri()),
            &format!("{}/sprites", server.uri()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_catch_task_panic_returns_message() {
        let result: Result<(), String> = catch_task_panic(async { panic!("boom") }).await;
        assert_eq!(result.unwrap_err(), "boom");
    }

    #[tokio::test]
    async fn test_resolve_cards_keeps_stored_order() {
        let server = MockServer::start().await;
        // The first id answers last
        Mock::given(method("GET"))
            .and(path("/api/v2/pokemon/25"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(detail_json(25, "pikachu"))
                    .set_delay(Duration::from_millis(100)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/pokemon/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(detail_json(1, "bulbasaur")))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server).await;
        let cards = resolve_cards(&gateway, vec![25, 1]).await.unwrap();
        let ids: Vec<i64> = cards.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![25, 1]);
        assert_eq!(cards[0].name, "pikachu");
        assert_eq!(cards[1].sprite_url.as_deref(), Some("https://img.example/1.png"));
    }

    #[tokio::test]
    async fn test_resolve_cards_any_failure_fails_all() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/pokemon/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(detail_json(1, "bulbasaur")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/pokemon/2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server).await;
        let result = resolve_cards(&gateway, vec![1, 2]).await;
        assert!(matches!(result, Err(ApiError::HttpStatus(500))));
    }

    #[tokio::test]
    async fn test_resolve_cards_keeps_requested_id() {
        let server = MockServer::start().await;
        // Alternate form answered with the base record's id
        Mock::given(method("GET"))
            .and(path("/api/v2/pokemon/10034"))
            .respond_with(ResponseTemplate::new(200).set_body_json(detail_json(6, "charizard-mega-x")))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server).await;
        let cards = resolve_cards(&gateway, vec![10034]).await.unwrap();
        assert_eq!(cards[0].id, 10034);
        assert_eq!(cards[0].name, "charizard-mega-x");
    }

    #[tokio::test]
    async fn test_resolve_no_ids_is_empty() {
        let server = MockServer::start().await;
        let gateway = gateway_for(&server).await;
        assert!(resolve_cards(&gateway, Vec::new()).await.unwrap().is_empty());
    }
}
