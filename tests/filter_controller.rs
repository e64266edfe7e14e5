//! Integration tests for the list filter controller against a mocked API.
//!
//! Each test starts its own wiremock server so category fetch counts are
//! isolated.

use dexview::api::{CatalogEntry, Gateway, DEFAULT_SPRITE_BASE_URL};
use dexview::filter::{
    decode_location, encode_location, settle, FilterState, ListFilterController, LookupOutcome,
    Recompute, SortOrder,
};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway(server: &MockServer) -> Gateway {
    Gateway::new(reqwest::Client::new(), &server.uri(), DEFAULT_SPRITE_BASE_URL).unwrap()
}

fn entry(name: &str, id: i64) -> CatalogEntry {
    CatalogEntry::new(name, format!("https://pokeapi.co/api/v2/pokemon/{}/", id))
}

fn starters() -> Vec<CatalogEntry> {
    vec![entry("bulbasaur", 1), entry("charmander", 4), entry("squirtle", 7)]
}

fn names(controller: &ListFilterController) -> Vec<&str> {
    controller
        .visible_page()
        .iter()
        .map(|e| e.name.as_str())
        .collect()
}

fn members_body(ids: &[i64]) -> serde_json::Value {
    let pokemon: Vec<_> = ids
        .iter()
        .map(|id| {
            serde_json::json!({
                "pokemon": {
                    "name": format!("mon{}", id),
                    "url": format!("https://pokeapi.co/api/v2/pokemon/{}/", id)
                },
                "slot": 1
            })
        })
        .collect();
    serde_json::json!({ "name": "type", "pokemon": pokemon })
}

// ============================================================================
// Starter Example
// ============================================================================

#[test]
fn test_search_finds_charmander_for_any_sort_and_offset() {
    for sort_order in [SortOrder::Az, SortOrder::Za] {
        for page_offset in [0, 36, 720] {
            let mut c = ListFilterController::new();
            c.set_index(starters());
            c.set_state(FilterState {
                search_term: "char".into(),
                category: None,
                sort_order,
                page_offset,
            });
            assert_eq!(names(&c), vec!["charmander"]);
        }
    }
}

#[test]
fn test_descending_sort_of_starters() {
    let mut c = ListFilterController::new();
    c.set_index(starters());
    c.set_sort_order(SortOrder::Za);
    assert_eq!(names(&c), vec!["squirtle", "charmander", "bulbasaur"]);
}

// ============================================================================
// Category Lookups
// ============================================================================

#[tokio::test]
async fn test_category_fetched_once_across_activations() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/type/fire"))
        .respond_with(ResponseTemplate::new(200).set_body_json(members_body(&[4])))
        .expect(1)
        .mount(&server)
        .await;
    let gateway = gateway(&server);

    let mut c = ListFilterController::new();
    c.set_index(starters());

    for _ in 0..3 {
        let step = c.set_category(Some("fire".into()));
        settle(&mut c, &gateway, step).await.unwrap();
        assert_eq!(names(&c), vec!["charmander"]);

        let step = c.set_category(None);
        assert_eq!(step, Recompute::Ready);
        assert_eq!(names(&c), vec!["bulbasaur", "charmander", "squirtle"]);
    }
    // expect(1) is verified when the server drops
}

#[tokio::test]
async fn test_superseded_lookup_result_is_never_applied() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/type/fire"))
        .respond_with(ResponseTemplate::new(200).set_body_json(members_body(&[4])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/type/water"))
        .respond_with(ResponseTemplate::new(200).set_body_json(members_body(&[7])))
        .mount(&server)
        .await;
    let gateway = gateway(&server);

    let mut c = ListFilterController::new();
    c.set_index(starters());

    let Recompute::NeedsMembers(fire) = c.set_category(Some("fire".into())) else {
        panic!("fire should need a lookup");
    };
    let Recompute::NeedsMembers(water) = c.set_category(Some("water".into())) else {
        panic!("water should need a lookup");
    };

    // Water resolves first, then the stale fire result arrives
    let water_ids = gateway.fetch_category_members("water").await;
    assert_eq!(c.complete_lookup(water, water_ids), LookupOutcome::Applied);
    let fire_ids = gateway.fetch_category_members("fire").await;
    assert_eq!(c.complete_lookup(fire, fire_ids), LookupOutcome::Superseded);

    assert_eq!(names(&c), vec!["squirtle"]);
    // The stale result still warmed the cache
    assert!(c.cache().get("fire").is_some());
}

#[tokio::test]
async fn test_failed_lookup_reports_processing_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/type/fire"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let gateway = gateway(&server);

    let mut c = ListFilterController::new();
    c.set_index(starters());
    let before: Vec<String> = names(&c).into_iter().map(String::from).collect();

    let step = c.set_category(Some("fire".into()));
    let err = settle(&mut c, &gateway, step).await.unwrap_err();

    assert_eq!(err.to_string(), "Processing error. Try again.");
    assert_eq!(names(&c), before);
    assert!(!c.is_processing());
}

// ============================================================================
// Location
// ============================================================================

#[test]
fn test_location_restores_full_filter() {
    let state = FilterState {
        search_term: "mr mime".into(),
        category: Some("psychic".into()),
        sort_order: SortOrder::Za,
        page_offset: 0,
    };
    let location = encode_location(&state);
    assert_eq!(location, "q=mr+mime&type=psychic&sort=za");
    assert_eq!(decode_location(&location), state);
}

#[test]
fn test_garbled_sort_falls_back_to_ascending() {
    assert_eq!(decode_location("type=fire&sort=sideways").sort_order, SortOrder::Az);
    assert_eq!(decode_location("q=pika").sort_order, SortOrder::Az);
}
